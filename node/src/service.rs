//! The constructed-once service handle around the governance engines.
//!
//! `ValidatorService` wires the delegation ledger, the consensus
//! validator, the identity collaborator, and the storage backends
//! together, and runs one timer-driven checker task per pending item.
//! Votes and delegation mutations lock exactly one engine for exactly one
//! operation, so every mutation is atomic against its entity record and a
//! vote never blocks on a finalization in progress — it simply fails with
//! a state error if it loses the race.

use crate::config::ServiceConfig;
use crate::error::NodeError;
use crate::events::{EventHub, StatusEvent};
use crate::shutdown::ShutdownController;
use concord_consensus::{
    CheckOutcome, ConsensusError, ConsensusValidator, QuorumStatus, Role, ValidationItem,
};
use concord_ledger::{DelegationKind, DelegationLedger, DelegationMetadata, IdentityProvider};
use concord_store::{DelegationStore, ReadCache, StoreError, ValidationStore};
use concord_types::{AccountId, Clock, DelegationId, ItemId, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// Capacity of the finalized-item read cache.
const ITEM_CACHE_CAPACITY: usize = 1_024;

/// Capacity of the outbound event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Handle to the running governance core.
pub struct ValidatorService {
    ledger: Arc<Mutex<DelegationLedger>>,
    validator: Arc<Mutex<ConsensusValidator>>,
    identity: Arc<dyn IdentityProvider>,
    items: Arc<dyn ValidationStore>,
    item_cache: Arc<ReadCache<ItemId, ValidationItem>>,
    events: EventHub,
    shutdown: Arc<ShutdownController>,
    clock: Arc<dyn Clock>,
    check_interval: Duration,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ValidatorService {
    pub fn new(
        config: &ServiceConfig,
        identity: Arc<dyn IdentityProvider>,
        delegation_store: Arc<dyn DelegationStore>,
        validation_store: Arc<dyn ValidationStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let ledger = DelegationLedger::new(
            config.delegation.clone(),
            Arc::clone(&identity),
            delegation_store,
        )?;
        let validator =
            ConsensusValidator::new(config.validator.clone(), config.quorum.clone())?;
        Ok(Self {
            ledger: Arc::new(Mutex::new(ledger)),
            validator: Arc::new(Mutex::new(validator)),
            identity,
            items: validation_store,
            item_cache: Arc::new(ReadCache::new(ITEM_CACHE_CAPACITY)),
            events: EventHub::new(EVENT_CHANNEL_CAPACITY),
            shutdown: Arc::new(ShutdownController::new()),
            clock,
            check_interval: Duration::from_secs(config.validator.check_interval_secs),
            task_handles: Mutex::new(Vec::new()),
        })
    }

    /// Construct a service driven by the real system clock.
    pub fn with_system_clock(
        config: &ServiceConfig,
        identity: Arc<dyn IdentityProvider>,
        delegation_store: Arc<dyn DelegationStore>,
        validation_store: Arc<dyn ValidationStore>,
    ) -> Result<Self, NodeError> {
        Self::new(
            config,
            identity,
            delegation_store,
            validation_store,
            Arc::new(SystemClock),
        )
    }

    /// Subscribe to status-transition events.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    // ── Validation items ─────────────────────────────────────────────────

    /// Submit an item for validation and start its periodic checker.
    pub async fn submit(
        &self,
        payload: serde_json::Value,
        source: &str,
    ) -> Result<ItemId, NodeError> {
        let now = self.clock.now();
        let total = self.identity.total_base_power();
        let (id, snapshot) = {
            let mut validator = self.validator.lock().await;
            let id = validator.submit(payload, source, total, now)?;
            let snapshot = validator.item(&id).expect("item just inserted").clone();
            (id, snapshot)
        };
        self.persist_item(&snapshot)?;
        tracing::info!(%id, source, "validation item submitted");
        self.spawn_checker(id.clone()).await;
        Ok(id)
    }

    /// Cast a vote. The voter's effective power comes from the ledger and
    /// is capped by their role before it is counted.
    ///
    /// Returns the power actually counted.
    pub async fn vote(
        &self,
        id: &ItemId,
        voter: &AccountId,
        support: bool,
    ) -> Result<u128, NodeError> {
        let now = self.clock.now();
        let power = {
            self.ledger
                .lock()
                .await
                .effective_voting_power(voter, now)
        };
        let role = self.role_of(voter);
        let (counted, snapshot) = {
            let mut validator = self.validator.lock().await;
            let counted = validator.cast_vote(id, voter, role, power, support, now)?;
            let snapshot = validator.item(id).expect("vote just recorded").clone();
            (counted, snapshot)
        };
        self.item_cache.invalidate(id);
        self.persist_item(&snapshot)?;
        tracing::debug!(%id, %voter, support, counted, "vote cast");
        Ok(counted)
    }

    /// Read an item, finalized ones included.
    pub async fn item(&self, id: &ItemId) -> Option<ValidationItem> {
        if let Some(hit) = self.item_cache.get(id) {
            return Some(hit);
        }
        let snapshot = { self.validator.lock().await.item(id).cloned() };
        if let Some(item) = &snapshot {
            // Only terminal items are cacheable; pending tallies still move.
            if item.is_terminal() {
                self.item_cache.insert(id.clone(), item.clone());
            }
        }
        snapshot
    }

    /// Latest quorum report for a pending item.
    pub async fn quorum_status(&self, id: &ItemId) -> Result<QuorumStatus, NodeError> {
        let now = self.clock.now();
        Ok(self.validator.lock().await.quorum_status(id, now)?)
    }

    /// Re-admit pending items persisted before a restart and restart their
    /// checkers. Returns how many were resumed.
    pub async fn resume_pending(&self) -> Result<usize, NodeError> {
        let ids = self.items.list_pending()?;
        let total = self.identity.total_base_power();
        let mut resumed = 0;
        for id in ids {
            let Some(bytes) = self.items.get_item(&id)? else {
                continue;
            };
            let item: ValidationItem = match serde_json::from_slice(&bytes) {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!(%id, error = %e, "skipping undecodable item record");
                    continue;
                }
            };
            if item.is_terminal() {
                self.items.mark_finalized(&id)?;
                continue;
            }
            self.validator.lock().await.resume(item, total)?;
            self.spawn_checker(id).await;
            resumed += 1;
        }
        Ok(resumed)
    }

    // ── Delegations ──────────────────────────────────────────────────────

    pub async fn create_delegation(
        &self,
        delegator: &AccountId,
        delegate: &AccountId,
        kind: DelegationKind,
        amount: u128,
        percentage: u8,
        metadata: DelegationMetadata,
    ) -> Result<DelegationId, NodeError> {
        let now = self.clock.now();
        Ok(self.ledger.lock().await.create_delegation(
            delegator, delegate, kind, amount, percentage, metadata, now,
        )?)
    }

    pub async fn update_delegation(
        &self,
        id: DelegationId,
        delegator: &AccountId,
        kind: DelegationKind,
        amount: u128,
        percentage: u8,
    ) -> Result<(), NodeError> {
        let now = self.clock.now();
        Ok(self
            .ledger
            .lock()
            .await
            .update_delegation(id, delegator, kind, amount, percentage, now)?)
    }

    pub async fn revoke_delegation(
        &self,
        id: DelegationId,
        delegator: &AccountId,
    ) -> Result<(), NodeError> {
        let now = self.clock.now();
        Ok(self
            .ledger
            .lock()
            .await
            .revoke_delegation(id, delegator, now)?)
    }

    pub async fn effective_voting_power(&self, account: &AccountId) -> u128 {
        let now = self.clock.now();
        self.ledger.lock().await.effective_voting_power(account, now)
    }

    pub async fn available_voting_power(&self, account: &AccountId) -> u128 {
        let now = self.clock.now();
        self.ledger.lock().await.available_voting_power(account, now)
    }

    pub async fn delegated_voting_power(&self, account: &AccountId) -> u128 {
        let now = self.clock.now();
        self.ledger.lock().await.delegated_voting_power(account, now)
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Stop all checker tasks and wait for them to finish.
    pub async fn stop(&self) {
        self.shutdown.shutdown();
        let handles: Vec<JoinHandle<()>> =
            std::mem::take(&mut *self.task_handles.lock().await);
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Number of checker tasks that have not yet exited.
    pub async fn active_checker_count(&self) -> usize {
        self.task_handles
            .lock()
            .await
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    fn role_of(&self, account: &AccountId) -> Role {
        if self.identity.is_admin(account) {
            Role::Admin
        } else if self.identity.is_delegate(account) {
            Role::Delegate
        } else {
            Role::Member
        }
    }

    // Item records carry an arbitrary JSON payload, so they are stored as
    // JSON; bincode cannot round-trip `serde_json::Value`.
    fn persist_item(&self, item: &ValidationItem) -> Result<(), NodeError> {
        let bytes = serde_json::to_vec(item)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.items.put_item(&item.id, &bytes)?;
        Ok(())
    }

    /// Spawn the periodic checker for one item.
    ///
    /// The task stops as soon as the item reaches a terminal state, on
    /// shutdown, or if the item vanishes. A store or check fault affects
    /// only this item's task.
    async fn spawn_checker(&self, id: ItemId) {
        let validator = Arc::clone(&self.validator);
        let items = Arc::clone(&self.items);
        let cache = Arc::clone(&self.item_cache);
        let events = self.events.clone();
        let clock = Arc::clone(&self.clock);
        let mut shutdown_rx = self.shutdown.subscribe();
        let period = self.check_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick of a tokio interval fires immediately; skip it
            // so the item gets one full interval before its first check.
            interval.tick().await;
            let mut quorum_announced = false;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::debug!(%id, "checker task shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let now = clock.now();
                        let outcome = {
                            let mut validator = validator.lock().await;
                            validator.check(&id, now)
                        };
                        match outcome {
                            Ok(CheckOutcome::Progress(quorum)) => {
                                if quorum.is_quorum_reached && !quorum_announced {
                                    quorum_announced = true;
                                    events.emit(StatusEvent::QuorumReached { item: id.clone() });
                                }
                            }
                            Ok(CheckOutcome::Finalized { status, quorum }) => {
                                let snapshot =
                                    { validator.lock().await.item(&id).cloned() };
                                if let Some(item) = snapshot {
                                    match serde_json::to_vec(&item) {
                                        Ok(bytes) => {
                                            let written = items
                                                .put_item(&id, &bytes)
                                                .and_then(|_| items.mark_finalized(&id));
                                            if let Err(e) = written {
                                                tracing::warn!(%id, error = %e, "failed to persist finalized item");
                                            }
                                        }
                                        Err(e) => {
                                            tracing::warn!(%id, error = %e, "failed to encode finalized item");
                                        }
                                    }
                                }
                                cache.invalidate(&id);
                                if quorum.is_quorum_reached && !quorum_announced {
                                    events.emit(StatusEvent::QuorumReached { item: id.clone() });
                                }
                                if let Some(event) = StatusEvent::finalized(id.clone(), status) {
                                    events.emit(event);
                                }
                                tracing::info!(%id, ?status, "validation item finalized");
                                break;
                            }
                            Ok(CheckOutcome::AlreadyFinal(_)) => break,
                            Err(ConsensusError::ItemNotFound(_)) => {
                                tracing::warn!(%id, "checker lost its item, stopping");
                                break;
                            }
                            Err(e) => {
                                // One bad check must not take the item's
                                // checker down; the next tick retries.
                                tracing::warn!(%id, error = %e, "periodic check failed");
                            }
                        }
                    }
                }
            }
        });
        self.task_handles.lock().await.push(handle);
    }
}
