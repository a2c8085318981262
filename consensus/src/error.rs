use crate::validation::ValidationStatus;
use concord_types::{AccountId, DecisionId, ItemId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("decision id must be non-empty")]
    EmptyDecisionId,

    #[error("validation item {0} not found")]
    ItemNotFound(ItemId),

    #[error("quorum state for decision {0} was never initialized")]
    QuorumNotInitialized(DecisionId),

    #[error("{voter} has already voted on this item")]
    AlreadyVoted { voter: AccountId },

    #[error("item {id} is {status:?}; votes are only accepted while pending")]
    ItemNotPending {
        id: ItemId,
        status: ValidationStatus,
    },

    #[error("voter {voter} has no voting power after role caps")]
    NoVotingPower { voter: AccountId },

    #[error("invalid consensus config: {0}")]
    InvalidConfig(String),
}
