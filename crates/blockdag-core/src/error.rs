use crate::hash::BlockHash;

/// Why an insertion was refused. A refused insert never changes the store.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    #[error("block must name at least one parent")]
    EmptyParentSet,
    #[error("parent block not found: {0}")]
    UnknownParent(BlockHash),
}

/// Why a store could not be rebuilt from previously sealed blocks.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RestoreError {
    #[error("no blocks to restore")]
    Empty,
    #[error("first restored block {0} is not a genesis block")]
    MissingGenesis(BlockHash),
    #[error("block listed twice: {0}")]
    DuplicateBlock(BlockHash),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
