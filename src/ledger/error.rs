use thiserror::Error;

/// Failures reported by [Ledger](super::Ledger). None of them leave a partial write behind.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The id is already taken by a task with another title.
    #[error("Id {id} already exists for \"{existing_title}\"")]
    IntegrityViolation { id: String, existing_title: String },

    #[error("Ledger storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
