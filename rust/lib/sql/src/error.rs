use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    #[error("unique violation: {0}")]
    UniqueViolation(String),

    /// Any other constraint (foreign key, not null, check) rejected the write.
    #[error("constraint violation: {0}")]
    Constraint(String),
}

impl SQLError {
    /// Whether the failure is a duplicate key rather than a real fault.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, SQLError::UniqueViolation(_))
    }

    /// Whether the store itself could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SQLError::Connection(_))
    }
}
