use gallery_core::ServiceError;
use gallery_sql::SQLError;
use thiserror::Error;

/// The favorite operation that was attempted when a store call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteOp {
    Read,
    Insert,
    Delete,
}

impl FavoriteOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Insert => "insert",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for FavoriteOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the gallery module.
///
/// Duplicate-key races and failed search sub-queries are absorbed inside
/// the module and never appear here.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A write referencing a missing profile or artwork, or otherwise
    /// rejected by a non-unique constraint.
    #[error("favorite {op} on artwork {artwork_id} rejected: {message}")]
    ConstraintViolation {
        artwork_id: String,
        op: FavoriteOp,
        message: String,
    },

    #[error("favorite {op} on artwork {artwork_id} failed: {message}")]
    Store {
        artwork_id: String,
        op: FavoriteOp,
        message: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Storage(String),
}

impl GalleryError {
    /// Wrap a store failure of a favorite operation on `artwork_id`.
    pub fn favorite(artwork_id: &str, op: FavoriteOp, err: SQLError) -> Self {
        match err {
            SQLError::Constraint(message) | SQLError::UniqueViolation(message) => {
                GalleryError::ConstraintViolation {
                    artwork_id: artwork_id.to_string(),
                    op,
                    message,
                }
            }
            other => GalleryError::Store {
                artwork_id: artwork_id.to_string(),
                op,
                message: other.to_string(),
            },
        }
    }

    /// Wrap a store failure of a CRUD operation.
    pub fn storage(err: SQLError) -> Self {
        match err {
            SQLError::UniqueViolation(m) => GalleryError::Conflict(m),
            SQLError::Constraint(m) => GalleryError::Validation(m),
            SQLError::Connection(m) => GalleryError::StoreUnavailable(m),
            other => GalleryError::Storage(other.to_string()),
        }
    }
}

impl From<GalleryError> for ServiceError {
    fn from(e: GalleryError) -> Self {
        match e {
            GalleryError::StoreUnavailable(m) => ServiceError::Unavailable(m),
            e @ GalleryError::ConstraintViolation { .. } => ServiceError::Validation(e.to_string()),
            e @ GalleryError::Store { .. } => ServiceError::Storage(e.to_string()),
            GalleryError::NotFound(m) => ServiceError::NotFound(m),
            GalleryError::Conflict(m) => ServiceError::Conflict(m),
            GalleryError::PermissionDenied(m) => ServiceError::PermissionDenied(m),
            GalleryError::Validation(m) => ServiceError::Validation(m),
            GalleryError::Storage(m) => ServiceError::Storage(m),
        }
    }
}
