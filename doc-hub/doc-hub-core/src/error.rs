use git2::ErrorCode;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the document store and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("cannot delete document with children: {0}")]
    HasChildren(String),
    #[error("parent document does not exist: {0}")]
    ParentMissing(String),
    #[error("target directory does not exist: {0}")]
    TargetParentMissing(String),
    #[error("target document already exists: {0}")]
    TargetExists(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("invalid title: {0}")]
    InvalidTitle(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("version control error: {0}")]
    Git(#[from] git2::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used by outer layers to pick a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Invalid,
    Io,
    VersionControl,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::HasChildren(_)
            | StoreError::ParentMissing(_)
            | StoreError::TargetParentMissing(_)
            | StoreError::TargetExists(_) => ErrorKind::Conflict,
            StoreError::InvalidPath(_)
            | StoreError::InvalidTitle(_)
            | StoreError::InvalidInput(_) => ErrorKind::Invalid,
            StoreError::Io(_) | StoreError::Json(_) => ErrorKind::Io,
            StoreError::Git(_) => ErrorKind::VersionControl,
        }
    }

    /// Map a git lookup failure to `NotFound` when the object is simply absent.
    pub(crate) fn from_lookup(err: git2::Error, what: impl Into<String>) -> Self {
        if err.code() == ErrorCode::NotFound {
            StoreError::NotFound(what.into())
        } else {
            StoreError::Git(err)
        }
    }
}
