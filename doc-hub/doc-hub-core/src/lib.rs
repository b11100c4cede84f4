pub mod document;
pub mod drafts;
pub mod error;
pub mod indexer;
pub mod metadata;
pub mod search;
pub mod slug;
pub mod storage;

pub use document::{Document, HistoryEntry, ShortDocument};
pub use drafts::{Draft, DraftStore};
pub use error::{ErrorKind, Result, StoreError};
pub use indexer::LiveIndex;
pub use metadata::{spawn_flusher, FlushHandle, Metadata};
pub use search::SearchIndex;
pub use storage::{GitStorage, HistoryCapable, Storage, TreeStore};
