pub mod cursor;
pub mod metadata;
pub mod timestamp;

pub use cursor::{Cursor, CursorError};
pub use metadata::{ExtractionError, ParentRef, ParentType, SyncMetadata, extract};
