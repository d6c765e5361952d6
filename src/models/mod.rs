mod family;
mod record;
mod session;

pub use family::Family;
pub use record::{DeleteEntry, EntityRecord, Item, ListItem, ListPage, PullPage, PushAck, UpsertOutcome};
pub use session::{OwnerState, SyncSession};
