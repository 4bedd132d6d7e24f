//! Domain models shared across the export path.

mod channel;
mod request;

pub use channel::{ApiKey, Channel, ChannelId, EntryId, Feed, UserId};
pub use request::ExportRequest;
