mod persistence;
mod ring;
mod stream;
mod subscription;

pub use persistence::{
    ActivityPersistence, JsonlActivityPersistence, NullPersistence, DEFAULT_MAX_EVENTS_PER_FILE,
    MAX_FILE_BYTES, MAX_LINE_BYTES,
};
pub use ring::DEFAULT_MAX_EVENTS_IN_MEMORY;
pub use stream::{ActivityStream, ActivityStreamConfig, NewEvent};
pub use subscription::{EventFilter, SubscriptionStats, DEFAULT_WATERMARK};
