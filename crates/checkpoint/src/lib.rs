mod integrity;
mod store;

pub use integrity::compute_integrity;
pub use store::{
    CheckpointStore, CheckpointStoreConfig, DEFAULT_MAX_CHECKPOINTS, DEFAULT_RETENTION_DAYS,
};
