//! Keeps gloss video objects in S3 named after their `gloss_dictionary`
//! labels: mismatched objects are copied to `<label>.mp4`, the original is
//! deleted, and the row's `video_file_name` is updated.

pub mod config;
pub mod dictionary;
pub mod logging;
pub mod models;
pub mod naming;
pub mod store;
pub mod sync_engine;

pub use config::{SyncConfig, SyncConfigBuilder};
pub use dictionary::{DictionaryRow, GlossDictionary, MemoryGlossDictionary, PgGlossDictionary};
pub use models::{Outcome, RecordResult, SyncReport, SyncStats};
pub use store::{MemoryVideoStore, S3VideoStore, VideoStore};
pub use sync_engine::{Synchronizer, VideoRename};
