//! Sifter Core Library
//!
//! This crate provides the shared building blocks of the Sifter listing filter:
//! the typed configuration model, the persisted settings store, the mutation
//! watcher contract and the statistics recorder.
//!
//! # Architecture
//!
//! A host page (a browser document, a saved HTML file, a test double) exposes
//! item lists and items through the [`Page`] trait. Everything that decides
//! whether an item is shown lives in `sf-engine`; this crate only carries the
//! data those decisions are made from.
//!
//! # Modules
//!
//! - `codec`: Nested JSON encoding used for persisted settings and backups
//! - `error`: Error taxonomy shared by every crate
//! - `page`: Host page contract (item lists, items, visibility)
//! - `stats`: Per-filter failure counters
//! - `store`: Key-value settings persistence with defaults and sync ids
//! - `text`: Key normalization, range checks, duration and rating parsing
//! - `types`: Shared type definitions
//! - `watcher`: Child-list mutation delivery

pub mod codec;
pub mod error;
pub mod page;
pub mod stats;
pub mod store;
pub mod text;
pub mod types;
pub mod watcher;

// Re-export commonly used types
pub use error::{ConfigurationError, Error, Result, TransientIoError, UserInputError};
pub use page::Page;
pub use stats::{StatisticsRecorder, StatisticsSink, TOTAL_STATISTIC};
pub use store::{FileStorage, LocalStore, MemoryStorage, StorageBackend};
pub use types::{
    AttrValue, Clause, FieldKind, FieldValue, ItemId, ItemState, ListId, Optimized, Range,
    Substitution,
};
pub use watcher::{MutationHandler, MutationRecord, MutationWatcher};
