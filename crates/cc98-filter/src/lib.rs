//! `cc98-filter` - Hide or redact content from blocked users and boards
//!
//! This library provides the filter engine that rewrites forum pages, the
//! page model it works on, and the block list management around it.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod dom;
pub mod engine;
pub mod entity;
pub mod error;
pub mod filter;
pub mod logging;
pub mod message;
pub mod settings;
pub mod store;
pub mod transfer;
pub mod watch;

pub use config::Config;
pub use dom::{Document, NodeId, Selector};
pub use engine::{EngineSettings, EngineStats, FilterEngine, ScanReport};
pub use entity::{ActiveBlockSet, BlockList, BlockedEntity, EntityKind};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use message::{Broadcaster, Message};
pub use settings::{BlockManager, BlockStats};
pub use store::{BlockStore, MemoryStore, SqliteStore};
pub use watch::{page_channel, MutationBatch, PageHandle, SharedDocument};
