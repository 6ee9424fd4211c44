//! backup-steward - backup lifecycle orchestration and retention
//!
//! This library creates backup archives, copies them to one or more storage
//! disks, retires old ones under a grandfather-father-son retention policy
//! and reports the health of every destination.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `storage`: The `Disk` trait and its drivers
//! - `backup`: Backups, collections and destinations
//! - `retention`: Retention periods and the cleanup strategy
//! - `health`: Health checks and destination statuses
//! - `events`: Domain events, listeners and the event journal
//! - `pipeline`: The ordered task pipeline every action runs on
//! - `actions`: The backup, cleanup and monitor actions
//! - `display`: Terminal tables
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use steward::actions::{CleanupAction, CleanupPassable};
//! use steward::config::{paths::StewardPaths, settings::Settings};
//! use steward::events::EventDispatcher;
//! use steward::pipeline::Action;
//! use steward::storage::DiskRegistry;
//!
//! let paths = StewardPaths::new()?;
//! let settings = Settings::load_or_default(&paths)?;
//! let registry = Arc::new(DiskRegistry::from_settings(&settings));
//!
//! let mut passable = CleanupPassable::new();
//! CleanupAction::new(settings, registry).execute(&mut passable, &EventDispatcher::new())?;
//! ```

pub mod actions;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod health;
pub mod pipeline;
pub mod retention;
pub mod storage;

pub use error::{StewardError, StewardResult};
