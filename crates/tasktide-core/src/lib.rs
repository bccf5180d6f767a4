//! TaskTide core library.
//!
//! This crate contains everything the front-ends share:
//! - `cache`: two-tier TTL cache with single-flight loading
//! - `pomodoro`: focus timer state machine and its async driver
//! - `store`: document store port and an in-memory adapter
//! - `data`: cached, user-scoped record access over the store
//! - `auth`: signed-in user and persisted session
//! - `models`, `settings`, `analytics`: typed records and summaries
//! - `config`: on-disk application configuration

pub mod analytics;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod data;
pub mod models;
pub mod pomodoro;
pub mod settings;
pub mod store;
pub mod utils;

pub use cache::CacheManager;
pub use config::Config;
pub use data::{DataService, Record};
