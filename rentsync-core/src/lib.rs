//! Core engine for rentsync.
//!
//! This crate holds everything the CLI and the HTTP server share:
//! - `lifecycle` moves subscriptions through active, grace period and expired
//!   and sends renewal reminders at most once per type
//! - `sync` reconciles external iCal feeds into locked dates
//! - `publish` renders a property's own availability feed
//! - `share` serves token-based shared calendars within the owner's plan
//! - `store` and `push` are the seams to the managed backend and push gateway

pub mod config;
pub mod constants;
pub mod error;
pub mod ics;
pub mod lifecycle;
pub mod model;
pub mod publish;
pub mod push;
pub mod share;
pub mod store;
pub mod sync;

pub use error::{RentSyncError, RentSyncResult};
