//! precache - offline asset cache manager
//!
//! Keeps a local resource cache synchronized with a versioned, published
//! manifest across releases, and routes requests between that cache and the
//! network while an upgrade is in progress.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod intercept;
pub mod journal;
pub mod lifecycle;
pub mod manifest;
pub mod network;
pub mod prefetch;
pub mod request;
pub mod runtime;
pub mod storage;
pub mod ui;
pub mod worker;

#[cfg(test)]
mod testing;

pub use error::{PrecacheError, PrecacheResult};
