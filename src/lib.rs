//! proxyscope - a terminal dashboard for a local proxy daemon
//!
//! This library exposes modules for use in integration tests.

pub mod app;
pub mod buffer;
pub mod daemon;
pub mod decode;
pub mod fmt;
pub mod models;
pub mod mutation;
pub mod session;
pub mod storage;
pub mod table;
pub mod ui;
pub mod viewport;
