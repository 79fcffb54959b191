//! Core types shared by the session and execution layers.

pub mod environment;
pub mod retry;
pub mod types;
