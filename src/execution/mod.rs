//! Task execution engine.
//!
//! This module selects what to run and drives tasks across hosts: one
//! worker per host, one barrier per task.

mod error;
mod executor;
mod runner;
mod select;

pub use error::{RunError, SelectionError};
pub use executor::TaskOutcome;
pub use runner::TaskRunner;
pub use select::{select_hosts, select_tasks};
