//! Background trigger sources: the periodic timer and the path monitor.
//!
//! Each runs as its own tokio task and stops on the shared
//! `CancellationToken`.

pub mod path_monitor;
pub mod periodic;

pub use path_monitor::{path_status, run_path_trigger, PathMonitor, PathStatus};
pub use periodic::PeriodicChecker;
