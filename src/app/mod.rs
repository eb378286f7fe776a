//! Main application modules.
//!
//! This module provides progress logging, shutdown handling and statistics
//! printing used by the load entry point.

pub mod logging;
pub mod shutdown;
pub mod statistics;

pub use logging::spawn_progress_logger;
pub use shutdown::{cancel_on_ctrl_c, shutdown_gracefully};
pub use statistics::{print_and_save_final_statistics, print_load_statistics};
