//! Entry points used by the binary.

mod history;
mod load;
mod serve;

pub use history::run_history;
pub use load::{run_load, LoadSummary};
pub use serve::run_gateway;
