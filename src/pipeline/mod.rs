//! Import -> deduplicate -> store pipeline.

pub mod dedup;
pub mod loader;
pub mod persist;
pub mod progress;

pub use dedup::{prepare_batch, DedupStage, DedupStats, PreparedBatch};
pub use loader::{LoadReport, Loader, LoaderConfig};
pub use persist::{FanOutHandle, PersistFanOut, PersistStats, WorkerStats};
pub use progress::LoadProgress;
