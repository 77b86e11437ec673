//! Recursive, concurrency-driven mass bisection.
//!
//! A [`PartitionTree`] owns a shared sum table and a frontier of [`Cell`]s.
//! Each generation splits every active cell once (or retires it into the
//! terminal set when no axis can usefully split), with the frontier
//! processed in parallel and a join barrier between generations.
//!
//! During a generation each split reads only the immutable table and
//! writes only state it exclusively owns (its own bounds and one newly
//! allocated sibling), so no locking is needed. The next generation starts
//! only after every outcome has been collected, because the frontier is
//! rebuilt from those outcomes.
//!
//! Retired and surviving cells drain into a [`CellStream`] for rendering.

mod cell;
mod config;
mod logger;
mod stream;
mod tree;

pub use cell::Cell;
pub use config::{AxisWeights, ConfigError, PartitionConfig, SplitPolicy};
pub use logger::{PartitionLogger, Verbosity};
pub use stream::{CellStream, Raster, StreamCell};
pub use tree::{GenerationStats, PartitionTree};
