//! stippling: a density-field partitioning engine.
//!
//! Converts a scalar field sampled from image pixels (a "density field")
//! into hierarchically partitioned regions of near-equal accumulated mass,
//! the core of stippling and space-partitioning art generators.
//!
//! # Key Types
//!
//! - [`DensityField`] / [`DensityModel`] - Pixel-to-density conversion
//! - [`PlaneSum`] / [`VolumeSum`] - Prefix-sum tables with O(1) mass queries
//! - [`RowMask`] / [`ColMask`] / [`MaskPair`] - Run-length coverage masks
//! - [`PartitionTree`] / [`PartitionConfig`] - Recursive mass bisection
//! - [`CellStream`] - Ordered terminal cells for frame rendering
//!
//! # Pipeline
//!
//! Convert frames with a [`DensityModel`], build a [`PlaneSum`] (single
//! image) or [`VolumeSum`] (frame sequence), then drive a [`PartitionTree`]
//! for a configured number of generations. See the [`partition`] module for
//! details.
//!
//! Image decoding and encoding are out of scope; frames enter as pixel
//! arrays and results leave as cell streams or rasterized value buffers.

// Re-export approx traits for users who want to compare centroids
pub use approx;

pub mod density;
pub mod geom;
pub mod mask;
pub mod partition;
pub mod sum;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Geometry vocabulary
pub use geom::{Axis, Rect, Region};

// Density conversion
pub use density::{
    model_fn, Alpha, Blue, Complement, DensityField, DensityModel, Green, Luminance, Red, Rgba,
};

// Prefix-sum tables
pub use sum::{ColSum, FrameError, MassTable, PlaneSum, RowSum, SumPair, VolumeSum};

// Coverage masks
pub use mask::{
    AxisMask, ColMask, CoverageRun, MaskError, MaskPair, MaskedAggregate, MaskedMoments, RowMask,
};

// Partitioning
pub use partition::{
    AxisWeights, Cell, CellStream, ConfigError, GenerationStats, PartitionConfig, PartitionTree,
    Raster, SplitPolicy, StreamCell, Verbosity,
};

// Shared utilities
pub use utils::{run_with_threads, Parallelism};
