//! Partition driver configuration with builder pattern.
//!
//! [`PartitionConfig`] gathers everything the driver needs (split policy,
//! axis weights, generation count, threading, verbosity) into one value
//! passed at construction. There is no process-wide state. The builder
//! (via the `bon` crate) validates at `build()` time.
//!
//! # Example
//!
//! ```
//! use stippling::partition::{AxisWeights, PartitionConfig, SplitPolicy};
//!
//! // All defaults: dipole-gap policy, unit weights, 16 generations.
//! let config = PartitionConfig::builder().build().unwrap();
//!
//! // Favor horizontal cuts and cap the rounds.
//! let config = PartitionConfig::builder()
//!     .policy(SplitPolicy::LongestAxis)
//!     .weights(AxisWeights { x: 1, y: 3, z: 0 })
//!     .generations(8)
//!     .build()
//!     .unwrap();
//! ```

use std::num::NonZeroUsize;

use bon::Builder;
use serde::{Deserialize, Serialize};

use super::logger::Verbosity;
use crate::geom::Axis;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Every axis weight is zero, so no cell could ever split.
    NoSplittableAxis,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSplittableAxis => {
                write!(f, "at least one axis weight must be positive")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// AxisWeights
// =============================================================================

/// Relative per-axis weights.
///
/// A weight scales the axis's split score; weight zero disables the axis
/// entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisWeights {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl AxisWeights {
    #[inline]
    pub fn get(&self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// True if no axis can ever be chosen.
    pub fn all_zero(&self) -> bool {
        self.x == 0 && self.y == 0 && self.z == 0
    }
}

impl Default for AxisWeights {
    fn default() -> Self {
        Self { x: 1, y: 1, z: 1 }
    }
}

// =============================================================================
// SplitPolicy
// =============================================================================

/// How a cell chooses its split axis and cut coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SplitPolicy {
    /// Locate the positive and complement poles on every axis and split
    /// the axis with the largest weighted pole gap, cutting at the rounded
    /// midpoint of the two poles. A cell whose best gap falls below its
    /// axis weight is terminal: the poles coincide, so there is nothing
    /// left to pull apart.
    #[default]
    DipoleGap,
    /// Split the axis with the largest weighted extent, cutting at the
    /// half-mass coordinate. Keeps halving uniform fields; a cell is
    /// terminal only when no cut can produce two non-empty children.
    LongestAxis,
}

// =============================================================================
// PartitionConfig
// =============================================================================

/// Configuration for a [`super::PartitionTree`].
///
/// # Example
///
/// ```
/// use stippling::partition::PartitionConfig;
///
/// let config = PartitionConfig::builder().generations(24).build().unwrap();
/// assert_eq!(config.generations, 24);
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct PartitionConfig {
    /// Split policy. Default: [`SplitPolicy::DipoleGap`].
    #[builder(default)]
    pub policy: SplitPolicy,

    /// Per-axis weights. Default: 1 on every axis.
    #[builder(default)]
    pub weights: AxisWeights,

    /// Number of lock-step generations to run. Default: 16.
    ///
    /// A run also stops early once every cell is terminal.
    #[builder(default = 16)]
    pub generations: u32,

    /// Number of worker threads. `None` uses all available cores.
    pub n_threads: Option<NonZeroUsize>,

    /// Verbosity level for per-generation progress. Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: partition_config_builder::IsComplete> PartitionConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoSplittableAxis`] if every axis weight is
    /// zero.
    pub fn build(self) -> Result<PartitionConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl PartitionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.weights.all_zero() {
            return Err(ConfigError::NoSplittableAxis);
        }
        Ok(())
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}
