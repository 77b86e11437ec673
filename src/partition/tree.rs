//! The partition tree and its generation driver.

use super::cell::Cell;
use super::config::{AxisWeights, PartitionConfig, SplitPolicy};
use super::logger::PartitionLogger;
use crate::density::DensityField;
use crate::geom::{Axis, Region};
use crate::sum::{FrameError, MassTable, VolumeSum};
use crate::utils::{run_with_threads, Parallelism};

// Axis preference order for score ties: frames first, then x, then y.
const AXES: [Axis; 3] = [Axis::Z, Axis::X, Axis::Y];

// =============================================================================
// GenerationStats
// =============================================================================

/// Outcome counts of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationStats {
    /// Index of the generation that just ran (starting at 0).
    pub generation: u32,
    /// Cells that split this generation.
    pub split: usize,
    /// Cells retired into the terminal set this generation.
    pub retired: usize,
    /// Size of the active frontier afterwards.
    pub active: usize,
}

// =============================================================================
// PartitionTree
// =============================================================================

enum SplitOutcome {
    Split(Cell, Cell),
    Terminal(Cell),
}

/// Owns a sum table and bisects it into cells of near-equal mass.
///
/// Starts as one active cell spanning the whole table. Each call to
/// [`advance`](Self::advance) runs one generation: every active cell
/// either splits (shrinking in place and emitting exactly one sibling) or
/// retires into the terminal set. [`run`](Self::run) drives the configured
/// number of generations on a sized thread pool.
///
/// The table is shared read-only while cells split; appending frames takes
/// `&mut self`, so builds and splits cannot interleave.
pub struct PartitionTree<S: MassTable> {
    source: S,
    config: PartitionConfig,
    active: Vec<Cell>,
    terminal: Vec<Cell>,
    generation: u32,
}

impl<S: MassTable> PartitionTree<S> {
    /// A tree with one active cell covering the table's whole domain.
    pub fn new(source: S, config: PartitionConfig) -> Self {
        let root = Cell::new(source.domain());
        Self {
            source,
            config,
            active: vec![root],
            terminal: Vec::new(),
            generation: 0,
        }
    }

    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[inline]
    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    /// Cells still eligible for splitting.
    #[inline]
    pub fn active_cells(&self) -> &[Cell] {
        &self.active
    }

    /// Cells that can no longer usefully split.
    #[inline]
    pub fn terminal_cells(&self) -> &[Cell] {
        &self.terminal
    }

    /// Generations run so far.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Run one generation over the whole active frontier.
    ///
    /// Every cell's split reads the shared table and touches only its own
    /// region and one new sibling, so the frontier maps in parallel; the
    /// collect is the barrier that generation `k+1` waits behind.
    pub fn advance(&mut self, parallelism: Parallelism) -> GenerationStats {
        let cells = std::mem::take(&mut self.active);
        let source = &self.source;
        let config = &self.config;
        let outcomes = parallelism.maybe_par_map(cells, |cell| split_cell(source, config, cell));

        let mut stats = GenerationStats {
            generation: self.generation,
            split: 0,
            retired: 0,
            active: 0,
        };
        for outcome in outcomes {
            match outcome {
                SplitOutcome::Split(cell, sibling) => {
                    stats.split += 1;
                    self.active.push(cell);
                    self.active.push(sibling);
                }
                SplitOutcome::Terminal(cell) => {
                    stats.retired += 1;
                    self.terminal.push(cell);
                }
            }
        }
        stats.active = self.active.len();
        self.generation += 1;
        stats
    }

    /// Run the configured number of generations, stopping early when every
    /// cell is terminal. Returns one stats entry per generation run.
    pub fn run(&mut self) -> Vec<GenerationStats>
    where
        S: Send,
    {
        let n_threads = self.config.n_threads.map_or(0, |n| n.get());
        let logger = PartitionLogger::new(self.config.verbosity);
        logger.start(self.active.len(), self.config.generations);

        let stats = run_with_threads(n_threads, |parallelism| {
            let mut stats = Vec::new();
            for _ in 0..self.config.generations {
                if self.active.is_empty() {
                    break;
                }
                let generation = self.advance(parallelism);
                logger.generation(&generation);
                stats.push(generation);
            }
            stats
        });

        logger.finish(self.active.len(), self.terminal.len());
        stats
    }
}

impl PartitionTree<VolumeSum> {
    /// Append a frame to the backing volume, widening the root cell's
    /// frame span.
    ///
    /// Frames should be loaded before any splitting: once the root has
    /// split, its children keep the spans they were cut with and a new
    /// frame would go unpartitioned.
    pub fn push_frame(&mut self, frame: &DensityField) -> Result<(), FrameError> {
        self.source.push_frame(frame)?;
        if self.terminal.is_empty() && self.generation == 0 {
            if let [root] = self.active.as_mut_slice() {
                root.region.zmax = self.source.len_z() as i32;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Split logic
// =============================================================================

/// Split one cell, or retire it. The cell keeps the lower half of its
/// region; the sibling covers the vacated upper half against the same
/// table, so no mass is created or lost.
fn split_cell<S: MassTable>(source: &S, config: &PartitionConfig, mut cell: Cell) -> SplitOutcome {
    let choice = if cell.region.is_empty() {
        None
    } else {
        match config.policy {
            SplitPolicy::DipoleGap => choose_dipole(source, &config.weights, &cell.region),
            SplitPolicy::LongestAxis => choose_longest(source, &config.weights, &cell.region),
        }
    };

    match choice {
        Some((axis, cut)) => {
            let (lower, upper) = cell.region.split_at(axis, cut);
            cell.region = lower;
            SplitOutcome::Split(cell, Cell::new(upper))
        }
        None => {
            let mean = cell.mean_value(source);
            cell.cache_mean(mean);
            SplitOutcome::Terminal(cell)
        }
    }
}

/// Dipole-gap axis choice: per axis, score the weighted distance between
/// the positive and complement poles; the largest score wins. Below the
/// axis's own weight (poles coincide, or the axis is disabled) the cell is
/// terminal. The cut is the rounded midpoint of the two poles.
fn choose_dipole<S: MassTable>(
    source: &S,
    weights: &AxisWeights,
    region: &Region,
) -> Option<(Axis, i32)> {
    let mut best: Option<(Axis, u64, i32)> = None;
    for axis in AXES {
        let weight = weights.get(axis) as u64;
        if weight == 0 {
            continue;
        }
        let pole = source.pole(region, axis);
        let antipole = source.antipole(region, axis);
        let score = weight * pole.abs_diff(antipole) as u64;
        if best.is_none_or(|(_, top, _)| score > top) {
            let cut = (pole + antipole + 1) / 2;
            best = Some((axis, score, cut));
        }
    }

    let (axis, score, cut) = best?;
    if score < weights.get(axis) as u64 {
        return None;
    }
    confine_cut(region, axis, cut)
}

/// Longest-axis choice: the largest weighted extent wins and the cut falls
/// on the positive half-mass coordinate. Keeps halving uniform cells.
fn choose_longest<S: MassTable>(
    source: &S,
    weights: &AxisWeights,
    region: &Region,
) -> Option<(Axis, i32)> {
    let mut best: Option<(Axis, u64)> = None;
    for axis in AXES {
        let score = weights.get(axis) as u64 * region.extent(axis) as u64;
        if score > 0 && best.is_none_or(|(_, top)| score > top) {
            best = Some((axis, score));
        }
    }

    let (axis, _) = best?;
    confine_cut(region, axis, source.pole(region, axis))
}

/// Refuse cuts that would produce an empty child.
fn confine_cut(region: &Region, axis: Axis, cut: i32) -> Option<(Axis, i32)> {
    let (lo, hi) = region.bounds(axis);
    (cut > lo && cut < hi).then_some((axis, cut))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Rect;
    use crate::sum::PlaneSum;
    use crate::testing::{point_mass_field, uniform_field};

    fn plane_tree(field_width: i32, field_height: i32, value: u16, policy: SplitPolicy) -> PartitionTree<PlaneSum> {
        let sum = PlaneSum::from_field(&uniform_field(field_width, field_height, value));
        let config = PartitionConfig::builder().policy(policy).build().unwrap();
        PartitionTree::new(sum, config)
    }

    #[test]
    fn test_longest_axis_halves_uniform_cell() {
        let mut tree = plane_tree(4, 4, 100, SplitPolicy::LongestAxis);
        let stats = tree.advance(Parallelism::Sequential);
        assert_eq!(stats.split, 1);
        assert_eq!(stats.active, 2);

        let masses: Vec<u64> = tree
            .active_cells()
            .iter()
            .map(|c| c.mass(tree.source()))
            .collect();
        assert_eq!(masses, vec![800, 800]);
    }

    #[test]
    fn test_dipole_retires_uniform_cell() {
        // Poles of a uniform field coincide on every axis.
        let mut tree = plane_tree(4, 4, 100, SplitPolicy::DipoleGap);
        let stats = tree.advance(Parallelism::Sequential);
        assert_eq!(stats.split, 0);
        assert_eq!(stats.retired, 1);
        assert_eq!(tree.terminal_cells()[0].cached_mean(), Some(100));
    }

    #[test]
    fn test_mass_conserved_over_generations() {
        let field = point_mass_field(8, 8, 2, 5, u16::MAX);
        let sum = PlaneSum::from_field(&field);
        let total = sum.mass();
        let config = PartitionConfig::builder()
            .policy(SplitPolicy::LongestAxis)
            .generations(5)
            .build()
            .unwrap();
        let mut tree = PartitionTree::new(sum, config);
        for _ in 0..5 {
            tree.advance(Parallelism::Sequential);
            let sum_of_parts: u64 = tree
                .active_cells()
                .iter()
                .chain(tree.terminal_cells())
                .map(|c| c.mass(tree.source()))
                .sum();
            assert_eq!(sum_of_parts, total);
        }
    }

    #[test]
    fn test_point_mass_goes_terminal() {
        let field = point_mass_field(8, 8, 0, 0, u16::MAX);
        let sum = PlaneSum::from_field(&field);
        let config = PartitionConfig::builder().generations(32).build().unwrap();
        let mut tree = PartitionTree::new(sum, config);
        let stats = tree.run();
        // The run exhausts the frontier well before the generation cap.
        assert!(stats.len() < 32);
        assert!(tree.active_cells().is_empty());
        // All mass sits in one terminal cell.
        let massive: Vec<_> = tree
            .terminal_cells()
            .iter()
            .filter(|c| c.mass(tree.source()) > 0)
            .collect();
        assert_eq!(massive.len(), 1);
    }

    #[test]
    fn test_run_parallel_matches_sequential() {
        let field = crate::testing::random_field(16, 16, 42);
        let make = |threads: usize| {
            let sum = PlaneSum::from_field(&field);
            let config = PartitionConfig::builder()
                .policy(SplitPolicy::LongestAxis)
                .generations(4)
                .n_threads(std::num::NonZeroUsize::new(threads).unwrap())
                .build()
                .unwrap();
            let mut tree = PartitionTree::new(sum, config);
            tree.run();
            let mut regions: Vec<_> = tree
                .active_cells()
                .iter()
                .chain(tree.terminal_cells())
                .map(|c| c.region)
                .collect();
            regions.sort_by_key(|r| (r.rect.min_y, r.rect.min_x, r.zmin));
            regions
        };
        assert_eq!(make(1), make(4));
    }

    #[test]
    fn test_generation_counter() {
        let mut tree = plane_tree(8, 8, 10, SplitPolicy::LongestAxis);
        assert_eq!(tree.generation(), 0);
        tree.advance(Parallelism::Sequential);
        tree.advance(Parallelism::Sequential);
        assert_eq!(tree.generation(), 2);
    }

    #[test]
    fn test_push_frame_widens_root() {
        let frame = uniform_field(4, 4, 10);
        let volume = VolumeSum::new(Rect::from_size(4, 4), 3).unwrap();
        let mut tree = PartitionTree::new(volume, PartitionConfig::default());
        tree.push_frame(&frame).unwrap();
        tree.push_frame(&frame).unwrap();
        assert_eq!(tree.active_cells()[0].region.zmax, 2);

        tree.advance(Parallelism::Sequential);
        // After splitting has started the root is gone; further frames
        // only grow the table.
        tree.push_frame(&frame).unwrap();
        assert_eq!(tree.source().len_z(), 3);
    }
}
