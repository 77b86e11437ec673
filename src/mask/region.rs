//! Axis-oriented coverage masks and their aggregates.

use std::marker::PhantomData;

use super::runs::{CoverageRun, RunSpans};
use crate::geom::Rect;
use crate::sum::{AxisSum, ColMajor, RowMajor, SumPair, Traversal};

/// Errors from constructing or combining masks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaskError {
    /// Two masks (or a mask and a table) cover different rectangles.
    #[error("mask rectangles differ: {a:?} vs {b:?}")]
    RectMismatch { a: Rect, b: Rect },
    /// A line's breakpoints are not strictly increasing.
    #[error("mask line {line} has unsorted breakpoints ({prev} then {next})")]
    UnsortedBreakpoints { line: usize, prev: i32, next: i32 },
    /// A line's coverage stops short of the rectangle's edge.
    #[error("mask line {line} ends at {end}, expected {expected}")]
    TruncatedLine { line: usize, end: i32, expected: i32 },
    /// Wrong number of lines for the rectangle.
    #[error("mask has {lines} lines, rectangle needs {expected}")]
    LineCount { lines: usize, expected: usize },
}

/// Masked aggregates over one axis table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskedAggregate {
    /// Coverage-weighted mass, in density units (weights scaled back down
    /// by 65535).
    pub mass: f64,
    /// Covered area in pixels (fractional coverage counted fractionally).
    pub coverage: f64,
    /// Mass-weighted mean coordinate along the cross axis, absolute;
    /// `None` when the masked region holds no mass.
    pub centroid: Option<f64>,
}

/// Masked aggregates over both orientations of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskedMoments {
    pub mass: f64,
    pub coverage: f64,
    /// Mass-weighted center of the masked region, absolute; `None` when it
    /// holds no mass.
    pub centroid: Option<(f64, f64)>,
}

// =============================================================================
// AxisMask
// =============================================================================

/// A sparse description of fractional region coverage: one ordered run list
/// per line, oriented like the [`AxisSum`] it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisMask<O: Traversal> {
    rect: Rect,
    lines: Vec<Vec<CoverageRun>>,
    _order: PhantomData<O>,
}

/// Per-row x-runs; applies to a [`crate::sum::RowSum`].
pub type RowMask = AxisMask<RowMajor>;

/// Per-column y-runs; applies to a [`crate::sum::ColSum`].
pub type ColMask = AxisMask<ColMajor>;

/// Weight of the intersection of two coverages, rounded.
#[inline]
fn combine_weights(a: u16, b: u16) -> u16 {
    ((a as u32 * b as u32 + 0x7FFF) / 0xFFFF) as u16
}

/// Append a run, merging with the previous one when the weight repeats.
fn push_run(out: &mut Vec<CoverageRun>, weight: u16, end: i32) {
    if let Some(last) = out.last_mut() {
        if last.weight == weight {
            last.end = end;
            return;
        }
        if last.end >= end {
            return;
        }
    }
    out.push(CoverageRun::new(weight, end));
}

impl<O: Traversal> AxisMask<O> {
    /// A fully opaque mask: every line one run of full coverage.
    pub fn full(rect: Rect) -> Self {
        let (_, axis_max) = O::axis_bounds(&rect);
        let (cross_min, cross_max) = O::cross_bounds(&rect);
        let n = (cross_max - cross_min).max(0) as usize;
        Self {
            rect,
            lines: vec![vec![CoverageRun::new(u16::MAX, axis_max)]; n],
            _order: PhantomData,
        }
    }

    /// Build from explicit run lists, validating the precondition that
    /// every line's breakpoints strictly increase and reach the
    /// rectangle's edge. Malformed input fails fast here rather than
    /// corrupting later queries.
    pub fn from_runs(rect: Rect, lines: Vec<Vec<CoverageRun>>) -> Result<Self, MaskError> {
        let (axis_min, axis_max) = O::axis_bounds(&rect);
        let (cross_min, cross_max) = O::cross_bounds(&rect);
        let expected = (cross_max - cross_min).max(0) as usize;
        if lines.len() != expected {
            return Err(MaskError::LineCount {
                lines: lines.len(),
                expected,
            });
        }
        for (i, line) in lines.iter().enumerate() {
            let mut prev = axis_min;
            for run in line {
                if run.end <= prev {
                    return Err(MaskError::UnsortedBreakpoints {
                        line: i,
                        prev,
                        next: run.end,
                    });
                }
                prev = run.end;
            }
            if prev != axis_max {
                return Err(MaskError::TruncatedLine {
                    line: i,
                    end: prev,
                    expected: axis_max,
                });
            }
        }
        Ok(Self {
            rect,
            lines,
            _order: PhantomData,
        })
    }

    /// Mask one side of a boundary curve: for each line, coverage is full
    /// before `threshold(cross)`, fractional in the pixel the boundary
    /// crosses, and zero past it. Thresholds at or below the axis minimum
    /// give an empty line; at or above the maximum, a full one.
    ///
    /// This is how a dividing line between two poles becomes a mask; the
    /// other side is its [`complement`](Self::complement).
    pub fn from_boundary(rect: Rect, threshold: impl Fn(i32) -> f64) -> Self {
        let (axis_min, axis_max) = O::axis_bounds(&rect);
        let (cross_min, cross_max) = O::cross_bounds(&rect);
        let mut lines = Vec::with_capacity((cross_max - cross_min).max(0) as usize);
        for cross in cross_min..cross_max {
            let t = threshold(cross);
            let mut line = Vec::new();
            if t <= axis_min as f64 {
                push_run(&mut line, 0, axis_max);
            } else if t >= axis_max as f64 {
                push_run(&mut line, u16::MAX, axis_max);
            } else {
                let whole = t.floor() as i32;
                let frac = ((t - whole as f64) * f64::from(u16::MAX)).round() as u16;
                if whole > axis_min {
                    push_run(&mut line, u16::MAX, whole);
                }
                push_run(&mut line, frac, whole + 1);
                if whole + 1 < axis_max {
                    push_run(&mut line, 0, axis_max);
                }
            }
            lines.push(line);
        }
        Self {
            rect,
            lines,
            _order: PhantomData,
        }
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Iterate one line's runs with explicit start coordinates.
    pub fn line_spans(&self, line: usize) -> RunSpans<'_> {
        let (axis_min, _) = O::axis_bounds(&self.rect);
        RunSpans::new(&self.lines[line], axis_min)
    }

    /// The coverage weight at (x, y); zero outside the rectangle.
    pub fn coverage_at(&self, x: i32, y: i32) -> u16 {
        if !self.rect.contains(x, y) {
            return 0;
        }
        let (cross_min, _) = O::cross_bounds(&self.rect);
        let (axis_coord, cross_coord) = O::axis_cross(x, y);
        let line = (cross_coord - cross_min) as usize;
        self.line_spans(line)
            .find(|span| axis_coord < span.end)
            .map_or(0, |span| span.weight)
    }

    /// The pointwise complement: weight 65535 - w everywhere.
    pub fn complement(&self) -> Self {
        let lines = self
            .lines
            .iter()
            .map(|line| {
                line.iter()
                    .map(|run| CoverageRun::new(u16::MAX - run.weight, run.end))
                    .collect()
            })
            .collect();
        Self {
            rect: self.rect,
            lines,
            _order: PhantomData,
        }
    }

    /// Intersect two masks over the same rectangle: a two-pointer merge of
    /// each line's breakpoint streams. The output breaks wherever either
    /// input breaks, weighted by the rounded product of the two coverages;
    /// consecutive duplicate weights are pruned and breakpoints wrapping
    /// past the line's end are clipped.
    pub fn intersect(&self, other: &Self) -> Result<Self, MaskError> {
        if self.rect != other.rect {
            return Err(MaskError::RectMismatch {
                a: self.rect,
                b: other.rect,
            });
        }
        let (axis_min, axis_max) = O::axis_bounds(&self.rect);
        let lines = self
            .lines
            .iter()
            .zip(&other.lines)
            .map(|(a, b)| merge_line(a, b, axis_min, axis_max))
            .collect();
        Ok(Self {
            rect: self.rect,
            lines,
            _order: PhantomData,
        })
    }

    /// Recompute the masked aggregates over a matching sum table: mass,
    /// covered area, and the mass-weighted mean cross-axis coordinate.
    ///
    /// Walks each line's runs once, combining per-run differences of the
    /// table's cumulative values weighted by the run's coverage: O(lines +
    /// breakpoints), never O(area).
    pub fn apply_to(&self, sum: &AxisSum<O>) -> Result<MaskedAggregate, MaskError> {
        if self.rect != sum.rect() {
            return Err(MaskError::RectMismatch {
                a: self.rect,
                b: sum.rect(),
            });
        }
        let (cross_min, _) = O::cross_bounds(&self.rect);
        let mut mass = 0u64;
        let mut coverage = 0u64;
        // The moment multiplies an already weight-scaled mass by a
        // coordinate; give it the headroom the mass terms don't need.
        let mut moment = 0u128;
        for line in 0..self.lines.len() {
            let mut line_mass = 0u64;
            let mut prev_val = 0u64;
            for span in self.line_spans(line) {
                let val = sum.line_prefix(line, span.end - 1);
                line_mass += (val - prev_val) * span.weight as u64;
                coverage += span.weight as u64 * span.len() as u64;
                prev_val = val;
            }
            mass += line_mass;
            moment += line_mass as u128 * line as u128;
        }
        let scale = f64::from(u16::MAX);
        Ok(MaskedAggregate {
            mass: mass as f64 / scale,
            coverage: coverage as f64 / scale,
            centroid: (mass > 0)
                .then(|| moment as f64 / mass as f64 + cross_min as f64),
        })
    }
}

/// Merge one line of two masks; see [`AxisMask::intersect`].
fn merge_line(
    a: &[CoverageRun],
    b: &[CoverageRun],
    axis_min: i32,
    axis_max: i32,
) -> Vec<CoverageRun> {
    let mut out = Vec::new();
    let (mut ia, mut ib) = (0, 0);
    let mut cursor = axis_min;
    while ia < a.len() && ib < b.len() && cursor < axis_max {
        let (ra, rb) = (a[ia], b[ib]);
        let end = ra.end.min(rb.end).min(axis_max);
        if end > cursor {
            push_run(&mut out, combine_weights(ra.weight, rb.weight), end);
            cursor = end;
        }
        if ra.end <= end {
            ia += 1;
        }
        if rb.end <= end {
            ib += 1;
        }
    }
    // Ragged or clipped input: whatever is uncovered carries zero weight.
    if cursor < axis_max {
        push_run(&mut out, 0, axis_max);
    }
    out
}

// =============================================================================
// MaskPair
// =============================================================================

/// Both orientations of one mask, the common use case: the row mask yields
/// masked mass and the y centroid, the column mask the x centroid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskPair {
    pub rows: RowMask,
    pub cols: ColMask,
}

impl MaskPair {
    /// A fully opaque pair over `rect`.
    pub fn full(rect: Rect) -> Self {
        Self {
            rows: RowMask::full(rect),
            cols: ColMask::full(rect),
        }
    }

    /// Pair two orientations of the same region.
    pub fn new(rows: RowMask, cols: ColMask) -> Result<Self, MaskError> {
        if rows.rect() != cols.rect() {
            return Err(MaskError::RectMismatch {
                a: rows.rect(),
                b: cols.rect(),
            });
        }
        Ok(Self { rows, cols })
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        self.rows.rect()
    }

    pub fn intersect(&self, other: &Self) -> Result<Self, MaskError> {
        Ok(Self {
            rows: self.rows.intersect(&other.rows)?,
            cols: self.cols.intersect(&other.cols)?,
        })
    }

    /// Masked mass and center of mass over both orientations of a field.
    pub fn apply_to(&self, sums: &SumPair) -> Result<MaskedMoments, MaskError> {
        let by_rows = self.rows.apply_to(&sums.x)?;
        let by_cols = self.cols.apply_to(&sums.y)?;
        Ok(MaskedMoments {
            mass: by_rows.mass,
            coverage: by_rows.coverage,
            centroid: match (by_cols.centroid, by_rows.centroid) {
                (Some(cx), Some(cy)) => Some((cx, cy)),
                _ => None,
            },
        })
    }
}
