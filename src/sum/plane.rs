//! 2D prefix-sum table.

use super::search::half_mass_coordinate;
use super::MassTable;
use crate::density::DensityField;
use crate::geom::{Axis, Rect, Region};

/// A table whose value at (x, y) is the density summed over the rectangle
/// from the table's top-left corner up to and including (x, y).
///
/// The mass of any rectangle then costs four corner queries. Values are
/// monotone non-decreasing along both axes; point queries outside the
/// bounds return zero.
///
/// Built once per source in a single pass. A point-update path exists for
/// completeness but propagates over the whole area below-right of the
/// touched pixel.
#[derive(Debug, Clone)]
pub struct PlaneSum {
    /// The value at (x, y) lives at `values[(y - min_y) * stride + (x - min_x)]`.
    values: Box<[u64]>,
    stride: usize,
    rect: Rect,
}

impl PlaneSum {
    /// Build from a density field in one O(width * height) pass.
    pub fn from_field(field: &DensityField) -> Self {
        Self::from_fn(field.rect(), |x, y| field.value_at(x, y))
    }

    /// Build by sampling `f` at every coordinate of `rect`.
    pub fn from_fn(rect: Rect, mut f: impl FnMut(i32, i32) -> u16) -> Self {
        let w = rect.width() as usize;
        let h = rect.height() as usize;
        let mut values = vec![0u64; w * h].into_boxed_slice();

        // First row: running x-sums only.
        let mut run = 0u64;
        for x in 0..w {
            run += f(rect.min_x + x as i32, rect.min_y) as u64;
            values[x] = run;
        }

        // Remaining rows: running x-sum plus the cell above.
        for y in 1..h {
            let mut run = 0u64;
            for x in 0..w {
                run += f(rect.min_x + x as i32, rect.min_y + y as i32) as u64;
                values[x + y * w] = run + values[x + (y - 1) * w];
            }
        }

        Self {
            values,
            stride: w,
            rect,
        }
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        (y - self.rect.min_y) as usize * self.stride + (x - self.rect.min_x) as usize
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// The prefix value at (x, y), or zero outside the bounds.
    #[inline]
    pub fn value_at(&self, x: i32, y: i32) -> u64 {
        if self.rect.contains(x, y) {
            self.values[self.offset(x, y)]
        } else {
            0
        }
    }

    /// The prefix value of the complement density: covered area times 65535
    /// minus [`value_at`](Self::value_at). Zero outside the bounds.
    #[inline]
    pub fn neg_value_at(&self, x: i32, y: i32) -> u64 {
        if self.rect.contains(x, y) {
            let area =
                (x + 1 - self.rect.min_x) as u64 * (y + 1 - self.rect.min_y) as u64;
            area * u16::MAX as u64 - self.values[self.offset(x, y)]
        } else {
            0
        }
    }

    /// The single pixel's density at (x, y), reconstructed by corner
    /// differencing; zero outside the bounds.
    pub fn density_at(&self, x: i32, y: i32) -> u16 {
        if !self.rect.contains(x, y) {
            return 0;
        }
        ((self.value_at(x, y) + self.value_at(x - 1, y - 1))
            - self.value_at(x - 1, y)
            - self.value_at(x, y - 1)) as u16
    }

    /// Mass of `r` intersected with the bounds: the standard four-corner
    /// inclusion-exclusion over the half-open rectangle.
    pub fn range_mass(&self, r: Rect) -> u64 {
        let r = r.intersect(&self.rect);
        if r.is_empty() {
            return 0;
        }
        (self.value_at(r.max_x - 1, r.max_y - 1) + self.value_at(r.min_x - 1, r.min_y - 1))
            - self.value_at(r.min_x - 1, r.max_y - 1)
            - self.value_at(r.max_x - 1, r.min_y - 1)
    }

    /// Mass of the complement density over `r`: covered area times 65535
    /// minus [`range_mass`](Self::range_mass). Locates the opposing pole
    /// without building a second table.
    pub fn neg_range_mass(&self, r: Rect) -> u64 {
        let r = r.intersect(&self.rect);
        r.area() * u16::MAX as u64 - self.range_mass(r)
    }

    /// Total mass of the table.
    #[inline]
    pub fn mass(&self) -> u64 {
        self.range_mass(self.rect)
    }

    /// Overwrite the density at (x, y). The delta propagates to every
    /// prefix value below-right of the pixel, so this is O(width * height);
    /// retained for completeness, not a hot path.
    pub fn set(&mut self, x: i32, y: i32, v: u16) {
        if !self.rect.contains(x, y) {
            return;
        }
        let delta = v as i64 - self.density_at(x, y) as i64;
        for j in y..self.rect.max_y {
            for i in x..self.rect.max_x {
                let idx = self.offset(i, j);
                self.values[idx] = self.values[idx].wrapping_add_signed(delta);
            }
        }
    }

    // One balance search per orientation; `v` is either `value_at` or
    // `neg_value_at`, so the positive and complement searches share the
    // corner-caching closures.

    fn balance_x(&self, r: Rect, v: &impl Fn(&Self, i32, i32) -> u64) -> i32 {
        let r = r.intersect(&self.rect);
        if r.is_empty() {
            return 0;
        }
        let (my, ny) = (r.max_y - 1, r.min_y - 1);
        let k_add = v(self, r.min_x - 1, ny);
        let k_sub = v(self, r.min_x - 1, my);
        half_mass_coordinate(r.min_x, r.max_x, |c| {
            (v(self, c - 1, my) + k_add) - v(self, c - 1, ny) - k_sub
        })
    }

    fn balance_y(&self, r: Rect, v: &impl Fn(&Self, i32, i32) -> u64) -> i32 {
        let r = r.intersect(&self.rect);
        if r.is_empty() {
            return 0;
        }
        let (mx, nx) = (r.max_x - 1, r.min_x - 1);
        let k_add = v(self, nx, r.min_y - 1);
        let k_sub = v(self, mx, r.min_y - 1);
        half_mass_coordinate(r.min_y, r.max_y, |c| {
            (v(self, mx, c - 1) + k_add) - v(self, nx, c - 1) - k_sub
        })
    }

    /// The x coordinate nearest the line dividing the mass of `r` in half.
    /// Degenerate regions return 0.
    pub fn find_cx(&self, r: Rect) -> i32 {
        self.balance_x(r, &Self::value_at)
    }

    /// The y coordinate nearest the line dividing the mass of `r` in half.
    pub fn find_cy(&self, r: Rect) -> i32 {
        self.balance_y(r, &Self::value_at)
    }

    /// Like [`find_cx`](Self::find_cx) on the complement density.
    pub fn find_neg_cx(&self, r: Rect) -> i32 {
        self.balance_x(r, &Self::neg_value_at)
    }

    /// Like [`find_cy`](Self::find_cy) on the complement density.
    pub fn find_neg_cy(&self, r: Rect) -> i32 {
        self.balance_y(r, &Self::neg_value_at)
    }
}

impl MassTable for PlaneSum {
    fn domain(&self) -> Region {
        Region::plane(self.rect)
    }

    fn mass(&self, region: &Region) -> u64 {
        if region.zmin >= 1 || region.zmax <= 0 {
            return 0;
        }
        self.range_mass(region.rect)
    }

    fn pole(&self, region: &Region, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.find_cx(region.rect),
            Axis::Y => self.find_cy(region.rect),
            Axis::Z => 0,
        }
    }

    fn antipole(&self, region: &Region, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.find_neg_cx(region.rect),
            Axis::Y => self.find_neg_cy(region.rect),
            Axis::Z => 0,
        }
    }
}
