//! Dense density fields with cached moments.

use ndarray::ArrayView2;

use super::model::{DensityModel, Rgba};
use crate::geom::Rect;

/// A finite rectangular grid of density values, usually converted from the
/// pixels of one frame.
///
/// The field caches its total mass and the mass-weighted x and y sums, so
/// the center of mass and mean density are O(1). Point mutation through
/// [`set`](Self::set) keeps the cache consistent.
///
/// Out-of-bounds reads return a density of zero; this is a documented
/// contract, not an error.
#[derive(Debug, Clone)]
pub struct DensityField {
    /// The value at (x, y) lives at `values[(y - min_y) * stride + (x - min_x)]`.
    values: Box<[u16]>,
    stride: usize,
    rect: Rect,
    // Total mass and weighed x/y, relative to the top-left corner.
    mass: u64,
    wx: u64,
    wy: u64,
}

impl DensityField {
    /// An all-zero field over `rect`. An empty rectangle yields an empty
    /// field whose every query returns zero.
    pub fn new(rect: Rect) -> Self {
        let len = rect.area() as usize;
        Self {
            values: vec![0; len].into_boxed_slice(),
            stride: rect.width() as usize,
            rect,
            mass: 0,
            wx: 0,
            wy: 0,
        }
    }

    /// Convert one frame of pixels with `model`. The field's rectangle has
    /// its origin at (0, 0) and the frame's dimensions.
    pub fn from_frame<M: DensityModel>(frame: ArrayView2<'_, Rgba>, model: &M) -> Self {
        let (height, width) = frame.dim();
        let mut field = Self::new(Rect::from_size(width as i32, height as i32));
        for y in 0..height {
            for x in 0..width {
                field.init_set(x as i32, y as i32, model.convert(frame[[y, x]]));
            }
        }
        field
    }

    /// Fill a field by sampling `f` at every coordinate of `rect`.
    pub fn from_fn(rect: Rect, mut f: impl FnMut(i32, i32) -> u16) -> Self {
        let mut field = Self::new(rect);
        for y in rect.min_y..rect.max_y {
            for x in rect.min_x..rect.max_x {
                field.init_set(x, y, f(x, y));
            }
        }
        field
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        (y - self.rect.min_y) as usize * self.stride + (x - self.rect.min_x) as usize
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// The density at (x, y), or zero outside the bounds.
    #[inline]
    pub fn value_at(&self, x: i32, y: i32) -> u16 {
        if self.rect.contains(x, y) {
            self.values[self.offset(x, y)]
        } else {
            0
        }
    }

    /// Set the density at (x, y), updating the cached moments by removing
    /// the old value and adding the new one. Out-of-bounds writes are
    /// ignored.
    pub fn set(&mut self, x: i32, y: i32, v: u16) {
        if !self.rect.contains(x, y) {
            return;
        }
        let i = self.offset(x, y);

        let old = self.values[i] as u64;
        self.mass -= old;
        self.wx -= old * (x - self.rect.min_x) as u64;
        self.wy -= old * (y - self.rect.min_y) as u64;

        self.values[i] = v;
        let new = v as u64;
        self.mass += new;
        self.wx += new * (x - self.rect.min_x) as u64;
        self.wy += new * (y - self.rect.min_y) as u64;
    }

    /// Like [`set`](Self::set), but assumes the previous value was zero,
    /// skipping the removal half of the moment update. Used by constructors.
    pub fn init_set(&mut self, x: i32, y: i32, v: u16) {
        if !self.rect.contains(x, y) {
            return;
        }
        self.values[self.offset(x, y)] = v;

        let dv = v as u64;
        self.mass += dv;
        self.wx += dv * (x - self.rect.min_x) as u64;
        self.wy += dv * (y - self.rect.min_y) as u64;
    }

    /// Total mass: density integrated over the field.
    #[inline]
    pub fn mass(&self) -> u64 {
        self.mass
    }

    /// The center of mass in absolute coordinates, or `None` for a massless
    /// field.
    pub fn center_of_mass(&self) -> Option<(f64, f64)> {
        if self.mass == 0 {
            return None;
        }
        let x = self.rect.min_x as f64 + self.wx as f64 / self.mass as f64;
        let y = self.rect.min_y as f64 + self.wy as f64 / self.mass as f64;
        Some((x, y))
    }

    /// Mean density over the field's area; zero for an empty field.
    pub fn mean_density(&self) -> f64 {
        let area = self.rect.area();
        if area == 0 {
            0.0
        } else {
            self.mass as f64 / area as f64
        }
    }
}
