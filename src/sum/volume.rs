//! 3D prefix-sum table with an appendable frame axis.

use super::search::half_mass_coordinate;
use super::MassTable;
use crate::density::DensityField;
use crate::geom::{Axis, Rect, Region};

/// Errors from constructing or appending to a [`VolumeSum`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The table was created with zero frame capacity.
    #[error("frame capacity must be positive")]
    ZeroCapacity,
    /// An append was attempted on a full table; the table is unchanged.
    #[error("frame capacity exhausted ({cap_z} frames)")]
    CapacityExhausted { cap_z: usize },
}

/// The 3D extension of [`super::PlaneSum`]: the value at (x, y, z) is the
/// density summed over the box from the front-top-left corner up to and
/// including (x, y, z). The mass of any cuboid costs eight corner queries.
///
/// Frames are appended, never removed or reordered. Each append performs a
/// 2D prefix-sum build for the new frame and then accumulates the previous
/// frame's totals into it. Appending past the declared capacity is a
/// rejected, effect-free error; splitting code must never run concurrently
/// with an append (the tree's `&mut` access enforces this).
///
/// A whole frame sequence lives in memory, so use with care at high
/// resolutions.
#[derive(Debug, Clone)]
pub struct VolumeSum {
    /// The value at (x, y, z) lives at
    /// `values[z * width * height + (y - min_y) * stride + (x - min_x)]`.
    values: Box<[u64]>,
    stride: usize,
    rect: Rect,
    len_z: usize,
    cap_z: usize,
}

impl VolumeSum {
    /// An empty table over `rect` with room for `cap_z` frames.
    pub fn new(rect: Rect, cap_z: usize) -> Result<Self, FrameError> {
        if cap_z == 0 {
            return Err(FrameError::ZeroCapacity);
        }
        let w = rect.width() as usize;
        let h = rect.height() as usize;
        debug_assert!(
            w as u128 * h as u128 * cap_z as u128 * u16::MAX as u128 <= 1 << 61,
            "accumulated mass may overflow the 64-bit corner arithmetic"
        );
        Ok(Self {
            values: vec![0u64; w * h * cap_z].into_boxed_slice(),
            stride: w,
            rect,
            len_z: 0,
            cap_z,
        })
    }

    /// Build from the first frame, reserving capacity for `cap_z` in total.
    pub fn from_frame(frame: &DensityField, cap_z: usize) -> Result<Self, FrameError> {
        let mut volume = Self::new(frame.rect(), cap_z)?;
        volume.push_frame(frame)?;
        Ok(volume)
    }

    #[inline]
    fn offset(&self, x: i32, y: i32, z: i32) -> usize {
        z as usize * self.stride * self.rect.height() as usize
            + (y - self.rect.min_y) as usize * self.stride
            + (x - self.rect.min_x) as usize
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Number of frames appended so far.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.len_z
    }

    /// Declared frame capacity.
    #[inline]
    pub fn cap_z(&self) -> usize {
        self.cap_z
    }

    /// Frames that can still be appended.
    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.cap_z - self.len_z
    }

    /// Append one frame.
    ///
    /// Only the part of the frame overlapping the table's bounds is
    /// ingested; the rest is clipped silently, and a frame with no overlap
    /// at all is ignored. Appending to a full table returns
    /// [`FrameError::CapacityExhausted`] and changes nothing.
    pub fn push_frame(&mut self, frame: &DensityField) -> Result<(), FrameError> {
        if self.len_z == self.cap_z {
            return Err(FrameError::CapacityExhausted { cap_z: self.cap_z });
        }
        if frame.rect().intersect(&self.rect).is_empty() {
            return Ok(());
        }

        let w = self.stride;
        let h = self.rect.height() as usize;
        let layer = self.len_z * w * h;

        // 2D build for the new frame; out-of-frame samples read as zero,
        // which is what clips a partially overlapping frame.
        for y in 0..h {
            let mut run = 0u64;
            for x in 0..w {
                run += frame
                    .value_at(self.rect.min_x + x as i32, self.rect.min_y + y as i32)
                    as u64;
                let idx = layer + y * w + x;
                self.values[idx] = run;
                if y > 0 {
                    self.values[idx] += self.values[idx - w];
                }
            }
        }

        // Accumulate the previous frame's totals (3D recurrence).
        if self.len_z > 0 {
            for i in 0..w * h {
                self.values[layer + i] += self.values[layer - w * h + i];
            }
        }
        self.len_z += 1;
        Ok(())
    }

    /// The prefix value at (x, y, z), or zero outside the bounds or the
    /// appended frame range.
    #[inline]
    pub fn value_at(&self, x: i32, y: i32, z: i32) -> u64 {
        if self.rect.contains(x, y) && z >= 0 && (z as usize) < self.len_z {
            self.values[self.offset(x, y, z)]
        } else {
            0
        }
    }

    /// The prefix value of the complement density: covered volume times
    /// 65535 minus [`value_at`](Self::value_at). Zero outside the bounds.
    #[inline]
    pub fn neg_value_at(&self, x: i32, y: i32, z: i32) -> u64 {
        if self.rect.contains(x, y) && z >= 0 && (z as usize) < self.len_z {
            let volume = (x + 1 - self.rect.min_x) as u64
                * (y + 1 - self.rect.min_y) as u64
                * (z + 1) as u64;
            volume * u16::MAX as u64 - self.values[self.offset(x, y, z)]
        } else {
            0
        }
    }

    /// The single voxel's density at (x, y, z), reconstructed by corner
    /// differencing; zero outside the bounds.
    pub fn density_at(&self, x: i32, y: i32, z: i32) -> u16 {
        if !self.rect.contains(x, y) || z < 0 || z as usize >= self.len_z {
            return 0;
        }
        let slab = |z: i32| {
            (self.value_at(x, y, z) + self.value_at(x - 1, y - 1, z))
                - self.value_at(x - 1, y, z)
                - self.value_at(x, y - 1, z)
        };
        (slab(z) - slab(z - 1)) as u16
    }

    fn clip_z(&self, zmin: i32, zmax: i32) -> (i32, i32) {
        (zmin.max(0), zmax.min(self.len_z as i32))
    }

    /// Mass of the half-open box `r x [zmin, zmax)`, clipped to the bounds
    /// and the appended frame range: the eight-corner inclusion-exclusion.
    pub fn range_mass(&self, r: Rect, zmin: i32, zmax: i32) -> u64 {
        let r = r.intersect(&self.rect);
        let (zmin, zmax) = self.clip_z(zmin, zmax);
        if r.is_empty() || zmin >= zmax {
            return 0;
        }
        let slab = |z: i32| {
            (self.value_at(r.max_x - 1, r.max_y - 1, z)
                + self.value_at(r.min_x - 1, r.min_y - 1, z))
                - self.value_at(r.min_x - 1, r.max_y - 1, z)
                - self.value_at(r.max_x - 1, r.min_y - 1, z)
        };
        slab(zmax - 1) - slab(zmin - 1)
    }

    /// Mass of the complement density over the box: covered volume times
    /// 65535 minus [`range_mass`](Self::range_mass).
    pub fn neg_range_mass(&self, r: Rect, zmin: i32, zmax: i32) -> u64 {
        let r = r.intersect(&self.rect);
        let (zmin, zmax) = self.clip_z(zmin, zmax);
        if r.is_empty() || zmin >= zmax {
            return 0;
        }
        r.area() * (zmax - zmin) as u64 * u16::MAX as u64 - self.range_mass(r, zmin, zmax)
    }

    /// Total mass of all appended frames.
    #[inline]
    pub fn mass(&self) -> u64 {
        self.range_mass(self.rect, 0, self.len_z as i32)
    }

    // One balance search per axis; `v` is either `value_at` or
    // `neg_value_at`. The region's fixed corner values are captured once,
    // so each search step re-queries only the moving boundary.

    fn balance_x(&self, r: Rect, zmin: i32, zmax: i32, v: &impl Fn(&Self, i32, i32, i32) -> u64) -> i32 {
        let r = r.intersect(&self.rect);
        let (zmin, zmax) = self.clip_z(zmin, zmax);
        if r.is_empty() || zmin >= zmax {
            return 0;
        }
        let (my, ny, zt, zb) = (r.max_y - 1, r.min_y - 1, zmax - 1, zmin - 1);
        let x0 = r.min_x - 1;
        let pos_k = v(self, x0, ny, zt) + v(self, x0, my, zb);
        let neg_k = v(self, x0, my, zt) + v(self, x0, ny, zb);
        half_mass_coordinate(r.min_x, r.max_x, |c| {
            ((v(self, c - 1, my, zt) - v(self, c - 1, ny, zt)) + v(self, c - 1, ny, zb)
                - v(self, c - 1, my, zb)
                + pos_k)
                - neg_k
        })
    }

    fn balance_y(&self, r: Rect, zmin: i32, zmax: i32, v: &impl Fn(&Self, i32, i32, i32) -> u64) -> i32 {
        let r = r.intersect(&self.rect);
        let (zmin, zmax) = self.clip_z(zmin, zmax);
        if r.is_empty() || zmin >= zmax {
            return 0;
        }
        let (mx, nx, zt, zb) = (r.max_x - 1, r.min_x - 1, zmax - 1, zmin - 1);
        let y0 = r.min_y - 1;
        let pos_k = v(self, nx, y0, zt) + v(self, mx, y0, zb);
        let neg_k = v(self, mx, y0, zt) + v(self, nx, y0, zb);
        half_mass_coordinate(r.min_y, r.max_y, |c| {
            ((v(self, mx, c - 1, zt) - v(self, nx, c - 1, zt)) + v(self, nx, c - 1, zb)
                - v(self, mx, c - 1, zb)
                + pos_k)
                - neg_k
        })
    }

    fn balance_z(&self, r: Rect, zmin: i32, zmax: i32, v: &impl Fn(&Self, i32, i32, i32) -> u64) -> i32 {
        let r = r.intersect(&self.rect);
        let (zmin, zmax) = self.clip_z(zmin, zmax);
        if r.is_empty() || zmin >= zmax {
            return 0;
        }
        let (mx, nx, my, ny) = (r.max_x - 1, r.min_x - 1, r.max_y - 1, r.min_y - 1);
        let slab = |z: i32| {
            (v(self, mx, my, z) + v(self, nx, ny, z)) - v(self, nx, my, z) - v(self, mx, ny, z)
        };
        let base = slab(zmin - 1);
        half_mass_coordinate(zmin, zmax, |c| slab(c - 1) - base)
    }

    /// The x coordinate nearest the plane dividing the box's mass in half.
    /// Degenerate regions return 0.
    pub fn find_cx(&self, r: Rect, zmin: i32, zmax: i32) -> i32 {
        self.balance_x(r, zmin, zmax, &Self::value_at)
    }

    /// The y coordinate nearest the plane dividing the box's mass in half.
    pub fn find_cy(&self, r: Rect, zmin: i32, zmax: i32) -> i32 {
        self.balance_y(r, zmin, zmax, &Self::value_at)
    }

    /// The frame index nearest the plane dividing the box's mass in half.
    pub fn find_cz(&self, r: Rect, zmin: i32, zmax: i32) -> i32 {
        self.balance_z(r, zmin, zmax, &Self::value_at)
    }

    /// Like [`find_cx`](Self::find_cx) on the complement density.
    pub fn find_neg_cx(&self, r: Rect, zmin: i32, zmax: i32) -> i32 {
        self.balance_x(r, zmin, zmax, &Self::neg_value_at)
    }

    /// Like [`find_cy`](Self::find_cy) on the complement density.
    pub fn find_neg_cy(&self, r: Rect, zmin: i32, zmax: i32) -> i32 {
        self.balance_y(r, zmin, zmax, &Self::neg_value_at)
    }

    /// Like [`find_cz`](Self::find_cz) on the complement density.
    pub fn find_neg_cz(&self, r: Rect, zmin: i32, zmax: i32) -> i32 {
        self.balance_z(r, zmin, zmax, &Self::neg_value_at)
    }
}

impl MassTable for VolumeSum {
    fn domain(&self) -> Region {
        Region::new(self.rect, 0, self.len_z as i32)
    }

    fn mass(&self, region: &Region) -> u64 {
        self.range_mass(region.rect, region.zmin, region.zmax)
    }

    fn pole(&self, region: &Region, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.find_cx(region.rect, region.zmin, region.zmax),
            Axis::Y => self.find_cy(region.rect, region.zmin, region.zmax),
            Axis::Z => self.find_cz(region.rect, region.zmin, region.zmax),
        }
    }

    fn antipole(&self, region: &Region, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.find_neg_cx(region.rect, region.zmin, region.zmax),
            Axis::Y => self.find_neg_cy(region.rect, region.zmin, region.zmax),
            Axis::Z => self.find_neg_cz(region.rect, region.zmin, region.zmax),
        }
    }
}
