//! Synthetic density fields shared by unit and integration tests.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::density::DensityField;
use crate::geom::Rect;

/// Every pixel at `value`.
pub fn uniform_field(width: i32, height: i32, value: u16) -> DensityField {
    DensityField::from_fn(Rect::from_size(width, height), |_, _| value)
}

/// All mass concentrated in one pixel.
pub fn point_mass_field(width: i32, height: i32, x: i32, y: i32, value: u16) -> DensityField {
    DensityField::from_fn(Rect::from_size(width, height), |px, py| {
        if px == x && py == y {
            value
        } else {
            0
        }
    })
}

/// Density increasing left-to-right, top-to-bottom. Intended for small
/// fields; values scale with the pixel index.
pub fn gradient_field(width: i32, height: i32) -> DensityField {
    DensityField::from_fn(Rect::from_size(width, height), |x, y| {
        ((y * width + x) as u32 * 100).min(u16::MAX as u32) as u16
    })
}

/// Uniformly random densities from a seeded generator; the same seed
/// always produces the same field.
pub fn random_field(width: i32, height: i32, seed: u64) -> DensityField {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    DensityField::from_fn(Rect::from_size(width, height), |_, _| rng.random())
}

/// A sequence of seeded random frames of one size.
pub fn random_frames(width: i32, height: i32, frames: usize, seed: u64) -> Vec<DensityField> {
    (0..frames)
        .map(|i| random_field(width, height, seed.wrapping_add(i as u64)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_mass() {
        assert_eq!(uniform_field(3, 2, 10).mass(), 60);
    }

    #[test]
    fn test_point_mass() {
        let field = point_mass_field(4, 4, 1, 2, 500);
        assert_eq!(field.mass(), 500);
        assert_eq!(field.value_at(1, 2), 500);
        assert_eq!(field.value_at(2, 1), 0);
    }

    #[test]
    fn test_random_field_is_deterministic() {
        let a = random_field(5, 5, 7);
        let b = random_field(5, 5, 7);
        for y in 0..5 {
            for x in 0..5 {
                assert_eq!(a.value_at(x, y), b.value_at(x, y));
            }
        }
        assert_ne!(random_field(5, 5, 8).mass(), a.mass());
    }
}
