//! Randomized equivalence tests for the prefix-sum tables: every
//! rectangle and box query must match a brute-force scan of the source
//! field.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use stippling::testing::{random_field, random_frames, uniform_field};
use stippling::{DensityField, PlaneSum, Rect, VolumeSum};

fn brute_rect_mass(field: &DensityField, r: Rect) -> u64 {
    let r = r.intersect(&field.rect());
    let mut mass = 0u64;
    for y in r.min_y..r.max_y {
        for x in r.min_x..r.max_x {
            mass += field.value_at(x, y) as u64;
        }
    }
    mass
}

fn random_rect(rng: &mut Xoshiro256PlusPlus, w: i32, h: i32) -> Rect {
    let x0 = rng.random_range(-1..w + 1);
    let x1 = rng.random_range(-1..w + 1);
    let y0 = rng.random_range(-1..h + 1);
    let y1 = rng.random_range(-1..h + 1);
    Rect::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
}

#[test]
fn plane_matches_brute_force() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0xD1CE);
    for seed in 0..8 {
        let (w, h) = (rng.random_range(1..12), rng.random_range(1..12));
        let field = random_field(w, h, seed);
        let sum = PlaneSum::from_field(&field);
        for _ in 0..50 {
            let r = random_rect(&mut rng, w, h);
            assert_eq!(
                sum.range_mass(r),
                brute_rect_mass(&field, r),
                "field {w}x{h} seed {seed}, rect {r:?}"
            );
        }
    }
}

#[test]
fn plane_values_are_monotone() {
    let field = random_field(10, 7, 99);
    let sum = PlaneSum::from_field(&field);
    for y in 0..7 {
        for x in 0..10 {
            if x > 0 {
                assert!(sum.value_at(x, y) >= sum.value_at(x - 1, y));
            }
            if y > 0 {
                assert!(sum.value_at(x, y) >= sum.value_at(x, y - 1));
            }
        }
    }
}

#[test]
fn plane_neg_mass_complements() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let field = random_field(9, 9, 3);
    let sum = PlaneSum::from_field(&field);
    for _ in 0..30 {
        let r = random_rect(&mut rng, 9, 9);
        let clipped = r.intersect(&field.rect());
        assert_eq!(
            sum.range_mass(r) + sum.neg_range_mass(r),
            clipped.area() * u16::MAX as u64
        );
    }
}

#[test]
fn plane_point_update_rebuilds_prefixes() {
    let field = random_field(6, 6, 11);
    let mut sum = PlaneSum::from_field(&field);
    let mut patched = field.clone();
    for &(x, y, v) in &[(0, 0, 40000u16), (5, 5, 0), (2, 4, 1234)] {
        sum.set(x, y, v);
        patched.set(x, y, v);
    }
    let fresh = PlaneSum::from_field(&patched);
    for y in 0..6 {
        for x in 0..6 {
            assert_eq!(sum.value_at(x, y), fresh.value_at(x, y));
        }
    }
}

#[test]
fn volume_matches_brute_force() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0xCAFE);
    let (w, h, n) = (6, 5, 4);
    let frames = random_frames(w, h, n, 0xF00D);
    let mut volume = VolumeSum::new(Rect::from_size(w, h), n).unwrap();
    for frame in &frames {
        volume.push_frame(frame).unwrap();
    }

    for _ in 0..80 {
        let r = random_rect(&mut rng, w, h);
        let z0 = rng.random_range(-1..n as i32 + 1);
        let z1 = rng.random_range(-1..n as i32 + 1);
        let (zmin, zmax) = (z0.min(z1), z0.max(z1));

        let mut expected = 0u64;
        for (z, frame) in frames.iter().enumerate() {
            if (z as i32) >= zmin && (z as i32) < zmax {
                expected += brute_rect_mass(frame, r);
            }
        }
        assert_eq!(
            volume.range_mass(r, zmin, zmax),
            expected,
            "box {r:?} z {zmin}..{zmax}"
        );
    }
}

#[test]
fn volume_clips_partial_frames() {
    // The table covers 4x4; the second frame covers only its lower-right
    // quadrant, offset so half of the frame falls outside.
    let mut volume = VolumeSum::new(Rect::from_size(4, 4), 2).unwrap();
    volume.push_frame(&uniform_field(4, 4, 10)).unwrap();
    let offset = DensityField::from_fn(Rect::new(2, 2, 6, 6), |_, _| 100);
    volume.push_frame(&offset).unwrap();

    assert_eq!(volume.len_z(), 2);
    // Frame 1 contributes only its 2x2 overlap.
    assert_eq!(volume.range_mass(Rect::from_size(4, 4), 1, 2), 4 * 100);
    assert_eq!(volume.density_at(3, 3, 1), 100);
    assert_eq!(volume.density_at(0, 0, 1), 0);
}

#[test]
fn centroid_symmetry_on_uniform_fields() {
    let sum = PlaneSum::from_field(&uniform_field(8, 6, 77));
    assert_eq!(sum.find_cx(Rect::from_size(8, 6)), 4);
    assert_eq!(sum.find_cy(Rect::from_size(8, 6)), 3);
    // The complement of a uniform field is uniform too.
    assert_eq!(sum.find_neg_cx(Rect::from_size(8, 6)), 4);
}

#[test]
fn centroid_agrees_with_exhaustive_scan() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0xBEEF);
    for seed in 0..6 {
        let (w, h) = (rng.random_range(2..10), rng.random_range(2..10));
        let field = random_field(w, h, seed);
        let sum = PlaneSum::from_field(&field);
        let r = field.rect();

        let total = sum.range_mass(r);
        let imbalance = |c: i32| {
            let left = sum.range_mass(Rect::new(r.min_x, r.min_y, c, r.max_y));
            left.abs_diff(total - left)
        };
        let best = (r.min_x..=r.max_x).map(imbalance).min().unwrap();
        let found = sum.find_cx(r);
        assert_eq!(
            imbalance(found),
            best,
            "field {w}x{h} seed {seed}: cut {found} is not minimal"
        );
    }
}
