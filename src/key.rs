// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Regions of the plane, and the keys that name them.
//!
//! A tile is named by the lower-left corner of its region and the
//! length of its side.  Keys are compared with exact floating-point
//! equality: two keys that describe the same square but were reached
//! through different arithmetic are different tiles.  The grid walk in
//! `viewport` always reaches a given square through the same sequence
//! of additions, so in practice a square has exactly one key.

// Large odd multipliers, one per coordinate, so that swapping x and y
// does not produce the same hash.
const X_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;
const Y_MULTIPLIER: u64 = 0xC2B2_AE3D_27D4_EB4F;
const STEP_MULTIPLIER: u64 = 0x1656_67B1_9E37_79F9;

/// A square on the real plane: `x_end - x_start == y_end - y_start`,
/// both strictly positive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Region {
    /// Left edge.
    pub x_start: f64,
    /// Bottom edge.
    pub y_start: f64,
    /// Right edge.
    pub x_end: f64,
    /// Top edge.
    pub y_end: f64,
}

impl Region {
    /// The length of a side of the square.
    pub fn side(&self) -> f64 {
        self.x_end - self.x_start
    }

    /// True if the point lies inside the region, counting the left
    /// and bottom edges but not the right and top ones, so that the
    /// regions of one grid never both contain the same point.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_start && x < self.x_end && y >= self.y_start && y < self.y_end
    }

    /// True if the two regions overlap with positive area.
    pub fn overlaps(&self, other: &Region) -> bool {
        self.x_start < other.x_end
            && other.x_start < self.x_end
            && self.y_start < other.y_end
            && other.y_start < self.y_end
    }
}

/// The name of a tile: the origin of its region and its side.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TileKey {
    /// Left edge of the region.
    pub x: f64,
    /// Bottom edge of the region.
    pub y: f64,
    /// Side of the region.
    pub step: f64,
}

impl TileKey {
    /// Build a key.  The grid walk never produces a key with a
    /// non-finite or non-positive step, and neither should anyone else.
    pub fn new(x: f64, y: f64, step: f64) -> TileKey {
        debug_assert!(x.is_finite() && y.is_finite());
        debug_assert!(step.is_finite() && step > 0.0);
        TileKey { x, y, step }
    }

    /// The region this key names.  The right and top edges are always
    /// computed as `origin + step`, the same arithmetic `matches` uses.
    pub fn region(&self) -> Region {
        Region {
            x_start: self.x,
            y_start: self.y,
            x_end: self.x + self.step,
            y_end: self.y + self.step,
        }
    }

    /// Mix the IEEE-754 bit patterns of the three coordinates.  The
    /// result depends on nothing but those bits, so it is the same on
    /// every call and in every process.
    pub fn hash_bits(&self) -> u64 {
        self.x
            .to_bits()
            .wrapping_mul(X_MULTIPLIER)
            .wrapping_add(self.y.to_bits().wrapping_mul(Y_MULTIPLIER))
            .wrapping_add(self.step.to_bits().wrapping_mul(STEP_MULTIPLIER))
    }

    /// The bucket of a table of `bucket_count` buckets this key lives in.
    pub fn bucket(&self, bucket_count: usize) -> usize {
        (self.hash_bits() % bucket_count as u64) as usize
    }

    /// Exact comparison against a stored region.
    pub fn matches(&self, region: &Region) -> bool {
        region.x_start == self.x
            && region.y_start == self.y
            && region.x_end == self.x + self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::distributions::{Distribution, Uniform};
    use rand::prelude::*;

    #[test]
    fn region_from_key_is_square() {
        let r = TileKey::new(-2.0, -1.25, 0.25).region();
        assert_eq!(r.x_end, -1.75);
        assert_eq!(r.y_end, -1.0);
        assert_eq!(r.side(), 0.25);
        assert_eq!(r.x_end - r.x_start, r.y_end - r.y_start);
    }

    #[test]
    fn hashing_is_stable() {
        let mut rng = rand::thread_rng();
        let coord = Uniform::new(-4.0_f64, 4.0);
        for _ in 0..1000 {
            let key = TileKey::new(
                coord.sample(&mut rng),
                coord.sample(&mut rng),
                2.0_f64.powi(rng.gen_range(-40, 4)),
            );
            let copy = TileKey::new(key.x, key.y, key.step);
            assert_eq!(key.hash_bits(), copy.hash_bits());
            assert_eq!(key.bucket(7789), copy.bucket(7789));
            assert!(key.bucket(7789) < 7789);
        }
    }

    #[test]
    fn hashing_does_not_depend_on_the_process() {
        // Pure function of the bits: this value can never change.
        let key = TileKey::new(0.0, 0.0, 1.0);
        let expected = 1.0_f64.to_bits().wrapping_mul(STEP_MULTIPLIER);
        assert_eq!(key.hash_bits(), expected);
    }

    #[test]
    fn swapped_coordinates_hash_apart() {
        let a = TileKey::new(0.25, 0.5, 0.25);
        let b = TileKey::new(0.5, 0.25, 0.25);
        assert_ne!(a.hash_bits(), b.hash_bits());
    }

    #[test]
    fn matching_is_exact() {
        let key = TileKey::new(0.1, 0.2, 0.125);
        assert!(key.matches(&key.region()));
        let nudged = TileKey::new(0.1 + std::f64::EPSILON, 0.2, 0.125);
        assert!(!nudged.matches(&key.region()));
        let coarser = TileKey::new(0.1, 0.2, 0.25);
        assert!(!coarser.matches(&key.region()));
    }

    #[test]
    fn same_square_through_other_arithmetic_is_another_key() {
        // 0.1 + 0.2 != 0.3 in binary floating point, so these name
        // different tiles even though they describe the "same" square.
        let walked = TileKey::new(0.1 + 0.2, 0.0, 0.5);
        let direct = TileKey::new(0.3, 0.0, 0.5);
        assert!(!direct.matches(&walked.region()));
    }

    #[test]
    fn containment_is_half_open() {
        let r = TileKey::new(0.0, 0.0, 1.0).region();
        assert!(r.contains(0.0, 0.0));
        assert!(r.contains(0.5, 0.999));
        assert!(!r.contains(1.0, 0.5));
        assert!(!r.contains(0.5, 1.0));
    }

    #[test]
    fn neighbours_do_not_overlap() {
        let a = TileKey::new(0.0, 0.0, 0.5).region();
        let b = TileKey::new(0.5, 0.0, 0.5).region();
        let c = TileKey::new(0.25, 0.25, 0.5).region();
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
    }
}
