//! Vector and index primitives.
//!
//! Vectors are glam value types with component-wise arithmetic against vectors and scalars.
//! The helpers here convert between voxel coordinates and the linear buffer offsets used by
//! every layer (`x` varies fastest, then `y`, then `z`).
pub use glam::{DVec3, UVec2, UVec3, Vec2, Vec3, Vec4};

/// Linear buffer offset of voxel `coords` in a grid of `dims` voxels.
#[inline]
pub fn linear_index(coords: UVec3, dims: UVec3) -> usize {
    coords.x as usize
        + coords.y as usize * dims.x as usize
        + coords.z as usize * dims.x as usize * dims.y as usize
}

/// Inverse of [`linear_index`].
#[inline]
pub fn coords_of(index: usize, dims: UVec3) -> UVec3 {
    let plane = dims.x as usize * dims.y as usize;
    let z = index / plane;
    let rem = index % plane;
    UVec3::new(
        (rem % dims.x as usize) as u32,
        (rem / dims.x as usize) as u32,
        z as u32,
    )
}

/// Number of voxels in a grid of `dims`.
#[inline]
pub fn voxel_count(dims: UVec3) -> usize {
    dims.x as usize * dims.y as usize * dims.z as usize
}

/// Returns `true` if `coords` addresses a voxel inside `dims`.
#[inline]
pub fn contains(coords: UVec3, dims: UVec3) -> bool {
    coords.cmplt(dims).all()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn rand_range(rng: &mut StdRng, lo: f32, hi: f32) -> f32 {
        let t = (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0);
        lo + t * (hi - lo)
    }

    fn approx_eq(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() <= 1e-4 * a.abs().max_element().max(1.0)
    }

    #[test]
    fn vec2_arithmetic() {
        let v = Vec2::new(1.0, 2.0);
        assert_eq!(v.x, 1.0);
        assert_eq!(v.y, 2.0);
        assert_ne!(v, Vec2::new(2.0, 1.0));
        assert_eq!(v + Vec2::ONE, Vec2::new(2.0, 3.0));
        assert_eq!(v - Vec2::ONE, Vec2::new(0.0, 1.0));
        assert_eq!(v * 2.0, Vec2::new(2.0, 4.0));
        assert_eq!(v / 2.0, Vec2::new(0.5, 1.0));
        assert_eq!(v / 2.0, 0.5 * v);
    }

    #[test]
    fn vec3_arithmetic() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_ne!(v, Vec3::new(2.0, 1.0, 3.0));
        assert_eq!(v + Vec3::ONE, Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(v - Vec3::ONE, Vec3::new(0.0, 1.0, 2.0));
        assert_eq!(v * 2.0, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(v / 2.0, Vec3::new(0.5, 1.0, 1.5));
        assert_eq!(v / 2.0, 0.5 * v);
    }

    #[test]
    fn vec4_arithmetic() {
        let v = Vec4::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(v.w, 4.0);
        assert_ne!(v, Vec4::new(2.0, 1.0, 3.0, 4.0));
        assert_eq!(v + Vec4::ONE, Vec4::new(2.0, 3.0, 4.0, 5.0));
        assert_eq!(v * 2.0, Vec4::new(2.0, 4.0, 6.0, 8.0));
        assert_eq!(v / 2.0, 0.5 * v);
    }

    #[test]
    fn uvec3_uses_integer_division() {
        let v = UVec3::new(1, 2, 3);
        assert_eq!(v + UVec3::ONE, UVec3::new(2, 3, 4));
        assert_eq!(v - UVec3::ONE, UVec3::new(0, 1, 2));
        assert_eq!(v * 2, UVec3::new(2, 4, 6));
        assert_eq!(2 * v, UVec3::new(2, 4, 6));
        assert_eq!(v / 2, UVec3::new(0, 1, 1));
    }

    #[test]
    fn random_vectors_satisfy_algebraic_identities() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        for _ in 0..256 {
            let a = Vec3::new(
                rand_range(&mut rng, -100.0, 100.0),
                rand_range(&mut rng, -100.0, 100.0),
                rand_range(&mut rng, -100.0, 100.0),
            );
            let b = Vec3::new(
                rand_range(&mut rng, -100.0, 100.0),
                rand_range(&mut rng, -100.0, 100.0),
                rand_range(&mut rng, -100.0, 100.0),
            );
            let s = rand_range(&mut rng, 0.1, 10.0);

            assert!(approx_eq(a + b - b, a), "{a} + {b} - {b}");
            assert_eq!(a * s, s * a);
            assert!(approx_eq((a * s) / s, a), "({a} * {s}) / {s}");
        }
    }

    #[test]
    fn random_integer_vectors_scale_exactly() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..256 {
            let a = UVec3::new(rng.next_u32() % 1000, rng.next_u32() % 1000, rng.next_u32() % 1000);
            let s = rng.next_u32() % 100 + 1;
            assert_eq!(a * s, s * a);
            assert_eq!((a * s) / s, a);
        }
    }

    #[test]
    fn linear_index_roundtrip() {
        let dims = UVec3::new(4, 3, 5);
        assert_eq!(linear_index(UVec3::new(1, 2, 3), dims), 1 + 2 * 4 + 3 * 12);
        for idx in 0..voxel_count(dims) {
            assert_eq!(linear_index(coords_of(idx, dims), dims), idx);
        }
    }

    #[test]
    fn contains_is_exclusive_at_upper_bound() {
        let dims = UVec3::new(2, 2, 2);
        assert!(contains(UVec3::new(1, 1, 1), dims));
        assert!(!contains(UVec3::new(2, 0, 0), dims));
    }
}
