//! Segment preparation and clipping shared by all tracers.
use glam::DVec3;
use mint::Vector3;
use tracing::warn;

/// Fraction of a voxel the clipped endpoints are pulled inward before locating their voxels,
/// so endpoints on a face resolve to the voxel the segment actually runs through.
const ENDPOINT_INSET: f64 = 1e-3;

/// Offset of [`ENDPOINT_INSET`] voxels along `delta`, whose length is `span` voxels.
/// Never more than half the segment.
#[inline]
pub(crate) fn endpoint_inset(delta: DVec3, span: f64) -> DVec3 {
    delta * (ENDPOINT_INSET / span).min(0.5)
}

/// Converts the endpoints to `f64`, rejecting zero-length and non-finite segments.
pub(crate) fn prepare(start: Vector3<f32>, end: Vector3<f32>) -> Option<(DVec3, DVec3)> {
    let a = DVec3::new(start.x as f64, start.y as f64, start.z as f64);
    let b = DVec3::new(end.x as f64, end.y as f64, end.z as f64);
    if !a.is_finite() || !b.is_finite() {
        warn!("ignoring trace with non-finite endpoints {a} -> {b}");
        return None;
    }
    if a == b {
        return None;
    }
    Some((a, b))
}

/// `true` if both endpoints lie beyond the same face of the box on some axis.
pub(crate) fn outside_same_side(a: DVec3, b: DVec3, min: DVec3, max: DVec3) -> bool {
    (a.cmpge(max) & b.cmpge(max)).any() || (a.cmple(min) & b.cmple(min)).any()
}

/// Parameter interval `[t0, t1] ⊂ [0, 1]` of `a + t (b - a)` inside the box (Liang-Barsky).
pub(crate) fn clip_to_box(a: DVec3, b: DVec3, min: DVec3, max: DVec3) -> Option<(f64, f64)> {
    let d = b - a;
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for axis in 0..3 {
        if d[axis] == 0.0 {
            if a[axis] < min[axis] || a[axis] > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d[axis];
        let mut lo = (min[axis] - a[axis]) * inv;
        let mut hi = (max[axis] - a[axis]) * inv;
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        t0 = t0.max(lo);
        t1 = t1.min(hi);
        if t0 >= t1 {
            return None;
        }
    }
    Some((t0, t1))
}

/// Parameter interval of `a + t (b - a)` inside the origin-centred sphere of `radius`.
pub(crate) fn clip_to_sphere(a: DVec3, b: DVec3, radius: f64) -> Option<(f64, f64)> {
    let d = b - a;
    let roots = quadratic_roots(d.dot(d), 2.0 * a.dot(d), a.dot(a) - radius * radius)?;
    let (lo, hi) = roots;
    let t0 = lo.max(0.0);
    let t1 = hi.min(1.0);
    (t0 < t1).then_some((t0, t1))
}

/// Real roots of `a t² + b t + c = 0` in ascending order. Degenerates to the linear root
/// (reported twice) when `a` vanishes; `None` without a real crossing.
pub(crate) fn quadratic_roots(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    let scale = a.abs().max(b.abs()).max(c.abs());
    if scale == 0.0 {
        return None;
    }
    if a.abs() <= 1e-12 * scale {
        if b == 0.0 {
            return None;
        }
        let t = -c / b;
        return Some((t, t));
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    // Numerically stable form avoiding cancellation between -b and sq.
    let q = -0.5 * (b + b.signum() * sq);
    let (r0, r1) = if q == 0.0 {
        (0.0, 0.0)
    } else {
        (q / a, c / q)
    };
    Some((r0.min(r1), r0.max(r1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_rejects_degenerate_segments() {
        let p = Vector3::from([0.5f32, 0.5, 0.5]);
        assert!(prepare(p, p).is_none());
        assert!(prepare(p, Vector3::from([f32::NAN, 0.0, 0.0])).is_none());
        assert!(prepare(p, Vector3::from([0.5f32, 0.5, 1.0])).is_some());
    }

    #[test]
    fn box_clipping_trims_to_faces() {
        let (t0, t1) = clip_to_box(
            DVec3::new(0.5, 0.5, -1.0),
            DVec3::new(0.5, 0.5, 2.0),
            DVec3::ZERO,
            DVec3::ONE,
        )
        .unwrap();
        assert!((t0 - 1.0 / 3.0).abs() < 1e-12);
        assert!((t1 - 2.0 / 3.0).abs() < 1e-12);

        assert!(clip_to_box(
            DVec3::new(2.0, 2.0, 2.0),
            DVec3::new(3.5, 3.5, 3.0),
            DVec3::ZERO,
            DVec3::ONE
        )
        .is_none());
        assert!(clip_to_box(
            DVec3::new(2.0, 0.5, 0.5),
            DVec3::new(2.0, 0.6, 0.6),
            DVec3::ZERO,
            DVec3::ONE
        )
        .is_none());
    }

    #[test]
    fn same_side_detection() {
        let (min, max) = (DVec3::ZERO, DVec3::ONE);
        assert!(outside_same_side(
            DVec3::splat(-2.0),
            DVec3::new(-3.5, -3.5, -3.0),
            min,
            max
        ));
        assert!(outside_same_side(
            DVec3::new(0.5, 1.0, 0.5),
            DVec3::new(0.2, 1.5, 0.5),
            min,
            max
        ));
        assert!(!outside_same_side(
            DVec3::new(0.5, 0.5, 0.0),
            DVec3::new(0.5, 0.5, 1.0),
            min,
            max
        ));
    }

    #[test]
    fn sphere_clipping() {
        let (t0, t1) =
            clip_to_sphere(DVec3::new(-2.0, 0.0, 0.0), DVec3::new(2.0, 0.0, 0.0), 1.0).unwrap();
        assert!((t0 - 0.25).abs() < 1e-12);
        assert!((t1 - 0.75).abs() < 1e-12);
        assert!(clip_to_sphere(DVec3::new(-2.0, 2.0, 0.0), DVec3::new(2.0, 2.0, 0.0), 1.0).is_none());
        let (t0, t1) = clip_to_sphere(DVec3::ZERO, DVec3::new(0.5, 0.0, 0.0), 1.0).unwrap();
        assert_eq!((t0, t1), (0.0, 1.0));
    }

    #[test]
    fn quadratic_roots_cover_degenerate_cases() {
        assert_eq!(quadratic_roots(1.0, -3.0, 2.0), Some((1.0, 2.0)));
        assert_eq!(quadratic_roots(0.0, 2.0, -1.0), Some((0.5, 0.5)));
        assert_eq!(quadratic_roots(1.0, 0.0, 1.0), None);
        assert_eq!(quadratic_roots(1.0, 0.0, 0.0), Some((0.0, 0.0)));
    }
}
