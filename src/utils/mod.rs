use std::f64::consts::{PI, TAU};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::data::column::Column;

/// Enumerations for coordinate systems and vector families.
pub mod enums;
/// Scalar two-dimensional, three-dimensional, and Lorentz vectors. These are the kernels every
/// columnar and jagged operation is built from.
pub mod vectors;

/// The tolerance used by the geometric predicates (`is_parallel`, `is_lightlike`, ...) when no
/// other tolerance is appropriate.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Widest row a kernel can read at once (two Lorentz vectors plus headroom).
const MAX_LANES: usize = 12;

/// Values which flatten into a fixed number of `f64` lanes, one per stored column.
pub trait Lanes: Sized {
    /// number of f64 lanes produced
    const NCOMP: usize;
    /// write the components into `dst`, which has exactly [`Lanes::NCOMP`] entries
    fn write_lanes(&self, dst: &mut [f64]);
    /// rebuild a value from exactly [`Lanes::NCOMP`] entries
    fn read_lanes(src: &[f64]) -> Self;
}

impl Lanes for f64 {
    const NCOMP: usize = 1;
    fn write_lanes(&self, dst: &mut [f64]) {
        dst[0] = *self;
    }
    fn read_lanes(src: &[f64]) -> Self {
        src[0]
    }
}

impl<const N: usize> Lanes for [f64; N] {
    const NCOMP: usize = N;
    fn write_lanes(&self, dst: &mut [f64]) {
        dst.copy_from_slice(self);
    }
    fn read_lanes(src: &[f64]) -> Self {
        std::array::from_fn(|i| src[i])
    }
}

impl<A: Lanes, B: Lanes> Lanes for (A, B) {
    const NCOMP: usize = A::NCOMP + B::NCOMP;
    fn write_lanes(&self, dst: &mut [f64]) {
        let (a, b) = dst.split_at_mut(A::NCOMP);
        self.0.write_lanes(a);
        self.1.write_lanes(b);
    }
    fn read_lanes(src: &[f64]) -> Self {
        let (a, b) = src.split_at(A::NCOMP);
        (A::read_lanes(a), B::read_lanes(b))
    }
}

/// Apply a scalar kernel `f` to every row of the given columns.
///
/// The columns are read as the lanes of `I` in order, so `inputs.len()` must equal `I::NCOMP`
/// and every column must have the same length. Any extra non-column arguments can be captured
/// in the closure.
pub fn vectorize<I, O, F>(inputs: &[&Column], f: F) -> Vec<O>
where
    I: Lanes,
    O: Send,
    F: Fn(I) -> O + Send + Sync,
{
    debug_assert_eq!(inputs.len(), I::NCOMP);
    debug_assert!(I::NCOMP <= MAX_LANES);
    let slices: Vec<&[f64]> = inputs.iter().map(|c| c.as_slice()).collect();
    let n = slices.first().map_or(0, |s| s.len());
    debug_assert!(slices.iter().all(|s| s.len() == n));
    let row = |i: usize| {
        let mut lanes = [0.0f64; MAX_LANES];
        for (lane, slice) in lanes.iter_mut().zip(&slices) {
            *lane = slice[i];
        }
        f(I::read_lanes(&lanes[..I::NCOMP]))
    };
    #[cfg(feature = "rayon")]
    {
        (0..n).into_par_iter().map(row).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        (0..n).map(row).collect()
    }
}

/// Scatter per-row values into one column per lane (serial scatter to keep order).
pub fn scatter<O: Lanes>(rows: &[O]) -> Vec<Column> {
    let mut comps: Vec<Vec<f64>> = (0..O::NCOMP)
        .map(|_| Vec::with_capacity(rows.len()))
        .collect();
    let mut tmp = [0.0f64; MAX_LANES];
    for row in rows {
        row.write_lanes(&mut tmp[..O::NCOMP]);
        for (comp, value) in comps.iter_mut().zip(&tmp) {
            comp.push(*value);
        }
    }
    comps.into_iter().map(Column::new).collect()
}

/// `+1`, `-1`, or `0` (not `signum`, which never returns zero).
#[inline]
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Wrap an azimuthal difference into $`[-\pi, \pi)`$.
#[inline]
pub fn wrap_phi(dphi: f64) -> f64 {
    (dphi + PI).rem_euclid(TAU) - PI
}

/// The cosine of the angle between two vectors given their dot product and squared magnitudes.
///
/// A zero-length vector is treated as parallel to everything, and rounding error is clipped so
/// the result is always a valid cosine.
#[inline]
pub fn cosdelta(dot: f64, mag2_a: f64, mag2_b: f64) -> f64 {
    let m = mag2_a * mag2_b;
    if m == 0.0 {
        return 1.0;
    }
    (dot / m.sqrt()).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::utils::vectors::{Vec2, Vec3};

    #[test]
    fn test_sign() {
        assert_eq!(sign(3.2), 1.0);
        assert_eq!(sign(-0.1), -1.0);
        assert_eq!(sign(0.0), 0.0);
    }

    #[test]
    fn test_wrap_phi() {
        assert_relative_eq!(wrap_phi(0.5), 0.5);
        assert_relative_eq!(wrap_phi(2.0 * PI - 0.5), -0.5, epsilon = 1e-12);
        assert_relative_eq!(wrap_phi(-2.0 * PI + 0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(wrap_phi(PI), -PI);
    }

    #[test]
    fn test_cosdelta_edges() {
        assert_eq!(cosdelta(0.0, 0.0, 4.0), 1.0);
        assert_eq!(cosdelta(-2.0000000001, 1.0, 4.0), -1.0);
        assert_relative_eq!(cosdelta(1.0, 1.0, 4.0), 0.5);
    }

    #[test]
    fn test_vectorize_and_scatter() {
        let x = Column::new(vec![1.0, 2.0, 3.0]);
        let y = Column::new(vec![4.0, 5.0, 6.0]);
        let rotated: Vec<Vec2> = vectorize(&[&x, &y], |v: Vec2| Vec2::new(-v.y, v.x));
        let cols = scatter(&rotated);
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].to_vec(), vec![-4.0, -5.0, -6.0]);
        assert_eq!(cols[1].to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_vectorize_pairs() {
        let a = [
            Column::new(vec![1.0, 0.0]),
            Column::new(vec![0.0, 1.0]),
            Column::new(vec![0.0, 0.0]),
        ];
        let b = [
            Column::new(vec![0.0, 0.0]),
            Column::new(vec![1.0, 0.0]),
            Column::new(vec![0.0, 1.0]),
        ];
        let inputs: Vec<&Column> = a.iter().chain(b.iter()).collect();
        let crossed: Vec<Vec3> = vectorize(&inputs, |(u, v): (Vec3, Vec3)| u.cross(&v));
        assert_eq!(crossed[0], Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(crossed[1], Vec3::new(1.0, 0.0, 0.0));
    }
}
