use std::{
    fmt::{Debug, Display},
    ops::{Index, Range},
    sync::Arc,
};

#[cfg(feature = "rayon")]
use accurate::{sum::Klein, traits::*};
use auto_ops::{impl_op_ex, impl_op_ex_commutative};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{data::jagged::Content, HepvecError, HepvecResult};

/// A boolean mask produced by the geometric predicates.
pub type Mask = Vec<bool>;

/// A contiguous, immutable view into a shared buffer of `f64`s.
///
/// Cloning and slicing a [`Column`] never copies data: every view holds a reference-counted
/// handle on the same buffer. [`Column::make_mut`] copies the viewed range out before writing,
/// so a parent buffer is never changed through one of its views.
#[derive(Clone, Default)]
pub struct Column {
    buffer: Arc<Vec<f64>>,
    offset: usize,
    len: usize,
}

impl Column {
    /// Take ownership of `values` as a new buffer.
    pub fn new(values: Vec<f64>) -> Self {
        let len = values.len();
        Self {
            buffer: Arc::new(values),
            offset: 0,
            len,
        }
    }

    pub fn zeros(len: usize) -> Self {
        Self::full(len, 0.0)
    }

    /// A column of `len` copies of `value`.
    pub fn full(len: usize, value: f64) -> Self {
        Self::new(vec![value; len])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.buffer[self.offset..self.offset + self.len]
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.as_slice().to_vec()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.as_slice().iter().copied()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.as_slice().get(index).copied()
    }

    /// A zero-copy view of `range` within this column.
    pub fn slice(&self, range: Range<usize>) -> HepvecResult<Self> {
        if range.start > range.end || range.end > self.len {
            return Err(HepvecError::InvalidPartition(format!(
                "slice {}..{} is out of bounds for a column of length {}",
                range.start, range.end, self.len
            )));
        }
        Ok(Self {
            buffer: Arc::clone(&self.buffer),
            offset: self.offset + range.start,
            len: range.end - range.start,
        })
    }

    /// `true` if both columns are views into the same buffer.
    pub fn shares_buffer(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }

    /// Mutable access to the values, copying them into a private buffer first unless this view
    /// is the sole owner of the whole buffer.
    pub fn make_mut(&mut self) -> &mut [f64] {
        if self.offset != 0 || self.len != self.buffer.len() {
            self.buffer = Arc::new(self.to_vec());
            self.offset = 0;
        }
        Arc::make_mut(&mut self.buffer).as_mut_slice()
    }

    /// Apply `f` to every value.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync,
    {
        #[cfg(feature = "rayon")]
        let values = self.as_slice().par_iter().map(|v| f(*v)).collect();
        #[cfg(not(feature = "rayon"))]
        let values = self.as_slice().iter().map(|v| f(*v)).collect();
        Self::new(values)
    }

    /// Combine two columns of equal length elementwise.
    pub fn try_zip_map<F>(&self, other: &Self, f: F) -> HepvecResult<Self>
    where
        F: Fn(f64, f64) -> f64 + Send + Sync,
    {
        if self.len != other.len {
            return Err(HepvecError::LengthMismatch {
                expected: self.len,
                found: other.len,
            });
        }
        #[cfg(feature = "rayon")]
        let values = self
            .as_slice()
            .par_iter()
            .zip(other.as_slice().par_iter())
            .map(|(a, b)| f(*a, *b))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let values = self
            .as_slice()
            .iter()
            .zip(other.as_slice())
            .map(|(a, b)| f(*a, *b))
            .collect();
        Ok(Self::new(values))
    }

    /// Like [`Column::try_zip_map`], but panics on a length mismatch. This backs the arithmetic
    /// operators, which cannot return errors.
    pub fn zip_map<F>(&self, other: &Self, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync,
    {
        assert_eq!(
            self.len, other.len,
            "columns must have the same length to be combined"
        );
        match self.try_zip_map(other, f) {
            Ok(column) => column,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn sqrt(&self) -> Self {
        self.map(f64::sqrt)
    }

    pub fn abs(&self) -> Self {
        self.map(f64::abs)
    }

    pub fn powf(&self, exponent: f64) -> Self {
        self.map(|v| v.powf(exponent))
    }

    /// The sum of all values (compensated when `rayon` is enabled).
    pub fn sum(&self) -> f64 {
        #[cfg(feature = "rayon")]
        return self
            .as_slice()
            .par_iter()
            .copied()
            .parallel_sum_with_accumulator::<Klein<f64>>();
        #[cfg(not(feature = "rayon"))]
        return self.as_slice().iter().sum();
    }

    /// The sum of the values in `range`.
    pub fn sum_range(&self, range: Range<usize>) -> f64 {
        #[cfg(feature = "rayon")]
        return self.as_slice()[range]
            .iter()
            .copied()
            .sum_with_accumulator::<Klein<f64>>();
        #[cfg(not(feature = "rayon"))]
        return self.as_slice()[range].iter().sum();
    }
}

impl Content for Column {
    fn len(&self) -> usize {
        self.len
    }

    fn take(&self, indices: &[Option<usize>]) -> Self {
        let values = self.as_slice();
        Self::new(
            indices
                .iter()
                .map(|i| i.map_or(0.0, |i| values[i]))
                .collect(),
        )
    }
}

impl Content for Mask {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn take(&self, indices: &[Option<usize>]) -> Self {
        indices.iter().map(|i| i.is_some_and(|i| self[i])).collect()
    }
}

impl Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Index<usize> for Column {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl From<&[f64]> for Column {
    fn from(values: &[f64]) -> Self {
        Self::new(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Column {
    fn from(values: [f64; N]) -> Self {
        Self::new(values.to_vec())
    }
}

impl FromIterator<f64> for Column {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl_op_ex!(+ |a: &Column, b: &Column| -> Column { a.zip_map(b, |x, y| x + y) });
impl_op_ex!(-|a: &Column, b: &Column| -> Column { a.zip_map(b, |x, y| x - y) });
impl_op_ex!(*|a: &Column, b: &Column| -> Column { a.zip_map(b, |x, y| x * y) });
impl_op_ex!(/ |a: &Column, b: &Column| -> Column { a.zip_map(b, |x, y| x / y) });
impl_op_ex!(-|a: &Column| -> Column { a.map(|x| -x) });
impl_op_ex_commutative!(+ |a: &Column, b: &f64| -> Column { let b = *b; a.map(|x| x + b) });
impl_op_ex_commutative!(*|a: &Column, b: &f64| -> Column { let b = *b; a.map(|x| x * b) });
impl_op_ex!(-|a: &Column, b: &f64| -> Column { let b = *b; a.map(|x| x - b) });
impl_op_ex!(-|a: &f64, b: &Column| -> Column { let a = *a; b.map(|x| a - x) });
impl_op_ex!(/ |a: &Column, b: &f64| -> Column { let b = *b; a.map(|x| x / b) });
impl_op_ex!(/ |a: &f64, b: &Column| -> Column { let a = *a; b.map(|x| a / x) });

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_slices_share_buffer() {
        let column = Column::new((0..10).map(f64::from).collect());
        let view = column.slice(2..5).unwrap();
        assert_eq!(view.to_vec(), vec![2.0, 3.0, 4.0]);
        assert!(view.shares_buffer(&column));
        let inner = view.slice(1..3).unwrap();
        assert_eq!(inner.to_vec(), vec![3.0, 4.0]);
        assert!(inner.shares_buffer(&column));
        assert!(column.slice(8..11).is_err());
    }

    #[test]
    fn test_make_mut_copies_views() {
        let column = Column::new(vec![1.0, 2.0, 3.0]);
        let mut view = column.slice(1..3).unwrap();
        view.make_mut()[0] = 20.0;
        assert_eq!(view.to_vec(), vec![20.0, 3.0]);
        assert_eq!(column.to_vec(), vec![1.0, 2.0, 3.0]);
        assert!(!view.shares_buffer(&column));

        let mut shared = column.clone();
        shared.make_mut()[2] = 30.0;
        assert_eq!(column.to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(shared.to_vec(), vec![1.0, 2.0, 30.0]);
    }

    #[test]
    fn test_arithmetic() {
        let a = Column::from([1.0, 2.0, 3.0]);
        let b = Column::from([4.0, 5.0, 6.0]);
        assert_eq!((&a + &b).to_vec(), vec![5.0, 7.0, 9.0]);
        assert_eq!((&b - &a).to_vec(), vec![3.0, 3.0, 3.0]);
        assert_eq!((&a * 2.0).to_vec(), vec![2.0, 4.0, 6.0]);
        assert_eq!((6.0 / &a).to_vec(), vec![6.0, 3.0, 2.0]);
        assert_eq!((1.0 - &a).to_vec(), vec![0.0, -1.0, -2.0]);
        assert_eq!((-&a).to_vec(), vec![-1.0, -2.0, -3.0]);
        assert!(a.try_zip_map(&Column::zeros(2), |x, y| x + y).is_err());
    }

    #[test]
    #[should_panic(expected = "columns must have the same length")]
    fn test_arithmetic_length_mismatch_panics() {
        let _ = Column::zeros(3) + Column::zeros(4);
    }

    #[test]
    fn test_take_fills_missing_with_zero() {
        let a = Column::from([1.0, 2.0, 3.0]);
        assert_eq!(
            a.take(&[Some(2), None, Some(0)]).to_vec(),
            vec![3.0, 0.0, 1.0]
        );
        let mask: Mask = vec![true, false];
        assert_eq!(mask.take(&[Some(0), None, Some(1)]), vec![true, false, false]);
    }

    #[test]
    fn test_sums() {
        let a = Column::new(vec![0.1; 10]);
        assert_relative_eq!(a.sum(), 1.0, epsilon = 1e-15);
        assert_relative_eq!(a.sum_range(2..5), 0.3, epsilon = 1e-15);
    }
}
