//! Shape alignment of mixed scalar, flat, and jagged operands.
//!
//! Alignment happens in two phases. [`normalize`] brings every operand at one level to the
//! partition of the first jagged operand: scalars are expanded into full rows, flat columns
//! have their per-row value repeated across the row, and jagged operands with a different
//! partition are copied into the reference layout (zero-padded where their rows are shorter).
//! [`unwrap_jagged`] then peels the shared partition off, level by level, until only flat
//! columns of one common length remain. Elementwise kernels run on those flat columns and
//! [`Wrapper::wrap`] restores the nesting.
use std::sync::Arc;

use log::debug;

use crate::{
    data::{
        column::Column,
        jagged::{counts_to_offsets, Content, JaggedArray, Nested},
    },
    HepvecError, HepvecResult,
};

/// One input to the broadcast engine.
#[derive(Clone, Debug)]
pub enum Operand {
    Scalar(f64),
    Array(Nested<Column>),
}

impl Operand {
    pub fn is_scalar(&self) -> bool {
        matches!(self, Operand::Scalar(_))
    }

    fn as_jagged(&self) -> Option<&JaggedArray<Nested<Column>>> {
        match self {
            Operand::Array(Nested::Jagged(jagged)) => Some(jagged),
            _ => None,
        }
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Scalar(value)
    }
}

impl From<Column> for Operand {
    fn from(column: Column) -> Self {
        Operand::Array(Nested::Flat(column))
    }
}

impl From<Vec<f64>> for Operand {
    fn from(values: Vec<f64>) -> Self {
        Operand::Array(Nested::Flat(Column::new(values)))
    }
}

impl From<Nested<Column>> for Operand {
    fn from(array: Nested<Column>) -> Self {
        Operand::Array(array)
    }
}

impl From<JaggedArray<Nested<Column>>> for Operand {
    fn from(jagged: JaggedArray<Nested<Column>>) -> Self {
        Operand::Array(Nested::Jagged(jagged))
    }
}

/// The partitions removed by [`unwrap_jagged`], outermost first, as canonical offsets.
#[derive(Clone, Debug, Default)]
pub struct Wrapper {
    levels: Vec<Arc<[usize]>>,
}

impl Wrapper {
    /// Number of jagged levels which will be restored.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Restore the nesting around flat results.
    pub fn wrap<R: Content>(&self, flat: R) -> HepvecResult<Nested<R>> {
        self.wrap_nested(Nested::Flat(flat))
    }

    /// Restore the nesting around results which may already carry jagged levels of their own.
    pub fn wrap_nested<R: Content>(&self, inner: Nested<R>) -> HepvecResult<Nested<R>> {
        self.levels.iter().rev().try_fold(inner, |content, offsets| {
            Ok(Nested::Jagged(JaggedArray::from_offsets(offsets, content)?))
        })
    }
}

/// The length every operand is aligned to: the length of the first non-scalar operand.
pub fn target_length(operands: &[Operand]) -> HepvecResult<usize> {
    operands
        .iter()
        .find_map(|op| match op {
            Operand::Array(array) => Some(array.len()),
            Operand::Scalar(_) => None,
        })
        .ok_or(HepvecError::AllScalar)
}

/// Align every operand to a common length and (if any operand is jagged) to the partition of
/// the first jagged operand.
pub fn normalize(operands: &[Operand]) -> HepvecResult<Vec<Nested<Column>>> {
    let length = target_length(operands)?;
    let reference = operands.iter().find_map(Operand::as_jagged);
    operands
        .iter()
        .map(|op| align(op, reference, length))
        .collect()
}

fn align(
    op: &Operand,
    reference: Option<&JaggedArray<Nested<Column>>>,
    length: usize,
) -> HepvecResult<Nested<Column>> {
    let Some(reference) = reference else {
        return match op {
            Operand::Scalar(value) => Ok(Nested::Flat(Column::full(length, *value))),
            Operand::Array(array) => {
                check_length(length, array.len())?;
                Ok(array.clone())
            }
        };
    };
    match op {
        Operand::Scalar(value) => {
            let content_len = reference.stops().iter().copied().max().unwrap_or(0);
            Ok(Nested::Jagged(
                reference.with_content(Nested::Flat(Column::full(content_len, *value))),
            ))
        }
        Operand::Array(Nested::Flat(column)) => {
            check_length(length, column.len())?;
            let content_len = reference.stops().iter().copied().max().unwrap_or(0);
            let mut indices = vec![None; content_len];
            for (row, range) in reference.row_ranges().enumerate() {
                indices[range].fill(Some(row));
            }
            Ok(Nested::Jagged(
                reference.with_content(Nested::Flat(column.take(&indices))),
            ))
        }
        Operand::Array(Nested::Jagged(jagged)) => {
            check_length(length, jagged.len())?;
            if jagged.same_partition(reference) {
                return Ok(Nested::Jagged(jagged.clone()));
            }
            debug!(
                "realigning a jagged operand with {} rows onto the reference partition",
                jagged.len()
            );
            let content_len = reference.stops().iter().copied().max().unwrap_or(0);
            let mut indices = vec![None; content_len];
            for (row, (target, source)) in reference.row_ranges().zip(jagged.row_ranges()).enumerate()
            {
                if source.len() > target.len() {
                    return Err(HepvecError::RowOverflow {
                        row,
                        expected: target.len(),
                        found: source.len(),
                    });
                }
                for (slot, index) in indices[target].iter_mut().zip(source) {
                    *slot = Some(index);
                }
            }
            Ok(Nested::Jagged(
                reference.with_content(jagged.content().take(&indices)),
            ))
        }
    }
}

fn check_length(expected: usize, found: usize) -> HepvecResult<()> {
    if expected != found {
        return Err(HepvecError::LengthMismatch { expected, found });
    }
    Ok(())
}

/// Normalize the operands and strip every shared jagged level, returning the flat columns
/// (all of one length) together with the [`Wrapper`] which restores the nesting.
pub fn unwrap_jagged(operands: &[Operand]) -> HepvecResult<(Wrapper, Vec<Column>)> {
    let mut wrapper = Wrapper::default();
    let mut current = normalize(operands)?;
    loop {
        let jagged: Option<Vec<&JaggedArray<Nested<Column>>>> =
            current.iter().map(Nested::as_jagged).collect();
        let Some(jagged) = jagged else {
            let flat: Option<Vec<Column>> = current.into_iter().map(Nested::into_flat).collect();
            return flat.map(|columns| (wrapper, columns)).ok_or_else(|| {
                HepvecError::InvalidPartition(
                    "operands have inconsistent depths after alignment".to_string(),
                )
            });
        };
        let Some(reference) = jagged.first() else {
            return Ok((wrapper, Vec::new()));
        };
        let offsets = counts_to_offsets(&reference.counts());
        debug!(
            "unwrapping a jagged level of {} rows over {} operands",
            reference.len(),
            jagged.len()
        );
        let peeled: Vec<Operand> = jagged
            .iter()
            .map(|array| Operand::Array(array.flatten()))
            .collect();
        wrapper.levels.push(offsets.into());
        current = normalize(&peeled)?;
    }
}

/// Align `operands`, evaluate `f` on the resulting flat columns, and restore the nesting.
pub fn apply<R, F>(operands: &[Operand], f: F) -> HepvecResult<Nested<R>>
where
    R: Content,
    F: FnOnce(&[Column]) -> HepvecResult<R>,
{
    let (wrapper, columns) = unwrap_jagged(operands)?;
    let flat = f(&columns)?;
    if let Some(column) = columns.first() {
        if flat.len() != column.len() {
            return Err(HepvecError::LengthMismatch {
                expected: column.len(),
                found: flat.len(),
            });
        }
    }
    wrapper.wrap(flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::init_logging;

    fn jagged(counts: &[usize], values: Vec<f64>) -> Operand {
        Operand::Array(Nested::from_counts(counts, Column::new(values)).unwrap())
    }

    fn lists(array: &Nested<Column>) -> Vec<Vec<f64>> {
        array
            .rows()
            .unwrap()
            .iter()
            .map(|row| row.flatten_all().to_vec())
            .collect()
    }

    #[test]
    fn test_all_scalar_is_an_error() {
        assert!(matches!(
            normalize(&[Operand::Scalar(1.0), Operand::Scalar(2.0)]),
            Err(HepvecError::AllScalar)
        ));
    }

    #[test]
    fn test_flat_broadcast() {
        let out = normalize(&[Operand::Scalar(2.0), Operand::from(vec![1.0, 2.0, 3.0])]).unwrap();
        assert_eq!(out[0].as_flat().unwrap().to_vec(), vec![2.0, 2.0, 2.0]);
        assert!(normalize(&[Operand::from(vec![1.0]), Operand::from(vec![1.0, 2.0])]).is_err());
    }

    #[test]
    fn test_scalar_and_flat_follow_reference_rows() {
        init_logging();
        let out = normalize(&[
            Operand::Scalar(7.0),
            jagged(&[2, 0, 1], vec![1.0, 2.0, 3.0]),
            Operand::from(vec![10.0, 20.0, 30.0]),
        ])
        .unwrap();
        assert_eq!(lists(&out[0]), vec![vec![7.0, 7.0], vec![], vec![7.0]]);
        assert_eq!(lists(&out[2]), vec![vec![10.0, 10.0], vec![], vec![30.0]]);
        let partitions: Vec<_> = out.iter().map(|a| a.as_jagged().unwrap()).collect();
        assert!(partitions[0].same_partition(partitions[1]));
        assert!(partitions[2].same_partition(partitions[1]));
    }

    #[test]
    fn test_mismatched_partition_is_zero_padded() {
        init_logging();
        let out = normalize(&[
            jagged(&[3, 1], vec![1.0, 2.0, 3.0, 4.0]),
            jagged(&[1, 1], vec![5.0, 6.0]),
        ])
        .unwrap();
        assert_eq!(lists(&out[1]), vec![vec![5.0, 0.0, 0.0], vec![6.0]]);
    }

    #[test]
    fn test_equal_partitions_are_not_copied() {
        init_logging();
        let content = Column::new(vec![5.0, 6.0, 7.0]);
        let out = normalize(&[
            jagged(&[2, 0, 1], vec![1.0, 2.0, 3.0]),
            Operand::Array(Nested::from_counts(&[2, 0, 1], content.clone()).unwrap()),
        ])
        .unwrap();
        assert!(out[1].innermost().shares_buffer(&content));
        assert_eq!(lists(&out[1]), vec![vec![5.0, 6.0], vec![], vec![7.0]]);
    }

    #[test]
    fn test_longer_rows_are_rejected() {
        let result = normalize(&[
            jagged(&[1, 1], vec![1.0, 2.0]),
            jagged(&[2, 0], vec![5.0, 6.0]),
        ]);
        assert!(matches!(
            result,
            Err(HepvecError::RowOverflow {
                row: 0,
                expected: 1,
                found: 2
            })
        ));
        let result = normalize(&[jagged(&[1, 1], vec![1.0, 2.0]), jagged(&[2], vec![5.0, 6.0])]);
        assert!(matches!(result, Err(HepvecError::LengthMismatch { .. })));
    }

    #[test]
    fn test_apply_restores_nesting() {
        let result = apply(
            &[jagged(&[3, 0, 2], vec![0.0, 1.0, 2.0, 3.0, 4.0]), Operand::Scalar(1000.0)],
            |c| Ok(&c[0] + &c[1]),
        )
        .unwrap();
        assert_eq!(result.counts(), Some(vec![3, 0, 2]));
        assert_eq!(
            lists(&result),
            vec![vec![1000.0, 1001.0, 1002.0], vec![], vec![1003.0, 1004.0]]
        );
    }

    #[test]
    fn test_apply_doubly_jagged() {
        let inner = Nested::from_counts(&[2, 1, 0], Column::from([1.0, 2.0, 3.0])).unwrap();
        let outer = inner.wrap_counts(&[2, 1]).unwrap();
        let scale = Operand::from(vec![10.0, 100.0]);
        let (wrapper, columns) = unwrap_jagged(&[Operand::Array(outer), scale.clone()]).unwrap();
        assert_eq!(wrapper.depth(), 2);
        assert_eq!(columns[0].to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(columns[1].to_vec(), vec![10.0, 10.0, 10.0]);
        let inner = Nested::from_counts(&[2, 1, 0], Column::from([1.0, 2.0, 3.0])).unwrap();
        let outer = inner.wrap_counts(&[2, 1]).unwrap();
        let product = apply(&[Operand::Array(outer), scale], |c| Ok(&c[0] * &c[1])).unwrap();
        assert_eq!(product.depth(), 2);
        assert_eq!(product.flatten_all().to_vec(), vec![10.0, 20.0, 30.0]);
        assert_eq!(product.rows().unwrap()[1].counts(), Some(vec![0]));
    }

    #[test]
    fn test_flat_only_apply() {
        let result = apply(&[Operand::from(vec![1.0, 2.0]), Operand::Scalar(3.0)], |c| {
            Ok(&c[0] * &c[1])
        })
        .unwrap();
        assert_eq!(result.as_flat().unwrap().to_vec(), vec![3.0, 6.0]);
    }
}
