use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    data::{column::Column, VectorArray},
    utils::enums::{Coordinates, VectorKind},
    HepvecError, HepvecResult,
};

/// The persisted form of a flat vector array: its stored components by name.
///
/// Every array type serializes through this record, so arrays can be written with any
/// [`serde`] format and rebuilt from the component columns alone. Memoized quantities are not
/// persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrayRecord {
    pub kind: VectorKind,
    pub coordinates: Coordinates,
    pub columns: IndexMap<String, Vec<f64>>,
}

impl ArrayRecord {
    /// Capture the stored components of `array`.
    pub fn from_array<A: VectorArray>(array: &A) -> Self {
        Self {
            kind: A::KIND,
            coordinates: A::COORDINATES,
            columns: A::FIELD_NAMES
                .iter()
                .zip(array.columns())
                .map(|(name, column)| (name.to_string(), column.to_vec()))
                .collect(),
        }
    }

    /// Rebuild an array, checking that the record describes the requested type.
    pub fn into_array<A: VectorArray>(mut self) -> HepvecResult<A> {
        if self.kind != A::KIND || self.coordinates != A::COORDINATES {
            return Err(HepvecError::UnsupportedCoordinates {
                coordinates: self.coordinates,
                kind: A::KIND,
            });
        }
        let columns = A::FIELD_NAMES
            .iter()
            .map(|name| {
                self.columns
                    .swap_remove(*name)
                    .map(Column::new)
                    .ok_or_else(|| HepvecError::MissingColumn {
                        kind: A::KIND,
                        column: name.to_string(),
                    })
            })
            .collect::<HepvecResult<Vec<Column>>>()?;
        A::from_columns(columns)
    }

    /// Encode with [`bincode`].
    pub fn to_bytes(&self) -> HepvecResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a record written by [`ArrayRecord::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> HepvecResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PtEtaPhiMassArray, Vec3Array, Vec4Array};

    #[test]
    fn test_record_names_components() {
        let array = Vec3Array::new(vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]).unwrap();
        let record = ArrayRecord::from_array(&array);
        assert_eq!(record.kind, VectorKind::Vector3);
        assert_eq!(record.coordinates, Coordinates::Cartesian);
        assert_eq!(
            record.columns.keys().cloned().collect::<Vec<_>>(),
            vec!["x", "y", "z"]
        );
        assert_eq!(record.columns["z"], vec![5.0, 6.0]);
    }

    #[test]
    fn test_bincode_bytes() {
        let array =
            PtEtaPhiMassArray::new(vec![10.0], vec![0.5], vec![1.0], vec![0.105]).unwrap();
        let bytes = ArrayRecord::from_array(&array).to_bytes().unwrap();
        let rebuilt: PtEtaPhiMassArray = ArrayRecord::from_bytes(&bytes)
            .unwrap()
            .into_array()
            .unwrap();
        assert_eq!(rebuilt.columns(), array.columns());
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let array = Vec3Array::new(vec![1.0], vec![2.0], vec![3.0]).unwrap();
        let record = ArrayRecord::from_array(&array);
        assert!(record.into_array::<Vec4Array>().is_err());
    }

    #[test]
    fn test_missing_column_is_reported() {
        let array = Vec3Array::new(vec![1.0], vec![2.0], vec![3.0]).unwrap();
        let mut record = ArrayRecord::from_array(&array);
        record.columns.shift_remove("y");
        assert!(matches!(
            record.into_array::<Vec3Array>(),
            Err(HepvecError::MissingColumn { .. })
        ));
    }
}
