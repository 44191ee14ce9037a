//! # hepvec
//!
//! Physics vectors for detector kinematics: two-dimensional, three-dimensional, and Lorentz
//! vectors, available as single values ([`Vec2`], [`Vec3`], [`Vec4`], [`PtEtaPhiMassVec4`]), as
//! columnar arrays ([`Vec2Array`], [`Vec3Array`], [`Vec4Array`], [`PtEtaPhiMassArray`]), and as
//! jagged arrays of those columnar arrays ([`Nested`]).
//!
//! Every formula is written once for a single vector and applied row by row to the columnar
//! forms, so a computation gives the same numbers whether it runs on one vector, a flat array
//! of millions of vectors, or a per-event jagged array of vectors.
//!
//! Operands with different shapes (scalars, flat arrays, jagged arrays with different row
//! partitions) are aligned by the [`broadcast`] engine before any elementwise operator is
//! applied, and the result is rebuilt with the jagged nesting of the inputs.
//!
//! ```
//! use hepvec::prelude::*;
//!
//! let a = Vec2::new(4.4, 5.5);
//! assert!((a.dot(&a) - 49.61).abs() < 1e-12);
//!
//! let events = Vec2Array::from_cartesian(
//!     Nested::from_counts(&[3, 0, 2], Column::from(vec![0.0; 5])).unwrap(),
//!     Nested::from_counts(&[3, 0, 2], Column::from(vec![0.0, 1.0, 2.0, 3.0, 4.0])).unwrap(),
//! )
//! .unwrap();
//! let shifted = events
//!     .try_add(Vec2::new(1000.0, 2000.0))
//!     .unwrap()
//!     .into_array::<Vec2Array>()
//!     .unwrap();
//! assert_eq!(shifted.counts(), Some(vec![3, 0, 2]));
//! ```
#![warn(clippy::perf, clippy::style)]
#![allow(clippy::excessive_precision)]

use thiserror::Error;

/// Shape alignment of scalars, flat arrays, and jagged arrays.
pub mod broadcast;
/// Columnar storage: columns, jagged arrays, memoization, and the vector arrays themselves.
pub mod data;
/// The tagged operator dispatcher shared by every vector representation.
pub mod ops;
/// Capability traits implemented by scalar, flat, and jagged vectors.
pub mod traits;
/// Scalar vector kernels, enums, and row-wise kernel drivers.
pub mod utils;

pub use crate::broadcast::{Operand, Wrapper};
pub use crate::data::{
    cache::MemoCache,
    column::{Column, Mask},
    jagged::{counts_to_offsets, Content, JaggedArray, Nested},
    record::ArrayRecord,
    PtEtaPhiMassArray, Vec2Array, Vec3Array, Vec4Array, VectorArray,
};
pub use crate::ops::{apply_operator, Elementwise, Operator, Value};
pub use crate::utils::enums::{Coordinates, VectorKind};
pub use crate::utils::vectors::{PtEtaPhiMassVec4, Vec2, Vec3, Vec4};
pub use crate::utils::DEFAULT_TOLERANCE;

/// Everything needed to work with vectors in one import.
pub mod prelude {
    pub use crate::traits::*;
    pub use crate::{
        apply_operator, ArrayRecord, Column, Content, Coordinates, Elementwise, HepvecError, HepvecResult,
        JaggedArray, Mask, Nested, Operand, Operator, PtEtaPhiMassArray, PtEtaPhiMassVec4, Value,
        Vec2, Vec2Array, Vec3, Vec3Array, Vec4, Vec4Array, VectorArray, VectorKind,
        DEFAULT_TOLERANCE,
    };
}

pub type HepvecResult<T> = Result<T, HepvecError>;

/// The error type used by all `hepvec` methods
#[derive(Error, Debug)]
pub enum HepvecError {
    /// Every operand given to an array factory was a scalar, so there is no length to build an
    /// array with.
    #[error("cannot construct an array if all arguments are scalar")]
    AllScalar,
    /// An operator was applied to operands whose types cannot be combined, such as a vector and
    /// a non-vector, or vectors of different dimensionality.
    #[error("cannot {operation} {operands}")]
    TypeMismatch {
        /// The operation which was attempted
        operation: String,
        /// A description of the offending operands
        operands: String,
    },
    /// A jagged operand was passed to a constructor which only accepts flat columns.
    #[error("{constructor} arguments must not be jagged; use {alternative} for jaggedness-handling")]
    JaggedInput {
        /// The flat-only constructor which was called
        constructor: &'static str,
        /// The jagged-aware factory which should be used instead
        alternative: &'static str,
    },
    /// Two arrays which must have the same length do not.
    #[error("length mismatch: expected {expected}, found {found}")]
    LengthMismatch {
        /// The required length
        expected: usize,
        /// The length which was provided
        found: usize,
    },
    /// A jagged operand has a row with more entries than the reference row it is aligned to.
    #[error("row {row} has {found} entries but the reference partition only has {expected}")]
    RowOverflow {
        /// Index of the offending row
        row: usize,
        /// Number of entries in the reference row
        expected: usize,
        /// Number of entries in the operand's row
        found: usize,
    },
    /// Row boundaries which do not describe a valid partition of their content.
    #[error("invalid jagged partition: {0}")]
    InvalidPartition(String),
    /// Operands of the right types which still cannot be combined by the given operation.
    #[error("invalid operands for {operation}: {reason}")]
    InvalidOperands {
        /// The operation which was attempted
        operation: String,
        /// Why the operands were rejected
        reason: String,
    },
    /// A coordinate system which the requested vector type cannot be built from.
    #[error("{kind} cannot be constructed from {coordinates} coordinates")]
    UnsupportedCoordinates {
        /// The coordinate system which was requested
        coordinates: Coordinates,
        /// The vector type being constructed
        kind: VectorKind,
    },
    /// A persisted record is missing a column needed to rebuild an array.
    #[error("record for {kind} is missing column \"{column}\"")]
    MissingColumn {
        /// The vector type being rebuilt
        kind: VectorKind,
        /// The name of the missing column
        column: String,
    },
    /// An error which occurs when the user tries to parse an invalid string of text, typically
    /// into an enum variant.
    #[error("Failed to parse string: \"{name}\" does not correspond to a valid \"{object}\"!")]
    ParseError {
        /// The string which was parsed
        name: String,
        /// The name of the object it failed to parse into
        object: String,
    },
    /// An error returned by the [`bincode`] (de)serializer
    #[error("Bincode error: {0}")]
    BincodeError(#[from] bincode::Error),
    /// A custom fallback error for errors too complex or too infrequent to warrant their own error
    /// category.
    #[error("{0}")]
    Custom(String),
}

impl Clone for HepvecError {
    // Error types from dependencies are rarely cloneable, so clones collapse into the message.
    fn clone(&self) -> Self {
        let err_string = self.to_string();
        HepvecError::Custom(err_string)
    }
}

#[cfg(test)]
pub mod tests {
    /// Route `log` output through the test harness.
    pub fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }
}
