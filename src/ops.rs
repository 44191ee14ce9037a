//! Tagged elementwise operators over scalars, vectors, and (jagged) vector arrays.
//!
//! Every operand is first wrapped in a [`Value`]. [`apply_operator`] validates the operand
//! types, aligns any jagged structure with the [`broadcast`](crate::broadcast) engine, and
//! hands the flat operands to the [`VectorArray::apply_operator`] of the first vector operand
//! (or to plain numeric arithmetic when no vector is involved). Addition and subtraction are
//! component-wise, `|v|` is the magnitude, and `v ** p` is `mag2 ** (p / 2)`.
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    broadcast::{self, Operand, Wrapper},
    data::{
        column::Column,
        component_operands,
        jagged::{Content, Nested},
        PtEtaPhiMassArray, Vec2Array, Vec3Array, Vec4Array, VectorArray,
    },
    utils::{
        enums::VectorKind,
        vectors::{PtEtaPhiMassVec4, Vec2, Vec3, Vec4},
    },
    HepvecError, HepvecResult,
};

/// Operators with no vector-specific meaning, applied lane by lane.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Elementwise {
    Multiply,
    Divide,
    Negate,
}

/// The operators a vector array intercepts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Component-wise sum of two vectors of the same family.
    Add,
    /// Component-wise difference of two vectors of the same family.
    Subtract,
    /// `|v|^p`, computed as `mag2` when `p == 2`.
    Power,
    /// `|v|`
    Absolute,
    Other(Elementwise),
}

impl Operator {
    pub const MULTIPLY: Operator = Operator::Other(Elementwise::Multiply);
    pub const DIVIDE: Operator = Operator::Other(Elementwise::Divide);
    pub const NEGATE: Operator = Operator::Other(Elementwise::Negate);

    /// The number of operands the operator takes.
    pub fn arity(&self) -> usize {
        match self {
            Operator::Absolute | Operator::Other(Elementwise::Negate) => 1,
            _ => 2,
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Add => write!(f, "add"),
            Operator::Subtract => write!(f, "subtract"),
            Operator::Power => write!(f, "raise to a power"),
            Operator::Absolute => write!(f, "take the absolute value of"),
            Operator::Other(Elementwise::Multiply) => write!(f, "multiply"),
            Operator::Other(Elementwise::Divide) => write!(f, "divide"),
            Operator::Other(Elementwise::Negate) => write!(f, "negate"),
        }
    }
}

impl FromStr for Operator {
    type Err = HepvecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "add" | "+" => Ok(Self::Add),
            "subtract" | "sub" | "-" => Ok(Self::Subtract),
            "power" | "pow" | "**" => Ok(Self::Power),
            "absolute" | "abs" => Ok(Self::Absolute),
            "multiply" | "mul" | "*" => Ok(Self::MULTIPLY),
            "divide" | "div" | "true_divide" | "/" => Ok(Self::DIVIDE),
            "negative" | "negate" | "neg" => Ok(Self::NEGATE),
            _ => Err(HepvecError::ParseError {
                name: s.to_string(),
                object: "Operator".to_string(),
            }),
        }
    }
}

/// Any operand or result of [`apply_operator`].
#[derive(Clone, Debug)]
pub enum Value {
    Real(f64),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    PtEtaPhiMass(PtEtaPhiMassVec4),
    Column(Nested<Column>),
    Vec2Array(Nested<Vec2Array>),
    Vec3Array(Nested<Vec3Array>),
    Vec4Array(Nested<Vec4Array>),
    PtEtaPhiMassArray(Nested<PtEtaPhiMassArray>),
}

impl Value {
    /// The kind of vector held, if any.
    pub fn vector_kind(&self) -> Option<VectorKind> {
        match self {
            Value::Real(_) | Value::Column(_) => None,
            Value::Vec2(_) | Value::Vec2Array(_) => Some(VectorKind::Vector2),
            Value::Vec3(_) | Value::Vec3Array(_) => Some(VectorKind::Vector3),
            Value::Vec4(_) | Value::Vec4Array(_) => Some(VectorKind::Lorentz),
            Value::PtEtaPhiMass(_) | Value::PtEtaPhiMassArray(_) => Some(VectorKind::PtEtaPhiMass),
        }
    }

    /// Whether the value is a single number or vector rather than an array.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Real(_) | Value::Vec2(_) | Value::Vec3(_) | Value::Vec4(_) | Value::PtEtaPhiMass(_)
        )
    }

    pub fn is_jagged(&self) -> bool {
        match self {
            Value::Column(array) => array.is_jagged(),
            Value::Vec2Array(array) => array.is_jagged(),
            Value::Vec3Array(array) => array.is_jagged(),
            Value::Vec4Array(array) => array.is_jagged(),
            Value::PtEtaPhiMassArray(array) => array.is_jagged(),
            _ => false,
        }
    }

    /// The number of (outermost) rows, or `None` for scalars.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Column(array) => Some(array.len()),
            Value::Vec2Array(array) => Some(array.len()),
            Value::Vec3Array(array) => Some(array.len()),
            Value::Vec4Array(array) => Some(array.len()),
            Value::PtEtaPhiMassArray(array) => Some(array.len()),
            _ => None,
        }
    }

    /// A short description used in error messages.
    pub fn describe(&self) -> String {
        let jagged = if self.is_jagged() { "jagged " } else { "" };
        match (self, self.vector_kind()) {
            (Value::Real(_), _) => "a number".to_string(),
            (Value::Column(_), _) => format!("a {jagged}numeric array"),
            (value, Some(kind)) if value.is_scalar() => format!("a {kind}"),
            (_, Some(kind)) => format!("a {jagged}{kind} array"),
            (_, None) => "an unknown value".to_string(),
        }
    }

    fn mismatch(&self, expected: &str) -> HepvecError {
        HepvecError::TypeMismatch {
            operation: format!("convert {} into", self.describe()),
            operands: expected.to_string(),
        }
    }

    pub fn into_real(self) -> HepvecResult<f64> {
        match self {
            Value::Real(value) => Ok(value),
            other => Err(other.mismatch("a number")),
        }
    }

    pub fn into_column(self) -> HepvecResult<Nested<Column>> {
        match self {
            Value::Column(array) => Ok(array),
            other => Err(other.mismatch("a numeric array")),
        }
    }

    /// Extract an array of the given type.
    pub fn into_array<A: VectorArray>(self) -> HepvecResult<Nested<A>> {
        A::array_of(&self)
            .cloned()
            .ok_or_else(|| self.mismatch(&format!("a {} array", A::KIND)))
    }

    /// Extract a single vector of the given array's element type.
    pub fn into_element<A: VectorArray>(self) -> HepvecResult<A::Element> {
        A::element_of(&self).ok_or_else(|| self.mismatch(&format!("a {}", A::KIND)))
    }

    // Scalar vectors become one-row arrays so they can share the array kernels.
    fn promote(&self) -> Value {
        match self {
            Value::Vec2(v) => Value::Vec2Array(Nested::Flat(Vec2Array::from_rows(&[*v]))),
            Value::Vec3(v) => Value::Vec3Array(Nested::Flat(Vec3Array::from_rows(&[*v]))),
            Value::Vec4(v) => Value::Vec4Array(Nested::Flat(Vec4Array::from_rows(&[*v]))),
            Value::PtEtaPhiMass(v) => {
                Value::PtEtaPhiMassArray(Nested::Flat(PtEtaPhiMassArray::from_rows(&[*v])))
            }
            other => other.clone(),
        }
    }

    fn demote(self) -> HepvecResult<Value> {
        let demoted = match &self {
            Value::Column(Nested::Flat(c)) if c.len() == 1 => c.get(0).map(Value::Real),
            Value::Vec2Array(Nested::Flat(a)) if a.len() == 1 => a.get(0).map(Value::Vec2),
            Value::Vec3Array(Nested::Flat(a)) if a.len() == 1 => a.get(0).map(Value::Vec3),
            Value::Vec4Array(Nested::Flat(a)) if a.len() == 1 => a.get(0).map(Value::Vec4),
            Value::PtEtaPhiMassArray(Nested::Flat(a)) if a.len() == 1 => {
                a.get(0).map(Value::PtEtaPhiMass)
            }
            _ => None,
        };
        demoted.ok_or_else(|| HepvecError::Custom(format!("expected a single value, found {}", self.describe())))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<Vec2> for Value {
    fn from(value: Vec2) -> Self {
        Value::Vec2(value)
    }
}

impl From<Vec3> for Value {
    fn from(value: Vec3) -> Self {
        Value::Vec3(value)
    }
}

impl From<Vec4> for Value {
    fn from(value: Vec4) -> Self {
        Value::Vec4(value)
    }
}

impl From<PtEtaPhiMassVec4> for Value {
    fn from(value: PtEtaPhiMassVec4) -> Self {
        Value::PtEtaPhiMass(value)
    }
}

impl From<Column> for Value {
    fn from(value: Column) -> Self {
        Value::Column(Nested::Flat(value))
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::Column(Nested::Flat(Column::new(values)))
    }
}

impl From<Nested<Column>> for Value {
    fn from(value: Nested<Column>) -> Self {
        Value::Column(value)
    }
}

impl From<Vec2Array> for Value {
    fn from(value: Vec2Array) -> Self {
        Value::Vec2Array(Nested::Flat(value))
    }
}

impl From<Nested<Vec2Array>> for Value {
    fn from(value: Nested<Vec2Array>) -> Self {
        Value::Vec2Array(value)
    }
}

impl From<Vec3Array> for Value {
    fn from(value: Vec3Array) -> Self {
        Value::Vec3Array(Nested::Flat(value))
    }
}

impl From<Nested<Vec3Array>> for Value {
    fn from(value: Nested<Vec3Array>) -> Self {
        Value::Vec3Array(value)
    }
}

impl From<Vec4Array> for Value {
    fn from(value: Vec4Array) -> Self {
        Value::Vec4Array(Nested::Flat(value))
    }
}

impl From<Nested<Vec4Array>> for Value {
    fn from(value: Nested<Vec4Array>) -> Self {
        Value::Vec4Array(value)
    }
}

impl From<PtEtaPhiMassArray> for Value {
    fn from(value: PtEtaPhiMassArray) -> Self {
        Value::PtEtaPhiMassArray(Nested::Flat(value))
    }
}

impl From<Nested<PtEtaPhiMassArray>> for Value {
    fn from(value: Nested<PtEtaPhiMassArray>) -> Self {
        Value::PtEtaPhiMassArray(value)
    }
}

/// Apply `op` to `inputs`, broadcasting scalars and jagged structure.
///
/// # Errors
/// * [`HepvecError::InvalidOperands`] for the wrong number of operands, or operands which
///   the operator cannot combine (two PtEtaPhiMass vectors multiplied together, a non-number
///   exponent);
/// * [`HepvecError::TypeMismatch`] when vectors are combined with non-vectors or with vectors
///   of another family;
/// * any alignment error from the [`broadcast`] engine.
pub fn apply_operator(op: Operator, inputs: &[Value]) -> HepvecResult<Value> {
    validate(op, inputs)?;
    broadcast_values(inputs, |flat| apply_flat(op, flat))
}

fn describe_all(inputs: &[Value]) -> String {
    inputs
        .iter()
        .map(Value::describe)
        .collect::<Vec<_>>()
        .join(" and ")
}

fn validate(op: Operator, inputs: &[Value]) -> HepvecResult<()> {
    if inputs.len() != op.arity() {
        return Err(HepvecError::InvalidOperands {
            operation: op.to_string(),
            reason: format!("expected {} operands, found {}", op.arity(), inputs.len()),
        });
    }
    let type_mismatch = || HepvecError::TypeMismatch {
        operation: op.to_string(),
        operands: describe_all(inputs),
    };
    let kinds: Vec<Option<VectorKind>> = inputs.iter().map(Value::vector_kind).collect();
    match op {
        Operator::Add | Operator::Subtract => match (kinds[0], kinds[1]) {
            (None, None) => Ok(()),
            (Some(a), Some(b)) if a.family() == b.family() => Ok(()),
            _ => Err(type_mismatch()),
        },
        Operator::Power => match (kinds[0], &inputs[1]) {
            (_, exponent) if exponent.vector_kind().is_some() => Err(type_mismatch()),
            (Some(_), Value::Real(_)) | (None, _) => Ok(()),
            (Some(_), _) => Err(HepvecError::InvalidOperands {
                operation: op.to_string(),
                reason: "the exponent of a vector must be a single number".to_string(),
            }),
        },
        Operator::Other(Elementwise::Multiply) | Operator::Other(Elementwise::Divide) => {
            match (kinds[0], kinds[1]) {
                (Some(VectorKind::PtEtaPhiMass), Some(VectorKind::PtEtaPhiMass)) => {
                    Err(HepvecError::InvalidOperands {
                        operation: op.to_string(),
                        reason: "PtEtaPhiMass vectors can only be scaled by numbers".to_string(),
                    })
                }
                (Some(_), Some(_)) => Err(type_mismatch()),
                (None, Some(_)) if op == Operator::DIVIDE => Err(type_mismatch()),
                _ => Ok(()),
            }
        }
        Operator::Absolute | Operator::Other(Elementwise::Negate) => Ok(()),
    }
}

enum Slot {
    Pass(Value),
    Array(Option<VectorKind>, usize, usize),
}

fn rebuild(kind: Option<VectorKind>, columns: Vec<Column>) -> HepvecResult<Value> {
    Ok(match kind {
        None => Value::Column(Nested::Flat(columns.into_iter().next().unwrap_or_default())),
        Some(VectorKind::Vector2) => Value::Vec2Array(Nested::Flat(Vec2Array::from_columns(columns)?)),
        Some(VectorKind::Vector3) => Value::Vec3Array(Nested::Flat(Vec3Array::from_columns(columns)?)),
        Some(VectorKind::Lorentz) => Value::Vec4Array(Nested::Flat(Vec4Array::from_columns(columns)?)),
        Some(VectorKind::PtEtaPhiMass) => {
            Value::PtEtaPhiMassArray(Nested::Flat(PtEtaPhiMassArray::from_columns(columns)?))
        }
    })
}

fn rewrap(value: Value, wrapper: &Wrapper) -> HepvecResult<Value> {
    Ok(match value {
        Value::Column(array) => Value::Column(wrapper.wrap_nested(array)?),
        Value::Vec2Array(array) => Value::Vec2Array(wrapper.wrap_nested(array)?),
        Value::Vec3Array(array) => Value::Vec3Array(wrapper.wrap_nested(array)?),
        Value::Vec4Array(array) => Value::Vec4Array(wrapper.wrap_nested(array)?),
        Value::PtEtaPhiMassArray(array) => Value::PtEtaPhiMassArray(wrapper.wrap_nested(array)?),
        scalar => scalar,
    })
}

/// Align the array operands in `inputs`, call `f` on flat values, and restore the jagged
/// structure on the result.
///
/// Vector arrays are split into one operand per component before alignment and rebuilt
/// afterwards, so every component ends up with the same partition. Scalars are passed through
/// untouched. When nothing is jagged, `f` is called on `inputs` directly.
pub fn broadcast_values<F>(inputs: &[Value], f: F) -> HepvecResult<Value>
where
    F: FnOnce(&[Value]) -> HepvecResult<Value>,
{
    if !inputs.iter().any(Value::is_jagged) {
        return f(inputs);
    }
    let mut operands: Vec<Operand> = Vec::new();
    let slots: Vec<Slot> = inputs
        .iter()
        .map(|value| {
            let start = operands.len();
            let parts = match value {
                Value::Column(array) => vec![Operand::Array(array.clone())],
                Value::Vec2Array(array) => component_operands(array),
                Value::Vec3Array(array) => component_operands(array),
                Value::Vec4Array(array) => component_operands(array),
                Value::PtEtaPhiMassArray(array) => component_operands(array),
                scalar => return Slot::Pass(scalar.clone()),
            };
            operands.extend(parts);
            Slot::Array(value.vector_kind(), start, operands.len())
        })
        .collect();
    let (wrapper, columns) = broadcast::unwrap_jagged(&operands)?;
    let flat = slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Pass(value) => Ok(value),
            Slot::Array(kind, start, stop) => rebuild(kind, columns[start..stop].to_vec()),
        })
        .collect::<HepvecResult<Vec<Value>>>()?;
    rewrap(f(&flat)?, &wrapper)
}

fn apply_flat(op: Operator, inputs: &[Value]) -> HepvecResult<Value> {
    let Some(kind) = inputs.iter().find_map(Value::vector_kind) else {
        return apply_numeric(op, inputs);
    };
    if inputs.iter().all(Value::is_scalar) {
        let promoted: Vec<Value> = inputs.iter().map(Value::promote).collect();
        return apply_flat(op, &promoted)?.demote();
    }
    match kind {
        VectorKind::Vector2 => Vec2Array::apply_operator(op, inputs),
        VectorKind::Vector3 => Vec3Array::apply_operator(op, inputs),
        VectorKind::Lorentz => Vec4Array::apply_operator(op, inputs),
        VectorKind::PtEtaPhiMass => PtEtaPhiMassArray::apply_operator(op, inputs),
    }
}

/// One lane of numeric arithmetic: a broadcast scalar or a flat column.
#[derive(Clone, Debug)]
enum Lane {
    Scalar(f64),
    Column(Column),
}

impl Lane {
    fn of(value: &Value) -> HepvecResult<Lane> {
        match value {
            Value::Real(v) => Ok(Lane::Scalar(*v)),
            Value::Column(Nested::Flat(c)) => Ok(Lane::Column(c.clone())),
            other => Err(other.mismatch("a number or a flat numeric array")),
        }
    }

    fn unary(&self, f: fn(f64) -> f64) -> Lane {
        match self {
            Lane::Scalar(v) => Lane::Scalar(f(*v)),
            Lane::Column(c) => Lane::Column(c.map(f)),
        }
    }

    fn binary(&self, other: &Lane, f: fn(f64, f64) -> f64) -> HepvecResult<Lane> {
        Ok(match (self, other) {
            (Lane::Scalar(a), Lane::Scalar(b)) => Lane::Scalar(f(*a, *b)),
            (Lane::Column(a), Lane::Scalar(b)) => {
                let b = *b;
                Lane::Column(a.map(move |x| f(x, b)))
            }
            (Lane::Scalar(a), Lane::Column(b)) => {
                let a = *a;
                Lane::Column(b.map(move |x| f(a, x)))
            }
            (Lane::Column(a), Lane::Column(b)) => Lane::Column(a.try_zip_map(b, f)?),
        })
    }

    fn into_column(self, len: usize) -> Column {
        match self {
            Lane::Scalar(v) => Column::full(len, v),
            Lane::Column(c) => c,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Lane::Scalar(v) => Value::Real(v),
            Lane::Column(c) => Value::Column(Nested::Flat(c)),
        }
    }
}

fn binary_kernel(op: Operator) -> fn(f64, f64) -> f64 {
    match op {
        Operator::Add => |a, b| a + b,
        Operator::Subtract => |a, b| a - b,
        Operator::Power => f64::powf,
        Operator::Other(Elementwise::Divide) => |a, b| a / b,
        _ => |a, b| a * b,
    }
}

fn unary_kernel(op: Operator) -> fn(f64) -> f64 {
    match op {
        Operator::Absolute => f64::abs,
        _ => |a| -a,
    }
}

fn apply_numeric(op: Operator, inputs: &[Value]) -> HepvecResult<Value> {
    let lanes = inputs.iter().map(Lane::of).collect::<HepvecResult<Vec<Lane>>>()?;
    let result = match lanes.as_slice() {
        [lane] => lane.unary(unary_kernel(op)),
        [lhs, rhs] => lhs.binary(rhs, binary_kernel(op))?,
        _ => {
            return Err(HepvecError::InvalidOperands {
                operation: op.to_string(),
                reason: format!("expected {} operands, found {}", op.arity(), inputs.len()),
            })
        }
    };
    Ok(result.into_value())
}

/// The default vector semantics of [`VectorArray::apply_operator`]: component-wise sums and
/// differences, magnitudes for `abs` and powers, and lane-by-lane scaling for the other
/// operators.
pub fn componentwise<A: VectorArray>(op: Operator, inputs: &[Value]) -> HepvecResult<Value> {
    let len = inputs
        .iter()
        .find_map(Value::len)
        .ok_or(HepvecError::AllScalar)?;
    let assemble = |columns: Vec<Column>| A::wrap_value(Nested::Flat(A::assemble(columns)));
    match op {
        Operator::Add | Operator::Subtract => {
            let lhs = A::coerce(&inputs[0], len)?;
            let rhs = A::coerce(&inputs[1], len)?;
            let f = binary_kernel(op);
            let columns = lhs
                .columns()
                .iter()
                .zip(rhs.columns().iter())
                .map(|(a, b)| a.try_zip_map(b, f))
                .collect::<HepvecResult<Vec<Column>>>()?;
            Ok(assemble(columns))
        }
        Operator::Power => {
            let base = A::coerce(&inputs[0], len)?;
            let exponent = inputs[1].clone().into_real()?;
            let mag2 = base.mag2();
            let column = if exponent == 2.0 {
                mag2
            } else {
                mag2.powf(0.5 * exponent)
            };
            Ok(Value::Column(Nested::Flat(column)))
        }
        Operator::Absolute => {
            let base = A::coerce(&inputs[0], len)?;
            Ok(Value::Column(Nested::Flat(base.mag())))
        }
        Operator::Other(Elementwise::Negate) => {
            let base = A::coerce(&inputs[0], len)?;
            Ok(assemble(base.columns().iter().map(|c| -c).collect()))
        }
        Operator::Other(_) => {
            let position = inputs
                .iter()
                .position(|v| v.vector_kind().is_some())
                .unwrap_or_default();
            let vector = A::coerce(&inputs[position], len)?;
            let other = Lane::of(&inputs[1 - position])?;
            let f = binary_kernel(op);
            let columns = vector
                .columns()
                .into_iter()
                .map(|c| {
                    let lane = Lane::Column(c);
                    let result = if position == 0 {
                        lane.binary(&other, f)?
                    } else {
                        other.binary(&lane, f)?
                    };
                    Ok(result.into_column(len))
                })
                .collect::<HepvecResult<Vec<Column>>>()?;
            Ok(assemble(columns))
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{tests::init_logging, traits::LorentzOps};

    fn vec2_array() -> Vec2Array {
        Vec2Array::new(Column::zeros(10), (0..10).map(f64::from).collect::<Column>()).unwrap()
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("add".parse::<Operator>().unwrap(), Operator::Add);
        assert_eq!("true_divide".parse::<Operator>().unwrap(), Operator::DIVIDE);
        assert_eq!("ABS".parse::<Operator>().unwrap(), Operator::Absolute);
        assert!("modulo".parse::<Operator>().is_err());
        assert_eq!(Operator::NEGATE.arity(), 1);
        assert_eq!(Operator::Power.arity(), 2);
    }

    #[test]
    fn test_scalar_vectors() {
        let a = Vec2::new(4.4, 5.5);
        let sum = apply_operator(Operator::Add, &[a.into(), Vec2::new(1000.0, 2000.0).into()])
            .unwrap()
            .into_element::<Vec2Array>()
            .unwrap();
        assert_relative_eq!(sum, Vec2::new(1004.4, 2005.5));
        let mag2 = apply_operator(Operator::Power, &[a.into(), 2.0.into()])
            .unwrap()
            .into_real()
            .unwrap();
        assert_eq!(mag2, a.mag2());
        let negated = apply_operator(Operator::NEGATE, &[Vec3::new(1.0, -2.0, 3.0).into()])
            .unwrap()
            .into_element::<Vec3Array>()
            .unwrap();
        assert_eq!(negated, Vec3::new(-1.0, 2.0, -3.0));
    }

    #[test]
    fn test_numeric_fallback() {
        let result = apply_operator(Operator::Add, &[vec![1.0, 2.0].into(), 0.5.into()])
            .unwrap()
            .into_column()
            .unwrap();
        assert_eq!(result.flatten_all().to_vec(), vec![1.5, 2.5]);
        let real = apply_operator(Operator::Absolute, &[(-3.0).into()])
            .unwrap()
            .into_real()
            .unwrap();
        assert_eq!(real, 3.0);
    }

    #[test]
    fn test_array_add_and_magnitudes() {
        let a = vec2_array();
        let shifted = apply_operator(Operator::Add, &[a.clone().into(), Vec2::new(1000.0, 2000.0).into()])
            .unwrap()
            .into_array::<Vec2Array>()
            .unwrap()
            .into_flat()
            .unwrap();
        assert_eq!(shifted.get(5), Some(Vec2::new(1000.0, 2005.0)));
        let mag2 = apply_operator(Operator::Power, &[a.clone().into(), 2.0.into()])
            .unwrap()
            .into_column()
            .unwrap()
            .flatten_all();
        assert_eq!(mag2.to_vec(), (0..10).map(|i| f64::from(i * i)).collect::<Vec<_>>());
        let cubed = apply_operator(Operator::Power, &[a.clone().into(), 3.0.into()])
            .unwrap()
            .into_column()
            .unwrap()
            .flatten_all();
        assert_relative_eq!(cubed[3], 27.0, epsilon = 1e-12);
        let abs = apply_operator(Operator::Absolute, &[a.into()])
            .unwrap()
            .into_column()
            .unwrap()
            .flatten_all();
        assert_eq!(abs[4], 4.0);
    }

    #[test]
    fn test_type_mismatches() {
        let a = vec2_array();
        let err = apply_operator(Operator::Add, &[a.clone().into(), Vec3::new(1.0, 2.0, 3.0).into()])
            .unwrap_err();
        assert!(matches!(err, HepvecError::TypeMismatch { .. }));
        assert!(err.to_string().starts_with("cannot add"));
        assert!(matches!(
            apply_operator(Operator::Subtract, &[a.clone().into(), 1.0.into()]),
            Err(HepvecError::TypeMismatch { .. })
        ));
        assert!(matches!(
            apply_operator(Operator::MULTIPLY, &[a.clone().into(), a.clone().into()]),
            Err(HepvecError::TypeMismatch { .. })
        ));
        assert!(matches!(
            apply_operator(Operator::DIVIDE, &[1.0.into(), a.clone().into()]),
            Err(HepvecError::TypeMismatch { .. })
        ));
        assert!(matches!(
            apply_operator(Operator::Power, &[a.clone().into(), vec![1.0; 10].into()]),
            Err(HepvecError::InvalidOperands { .. })
        ));
        assert!(matches!(
            apply_operator(Operator::Add, &[a.into()]),
            Err(HepvecError::InvalidOperands { .. })
        ));
    }

    #[test]
    fn test_ptetaphimass_operators() {
        let p = PtEtaPhiMassArray::new(vec![10.0, 20.0], vec![0.5, -1.0], vec![0.1, 2.0], vec![1.0, 0.5])
            .unwrap();
        let scaled = apply_operator(Operator::MULTIPLY, &[2.0.into(), p.clone().into()])
            .unwrap()
            .into_array::<PtEtaPhiMassArray>()
            .unwrap()
            .into_flat()
            .unwrap();
        assert_eq!(scaled.pt().to_vec(), vec![20.0, 40.0]);
        assert_eq!(scaled.eta().to_vec(), vec![0.5, -1.0]);
        assert_eq!(scaled.mass().to_vec(), vec![2.0, 1.0]);
        let halved = apply_operator(Operator::DIVIDE, &[p.clone().into(), vec![2.0, 4.0].into()])
            .unwrap()
            .into_array::<PtEtaPhiMassArray>()
            .unwrap()
            .into_flat()
            .unwrap();
        assert_eq!(halved.pt().to_vec(), vec![5.0, 5.0]);
        assert_eq!(halved.mass().to_vec(), vec![0.5, 0.125]);
        assert!(matches!(
            apply_operator(Operator::MULTIPLY, &[p.clone().into(), p.clone().into()]),
            Err(HepvecError::InvalidOperands { .. })
        ));
        let sum = apply_operator(Operator::Add, &[p.clone().into(), Vec4::new(1.0, 0.0, 0.0, 1.0).into()])
            .unwrap()
            .into_array::<Vec4Array>()
            .unwrap()
            .into_flat()
            .unwrap();
        let expected = p.get(1).unwrap().to_cartesian() + Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_eq!(sum.get(1).unwrap(), expected);
        let negated = apply_operator(Operator::NEGATE, &[p.into()])
            .unwrap()
            .into_array::<Vec4Array>()
            .unwrap();
        assert!(!negated.is_jagged());
    }

    #[test]
    fn test_scalar_ptetaphimass_scaling() {
        let p = PtEtaPhiMassVec4::new(10.0, 0.5, 0.1, 1.0);
        let scaled = apply_operator(Operator::MULTIPLY, &[p.into(), 3.0.into()])
            .unwrap()
            .into_element::<PtEtaPhiMassArray>()
            .unwrap();
        assert_eq!(scaled, p * 3.0);
    }

    #[test]
    fn test_jagged_broadcast() {
        init_logging();
        let y = Nested::from_counts(&[3, 0, 2, 5], (0..10).map(f64::from).collect::<Column>())
            .unwrap();
        let jagged = Vec2Array::from_cartesian(0.0, y).unwrap();
        let shifted = apply_operator(
            Operator::Add,
            &[jagged.clone().into(), Vec2::new(1000.0, 2000.0).into()],
        )
        .unwrap()
        .into_array::<Vec2Array>()
        .unwrap();
        assert_eq!(shifted.counts(), Some(vec![3, 0, 2, 5]));
        let rows = shifted.rows().unwrap();
        assert_eq!(rows[1].len(), 0);
        assert_eq!(
            rows[2].flatten_all().to_vec(),
            vec![Vec2::new(1000.0, 2003.0), Vec2::new(1000.0, 2004.0)]
        );
        // per-event weights broadcast across each row
        let weights = vec![1.0, 2.0, 3.0, 4.0];
        let weighted = apply_operator(Operator::MULTIPLY, &[jagged.into(), weights.into()])
            .unwrap()
            .into_array::<Vec2Array>()
            .unwrap();
        let rows = weighted.rows().unwrap();
        assert_eq!(
            rows[3].flatten_all().get(0),
            Some(Vec2::new(0.0, 20.0))
        );
    }

    #[test]
    fn test_jagged_mismatched_partitions() {
        init_logging();
        let a = Vec3Array::from_cartesian(
            Nested::from_counts(&[2, 1], Column::from([1.0, 2.0, 3.0])).unwrap(),
            0.0,
            0.0,
        )
        .unwrap();
        let b = Vec3Array::from_cartesian(
            Nested::from_counts(&[1, 1], Column::from([10.0, 20.0])).unwrap(),
            0.0,
            0.0,
        )
        .unwrap();
        let sum = apply_operator(Operator::Add, &[a.clone().into(), b.clone().into()])
            .unwrap()
            .into_array::<Vec3Array>()
            .unwrap();
        assert_eq!(sum.counts(), Some(vec![2, 1]));
        let xs = sum.flatten_all().columns()[0].to_vec();
        assert_eq!(xs, vec![11.0, 2.0, 23.0]);
        assert!(matches!(
            apply_operator(Operator::Add, &[b.into(), a.into()]),
            Err(HepvecError::RowOverflow { .. })
        ));
    }
}
