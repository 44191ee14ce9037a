use std::sync::Arc;

use auto_ops::{impl_op_ex, impl_op_ex_commutative};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    broadcast::{self, Operand},
    ops::{apply_operator, componentwise, Elementwise, Operator, Value},
    traits::{LorentzOps, PlanarOps, SpatialOps, VectorOps},
    utils::{
        enums::{Coordinates, VectorKind},
        scatter, vectorize,
        vectors::{PtEtaPhiMassVec4, Vec2, Vec3, Vec4},
        Lanes,
    },
    HepvecError, HepvecResult,
};

/// Memoization of derived columns.
pub mod cache;
/// Reference-counted `f64` columns and boolean masks.
pub mod column;
/// Jagged arrays and arbitrarily nested content.
pub mod jagged;
/// The persisted form of vector arrays.
pub mod record;

use cache::MemoCache;
use column::{Column, Mask};
use jagged::{Content, Nested};
use record::ArrayRecord;

/// A flat, columnar array of vectors.
///
/// Every row is a vector of type [`VectorArray::Element`], stored as one [`Column`] per
/// component. Quantities are computed by running the scalar kernels of the element type over
/// every row, so an array and a single vector always agree numerically.
pub trait VectorArray:
    Content + VectorOps<Real = Column, Mask = Mask> + Send + Sync + Sized
{
    /// The scalar vector stored in each row.
    type Element: Lanes + Copy + Default + Send + Sync;
    /// The Cartesian array this array converts to (itself, for Cartesian arrays).
    type Cartesian: VectorArray;
    const KIND: VectorKind;
    const COORDINATES: Coordinates;
    /// Component names in the ROOT convention (`fX`, `fPt`, ...).
    const COLUMN_NAMES: &'static [&'static str];
    /// Component names used when persisting (`x`, `pt`, ...).
    const FIELD_NAMES: &'static [&'static str];

    /// The stored components, in [`VectorArray::FIELD_NAMES`] order.
    fn columns(&self) -> Vec<Column>;

    /// Build an array from components which are already known to be consistent. Missing
    /// components are left empty.
    fn assemble(columns: Vec<Column>) -> Self;

    fn to_cartesian(&self) -> Self::Cartesian;

    fn wrap_value(array: Nested<Self>) -> Value;
    fn array_of(value: &Value) -> Option<&Nested<Self>>;
    fn element_of(value: &Value) -> Option<Self::Element>;
    fn element_value(element: Self::Element) -> Value;

    /// Interpret `value` as an array of this type with `len` rows.
    fn coerce(value: &Value, len: usize) -> HepvecResult<Self> {
        coerce_own(value, len)
    }

    /// Apply an operator to flat operands, at least one of which has this type.
    fn apply_operator(op: Operator, inputs: &[Value]) -> HepvecResult<Value> {
        componentwise::<Self>(op, inputs)
    }

    /// Build an array from its components, checking their number and lengths.
    fn from_columns(columns: Vec<Column>) -> HepvecResult<Self> {
        if columns.len() != Self::KIND.ncomp() {
            return Err(HepvecError::InvalidOperands {
                operation: format!("construct {}", Self::KIND),
                reason: format!(
                    "expected {} components, found {}",
                    Self::KIND.ncomp(),
                    columns.len()
                ),
            });
        }
        let len = columns.first().map_or(0, Column::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != len) {
            return Err(HepvecError::LengthMismatch {
                expected: len,
                found: bad.len(),
            });
        }
        Ok(Self::assemble(columns))
    }

    /// An array of `len` copies of `element`.
    fn full(element: Self::Element, len: usize) -> Self {
        let mut lanes = vec![0.0; Self::Element::NCOMP];
        element.write_lanes(&mut lanes);
        Self::assemble(lanes.into_iter().map(|v| Column::full(len, v)).collect())
    }

    /// An array of `len` zero vectors.
    fn origin(len: usize) -> Self {
        Self::full(Self::Element::default(), len)
    }

    /// Zero vectors with the same nesting as `like`.
    fn origin_like(like: &Nested<Self>) -> Nested<Self> {
        like.map_content(|array| Self::origin(array.len()))
    }

    fn from_rows(rows: &[Self::Element]) -> Self {
        Self::assemble(scatter(rows))
    }

    fn get(&self, index: usize) -> Option<Self::Element> {
        let lanes = self
            .columns()
            .iter()
            .map(|c| c.get(index))
            .collect::<Option<Vec<f64>>>()?;
        Some(Self::Element::read_lanes(&lanes))
    }

    fn to_vec(&self) -> Vec<Self::Element> {
        self.map_rows(|v| v)
    }

    /// A stored component by ROOT name (`fX`) or field name (`x`).
    fn column(&self, name: &str) -> Option<Column> {
        let index = Self::COLUMN_NAMES
            .iter()
            .position(|n| *n == name)
            .or_else(|| Self::FIELD_NAMES.iter().position(|n| *n == name))?;
        self.columns().into_iter().nth(index)
    }

    /// The stored components keyed by ROOT name.
    fn column_map(&self) -> IndexMap<String, Column> {
        Self::COLUMN_NAMES
            .iter()
            .map(|n| n.to_string())
            .zip(self.columns())
            .collect()
    }

    /// Run a scalar kernel over every row.
    fn map_rows<O, F>(&self, f: F) -> Vec<O>
    where
        O: Send,
        F: Fn(Self::Element) -> O + Send + Sync,
    {
        let columns = self.columns();
        let inputs: Vec<&Column> = columns.iter().collect();
        vectorize(&inputs, f)
    }

    fn map_real<F>(&self, f: F) -> Column
    where
        F: Fn(Self::Element) -> f64 + Send + Sync,
    {
        Column::new(self.map_rows(f))
    }

    fn map_mask<F>(&self, f: F) -> Mask
    where
        F: Fn(Self::Element) -> bool + Send + Sync,
    {
        self.map_rows(f)
    }

    /// Run a binary scalar kernel over the rows of two arrays of equal length.
    fn zip_rows<B, O, F>(&self, other: &B, f: F) -> HepvecResult<Vec<O>>
    where
        B: VectorArray,
        O: Send,
        F: Fn(Self::Element, B::Element) -> O + Send + Sync,
    {
        if self.len() != other.len() {
            return Err(HepvecError::LengthMismatch {
                expected: self.len(),
                found: other.len(),
            });
        }
        let lhs = self.columns();
        let rhs = other.columns();
        let inputs: Vec<&Column> = lhs.iter().chain(rhs.iter()).collect();
        Ok(vectorize(&inputs, |(a, b): (Self::Element, B::Element)| {
            f(a, b)
        }))
    }

    /// The vector sum of every row.
    fn sum(&self) -> <Self::Cartesian as VectorArray>::Element {
        let lanes: Vec<f64> = self
            .to_cartesian()
            .columns()
            .iter()
            .map(Column::sum)
            .collect();
        <Self::Cartesian as VectorArray>::Element::read_lanes(&lanes)
    }
}

/// The default [`VectorArray::coerce`]: arrays of the same type are used as they are and
/// single vectors are repeated `len` times.
pub fn coerce_own<A: VectorArray>(value: &Value, len: usize) -> HepvecResult<A> {
    if let Some(array) = A::array_of(value) {
        return match array {
            Nested::Flat(array) if array.len() == len => Ok(array.clone()),
            Nested::Flat(array) => Err(HepvecError::LengthMismatch {
                expected: len,
                found: array.len(),
            }),
            Nested::Jagged(_) => Err(HepvecError::InvalidOperands {
                operation: format!("coerce to {}", A::KIND),
                reason: "jagged operands must be aligned before dispatch".to_string(),
            }),
        };
    }
    if let Some(element) = A::element_of(value) {
        return Ok(A::full(element, len));
    }
    Err(HepvecError::TypeMismatch {
        operation: format!("convert {} to", value.describe()),
        operands: A::KIND.to_string(),
    })
}

fn take_columns<A: VectorArray>(array: &A, indices: &[Option<usize>]) -> A {
    A::assemble(array.columns().iter().map(|c| c.take(indices)).collect())
}

fn flat_column(
    arg: Nested<Column>,
    constructor: &'static str,
    alternative: &'static str,
) -> HepvecResult<Column> {
    match arg {
        Nested::Flat(column) => Ok(column),
        Nested::Jagged(_) => Err(HepvecError::JaggedInput {
            constructor,
            alternative,
        }),
    }
}

pub(crate) fn component_operands<A: VectorArray>(array: &Nested<A>) -> Vec<Operand> {
    (0..A::KIND.ncomp())
        .map(|k| {
            Operand::Array(array.map_content(|a| a.columns().swap_remove(k)))
        })
        .collect()
}

fn check_component_count(
    kind: VectorKind,
    coordinates: Coordinates,
    components: &[Operand],
) -> HepvecResult<()> {
    if components.len() != kind.ncomp() {
        return Err(HepvecError::InvalidOperands {
            operation: format!("construct {kind} from {coordinates} coordinates"),
            reason: format!(
                "expected {} components, found {}",
                kind.ncomp(),
                components.len()
            ),
        });
    }
    Ok(())
}

/// A columnar array of two-dimensional vectors.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "ArrayRecord", try_from = "ArrayRecord")]
pub struct Vec2Array {
    x: Column,
    y: Column,
}

impl Vec2Array {
    /// Build an array from flat columns of equal length.
    ///
    /// # Errors
    /// Jagged arguments are rejected with [`HepvecError::JaggedInput`]; use
    /// [`Vec2Array::from_cartesian`] for those.
    pub fn new(x: impl Into<Nested<Column>>, y: impl Into<Nested<Column>>) -> HepvecResult<Self> {
        const ALT: &str = "Vec2Array::from_cartesian";
        Self::from_columns(vec![
            flat_column(x.into(), "Vec2Array::new", ALT)?,
            flat_column(y.into(), "Vec2Array::new", ALT)?,
        ])
    }

    /// Build from Cartesian components, each of which may be a scalar, a flat column, or a
    /// jagged column.
    pub fn from_cartesian(x: impl Into<Operand>, y: impl Into<Operand>) -> HepvecResult<Nested<Self>> {
        broadcast::apply(&[x.into(), y.into()], |c| Self::from_columns(c.to_vec()))
    }

    pub fn from_polar(rho: impl Into<Operand>, phi: impl Into<Operand>) -> HepvecResult<Nested<Self>> {
        broadcast::apply(&[rho.into(), phi.into()], |c| {
            Ok(Self::from_rows(&vectorize(&[&c[0], &c[1]], |[rho, phi]: [f64; 2]| {
                Vec2::from_polar(rho, phi)
            })))
        })
    }

    /// Alias of [`Vec2Array::from_polar`].
    pub fn from_circular(rho: impl Into<Operand>, phi: impl Into<Operand>) -> HepvecResult<Nested<Self>> {
        Self::from_polar(rho, phi)
    }

    pub fn from_coordinates(
        coordinates: Coordinates,
        components: &[Operand],
    ) -> HepvecResult<Nested<Self>> {
        check_component_count(Self::KIND, coordinates, components)?;
        let [a, b] = [components[0].clone(), components[1].clone()];
        match coordinates {
            Coordinates::Cartesian => Self::from_cartesian(a, b),
            Coordinates::Polar => Self::from_polar(a, b),
            _ => Err(HepvecError::UnsupportedCoordinates {
                coordinates,
                kind: Self::KIND,
            }),
        }
    }

    pub fn set_x(&mut self, x: impl Into<Column>) -> HepvecResult<()> {
        let x = x.into();
        check_replacement(&self.x, &x)?;
        self.x = x;
        Ok(())
    }

    pub fn set_y(&mut self, y: impl Into<Column>) -> HepvecResult<()> {
        let y = y.into();
        check_replacement(&self.y, &y)?;
        self.y = y;
        Ok(())
    }

    pub fn dot(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.dot(&b))?))
    }

    pub fn cosdelta(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.cosdelta(&b))?))
    }

    pub fn angle(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.angle(&b))?))
    }

    pub fn delta_phi(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.delta_phi(&b))?))
    }

    pub fn rotate(&self, angle: f64) -> Self {
        Self::from_rows(&self.map_rows(|v| v.rotate(angle)))
    }

    pub fn unit(&self) -> Self {
        Self::from_rows(&self.map_rows(|v| v.unit()))
    }

    pub fn is_parallel(&self, other: &Self, tolerance: f64) -> HepvecResult<Mask> {
        self.zip_rows(other, |a, b| a.is_parallel(&b, tolerance))
    }

    pub fn is_antiparallel(&self, other: &Self, tolerance: f64) -> HepvecResult<Mask> {
        self.zip_rows(other, |a, b| a.is_antiparallel(&b, tolerance))
    }

    pub fn is_collinear(&self, other: &Self, tolerance: f64) -> HepvecResult<Mask> {
        self.zip_rows(other, |a, b| a.is_collinear(&b, tolerance))
    }

    pub fn is_opposite(&self, other: &Self, tolerance: f64) -> HepvecResult<Mask> {
        self.zip_rows(other, |a, b| a.is_opposite(&b, tolerance))
    }

    pub fn is_perpendicular(&self, other: &Self, tolerance: f64) -> HepvecResult<Mask> {
        self.zip_rows(other, |a, b| a.is_perpendicular(&b, tolerance))
    }
}

fn check_replacement(current: &Column, replacement: &Column) -> HepvecResult<()> {
    if current.len() != replacement.len() {
        return Err(HepvecError::LengthMismatch {
            expected: current.len(),
            found: replacement.len(),
        });
    }
    Ok(())
}

impl Content for Vec2Array {
    fn len(&self) -> usize {
        self.x.len()
    }

    fn take(&self, indices: &[Option<usize>]) -> Self {
        take_columns(self, indices)
    }
}

impl VectorArray for Vec2Array {
    type Element = Vec2;
    type Cartesian = Vec2Array;
    const KIND: VectorKind = VectorKind::Vector2;
    const COORDINATES: Coordinates = Coordinates::Cartesian;
    const COLUMN_NAMES: &'static [&'static str] = &["fX", "fY"];
    const FIELD_NAMES: &'static [&'static str] = &["x", "y"];

    fn columns(&self) -> Vec<Column> {
        vec![self.x.clone(), self.y.clone()]
    }

    fn assemble(columns: Vec<Column>) -> Self {
        let mut it = columns.into_iter();
        Self {
            x: it.next().unwrap_or_default(),
            y: it.next().unwrap_or_default(),
        }
    }

    fn to_cartesian(&self) -> Self {
        self.clone()
    }

    fn wrap_value(array: Nested<Self>) -> Value {
        Value::Vec2Array(array)
    }

    fn array_of(value: &Value) -> Option<&Nested<Self>> {
        match value {
            Value::Vec2Array(array) => Some(array),
            _ => None,
        }
    }

    fn element_of(value: &Value) -> Option<Vec2> {
        match value {
            Value::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    fn element_value(element: Vec2) -> Value {
        Value::Vec2(element)
    }
}

impl VectorOps for Vec2Array {
    type Real = Column;
    type Mask = Mask;
    fn mag2(&self) -> Column {
        self.map_real(|v| v.mag2())
    }
    fn mag(&self) -> Column {
        self.map_real(|v| v.mag())
    }
}

impl PlanarOps for Vec2Array {
    fn x(&self) -> Column {
        self.x.clone()
    }
    fn y(&self) -> Column {
        self.y.clone()
    }
    fn rho(&self) -> Column {
        self.map_real(|v| v.rho())
    }
    fn rho2(&self) -> Column {
        self.map_real(|v| v.rho2())
    }
    fn phi(&self) -> Column {
        self.map_real(|v| v.phi())
    }
}

/// A columnar array of three-dimensional vectors.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "ArrayRecord", try_from = "ArrayRecord")]
pub struct Vec3Array {
    x: Column,
    y: Column,
    z: Column,
}

impl Vec3Array {
    /// Build an array from flat columns of equal length.
    ///
    /// # Errors
    /// Jagged arguments are rejected with [`HepvecError::JaggedInput`]; use
    /// [`Vec3Array::from_cartesian`] for those.
    pub fn new(
        x: impl Into<Nested<Column>>,
        y: impl Into<Nested<Column>>,
        z: impl Into<Nested<Column>>,
    ) -> HepvecResult<Self> {
        const ALT: &str = "Vec3Array::from_cartesian";
        Self::from_columns(vec![
            flat_column(x.into(), "Vec3Array::new", ALT)?,
            flat_column(y.into(), "Vec3Array::new", ALT)?,
            flat_column(z.into(), "Vec3Array::new", ALT)?,
        ])
    }

    pub fn from_cartesian(
        x: impl Into<Operand>,
        y: impl Into<Operand>,
        z: impl Into<Operand>,
    ) -> HepvecResult<Nested<Self>> {
        broadcast::apply(&[x.into(), y.into(), z.into()], |c| {
            Self::from_columns(c.to_vec())
        })
    }

    pub fn from_spherical(
        r: impl Into<Operand>,
        theta: impl Into<Operand>,
        phi: impl Into<Operand>,
    ) -> HepvecResult<Nested<Self>> {
        broadcast::apply(&[r.into(), theta.into(), phi.into()], |c| {
            Ok(Self::from_rows(&vectorize(
                &[&c[0], &c[1], &c[2]],
                |[r, theta, phi]: [f64; 3]| Vec3::from_spherical(r, theta, phi),
            )))
        })
    }

    pub fn from_cylindrical(
        rho: impl Into<Operand>,
        phi: impl Into<Operand>,
        z: impl Into<Operand>,
    ) -> HepvecResult<Nested<Self>> {
        broadcast::apply(&[rho.into(), phi.into(), z.into()], |c| {
            Ok(Self::from_rows(&vectorize(
                &[&c[0], &c[1], &c[2]],
                |[rho, phi, z]: [f64; 3]| Vec3::from_cylindrical(rho, phi, z),
            )))
        })
    }

    pub fn from_coordinates(
        coordinates: Coordinates,
        components: &[Operand],
    ) -> HepvecResult<Nested<Self>> {
        check_component_count(Self::KIND, coordinates, components)?;
        let [a, b, c] = [
            components[0].clone(),
            components[1].clone(),
            components[2].clone(),
        ];
        match coordinates {
            Coordinates::Cartesian => Self::from_cartesian(a, b, c),
            Coordinates::Spherical => Self::from_spherical(a, b, c),
            Coordinates::Cylindrical => Self::from_cylindrical(a, b, c),
            _ => Err(HepvecError::UnsupportedCoordinates {
                coordinates,
                kind: Self::KIND,
            }),
        }
    }

    pub fn set_x(&mut self, x: impl Into<Column>) -> HepvecResult<()> {
        let x = x.into();
        check_replacement(&self.x, &x)?;
        self.x = x;
        Ok(())
    }

    pub fn set_y(&mut self, y: impl Into<Column>) -> HepvecResult<()> {
        let y = y.into();
        check_replacement(&self.y, &y)?;
        self.y = y;
        Ok(())
    }

    pub fn set_z(&mut self, z: impl Into<Column>) -> HepvecResult<()> {
        let z = z.into();
        check_replacement(&self.z, &z)?;
        self.z = z;
        Ok(())
    }

    /// The transverse ($`x`$, $`y`$) part.
    pub fn xy(&self) -> Vec2Array {
        Vec2Array {
            x: self.x.clone(),
            y: self.y.clone(),
        }
    }

    /// Lorentz vectors with this momentum and the given masses.
    pub fn with_mass(&self, mass: &Column) -> HepvecResult<Vec4Array> {
        check_replacement(&self.x, mass)?;
        let rows = vectorize(
            &[&self.x, &self.y, &self.z, mass],
            |(p, m): (Vec3, f64)| p.with_mass(m),
        );
        Ok(Vec4Array::from_rows(&rows))
    }

    /// Lorentz vectors with this momentum and the given energies.
    pub fn with_energy(&self, energy: &Column) -> HepvecResult<Vec4Array> {
        check_replacement(&self.x, energy)?;
        Vec4Array::from_columns(vec![
            self.x.clone(),
            self.y.clone(),
            self.z.clone(),
            energy.clone(),
        ])
    }

    pub fn dot(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.dot(&b))?))
    }

    pub fn cross(&self, other: &Self) -> HepvecResult<Self> {
        Ok(Self::from_rows(&self.zip_rows(other, |a, b| a.cross(&b))?))
    }

    pub fn cosdelta(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.cosdelta(&b))?))
    }

    pub fn angle(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.angle(&b))?))
    }

    /// The angle to `other`, signed by the orientation of the pair about `normal`.
    pub fn signed_angle(&self, other: &Self, normal: &Vec3) -> HepvecResult<Column> {
        let normal = *normal;
        Ok(Column::new(
            self.zip_rows(other, |a, b| a.signed_angle(&b, &normal))?,
        ))
    }

    pub fn delta_phi(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.delta_phi(&b))?))
    }

    pub fn unit(&self) -> Self {
        Self::from_rows(&self.map_rows(|v| v.unit()))
    }

    pub fn rotate_axis(&self, axis: &Vec3, angle: f64) -> Self {
        let axis = *axis;
        Self::from_rows(&self.map_rows(|v| v.rotate_axis(&axis, angle)))
    }

    pub fn rotate_euler(&self, phi: f64, theta: f64, psi: f64) -> Self {
        Self::from_rows(&self.map_rows(|v| v.rotate_euler(phi, theta, psi)))
    }

    pub fn rotate_x(&self, angle: f64) -> Self {
        Self::from_rows(&self.map_rows(|v| v.rotate_x(angle)))
    }

    pub fn rotate_y(&self, angle: f64) -> Self {
        Self::from_rows(&self.map_rows(|v| v.rotate_y(angle)))
    }

    pub fn rotate_z(&self, angle: f64) -> Self {
        Self::from_rows(&self.map_rows(|v| v.rotate_z(angle)))
    }

    pub fn is_parallel(&self, other: &Self, tolerance: f64) -> HepvecResult<Mask> {
        self.zip_rows(other, |a, b| a.is_parallel(&b, tolerance))
    }

    pub fn is_antiparallel(&self, other: &Self, tolerance: f64) -> HepvecResult<Mask> {
        self.zip_rows(other, |a, b| a.is_antiparallel(&b, tolerance))
    }

    pub fn is_collinear(&self, other: &Self, tolerance: f64) -> HepvecResult<Mask> {
        self.zip_rows(other, |a, b| a.is_collinear(&b, tolerance))
    }

    pub fn is_opposite(&self, other: &Self, tolerance: f64) -> HepvecResult<Mask> {
        self.zip_rows(other, |a, b| a.is_opposite(&b, tolerance))
    }

    pub fn is_perpendicular(&self, other: &Self, tolerance: f64) -> HepvecResult<Mask> {
        self.zip_rows(other, |a, b| a.is_perpendicular(&b, tolerance))
    }
}

impl Content for Vec3Array {
    fn len(&self) -> usize {
        self.x.len()
    }

    fn take(&self, indices: &[Option<usize>]) -> Self {
        take_columns(self, indices)
    }
}

impl VectorArray for Vec3Array {
    type Element = Vec3;
    type Cartesian = Vec3Array;
    const KIND: VectorKind = VectorKind::Vector3;
    const COORDINATES: Coordinates = Coordinates::Cartesian;
    const COLUMN_NAMES: &'static [&'static str] = &["fX", "fY", "fZ"];
    const FIELD_NAMES: &'static [&'static str] = &["x", "y", "z"];

    fn columns(&self) -> Vec<Column> {
        vec![self.x.clone(), self.y.clone(), self.z.clone()]
    }

    fn assemble(columns: Vec<Column>) -> Self {
        let mut it = columns.into_iter();
        Self {
            x: it.next().unwrap_or_default(),
            y: it.next().unwrap_or_default(),
            z: it.next().unwrap_or_default(),
        }
    }

    fn to_cartesian(&self) -> Self {
        self.clone()
    }

    fn wrap_value(array: Nested<Self>) -> Value {
        Value::Vec3Array(array)
    }

    fn array_of(value: &Value) -> Option<&Nested<Self>> {
        match value {
            Value::Vec3Array(array) => Some(array),
            _ => None,
        }
    }

    fn element_of(value: &Value) -> Option<Vec3> {
        match value {
            Value::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    fn element_value(element: Vec3) -> Value {
        Value::Vec3(element)
    }
}

impl VectorOps for Vec3Array {
    type Real = Column;
    type Mask = Mask;
    fn mag2(&self) -> Column {
        self.map_real(|v| v.mag2())
    }
    fn mag(&self) -> Column {
        self.map_real(|v| v.mag())
    }
}

impl PlanarOps for Vec3Array {
    fn x(&self) -> Column {
        self.x.clone()
    }
    fn y(&self) -> Column {
        self.y.clone()
    }
    fn rho(&self) -> Column {
        self.map_real(|v| v.rho())
    }
    fn rho2(&self) -> Column {
        self.map_real(|v| v.rho2())
    }
    fn phi(&self) -> Column {
        self.map_real(|v| v.phi())
    }
}

impl SpatialOps for Vec3Array {
    fn z(&self) -> Column {
        self.z.clone()
    }
    fn theta(&self) -> Column {
        self.map_real(|v| v.theta())
    }
    fn costheta(&self) -> Column {
        self.map_real(|v| v.costheta())
    }
    fn cottheta(&self) -> Column {
        self.map_real(|v| v.cottheta())
    }
}

/// A columnar array of Cartesian Lorentz vectors.
///
/// `pt`, `eta`, `phi`, and `mass` are memoized on first use. The cache is shared by clones and
/// by every jagged view of the same array, and is replaced when a component is set.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "ArrayRecord", try_from = "ArrayRecord")]
pub struct Vec4Array {
    x: Column,
    y: Column,
    z: Column,
    t: Column,
    cache: Arc<MemoCache>,
}

impl Vec4Array {
    /// Build an array from flat columns of equal length.
    ///
    /// # Errors
    /// Jagged arguments are rejected with [`HepvecError::JaggedInput`]; use
    /// [`Vec4Array::from_cartesian`] for those.
    pub fn new(
        x: impl Into<Nested<Column>>,
        y: impl Into<Nested<Column>>,
        z: impl Into<Nested<Column>>,
        t: impl Into<Nested<Column>>,
    ) -> HepvecResult<Self> {
        const ALT: &str = "Vec4Array::from_cartesian";
        Self::from_columns(vec![
            flat_column(x.into(), "Vec4Array::new", ALT)?,
            flat_column(y.into(), "Vec4Array::new", ALT)?,
            flat_column(z.into(), "Vec4Array::new", ALT)?,
            flat_column(t.into(), "Vec4Array::new", ALT)?,
        ])
    }

    pub fn from_cartesian(
        x: impl Into<Operand>,
        y: impl Into<Operand>,
        z: impl Into<Operand>,
        t: impl Into<Operand>,
    ) -> HepvecResult<Nested<Self>> {
        broadcast::apply(&[x.into(), y.into(), z.into(), t.into()], |c| {
            Self::from_columns(c.to_vec())
        })
    }

    /// Combine three-momenta with time components, broadcasting either against the other.
    pub fn from_p3(p3: &Nested<Vec3Array>, t: impl Into<Operand>) -> HepvecResult<Nested<Self>> {
        let mut operands = component_operands(p3);
        operands.push(t.into());
        broadcast::apply(&operands, |c| Self::from_columns(c.to_vec()))
    }

    pub fn from_spherical(
        r: impl Into<Operand>,
        theta: impl Into<Operand>,
        phi: impl Into<Operand>,
        t: impl Into<Operand>,
    ) -> HepvecResult<Nested<Self>> {
        broadcast::apply(&[r.into(), theta.into(), phi.into(), t.into()], |c| {
            Ok(Self::from_rows(&vectorize(
                &[&c[0], &c[1], &c[2], &c[3]],
                |[r, theta, phi, t]: [f64; 4]| Vec4::from_spherical(r, theta, phi, t),
            )))
        })
    }

    pub fn from_cylindrical(
        rho: impl Into<Operand>,
        phi: impl Into<Operand>,
        z: impl Into<Operand>,
        t: impl Into<Operand>,
    ) -> HepvecResult<Nested<Self>> {
        broadcast::apply(&[rho.into(), phi.into(), z.into(), t.into()], |c| {
            Ok(Self::from_rows(&vectorize(
                &[&c[0], &c[1], &c[2], &c[3]],
                |[rho, phi, z, t]: [f64; 4]| Vec4::from_cylindrical(rho, phi, z, t),
            )))
        })
    }

    /// Build from momentum and a signed mass (see [`Vec4::from_xyzm`]).
    pub fn from_xyzm(
        x: impl Into<Operand>,
        y: impl Into<Operand>,
        z: impl Into<Operand>,
        m: impl Into<Operand>,
    ) -> HepvecResult<Nested<Self>> {
        broadcast::apply(&[x.into(), y.into(), z.into(), m.into()], |c| {
            Ok(Self::from_rows(&vectorize(
                &[&c[0], &c[1], &c[2], &c[3]],
                |[x, y, z, m]: [f64; 4]| Vec4::from_xyzm(x, y, z, m),
            )))
        })
    }

    /// Build from transverse momentum, pseudorapidity, azimuth, and energy. The given `pt`,
    /// `eta`, and `phi` are stored in the memo cache as they are.
    pub fn from_ptetaphie(
        pt: impl Into<Operand>,
        eta: impl Into<Operand>,
        phi: impl Into<Operand>,
        e: impl Into<Operand>,
    ) -> HepvecResult<Nested<Self>> {
        broadcast::apply(&[pt.into(), eta.into(), phi.into(), e.into()], |c| {
            let array = Self::from_rows(&vectorize(
                &[&c[0], &c[1], &c[2], &c[3]],
                |[pt, eta, phi, e]: [f64; 4]| Vec4::from_ptetaphie(pt, eta, phi, e),
            ));
            array.cache.seed("pt", c[0].clone());
            array.cache.seed("eta", c[1].clone());
            array.cache.seed("phi", c[2].clone());
            Ok(array)
        })
    }

    /// Alias of [`Vec4Array::from_ptetaphie`].
    pub fn from_ptetaphi(
        pt: impl Into<Operand>,
        eta: impl Into<Operand>,
        phi: impl Into<Operand>,
        e: impl Into<Operand>,
    ) -> HepvecResult<Nested<Self>> {
        Self::from_ptetaphie(pt, eta, phi, e)
    }

    /// Build vectors stored as $`(p_T, \eta, \phi, m)`$.
    pub fn from_ptetaphim(
        pt: impl Into<Operand>,
        eta: impl Into<Operand>,
        phi: impl Into<Operand>,
        mass: impl Into<Operand>,
    ) -> HepvecResult<Nested<PtEtaPhiMassArray>> {
        PtEtaPhiMassArray::from_ptetaphim(pt, eta, phi, mass)
    }

    /// Build Cartesian vectors from components in any supported coordinate system.
    pub fn from_coordinates(
        coordinates: Coordinates,
        components: &[Operand],
    ) -> HepvecResult<Nested<Self>> {
        check_component_count(Self::KIND, coordinates, components)?;
        let [a, b, c, d] = [
            components[0].clone(),
            components[1].clone(),
            components[2].clone(),
            components[3].clone(),
        ];
        match coordinates {
            Coordinates::Cartesian => Self::from_cartesian(a, b, c, d),
            Coordinates::Spherical => Self::from_spherical(a, b, c, d),
            Coordinates::Cylindrical => Self::from_cylindrical(a, b, c, d),
            Coordinates::XYZM => Self::from_xyzm(a, b, c, d),
            Coordinates::PtEtaPhiE => Self::from_ptetaphie(a, b, c, d),
            Coordinates::PtEtaPhiMass => {
                Ok(Self::from_ptetaphim(a, b, c, d)?.map_content(PtEtaPhiMassArray::to_cartesian))
            }
            Coordinates::Polar => Err(HepvecError::UnsupportedCoordinates {
                coordinates,
                kind: Self::KIND,
            }),
        }
    }

    pub fn cache(&self) -> &MemoCache {
        &self.cache
    }

    /// Drop every memoized quantity of this array (and of every view sharing its cache).
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn detach_cache(&mut self) {
        debug!("component replaced; detaching memo cache");
        self.cache = Arc::new(MemoCache::new());
    }

    fn memo<F>(&self, name: &str, f: F) -> Column
    where
        F: Fn(Vec4) -> f64 + Send + Sync,
    {
        self.cache.get_or_compute(name, || self.map_real(f))
    }

    pub fn set_x(&mut self, x: impl Into<Column>) -> HepvecResult<()> {
        let x = x.into();
        check_replacement(&self.x, &x)?;
        self.x = x;
        self.detach_cache();
        Ok(())
    }

    pub fn set_y(&mut self, y: impl Into<Column>) -> HepvecResult<()> {
        let y = y.into();
        check_replacement(&self.y, &y)?;
        self.y = y;
        self.detach_cache();
        Ok(())
    }

    pub fn set_z(&mut self, z: impl Into<Column>) -> HepvecResult<()> {
        let z = z.into();
        check_replacement(&self.z, &z)?;
        self.z = z;
        self.detach_cache();
        Ok(())
    }

    pub fn set_t(&mut self, t: impl Into<Column>) -> HepvecResult<()> {
        let t = t.into();
        check_replacement(&self.t, &t)?;
        self.t = t;
        self.detach_cache();
        Ok(())
    }

    /// The spatial parts.
    pub fn p3(&self) -> Vec3Array {
        Vec3Array {
            x: self.x.clone(),
            y: self.y.clone(),
            z: self.z.clone(),
        }
    }

    /// The velocities $`\vec{p} / E`$.
    pub fn boostp3(&self) -> Vec3Array {
        Vec3Array::from_rows(&self.map_rows(|v| v.boostp3()))
    }

    pub fn dot(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.dot(&b))?))
    }

    /// Boost every vector by the same velocity.
    pub fn boost(&self, beta: &Vec3) -> Self {
        let beta = *beta;
        Self::from_rows(&self.map_rows(|v| v.boost(&beta)))
    }

    /// Boost each vector by the velocity in the same row of `beta`.
    pub fn boost_each(&self, beta: &Vec3Array) -> HepvecResult<Self> {
        Ok(Self::from_rows(&self.zip_rows(beta, |v, b| v.boost(&b))?))
    }

    pub fn delta_phi(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.delta_phi(&b))?))
    }

    pub fn delta_r2(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.delta_r2(&b))?))
    }

    pub fn delta_r(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.delta_r(&b))?))
    }

    pub fn rotate_axis(&self, axis: &Vec3, angle: f64) -> Self {
        let axis = *axis;
        Self::from_rows(&self.map_rows(|v| v.rotate_axis(&axis, angle)))
    }

    pub fn rotate_euler(&self, phi: f64, theta: f64, psi: f64) -> Self {
        Self::from_rows(&self.map_rows(|v| v.rotate_euler(phi, theta, psi)))
    }

    pub fn rotate_x(&self, angle: f64) -> Self {
        Self::from_rows(&self.map_rows(|v| v.rotate_x(angle)))
    }

    pub fn rotate_y(&self, angle: f64) -> Self {
        Self::from_rows(&self.map_rows(|v| v.rotate_y(angle)))
    }

    pub fn rotate_z(&self, angle: f64) -> Self {
        Self::from_rows(&self.map_rows(|v| v.rotate_z(angle)))
    }

    pub fn unit(&self) -> Self {
        Self::from_rows(&self.map_rows(|v| v.unit()))
    }
}

impl Content for Vec4Array {
    fn len(&self) -> usize {
        self.x.len()
    }

    fn take(&self, indices: &[Option<usize>]) -> Self {
        take_columns(self, indices)
    }
}

impl VectorArray for Vec4Array {
    type Element = Vec4;
    type Cartesian = Vec4Array;
    const KIND: VectorKind = VectorKind::Lorentz;
    const COORDINATES: Coordinates = Coordinates::Cartesian;
    const COLUMN_NAMES: &'static [&'static str] = &["fX", "fY", "fZ", "fE"];
    const FIELD_NAMES: &'static [&'static str] = &["x", "y", "z", "t"];

    fn columns(&self) -> Vec<Column> {
        vec![
            self.x.clone(),
            self.y.clone(),
            self.z.clone(),
            self.t.clone(),
        ]
    }

    fn assemble(columns: Vec<Column>) -> Self {
        let mut it = columns.into_iter();
        Self {
            x: it.next().unwrap_or_default(),
            y: it.next().unwrap_or_default(),
            z: it.next().unwrap_or_default(),
            t: it.next().unwrap_or_default(),
            cache: Arc::new(MemoCache::new()),
        }
    }

    fn to_cartesian(&self) -> Self {
        self.clone()
    }

    fn wrap_value(array: Nested<Self>) -> Value {
        Value::Vec4Array(array)
    }

    fn array_of(value: &Value) -> Option<&Nested<Self>> {
        match value {
            Value::Vec4Array(array) => Some(array),
            _ => None,
        }
    }

    fn element_of(value: &Value) -> Option<Vec4> {
        match value {
            Value::Vec4(v) => Some(*v),
            _ => None,
        }
    }

    fn element_value(element: Vec4) -> Value {
        Value::Vec4(element)
    }

    // Lorentz vectors in either representation combine in Cartesian form.
    fn coerce(value: &Value, len: usize) -> HepvecResult<Self> {
        match value {
            Value::PtEtaPhiMassArray(_) | Value::PtEtaPhiMass(_) => {
                Ok(PtEtaPhiMassArray::coerce(value, len)?.to_cartesian())
            }
            _ => coerce_own(value, len),
        }
    }
}

impl VectorOps for Vec4Array {
    type Real = Column;
    type Mask = Mask;
    fn mag2(&self) -> Column {
        self.map_real(|v| v.mag2())
    }
    fn mag(&self) -> Column {
        self.mass()
    }
}

impl LorentzOps for Vec4Array {
    fn x(&self) -> Column {
        self.x.clone()
    }
    fn y(&self) -> Column {
        self.y.clone()
    }
    fn z(&self) -> Column {
        self.z.clone()
    }
    fn t(&self) -> Column {
        self.t.clone()
    }
    fn pt(&self) -> Column {
        self.memo("pt", |v| v.pt())
    }
    fn pt2(&self) -> Column {
        self.map_real(|v| v.pt2())
    }
    fn eta(&self) -> Column {
        self.memo("eta", |v| v.eta())
    }
    fn phi(&self) -> Column {
        self.memo("phi", |v| v.phi())
    }
    fn theta(&self) -> Column {
        self.map_real(|v| v.theta())
    }
    fn cottheta(&self) -> Column {
        self.map_real(|v| v.cottheta())
    }
    fn mass(&self) -> Column {
        self.memo("mass", |v| v.mass())
    }
    fn mass2(&self) -> Column {
        self.map_real(|v| v.mass2())
    }
    fn p(&self) -> Column {
        self.map_real(|v| v.p())
    }
    fn p2(&self) -> Column {
        self.map_real(|v| v.p2())
    }
    fn mt(&self) -> Column {
        self.map_real(|v| v.mt())
    }
    fn mt2(&self) -> Column {
        self.map_real(|v| v.mt2())
    }
    fn et(&self) -> Column {
        self.map_real(|v| v.et())
    }
    fn rapidity(&self) -> Column {
        self.map_real(|v| v.rapidity())
    }
    fn beta(&self) -> Column {
        self.map_real(|v| v.beta())
    }
    fn gamma(&self) -> Column {
        self.map_real(|v| v.gamma())
    }
    fn is_spacelike(&self, tolerance: f64) -> Mask {
        self.map_mask(|v| v.is_spacelike(tolerance))
    }
    fn is_timelike(&self, tolerance: f64) -> Mask {
        self.map_mask(|v| v.is_timelike(tolerance))
    }
    fn is_lightlike(&self, tolerance: f64) -> Mask {
        self.map_mask(|v| v.is_lightlike(tolerance))
    }
}

/// A columnar array of Lorentz vectors stored as $`(p_T, \eta, \phi, m)`$.
///
/// The Cartesian components and `p` are memoized on first use.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "ArrayRecord", try_from = "ArrayRecord")]
pub struct PtEtaPhiMassArray {
    pt: Column,
    eta: Column,
    phi: Column,
    mass: Column,
    cache: Arc<MemoCache>,
}

impl PtEtaPhiMassArray {
    /// Build an array from flat columns of equal length.
    ///
    /// # Errors
    /// Jagged arguments are rejected with [`HepvecError::JaggedInput`]; use
    /// [`PtEtaPhiMassArray::from_ptetaphim`] for those.
    pub fn new(
        pt: impl Into<Nested<Column>>,
        eta: impl Into<Nested<Column>>,
        phi: impl Into<Nested<Column>>,
        mass: impl Into<Nested<Column>>,
    ) -> HepvecResult<Self> {
        const ALT: &str = "PtEtaPhiMassArray::from_ptetaphim";
        Self::from_columns(vec![
            flat_column(pt.into(), "PtEtaPhiMassArray::new", ALT)?,
            flat_column(eta.into(), "PtEtaPhiMassArray::new", ALT)?,
            flat_column(phi.into(), "PtEtaPhiMassArray::new", ALT)?,
            flat_column(mass.into(), "PtEtaPhiMassArray::new", ALT)?,
        ])
    }

    pub fn from_ptetaphim(
        pt: impl Into<Operand>,
        eta: impl Into<Operand>,
        phi: impl Into<Operand>,
        mass: impl Into<Operand>,
    ) -> HepvecResult<Nested<Self>> {
        broadcast::apply(&[pt.into(), eta.into(), phi.into(), mass.into()], |c| {
            Self::from_columns(c.to_vec())
        })
    }

    pub fn cache(&self) -> &MemoCache {
        &self.cache
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn detach_cache(&mut self) {
        debug!("component replaced; detaching memo cache");
        self.cache = Arc::new(MemoCache::new());
    }

    fn memo<F>(&self, name: &str, f: F) -> Column
    where
        F: Fn(PtEtaPhiMassVec4) -> f64 + Send + Sync,
    {
        self.cache.get_or_compute(name, || self.map_real(f))
    }

    pub fn set_pt(&mut self, pt: impl Into<Column>) -> HepvecResult<()> {
        let pt = pt.into();
        check_replacement(&self.pt, &pt)?;
        self.pt = pt;
        self.detach_cache();
        Ok(())
    }

    pub fn set_eta(&mut self, eta: impl Into<Column>) -> HepvecResult<()> {
        let eta = eta.into();
        check_replacement(&self.eta, &eta)?;
        self.eta = eta;
        self.detach_cache();
        Ok(())
    }

    pub fn set_phi(&mut self, phi: impl Into<Column>) -> HepvecResult<()> {
        let phi = phi.into();
        check_replacement(&self.phi, &phi)?;
        self.phi = phi;
        self.detach_cache();
        Ok(())
    }

    pub fn set_mass(&mut self, mass: impl Into<Column>) -> HepvecResult<()> {
        let mass = mass.into();
        check_replacement(&self.mass, &mass)?;
        self.mass = mass;
        self.detach_cache();
        Ok(())
    }

    pub fn p3(&self) -> Vec3Array {
        Vec3Array {
            x: LorentzOps::x(self),
            y: LorentzOps::y(self),
            z: LorentzOps::z(self),
        }
    }

    pub fn boostp3(&self) -> Vec3Array {
        Vec3Array::from_rows(&self.map_rows(|v| v.boostp3()))
    }

    pub fn dot(&self, other: &Vec4Array) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.dot(&b))?))
    }

    pub fn boost(&self, beta: &Vec3) -> Vec4Array {
        self.to_cartesian().boost(beta)
    }

    pub fn boost_each(&self, beta: &Vec3Array) -> HepvecResult<Vec4Array> {
        self.to_cartesian().boost_each(beta)
    }

    pub fn delta_phi(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.delta_phi(&b))?))
    }

    pub fn delta_r2(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.delta_r2(&b))?))
    }

    pub fn delta_r(&self, other: &Self) -> HepvecResult<Column> {
        Ok(Column::new(self.zip_rows(other, |a, b| a.delta_r(&b))?))
    }

    pub fn rotate_axis(&self, axis: &Vec3, angle: f64) -> Vec4Array {
        self.to_cartesian().rotate_axis(axis, angle)
    }

    pub fn rotate_euler(&self, phi: f64, theta: f64, psi: f64) -> Vec4Array {
        self.to_cartesian().rotate_euler(phi, theta, psi)
    }

    pub fn rotate_z(&self, angle: f64) -> Vec4Array {
        self.to_cartesian().rotate_z(angle)
    }
}

impl Content for PtEtaPhiMassArray {
    fn len(&self) -> usize {
        self.pt.len()
    }

    fn take(&self, indices: &[Option<usize>]) -> Self {
        take_columns(self, indices)
    }
}

impl VectorArray for PtEtaPhiMassArray {
    type Element = PtEtaPhiMassVec4;
    type Cartesian = Vec4Array;
    const KIND: VectorKind = VectorKind::PtEtaPhiMass;
    const COORDINATES: Coordinates = Coordinates::PtEtaPhiMass;
    const COLUMN_NAMES: &'static [&'static str] = &["fPt", "fEta", "fPhi", "fMass"];
    const FIELD_NAMES: &'static [&'static str] = &["pt", "eta", "phi", "mass"];

    fn columns(&self) -> Vec<Column> {
        vec![
            self.pt.clone(),
            self.eta.clone(),
            self.phi.clone(),
            self.mass.clone(),
        ]
    }

    fn assemble(columns: Vec<Column>) -> Self {
        let mut it = columns.into_iter();
        Self {
            pt: it.next().unwrap_or_default(),
            eta: it.next().unwrap_or_default(),
            phi: it.next().unwrap_or_default(),
            mass: it.next().unwrap_or_default(),
            cache: Arc::new(MemoCache::new()),
        }
    }

    fn to_cartesian(&self) -> Vec4Array {
        Vec4Array::assemble(vec![
            LorentzOps::x(self),
            LorentzOps::y(self),
            LorentzOps::z(self),
            LorentzOps::t(self),
        ])
    }

    fn wrap_value(array: Nested<Self>) -> Value {
        Value::PtEtaPhiMassArray(array)
    }

    fn array_of(value: &Value) -> Option<&Nested<Self>> {
        match value {
            Value::PtEtaPhiMassArray(array) => Some(array),
            _ => None,
        }
    }

    fn element_of(value: &Value) -> Option<PtEtaPhiMassVec4> {
        match value {
            Value::PtEtaPhiMass(v) => Some(*v),
            _ => None,
        }
    }

    fn element_value(element: PtEtaPhiMassVec4) -> Value {
        Value::PtEtaPhiMass(element)
    }

    // Sums and negation leave the (pt, eta, phi, mass) form, and scaling only touches pt and
    // mass.
    fn apply_operator(op: Operator, inputs: &[Value]) -> HepvecResult<Value> {
        match op {
            Operator::Add | Operator::Subtract | Operator::Other(Elementwise::Negate) => {
                Vec4Array::apply_operator(op, inputs)
            }
            Operator::Other(Elementwise::Multiply) | Operator::Other(Elementwise::Divide) => {
                scale_ptetaphimass(op, inputs)
            }
            Operator::Power | Operator::Absolute => componentwise::<Self>(op, inputs),
        }
    }
}

fn scale_ptetaphimass(op: Operator, inputs: &[Value]) -> HepvecResult<Value> {
    let len = inputs
        .iter()
        .find_map(Value::len)
        .ok_or(HepvecError::AllScalar)?;
    let Some(position) = inputs.iter().position(|v| v.vector_kind().is_some()) else {
        return Err(HepvecError::InvalidOperands {
            operation: op.to_string(),
            reason: "no PtEtaPhiMass operand".to_string(),
        });
    };
    let vector = PtEtaPhiMassArray::coerce(&inputs[position], len)?;
    let other = &inputs[1 - position];
    let f: fn(f64, f64) -> f64 = match op {
        Operator::Other(Elementwise::Divide) => |a: f64, b: f64| a / b,
        _ => |a: f64, b: f64| a * b,
    };
    let scale = |column: &Column| -> HepvecResult<Column> {
        let (lhs, rhs) = match other {
            Value::Real(s) => {
                let s = *s;
                return Ok(if position == 0 {
                    column.map(|v| f(v, s))
                } else {
                    column.map(|v| f(s, v))
                });
            }
            Value::Column(Nested::Flat(c)) if position == 0 => (column, c),
            Value::Column(Nested::Flat(c)) => (c, column),
            _ => {
                return Err(HepvecError::TypeMismatch {
                    operation: op.to_string(),
                    operands: format!("{} and {}", inputs[0].describe(), inputs[1].describe()),
                })
            }
        };
        lhs.try_zip_map(rhs, f)
    };
    let scaled = PtEtaPhiMassArray::assemble(vec![
        scale(&vector.pt)?,
        vector.eta.clone(),
        vector.phi.clone(),
        scale(&vector.mass)?,
    ]);
    Ok(Value::PtEtaPhiMassArray(Nested::Flat(scaled)))
}

impl VectorOps for PtEtaPhiMassArray {
    type Real = Column;
    type Mask = Mask;
    fn mag2(&self) -> Column {
        &self.mass * &self.mass
    }
    fn mag(&self) -> Column {
        self.mass.clone()
    }
}

impl LorentzOps for PtEtaPhiMassArray {
    fn x(&self) -> Column {
        self.memo("x", |v| v.x())
    }
    fn y(&self) -> Column {
        self.memo("y", |v| v.y())
    }
    fn z(&self) -> Column {
        self.memo("z", |v| v.z())
    }
    fn t(&self) -> Column {
        self.memo("t", |v| v.t())
    }
    fn pt(&self) -> Column {
        self.pt.clone()
    }
    fn pt2(&self) -> Column {
        &self.pt * &self.pt
    }
    fn eta(&self) -> Column {
        self.eta.clone()
    }
    fn phi(&self) -> Column {
        self.phi.clone()
    }
    fn theta(&self) -> Column {
        self.map_real(|v| v.theta())
    }
    fn cottheta(&self) -> Column {
        self.map_real(|v| v.cottheta())
    }
    fn mass(&self) -> Column {
        self.mass.clone()
    }
    fn mass2(&self) -> Column {
        self.mag2()
    }
    fn p(&self) -> Column {
        self.memo("p", |v| v.p())
    }
    fn p2(&self) -> Column {
        self.map_real(|v| v.p2())
    }
    fn mt(&self) -> Column {
        self.map_real(|v| v.mt())
    }
    fn mt2(&self) -> Column {
        self.map_real(|v| v.mt2())
    }
    fn et(&self) -> Column {
        self.map_real(|v| v.et())
    }
    fn rapidity(&self) -> Column {
        self.map_real(|v| v.rapidity())
    }
    fn beta(&self) -> Column {
        self.map_real(|v| v.beta())
    }
    fn gamma(&self) -> Column {
        self.map_real(|v| v.gamma())
    }
    fn is_spacelike(&self, tolerance: f64) -> Mask {
        self.map_mask(|v| v.is_spacelike(tolerance))
    }
    fn is_timelike(&self, tolerance: f64) -> Mask {
        self.map_mask(|v| v.is_timelike(tolerance))
    }
    fn is_lightlike(&self, tolerance: f64) -> Mask {
        self.map_mask(|v| v.is_lightlike(tolerance))
    }
}

impl From<Vec2Array> for ArrayRecord {
    fn from(array: Vec2Array) -> Self {
        ArrayRecord::from_array(&array)
    }
}

impl TryFrom<ArrayRecord> for Vec2Array {
    type Error = HepvecError;
    fn try_from(record: ArrayRecord) -> HepvecResult<Self> {
        record.into_array()
    }
}

impl From<Vec3Array> for ArrayRecord {
    fn from(array: Vec3Array) -> Self {
        ArrayRecord::from_array(&array)
    }
}

impl TryFrom<ArrayRecord> for Vec3Array {
    type Error = HepvecError;
    fn try_from(record: ArrayRecord) -> HepvecResult<Self> {
        record.into_array()
    }
}

impl From<Vec4Array> for ArrayRecord {
    fn from(array: Vec4Array) -> Self {
        ArrayRecord::from_array(&array)
    }
}

impl TryFrom<ArrayRecord> for Vec4Array {
    type Error = HepvecError;
    fn try_from(record: ArrayRecord) -> HepvecResult<Self> {
        record.into_array()
    }
}

impl From<PtEtaPhiMassArray> for ArrayRecord {
    fn from(array: PtEtaPhiMassArray) -> Self {
        ArrayRecord::from_array(&array)
    }
}

impl TryFrom<ArrayRecord> for PtEtaPhiMassArray {
    type Error = HepvecError;
    fn try_from(record: ArrayRecord) -> HepvecResult<Self> {
        record.into_array()
    }
}

fn zip_components<A: VectorArray>(a: &A, b: &A, f: fn(f64, f64) -> f64) -> A {
    A::assemble(
        a.columns()
            .iter()
            .zip(b.columns().iter())
            .map(|(x, y)| x.zip_map(y, f))
            .collect(),
    )
}

fn scale_components<A: VectorArray>(a: &A, f: impl Fn(f64) -> f64 + Send + Sync + Copy) -> A {
    A::assemble(a.columns().iter().map(|c| c.map(f)).collect())
}

impl_op_ex!(+ |a: &Vec2Array, b: &Vec2Array| -> Vec2Array { zip_components(a, b, |x, y| x + y) });
impl_op_ex!(-|a: &Vec2Array, b: &Vec2Array| -> Vec2Array { zip_components(a, b, |x, y| x - y) });
impl_op_ex!(-|a: &Vec2Array| -> Vec2Array { scale_components(a, |x| -x) });
impl_op_ex_commutative!(*|a: &Vec2Array, b: &f64| -> Vec2Array { let b = *b; scale_components(a, move |x| x * b) });
impl_op_ex!(/ |a: &Vec2Array, b: &f64| -> Vec2Array { let b = *b; scale_components(a, move |x| x / b) });

impl_op_ex!(+ |a: &Vec3Array, b: &Vec3Array| -> Vec3Array { zip_components(a, b, |x, y| x + y) });
impl_op_ex!(-|a: &Vec3Array, b: &Vec3Array| -> Vec3Array { zip_components(a, b, |x, y| x - y) });
impl_op_ex!(-|a: &Vec3Array| -> Vec3Array { scale_components(a, |x| -x) });
impl_op_ex_commutative!(*|a: &Vec3Array, b: &f64| -> Vec3Array { let b = *b; scale_components(a, move |x| x * b) });
impl_op_ex!(/ |a: &Vec3Array, b: &f64| -> Vec3Array { let b = *b; scale_components(a, move |x| x / b) });

impl_op_ex!(+ |a: &Vec4Array, b: &Vec4Array| -> Vec4Array { zip_components(a, b, |x, y| x + y) });
impl_op_ex!(-|a: &Vec4Array, b: &Vec4Array| -> Vec4Array { zip_components(a, b, |x, y| x - y) });
impl_op_ex!(-|a: &Vec4Array| -> Vec4Array { scale_components(a, |x| -x) });
impl_op_ex_commutative!(*|a: &Vec4Array, b: &f64| -> Vec4Array { let b = *b; scale_components(a, move |x| x * b) });
impl_op_ex!(/ |a: &Vec4Array, b: &f64| -> Vec4Array { let b = *b; scale_components(a, move |x| x / b) });
impl_op_ex_commutative!(+ |a: &Vec4Array, b: &PtEtaPhiMassArray| -> Vec4Array { a + b.to_cartesian() });
impl_op_ex!(-|a: &Vec4Array, b: &PtEtaPhiMassArray| -> Vec4Array { a - b.to_cartesian() });
impl_op_ex!(-|a: &PtEtaPhiMassArray, b: &Vec4Array| -> Vec4Array { a.to_cartesian() - b });
impl_op_ex!(+ |a: &PtEtaPhiMassArray, b: &PtEtaPhiMassArray| -> Vec4Array { a.to_cartesian() + b.to_cartesian() });
impl_op_ex!(-|a: &PtEtaPhiMassArray, b: &PtEtaPhiMassArray| -> Vec4Array { a.to_cartesian() - b.to_cartesian() });
impl_op_ex!(-|a: &PtEtaPhiMassArray| -> Vec4Array { -a.to_cartesian() });
impl_op_ex_commutative!(*|a: &PtEtaPhiMassArray, b: &f64| -> PtEtaPhiMassArray {
    let b = *b;
    PtEtaPhiMassArray::assemble(vec![&a.pt * b, a.eta.clone(), a.phi.clone(), &a.mass * b])
});
impl_op_ex!(/ |a: &PtEtaPhiMassArray, b: &f64| -> PtEtaPhiMassArray {
    let b = *b;
    PtEtaPhiMassArray::assemble(vec![&a.pt / b, a.eta.clone(), a.phi.clone(), &a.mass / b])
});

/// Operators and broadcasting helpers for jagged arrays of any vector type.
impl<A: VectorArray> Nested<A> {
    pub fn into_value(self) -> Value {
        A::wrap_value(self)
    }

    /// `self + other`, broadcasting jagged structure.
    pub fn try_add(&self, other: impl Into<Value>) -> HepvecResult<Value> {
        apply_operator(Operator::Add, &[self.clone().into_value(), other.into()])
    }

    pub fn try_sub(&self, other: impl Into<Value>) -> HepvecResult<Value> {
        apply_operator(Operator::Subtract, &[self.clone().into_value(), other.into()])
    }

    pub fn try_mul(&self, other: impl Into<Value>) -> HepvecResult<Value> {
        apply_operator(
            Operator::Other(Elementwise::Multiply),
            &[self.clone().into_value(), other.into()],
        )
    }

    pub fn try_div(&self, other: impl Into<Value>) -> HepvecResult<Value> {
        apply_operator(
            Operator::Other(Elementwise::Divide),
            &[self.clone().into_value(), other.into()],
        )
    }

    pub fn try_neg(&self) -> HepvecResult<Value> {
        apply_operator(
            Operator::Other(Elementwise::Negate),
            &[self.clone().into_value()],
        )
    }

    /// The magnitude of every vector.
    pub fn try_abs(&self) -> HepvecResult<Nested<Column>> {
        apply_operator(Operator::Absolute, &[self.clone().into_value()])?.into_column()
    }

    /// `|v|^exponent` for every vector ([`VectorOps::mag2`] exactly when the exponent is 2).
    pub fn try_powf(&self, exponent: f64) -> HepvecResult<Nested<Column>> {
        apply_operator(
            Operator::Power,
            &[self.clone().into_value(), Value::Real(exponent)],
        )?
        .into_column()
    }

    /// A stored component of every vector, keeping the jagged structure.
    pub fn column(&self, name: &str) -> Option<Nested<Column>> {
        self.innermost().column(name)?;
        Some(self.map_content(|array| array.column(name).unwrap_or_default()))
    }

    pub fn to_cartesian(&self) -> Nested<A::Cartesian> {
        self.map_content(A::to_cartesian)
    }

    /// Sum the vectors in each innermost row, removing one level of jaggedness.
    pub fn sum_rows(&self) -> HepvecResult<Nested<A::Cartesian>> {
        let Nested::Jagged(jagged) = self else {
            return Err(HepvecError::InvalidPartition(
                "sum_rows requires a jagged array".to_string(),
            ));
        };
        match jagged.content() {
            Nested::Flat(array) => {
                let cartesian = array.to_cartesian();
                let columns = cartesian
                    .columns()
                    .iter()
                    .map(|column| {
                        jagged
                            .row_ranges()
                            .map(|range| column.sum_range(range))
                            .collect::<Column>()
                    })
                    .collect();
                Ok(Nested::Flat(A::Cartesian::assemble(columns)))
            }
            inner @ Nested::Jagged(_) => Ok(Nested::Jagged(jagged.with_content(inner.sum_rows()?))),
        }
    }

    /// Combine two arrays row by row after broadcasting their jagged structure together.
    pub fn zip_with<B, R, F>(&self, other: &Nested<B>, f: F) -> HepvecResult<Nested<R>>
    where
        B: VectorArray,
        R: Content,
        F: FnOnce(&A, &B) -> HepvecResult<R>,
    {
        let mut operands = component_operands(self);
        let split = operands.len();
        operands.extend(component_operands(other));
        broadcast::apply(&operands, |columns| {
            let lhs = A::from_columns(columns[..split].to_vec())?;
            let rhs = B::from_columns(columns[split..].to_vec())?;
            f(&lhs, &rhs)
        })
    }
}

impl Nested<Vec2Array> {
    pub fn dot(&self, other: &Nested<Vec2Array>) -> HepvecResult<Nested<Column>> {
        self.zip_with(other, Vec2Array::dot)
    }

    pub fn angle(&self, other: &Nested<Vec2Array>) -> HepvecResult<Nested<Column>> {
        self.zip_with(other, Vec2Array::angle)
    }

    pub fn delta_phi(&self, other: &Nested<Vec2Array>) -> HepvecResult<Nested<Column>> {
        self.zip_with(other, Vec2Array::delta_phi)
    }

    pub fn rotate(&self, angle: f64) -> Nested<Vec2Array> {
        self.map_content(|a| a.rotate(angle))
    }
}

impl Nested<Vec3Array> {
    pub fn dot(&self, other: &Nested<Vec3Array>) -> HepvecResult<Nested<Column>> {
        self.zip_with(other, Vec3Array::dot)
    }

    pub fn cross(&self, other: &Nested<Vec3Array>) -> HepvecResult<Nested<Vec3Array>> {
        self.zip_with(other, Vec3Array::cross)
    }

    pub fn angle(&self, other: &Nested<Vec3Array>) -> HepvecResult<Nested<Column>> {
        self.zip_with(other, Vec3Array::angle)
    }

    pub fn delta_phi(&self, other: &Nested<Vec3Array>) -> HepvecResult<Nested<Column>> {
        self.zip_with(other, Vec3Array::delta_phi)
    }

    pub fn rotate_axis(&self, axis: &Vec3, angle: f64) -> Nested<Vec3Array> {
        self.map_content(|a| a.rotate_axis(axis, angle))
    }

    pub fn rotate_euler(&self, phi: f64, theta: f64, psi: f64) -> Nested<Vec3Array> {
        self.map_content(|a| a.rotate_euler(phi, theta, psi))
    }
}

impl Nested<Vec4Array> {
    pub fn dot(&self, other: &Nested<Vec4Array>) -> HepvecResult<Nested<Column>> {
        self.zip_with(other, Vec4Array::dot)
    }

    pub fn p3(&self) -> Nested<Vec3Array> {
        self.map_content(Vec4Array::p3)
    }

    pub fn boostp3(&self) -> Nested<Vec3Array> {
        self.map_content(Vec4Array::boostp3)
    }

    pub fn boost(&self, beta: &Vec3) -> Nested<Vec4Array> {
        self.map_content(|a| a.boost(beta))
    }

    /// Boost by per-row (or per-event, when `beta` is flat and `self` is jagged) velocities.
    pub fn boost_each(&self, beta: &Nested<Vec3Array>) -> HepvecResult<Nested<Vec4Array>> {
        self.zip_with(beta, Vec4Array::boost_each)
    }

    pub fn delta_phi(&self, other: &Nested<Vec4Array>) -> HepvecResult<Nested<Column>> {
        self.zip_with(other, Vec4Array::delta_phi)
    }

    pub fn delta_r(&self, other: &Nested<Vec4Array>) -> HepvecResult<Nested<Column>> {
        self.zip_with(other, Vec4Array::delta_r)
    }

    pub fn rotate_z(&self, angle: f64) -> Nested<Vec4Array> {
        self.map_content(|a| a.rotate_z(angle))
    }
}

impl Nested<PtEtaPhiMassArray> {
    pub fn delta_phi(&self, other: &Nested<PtEtaPhiMassArray>) -> HepvecResult<Nested<Column>> {
        self.zip_with(other, PtEtaPhiMassArray::delta_phi)
    }

    pub fn delta_r(&self, other: &Nested<PtEtaPhiMassArray>) -> HepvecResult<Nested<Column>> {
        self.zip_with(other, PtEtaPhiMassArray::delta_r)
    }

    pub fn boost(&self, beta: &Vec3) -> Nested<Vec4Array> {
        self.map_content(|a| a.boost(beta))
    }
}
