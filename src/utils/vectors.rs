use std::{fmt::Display, iter::Sum};

use approx::{AbsDiffEq, RelativeEq};
use auto_ops::{impl_op_ex, impl_op_ex_commutative};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::utils::{cosdelta, sign, wrap_phi, Lanes};

/// A two-dimensional Euclidean vector.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// The $`x`$-component
    pub x: f64,
    /// The $`y`$-component
    pub y: f64,
}

impl Vec2 {
    /// Create a new vector from its Cartesian components.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The zero vector.
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Create a vector from a radius and an azimuthal angle.
    pub fn from_polar(rho: f64, phi: f64) -> Self {
        Self::new(rho * phi.cos(), rho * phi.sin())
    }

    /// Alias of [`Vec2::from_polar`].
    pub fn from_circular(rho: f64, phi: f64) -> Self {
        Self::from_polar(rho, phi)
    }

    /// The dot product of two vectors.
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// The squared magnitude.
    pub fn mag2(&self) -> f64 {
        self.dot(self)
    }

    /// The magnitude.
    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }

    /// Alias of [`Vec2::mag2`].
    pub fn rho2(&self) -> f64 {
        self.mag2()
    }

    /// Alias of [`Vec2::mag`].
    pub fn rho(&self) -> f64 {
        self.mag()
    }

    /// The azimuthal angle, $`\arctan(y / x)`$ in the correct quadrant.
    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// A vector of unit length in the same direction (`NaN` for the zero vector).
    pub fn unit(&self) -> Self {
        self / self.mag()
    }

    /// Rotate counterclockwise by `angle` radians.
    pub fn rotate(&self, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    /// The cosine of the angle between two vectors (`1` if either has zero length).
    pub fn cosdelta(&self, other: &Self) -> f64 {
        cosdelta(self.dot(other), self.mag2(), other.mag2())
    }

    /// The angle between two vectors in $`[0, \pi]`$.
    pub fn angle(&self, other: &Self) -> f64 {
        self.cosdelta(other).acos()
    }

    /// The difference in azimuthal angle, wrapped into $`[-\pi, \pi)`$.
    pub fn delta_phi(&self, other: &Self) -> f64 {
        wrap_phi(self.phi() - other.phi())
    }

    /// `true` if the two vectors point in the same direction.
    pub fn is_parallel(&self, other: &Self, tolerance: f64) -> bool {
        1.0 - self.cosdelta(other) < tolerance
    }

    /// `true` if the two vectors point in opposite directions.
    pub fn is_antiparallel(&self, other: &Self, tolerance: f64) -> bool {
        self.cosdelta(other) + 1.0 < tolerance
    }

    /// `true` if the two vectors lie along the same line.
    pub fn is_collinear(&self, other: &Self, tolerance: f64) -> bool {
        1.0 - self.cosdelta(other).abs() < tolerance
    }

    /// `true` if the two vectors sum to zero.
    pub fn is_opposite(&self, other: &Self, tolerance: f64) -> bool {
        let sum = self + other;
        sum.x.abs() < tolerance && sum.y.abs() < tolerance
    }

    /// `true` if the dot product vanishes.
    pub fn is_perpendicular(&self, other: &Self, tolerance: f64) -> bool {
        self.dot(other).abs() < tolerance
    }

    /// Extend into three dimensions.
    pub fn with_z(&self, z: f64) -> Vec3 {
        Vec3::new(self.x, self.y, z)
    }
}

impl Display for Vec2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Vec2({}, {})", self.x, self.y)
    }
}

impl Lanes for Vec2 {
    const NCOMP: usize = 2;
    fn write_lanes(&self, dst: &mut [f64]) {
        dst[0] = self.x;
        dst[1] = self.y;
    }
    fn read_lanes(src: &[f64]) -> Self {
        Self::new(src[0], src[1])
    }
}

impl_op_ex!(+ |a: &Vec2, b: &Vec2| -> Vec2 { Vec2::new(a.x + b.x, a.y + b.y) });
impl_op_ex!(-|a: &Vec2, b: &Vec2| -> Vec2 { Vec2::new(a.x - b.x, a.y - b.y) });
impl_op_ex!(-|a: &Vec2| -> Vec2 { Vec2::new(-a.x, -a.y) });
impl_op_ex_commutative!(*|a: &Vec2, b: &f64| -> Vec2 { Vec2::new(a.x * b, a.y * b) });
impl_op_ex!(/ |a: &Vec2, b: &f64| -> Vec2 { Vec2::new(a.x / b, a.y / b) });
impl_op_ex!(+= |a: &mut Vec2, b: &Vec2| { a.x += b.x; a.y += b.y; });
impl_op_ex!(-= |a: &mut Vec2, b: &Vec2| { a.x -= b.x; a.y -= b.y; });
impl_op_ex!(*= |a: &mut Vec2, b: &f64| { a.x *= b; a.y *= b; });
impl_op_ex!(/= |a: &mut Vec2, b: &f64| { a.x /= b; a.y /= b; });

impl Sum for Vec2 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::origin(), |a, b| a + b)
    }
}

impl<'a> Sum<&'a Vec2> for Vec2 {
    fn sum<I: Iterator<Item = &'a Vec2>>(iter: I) -> Self {
        iter.fold(Self::origin(), |a, b| a + b)
    }
}

/// A three-dimensional Euclidean vector.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// The $`x`$-component
    pub x: f64,
    /// The $`y`$-component
    pub y: f64,
    /// The $`z`$-component
    pub z: f64,
}

impl Vec3 {
    /// Create a new vector from its Cartesian components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Create a vector from a radius, a polar angle, and an azimuthal angle.
    pub fn from_spherical(r: f64, theta: f64, phi: f64) -> Self {
        Self::new(
            r * theta.sin() * phi.cos(),
            r * theta.sin() * phi.sin(),
            r * theta.cos(),
        )
    }

    /// Create a vector from a transverse radius, an azimuthal angle, and a $`z`$-component.
    pub fn from_cylindrical(rho: f64, phi: f64, z: f64) -> Self {
        Self::new(rho * phi.cos(), rho * phi.sin(), z)
    }

    /// Create a four-vector with this momentum and the given mass.
    pub fn with_mass(&self, mass: f64) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, (mass.powi(2) + self.mag2()).sqrt())
    }

    /// Create a four-vector with this momentum and the given energy.
    pub fn with_energy(&self, energy: f64) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, energy)
    }

    /// The transverse ($`x`$, $`y`$) part.
    pub fn xy(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn mag2(&self) -> f64 {
        self.dot(self)
    }

    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }

    /// The radial coordinate, identical to [`Vec3::mag`].
    pub fn r(&self) -> f64 {
        self.mag()
    }

    /// The squared transverse radius.
    pub fn rho2(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// The transverse radius.
    pub fn rho(&self) -> f64 {
        self.rho2().sqrt()
    }

    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// The polar angle measured from the $`z`$-axis.
    pub fn theta(&self) -> f64 {
        self.rho().atan2(self.z)
    }

    pub fn costheta(&self) -> f64 {
        self.z / self.mag()
    }

    /// $`\cot\theta = z / \rho`$
    pub fn cottheta(&self) -> f64 {
        self.z / self.rho()
    }

    pub fn unit(&self) -> Self {
        self / self.mag()
    }

    /// Rotate by `angle` radians about `axis` (which need not be normalized).
    pub fn rotate_axis(&self, axis: &Vec3, angle: f64) -> Self {
        let u = axis.unit();
        let (s, c) = angle.sin_cos();
        let c1 = 1.0 - c;
        let m = Matrix3::new(
            c + u.x * u.x * c1,
            u.x * u.y * c1 - u.z * s,
            u.x * u.z * c1 + u.y * s,
            u.x * u.y * c1 + u.z * s,
            c + u.y * u.y * c1,
            u.y * u.z * c1 - u.x * s,
            u.x * u.z * c1 - u.y * s,
            u.y * u.z * c1 + u.x * s,
            c + u.z * u.z * c1,
        );
        (m * Vector3::from(*self)).into()
    }

    /// Rotate by the $`Z`$-$`Y`$-$`Z`$ Euler angles $`(\phi, \theta, \psi)`$, i.e. by
    /// $`R_z(\psi) R_y(\theta) R_z(\phi)`$.
    pub fn rotate_euler(&self, phi: f64, theta: f64, psi: f64) -> Self {
        let (s1, c1) = phi.sin_cos();
        let (s2, c2) = theta.sin_cos();
        let (s3, c3) = psi.sin_cos();
        let m = Matrix3::new(
            c3 * c2 * c1 - s3 * s1,
            -c3 * c2 * s1 - s3 * c1,
            c3 * s2,
            s3 * c2 * c1 + c3 * s1,
            -s3 * c2 * s1 + c3 * c1,
            s3 * s2,
            -s2 * c1,
            s2 * s1,
            c2,
        );
        (m * Vector3::from(*self)).into()
    }

    pub fn rotate_x(&self, angle: f64) -> Self {
        self.rotate_axis(&Vec3::new(1.0, 0.0, 0.0), angle)
    }

    pub fn rotate_y(&self, angle: f64) -> Self {
        self.rotate_axis(&Vec3::new(0.0, 1.0, 0.0), angle)
    }

    pub fn rotate_z(&self, angle: f64) -> Self {
        self.rotate_axis(&Vec3::new(0.0, 0.0, 1.0), angle)
    }

    /// The cosine of the angle between two vectors (`1` if either has zero length).
    pub fn cosdelta(&self, other: &Self) -> f64 {
        cosdelta(self.dot(other), self.mag2(), other.mag2())
    }

    /// The angle between two vectors in $`[0, \pi]`$.
    pub fn angle(&self, other: &Self) -> f64 {
        self.cosdelta(other).acos()
    }

    /// The angle between two vectors, negated when $`\hat{a}\times\hat{b}`$ points against
    /// `normal`.
    pub fn signed_angle(&self, other: &Self, normal: &Self) -> f64 {
        self.angle(other) * sign(normal.dot(&self.unit().cross(&other.unit())))
    }

    pub fn delta_phi(&self, other: &Self) -> f64 {
        wrap_phi(self.phi() - other.phi())
    }

    pub fn is_parallel(&self, other: &Self, tolerance: f64) -> bool {
        1.0 - self.cosdelta(other) < tolerance
    }

    pub fn is_antiparallel(&self, other: &Self, tolerance: f64) -> bool {
        self.cosdelta(other) + 1.0 < tolerance
    }

    pub fn is_collinear(&self, other: &Self, tolerance: f64) -> bool {
        1.0 - self.cosdelta(other).abs() < tolerance
    }

    pub fn is_opposite(&self, other: &Self, tolerance: f64) -> bool {
        let sum = self + other;
        sum.x.abs() < tolerance && sum.y.abs() < tolerance && sum.z.abs() < tolerance
    }

    pub fn is_perpendicular(&self, other: &Self, tolerance: f64) -> bool {
        self.dot(other).abs() < tolerance
    }
}

impl Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Vec3({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<Vec3> for Vector3<f64> {
    fn from(v: Vec3) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

impl From<Vector3<f64>> for Vec3 {
    fn from(v: Vector3<f64>) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl Lanes for Vec3 {
    const NCOMP: usize = 3;
    fn write_lanes(&self, dst: &mut [f64]) {
        dst[0] = self.x;
        dst[1] = self.y;
        dst[2] = self.z;
    }
    fn read_lanes(src: &[f64]) -> Self {
        Self::new(src[0], src[1], src[2])
    }
}

impl_op_ex!(+ |a: &Vec3, b: &Vec3| -> Vec3 { Vec3::new(a.x + b.x, a.y + b.y, a.z + b.z) });
impl_op_ex!(-|a: &Vec3, b: &Vec3| -> Vec3 { Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z) });
impl_op_ex!(-|a: &Vec3| -> Vec3 { Vec3::new(-a.x, -a.y, -a.z) });
impl_op_ex_commutative!(*|a: &Vec3, b: &f64| -> Vec3 { Vec3::new(a.x * b, a.y * b, a.z * b) });
impl_op_ex!(/ |a: &Vec3, b: &f64| -> Vec3 { Vec3::new(a.x / b, a.y / b, a.z / b) });
impl_op_ex!(+= |a: &mut Vec3, b: &Vec3| { a.x += b.x; a.y += b.y; a.z += b.z; });
impl_op_ex!(-= |a: &mut Vec3, b: &Vec3| { a.x -= b.x; a.y -= b.y; a.z -= b.z; });
impl_op_ex!(*= |a: &mut Vec3, b: &f64| { a.x *= b; a.y *= b; a.z *= b; });
impl_op_ex!(/= |a: &mut Vec3, b: &f64| { a.x /= b; a.y /= b; a.z /= b; });

impl Sum for Vec3 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::origin(), |a, b| a + b)
    }
}

impl<'a> Sum<&'a Vec3> for Vec3 {
    fn sum<I: Iterator<Item = &'a Vec3>>(iter: I) -> Self {
        iter.fold(Self::origin(), |a, b| a + b)
    }
}

/// A Lorentz vector stored as Cartesian $`(x, y, z, t)`$ components (with metric
/// $`(+, -, -, -)`$ when read as $`(p_x, p_y, p_z, E)`$).
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    /// The $`x`$-component
    pub x: f64,
    /// The $`y`$-component
    pub y: f64,
    /// The $`z`$-component
    pub z: f64,
    /// The time (energy) component
    pub t: f64,
}

impl Vec4 {
    pub const fn new(x: f64, y: f64, z: f64, t: f64) -> Self {
        Self { x, y, z, t }
    }

    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn from_p3(p3: &Vec3, t: f64) -> Self {
        Self::new(p3.x, p3.y, p3.z, t)
    }

    pub fn from_spherical(r: f64, theta: f64, phi: f64, t: f64) -> Self {
        Self::from_p3(&Vec3::from_spherical(r, theta, phi), t)
    }

    pub fn from_cylindrical(rho: f64, phi: f64, z: f64, t: f64) -> Self {
        Self::from_p3(&Vec3::from_cylindrical(rho, phi, z), t)
    }

    /// Build from momentum and a signed mass: a negative `m` yields a spacelike vector with
    /// $`m^2 = -|m|^2`$.
    pub fn from_xyzm(x: f64, y: f64, z: f64, m: f64) -> Self {
        let t = (x * x + y * y + z * z + m * m * sign(m)).sqrt();
        Self::new(x, y, z, t)
    }

    /// Build from transverse momentum, pseudorapidity, azimuth, and energy.
    pub fn from_ptetaphie(pt: f64, eta: f64, phi: f64, e: f64) -> Self {
        Self::new(pt * phi.cos(), pt * phi.sin(), pt * eta.sinh(), e)
    }

    /// Alias of [`Vec4::from_ptetaphie`].
    pub fn from_ptetaphi(pt: f64, eta: f64, phi: f64, e: f64) -> Self {
        Self::from_ptetaphie(pt, eta, phi, e)
    }

    /// Build a vector stored in $`(p_T, \eta, \phi, m)`$ form.
    pub fn from_ptetaphim(pt: f64, eta: f64, phi: f64, mass: f64) -> PtEtaPhiMassVec4 {
        PtEtaPhiMassVec4::new(pt, eta, phi, mass)
    }

    pub fn px(&self) -> f64 {
        self.x
    }
    pub fn py(&self) -> f64 {
        self.y
    }
    pub fn pz(&self) -> f64 {
        self.z
    }
    pub fn e(&self) -> f64 {
        self.t
    }
    pub fn energy(&self) -> f64 {
        self.t
    }

    /// The spatial part.
    pub fn p3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// The Minkowski inner product $`t t' - \vec{p}\cdot\vec{p}'`$.
    pub fn dot(&self, other: &Self) -> f64 {
        self.t * other.t - self.x * other.x - self.y * other.y - self.z * other.z
    }

    pub fn mag2(&self) -> f64 {
        self.dot(self)
    }

    /// The invariant magnitude (`NaN` for spacelike vectors).
    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }

    pub fn mass2(&self) -> f64 {
        self.mag2()
    }

    pub fn mass(&self) -> f64 {
        self.mag()
    }

    pub fn pt2(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn pt(&self) -> f64 {
        self.pt2().sqrt()
    }

    pub fn perp(&self) -> f64 {
        self.pt()
    }

    pub fn perp2(&self) -> f64 {
        self.pt2()
    }

    pub fn p2(&self) -> f64 {
        self.p3().mag2()
    }

    /// The magnitude of the three-momentum.
    pub fn p(&self) -> f64 {
        self.p3().mag()
    }

    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn theta(&self) -> f64 {
        self.p3().theta()
    }

    pub fn cottheta(&self) -> f64 {
        self.p3().cottheta()
    }

    /// The pseudorapidity $`\sinh^{-1}(z / p_T)`$.
    pub fn eta(&self) -> f64 {
        (self.z / self.pt()).asinh()
    }

    /// The rapidity $`\frac{1}{2}\ln\frac{t + z}{t - z}`$.
    pub fn rapidity(&self) -> f64 {
        0.5 * ((self.t + self.z) / (self.t - self.z)).ln()
    }

    /// The transverse energy $`E p_T / p`$.
    pub fn et(&self) -> f64 {
        self.t * self.pt() / self.p()
    }

    /// The squared transverse mass $`E^2 - p_z^2`$.
    pub fn mt2(&self) -> f64 {
        self.t * self.t - self.z * self.z
    }

    /// The transverse mass, carrying the sign of [`Vec4::mt2`].
    pub fn mt(&self) -> f64 {
        let mt2 = self.mt2();
        sign(mt2) * mt2.abs().sqrt()
    }

    /// The speed $`|\vec{p}| / E`$.
    pub fn beta(&self) -> f64 {
        self.p() / self.t
    }

    /// The Lorentz factor, infinite when $`|\beta| \geq 1`$.
    pub fn gamma(&self) -> f64 {
        let beta = self.beta();
        if -1.0 < beta && beta < 1.0 {
            (1.0 - beta * beta).sqrt().recip()
        } else {
            f64::INFINITY
        }
    }

    /// The velocity $`\vec{p} / E`$ which boosts a vector at rest into this frame.
    pub fn boostp3(&self) -> Vec3 {
        self.p3() / self.t
    }

    /// Apply a pure Lorentz boost with velocity `beta`. No check is made that
    /// $`|\vec\beta| < 1`$.
    pub fn boost(&self, beta: &Vec3) -> Self {
        let b2 = beta.mag2();
        let gamma = (1.0 - b2).sqrt().recip();
        let gamma2 = if b2 != 0.0 { (gamma - 1.0) / b2 } else { 0.0 };
        let bp = self.p3().dot(beta);
        let p3 = self.p3() + beta * (gamma2 * bp + gamma * self.t);
        Self::from_p3(&p3, gamma * (self.t + bp))
    }

    pub fn delta_phi(&self, other: &Self) -> f64 {
        wrap_phi(self.phi() - other.phi())
    }

    /// $`\Delta\eta^2 + \Delta\phi^2`$
    pub fn delta_r2(&self, other: &Self) -> f64 {
        (self.eta() - other.eta()).powi(2) + self.delta_phi(other).powi(2)
    }

    pub fn delta_r(&self, other: &Self) -> f64 {
        self.delta_r2(other).sqrt()
    }

    /// Rotate the spatial part about `axis`, leaving the time component unchanged.
    pub fn rotate_axis(&self, axis: &Vec3, angle: f64) -> Self {
        Self::from_p3(&self.p3().rotate_axis(axis, angle), self.t)
    }

    pub fn rotate_euler(&self, phi: f64, theta: f64, psi: f64) -> Self {
        Self::from_p3(&self.p3().rotate_euler(phi, theta, psi), self.t)
    }

    pub fn rotate_x(&self, angle: f64) -> Self {
        Self::from_p3(&self.p3().rotate_x(angle), self.t)
    }

    pub fn rotate_y(&self, angle: f64) -> Self {
        Self::from_p3(&self.p3().rotate_y(angle), self.t)
    }

    pub fn rotate_z(&self, angle: f64) -> Self {
        Self::from_p3(&self.p3().rotate_z(angle), self.t)
    }

    /// Scale to unit invariant magnitude.
    pub fn unit(&self) -> Self {
        self / self.mag()
    }

    pub fn is_spacelike(&self, tolerance: f64) -> bool {
        self.mag2() < -tolerance
    }

    pub fn is_timelike(&self, tolerance: f64) -> bool {
        self.mag2() > tolerance
    }

    pub fn is_lightlike(&self, tolerance: f64) -> bool {
        self.mag2().abs() < tolerance
    }
}

impl Display for Vec4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Vec4({}, {}, {}, {})", self.x, self.y, self.z, self.t)
    }
}

impl Lanes for Vec4 {
    const NCOMP: usize = 4;
    fn write_lanes(&self, dst: &mut [f64]) {
        dst[0] = self.x;
        dst[1] = self.y;
        dst[2] = self.z;
        dst[3] = self.t;
    }
    fn read_lanes(src: &[f64]) -> Self {
        Self::new(src[0], src[1], src[2], src[3])
    }
}

impl_op_ex!(+ |a: &Vec4, b: &Vec4| -> Vec4 { Vec4::new(a.x + b.x, a.y + b.y, a.z + b.z, a.t + b.t) });
impl_op_ex!(-|a: &Vec4, b: &Vec4| -> Vec4 { Vec4::new(a.x - b.x, a.y - b.y, a.z - b.z, a.t - b.t) });
impl_op_ex!(-|a: &Vec4| -> Vec4 { Vec4::new(-a.x, -a.y, -a.z, -a.t) });
impl_op_ex_commutative!(*|a: &Vec4, b: &f64| -> Vec4 { Vec4::new(a.x * b, a.y * b, a.z * b, a.t * b) });
impl_op_ex!(/ |a: &Vec4, b: &f64| -> Vec4 { Vec4::new(a.x / b, a.y / b, a.z / b, a.t / b) });
impl_op_ex!(+= |a: &mut Vec4, b: &Vec4| { a.x += b.x; a.y += b.y; a.z += b.z; a.t += b.t; });
impl_op_ex!(-= |a: &mut Vec4, b: &Vec4| { a.x -= b.x; a.y -= b.y; a.z -= b.z; a.t -= b.t; });
impl_op_ex!(*= |a: &mut Vec4, b: &f64| { a.x *= b; a.y *= b; a.z *= b; a.t *= b; });
impl_op_ex!(/= |a: &mut Vec4, b: &f64| { a.x /= b; a.y /= b; a.z /= b; a.t /= b; });

impl Sum for Vec4 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::origin(), |a, b| a + b)
    }
}

impl<'a> Sum<&'a Vec4> for Vec4 {
    fn sum<I: Iterator<Item = &'a Vec4>>(iter: I) -> Self {
        iter.fold(Self::origin(), |a, b| a + b)
    }
}

/// A Lorentz vector stored as transverse momentum, pseudorapidity, azimuth, and mass.
///
/// The stored quantities are returned directly. Everything else is computed from the
/// Cartesian form given by [`PtEtaPhiMassVec4::to_cartesian`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PtEtaPhiMassVec4 {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    /// The (signed) mass
    pub mass: f64,
}

impl PtEtaPhiMassVec4 {
    pub const fn new(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        Self { pt, eta, phi, mass }
    }

    pub fn x(&self) -> f64 {
        self.pt * self.phi.cos()
    }

    pub fn y(&self) -> f64 {
        self.pt * self.phi.sin()
    }

    pub fn z(&self) -> f64 {
        self.pt * self.eta.sinh()
    }

    /// The energy, with the mass term entering as $`m^2\,\mathrm{sign}(m)`$.
    pub fn t(&self) -> f64 {
        let (x, y, z) = (self.x(), self.y(), self.z());
        (x * x + y * y + z * z + self.mass * self.mass * sign(self.mass)).sqrt()
    }

    pub fn energy(&self) -> f64 {
        self.t()
    }

    /// The magnitude of the three-momentum, $`p_T\cosh\eta`$.
    pub fn p(&self) -> f64 {
        self.pt * self.eta.cosh()
    }

    pub fn p2(&self) -> f64 {
        self.p().powi(2)
    }

    pub fn pt2(&self) -> f64 {
        self.pt * self.pt
    }

    pub fn mag(&self) -> f64 {
        self.mass
    }

    pub fn mag2(&self) -> f64 {
        self.mass * self.mass
    }

    pub fn mass2(&self) -> f64 {
        self.mag2()
    }

    /// $`m^2 + p_T^2`$
    pub fn mt2(&self) -> f64 {
        self.mass * self.mass + self.pt * self.pt
    }

    pub fn mt(&self) -> f64 {
        let mt2 = self.mt2();
        sign(mt2) * mt2.abs().sqrt()
    }

    pub fn to_cartesian(&self) -> Vec4 {
        Vec4::new(self.x(), self.y(), self.z(), self.t())
    }

    pub fn p3(&self) -> Vec3 {
        Vec3::new(self.x(), self.y(), self.z())
    }

    pub fn theta(&self) -> f64 {
        self.p3().theta()
    }

    pub fn cottheta(&self) -> f64 {
        self.p3().cottheta()
    }

    pub fn rapidity(&self) -> f64 {
        self.to_cartesian().rapidity()
    }

    pub fn et(&self) -> f64 {
        self.to_cartesian().et()
    }

    pub fn beta(&self) -> f64 {
        self.to_cartesian().beta()
    }

    pub fn gamma(&self) -> f64 {
        self.to_cartesian().gamma()
    }

    pub fn boostp3(&self) -> Vec3 {
        self.to_cartesian().boostp3()
    }

    pub fn boost(&self, beta: &Vec3) -> Vec4 {
        self.to_cartesian().boost(beta)
    }

    pub fn delta_phi(&self, other: &Self) -> f64 {
        wrap_phi(self.phi - other.phi)
    }

    pub fn delta_r2(&self, other: &Self) -> f64 {
        (self.eta - other.eta).powi(2) + self.delta_phi(other).powi(2)
    }

    pub fn delta_r(&self, other: &Self) -> f64 {
        self.delta_r2(other).sqrt()
    }

    /// The Minkowski inner product.
    pub fn dot(&self, other: &Vec4) -> f64 {
        self.to_cartesian().dot(other)
    }

    pub fn is_spacelike(&self, tolerance: f64) -> bool {
        self.mag2() < -tolerance
    }

    pub fn is_timelike(&self, tolerance: f64) -> bool {
        self.mag2() > tolerance
    }

    pub fn is_lightlike(&self, tolerance: f64) -> bool {
        self.mag2().abs() < tolerance
    }
}

impl From<PtEtaPhiMassVec4> for Vec4 {
    fn from(v: PtEtaPhiMassVec4) -> Self {
        v.to_cartesian()
    }
}

impl Display for PtEtaPhiMassVec4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PtEtaPhiMassVec4(pt={}, eta={}, phi={}, mass={})",
            self.pt, self.eta, self.phi, self.mass
        )
    }
}

impl Lanes for PtEtaPhiMassVec4 {
    const NCOMP: usize = 4;
    fn write_lanes(&self, dst: &mut [f64]) {
        dst[0] = self.pt;
        dst[1] = self.eta;
        dst[2] = self.phi;
        dst[3] = self.mass;
    }
    fn read_lanes(src: &[f64]) -> Self {
        Self::new(src[0], src[1], src[2], src[3])
    }
}

// Scaling only touches pt and mass, so direction is preserved.
impl_op_ex_commutative!(*|a: &PtEtaPhiMassVec4, b: &f64| -> PtEtaPhiMassVec4 {
    PtEtaPhiMassVec4::new(a.pt * b, a.eta, a.phi, a.mass * b)
});
impl_op_ex!(/ |a: &PtEtaPhiMassVec4, b: &f64| -> PtEtaPhiMassVec4 {
    PtEtaPhiMassVec4::new(a.pt / b, a.eta, a.phi, a.mass / b)
});
impl_op_ex!(-|a: &PtEtaPhiMassVec4| -> Vec4 { -a.to_cartesian() });
impl_op_ex!(+ |a: &PtEtaPhiMassVec4, b: &PtEtaPhiMassVec4| -> Vec4 { a.to_cartesian() + b.to_cartesian() });
impl_op_ex!(-|a: &PtEtaPhiMassVec4, b: &PtEtaPhiMassVec4| -> Vec4 { a.to_cartesian() - b.to_cartesian() });
impl_op_ex_commutative!(+ |a: &PtEtaPhiMassVec4, b: &Vec4| -> Vec4 { a.to_cartesian() + b });
impl_op_ex!(-|a: &PtEtaPhiMassVec4, b: &Vec4| -> Vec4 { a.to_cartesian() - b });
impl_op_ex!(-|a: &Vec4, b: &PtEtaPhiMassVec4| -> Vec4 { a - b.to_cartesian() });

macro_rules! impl_approx {
    ($t:ty, $($field:ident),+) => {
        impl AbsDiffEq for $t {
            type Epsilon = f64;

            fn default_epsilon() -> Self::Epsilon {
                f64::default_epsilon()
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
                $(f64::abs_diff_eq(&self.$field, &other.$field, epsilon))&&+
            }
        }

        impl RelativeEq for $t {
            fn default_max_relative() -> Self::Epsilon {
                f64::default_max_relative()
            }

            fn relative_eq(
                &self,
                other: &Self,
                epsilon: Self::Epsilon,
                max_relative: Self::Epsilon,
            ) -> bool {
                $(f64::relative_eq(&self.$field, &other.$field, epsilon, max_relative))&&+
            }
        }
    };
}

impl_approx!(Vec2, x, y);
impl_approx!(Vec3, x, y, z);
impl_approx!(Vec4, x, y, z, t);
impl_approx!(PtEtaPhiMassVec4, pt, eta, phi, mass);

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_6, PI};

    use approx::assert_relative_eq;

    use super::*;
    use crate::utils::DEFAULT_TOLERANCE;

    #[test]
    fn test_vec2_basics() {
        let a = Vec2::new(4.4, 5.5);
        assert_relative_eq!(a.dot(&a), 49.61, epsilon = 1e-12);
        assert_eq!(a + Vec2::new(1000.0, 2000.0), Vec2::new(1004.4, 2005.5));
        assert_relative_eq!(a.mag2(), 49.61, epsilon = 1e-12);
        assert_relative_eq!(a.phi(), 5.5f64.atan2(4.4));
        assert_relative_eq!(Vec2::from_polar(a.rho(), a.phi()), a, epsilon = 1e-12);
        let mut b = a;
        b += Vec2::new(1.0, 1.0);
        b *= 2.0;
        assert_relative_eq!(b, Vec2::new(10.8, 13.0), epsilon = 1e-12);
    }

    #[test]
    fn test_vec2_rotate() {
        let a = Vec2::new(2.0, 0.0);
        assert_relative_eq!(a.rotate(FRAC_PI_6).rotate(-FRAC_PI_6), a, epsilon = 1e-12);
        assert_relative_eq!(a.rotate(FRAC_PI_2), Vec2::new(0.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_vec2_predicates() {
        let a = Vec2::new(1.0, 1.0);
        assert!(a.is_parallel(&(a * 3.0), DEFAULT_TOLERANCE));
        assert!(a.is_antiparallel(&(-a), DEFAULT_TOLERANCE));
        assert!(a.is_collinear(&(-2.0 * a), DEFAULT_TOLERANCE));
        assert!(a.is_opposite(&(-a), DEFAULT_TOLERANCE));
        assert!(!a.is_opposite(&(-2.0 * a), DEFAULT_TOLERANCE));
        assert!(a.is_perpendicular(&Vec2::new(1.0, -1.0), DEFAULT_TOLERANCE));
        assert_relative_eq!(
            Vec2::new(-1.0, -0.1).delta_phi(&Vec2::new(-1.0, 0.1)),
            2.0 * 0.1f64.atan(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_zero_vector_angle() {
        assert_eq!(Vec3::origin().angle(&Vec3::new(1.0, 2.0, 3.0)), 0.0);
        assert_eq!(Vec2::new(1.0, 0.0).cosdelta(&Vec2::origin()), 1.0);
    }

    #[test]
    fn test_cosdelta_clipped() {
        let a = Vec3::new(0.1, 0.2, 0.3);
        let b = Vec3::new(-0.1, -0.2, -0.3) * (1.0 + 1e-16);
        let c = a.cosdelta(&b);
        assert!(c >= -1.0);
        assert_relative_eq!(a.angle(&b), PI, epsilon = 1e-7);
    }

    #[test]
    fn test_three_momentum_basics() {
        let p = Vec3::new(3.0, 4.0, 5.0);
        let q = Vec3::new(1.2, -3.4, 7.6);
        assert_relative_eq!(p.mag(), 50.0_f64.sqrt());
        assert_relative_eq!(p.mag2(), 50.0);
        assert_relative_eq!(p.costheta(), 5.0 / 50.0_f64.sqrt());
        assert_relative_eq!(p.theta(), (5.0 / 50.0_f64.sqrt()).acos(), epsilon = 1e-12);
        assert_relative_eq!(p.phi(), 4.0_f64.atan2(3.0));
        assert_relative_eq!(p.cottheta(), 1.0);
        assert_relative_eq!(
            p.unit(),
            Vec3::new(
                3.0 / 50.0_f64.sqrt(),
                4.0 / 50.0_f64.sqrt(),
                5.0 / 50.0_f64.sqrt()
            )
        );
        assert_relative_eq!(p.cross(&q), Vec3::new(47.4, -16.8, -15.0), epsilon = 1e-12);
    }

    #[test]
    fn test_three_to_four_momentum_conversion() {
        let p3 = Vec3::new(1.0, 2.0, 3.0);
        let target = Vec4::new(1.0, 2.0, 3.0, 10.0);
        assert_relative_eq!(p3.with_mass(target.mag()), target, epsilon = 1e-12);
        assert_eq!(p3.with_energy(target.e()), target);
    }

    #[test]
    fn test_rotations() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_relative_eq!(
            v.rotate_z(FRAC_PI_2),
            Vec3::new(-2.0, 1.0, 3.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            v.rotate_x(FRAC_PI_2),
            Vec3::new(1.0, -3.0, 2.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(v.rotate_euler(0.3, 0.0, 0.0), v.rotate_z(0.3), epsilon = 1e-12);
        assert_relative_eq!(v.rotate_euler(0.0, 0.4, 0.0), v.rotate_y(0.4), epsilon = 1e-12);
        assert_relative_eq!(
            v.rotate_euler(0.3, 0.4, 0.5),
            v.rotate_z(0.3).rotate_y(0.4).rotate_z(0.5),
            epsilon = 1e-12
        );
        let axis = Vec3::new(1.0, 1.0, 1.0);
        let r = v.rotate_axis(&axis, 1.1);
        assert_relative_eq!(r.mag(), v.mag(), epsilon = 1e-12);
        assert_relative_eq!(r.dot(&axis.unit()), v.dot(&axis.unit()), epsilon = 1e-12);
        assert_relative_eq!(r.rotate_axis(&axis, -1.1), v, epsilon = 1e-12);
    }

    #[test]
    fn test_signed_angle() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let n = Vec3::new(0.0, 0.0, 1.0);
        assert_relative_eq!(a.signed_angle(&b, &n), FRAC_PI_2);
        assert_relative_eq!(b.signed_angle(&a, &n), -FRAC_PI_2);
    }

    #[test]
    fn test_four_momentum_basics() {
        let p = Vec4::new(3.0, 4.0, 5.0, 10.0);
        assert_eq!(p.e(), 10.0);
        assert_eq!(p.p3(), Vec3::new(3.0, 4.0, 5.0));
        assert_relative_eq!(p.boostp3(), Vec3::new(0.3, 0.4, 0.5));
        assert_relative_eq!(p.mag(), 50.0_f64.sqrt());
        assert_relative_eq!(p.mag2(), 50.0);
        assert_relative_eq!(p.beta(), 0.5_f64.sqrt());
        assert_relative_eq!(p.gamma(), 2.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(p.pt(), 5.0);
        assert_relative_eq!(p.mt2(), 75.0);
        assert_relative_eq!(p.mt(), 75.0_f64.sqrt());
        assert_relative_eq!(p.eta(), 1.0_f64.asinh());
        assert_relative_eq!(p.rapidity(), 0.5 * (15.0_f64 / 5.0).ln());
        assert_relative_eq!(p.et(), 10.0 * 5.0 / 50.0_f64.sqrt());
        assert!(p.is_timelike(DEFAULT_TOLERANCE));
        assert!(Vec4::new(1.0, 0.0, 0.0, 1.0).is_lightlike(DEFAULT_TOLERANCE));
        assert!(Vec4::new(2.0, 0.0, 0.0, 1.0).is_spacelike(DEFAULT_TOLERANCE));
        assert!(Vec4::new(2.0, 0.0, 0.0, 1.0).mag().is_nan());
        assert_eq!(Vec4::new(0.0, 0.0, 1.0, 1.0).gamma(), f64::INFINITY);
    }

    #[test]
    fn test_signed_transverse_mass() {
        let p = Vec4::new(0.0, 0.0, 5.0, 3.0);
        assert_relative_eq!(p.mt(), -4.0);
    }

    #[test]
    fn test_boost_com() {
        let p = Vec4::new(3.0, 4.0, 5.0, 10.0);
        let zero = p.boost(&-p.boostp3()).p3();
        assert_relative_eq!(zero, Vec3::origin(), epsilon = 1e-12);
    }

    #[test]
    fn test_boost() {
        let pa = Vec4::new(3.0, 4.0, 5.0, 10.0);
        let pb = Vec4::new(3.4, 2.3, 1.2, 9.0);
        let boosted = pa.boost(&-pb.boostp3());
        assert_relative_eq!(boosted.e(), 8.157632144622882, epsilon = 1e-12);
        assert_relative_eq!(boosted.px(), -0.6489200627053444, epsilon = 1e-12);
        assert_relative_eq!(boosted.py(), 1.5316128987581492, epsilon = 1e-12);
        assert_relative_eq!(boosted.pz(), 3.712145860221643, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_boost_is_identity() {
        let p = Vec4::new(3.0, 4.0, 5.0, 10.0);
        assert_eq!(p.boost(&Vec3::origin()), p);
    }

    #[test]
    fn test_from_xyzm_sign() {
        let timelike = Vec4::from_xyzm(1.0, 2.0, 2.0, 4.0);
        assert_relative_eq!(timelike.t, 5.0);
        assert_relative_eq!(timelike.mass(), 4.0, epsilon = 1e-12);
        let spacelike = Vec4::from_xyzm(3.0, 4.0, 0.0, -3.0);
        assert_relative_eq!(spacelike.t, 4.0);
        assert_relative_eq!(spacelike.mag2(), -9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ptetaphimass() {
        let v = Vec4::from_ptetaphim(1.0, 1.0, 1.0, 1.0);
        assert_eq!(v.mag(), 1.0);
        assert_relative_eq!(v.to_cartesian().mag(), 0.9999999999999999, epsilon = 1e-12);
        assert_relative_eq!(v.p(), v.to_cartesian().p(), epsilon = 1e-12);
        assert_relative_eq!(v.mt2(), v.to_cartesian().mt2(), epsilon = 1e-12);
        assert_relative_eq!(v.to_cartesian().pt(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(v.to_cartesian().eta(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(v.to_cartesian().phi(), 1.0, epsilon = 1e-12);
        let scaled = v * 2.0;
        assert_eq!(scaled, PtEtaPhiMassVec4::new(2.0, 1.0, 1.0, 2.0));
        assert_relative_eq!(
            scaled.to_cartesian(),
            v.to_cartesian() * 2.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(-v, -v.to_cartesian());
    }

    #[test]
    fn test_delta_r() {
        let a = Vec4::from_ptetaphie(10.0, 0.5, 0.1, 20.0);
        let b = Vec4::from_ptetaphie(12.0, -0.5, -0.1, 30.0);
        assert_relative_eq!(a.delta_r2(&b), 1.0 + 0.04, epsilon = 1e-12);
        let c = PtEtaPhiMassVec4::new(10.0, 0.5, 3.0, 0.1);
        let d = PtEtaPhiMassVec4::new(10.0, 0.5, -3.0, 0.1);
        assert_relative_eq!(c.delta_phi(&d), 6.0 - 2.0 * PI, epsilon = 1e-12);
    }

    #[test]
    fn test_sums() {
        let vs = [Vec4::new(1.0, 2.0, 3.0, 4.0), Vec4::new(-1.0, 0.5, 0.0, 2.0)];
        assert_eq!(vs.iter().sum::<Vec4>(), Vec4::new(0.0, 2.5, 3.0, 6.0));
        assert_eq!(
            [Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)].into_iter().sum::<Vec2>(),
            Vec2::new(3.0, 3.0)
        );
    }
}
