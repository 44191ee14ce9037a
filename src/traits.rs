//! Capability traits shared by every representation of a vector.
//!
//! Each trait is implemented three times per vector family: for the scalar type (returning
//! `f64`), for the flat columnar array (returning [`Column`]), and for jagged arrays of the
//! columnar array (returning a jagged [`Column`] with the same partition). Binary operations
//! which need a second operand of the same shape live on the types themselves.
use crate::{
    data::{column::Mask, jagged::Nested},
    utils::vectors::{PtEtaPhiMassVec4, Vec2, Vec3, Vec4},
    Column,
};

/// Quantities every vector has.
pub trait VectorOps {
    /// `f64`, [`Column`], or `Nested<Column>`.
    type Real;
    /// `bool`, [`Mask`], or `Nested<Mask>`.
    type Mask;

    fn mag2(&self) -> Self::Real;
    fn mag(&self) -> Self::Real;
}

/// Euclidean vectors with at least an $`x`$-$`y`$ plane.
pub trait PlanarOps: VectorOps {
    fn x(&self) -> Self::Real;
    fn y(&self) -> Self::Real;
    /// The transverse radius.
    fn rho(&self) -> Self::Real;
    fn rho2(&self) -> Self::Real;
    fn phi(&self) -> Self::Real;
}

/// Three-dimensional Euclidean vectors.
pub trait SpatialOps: PlanarOps {
    fn z(&self) -> Self::Real;
    fn theta(&self) -> Self::Real;
    fn costheta(&self) -> Self::Real;
    fn cottheta(&self) -> Self::Real;
    /// The radial coordinate, the same as [`VectorOps::mag`].
    fn r(&self) -> Self::Real {
        self.mag()
    }
}

/// Lorentz vectors in any stored representation.
pub trait LorentzOps: VectorOps {
    fn x(&self) -> Self::Real;
    fn y(&self) -> Self::Real;
    fn z(&self) -> Self::Real;
    fn t(&self) -> Self::Real;
    fn energy(&self) -> Self::Real {
        self.t()
    }
    fn pt(&self) -> Self::Real;
    fn pt2(&self) -> Self::Real;
    fn perp(&self) -> Self::Real {
        self.pt()
    }
    fn perp2(&self) -> Self::Real {
        self.pt2()
    }
    fn eta(&self) -> Self::Real;
    fn phi(&self) -> Self::Real;
    fn theta(&self) -> Self::Real;
    fn cottheta(&self) -> Self::Real;
    fn mass(&self) -> Self::Real;
    fn mass2(&self) -> Self::Real;
    /// The magnitude of the three-momentum.
    fn p(&self) -> Self::Real;
    fn p2(&self) -> Self::Real;
    fn mt(&self) -> Self::Real;
    fn mt2(&self) -> Self::Real;
    fn et(&self) -> Self::Real;
    fn rapidity(&self) -> Self::Real;
    fn beta(&self) -> Self::Real;
    fn gamma(&self) -> Self::Real;
    fn is_spacelike(&self, tolerance: f64) -> Self::Mask;
    fn is_timelike(&self, tolerance: f64) -> Self::Mask;
    fn is_lightlike(&self, tolerance: f64) -> Self::Mask;
}

impl VectorOps for Vec2 {
    type Real = f64;
    type Mask = bool;
    fn mag2(&self) -> f64 {
        Vec2::mag2(self)
    }
    fn mag(&self) -> f64 {
        Vec2::mag(self)
    }
}

impl PlanarOps for Vec2 {
    fn x(&self) -> f64 {
        self.x
    }
    fn y(&self) -> f64 {
        self.y
    }
    fn rho(&self) -> f64 {
        Vec2::rho(self)
    }
    fn rho2(&self) -> f64 {
        Vec2::rho2(self)
    }
    fn phi(&self) -> f64 {
        Vec2::phi(self)
    }
}

impl VectorOps for Vec3 {
    type Real = f64;
    type Mask = bool;
    fn mag2(&self) -> f64 {
        Vec3::mag2(self)
    }
    fn mag(&self) -> f64 {
        Vec3::mag(self)
    }
}

impl PlanarOps for Vec3 {
    fn x(&self) -> f64 {
        self.x
    }
    fn y(&self) -> f64 {
        self.y
    }
    fn rho(&self) -> f64 {
        Vec3::rho(self)
    }
    fn rho2(&self) -> f64 {
        Vec3::rho2(self)
    }
    fn phi(&self) -> f64 {
        Vec3::phi(self)
    }
}

impl SpatialOps for Vec3 {
    fn z(&self) -> f64 {
        self.z
    }
    fn theta(&self) -> f64 {
        Vec3::theta(self)
    }
    fn costheta(&self) -> f64 {
        Vec3::costheta(self)
    }
    fn cottheta(&self) -> f64 {
        Vec3::cottheta(self)
    }
}

impl VectorOps for Vec4 {
    type Real = f64;
    type Mask = bool;
    fn mag2(&self) -> f64 {
        Vec4::mag2(self)
    }
    fn mag(&self) -> f64 {
        Vec4::mag(self)
    }
}

impl LorentzOps for Vec4 {
    fn x(&self) -> f64 {
        self.x
    }
    fn y(&self) -> f64 {
        self.y
    }
    fn z(&self) -> f64 {
        self.z
    }
    fn t(&self) -> f64 {
        self.t
    }
    fn pt(&self) -> f64 {
        Vec4::pt(self)
    }
    fn pt2(&self) -> f64 {
        Vec4::pt2(self)
    }
    fn eta(&self) -> f64 {
        Vec4::eta(self)
    }
    fn phi(&self) -> f64 {
        Vec4::phi(self)
    }
    fn theta(&self) -> f64 {
        Vec4::theta(self)
    }
    fn cottheta(&self) -> f64 {
        Vec4::cottheta(self)
    }
    fn mass(&self) -> f64 {
        Vec4::mass(self)
    }
    fn mass2(&self) -> f64 {
        Vec4::mass2(self)
    }
    fn p(&self) -> f64 {
        Vec4::p(self)
    }
    fn p2(&self) -> f64 {
        Vec4::p2(self)
    }
    fn mt(&self) -> f64 {
        Vec4::mt(self)
    }
    fn mt2(&self) -> f64 {
        Vec4::mt2(self)
    }
    fn et(&self) -> f64 {
        Vec4::et(self)
    }
    fn rapidity(&self) -> f64 {
        Vec4::rapidity(self)
    }
    fn beta(&self) -> f64 {
        Vec4::beta(self)
    }
    fn gamma(&self) -> f64 {
        Vec4::gamma(self)
    }
    fn is_spacelike(&self, tolerance: f64) -> bool {
        Vec4::is_spacelike(self, tolerance)
    }
    fn is_timelike(&self, tolerance: f64) -> bool {
        Vec4::is_timelike(self, tolerance)
    }
    fn is_lightlike(&self, tolerance: f64) -> bool {
        Vec4::is_lightlike(self, tolerance)
    }
}

impl VectorOps for PtEtaPhiMassVec4 {
    type Real = f64;
    type Mask = bool;
    fn mag2(&self) -> f64 {
        PtEtaPhiMassVec4::mag2(self)
    }
    fn mag(&self) -> f64 {
        PtEtaPhiMassVec4::mag(self)
    }
}

impl LorentzOps for PtEtaPhiMassVec4 {
    fn x(&self) -> f64 {
        PtEtaPhiMassVec4::x(self)
    }
    fn y(&self) -> f64 {
        PtEtaPhiMassVec4::y(self)
    }
    fn z(&self) -> f64 {
        PtEtaPhiMassVec4::z(self)
    }
    fn t(&self) -> f64 {
        PtEtaPhiMassVec4::t(self)
    }
    fn pt(&self) -> f64 {
        self.pt
    }
    fn pt2(&self) -> f64 {
        PtEtaPhiMassVec4::pt2(self)
    }
    fn eta(&self) -> f64 {
        self.eta
    }
    fn phi(&self) -> f64 {
        self.phi
    }
    fn theta(&self) -> f64 {
        PtEtaPhiMassVec4::theta(self)
    }
    fn cottheta(&self) -> f64 {
        PtEtaPhiMassVec4::cottheta(self)
    }
    fn mass(&self) -> f64 {
        self.mass
    }
    fn mass2(&self) -> f64 {
        PtEtaPhiMassVec4::mass2(self)
    }
    fn p(&self) -> f64 {
        PtEtaPhiMassVec4::p(self)
    }
    fn p2(&self) -> f64 {
        PtEtaPhiMassVec4::p2(self)
    }
    fn mt(&self) -> f64 {
        PtEtaPhiMassVec4::mt(self)
    }
    fn mt2(&self) -> f64 {
        PtEtaPhiMassVec4::mt2(self)
    }
    fn et(&self) -> f64 {
        PtEtaPhiMassVec4::et(self)
    }
    fn rapidity(&self) -> f64 {
        PtEtaPhiMassVec4::rapidity(self)
    }
    fn beta(&self) -> f64 {
        PtEtaPhiMassVec4::beta(self)
    }
    fn gamma(&self) -> f64 {
        PtEtaPhiMassVec4::gamma(self)
    }
    fn is_spacelike(&self, tolerance: f64) -> bool {
        PtEtaPhiMassVec4::is_spacelike(self, tolerance)
    }
    fn is_timelike(&self, tolerance: f64) -> bool {
        PtEtaPhiMassVec4::is_timelike(self, tolerance)
    }
    fn is_lightlike(&self, tolerance: f64) -> bool {
        PtEtaPhiMassVec4::is_lightlike(self, tolerance)
    }
}

impl<A> VectorOps for Nested<A>
where
    A: VectorOps<Real = Column, Mask = Mask>,
{
    type Real = Nested<Column>;
    type Mask = Nested<Mask>;
    fn mag2(&self) -> Nested<Column> {
        self.map_content(A::mag2)
    }
    fn mag(&self) -> Nested<Column> {
        self.map_content(A::mag)
    }
}

impl<A> PlanarOps for Nested<A>
where
    A: PlanarOps<Real = Column, Mask = Mask>,
{
    fn x(&self) -> Nested<Column> {
        self.map_content(A::x)
    }
    fn y(&self) -> Nested<Column> {
        self.map_content(A::y)
    }
    fn rho(&self) -> Nested<Column> {
        self.map_content(A::rho)
    }
    fn rho2(&self) -> Nested<Column> {
        self.map_content(A::rho2)
    }
    fn phi(&self) -> Nested<Column> {
        self.map_content(A::phi)
    }
}

impl<A> SpatialOps for Nested<A>
where
    A: SpatialOps<Real = Column, Mask = Mask>,
{
    fn z(&self) -> Nested<Column> {
        self.map_content(A::z)
    }
    fn theta(&self) -> Nested<Column> {
        self.map_content(A::theta)
    }
    fn costheta(&self) -> Nested<Column> {
        self.map_content(A::costheta)
    }
    fn cottheta(&self) -> Nested<Column> {
        self.map_content(A::cottheta)
    }
}

impl<A> LorentzOps for Nested<A>
where
    A: LorentzOps<Real = Column, Mask = Mask>,
{
    fn x(&self) -> Nested<Column> {
        self.map_content(A::x)
    }
    fn y(&self) -> Nested<Column> {
        self.map_content(A::y)
    }
    fn z(&self) -> Nested<Column> {
        self.map_content(A::z)
    }
    fn t(&self) -> Nested<Column> {
        self.map_content(A::t)
    }
    fn pt(&self) -> Nested<Column> {
        self.map_content(A::pt)
    }
    fn pt2(&self) -> Nested<Column> {
        self.map_content(A::pt2)
    }
    fn eta(&self) -> Nested<Column> {
        self.map_content(A::eta)
    }
    fn phi(&self) -> Nested<Column> {
        self.map_content(A::phi)
    }
    fn theta(&self) -> Nested<Column> {
        self.map_content(A::theta)
    }
    fn cottheta(&self) -> Nested<Column> {
        self.map_content(A::cottheta)
    }
    fn mass(&self) -> Nested<Column> {
        self.map_content(A::mass)
    }
    fn mass2(&self) -> Nested<Column> {
        self.map_content(A::mass2)
    }
    fn p(&self) -> Nested<Column> {
        self.map_content(A::p)
    }
    fn p2(&self) -> Nested<Column> {
        self.map_content(A::p2)
    }
    fn mt(&self) -> Nested<Column> {
        self.map_content(A::mt)
    }
    fn mt2(&self) -> Nested<Column> {
        self.map_content(A::mt2)
    }
    fn et(&self) -> Nested<Column> {
        self.map_content(A::et)
    }
    fn rapidity(&self) -> Nested<Column> {
        self.map_content(A::rapidity)
    }
    fn beta(&self) -> Nested<Column> {
        self.map_content(A::beta)
    }
    fn gamma(&self) -> Nested<Column> {
        self.map_content(A::gamma)
    }
    fn is_spacelike(&self, tolerance: f64) -> Nested<Mask> {
        self.map_content(|a| a.is_spacelike(tolerance))
    }
    fn is_timelike(&self, tolerance: f64) -> Nested<Mask> {
        self.map_content(|a| a.is_timelike(tolerance))
    }
    fn is_lightlike(&self, tolerance: f64) -> Nested<Mask> {
        self.map_content(|a| a.is_lightlike(tolerance))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{data::Vec4Array, DEFAULT_TOLERANCE};

    fn lorentz_mass<V: LorentzOps<Real = f64>>(v: &V) -> f64 {
        v.mass()
    }

    #[test]
    fn test_scalar_representations_agree() {
        let cartesian = Vec4::from_ptetaphie(10.0, 0.5, 1.0, 20.0);
        let polar = PtEtaPhiMassVec4::new(10.0, 0.5, 1.0, cartesian.mass());
        assert_relative_eq!(lorentz_mass(&cartesian), lorentz_mass(&polar), epsilon = 1e-12);
        assert_relative_eq!(
            LorentzOps::eta(&cartesian),
            LorentzOps::eta(&polar),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            LorentzOps::t(&polar),
            LorentzOps::t(&cartesian),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_jagged_quantities_keep_partition() {
        let array = Vec4Array::new(
            vec![3.0, 0.0, 1.0],
            vec![4.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0],
            vec![13.0, 1.0, 1.0],
        )
        .unwrap();
        let jagged = Nested::Flat(array).wrap_counts(&[2, 1]).unwrap();
        let mass = jagged.mass();
        assert_eq!(mass.counts(), Some(vec![2, 1]));
        assert_eq!(mass.flatten_all().to_vec(), vec![12.0, 1.0, 0.0]);
        let lightlike = jagged.is_lightlike(DEFAULT_TOLERANCE);
        assert_eq!(lightlike.flatten_all(), vec![false, false, true]);
    }
}
