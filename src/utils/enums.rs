use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::HepvecError;

/// Coordinate systems which vectors can be constructed from.
///
/// Vectors are always stored in Cartesian form except for [`Coordinates::PtEtaPhiMass`], which
/// has its own storage (see [`PtEtaPhiMassArray`](crate::PtEtaPhiMassArray)).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Coordinates {
    /// $`(x, y)`$, $`(x, y, z)`$, or $`(x, y, z, t)`$.
    Cartesian,
    /// $`(\rho, \phi)`$ in the plane.
    Polar,
    /// $`(\rho, \phi, z)`$, optionally with a time component.
    Cylindrical,
    /// $`(r, \theta, \phi)`$, optionally with a time component.
    Spherical,
    /// Transverse momentum, pseudorapidity, azimuth, and energy.
    PtEtaPhiE,
    /// Transverse momentum, pseudorapidity, azimuth, and mass.
    PtEtaPhiMass,
    /// Cartesian momentum with a (signed) mass in place of the energy.
    XYZM,
}

impl Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Coordinates::Cartesian => write!(f, "Cartesian"),
            Coordinates::Polar => write!(f, "Polar"),
            Coordinates::Cylindrical => write!(f, "Cylindrical"),
            Coordinates::Spherical => write!(f, "Spherical"),
            Coordinates::PtEtaPhiE => write!(f, "PtEtaPhiE"),
            Coordinates::PtEtaPhiMass => write!(f, "PtEtaPhiMass"),
            Coordinates::XYZM => write!(f, "XYZM"),
        }
    }
}

impl FromStr for Coordinates {
    type Err = HepvecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cartesian" | "xyz" | "xyzt" | "xy" => Ok(Self::Cartesian),
            "polar" | "circular" => Ok(Self::Polar),
            "cylindrical" | "cyl" => Ok(Self::Cylindrical),
            "spherical" | "sph" => Ok(Self::Spherical),
            "ptetaphie" | "ptetaphi" | "pt eta phi e" => Ok(Self::PtEtaPhiE),
            "ptetaphimass" | "ptetaphim" | "pt eta phi m" => Ok(Self::PtEtaPhiMass),
            "xyzm" | "xyz m" => Ok(Self::XYZM),
            _ => Err(HepvecError::ParseError {
                name: s.to_string(),
                object: "Coordinates".to_string(),
            }),
        }
    }
}

/// The family a vector value belongs to.
///
/// Operators only combine vectors of the same dimensionality. Both Lorentz representations
/// belong to the Lorentz family and are converted to Cartesian form when mixed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorKind {
    /// Two-dimensional Euclidean vectors.
    Vector2,
    /// Three-dimensional Euclidean vectors.
    Vector3,
    /// Cartesian Lorentz vectors.
    Lorentz,
    /// Lorentz vectors stored as $`(p_T, \eta, \phi, m)`$.
    PtEtaPhiMass,
}

impl VectorKind {
    /// Collapse both Lorentz representations into [`VectorKind::Lorentz`].
    pub fn family(&self) -> VectorKind {
        match self {
            VectorKind::PtEtaPhiMass => VectorKind::Lorentz,
            other => *other,
        }
    }

    /// Number of stored components.
    pub fn ncomp(&self) -> usize {
        match self {
            VectorKind::Vector2 => 2,
            VectorKind::Vector3 => 3,
            VectorKind::Lorentz | VectorKind::PtEtaPhiMass => 4,
        }
    }
}

impl Display for VectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorKind::Vector2 => write!(f, "Vector2"),
            VectorKind::Vector3 => write!(f, "Vector3"),
            VectorKind::Lorentz => write!(f, "Lorentz"),
            VectorKind::PtEtaPhiMass => write!(f, "PtEtaPhiMass"),
        }
    }
}

impl FromStr for VectorKind {
    type Err = HepvecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vector2" | "vec2" | "tvector2" | "2d" => Ok(Self::Vector2),
            "vector3" | "vec3" | "tvector3" | "3d" => Ok(Self::Vector3),
            "lorentz" | "vec4" | "tlorentzvector" | "4d" => Ok(Self::Lorentz),
            "ptetaphimass" | "ptetaphim" => Ok(Self::PtEtaPhiMass),
            _ => Err(HepvecError::ParseError {
                name: s.to_string(),
                object: "VectorKind".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn enum_displays() {
        assert_eq!(format!("{}", Coordinates::Cartesian), "Cartesian");
        assert_eq!(format!("{}", Coordinates::PtEtaPhiMass), "PtEtaPhiMass");
        assert_eq!(format!("{}", Coordinates::XYZM), "XYZM");
        assert_eq!(format!("{}", VectorKind::Vector2), "Vector2");
        assert_eq!(format!("{}", VectorKind::Lorentz), "Lorentz");
    }

    #[test]
    fn enum_from_str() {
        assert_eq!(
            Coordinates::from_str("cartesian").unwrap(),
            Coordinates::Cartesian
        );
        assert_eq!(Coordinates::from_str("CYL").unwrap(), Coordinates::Cylindrical);
        assert_eq!(
            Coordinates::from_str("PtEtaPhiM").unwrap(),
            Coordinates::PtEtaPhiMass
        );
        assert_eq!(Coordinates::from_str("xyzm").unwrap(), Coordinates::XYZM);
        assert_eq!(VectorKind::from_str("TVector3").unwrap(), VectorKind::Vector3);
        assert_eq!(
            VectorKind::from_str("TLorentzVector").unwrap(),
            VectorKind::Lorentz
        );
        assert!(Coordinates::from_str("hyperbolic").is_err());
    }

    #[test]
    fn lorentz_family() {
        assert_eq!(VectorKind::PtEtaPhiMass.family(), VectorKind::Lorentz);
        assert_eq!(VectorKind::Vector3.family(), VectorKind::Vector3);
        assert_eq!(VectorKind::PtEtaPhiMass.ncomp(), 4);
    }
}
