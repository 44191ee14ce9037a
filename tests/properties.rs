use std::f64::consts::PI;

use approx::assert_relative_eq;
use hepvec::prelude::*;

const SAMPLES: usize = 500;

fn uniform(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + (high - low) * rng.f64()
}

fn column(rng: &mut fastrand::Rng, low: f64, high: f64) -> Column {
    (0..SAMPLES).map(|_| uniform(rng, low, high)).collect()
}

#[test]
fn polar_roundtrip() {
    let mut rng = fastrand::Rng::with_seed(11);
    let rho = column(&mut rng, 0.1, 100.0);
    let phi = column(&mut rng, -PI + 1e-9, PI - 1e-9);
    let vectors = Vec2Array::from_polar(rho.clone(), phi.clone())
        .unwrap()
        .into_flat()
        .unwrap();
    for i in 0..SAMPLES {
        assert_relative_eq!(vectors.rho()[i], rho[i], epsilon = 1e-10);
        assert_relative_eq!(vectors.phi()[i], phi[i], epsilon = 1e-10);
    }
}

#[test]
fn spherical_and_cylindrical_roundtrip() {
    let mut rng = fastrand::Rng::with_seed(12);
    let r = column(&mut rng, 0.1, 50.0);
    let theta = column(&mut rng, 0.01, PI - 0.01);
    let phi = column(&mut rng, -3.0, 3.0);
    let z = column(&mut rng, -20.0, 20.0);
    let spherical = Vec3Array::from_spherical(r.clone(), theta.clone(), phi.clone())
        .unwrap()
        .into_flat()
        .unwrap();
    let cylindrical = Vec3Array::from_cylindrical(r.clone(), phi.clone(), z.clone())
        .unwrap()
        .into_flat()
        .unwrap();
    for i in 0..SAMPLES {
        assert_relative_eq!(spherical.r()[i], r[i], epsilon = 1e-10);
        assert_relative_eq!(spherical.theta()[i], theta[i], epsilon = 1e-10);
        assert_relative_eq!(spherical.phi()[i], phi[i], epsilon = 1e-10);
        assert_relative_eq!(cylindrical.rho()[i], r[i], epsilon = 1e-10);
        assert_relative_eq!(cylindrical.z()[i], z[i]);
    }
}

#[test]
fn ptetaphim_metric() {
    let mut rng = fastrand::Rng::with_seed(13);
    let pt = column(&mut rng, 1.0, 100.0);
    let eta = column(&mut rng, -2.5, 2.5);
    let phi = column(&mut rng, -3.0, 3.0);
    let mass = column(&mut rng, 0.0, 10.0);
    let vectors = PtEtaPhiMassArray::from_ptetaphim(pt, eta, phi, mass.clone())
        .unwrap()
        .into_flat()
        .unwrap();
    let cartesian = vectors.to_cartesian();
    for (i, v) in cartesian.to_vec().iter().enumerate() {
        let interval = v.t * v.t - v.x * v.x - v.y * v.y - v.z * v.z;
        assert_relative_eq!(interval, mass[i] * mass[i], epsilon = 1e-9 * v.t * v.t);
    }
    let eta_back = cartesian.eta();
    for i in 0..SAMPLES {
        assert_relative_eq!(eta_back[i], vectors.eta()[i], epsilon = 1e-9);
    }
}

#[test]
fn rotations_are_isometries() {
    let mut rng = fastrand::Rng::with_seed(14);
    let vectors = Vec3Array::new(
        column(&mut rng, -10.0, 10.0),
        column(&mut rng, -10.0, 10.0),
        column(&mut rng, -10.0, 10.0),
    )
    .unwrap();
    let axis = Vec3::new(0.3, -1.2, 0.4);
    let angle = uniform(&mut rng, -PI, PI);
    let rotated = vectors.rotate_axis(&axis, angle);
    let restored = rotated.rotate_axis(&axis, -angle);
    let euler = vectors.rotate_euler(0.4, -1.1, 2.5);
    for i in 0..SAMPLES {
        let v = vectors.get(i).unwrap();
        assert_relative_eq!(rotated.mag()[i], vectors.mag()[i], epsilon = 1e-10);
        assert_relative_eq!(euler.mag()[i], vectors.mag()[i], epsilon = 1e-10);
        assert_relative_eq!(restored.get(i).unwrap(), v, epsilon = 1e-10);
    }
    let planar = vectors.xy();
    let turned = planar.rotate(angle).rotate(-angle);
    for i in 0..SAMPLES {
        assert_relative_eq!(turned.get(i).unwrap(), planar.get(i).unwrap(), epsilon = 1e-10);
    }
}

#[test]
fn boosts_preserve_the_interval() {
    let mut rng = fastrand::Rng::with_seed(15);
    let p3 = Vec3Array::new(
        column(&mut rng, -5.0, 5.0),
        column(&mut rng, -5.0, 5.0),
        column(&mut rng, -5.0, 5.0),
    )
    .unwrap();
    let vectors = p3.with_mass(&column(&mut rng, 0.1, 3.0)).unwrap();
    let beta = Vec3::new(
        uniform(&mut rng, -0.5, 0.5),
        uniform(&mut rng, -0.5, 0.5),
        uniform(&mut rng, -0.5, 0.5),
    );
    let boosted = vectors.boost(&beta);
    let mag2 = vectors.mag2();
    let boosted_mag2 = boosted.mag2();
    for i in 0..SAMPLES {
        assert_relative_eq!(boosted_mag2[i], mag2[i], epsilon = 1e-9);
    }
}

#[test]
fn arrays_match_scalar_kernels() {
    let mut rng = fastrand::Rng::with_seed(16);
    let a = Vec4Array::new(
        column(&mut rng, -5.0, 5.0),
        column(&mut rng, -5.0, 5.0),
        column(&mut rng, -5.0, 5.0),
        column(&mut rng, 0.0, 20.0),
    )
    .unwrap();
    let b = Vec4Array::new(
        column(&mut rng, -5.0, 5.0),
        column(&mut rng, -5.0, 5.0),
        column(&mut rng, -5.0, 5.0),
        column(&mut rng, 0.0, 20.0),
    )
    .unwrap();
    let dot = a.dot(&b).unwrap();
    let delta_r = a.delta_r(&b).unwrap();
    let (mass, pt, eta, mt, rapidity) = (a.mass(), a.pt(), a.eta(), a.mt(), a.rapidity());
    let timelike = a.is_timelike(DEFAULT_TOLERANCE);
    for i in 0..SAMPLES {
        let (u, v) = (a.get(i).unwrap(), b.get(i).unwrap());
        assert_eq!(dot[i], u.dot(&v));
        assert_eq!(delta_r[i], u.delta_r(&v));
        assert_eq!(pt[i], u.pt());
        assert_eq!(eta[i], u.eta());
        assert_eq!(mt[i].to_bits(), u.mt().to_bits());
        assert_eq!(rapidity[i].to_bits(), u.rapidity().to_bits());
        assert_eq!(mass[i].to_bits(), u.mass().to_bits());
        assert_eq!(timelike[i], u.is_timelike(DEFAULT_TOLERANCE));
    }
}

#[test]
fn angles_are_clipped() {
    let a = Vec3::new(1.0, 1e-9, 0.0).unit();
    let b = Vec3::new(-1.0, 0.0, 1e-9).unit();
    let cos = a.cosdelta(&b);
    assert!((-1.0..=1.0).contains(&cos));
    assert!(!a.angle(&b).is_nan());
    assert_eq!(Vec3::origin().angle(&Vec3::new(1.0, 2.0, 3.0)), 0.0);
    assert_eq!(Vec2::origin().cosdelta(&Vec2::new(1.0, 2.0)), 1.0);
}
