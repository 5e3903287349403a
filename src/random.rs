use core::f64::consts::PI;

use rand::distributions::Uniform;
use rand::prelude::{Distribution, Rng};
use rand::SeedableRng;
pub use rand_xoshiro::Xoroshiro128Plus as PRng;

use crate::error::{ensure_non_negative, Result};
use crate::vector::{UnitVector, Vector};

/// Directions uniform over the unit sphere.
///
/// The polar angle is drawn by rejection against the sine density: a
/// candidate `theta ~ U[0, pi]` is kept when `sin(theta) > u`, `u ~ U[0, 1)`.
/// The acceptance rate is `2 / pi`, so a draw costs `pi / 2` candidates on
/// average. The loop has no bound.
#[derive(Clone, Copy, Debug)]
pub struct IsotropicDirection;

impl Distribution<UnitVector<f64>> for IsotropicDirection {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> UnitVector<f64> {
        let phi = 2.0 * PI * rng.gen::<f64>();
        let theta = sample_polar_angle(rng);
        let (sp, cp) = phi.sin_cos();
        let (st, ct) = theta.sin_cos();
        UnitVector(Vector::new(cp * st, sp * st, ct))
    }
}

fn sample_polar_angle<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let polar = Uniform::new_inclusive(0.0, PI);
    let mut candidates = 0u32;
    loop {
        candidates += 1;
        let theta = polar.sample(rng);
        let test: f64 = rng.gen();
        if theta.sin() > test {
            log::trace!("polar angle accepted after {} candidates", candidates);
            return theta;
        }
    }
}

/// `[cos(theta), sin(theta)]` with `theta ~ U[0, 2pi)`.
#[derive(Clone, Copy, Debug)]
pub struct UnitCircle;

impl Distribution<[f64; 2]> for UnitCircle {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> [f64; 2] {
        let theta = 2.0 * PI * rng.gen::<f64>();
        let (s, c) = theta.sin_cos();
        [c, s]
    }
}

/// Independent per-axis uniform offsets within `[-h, h]`.
#[derive(Clone, Copy, Debug)]
pub struct BoxJitter {
    x: Uniform<f64>,
    y: Uniform<f64>,
    z: Uniform<f64>,
}

impl BoxJitter {
    /// Half widths must be finite and non-negative.
    pub fn new(half_width: Vector<f64>) -> Result<Self> {
        let axis = |h: f64| -> Result<Uniform<f64>> {
            let h = ensure_non_negative("position jitter", h)?;
            Ok(Uniform::new_inclusive(-h, h))
        };
        Ok(Self {
            x: axis(half_width.x)?,
            y: axis(half_width.y)?,
            z: axis(half_width.z)?,
        })
    }
}

impl Distribution<Vector<f64>> for BoxJitter {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector<f64> {
        Vector::new(self.x.sample(rng), self.y.sample(rng), self.z.sample(rng))
    }
}

/// `n` non-overlapping streams from one seed, each `2^64` draws apart.
pub fn streams(seed: u64, n: usize) -> Vec<PRng> {
    let mut rng = PRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let stream = rng.clone();
            rng.jump();
            stream
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use statrs::distribution::{ContinuousCDF, Uniform as UniformDist};
    use statrs::statistics::Statistics;

    /// Kolmogorov-Smirnov statistic against a continuous CDF.
    fn ks_statistic(mut xs: Vec<f64>, cdf: impl Fn(f64) -> f64) -> f64 {
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = xs.len() as f64;
        xs.iter()
            .enumerate()
            .map(|(i, &x)| {
                let f = cdf(x);
                (f - i as f64 / n).abs().max(((i + 1) as f64 / n - f).abs())
            })
            .fold(0.0, f64::max)
    }

    #[test]
    fn isotropic_directions_are_unit_and_uniform_in_cos_theta() {
        let mut rng = PRng::seed_from_u64(123456u64);
        let n = 50_000;
        let dirs: Vec<UnitVector<f64>> = (0..n).map(|_| IsotropicDirection.sample(&mut rng)).collect();
        for d in dirs.iter() {
            assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-12);
        }
        // isotropy <=> cos(theta) ~ U[-1, 1]
        let u = UniformDist::new(-1.0, 1.0).unwrap();
        let d = ks_statistic(dirs.iter().map(|d| d.z).collect(), |x| u.cdf(x));
        // 99.9% critical value 1.95 / sqrt(n)
        assert!(d < 1.95 / (n as f64).sqrt(), "KS statistic {}", d);

        let xs: Vec<f64> = dirs.iter().map(|d| d.x).collect();
        assert!(xs.iter().mean().abs() < 0.02);
        // <x^2> = 1/3 on the sphere
        assert_relative_eq!(xs.iter().map(|x| x * x).mean(), 1.0 / 3.0, epsilon = 0.01);
    }

    #[test]
    fn unit_circle_is_unit() {
        let mut rng = PRng::seed_from_u64(7);
        for _ in 0..1000 {
            let [c, s] = UnitCircle.sample(&mut rng);
            assert_relative_eq!(c * c + s * s, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn box_jitter_bounds() {
        let mut rng = PRng::seed_from_u64(99);
        let h = Vector::new(0.005, 0.01, 0.0);
        let jitter = BoxJitter::new(h).unwrap();
        for _ in 0..10_000 {
            let v = jitter.sample(&mut rng);
            assert!(v.x.abs() <= h.x);
            assert!(v.y.abs() <= h.y);
            assert_eq!(v.z, 0.0);
        }
    }

    #[test]
    fn box_jitter_rejects_bad_half_width() {
        use crate::Error;
        assert!(matches!(
            BoxJitter::new(Vector::new(-0.005, 0.005, 0.005)),
            Err(Error::NonPositive { .. })
        ));
        assert!(matches!(
            BoxJitter::new(Vector::new(0.005, f64::NAN, 0.005)),
            Err(Error::NonFinite { .. })
        ));
        assert!(matches!(
            BoxJitter::new(Vector::new(0.005, 0.005, f64::INFINITY)),
            Err(Error::NonFinite { .. })
        ));
    }

    #[test]
    fn streams_are_reproducible_and_distinct() {
        let mut a = streams(42, 3);
        let mut b = streams(42, 3);
        let first: Vec<u64> = a.iter_mut().map(|r| r.gen()).collect();
        let again: Vec<u64> = b.iter_mut().map(|r| r.gen()).collect();
        assert_eq!(first, again);
        assert_ne!(first[0], first[1]);
        assert_ne!(first[1], first[2]);
        assert_eq!(streams(42, 1)[0].gen::<u64>(), PRng::seed_from_u64(42).gen::<u64>());
    }
}
