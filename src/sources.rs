use rand::prelude::{Distribution, Rng};

use crate::error::{ensure_finite, ensure_non_negative, Error, Result};
use crate::histogram::JitterObserver;
use crate::particle::Species;
use crate::random::{BoxJitter, IsotropicDirection, UnitCircle};
use crate::{UnitVector, Vector};

/// Where and what to emit. Positions in meters, energies in MeV.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub position:       Vector<f64>,
    #[serde(rename = "pdg")]
    pub species:        Species,
    pub kinetic_energy: f64,
}

impl SourceSpec {
    pub fn new(position: Vector<f64>, pdg: i32, kinetic_energy: f64) -> Result<Self> {
        Ok(Self {
            position,
            species: Species::from_pdg(pdg)?,
            kinetic_energy: ensure_finite("kinetic energy", kinetic_energy)?,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionSample {
    pub position:     Vector<f64>,
    pub direction:    UnitVector<f64>,
    pub polarization: UnitVector<f64>,
    pub energy:       f64,
    #[serde(rename = "pdg")]
    pub species:      Species,
}

/// Sampled position minus nominal position.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jitter {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl From<Vector<f64>> for Jitter {
    fn from(v: Vector<f64>) -> Self {
        Self {
            dx: v.x,
            dy: v.y,
            dz: v.z,
        }
    }
}

pub fn sample_direction<R: Rng + ?Sized>(rng: &mut R) -> UnitVector<f64> {
    IsotropicDirection.sample(rng)
}

/// Unit vector perpendicular to `direction`, uniformly rotated about it.
pub fn sample_polarization<R: Rng + ?Sized>(direction: Vector<f64>, rng: &mut R) -> Result<UnitVector<f64>> {
    let [a, b] = transverse_basis(direction)?;
    let [c, s]: [f64; 2] = UnitCircle.sample(rng);
    Ok(UnitVector(*a * c + *b * s))
}

/// Point `radius` away from the origin in the plane perpendicular to
/// `direction`, uniformly rotated about it.
pub fn transverse_position<R: Rng + ?Sized>(direction: Vector<f64>, radius: f64, rng: &mut R) -> Result<Vector<f64>> {
    Ok(*sample_polarization(direction, rng)? * radius)
}

fn transverse_basis(direction: Vector<f64>) -> Result<[UnitVector<f64>; 2]> {
    let d = UnitVector::normalize(direction).ok_or(Error::ZeroLength("direction"))?;
    let a = d.orthogonal();
    let b = UnitVector::normalize(a.cross(*d)).ok_or(Error::ZeroLength("transverse"))?;
    Ok([a, b])
}

/// `nominal` plus independent uniform jitter in `[-h, h]` on each axis.
pub fn sample_position<R: Rng + ?Sized>(
    nominal: Vector<f64>,
    half_width: Vector<f64>,
    rng: &mut R,
) -> Result<Vector<f64>> {
    Ok(nominal + BoxJitter::new(half_width)?.sample(rng))
}

/// Draws one emission in the order position, direction, polarization and
/// reports the position jitter to `observer`.
pub fn generate_sample<R, O>(
    source: &SourceSpec,
    half_width: Vector<f64>,
    rng: &mut R,
    observer: &mut O,
) -> Result<EmissionSample>
where
    R: Rng + ?Sized,
    O: JitterObserver + ?Sized,
{
    let position = sample_position(source.position, half_width, rng)?;
    let direction = sample_direction(rng);
    let polarization = sample_polarization(*direction, rng)?;
    observer.record(&Jitter::from(position - source.position));
    log::trace!("{:?} at {} along {}", source.species, position, direction);
    Ok(EmissionSample {
        position,
        direction,
        polarization,
        energy: source.kinetic_energy,
        species: source.species,
    })
}

pub trait Source {
    fn launch<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(EmissionSample, Jitter)>;
}

impl<S: Source> Source for &S {
    fn launch<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(EmissionSample, Jitter)> {
        S::launch(*self, rng)
    }
}

/// Isotropic emitter with its position smeared over a small box.
#[derive(Debug, Copy, Clone)]
pub struct PointSource {
    pub spec:       SourceSpec,
    pub half_width: Vector<f64>,
}

impl PointSource {
    pub fn new(spec: SourceSpec, half_width: Vector<f64>) -> Result<Self> {
        for &h in [half_width.x, half_width.y, half_width.z].iter() {
            ensure_non_negative("position jitter", h)?;
        }
        Ok(Self { spec, half_width })
    }
}

impl Source for PointSource {
    fn launch<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(EmissionSample, Jitter)> {
        let sample = generate_sample(&self.spec, self.half_width, rng, &mut ())?;
        Ok((sample, Jitter::from(sample.position - self.spec.position)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::PRng;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::SeedableRng;

    fn photon() -> SourceSpec {
        SourceSpec::new(Vector::new(0.0, 1.0, -2.0), -22, 9.69e-6).unwrap()
    }

    #[test]
    fn polarization_is_transverse() {
        let mut rng = PRng::seed_from_u64(123456u64);
        for _ in 0..10_000 {
            let d = sample_direction(&mut rng);
            let p = sample_polarization(*d, &mut rng).unwrap();
            assert_abs_diff_eq!(d.dot(*p), 0.0, epsilon = 1e-12);
            assert_relative_eq!(p.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn polarization_normalizes_direction() {
        let mut rng = PRng::seed_from_u64(1);
        let d = Vector::new(0.0, 0.0, 5.0);
        let p = sample_polarization(d, &mut rng).unwrap();
        assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.norm(), 1.0, epsilon = 1e-12);
        assert!(matches!(
            sample_polarization(Vector::ZERO, &mut rng),
            Err(Error::ZeroLength(_))
        ));
    }

    #[test]
    fn transverse_position_radius() {
        let mut rng = PRng::seed_from_u64(2);
        let d = Vector::new(1.0, -1.0, 0.5);
        for _ in 0..100 {
            let p = transverse_position(d, 0.3, &mut rng).unwrap();
            assert_relative_eq!(p.norm(), 0.3, epsilon = 1e-12);
            assert_abs_diff_eq!(p.dot(d), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn position_within_box() {
        let mut rng = PRng::seed_from_u64(3);
        let nominal = Vector::new(1.0, -2.0, 30.0);
        let h = Vector::splat(0.005);
        for _ in 0..10_000 {
            let p = sample_position(nominal, h, &mut rng).unwrap();
            assert!((p.x - nominal.x).abs() <= h.x + 1e-15);
            assert!((p.y - nominal.y).abs() <= h.y + 1e-15);
            assert!((p.z - nominal.z).abs() <= h.z + 1e-12);
        }
    }

    #[test]
    fn bad_half_width_is_an_error() {
        let mut rng = PRng::seed_from_u64(3);
        let source = photon();
        let mut seen: Vec<Jitter> = Vec::new();
        assert!(matches!(
            generate_sample(&source, Vector::new(-0.005, 0.005, 0.005), &mut rng, &mut seen),
            Err(Error::NonPositive { .. })
        ));
        assert!(matches!(
            generate_sample(&source, Vector::new(0.005, 0.005, f64::NAN), &mut rng, &mut seen),
            Err(Error::NonFinite { .. })
        ));
        assert!(seen.is_empty());
        assert!(sample_position(source.position, Vector::splat(-1.0), &mut rng).is_err());
    }

    #[test]
    fn sample_reports_jitter() {
        let mut rng = PRng::seed_from_u64(4);
        let source = photon();
        let mut seen: Vec<Jitter> = Vec::new();
        let sample = generate_sample(&source, Vector::splat(0.005), &mut rng, &mut seen).unwrap();
        assert_eq!(seen.len(), 1);
        let offset = sample.position - source.position;
        assert_eq!(seen[0], Jitter::from(offset));
        assert_eq!(sample.energy, 9.69e-6);
        assert_eq!(sample.species, Species::OpticalPhoton);
        assert_abs_diff_eq!(sample.direction.dot(*sample.polarization), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn same_seed_same_sample() {
        let src = PointSource::new(photon(), Vector::splat(0.005)).unwrap();
        let a = src.launch(&mut PRng::seed_from_u64(5)).unwrap();
        let b = (&src).launch(&mut PRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            SourceSpec::new(Vector::ZERO, 42, 1.0),
            Err(Error::UnknownSpecies(42))
        ));
        assert!(PointSource::new(photon(), Vector::new(0.1, -0.1, 0.1)).is_err());
        assert!(PointSource::new(photon(), Vector::new(0.1, f64::INFINITY, 0.1)).is_err());
    }

    #[test]
    fn samples_with_non_unit_direction_are_rejected() {
        let sample = generate_sample(&photon(), Vector::splat(0.005), &mut PRng::seed_from_u64(6), &mut ()).unwrap();
        let mut value = serde_json::to_value(&sample).unwrap();
        let back: EmissionSample = serde_json::from_value(value.clone()).unwrap();
        assert_abs_diff_eq!(back.direction.norm(), 1.0, epsilon = 1e-12);
        value["direction"] = serde_json::json!([0.0, 0.0, 2.0]);
        assert!(serde_json::from_value::<EmissionSample>(value).is_err());
    }

    #[test]
    fn source_spec_from_json() {
        let spec: SourceSpec =
            serde_json::from_str(r#"{"position": [0.0, 0.5, 1.0], "pdg": 11, "kinetic_energy": 5.0}"#).unwrap();
        assert_eq!(spec.species, Species::Electron);
        assert!(serde_json::from_str::<SourceSpec>(r#"{"position": [0, 0, 0], "pdg": 7, "kinetic_energy": 1}"#).is_err());
    }
}
