//! Run configuration, read once from TOML at startup.
//!
//! Every field has a default reproducing the reference ICEBERG light
//! simulation, so an empty file is a valid configuration. Lengths are in
//! meters, energies in MeV.

use std::path::Path;

use crate::error::{ensure_finite, ensure_positive, Error, Result};
use crate::particle::Species;
use crate::sources::{PointSource, SourceSpec};
use crate::Vector;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub detector: DetectorConfig,
    pub source:   SourceConfig,
    pub run:      RunConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("loading configuration from {}", path.display());
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.source.validate()?;
        self.run.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Full world box.
    pub world_size:       Vector<f64>,
    pub cryostat:         CryostatConfig,
    pub field_cage:       FieldCageConfig,
    pub light_collectors: LightCollectorConfig,
    pub membrane:         MembraneConfig,
    pub cathode_modules:  CathodeModulesConfig,
    pub short_wall:       ShortWallConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            world_size:       Vector::new(15.8, 10.0, 65.0),
            cryostat:         CryostatConfig::default(),
            field_cage:       FieldCageConfig::default(),
            light_collectors: LightCollectorConfig::default(),
            membrane:         MembraneConfig::default(),
            cathode_modules:  CathodeModulesConfig::default(),
            short_wall:       ShortWallConfig::default(),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        positive_vector("world size", self.world_size)?;
        self.cryostat.validate()?;
        self.field_cage.validate()?;
        self.light_collectors.validate()?;
        self.membrane.validate()?;
        self.cathode_modules.validate()?;
        self.short_wall.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CryostatConfig {
    /// Active liquid-argon volume; component positions are derived from it.
    pub active_size:     Vector<f64>,
    /// Membrane vessel; the cryostat volume and wall-mounted modules use it.
    pub vessel_size:     Vector<f64>,
    /// Extra half-height so the plates fit inside the cryostat volume.
    pub overlap_margin:  f64,
    pub shell_thickness: f64,
    pub plate_thickness: f64,
    /// Cathode and anode extent along x and z.
    pub plate_x:         f64,
    pub plate_z:         f64,
}

impl Default for CryostatConfig {
    fn default() -> Self {
        Self {
            active_size:     Vector::new(14.8, 6.5, 60.0),
            vessel_size:     Vector::new(15.1, 8.5, 62.0),
            overlap_margin:  0.1,
            shell_thickness: 0.3,
            plate_thickness: 0.10,
            plate_x:         13.5,
            plate_z:         60.0,
        }
    }
}

impl CryostatConfig {
    fn validate(&self) -> Result<()> {
        positive_vector("cryostat active size", self.active_size)?;
        positive_vector("cryostat vessel size", self.vessel_size)?;
        non_negative("cryostat overlap margin", self.overlap_margin)?;
        ensure_positive("cryostat shell thickness", self.shell_thickness)?;
        ensure_positive("plate thickness", self.plate_thickness)?;
        ensure_positive("plate x", self.plate_x)?;
        ensure_positive("plate z", self.plate_z)?;
        Ok(())
    }
}

/// Field-cage profiles: elliptical tubes cut in half lengthwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldCageConfig {
    /// Distance between the two long sides.
    pub width:              f64,
    /// Height of the first profile above the cathode plane.
    pub first_offset:       f64,
    pub pitch:              f64,
    pub wide_count:         u32,
    pub slim_count:         u32,
    pub profile_half_width: f64,
    pub wide_half_height:   f64,
    pub slim_half_height:   f64,
    /// Offset of the cutting box along the profile's short axis.
    pub cut_offset:         f64,
    /// Clearance at each end of a short-side profile.
    pub end_gap:            f64,
    /// Length of each of the two outer pieces of a split short-side profile.
    pub side_length:        f64,
}

impl Default for FieldCageConfig {
    fn default() -> Self {
        Self {
            width:              13.5,
            first_offset:       0.04,
            pitch:              0.06,
            wide_count:         50,
            slim_count:         57,
            profile_half_width: 0.005,
            wide_half_height:   0.023,
            slim_half_height:   0.0075,
            cut_offset:         0.0045,
            end_gap:            0.005,
            side_length:        3.4,
        }
    }
}

impl FieldCageConfig {
    fn validate(&self) -> Result<()> {
        ensure_positive("field cage width", self.width)?;
        ensure_finite("field cage first offset", self.first_offset)?;
        ensure_positive("field cage pitch", self.pitch)?;
        count("field cage wide profiles", self.wide_count)?;
        count("field cage slim profiles", self.slim_count)?;
        ensure_positive("profile half width", self.profile_half_width)?;
        ensure_positive("wide profile half height", self.wide_half_height)?;
        ensure_positive("slim profile half height", self.slim_half_height)?;
        ensure_finite("profile cut offset", self.cut_offset)?;
        non_negative("profile end gap", self.end_gap)?;
        ensure_positive("short side piece length", self.side_length)?;
        ensure_positive("short central piece length", self.width - 2.0 * self.side_length)?;
        ensure_positive("short profile length", self.width / 2.0 - self.end_gap)?;
        ensure_positive("short side piece length", self.side_length / 2.0 - self.end_gap)?;
        Ok(())
    }
}

/// Shared dimensions of the light-collector modules and their shields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LightCollectorConfig {
    /// Side of the square acceptance window.
    pub window:               f64,
    pub acceptance_thickness: f64,
    /// Side of the square shield frame.
    pub shield_size:          f64,
    pub shield_thickness:     f64,
    /// Clearance between window and shield.
    pub window_gap:           f64,
    pub wall_distance:        f64,
    /// Top row height below the top of the active volume.
    pub top_offset:           f64,
    pub row_pitch:            f64,
}

impl Default for LightCollectorConfig {
    fn default() -> Self {
        Self {
            window:               0.6,
            acceptance_thickness: 0.01,
            shield_size:          0.65,
            shield_thickness:     0.025,
            window_gap:           0.001,
            wall_distance:        0.1,
            top_offset:           0.5,
            row_pitch:            0.8,
        }
    }
}

impl LightCollectorConfig {
    fn validate(&self) -> Result<()> {
        ensure_positive("window size", self.window)?;
        ensure_positive("acceptance thickness", self.acceptance_thickness)?;
        ensure_positive("shield size", self.shield_size - self.window)?;
        ensure_positive("shield thickness", self.shield_thickness)?;
        non_negative("window gap", self.window_gap)?;
        non_negative("wall distance", self.wall_distance)?;
        ensure_finite("top offset", self.top_offset)?;
        ensure_positive("module row pitch", self.row_pitch)?;
        Ok(())
    }
}

/// Modules on the two long membrane walls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MembraneConfig {
    pub rows:      u32,
    pub cols:      u32,
    /// First column, measured from the upstream end of the active volume.
    pub first_z:   f64,
    pub col_pitch: f64,
}

impl Default for MembraneConfig {
    fn default() -> Self {
        Self {
            rows:      4,
            cols:      20,
            first_z:   1.5,
            col_pitch: 3.0,
        }
    }
}

impl MembraneConfig {
    fn validate(&self) -> Result<()> {
        count("membrane rows", self.rows)?;
        count("membrane columns", self.cols)?;
        ensure_finite("membrane first z", self.first_z)?;
        ensure_positive("membrane column pitch", self.col_pitch)?;
        Ok(())
    }
}

/// Modules lying on the cathode plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CathodeModulesConfig {
    pub cols:      u32,
    pub per_col:   u32,
    pub x_pitch:   f64,
    /// Lateral positions in units of `x_pitch`, used cyclically.
    pub x_pattern: Vec<f64>,
    pub z_pitch:   f64,
}

impl Default for CathodeModulesConfig {
    fn default() -> Self {
        Self {
            cols:      40,
            per_col:   8,
            x_pitch:   0.84375,
            x_pattern: vec![
                -5.5, -1.5, 2.5, 6.5, -7.5, -3.5, 0.5, 4.5, -4.5, -0.5, 3.5, 7.5, -6.5, -2.5, 1.5, 5.5,
            ],
            z_pitch:   0.75,
        }
    }
}

impl CathodeModulesConfig {
    fn validate(&self) -> Result<()> {
        count("cathode module columns", self.cols)?;
        count("cathode modules per column", self.per_col)?;
        if self.per_col % 2 != 0 {
            return Err(Error::InvalidGrid("cathode modules per column must be even"));
        }
        ensure_positive("cathode module x pitch", self.x_pitch)?;
        if self.x_pattern.is_empty() {
            return Err(Error::InvalidGrid("cathode module x pattern is empty"));
        }
        for &x in self.x_pattern.iter() {
            ensure_finite("cathode module x pattern", x)?;
        }
        ensure_positive("cathode module z pitch", self.z_pitch)?;
        Ok(())
    }

    pub fn x_positions(&self) -> Vec<f64> {
        self.x_pattern.iter().map(|x| x * self.x_pitch).collect()
    }
}

/// Modules on the two short end walls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShortWallConfig {
    pub rows:      u32,
    pub cols:      u32,
    /// First column, measured from the -x side of the active volume.
    pub first_x:   f64,
    pub col_pitch: f64,
}

impl Default for ShortWallConfig {
    fn default() -> Self {
        Self {
            rows:      4,
            cols:      2,
            first_x:   5.20,
            col_pitch: 4.4,
        }
    }
}

impl ShortWallConfig {
    fn validate(&self) -> Result<()> {
        count("short wall rows", self.rows)?;
        count("short wall columns", self.cols)?;
        ensure_finite("short wall first x", self.first_x)?;
        ensure_positive("short wall column pitch", self.col_pitch)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub position:        Vector<f64>,
    pub pdg:             i32,
    pub kinetic_energy:  f64,
    /// Half width of the box the emission point is smeared over, per axis.
    pub position_jitter: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            position:        Vector::ZERO,
            pdg:             Species::OpticalPhoton.pdg(),
            // 128 nm argon scintillation
            kinetic_energy:  9.69e-6,
            position_jitter: 0.005,
        }
    }
}

impl SourceConfig {
    fn validate(&self) -> Result<()> {
        self.point_source().map(|_| ())
    }

    pub fn spec(&self) -> Result<SourceSpec> {
        if !self.position.is_finite() {
            return Err(Error::NonFinite {
                name:  "source position",
                value: self.position.norm(),
            });
        }
        SourceSpec::new(self.position, self.pdg, self.kinetic_energy)
    }

    pub fn point_source(&self) -> Result<PointSource> {
        PointSource::new(self.spec()?, Vector::splat(self.position_jitter))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub seed:            u64,
    pub events:          u64,
    pub workers:         usize,
    pub histogram_bins:  usize,
    /// Histograms span `[-histogram_range, histogram_range)`.
    pub histogram_range: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed:            123456,
            events:          10_000,
            workers:         1,
            histogram_bins:  100,
            histogram_range: 0.01,
        }
    }
}

impl RunConfig {
    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::NonPositive {
                name:  "worker count",
                value: 0.0,
            });
        }
        if self.histogram_bins == 0 {
            return Err(Error::NonPositive {
                name:  "histogram bin count",
                value: 0.0,
            });
        }
        ensure_positive("histogram range", self.histogram_range)?;
        Ok(())
    }
}

fn positive_vector(name: &'static str, v: Vector<f64>) -> Result<()> {
    ensure_positive(name, v.x)?;
    ensure_positive(name, v.y)?;
    ensure_positive(name, v.z)?;
    Ok(())
}

fn non_negative(name: &'static str, value: f64) -> Result<f64> {
    if ensure_finite(name, value)? < 0.0 {
        Err(Error::NonPositive { name, value })
    } else {
        Ok(value)
    }
}

fn count(name: &'static str, n: u32) -> Result<u32> {
    if n == 0 {
        Err(Error::NonPositive { name, value: 0.0 })
    } else {
        Ok(n)
    }
}
