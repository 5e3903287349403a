use thiserror::Error;

use crate::geometry::{Axis, PlacementId};

/// Errors raised by layout construction, sampling and input readers.
///
/// Geometric and sampling errors are caller errors: the offending call is
/// aborted instead of falling back to a default.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("invalid grid: {0}")]
    InvalidGrid(&'static str),

    #[error("flip axis {flip_about:?} is parallel to mirror axis {axis:?}")]
    ParallelFlipAxis { axis: Axis, flip_about: Axis },

    #[error("mirrored copy of {id} shifted by {offset} leaves the copy index range")]
    CopyIndexOverflow { id: PlacementId, offset: i64 },

    #[error("{0} vector has zero length")]
    ZeroLength(&'static str),

    #[error("unknown particle species with PDG code {0}")]
    UnknownSpecies(i32),

    #[error("copy index is not unique: {0}")]
    DuplicateCopyIndex(PlacementId),

    #[error("histograms {0} and {1} have different binning")]
    HistogramMismatch(String, String),

    #[error("event has {0} final-state particles, at most {max} are supported", max = crate::records::MAX_FINAL_STATE)]
    TooManyParticles(usize),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("malformed event record at line {line}: {source}")]
    Record { line: usize, source: serde_json::Error },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<f64> {
    let value = ensure_finite(name, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(Error::NonPositive { name, value })
    }
}

pub(crate) fn ensure_non_negative(name: &'static str, value: f64) -> Result<f64> {
    let value = ensure_finite(name, value)?;
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::NonPositive { name, value })
    }
}

pub(crate) fn ensure_finite(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::NonFinite { name, value })
    }
}
