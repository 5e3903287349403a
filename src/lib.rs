#![allow(clippy::many_single_char_names, clippy::too_many_arguments)]
#[macro_use]
extern crate derive_more;
#[macro_use]
extern crate serde;

mod error;
pub use crate::error::{Error, Result};
mod vector;
pub use crate::vector::{UnitVector, Vector};
pub mod geometry;
pub use crate::geometry::{GroupKey, Placement, PlacementId, Region, Rotation, Shape};
pub mod particle;
pub use crate::particle::Species;
// http://prng.di.unimi.it/
pub mod random;
pub use crate::random::PRng;
pub mod sources;
pub use crate::sources::{generate_sample, EmissionSample, Jitter, PointSource, Source, SourceSpec};
pub mod histogram;
pub use crate::histogram::{Histogram1D, JitterHistograms, JitterObserver};
pub mod records;
pub use crate::records::{EventReader, GeneratorEvent};
pub mod config;
pub use crate::config::Config;
pub mod detector;
pub use crate::detector::DetectorLayout;
