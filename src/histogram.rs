use ndarray::Array1;

use crate::error::{ensure_finite, ensure_positive, Error, Result};
use crate::sources::Jitter;

/// Receives the per-event position jitter.
pub trait JitterObserver {
    fn record(&mut self, jitter: &Jitter);
}

impl JitterObserver for () {
    fn record(&mut self, _jitter: &Jitter) {}
}

impl JitterObserver for Vec<Jitter> {
    fn record(&mut self, jitter: &Jitter) {
        self.push(*jitter);
    }
}

/// Fixed-width 1-D histogram over `[min, max)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D {
    pub name:      String,
    pub min:       f64,
    pub max:       f64,
    pub bins:      Array1<u64>,
    pub underflow: u64,
    pub overflow:  u64,
}

impl Histogram1D {
    pub fn new(name: impl Into<String>, nbins: usize, min: f64, max: f64) -> Result<Self> {
        let min = ensure_finite("histogram lower edge", min)?;
        let max = ensure_finite("histogram upper edge", max)?;
        ensure_positive("histogram width", max - min)?;
        if nbins == 0 {
            return Err(Error::NonPositive {
                name:  "histogram bin count",
                value: 0.0,
            });
        }
        Ok(Self {
            name: name.into(),
            min,
            max,
            bins: Array1::zeros(nbins),
            underflow: 0,
            overflow: 0,
        })
    }

    pub fn fill(&mut self, x: f64) {
        if x < self.min || x.is_nan() {
            self.underflow += 1;
        } else if x >= self.max {
            self.overflow += 1;
        } else {
            let n = self.bins.len();
            let i = ((x - self.min) / self.bin_width()) as usize;
            self.bins[i.min(n - 1)] += 1;
        }
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.bins.len() as f64
    }

    pub fn bin_centers(&self) -> Array1<f64> {
        let w = self.bin_width();
        Array1::from_shape_fn(self.bins.len(), |i| self.min + (i as f64 + 0.5) * w)
    }

    /// In-range entries.
    pub fn entries(&self) -> u64 {
        self.bins.sum()
    }

    pub fn merge(&mut self, other: &Histogram1D) -> Result<()> {
        if self.bins.len() != other.bins.len() || self.min != other.min || self.max != other.max {
            return Err(Error::HistogramMismatch(self.name.clone(), other.name.clone()));
        }
        self.bins += &other.bins;
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        Ok(())
    }
}

/// Uniformity check of the sampled position along each axis.
#[derive(Debug, Clone, PartialEq)]
pub struct JitterHistograms {
    pub dx: Histogram1D,
    pub dy: Histogram1D,
    pub dz: Histogram1D,
}

impl JitterHistograms {
    /// Same binning on every axis, spanning `[-range, range)`.
    pub fn new(nbins: usize, range: f64) -> Result<Self> {
        Ok(Self {
            dx: Histogram1D::new("dx", nbins, -range, range)?,
            dy: Histogram1D::new("dy", nbins, -range, range)?,
            dz: Histogram1D::new("dz", nbins, -range, range)?,
        })
    }

    pub fn merge(&mut self, other: &JitterHistograms) -> Result<()> {
        self.dx.merge(&other.dx)?;
        self.dy.merge(&other.dy)?;
        self.dz.merge(&other.dz)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Histogram1D> {
        vec![&self.dx, &self.dy, &self.dz].into_iter()
    }
}

impl JitterObserver for JitterHistograms {
    fn record(&mut self, jitter: &Jitter) {
        self.dx.fill(jitter.dx);
        self.dy.fill(jitter.dy);
        self.dz.fill(jitter.dz);
    }
}
