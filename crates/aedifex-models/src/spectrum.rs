//! Discretized emotion spectrum.
//!
//! A spectrum samples an [`EmotionData`] over one full revolution of the
//! emotion wheel. After authoring, emotion is only ever passed around as a
//! spectrum, so this type carries the vector-space operations the pipeline
//! needs (sum, difference, scaling, elementwise product, dot product).

use std::f64::consts::PI;
use std::ops::{Add, AddAssign, Div, Mul, Sub};
use std::sync::OnceLock;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::emotion::{CoreEmotion, EmotionData, EmotionVector};
use crate::error::{ModelError, ModelResult};

/// Number of bins in every spectrum.
pub const SPECTRUM_RESOLUTION: usize = 180;

/// Angular width of one bin, in radians.
pub const BIN_WIDTH: f64 = 2.0 * PI / SPECTRUM_RESOLUTION as f64;

static CORE_SPECTRA: OnceLock<Vec<EmotionSpectrum>> = OnceLock::new();

/// Sampled periodic histogram over the emotion wheel.
///
/// Bin `i` holds the value at angle `i * BIN_WIDTH`. Every spectrum has
/// exactly [`SPECTRUM_RESOLUTION`] bins, deserialized ones included, so the
/// binary operations always pair bins one to one.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct EmotionSpectrum {
    bins: Vec<f64>,
}

impl<'de> Deserialize<'de> for EmotionSpectrum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            bins: Vec<f64>,
        }

        let raw = Raw::deserialize(deserializer)?;
        EmotionSpectrum::from_bins(raw.bins).map_err(serde::de::Error::custom)
    }
}

impl Default for EmotionSpectrum {
    fn default() -> Self {
        Self::zero()
    }
}

impl EmotionSpectrum {
    /// A spectrum with every bin at zero.
    pub fn zero() -> Self {
        Self {
            bins: vec![0.0; SPECTRUM_RESOLUTION],
        }
    }

    /// Wrap raw bin values.
    ///
    /// # Errors
    /// `InvalidSpectrum` unless there are exactly [`SPECTRUM_RESOLUTION`] bins.
    pub fn from_bins(bins: Vec<f64>) -> ModelResult<Self> {
        if bins.len() != SPECTRUM_RESOLUTION {
            return Err(ModelError::InvalidSpectrum {
                expected: SPECTRUM_RESOLUTION,
                actual: bins.len(),
            });
        }
        Ok(Self { bins })
    }

    /// Sample an emotion mixture over the wheel.
    pub fn from_data(data: &EmotionData, normalize: bool) -> Self {
        let bins = (0..SPECTRUM_RESOLUTION)
            .map(|i| data.evaluate(Self::angle_for_bin(i), normalize))
            .collect();
        Self { bins }
    }

    /// Sample a single vector over the wheel.
    pub fn from_vector(vector: EmotionVector) -> Self {
        let bins = (0..SPECTRUM_RESOLUTION)
            .map(|i| vector.evaluate(Self::angle_for_bin(i)))
            .collect();
        Self { bins }
    }

    /// Unit-intensity spectrum of a core emotion.
    pub fn from_core(emotion: CoreEmotion) -> Self {
        Self::from_vector(emotion.vector())
    }

    /// Shared unit spectrum of a core emotion, built once per process.
    pub fn core(emotion: CoreEmotion) -> &'static EmotionSpectrum {
        let spectra = CORE_SPECTRA.get_or_init(|| {
            CoreEmotion::ALL
                .iter()
                .map(|e| EmotionSpectrum::from_core(*e))
                .collect()
        });
        &spectra[emotion.index()]
    }

    pub fn angle_for_bin(index: usize) -> f64 {
        index as f64 * BIN_WIDTH
    }

    /// Nearest bin for an angle, wrapped around the wheel.
    pub fn bin_for_angle(angle: f64) -> usize {
        let index = (angle / BIN_WIDTH).round() as i64;
        index.rem_euclid(SPECTRUM_RESOLUTION as i64) as usize
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Value of the bin nearest to `angle`.
    pub fn get(&self, angle: f64) -> f64 {
        self.bins[Self::bin_for_angle(angle)]
    }

    /// Overwrite the bin nearest to `angle`.
    pub fn set(&mut self, angle: f64, value: f64) {
        let index = Self::bin_for_angle(angle);
        self.bins[index] = value;
    }

    /// Discrete integral over the wheel.
    pub fn total_energy(&self) -> f64 {
        self.bins.iter().sum::<f64>() * BIN_WIDTH
    }

    /// Discrete integral of the product of two spectra.
    pub fn dot(&self, other: &EmotionSpectrum) -> f64 {
        self.bins
            .iter()
            .zip(other.bins.iter())
            .map(|(a, b)| a * b)
            .sum::<f64>()
            * BIN_WIDTH
    }

    /// Core emotion with the largest dot product against this spectrum.
    ///
    /// Ties (including the all-zero spectrum) resolve to the earliest emotion in
    /// wheel order, so an empty spectrum reads as [`CoreEmotion::Joy`].
    pub fn dominant_emotion(&self) -> CoreEmotion {
        let mut best = CoreEmotion::Joy;
        let mut best_score = f64::NEG_INFINITY;

        for emotion in CoreEmotion::ALL {
            let score = self.dot(EmotionSpectrum::core(emotion));
            if score > best_score {
                best_score = score;
                best = emotion;
            }
        }

        best
    }

    /// Elementwise product.
    pub fn multiply(&self, other: &EmotionSpectrum) -> EmotionSpectrum {
        self.zip_with(other, |a, b| a * b)
    }

    /// Elementwise quotient; bins divided by zero become zero.
    pub fn divide(&self, other: &EmotionSpectrum) -> EmotionSpectrum {
        self.zip_with(other, |a, b| if b == 0.0 { 0.0 } else { a / b })
    }

    pub fn scale(&self, factor: f64) -> EmotionSpectrum {
        EmotionSpectrum {
            bins: self.bins.iter().map(|v| v * factor).collect(),
        }
    }

    /// True if every bin is finite.
    pub fn is_finite(&self) -> bool {
        self.bins.iter().all(|v| v.is_finite())
    }

    fn zip_with(&self, other: &EmotionSpectrum, f: impl Fn(f64, f64) -> f64) -> EmotionSpectrum {
        EmotionSpectrum {
            bins: self
                .bins
                .iter()
                .zip(other.bins.iter())
                .map(|(a, b)| f(*a, *b))
                .collect(),
        }
    }
}

impl Add<&EmotionSpectrum> for &EmotionSpectrum {
    type Output = EmotionSpectrum;

    fn add(self, rhs: &EmotionSpectrum) -> EmotionSpectrum {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Add for EmotionSpectrum {
    type Output = EmotionSpectrum;

    fn add(self, rhs: EmotionSpectrum) -> EmotionSpectrum {
        &self + &rhs
    }
}

impl AddAssign<&EmotionSpectrum> for EmotionSpectrum {
    fn add_assign(&mut self, rhs: &EmotionSpectrum) {
        for (a, b) in self.bins.iter_mut().zip(rhs.bins.iter()) {
            *a += b;
        }
    }
}

impl Sub<&EmotionSpectrum> for &EmotionSpectrum {
    type Output = EmotionSpectrum;

    fn sub(self, rhs: &EmotionSpectrum) -> EmotionSpectrum {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl Sub for EmotionSpectrum {
    type Output = EmotionSpectrum;

    fn sub(self, rhs: EmotionSpectrum) -> EmotionSpectrum {
        &self - &rhs
    }
}

impl Mul<f64> for &EmotionSpectrum {
    type Output = EmotionSpectrum;

    fn mul(self, rhs: f64) -> EmotionSpectrum {
        self.scale(rhs)
    }
}

impl Mul<f64> for EmotionSpectrum {
    type Output = EmotionSpectrum;

    fn mul(self, rhs: f64) -> EmotionSpectrum {
        self.scale(rhs)
    }
}

impl Mul<&EmotionSpectrum> for &EmotionSpectrum {
    type Output = EmotionSpectrum;

    fn mul(self, rhs: &EmotionSpectrum) -> EmotionSpectrum {
        self.multiply(rhs)
    }
}

impl Div<f64> for &EmotionSpectrum {
    type Output = EmotionSpectrum;

    fn div(self, rhs: f64) -> EmotionSpectrum {
        self.scale(1.0 / rhs)
    }
}

impl Div<f64> for EmotionSpectrum {
    type Output = EmotionSpectrum;

    fn div(self, rhs: f64) -> EmotionSpectrum {
        self.scale(1.0 / rhs)
    }
}

impl Div<&EmotionSpectrum> for &EmotionSpectrum {
    type Output = EmotionSpectrum;

    fn div(self, rhs: &EmotionSpectrum) -> EmotionSpectrum {
        self.divide(rhs)
    }
}
