//! Angular emotion vectors and their weighted sums.
//!
//! Emotions live on a circular "wheel": every core emotion owns a fixed angle,
//! 45 degrees apart from its neighbours. An [`EmotionVector`] is a Gaussian bump
//! centered on an angle, and [`EmotionData`] is an authored mixture of bumps.

use std::f64::consts::PI;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spectrum::EmotionSpectrum;

/// Width of the Gaussian bump of a single vector.
pub const EMOTION_SIGMA: f64 = PI / 20.0;

/// The eight named points of the emotion wheel, in wheel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum CoreEmotion {
    #[default]
    Joy,
    Trust,
    Fear,
    Surprise,
    Sadness,
    Disgust,
    Anger,
    Anticipation,
}

impl CoreEmotion {
    /// All core emotions, in wheel order.
    pub const ALL: [CoreEmotion; 8] = [
        CoreEmotion::Joy,
        CoreEmotion::Trust,
        CoreEmotion::Fear,
        CoreEmotion::Surprise,
        CoreEmotion::Sadness,
        CoreEmotion::Disgust,
        CoreEmotion::Anger,
        CoreEmotion::Anticipation,
    ];

    /// Position on the wheel.
    pub fn index(self) -> usize {
        match self {
            CoreEmotion::Joy => 0,
            CoreEmotion::Trust => 1,
            CoreEmotion::Fear => 2,
            CoreEmotion::Surprise => 3,
            CoreEmotion::Sadness => 4,
            CoreEmotion::Disgust => 5,
            CoreEmotion::Anger => 6,
            CoreEmotion::Anticipation => 7,
        }
    }

    /// Angle of this emotion on the wheel, in radians.
    pub fn angle(self) -> f64 {
        self.index() as f64 * PI / 4.0
    }

    /// Unit-intensity vector pointing at this emotion.
    pub fn vector(self) -> EmotionVector {
        EmotionVector::new(self.angle(), 1.0)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoreEmotion::Joy => "joy",
            CoreEmotion::Trust => "trust",
            CoreEmotion::Fear => "fear",
            CoreEmotion::Surprise => "surprise",
            CoreEmotion::Sadness => "sadness",
            CoreEmotion::Disgust => "disgust",
            CoreEmotion::Anger => "anger",
            CoreEmotion::Anticipation => "anticipation",
        }
    }
}

impl fmt::Display for CoreEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A Gaussian bump on the emotion wheel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmotionVector {
    /// Center of the bump, radians in `[0, 2π)`.
    pub angle: f64,
    /// Height multiplier, never negative.
    pub intensity: f64,
}

impl EmotionVector {
    /// Create a vector; the angle is wrapped into `[0, 2π)`.
    pub fn new(angle: f64, intensity: f64) -> Self {
        Self {
            angle: angle.rem_euclid(2.0 * PI),
            intensity,
        }
    }

    /// Evaluate the bump at angle `t`.
    ///
    /// The Gaussian is summed at `t`, `t - 2π` and `t + 2π` so the function is
    /// continuous across the 0/2π seam.
    pub fn evaluate(&self, t: f64) -> f64 {
        self.gaussian(t) + self.gaussian(t - 2.0 * PI) + self.gaussian(t + 2.0 * PI)
    }

    fn gaussian(&self, t: f64) -> f64 {
        let sigma = EMOTION_SIGMA;
        let d = t - self.angle;
        self.intensity * (-(d * d) / (2.0 * sigma * sigma)).exp() / (sigma * (2.0 * PI).sqrt())
    }
}

fn default_intensity_multiplier() -> f64 {
    1.0
}

/// Authored emotional mixture: a weighted sum of vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmotionData {
    #[serde(default)]
    pub vectors: Vec<EmotionVector>,
    #[serde(default = "default_intensity_multiplier")]
    pub intensity_multiplier: f64,
}

impl Default for EmotionData {
    fn default() -> Self {
        Self {
            vectors: Vec::new(),
            intensity_multiplier: 1.0,
        }
    }
}

impl EmotionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: start from a list of vectors.
    pub fn from_vectors(vectors: Vec<EmotionVector>) -> Self {
        Self {
            vectors,
            ..Default::default()
        }
    }

    /// Builder: set the intensity multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.intensity_multiplier = multiplier;
        self
    }

    pub fn add_vector(&mut self, vector: EmotionVector) {
        self.vectors.push(vector);
    }

    /// Remove the first vector equal to `vector`. Returns whether one was removed.
    pub fn remove_vector(&mut self, vector: &EmotionVector) -> bool {
        match self.vectors.iter().position(|v| v == vector) {
            Some(index) => {
                self.vectors.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.vectors.clear();
    }

    /// Sum of all vector intensities.
    pub fn total_intensity(&self) -> f64 {
        self.vectors.iter().map(|v| v.intensity).sum()
    }

    /// Evaluate the mixture at angle `t`.
    ///
    /// With `normalize`, the sum is divided by the total intensity (treated as 1
    /// when zero); otherwise it is scaled by `intensity_multiplier`.
    pub fn evaluate(&self, t: f64, normalize: bool) -> f64 {
        let sum: f64 = self.vectors.iter().map(|v| v.evaluate(t)).sum();

        if normalize {
            let normalization = self.total_intensity();
            if normalization == 0.0 {
                sum
            } else {
                sum / normalization
            }
        } else {
            sum * self.intensity_multiplier
        }
    }

    /// Sample the mixture into a spectrum.
    pub fn spectrum(&self, normalize: bool) -> EmotionSpectrum {
        EmotionSpectrum::from_data(self, normalize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraparound_continuity() {
        let v = EmotionVector::new(0.0, 1.0);
        for eps in [1e-4, 1e-3, 1e-2] {
            let before_seam = v.evaluate(2.0 * PI - eps);
            let after_seam = v.evaluate(eps);
            assert!((before_seam - after_seam).abs() < 1e-9);
        }
    }

    #[test]
    fn test_vector_peaks_at_its_angle() {
        let v = CoreEmotion::Fear.vector();
        let peak = v.evaluate(v.angle);
        assert!(peak > v.evaluate(v.angle + 0.1));
        assert!(peak > v.evaluate(v.angle - 0.1));
    }

    #[test]
    fn test_core_emotion_angles_are_45_degrees_apart() {
        for pair in CoreEmotion::ALL.windows(2) {
            let diff = pair[1].angle() - pair[0].angle();
            assert!((diff - PI / 4.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_normalized_evaluation() {
        let data = EmotionData::from_vectors(vec![EmotionVector::new(1.0, 2.0)]).with_multiplier(3.0);
        let raw = EmotionVector::new(1.0, 2.0).evaluate(1.0);
        assert!((data.evaluate(1.0, true) - raw / 2.0).abs() < 1e-9);
        assert!((data.evaluate(1.0, false) - raw * 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_data_normalizes_to_zero() {
        let data = EmotionData::new();
        assert_eq!(data.evaluate(0.5, true), 0.0);
    }

    #[test]
    fn test_remove_vector() {
        let mut data = EmotionData::new();
        let v = EmotionVector::new(0.5, 1.0);
        data.add_vector(v);
        assert!(data.remove_vector(&v));
        assert!(!data.remove_vector(&v));
        assert!(data.vectors.is_empty());
    }
}
