//! Stochastic quantization of model weights.
//!
//! SecAgg+ masks integer vectors, so float weights are clipped to a symmetric
//! range, shifted into the non-negative reals and scaled into
//! `[0, target_range)` before masking. Rounding is stochastic: a scaled value
//! rounds up with probability equal to its fractional part, so the
//! expectation of the quantized value matches the unrounded scaled value and
//! no systematic bias accumulates in the server-side sum. Dequantization is
//! the exact linear inverse of the scale and shift; the round trip is lossy
//! due to clipping and rounding, never bit-exact.

use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
/// The quantization parameters of an aggregation round.
pub struct Quantizer {
    clipping_range: f64,
    target_range: u64,
}

impl Quantizer {
    /// Creates a quantizer mapping `[-clipping_range, clipping_range]` onto
    /// `[0, target_range)`.
    ///
    /// Returns `None` if the clipping range is not a positive finite number
    /// or the target range is zero.
    pub fn new(clipping_range: f64, target_range: u64) -> Option<Self> {
        if clipping_range.is_finite() && clipping_range > 0.0 && target_range > 0 {
            Some(Self {
                clipping_range,
                target_range,
            })
        } else {
            None
        }
    }

    /// Gets the clipping range.
    pub fn clipping_range(&self) -> f64 {
        self.clipping_range
    }

    /// Gets the target range.
    pub fn target_range(&self) -> u64 {
        self.target_range
    }

    /// Quantizes each value into `[0, target_range)`.
    ///
    /// Values are clipped to `[-clipping_range, clipping_range]` first; the
    /// stochastic rounding draws come from the given CSPRNG.
    pub fn quantize<R: Rng + CryptoRng>(&self, values: &[f64], rng: &mut R) -> Vec<u64> {
        let scale = self.target_range as f64 / (2.0 * self.clipping_range);
        values
            .iter()
            .map(|&value| {
                let clipped = value.max(-self.clipping_range).min(self.clipping_range);
                let scaled = (clipped + self.clipping_range) * scale;
                let floor = scaled.floor();
                let fraction = scaled - floor;
                let round_up = rng.gen::<f64>() < fraction;
                // +clipping_range scales to exactly target_range; clamp it
                // onto the largest representable step
                (floor as u64 + u64::from(round_up)).min(self.target_range - 1)
            })
            .collect()
    }

    /// Maps quantized values back onto `[-clipping_range, clipping_range]`.
    pub fn dequantize(&self, values: &[u64]) -> Vec<f64> {
        let step = (2.0 * self.clipping_range) / self.target_range as f64;
        values
            .iter()
            .map(|&value| value as f64 * step - self.clipping_range)
            .collect()
    }
}
