//! Amplitude-shift keying (on-off keying) modem
//!
//! Each bit occupies one burst of a sine carrier: bit `One` is sent at full amplitude and bit
//! `Zero` is not sent at all. The receiver correlates each burst against the carrier and compares
//! the rectified correlation with a fixed fraction of the burst length.

use std::f64::consts::PI;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Bit, Error};

/// Fraction of the samples per bit that the rectified correlation must exceed for bit `One`
const DETECTION_FRACTION: f64 = 0.25;

/// Parameters of the ASK modem
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct AskConfig {
    /// Carrier frequency (Hz)
    pub carrier_freq: f64,
    /// Sample rate (Hz)
    pub sample_rate: f64,
    /// Duration of one bit (s)
    pub bit_duration: f64,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            carrier_freq: 1000.0,
            sample_rate: 44100.0,
            bit_duration: 0.1,
        }
    }
}

/// ASK modem with a precomputed carrier burst
#[derive(Clone, PartialEq, Debug)]
pub struct AskModem {
    /// Modem parameters
    config: AskConfig,
    /// One bit's worth of carrier samples
    carrier: Vec<f64>,
}

impl AskModem {
    /// Returns modem for given parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the carrier frequency or bit duration is not positive, if the sample
    /// rate does not exceed twice the carrier frequency, or if a bit would span no samples.
    ///
    /// # Examples
    ///
    /// ```
    /// use turbolink::{AskConfig, AskModem};
    ///
    /// let modem = AskModem::new(AskConfig::default())?;
    /// assert_eq!(modem.samples_per_bit(), 4410);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(config: AskConfig) -> Result<Self, Error> {
        if config.carrier_freq <= 0.0 {
            return Err(Error::InvalidInput(
                "Carrier frequency must be positive".to_string(),
            ));
        }
        if config.sample_rate <= 2.0 * config.carrier_freq {
            return Err(Error::InvalidInput(format!(
                "Sample rate ({} Hz) must exceed twice the carrier frequency ({} Hz)",
                config.sample_rate, config.carrier_freq
            )));
        }
        if config.bit_duration <= 0.0 {
            return Err(Error::InvalidInput(
                "Bit duration must be positive".to_string(),
            ));
        }
        let samples_per_bit = samples_per_bit(&config);
        if samples_per_bit == 0 {
            return Err(Error::InvalidInput(
                "Bit duration is shorter than one sample".to_string(),
            ));
        }
        let carrier = (0 .. samples_per_bit)
            .map(|i| {
                let t = config.bit_duration * i as f64 / samples_per_bit as f64;
                (2.0 * PI * config.carrier_freq * t).sin()
            })
            .collect();
        Ok(Self { config, carrier })
    }

    /// Returns modem parameters.
    #[must_use]
    pub fn config(&self) -> &AskConfig {
        &self.config
    }

    /// Returns number of samples per bit.
    #[must_use]
    pub fn samples_per_bit(&self) -> usize {
        self.carrier.len()
    }

    /// Returns modulated signals for given rows of bits, one carrier burst per bit.
    ///
    /// # Examples
    ///
    /// ```
    /// use turbolink::{AskConfig, AskModem, Bit};
    /// use Bit::{One, Zero};
    ///
    /// let modem = AskModem::new(AskConfig { carrier_freq: 1000.0, sample_rate: 8000.0, bit_duration: 0.001 })?;
    /// let rows = vec![vec![One, Zero, One]];
    /// let signals = modem.modulate(&rows);
    /// assert_eq!(signals[0].len(), 24);
    /// assert_eq!(modem.demodulate(&signals)?, rows);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[must_use]
    pub fn modulate(&self, rows: &[Vec<Bit>]) -> Vec<Vec<f64>> {
        rows.par_iter().map(|row| self.modulate_row(row)).collect()
    }

    /// Returns modulated signal for a single row of bits.
    #[must_use]
    pub fn modulate_row(&self, row: &[Bit]) -> Vec<f64> {
        let mut signal = Vec::with_capacity(row.len() * self.carrier.len());
        for &bit in row {
            let amplitude = amplitude(bit);
            signal.extend(self.carrier.iter().map(|c| amplitude * c));
        }
        signal
    }

    /// Returns bit decisions for given modulated signals.
    ///
    /// # Errors
    ///
    /// Returns an error if the length of any signal is not a multiple of the samples per bit.
    pub fn demodulate(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<Bit>>, Error> {
        rows.par_iter()
            .map(|row| self.demodulate_row(row))
            .collect()
    }

    /// Returns bit decisions for a single modulated signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the length of the signal is not a multiple of the samples per bit.
    pub fn demodulate_row(&self, row: &[f64]) -> Result<Vec<Bit>, Error> {
        let samples_per_bit = self.carrier.len();
        if row.len() % samples_per_bit != 0 {
            return Err(Error::SegmentAlignment {
                len: row.len(),
                segment: samples_per_bit,
            });
        }
        let threshold = DETECTION_FRACTION * samples_per_bit as f64;
        Ok(row
            .chunks_exact(samples_per_bit)
            .map(|segment| Bit::from(self.correlation(segment) > threshold))
            .collect())
    }

    /// Returns rectified correlation of a segment with the carrier burst.
    fn correlation(&self, segment: &[f64]) -> f64 {
        segment
            .iter()
            .zip(&self.carrier)
            .map(|(x, c)| (x * c).abs())
            .sum()
    }
}

/// Returns number of samples per bit for given parameters.
fn samples_per_bit(config: &AskConfig) -> usize {
    // OK to cast: value is checked to be finite and non-negative
    let samples = (config.sample_rate * config.bit_duration).round();
    if samples.is_finite() && samples >= 0.0 {
        samples as usize
    } else {
        0
    }
}

/// Returns carrier amplitude for given bit.
fn amplitude(bit: Bit) -> f64 {
    match bit {
        Bit::Zero => 0.0,
        Bit::One => 1.0,
    }
}
