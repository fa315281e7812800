//! Quadrature phase-shift keying (QPSK) modem with root-raised-cosine pulse shaping
//!
//! Bits are taken in pairs and mapped to one of four Gray-coded constellation points. The
//! symbols are upsampled (one impulse at the centre of each symbol slot), shaped by an RRC filter
//! and mixed onto a carrier. The receiver mixes down, applies the matched RRC filter, samples at
//! the symbol centres and decides on the nearest constellation point.
//!
//! Time is measured in symbol periods, so `carrier_freq` is in cycles per symbol.
//!
//! # Examples
//!
//! ```
//! use turbolink::{FrameFormat, QpskConfig, QpskFrame, QpskModem};
//!
//! let modem = QpskModem::new(QpskConfig { frame_len: 8, ..QpskConfig::default() })?;
//! let frames = [QpskFrame::Text("01101100".to_string())];
//! let signals = modem.modulate(&frames)?;
//! assert_eq!(signals[0].len(), 4 * 8);
//! assert_eq!(modem.demodulate(&signals, FrameFormat::Text)?, frames);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use itertools::Itertools;
use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{bitframe, rrc, Bit, Error};

/// Constellation points indexed by the integer value of the 2-bit group (first bit is the MSB)
const CONSTELLATION: [Complex64; 4] = [
    Complex64::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    Complex64::new(-FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    Complex64::new(FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
    Complex64::new(-FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
];

/// Parameters of the QPSK modem
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct QpskConfig {
    /// Samples per symbol
    pub samples_per_symbol: usize,
    /// Carrier frequency (cycles per symbol period)
    pub carrier_freq: f64,
    /// Receiver signal-to-noise ratio (dB); no noise is added if `None`
    pub snr_db: Option<f64>,
    /// Number of bits per frame (must be even)
    pub frame_len: usize,
    /// RRC roll-off factor
    pub rolloff: f64,
    /// RRC filter span (symbol periods)
    pub span: usize,
}

impl Default for QpskConfig {
    fn default() -> Self {
        Self {
            samples_per_symbol: 8,
            carrier_freq: 2.0,
            snr_db: None,
            frame_len: 3120,
            rolloff: 0.35,
            span: 6,
        }
    }
}

/// Container shape of the bits of a frame
#[derive(Clone, Eq, Hash, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub enum FrameFormat {
    /// String of `'0'` and `'1'` characters
    Text,
    /// Sequence of [`Bit`] values
    Bits,
    /// Flat sequence of integers, each `0` or `1`
    Raw,
}

/// Frame of bits in one of the supported container shapes
#[derive(Clone, Eq, Hash, PartialEq, Debug)]
pub enum QpskFrame {
    /// String of `'0'` and `'1'` characters
    Text(String),
    /// Sequence of [`Bit`] values
    Bits(Vec<Bit>),
    /// Flat sequence of integers, each `0` or `1`
    Raw(Vec<u8>),
}

impl QpskFrame {
    /// Returns the container shape of the frame.
    #[must_use]
    pub fn format(&self) -> FrameFormat {
        match self {
            QpskFrame::Text(_) => FrameFormat::Text,
            QpskFrame::Bits(_) => FrameFormat::Bits,
            QpskFrame::Raw(_) => FrameFormat::Raw,
        }
    }

    /// Returns number of bits in the frame (characters or elements, valid or not).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            QpskFrame::Text(text) => text.chars().count(),
            QpskFrame::Bits(bits) => bits.len(),
            QpskFrame::Raw(raw) => raw.len(),
        }
    }

    /// Returns `true` if the frame holds no bits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the bits of the frame.
    ///
    /// # Errors
    ///
    /// Returns an error if any character or element is not a bit.
    pub fn to_bits(&self) -> Result<Vec<Bit>, Error> {
        match self {
            QpskFrame::Text(text) => bitframe::bits_from_text(text),
            QpskFrame::Bits(bits) => Ok(bits.clone()),
            QpskFrame::Raw(raw) => bitframe::bits_from_raw(raw),
        }
    }

    /// Returns frame holding given bits in given container shape.
    #[must_use]
    pub fn from_bits(bits: &[Bit], format: FrameFormat) -> Self {
        match format {
            FrameFormat::Text => QpskFrame::Text(bitframe::bits_to_text(bits)),
            FrameFormat::Bits => QpskFrame::Bits(bits.to_vec()),
            FrameFormat::Raw => QpskFrame::Raw(bitframe::bits_to_raw(bits)),
        }
    }
}

/// QPSK modem with precomputed RRC filter taps
#[derive(Clone, PartialEq, Debug)]
pub struct QpskModem {
    /// Modem parameters
    config: QpskConfig,
    /// RRC filter taps (unit energy)
    taps: Vec<f64>,
}

impl QpskModem {
    /// Returns modem for given parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame length is zero or odd, if there are fewer than three samples
    /// per symbol, if the RRC parameters are invalid, or if the carrier frequency is too low or
    /// too high for the shaped signal to fit between zero and the Nyquist frequency.
    pub fn new(config: QpskConfig) -> Result<Self, Error> {
        if config.frame_len == 0 || config.frame_len % 2 != 0 {
            return Err(Error::InvalidInput(format!(
                "QPSK frame length must be a positive even integer (found {})",
                config.frame_len
            )));
        }
        // With two samples per symbol no carrier fits between DC and Nyquist
        if config.samples_per_symbol < 3 {
            return Err(Error::InvalidInput(format!(
                "QPSK needs at least three samples per symbol (found {})",
                config.samples_per_symbol
            )));
        }
        let taps = rrc::rrc_taps(config.rolloff, config.span, config.samples_per_symbol)?;
        let half_bandwidth = (1.0 + config.rolloff) / 2.0;
        let nyquist = config.samples_per_symbol as f64 / 2.0;
        if config.carrier_freq <= half_bandwidth || config.carrier_freq >= nyquist - half_bandwidth
        {
            return Err(Error::InvalidInput(format!(
                "Carrier frequency must be in the range ({half_bandwidth}, {}) cycles per symbol \
                (found {})",
                nyquist - half_bandwidth,
                config.carrier_freq
            )));
        }
        Ok(Self { config, taps })
    }

    /// Returns modem parameters.
    #[must_use]
    pub fn config(&self) -> &QpskConfig {
        &self.config
    }

    /// Returns number of signal samples per frame.
    #[must_use]
    pub fn signal_len(&self) -> usize {
        self.config.frame_len / 2 * self.config.samples_per_symbol
    }

    /// Returns modulated signals for given frames.
    ///
    /// # Errors
    ///
    /// Returns an error if any frame does not have the configured length, or holds a character
    /// or element that is not a bit.
    pub fn modulate(&self, frames: &[QpskFrame]) -> Result<Vec<Vec<f64>>, Error> {
        frames
            .par_iter()
            .map(|frame| {
                self.check_frame_len(frame.len())?;
                self.modulate_bits(&frame.to_bits()?)
            })
            .collect()
    }

    /// Returns modulated signal for a single frame of bits.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame does not have the configured length.
    pub fn modulate_bits(&self, bits: &[Bit]) -> Result<Vec<f64>, Error> {
        self.check_frame_len(bits.len())?;
        let sps = self.config.samples_per_symbol;
        let mut upsampled = vec![Complex64::new(0.0, 0.0); self.signal_len()];
        for (k, (&msb, &lsb)) in bits.iter().tuples().enumerate() {
            upsampled[k * sps + sps / 2] = CONSTELLATION[symbol_index(msb, lsb)];
        }
        let shaped = rrc::convolve_same(&upsampled, &self.taps);
        Ok(shaped
            .iter()
            .enumerate()
            .map(|(n, &x)| (x * self.carrier(n)).re)
            .collect())
    }

    /// Returns frames recovered from given signals, in the requested container shape.
    ///
    /// Receiver noise is drawn from the thread-local generator when an SNR is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the length of any signal is not a whole number of symbols, or does
    /// not correspond to the configured frame length.
    pub fn demodulate(
        &self,
        signals: &[Vec<f64>],
        format: FrameFormat,
    ) -> Result<Vec<QpskFrame>, Error> {
        self.demodulate_with_rng(signals, format, &mut rand::rng())
    }

    /// Returns frames recovered from given signals, using `rng` for receiver noise.
    ///
    /// # Errors
    ///
    /// Returns an error if the length of any signal is not a whole number of symbols, or does
    /// not correspond to the configured frame length.
    pub fn demodulate_with_rng<R: Rng>(
        &self,
        signals: &[Vec<f64>],
        format: FrameFormat,
        rng: &mut R,
    ) -> Result<Vec<QpskFrame>, Error> {
        let all_symbols: Vec<Vec<Complex64>> = signals
            .par_iter()
            .map(|signal| self.matched_filter_samples(signal))
            .collect::<Result<_, _>>()?;
        Ok(all_symbols
            .into_iter()
            .map(|mut symbols| {
                if let Some(snr_db) = self.config.snr_db {
                    add_noise(&mut symbols, snr_db, rng);
                }
                QpskFrame::from_bits(&decide_bits(&symbols), format)
            })
            .collect())
    }

    /// Returns bits recovered from a single signal.
    ///
    /// Receiver noise is drawn from the thread-local generator when an SNR is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the length of the signal is not a whole number of symbols, or does
    /// not correspond to the configured frame length.
    pub fn demodulate_signal(&self, signal: &[f64]) -> Result<Vec<Bit>, Error> {
        let mut symbols = self.matched_filter_samples(signal)?;
        if let Some(snr_db) = self.config.snr_db {
            add_noise(&mut symbols, snr_db, &mut rand::rng());
        }
        Ok(decide_bits(&symbols))
    }

    /// Returns matched-filter outputs at the symbol centres of a signal.
    fn matched_filter_samples(&self, signal: &[f64]) -> Result<Vec<Complex64>, Error> {
        let sps = self.config.samples_per_symbol;
        if signal.len() % sps != 0 {
            return Err(Error::SegmentAlignment {
                len: signal.len(),
                segment: sps,
            });
        }
        self.check_frame_len(2 * (signal.len() / sps))?;
        let baseband: Vec<Complex64> = signal
            .iter()
            .enumerate()
            .map(|(n, &x)| self.carrier(n).conj() * x)
            .collect();
        let filtered = rrc::convolve_same(&baseband, &self.taps);
        // Mixing down halves the amplitude
        Ok(filtered
            .iter()
            .skip(sps / 2)
            .step_by(sps)
            .map(|&y| 2.0 * y)
            .collect())
    }

    /// Returns carrier phasor at sample `n`.
    fn carrier(&self, n: usize) -> Complex64 {
        let t = n as f64 / self.config.samples_per_symbol as f64;
        Complex64::cis(2.0 * PI * self.config.carrier_freq * t)
    }

    /// Checks that a frame has the configured number of bits.
    fn check_frame_len(&self, len: usize) -> Result<(), Error> {
        if len == self.config.frame_len {
            Ok(())
        } else {
            Err(Error::FrameLengthMismatch {
                expected: self.config.frame_len,
                found: len,
            })
        }
    }
}

/// Returns constellation index of a 2-bit group.
fn symbol_index(msb: Bit, lsb: Bit) -> usize {
    2 * usize::from(msb.as_u8()) + usize::from(lsb.as_u8())
}

/// Returns bits for the constellation points nearest to given symbols.
fn decide_bits(symbols: &[Complex64]) -> Vec<Bit> {
    let mut bits = Vec::with_capacity(2 * symbols.len());
    for &y in symbols {
        let index = (0 .. CONSTELLATION.len())
            .min_by(|&a, &b| {
                (y - CONSTELLATION[a])
                    .norm_sqr()
                    .total_cmp(&(y - CONSTELLATION[b]).norm_sqr())
            })
            .unwrap_or(0);
        bits.push(Bit::from(index & 0b10 != 0));
        bits.push(Bit::from(index & 0b01 != 0));
    }
    bits
}

/// Adds complex Gaussian noise at given SNR (relative to the mean symbol power).
fn add_noise<R: Rng>(symbols: &mut [Complex64], snr_db: f64, rng: &mut R) {
    if symbols.is_empty() {
        return;
    }
    let signal_power =
        symbols.iter().map(Complex64::norm_sqr).sum::<f64>() / symbols.len() as f64;
    let noise_std = (0.5 * signal_power / 10f64.powf(0.1 * snr_db)).sqrt();
    for y in symbols.iter_mut() {
        *y += Complex64::new(
            noise_std * rng.sample::<f64, _>(StandardNormal),
            noise_std * rng.sample::<f64, _>(StandardNormal),
        );
    }
}

#[cfg(test)]
mod tests_of_qpsk_frame {
    use super::*;
    use Bit::{One, Zero};

    #[test]
    fn test_format() {
        assert_eq!(QpskFrame::Text(String::new()).format(), FrameFormat::Text);
        assert_eq!(QpskFrame::Bits(vec![]).format(), FrameFormat::Bits);
        assert_eq!(QpskFrame::Raw(vec![]).format(), FrameFormat::Raw);
    }

    #[test]
    fn test_to_bits() {
        let expected = [Zero, One, One, Zero];
        assert_eq!(QpskFrame::Text("0110".into()).to_bits().unwrap(), expected);
        assert_eq!(QpskFrame::Raw(vec![0, 1, 1, 0]).to_bits().unwrap(), expected);
        assert_eq!(
            QpskFrame::Bits(expected.to_vec()).to_bits().unwrap(),
            expected
        );
        assert!(QpskFrame::Text("0120".into()).to_bits().is_err());
        assert!(QpskFrame::Raw(vec![0, 3]).to_bits().is_err());
    }

    #[test]
    fn test_from_bits() {
        let bits = [One, Zero, One];
        assert_eq!(
            QpskFrame::from_bits(&bits, FrameFormat::Text),
            QpskFrame::Text("101".into())
        );
        assert_eq!(
            QpskFrame::from_bits(&bits, FrameFormat::Raw),
            QpskFrame::Raw(vec![1, 0, 1])
        );
        assert_eq!(
            QpskFrame::from_bits(&bits, FrameFormat::Bits),
            QpskFrame::Bits(bits.to_vec())
        );
    }
}

#[cfg(test)]
mod tests_of_qpsk_modem {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::utils;
    use Bit::{One, Zero};

    fn config_for_test() -> QpskConfig {
        QpskConfig {
            frame_len: 64,
            ..QpskConfig::default()
        }
    }

    #[test]
    fn test_new() {
        let bad = |f: fn(&mut QpskConfig)| {
            let mut config = config_for_test();
            f(&mut config);
            QpskModem::new(config).is_err()
        };
        assert!(bad(|c| c.frame_len = 0));
        assert!(bad(|c| c.frame_len = 63));
        assert!(bad(|c| c.samples_per_symbol = 1));
        assert!(matches!(
            QpskModem::new(QpskConfig {
                samples_per_symbol: 2,
                carrier_freq: 0.5,
                ..config_for_test()
            }),
            Err(Error::InvalidInput(message)) if message.contains("three samples per symbol")
        ));
        // Narrowest usable carrier band: (0.675, 0.825) cycles per symbol
        assert!(QpskModem::new(QpskConfig {
            samples_per_symbol: 3,
            carrier_freq: 0.75,
            ..config_for_test()
        })
        .is_ok());
        assert!(bad(|c| c.rolloff = 1.5));
        assert!(bad(|c| c.span = 0));
        assert!(bad(|c| c.carrier_freq = 0.5));
        assert!(bad(|c| c.carrier_freq = 3.5));
        let modem = QpskModem::new(config_for_test()).unwrap();
        assert_eq!(modem.signal_len(), 256);
    }

    #[test]
    fn test_modulate() {
        let modem = QpskModem::new(config_for_test()).unwrap();
        // Invalid input
        assert!(matches!(
            modem.modulate(&[QpskFrame::Bits(vec![One; 62])]),
            Err(Error::FrameLengthMismatch {
                expected: 64,
                found: 62
            })
        ));
        let mut text = "01".repeat(32);
        text.replace_range(10 .. 11, "x");
        assert!(matches!(
            modem.modulate(&[QpskFrame::Text(text)]),
            Err(Error::NonBinaryInput { index: 10, .. })
        ));
        // Valid input
        let signals = modem
            .modulate(&[QpskFrame::Bits(vec![Zero; 64])])
            .unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].len(), 256);
        assert!(signals[0].iter().any(|&x| x.abs() > 0.1));
    }

    #[test]
    fn test_demodulate_invalid() {
        let modem = QpskModem::new(config_for_test()).unwrap();
        assert!(matches!(
            modem.demodulate(&[vec![0.0; 255]], FrameFormat::Bits),
            Err(Error::SegmentAlignment { len: 255, segment: 8 })
        ));
        assert!(matches!(
            modem.demodulate(&[vec![0.0; 248]], FrameFormat::Bits),
            Err(Error::FrameLengthMismatch {
                expected: 64,
                found: 62
            })
        ));
    }

    #[test]
    fn test_round_trip_preserves_format() {
        let modem = QpskModem::new(config_for_test()).unwrap();
        let bits = utils::random_bits(64);
        for format in [FrameFormat::Text, FrameFormat::Bits, FrameFormat::Raw] {
            let frames = vec![QpskFrame::from_bits(&bits, format)];
            let signals = modem.modulate(&frames).unwrap();
            assert_eq!(modem.demodulate(&signals, format).unwrap(), frames);
        }
    }

    #[test]
    fn test_round_trip_all_symbols() {
        let modem = QpskModem::new(config_for_test()).unwrap();
        // Every 2-bit group, in every neighbour context
        let pattern = [Zero, Zero, Zero, One, One, One, One, Zero];
        let bits: Vec<Bit> = pattern.iter().copied().cycle().take(64).collect();
        let signal = modem.modulate_bits(&bits).unwrap();
        let frames = modem.demodulate(&[signal], FrameFormat::Bits).unwrap();
        assert_eq!(frames, [QpskFrame::Bits(bits)]);
    }

    #[test]
    fn test_demodulate_signal() {
        let modem = QpskModem::new(config_for_test()).unwrap();
        let bits = utils::random_bits(64);
        let signal = modem.modulate_bits(&bits).unwrap();
        assert_eq!(modem.demodulate_signal(&signal).unwrap(), bits);
        assert!(matches!(
            modem.demodulate_signal(&signal[.. 224]),
            Err(Error::FrameLengthMismatch {
                expected: 64,
                found: 56
            })
        ));
        assert!(matches!(
            modem.demodulate_signal(&signal[.. 230]),
            Err(Error::SegmentAlignment { len: 230, segment: 8 })
        ));
    }

    #[test]
    fn test_round_trip_with_receiver_noise() {
        let modem = QpskModem::new(QpskConfig {
            snr_db: Some(30.0),
            ..config_for_test()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let frames: Vec<QpskFrame> = (0 .. 4)
            .map(|_| QpskFrame::Bits(utils::random_bits(64)))
            .collect();
        let signals = modem.modulate(&frames).unwrap();
        let frames_hat = modem
            .demodulate_with_rng(&signals, FrameFormat::Bits, &mut rng)
            .unwrap();
        assert_eq!(frames_hat, frames);
    }

    #[test]
    fn test_symbol_index() {
        assert_eq!(symbol_index(Zero, Zero), 0);
        assert_eq!(symbol_index(Zero, One), 1);
        assert_eq!(symbol_index(One, Zero), 2);
        assert_eq!(symbol_index(One, One), 3);
    }

    #[test]
    fn test_decide_bits() {
        let symbols = [
            Complex64::new(0.9, 0.2),
            Complex64::new(-0.3, 0.8),
            Complex64::new(0.5, -0.1),
            Complex64::new(-2.0, -0.4),
        ];
        assert_eq!(
            decide_bits(&symbols),
            [Zero, Zero, Zero, One, One, Zero, One, One]
        );
    }

    #[test]
    fn test_add_noise() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut symbols = vec![CONSTELLATION[0]; 20000];
        add_noise(&mut symbols, 10.0, &mut rng);
        let noise_power = symbols
            .iter()
            .map(|y| (y - CONSTELLATION[0]).norm_sqr())
            .sum::<f64>()
            / 20000.0;
        assert!(noise_power > 0.09 && noise_power < 0.11);
        let mut empty: Vec<Complex64> = Vec::new();
        add_noise(&mut empty, 10.0, &mut rng);
        assert!(empty.is_empty());
    }
}
