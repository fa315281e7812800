//! Send and receive paths of the link
//!
//! The send path turbo-encodes source frames, wraps each encoded frame in a protocol frame and
//! modulates it. The receive path demodulates each signal, validates and strips the protocol
//! frame, and turbo-decodes the payload. Frames rejected on the way in are reported alongside
//! the decoded frames rather than silently dropped.

use rayon::prelude::*;

use crate::protocol::FRAME_OVERHEAD_BITS;
use crate::{
    utils, AskModem, Bit, Error, FrameFormat, ModemConfig, PipelineConfig, ProtocolHandler,
    QpskFrame, QpskModem, TurboCodec,
};

/// Modem used on the link
#[derive(Clone, PartialEq, Debug)]
pub enum Modem {
    /// Amplitude-shift keying
    Ask(AskModem),
    /// Quadrature phase-shift keying
    Qpsk(QpskModem),
}

impl Modem {
    /// Returns modem for given parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid.
    pub fn from_config(config: &ModemConfig) -> Result<Self, Error> {
        Ok(match config {
            ModemConfig::Ask(ask) => Modem::Ask(AskModem::new(*ask)?),
            ModemConfig::Qpsk(qpsk) => Modem::Qpsk(QpskModem::new(*qpsk)?),
        })
    }

    /// Returns modulated signals for given frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the modem cannot accept a frame (e.g., wrong QPSK frame length).
    pub fn modulate(&self, frames: &[Vec<Bit>]) -> Result<Vec<Vec<f64>>, Error> {
        match self {
            Modem::Ask(modem) => Ok(modem.modulate(frames)),
            Modem::Qpsk(modem) => frames
                .par_iter()
                .map(|frame| modem.modulate_bits(frame))
                .collect(),
        }
    }

    /// Returns frames recovered from given signals.
    ///
    /// # Errors
    ///
    /// Returns an error if the length of any signal is invalid for the modem.
    pub fn demodulate(&self, signals: &[Vec<f64>]) -> Result<Vec<Vec<Bit>>, Error> {
        match self {
            Modem::Ask(modem) => modem.demodulate(signals),
            Modem::Qpsk(modem) => modem
                .demodulate(signals, FrameFormat::Bits)?
                .iter()
                .map(QpskFrame::to_bits)
                .collect(),
        }
    }

    /// Returns bits recovered from a single signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the length of the signal is invalid for the modem.
    pub fn demodulate_signal(&self, signal: &[f64]) -> Result<Vec<Bit>, Error> {
        match self {
            Modem::Ask(modem) => modem.demodulate_row(signal),
            Modem::Qpsk(modem) => modem.demodulate_signal(signal),
        }
    }
}

/// Outcome of the receive path
#[derive(Debug, Default)]
pub struct ReceiveReport {
    /// Decoded source frames, in signal order
    pub frames: Vec<Vec<Bit>>,
    /// Index of the signal from which each decoded frame came
    pub indices: Vec<usize>,
    /// Index of each signal that yielded no frame, with the reason
    pub diagnostics: Vec<(usize, Error)>,
}

/// Turbo codec, framing protocol and modem combined into one link
#[derive(Clone, PartialEq, Debug)]
pub struct Pipeline {
    /// Turbo encoder/decoder
    codec: TurboCodec,
    /// Framing protocol
    protocol: ProtocolHandler,
    /// Modem
    modem: Modem,
    /// Number of turbo decoding iterations
    iterations: u32,
    /// Es/N0 (dB) of the BPSK-AWGN channel seen by the decoder, or `None` for a noiseless channel
    channel_es_over_n0_db: Option<f64>,
}

impl Pipeline {
    /// Returns pipeline built from given components.
    ///
    /// # Errors
    ///
    /// Returns an error if encoded frames are not a whole number of bytes, or if the QPSK frame
    /// length differs from the length of a protocol frame.
    pub fn new(
        codec: TurboCodec,
        protocol: ProtocolHandler,
        modem: Modem,
        iterations: u32,
    ) -> Result<Self, Error> {
        let encoded_len = codec.encoded_len();
        if encoded_len % 8 != 0 {
            return Err(Error::InvalidInput(format!(
                "Encoded frame length ({encoded_len} bits) must be a multiple of 8"
            )));
        }
        if let Modem::Qpsk(qpsk) = &modem {
            let framed_len = encoded_len + FRAME_OVERHEAD_BITS;
            if qpsk.config().frame_len != framed_len {
                return Err(Error::InvalidInput(format!(
                    "QPSK frame length ({}) must equal protocol frame length ({framed_len})",
                    qpsk.config().frame_len
                )));
            }
        }
        Ok(Self {
            codec,
            protocol,
            modem,
            iterations,
            channel_es_over_n0_db: None,
        })
    }

    /// Returns pipeline for given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any component cannot be built, or if the components do not fit
    /// together (see [`Pipeline::new`]).
    ///
    /// # Examples
    ///
    /// ```
    /// use turbolink::{utils, AskConfig, ModemConfig, Pipeline, PipelineConfig, TurboConfig};
    ///
    /// let config = PipelineConfig {
    ///     turbo: TurboConfig { frame_len: 16, interleaver_size: 16, ..TurboConfig::default() },
    ///     modem: ModemConfig::Ask(AskConfig { carrier_freq: 1000.0, sample_rate: 8000.0, bit_duration: 0.001 }),
    ///     ..PipelineConfig::default()
    /// };
    /// let pipeline = Pipeline::from_config(&config)?;
    /// let frames = vec![utils::random_bits(16), utils::random_bits(16)];
    /// let signals = pipeline.send(&frames)?;
    /// let report = pipeline.receive(&signals)?;
    /// assert_eq!(report.frames, frames);
    /// assert!(report.diagnostics.is_empty());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_config(config: &PipelineConfig) -> Result<Self, Error> {
        Self::new(
            config.turbo.codec()?,
            ProtocolHandler::new(config.protocol),
            Modem::from_config(&config.modem)?,
            config.turbo.iterations,
        )
    }

    /// Returns the turbo codec.
    #[must_use]
    pub fn codec(&self) -> &TurboCodec {
        &self.codec
    }

    /// Returns the modem.
    #[must_use]
    pub fn modem(&self) -> &Modem {
        &self.modem
    }

    /// Returns pipeline whose decoder sees the received payloads through a BPSK-AWGN channel
    /// with given Es/N0 (dB), instead of a noiseless one.
    #[must_use]
    pub fn with_channel_noise(mut self, es_over_n0_db: f64) -> Self {
        self.channel_es_over_n0_db = Some(es_over_n0_db);
        self
    }

    /// Returns Es/N0 (dB) of the channel seen by the decoder, if it is noisy.
    #[must_use]
    pub fn channel_es_over_n0_db(&self) -> Option<f64> {
        self.channel_es_over_n0_db
    }

    /// Returns modulated signals for given source frames.
    ///
    /// # Errors
    ///
    /// Returns an error if any source frame does not have the configured length.
    pub fn send(&self, frames: &[Vec<Bit>]) -> Result<Vec<Vec<f64>>, Error> {
        let encoded = self.codec.encode(frames)?;
        let framed = self.protocol.build_frames(&encoded)?;
        let signals = self.modem.modulate(&framed)?;
        tracing::debug!(num_frames = frames.len(), "sent frames");
        Ok(signals)
    }

    /// Returns decoded source frames for given signals.
    ///
    /// Signals that cannot be demodulated, frames that fail protocol validation, and frames whose
    /// payload does not have the encoded frame length are reported in the diagnostics and do not
    /// stop the remaining frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the turbo decoder rejects the received payloads.
    pub fn receive(&self, signals: &[Vec<f64>]) -> Result<ReceiveReport, Error> {
        let indices: Vec<usize> = (0 .. signals.len()).collect();
        self.receive_at(&indices, signals)
    }

    /// Returns decoded source frames for signals some of which were lost in transport.
    ///
    /// Each lost signal is reported as [`Error::MissingFrame`]; nothing is substituted for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the turbo decoder rejects the received payloads.
    pub fn receive_lossy(&self, signals: Vec<Option<Vec<f64>>>) -> Result<ReceiveReport, Error> {
        let mut indices = Vec::with_capacity(signals.len());
        let mut present = Vec::with_capacity(signals.len());
        let mut missing = Vec::new();
        for (index, signal) in signals.into_iter().enumerate() {
            match signal {
                Some(signal) => {
                    indices.push(index);
                    present.push(signal);
                }
                None => {
                    tracing::warn!(index, "frame missing");
                    missing.push((index, Error::MissingFrame(index)));
                }
            }
        }
        let mut report = self.receive_at(&indices, &present)?;
        report.diagnostics.extend(missing);
        report.diagnostics.sort_by_key(|&(index, _)| index);
        Ok(report)
    }

    /// Runs the receive path on signals that came from given positions.
    fn receive_at(&self, indices: &[usize], signals: &[Vec<f64>]) -> Result<ReceiveReport, Error> {
        let demodulated: Vec<Result<Vec<Bit>, Error>> = signals
            .par_iter()
            .map(|signal| self.modem.demodulate_signal(signal))
            .collect();
        let mut report = ReceiveReport::default();
        let mut frame_indices = Vec::with_capacity(signals.len());
        let mut frames = Vec::with_capacity(signals.len());
        for (&index, result) in indices.iter().zip(demodulated) {
            match result {
                Ok(frame) => {
                    frame_indices.push(index);
                    frames.push(frame);
                }
                Err(error) => {
                    tracing::warn!(index, %error, "signal not demodulated");
                    report.diagnostics.push((index, error));
                }
            }
        }
        let parsed = self.protocol.parse_frames(&frames);
        report.diagnostics.extend(
            parsed
                .errors
                .into_iter()
                .map(|(pos, error)| (frame_indices[pos], error)),
        );
        let encoded_len = self.codec.encoded_len();
        let mut received = Vec::with_capacity(parsed.payloads.len());
        for (pos, payload) in parsed.positions.into_iter().zip(parsed.payloads) {
            let index = frame_indices[pos];
            if payload.len() == encoded_len {
                report.indices.push(index);
                received.push(match self.channel_es_over_n0_db {
                    Some(es_over_n0_db) => {
                        utils::bpsk_awgn_channel(&payload, es_over_n0_db, &mut rand::rng())
                    }
                    None => utils::soft_symbols(&payload),
                });
            } else {
                tracing::warn!(index, len = payload.len(), "bad payload length");
                report.diagnostics.push((
                    index,
                    Error::SignalLengthMismatch {
                        expected: encoded_len,
                        found: payload.len(),
                    },
                ));
            }
        }
        report.diagnostics.sort_by_key(|&(index, _)| index);
        report.frames = self.codec.decode(&received, self.iterations)?;
        tracing::debug!(
            num_decoded = report.frames.len(),
            num_rejected = report.diagnostics.len(),
            "received frames"
        );
        Ok(report)
    }
}
