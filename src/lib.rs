//! This crate models one hop of a digital communication link. On the send path, source frames are
//! turbo-encoded, wrapped in protocol frames (header, length field and CRC-16 trailer) and
//! modulated onto a carrier; the receive path demodulates, validates and strips the protocol
//! frames, and turbo-decodes the payloads back into source frames.
//!
//! The turbo code is the parallel concatenation of two identical recursive systematic
//! convolutional (RSC) encoders, separated by a seeded pseudo-random interleaver (the systematic
//! bits from the second encoder are discarded). The decoder iterates between two simplified
//! log-likelihood-ratio (LLR) component decoders, separated by an interleaver and deinterleaver.
//! Two modems are available: on-off amplitude-shift keying (ASK), and quadrature phase-shift
//! keying (QPSK) with root-raised-cosine pulse shaping.
//!
//! # Examples
//!
//! This example shows how to send frames over the link and recover them.
//! ```
//! use turbolink::{utils, AskConfig, ModemConfig, Pipeline, PipelineConfig, TurboConfig};
//!
//! let config = PipelineConfig {
//!     turbo: TurboConfig { frame_len: 40, interleaver_size: 40, ..TurboConfig::default() },
//!     modem: ModemConfig::Ask(AskConfig { carrier_freq: 1000.0, sample_rate: 8000.0, bit_duration: 0.001 }),
//!     ..PipelineConfig::default()
//! };
//! let pipeline = Pipeline::from_config(&config)?;
//! let frames = vec![utils::random_bits(40); 3];
//! let signals = pipeline.send(&frames)?;
//! let report = pipeline.receive(&signals)?;
//! assert_eq!(report.frames, frames);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(
    clippy::complexity,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_allocation,
    unused_import_braces,
    unused_qualifications
)]

mod ask;
pub mod bitframe;
mod common;
mod config;
mod interleaver;
pub mod pipeline;
pub mod protocol;
mod qpsk;
pub mod rrc;
mod rsc;
pub mod sim;
pub mod transport;
mod turbo;
pub mod utils;

pub use ask::{AskConfig, AskModem};
pub use common::{Bit, Error};
pub use config::{ModemConfig, PipelineConfig, TurboConfig};
pub use interleaver::{Interleaver, DEFAULT_SEED};
pub use pipeline::{Modem, Pipeline, ReceiveReport};
pub use protocol::{CrcAlgorithm, ParseReport, ProtocolConfig, ProtocolHandler};
pub use qpsk::{FrameFormat, QpskConfig, QpskFrame, QpskModem};
pub use rsc::RscEncoder;
pub use turbo::{llr_proxy_decode, TurboCodec};
