//! Configuration of the link: turbo code, modem and framing protocol
//!
//! A [`PipelineConfig`] can be saved to and loaded from a JSON file.
//!
//! # Examples
//!
//! ```
//! use turbolink::{ModemConfig, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! assert_eq!(config.turbo.frame_len, 1024);
//! assert!(matches!(config.modem, ModemConfig::Ask(_)));
//! let json = serde_json::to_string(&config)?;
//! assert_eq!(serde_json::from_str::<PipelineConfig>(&json)?, config);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{interleaver, AskConfig, Error, Interleaver, ProtocolConfig, QpskConfig, TurboCodec};

/// Parameters of the turbo code
#[derive(Clone, Eq, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct TurboConfig {
    /// Number of bits per source frame
    pub frame_len: usize,
    /// Constraint length of the component encoders
    pub constraint_length: usize,
    /// Length of the interleaver (must equal the frame length)
    pub interleaver_size: usize,
    /// Seed from which the interleaver permutation is generated
    pub interleaver_seed: u64,
    /// Number of turbo decoding iterations
    pub iterations: u32,
}

impl Default for TurboConfig {
    fn default() -> Self {
        Self {
            frame_len: 1024,
            constraint_length: 3,
            interleaver_size: 1024,
            interleaver_seed: interleaver::DEFAULT_SEED,
            iterations: 6,
        }
    }
}

impl TurboConfig {
    /// Returns turbo codec with these parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid (see [`TurboCodec::new`]).
    pub fn codec(&self) -> Result<TurboCodec, Error> {
        let interleaver = Interleaver::seeded(self.interleaver_size, self.interleaver_seed)?;
        TurboCodec::new(self.frame_len, self.constraint_length, interleaver)
    }
}

/// Parameters of the modem
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub enum ModemConfig {
    /// Amplitude-shift keying
    Ask(AskConfig),
    /// Quadrature phase-shift keying
    Qpsk(QpskConfig),
}

impl Default for ModemConfig {
    fn default() -> Self {
        ModemConfig::Ask(AskConfig::default())
    }
}

/// Parameters of the whole link
#[derive(Clone, PartialEq, Debug, Copy, Default, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Turbo code parameters
    pub turbo: TurboConfig,
    /// Modem parameters
    pub modem: ModemConfig,
    /// Framing protocol parameters
    pub protocol: ProtocolConfig,
}

impl PipelineConfig {
    /// Returns configuration read from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold a valid configuration.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Writes configuration to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}


#[cfg(test)]
mod tests_of_pipeline_config {
    use super::*;
    use crate::CrcAlgorithm;

    #[test]
    fn test_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.turbo, TurboConfig::default());
        assert_eq!(config.modem, ModemConfig::Ask(AskConfig::default()));
        assert_eq!(config.protocol.header_bytes, [0xAA, 0x55]);
        assert_eq!(config.protocol.crc_polynomial, CrcAlgorithm::Arc);
    }

    #[test]
    fn test_json_file_round_trip() {
        let config = PipelineConfig {
            turbo: TurboConfig {
                frame_len: 64,
                interleaver_size: 64,
                interleaver_seed: 7,
                ..TurboConfig::default()
            },
            modem: ModemConfig::Qpsk(QpskConfig {
                snr_db: Some(12.5),
                frame_len: 3 * 64 + 48,
                ..QpskConfig::default()
            }),
            protocol: ProtocolConfig {
                crc_polynomial: CrcAlgorithm::Modbus,
                ..ProtocolConfig::default()
            },
        };
        let path = std::env::temp_dir().join(format!(
            "turbolink_config_test_{}.json",
            std::process::id()
        ));
        config.to_json_file(&path).unwrap();
        let config_read = PipelineConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config_read, config);
    }

    #[test]
    fn test_from_json_file_errors() {
        assert!(matches!(
            PipelineConfig::from_json_file("/nonexistent/turbolink.json"),
            Err(Error::FileReadWriteError(_))
        ));
        let path = std::env::temp_dir().join(format!(
            "turbolink_bad_config_test_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{\"turbo\": 5}").unwrap();
        let result = PipelineConfig::from_json_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::SerdeReadWriteError(_))));
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{
            "turbo": {
                "frame_len": 16,
                "constraint_length": 4,
                "interleaver_size": 16,
                "interleaver_seed": 1,
                "iterations": 2
            },
            "modem": {
                "Ask": { "carrier_freq": 500.0, "sample_rate": 8000.0, "bit_duration": 0.002 }
            },
            "protocol": { "header_bytes": [126, 129], "crc_polynomial": "Xmodem" }
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.turbo.constraint_length, 4);
        assert_eq!(
            config.modem,
            ModemConfig::Ask(AskConfig {
                carrier_freq: 500.0,
                sample_rate: 8000.0,
                bit_duration: 0.002
            })
        );
        assert_eq!(config.protocol.header_bytes, [0x7E, 0x81]);
        assert_eq!(config.protocol.crc_polynomial, CrcAlgorithm::Xmodem);
    }
}
