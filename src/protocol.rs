//! Framing protocol with header, length field and CRC-16 trailer
//!
//! A protocol frame has the byte layout
//!
//! ```text
//! HEADER (2 bytes) | LENGTH (2 bytes, big-endian) | PAYLOAD (LENGTH bytes) | CRC-16 (2 bytes, big-endian)
//! ```
//!
//! where the CRC covers the header, length and payload bytes. Frames travel as bit sequences,
//! packed MSB-first.
//!
//! # Examples
//!
//! ```
//! use turbolink::{bitframe, ProtocolConfig, ProtocolHandler};
//!
//! let handler = ProtocolHandler::new(ProtocolConfig::default());
//! let payload = bitframe::bytes_to_bits(b"He");
//! let frames = handler.build_frames(&[payload.clone()])?;
//! assert_eq!(
//!     bitframe::bits_to_bytes(&frames[0])?,
//!     [0xAA, 0x55, 0x00, 0x02, 0x48, 0x65, 0xED, 0x43]
//! );
//! let report = handler.parse_frames(&frames);
//! assert_eq!(report.payloads, [payload]);
//! assert!(report.errors.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crc::{Crc, CRC_16_ARC, CRC_16_MODBUS, CRC_16_USB, CRC_16_XMODEM};
use serde::{Deserialize, Serialize};

use crate::{bitframe, Bit, Error};

const HEADER_BYTES: usize = 2;
const LENGTH_BYTES: usize = 2;
const CRC_BYTES: usize = 2;

/// Size of a frame with an empty payload (bytes)
pub const MIN_FRAME_BYTES: usize = HEADER_BYTES + LENGTH_BYTES + CRC_BYTES;

/// Number of bits a frame adds to its payload
pub const FRAME_OVERHEAD_BITS: usize = 8 * MIN_FRAME_BYTES;

const CRC16_ARC: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);
const CRC16_USB: Crc<u16> = Crc::<u16>::new(&CRC_16_USB);
const CRC16_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);
const CRC16_XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Enumeration of supported CRC-16 algorithms
#[derive(Clone, Eq, Hash, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub enum CrcAlgorithm {
    /// CRC-16/ARC (polynomial `0x8005`, reflected, initial value `0x0000`)
    Arc,
    /// CRC-16/USB (polynomial `0x8005`, reflected, initial value `0xFFFF`, inverted output)
    Usb,
    /// CRC-16/MODBUS (polynomial `0x8005`, reflected, initial value `0xFFFF`)
    Modbus,
    /// CRC-16/XMODEM (polynomial `0x1021`, not reflected, initial value `0x0000`)
    Xmodem,
}

impl CrcAlgorithm {
    /// Returns checksum of given bytes.
    #[must_use]
    pub fn checksum(self, bytes: &[u8]) -> u16 {
        match self {
            CrcAlgorithm::Arc => CRC16_ARC.checksum(bytes),
            CrcAlgorithm::Usb => CRC16_USB.checksum(bytes),
            CrcAlgorithm::Modbus => CRC16_MODBUS.checksum(bytes),
            CrcAlgorithm::Xmodem => CRC16_XMODEM.checksum(bytes),
        }
    }
}

/// Parameters of the framing protocol
#[derive(Clone, Eq, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct ProtocolConfig {
    /// Frame header
    pub header_bytes: [u8; 2],
    /// CRC algorithm for the trailer
    pub crc_polynomial: CrcAlgorithm,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            header_bytes: [0xAA, 0x55],
            crc_polynomial: CrcAlgorithm::Arc,
        }
    }
}

/// Outcome of parsing a batch of frames or a bitstream
#[derive(Debug, Default)]
pub struct ParseReport {
    /// Payloads of the valid frames, in input order
    pub payloads: Vec<Vec<Bit>>,
    /// Position of each valid frame (batch index, or bit offset for a stream)
    pub positions: Vec<usize>,
    /// Position and reason for each rejected frame
    pub errors: Vec<(usize, Error)>,
}

impl ParseReport {
    fn accept(&mut self, position: usize, payload: Vec<Bit>) {
        self.payloads.push(payload);
        self.positions.push(position);
    }

    fn reject(&mut self, position: usize, error: Error) {
        tracing::warn!(position, %error, "rejected protocol frame");
        self.errors.push((position, error));
    }
}

/// Builder and parser of protocol frames
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ProtocolHandler {
    /// Protocol parameters
    config: ProtocolConfig,
    /// Frame header as bits
    header_bits: Vec<Bit>,
}

impl ProtocolHandler {
    /// Returns handler for given protocol parameters.
    #[must_use]
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            config,
            header_bits: bitframe::bytes_to_bits(&config.header_bytes),
        }
    }

    /// Returns protocol parameters.
    #[must_use]
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Returns frames wrapping given payloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of bits in any payload is not a multiple of `8`, or if a
    /// payload does not fit in the 16-bit length field.
    pub fn build_frames(&self, payloads: &[Vec<Bit>]) -> Result<Vec<Vec<Bit>>, Error> {
        payloads
            .iter()
            .map(|payload| self.build_frame(payload))
            .collect()
    }

    /// Returns frame wrapping a single payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of bits in the payload is not a multiple of `8`, or if the
    /// payload does not fit in the 16-bit length field.
    pub fn build_frame(&self, payload: &[Bit]) -> Result<Vec<Bit>, Error> {
        let payload_bytes = bitframe::bits_to_bytes(payload)?;
        let length = u16::try_from(payload_bytes.len()).map_err(|_| {
            Error::InvalidInput(format!(
                "Payload of {} bytes does not fit in a protocol frame",
                payload_bytes.len()
            ))
        })?;
        let mut bytes = Vec::with_capacity(payload_bytes.len() + MIN_FRAME_BYTES);
        bytes.extend_from_slice(&self.config.header_bytes);
        bytes.extend_from_slice(&length.to_be_bytes());
        bytes.extend_from_slice(&payload_bytes);
        let crc = self.config.crc_polynomial.checksum(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());
        Ok(bitframe::bytes_to_bits(&bytes))
    }

    /// Returns payloads of the valid frames, along with the reason each invalid frame was
    /// rejected.
    ///
    /// An invalid frame does not stop the parsing of subsequent frames.
    #[must_use]
    pub fn parse_frames(&self, frames: &[Vec<Bit>]) -> ParseReport {
        let mut report = ParseReport::default();
        for (index, frame) in frames.iter().enumerate() {
            match self.parse_single_frame(frame) {
                Ok(payload) => report.accept(index, payload),
                Err(error) => report.reject(index, error),
            }
        }
        report
    }

    /// Returns payload of a single frame.
    ///
    /// Bytes beyond the end of the frame declared by its length field are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of bits is not a multiple of `8`, if the frame is shorter
    /// than its header, length and CRC fields (plus the declared payload) require, if the header
    /// does not match, or if the CRC does not match.
    pub fn parse_single_frame(&self, frame: &[Bit]) -> Result<Vec<Bit>, Error> {
        let bytes = bitframe::bits_to_bytes(frame)?;
        if bytes.len() < MIN_FRAME_BYTES {
            return Err(Error::IncompleteFrame {
                needed: MIN_FRAME_BYTES,
                available: bytes.len(),
            });
        }
        if bytes[.. HEADER_BYTES] != self.config.header_bytes {
            return Err(Error::HeaderMismatch {
                found: bytes[.. HEADER_BYTES].to_vec(),
            });
        }
        let frame_len = MIN_FRAME_BYTES + usize::from(u16::from_be_bytes([bytes[2], bytes[3]]));
        if bytes.len() < frame_len {
            return Err(Error::IncompleteFrame {
                needed: frame_len,
                available: bytes.len(),
            });
        }
        let (body, trailer) = bytes[.. frame_len].split_at(frame_len - CRC_BYTES);
        let received = u16::from_be_bytes([trailer[0], trailer[1]]);
        let computed = self.config.crc_polynomial.checksum(body);
        if received != computed {
            return Err(Error::CrcMismatch { received, computed });
        }
        Ok(bitframe::bytes_to_bits(&body[HEADER_BYTES + LENGTH_BYTES ..]))
    }

    /// Returns bit position of the first header at or after `start` in a bitstream.
    #[must_use]
    pub fn find_header(&self, bits: &[Bit], start: usize) -> Option<usize> {
        if start >= bits.len() {
            return None;
        }
        bits[start ..]
            .windows(self.header_bits.len())
            .position(|window| window == self.header_bits.as_slice())
            .map(|pos| start + pos)
    }

    /// Returns index of the row in which the first header starts, treating the rows as one
    /// concatenated bitstream (a header may straddle two rows).
    #[must_use]
    pub fn find_header_row(&self, rows: &[Vec<Bit>]) -> Option<usize> {
        let bits = rows.concat();
        let pos = self.find_header(&bits, 0)?;
        let mut row_end = 0;
        rows.iter().position(|row| {
            row_end += row.len();
            pos < row_end
        })
    }

    /// Returns payloads of the frames found in a concatenated bitstream.
    ///
    /// The stream is scanned for headers. A valid frame is consumed whole; after a rejected
    /// frame the scan resumes one bit past the rejected header. Positions in the report are bit
    /// offsets of the headers.
    #[must_use]
    pub fn parse_stream(&self, bits: &[Bit]) -> ParseReport {
        let mut report = ParseReport::default();
        let mut pos = 0;
        while let Some(start) = self.find_header(bits, pos) {
            let available_bytes = (bits.len() - start) / 8;
            let length_field = start + 8 * HEADER_BYTES .. start + 8 * (HEADER_BYTES + LENGTH_BYTES);
            if length_field.end > bits.len() {
                report.reject(
                    start,
                    Error::IncompleteFrame {
                        needed: MIN_FRAME_BYTES,
                        available: available_bytes,
                    },
                );
                break;
            }
            let payload_len = bits[length_field]
                .iter()
                .fold(0, |len, bit| (len << 1) | usize::from(bit.as_u8()));
            let frame_len = MIN_FRAME_BYTES + payload_len;
            let result = if frame_len > available_bytes {
                Err(Error::IncompleteFrame {
                    needed: frame_len,
                    available: available_bytes,
                })
            } else {
                self.parse_single_frame(&bits[start .. start + 8 * frame_len])
            };
            match result {
                Ok(payload) => {
                    report.accept(start, payload);
                    pos = start + 8 * frame_len;
                }
                Err(error) => {
                    report.reject(start, error);
                    pos = start + 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests_of_crc_algorithm {
    use super::*;

    #[test]
    fn test_checksum() {
        // Catalogue check values
        let data = b"123456789";
        assert_eq!(CrcAlgorithm::Arc.checksum(data), 0xBB3D);
        assert_eq!(CrcAlgorithm::Usb.checksum(data), 0xB4C8);
        assert_eq!(CrcAlgorithm::Modbus.checksum(data), 0x4B37);
        assert_eq!(CrcAlgorithm::Xmodem.checksum(data), 0x31C3);
    }
}
