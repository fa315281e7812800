//! Types needed in multiple modules

use serde::{Deserialize, Serialize};

/// Enumeration of binary symbol values
#[derive(Clone, Eq, Hash, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub enum Bit {
    /// Binary symbol `0`
    Zero = 0,
    /// Binary symbol `1`
    One = 1,
}

impl Bit {
    /// Returns the bit as a `u8` (`0` or `1`).
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Bit {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Bit::Zero),
            1 => Ok(Bit::One),
            _ => Err(Error::NonBinaryInput {
                index: 0,
                value: value.to_string(),
            }),
        }
    }
}

impl From<bool> for Bit {
    fn from(value: bool) -> Self {
        if value {
            Bit::One
        } else {
            Bit::Zero
        }
    }
}

/// Custom error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Frame does not have the configured length
    #[error("Invalid frame length (expected {expected}, found {found})")]
    FrameLengthMismatch {
        /// Configured length
        expected: usize,
        /// Actual length
        found: usize,
    },
    /// Received soft frame does not have three times the interleaver length
    #[error("Invalid received signal length (expected {expected}, found {found})")]
    SignalLengthMismatch {
        /// Required length
        expected: usize,
        /// Actual length
        found: usize,
    },
    /// Bit count is not a multiple of 8
    #[error("Bit count {0} is not a multiple of 8")]
    UnalignedPayload(usize),
    /// Value other than `0`/`1` where a bit was expected
    #[error("Non-binary value {value:?} at position {index}")]
    NonBinaryInput {
        /// Position of the offending value
        index: usize,
        /// Offending value, as text
        value: String,
    },
    /// Frame does not start with the configured header
    #[error("Header mismatch (found {found:02X?})")]
    HeaderMismatch {
        /// Bytes found where the header was expected
        found: Vec<u8>,
    },
    /// Frame holds fewer bytes than its header and length field require
    #[error("Incomplete frame (need {needed} bytes, have {available})")]
    IncompleteFrame {
        /// Bytes required
        needed: usize,
        /// Bytes available
        available: usize,
    },
    /// CRC trailer does not match the frame contents
    #[error("CRC mismatch (received {received:#06X}, computed {computed:#06X})")]
    CrcMismatch {
        /// CRC carried in the frame
        received: u16,
        /// CRC computed over the frame
        computed: u16,
    },
    /// Signal length is not a multiple of the segment length
    #[error("Signal length {len} is not a multiple of {segment} samples")]
    SegmentAlignment {
        /// Signal length
        len: usize,
        /// Required segment length
        segment: usize,
    },
    /// Frame lost in transport
    #[error("Frame {0} is missing")]
    MissingFrame(usize),
    /// Invalid input error
    #[error("{0}")]
    InvalidInput(String),
    /// File read/write error
    #[error("{0}")]
    FileReadWriteError(#[from] std::io::Error),
    /// Serde read/write error
    #[error("{0}")]
    SerdeReadWriteError(#[from] serde_json::Error),
}
