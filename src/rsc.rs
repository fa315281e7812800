//! Recursive systematic convolutional (RSC) encoder

use crate::{Bit, Error};

/// Register taps (two least significant state bits) used for both feedback and parity
const STATE_TAPS: usize = 0b11;

/// Largest supported constraint length
const MAX_CONSTRAINT_LEN: usize = 32;

/// State of an RSC encoder
#[derive(Clone, Eq, PartialEq, Debug, Copy)]
struct State(usize);

/// State machine for RSC encoder
///
/// The state register holds `constraint_len - 1` bits and starts at zero for every frame.
#[derive(Debug)]
struct StateMachine {
    /// Constraint length
    constraint_len: usize,
    /// Current state
    state: State,
}

impl StateMachine {
    /// Returns state machine in the all-zero state.
    fn new(constraint_len: usize) -> Self {
        Self {
            constraint_len,
            state: State(0),
        }
    }

    /// Returns systematic and parity bits for given input bit, and updates state.
    fn generate_output_bits(&mut self, input_bit: Bit) -> (Bit, Bit) {
        let feedback = bitxor(self.state.0 & STATE_TAPS);
        let fed_bit = xor(input_bit, feedback);
        let parity_bit = xor(fed_bit, bitxor(self.state.0 & STATE_TAPS));
        self.state = State(
            ((fed_bit as usize) << (self.constraint_len - 2)) | (self.state.0 >> 1),
        );
        (input_bit, parity_bit)
    }
}

/// Component encoder of the turbo code
///
/// Encoding carries no state from one frame to the next, and no tail bits are appended.
#[derive(Clone, Eq, PartialEq, Debug, Copy)]
pub struct RscEncoder {
    /// Number of bits per frame
    frame_len: usize,
    /// Constraint length
    constraint_len: usize,
}

impl RscEncoder {
    /// Returns RSC encoder for frames of given length.
    ///
    /// # Errors
    ///
    /// Returns an error if `frame_len` is `0`, or if `constraint_len` is not in the range
    /// `[3, 32]` (both register taps must lie inside a state of `constraint_len - 1` bits).
    pub fn new(frame_len: usize, constraint_len: usize) -> Result<Self, Error> {
        if frame_len == 0 {
            return Err(Error::InvalidInput(
                "Frame length must be a positive integer".to_string(),
            ));
        }
        if !(3 ..= MAX_CONSTRAINT_LEN).contains(&constraint_len) {
            return Err(Error::InvalidInput(format!(
                "Constraint length must be in the range [3, {MAX_CONSTRAINT_LEN}] \
                (found {constraint_len})"
            )));
        }
        Ok(Self {
            frame_len,
            constraint_len,
        })
    }

    /// Returns number of bits per frame.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Returns constraint length.
    #[must_use]
    pub fn constraint_len(&self) -> usize {
        self.constraint_len
    }

    /// Returns systematic and parity bits for given frame.
    ///
    /// # Errors
    ///
    /// Returns an error if `frame.len()` is not equal to the configured frame length.
    ///
    /// # Examples
    ///
    /// ```
    /// use turbolink::{Bit, RscEncoder};
    /// use Bit::{One, Zero};
    ///
    /// let encoder = RscEncoder::new(4, 3)?;
    /// let (systematic, parity) = encoder.encode(&[One, Zero, One, One])?;
    /// assert_eq!(systematic, [One, Zero, One, One]);
    /// assert_eq!(parity.len(), 4);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn encode(&self, frame: &[Bit]) -> Result<(Vec<Bit>, Vec<Bit>), Error> {
        if frame.len() != self.frame_len {
            return Err(Error::FrameLengthMismatch {
                expected: self.frame_len,
                found: frame.len(),
            });
        }
        let mut sm = StateMachine::new(self.constraint_len);
        Ok(frame
            .iter()
            .map(|&bit| sm.generate_output_bits(bit))
            .unzip())
    }
}

/// Returns XOR of bits in the binary representation of given integer.
fn bitxor(num: usize) -> Bit {
    match num.count_ones() % 2 {
        0 => Bit::Zero,
        _ => Bit::One,
    }
}

/// Returns XOR of two bits.
fn xor(x: Bit, y: Bit) -> Bit {
    if x == y {
        Bit::Zero
    } else {
        Bit::One
    }
}
