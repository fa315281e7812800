//! Encoder and decoder for the turbo code
//!
//! The encoder runs two identical RSC encoders, the second one on an interleaved copy of the
//! frame, and transmits the systematic bits followed by the parity bits of each encoder. The
//! decoder iterates between two component decoders that exchange extrinsic information through
//! the interleaver and deinterleaver.
//!
//! The component decoder is an LLR proxy rather than a trellis (BCJR) recursion: the posterior
//! LLR of each bit is `2 * systematic + prior`, and the extrinsic information is what remains
//! after removing the prior and the channel term. A noiseless channel is therefore decoded
//! without errors after a single iteration.

use rayon::prelude::*;

use crate::{Bit, Error, Interleaver, RscEncoder};

/// Returns the posterior LLR values and extrinsic information from the component decoder.
///
/// # Parameters
///
/// - `received`: Soft values for the systematic bits followed by those for the parity bits
///   (equal halves).
///
/// - `prior`: Prior LLR values for the information bits (length of one half of `received`).
///
/// # Returns
///
/// - `(llr, extrinsic)`: Posterior LLR values, positive values indicating that `One` is more
///   likely, and extrinsic information for the other component decoder.
#[must_use]
pub fn llr_proxy_decode(received: &[f64], prior: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let (systematic, _parity) = received.split_at(received.len() / 2);
    systematic
        .iter()
        .zip(prior)
        .map(|(&sys, &pri)| {
            let llr = 2.0 * sys + pri;
            (llr, llr - pri - 2.0 * sys)
        })
        .unzip()
}

/// Turbo encoder/decoder for frames of a fixed length
///
/// All state is fixed at construction, so one codec may be shared across threads.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TurboCodec {
    /// Component encoder
    rsc: RscEncoder,
    /// Internal interleaver
    interleaver: Interleaver,
}

impl TurboCodec {
    /// Returns codec for frames of `frame_len` bits.
    ///
    /// # Errors
    ///
    /// Returns an error if the component encoder cannot be built for `frame_len` and
    /// `constraint_len`, or if `interleaver.len()` differs from `frame_len`.
    ///
    /// # Examples
    ///
    /// ```
    /// use turbolink::{Interleaver, TurboCodec};
    ///
    /// let codec = TurboCodec::new(8, 3, Interleaver::seeded(8, 42)?)?;
    /// assert_eq!(codec.encoded_len(), 24);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(
        frame_len: usize,
        constraint_len: usize,
        interleaver: Interleaver,
    ) -> Result<Self, Error> {
        let rsc = RscEncoder::new(frame_len, constraint_len)?;
        if interleaver.len() != frame_len {
            return Err(Error::InvalidInput(format!(
                "Interleaver size ({}) must equal frame length ({frame_len})",
                interleaver.len()
            )));
        }
        Ok(Self { rsc, interleaver })
    }

    /// Returns number of bits per source frame.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        self.rsc.frame_len()
    }

    /// Returns number of bits per encoded frame.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        3 * self.rsc.frame_len()
    }

    /// Returns the internal interleaver.
    #[must_use]
    pub fn interleaver(&self) -> &Interleaver {
        &self.interleaver
    }

    /// Returns encoded frames for given source frames.
    ///
    /// Each encoded frame is the systematic bits, then the parity bits of the first encoder,
    /// then the parity bits of the second encoder.
    ///
    /// # Errors
    ///
    /// Returns an error if any frame does not have the configured length.
    ///
    /// # Examples
    ///
    /// ```
    /// use turbolink::{Bit, Interleaver, TurboCodec};
    /// use Bit::{One, Zero};
    ///
    /// let codec = TurboCodec::new(4, 3, Interleaver::new(&[3, 0, 1, 2])?)?;
    /// let encoded = codec.encode(&[vec![One, Zero, Zero, One]])?;
    /// assert_eq!(
    ///     encoded[0],
    ///     [One, Zero, Zero, One, One, Zero, Zero, One, One, One, Zero, Zero]
    /// );
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn encode(&self, frames: &[Vec<Bit>]) -> Result<Vec<Vec<Bit>>, Error> {
        frames
            .par_iter()
            .map(|frame| self.encode_frame(frame))
            .collect()
    }

    /// Returns encoded frame for a single source frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame does not have the configured length.
    pub fn encode_frame(&self, frame: &[Bit]) -> Result<Vec<Bit>, Error> {
        let (top_systematic, top_parity) = self.rsc.encode(frame)?;
        let mut interleaved_frame = Vec::with_capacity(frame.len());
        self.interleaver.interleave(frame, &mut interleaved_frame)?;
        // Systematic bits of the bottom encoder are not transmitted
        let (_, bottom_parity) = self.rsc.encode(&interleaved_frame)?;
        let mut encoded = Vec::with_capacity(self.encoded_len());
        encoded.extend(top_systematic);
        encoded.extend(top_parity);
        encoded.extend(bottom_parity);
        tracing::trace!(frame_len = frame.len(), "encoded turbo frame");
        Ok(encoded)
    }

    /// Returns decisions on the source bits for given received frames.
    ///
    /// # Parameters
    ///
    /// - `received_frames`: Soft values for the encoded bits, positive values indicating that
    ///   `One` is more likely.
    ///
    /// - `num_iter`: Number of turbo iterations. With `0` iterations, all decisions are `Zero`.
    ///
    /// # Errors
    ///
    /// Returns an error if any received frame does not have three times the interleaver length.
    ///
    /// # Examples
    ///
    /// ```
    /// use turbolink::{utils, Bit, Interleaver, TurboCodec};
    /// use Bit::{One, Zero};
    ///
    /// let codec = TurboCodec::new(8, 3, Interleaver::seeded(8, 42)?)?;
    /// let frame = vec![One, Zero, One, Zero, One, Zero, One, Zero];
    /// let encoded = codec.encode(&[frame.clone()])?;
    /// let received = vec![utils::soft_symbols(&encoded[0])];
    /// assert_eq!(codec.decode(&received, 6)?, [frame]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn decode(
        &self,
        received_frames: &[Vec<f64>],
        num_iter: u32,
    ) -> Result<Vec<Vec<Bit>>, Error> {
        received_frames
            .par_iter()
            .map(|received| self.decode_frame(received, num_iter))
            .collect()
    }

    /// Returns decisions on the source bits for a single received frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the received frame does not have three times the interleaver
    /// length.
    pub fn decode_frame(&self, received: &[f64], num_iter: u32) -> Result<Vec<Bit>, Error> {
        let num_bits = self.interleaver.len();
        if received.len() != 3 * num_bits {
            return Err(Error::SignalLengthMismatch {
                expected: 3 * num_bits,
                found: received.len(),
            });
        }
        let (top_received, bottom_received) = self.component_inputs(received)?;
        let mut extrinsic = vec![0.0; num_bits];
        let mut top_llr = vec![0.0; num_bits];
        let mut interleaved_extrinsic = Vec::with_capacity(num_bits);
        for _ in 0 .. num_iter {
            // Top decoder
            let (llr, top_extrinsic) = llr_proxy_decode(&top_received, &extrinsic);
            top_llr = llr;
            // Bottom decoder
            self.interleaver
                .interleave(&top_extrinsic, &mut interleaved_extrinsic)?;
            let (_, bottom_extrinsic) =
                llr_proxy_decode(&bottom_received, &interleaved_extrinsic);
            self.interleaver
                .deinterleave(&bottom_extrinsic, &mut extrinsic)?;
        }
        Ok(top_llr
            .iter()
            .map(|&llr| Bit::from(llr > 0.0))
            .collect())
    }

    /// Returns soft inputs to the top and bottom component decoders.
    fn component_inputs(&self, received: &[f64]) -> Result<(Vec<f64>, Vec<f64>), Error> {
        let num_bits = self.interleaver.len();
        let received_sys = &received[.. num_bits];
        let received_parity1 = &received[num_bits .. 2 * num_bits];
        let received_parity2 = &received[2 * num_bits ..];
        let mut top_received = Vec::with_capacity(2 * num_bits);
        top_received.extend_from_slice(received_sys);
        top_received.extend_from_slice(received_parity1);
        let mut bottom_received = Vec::with_capacity(2 * num_bits);
        self.interleaver
            .interleave(received_sys, &mut bottom_received)?;
        bottom_received.extend_from_slice(received_parity2);
        Ok((top_received, bottom_received))
    }
}

#[cfg(test)]
mod tests_of_functions {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn test_llr_proxy_decode() {
        let received = [1.0, -1.0, 0.5, 9.0, 9.0, 9.0];
        let prior = [0.5, 0.0, -2.0];
        let (llr, extrinsic) = llr_proxy_decode(&received, &prior);
        assert_float_eq!(llr, vec![2.5, -2.0, -1.0], abs_all <= 1e-12);
        assert_float_eq!(extrinsic, vec![0.0, 0.0, 0.0], abs_all <= 1e-12);
    }

    #[test]
    fn test_llr_proxy_decode_empty() {
        let (llr, extrinsic) = llr_proxy_decode(&[], &[]);
        assert!(llr.is_empty() && extrinsic.is_empty());
    }
}
