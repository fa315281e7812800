//! # Some useful functions for simulating link performance
//!
//! The [`random_bits`] function returns a given number of random bits; the [`soft_symbols`]
//! function maps bits to the soft values a noiseless channel would deliver to the turbo decoder;
//! the [`bpsk_awgn_channel`] function adds Gaussian noise to those values; and the
//! [`error_count`] function returns the number of errors in a sequence with respect to a
//! reference sequence.
//!
//! # Examples
//!
//! The code below illustrates the usage of the functions in this module.
//! ```
//! use turbolink::utils;
//!
//! let mut rng = rand::rng();
//! let bits = utils::random_bits(40);
//! let received = utils::bpsk_awgn_channel(&bits, 10.0, &mut rng);
//! let bits_hat: Vec<_> = received.iter().map(|&y| turbolink::Bit::from(y > 0.0)).collect();
//! let err_count = utils::error_count(&bits_hat, &bits);
//! ```

use rand::Rng;
use rand_distr::StandardNormal;

use crate::Bit;

/// Returns given number of random bits.
///
/// # Parameters
///
/// - `num_bits`: Number of random bits to be generated.
///
/// # Returns
///
/// - `bits`: Random bits.
#[must_use]
pub fn random_bits(num_bits: usize) -> Vec<Bit> {
    let mut rng = rand::rng();
    (0 .. num_bits)
        .map(|_| Bit::from(rng.random_bool(0.5)))
        .collect()
}

/// Returns soft values corresponding to given bits on a noiseless channel.
///
/// `One` maps to `+1.0` and `Zero` to `-1.0`, matching the decoder convention that positive
/// values favour `One`.
#[must_use]
pub fn soft_symbols(bits: &[Bit]) -> Vec<f64> {
    bits.iter()
        .map(|b| match b {
            Bit::Zero => -1.0,
            Bit::One => 1.0,
        })
        .collect()
}

/// Returns soft values at BPSK-AWGN channel output corresponding to given input bits.
///
/// # Parameters
///
/// - `bits`: Bits to be transmitted over the BPSK-AWGN channel.
///
/// - `es_over_n0_db`: Ratio (dB) of symbol energy to noise power spectral density at the channel
///   output (the BPSK symbols are `+1.0` and `-1.0`, so the noise variance is
///   `0.5 / 10f64.powf(0.1 * es_over_n0_db)`).
///
/// - `rng`: Random number generator to be used.
///
/// # Returns
///
/// - `received`: Noisy soft values, positive values indicating that `One` is more likely.
pub fn bpsk_awgn_channel<R: Rng>(bits: &[Bit], es_over_n0_db: f64, rng: &mut R) -> Vec<f64> {
    let noise_var = 0.5 / 10f64.powf(0.1 * es_over_n0_db);
    soft_symbols(bits)
        .into_iter()
        .map(|x| x + noise_var.sqrt() * rng.sample::<f64, _>(StandardNormal))
        .collect()
}

/// Returns number of errors in a sequence with respect to a reference sequence.
///
/// # Parameters
///
/// - `seq`: Sequence in which errors must be counted.
///
/// - `ref_seq`: Reference sequence to which the given sequence is compared.
///
/// # Returns
///
/// - `err_count`: Number of positions in which the two sequences differ. If they are of different
///   lengths, then the longer sequence is effectively truncated to the length of the shorter one.
pub fn error_count<T: PartialEq>(seq: &[T], ref_seq: &[T]) -> usize {
    ref_seq
        .iter()
        .zip(seq.iter())
        .filter(|&(x, y)| x != y)
        .count()
}
