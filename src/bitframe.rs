//! # Conversions between bit sequences and their byte/text/raw representations
//!
//! Bits are packed MSB-first: the first bit of every group of 8 is the most significant bit of
//! the corresponding byte.
//!
//! # Examples
//!
//! ```
//! use turbolink::{bitframe, Bit};
//! use Bit::{One, Zero};
//!
//! let bits = [Zero, One, Zero, Zero, One, Zero, Zero, Zero];
//! let bytes = bitframe::bits_to_bytes(&bits)?;
//! assert_eq!(bytes, b"H");
//! assert_eq!(bitframe::bytes_to_bits(&bytes), bits);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::{Bit, Error};

/// Returns bytes obtained by packing given bits MSB-first.
///
/// # Errors
///
/// Returns an error if the number of bits is not a multiple of `8`.
pub fn bits_to_bytes(bits: &[Bit]) -> Result<Vec<u8>, Error> {
    if bits.len() % 8 != 0 {
        return Err(Error::UnalignedPayload(bits.len()));
    }
    Ok(bits
        .chunks_exact(8)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0u8, |byte, &bit| (byte << 1) | bit.as_u8())
        })
        .collect())
}

/// Returns bits obtained by unpacking given bytes MSB-first.
#[must_use]
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<Bit> {
    let mut bits = Vec::with_capacity(8 * bytes.len());
    for &byte in bytes {
        for shift in (0 .. 8).rev() {
            bits.push(Bit::from((byte >> shift) & 1 == 1));
        }
    }
    bits
}

/// Returns bits corresponding to raw integer samples, each of which must be `0` or `1`.
///
/// # Errors
///
/// Returns an error identifying the first value that is neither `0` nor `1`.
pub fn bits_from_raw(raw: &[u8]) -> Result<Vec<Bit>, Error> {
    raw.iter()
        .enumerate()
        .map(|(index, &value)| {
            Bit::try_from(value).map_err(|_| Error::NonBinaryInput {
                index,
                value: value.to_string(),
            })
        })
        .collect()
}

/// Returns raw integer samples (`0` or `1`) corresponding to given bits.
#[must_use]
pub fn bits_to_raw(bits: &[Bit]) -> Vec<u8> {
    bits.iter().map(|b| b.as_u8()).collect()
}

/// Returns bits corresponding to a string of `'0'` and `'1'` characters.
///
/// # Errors
///
/// Returns an error identifying the first character that is neither `'0'` nor `'1'`.
pub fn bits_from_text(text: &str) -> Result<Vec<Bit>, Error> {
    text.chars()
        .enumerate()
        .map(|(index, ch)| match ch {
            '0' => Ok(Bit::Zero),
            '1' => Ok(Bit::One),
            _ => Err(Error::NonBinaryInput {
                index,
                value: ch.to_string(),
            }),
        })
        .collect()
}

/// Returns string of `'0'` and `'1'` characters corresponding to given bits.
#[must_use]
pub fn bits_to_text(bits: &[Bit]) -> String {
    bits.iter()
        .map(|b| match b {
            Bit::Zero => '0',
            Bit::One => '1',
        })
        .collect()
}
