//! Interleaver for sequences of a given length

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::Error;

/// Seed used for the interleaver permutation unless configured otherwise
pub const DEFAULT_SEED: u64 = 42;

/// Interleaver for sequences of a given length
///
/// The permutation is fixed at construction and never changes afterwards, so one interleaver
/// can be shared by any number of threads.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Interleaver {
    /// Length of input/output sequence
    pub(crate) length: usize,
    /// Input index for each output index (needed in interleaving)
    pub(crate) all_in_index_given_out_index: Vec<usize>,
    /// Output index for each input index (needed in deinterleaving)
    pub(crate) all_out_index_given_in_index: Vec<usize>,
}

impl Interleaver {
    /// Returns interleaver corresponding to a given permutation.
    ///
    /// # Parameters
    ///
    /// - `perm`: Permutation of integers in `[0, L)` for some positive integer `L`. If the
    ///   interleaver input is the sequence `x[0], x[1], ..., x[L-1]`, then its output is the
    ///   sequence `x[perm[0]], x[perm[1]], ..., x[perm[L-1]]`.
    ///
    /// # Errors
    ///
    /// Returns an error if `perm` is not a permutation of the integers in `[0, L)` for some
    /// positive integer `L`.
    ///
    /// # Examples
    ///
    /// ```
    /// use turbolink::Interleaver;
    ///
    /// let perm = [0, 3, 2, 5, 4, 7, 6, 1];
    /// let interleaver = Interleaver::new(&perm)?;
    /// assert_eq!(interleaver.len(), 8);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(perm: &[usize]) -> Result<Self, Error> {
        if perm.is_empty() {
            return Err(Error::InvalidInput(
                "Permutation defining interleaver cannot be empty".to_string(),
            ));
        }
        let perm_vec = perm.to_vec();
        let mut perm_vec_sorted = perm.to_vec();
        perm_vec_sorted.sort_unstable();
        if !perm_vec_sorted.into_iter().eq(0 .. perm_vec.len()) {
            return Err(Error::InvalidInput(format!(
                "Expected permutation of all integers in the range [0, {}), found {:?}",
                perm_vec.len(),
                perm_vec
            )));
        }
        Ok(Self::from_valid_perm(perm_vec))
    }

    /// Returns pseudo-random interleaver for sequences of a given length, fully determined by
    /// `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if `length` is `0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use turbolink::Interleaver;
    ///
    /// let first = Interleaver::seeded(16, 42)?;
    /// let second = Interleaver::seeded(16, 42)?;
    /// assert_eq!(first, second);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn seeded(length: usize, seed: u64) -> Result<Self, Error> {
        if length == 0 {
            return Err(Error::InvalidInput(
                "Length of interleaver must be a positive integer".to_string(),
            ));
        }
        let mut perm_vec: Vec<usize> = (0 .. length).collect();
        perm_vec.shuffle(&mut StdRng::seed_from_u64(seed));
        Ok(Self::from_valid_perm(perm_vec))
    }

    /// Returns length of input/output sequence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the interleaver handles empty sequences (never the case for a
    /// constructed interleaver).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the permutation: input index for each output index.
    #[must_use]
    pub fn permutation(&self) -> &[usize] {
        &self.all_in_index_given_out_index
    }

    /// Generates interleaver output given its input.
    ///
    /// # Parameters
    ///
    /// - `input`: Interleaver input.
    ///
    /// - `output`: Buffer for interleaver output (any pre-existing contents will be cleared).
    ///
    /// # Errors
    ///
    /// Returns an error if `input.len()` is not equal to `self.length`.
    ///
    /// # Examples
    ///
    /// ```
    /// use turbolink::Interleaver;
    ///
    /// let perm = [0, 3, 2, 5, 4, 7, 6, 1];
    /// let interleaver = Interleaver::new(&perm)?;
    /// let input = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];
    /// let mut output = Vec::new();
    /// interleaver.interleave(&input, &mut output)?;
    /// assert_eq!(output, ['a', 'd', 'c', 'f', 'e', 'h', 'g', 'b']);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn interleave<T: Copy>(&self, input: &[T], output: &mut Vec<T>) -> Result<(), Error> {
        self.check_length(input.len())?;
        output.clear();
        output.extend(
            self.all_in_index_given_out_index
                .iter()
                .map(|&in_index| input[in_index]),
        );
        Ok(())
    }

    /// Generates interleaver input given its output.
    ///
    /// # Parameters
    ///
    /// - `output`: Interleaver output.
    ///
    /// - `input`: Buffer for interleaver input (any pre-existing contents will be cleared).
    ///
    /// # Errors
    ///
    /// Returns an error if `output.len()` is not equal to `self.length`.
    ///
    /// # Examples
    ///
    /// ```
    /// use turbolink::Interleaver;
    ///
    /// let perm = [0, 3, 2, 5, 4, 7, 6, 1];
    /// let interleaver = Interleaver::new(&perm)?;
    /// let output = ['a', 'd', 'c', 'f', 'e', 'h', 'g', 'b'];
    /// let mut input = Vec::new();
    /// interleaver.deinterleave(&output, &mut input)?;
    /// assert_eq!(input, ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h']);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn deinterleave<T: Copy>(&self, output: &[T], input: &mut Vec<T>) -> Result<(), Error> {
        self.check_length(output.len())?;
        input.clear();
        input.extend(
            self.all_out_index_given_in_index
                .iter()
                .map(|&out_index| output[out_index]),
        );
        Ok(())
    }

    /// Checks that a sequence has the length handled by the interleaver.
    fn check_length(&self, len: usize) -> Result<(), Error> {
        if len == self.length {
            Ok(())
        } else {
            Err(Error::FrameLengthMismatch {
                expected: self.length,
                found: len,
            })
        }
    }

    /// Returns interleaver corresponding to a valid permutation.
    fn from_valid_perm(perm_vec: Vec<usize>) -> Self {
        let length = perm_vec.len();
        let all_in_index_given_out_index: Vec<usize> = perm_vec;
        let mut all_out_index_given_in_index: Vec<usize> = (0 .. length).collect();
        all_out_index_given_in_index.sort_by_key(|&k| all_in_index_given_out_index[k]);
        Self {
            length,
            all_in_index_given_out_index,
            all_out_index_given_in_index,
        }
    }
}

#[cfg(test)]
mod tests_of_interleaver {
    use super::*;

    #[test]
    fn test_new() {
        // Invalid input
        assert!(Interleaver::new(&[]).is_err());
        assert!(Interleaver::new(&[1, 2, 3, 4]).is_err());
        assert!(Interleaver::new(&[0, 0, 1, 2]).is_err());
        // Valid input
        let interleaver = Interleaver::new(&[0, 3, 2, 5, 4, 7, 6, 1]).unwrap();
        assert_eq!(interleaver.len(), 8);
        assert_eq!(
            interleaver.all_out_index_given_in_index,
            [0, 7, 2, 1, 4, 3, 6, 5]
        );
    }

    #[test]
    fn test_seeded() {
        // Invalid input
        assert!(Interleaver::seeded(0, DEFAULT_SEED).is_err());
        // Valid input
        let length = 64;
        let interleaver = Interleaver::seeded(length, DEFAULT_SEED).unwrap();
        let mut o2i = interleaver.permutation().to_vec();
        o2i.sort_unstable();
        assert_eq!(o2i, (0 .. length).collect::<Vec<usize>>());
        // Same seed, same permutation; other seed, other permutation
        assert_eq!(
            interleaver,
            Interleaver::seeded(length, DEFAULT_SEED).unwrap()
        );
        assert_ne!(interleaver, Interleaver::seeded(length, 7).unwrap());
    }

    #[test]
    fn test_interleave() {
        let interleaver = Interleaver::new(&[0, 3, 2, 5, 4, 7, 6, 1]).unwrap();
        let mut output = Vec::new();
        // Invalid input
        let input = ['a', 'b', 'c', 'd', 'e', 'f', 'g'];
        assert!(matches!(
            interleaver.interleave(&input, &mut output),
            Err(Error::FrameLengthMismatch {
                expected: 8,
                found: 7
            })
        ));
        // Valid input
        let input = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];
        for _ in 0 .. 2 {
            interleaver.interleave(&input, &mut output).unwrap();
            assert_eq!(output, ['a', 'd', 'c', 'f', 'e', 'h', 'g', 'b']);
        }
    }

    #[test]
    fn test_deinterleave() {
        let interleaver = Interleaver::new(&[0, 3, 2, 5, 4, 7, 6, 1]).unwrap();
        let mut input = Vec::new();
        let output = ['a', 'd', 'c', 'f', 'e', 'h', 'g'];
        assert!(interleaver.deinterleave(&output, &mut input).is_err());
        let output = ['a', 'd', 'c', 'f', 'e', 'h', 'g', 'b'];
        interleaver.deinterleave(&output, &mut input).unwrap();
        assert_eq!(input, ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h']);
    }

    #[test]
    fn test_deinterleave_undoes_interleave() {
        for length in [1, 2, 8, 128, 1024] {
            let interleaver = Interleaver::seeded(length, DEFAULT_SEED).unwrap();
            let x: Vec<usize> = (0 .. length).map(|k| k * 7 + 3).collect();
            let mut y = Vec::new();
            let mut x_back = Vec::new();
            interleaver.interleave(&x, &mut y).unwrap();
            interleaver.deinterleave(&y, &mut x_back).unwrap();
            assert_eq!(x_back, x);
        }
    }
}
