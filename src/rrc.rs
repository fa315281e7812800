//! Root-raised-cosine (RRC) pulse shaping

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::Error;

/// Returns RRC filter taps with unit energy.
///
/// The filter spans `span` symbol periods at `samples_per_symbol` samples per symbol, so it has
/// `span * samples_per_symbol + 1` taps (always an odd number, centred on the middle tap).
///
/// # Errors
///
/// Returns an error if `rolloff` is not in `[0, 1]`, or if `span` or `samples_per_symbol` is `0`.
///
/// # Examples
///
/// ```
/// use turbolink::rrc;
///
/// let taps = rrc::rrc_taps(0.35, 6, 8)?;
/// assert_eq!(taps.len(), 49);
/// let energy: f64 = taps.iter().map(|h| h * h).sum();
/// assert!((energy - 1.0).abs() < 1e-12);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn rrc_taps(rolloff: f64, span: usize, samples_per_symbol: usize) -> Result<Vec<f64>, Error> {
    if !(0.0 ..= 1.0).contains(&rolloff) {
        return Err(Error::InvalidInput(format!(
            "RRC roll-off must be in the range [0, 1] (found {rolloff})"
        )));
    }
    if span == 0 || samples_per_symbol == 0 {
        return Err(Error::InvalidInput(
            "RRC span and samples per symbol must be positive integers".to_string(),
        ));
    }
    let num_taps = span * samples_per_symbol + 1;
    let center = (num_taps / 2) as f64;
    let sps = samples_per_symbol as f64;
    let mut taps: Vec<f64> = (0 .. num_taps)
        .map(|i| rrc_impulse_response((i as f64 - center) / sps, rolloff))
        .collect();
    let energy = taps.iter().map(|h| h * h).sum::<f64>().sqrt();
    taps.iter_mut().for_each(|h| *h /= energy);
    Ok(taps)
}

/// Returns RRC impulse response at time `t` (in symbol periods) for given roll-off.
fn rrc_impulse_response(t: f64, rolloff: f64) -> f64 {
    let a = rolloff;
    if t.abs() < 1e-12 {
        1.0 - a + 4.0 * a / PI
    } else if a > 0.0 && (1.0 - (4.0 * a * t).powi(2)).abs() < 1e-12 {
        // t = +/- 1 / (4 * a)
        (a / 2f64.sqrt())
            * ((1.0 + 2.0 / PI) * (PI / (4.0 * a)).sin()
                + (1.0 - 2.0 / PI) * (PI / (4.0 * a)).cos())
    } else {
        ((PI * t * (1.0 - a)).sin() + 4.0 * a * t * (PI * t * (1.0 + a)).cos())
            / (PI * t * (1.0 - (4.0 * a * t).powi(2)))
    }
}

/// Returns convolution of `input` with odd-length real `taps`, trimmed to the length of `input`
/// and aligned so that the middle tap introduces no delay.
#[must_use]
pub fn convolve_same(input: &[Complex64], taps: &[f64]) -> Vec<Complex64> {
    let half = taps.len() / 2;
    let len = input.len();
    (0 .. len)
        .map(|n| {
            // output[n] = sum_k input[k] * taps[n - k + half]
            let k_first = (n + half + 1).saturating_sub(taps.len());
            let k_last = (n + half).min(len - 1);
            (k_first ..= k_last)
                .map(|k| input[k] * taps[n + half - k])
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests_of_functions {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn test_rrc_taps() {
        // Invalid input
        assert!(rrc_taps(-0.1, 6, 8).is_err());
        assert!(rrc_taps(1.1, 6, 8).is_err());
        assert!(rrc_taps(0.35, 0, 8).is_err());
        assert!(rrc_taps(0.35, 6, 0).is_err());
        // Valid input
        for rolloff in [0.0, 0.25, 0.35, 0.5, 1.0] {
            let taps = rrc_taps(rolloff, 6, 8).unwrap();
            assert_eq!(taps.len(), 49);
            assert_float_eq!(taps.iter().map(|h| h * h).sum::<f64>(), 1.0, abs <= 1e-12);
            // Symmetric, peak in the middle
            for k in 0 .. 24 {
                assert_float_eq!(taps[k], taps[48 - k], abs <= 1e-12);
                assert!(taps[k] < taps[24]);
            }
        }
    }

    #[test]
    fn test_rrc_impulse_response() {
        assert_float_eq!(rrc_impulse_response(0.0, 0.0), 1.0, abs <= 1e-12);
        // Zero crossings of the sinc pulse at integer symbol periods
        assert_float_eq!(rrc_impulse_response(1.0, 0.0), 0.0, abs <= 1e-12);
        assert_float_eq!(rrc_impulse_response(2.0, 0.0), 0.0, abs <= 1e-12);
        assert_float_eq!(
            rrc_impulse_response(0.0, 0.5),
            0.5 + 2.0 / PI,
            abs <= 1e-12
        );
        // Singular point t = 1 / (4 * a) is continuous with its neighbourhood
        let at = rrc_impulse_response(0.5, 0.5);
        let near = rrc_impulse_response(0.5 + 1e-6, 0.5);
        assert_float_eq!(at, near, abs <= 1e-4);
    }

    #[test]
    fn test_convolve_same() {
        assert!(convolve_same(&[], &[1.0, 2.0, 3.0]).is_empty());
        let input: Vec<Complex64> = [1.0, 0.0, 0.0, 2.0]
            .iter()
            .map(|&x| Complex64::new(x, 0.0))
            .collect();
        let output = convolve_same(&input, &[1.0, 2.0, 3.0]);
        // Full convolution is [1, 2, 3, 2, 4, 6]; the middle 4 samples remain
        let re: Vec<f64> = output.iter().map(|z| z.re).collect();
        assert_float_eq!(re, vec![2.0, 3.0, 2.0, 4.0], abs_all <= 1e-12);
        // Identity filter
        let output = convolve_same(&input, &[0.0, 1.0, 0.0]);
        assert_eq!(output, input);
    }
}
