//! Joint positional/flux Gaussian likelihood.
//!
//! Each candidate pair is scored with the product of two independent Gaussian
//! density terms evaluated at zero mean:
//!
//! ```text
//! L = exp(-sep² / 2σ_pos²) · exp(-Δf² / 2σ_flux²)
//! ```
//!
//! where `sep` is the planar angular separation, `Δf` the peak-flux
//! difference, and each σ the quadrature combination of the two sources'
//! uncertainties. The likelihood peaks at 1 for a perfect coincidence and
//! decays monotonically with either discrepancy. When flux matching is
//! disabled the flux term is omitted and the likelihood is purely positional.

use crate::catalog::Source;
use crate::constants::Degree;

/// Gaussian likelihood of the two sources being the same object, judged on
/// position alone.
///
/// The target position is passed explicitly because scoring runs on the
/// *dewarped* position of the current round, not the one stored in the record.
pub fn position_likelihood(
    target: &Source,
    target_pos: (Degree, Degree),
    reference: &Source,
) -> f64 {
    let sigma = combined_position_sigma(target, reference);
    let d_ra = reference.ra - target_pos.0;
    let d_dec = reference.dec - target_pos.1;
    let sep_sq = d_ra * d_ra + d_dec * d_dec;
    gaussian(sep_sq, sigma)
}

/// Gaussian likelihood of the two sources being the same object, judged on
/// peak flux alone.
pub fn flux_likelihood(target: &Source, reference: &Source) -> f64 {
    let sigma = combined_flux_sigma(target, reference);
    let diff = reference.peak_flux - target.peak_flux;
    gaussian(diff * diff, sigma)
}

/// Joint likelihood of a candidate pair; purely positional when `flux_match`
/// is off.
pub fn joint_likelihood(
    target: &Source,
    target_pos: (Degree, Degree),
    reference: &Source,
    flux_match: bool,
) -> f64 {
    let positional = position_likelihood(target, target_pos, reference);
    if flux_match {
        positional * flux_likelihood(target, reference)
    } else {
        positional
    }
}

/// Normalize a candidate set's likelihoods in place so they sum to 1.
///
/// Leaves the slice untouched when the sum is zero (every candidate
/// negligible), since there is nothing meaningful to normalize against.
pub fn normalize(likelihoods: &mut [f64]) {
    let total: f64 = likelihoods.iter().sum();
    if total > 0.0 {
        for l in likelihoods.iter_mut() {
            *l /= total;
        }
    }
}

/// Quadrature combination of the two sources' positional uncertainties.
pub(crate) fn combined_position_sigma(target: &Source, reference: &Source) -> Degree {
    let t = target.position_sigma();
    let r = reference.position_sigma();
    (t * t + r * r).sqrt()
}

/// Quadrature combination of the two sources' flux uncertainties.
pub(crate) fn combined_flux_sigma(target: &Source, reference: &Source) -> f64 {
    let t = target.flux_sigma();
    let r = reference.flux_sigma();
    (t * t + r * r).sqrt()
}

/// `exp(-x² / 2σ²)` given `x²`; zero when σ is zero and the discrepancy is
/// not (an impossible match under a vanishing error budget).
fn gaussian(squared_deviation: f64, sigma: f64) -> f64 {
    if sigma == 0.0 {
        if squared_deviation == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        (-squared_deviation / (2.0 * sigma * sigma)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn source(ra: f64, dec: f64, peak_flux: f64) -> Source {
        Source {
            ra,
            dec,
            peak_flux,
            err_ra: 0.01,
            err_dec: 0.01,
            err_peak_flux: 0.1,
            ..Default::default()
        }
    }

    #[test]
    fn perfect_coincidence_scores_one() {
        let t = source(120.0, -30.0, 1.0);
        let r = source(120.0, -30.0, 1.0);
        assert_relative_eq!(joint_likelihood(&t, (t.ra, t.dec), &r, true), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn likelihood_decreases_monotonically_with_separation() {
        let t = source(120.0, -30.0, 1.0);
        let mut previous = f64::INFINITY;
        for step in 1..=10 {
            let r = source(120.0 + step as f64 * 0.003, -30.0, 1.0);
            let likelihood = joint_likelihood(&t, (t.ra, t.dec), &r, true);
            assert!(likelihood < previous, "not strictly decreasing at step {step}");
            previous = likelihood;
        }
    }

    #[test]
    fn likelihood_decreases_monotonically_with_flux_difference() {
        let t = source(120.0, -30.0, 1.0);
        let mut previous = f64::INFINITY;
        for step in 1..=10 {
            let r = source(120.0, -30.0, 1.0 + step as f64 * 0.05);
            let likelihood = joint_likelihood(&t, (t.ra, t.dec), &r, true);
            assert!(likelihood < previous, "not strictly decreasing at step {step}");
            previous = likelihood;
        }
    }

    #[test]
    fn flux_term_skipped_when_disabled() {
        let t = source(120.0, -30.0, 1.0);
        let r = source(120.0, -30.0, 50.0); // wildly discrepant flux
        let positional_only = joint_likelihood(&t, (t.ra, t.dec), &r, false);
        assert_relative_eq!(positional_only, 1.0, epsilon = 1e-12);
        assert!(joint_likelihood(&t, (t.ra, t.dec), &r, true) < 1e-6);
    }

    #[test]
    fn normalization_sums_to_one() {
        let mut likelihoods = vec![0.9, 0.3, 0.05, 0.001];
        normalize(&mut likelihoods);
        assert_relative_eq!(likelihoods.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn normalization_of_all_zero_set_is_a_noop() {
        let mut likelihoods = vec![0.0, 0.0];
        normalize(&mut likelihoods);
        assert_eq!(likelihoods, vec![0.0, 0.0]);
    }

    #[test]
    fn scoring_uses_the_dewarped_position() {
        let t = source(120.5, -30.0, 1.0); // recorded position is off by 0.5 deg
        let r = source(120.0, -30.0, 1.0);
        let warped = (120.0, -30.0);
        assert_relative_eq!(position_likelihood(&t, warped, &r), 1.0, epsilon = 1e-12);
        assert!(position_likelihood(&t, (t.ra, t.dec), &r) < 1e-12);
    }
}
