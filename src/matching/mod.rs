//! # Matching configuration and likelihood machinery
//!
//! This module defines the [`MatchParams`] configuration struct and its
//! validating builder, which control every tunable of the cross-matching
//! pipeline, plus the sub-modules:
//!
//! 1. [`likelihood`] — the joint positional/flux Gaussian likelihood and its
//!    normalization across a candidate set.
//! 2. [`round`] — KD-tree candidate search and the acceptance rule for one
//!    matching round over the unmatched pools.
//!
//! ## Example
//!
//! ```rust
//! use skymatch::matching::MatchParams;
//!
//! let params = MatchParams::builder()
//!     .snr_cutoff(8.0)
//!     .flux_model_degree(2)
//!     .multiple_match_percentile(0.7)
//!     .build()
//!     .unwrap();
//! assert!(params.flux_match);
//! ```

pub mod likelihood;
pub mod round;

use crate::constants::{
    MegaHertz, DEFAULT_FLUX_MODEL_DEGREE, DEFAULT_FLUX_SNR_CUTOFF, DEFAULT_MAX_ROUNDS,
    DEFAULT_MULTIPLE_MATCH_PERCENTILE, DEFAULT_RBF_SMOOTHING, DEFAULT_SINGLE_MATCH_PERCENTILE,
    DEFAULT_SNR_CUTOFF, MAX_FLUX_MODEL_DEGREE,
};
use crate::skymatch_errors::SkymatchError;

/// Immutable run configuration threaded through every component of the
/// pipeline. Construct via [`MatchParams::builder`]; the builder validates
/// ranges so an instance in hand is always usable.
///
/// Fields
/// -----------------
/// **Acceptance thresholds**
/// * `single_match_percentile` – raw-likelihood threshold for a lone candidate (default 0.95).
/// * `multiple_match_percentile` – normalized-likelihood threshold for the best of
///   several candidates (default 0.60).
///
/// **First-round seeding**
/// * `snr_restrict_first_round` – restrict round 1 to high-SNR target sources so the
///   initial offset model is seeded from trustworthy matches (default on).
/// * `snr_cutoff` – the SNR threshold of that restriction (default 10).
///
/// **Flux handling**
/// * `flux_match` – include the flux term in the likelihood (default on).
/// * `model_flux` – run the flux-calibration pre-pass (default on).
/// * `flux_model_degree` – polynomial degree of the calibration surface, 1–5 (default 1).
/// * `flux_snr_cutoff` – SNR threshold of the calibration pre-match subset (default 10).
/// * `target_frequency` – observing frequency of the target catalogue, required when the
///   reference exposes several frequencies. Consumed by
///   [`resolve_reference_fluxes`](crate::catalog::frequency::resolve_reference_fluxes).
/// * `extrapolate_flux` – allow a target frequency outside the reference grid (default off,
///   same consumer).
///
/// **Loop control**
/// * `max_rounds` – safety bound on matching rounds (default 100).
/// * `final_sweep` – after natural convergence, run one extra round with both
///   thresholds forced to zero so every remaining target source with at least one
///   candidate receives its most likely match (default off).
/// * `rbf_smoothing` – damping factor of the offset interpolants (default 0.0328).
#[derive(Debug, Clone)]
pub struct MatchParams {
    pub single_match_percentile: f64,
    pub multiple_match_percentile: f64,
    pub snr_restrict_first_round: bool,
    pub snr_cutoff: f64,
    pub flux_match: bool,
    pub model_flux: bool,
    pub flux_model_degree: usize,
    pub flux_snr_cutoff: f64,
    pub target_frequency: Option<MegaHertz>,
    pub extrapolate_flux: bool,
    pub max_rounds: usize,
    pub final_sweep: bool,
    pub rbf_smoothing: f64,
}

impl Default for MatchParams {
    fn default() -> Self {
        MatchParams {
            single_match_percentile: DEFAULT_SINGLE_MATCH_PERCENTILE,
            multiple_match_percentile: DEFAULT_MULTIPLE_MATCH_PERCENTILE,
            snr_restrict_first_round: true,
            snr_cutoff: DEFAULT_SNR_CUTOFF,
            flux_match: true,
            model_flux: true,
            flux_model_degree: DEFAULT_FLUX_MODEL_DEGREE,
            flux_snr_cutoff: DEFAULT_FLUX_SNR_CUTOFF,
            target_frequency: None,
            extrapolate_flux: false,
            max_rounds: DEFAULT_MAX_ROUNDS,
            final_sweep: false,
            rbf_smoothing: DEFAULT_RBF_SMOOTHING,
        }
    }
}

impl MatchParams {
    /// Construct a new [`MatchParams`] with the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`MatchParamsBuilder`] to configure custom parameters.
    pub fn builder() -> MatchParamsBuilder {
        MatchParamsBuilder::new()
    }
}

/// Builder for [`MatchParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct MatchParamsBuilder {
    params: MatchParams,
}

impl MatchParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: MatchParams::default(),
        }
    }

    pub fn single_match_percentile(mut self, v: f64) -> Self {
        self.params.single_match_percentile = v;
        self
    }
    pub fn multiple_match_percentile(mut self, v: f64) -> Self {
        self.params.multiple_match_percentile = v;
        self
    }
    pub fn snr_restrict_first_round(mut self, v: bool) -> Self {
        self.params.snr_restrict_first_round = v;
        self
    }
    pub fn snr_cutoff(mut self, v: f64) -> Self {
        self.params.snr_cutoff = v;
        self
    }
    pub fn flux_match(mut self, v: bool) -> Self {
        self.params.flux_match = v;
        self
    }
    pub fn model_flux(mut self, v: bool) -> Self {
        self.params.model_flux = v;
        self
    }
    pub fn flux_model_degree(mut self, v: usize) -> Self {
        self.params.flux_model_degree = v;
        self
    }
    pub fn flux_snr_cutoff(mut self, v: f64) -> Self {
        self.params.flux_snr_cutoff = v;
        self
    }
    pub fn target_frequency(mut self, v: MegaHertz) -> Self {
        self.params.target_frequency = Some(v);
        self
    }
    pub fn extrapolate_flux(mut self, v: bool) -> Self {
        self.params.extrapolate_flux = v;
        self
    }
    pub fn max_rounds(mut self, v: usize) -> Self {
        self.params.max_rounds = v;
        self
    }
    pub fn final_sweep(mut self, v: bool) -> Self {
        self.params.final_sweep = v;
        self
    }
    pub fn rbf_smoothing(mut self, v: f64) -> Self {
        self.params.rbf_smoothing = v;
        self
    }

    /// Finalize the builder, validating every field.
    ///
    /// Validation rules
    /// -----------------
    /// * both percentiles lie in `[0, 1]`,
    /// * `flux_model_degree` in `1..=5`,
    /// * SNR cutoffs, smoothing and target frequency are non-negative and finite,
    /// * `max_rounds ≥ 1`.
    pub fn build(self) -> Result<MatchParams, SkymatchError> {
        let p = &self.params;

        let percentile_ok = |v: f64| (0.0..=1.0).contains(&v);
        if !percentile_ok(p.single_match_percentile) {
            return Err(invalid(
                "single_match_percentile",
                format!("{} is not within [0, 1]", p.single_match_percentile),
            ));
        }
        if !percentile_ok(p.multiple_match_percentile) {
            return Err(invalid(
                "multiple_match_percentile",
                format!("{} is not within [0, 1]", p.multiple_match_percentile),
            ));
        }
        if p.flux_model_degree < 1 || p.flux_model_degree > MAX_FLUX_MODEL_DEGREE {
            return Err(invalid(
                "flux_model_degree",
                format!("{} is not within 1..={MAX_FLUX_MODEL_DEGREE}", p.flux_model_degree),
            ));
        }
        if !p.snr_cutoff.is_finite() || p.snr_cutoff < 0.0 {
            return Err(invalid("snr_cutoff", format!("{} must be finite and >= 0", p.snr_cutoff)));
        }
        if !p.flux_snr_cutoff.is_finite() || p.flux_snr_cutoff < 0.0 {
            return Err(invalid(
                "flux_snr_cutoff",
                format!("{} must be finite and >= 0", p.flux_snr_cutoff),
            ));
        }
        if !p.rbf_smoothing.is_finite() || p.rbf_smoothing < 0.0 {
            return Err(invalid(
                "rbf_smoothing",
                format!("{} must be finite and >= 0", p.rbf_smoothing),
            ));
        }
        if let Some(freq) = p.target_frequency {
            if !freq.is_finite() || freq <= 0.0 {
                return Err(invalid(
                    "target_frequency",
                    format!("{freq} MHz must be finite and > 0"),
                ));
            }
        }
        if p.max_rounds == 0 {
            return Err(invalid("max_rounds", "must be at least 1".to_string()));
        }

        Ok(self.params)
    }
}

fn invalid(name: &'static str, reason: String) -> SkymatchError {
    SkymatchError::InvalidParameter { name, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let params = MatchParams::builder().build().unwrap();
        assert_eq!(params.single_match_percentile, 0.95);
        assert_eq!(params.multiple_match_percentile, 0.60);
        assert_eq!(params.flux_model_degree, 1);
        assert!(params.snr_restrict_first_round);
        assert!(!params.final_sweep);
    }

    #[test]
    fn rejects_out_of_range_percentile() {
        assert!(matches!(
            MatchParams::builder().single_match_percentile(1.2).build(),
            Err(SkymatchError::InvalidParameter { name: "single_match_percentile", .. })
        ));
    }

    #[test]
    fn rejects_degree_zero_and_six() {
        for degree in [0, 6] {
            assert!(matches!(
                MatchParams::builder().flux_model_degree(degree).build(),
                Err(SkymatchError::InvalidParameter { name: "flux_model_degree", .. })
            ));
        }
    }

    #[test]
    fn rejects_nan_cutoff() {
        assert!(MatchParams::builder().snr_cutoff(f64::NAN).build().is_err());
    }
}
