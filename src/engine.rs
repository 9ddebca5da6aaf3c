//! # Iterative cross-matching engine
//!
//! Drives the full pipeline over a target/reference catalogue pair:
//!
//! ```text
//! SEEDING ──► MATCHING ──► CORRECTING
//!                 ▲             │
//!                 └─────────────┘
//!                 │
//!                 ▼
//!             CONVERGED
//! ```
//!
//! * **Seeding** normalizes the pair, pre-filters the reference catalogue to
//!   the target footprint and (optionally) fits and applies the
//!   flux-calibration surface.
//! * **Matching** runs one acceptance round over the unmatched pools; accepted
//!   pairs leave both pools permanently.
//! * **Correcting** refits the offset model on the cumulative match set and
//!   recomputes the dewarped positions of every remaining target source from
//!   its original coordinates.
//! * **Converged** is reached on the first round that accepts nothing (after
//!   the optional exhaustive final sweep), or at the round safety bound with
//!   partial results and a warning.

use ahash::AHashSet;
use tracing::{debug, info, warn};

use crate::catalog::normalize::normalize_pair;
use crate::catalog::prefilter::prefilter_reference;
use crate::catalog::{Catalog, Source};
use crate::constants::Degree;
use crate::flux_calibration::calibrate_fluxes;
use crate::matching::round::{run_round, AcceptedMatch, RoundThresholds};
use crate::matching::MatchParams;
use crate::offset_model::OffsetModel;
use crate::skymatch_errors::SkymatchError;
use crate::surface::polynomial::PolynomialSurface;

/// Terminal state of a cross-matching run.
#[derive(Debug, Clone)]
pub struct CrossMatchOutcome {
    /// Every accepted match, in acceptance order.
    pub matches: Vec<AcceptedMatch>,
    /// Reference sources never claimed by a match.
    pub leftover_reference: Catalog,
    /// Target sources never matched, original (measured) positions.
    pub leftover_target_original: Catalog,
    /// Dewarped positions of the leftover target sources under the final
    /// offset model, index-aligned with `leftover_target_original`.
    pub leftover_target_warped: Vec<(Degree, Degree)>,
    /// Matching rounds executed (the final sweep counts as a round).
    pub rounds: usize,
    /// False when the round safety bound cut the loop short.
    pub converged: bool,
    /// The flux-calibration surface, when one was fitted.
    pub flux_surface: Option<PolynomialSurface>,
}

/// Cross-match a target catalogue against a reference catalogue.
///
/// Consumes both catalogues: normalization and flux calibration rewrite their
/// records, and the pools are progressively drained into the outcome.
///
/// Arguments
/// -----------------
/// * `target`: the catalogue being corrected.
/// * `reference`: the astrometric/photometric truth catalogue. Multi-frequency
///   surveys must be resolved to the target frequency first (see
///   [`resolve_reference_fluxes`](crate::catalog::frequency::resolve_reference_fluxes)).
/// * `params`: validated run configuration.
///
/// Return
/// ----------
/// * A [`CrossMatchOutcome`], or a [`SkymatchError`] from validation or a
///   model fit.
///
/// See also
/// ------------
/// * [`MatchParams::builder`] – run configuration.
pub fn cross_match(
    mut target: Catalog,
    mut reference: Catalog,
    params: &MatchParams,
) -> Result<CrossMatchOutcome, SkymatchError> {
    // SEEDING
    normalize_pair(&mut target, &mut reference, params.flux_match)?;
    let reference = prefilter_reference(&target, &reference);

    let flux_surface = if params.model_flux {
        Some(calibrate_fluxes(&mut target, &reference, params)?)
    } else {
        None
    };

    let mut target_pool: Vec<Source> = target.sources;
    let mut reference_pool: Vec<Source> = reference.sources;
    let mut warped: Vec<(Degree, Degree)> =
        target_pool.iter().map(|s| (s.ra, s.dec)).collect();
    let mut matches: Vec<AcceptedMatch> = Vec::new();

    let thresholds = RoundThresholds {
        single: params.single_match_percentile,
        multiple: params.multiple_match_percentile,
    };
    let sweep_thresholds = RoundThresholds {
        single: 0.0,
        multiple: 0.0,
    };

    let mut rounds = 0;
    let mut converged = false;
    let mut swept = false;

    // MATCHING ⇄ CORRECTING
    while rounds < params.max_rounds {
        rounds += 1;
        let first_round = rounds == 1;

        let eligible: Vec<bool> = if first_round && params.snr_restrict_first_round {
            target_pool
                .iter()
                .map(|s| s.snr() >= params.snr_cutoff)
                .collect()
        } else {
            vec![true; target_pool.len()]
        };

        let in_force = if swept { sweep_thresholds } else { thresholds };
        let outcome = run_round(
            &target_pool,
            &warped,
            &eligible,
            &reference_pool,
            in_force,
            params.flux_match,
        );

        if outcome.accepted.is_empty() {
            if params.final_sweep && !swept && !target_pool.is_empty() && rounds < params.max_rounds
            {
                // One exhaustive pass: every remaining target source with a
                // candidate gets its most likely match, thresholds waived.
                info!(
                    unmatched_targets = target_pool.len(),
                    "natural convergence reached, running exhaustive final sweep"
                );
                swept = true;
                continue;
            }
            converged = true;
            break;
        }

        let n_accepted = outcome.accepted.len();
        matches.extend(outcome.accepted);
        drain_pool(&mut target_pool, &outcome.matched_target_indices);
        drain_pool(&mut warped, &outcome.matched_target_indices);
        drain_pool(&mut reference_pool, &outcome.matched_reference_indices);

        info!(
            round = rounds,
            accepted = n_accepted,
            total_matches = matches.len(),
            unmatched_targets = target_pool.len(),
            unmatched_references = reference_pool.len(),
            "matching round accepted new pairs"
        );

        // The sweep is a single terminal pass; no further correction rounds.
        if swept || target_pool.is_empty() || reference_pool.is_empty() {
            converged = true;
            break;
        }

        // CORRECTING: refit against the cumulative set, dewarp from the
        // original positions so corrections replace rather than stack.
        if matches.len() >= 2 {
            let model = OffsetModel::fit(&matches, params.rbf_smoothing)?;
            let originals: Vec<(Degree, Degree)> =
                target_pool.iter().map(|s| (s.ra, s.dec)).collect();
            warped = model.apply_many(&originals);
        } else {
            debug!("only one cumulative match, keeping uncorrected positions");
        }
    }

    if !converged {
        warn!(
            rounds,
            unmatched_targets = target_pool.len(),
            "round safety bound reached before convergence, returning partial results"
        );
    }

    info!(
        rounds,
        converged,
        matches = matches.len(),
        leftover_targets = target_pool.len(),
        leftover_references = reference_pool.len(),
        "cross-matching finished"
    );

    Ok(CrossMatchOutcome {
        matches,
        leftover_reference: Catalog::new(reference_pool),
        leftover_target_original: Catalog::new(target_pool),
        leftover_target_warped: warped,
        rounds,
        converged,
        flux_surface,
    })
}

/// Remove the entries at `indices` (ascending) from a pool, preserving the
/// order of the survivors.
fn drain_pool<T>(pool: &mut Vec<T>, indices: &[usize]) {
    let drop: AHashSet<usize> = indices.iter().copied().collect();
    let mut idx = 0;
    pool.retain(|_| {
        let keep = !drop.contains(&idx);
        idx += 1;
        keep
    });
}
