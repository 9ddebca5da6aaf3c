//! One matching round over the unmatched pools.
//!
//! A round casts a 10-arcminute net around every eligible target source via a
//! KD-tree over the reference positions, scores each candidate pair with the
//! joint likelihood, and applies the acceptance rule:
//!
//! * exactly one candidate — accept iff the **raw** likelihood reaches the
//!   single-match threshold;
//! * several candidates — normalize the set to sum 1 and accept the arg-max
//!   iff its **normalized** likelihood reaches the multiple-match threshold;
//!   the losing candidates are discarded, not retried;
//! * zero candidates — the target source is simply deferred to the next round.
//!
//! Scoring of independent target sources is embarrassingly parallel and runs
//! on rayon; pool bookkeeping (acceptance, removal) is serialized afterwards
//! so each reference source is claimed by at most one target per round.

use ahash::AHashSet;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::catalog::Source;
use crate::constants::{Degree, NEGLIGIBLE_LIKELIHOOD_DECIMALS, SEARCH_RADIUS_DEG};
use crate::matching::likelihood::{joint_likelihood, normalize};

type ReferenceTree = ImmutableKdTree<f64, u32, 2, 32>;

/// A candidate promoted to permanent status: one target source matched to one
/// reference source, with the evidence that justified the acceptance.
///
/// The embedded target record carries its **original** (unwarped) position;
/// scoring happens on dewarped positions, but the permanent record keeps what
/// was actually measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedMatch {
    pub target: Source,
    pub reference: Source,
    /// Joint likelihood of the pair, in `[0, 1]`.
    pub raw_likelihood: f64,
    /// Share of this candidate within its candidate set; `None` when the
    /// target source had a single candidate.
    pub normalized_likelihood: Option<f64>,
    /// Size of the candidate set the decision was made against (after
    /// negligible candidates were pruned).
    pub n_candidates: usize,
}

/// Acceptance thresholds in force for one round. The exhaustive final sweep
/// runs with both forced to zero.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RoundThresholds {
    pub single: f64,
    pub multiple: f64,
}

/// Everything a round produced, index-based so the caller can partition the
/// pools into fresh snapshots.
#[derive(Debug, Default)]
pub(crate) struct RoundOutcome {
    pub accepted: Vec<AcceptedMatch>,
    /// Indices into the target pool, ascending.
    pub matched_target_indices: Vec<usize>,
    /// Indices into the reference pool, one per accepted match.
    pub matched_reference_indices: Vec<usize>,
    /// Eligible target sources that had no candidate within the search radius.
    pub n_zero_candidates: usize,
    /// Eligible target sources whose best candidate fell below threshold.
    pub n_below_threshold: usize,
}

/// Per-target decision computed in parallel, resolved serially afterwards.
enum Decision {
    Accept {
        reference_idx: usize,
        raw: f64,
        normalized: Option<f64>,
        n_candidates: usize,
    },
    NoCandidates,
    BelowThreshold,
}

/// Run one matching round.
///
/// Arguments
/// -----------------
/// * `targets`: the unmatched target pool (original records).
/// * `warped`: current dewarped positions, index-aligned with `targets`;
///   candidate search and scoring use these.
/// * `eligible`: round eligibility mask (the first-round SNR restriction),
///   index-aligned with `targets`.
/// * `reference`: the unmatched reference pool.
/// * `thresholds`: acceptance thresholds in force.
/// * `flux_match`: include the flux term in the likelihood.
///
/// Return
/// ----------
/// * A [`RoundOutcome`] with the accepted matches and the pool indices they
///   consumed.
pub(crate) fn run_round(
    targets: &[Source],
    warped: &[(Degree, Degree)],
    eligible: &[bool],
    reference: &[Source],
    thresholds: RoundThresholds,
    flux_match: bool,
) -> RoundOutcome {
    debug_assert_eq!(targets.len(), warped.len());
    debug_assert_eq!(targets.len(), eligible.len());

    if reference.is_empty() || targets.is_empty() {
        return RoundOutcome::default();
    }

    let entries: Vec<[f64; 2]> = reference.iter().map(|s| [s.ra, s.dec]).collect();
    let tree: ReferenceTree = ImmutableKdTree::new_from_slice(&entries);
    let radius_sq = SEARCH_RADIUS_DEG * SEARCH_RADIUS_DEG;

    let decisions: Vec<(usize, Decision)> = (0..targets.len())
        .into_par_iter()
        .filter(|&idx| eligible[idx])
        .map(|idx| {
            let pos = warped[idx];
            let neighbours = tree.within_unsorted::<SquaredEuclidean>(&[pos.0, pos.1], radius_sq);
            let candidate_idx: SmallVec<[usize; 8]> =
                neighbours.iter().map(|n| n.item as usize).collect();
            (
                idx,
                decide(&targets[idx], pos, &candidate_idx, reference, thresholds, flux_match),
            )
        })
        .collect();

    // Serial aggregation: first come, first served on reference sources, so a
    // reference claimed this round cannot be handed out twice.
    let mut outcome = RoundOutcome::default();
    let mut claimed: AHashSet<usize> = AHashSet::new();
    for (target_idx, decision) in decisions {
        match decision {
            Decision::Accept {
                reference_idx,
                raw,
                normalized,
                n_candidates,
            } => {
                if !claimed.insert(reference_idx) {
                    outcome.n_below_threshold += 1;
                    continue;
                }
                outcome.accepted.push(AcceptedMatch {
                    target: targets[target_idx].clone(),
                    reference: reference[reference_idx].clone(),
                    raw_likelihood: raw,
                    normalized_likelihood: normalized,
                    n_candidates,
                });
                outcome.matched_target_indices.push(target_idx);
                outcome.matched_reference_indices.push(reference_idx);
            }
            Decision::NoCandidates => outcome.n_zero_candidates += 1,
            Decision::BelowThreshold => outcome.n_below_threshold += 1,
        }
    }

    debug!(
        accepted = outcome.accepted.len(),
        zero_candidates = outcome.n_zero_candidates,
        below_threshold = outcome.n_below_threshold,
        "matching round finished"
    );
    outcome
}

/// Score a candidate set and apply the acceptance rule for one target source.
fn decide(
    target: &Source,
    target_pos: (Degree, Degree),
    candidate_idx: &[usize],
    reference: &[Source],
    thresholds: RoundThresholds,
    flux_match: bool,
) -> Decision {
    if candidate_idx.is_empty() {
        return Decision::NoCandidates;
    }

    let raw: SmallVec<[f64; 8]> = candidate_idx
        .iter()
        .map(|&r| joint_likelihood(target, target_pos, &reference[r], flux_match))
        .collect();

    let mut normalized: SmallVec<[f64; 8]> = raw.clone();
    normalize(&mut normalized);

    // Candidates whose share rounds to 0.00 carry no weight in the decision;
    // the recorded candidate count refers to the surviving set.
    let rounding = 10f64.powi(NEGLIGIBLE_LIKELIHOOD_DECIMALS);
    let survivors: SmallVec<[usize; 8]> = (0..candidate_idx.len())
        .filter(|&i| (normalized[i] * rounding).round() != 0.0)
        .collect();

    match survivors.len() {
        0 => Decision::BelowThreshold,
        1 => {
            let i = survivors[0];
            if raw[i] >= thresholds.single {
                Decision::Accept {
                    reference_idx: candidate_idx[i],
                    raw: raw[i],
                    normalized: None,
                    n_candidates: 1,
                }
            } else {
                Decision::BelowThreshold
            }
        }
        n => {
            let best = survivors
                .iter()
                .copied()
                .max_by(|&a, &b| normalized[a].total_cmp(&normalized[b]))
                .unwrap_or(survivors[0]);
            if normalized[best] >= thresholds.multiple {
                Decision::Accept {
                    reference_idx: candidate_idx[best],
                    raw: raw[best],
                    normalized: Some(normalized[best]),
                    n_candidates: n,
                }
            } else {
                Decision::BelowThreshold
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn source(ra: f64, dec: f64, peak_flux: f64, uuid: &str) -> Source {
        Source {
            ra,
            dec,
            peak_flux,
            err_ra: 0.005,
            err_dec: 0.005,
            err_peak_flux: 0.1,
            uuid: uuid.to_string(),
            ..Default::default()
        }
    }

    fn defaults() -> RoundThresholds {
        RoundThresholds {
            single: 0.95,
            multiple: 0.60,
        }
    }

    fn identity_pools(targets: &[Source]) -> (Vec<(f64, f64)>, Vec<bool>) {
        (
            targets.iter().map(|s| (s.ra, s.dec)).collect(),
            vec![true; targets.len()],
        )
    }

    #[test]
    fn coincident_pair_is_accepted_with_raw_likelihood_near_one() {
        let targets = vec![source(10.0, -5.0, 1.0, "t0")];
        let reference = vec![source(10.0, -5.0, 1.0, "r0")];
        let (warped, eligible) = identity_pools(&targets);

        let outcome = run_round(&targets, &warped, &eligible, &reference, defaults(), true);
        assert_eq!(outcome.accepted.len(), 1);
        let m = &outcome.accepted[0];
        assert_relative_eq!(m.raw_likelihood, 1.0, epsilon = 1e-9);
        assert_eq!(m.normalized_likelihood, None);
        assert_eq!(m.n_candidates, 1);
    }

    #[test]
    fn distant_lone_candidate_is_deferred() {
        let targets = vec![source(10.0, -5.0, 1.0, "t0")];
        // Within the 10-arcmin net but many sigma away.
        let reference = vec![source(10.1, -5.0, 1.0, "r0")];
        let (warped, eligible) = identity_pools(&targets);

        let outcome = run_round(&targets, &warped, &eligible, &reference, defaults(), true);
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.n_below_threshold, 1);
    }

    #[test]
    fn out_of_radius_reference_is_not_a_candidate() {
        let targets = vec![source(10.0, -5.0, 1.0, "t0")];
        let reference = vec![source(11.0, -5.0, 1.0, "r0")]; // 1 degree away
        let (warped, eligible) = identity_pools(&targets);

        let outcome = run_round(&targets, &warped, &eligible, &reference, defaults(), true);
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.n_zero_candidates, 1);
    }

    #[test]
    fn clear_winner_among_two_candidates_is_accepted() {
        let targets = vec![source(10.0, -5.0, 1.0, "t0")];
        // One candidate close in both position and flux, one marginal in both
        // but with a share still above the pruning floor.
        let reference = vec![
            source(10.0005, -5.0, 1.0, "near"),
            source(10.004, -5.0, 1.3, "far"),
        ];
        let (warped, eligible) = identity_pools(&targets);

        let outcome = run_round(&targets, &warped, &eligible, &reference, defaults(), true);
        assert_eq!(outcome.accepted.len(), 1);
        let m = &outcome.accepted[0];
        assert_eq!(m.reference.uuid, "near");
        assert_eq!(m.n_candidates, 2);
        let norm = m.normalized_likelihood.unwrap();
        assert!(norm >= 0.85, "expected a dominant share, got {norm}");
    }

    #[test]
    fn ambiguous_candidates_are_deferred() {
        let targets = vec![source(10.0, -5.0, 1.0, "t0")];
        // Two symmetric candidates: each normalized share is 0.5 < 0.60.
        let reference = vec![
            source(10.002, -5.0, 1.0, "left"),
            source(9.998, -5.0, 1.0, "right"),
        ];
        let (warped, eligible) = identity_pools(&targets);

        let outcome = run_round(&targets, &warped, &eligible, &reference, defaults(), true);
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.n_below_threshold, 1);
    }

    #[test]
    fn ineligible_targets_are_skipped() {
        let targets = vec![
            source(10.0, -5.0, 1.0, "t0"),
            source(11.0, -5.0, 1.0, "t1"),
        ];
        let reference = vec![
            source(10.0, -5.0, 1.0, "r0"),
            source(11.0, -5.0, 1.0, "r1"),
        ];
        let (warped, _) = identity_pools(&targets);
        let eligible = vec![true, false];

        let outcome = run_round(&targets, &warped, &eligible, &reference, defaults(), true);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].target.uuid, "t0");
    }

    #[test]
    fn one_reference_cannot_be_claimed_twice_in_a_round() {
        let targets = vec![
            source(10.0, -5.0, 1.0, "t0"),
            source(10.0001, -5.0, 1.0, "t1"),
        ];
        let reference = vec![source(10.0, -5.0, 1.0, "r0")];
        let (warped, eligible) = identity_pools(&targets);

        let outcome = run_round(&targets, &warped, &eligible, &reference, defaults(), true);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.matched_reference_indices, vec![0]);
    }

    #[test]
    fn zero_thresholds_accept_every_target_with_a_candidate() {
        let targets = vec![source(10.0, -5.0, 1.0, "t0")];
        let reference = vec![source(10.05, -5.0, 2.0, "r0")]; // poor but present
        let (warped, eligible) = identity_pools(&targets);

        let sweep = RoundThresholds {
            single: 0.0,
            multiple: 0.0,
        };
        let outcome = run_round(&targets, &warped, &eligible, &reference, sweep, true);
        assert_eq!(outcome.accepted.len(), 1);
    }
}
