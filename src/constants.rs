//! # Constants and type definitions for skymatch
//!
//! This module centralizes the **angular constants**, **conversion factors**, and
//! **common type definitions** used throughout the `skymatch` library, together
//! with the default values of the run parameters.
//!
//! ## Overview
//!
//! - Unit conversions (arcseconds ↔ degrees)
//! - Fixed search radii of the matching pipeline
//! - Right-ascension wrap-around detection thresholds
//! - Default thresholds and cutoffs for [`MatchParams`](crate::matching::MatchParams)
//!
//! These definitions are used by all main modules, including candidate search,
//! surface fitting, and the convergence loop.

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Flux density in Jansky
pub type Jansky = f64;
/// Observing frequency in megahertz
pub type MegaHertz = f64;

// -------------------------------------------------------------------------------------------------
// Angular conversions and fixed radii
// -------------------------------------------------------------------------------------------------

/// Arcseconds per degree
pub const ARCSEC_PER_DEGREE: f64 = 3600.0;

/// Radius of the candidate search around each target source (10 arcminutes).
///
/// A deliberately wide net: all reference sources within this radius become
/// candidates for a target source, and the likelihood model sorts them out.
pub const SEARCH_RADIUS_DEG: Degree = 600.0 / ARCSEC_PER_DEGREE;

/// Radius of the disposable nearest-neighbour pre-match used to seed the
/// flux-calibration surface (10 arcminutes, matching the candidate search).
pub const FLUX_PREMATCH_RADIUS_DEG: Degree = 600.0 / ARCSEC_PER_DEGREE;

/// Padding multiplier applied to the beam/source extent when pre-filtering the
/// reference catalogue to the target bounding box.
pub const PREFILTER_EDGE_FACTOR: f64 = 5.0;

// -------------------------------------------------------------------------------------------------
// Right-ascension wrap handling
// -------------------------------------------------------------------------------------------------

/// Sources with RA below this value sit on the low side of the 0/360 boundary.
pub const RA_WRAP_LOW_DEG: Degree = 10.0;

/// Sources with RA above this value sit on the high side of the 0/360 boundary.
pub const RA_WRAP_HIGH_DEG: Degree = 350.0;

/// RA values above this threshold are shifted by −360° when a catalogue pair
/// straddles the 0/360 boundary, making the modeled region contiguous.
pub const RA_WRAP_SHIFT_THRESHOLD_DEG: Degree = 180.0;

// -------------------------------------------------------------------------------------------------
// Parameter defaults
// -------------------------------------------------------------------------------------------------

/// Default signal-to-noise cutoff for the first-round SNR restriction.
pub const DEFAULT_SNR_CUTOFF: f64 = 10.0;

/// Default signal-to-noise cutoff for flux-calibration pre-match candidates.
pub const DEFAULT_FLUX_SNR_CUTOFF: f64 = 10.0;

/// Default acceptance threshold on the raw likelihood of a lone candidate.
pub const DEFAULT_SINGLE_MATCH_PERCENTILE: f64 = 0.95;

/// Default acceptance threshold on the best normalized likelihood when a
/// target source has several candidates.
pub const DEFAULT_MULTIPLE_MATCH_PERCENTILE: f64 = 0.60;

/// Default polynomial degree of the flux-calibration surface.
pub const DEFAULT_FLUX_MODEL_DEGREE: usize = 1;

/// Largest polynomial degree accepted for the flux-calibration surface.
pub const MAX_FLUX_MODEL_DEGREE: usize = 5;

/// Default smoothing factor of the radial-basis offset interpolants.
///
/// Damps the interpolant so individual noisy offsets do not imprint sharp
/// features on the displacement field (0.0328 degrees, ~118 arcseconds).
pub const DEFAULT_RBF_SMOOTHING: f64 = 0.032777778;

/// Default safety bound on the number of matching rounds. The natural
/// termination condition is a round with zero new acceptances; this bound only
/// guards against oscillating acceptance patterns.
pub const DEFAULT_MAX_ROUNDS: usize = 100;

/// Normalized likelihoods that round to zero at this many decimals are pruned
/// from a candidate set before the acceptance decision.
pub const NEGLIGIBLE_LIKELIHOOD_DECIMALS: i32 = 2;
