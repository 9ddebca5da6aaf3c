//! # skymatch
//!
//! **skymatch** is an iterative probabilistic cross-matching and correction
//! engine for astronomical source catalogues. Given a *target* catalogue
//! (typically a freshly reduced radio image) and a trusted *reference*
//! catalogue covering the same sky, it pairs sources across the two, then uses
//! the accepted pairs to model and remove the target's systematic astrometric
//! warp and flux miscalibration, iterating matching and correction until no
//! further pair is accepted.
//!
//! ## Pipeline
//!
//! 1. **Normalization** ([`catalog::normalize`]) — RA wrap-around handling,
//!    combined positional/flux uncertainties, catalogue-pair validation.
//! 2. **Reference pre-filter** ([`catalog::prefilter`]) — the reference
//!    catalogue is cut to the target footprint plus a beam-padded buffer.
//! 3. **Flux calibration** ([`flux_calibration`], optional) — a polynomial
//!    surface over reference/target flux ratios rescales the target fluxes.
//! 4. **Matching rounds** ([`matching`]) — a KD-tree candidate search within
//!    10 arcminutes, joint Gaussian position×flux likelihoods, and
//!    percentile-style acceptance thresholds; accepted pairs leave both pools
//!    permanently.
//! 5. **Offset correction** ([`offset_model`]) — radial-basis interpolation of
//!    the accepted pairs' positional residuals dewarps the remaining target
//!    positions before the next round.
//! 6. **Convergence** ([`engine`]) — the loop ends on the first round that
//!    accepts nothing (optionally after an exhaustive final sweep), or at a
//!    configurable round safety bound.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use skymatch::{cross_match, Catalog, MatchParams};
//!
//! # fn load_target() -> Catalog { Catalog::default() }
//! # fn load_reference() -> Catalog { Catalog::default() }
//! # fn main() -> Result<(), skymatch::SkymatchError> {
//! let target = load_target();
//! let reference = load_reference();
//!
//! let params = MatchParams::builder()
//!     .single_match_percentile(0.95)
//!     .multiple_match_percentile(0.60)
//!     .flux_match(true)
//!     .model_flux(true)
//!     .build()?;
//!
//! let outcome = cross_match(target, reference, &params)?;
//! println!(
//!     "{} matches in {} rounds (converged: {})",
//!     outcome.matches.len(),
//!     outcome.rounds,
//!     outcome.converged
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Scope
//!
//! The crate operates purely on in-memory [`Catalog`] values in a canonical
//! 14-field schema. Reading survey files, translating survey-specific column
//! names, and rendering diagnostics are the caller's concern.

pub mod catalog;
pub mod constants;
pub mod engine;
pub mod flux_calibration;
pub mod matching;
pub mod offset_model;
pub mod skymatch_errors;
pub mod surface;

pub use catalog::{Catalog, CatalogRole, Source};
pub use engine::{cross_match, CrossMatchOutcome};
pub use matching::round::AcceptedMatch;
pub use matching::{MatchParams, MatchParamsBuilder};
pub use offset_model::OffsetModel;
pub use skymatch_errors::SkymatchError;
