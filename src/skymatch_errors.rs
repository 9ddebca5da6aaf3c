use thiserror::Error;

use crate::catalog::CatalogRole;
use crate::constants::MegaHertz;

/// Errors surfaced by the cross-matching pipeline.
///
/// Variants fall into two families:
///
/// * **Data validation** — the input catalogues or run parameters are unusable
///   as given ([`MissingPositionalUncertainty`](SkymatchError::MissingPositionalUncertainty),
///   [`MissingFluxUncertainty`](SkymatchError::MissingFluxUncertainty),
///   [`MissingTargetFrequency`](SkymatchError::MissingTargetFrequency),
///   [`FrequencyOutOfRange`](SkymatchError::FrequencyOutOfRange),
///   [`InvalidParameter`](SkymatchError::InvalidParameter),
///   [`EmptyCatalog`](SkymatchError::EmptyCatalog)).
/// * **Numerical failure** — a model fit could not be carried out on otherwise
///   valid data ([`InsufficientCalibrationPoints`](SkymatchError::InsufficientCalibrationPoints),
///   [`TooFewMatchesForOffsetModel`](SkymatchError::TooFewMatchesForOffsetModel),
///   [`SingularSurfaceFit`](SkymatchError::SingularSurfaceFit)).
///
/// Every variant names the catalogue, column, or parameter that caused the
/// problem so callers can report actionable diagnostics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkymatchError {
    #[error("{0} catalogue is empty")]
    EmptyCatalog(CatalogRole),

    #[error(
        "no positional uncertainty available in the {0} catalogue: every source has \
         zero err_ra/err_dec and zero psf_a beam size"
    )]
    MissingPositionalUncertainty(CatalogRole),

    #[error(
        "no flux uncertainty available in the {0} catalogue: every source has \
         zero err_peak_flux and zero local_rms"
    )]
    MissingFluxUncertainty(CatalogRole),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(
        "reference catalogue carries {n_frequencies} flux frequencies but no target \
         frequency was supplied"
    )]
    MissingTargetFrequency { n_frequencies: usize },

    #[error(
        "target frequency {target} MHz lies outside the reference bracket \
         [{lowest}, {highest}] MHz and extrapolation is disabled"
    )]
    FrequencyOutOfRange {
        target: MegaHertz,
        lowest: MegaHertz,
        highest: MegaHertz,
    },

    #[error(
        "flux model of degree {degree} needs {required} calibration points, \
         only {available} target sources survived the SNR cutoff and pre-match"
    )]
    InsufficientCalibrationPoints {
        degree: usize,
        required: usize,
        available: usize,
    },

    #[error("offset model needs at least 2 accepted matches, found {0}")]
    TooFewMatchesForOffsetModel(usize),

    #[error("surface fit produced a singular system: {0}")]
    SingularSurfaceFit(&'static str),
}
