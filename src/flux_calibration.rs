//! Flux-calibration pre-pass.
//!
//! Before any probabilistic matching, a quick-and-dirty nearest-neighbour
//! pre-match between the high-SNR target sources and the reference catalogue
//! yields per-pair flux ratios (reference / target). A least-squares
//! polynomial surface fitted to those ratios captures the large-scale flux
//! miscalibration of the target image, and every target source's fluxes are
//! multiplied by the surface value at its position. The pre-match itself is
//! disposable: its pairs carry no likelihood weighting and never feed the
//! accepted-match set.

use itertools::izip;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::constants::{Degree, FLUX_PREMATCH_RADIUS_DEG};
use crate::matching::MatchParams;
use crate::skymatch_errors::SkymatchError;
use crate::surface::polynomial::PolynomialSurface;
use crate::surface::SurfaceModel;

type ReferenceTree = ImmutableKdTree<f64, u32, 2, 32>;

/// Fit the flux-calibration surface and apply it to the target catalogue.
///
/// Pipeline
/// -----------------
/// 1. Select target sources with SNR ≥ `params.flux_snr_cutoff`.
/// 2. For each, take the nearest reference source within 10 arcminutes.
/// 3. Fit a degree-`params.flux_model_degree` smoothing surface to the
///    reference/target peak-flux ratios over sky position.
/// 4. Multiply `peak_flux`, `err_peak_flux` and `int_flux` of **every** target
///    source by the surface value at its position.
///
/// Arguments
/// -----------------
/// * `target`: catalogue whose fluxes are corrected in place.
/// * `reference`: the (pre-filtered) reference catalogue.
/// * `params`: run configuration; `flux_snr_cutoff` and `flux_model_degree`
///   are consulted.
///
/// Return
/// ----------
/// * The fitted surface (for diagnostics), or
///   [`SkymatchError::InsufficientCalibrationPoints`] when fewer pre-match
///   pairs survive than the requested degree needs — the caller must then
///   fall back to uncorrected fluxes or a lower degree.
pub fn calibrate_fluxes(
    target: &mut Catalog,
    reference: &Catalog,
    params: &MatchParams,
) -> Result<PolynomialSurface, SkymatchError> {
    let (positions, ratios) = prematch_flux_ratios(target, reference, params.flux_snr_cutoff);
    debug!(
        pairs = positions.len(),
        degree = params.flux_model_degree,
        "flux-calibration pre-match complete"
    );

    let surface = PolynomialSurface::fit(&positions, &ratios, params.flux_model_degree)?;

    for s in &mut target.sources {
        let factor = surface.evaluate(s.ra, s.dec);
        s.peak_flux *= factor;
        s.err_peak_flux *= factor;
        s.int_flux *= factor;
    }

    info!(
        pairs = positions.len(),
        degree = params.flux_model_degree,
        "applied flux-calibration surface to target catalogue"
    );
    Ok(surface)
}

/// Disposable nearest-neighbour pre-match: high-SNR target sources paired
/// with their nearest reference source within the pre-match radius.
///
/// Returns the target positions and the reference/target peak-flux ratio per
/// pair.
fn prematch_flux_ratios(
    target: &Catalog,
    reference: &Catalog,
    snr_cutoff: f64,
) -> (Vec<(Degree, Degree)>, Vec<f64>) {
    if reference.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let entries: Vec<[f64; 2]> = reference.iter().map(|s| [s.ra, s.dec]).collect();
    let tree: ReferenceTree = ImmutableKdTree::new_from_slice(&entries);
    let radius_sq = FLUX_PREMATCH_RADIUS_DEG * FLUX_PREMATCH_RADIUS_DEG;

    let mut positions = Vec::new();
    let mut ratios = Vec::new();
    for s in target.iter().filter(|s| s.snr() >= snr_cutoff) {
        let nearest = tree.nearest_one::<SquaredEuclidean>(&[s.ra, s.dec]);
        if nearest.distance > radius_sq {
            continue;
        }
        let r = &reference.sources[nearest.item as usize];
        if s.peak_flux == 0.0 {
            continue;
        }
        positions.push((s.ra, s.dec));
        ratios.push(r.peak_flux / s.peak_flux);
    }
    (positions, ratios)
}

/// Ratio samples for diagnostic rendering of the calibration surface:
/// `(ra, dec, measured_ratio, modeled_ratio)` per pre-match pair.
///
/// The pipeline itself never consumes this; it exists for external plot
/// rendering of measured against modeled flux ratios.
pub fn calibration_diagnostics(
    target: &Catalog,
    reference: &Catalog,
    params: &MatchParams,
    surface: &PolynomialSurface,
) -> Vec<(Degree, Degree, f64, f64)> {
    let (positions, ratios) = prematch_flux_ratios(target, reference, params.flux_snr_cutoff);
    izip!(&positions, &ratios)
        .map(|(&(ra, dec), &ratio)| (ra, dec, ratio, surface.evaluate(ra, dec)))
        .collect()
}
