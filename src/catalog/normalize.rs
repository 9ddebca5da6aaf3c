//! Right-ascension wrap handling and uncertainty validation.
//!
//! Both operations run once, before any distance computation:
//!
//! 1. **RA wrap** — when a catalogue pair straddles the 0/360° boundary, every
//!    RA above 180° in *both* catalogues is shifted by −360° so the modeled
//!    region becomes topologically contiguous around zero. Applying the shift
//!    to only one catalogue, or skipping it, would make the offset and flux
//!    surfaces fit a discontinuous field.
//! 2. **Uncertainty validation** — the likelihood model divides by combined
//!    uncertainties; a catalogue in which every source lacks both the
//!    measured error and its fallback leaves that divisor at zero, which is a
//!    fatal input error rather than something to paper over.

use tracing::debug;

use crate::catalog::{Catalog, CatalogRole};
use crate::constants::{RA_WRAP_HIGH_DEG, RA_WRAP_LOW_DEG, RA_WRAP_SHIFT_THRESHOLD_DEG};
use crate::skymatch_errors::SkymatchError;

/// Canonicalize a target/reference pair in place.
///
/// Applies the RA wrap-around shift to both catalogues when either straddles
/// the 0/360° boundary, then validates that each catalogue carries at least
/// one usable positional uncertainty term, and — when flux matching is
/// enabled — at least one usable flux uncertainty term.
///
/// Arguments
/// -----------------
/// * `target`: the catalogue being corrected and matched.
/// * `reference`: the trusted catalogue.
/// * `flux_match`: whether flux enters the likelihood; when `false` the flux
///   uncertainty check is skipped.
///
/// Return
/// ----------
/// * `Ok(())` when the pair is usable, a [`SkymatchError`] naming the failing
///   catalogue and quantity otherwise.
pub fn normalize_pair(
    target: &mut Catalog,
    reference: &mut Catalog,
    flux_match: bool,
) -> Result<(), SkymatchError> {
    if target.is_empty() {
        return Err(SkymatchError::EmptyCatalog(CatalogRole::Target));
    }
    if reference.is_empty() {
        return Err(SkymatchError::EmptyCatalog(CatalogRole::Reference));
    }

    if straddles_ra_boundary(target) || straddles_ra_boundary(reference) {
        debug!("catalogue pair straddles the 0/360 RA boundary, shifting RA > 180 by -360");
        apply_ra_wrap(target);
        apply_ra_wrap(reference);
    }

    validate_uncertainties(target, CatalogRole::Target, flux_match)?;
    validate_uncertainties(reference, CatalogRole::Reference, flux_match)?;
    Ok(())
}

/// Detect the wrap-around signature: some sources within 10° of RA = 0 while
/// others sit within 10° of RA = 360.
///
/// A catalogue already shifted to the contiguous frame (negative RA, nothing
/// above 350°) does not trigger, so re-applying the correction is a no-op.
pub fn straddles_ra_boundary(catalog: &Catalog) -> bool {
    let near_zero = catalog.iter().any(|s| s.ra >= 0.0 && s.ra < RA_WRAP_LOW_DEG);
    let near_wrap = catalog.iter().any(|s| s.ra > RA_WRAP_HIGH_DEG);
    near_zero && near_wrap
}

/// Shift every RA above 180° by −360°, moving the high side of the boundary
/// to small negative values.
pub fn apply_ra_wrap(catalog: &mut Catalog) {
    for s in &mut catalog.sources {
        if s.ra > RA_WRAP_SHIFT_THRESHOLD_DEG {
            s.ra -= 360.0;
        }
    }
}

/// Check that at least one source in the catalogue carries a non-zero
/// positional uncertainty term (measured error or beam proxy), and likewise
/// for flux when `flux_match` is set.
fn validate_uncertainties(
    catalog: &Catalog,
    role: CatalogRole,
    flux_match: bool,
) -> Result<(), SkymatchError> {
    if !catalog.iter().any(|s| s.position_sigma() > 0.0) {
        return Err(SkymatchError::MissingPositionalUncertainty(role));
    }
    if flux_match && !catalog.iter().any(|s| s.flux_sigma() > 0.0) {
        return Err(SkymatchError::MissingFluxUncertainty(role));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Source;

    fn source_at(ra: f64) -> Source {
        Source {
            ra,
            dec: -20.0,
            err_ra: 1e-3,
            err_dec: 1e-3,
            err_peak_flux: 1e-3,
            ..Default::default()
        }
    }

    fn catalog_at(ras: &[f64]) -> Catalog {
        Catalog::new(ras.iter().map(|&ra| source_at(ra)).collect())
    }

    #[test]
    fn wrap_detected_on_boundary_crossing() {
        assert!(straddles_ra_boundary(&catalog_at(&[1.0, 359.0])));
        assert!(!straddles_ra_boundary(&catalog_at(&[1.0, 20.0])));
        assert!(!straddles_ra_boundary(&catalog_at(&[340.0, 359.0])));
    }

    #[test]
    fn wrap_shifts_both_catalogues() {
        let mut target = catalog_at(&[2.0, 358.0]);
        let mut reference = catalog_at(&[200.0, 3.0]);
        normalize_pair(&mut target, &mut reference, true).unwrap();
        assert_eq!(target.sources[1].ra, -2.0);
        assert_eq!(reference.sources[0].ra, -160.0);
    }

    #[test]
    fn wrap_is_idempotent_on_contiguous_catalogue() {
        let mut target = catalog_at(&[2.0, 358.0]);
        let mut reference = catalog_at(&[3.0, 357.0]);
        normalize_pair(&mut target, &mut reference, true).unwrap();
        let (snap_t, snap_r) = (target.clone(), reference.clone());
        normalize_pair(&mut target, &mut reference, true).unwrap();
        assert_eq!(target, snap_t);
        assert_eq!(reference, snap_r);
    }

    #[test]
    fn missing_positional_uncertainty_is_fatal() {
        let bare = Source {
            ra: 10.0,
            dec: 0.0,
            err_peak_flux: 1e-3,
            ..Default::default()
        };
        let mut target = Catalog::new(vec![bare]);
        let mut reference = catalog_at(&[10.0]);
        let err = normalize_pair(&mut target, &mut reference, true).unwrap_err();
        assert_eq!(
            err,
            SkymatchError::MissingPositionalUncertainty(CatalogRole::Target)
        );
    }

    #[test]
    fn flux_uncertainty_not_required_when_flux_matching_disabled() {
        let positional_only = Source {
            ra: 10.0,
            dec: 0.0,
            psf_a: 30.0,
            ..Default::default()
        };
        let mut target = Catalog::new(vec![positional_only.clone()]);
        let mut reference = Catalog::new(vec![positional_only.clone()]);
        assert!(normalize_pair(&mut target, &mut reference, false).is_ok());
        let err = normalize_pair(&mut target, &mut reference, true).unwrap_err();
        assert_eq!(err, SkymatchError::MissingFluxUncertainty(CatalogRole::Target));
    }

    #[test]
    fn empty_catalogue_is_fatal() {
        let mut target = Catalog::default();
        let mut reference = catalog_at(&[10.0]);
        assert_eq!(
            normalize_pair(&mut target, &mut reference, true).unwrap_err(),
            SkymatchError::EmptyCatalog(CatalogRole::Target)
        );
    }
}
