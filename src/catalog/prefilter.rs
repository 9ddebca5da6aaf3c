//! Bounding-box pre-filter of the reference catalogue.
//!
//! Reference surveys usually cover far more sky than the target image. Sources
//! well outside the target footprint can never be candidates, so they are cut
//! before the KD-tree is ever built. The box is padded by a generous offset
//! allowance derived from the largest source and beam extents in the target
//! catalogue.

use tracing::debug;

use crate::catalog::Catalog;
use crate::constants::{Degree, ARCSEC_PER_DEGREE, PREFILTER_EDGE_FACTOR};

/// Cut the reference catalogue down to the target's padded bounding box.
///
/// The padding is `PREFILTER_EDGE_FACTOR ×` the offset allowance, where the
/// allowance is the largest source semi-axis plus the largest beam semi-axis
/// of the target catalogue (both converted from arcseconds to degrees).
///
/// Arguments
/// -----------------
/// * `target`: catalogue whose footprint defines the box.
/// * `reference`: catalogue to filter.
///
/// Return
/// ----------
/// * A new [`Catalog`] holding only the reference sources inside the padded
///   box. An empty target catalogue yields an empty result.
pub fn prefilter_reference(target: &Catalog, reference: &Catalog) -> Catalog {
    let Some((ra_min, ra_max, dec_min, dec_max)) = target.bounding_box() else {
        return Catalog::default();
    };

    let max_source_axis = target
        .iter()
        .map(|s| s.a.max(s.b))
        .fold(0.0_f64, f64::max);
    let max_beam_axis = target
        .iter()
        .map(|s| s.psf_a.max(s.psf_b))
        .fold(0.0_f64, f64::max);
    let edge: Degree = (max_source_axis + max_beam_axis) / ARCSEC_PER_DEGREE;
    let pad = PREFILTER_EDGE_FACTOR * edge;

    let filtered: Vec<_> = reference
        .iter()
        .filter(|s| {
            s.ra > ra_min - pad && s.ra < ra_max + pad && s.dec > dec_min - pad && s.dec < dec_max + pad
        })
        .cloned()
        .collect();

    debug!(
        kept = filtered.len(),
        total = reference.len(),
        pad_deg = pad,
        "pre-filtered reference catalogue to the target footprint"
    );
    Catalog::new(filtered)
}
