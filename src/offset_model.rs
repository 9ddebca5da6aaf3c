//! Astrometric offset-correction model.
//!
//! Every accepted match is a measurement of the local astrometric distortion:
//! the vector from the target source's catalogued position to its reference
//! counterpart. Two radial-basis-function surfaces (one per coordinate
//! component) interpolate those measurements across the sky, and subtracting
//! the interpolated offset from a raw target position dewarps it.
//!
//! The model is always fitted against the **original** target positions, and
//! applied to them, so successive refits replace rather than compound the
//! correction.

use itertools::izip;
use tracing::debug;

use crate::constants::Degree;
use crate::matching::round::AcceptedMatch;
use crate::skymatch_errors::SkymatchError;
use crate::surface::rbf::RbfSurface;
use crate::surface::SurfaceModel;

/// Smooth model of the target catalogue's positional offsets relative to the
/// reference frame.
#[derive(Debug, Clone)]
pub struct OffsetModel {
    ra_model: RbfSurface,
    dec_model: RbfSurface,
}

impl OffsetModel {
    /// Fit the offset surfaces to a set of accepted matches.
    ///
    /// Arguments
    /// -----------------
    /// * `matches`: the cumulative accepted-match set; each contributes one
    ///   node at the target's original position with the target − reference
    ///   offset as the value.
    /// * `smoothing`: RBF smoothing strength; zero interpolates exactly.
    ///
    /// Return
    /// ----------
    /// * The fitted model, or [`SkymatchError::TooFewMatchesForOffsetModel`]
    ///   when fewer than two matches are available.
    pub fn fit(matches: &[AcceptedMatch], smoothing: f64) -> Result<Self, SkymatchError> {
        if matches.len() < 2 {
            return Err(SkymatchError::TooFewMatchesForOffsetModel(matches.len()));
        }

        let nodes: Vec<(Degree, Degree)> =
            matches.iter().map(|m| (m.target.ra, m.target.dec)).collect();
        let ra_offsets: Vec<f64> =
            matches.iter().map(|m| m.target.ra - m.reference.ra).collect();
        let dec_offsets: Vec<f64> =
            matches.iter().map(|m| m.target.dec - m.reference.dec).collect();

        let ra_model = RbfSurface::fit(&nodes, &ra_offsets, smoothing)?;
        let dec_model = RbfSurface::fit(&nodes, &dec_offsets, smoothing)?;
        debug!(nodes = nodes.len(), smoothing, "fitted offset-correction model");
        Ok(Self { ra_model, dec_model })
    }

    /// Predicted offset (target − reference) at a sky position.
    pub fn predicted(&self, ra: Degree, dec: Degree) -> (Degree, Degree) {
        (self.ra_model.evaluate(ra, dec), self.dec_model.evaluate(ra, dec))
    }

    /// Dewarp a raw target position: subtract the interpolated offset.
    pub fn apply(&self, ra: Degree, dec: Degree) -> (Degree, Degree) {
        let (dra, ddec) = self.predicted(ra, dec);
        (ra - dra, dec - ddec)
    }

    /// Dewarp a batch of raw positions.
    pub fn apply_many(&self, positions: &[(Degree, Degree)]) -> Vec<(Degree, Degree)> {
        let ra_corr = self.ra_model.evaluate_many(positions);
        let dec_corr = self.dec_model.evaluate_many(positions);
        izip!(positions, ra_corr, dec_corr)
            .map(|(&(ra, dec), dra, ddec)| (ra - dra, dec - ddec))
            .collect()
    }
}
