//! # Smooth surface models over the sky
//!
//! Both correction models of the pipeline reduce to the same abstraction: a
//! scalar field over sky position fitted from scattered samples. The
//! [`SurfaceModel`] trait is the seam behind which the concrete fitting
//! algorithm lives, so either model can be substituted with any equivalent
//! smooth-surface fitting method.
//!
//! Two implementations are provided:
//!
//! * [`PolynomialSurface`](polynomial::PolynomialSurface) — a least-squares
//!   bivariate polynomial *smoothing* surface (degree 1–5). Noisy per-sample
//!   values are damped rather than interpolated exactly; used by the
//!   flux-calibration model.
//! * [`RbfSurface`](rbf::RbfSurface) — a linear-kernel radial-basis
//!   interpolant with diagonal smoothing; used per component by the
//!   offset-correction model.

pub mod polynomial;
pub mod rbf;

use crate::constants::Degree;

/// A fitted smooth scalar field over sky position.
///
/// Fitting is an inherent, per-type operation (each model carries its own
/// knobs); evaluation is the shared interface consumed by the pipeline.
pub trait SurfaceModel {
    /// Evaluate the fitted surface at one sky position.
    fn evaluate(&self, ra: Degree, dec: Degree) -> f64;

    /// Evaluate the fitted surface at many positions.
    fn evaluate_many(&self, positions: &[(Degree, Degree)]) -> Vec<f64> {
        positions
            .iter()
            .map(|&(ra, dec)| self.evaluate(ra, dec))
            .collect()
    }
}
