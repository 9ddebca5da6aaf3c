//! Least-squares bivariate polynomial smoothing surface.
//!
//! The basis is every monomial `x^i · y^j` with total degree `i + j ≤ d`. The
//! coefficients are the least-squares solution of the (overdetermined) design
//! system, so the surface smooths scattered noisy samples instead of passing
//! through them exactly. Coordinates are shifted and scaled to `[-1, 1]`
//! internally before the monomials are raised to powers up to 5; the design
//! matrix would otherwise be hopelessly ill-conditioned for sky coordinates.

use nalgebra::{DMatrix, DVector};

use crate::constants::Degree;
use crate::skymatch_errors::SkymatchError;
use crate::surface::SurfaceModel;

/// A fitted bivariate polynomial surface of total degree 1–5.
#[derive(Debug, Clone)]
pub struct PolynomialSurface {
    degree: usize,
    coefficients: DVector<f64>,
    // Affine map from sky coordinates to the conditioning box.
    x_offset: f64,
    x_scale: f64,
    y_offset: f64,
    y_scale: f64,
}

impl PolynomialSurface {
    /// Number of coefficients (and hence minimum sample count) of a surface
    /// of the given total degree: `(d+1)(d+2)/2`.
    pub fn coefficient_count(degree: usize) -> usize {
        (degree + 1) * (degree + 2) / 2
    }

    /// Fit a smoothing surface of the given total degree to scattered samples.
    ///
    /// Arguments
    /// -----------------
    /// * `positions`: sample sky positions, `(ra, dec)` in degrees.
    /// * `values`: sample values, index-aligned with `positions`.
    /// * `degree`: total polynomial degree, 1–5.
    ///
    /// Return
    /// ----------
    /// * The fitted surface, or a [`SkymatchError`] when fewer samples than
    ///   coefficients are supplied or the design system is singular.
    pub fn fit(
        positions: &[(Degree, Degree)],
        values: &[f64],
        degree: usize,
    ) -> Result<Self, SkymatchError> {
        debug_assert_eq!(positions.len(), values.len());
        let n_coef = Self::coefficient_count(degree);
        if positions.len() < n_coef {
            return Err(SkymatchError::InsufficientCalibrationPoints {
                degree,
                required: n_coef,
                available: positions.len(),
            });
        }

        let (x_offset, x_scale) = conditioning(positions.iter().map(|p| p.0));
        let (y_offset, y_scale) = conditioning(positions.iter().map(|p| p.1));

        let mut design = DMatrix::<f64>::zeros(positions.len(), n_coef);
        for (row, &(ra, dec)) in positions.iter().enumerate() {
            let x = (ra - x_offset) / x_scale;
            let y = (dec - y_offset) / y_scale;
            for (col, (i, j)) in monomials(degree).enumerate() {
                design[(row, col)] = x.powi(i as i32) * y.powi(j as i32);
            }
        }
        let rhs = DVector::from_column_slice(values);

        let svd = design.svd(true, true);
        let coefficients = svd
            .solve(&rhs, 1e-12)
            .map_err(SkymatchError::SingularSurfaceFit)?;

        Ok(PolynomialSurface {
            degree,
            coefficients,
            x_offset,
            x_scale,
            y_offset,
            y_scale,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }
}

impl SurfaceModel for PolynomialSurface {
    fn evaluate(&self, ra: Degree, dec: Degree) -> f64 {
        let x = (ra - self.x_offset) / self.x_scale;
        let y = (dec - self.y_offset) / self.y_scale;
        monomials(self.degree)
            .zip(self.coefficients.iter())
            .map(|((i, j), c)| c * x.powi(i as i32) * y.powi(j as i32))
            .sum()
    }
}

/// Exponent pairs `(i, j)` with `i + j ≤ degree`, in a fixed order shared by
/// fitting and evaluation.
fn monomials(degree: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..=degree).flat_map(move |total| (0..=total).map(move |i| (i, total - i)))
}

/// Midpoint and half-span of a coordinate axis; degenerate axes (all samples
/// identical) keep a unit scale.
fn conditioning(coords: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for c in coords {
        min = min.min(c);
        max = max.max(c);
    }
    let half_span = (max - min) / 2.0;
    let scale = if half_span > 0.0 { half_span } else { 1.0 };
    ((min + max) / 2.0, scale)
}
