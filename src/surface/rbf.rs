//! Linear-kernel radial-basis interpolant with diagonal smoothing.
//!
//! The surface is `f(p) = Σᵢ wᵢ · ‖p − pᵢ‖` over the sample nodes `pᵢ`. The
//! weights solve the collocation system `A w = v` with `A[i][j] = ‖pᵢ − pⱼ‖`;
//! a smoothing factor `s` replaces the zero diagonal with `−s`, relaxing the
//! interpolation condition so the surface is damped towards a smooth field
//! instead of chasing every noisy sample.

use nalgebra::{DMatrix, DVector};

use crate::constants::Degree;
use crate::skymatch_errors::SkymatchError;
use crate::surface::SurfaceModel;

/// A fitted radial-basis surface.
#[derive(Debug, Clone)]
pub struct RbfSurface {
    nodes: Vec<(Degree, Degree)>,
    weights: DVector<f64>,
}

impl RbfSurface {
    /// Fit the interpolant to scattered samples.
    ///
    /// Arguments
    /// -----------------
    /// * `nodes`: sample sky positions, `(ra, dec)` in degrees.
    /// * `values`: sample values, index-aligned with `nodes`.
    /// * `smoothing`: diagonal damping factor; `0.0` interpolates exactly.
    ///
    /// Return
    /// ----------
    /// * The fitted surface, or [`SkymatchError::SingularSurfaceFit`] when the
    ///   collocation system cannot be solved (e.g. duplicate nodes with zero
    ///   smoothing).
    pub fn fit(
        nodes: &[(Degree, Degree)],
        values: &[f64],
        smoothing: f64,
    ) -> Result<Self, SkymatchError> {
        debug_assert_eq!(nodes.len(), values.len());
        let n = nodes.len();

        let mut system = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                system[(i, j)] = if i == j {
                    -smoothing
                } else {
                    distance(nodes[i], nodes[j])
                };
            }
        }

        let rhs = DVector::from_column_slice(values);
        let weights = system
            .lu()
            .solve(&rhs)
            .ok_or(SkymatchError::SingularSurfaceFit(
                "radial-basis collocation matrix is not invertible",
            ))?;

        Ok(RbfSurface {
            nodes: nodes.to_vec(),
            weights,
        })
    }
}

impl SurfaceModel for RbfSurface {
    fn evaluate(&self, ra: Degree, dec: Degree) -> f64 {
        self.nodes
            .iter()
            .zip(self.weights.iter())
            .map(|(&node, w)| w * distance((ra, dec), node))
            .sum()
    }
}

#[inline]
fn distance(a: (Degree, Degree), b: (Degree, Degree)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}
