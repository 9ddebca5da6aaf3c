//! Resolution of multi-frequency reference fluxes to the target frequency.
//!
//! Reference surveys often publish flux densities on a grid of discrete
//! observing frequencies. Before any flux comparison, those measurements must
//! be brought to the target catalogue's frequency: the two bracketing grid
//! frequencies are selected and the flux is linearly interpolated between
//! them, with the measurement errors propagated through the interpolation
//! weights. A target frequency outside the grid is only extrapolated when the
//! caller explicitly opts in, and logs a warning.
//!
//! A reference catalogue with a single frequency is assumed directly
//! comparable and resolved as-is.

use tracing::warn;

use crate::catalog::Catalog;
use crate::constants::{Jansky, MegaHertz};
use crate::matching::MatchParams;
use crate::skymatch_errors::SkymatchError;

/// The pair of grid frequencies used to interpolate towards the target
/// frequency, with precomputed linear weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBracket {
    pub lower: MegaHertz,
    pub upper: MegaHertz,
    /// Weight of the measurement at `lower`.
    pub weight_lower: f64,
    /// Weight of the measurement at `upper`.
    pub weight_upper: f64,
    /// True when the target frequency lies outside `[lower, upper]`.
    pub extrapolated: bool,
}

impl FrequencyBracket {
    /// Linearly interpolate a flux measured at the two bracket frequencies.
    pub fn interpolate(&self, flux_lower: Jansky, flux_upper: Jansky) -> Jansky {
        self.weight_lower * flux_lower + self.weight_upper * flux_upper
    }

    /// Propagate the measurement errors through the interpolation: each error
    /// is scaled by its own weight and the two terms are combined in
    /// quadrature.
    pub fn propagate_error(&self, err_lower: Jansky, err_upper: Jansky) -> Jansky {
        let lo = err_lower * self.weight_lower;
        let hi = err_upper * self.weight_upper;
        (lo * lo + hi * hi).sqrt()
    }
}

/// Flux measurements of one reference source on the catalogue's frequency
/// grid, index-aligned with the grid passed to [`resolve_reference_fluxes`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandFluxes {
    pub peak_flux: Vec<Jansky>,
    pub err_peak_flux: Vec<Jansky>,
}

/// Select the bracketing pair of grid frequencies for a target frequency.
///
/// Arguments
/// -----------------
/// * `frequencies`: the reference grid, strictly increasing, at least 2 entries.
/// * `target`: the target catalogue's observing frequency.
/// * `extrapolate`: allow the target to lie outside the grid; the nearest pair
///   of grid frequencies is then used with out-of-range linear weights.
///
/// Return
/// ----------
/// * The [`FrequencyBracket`] to interpolate with, or
///   [`SkymatchError::FrequencyOutOfRange`] when the target is outside the
///   grid and extrapolation was not requested.
pub fn select_bracket(
    frequencies: &[MegaHertz],
    target: MegaHertz,
    extrapolate: bool,
) -> Result<FrequencyBracket, SkymatchError> {
    debug_assert!(frequencies.len() >= 2);
    let lowest = frequencies[0];
    let highest = frequencies[frequencies.len() - 1];

    let outside = target < lowest || target > highest;
    if outside && !extrapolate {
        return Err(SkymatchError::FrequencyOutOfRange {
            target,
            lowest,
            highest,
        });
    }
    if outside {
        warn!(
            target_mhz = target,
            lowest_mhz = lowest,
            highest_mhz = highest,
            "target frequency outside the reference grid, extrapolating linearly"
        );
    }

    // Nearest bracketing pair; clamps to the first/last interval when outside.
    let upper_idx = frequencies
        .iter()
        .position(|&f| f >= target)
        .unwrap_or(frequencies.len() - 1)
        .max(1);
    let (lower, upper) = (frequencies[upper_idx - 1], frequencies[upper_idx]);

    let span = upper - lower;
    let weight_lower = (upper - target) / span;
    let weight_upper = (target - lower) / span;

    Ok(FrequencyBracket {
        lower,
        upper,
        weight_lower,
        weight_upper,
        extrapolated: outside,
    })
}

/// Resolve per-band reference fluxes onto the canonical single-flux schema.
///
/// Overwrites `peak_flux` and `err_peak_flux` of every source in `reference`
/// with the value interpolated (or, with the override, extrapolated) to the
/// target frequency. With a single-frequency grid the measurements are taken
/// as directly comparable and copied through, and no target frequency is
/// required.
///
/// Arguments
/// -----------------
/// * `reference`: the canonical reference catalogue to fill in.
/// * `frequencies`: the survey's frequency grid, strictly increasing.
/// * `bands`: per-source measurements, index-aligned with both `reference`
///   and `frequencies`.
/// * `params`: run configuration; `target_frequency` (mandatory when the grid
///   has more than one entry) and `extrapolate_flux` are consulted.
///
/// Return
/// ----------
/// * `Ok(())` on success, a [`SkymatchError`] for a missing target frequency
///   or an out-of-range one without the override.
pub fn resolve_reference_fluxes(
    reference: &mut Catalog,
    frequencies: &[MegaHertz],
    bands: &[BandFluxes],
    params: &MatchParams,
) -> Result<(), SkymatchError> {
    debug_assert_eq!(reference.len(), bands.len());

    if frequencies.len() == 1 {
        for (source, band) in reference.sources.iter_mut().zip(bands) {
            source.peak_flux = band.peak_flux[0];
            source.err_peak_flux = band.err_peak_flux[0];
        }
        return Ok(());
    }

    let target = params
        .target_frequency
        .ok_or(SkymatchError::MissingTargetFrequency {
            n_frequencies: frequencies.len(),
        })?;
    let bracket = select_bracket(frequencies, target, params.extrapolate_flux)?;
    let lower_idx = frequencies
        .iter()
        .position(|&f| f == bracket.lower)
        .unwrap_or(0);
    let upper_idx = lower_idx + 1;

    for (source, band) in reference.sources.iter_mut().zip(bands) {
        source.peak_flux = bracket.interpolate(band.peak_flux[lower_idx], band.peak_flux[upper_idx]);
        source.err_peak_flux =
            bracket.propagate_error(band.err_peak_flux[lower_idx], band.err_peak_flux[upper_idx]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Source;
    use approx::assert_relative_eq;

    #[test]
    fn bracket_weights_sum_to_one() {
        let bracket = select_bracket(&[150.0, 180.0, 210.0], 170.0, false).unwrap();
        assert_eq!(bracket.lower, 150.0);
        assert_eq!(bracket.upper, 180.0);
        assert_relative_eq!(bracket.weight_lower + bracket.weight_upper, 1.0, epsilon = 1e-12);
        assert!(!bracket.extrapolated);
    }

    #[test]
    fn bracket_at_grid_point_is_exact() {
        let bracket = select_bracket(&[150.0, 180.0], 180.0, false).unwrap();
        assert_relative_eq!(bracket.interpolate(1.0, 3.0), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn out_of_range_without_override_is_fatal() {
        let err = select_bracket(&[150.0, 180.0], 120.0, false).unwrap_err();
        assert_eq!(
            err,
            SkymatchError::FrequencyOutOfRange {
                target: 120.0,
                lowest: 150.0,
                highest: 180.0
            }
        );
    }

    #[test]
    fn extrapolation_uses_nearest_interval() {
        let bracket = select_bracket(&[150.0, 180.0, 210.0], 240.0, true).unwrap();
        assert!(bracket.extrapolated);
        assert_eq!((bracket.lower, bracket.upper), (180.0, 210.0));
        // Linear continuation: flux(240) from flux(180)=1, flux(210)=2 is 3.
        assert_relative_eq!(bracket.interpolate(1.0, 2.0), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn error_propagation_scales_each_term_by_its_weight() {
        let bracket = select_bracket(&[100.0, 200.0], 150.0, false).unwrap();
        // Equal weights 0.5: sqrt((0.5*0.3)^2 + (0.5*0.4)^2) = 0.25
        assert_relative_eq!(bracket.propagate_error(0.3, 0.4), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn resolve_requires_target_frequency_on_multi_band_grid() {
        let mut reference = Catalog::new(vec![Source::default()]);
        let bands = vec![BandFluxes {
            peak_flux: vec![1.0, 2.0],
            err_peak_flux: vec![0.1, 0.2],
        }];
        // Default configuration carries no target frequency.
        let err = resolve_reference_fluxes(
            &mut reference,
            &[150.0, 180.0],
            &bands,
            &MatchParams::default(),
        )
        .unwrap_err();
        assert_eq!(err, SkymatchError::MissingTargetFrequency { n_frequencies: 2 });
    }

    #[test]
    fn resolve_single_band_copies_through() {
        let mut reference = Catalog::new(vec![Source::default()]);
        let bands = vec![BandFluxes {
            peak_flux: vec![2.5],
            err_peak_flux: vec![0.25],
        }];
        resolve_reference_fluxes(&mut reference, &[150.0], &bands, &MatchParams::default())
            .unwrap();
        assert_eq!(reference.sources[0].peak_flux, 2.5);
        assert_eq!(reference.sources[0].err_peak_flux, 0.25);
    }

    #[test]
    fn resolve_interpolates_every_source() {
        let mut reference = Catalog::new(vec![Source::default(), Source::default()]);
        let bands = vec![
            BandFluxes {
                peak_flux: vec![1.0, 3.0],
                err_peak_flux: vec![0.0, 0.0],
            },
            BandFluxes {
                peak_flux: vec![4.0, 2.0],
                err_peak_flux: vec![0.0, 0.0],
            },
        ];
        let params = MatchParams::builder().target_frequency(150.0).build().unwrap();
        resolve_reference_fluxes(&mut reference, &[100.0, 200.0], &bands, &params).unwrap();
        assert_relative_eq!(reference.sources[0].peak_flux, 2.0, epsilon = 1e-12);
        assert_relative_eq!(reference.sources[1].peak_flux, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn builder_extrapolation_override_reaches_the_resolution() {
        let mut reference = Catalog::new(vec![Source::default()]);
        let bands = vec![BandFluxes {
            peak_flux: vec![1.0, 2.0],
            err_peak_flux: vec![0.0, 0.0],
        }];

        let gated = MatchParams::builder().target_frequency(240.0).build().unwrap();
        let err = resolve_reference_fluxes(&mut reference, &[150.0, 180.0], &bands, &gated)
            .unwrap_err();
        assert!(matches!(err, SkymatchError::FrequencyOutOfRange { .. }));

        let overridden = MatchParams::builder()
            .target_frequency(240.0)
            .extrapolate_flux(true)
            .build()
            .unwrap();
        resolve_reference_fluxes(&mut reference, &[150.0, 180.0], &bands, &overridden).unwrap();
        // Linear continuation of flux(150)=1, flux(180)=2 out to 240 MHz.
        assert_relative_eq!(reference.sources[0].peak_flux, 4.0, epsilon = 1e-12);
    }
}
