//! # Canonical catalogues and source records
//!
//! This module defines the fixed-field [`Source`] record shared by target and
//! reference catalogues, the [`Catalog`] container, and its sub-modules:
//!
//! 1. [`normalize`] — right-ascension wrap handling and uncertainty validation.
//! 2. [`frequency`] — resolution of multi-frequency reference fluxes to the
//!    target observing frequency.
//! 3. [`prefilter`] — bounding-box pre-filter of the reference catalogue.
//!
//! Column-name translation for specific survey conventions is **not** handled
//! here: external collaborators must deliver data already mapped onto the
//! canonical schema, with absent optional columns filled with zero.

pub mod frequency;
pub mod normalize;
pub mod prefilter;

use serde::{Deserialize, Serialize};

use crate::constants::{ArcSec, Degree, Jansky, ARCSEC_PER_DEGREE};

/// Which of the two input catalogues a value or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogRole {
    /// The catalogue being corrected and matched.
    Target,
    /// The trusted catalogue sources are matched against.
    Reference,
}

impl std::fmt::Display for CatalogRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogRole::Target => write!(f, "target"),
            CatalogRole::Reference => write!(f, "reference"),
        }
    }
}

/// One row of a canonical catalogue.
///
/// Optional columns absent from the survey data are expected to be filled with
/// zero by the upstream schema mapping; the uncertainty model then falls back
/// on the remaining non-zero terms (beam size for position, local rms for
/// flux).
///
/// Fields
/// -----------------
/// * `ra`, `dec` – source position in degrees.
/// * `err_ra`, `err_dec` – positional measurement uncertainties in degrees.
/// * `psf_a`, `psf_b` – beam/point-spread-function semimajor/semiminor axes in arcseconds.
/// * `a`, `b`, `pa` – fitted source shape (semimajor, semiminor in arcseconds, position angle in degrees).
/// * `peak_flux`, `err_peak_flux` – peak flux density and its uncertainty in Jansky.
/// * `int_flux` – integrated flux density in Jansky.
/// * `local_rms` – local background noise in Jansky.
/// * `uuid` – unique identifier of the source within its catalogue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub ra: Degree,
    pub dec: Degree,
    pub err_ra: Degree,
    pub err_dec: Degree,
    pub psf_a: ArcSec,
    pub psf_b: ArcSec,
    pub a: ArcSec,
    pub b: ArcSec,
    pub pa: Degree,
    pub peak_flux: Jansky,
    pub err_peak_flux: Jansky,
    pub int_flux: Jansky,
    pub local_rms: Jansky,
    pub uuid: String,
}

impl Source {
    /// Signal-to-noise ratio of the source, `peak_flux / local_rms`.
    ///
    /// Returns infinity when the local rms is zero, so sources without a noise
    /// estimate always pass SNR cutoffs rather than being silently dropped.
    pub fn snr(&self) -> f64 {
        if self.local_rms == 0.0 {
            f64::INFINITY
        } else {
            self.peak_flux / self.local_rms
        }
    }

    /// Positional uncertainty of this source in degrees: quadrature sum of the
    /// beam-size proxy (`psf_a`, converted from arcseconds) and the larger of
    /// the two measurement errors.
    ///
    /// When the measurement errors are absent (zero-filled), the beam term
    /// alone survives; the reverse holds for catalogues without beam columns.
    pub fn position_sigma(&self) -> Degree {
        let resolution = self.psf_a / ARCSEC_PER_DEGREE;
        let measurement = self.err_ra.max(self.err_dec);
        (resolution * resolution + measurement * measurement).sqrt()
    }

    /// Flux uncertainty of this source in Jansky: quadrature sum of the local
    /// background noise and the peak-flux measurement error.
    pub fn flux_sigma(&self) -> Jansky {
        (self.local_rms * self.local_rms + self.err_peak_flux * self.err_peak_flux).sqrt()
    }
}

/// An owned collection of canonical sources.
///
/// The matching engine never mutates a catalogue in place during a round;
/// pools are partitioned into fresh snapshots at round boundaries instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub sources: Vec<Source>,
}

impl Catalog {
    pub fn new(sources: Vec<Source>) -> Self {
        Catalog { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Source> {
        self.sources.iter()
    }

    /// Look up a source by its unique identifier.
    pub fn find_by_uuid(&self, uuid: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.uuid == uuid)
    }

    /// Bounding box of the catalogue as `(ra_min, ra_max, dec_min, dec_max)`,
    /// or `None` when the catalogue is empty.
    pub fn bounding_box(&self) -> Option<(Degree, Degree, Degree, Degree)> {
        let first = self.sources.first()?;
        let mut bbox = (first.ra, first.ra, first.dec, first.dec);
        for s in &self.sources[1..] {
            bbox.0 = bbox.0.min(s.ra);
            bbox.1 = bbox.1.max(s.ra);
            bbox.2 = bbox.2.min(s.dec);
            bbox.3 = bbox.3.max(s.dec);
        }
        Some(bbox)
    }
}

impl From<Vec<Source>> for Catalog {
    fn from(sources: Vec<Source>) -> Self {
        Catalog { sources }
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Source;
    type IntoIter = std::slice::Iter<'a, Source>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn source(ra: Degree, dec: Degree) -> Source {
        Source {
            ra,
            dec,
            uuid: format!("{ra}-{dec}"),
            ..Default::default()
        }
    }

    #[test]
    fn snr_without_noise_estimate_is_infinite() {
        let s = Source {
            peak_flux: 1.0,
            ..Default::default()
        };
        assert!(s.snr().is_infinite());
    }

    #[test]
    fn position_sigma_combines_beam_and_measurement_in_quadrature() {
        let s = Source {
            psf_a: 36.0, // 0.01 deg
            err_ra: 0.02,
            err_dec: 0.01,
            ..Default::default()
        };
        // max(err_ra, err_dec) = 0.02, beam proxy = 0.01
        assert_relative_eq!(s.position_sigma(), (0.0004f64 + 0.0001).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn position_sigma_falls_back_to_beam_when_errors_absent() {
        let s = Source {
            psf_a: 72.0,
            ..Default::default()
        };
        assert_relative_eq!(s.position_sigma(), 0.02, epsilon = 1e-12);
    }

    #[test]
    fn bounding_box_spans_all_sources() {
        let cat = Catalog::new(vec![source(10.0, -5.0), source(12.0, -2.0), source(11.0, -7.0)]);
        assert_eq!(cat.bounding_box(), Some((10.0, 12.0, -7.0, -2.0)));
        assert_eq!(Catalog::default().bounding_box(), None);
    }

    #[test]
    fn find_by_uuid_returns_the_matching_source() {
        let cat = Catalog::new(vec![source(10.0, -5.0), source(12.0, -2.0)]);
        assert_eq!(cat.find_by_uuid("12--2").map(|s| s.ra), Some(12.0));
        assert!(cat.find_by_uuid("missing").is_none());
    }
}
