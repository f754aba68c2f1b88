//! Tube energy spectra.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Allowed deviation of the summed relative intensities from 1.
pub const INTENSITY_SUM_TOLERANCE: f32 = 1e-3;

/// Ordered `(energy in eV, relative intensity)` bins of an X-ray tube spectrum.
///
/// Energies are strictly increasing, intensities are non-negative and sum to 1.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<(f32, f32)>", into = "Vec<(f32, f32)>")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    energies: Vec<f32>,
    intensities: Vec<f32>,
}

impl Spectrum {
    pub fn new(energies: Vec<f32>, intensities: Vec<f32>) -> Result<Self> {
        if energies.len() != intensities.len() {
            return Err(Error::Validation(format!(
                "spectrum has {} energies but {} intensities",
                energies.len(),
                intensities.len()
            )));
        }
        if energies.is_empty() {
            return Err(Error::Validation("spectrum has no bins".into()));
        }
        if energies.iter().chain(&intensities).any(|v| !v.is_finite()) {
            return Err(Error::Validation("spectrum contains non-finite values".into()));
        }
        if energies.iter().any(|e| *e < 0.0) {
            return Err(Error::Validation("spectrum energies must be >= 0".into()));
        }
        if let Some(w) = energies.windows(2).find(|w| w[1] <= w[0]) {
            return Err(Error::Validation(format!(
                "spectrum energies must be strictly increasing, found {} after {}",
                w[1], w[0]
            )));
        }
        if let Some(i) = intensities.iter().find(|i| **i < 0.0) {
            return Err(Error::Validation(format!(
                "spectrum intensity {i} is negative"
            )));
        }
        let sum: f64 = intensities.iter().map(|i| *i as f64).sum();
        if (sum - 1.0).abs() > INTENSITY_SUM_TOLERANCE as f64 {
            return Err(Error::Validation(format!(
                "spectrum intensities sum to {sum}, expected 1"
            )));
        }
        Ok(Self {
            energies,
            intensities,
        })
    }

    pub fn from_pairs(bins: &[(f32, f32)]) -> Result<Self> {
        let (energies, intensities) = bins.iter().copied().unzip();
        Self::new(energies, intensities)
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    pub fn energies(&self) -> &[f32] {
        &self.energies
    }

    pub fn intensities(&self) -> &[f32] {
        &self.intensities
    }

    /// Energy step between the first two bins; `0` for single-bin spectra.
    pub fn bin_width(&self) -> f32 {
        match self.energies.as_slice() {
            [first, second, ..] => second - first,
            _ => 0.0,
        }
    }

    /// Highest binned energy.
    pub fn max_energy_ev(&self) -> f32 {
        self.energies.last().copied().unwrap_or(0.0)
    }

    pub fn pairs(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.energies
            .iter()
            .copied()
            .zip(self.intensities.iter().copied())
    }
}

impl TryFrom<Vec<(f32, f32)>> for Spectrum {
    type Error = Error;

    fn try_from(bins: Vec<(f32, f32)>) -> Result<Self> {
        Self::from_pairs(&bins)
    }
}

impl From<Spectrum> for Vec<(f32, f32)> {
    fn from(spectrum: Spectrum) -> Self {
        spectrum.pairs().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(n: usize, step: f32) -> Spectrum {
        let energies = (0..n).map(|i| i as f32 * step).collect();
        let intensities = vec![1.0 / n as f32; n];
        Spectrum::new(energies, intensities).unwrap()
    }

    #[test]
    fn derived_quantities() {
        let s = uniform(10, 1000.0);
        assert_eq!(s.len(), 10);
        assert_eq!(s.bin_width(), 1000.0);
        assert_eq!(s.max_energy_ev(), 9000.0);
        assert_eq!(s.pairs().nth(2), Some((2000.0, 0.1)));
    }

    #[test]
    fn intensities_must_sum_to_one() {
        assert!(Spectrum::from_pairs(&[(1.0, 0.5), (2.0, 0.5)]).is_ok());
        assert!(Spectrum::from_pairs(&[(1.0, 0.5), (2.0, 0.5004)]).is_ok());
        assert!(matches!(
            Spectrum::from_pairs(&[(1.0, 0.5), (2.0, 0.6)]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn rejects_negative_and_unordered_bins() {
        assert!(Spectrum::from_pairs(&[(1.0, 1.2), (2.0, -0.2)]).is_err());
        assert!(Spectrum::from_pairs(&[(2.0, 0.5), (1.0, 0.5)]).is_err());
        assert!(Spectrum::from_pairs(&[(1.0, 0.5), (1.0, 0.5)]).is_err());
        assert!(Spectrum::from_pairs(&[]).is_err());
        assert!(Spectrum::new(vec![1.0], vec![0.5, 0.5]).is_err());
    }

    #[test]
    fn single_bin_has_no_width() {
        let s = Spectrum::from_pairs(&[(5000.0, 1.0)]).unwrap();
        assert_eq!(s.bin_width(), 0.0);
    }
}
