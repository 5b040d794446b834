use thiserror::Error;

use crate::data::model::{AbsorbanceSpectrum, Eem, WaterRamanSpectrum};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("grid mismatch: sample is {sample:?}, blank is {blank:?}")]
    GridMismatch {
        sample: (usize, usize),
        blank: (usize, usize),
    },
    #[error("no grid points inside emission {emission:?} / excitation {excitation:?}")]
    EmptyRegion {
        emission: (f64, f64),
        excitation: (f64, f64),
    },
    #[error("water Raman area over {band:?} is {area}, must be positive")]
    NonPositiveRamanArea { band: (f64, f64), area: f64 },
}

// ---------------------------------------------------------------------------
// Blank subtraction
// ---------------------------------------------------------------------------

/// Subtract a blank EEM measured on the same grid, in place.
pub fn subtract_blank(sample: &mut Eem, blank: &Eem) -> Result<(), PreprocessError> {
    if sample.emission() != blank.emission() || sample.excitation() != blank.excitation() {
        return Err(PreprocessError::GridMismatch {
            sample: sample.shape(),
            blank: blank.shape(),
        });
    }
    for (s, b) in sample.intensities_mut().iter_mut().zip(blank.intensities()) {
        *s -= b;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Raman normalization
// ---------------------------------------------------------------------------

/// Divide all intensities by the water Raman peak area over the given
/// emission band (nm), putting the EEM in Raman Units.
pub fn raman_normalize(
    eem: &mut Eem,
    raman: &WaterRamanSpectrum,
    band: (f64, f64),
) -> Result<(), PreprocessError> {
    let area = raman.area(band);
    if !(area > 0.0) {
        return Err(PreprocessError::NonPositiveRamanArea { band, area });
    }
    for v in eem.intensities_mut() {
        *v /= area;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Inner filter effect correction
// ---------------------------------------------------------------------------

/// Absorbance-based inner filter effect correction, in place.
///
/// Each cell at (emission λ_em, excitation λ_ex) is multiplied by
/// `10^((A(λ_ex) + A(λ_em)) / 2)` with `A` linearly interpolated from the
/// absorbance spectrum (clamped outside its measured range).
pub fn inner_filter_correction(eem: &mut Eem, absorbance: &AbsorbanceSpectrum) {
    let a_ex: Vec<f64> = eem
        .excitation()
        .iter()
        .map(|&wl| absorbance.absorbance_at(wl))
        .collect();
    let a_em: Vec<f64> = eem
        .emission()
        .iter()
        .map(|&wl| absorbance.absorbance_at(wl))
        .collect();

    let cols = eem.excitation().len();
    for (i, v) in eem.intensities_mut().iter_mut().enumerate() {
        let factor = 10f64.powf((a_ex[i % cols] + a_em[i / cols]) / 2.0);
        *v *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn uniform_eem(value: f64) -> Eem {
        Eem::new(
            vec![300.0, 310.0],
            vec![250.0, 260.0],
            vec![value; 4],
            BTreeMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn blank_subtraction_is_elementwise() {
        let mut sample = Eem::new(
            vec![300.0, 310.0],
            vec![250.0, 260.0],
            vec![5.0, 6.0, 7.0, 8.0],
            BTreeMap::new(),
        )
        .unwrap();
        let blank = uniform_eem(1.0);
        subtract_blank(&mut sample, &blank).unwrap();
        assert_eq!(sample.intensities(), &[4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn blank_subtraction_rejects_other_grid() {
        let mut sample = uniform_eem(5.0);
        let blank = Eem::new(
            vec![300.0, 310.0, 320.0],
            vec![250.0, 260.0],
            vec![1.0; 6],
            BTreeMap::new(),
        )
        .unwrap();
        assert!(matches!(
            subtract_blank(&mut sample, &blank),
            Err(PreprocessError::GridMismatch { .. })
        ));
    }

    #[test]
    fn raman_normalization_divides_by_band_area() {
        let mut eem = uniform_eem(10.0);
        let raman =
            WaterRamanSpectrum::new(vec![370.0, 380.0, 390.0], vec![0.0, 4.0, 0.0]).unwrap();
        // trapezoidal area over the full scan: 40
        raman_normalize(&mut eem, &raman, (370.0, 390.0)).unwrap();
        assert_eq!(eem.intensities(), &[0.25; 4]);
    }

    #[test]
    fn raman_normalization_rejects_empty_band() {
        let mut eem = uniform_eem(10.0);
        let raman =
            WaterRamanSpectrum::new(vec![370.0, 380.0, 390.0], vec![0.0, 4.0, 0.0]).unwrap();
        assert!(matches!(
            raman_normalize(&mut eem, &raman, (500.0, 600.0)),
            Err(PreprocessError::NonPositiveRamanArea { .. })
        ));
    }

    #[test]
    fn inner_filter_scales_by_summed_absorbance() {
        let mut eem = uniform_eem(1.0);
        // flat absorbance of 1.0 everywhere → factor 10^((1+1)/2) = 10
        let abs = AbsorbanceSpectrum::new(vec![200.0, 400.0], vec![1.0, 1.0]).unwrap();
        inner_filter_correction(&mut eem, &abs);
        for v in eem.intensities() {
            assert!((v - 10.0).abs() < 1e-12);
        }
    }

    #[test]
    fn inner_filter_uses_both_wavelengths() {
        let mut eem = uniform_eem(1.0);
        // A rises linearly from 0 at 250 nm to 0.62 at 310 nm
        let abs = AbsorbanceSpectrum::new(vec![250.0, 310.0], vec![0.0, 0.62]).unwrap();
        inner_filter_correction(&mut eem, &abs);
        // cell (em 300, ex 250): A_ex = 0, A_em ≈ 0.5166...
        let a_em = 0.62 * (300.0 - 250.0) / 60.0;
        let expected = 10f64.powf(a_em / 2.0);
        assert!((eem.value(0, 0) - expected).abs() < 1e-9);
        // cell (em 310, ex 260) has a larger factor than (em 300, ex 250)
        assert!(eem.value(1, 1) > eem.value(0, 0));
    }
}
