use crate::data::model::Eem;
use crate::preprocess::{PreprocessError, crop};

// ---------------------------------------------------------------------------
// Fluorescence regional integration
// ---------------------------------------------------------------------------

/// A rectangular excitation/emission region (closed wavelength ranges, nm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub emission: (f64, f64),
    pub excitation: (f64, f64),
}

/// Total fluorescence: the sum of every grid cell.
pub fn total_fluorescence(eem: &Eem) -> f64 {
    eem.intensities().iter().sum()
}

/// Fluorescence regional integration: total fluorescence of the grid cells
/// inside `region`. Fails if the region contains no grid points.
pub fn regional_integration(eem: &Eem, region: Region) -> Result<f64, PreprocessError> {
    let cropped = crop(eem, region.emission, region.excitation)?;
    Ok(total_fluorescence(&cropped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_eem() -> Eem {
        Eem::new(
            vec![300.0, 310.0, 320.0],
            vec![240.0, 250.0],
            (1..=6).map(|i| i as f64).collect(),
            BTreeMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn total_is_plain_sum() {
        assert_eq!(total_fluorescence(&sample_eem()), 21.0);
    }

    #[test]
    fn regional_integration_sums_the_region() {
        let region = Region {
            emission: (310.0, 320.0),
            excitation: (250.0, 250.0),
        };
        // cells (310, 250) = 4 and (320, 250) = 6
        assert_eq!(regional_integration(&sample_eem(), region).unwrap(), 10.0);
    }

    #[test]
    fn empty_region_is_an_error() {
        let region = Region {
            emission: (600.0, 700.0),
            excitation: (240.0, 250.0),
        };
        assert!(regional_integration(&sample_eem(), region).is_err());
    }
}
