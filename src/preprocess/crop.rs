use crate::data::model::Eem;

use super::correction::PreprocessError;

// ---------------------------------------------------------------------------
// Wavelength-range cropping
// ---------------------------------------------------------------------------

/// Restrict both axes to the given closed wavelength ranges (nm).
/// Metadata is carried over unchanged.
pub fn crop(
    eem: &Eem,
    emission_range: (f64, f64),
    excitation_range: (f64, f64),
) -> Result<Eem, PreprocessError> {
    let rows = axis_indices(eem.emission(), emission_range);
    let cols = axis_indices(eem.excitation(), excitation_range);
    if rows.is_empty() || cols.is_empty() {
        return Err(PreprocessError::EmptyRegion {
            emission: emission_range,
            excitation: excitation_range,
        });
    }

    let emission: Vec<f64> = rows.iter().map(|&r| eem.emission()[r]).collect();
    let excitation: Vec<f64> = cols.iter().map(|&c| eem.excitation()[c]).collect();
    let mut intensities = Vec::with_capacity(rows.len() * cols.len());
    for &r in &rows {
        for &c in &cols {
            intensities.push(eem.value(r, c));
        }
    }

    // Sub-ranges of a valid grid stay valid.
    Ok(Eem::new(emission, excitation, intensities, eem.metadata.clone())
        .expect("cropped grid keeps the axis invariants"))
}

/// Restrict only the emission axis.
pub fn crop_emission(eem: &Eem, range: (f64, f64)) -> Result<Eem, PreprocessError> {
    let full = (eem.excitation()[0], eem.excitation()[eem.excitation().len() - 1]);
    crop(eem, range, full)
}

/// Restrict only the excitation axis.
pub fn crop_excitation(eem: &Eem, range: (f64, f64)) -> Result<Eem, PreprocessError> {
    let full = (eem.emission()[0], eem.emission()[eem.emission().len() - 1]);
    crop(eem, full, range)
}

/// Indices of axis points inside the closed range.
fn axis_indices(axis: &[f64], range: (f64, f64)) -> Vec<usize> {
    axis.iter()
        .enumerate()
        .filter(|(_, wl)| **wl >= range.0 && **wl <= range.1)
        .map(|(i, _)| i)
        .collect()
}
