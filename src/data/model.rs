use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors for in-memory construction and validation
// ---------------------------------------------------------------------------

/// Violations of the EEM grid invariants.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{axis} axis is empty")]
    EmptyAxis { axis: &'static str },
    #[error("{axis} axis must be strictly ascending and finite")]
    AxisNotAscending { axis: &'static str },
    #[error("intensity grid has {actual} values, expected {expected} (emission × excitation)")]
    GridLengthMismatch { expected: usize, actual: usize },
}

// ---------------------------------------------------------------------------
// MetadataValue – a single cell in a metadata column
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value attached to a measurement.
/// Using `BTreeMap` / `BTreeSet` downstream so `MetadataValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text for simplicity.
    Date(String),
    Null,
}

// -- Manual Eq/Ord so we can put MetadataValue in BTreeSet --

impl Eq for MetadataValue {}

impl PartialOrd for MetadataValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetadataValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use MetadataValue::*;
        fn discriminant(v: &MetadataValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for MetadataValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            MetadataValue::String(s) | MetadataValue::Date(s) => s.hash(state),
            MetadataValue::Integer(i) => i.hash(state),
            MetadataValue::Float(f) => f.to_bits().hash(state),
            MetadataValue::Bool(b) => b.hash(state),
            MetadataValue::Null => {}
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v:.4}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Date(d) => write!(f, "{d}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Eem – one excitation-emission matrix
// ---------------------------------------------------------------------------

/// A single Excitation-Emission Matrix: fluorescence intensity on a grid of
/// emission wavelength (rows) × excitation wavelength (columns), both in nm.
#[derive(Debug, Clone)]
pub struct Eem {
    emission: Vec<f64>,
    excitation: Vec<f64>,
    /// Row-major: `intensities[row * excitation.len() + col]`.
    intensities: Vec<f64>,
    /// Dynamic metadata columns: column_name → value.
    pub metadata: BTreeMap<String, MetadataValue>,
}

fn check_axis(axis: &[f64], name: &'static str) -> Result<(), ModelError> {
    if axis.is_empty() {
        return Err(ModelError::EmptyAxis { axis: name });
    }
    let ascending = axis.windows(2).all(|w| w[0] < w[1]);
    if !ascending || axis.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::AxisNotAscending { axis: name });
    }
    Ok(())
}

impl Eem {
    /// Build an EEM, validating the grid invariants: both axes strictly
    /// ascending and finite, intensity length matching the grid.
    pub fn new(
        emission: Vec<f64>,
        excitation: Vec<f64>,
        intensities: Vec<f64>,
        metadata: BTreeMap<String, MetadataValue>,
    ) -> Result<Self, ModelError> {
        check_axis(&emission, "emission")?;
        check_axis(&excitation, "excitation")?;
        let expected = emission.len() * excitation.len();
        if intensities.len() != expected {
            return Err(ModelError::GridLengthMismatch {
                expected,
                actual: intensities.len(),
            });
        }
        Ok(Eem {
            emission,
            excitation,
            intensities,
            metadata,
        })
    }

    /// Emission wavelength axis (rows), nm.
    pub fn emission(&self) -> &[f64] {
        &self.emission
    }

    /// Excitation wavelength axis (columns), nm.
    pub fn excitation(&self) -> &[f64] {
        &self.excitation
    }

    /// Row-major intensity grid.
    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    /// Mutable intensity grid for in-place corrections. The shape is fixed,
    /// only values change.
    pub fn intensities_mut(&mut self) -> &mut [f64] {
        &mut self.intensities
    }

    /// (rows, cols) = (emission points, excitation points).
    pub fn shape(&self) -> (usize, usize) {
        (self.emission.len(), self.excitation.len())
    }

    /// Intensity at the given emission row and excitation column.
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.intensities[row * self.excitation.len() + col]
    }
}

// ---------------------------------------------------------------------------
// AbsorbanceSpectrum – wavelength → absorbance, for inner filter correction
// ---------------------------------------------------------------------------

/// An absorbance spectrum: wavelength (nm, ascending) → absorbance (AU).
#[derive(Debug, Clone)]
pub struct AbsorbanceSpectrum {
    wavelengths: Vec<f64>,
    absorbance: Vec<f64>,
}

impl AbsorbanceSpectrum {
    pub fn new(wavelengths: Vec<f64>, absorbance: Vec<f64>) -> Result<Self, ModelError> {
        check_axis(&wavelengths, "wavelength")?;
        if absorbance.len() != wavelengths.len() {
            return Err(ModelError::GridLengthMismatch {
                expected: wavelengths.len(),
                actual: absorbance.len(),
            });
        }
        Ok(AbsorbanceSpectrum {
            wavelengths,
            absorbance,
        })
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn values(&self) -> &[f64] {
        &self.absorbance
    }

    /// Absorbance at an arbitrary wavelength, linearly interpolated between
    /// neighbouring points and clamped to the end values outside the range.
    pub fn absorbance_at(&self, wavelength: f64) -> f64 {
        interpolate(&self.wavelengths, &self.absorbance, wavelength)
    }
}

// ---------------------------------------------------------------------------
// WaterRamanSpectrum – emission scan of a water blank
// ---------------------------------------------------------------------------

/// A water Raman emission scan: emission wavelength (nm) → intensity (a.u.).
#[derive(Debug, Clone)]
pub struct WaterRamanSpectrum {
    wavelengths: Vec<f64>,
    intensity: Vec<f64>,
}

impl WaterRamanSpectrum {
    pub fn new(wavelengths: Vec<f64>, intensity: Vec<f64>) -> Result<Self, ModelError> {
        check_axis(&wavelengths, "emission")?;
        if intensity.len() != wavelengths.len() {
            return Err(ModelError::GridLengthMismatch {
                expected: wavelengths.len(),
                actual: intensity.len(),
            });
        }
        Ok(WaterRamanSpectrum {
            wavelengths,
            intensity,
        })
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensity
    }

    /// Trapezoidal area of the scan over the closed emission band
    /// `[band.0, band.1]`. Points outside the band are ignored; fewer than
    /// two points inside give an area of 0.
    pub fn area(&self, band: (f64, f64)) -> f64 {
        let points: Vec<(f64, f64)> = self
            .wavelengths
            .iter()
            .zip(&self.intensity)
            .filter(|(wl, _)| **wl >= band.0 && **wl <= band.1)
            .map(|(wl, y)| (*wl, *y))
            .collect();
        points
            .windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
            .sum()
    }
}

/// Linear interpolation on an ascending axis, clamped at both ends.
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    // partition_point: first index with xs[i] > x; xs is strictly ascending
    let hi = xs.partition_point(|&v| v <= x);
    let lo = hi - 1;
    let t = (x - xs[lo]) / (xs[hi] - xs[lo]);
    ys[lo] + t * (ys[hi] - ys[lo])
}

// ---------------------------------------------------------------------------
// EemDataset – a collection of EEMs with a metadata column index
// ---------------------------------------------------------------------------

/// A set of EEM measurements with pre-computed metadata column indices.
#[derive(Debug, Clone)]
pub struct EemDataset {
    /// All measurements.
    pub eems: Vec<Eem>,
    /// Ordered list of metadata column names.
    pub column_names: Vec<String>,
    /// For each metadata column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<MetadataValue>>,
}

impl EemDataset {
    /// Build column indices from the loaded measurements.
    pub fn from_eems(eems: Vec<Eem>) -> Self {
        let mut column_names_set: BTreeSet<String> = BTreeSet::new();
        let mut unique_values: BTreeMap<String, BTreeSet<MetadataValue>> = BTreeMap::new();

        for eem in &eems {
            for (col, val) in &eem.metadata {
                column_names_set.insert(col.clone());
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }
        let column_names: Vec<String> = column_names_set.into_iter().collect();
        EemDataset {
            eems,
            column_names,
            unique_values,
        }
    }

    /// Number of measurements.
    pub fn len(&self) -> usize {
        self.eems.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.eems.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: usize, cols: usize) -> Vec<f64> {
        (0..rows * cols).map(|i| i as f64).collect()
    }

    #[test]
    fn eem_new_validates_shape() {
        let eem = Eem::new(
            vec![300.0, 310.0, 320.0],
            vec![250.0, 260.0],
            grid(3, 2),
            BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(eem.shape(), (3, 2));
        assert_eq!(eem.value(1, 1), 3.0);
        assert_eq!(eem.value(2, 0), 4.0);
    }

    #[test]
    fn eem_new_rejects_bad_input() {
        assert!(matches!(
            Eem::new(vec![], vec![250.0], vec![], BTreeMap::new()),
            Err(ModelError::EmptyAxis { axis: "emission" })
        ));
        assert!(matches!(
            Eem::new(vec![300.0, 300.0], vec![250.0], grid(2, 1), BTreeMap::new()),
            Err(ModelError::AxisNotAscending { axis: "emission" })
        ));
        assert!(matches!(
            Eem::new(vec![300.0, 310.0], vec![250.0], grid(3, 1), BTreeMap::new()),
            Err(ModelError::GridLengthMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn absorbance_interpolates_and_clamps() {
        let abs = AbsorbanceSpectrum::new(vec![250.0, 300.0, 350.0], vec![0.1, 0.3, 0.2]).unwrap();
        assert_eq!(abs.absorbance_at(250.0), 0.1);
        assert!((abs.absorbance_at(275.0) - 0.2).abs() < 1e-12);
        assert!((abs.absorbance_at(325.0) - 0.25).abs() < 1e-12);
        // outside the measured range → clamped
        assert_eq!(abs.absorbance_at(200.0), 0.1);
        assert_eq!(abs.absorbance_at(400.0), 0.2);
    }

    #[test]
    fn raman_area_is_trapezoidal() {
        let raman = WaterRamanSpectrum::new(
            vec![370.0, 380.0, 390.0, 400.0],
            vec![0.0, 2.0, 2.0, 0.0],
        )
        .unwrap();
        // (0+2)/2*10 + (2+2)/2*10 + (2+0)/2*10
        assert!((raman.area((370.0, 400.0)) - 40.0).abs() < 1e-12);
        // band restriction drops the outer trapezoids
        assert!((raman.area((380.0, 390.0)) - 20.0).abs() < 1e-12);
        // degenerate band
        assert_eq!(raman.area((500.0, 600.0)), 0.0);
    }

    #[test]
    fn dataset_indexes_metadata_columns() {
        let mut m1 = BTreeMap::new();
        m1.insert("sample".to_string(), MetadataValue::String("A".into()));
        m1.insert("dilution".to_string(), MetadataValue::Float(1.0));
        let mut m2 = BTreeMap::new();
        m2.insert("sample".to_string(), MetadataValue::String("B".into()));

        let e1 = Eem::new(vec![300.0, 310.0], vec![250.0], grid(2, 1), m1).unwrap();
        let e2 = Eem::new(vec![300.0, 310.0], vec![250.0], grid(2, 1), m2).unwrap();
        let ds = EemDataset::from_eems(vec![e1, e2]);

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.column_names, vec!["dilution", "sample"]);
        assert_eq!(ds.unique_values["sample"].len(), 2);
    }
}
