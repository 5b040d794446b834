use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::data::model::{AbsorbanceSpectrum, Eem, MetadataValue, WaterRamanSpectrum};

// ---------------------------------------------------------------------------
// Instrument description
// ---------------------------------------------------------------------------

/// The Agilent Cary Eclipse fluorescence spectrophotometer.
#[derive(Debug, Clone)]
pub struct CaryEclipse {
    /// Model name of the concrete instrument.
    pub model: String,
    /// Optional serial number.
    pub serial_number: Option<String>,
}

impl CaryEclipse {
    pub const MANUFACTURER: &'static str = "Agilent";
    pub const NAME: &'static str = "cary_eclipse";
    pub const SUPPORTED_MODELS: &'static [&'static str] = &["Cary Eclipse"];

    pub fn new(model: impl Into<String>, serial_number: Option<String>) -> Self {
        CaryEclipse {
            model: model.into(),
            serial_number,
        }
    }

    /// Load an Excitation-Emission Matrix from the instrument's 3D scan CSV.
    pub fn load_eem(path: &Path) -> Result<Eem> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening EEM file {}", path.display()))?;
        parse_eem(file).with_context(|| format!("parsing EEM file {}", path.display()))
    }

    /// Load an absorbance spectrum from the instrument's scan CSV.
    pub fn load_absorbance(path: &Path) -> Result<AbsorbanceSpectrum> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening absorbance file {}", path.display()))?;
        parse_absorbance(file)
            .with_context(|| format!("parsing absorbance file {}", path.display()))
    }

    /// Load a water Raman emission scan from the instrument's scan CSV.
    pub fn load_water_raman(path: &Path) -> Result<WaterRamanSpectrum> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening water Raman file {}", path.display()))?;
        parse_water_raman(file)
            .with_context(|| format!("parsing water Raman file {}", path.display()))
    }

    /// Stamp the instrument identity into a measurement's metadata, so a
    /// dataset built from several instruments stays traceable.
    pub fn annotate(&self, eem: &mut Eem) {
        eem.metadata.insert(
            "instrument".to_string(),
            MetadataValue::String(Self::NAME.to_string()),
        );
        eem.metadata.insert(
            "instrument_model".to_string(),
            MetadataValue::String(self.model.clone()),
        );
        eem.metadata.insert(
            "instrument_sn".to_string(),
            match &self.serial_number {
                Some(sn) => MetadataValue::String(sn.clone()),
                None => MetadataValue::Null,
            },
        );
    }

    /// Instrument-specific spectral correction factors. The export format for
    /// these is not supported yet.
    pub fn load_spectral_corrections(_path: &Path) -> Result<()> {
        bail!("spectral correction files are not supported for the Cary Eclipse")
    }
}

// ---------------------------------------------------------------------------
// EEM parser
// ---------------------------------------------------------------------------

/// Layout of the 3D scan export:
///
/// * Header row: one column *pair* per excitation scan. The first column of a
///   pair is an emission-wavelength column named `"<sample>_EX_<λ>"` (the
///   excitation wavelength is the suffix after the final `_`); the second is
///   the matching intensity column.
/// * Second row repeats `"Wavelength (nm)", "Intensity (a.u.)"` and is skipped.
/// * After the numeric block the file carries per-scan metadata text; those
///   rows fail numeric parsing of the first column and are dropped, as are
///   fully empty rows.
///
/// The shared emission axis is taken from the first scan's wavelength column.
fn parse_eem<R: Read>(reader: R) -> Result<Eem> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    // Pair up (wavelength column, intensity column) and pull the excitation
    // wavelength out of the wavelength-column header.
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    let mut idx = 0;
    while idx + 1 < headers.len() {
        let wl_header = &headers[idx];
        if wl_header.is_empty() {
            break; // trailing empty columns
        }
        if !wl_header.contains("_EX_") {
            bail!("column {idx}: header '{wl_header}' is not an excitation scan column");
        }
        let suffix = wl_header.rsplit('_').next().unwrap_or("");
        let ex_wl: f64 = suffix
            .parse()
            .with_context(|| format!("column {idx}: '{suffix}' is not an excitation wavelength"))?;
        pairs.push((idx, idx + 1, ex_wl));
        idx += 2;
    }
    // A leftover non-empty header means a truncated export, not a narrower scan.
    if idx < headers.len() && !headers[idx].is_empty() {
        bail!(
            "column {idx}: scan column '{}' has no matching intensity column",
            headers[idx]
        );
    }
    if pairs.is_empty() {
        bail!("no excitation scan column pairs found");
    }

    // Collect the numeric block: one (emission wavelength, intensities) row
    // per record whose first cell parses as a number.
    let mut rows: Vec<(f64, Vec<f64>)> = Vec::new();
    let mut dropped = 0usize;
    for (rec_no, result) in csv.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {rec_no}"))?;
        if rec_no == 0 {
            continue; // units row: "Wavelength (nm)", "Intensity (a.u.)", ...
        }
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let em_wl: f64 = match record.get(0).unwrap_or("").trim().parse() {
            Ok(v) => v,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        let intensities: Vec<f64> = pairs
            .iter()
            .map(|&(_, int_idx, _)| {
                record
                    .get(int_idx)
                    .unwrap_or("")
                    .trim()
                    .parse()
                    .unwrap_or(f64::NAN)
            })
            .collect();
        rows.push((em_wl, intensities));
    }
    if dropped > 0 {
        log::debug!("dropped {dropped} metadata rows below the EEM block");
    }
    if rows.is_empty() {
        bail!("no numeric data rows found");
    }

    // The export may list scans in either direction; the grid is ascending.
    let mut col_order: Vec<usize> = (0..pairs.len()).collect();
    col_order.sort_by(|&a, &b| pairs[a].2.total_cmp(&pairs[b].2));
    rows.sort_by(|a, b| a.0.total_cmp(&b.0));

    let emission: Vec<f64> = rows.iter().map(|(wl, _)| *wl).collect();
    let excitation: Vec<f64> = col_order.iter().map(|&i| pairs[i].2).collect();
    let mut intensities = Vec::with_capacity(emission.len() * excitation.len());
    for (_, row) in &rows {
        for &i in &col_order {
            intensities.push(row[i]);
        }
    }

    Eem::new(emission, excitation, intensities, BTreeMap::new())
        .context("assembling EEM grid")
}

// ---------------------------------------------------------------------------
// Absorbance / water Raman parsers
// ---------------------------------------------------------------------------

/// Read a two-column scan export. The first file line is a title and is
/// skipped; the second line carries the column headers. The numeric block ends
/// at the first row whose value cell is empty or non-numeric; the instrument
/// leaves a dangling partially-written row just before that point, which is
/// dropped as well. Returns (x, y) pairs in file order.
fn parse_two_column_scan<R: Read>(
    reader: R,
    x_col: &str,
    y_col: &str,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut buf = BufReader::new(reader);
    let mut title = String::new();
    buf.read_line(&mut title).context("reading title line")?;

    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(buf);
    let headers: Vec<String> = csv
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let x_idx = headers
        .iter()
        .position(|h| h == x_col)
        .with_context(|| format!("missing '{x_col}' column"))?;
    let y_idx = headers
        .iter()
        .position(|h| h == y_col)
        .with_context(|| format!("missing '{y_col}' column"))?;

    let mut cells: Vec<(String, String)> = Vec::new();
    for (rec_no, result) in csv.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {rec_no}"))?;
        cells.push((
            record.get(x_idx).unwrap_or("").trim().to_string(),
            record.get(y_idx).unwrap_or("").trim().to_string(),
        ));
    }

    let first_bad = cells.iter().position(|(_, y)| y.parse::<f64>().is_err());
    if let Some(k) = first_bad {
        cells.truncate(k.saturating_sub(1));
    }
    if cells.is_empty() {
        bail!("no numeric data rows found");
    }

    let mut xs = Vec::with_capacity(cells.len());
    let mut ys = Vec::with_capacity(cells.len());
    for (row_no, (x, y)) in cells.iter().enumerate() {
        let x: f64 = x
            .parse()
            .with_context(|| format!("row {row_no}: '{x}' is not a wavelength"))?;
        let y: f64 = y
            .parse()
            .with_context(|| format!("row {row_no}: '{y}' is not a number"))?;
        xs.push(x);
        ys.push(y);
    }
    Ok((xs, ys))
}

/// Reorder (wavelength, value) pairs ascending by wavelength. The instrument
/// may export scans in either direction; the spectrum types want ascending.
fn sort_by_wavelength(wavelengths: Vec<f64>, values: Vec<f64>) -> (Vec<f64>, Vec<f64>) {
    let mut order: Vec<usize> = (0..wavelengths.len()).collect();
    order.sort_by(|&a, &b| wavelengths[a].total_cmp(&wavelengths[b]));
    (
        order.iter().map(|&i| wavelengths[i]).collect(),
        order.iter().map(|&i| values[i]).collect(),
    )
}

fn parse_absorbance<R: Read>(reader: R) -> Result<AbsorbanceSpectrum> {
    let (wavelengths, absorbance) = parse_two_column_scan(reader, "Wavelength (nm)", "Abs")?;
    let (wavelengths, absorbance) = sort_by_wavelength(wavelengths, absorbance);
    AbsorbanceSpectrum::new(wavelengths, absorbance).context("assembling absorbance spectrum")
}

fn parse_water_raman<R: Read>(reader: R) -> Result<WaterRamanSpectrum> {
    let (wavelengths, intensity) =
        parse_two_column_scan(reader, "Wavelength (nm)", "Intensity (a.u.)")?;
    let (wavelengths, intensity) = sort_by_wavelength(wavelengths, intensity);
    WaterRamanSpectrum::new(wavelengths, intensity).context("assembling water Raman spectrum")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const EEM_CSV: &str = "\
S1_EX_250.0,S1_EM_250.0,S1_EX_260.0,S1_EM_260.0
Wavelength (nm),Intensity (a.u.),Wavelength (nm),Intensity (a.u.)
300.0,1.0,300.0,2.0
310.0,3.0,310.0,4.0
320.0,5.0,320.0,6.0
,,,
Scan rate (nm/min) 600.00,,,
Averaging time (s) 0.1,,,
";

    #[test]
    fn eem_parses_paired_scan_columns() {
        let eem = parse_eem(EEM_CSV.as_bytes()).unwrap();
        assert_eq!(eem.emission(), &[300.0, 310.0, 320.0]);
        assert_eq!(eem.excitation(), &[250.0, 260.0]);
        assert_eq!(eem.value(0, 0), 1.0);
        assert_eq!(eem.value(0, 1), 2.0);
        assert_eq!(eem.value(2, 1), 6.0);
    }

    #[test]
    fn eem_sorts_descending_scans() {
        let csv = "\
S1_EX_260.0,S1_EM_260.0,S1_EX_250.0,S1_EM_250.0
Wavelength (nm),Intensity (a.u.),Wavelength (nm),Intensity (a.u.)
310.0,4.0,310.0,3.0
300.0,2.0,300.0,1.0
";
        let eem = parse_eem(csv.as_bytes()).unwrap();
        assert_eq!(eem.emission(), &[300.0, 310.0]);
        assert_eq!(eem.excitation(), &[250.0, 260.0]);
        assert_eq!(eem.value(0, 0), 1.0);
        assert_eq!(eem.value(1, 1), 4.0);
    }

    #[test]
    fn eem_rejects_unpaired_scan_column() {
        let csv = "\
S1_EX_250.0,S1_EM_250.0,S1_EX_260.0
Wavelength (nm),Intensity (a.u.),Wavelength (nm)
300.0,1.0,300.0
310.0,3.0,310.0
";
        let err = parse_eem(csv.as_bytes()).unwrap_err();
        assert!(format!("{err}").contains("no matching intensity column"));
    }

    #[test]
    fn eem_rejects_non_scan_headers() {
        let csv = "\
whatever,S1_EM_250.0
Wavelength (nm),Intensity (a.u.)
300.0,1.0
";
        assert!(parse_eem(csv.as_bytes()).is_err());
    }

    #[test]
    fn absorbance_truncates_at_metadata_block() {
        let csv = "\
Sample 1 absorbance
Wavelength (nm),Abs
240.0,0.5
230.0,0.4
220.0,0.3
210.0,
Scan settings,
";
        let abs = parse_absorbance(csv.as_bytes()).unwrap();
        // truncated one row short of the first blank value, sorted ascending
        assert_eq!(abs.wavelengths(), &[230.0, 240.0]);
        assert_eq!(abs.values(), &[0.4, 0.5]);
    }

    #[test]
    fn water_raman_parses_clean_file() {
        let csv = "\
Water Raman scan
Wavelength (nm),Intensity (a.u.)
370.0,0.1
371.0,0.4
372.0,0.2
";
        let raman = parse_water_raman(csv.as_bytes()).unwrap();
        assert_eq!(raman.wavelengths(), &[370.0, 371.0, 372.0]);
        assert_eq!(raman.intensities(), &[0.1, 0.4, 0.2]);
    }

    #[test]
    fn water_raman_sorts_descending_scan() {
        let csv = "\
Water Raman scan
Wavelength (nm),Intensity (a.u.)
400.0,0.0
390.0,1.0
380.0,1.0
370.0,0.0
";
        let raman = parse_water_raman(csv.as_bytes()).unwrap();
        assert_eq!(raman.wavelengths(), &[370.0, 380.0, 390.0, 400.0]);
        assert_eq!(raman.intensities(), &[0.0, 1.0, 1.0, 0.0]);
        assert!((raman.area((370.0, 400.0)) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn annotate_stamps_instrument_identity() {
        let instrument = CaryEclipse::new("Cary Eclipse", Some("EL07".to_string()));
        assert!(CaryEclipse::SUPPORTED_MODELS.contains(&instrument.model.as_str()));

        let mut eem = parse_eem(EEM_CSV.as_bytes()).unwrap();
        instrument.annotate(&mut eem);
        assert_eq!(
            eem.metadata.get("instrument"),
            Some(&MetadataValue::String(CaryEclipse::NAME.to_string()))
        );
        assert_eq!(
            eem.metadata.get("instrument_model"),
            Some(&MetadataValue::String("Cary Eclipse".to_string()))
        );
        assert_eq!(
            eem.metadata.get("instrument_sn"),
            Some(&MetadataValue::String("EL07".to_string()))
        );
    }

    #[test]
    fn spectral_corrections_are_unsupported() {
        assert!(CaryEclipse::load_spectral_corrections(Path::new("x.csv")).is_err());
    }
}
