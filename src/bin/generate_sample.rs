use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use rusty_eem::data::writer::save_parquet;
use rusty_eem::{CaryEclipse, Eem, EemDataset, MetadataValue};

/// One fluorophore: a 2-D Gaussian peak on the (emission, excitation) grid.
struct Peak {
    em_center: f64,
    em_width: f64,
    ex_center: f64,
    ex_width: f64,
    amplitude: f64,
}

fn gaussian_2d(em: f64, ex: f64, peak: &Peak) -> f64 {
    let de = (em - peak.em_center).powi(2) / (2.0 * peak.em_width.powi(2));
    let dx = (ex - peak.ex_center).powi(2) / (2.0 * peak.ex_width.powi(2));
    peak.amplitude * (-(de + dx)).exp()
}

fn generate_grid(
    emission: &[f64],
    excitation: &[f64],
    peaks: &[Peak],
    noise_level: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    let mut grid = Vec::with_capacity(emission.len() * excitation.len());
    for &em in emission {
        for &ex in excitation {
            let signal: f64 = peaks.iter().map(|p| gaussian_2d(em, ex, p)).sum();
            grid.push(signal + rng.gauss(0.0, noise_level));
        }
    }
    grid
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Render an EEM in the Cary Eclipse 3D scan export layout: one
/// (wavelength, intensity) column pair per excitation scan, a units row,
/// and a metadata block after the numeric rows.
fn write_cary_eclipse_csv(eem: &Eem, sample: &str, path: &Path) -> Result<()> {
    let mut out = String::new();

    let mut header = Vec::new();
    for ex in eem.excitation() {
        header.push(format!("{sample}_EX_{ex:.1}"));
        header.push(format!("{sample}_{ex:.1}"));
    }
    writeln!(out, "{}", header.join(","))?;

    let units: Vec<&str> = eem
        .excitation()
        .iter()
        .flat_map(|_| ["Wavelength (nm)", "Intensity (a.u.)"])
        .collect();
    writeln!(out, "{}", units.join(","))?;

    for (row, &em) in eem.emission().iter().enumerate() {
        let cells: Vec<String> = (0..eem.excitation().len())
            .flat_map(|col| [format!("{em:.1}"), format!("{:.6}", eem.value(row, col))])
            .collect();
        writeln!(out, "{}", cells.join(","))?;
    }

    // metadata block the instrument appends after the grid
    let blanks = ",".repeat(eem.excitation().len() * 2 - 1);
    writeln!(out, "{blanks}")?;
    writeln!(out, "Scan rate (nm/min) 600.00{blanks}")?;
    writeln!(out, "Averaging time (s) 0.1{blanks}")?;

    std::fs::write(path, out).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    // Emission 300–500 nm step 2, excitation 240–400 nm step 5
    let emission: Vec<f64> = (0..101).map(|i| 300.0 + i as f64 * 2.0).collect();
    let excitation: Vec<f64> = (0..33).map(|i| 240.0 + i as f64 * 5.0).collect();

    let sample_peaks: Vec<(&str, Vec<Peak>)> = vec![
        (
            "Sample_A",
            vec![
                Peak { em_center: 420.0, em_width: 30.0, ex_center: 310.0, ex_width: 20.0, amplitude: 0.8 },
                Peak { em_center: 350.0, em_width: 15.0, ex_center: 270.0, ex_width: 12.0, amplitude: 0.5 },
            ],
        ),
        (
            "Sample_B",
            vec![
                Peak { em_center: 450.0, em_width: 25.0, ex_center: 340.0, ex_width: 18.0, amplitude: 0.6 },
            ],
        ),
        (
            "Sample_C",
            vec![
                Peak { em_center: 380.0, em_width: 20.0, ex_center: 280.0, ex_width: 15.0, amplitude: 0.9 },
                Peak { em_center: 470.0, em_width: 35.0, ex_center: 360.0, ex_width: 22.0, amplitude: 0.3 },
            ],
        ),
    ];
    let dilutions = [1.0, 2.0, 5.0];

    let instrument = CaryEclipse::new("Cary Eclipse", None);
    let mut eems = Vec::new();
    let mut measurement_id: i64 = 0;
    for (sample, peaks) in &sample_peaks {
        for &dilution in &dilutions {
            let scaled: Vec<Peak> = peaks
                .iter()
                .map(|p| Peak {
                    amplitude: p.amplitude / dilution,
                    ..*p
                })
                .collect();
            let grid = generate_grid(&emission, &excitation, &scaled, 0.002, &mut rng);

            let mut metadata = BTreeMap::new();
            metadata.insert("sample".to_string(), MetadataValue::String(sample.to_string()));
            metadata.insert("dilution".to_string(), MetadataValue::Float(dilution));
            metadata.insert(
                "measurement_id".to_string(),
                MetadataValue::Integer(measurement_id),
            );
            measurement_id += 1;

            let mut eem = Eem::new(emission.clone(), excitation.clone(), grid, metadata)?;
            instrument.annotate(&mut eem);
            eems.push(eem);
        }
    }

    let csv_path = Path::new("sample_eem.csv");
    write_cary_eclipse_csv(&eems[0], "Sample_A", csv_path)?;
    println!(
        "Wrote a {}×{} Cary Eclipse export to {}",
        eems[0].emission().len(),
        eems[0].excitation().len(),
        csv_path.display()
    );

    let dataset = EemDataset::from_eems(eems);
    let parquet_path = Path::new("sample_eems.parquet");
    save_parquet(&dataset, parquet_path)?;
    println!("Wrote {} EEMs to {}", dataset.len(), parquet_path.display());

    Ok(())
}
