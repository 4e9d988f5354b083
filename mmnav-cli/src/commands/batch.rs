use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use mmnav::{Pathfinder, WorldPoint};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub fn run(
    data_dir: Option<PathBuf>,
    map_id: u32,
    extent: f32,
    input: PathBuf,
    output: Option<PathBuf>,
    columns: [String; 3],
) -> Result<()> {
    let pathfinder = super::load(data_dir, map_id, extent)?;

    let output_path = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "points".to_string());
        input.with_file_name(format!("{}_snapped.csv", stem))
    });

    let rows = process_csv(&pathfinder, &input, &output_path, &columns)?;

    println!("Snapped {} rows", rows);
    println!("Output written to: {}", output_path.display());
    Ok(())
}

fn process_csv(
    pathfinder: &Pathfinder,
    input: &Path,
    output_path: &Path,
    columns: &[String; 3],
) -> Result<u64> {
    let file = File::open(input).context("Failed to open input file")?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    // Find column indices
    let headers = reader.headers()?.clone();
    let mut idx = [0usize; 3];
    for (slot, name) in idx.iter_mut().zip(columns) {
        *slot = headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("Column '{}' not found in CSV", name))?;
    }

    // Collect records for progress bar
    let records: Vec<_> = reader.records().collect::<Result<_, _>>()?;
    let total = records.len() as u64;

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let output_file = File::create(output_path).context("Failed to create output file")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(output_file));

    let mut new_headers: Vec<&str> = headers.iter().collect();
    new_headers.extend(["snap_x", "snap_y", "snap_z"]);
    writer.write_record(&new_headers)?;

    for (line, record) in records.iter().enumerate() {
        let mut coords = [0f32; 3];
        for (value, (&i, name)) in coords.iter_mut().zip(idx.iter().zip(columns)) {
            *value = record
                .get(i)
                .with_context(|| format!("Missing '{}' on row {}", name, line + 1))?
                .trim()
                .parse()
                .with_context(|| format!("Invalid '{}' on row {}", name, line + 1))?;
        }

        let point = WorldPoint::new(coords[0], coords[1], coords[2]);
        let snapped = if coords.iter().all(|c| c.is_finite()) {
            pathfinder
                .closest_point(point.to_nav())
                .with_context(|| format!("Failed to query surface on row {}", line + 1))?
                .map(|p| p.to_world())
        } else {
            None
        };

        let extra = match snapped {
            Some(p) => [
                format!("{:.3}", p.x),
                format!("{:.3}", p.y),
                format!("{:.3}", p.z),
            ],
            None => ["void".to_string(), "void".to_string(), "void".to_string()],
        };

        let mut new_record: Vec<&str> = record.iter().collect();
        new_record.extend(extra.iter().map(String::as_str));
        writer.write_record(&new_record)?;

        pb.inc(1);
    }

    pb.finish_with_message("done");
    writer.flush()?;

    Ok(total)
}
