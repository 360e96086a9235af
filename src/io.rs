// src/io.rs
//
// Flat text persistence, one row per site, whitespace separated.
//
// Spin configurations: `activity sx sy sz`, activity 0 (pinned) or 1
// (active); the activity column may be omitted, in which case every site
// is active. Any activity value other than 0/1 anywhere in the file
// disables partitioning for the whole file (all sites active).
//
// Lattice coordinates: `index x y z`. The index column is informational;
// rows are taken in file order.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::SimError;
use crate::lattice::Lattice;
use crate::spin_field::SpinField;
use crate::vec3;

fn open(path: &Path) -> Result<BufReader<File>, SimError> {
    let file = File::open(path).map_err(|_| SimError::MissingFile(path.to_path_buf()))?;
    Ok(BufReader::new(file))
}

fn parse_f64(path: &Path, line: usize, s: &str) -> Result<f64, SimError> {
    s.parse().map_err(|_| SimError::MalformedLine {
        path: path.to_path_buf(),
        line,
        reason: format!("not a number: '{s}'"),
    })
}

/// Read `index x y z` rows.
pub fn read_coordinates(path: &Path) -> Result<Vec<[f64; 3]>, SimError> {
    let mut coords = Vec::new();
    for (lineno, line) in open(path)?.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(SimError::MalformedLine {
                path: path.to_path_buf(),
                line: lineno + 1,
                reason: format!("expected 4 columns, got {}", fields.len()),
            });
        }
        coords.push([
            parse_f64(path, lineno + 1, fields[1])?,
            parse_f64(path, lineno + 1, fields[2])?,
            parse_f64(path, lineno + 1, fields[3])?,
        ]);
    }
    Ok(coords)
}

/// Write `index x y z` rows.
pub fn write_coordinates(path: &Path, lattice: &Lattice) -> Result<(), SimError> {
    let mut out = BufWriter::new(File::create(path)?);
    for (i, p) in lattice.coords().iter().enumerate() {
        writeln!(out, "{i} {:.12} {:.12} {:.12}", p[0], p[1], p[2])?;
    }
    out.flush()?;
    Ok(())
}

/// Write `activity sx sy sz` rows.
pub fn write_spin_config(path: &Path, field: &SpinField) -> Result<(), SimError> {
    let mut out = BufWriter::new(File::create(path)?);
    for (i, s) in field.spins().iter().enumerate() {
        let activity = if field.is_active(i)? { 1 } else { 0 };
        writeln!(out, "{activity} {:.12} {:.12} {:.12}", s[0], s[1], s[2])?;
    }
    out.flush()?;
    Ok(())
}

/// Read a spin configuration into `field`. Row count must match the field
/// size; spin vectors are normalized on the way in.
pub fn read_spin_config(path: &Path, field: &mut SpinField) -> Result<(), SimError> {
    let mut rows: Vec<(Option<f64>, [f64; 3])> = Vec::new();
    for (lineno, line) in open(path)?.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let (activity, spin_cols) = match fields.len() {
            3 => (None, &fields[..]),
            4 => (
                Some(parse_f64(path, lineno + 1, fields[0])?),
                &fields[1..],
            ),
            n => {
                return Err(SimError::MalformedLine {
                    path: path.to_path_buf(),
                    line: lineno + 1,
                    reason: format!("expected 3 or 4 columns, got {n}"),
                })
            }
        };
        let spin = [
            parse_f64(path, lineno + 1, spin_cols[0])?,
            parse_f64(path, lineno + 1, spin_cols[1])?,
            parse_f64(path, lineno + 1, spin_cols[2])?,
        ];
        rows.push((activity, spin));
    }

    if rows.len() != field.len() {
        return Err(SimError::InvalidConfig(format!(
            "spin file {} carries {} rows for a {}-site field",
            path.display(),
            rows.len(),
            field.len()
        )));
    }

    // A single out-of-range activity value voids the partition column.
    let partition_ok = rows.iter().all(|(a, _)| match a {
        None => true,
        Some(v) => *v == 0.0 || *v == 1.0,
    });
    for (i, (_, spin)) in rows.iter().enumerate() {
        field.set_spin(i, *spin)?;
    }
    field.all_active();
    if partition_ok {
        for (i, (activity, _)) in rows.iter().enumerate() {
            if activity.map_or(false, |a| a == 0.0) {
                field.set_inactive_site(i)?;
            }
        }
    }
    Ok(())
}

/// Shared helper for tests and drivers comparing spin files.
pub fn spins_match(a: &[[f64; 3]], b: &[[f64; 3]], tol: f64) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| vec3::dist2(*x, *y) <= tol * tol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spin_field::SpinModel;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("spinlat-io-{}-{}", std::process::id(), name));
        p
    }

    #[test]
    fn spin_config_round_trip_preserves_partition_and_vectors() {
        let mut field = SpinField::new(SpinModel::Heisenberg, 4);
        let mut rng = crate::rng::RandomSource::from_seed(13);
        field.random_orientation(&mut rng);
        field.set_inactive_site(2).unwrap();
        let path = temp_path("roundtrip.dat");
        write_spin_config(&path, &field).unwrap();

        let mut back = SpinField::new(SpinModel::Heisenberg, 4);
        read_spin_config(&path, &mut back).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(spins_match(field.spins(), back.spins(), 1e-6));
        assert!(!back.is_active(2).unwrap());
        assert_eq!(back.active_sites().len(), 3);
    }

    #[test]
    fn bad_activity_value_disables_partitioning() {
        let path = temp_path("badactivity.dat");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "0 0 0 1").unwrap();
        writeln!(f, "2 1 0 0").unwrap();
        drop(f);

        let mut field = SpinField::new(SpinModel::Heisenberg, 2);
        read_spin_config(&path, &mut field).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(field.active_sites().len(), 2);
    }

    #[test]
    fn three_column_rows_mean_all_active() {
        let path = temp_path("threecol.dat");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "0 0 1").unwrap();
        writeln!(f, "1 0 0").unwrap();
        drop(f);

        let mut field = SpinField::new(SpinModel::Heisenberg, 2);
        read_spin_config(&path, &mut field).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(field.active_sites().len(), 2);
        assert_eq!(field.spin(0).unwrap(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn missing_file_is_typed() {
        let mut field = SpinField::new(SpinModel::Heisenberg, 1);
        let err = read_spin_config(Path::new("/nonexistent/spins.dat"), &mut field);
        assert!(matches!(err, Err(SimError::MissingFile(_))));
    }
}
