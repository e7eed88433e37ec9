//! CSV output of observation tables
//!
//! Tables are written once per run, to a hidden sibling file that is renamed into
//! place after the writer is flushed.

use crate::errors::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

fn publish<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut csv::Writer<fs::File>) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = staging_path(path);
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        fill(&mut writer)?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    log::info!("✅ Saved table to {}", path.display());
    Ok(())
}

/// Write typed rows with a header derived from the row struct's field names
///
/// `header` is written explicitly when `rows` is empty, so an empty table still
/// carries its columns.
pub fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    publish(path, |writer| {
        if rows.is_empty() {
            writer.write_record(header)?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        Ok(())
    })
}

/// Write untyped records under an explicit header
pub fn write_records(path: &Path, header: &[String], records: &[Vec<String>]) -> Result<()> {
    publish(path, |writer| {
        writer.write_record(header)?;
        for record in records {
            writer.write_record(record)?;
        }
        Ok(())
    })
}

/// Format an optional measurement as a CSV field (empty when missing)
pub fn field(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Row {
        year: i32,
        value: Option<f64>,
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        let rows = vec![
            Row { year: 2002, value: Some(1.5) },
            Row { year: 2003, value: None },
        ];
        write_rows(&path, &["year", "value"], &rows).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "year,value\n2002,1.5\n2003,\n");
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn empty_table_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_rows::<Row>(&path, &["year", "value"], &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "year,value\n");
    }
}
