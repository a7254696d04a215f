#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Writes a batch of provider records to CSV and, optionally, JSON.
//!
//! Both files are written atomically: contents go to a `.tmp` sibling that
//! is renamed into place once complete, so an interrupted run never leaves a
//! truncated file behind.

use std::path::{Path, PathBuf};

use slot_scout_listing_models::ProviderRecord;

/// Errors raised while writing output files.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The JSON sibling of a CSV output path (`results.csv` -> `results.json`).
#[must_use]
pub fn json_path_for(csv_path: &Path) -> PathBuf {
    csv_path.with_extension("json")
}

/// Writes `records` as CSV with a header row of every column.
///
/// # Errors
///
/// Returns [`SinkError`] if the file cannot be written.
pub fn write_csv(path: &Path, records: &[ProviderRecord]) -> Result<(), SinkError> {
    let tmp_path = tmp_path_for(path);
    let written = write_csv_rows(&tmp_path, records);
    commit(&tmp_path, path, written)?;
    log::info!("Saved {} record(s) to {}", records.len(), path.display());
    Ok(())
}

/// Writes `records` as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns [`SinkError`] if the file cannot be written.
pub fn write_json(path: &Path, records: &[ProviderRecord]) -> Result<(), SinkError> {
    let contents = serde_json::to_string_pretty(records)?;
    let tmp_path = tmp_path_for(path);
    let written = std::fs::write(&tmp_path, contents).map_err(SinkError::from);
    commit(&tmp_path, path, written)?;
    log::info!("Saved {} record(s) to {}", records.len(), path.display());
    Ok(())
}

/// Writes the CSV file and, when `json` is set, its JSON sibling. Returns
/// the paths written.
///
/// # Errors
///
/// Returns [`SinkError`] if either file cannot be written.
pub fn write_outputs(
    csv_path: &Path,
    records: &[ProviderRecord],
    json: bool,
) -> Result<Vec<PathBuf>, SinkError> {
    write_csv(csv_path, records)?;
    let mut written = vec![csv_path.to_path_buf()];

    if json {
        let json_path = json_path_for(csv_path);
        write_json(&json_path, records)?;
        written.push(json_path);
    }

    Ok(written)
}

fn write_csv_rows(path: &Path, records: &[ProviderRecord]) -> Result<(), SinkError> {
    // The header is written explicitly so an empty batch still gets one.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(ProviderRecord::COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Moves a completed `.tmp` file into place, or removes it when writing or
/// renaming failed.
fn commit(tmp_path: &Path, path: &Path, written: Result<(), SinkError>) -> Result<(), SinkError> {
    let result = written.and_then(|()| std::fs::rename(tmp_path, path).map_err(SinkError::from));
    if result.is_err() {
        std::fs::remove_file(tmp_path).ok();
    }
    result
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn record(name: &str) -> ProviderRecord {
        let captured_at = NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        let mut record = ProviderRecord::with_sentinels(captured_at, |f| format!("{f} ?"));
        record.name = name.to_owned();
        record.address = "12 Rue de Paris, 75015 Paris".to_owned();
        record.rating = Some(4.8);
        record.conventioned = true;
        record.set_slots(vec!["10h30".into(), "11h00".into()], "none");
        record
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("slot_scout_sink_{name}"))
    }

    #[test]
    fn json_path_replaces_the_extension() {
        assert_eq!(
            json_path_for(Path::new("out/doctolib_results.csv")),
            PathBuf::from("out/doctolib_results.json")
        );
        assert_eq!(
            json_path_for(Path::new("results")),
            PathBuf::from("results.json")
        );
    }

    #[test]
    fn csv_has_a_header_and_one_row_per_record() {
        let path = temp_file("rows.csv");
        write_csv(&path, &[record("Dr Martin"), record("Dr Durand")]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], ProviderRecord::COLUMNS.join(","));
        assert!(lines[1].starts_with("Dr Martin,"));
        assert!(lines[1].contains("\"12 Rue de Paris, 75015 Paris\""));
        assert!(lines[1].contains(",4.8,"));
        assert!(lines[1].contains(",true,10h30; 11h00,2,"));
        assert!(lines[1].ends_with(",2024-05-02 14:30:00"));
        assert!(!temp_file("rows.csv.tmp").exists());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn header_follows_the_record_field_order() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(record("Dr Martin")).unwrap();
        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(data.lines().next().unwrap(), ProviderRecord::COLUMNS.join(","));
    }

    #[test]
    fn failed_write_leaves_no_tmp_file() {
        let target = temp_file("dir_target.csv");
        std::fs::create_dir_all(&target).unwrap();

        assert!(write_csv(&target, &[record("Dr Martin")]).is_err());
        assert!(!temp_file("dir_target.csv.tmp").exists());

        std::fs::remove_dir_all(&target).ok();
    }

    #[test]
    fn absent_rating_is_an_empty_cell() {
        let path = temp_file("no_rating.csv");
        let mut r = record("Dr Petit");
        r.rating = None;
        write_csv(&path, &[r]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let row = reader.records().next().unwrap().unwrap();
        let note = ProviderRecord::COLUMNS
            .iter()
            .position(|c| *c == "note")
            .unwrap();
        assert_eq!(&row[note], "");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn writes_json_sibling_on_request() {
        let csv_path = temp_file("both.csv");
        let written = write_outputs(&csv_path, &[record("Dr Martin")], true).unwrap();
        assert_eq!(written, [csv_path.clone(), temp_file("both.json")]);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(temp_file("both.json")).unwrap())
                .unwrap();
        assert_eq!(json[0]["nom"], "Dr Martin");
        assert_eq!(json[0]["nb_creneaux"], 2);
        assert_eq!(json[0]["conventionnement"], true);

        for path in written {
            std::fs::remove_file(path).ok();
        }
    }

    #[test]
    fn json_is_skipped_unless_requested() {
        let csv_path = temp_file("csv_only.csv");
        let written = write_outputs(&csv_path, &[record("Dr Martin")], false).unwrap();
        assert_eq!(written, [csv_path.clone()]);
        assert!(!temp_file("csv_only.json").exists());

        std::fs::remove_file(csv_path).ok();
    }
}
