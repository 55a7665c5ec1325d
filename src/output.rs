//! Report serialization and the on-disk output file.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

/// One relevant source in the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchRecord {
    pub title: String,
    pub url: String,
}

/// Pretty-printed JSON array, in the order the records were accepted.
pub fn to_json(records: &[ResearchRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

pub fn report_file_name(now: DateTime<Local>) -> String {
    format!("research_output_{}.json", now.format("%Y%m%d_%H%M%S"))
}

/// Writes `json` under `dir` with a timestamped name and returns the path.
pub fn write_report(dir: &Path, json: &str, now: DateTime<Local>) -> io::Result<PathBuf> {
    let path = dir.join(report_file_name(now));
    std::fs::write(&path, json)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn empty_report_is_empty_array() {
        assert_eq!(to_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn records_keep_order_and_fields() {
        let records = vec![
            ResearchRecord {
                title: "Hikes".into(),
                url: "https://a.example/".into(),
            },
            ResearchRecord {
                title: "Waterfalls".into(),
                url: "https://b.example/".into(),
            },
        ];

        let json = to_json(&records).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(
            parsed,
            serde_json::json!([
                {"title": "Hikes", "url": "https://a.example/"},
                {"title": "Waterfalls", "url": "https://b.example/"},
            ])
        );
        assert!(json.contains('\n'));
    }

    #[test]
    fn file_name_uses_local_timestamp() {
        assert_eq!(
            report_file_name(fixed_time()),
            "research_output_20240309_140507.json"
        );
    }

    #[test]
    fn writes_report_into_directory() {
        let dir = tempfile::tempdir().unwrap();

        let path = write_report(dir.path(), "[]", fixed_time()).unwrap();

        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(write_report(&missing, "[]", fixed_time()).is_err());
    }
}
