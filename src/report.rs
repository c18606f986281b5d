//! Report rows and CSV export.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{extract::PatternExtractor, AnnotationRecord, Error, Result};

pub const UNKNOWN_YEAR: &str = "UNKNOWN";

/// One output row per image. Column names are the CSV header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "imageFile")]
    pub image_file: String,
    #[serde(rename = "deployYear")]
    pub deploy_year: String,
    #[serde(rename = "imageSerialNumber")]
    pub serial_number: String,
    #[serde(rename = "imageAssetID")]
    pub asset_id: String,
    #[serde(rename = "imageSerialNumber Match")]
    pub serial_number_match: String,
    #[serde(rename = "imageAssetID Match")]
    pub asset_id_match: String,
}

pub struct ReportBuilder {
    extractor: PatternExtractor,
    year: Regex,
    serial_label: Regex,
}

impl ReportBuilder {
    pub fn new(extractor: PatternExtractor) -> Result<Self> {
        Ok(Self {
            extractor,
            year: compile("deploy year", r"_(\d{4})\d{4}_")?,
            serial_label: compile("serial label", r"SN ?: ?")?,
        })
    }

    /// Year from a `_YYYYMMDD_` segment of the file name, else `UNKNOWN`.
    pub fn deploy_year(&self, image_name: &str) -> String {
        self.year
            .captures(image_name)
            .and_then(|caps| caps.get(1))
            .map_or_else(|| UNKNOWN_YEAR.to_string(), |year| year.as_str().to_string())
    }

    /// Drops everything up to the last `SN:` label of each match and joins
    /// the remainders with spaces.
    pub fn clean_serial_number<S: AsRef<str>>(&self, matches: &[S]) -> String {
        let joined = matches.iter().fold(String::new(), |mut joined, found| {
            let value = self
                .serial_label
                .split(found.as_ref())
                .last()
                .unwrap_or_default();
            joined.push(' ');
            joined.push_str(value);
            joined
        });
        joined.trim().to_string()
    }

    pub fn row(&self, record: &AnnotationRecord) -> ReportRow {
        let extraction = self.extractor.extract(record);
        let image_file = record.image_name().to_string();
        let row = ReportRow {
            deploy_year: self.deploy_year(&image_file),
            serial_number: self.clean_serial_number(&extraction.serial_number.matches),
            asset_id: extraction.asset_id.matches.join(" "),
            serial_number_match: extraction.serial_number.match_type,
            asset_id_match: extraction.asset_id.match_type,
            image_file,
        };
        tracing::info!(
            image = %row.image_file,
            year = %row.deploy_year,
            serial = %row.serial_number,
            asset = %row.asset_id,
            serial_match = %row.serial_number_match,
            asset_match = %row.asset_id_match,
            "extracted"
        );
        row
    }

    pub fn build<'a>(
        &self,
        records: impl IntoIterator<Item = &'a AnnotationRecord>,
    ) -> Vec<ReportRow> {
        records.into_iter().map(|record| self.row(record)).collect()
    }
}

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| Error::Pattern {
        tier: name.to_string(),
        source,
    })
}

/// Writes `rows` as CSV with a header, creating the parent directory.
#[instrument(skip(rows), fields(rows = rows.len()))]
pub fn write_csv(path: &Path, rows: &[ReportRow]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(Error::io(dir))?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(Error::io(path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternConfig;

    fn builder() -> ReportBuilder {
        ReportBuilder::new(PatternExtractor::new(&PatternConfig::default()).unwrap()).unwrap()
    }

    #[test]
    fn year_from_timestamped_name() {
        let builder = builder();
        assert_eq!(
            builder.deploy_year("CTDPFB301_20230913_085400_recovered.jpg"),
            "2023"
        );
        assert_eq!(builder.deploy_year("CTDPFB301_recovered.jpg"), UNKNOWN_YEAR);
        assert_eq!(builder.deploy_year("x_2023091_y.jpg"), UNKNOWN_YEAR);
    }

    #[test]
    fn bad_helper_pattern_is_an_error() {
        let err = compile("deploy year", r"_(\d{4}").unwrap_err();
        assert!(matches!(err, Error::Pattern { ref tier, .. } if tier == "deploy year"));
    }

    #[test]
    fn serial_label_is_stripped() {
        let builder = builder();
        assert_eq!(builder.clean_serial_number(&["SN:A1234"]), "A1234");
        assert_eq!(builder.clean_serial_number(&["SN : 77", "16-50122"]), "77 16-50122");
        assert_eq!(builder.clean_serial_number::<&str>(&[]), "");
    }

    #[test]
    fn header_matches_report_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        let row = ReportRow {
            image_file: "a_20210101_b.jpg".into(),
            deploy_year: "2021".into(),
            serial_number: "16-50122".into(),
            asset_id: "ATAPL-70150-00006".into(),
            serial_number_match: "Exact".into(),
            asset_id_match: "Exact".into(),
        };
        write_csv(&path, &[row]).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next(),
            Some("imageFile,deployYear,imageSerialNumber,imageAssetID,imageSerialNumber Match,imageAssetID Match")
        );
        assert_eq!(
            lines.next(),
            Some("a_20210101_b.jpg,2021,16-50122,ATAPL-70150-00006,Exact,Exact")
        );
    }
}
