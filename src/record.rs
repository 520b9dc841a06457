//! Paper records and the exported result table.
//!
//! A record is the union of a paper's document metadata and its extracted
//! fields. The table projects all records onto one fixed column order and
//! backfills any missing cell with an empty value.

use crate::error::Result;
use crate::metadata::DocumentMetadata;
use crate::prompts::SUMMARY_FIELDS;
use crate::summarize::ExtractedFields;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Metadata columns in output order. `keywords` is reserved: no extractor
/// fills it, so it only appears if a record carries it.
pub const METADATA_COLUMNS: &[&str] = &[
    "filename",
    "title",
    "author",
    "subject",
    "keywords",
    "creator",
    "creationYear",
];

/// One processed paper, keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperRecord {
    fields: HashMap<String, String>,
}

impl PaperRecord {
    /// Record holding only the document metadata
    pub fn from_metadata(metadata: DocumentMetadata) -> Self {
        let fields = HashMap::from([
            ("filename".to_string(), metadata.filename),
            ("title".to_string(), metadata.title),
            ("author".to_string(), metadata.author),
            ("subject".to_string(), metadata.subject),
            ("creator".to_string(), metadata.creator),
            ("creationYear".to_string(), metadata.creation_year),
        ]);
        Self { fields }
    }

    /// Merge extracted fields in; they win on key collisions.
    pub fn with_extracted(mut self, extracted: ExtractedFields) -> Self {
        self.fields.extend(extracted);
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }
}

/// Output columns: metadata present on any record, then summary fields
/// present on any record, each group in its fixed order.
pub fn column_order(records: &[PaperRecord]) -> Vec<&'static str> {
    let present = |column: &&&str| records.iter().any(|r| r.contains(column));

    METADATA_COLUMNS
        .iter()
        .filter(present)
        .chain(SUMMARY_FIELDS.iter().filter(present))
        .copied()
        .collect()
}

/// All records projected onto one column order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    columns: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn from_records(records: &[PaperRecord]) -> Self {
        let columns = column_order(records);
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.get(column).unwrap_or_default().to_string())
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Write header and rows as CSV to any writer
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Write the table to `path`, creating parent directories as needed
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        self.write_to(file)?;
        info!(path = %path.display(), rows = self.rows.len(), "Saved CSV");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn metadata(filename: &str, title: &str) -> DocumentMetadata {
        DocumentMetadata {
            filename: filename.to_string(),
            title: title.to_string(),
            creation_year: "2022".to_string(),
            ..Default::default()
        }
    }

    fn extracted(pairs: &[(&str, &str)]) -> ExtractedFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_extracted_fields_take_precedence() {
        let record = PaperRecord::from_metadata(metadata("a.pdf", "From PDF"))
            .with_extracted(extracted(&[("title", "From model"), ("results", "good")]));
        assert_eq!(record.get("title"), Some("From model"));
        assert_eq!(record.get("results"), Some("good"));
        assert_eq!(record.get("filename"), Some("a.pdf"));
    }

    #[test]
    fn test_column_order_is_fixed() {
        // Summary fields inserted in reverse order still come out in schema order
        let record = PaperRecord::from_metadata(metadata("a.pdf", "A")).with_extracted(extracted(&[
            ("future_recommendations", "more data"),
            ("results", "ok"),
            ("overall_summary", "A paper"),
            ("unexpected_key", "dropped"),
        ]));

        assert_eq!(
            column_order(&[record]),
            vec![
                "filename",
                "title",
                "author",
                "subject",
                "creator",
                "creationYear",
                "overall_summary",
                "results",
                "future_recommendations",
            ]
        );
    }

    #[test]
    fn test_missing_columns_are_backfilled() {
        let full = PaperRecord::from_metadata(metadata("full.pdf", "Full"))
            .with_extracted(extracted(&[("methodology", "SVM"), ("dataset", "yes")]));
        let metadata_only = PaperRecord::from_metadata(metadata("bare.pdf", "Bare"));

        let table = ResultTable::from_records(&[full, metadata_only]);
        assert_eq!(
            table.columns(),
            &["filename", "title", "author", "subject", "creator", "creationYear", "methodology", "dataset"]
        );
        assert_eq!(table.rows()[0][6], "SVM");
        assert_eq!(table.rows()[1], vec!["bare.pdf", "Bare", "", "", "", "2022", "", ""]);
        assert!(table.rows().iter().all(|row| row.len() == table.columns().len()));
    }

    #[test]
    fn test_write_csv() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("summary.csv");
        let record = PaperRecord::from_metadata(metadata("a.pdf", "Title, with comma"))
            .with_extracted(extracted(&[("results", "line one\nline two")]));

        ResultTable::from_records(&[record]).write_csv(&path)?;

        let mut reader = csv::Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();
        assert_eq!(headers.get(0), Some("filename"));
        assert_eq!(headers.get(6), Some("results"));

        let rows: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(1), Some("Title, with comma"));
        assert_eq!(rows[0].get(6), Some("line one\nline two"));
        Ok(())
    }
}
