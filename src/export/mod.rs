//! Draft exporters
//!
//! Four output contracts: USFM (one file per book), alignment JSON, CSV,
//! and running plain text. [`export_drafts`] dispatches on the requested
//! format.

pub mod alignment;
pub mod plaintext;
pub mod usfm;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::models::{Language, SentenceRow};
use crate::text;

/// Supported draft document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentFormat {
    Usfm,
    AlignmentJson,
    Csv,
    Text,
}

/// A rendered export.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutput {
    /// One USFM string per book.
    Files(Vec<String>),
    Json(serde_json::Value),
    Text(String),
}

/// Render a sentence set in the requested format.
pub fn export_drafts(
    format: DocumentFormat,
    rows: &[SentenceRow],
    source: Option<&Language>,
    target: Option<&Language>,
    modified: Option<DateTime<Utc>>,
) -> Result<ExportOutput> {
    match format {
        DocumentFormat::Usfm => Ok(ExportOutput::Files(usfm::create_usfm(rows)?)),
        DocumentFormat::AlignmentJson => Ok(ExportOutput::Json(alignment::export_to_json(
            source, target, rows, modified,
        ))),
        DocumentFormat::Csv => Ok(ExportOutput::Text(plaintext::to_csv(rows))),
        DocumentFormat::Text => Ok(ExportOutput::Text(plaintext::to_plain_text(
            rows,
            &text::default_punctuations(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::SentenceRow;

    #[test]
    fn dispatch_covers_every_format() {
        let rows = vec![SentenceRow::fresh(1, 1_001_001, "gen,1,1".into(), "abc".into())];
        assert!(matches!(
            export_drafts(DocumentFormat::Usfm, &rows, None, None, None).unwrap(),
            ExportOutput::Files(_)
        ));
        assert!(matches!(
            export_drafts(DocumentFormat::AlignmentJson, &rows, None, None, None).unwrap(),
            ExportOutput::Json(_)
        ));
        assert!(matches!(
            export_drafts(DocumentFormat::Csv, &rows, None, None, None).unwrap(),
            ExportOutput::Text(_)
        ));
        assert!(matches!(
            export_drafts(DocumentFormat::Text, &rows, None, None, None).unwrap(),
            ExportOutput::Text(_)
        ));
    }

    #[test]
    fn format_names_serialize_kebab_case() {
        assert_eq!(
            serde_json::to_string(&DocumentFormat::AlignmentJson).unwrap(),
            "\"alignment-json\""
        );
        assert_eq!(serde_json::to_string(&DocumentFormat::Usfm).unwrap(), "\"usfm\"");
    }
}
