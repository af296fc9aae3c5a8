//! Alignment-JSON draft export
//!
//! Serializes drafted sentences into the alignment interchange shape:
//! two resources (`r0` source, `r1` draft) with parallel token lists and
//! one alignment entry per draft segment. Confirmed segments score 1 and
//! are verified, suggestions score 0.5, untranslated segments score 0.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::draft::SegmentStatus;
use crate::store::models::{Language, SentenceRow};

/// Render the alignment-JSON document for a sentence set.
pub fn export_to_json(
    source: Option<&Language>,
    target: Option<&Language>,
    rows: &[SentenceRow],
    modified: Option<DateTime<Utc>>,
) -> Value {
    let resource = |lang: Option<&Language>| match lang {
        Some(lang) => json!({ "languageCode": lang.code, "name": lang.name }),
        None => json!({}),
    };
    let mut segments = Vec::with_capacity(rows.len());
    for row in rows {
        let mut src_tokens: Vec<&str> = Vec::with_capacity(row.draft_meta.len());
        let mut trg_tokens: Vec<&str> = Vec::with_capacity(row.draft_meta.len());
        let mut alignments = Vec::with_capacity(row.draft_meta.len());
        for (i, seg) in row.draft_meta.iter().enumerate() {
            src_tokens.push(row.sentence.get(seg.src.0..seg.src.1).unwrap_or(""));
            trg_tokens.push(row.draft.get(seg.dst.0..seg.dst.1).unwrap_or(""));
            let (score, verified) = match seg.status {
                SegmentStatus::Confirmed => (1.0, true),
                SegmentStatus::Suggestion => (0.5, false),
                SegmentStatus::Untranslated => (0.0, false),
            };
            alignments.push(json!({
                "r0": [i],
                "r1": [i],
                "status": seg.status.as_str(),
                "score": score,
                "verified": verified,
            }));
        }
        segments.push(json!({
            "resources": {
                "r0": {
                    "text": row.sentence,
                    "tokens": src_tokens,
                    "metadata": { "contextId": row.surrogate_id },
                },
                "r1": {
                    "text": row.draft,
                    "tokens": trg_tokens,
                    "metadata": { "contextId": row.surrogate_id },
                },
            },
            "alignments": alignments,
        }));
    }
    json!({
        "metadata": {
            "resources": { "r0": resource(source), "r1": resource(target) },
            "modified": modified.map(|ts| ts.to_rfc3339()),
        },
        "segments": segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{replace_token, SegmentStatus};
    use crate::store::models::SentenceRow;

    fn language(code: &str, name: &str) -> Language {
        Language {
            id: 0,
            code: code.into(),
            name: name.into(),
        }
    }

    #[test]
    fn statuses_map_to_scores_and_verification() {
        let source = "abc def ghi";
        let mut row = SentenceRow::fresh(1, 1_001_001, "gen,1,1".into(), source.into());
        let (draft, meta) = replace_token(
            source,
            (4, 7),
            "XYZ",
            &row.draft,
            &row.draft_meta,
            SegmentStatus::Confirmed,
        )
        .unwrap();
        row.draft = draft;
        row.draft_meta = meta;

        let doc = export_to_json(
            Some(&language("hi", "Hindi")),
            Some(&language("en", "English")),
            &[row],
            None,
        );
        assert_eq!(doc["metadata"]["resources"]["r0"]["languageCode"], "hi");
        let segment = &doc["segments"][0];
        assert_eq!(segment["resources"]["r0"]["tokens"][1], "def");
        assert_eq!(segment["resources"]["r1"]["tokens"][1], "XYZ");
        assert_eq!(segment["resources"]["r1"]["text"], "abc XYZ ghi");

        let alignments = segment["alignments"].as_array().unwrap();
        assert_eq!(alignments.len(), 3);
        assert_eq!(alignments[0]["score"], 0.0);
        assert_eq!(alignments[0]["verified"], false);
        assert_eq!(alignments[1]["score"], 1.0);
        assert_eq!(alignments[1]["verified"], true);
        assert_eq!(alignments[1]["status"], "confirmed");
    }

    #[test]
    fn suggestion_segments_score_half() {
        let source = "abc";
        let mut row = SentenceRow::fresh(1, 1_001_001, "gen,1,1".into(), source.into());
        let (draft, meta) = replace_token(
            source,
            (0, 3),
            "x",
            &row.draft,
            &row.draft_meta,
            SegmentStatus::Suggestion,
        )
        .unwrap();
        row.draft = draft;
        row.draft_meta = meta;
        let doc = export_to_json(None, None, &[row], None);
        assert_eq!(doc["segments"][0]["alignments"][0]["score"], 0.5);
        assert_eq!(doc["segments"][0]["alignments"][0]["verified"], false);
    }

    #[test]
    fn missing_languages_leave_empty_resources() {
        let doc = export_to_json(None, None, &[], None);
        assert_eq!(doc["metadata"]["resources"]["r0"], json!({}));
        assert!(doc["segments"].as_array().unwrap().is_empty());
    }
}
