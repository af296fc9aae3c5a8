//! Plain-text and CSV draft exports

use crate::store::models::SentenceRow;
use crate::text;

/// Concatenate drafts into running text. A newline separates sentences
/// whose ids are not consecutive (chapter or selection gaps); a `.` is
/// appended to drafts that do not already end in punctuation.
pub fn to_plain_text(rows: &[SentenceRow], puncts: &[char]) -> String {
    let mut sorted: Vec<&SentenceRow> = rows.iter().collect();
    sorted.sort_by_key(|row| row.sentence_id);

    let mut result = String::new();
    let mut prev_id: Option<i64> = None;
    for row in sorted {
        if row.draft.is_empty() {
            continue;
        }
        if let Some(prev) = prev_id {
            if row.sentence_id - prev > 1 {
                result.push('\n');
            }
        }
        result.push_str(&row.draft);
        if row.draft.chars().next_back().is_some_and(|c| !puncts.contains(&c)) {
            result.push('.');
        }
        result.push(' ');
        prev_id = Some(row.sentence_id);
    }
    result
}

/// One CSV row per sentence: `surrogateId,sentence,draft`.
pub fn to_csv(rows: &[SentenceRow]) -> String {
    let mut result = String::new();
    for row in rows {
        result.push_str(&format!(
            "{},{},{}\n",
            row.surrogate_id, row.sentence, row.draft
        ));
    }
    result
}

/// Convenience wrapper using the default punctuation table.
pub fn to_plain_text_default(rows: &[SentenceRow]) -> String {
    to_plain_text(rows, &text::default_punctuations())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::SentenceRow;

    fn row(sentence_id: i64, draft: &str) -> SentenceRow {
        let mut r = SentenceRow::fresh(1, sentence_id, format!("s{sentence_id}"), draft.into());
        r.draft = draft.to_string();
        r
    }

    #[test]
    fn consecutive_sentences_join_with_spaces() {
        let text = to_plain_text_default(&[row(1_001_001, "First verse."), row(1_001_002, "Second")]);
        assert_eq!(text, "First verse. Second. ");
    }

    #[test]
    fn id_gaps_insert_newlines() {
        let text = to_plain_text_default(&[row(1_001_002, "chapter one ends.")]);
        assert!(!text.contains('\n'));
        let text =
            to_plain_text_default(&[row(1_001_002, "chapter one ends."), row(1_002_001, "two begins.")]);
        assert_eq!(text, "chapter one ends. \ntwo begins. ");
    }

    #[test]
    fn trailing_punctuation_is_not_doubled() {
        let text = to_plain_text_default(&[row(1_001_001, "Ends with danda।")]);
        assert_eq!(text, "Ends with danda। ");
    }

    #[test]
    fn csv_lists_surrogate_source_and_draft() {
        let mut r = row(1_001_001, "draft text");
        r.surrogate_id = "gen,1,1".into();
        r.sentence = "source text".into();
        let csv = to_csv(&[r]);
        assert_eq!(csv, "gen,1,1,source text,draft text\n");
    }
}
