//! USFM draft export
//!
//! Emits minimal USFM — `\id`, `\c`, `\p`, `\v` — from drafted sentences,
//! one output file per Bible book.

use crate::error::{EngineError, Result};
use crate::store::models::{book_code, split_ref_id, SentenceRow, MAX_REF_ID, MIN_REF_ID};

/// Render drafts as USFM files, one per book. Sentences are sorted by id;
/// a new file starts at every book change, a new `\c …\p` block at every
/// chapter change.
pub fn create_usfm(rows: &[SentenceRow]) -> Result<Vec<String>> {
    let mut sorted: Vec<&SentenceRow> = rows.iter().collect();
    sorted.sort_by_key(|row| row.sentence_id);

    let mut files: Vec<String> = Vec::new();
    let mut file = String::new();
    let mut prev_book = 0i64;
    let mut prev_chapter = 0i64;
    for row in sorted {
        if row.sentence_id < MIN_REF_ID || row.sentence_id > MAX_REF_ID {
            return Err(EngineError::TypeMismatch(format!(
                "sentence ids should follow the bbbcccvvv pattern for USFM, got {}",
                row.sentence_id
            )));
        }
        let (book_num, chapter_num, verse_num) = split_ref_id(row.sentence_id);
        if book_num != prev_book {
            if !file.is_empty() {
                files.push(std::mem::take(&mut file));
            }
            let code = book_code(book_num).ok_or_else(|| {
                EngineError::NotAvailable(format!("book number {book_num} not a valid one"))
            })?;
            file.push_str(&format!("\\id {code}\n"));
            prev_book = book_num;
            prev_chapter = 0;
        }
        if chapter_num != prev_chapter {
            file.push_str(&format!("\\c {chapter_num}\n\\p\n"));
            prev_chapter = chapter_num;
        }
        file.push_str(&format!("\\v {verse_num} {}", row.draft));
    }
    if !file.is_empty() {
        files.push(file);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::SentenceRow;

    fn row(sentence_id: i64, draft: &str) -> SentenceRow {
        let mut row = SentenceRow::fresh(1, sentence_id, String::new(), draft.to_string());
        row.draft = draft.to_string();
        row
    }

    #[test]
    fn chapters_and_books_open_new_blocks() {
        let rows = vec![
            row(1_001_001, "In beginning"),
            row(1_001_002, "God created"),
            row(1_002_001, "And"),
        ];
        let files = create_usfm(&rows).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(
            files[0],
            "\\id gen\n\\c 1\n\\p\n\\v 1 In beginning\\v 2 God created\\c 2\n\\p\n\\v 1 And"
        );
    }

    #[test]
    fn one_file_per_book() {
        let rows = vec![
            row(1_001_001, "first"),
            row(2_001_001, "second"),
        ];
        let files = create_usfm(&rows).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].starts_with("\\id gen\n"));
        assert!(files[1].starts_with("\\id exo\n"));
    }

    #[test]
    fn rows_are_sorted_before_rendering() {
        let rows = vec![row(1_001_002, "second"), row(1_001_001, "first")];
        let files = create_usfm(&rows).unwrap();
        assert!(files[0].contains("\\v 1 first\\v 2 second"));
    }

    #[test]
    fn non_bible_ids_are_rejected() {
        let err = create_usfm(&[row(99, "x")]).unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch(_)));
        let err = create_usfm(&[row(67_001_001, "x")]).unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch(_)));
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert!(create_usfm(&[]).unwrap().is_empty());
    }
}
