//! Minimal USFM reader
//!
//! Recognizes the structural markers a drafting project needs — `\id`,
//! `\c`, `\p`, `\v` — and ignores everything else. Verse text may continue
//! over following lines until the next marker. The result is a flat list
//! of verse records ready to become project sentences.

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    sequence::preceded,
    IResult,
};

use crate::error::{EngineError, Result};
use crate::store::models::{book_id, VerseRecord};

/// A parsed USFM book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsfmBook {
    pub book_code: String,
    pub book_id: i64,
    pub verses: Vec<VerseRecord>,
}

/// Parse one marker line into `(marker, argument text)`.
fn marker_line(input: &str) -> IResult<&str, (&str, &str)> {
    let (rest, name) = preceded(char('\\'), take_while1(|c: char| c.is_ascii_alphanumeric()))(input)?;
    let (arg, _) = multispace0(rest)?;
    Ok(("", (name, arg.trim_end())))
}

fn parse_number(marker: &str, arg: &str) -> Result<i64> {
    let digits: &str = arg.split_whitespace().next().unwrap_or("");
    digits.parse::<i64>().map_err(|_| {
        EngineError::MalformedInput(format!("marker \\{marker} needs a number, got: {arg}"))
    })
}

/// Parse USFM text into a book with its verses.
///
/// Fails with `MalformedInput` when structure is broken (no `\id`, a verse
/// before the first chapter, a non-numeric chapter or verse number) and
/// with `NotAvailable` when the `\id` book code is unknown.
pub fn parse(usfm: &str) -> Result<UsfmBook> {
    let mut code: Option<(String, i64)> = None;
    let mut chapter: Option<i64> = None;
    let mut verses: Vec<VerseRecord> = Vec::new();

    for raw_line in usfm.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if !line.starts_with('\\') {
            // continuation of the previous verse
            if let Some(last) = verses.last_mut() {
                if !last.text.is_empty() {
                    last.text.push(' ');
                }
                last.text.push_str(line);
            }
            continue;
        }
        let (_, (marker, arg)) = marker_line(line).map_err(|_| {
            EngineError::MalformedInput(format!("unparsable marker line: {line}"))
        })?;
        match marker {
            "id" => {
                let raw_code = arg
                    .split_whitespace()
                    .next()
                    .ok_or_else(|| {
                        EngineError::MalformedInput("\\id marker without a book code".into())
                    })?
                    .to_lowercase();
                let id = book_id(&raw_code).ok_or_else(|| {
                    EngineError::NotAvailable(format!("book, {raw_code}, not found in database"))
                })?;
                code = Some((raw_code, id));
            }
            "c" => {
                chapter = Some(parse_number(marker, arg)?);
            }
            "v" => {
                let (book_code, book_num) = code.clone().ok_or_else(|| {
                    EngineError::MalformedInput("verse marker before \\id".into())
                })?;
                let chapter_num = chapter.ok_or_else(|| {
                    EngineError::MalformedInput("verse marker before the first chapter".into())
                })?;
                let verse_num = parse_number(marker, arg)?;
                let text = arg
                    .split_whitespace()
                    .skip(1)
                    .collect::<Vec<&str>>()
                    .join(" ");
                verses.push(VerseRecord {
                    book_code,
                    book_id: book_num,
                    chapter: chapter_num,
                    verse: verse_num,
                    text,
                });
            }
            // \p and any unknown marker carry no draft content
            _ => {}
        }
    }

    let (book_code, book_num) = code.ok_or_else(|| {
        EngineError::MalformedInput("USFM input has no \\id marker".into())
    })?;
    Ok(UsfmBook {
        book_code,
        book_id: book_num,
        verses,
    })
}
