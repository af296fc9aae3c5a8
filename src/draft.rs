//! Draft strings and their segment maps
//!
//! Every sentence carries a draft (the evolving translation) and a meta
//! list segmenting both sides: each segment maps a source byte range to a
//! draft byte range with a status. The splicer below is the only code that
//! rewrites a draft — it replaces one source token and re-bases every
//! following segment's draft offsets.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Translation state of one segment. Ordered by how settled the text is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStatus {
    Untranslated,
    Suggestion,
    Confirmed,
}

impl SegmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentStatus::Untranslated => "untranslated",
            SegmentStatus::Suggestion => "suggestion",
            SegmentStatus::Confirmed => "confirmed",
        }
    }
}

/// One aligned slice of (source, draft). Serialized as the array triple
/// `[[srcStart, srcEnd], [dstStart, dstEnd], status]` — the shape the JSON
/// column stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SegmentRepr", into = "SegmentRepr")]
pub struct Segment {
    pub src: (usize, usize),
    pub dst: (usize, usize),
    pub status: SegmentStatus,
}

type SegmentRepr = ((usize, usize), (usize, usize), SegmentStatus);

impl From<SegmentRepr> for Segment {
    fn from((src, dst, status): SegmentRepr) -> Self {
        Segment { src, dst, status }
    }
}

impl From<Segment> for SegmentRepr {
    fn from(seg: Segment) -> Self {
        (seg.src, seg.dst, seg.status)
    }
}

impl Segment {
    /// The single segment covering a fresh, fully untranslated sentence.
    pub fn whole(len: usize) -> Segment {
        Segment {
            src: (0, len),
            dst: (0, len),
            status: SegmentStatus::Untranslated,
        }
    }
}

/// Seed meta for a sentence whose draft still equals its source.
pub fn fresh_meta(sentence: &str) -> Vec<Segment> {
    vec![Segment::whole(sentence.len())]
}

/// Replace one source token with a translation, returning the new draft and
/// the re-based meta.
///
/// The segment containing `token_offset` is split into an untranslated
/// prefix (when the token starts inside it), the replacement tagged `tag`,
/// and an untranslated suffix (when the token ends inside it). Segments
/// before the edit are copied verbatim; segments after keep their source
/// ranges and have their draft ranges shifted by the length change.
///
/// An offset that intersects no segment, or that spans more than one, is a
/// caller error (`MalformedInput`). An empty `meta` means the draft still
/// equals the source and is seeded as one untranslated segment.
pub fn replace_token(
    source: &str,
    token_offset: (usize, usize),
    translation: &str,
    draft: &str,
    meta: &[Segment],
    tag: SegmentStatus,
) -> Result<(String, Vec<Segment>)> {
    let (tok_start, tok_end) = token_offset;
    if tok_start >= tok_end || tok_end > source.len() {
        return Err(EngineError::MalformedInput(format!(
            "token offset [{tok_start}, {tok_end}) is not a valid range of the source (len {})",
            source.len()
        )));
    }

    let seeded;
    let (draft, meta): (&str, &[Segment]) = if meta.is_empty() {
        seeded = fresh_meta(source);
        (source, &seeded)
    } else {
        (draft, meta)
    };

    let mut new_draft = String::with_capacity(draft.len() + translation.len());
    let mut new_meta: Vec<Segment> = Vec::with_capacity(meta.len() + 2);
    let mut offset_diff: isize = 0;
    let mut replaced = false;

    for seg in meta {
        let (seg_start, seg_end) = seg.src;
        let intersects = tok_start.max(seg_start) < tok_end.min(seg_end);
        if intersects {
            if replaced || tok_start < seg_start || tok_end > seg_end {
                return Err(EngineError::MalformedInput(format!(
                    "token offset [{tok_start}, {tok_end}) spans segment boundaries"
                )));
            }
            replaced = true;
            let mut cursor = seg.dst.0;
            if tok_start > seg_start {
                let prefix = &source[seg_start..tok_start];
                new_draft.push_str(prefix);
                new_meta.push(Segment {
                    src: (seg_start, tok_start),
                    dst: (cursor, cursor + prefix.len()),
                    status: SegmentStatus::Untranslated,
                });
                cursor += prefix.len();
            }
            new_draft.push_str(translation);
            new_meta.push(Segment {
                src: (tok_start, tok_end),
                dst: (cursor, cursor + translation.len()),
                status: tag,
            });
            cursor += translation.len();
            if tok_end < seg_end {
                let suffix = &source[tok_end..seg_end];
                new_draft.push_str(suffix);
                new_meta.push(Segment {
                    src: (tok_end, seg_end),
                    dst: (cursor, cursor + suffix.len()),
                    status: SegmentStatus::Untranslated,
                });
                cursor += suffix.len();
            }
            offset_diff = cursor as isize - seg.dst.1 as isize;
        } else if seg_end < tok_end {
            // entirely before the edit point
            new_draft.push_str(&draft[seg.dst.0..seg.dst.1]);
            new_meta.push(seg.clone());
        } else {
            // after the edit point: draft side shifts
            new_draft.push_str(&draft[seg.dst.0..seg.dst.1]);
            new_meta.push(Segment {
                src: seg.src,
                dst: (
                    shift(seg.dst.0, offset_diff)?,
                    shift(seg.dst.1, offset_diff)?,
                ),
                status: seg.status,
            });
        }
    }

    if !replaced {
        return Err(EngineError::MalformedInput(format!(
            "no draft segment contains token offset [{tok_start}, {tok_end})"
        )));
    }
    Ok((new_draft, new_meta))
}

fn shift(value: usize, diff: isize) -> Result<usize> {
    let shifted = value as isize + diff;
    if shifted < 0 {
        return Err(EngineError::MalformedInput(
            "segment map is inconsistent: draft offset shifted below zero".into(),
        ));
    }
    Ok(shifted as usize)
}

/// Retag every `Suggestion` segment as `Confirmed`, returning how many
/// segments changed.
pub fn confirm_suggestions(meta: &mut [Segment]) -> usize {
    let mut changed = 0;
    for seg in meta.iter_mut() {
        if seg.status == SegmentStatus::Suggestion {
            seg.status = SegmentStatus::Confirmed;
            changed += 1;
        }
    }
    changed
}

/// Per-status fractions of translated source text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub confirmed: f64,
    pub suggestion: f64,
    pub untranslated: f64,
}

/// Sum source-side segment lengths per status over a sentence set and
/// return them as fractions. Segments covering a single character are
/// skipped — they are whitespace or punctuation remnants left by splicing.
pub fn progress_summary<'a, I>(rows: I) -> ProgressSummary
where
    I: IntoIterator<Item = (&'a str, &'a [Segment])>,
{
    let mut confirmed = 0usize;
    let mut suggestion = 0usize;
    let mut untranslated = 0usize;
    for (sentence, meta) in rows {
        for seg in meta {
            let slice = sentence.get(seg.src.0..seg.src.1).unwrap_or("");
            let token_len = slice.chars().count();
            if token_len <= 1 {
                continue;
            }
            match seg.status {
                SegmentStatus::Confirmed => confirmed += token_len,
                SegmentStatus::Suggestion => suggestion += token_len,
                SegmentStatus::Untranslated => untranslated += token_len,
            }
        }
    }
    let total = confirmed + suggestion + untranslated;
    if total == 0 {
        return ProgressSummary {
            confirmed: 0.0,
            suggestion: 0.0,
            untranslated: 0.0,
        };
    }
    ProgressSummary {
        confirmed: confirmed as f64 / total as f64,
        suggestion: suggestion as f64 / total as f64,
        untranslated: untranslated as f64 / total as f64,
    }
}

/// Check the coverage invariant: source ranges partition the sentence,
/// draft ranges partition the draft, and the draft equals the ordered
/// concatenation of its slices.
pub fn check_meta_coverage(source: &str, draft: &str, meta: &[Segment]) -> Result<()> {
    let mut src_cursor = 0usize;
    let mut dst_cursor = 0usize;
    let mut rebuilt = String::with_capacity(draft.len());
    for (i, seg) in meta.iter().enumerate() {
        if seg.src.0 != src_cursor || seg.dst.0 != dst_cursor {
            return Err(EngineError::MalformedInput(format!(
                "segment {i} breaks contiguity: src {:?} dst {:?}",
                seg.src, seg.dst
            )));
        }
        if seg.src.1 < seg.src.0 || seg.dst.1 < seg.dst.0 {
            return Err(EngineError::MalformedInput(format!(
                "segment {i} has a negative-width range"
            )));
        }
        src_cursor = seg.src.1;
        dst_cursor = seg.dst.1;
        rebuilt.push_str(draft.get(seg.dst.0..seg.dst.1).ok_or_else(|| {
            EngineError::MalformedInput(format!("segment {i} draft range is out of bounds"))
        })?);
    }
    if src_cursor != source.len() || dst_cursor != draft.len() {
        return Err(EngineError::MalformedInput(
            "segments do not cover the full sentence and draft".into(),
        ));
    }
    if rebuilt != draft {
        return Err(EngineError::MalformedInput(
            "draft is not the concatenation of its segment slices".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(src: (usize, usize), dst: (usize, usize), status: SegmentStatus) -> Segment {
        Segment { src, dst, status }
    }

    #[test]
    fn same_length_replacement_splits_segment() {
        let source = "abc def ghi";
        let meta = fresh_meta(source);
        let (draft, meta) =
            replace_token(source, (4, 7), "XYZ", source, &meta, SegmentStatus::Confirmed).unwrap();
        assert_eq!(draft, "abc XYZ ghi");
        assert_eq!(
            meta,
            vec![
                seg((0, 4), (0, 4), SegmentStatus::Untranslated),
                seg((4, 7), (4, 7), SegmentStatus::Confirmed),
                seg((7, 11), (7, 11), SegmentStatus::Untranslated),
            ]
        );
        check_meta_coverage(source, &draft, &meta).unwrap();
    }

    #[test]
    fn longer_replacement_shifts_following_offsets() {
        let source = "abc def ghi";
        let (draft, meta) =
            replace_token(source, (4, 7), "WORD", source, &[], SegmentStatus::Confirmed).unwrap();
        assert_eq!(draft, "abc WORD ghi");
        assert_eq!(
            meta,
            vec![
                seg((0, 4), (0, 4), SegmentStatus::Untranslated),
                seg((4, 7), (4, 8), SegmentStatus::Confirmed),
                seg((7, 11), (8, 12), SegmentStatus::Untranslated),
            ]
        );
        check_meta_coverage(source, &draft, &meta).unwrap();
    }

    #[test]
    fn empty_meta_seeds_draft_from_source() {
        let source = "abc";
        let (draft, meta) =
            replace_token(source, (0, 3), "xyz", "", &[], SegmentStatus::Suggestion).unwrap();
        assert_eq!(draft, "xyz");
        assert_eq!(meta, vec![seg((0, 3), (0, 3), SegmentStatus::Suggestion)]);
    }

    #[test]
    fn exact_segment_boundaries_emit_no_empty_edges() {
        let source = "abc def ghi";
        let meta = fresh_meta(source);
        // token starts at the segment start: no leading prefix
        let (draft, meta) =
            replace_token(source, (0, 3), "A", source, &meta, SegmentStatus::Confirmed).unwrap();
        assert_eq!(draft, "A def ghi");
        assert_eq!(meta.len(), 2);
        assert_eq!(meta[0].src, (0, 3));
        assert_eq!(meta[0].dst, (0, 1));
        // token ends at the segment end: no trailing suffix
        let (draft2, meta2) = replace_token(
            source,
            (8, 11),
            "ZZ",
            &draft,
            &meta,
            SegmentStatus::Confirmed,
        )
        .unwrap();
        assert_eq!(draft2, "A def ZZ");
        assert_eq!(meta2.last().unwrap().src, (8, 11));
        assert_eq!(meta2.last().unwrap().dst, (6, 8));
        check_meta_coverage(source, &draft2, &meta2).unwrap();
    }

    #[test]
    fn sequential_edits_cascade_offsets() {
        let source = "abc def ghi";
        let (draft, meta) =
            replace_token(source, (0, 3), "AAAA", source, &[], SegmentStatus::Confirmed).unwrap();
        let (draft, meta) = replace_token(
            source,
            (8, 11),
            "B",
            &draft,
            &meta,
            SegmentStatus::Suggestion,
        )
        .unwrap();
        assert_eq!(draft, "AAAA def B");
        check_meta_coverage(source, &draft, &meta).unwrap();
        let (draft, meta) =
            replace_token(source, (4, 7), "CC", &draft, &meta, SegmentStatus::Confirmed).unwrap();
        assert_eq!(draft, "AAAA CC B");
        check_meta_coverage(source, &draft, &meta).unwrap();
        assert_eq!(meta.iter().filter(|s| s.status == SegmentStatus::Confirmed).count(), 2);
    }

    #[test]
    fn replacing_inside_translated_segment_keeps_neighbours() {
        let source = "abc def ghi";
        let (draft, meta) =
            replace_token(source, (4, 7), "XYZ", source, &[], SegmentStatus::Suggestion).unwrap();
        // user re-confirms the same token over the suggestion
        let (draft, meta) =
            replace_token(source, (4, 7), "Q", &draft, &meta, SegmentStatus::Confirmed).unwrap();
        assert_eq!(draft, "abc Q ghi");
        let statuses: Vec<SegmentStatus> = meta.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                SegmentStatus::Untranslated,
                SegmentStatus::Confirmed,
                SegmentStatus::Untranslated
            ]
        );
        check_meta_coverage(source, &draft, &meta).unwrap();
    }

    #[test]
    fn noop_replacement_preserves_coverage() {
        let source = "abc def ghi";
        let (draft, meta) = replace_token(
            source,
            (4, 7),
            &source[4..7],
            source,
            &[],
            SegmentStatus::Confirmed,
        )
        .unwrap();
        assert_eq!(draft, source);
        check_meta_coverage(source, &draft, &meta).unwrap();
    }

    #[test]
    fn spanning_offset_is_rejected() {
        let source = "abc def ghi";
        let (draft, meta) =
            replace_token(source, (0, 3), "A", source, &[], SegmentStatus::Confirmed).unwrap();
        // [2, 5) crosses the boundary between two segments
        let err = replace_token(source, (2, 5), "X", &draft, &meta, SegmentStatus::Confirmed)
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedInput(_)));
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let source = "abc";
        let err =
            replace_token(source, (1, 9), "X", source, &[], SegmentStatus::Confirmed).unwrap_err();
        assert!(matches!(err, EngineError::MalformedInput(_)));
        let err =
            replace_token(source, (2, 2), "X", source, &[], SegmentStatus::Confirmed).unwrap_err();
        assert!(matches!(err, EngineError::MalformedInput(_)));
    }

    #[test]
    fn multibyte_offsets_splice_cleanly() {
        let source = "जीवन के वचन";
        let meta = fresh_meta(source);
        // "के" spans bytes 13..19
        let start = source.find("के").unwrap();
        let end = start + "के".len();
        let (draft, meta) = replace_token(
            source,
            (start, end),
            "of",
            source,
            &meta,
            SegmentStatus::Confirmed,
        )
        .unwrap();
        assert_eq!(draft, "जीवन of वचन");
        check_meta_coverage(source, &draft, &meta).unwrap();
    }

    #[test]
    fn confirm_suggestions_retags_in_place() {
        let source = "abc def ghi";
        let (_, mut meta) =
            replace_token(source, (4, 7), "XYZ", source, &[], SegmentStatus::Suggestion).unwrap();
        assert_eq!(confirm_suggestions(&mut meta), 1);
        assert_eq!(confirm_suggestions(&mut meta), 0);
        assert!(meta.iter().any(|s| s.status == SegmentStatus::Confirmed));
    }

    #[test]
    fn progress_ignores_single_char_segments() {
        let source = "ab c def";
        // confirmed "ab" (2 chars), untranslated " c " remnants, suggestion "def"
        let meta = vec![
            seg((0, 2), (0, 2), SegmentStatus::Confirmed),
            seg((2, 3), (2, 3), SegmentStatus::Untranslated), // single space: skipped
            seg((3, 4), (3, 4), SegmentStatus::Untranslated), // single char: skipped
            seg((4, 5), (4, 5), SegmentStatus::Untranslated), // single space: skipped
            seg((5, 8), (5, 8), SegmentStatus::Suggestion),
        ];
        let progress = progress_summary([(source, meta.as_slice())]);
        assert!((progress.confirmed - 0.4).abs() < 1e-9);
        assert!((progress.suggestion - 0.6).abs() < 1e-9);
        assert_eq!(progress.untranslated, 0.0);
    }

    #[test]
    fn progress_counts_chars_not_bytes() {
        // "के" is one filtered char even though it is 6 bytes
        let source = "के वचन";
        let meta = vec![
            seg((0, 6), (0, 6), SegmentStatus::Confirmed), // "के": 2 chars
            seg((6, 7), (6, 7), SegmentStatus::Untranslated), // space: skipped
            seg((7, 16), (7, 16), SegmentStatus::Untranslated), // "वचन": 3 chars
        ];
        let progress = progress_summary([(source, meta.as_slice())]);
        assert!((progress.confirmed - 0.4).abs() < 1e-9);
        assert!((progress.untranslated - 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_sentence_set_yields_zero_progress() {
        let progress = progress_summary(std::iter::empty::<(&str, &[Segment])>());
        assert_eq!(progress.confirmed, 0.0);
        assert_eq!(progress.untranslated, 0.0);
    }

    #[test]
    fn segment_serializes_as_array_triple() {
        let s = seg((0, 4), (0, 5), SegmentStatus::Suggestion);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"[[0,4],[0,5],"suggestion"]"#);
        let back: Segment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
