//! Context window extraction for suggestion learning and lookup
//!
//! A token's context is the punctuation-stripped words around its
//! occurrence: up to ⌊W/2⌋ on the left and ⌈W/2⌉ on the right. The token
//! itself (which may be a multi-word phrase) occupies one slot.

use crate::text::strip_punctuation;

/// Extract `(index, window)` for a token at `offset` in `sentence`.
/// `index` is the token's position inside the returned window.
pub fn extract_context(
    token: &str,
    offset: (usize, usize),
    sentence: &str,
    window_size: usize,
    puncts: &[char],
) -> (usize, Vec<String>) {
    let front_raw = strip_punctuation(&sentence[..offset.0], puncts);
    let rear_raw = strip_punctuation(&sentence[offset.1..], puncts);

    let mut front: Vec<&str> = front_raw.split_whitespace().collect();
    let mut rear: Vec<&str> = rear_raw.split_whitespace().collect();

    let keep_left = window_size / 2;
    let keep_right = window_size - keep_left;
    if front.len() > keep_left {
        front.drain(..front.len() - keep_left);
    }
    rear.truncate(keep_right);

    let index = front.len();
    let mut context: Vec<String> = front.into_iter().map(str::to_string).collect();
    context.push(token.to_string());
    context.extend(rear.into_iter().map(str::to_string));
    (index, context)
}
