//! Context-key enumeration for the suggestion trie
//!
//! A key records which neighbours of a token were observed, in distance
//! order: `token[/L:w]…[/R:w]…`. Enumeration walks left and right context
//! simultaneously — each step may consume the next left word, the next
//! right word, or both (in either order), so a key never skips a nearer
//! neighbour to reach a farther one.

/// Whether enumeration keeps everything or prunes to the longest keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// Learning: only keys tied for maximal length survive, so weight
    /// concentrates on the most specific context actually observed.
    LongestOnly,
    /// Lookup: every key, sorted by length descending.
    All,
}

/// Enumerate trie keys for `token` with its left context (nearest first)
/// and right context (nearest first).
pub fn form_trie_keys(
    token: &str,
    to_left: &[String],
    to_right: &[String],
    mode: KeyMode,
) -> Vec<String> {
    let left: Vec<&str> = to_left.iter().map(String::as_str).collect();
    let right: Vec<&str> = to_right.iter().map(String::as_str).collect();
    let mut keys = vec![token.to_string()];
    extend(token, &left, &right, &mut keys);
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    match mode {
        KeyMode::All => keys,
        KeyMode::LongestOnly => {
            let longest = keys.first().map(String::len).unwrap_or(0);
            keys.retain(|k| k.len() == longest);
            keys
        }
    }
}

fn extend(prefix: &str, to_left: &[&str], to_right: &[&str], keys: &mut Vec<String>) {
    let left_ext = to_left.first().map(|w| format!("/L:{w}"));
    let right_ext = to_right.first().map(|w| format!("/R:{w}"));
    let rest_left = if to_left.is_empty() { to_left } else { &to_left[1..] };
    let rest_right = if to_right.is_empty() { to_right } else { &to_right[1..] };

    if let Some(l) = &left_ext {
        let key = format!("{prefix}{l}");
        keys.push(key.clone());
        extend(&key, rest_left, rest_right, keys);
    }
    if let Some(r) = &right_ext {
        let key = format!("{prefix}{r}");
        keys.push(key.clone());
        extend(&key, rest_left, rest_right, keys);
    }
    if let (Some(l), Some(r)) = (&left_ext, &right_ext) {
        let key_lr = format!("{prefix}{l}{r}");
        let key_rl = format!("{prefix}{r}{l}");
        keys.push(key_lr.clone());
        keys.push(key_rl.clone());
        extend(&key_lr, rest_left, rest_right, keys);
        extend(&key_rl, rest_left, rest_right, keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn one_neighbour_each_side_longest_only() {
        let keys = form_trie_keys("b", &words(&["a"]), &words(&["c"]), KeyMode::LongestOnly);
        let set: HashSet<&str> = keys.iter().map(String::as_str).collect();
        assert_eq!(set, ["b/L:a/R:c", "b/R:c/L:a"].into_iter().collect());
    }

    #[test]
    fn one_neighbour_each_side_all_keys() {
        let keys = form_trie_keys("b", &words(&["a"]), &words(&["c"]), KeyMode::All);
        let set: HashSet<&str> = keys.iter().map(String::as_str).collect();
        assert_eq!(
            set,
            ["b", "b/L:a", "b/R:c", "b/L:a/R:c", "b/R:c/L:a"]
                .into_iter()
                .collect()
        );
        // sorted longest first
        assert!(keys.windows(2).all(|w| w[0].len() >= w[1].len()));
    }

    #[test]
    fn bare_token_when_no_context() {
        assert_eq!(
            form_trie_keys("tok", &[], &[], KeyMode::LongestOnly),
            vec!["tok"]
        );
        assert_eq!(form_trie_keys("tok", &[], &[], KeyMode::All), vec!["tok"]);
    }

    #[test]
    fn nearer_neighbours_come_before_farther_ones() {
        let keys = form_trie_keys("t", &words(&["l1", "l2"]), &[], KeyMode::All);
        let set: HashSet<&str> = keys.iter().map(String::as_str).collect();
        assert!(set.contains("t/L:l1/L:l2"));
        // l2 can never be reached without consuming l1 first
        assert!(!set.contains("t/L:l2"));
    }

    #[test]
    fn enumeration_is_left_right_symmetric() {
        let left = words(&["x", "y"]);
        let right = words(&["p", "q"]);
        let forward = form_trie_keys("t", &left, &right, KeyMode::LongestOnly);
        let mirrored = form_trie_keys("t", &right, &left, KeyMode::LongestOnly);
        let relabel = |k: &String| {
            k.replace("/L:", "/_:")
                .replace("/R:", "/L:")
                .replace("/_:", "/R:")
        };
        let forward_set: HashSet<String> = forward.iter().map(relabel).collect();
        let mirrored_set: HashSet<String> = mirrored.into_iter().collect();
        assert_eq!(forward_set, mirrored_set);
    }

    #[test]
    fn skipping_a_side_drops_its_consumed_word() {
        // extending with only L1 forfeits R1: the R side can then only
        // continue from R2
        let keys = form_trie_keys("t", &words(&["l1"]), &words(&["r1", "r2"]), KeyMode::All);
        let set: HashSet<&str> = keys.iter().map(String::as_str).collect();
        assert!(set.contains("t/L:l1/R:r2"));
        assert!(set.contains("t/L:l1/R:r1")); // both consumed in one step
        assert!(!set.contains("t/R:r2")); // r2 is unreachable before r1
    }
}
