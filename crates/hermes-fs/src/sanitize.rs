use sha1::{Digest, Sha1};

const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const MAX_BASE_LEN: usize = 50;

/// Sanitizes `original` into a filesystem-safe name:
/// strip forbidden characters, collapse whitespace/underscore runs, drop
/// anything outside `[A-Za-z0-9_-]`, trim stray leading/trailing `_-.`,
/// truncate the base to 50 chars, then append `_<8-hex-sha1-of-original>`
/// and the original extension (if any). Output always matches
/// `^[A-Za-z0-9_-]+_[0-9a-f]{8}(\.[A-Za-z0-9]+)?$` and is at most 255 bytes.
pub fn sanitize_filename(original: &str) -> String {
    let (stem, ext) = split_extension(original);

    let stripped: String = stem.chars().filter(|c| !FORBIDDEN.contains(c)).collect();
    let collapsed = collapse_whitespace_and_underscores(&stripped);
    let filtered: String = collapsed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    let trimmed = filtered.trim_matches(|c: char| c == '_' || c == '-' || c == '.');
    let truncated: String = trimmed.chars().take(MAX_BASE_LEN).collect();

    let hash = short_sha1(original);
    let base = if truncated.is_empty() {
        hash.clone()
    } else {
        format!("{truncated}_{hash}")
    };

    let mut result = match &ext {
        Some(e) => format!("{base}.{e}"),
        None => base,
    };

    if result.len() > 255 {
        result.truncate(255);
    }
    result
}

fn split_extension(original: &str) -> (&str, Option<String>) {
    match original.rfind('.') {
        Some(idx) if idx > 0 && idx < original.len() - 1 => {
            let ext: String = original[idx + 1..]
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect();
            if ext.is_empty() {
                (original, None)
            } else {
                (&original[..idx], Some(ext))
            }
        }
        _ => (original, None),
    }
}

fn collapse_whitespace_and_underscores(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_sep = false;
    for c in s.chars() {
        let is_sep = c.is_whitespace() || c == '_';
        if is_sep {
            if !last_was_sep {
                out.push('_');
            }
            last_was_sep = true;
        } else {
            out.push(c);
            last_was_sep = false;
        }
    }
    out
}

fn short_sha1(original: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(original.as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn pattern() -> Regex {
        Regex::new(r"^[A-Za-z0-9_-]+_[0-9a-f]{8}(\.[A-Za-z0-9]+)?$").unwrap()
    }

    #[test]
    fn simple_title_matches_pattern() {
        let out = sanitize_filename("My Research Title");
        assert!(pattern().is_match(&out), "{out}");
    }

    #[test]
    fn forbidden_characters_are_stripped() {
        let out = sanitize_filename("weird<>:\"/\\|?*name.md");
        assert!(pattern().is_match(&out), "{out}");
        assert!(out.ends_with(".md"));
    }

    #[test]
    fn whitespace_and_underscore_runs_collapse() {
        let out = sanitize_filename("a   b___c");
        assert!(pattern().is_match(&out), "{out}");
    }

    #[test]
    fn output_length_never_exceeds_255() {
        let long = "x".repeat(1000);
        let out = sanitize_filename(&long);
        assert!(out.len() <= 255);
        assert!(pattern().is_match(&out), "{out}");
    }

    #[test]
    fn deterministic_for_same_input() {
        let a = sanitize_filename("Same Title");
        let b = sanitize_filename("Same Title");
        assert_eq!(a, b);
    }

    #[test]
    fn different_titles_colliding_after_truncation_get_distinct_hashes() {
        let base = "x".repeat(60);
        let a = sanitize_filename(&format!("{base}A"));
        let b = sanitize_filename(&format!("{base}B"));
        assert_ne!(a, b);
    }
}
