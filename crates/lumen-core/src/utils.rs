//! String helpers shared across crates.

/// Truncate a string to at most `max_bytes`, ensuring the cut falls on a
/// UTF-8 character boundary. Returns the original string if already short enough.
#[must_use]
pub fn truncate_to_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        #[allow(clippy::arithmetic_side_effects)]
        {
            end -= 1;
        }
    }
    &s[..end]
}

/// Single-line preview of at most `max_chars` characters, with an ellipsis
/// when cut.
#[must_use]
pub fn preview(s: &str, max_chars: usize) -> String {
    let flat: String = s
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let flat = flat.trim();
    if flat.chars().count() <= max_chars {
        return flat.to_string();
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_truncation() {
        assert_eq!(truncate_to_boundary("hello world", 5), "hello");
        assert_eq!(truncate_to_boundary("hello", 10), "hello");
    }

    #[test]
    fn multibyte_boundary() {
        let s = "café";
        assert_eq!(truncate_to_boundary(s, 4), "caf");
        assert_eq!(truncate_to_boundary(s, 5), "café");
    }

    #[test]
    fn preview_flattens_newlines() {
        assert_eq!(preview("line one\nline two", 100), "line one line two");
    }

    #[test]
    fn preview_truncates_on_chars() {
        assert_eq!(preview("ééééé", 3), "ééé…");
        assert_eq!(preview("abc", 3), "abc");
    }
}
