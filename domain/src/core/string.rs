//! String utilities for the domain layer.

/// Truncate a string to a maximum byte length with ellipsis.
///
/// Truncation always lands on a valid UTF-8 character boundary, so backend
/// payloads containing multibyte text never produce a broken slice.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len.saturating_sub(3).min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_input_unchanged() {
        assert_eq!(truncate("cluster-a", 32), "cluster-a");
    }

    #[test]
    fn test_truncate_long_payload() {
        assert_eq!(truncate("deployment metrics payload", 13), "deployment...");
    }

    #[test]
    fn test_truncate_multibyte_boundary() {
        // 4-byte emoji must not be split mid-character
        assert_eq!(truncate("ok 🚀🚀🚀", 9), "ok ...");
        assert_eq!(truncate("ok 🚀🚀🚀", 11), "ok 🚀...");
    }
}
