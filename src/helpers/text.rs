/// Body length kept in error records
pub const ERROR_BODY_MAX_CHARS: usize = 500;
/// Body length kept in token generation failure logs
pub const TOKEN_BODY_MAX_CHARS: usize = 200;

/// Cut `value` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn short_values_are_untouched() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcde", 5), "abcde");
    }

    #[test]
    fn long_values_are_cut_on_char_boundary() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }
}
