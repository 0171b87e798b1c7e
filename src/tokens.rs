/// Rough LLM token count: one token per four characters, rounded up.
///
/// Counts Unicode scalar values, not bytes. Downstream consumers read this
/// through the `x-markdown-tokens` header, so the formula must stay fixed.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_whole_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(400)), 100);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 5 characters, 15 bytes.
        assert_eq!(estimate_tokens("キーボード"), 2);
    }
}
