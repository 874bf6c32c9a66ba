/// Lower-case, whitespace-split tokens. No stemming, no stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::tokenize;

    #[test]
    fn lowercases_and_splits_on_any_whitespace() {
        assert_eq!(tokenize("  Hello\tWORLD\nagain "), vec!["hello", "world", "again"]);
    }

    #[test]
    fn punctuation_is_kept() {
        assert_eq!(tokenize("Rust, rust."), vec!["rust,", "rust."]);
    }

    #[test]
    fn blank_text_has_no_tokens() {
        assert!(tokenize(" \n ").is_empty());
    }
}
