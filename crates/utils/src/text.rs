/// Collapses every run of whitespace into a single space and trims both ends.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops the last space-separated word, e.g. `"Lidl Madrid ES"` -> `"Lidl Madrid"`.
///
/// A value without any space has nothing left once its only word is removed.
pub fn remove_last_word(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed.rfind(' ') {
        Some(idx) => trimmed[..idx].trim_end().to_string(),
        None => String::new(),
    }
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
