use deunicode::deunicode;

/// Derive the model-family code from a localized model name.
///
/// Lowercased ASCII transliteration, whitespace collapses to `-`, every other
/// non-alphanumeric character to `_`. Different localized spellings that
/// normalize to the same slug belong to the same model family.
pub fn model_code(name: &str) -> String {
    deunicode(name.trim())
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else if c.is_whitespace() {
                '-'
            } else {
                '_'
            }
        })
        .collect()
}

/// Normalize a reference display name (manufacturer) into its stable key:
/// ASCII transliteration, lowercase, whitespace to `_`.
pub fn reference_key(name: &str) -> String {
    deunicode(name.trim())
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}
