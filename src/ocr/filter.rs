//! Text validity checks applied to recognition results.
//!
//! Obfuscation fonts cover letters, digits and CJK ideographs. A result is
//! usable only if, after dropping everything else, exactly one such
//! character remains.

/// Whether `c` is a letter, digit or CJK unified ideograph we can map to.
pub fn is_valid_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// Keep only valid characters of `text`.
pub fn filter_valid_chars(text: &str) -> String {
    text.chars().filter(|&c| is_valid_char(c)).collect()
}

/// Whether non-empty `text` is made up entirely of punctuation and symbols.
pub fn is_symbol_only(text: &str) -> bool {
    !text.is_empty() && !text.chars().any(is_valid_char)
}

/// The single valid character of `text`, if it has exactly one.
///
/// # Examples
///
/// ```
/// use glyph_oxide::ocr::filter::single_valid_char;
/// assert_eq!(single_valid_char("赤"), Some('赤'));
/// assert_eq!(single_valid_char("「赤」"), Some('赤'));
/// assert_eq!(single_valid_char("赤色"), None);
/// assert_eq!(single_valid_char("。"), None);
/// ```
pub fn single_valid_char(text: &str) -> Option<char> {
    if is_symbol_only(text) {
        return None;
    }
    let mut valid = text.chars().filter(|&c| is_valid_char(c));
    match (valid.next(), valid.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
