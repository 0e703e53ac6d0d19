//! Glyph-name heuristic.
//!
//! Obfuscation fonts often keep production glyph names that spell out the
//! true codepoint, so `uni4E2D` drawn at `U+E5D1` really is `中`. Decoding
//! the name is exact and needs no rendering, so it always runs first.

/// Resolve a glyph name that encodes a Unicode codepoint.
///
/// Recognized forms (an AGL-style `.suffix` is ignored):
/// - `uniXXXX`: exactly four hex digits
/// - `uXXXX` .. `uXXXXXX`: four to six hex digits
///
/// Returns `None` when the name carries no hint or the codepoint is not a
/// plausible printable character. That is the common case, not an error.
///
/// # Examples
///
/// ```
/// use glyph_oxide::fonts::glyph_names::glyph_name_to_char;
/// assert_eq!(glyph_name_to_char("uni4E2D"), Some('中'));
/// assert_eq!(glyph_name_to_char("u1F600"), Some('😀'));
/// assert_eq!(glyph_name_to_char("glyph00042"), None);
/// ```
pub fn glyph_name_to_char(glyph_name: &str) -> Option<char> {
    let base = glyph_name.split('.').next().unwrap_or(glyph_name);

    // "uniXXXX" format (e.g., uni4E2D -> 中)
    if let Some(hex) = base.strip_prefix("uni") {
        if hex.len() == 4 {
            return parse_hex_char(hex);
        }
    }

    // "uXXXX" format (e.g., u4E2D, u1F600)
    if let Some(hex) = base.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            return parse_hex_char(hex);
        }
    }

    None
}

fn parse_hex_char(hex: &str) -> Option<char> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let code_point = u32::from_str_radix(hex, 16).ok()?;
    char::from_u32(code_point).filter(|&c| is_plausible_char(c))
}

/// Whether `c` is something a page would actually display as text.
///
/// Controls, whitespace, private-use and noncharacters are rejected: a name
/// pointing into the private-use area is just another obfuscated codepoint.
pub fn is_plausible_char(c: char) -> bool {
    let cp = c as u32;
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    let private_use = (0xE000..=0xF8FF).contains(&cp)
        || (0xF_0000..=0xF_FFFD).contains(&cp)
        || (0x10_0000..=0x10_FFFD).contains(&cp);
    let noncharacter = (0xFDD0..=0xFDEF).contains(&cp) || (cp & 0xFFFE) == 0xFFFE;
    !private_use && !noncharacter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uni_prefix() {
        assert_eq!(glyph_name_to_char("uni4E2D"), Some('\u{4E2D}'));
        assert_eq!(glyph_name_to_char("uni0041"), Some('A'));
        assert_eq!(glyph_name_to_char("uni4e2d"), Some('中'));
    }

    #[test]
    fn test_u_prefix() {
        assert_eq!(glyph_name_to_char("u8D64"), Some('赤'));
        assert_eq!(glyph_name_to_char("u20000"), Some('\u{20000}'));
        assert_eq!(glyph_name_to_char("u123"), None);
        assert_eq!(glyph_name_to_char("u1234567"), None);
    }

    #[test]
    fn test_suffix_is_ignored() {
        assert_eq!(glyph_name_to_char("uni4E2D.alt"), Some('中'));
        assert_eq!(glyph_name_to_char("u8D64.ss01"), Some('赤'));
    }

    #[test]
    fn test_non_hex_names() {
        assert_eq!(glyph_name_to_char("uniGGGG"), None);
        assert_eq!(glyph_name_to_char("uni+4E2"), None);
        assert_eq!(glyph_name_to_char("glyph00042"), None);
        assert_eq!(glyph_name_to_char(".notdef"), None);
        assert_eq!(glyph_name_to_char("A"), None);
        assert_eq!(glyph_name_to_char(""), None);
    }

    #[test]
    fn test_uni_with_wrong_length_is_not_matched_as_u() {
        // "uni4E2D0" has five digits after "uni"; "ni4E2D0" is not hex
        assert_eq!(glyph_name_to_char("uni4E2D0"), None);
    }

    #[test]
    fn test_implausible_targets() {
        assert_eq!(glyph_name_to_char("uniE5D1"), None); // private use
        assert_eq!(glyph_name_to_char("uni0009"), None); // control
        assert_eq!(glyph_name_to_char("uni0020"), None); // space
        assert_eq!(glyph_name_to_char("uniD800"), None); // surrogate
        assert_eq!(glyph_name_to_char("uniFFFF"), None); // noncharacter
        assert_eq!(glyph_name_to_char("uniFDD0"), None); // noncharacter
        assert_eq!(glyph_name_to_char("u10FFFF"), None);
    }

    #[test]
    fn test_is_plausible_char() {
        assert!(is_plausible_char('中'));
        assert!(is_plausible_char('1'));
        assert!(is_plausible_char('，'));
        assert!(!is_plausible_char('\u{E000}'));
        assert!(!is_plausible_char('\n'));
    }
}
