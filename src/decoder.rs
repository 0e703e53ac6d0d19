//! Substitution decoder for obfuscated text.
//!
//! Each character of a string is looked up once in the substitution table
//! and replaced by its resolved string; anything not in the table (including
//! unresolved sources) passes through unchanged. Replacements are never
//! looked up again, so decoding is a single pass.

use std::collections::HashMap;

use serde_json::Value;

use crate::mapping::FontMapping;

/// Counters collected by [`TextDecoder::decode_value_with_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// String values visited (object keys excluded)
    pub strings: usize,
    /// Characters replaced
    pub replaced_chars: usize,
}

/// Applies a resolved mapping to text and JSON values.
#[derive(Debug, Clone, Default)]
pub struct TextDecoder {
    table: HashMap<char, String>,
}

impl TextDecoder {
    /// Decoder over the resolved entries of `mapping`.
    pub fn new(mapping: &FontMapping) -> Self {
        Self {
            table: mapping.substitution_table(),
        }
    }

    /// Decoder over an explicit table.
    pub fn from_table(table: HashMap<char, String>) -> Self {
        Self { table }
    }

    /// Number of substitutions.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Decode one string.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use glyph_oxide::decoder::TextDecoder;
    ///
    /// let decoder = TextDecoder::from_table(HashMap::from([('X', "中".to_string())]));
    /// assert_eq!(decoder.decode_str("XY"), "中Y");
    /// ```
    pub fn decode_str(&self, text: &str) -> String {
        self.decode_counting(text, &mut 0)
    }

    /// Decode every string inside `value`. Keys, numbers, booleans and nulls
    /// are kept as they are.
    pub fn decode_value(&self, value: &Value) -> Value {
        self.decode_value_with_stats(value).0
    }

    /// [`TextDecoder::decode_value`] plus counters.
    pub fn decode_value_with_stats(&self, value: &Value) -> (Value, DecodeStats) {
        let mut stats = DecodeStats::default();
        let decoded = map_strings(value, &mut |s: &str| {
            stats.strings += 1;
            self.decode_counting(s, &mut stats.replaced_chars)
        });
        (decoded, stats)
    }

    fn decode_counting(&self, text: &str, replaced: &mut usize) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match self.table.get(&c) {
                Some(real) => {
                    out.push_str(real);
                    *replaced += 1;
                },
                None => out.push(c),
            }
        }
        out
    }
}

/// Rebuild `value` with every string leaf passed through `f`.
fn map_strings(value: &Value, f: &mut impl FnMut(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        Value::Array(items) => Value::Array(items.iter().map(|v| map_strings(v, f)).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), map_strings(v, f))).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{MappingEntry, ResolutionMethod};
    use proptest::prelude::*;
    use serde_json::json;

    fn decoder(pairs: &[(char, &str)]) -> TextDecoder {
        TextDecoder::from_table(pairs.iter().map(|&(c, s)| (c, s.to_string())).collect())
    }

    #[test]
    fn test_decode_str_single_pass() {
        let d = decoder(&[('a', "b"), ('b', "c")]);
        assert_eq!(d.decode_str("ab"), "bc");
    }

    #[test]
    fn test_decode_str_empty() {
        assert_eq!(decoder(&[('X', "中")]).decode_str(""), "");
    }

    #[test]
    fn test_unresolved_entries_pass_through() {
        let mut mapping = FontMapping::new();
        mapping.insert(MappingEntry::unresolved('\u{E001}', "g1", 1).resolve("中", ResolutionMethod::NamingHeuristic, None));
        mapping.insert(MappingEntry::unresolved('\u{E002}', "g2", 2));
        let d = TextDecoder::new(&mapping);
        assert_eq!(d.len(), 1);
        assert_eq!(d.decode_str("\u{E001}\u{E002}"), "中\u{E002}");
    }

    #[test]
    fn test_decode_value_preserves_structure() {
        let d = decoder(&[('X', "中")]);
        let input = json!({
            "title": "XY",
            "count": 3,
            "ok": true,
            "none": null,
            "X": ["X", {"nested": "aXa"}, 1.5]
        });
        let (out, stats) = d.decode_value_with_stats(&input);
        assert_eq!(
            out,
            json!({
                "title": "中Y",
                "count": 3,
                "ok": true,
                "none": null,
                "X": ["中", {"nested": "a中a"}, 1.5]
            })
        );
        assert_eq!(stats.strings, 3);
        assert_eq!(stats.replaced_chars, 3);

        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["title", "count", "ok", "none", "X"]);
    }

    #[test]
    fn test_decode_scalar_values() {
        let d = decoder(&[('X', "中")]);
        assert_eq!(d.decode_value(&json!("X")), json!("中"));
        assert_eq!(d.decode_value(&json!(42)), json!(42));
        assert_eq!(d.decode_value(&Value::Null), Value::Null);
    }

    proptest! {
        #[test]
        fn prop_decode_idempotent_when_outputs_are_not_keys(text in "[a-e\u{E000}-\u{E004}]{0,32}") {
            let d = decoder(&[('\u{E000}', "中"), ('\u{E001}', "赤"), ('\u{E002}', "1"), ('\u{E003}', "z")]);
            let once = d.decode_str(&text);
            prop_assert_eq!(d.decode_str(&once), once.clone());
        }

        #[test]
        fn prop_empty_table_is_identity(text in "\\PC{0,32}") {
            prop_assert_eq!(TextDecoder::default().decode_str(&text), text);
        }

        #[test]
        fn prop_char_count_of_single_char_mapping(text in "[xy\u{E000}]{0,32}") {
            let d = decoder(&[('\u{E000}', "中")]);
            prop_assert_eq!(d.decode_str(&text).chars().count(), text.chars().count());
        }
    }
}
