//! Mapping of raw classifier codes to diagnostic categories.
//!
//! The remote service answers with a short code. This module turns that code
//! into a [`ClassificationResult`]. Mapping is total: a code the table does not
//! know becomes [`Category::Unknown`] instead of an error.

mod category;

pub use category::{Category, ClassificationResult};

/// Maps a raw result code to a classification result.
///
/// Codes `0` to `3` map to Normal, Turbid, Red and Green. A known code is a
/// single ASCII digit once surrounding whitespace is trimmed, so `"02"` and
/// `"+2"` are Unknown like any other text. The raw code is kept verbatim.
pub fn map(raw_code: &str) -> ClassificationResult {
    let category = match raw_code.trim() {
        "0" => Category::Normal,
        "1" => Category::Turbid,
        "2" => Category::Red,
        "3" => Category::Green,
        _ => Category::Unknown,
    };

    ClassificationResult::new(category, raw_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(map("0").category(), Category::Normal);
        assert_eq!(map("1").category(), Category::Turbid);
        assert_eq!(map("2").category(), Category::Red);
        assert_eq!(map("3").category(), Category::Green);
    }

    #[test]
    fn test_unknown_keeps_raw_code() {
        let result = map("7");
        assert_eq!(result.category(), Category::Unknown);
        assert_eq!(result.raw_code(), "7");
    }

    #[test]
    fn test_whitespace_is_ignored() {
        let result = map(" 2\n");
        assert_eq!(result.category(), Category::Red);
        assert_eq!(result.raw_code(), " 2\n");
    }

    #[test]
    fn test_garbage_is_unknown() {
        for raw in ["", "-1", "02x", "4", "256", "Red", "1.0"] {
            assert_eq!(map(raw).category(), Category::Unknown, "raw = {raw:?}");
        }
    }

    #[test]
    fn test_padded_and_signed_digits_are_unknown() {
        for raw in ["02", "+2", "00", " +0 ", "２"] {
            let result = map(raw);
            assert_eq!(result.category(), Category::Unknown, "raw = {raw:?}");
            assert_eq!(result.raw_code(), raw);
        }
    }

    proptest! {
        #[test]
        fn prop_map_is_total(raw in ".*") {
            let result = map(&raw);
            prop_assert_eq!(result.raw_code(), raw.as_str());
        }

        #[test]
        fn prop_map_is_deterministic(raw in ".*") {
            prop_assert_eq!(map(&raw), map(&raw));
        }

        #[test]
        fn prop_out_of_range_is_unknown(code in 4u32..u32::MAX) {
            prop_assert_eq!(map(&code.to_string()).category(), Category::Unknown);
        }

        #[test]
        fn prop_table_codes_are_known(code in 0u8..4) {
            prop_assert_ne!(map(&code.to_string()).category(), Category::Unknown);
        }

        #[test]
        fn prop_zero_padded_is_unknown(code in 0u8..4, zeros in 1usize..4) {
            let raw = format!("{}{code}", "0".repeat(zeros));
            prop_assert_eq!(map(&raw).category(), Category::Unknown);
        }
    }
}
