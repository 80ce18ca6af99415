/*
 * utils.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Utility functions for working with UTF-16 columns.
 */

//! Utility functions for working with UTF-16 columns

/// UTF-16 column of byte index `byte` within a single line
///
/// Returns None when `byte` is past the end or not on a character boundary.
pub fn byte_to_utf16_column(line: &str, byte: usize) -> Option<usize> {
    line.get(..byte).map(|prefix| prefix.encode_utf16().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_in_multibyte_line() {
        let line = "naïve item";
        // 'ï' is two bytes but one UTF-16 unit, so "item" starts at byte 7 but column 6
        assert_eq!(byte_to_utf16_column(line, 7), Some(6));
        assert_eq!(byte_to_utf16_column(line, 0), Some(0));
        assert_eq!(byte_to_utf16_column(line, line.len()), Some(10));
        assert_eq!(byte_to_utf16_column(line, 3), None);
        assert_eq!(byte_to_utf16_column(line, 100), None);
    }

    #[test]
    fn test_astral_character_counts_twice() {
        let line = "🎉 item";
        assert_eq!(byte_to_utf16_column(line, 5), Some(3));
    }
}
