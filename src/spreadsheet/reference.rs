//! Conversions between 0-based (row, column) indexes and A1-style cell references.

/// Converts a 0-based column index to its letters (`0` → `A`, `26` → `AA`).
pub(crate) fn col_to_letters(col: usize) -> String {
    let mut col = col + 1;
    let mut letters = String::new();
    while col > 0 {
        col -= 1;
        letters.insert(0, char::from(b'A' + (col % 26) as u8));
        col /= 26;
    }
    letters
}

/// Converts 0-based indexes to a reference such as `B3`.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", col_to_letters(col), row + 1)
}

/// Parses a reference such as `B3` (or `$B$3`) into 0-based (row, column) indexes.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters
        .to_ascii_uppercase()
        .bytes()
        .try_fold(0usize, |acc, byte| {
            acc.checked_mul(26)?.checked_add((byte - b'A' + 1) as usize)
        })?;
    let row = digits.parse::<usize>().ok()?;
    if row == 0 {
        None
    } else {
        Some((row - 1, col - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters() {
        assert_eq!(col_to_letters(0), "A");
        assert_eq!(col_to_letters(25), "Z");
        assert_eq!(col_to_letters(26), "AA");
        assert_eq!(col_to_letters(701), "ZZ");
        assert_eq!(col_to_letters(702), "AAA");
    }

    #[test]
    fn references() {
        assert_eq!(index_to_reference(0, 0), "A1");
        assert_eq!(index_to_reference(9, 27), "AB10");
        assert_eq!(reference_to_index("A1"), Some((0, 0)));
        assert_eq!(reference_to_index("ab10"), Some((9, 27)));
        assert_eq!(reference_to_index("$C$4"), Some((3, 2)));
    }

    #[test]
    fn invalid_references() {
        assert_eq!(reference_to_index("A"), None);
        assert_eq!(reference_to_index("12"), None);
        assert_eq!(reference_to_index("A0"), None);
        assert_eq!(reference_to_index("A1B"), None);
    }
}
