//! Shared formula expansion
//!
//! A formula filled across cells is stored once on its anchor cell as
//! `<f t="shared" si="N" ref="..">text</f>`; every other cell of the group
//! only carries `<f t="shared" si="N"/>`. Each follower gets the anchor's
//! text with its relative references moved by the follower's offset.

use std::collections::HashMap;

use quotecalc_core::{CellAddress, MAX_COLS, MAX_ROWS};

/// Anchor formulas of one sheet, keyed by `si`
#[derive(Debug, Default)]
pub(crate) struct SharedFormulas {
    groups: HashMap<u32, (CellAddress, String)>,
}

impl SharedFormulas {
    pub(crate) fn register(&mut self, index: u32, anchor: CellAddress, text: &str) {
        self.groups.insert(index, (anchor, text.to_string()));
    }

    /// Formula text for a follower at `cell`, `None` when the group is
    /// unknown or a shifted reference leaves the sheet
    pub(crate) fn follower(&self, index: u32, cell: CellAddress) -> Option<String> {
        let (anchor, text) = self.groups.get(&index)?;
        let rows = i64::from(cell.row) - i64::from(anchor.row);
        let cols = i64::from(cell.col) - i64::from(anchor.col);
        shift_formula(text, rows, cols)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '$' | '_' | '.' | '\\')
}

/// Move every relative reference in `text` by (`rows`, `cols`)
///
/// String literals and quoted sheet names are copied untouched; function
/// names and sheet prefixes are recognised by the `(` or `!` that follows.
pub(crate) fn shift_formula(text: &str, rows: i64, cols: i64) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                let start = i;
                i += 1;
                while i < chars.len() {
                    if chars[i] == c {
                        if chars.get(i + 1) == Some(&c) {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
                out.extend(&chars[start..i]);
            }
            c if is_word_char(c) => {
                let start = i;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let next = chars.get(i).copied();
                let beside_colon = next == Some(':') || out.ends_with(':');

                if matches!(next, Some('(') | Some('!')) {
                    out.push_str(&word);
                } else if let Some(shifted) = shift_word(&word, rows, cols, beside_colon) {
                    out.push_str(&shifted?);
                } else {
                    out.push_str(&word);
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    Some(out)
}

/// `None` when `word` is not a reference; `Some(None)` when it is one but
/// moves off the sheet
fn shift_word(word: &str, rows: i64, cols: i64, beside_colon: bool) -> Option<Option<String>> {
    let (col_absolute, rest) = match word.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, word),
    };
    let letters_end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    let (letters, rest) = rest.split_at(letters_end);
    let (row_absolute, digits) = match rest.strip_prefix('$') {
        Some(digits) => (true, digits),
        None => (false, rest),
    };
    if !digits.bytes().all(|b| b.is_ascii_digit()) || letters.len() > 3 {
        return None;
    }

    match (letters.is_empty(), digits.is_empty()) {
        // B13, $B13, B$13, $B$13
        (false, false) => {
            let addr = CellAddress::parse(word).ok()?;
            let row = move_index(addr.row.into(), rows, addr.row_absolute, MAX_ROWS.into());
            let col = move_index(addr.col.into(), cols, addr.col_absolute, MAX_COLS.into());
            Some(row.zip(col).map(|(row, col)| {
                CellAddress::with_absolute(row as u32, col as u16, addr.row_absolute, addr.col_absolute)
                    .to_a1_string()
            }))
        }
        // K in K:K
        (false, true) if beside_colon && !row_absolute => {
            let col = CellAddress::letters_to_column(letters).ok()?;
            let moved = move_index(col.into(), cols, col_absolute, MAX_COLS.into());
            Some(moved.map(|col| {
                let prefix = if col_absolute { "$" } else { "" };
                format!("{prefix}{}", CellAddress::column_to_letters(col as u16))
            }))
        }
        // 5 in 5:5
        (true, false) if beside_colon && !col_absolute => {
            let row: i64 = digits.parse().ok()?;
            let moved = move_index(row - 1, rows, row_absolute, MAX_ROWS.into());
            Some(moved.map(|row| {
                let prefix = if row_absolute { "$" } else { "" };
                format!("{prefix}{}", row + 1)
            }))
        }
        _ => None,
    }
}

fn move_index(index: i64, by: i64, absolute: bool, limit: i64) -> Option<i64> {
    if absolute {
        return Some(index);
    }
    let moved = index + by;
    (0..limit).contains(&moved).then_some(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shift(text: &str, rows: i64, cols: i64) -> String {
        shift_formula(text, rows, cols).unwrap()
    }

    #[test]
    fn test_relative_and_absolute_refs() {
        assert_eq!(shift("$B$13*2", 0, 2), "$B$13*2");
        assert_eq!(shift("C19-C20", 0, 1), "D19-D20");
        assert_eq!(shift("$A1+A$1+A1", 3, 2), "$A4+C$1+C4");
        assert_eq!(shift("SUM(C2:C10)/B$7", 1, 0), "SUM(C3:C11)/B$7");
    }

    #[test]
    fn test_names_strings_and_sheets_untouched() {
        assert_eq!(shift("LOG10(A1)&\"A1\"", 1, 0), "LOG10(A2)&\"A1\"");
        assert_eq!(shift("'FC 2'!B13+produtos!K2", 0, 1), "'FC 2'!C13+produtos!L2");
        assert_eq!(shift("IFERROR(B19/B13,0)", 0, 1), "IFERROR(C19/C13,0)");
        assert_eq!(shift("TRUE+#REF!", 4, 4), "TRUE+#REF!");
    }

    #[test]
    fn test_whole_column_and_row_refs() {
        assert_eq!(shift("SUM(K:K)", 5, 1), "SUM(L:L)");
        assert_eq!(shift("SUM($K:K)", 5, 1), "SUM($K:L)");
        assert_eq!(shift("SUM(2:3)", 2, 7), "SUM(4:5)");
        assert_eq!(shift("1.5+2", 2, 2), "1.5+2");
    }

    #[test]
    fn test_off_sheet_is_rejected() {
        assert_eq!(shift_formula("A1", -1, 0), None);
        assert_eq!(shift_formula("XFD1", 0, 1), None);
        assert_eq!(shift_formula("$A$1", -1, -1), Some("$A$1".to_string()));
    }

    #[test]
    fn test_group_lookup() {
        let mut groups = SharedFormulas::default();
        groups.register(0, CellAddress::new(19, 2), "$B$13*C19");
        assert_eq!(
            groups.follower(0, CellAddress::new(19, 4)).as_deref(),
            Some("$B$13*E19")
        );
        assert_eq!(groups.follower(1, CellAddress::new(19, 4)), None);
    }
}
