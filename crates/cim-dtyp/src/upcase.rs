//! [`UpcaseTable`] and the case-folded name comparison used to order and
//! search a directory's link table.

use std::cmp::Ordering;

/// Number of entries in a CIM image's upcase table.
pub const UPCASE_TABLE_LEN: usize = 65_536;

/// The per-image case-folding table: maps each BMP code unit to its
/// upcase-folded form. Always loaded from the image itself; never
/// hardcoded, so images produced with a different case table still
/// compare names correctly.
#[derive(Debug, Clone)]
pub struct UpcaseTable {
    entries: Box<[u16; UPCASE_TABLE_LEN]>,
}

impl UpcaseTable {
    /// Builds a table from exactly [`UPCASE_TABLE_LEN`] little-endian `u16`s.
    ///
    /// Returns `None` if `raw` is not exactly the right length; the caller
    /// maps that to `BadName`/`BadRegionOffset` as appropriate for the
    /// calling context.
    pub fn from_le_bytes(raw: &[u8]) -> Option<Self> {
        if raw.len() != UPCASE_TABLE_LEN * 2 {
            return None;
        }
        let mut entries = Box::new([0u16; UPCASE_TABLE_LEN]);
        for (i, chunk) in raw.chunks_exact(2).enumerate() {
            entries[i] = u16::from_le_bytes([chunk[0], chunk[1]]);
        }
        Some(UpcaseTable { entries })
    }

    /// Folds a single code point. Code points outside the BMP are left
    /// unchanged.
    pub fn fold(&self, code_point: u32) -> u32 {
        if code_point < 0x10000 {
            self.entries[code_point as usize] as u32
        } else {
            code_point
        }
    }
}

/// Decodes one UTF-16 code point from the front of `units`, folding it
/// through `table`. Returns the folded
/// code point and the number of `u16` units consumed (1, or 2 for a valid
/// surrogate pair). A lone surrogate decodes to `None`, which callers treat
/// as "this position cannot compare equal to anything".
fn fold_next_utf16(table: &UpcaseTable, units: &[u16]) -> (Option<u32>, usize) {
    let Some(&unit) = units.first() else {
        return (None, 0);
    };
    if (0xD800..=0xDBFF).contains(&unit) {
        if let Some(&low) = units.get(1) {
            if (0xDC00..=0xDFFF).contains(&low) {
                let high = unit as u32 - 0xD800;
                let low = low as u32 - 0xDC00;
                let cp = 0x10000 + (high << 10) + low;
                // Supplementary code points are not folded.
                return (Some(cp), 2);
            }
        }
        // Lone high surrogate.
        return (None, 1);
    }
    if (0xDC00..=0xDFFF).contains(&unit) {
        // Lone low surrogate.
        return (None, 1);
    }
    (Some(table.fold(unit as u32)), 1)
}

/// Compares a caller-supplied UTF-8 path component against a stored
/// UTF-16LE name, using the image's upcase-folded order.
///
/// `stored` is the raw UTF-16LE byte sequence of the name (no length
/// prefix). A lone surrogate anywhere in `stored` makes that position
/// compare as "miscompare" against any UTF-8 code point, which this
/// function realizes by ordering a `None` fold strictly greater than any
/// real code point (an arbitrary but total and consistent tiebreak).
pub fn compare_upcase_folded(table: &UpcaseTable, caller: &str, stored: &[u8]) -> Ordering {
    let mut caller_chars = caller.chars();
    let stored_units: Vec<u16> = stored
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    let mut stored_pos = 0usize;

    loop {
        let caller_next = caller_chars.next();
        let (stored_folded, consumed) = fold_next_utf16(table, &stored_units[stored_pos..]);

        match (caller_next, stored_folded) {
            (None, None) if stored_pos >= stored_units.len() => return Ordering::Equal,
            (None, _) => return Ordering::Less,
            (Some(_), None) if stored_pos >= stored_units.len() => return Ordering::Greater,
            (Some(a), stored_fold) => {
                let a_folded = table.fold(a as u32);
                let ordering = match stored_fold {
                    Some(b_folded) => a_folded.cmp(&b_folded),
                    // Lone surrogate in stored name: never equal, ordered
                    // consistently by treating it as "larger than any code point".
                    None => Ordering::Less,
                };
                match ordering {
                    Ordering::Equal => {
                        stored_pos += consumed;
                        continue;
                    }
                    other => return other,
                }
            }
        }
    }
}

/// Compares two stored UTF-16LE names under the same upcase-folded order as
/// [`compare_upcase_folded`]. Used to validate that a link table's names are
/// monotonically increasing.
pub fn compare_stored_names(table: &UpcaseTable, a: &[u8], b: &[u8]) -> Ordering {
    let to_units = |s: &[u8]| -> Vec<u16> {
        s.chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect()
    };
    let a_units = to_units(a);
    let b_units = to_units(b);
    let mut a_pos = 0usize;
    let mut b_pos = 0usize;

    loop {
        let (a_folded, a_consumed) = fold_next_utf16(table, &a_units[a_pos..]);
        let (b_folded, b_consumed) = fold_next_utf16(table, &b_units[b_pos..]);
        let a_done = a_pos >= a_units.len();
        let b_done = b_pos >= b_units.len();

        match (a_done, b_done) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        let ordering = match (a_folded, b_folded) {
            (Some(x), Some(y)) => x.cmp(&y),
            // A lone surrogate never compares equal; order it consistently
            // relative to any real code point on the other side.
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };

        match ordering {
            Ordering::Equal => {
                a_pos += a_consumed;
                b_pos += b_consumed;
                continue;
            }
            other => return other,
        }
    }
}
