//! Three-letter month and weekday codes.

/// A fixed lookup table from three-letter uppercase codes to field values.
#[derive(Debug, PartialEq, Eq)]
pub struct KeywordTable {
    entries: &'static [([u8; 3], u32)],
}

/// `JAN` to `DEC`, numbered 1 to 12.
pub static MONTHS: KeywordTable = KeywordTable {
    entries: &[
        (*b"JAN", 1),
        (*b"FEB", 2),
        (*b"MAR", 3),
        (*b"APR", 4),
        (*b"MAY", 5),
        (*b"JUN", 6),
        (*b"JUL", 7),
        (*b"AUG", 8),
        (*b"SEP", 9),
        (*b"OCT", 10),
        (*b"NOV", 11),
        (*b"DEC", 12),
    ],
};

/// `SUN` to `SAT`, in native numbering (Sunday is 0).
pub static WEEKDAYS: KeywordTable = KeywordTable {
    entries: &[
        (*b"SUN", 0),
        (*b"MON", 1),
        (*b"TUE", 2),
        (*b"WED", 3),
        (*b"THU", 4),
        (*b"FRI", 5),
        (*b"SAT", 6),
    ],
};

impl KeywordTable {
    /// Looks up an uppercase code. Anything that is not exactly three bytes long is rejected
    /// without consulting the table.
    pub fn lookup(&self, keyword: &str) -> Option<u32> {
        let code: [u8; 3] = keyword.as_bytes().try_into().ok()?;
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == code)
            .map(|&(_, value)| value)
    }
}
