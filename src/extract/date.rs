//! PDF date strings (`D:YYYYMMDDHHmmSSOHH'mm'`).
//!
//! Every component after the year is optional. A missing offset is read as
//! UTC. Anything that does not fit the grammar yields `None`: a bad date in
//! the information dictionary never fails the extraction.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

/// Parse a PDF date string and normalise it to UTC.
pub fn parse_pdf_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);
    let mut cursor = Cursor { rest: s };

    let year = cursor.digits(4)? as i32;
    let month = cursor.optional_digits(2)?.unwrap_or(1);
    let day = cursor.optional_digits(2)?.unwrap_or(1);
    let hour = cursor.optional_digits(2)?.unwrap_or(0);
    let minute = cursor.optional_digits(2)?.unwrap_or(0);
    let second = cursor.optional_digits(2)?.unwrap_or(0);
    let offset = cursor.offset()?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    let local = offset.from_local_datetime(&naive).single()?;
    Some(local.with_timezone(&Utc))
}

struct Cursor<'a> {
    rest: &'a str,
}

impl Cursor<'_> {
    /// Exactly `n` ASCII digits.
    fn digits(&mut self, n: usize) -> Option<u32> {
        let head = self.rest.get(..n)?;
        if !head.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.rest = &self.rest[n..];
        head.parse().ok()
    }

    /// `Ok(None)` at end of input or at an offset marker, `None` on a
    /// partial group.
    fn optional_digits(&mut self, n: usize) -> Option<Option<u32>> {
        match self.rest.bytes().next() {
            None | Some(b'Z' | b'z' | b'+' | b'-') => Some(None),
            Some(_) => self.digits(n).map(Some),
        }
    }

    fn offset(&mut self) -> Option<FixedOffset> {
        let sign = match self.rest.bytes().next() {
            None => return FixedOffset::east_opt(0),
            Some(b'Z' | b'z') => {
                // Some producers write `Z00'00'`; the digits carry no information.
                let tail = self.rest[1..].trim_matches(|c: char| c == '\'' || c.is_ascii_digit());
                return if tail.is_empty() {
                    FixedOffset::east_opt(0)
                } else {
                    None
                };
            }
            Some(b'+') => 1,
            Some(b'-') => -1,
            Some(_) => return None,
        };
        self.rest = &self.rest[1..];

        let hours = self.digits(2)? as i32;
        self.skip_apostrophe();
        let minutes = if self.rest.is_empty() {
            0
        } else {
            self.digits(2)? as i32
        };
        self.skip_apostrophe();
        if !self.rest.is_empty() {
            return None;
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
    }

    fn skip_apostrophe(&mut self) {
        if let Some(rest) = self.rest.strip_prefix('\'') {
            self.rest = rest;
        }
    }
}
