use chrono::{Local, LocalResult, TimeZone};
use tracing::trace;

/// Best-effort timestamp recovery for one raw log line.
///
/// Recorded NMEA logs carry timestamps in several encodings, so parsing walks
/// three tiers in priority order and never fails:
///
/// 1. Trailing `YYYY/M/D H:MM:SS` after the sentence, e.g.
///    `!AIVDM,1,1,,B,169<lFOP008g7@...,0*16    2016/5/5 8:55:19`
/// 2. Leading numeric timestamp before a comma, e.g. `1462431319.5,$GPGGA,...`
///    (absolute or relative seconds)
/// 3. No timestamp at all: the line is the sentence and a per-parser
///    sequential counter supplies the seed (one second per line).
///
/// The counter in tier 3 belongs to this parser instance, so it restarts at 0
/// for every fresh load and cannot leak across independent replay sessions.
#[derive(Debug, Default)]
pub struct LineParser {
    fallback_index: u64,
}

impl LineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a raw line into `(sentence, offset_seed)`.
    ///
    /// The seed is either an absolute local-time Unix timestamp (tier 1), a
    /// caller-supplied number of seconds (tier 2), or a synthetic sequence
    /// number (tier 3). Callers normalize seeds against the first line's seed.
    pub fn parse(&mut self, line: &str) -> (String, f64) {
        if let Some((sentence, seed)) = try_trailing_datetime(line) {
            trace!("trailing datetime: seed={} sentence={:?}", seed, sentence);
            return (sentence, seed);
        }

        if let Some((sentence, seed)) = try_leading_numeric(line) {
            trace!("leading numeric: seed={} sentence={:?}", seed, sentence);
            return (sentence, seed);
        }

        let seed = self.fallback_index as f64;
        self.fallback_index += 1;
        (line.to_string(), seed)
    }
}

/// Tier 1: sentence followed by whitespace and a `Y/M/D H:M:S` local time.
///
/// The split point is found by scanning backward from the last `:` (assumed
/// to sit inside the time-of-day field) over the time token, the date token,
/// and the space runs separating them, stopping at the last byte of the
/// sentence. The split must land after byte 10 and leave at least 16 bytes of
/// separator-plus-timestamp, the tightest window a full `Y/M/D H:M:S` suffix
/// can occupy. The heuristic is tuned to this one recorded-log layout: a
/// sentence whose tail carries its own colons or odd spacing can misplace the
/// split, and the line then falls through to the next tier.
fn try_trailing_datetime(line: &str) -> Option<(String, f64)> {
    let bytes = line.as_bytes();
    let last_colon = line.rfind(':')?;
    if last_colon + 2 >= line.len() {
        return None;
    }

    // Back over the time token, the date token, and both space runs.
    let mut split = last_colon;
    while split > 0 && bytes[split] != b' ' {
        split -= 1;
    }
    while split > 0 && bytes[split] == b' ' {
        split -= 1;
    }
    while split > 0 && bytes[split] != b' ' {
        split -= 1;
    }
    while split > 0 && bytes[split] == b' ' {
        split -= 1;
    }

    if split <= 10 || split + 15 >= line.len() {
        return None;
    }
    split += 1; // first byte of the sentence/timestamp separator

    // The split sits next to a space so it is a valid char boundary, but the
    // checked slice keeps pathological input from panicking.
    let sentence = line.get(..split)?.trim_end();
    let stamp = line.get(split..)?.trim_start();

    let seed = parse_local_datetime(stamp)?;
    Some((sentence.to_string(), seed))
}

/// Parse `Y/M/D H:M:S` as a local-time Unix timestamp.
///
/// Field bounds are checked before calendar conversion (`1900..=2100`,
/// `1..=12`, `1..=31`). Dates that pass the bounds but are not real calendar
/// dates (31 April) are rejected, as are out-of-range time fields and local
/// times skipped by a DST transition; an ambiguous local time during a DST
/// fold resolves to the earlier of the two instants.
fn parse_local_datetime(stamp: &str) -> Option<f64> {
    if stamp.len() < 10 {
        return None;
    }

    let mut fields = stamp.split_whitespace();
    let date = fields.next()?;
    let time = fields.next()?;

    let mut date_parts = date.split('/');
    let year: i32 = date_parts.next()?.parse().ok()?;
    let month: u32 = date_parts.next()?.parse().ok()?;
    let day: u32 = date_parts.next()?.parse().ok()?;

    let mut time_parts = time.split(':');
    let hour: u32 = time_parts.next()?.parse().ok()?;
    let min: u32 = time_parts.next()?.parse().ok()?;
    let sec: u32 = time_parts.next()?.parse().ok()?;

    if !(1900..=2100).contains(&year) || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    match Local.with_ymd_and_hms(year, month, day, hour, min, sec) {
        LocalResult::Single(dt) => Some(dt.timestamp() as f64),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp() as f64),
        LocalResult::None => None,
    }
}

/// Tier 2: `<numeric-seconds>,<sentence>`.
///
/// The comma must appear within the first 30 bytes and the prefix must parse
/// entirely as a float, otherwise the line falls through.
fn try_leading_numeric(line: &str) -> Option<(String, f64)> {
    let comma = line.find(',')?;
    if comma == 0 || comma >= 30 {
        return None;
    }

    let seed: f64 = line[..comma].parse().ok()?;
    Some((line[comma + 1..].to_string(), seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> f64 {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .earliest()
            .expect("valid test date")
            .timestamp() as f64
    }

    #[test]
    fn test_trailing_datetime() {
        let mut parser = LineParser::new();
        let line = "!AIVDM,1,1,,B,169<lFOP008g7@`A:;iP@wv20818,0*16    2016/5/5 8:55:19";
        let (sentence, seed) = parser.parse(line);
        assert_eq!(sentence, "!AIVDM,1,1,,B,169<lFOP008g7@`A:;iP@wv20818,0*16");
        assert_eq!(seed, local_ts(2016, 5, 5, 8, 55, 19));
    }

    #[test]
    fn test_trailing_datetime_single_space_separator() {
        let mut parser = LineParser::new();
        let (sentence, seed) = parser.parse("$GPGGA,123519,4807.038,N 2016/12/31 23:59:59");
        assert_eq!(sentence, "$GPGGA,123519,4807.038,N");
        assert_eq!(seed, local_ts(2016, 12, 31, 23, 59, 59));
    }

    #[test]
    fn test_split_must_exceed_ten() {
        // Last sentence byte at index 10: the window check rejects the split
        // and the line falls through (tier 2 consumes the leading number).
        let mut parser = LineParser::new();
        let (sentence, seed) = parser.parse("1,ABCDEFGHI 2016/5/5 8:55:19");
        assert_eq!(seed, 1.0);
        assert_eq!(sentence, "ABCDEFGHI 2016/5/5 8:55:19");

        // One more sentence byte and tier 1 wins instead.
        let (sentence, seed) = parser.parse("1,ABCDEFGHIJ 2016/5/5 8:55:19");
        assert_eq!(sentence, "1,ABCDEFGHIJ");
        assert_eq!(seed, local_ts(2016, 5, 5, 8, 55, 19));
    }

    #[test]
    fn test_suffix_window_boundary() {
        // The shortest parseable suffix the window admits.
        let mut parser = LineParser::new();
        let (sentence, seed) = parser.parse("ABCDEFGHIJKL 1900/1/1 0:0:59");
        assert_eq!(sentence, "ABCDEFGHIJKL");
        assert_eq!(seed, local_ts(1900, 1, 1, 0, 0, 59));

        // Two-digit year: one byte short of the window, rejected before any
        // field parsing, so the line lands in tier 3.
        let (sentence, seed) = parser.parse("$GPGGA,123519,4807.038,N 16/5/5 8:5:19");
        assert_eq!(sentence, "$GPGGA,123519,4807.038,N 16/5/5 8:5:19");
        assert_eq!(seed, 0.0);
    }

    #[test]
    fn test_bare_time_without_date_falls_through() {
        // With no date token the backward scan runs into the sentence body
        // and the split is rejected.
        let mut parser = LineParser::new();
        let (sentence, seed) = parser.parse("$GPGGA,123519,4807.038,N 8:55:19");
        assert_eq!(sentence, "$GPGGA,123519,4807.038,N 8:55:19");
        assert_eq!(seed, 0.0);
    }

    #[test]
    fn test_month_out_of_range_falls_through() {
        let mut parser = LineParser::new();
        let (sentence, seed) = parser.parse("$GPGGA,123519,4807.038,N 2016/13/5 8:55:19");
        assert_eq!(sentence, "$GPGGA,123519,4807.038,N 2016/13/5 8:55:19");
        assert_eq!(seed, 0.0);
    }

    #[test]
    fn test_calendar_invalid_date_rejected() {
        // 31 April passes the raw bounds checks but is not a real date;
        // policy is to reject, not normalize.
        let mut parser = LineParser::new();
        let (sentence, seed) = parser.parse("$GPGGA,123519,4807.038,N 2016/4/31 8:55:19");
        assert_eq!(sentence, "$GPGGA,123519,4807.038,N 2016/4/31 8:55:19");
        assert_eq!(seed, 0.0);
    }

    #[test]
    fn test_leading_numeric() {
        let mut parser = LineParser::new();
        let (sentence, seed) = parser.parse("0,!AIVDM,1,1,,B,AAA,0*00");
        assert_eq!(sentence, "!AIVDM,1,1,,B,AAA,0*00");
        assert_eq!(seed, 0.0);

        let (sentence, seed) = parser.parse("1462431319.25,$GPGGA,123519,4807.038,N");
        assert_eq!(sentence, "$GPGGA,123519,4807.038,N");
        assert_eq!(seed, 1462431319.25);
    }

    #[test]
    fn test_non_numeric_prefix_is_not_tier_two() {
        // `$GPGGA` before the first comma is not a number, so the whole line
        // is the sentence.
        let mut parser = LineParser::new();
        let (sentence, seed) = parser.parse("$GPGGA,123519,4807.038,N,01131.000,E");
        assert_eq!(sentence, "$GPGGA,123519,4807.038,N,01131.000,E");
        assert_eq!(seed, 0.0);
    }

    #[test]
    fn test_fallback_counter_increments_per_fallback_only() {
        let mut parser = LineParser::new();
        let (_, a) = parser.parse("$GPGLL");
        let (_, b) = parser.parse("5,$GPGSV,3,1,11");
        let (_, c) = parser.parse("$GPRMC");
        assert_eq!(a, 0.0);
        assert_eq!(b, 5.0);
        assert_eq!(c, 1.0);
    }

    #[test]
    fn test_fresh_parser_restarts_counter() {
        let mut parser = LineParser::new();
        parser.parse("$GPGLL");
        parser.parse("$GPRMC");

        let mut fresh = LineParser::new();
        let (_, seed) = fresh.parse("$GPGLL");
        assert_eq!(seed, 0.0);
    }

    #[test]
    fn test_multibyte_near_split_does_not_panic() {
        let mut parser = LineParser::new();
        let (sentence, seed) = parser.parse("$GPWPLé,4807.038,Nαβγ 2016/5/5 8:55:19");
        assert_eq!(sentence, "$GPWPLé,4807.038,Nαβγ");
        assert_eq!(seed, local_ts(2016, 5, 5, 8, 55, 19));
    }
}
