//! Lenient clinical date parsing
//!
//! Source systems populate timestamps with wildly varying precision. Both
//! CDA `TS` values (`YYYYMMDDhhmmss±zzzz`) and FHIR date/dateTime strings
//! (`YYYY[-MM[-DD[Thh:mm:ss…]]]`) reduce to a calendar date here; partial
//! precision rounds down to the first day of the period.

use chrono::NaiveDate;

/// Parse either timestamp flavor; `None` for values that fit neither.
pub fn parse_clinical_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains('-') || s.contains('T') {
        parse_fhir_date(s)
    } else {
        parse_cda_ts(s)
    }
}

/// CDA `TS` values: digit runs, optionally followed by a time part and zone.
fn parse_cda_ts(s: &str) -> Option<NaiveDate> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        0..=3 => None,
        4..=5 => NaiveDate::parse_from_str(&format!("{}0101", &digits[..4]), "%Y%m%d").ok(),
        6..=7 => NaiveDate::parse_from_str(&format!("{}01", &digits[..6]), "%Y%m%d").ok(),
        _ => NaiveDate::parse_from_str(&digits[..8], "%Y%m%d").ok(),
    }
}

/// FHIR date / dateTime values; anything past the date part is dropped.
fn parse_fhir_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.split('T').next().unwrap_or(s);

    match date_part.len() {
        4 => NaiveDate::parse_from_str(&format!("{date_part}-01-01"), "%Y-%m-%d").ok(),
        7 => NaiveDate::parse_from_str(&format!("{date_part}-01"), "%Y-%m-%d").ok(),
        10 => NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_cda_timestamps() {
        assert_eq!(parse_clinical_date("20170910"), Some(date(2017, 9, 10)));
        assert_eq!(
            parse_clinical_date("20170910123000+0200"),
            Some(date(2017, 9, 10))
        );
        assert_eq!(parse_clinical_date("201709"), Some(date(2017, 9, 1)));
        assert_eq!(parse_clinical_date("2017"), Some(date(2017, 1, 1)));
    }

    #[test]
    fn parses_fhir_dates() {
        assert_eq!(parse_clinical_date("2017-09-10"), Some(date(2017, 9, 10)));
        assert_eq!(
            parse_clinical_date("2017-09-10T11:30:00+02:00"),
            Some(date(2017, 9, 10))
        );
        assert_eq!(parse_clinical_date("2017-09"), Some(date(2017, 9, 1)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_clinical_date(""), None);
        assert_eq!(parse_clinical_date("unknown"), None);
        assert_eq!(parse_clinical_date("99"), None);
        assert_eq!(parse_clinical_date("2017-13-40"), None);
    }
}
