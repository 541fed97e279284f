//! Per-wiki timestamp grammar.
//!
//! Wikis render signature timestamps with a locale-specific date format,
//! digit system, month names, and timezone abbreviation. None of that is
//! hard-coded here: a [`TimestampFormat`] describes the wiki's conventions
//! and [`TimestampGrammar::compile`] turns it into a single scanning
//! pattern plus enough metadata to turn every match into a UTC instant.
//!
//! The format string uses the date codes the original wiki software uses:
//! `Y` (4-digit year), `m`/`n` (month number), `F`/`M` (month name, full or
//! abbreviated), `d`/`j` (day), `H`/`G` (hour), `i` (minute), `T` (timezone
//! abbreviation), `\x` (escaped literal). Everything else is literal text.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use regex::Regex;

use crate::error::{Error, Result};

/// Wiki-supplied description of how timestamps are rendered.
#[derive(Debug, Clone)]
pub struct TimestampFormat {
    /// Date format string, e.g. `"H:i, j F Y (T)"`.
    pub format: String,
    /// Local digits `0..=9`, when the wiki does not use ASCII digits.
    pub digits: Option<[char; 10]>,
    /// Twelve full month names, January first.
    pub month_names: Vec<String>,
    /// Twelve abbreviated month names, January first.
    pub month_abbrevs: Vec<String>,
    /// Timezone abbreviation to offset in minutes east of UTC.
    pub timezones: HashMap<String, i32>,
}

impl TimestampFormat {
    /// The format English-language wikis render by default.
    pub fn english() -> Self {
        let month_names = [
            "January", "February", "March", "April", "May", "June", "July",
            "August", "September", "October", "November", "December",
        ];
        let month_abbrevs = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep",
            "Oct", "Nov", "Dec",
        ];
        Self {
            format: "H:i, j F Y (T)".to_string(),
            digits: None,
            month_names: month_names.iter().map(|s| s.to_string()).collect(),
            month_abbrevs: month_abbrevs.iter().map(|s| s.to_string()).collect(),
            timezones: HashMap::from([("UTC".to_string(), 0)]),
        }
    }
}

/// One date component captured by the compiled pattern, in capture-group
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Year,
    MonthNum,
    MonthName,
    MonthAbbrev,
    Day,
    Hour,
    Minute,
    Timezone,
}

/// A timestamp occurrence within one text leaf.
#[derive(Debug, Clone)]
pub struct TimestampMatch {
    /// Byte offset of the match start within the leaf.
    pub start: usize,
    /// Byte offset one past the match end.
    pub end: usize,
    /// The matched substring.
    pub text: String,
    /// The instant, normalized to UTC.
    pub date: DateTime<Utc>,
}

/// Compiled timestamp grammar for one wiki.
#[derive(Debug, Clone)]
pub struct TimestampGrammar {
    pattern: Regex,
    fields: Vec<Field>,
    locale: TimestampFormat,
}

impl TimestampGrammar {
    /// Compile a wiki's timestamp format into a scanning grammar.
    pub fn compile(locale: TimestampFormat) -> Result<Self> {
        if locale.month_names.len() != 12 || locale.month_abbrevs.len() != 12 {
            return Err(Error::BadFormat(
                "month name tables must have 12 entries".to_string(),
            ));
        }

        let digit = digit_class(locale.digits.as_ref());
        let mut pattern = String::new();
        let mut fields = Vec::new();

        let mut chars = locale.format.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(esc) = chars.next() {
                        pattern.push_str(&regex::escape(&esc.to_string()));
                    }
                }
                'Y' => {
                    pattern.push_str(&format!("({digit}{{4}})"));
                    fields.push(Field::Year);
                }
                'm' => {
                    pattern.push_str(&format!("({digit}{{2}})"));
                    fields.push(Field::MonthNum);
                }
                'n' => {
                    pattern.push_str(&format!("({digit}{{1,2}})"));
                    fields.push(Field::MonthNum);
                }
                'F' => {
                    pattern.push_str(&alternation(&locale.month_names));
                    fields.push(Field::MonthName);
                }
                'M' => {
                    pattern.push_str(&alternation(&locale.month_abbrevs));
                    fields.push(Field::MonthAbbrev);
                }
                'd' => {
                    pattern.push_str(&format!("({digit}{{2}})"));
                    fields.push(Field::Day);
                }
                'j' => {
                    pattern.push_str(&format!("({digit}{{1,2}})"));
                    fields.push(Field::Day);
                }
                'H' => {
                    pattern.push_str(&format!("({digit}{{2}})"));
                    fields.push(Field::Hour);
                }
                'G' => {
                    pattern.push_str(&format!("({digit}{{1,2}})"));
                    fields.push(Field::Hour);
                }
                'i' => {
                    pattern.push_str(&format!("({digit}{{2}})"));
                    fields.push(Field::Minute);
                }
                'T' => {
                    if locale.timezones.is_empty() {
                        return Err(Error::BadFormat(
                            "format uses T but no timezones are configured".to_string(),
                        ));
                    }
                    let mut names: Vec<String> = locale.timezones.keys().cloned().collect();
                    names.sort();
                    pattern.push_str(&alternation(&names));
                    fields.push(Field::Timezone);
                }
                other => pattern.push_str(&regex::escape(&other.to_string())),
            }
        }

        for required in [Field::Year, Field::Day, Field::Hour, Field::Minute] {
            if !fields.contains(&required) {
                return Err(Error::BadFormat(format!(
                    "format {:?} is missing a {:?} component",
                    locale.format, required
                )));
            }
        }
        if !fields.iter().any(|f| {
            matches!(f, Field::MonthNum | Field::MonthName | Field::MonthAbbrev)
        }) {
            return Err(Error::BadFormat(format!(
                "format {:?} is missing a month component",
                locale.format
            )));
        }

        Ok(Self {
            pattern: Regex::new(&pattern)?,
            fields,
            locale,
        })
    }

    /// English-wiki grammar, for defaults and tests.
    pub fn english() -> Self {
        // The built-in format is statically known to compile.
        Self::compile(TimestampFormat::english()).expect("built-in timestamp format")
    }

    /// Find every timestamp occurrence in one text leaf, left to right.
    /// Matches whose components do not form a real calendar date are
    /// skipped, not errors.
    pub fn find_all(&self, text: &str) -> Vec<TimestampMatch> {
        let mut out = Vec::new();
        for caps in self.pattern.captures_iter(text) {
            let whole = match caps.get(0) {
                Some(m) => m,
                None => continue,
            };
            if let Some(date) = self.assemble(&caps) {
                out.push(TimestampMatch {
                    start: whole.start(),
                    end: whole.end(),
                    text: whole.as_str().to_string(),
                    date,
                });
            }
        }
        out
    }

    fn assemble(&self, caps: &regex::Captures<'_>) -> Option<DateTime<Utc>> {
        let mut year = None;
        let mut month = None;
        let mut day = None;
        let mut hour = None;
        let mut minute = None;
        let mut offset_minutes = 0i32;

        for (i, field) in self.fields.iter().enumerate() {
            let raw = caps.get(i + 1)?.as_str();
            match field {
                Field::Year => year = self.parse_num(raw),
                Field::MonthNum => month = self.parse_num(raw),
                Field::MonthName => {
                    month = self
                        .locale
                        .month_names
                        .iter()
                        .position(|m| m == raw)
                        .map(|p| p as u32 + 1);
                }
                Field::MonthAbbrev => {
                    month = self
                        .locale
                        .month_abbrevs
                        .iter()
                        .position(|m| m == raw)
                        .map(|p| p as u32 + 1);
                }
                Field::Day => day = self.parse_num(raw),
                Field::Hour => hour = self.parse_num(raw),
                Field::Minute => minute = self.parse_num(raw),
                Field::Timezone => {
                    offset_minutes = *self.locale.timezones.get(raw)?;
                }
            }
        }

        let naive = NaiveDate::from_ymd_opt(year? as i32, month?, day?)?
            .and_hms_opt(hour?, minute?, 0)?;
        let offset = FixedOffset::east_opt(offset_minutes * 60)?;
        let local = offset.from_local_datetime(&naive).single()?;
        Some(local.with_timezone(&Utc))
    }

    fn parse_num(&self, raw: &str) -> Option<u32> {
        match &self.locale.digits {
            None => raw.parse().ok(),
            Some(digits) => {
                let mut value: u32 = 0;
                for c in raw.chars() {
                    let d = if c.is_ascii_digit() {
                        c as u32 - '0' as u32
                    } else {
                        digits.iter().position(|&x| x == c)? as u32
                    };
                    value = value.checked_mul(10)?.checked_add(d)?;
                }
                Some(value)
            }
        }
    }
}

/// Character class matching one digit of the wiki's digit system.
fn digit_class(digits: Option<&[char; 10]>) -> String {
    match digits {
        None => "[0-9]".to_string(),
        Some(table) => {
            let mut class = String::from("[0-9");
            for &c in table {
                if !c.is_ascii_digit() {
                    class.push(c);
                }
            }
            class.push(']');
            class
        }
    }
}

/// Capture-group alternation of literal names, longest first so that
/// abbreviation-prefixed names never shadow the full form.
fn alternation(names: &[String]) -> String {
    let mut sorted: Vec<&String> = names.iter().collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let body: Vec<String> = sorted.iter().map(|n| regex::escape(n)).collect();
    format!("({})", body.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn english_scan() {
        let grammar = TimestampGrammar::english();
        let matches = grammar.find_all("Sure, done. 23:29, 10 May 2019 (UTC)");
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.text, "23:29, 10 May 2019 (UTC)");
        assert_eq!(m.date, Utc.with_ymd_and_hms(2019, 5, 10, 23, 29, 0).unwrap());
        assert_eq!(m.start, 12);
    }

    #[test]
    fn multiple_matches_in_one_leaf() {
        let grammar = TimestampGrammar::english();
        let matches = grammar
            .find_all("10:00, 1 Jan 2020 (UTC) and later 11:30, 2 Jan 2020 (UTC)");
        // Abbreviated month names don't match the full-name format.
        assert!(matches.is_empty());

        let matches = grammar
            .find_all("10:00, 1 January 2020 (UTC) and 11:30, 2 January 2020 (UTC)");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].date.hour(), 10);
        assert_eq!(matches[1].date.hour(), 11);
    }

    #[test]
    fn timezone_offset_normalized_to_utc() {
        let mut locale = TimestampFormat::english();
        locale.timezones.insert("CET".to_string(), 60);
        let grammar = TimestampGrammar::compile(locale).unwrap();
        let matches = grammar.find_all("12:00, 1 June 2021 (CET)");
        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].date,
            Utc.with_ymd_and_hms(2021, 6, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn impossible_dates_skipped() {
        let grammar = TimestampGrammar::english();
        assert!(grammar.find_all("25:61, 31 February 2020 (UTC)").is_empty());
    }

    #[test]
    fn transliterated_digits() {
        let mut locale = TimestampFormat::english();
        locale.digits = Some(['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩']);
        let grammar = TimestampGrammar::compile(locale).unwrap();
        let matches = grammar.find_all("١٢:٣٠, ٥ May ٢٠٢٠ (UTC)");
        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].date,
            Utc.with_ymd_and_hms(2020, 5, 5, 12, 30, 0).unwrap()
        );
    }

    #[test]
    fn missing_components_rejected() {
        let mut locale = TimestampFormat::english();
        locale.format = "H:i (T)".to_string();
        assert!(TimestampGrammar::compile(locale).is_err());
    }
}
