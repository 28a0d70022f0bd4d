//! Wall-clock helpers bound to the portal timezone

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use chrono_tz::Tz;

/// Current time in the configured timezone
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    tz: Tz,
}

impl Clock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// Today's date as `YYYY-MM-DD`
    pub fn today(&self) -> String {
        self.now().format("%Y-%m-%d").to_string()
    }

    pub fn today_date(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// UTC instant in ISO-8601 with milliseconds, as stored in logs
    pub fn iso_now(&self) -> String {
        iso(&Utc::now())
    }

    /// Parse a stored timestamp into the configured timezone.
    ///
    /// Accepts RFC 3339 text and bare `YYYY-MM-DD` dates (midnight local).
    pub fn parse(&self, raw: &str) -> Option<DateTime<Tz>> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&self.tz));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .and_then(|dt| dt.and_local_timezone(self.tz).earliest())
    }

    /// Long form used in notification emails: `Thu Jun 12 2025 14:30:15`
    pub fn long_form(&self, raw: &str) -> String {
        match self.parse(raw) {
            Some(at) => at.format("%a %b %d %Y %H:%M:%S").to_string(),
            None => raw.to_string(),
        }
    }
}

pub fn iso(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_and_bare_dates() {
        let clock = Clock::new(chrono_tz::Australia::Sydney);
        let at = clock.parse("2025-06-12T04:30:15.000Z").unwrap();
        assert_eq!(at.format("%Y-%m-%d %H:%M").to_string(), "2025-06-12 14:30");

        let day = clock.parse("2025-06-20").unwrap();
        assert_eq!(day.format("%H:%M").to_string(), "00:00");
        assert!(clock.parse("soon").is_none());
    }

    #[test]
    fn long_form_falls_back_to_raw_text() {
        let clock = Clock::new(chrono_tz::Australia::Sydney);
        assert_eq!(
            clock.long_form("2025-06-12T04:30:15Z"),
            "Thu Jun 12 2025 14:30:15"
        );
        assert_eq!(clock.long_form("yesterday"), "yesterday");
    }
}
