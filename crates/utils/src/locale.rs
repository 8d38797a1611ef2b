//! Per-bank parsing conventions: how dates and amounts are written in an export.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalConvention {
    /// `1,234.56`
    Point,
    /// `1 234,56`
    Comma,
}

/// Date pattern, decimal convention and the UTC offset local times are recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    pub date_format: &'static str,
    pub decimal: DecimalConvention,
    pub utc_offset_hours: i32,
}

impl Locale {
    pub const fn new(
        date_format: &'static str,
        decimal: DecimalConvention,
        utc_offset_hours: i32,
    ) -> Self {
        Self {
            date_format,
            decimal,
            utc_offset_hours,
        }
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    /// Parses a local timestamp with the locale's pattern. Date-only patterns resolve to
    /// midnight.
    pub fn parse_datetime(&self, value: &str) -> Option<DateTime<FixedOffset>> {
        let value = value.trim();
        let naive = NaiveDateTime::parse_from_str(value, self.date_format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, self.date_format)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })?;
        self.localize(naive)
    }

    pub fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        self.offset().from_local_datetime(&naive).single()
    }

    pub fn parse_amount(&self, value: &str) -> Option<Decimal> {
        let cleaned: String = match self.decimal {
            DecimalConvention::Point => value
                .chars()
                .filter(|c| !c.is_whitespace() && *c != ',')
                .collect(),
            DecimalConvention::Comma => value
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
                .map(|c| if c == ',' { '.' } else { c })
                .collect(),
        };
        if cleaned.is_empty() {
            return None;
        }
        Decimal::from_str(&cleaned)
            .or_else(|_| Decimal::from_scientific(&cleaned))
            .ok()
    }
}
