/// Reporting period filter
use crate::error::{AppError, AppResult};
use chrono::{Datelike, NaiveDate};

/// Calendar window applied to report listings and dashboards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportPeriod {
    /// The month containing "today" (UTC)
    #[default]
    CurrentMonth,
    /// A specific `YYYY-MM`
    Month { year: i32, month: u32 },
    All,
}

impl ReportPeriod {
    /// Parse `current`, `all` or `YYYY-MM`
    pub fn parse(s: &str) -> AppResult<Self> {
        let value = s.trim();
        match value.to_lowercase().as_str() {
            "current" => return Ok(ReportPeriod::CurrentMonth),
            "all" => return Ok(ReportPeriod::All),
            _ => {}
        }

        let invalid = || AppError::Validation(format!("Invalid month '{}', expected YYYY-MM", s));

        let (year, month) = value.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }

        Ok(ReportPeriod::Month { year, month })
    }

    /// Half-open `[start, end)` date range, `None` for all time
    pub fn bounds(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let (year, month) = match *self {
            ReportPeriod::All => return None,
            ReportPeriod::CurrentMonth => (today.year(), today.month()),
            ReportPeriod::Month { year, month } => (year, month),
        };

        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };

        Some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_period() {
        assert_eq!(ReportPeriod::parse("current").unwrap(), ReportPeriod::CurrentMonth);
        assert_eq!(ReportPeriod::parse("ALL").unwrap(), ReportPeriod::All);
        assert_eq!(
            ReportPeriod::parse("2024-01").unwrap(),
            ReportPeriod::Month { year: 2024, month: 1 }
        );
        assert!(ReportPeriod::parse("2024-13").is_err());
        assert!(ReportPeriod::parse("2024-1").is_err());
        assert!(ReportPeriod::parse("january").is_err());
    }

    #[test]
    fn test_bounds() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();

        assert_eq!(
            ReportPeriod::CurrentMonth.bounds(today),
            Some((
                NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
            ))
        );
        assert_eq!(
            ReportPeriod::Month { year: 2024, month: 2 }.bounds(today),
            Some((
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
            ))
        );
        assert_eq!(ReportPeriod::All.bounds(today), None);
    }
}
