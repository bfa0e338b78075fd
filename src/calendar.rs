use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

pub type HolidayId = u32;

/// A registered non-working period: a single day or an inclusive range
/// (multi-day holidays, company shutdowns).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub id: HolidayId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Holiday {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Classifies dates as working or non-working. Non-working days are
/// advisory: they feed rendering and holiday warnings, they never block
/// a placement.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkCalendar {
    non_working_weekdays: HashSet<Weekday>,
    holiday_ranges: Vec<(NaiveDate, NaiveDate)>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            non_working_weekdays: HashSet::from([Weekday::Sat, Weekday::Sun]),
            holiday_ranges: Vec::new(),
        }
    }
}

impl WorkCalendar {
    pub fn from_holidays<'a, I>(holidays: I) -> Self
    where
        I: IntoIterator<Item = &'a Holiday>,
    {
        let mut calendar = Self::default();
        for holiday in holidays {
            calendar.add_holiday_range(holiday.start_date, holiday.end_date);
        }
        calendar
    }

    /// Custom weekend pattern (e.g. a Mon-Sat lab week).
    pub fn with_non_working_weekdays<I>(weekdays: I) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        Self {
            non_working_weekdays: weekdays.into_iter().collect(),
            holiday_ranges: Vec::new(),
        }
    }

    pub fn add_holiday_range(&mut self, start: NaiveDate, end: NaiveDate) {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        self.holiday_ranges.push((start, end));
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holiday_ranges
            .iter()
            .any(|(start, end)| *start <= date && date <= *end)
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.non_working_weekdays.contains(&date.weekday()) && !self.is_holiday(date)
    }

    /// Plain calendar-day shift. Drag moves preserve a task's duration in
    /// calendar days, so this is the arithmetic the placement engine uses.
    pub fn shift_by_calendar_days(&self, date: NaiveDate, days: i64) -> NaiveDate {
        date + Duration::days(days)
    }

    /// Walks `days` working days from `date` (forward for positive,
    /// backward for negative), skipping weekends and holidays.
    pub fn add_working_days(&self, date: NaiveDate, days: i64) -> NaiveDate {
        let step = if days >= 0 { 1 } else { -1 };
        let mut remaining = days.abs();
        let mut current = date;
        while remaining > 0 {
            current += Duration::days(step);
            if self.is_working_day(current) {
                remaining -= 1;
            }
        }
        current
    }

    /// First working day strictly after `date`.
    pub fn next_working_day(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date + Duration::days(1);
        while !self.is_working_day(current) {
            current += Duration::days(1);
        }
        current
    }

    /// Count of working days in the inclusive range.
    pub fn count_working_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        let mut count = 0;
        let mut current = start;
        while current <= end {
            if self.is_working_day(current) {
                count += 1;
            }
            current += Duration::days(1);
        }
        count
    }
}

/// Holidays whose range touches the window `[from, from + horizon_days]`,
/// ordered by start date. Feeds the "upcoming holiday" warnings.
pub fn upcoming_holidays<'a, I>(holidays: I, from: NaiveDate, horizon_days: i64) -> Vec<&'a Holiday>
where
    I: IntoIterator<Item = &'a Holiday>,
{
    let window_end = from + Duration::days(horizon_days);
    let mut upcoming: Vec<&Holiday> = holidays
        .into_iter()
        .filter(|holiday| holiday.end_date >= from && holiday.start_date <= window_end)
        .collect();
    upcoming.sort_by_key(|holiday| (holiday.start_date, holiday.id));
    upcoming
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn carnaval() -> Holiday {
        Holiday {
            id: 1,
            name: "Carnaval".to_string(),
            start_date: d(2025, 3, 3),
            end_date: d(2025, 3, 4),
        }
    }

    #[test]
    fn weekends_are_non_working() {
        let calendar = WorkCalendar::default();
        assert!(calendar.is_working_day(d(2025, 3, 7))); // Friday
        assert!(!calendar.is_working_day(d(2025, 3, 8))); // Saturday
        assert!(!calendar.is_working_day(d(2025, 3, 9))); // Sunday
    }

    #[test]
    fn holiday_ranges_cover_every_day_inclusive() {
        let calendar = WorkCalendar::from_holidays([&carnaval()]);
        assert!(!calendar.is_working_day(d(2025, 3, 3)));
        assert!(!calendar.is_working_day(d(2025, 3, 4)));
        assert!(calendar.is_working_day(d(2025, 3, 5)));
    }

    #[test]
    fn add_working_days_skips_weekend_and_holiday() {
        let calendar = WorkCalendar::from_holidays([&carnaval()]);
        // Friday Feb 28 + 2 working days: skips Sat/Sun and Carnaval.
        assert_eq!(calendar.add_working_days(d(2025, 2, 28), 2), d(2025, 3, 6));
        // Backward across a weekend.
        assert_eq!(calendar.add_working_days(d(2025, 3, 10), -1), d(2025, 3, 7));
    }

    #[test]
    fn calendar_day_shift_ignores_non_working_days() {
        let calendar = WorkCalendar::from_holidays([&carnaval()]);
        assert_eq!(
            calendar.shift_by_calendar_days(d(2025, 2, 28), 4),
            d(2025, 3, 4)
        );
    }

    #[test]
    fn upcoming_window_is_inclusive_and_sorted() {
        let far = Holiday {
            id: 2,
            name: "Natal".to_string(),
            start_date: d(2025, 12, 25),
            end_date: d(2025, 12, 25),
        };
        let near = carnaval();
        let found = upcoming_holidays([&far, &near], d(2025, 3, 1), 14);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Carnaval");

        // A range already in progress still counts as upcoming.
        let found = upcoming_holidays([&near], d(2025, 3, 4), 7);
        assert_eq!(found.len(), 1);
    }
}
