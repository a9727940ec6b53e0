//! Calendar navigation and date arithmetic.
//!
//! Weeks start on Sunday, matching the month grid header
//! (`Sun Mon Tue Wed Thu Fri Sat`).

mod grid;

pub use grid::*;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Weekday header for the month and week grids.
pub const WEEKDAY_HEADERS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Which calendar layout is shown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CalendarView {
    #[default]
    Month,
    Week,
    Day,
}

impl CalendarView {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "month" => Some(CalendarView::Month),
            "week" => Some(CalendarView::Week),
            "day" => Some(CalendarView::Day),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarView::Month => "month",
            CalendarView::Week => "week",
            CalendarView::Day => "day",
        }
    }
}

/// Number of days in the month containing `date` (28-31).
pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = first_of_month(date);
    match first.checked_add_months(Months::new(1)) {
        Some(next) => (next - first).num_days() as u32,
        // Only reachable in December of NaiveDate::MAX's year
        None => 31,
    }
}

/// Weekday of the first of the month, Sunday = 0.
pub fn first_weekday_of_month(date: NaiveDate) -> u32 {
    first_of_month(date).weekday().num_days_from_sunday()
}

/// First day of the month containing `date`.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Sunday on or before `date`.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_sunday() as u64;
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// The seven days of the week containing `date`, Sunday first.
pub fn days_in_week(date: NaiveDate) -> Vec<NaiveDate> {
    start_of_week(date).iter_days().take(7).collect()
}

/// Month title, e.g. "October 2026".
pub fn month_title(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// Long day title, e.g. "Monday, October 19, 2026".
pub fn day_title(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// Week column header, e.g. ("Mon", "Oct 19").
pub fn week_column_header(date: NaiveDate) -> (String, String) {
    (
        date.format("%a").to_string(),
        date.format("%b %-d").to_string(),
    )
}

/// The date the calendar is focused on and the active layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarCursor {
    date: NaiveDate,
    view: CalendarView,
}

impl CalendarCursor {
    /// Month view focused on `date`.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            view: CalendarView::Month,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn view(&self) -> CalendarView {
        self.view
    }

    /// Switch layout; the focused date is kept.
    pub fn set_view(&mut self, view: CalendarView) {
        self.view = view;
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    /// Jump to the first day of the previous month.
    pub fn previous_month(&mut self) {
        if let Some(d) = first_of_month(self.date).checked_sub_months(Months::new(1)) {
            self.date = d;
        }
    }

    /// Jump to the first day of the next month.
    pub fn next_month(&mut self) {
        if let Some(d) = first_of_month(self.date).checked_add_months(Months::new(1)) {
            self.date = d;
        }
    }

    pub fn previous_week(&mut self) {
        if let Some(d) = self.date.checked_sub_days(Days::new(7)) {
            self.date = d;
        }
    }

    pub fn next_week(&mut self) {
        if let Some(d) = self.date.checked_add_days(Days::new(7)) {
            self.date = d;
        }
    }

    pub fn previous_day(&mut self) {
        if let Some(d) = self.date.pred_opt() {
            self.date = d;
        }
    }

    pub fn next_day(&mut self) {
        if let Some(d) = self.date.succ_opt() {
            self.date = d;
        }
    }

    /// Move back one unit of the current view.
    pub fn step_back(&mut self) {
        match self.view {
            CalendarView::Month => self.previous_month(),
            CalendarView::Week => self.previous_week(),
            CalendarView::Day => self.previous_day(),
        }
    }

    /// Move forward one unit of the current view.
    pub fn step_forward(&mut self) {
        match self.view {
            CalendarView::Month => self.next_month(),
            CalendarView::Week => self.next_week(),
            CalendarView::Day => self.next_day(),
        }
    }

    /// Title shown above the calendar controls: the long date in day view,
    /// otherwise the month.
    pub fn title(&self) -> String {
        match self.view {
            CalendarView::Day => day_title(self.date),
            CalendarView::Month | CalendarView::Week => month_title(self.date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(ymd(2026, 10, 19)), 31);
        assert_eq!(days_in_month(ymd(2026, 11, 5)), 30);
        assert_eq!(days_in_month(ymd(2026, 2, 1)), 28);
        assert_eq!(days_in_month(ymd(2028, 2, 29)), 29);
    }

    #[test]
    fn test_first_weekday_of_month() {
        // 2026-10-01 is a Thursday
        assert_eq!(first_weekday_of_month(ymd(2026, 10, 19)), 4);
        // 2026-11-01 is a Sunday
        assert_eq!(first_weekday_of_month(ymd(2026, 11, 20)), 0);
    }

    #[test]
    fn test_week_starts_sunday() {
        let days = days_in_week(ymd(2026, 10, 21)); // Wednesday
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], ymd(2026, 10, 18));
        assert_eq!(days[6], ymd(2026, 10, 24));

        // A Sunday is its own week start
        assert_eq!(start_of_week(ymd(2026, 10, 18)), ymd(2026, 10, 18));
    }

    #[test]
    fn test_month_navigation_resets_to_first() {
        let mut cursor = CalendarCursor::new(ymd(2026, 1, 31));
        cursor.next_month();
        assert_eq!(cursor.date(), ymd(2026, 2, 1));
        cursor.previous_month();
        cursor.previous_month();
        assert_eq!(cursor.date(), ymd(2025, 12, 1));
    }

    #[test]
    fn test_week_and_day_navigation() {
        let mut cursor = CalendarCursor::new(ymd(2026, 10, 29));
        cursor.next_week();
        assert_eq!(cursor.date(), ymd(2026, 11, 5));
        cursor.previous_day();
        assert_eq!(cursor.date(), ymd(2026, 11, 4));
        cursor.previous_week();
        assert_eq!(cursor.date(), ymd(2026, 10, 28));
        cursor.next_day();
        assert_eq!(cursor.date(), ymd(2026, 10, 29));
    }

    #[test]
    fn test_step_follows_view() {
        let mut cursor = CalendarCursor::new(ymd(2026, 10, 19));
        cursor.set_view(CalendarView::Day);
        cursor.step_forward();
        assert_eq!(cursor.date(), ymd(2026, 10, 20));

        cursor.set_view(CalendarView::Week);
        cursor.step_back();
        assert_eq!(cursor.date(), ymd(2026, 10, 13));

        cursor.set_view(CalendarView::Month);
        cursor.step_forward();
        assert_eq!(cursor.date(), ymd(2026, 11, 1));
        assert_eq!(cursor.view(), CalendarView::Month);
    }

    #[test]
    fn test_titles() {
        let date = ymd(2026, 10, 19);
        assert_eq!(month_title(date), "October 2026");
        assert_eq!(day_title(date), "Monday, October 19, 2026");
        assert_eq!(
            week_column_header(ymd(2026, 10, 4)),
            ("Sun".to_string(), "Oct 4".to_string())
        );
    }

    #[test]
    fn test_cursor_title_follows_view() {
        let mut cursor = CalendarCursor::new(ymd(2026, 10, 19));
        assert_eq!(cursor.title(), "October 2026");
        cursor.set_view(CalendarView::Week);
        assert_eq!(cursor.title(), "October 2026");
        cursor.set_view(CalendarView::Day);
        assert_eq!(cursor.title(), "Monday, October 19, 2026");
    }

    #[test]
    fn test_view_parse() {
        assert_eq!(CalendarView::parse("Week"), Some(CalendarView::Week));
        assert_eq!(CalendarView::parse("year"), None);
        assert_eq!(CalendarView::Day.as_str(), "day");
    }
}
