//! Month/week/day grids with appointments placed on their dates.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::{days_in_month, days_in_week, first_of_month, first_weekday_of_month, month_title};
use crate::models::{Appointment, AppointmentType};

/// Appointment-type filter from the sidebar.
///
/// An empty selection shows every appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeFilter {
    selected: BTreeSet<AppointmentType>,
}

impl TypeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `ty` if unselected, otherwise unselect it.
    pub fn toggle(&mut self, ty: AppointmentType) {
        if !self.selected.remove(&ty) {
            self.selected.insert(ty);
        }
    }

    pub fn is_selected(&self, ty: &AppointmentType) -> bool {
        self.selected.contains(ty)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn selected(&self) -> impl Iterator<Item = &AppointmentType> {
        self.selected.iter()
    }

    /// Check if an appointment passes the filter.
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.selected.is_empty() || self.selected.contains(&appointment.appointment_type)
    }
}

/// One day in a grid with the appointments that fall on it.
#[derive(Debug, Clone, PartialEq)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    /// Ordered by start time, then patient name
    pub appointments: Vec<&'a Appointment>,
}

/// The month layout: blank cells until the first weekday, then one cell per day.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid<'a> {
    pub title: String,
    pub leading_blanks: usize,
    pub days: Vec<DayCell<'a>>,
}

impl<'a> MonthGrid<'a> {
    /// All cells in display order; `None` is a blank cell.
    pub fn cells(&self) -> impl Iterator<Item = Option<&DayCell<'a>>> {
        std::iter::repeat(None)
            .take(self.leading_blanks)
            .chain(self.days.iter().map(Some))
    }

    /// Number of calendar rows needed to draw the grid.
    pub fn row_count(&self) -> usize {
        (self.leading_blanks + self.days.len()).div_ceil(7)
    }
}

/// Appointments that pass `filter`, grouped by date and ordered within a date.
pub fn place_appointments<'a>(
    appointments: &'a [Appointment],
    filter: &TypeFilter,
) -> BTreeMap<NaiveDate, Vec<&'a Appointment>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&'a Appointment>> = BTreeMap::new();
    for appointment in appointments.iter().filter(|a| filter.matches(a)) {
        by_date.entry(appointment.date).or_default().push(appointment);
    }
    for day in by_date.values_mut() {
        day.sort_by(|a, b| {
            a.start_time()
                .cmp(&b.start_time())
                .then_with(|| a.time.cmp(&b.time))
                .then_with(|| a.patient_name.cmp(&b.patient_name))
        });
    }
    by_date
}

/// Build the month grid for the month containing `date`.
pub fn month_grid<'a>(
    date: NaiveDate,
    appointments: &'a [Appointment],
    filter: &TypeFilter,
) -> MonthGrid<'a> {
    let mut placed = place_appointments(appointments, filter);
    let days = first_of_month(date)
        .iter_days()
        .take(days_in_month(date) as usize)
        .map(|d| DayCell {
            date: d,
            appointments: placed.remove(&d).unwrap_or_default(),
        })
        .collect();

    MonthGrid {
        title: month_title(date),
        leading_blanks: first_weekday_of_month(date) as usize,
        days,
    }
}

/// Build the seven cells of the week containing `date`.
pub fn week_grid<'a>(
    date: NaiveDate,
    appointments: &'a [Appointment],
    filter: &TypeFilter,
) -> Vec<DayCell<'a>> {
    let mut placed = place_appointments(appointments, filter);
    days_in_week(date)
        .into_iter()
        .map(|d| DayCell {
            date: d,
            appointments: placed.remove(&d).unwrap_or_default(),
        })
        .collect()
}

/// The single cell of the day view.
pub fn day_agenda<'a>(
    date: NaiveDate,
    appointments: &'a [Appointment],
    filter: &TypeFilter,
) -> DayCell<'a> {
    let mut placed = place_appointments(appointments, filter);
    DayCell {
        date,
        appointments: placed.remove(&date).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn appt(id: &str, name: &str, date: NaiveDate, time: &str, ty: AppointmentType) -> Appointment {
        Appointment {
            id: id.into(),
            patient_id: format!("p-{}", id),
            patient_name: name.into(),
            date,
            time: time.into(),
            duration: 30,
            appointment_type: ty,
            user_id: None,
        }
    }

    fn sample() -> Vec<Appointment> {
        vec![
            appt("1", "Zed", ymd(2026, 10, 19), "14:00", AppointmentType::Checkup),
            appt("2", "Ada", ymd(2026, 10, 19), "09:15", AppointmentType::Treatment),
            appt("3", "Bea", ymd(2026, 10, 19), "09:15", AppointmentType::Consultation),
            appt("4", "Cy", ymd(2026, 11, 2), "11:00", AppointmentType::Checkup),
            appt("5", "Di", ymd(2026, 10, 24), "08:00", AppointmentType::Checkup),
        ]
    }

    #[test]
    fn test_month_grid_layout() {
        let appts = sample();
        let grid = month_grid(ymd(2026, 10, 5), &appts, &TypeFilter::new());

        assert_eq!(grid.title, "October 2026");
        assert_eq!(grid.leading_blanks, 4);
        assert_eq!(grid.days.len(), 31);
        assert_eq!(grid.cells().count(), 35);
        assert_eq!(grid.row_count(), 5);

        let day19 = &grid.days[18];
        assert_eq!(day19.date, ymd(2026, 10, 19));
        let names: Vec<_> = day19.appointments.iter().map(|a| a.patient_name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Bea", "Zed"]);

        // November appointment not in October
        let total: usize = grid.days.iter().map(|d| d.appointments.len()).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_filter_toggle() {
        let appts = sample();
        let mut filter = TypeFilter::new();
        filter.toggle(AppointmentType::Checkup);
        assert!(filter.is_selected(&AppointmentType::Checkup));

        let day = day_agenda(ymd(2026, 10, 19), &appts, &filter);
        assert_eq!(day.appointments.len(), 1);
        assert_eq!(day.appointments[0].id, "1");

        filter.toggle(AppointmentType::Checkup);
        let day = day_agenda(ymd(2026, 10, 19), &appts, &filter);
        assert_eq!(day.appointments.len(), 3);
    }

    #[test]
    fn test_week_grid_crosses_month() {
        let appts = sample();
        // Week of Sun 2026-11-01 .. Sat 2026-11-07
        let week = week_grid(ymd(2026, 11, 4), &appts, &TypeFilter::new());
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, ymd(2026, 11, 1));
        assert_eq!(week[1].appointments.len(), 1);
        assert_eq!(week[1].appointments[0].patient_name, "Cy");
    }

    #[test]
    fn test_empty_day() {
        let appts = sample();
        let day = day_agenda(ymd(2026, 10, 20), &appts, &TypeFilter::new());
        assert!(day.appointments.is_empty());
    }
}
