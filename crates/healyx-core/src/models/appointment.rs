//! Appointment models.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use super::wire::{lenient_u32, null_as_default, string_or_number};

/// Default start time for a new appointment.
pub const DEFAULT_APPOINTMENT_TIME: &str = "10:00";

/// Default appointment length in minutes.
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Kind of visit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AppointmentType {
    Checkup,
    Consultation,
    Treatment,
    /// No type chosen yet
    Unspecified,
    /// Any other free-text type stored remotely
    Other(String),
}

impl AppointmentType {
    /// Types offered in the calendar filter.
    pub const FILTERABLE: [AppointmentType; 3] = [
        AppointmentType::Checkup,
        AppointmentType::Consultation,
        AppointmentType::Treatment,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            AppointmentType::Checkup => "Checkup",
            AppointmentType::Consultation => "Consultation",
            AppointmentType::Treatment => "Treatment",
            AppointmentType::Unspecified => "",
            AppointmentType::Other(s) => s,
        }
    }
}

impl From<&str> for AppointmentType {
    fn from(value: &str) -> Self {
        match value.trim() {
            "" => AppointmentType::Unspecified,
            v if v.eq_ignore_ascii_case("checkup") => AppointmentType::Checkup,
            v if v.eq_ignore_ascii_case("consultation") => AppointmentType::Consultation,
            v if v.eq_ignore_ascii_case("treatment") => AppointmentType::Treatment,
            v => AppointmentType::Other(v.to_string()),
        }
    }
}

impl From<String> for AppointmentType {
    fn from(value: String) -> Self {
        AppointmentType::from(value.as_str())
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AppointmentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AppointmentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(AppointmentType::from(raw))
    }
}

impl Default for AppointmentType {
    fn default() -> Self {
        AppointmentType::Unspecified
    }
}

/// An appointment row from the `appointments` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub patient_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub patient_name: String,
    /// Calendar date of the visit
    pub date: NaiveDate,
    /// Start time, "HH:MM"
    #[serde(deserialize_with = "clock_time")]
    pub time: String,
    /// Length in minutes
    #[serde(default, deserialize_with = "lenient_u32")]
    pub duration: u32,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    /// Provider who booked the appointment
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Appointment {
    /// Calendar label, e.g. "Ada Lovelace - 10:00".
    pub fn label(&self) -> String {
        format!("{} - {}", self.patient_name, self.time)
    }

    /// Columns sent when the appointment is edited.
    pub fn to_update_row(&self) -> Value {
        json!({
            "date": self.date.format("%Y-%m-%d").to_string(),
            "time": self.time,
            "patient_id": self.patient_id,
            "patient_name": self.patient_name,
            "duration": self.duration,
            "appointment_type": self.appointment_type.as_str(),
        })
    }

    /// Start time as a clock value, if well-formed.
    pub fn start_time(&self) -> Option<NaiveTime> {
        parse_clock(&self.time)
    }
}

/// The "Add New Appointment" form.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentDraft {
    pub patient_id: String,
    pub patient_name: String,
    pub date: NaiveDate,
    pub time: String,
    pub duration: u32,
    pub appointment_type: AppointmentType,
}

impl AppointmentDraft {
    /// A blank form dated `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            patient_id: String::new(),
            patient_name: String::new(),
            date: today,
            time: DEFAULT_APPOINTMENT_TIME.to_string(),
            duration: DEFAULT_DURATION_MINUTES,
            appointment_type: AppointmentType::Unspecified,
        }
    }

    /// Row inserted into the `appointments` table.
    pub fn to_insert_row(&self, patient_name: &str, user_id: &str) -> Value {
        json!({
            "date": self.date.format("%Y-%m-%d").to_string(),
            "time": self.time,
            "patient_id": self.patient_id,
            "patient_name": patient_name,
            "duration": self.duration,
            "appointment_type": self.appointment_type.as_str(),
            "user_id": user_id,
        })
    }
}

/// Parse "HH:MM" or "HH:MM:SS".
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

/// Normalize remote time values ("09:30:00", "9:30") to "HH:MM".
fn clock_time<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(parse_clock(&raw)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or(raw))
}
