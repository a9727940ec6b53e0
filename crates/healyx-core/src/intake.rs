//! Structured intake form.
//!
//! Holds the structured summary of an outside record (who, by whom, what,
//! when, with which medications and devices) while a provider reviews it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Intake form errors.
#[derive(Error, Debug, PartialEq)]
pub enum IntakeError {
    #[error("Unknown intake field: {0}")]
    UnknownField(String),

    #[error("{list} index {index} out of range (len {len})")]
    IndexOutOfRange {
        list: &'static str,
        index: usize,
        len: usize,
    },
}

pub type IntakeResult<T> = Result<T, IntakeError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IntakePatient {
    pub name: String,
    pub dob: String,
    pub gender: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IntakeProvider {
    pub name: String,
    pub specialty: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IntakeDates {
    pub start: String,
    pub end: Option<String>,
}

/// The structured intake document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct IntakeForm {
    pub patient: IntakePatient,
    pub provider: IntakeProvider,
    pub treatment: String,
    pub dates: IntakeDates,
    pub medications: Vec<String>,
    pub injury_or_disease: String,
    pub medical_devices: Vec<String>,
}

/// Which list a list edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeList {
    Medications,
    MedicalDevices,
}

impl IntakeList {
    fn name(self) -> &'static str {
        match self {
            IntakeList::Medications => "medications",
            IntakeList::MedicalDevices => "medicalDevices",
        }
    }
}

impl IntakeForm {
    /// Set a scalar field by its dotted form name.
    ///
    /// Accepts `patient.name`, `patient.dob`, `patient.gender`,
    /// `provider.name`, `provider.specialty`, `dates.start`, `dates.end`,
    /// `treatment` and `injuryOrDisease`.
    pub fn set_field(&mut self, name: &str, value: &str) -> IntakeResult<()> {
        let value = value.to_string();
        match name {
            "patient.name" => self.patient.name = value,
            "patient.dob" => self.patient.dob = value,
            "patient.gender" => self.patient.gender = value,
            "provider.name" => self.provider.name = value,
            "provider.specialty" => self.provider.specialty = value,
            "dates.start" => self.dates.start = value,
            "dates.end" => self.dates.end = if value.is_empty() { None } else { Some(value) },
            "treatment" => self.treatment = value,
            "injuryOrDisease" | "injury_or_disease" => self.injury_or_disease = value,
            other => return Err(IntakeError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    fn list_mut(&mut self, list: IntakeList) -> &mut Vec<String> {
        match list {
            IntakeList::Medications => &mut self.medications,
            IntakeList::MedicalDevices => &mut self.medical_devices,
        }
    }

    /// Append a blank entry for the user to fill in.
    pub fn add_entry(&mut self, list: IntakeList) {
        self.list_mut(list).push(String::new());
    }

    pub fn set_entry(&mut self, list: IntakeList, index: usize, value: &str) -> IntakeResult<()> {
        let items = self.list_mut(list);
        let len = items.len();
        let slot = items.get_mut(index).ok_or(IntakeError::IndexOutOfRange {
            list: list.name(),
            index,
            len,
        })?;
        *slot = value.to_string();
        Ok(())
    }

    pub fn remove_entry(&mut self, list: IntakeList, index: usize) -> IntakeResult<String> {
        let items = self.list_mut(list);
        if index >= items.len() {
            return Err(IntakeError::IndexOutOfRange {
                list: list.name(),
                index,
                len: items.len(),
            });
        }
        Ok(items.remove(index))
    }

    /// Parse a structured summary returned by an extraction service.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Intake form slot that may not have been started yet.
///
/// Every edit starts a blank form first if there is none.
#[derive(Debug, Clone, Default)]
pub struct IntakeSlot {
    form: Option<IntakeForm>,
}

impl IntakeSlot {
    pub fn form(&self) -> Option<&IntakeForm> {
        self.form.as_ref()
    }

    pub fn edit(&mut self) -> &mut IntakeForm {
        self.form.get_or_insert_with(IntakeForm::default)
    }

    pub fn replace(&mut self, form: IntakeForm) {
        self.form = Some(form);
    }

    pub fn clear(&mut self) {
        self.form = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_dotted_fields() {
        let mut form = IntakeForm::default();
        form.set_field("patient.name", "John Doe").unwrap();
        form.set_field("provider.specialty", "Cardiology").unwrap();
        form.set_field("dates.end", "2023-10-27").unwrap();
        form.set_field("injuryOrDisease", "Coronary Artery Disease").unwrap();

        assert_eq!(form.patient.name, "John Doe");
        assert_eq!(form.provider.specialty, "Cardiology");
        assert_eq!(form.dates.end.as_deref(), Some("2023-10-27"));
        assert_eq!(form.injury_or_disease, "Coronary Artery Disease");

        assert_eq!(
            form.set_field("patient.ssn", "x"),
            Err(IntakeError::UnknownField("patient.ssn".into()))
        );
    }

    #[test]
    fn test_list_edits() {
        let mut form = IntakeForm::default();
        form.add_entry(IntakeList::Medications);
        form.add_entry(IntakeList::Medications);
        form.set_entry(IntakeList::Medications, 0, "Aspirin").unwrap();
        form.set_entry(IntakeList::Medications, 1, "Clopidogrel").unwrap();
        assert_eq!(form.remove_entry(IntakeList::Medications, 0).unwrap(), "Aspirin");
        assert_eq!(form.medications, vec!["Clopidogrel".to_string()]);

        assert!(matches!(
            form.set_entry(IntakeList::MedicalDevices, 0, "Stent"),
            Err(IntakeError::IndexOutOfRange { list: "medicalDevices", index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_slot_starts_blank_form() {
        let mut slot = IntakeSlot::default();
        assert!(slot.form().is_none());
        slot.edit().add_entry(IntakeList::MedicalDevices);
        assert_eq!(slot.form().unwrap().medical_devices.len(), 1);
    }

    #[test]
    fn test_parse_summary() {
        let json = r#"{
            "patient": {"name": "John Doe", "dob": "1980-01-01", "gender": "Male"},
            "provider": {"name": "Dr. Smith", "specialty": "Cardiology"},
            "treatment": "Angioplasty",
            "dates": {"start": "2023-10-26", "end": "2023-10-27"},
            "medications": ["Aspirin", "Clopidogrel"],
            "injuryOrDisease": "Coronary Artery Disease",
            "medicalDevices": ["Stent"]
        }"#;
        let form = IntakeForm::from_json(json).unwrap();
        assert_eq!(form.medications.len(), 2);
        assert_eq!(form.medical_devices, vec!["Stent".to_string()]);
    }
}
