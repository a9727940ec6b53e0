//! Clinical record entries nested inside a patient row.
//!
//! These are stored as JSON documents in the `medicalHistory` and `treatment`
//! columns, so their field names stay camelCase on the wire.

use serde::{Deserialize, Serialize};

use super::wire::{lenient_u32, null_as_default, string_or_number};

/// Generate an ID for a nested record entry.
pub fn new_entry_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A past condition in the patient's medical history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MedicalHistoryEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Date the condition was recorded (free text, usually YYYY-MM-DD)
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub condition: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
}

/// A coded diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// ICD-10 code (e.g., "B01")
    #[serde(default, deserialize_with = "null_as_default")]
    pub icd_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// An ordered lab test or exam.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LabTest {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
}

/// A prescribed medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Prescription {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub medication: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dosage: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub frequency: String,
    /// Route of administration (e.g., "PO", "IV")
    #[serde(default, deserialize_with = "null_as_default")]
    pub route: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub refills: u32,
}

/// A timestamped clinical note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClinicalNote {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    /// RFC 3339 creation time
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    /// Email of the provider who wrote the note
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
}

/// The patient's treatment document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Treatment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub diagnoses: Vec<Diagnosis>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tests: Vec<LabTest>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prescriptions: Vec<Prescription>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: Vec<ClinicalNote>,
}

impl Treatment {
    /// Check if no treatment has been recorded.
    pub fn is_empty(&self) -> bool {
        self.diagnoses.is_empty()
            && self.tests.is_empty()
            && self.prescriptions.is_empty()
            && self.notes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_treatment_missing_collections() {
        let treatment: Treatment =
            serde_json::from_str(r#"{"diagnoses": null, "tests": []}"#).unwrap();
        assert!(treatment.is_empty());
    }

    #[test]
    fn test_diagnosis_camel_case_wire() {
        let dx = Diagnosis {
            id: "d1".into(),
            icd_code: "B01".into(),
            description: "Varicella [chickenpox]".into(),
        };
        let json = serde_json::to_string(&dx).unwrap();
        assert!(json.contains("\"icdCode\":\"B01\""));
    }

    #[test]
    fn test_legacy_prescription_row() {
        // Older rows carry numeric IDs and string refill counts
        let rx: Prescription = serde_json::from_str(
            r#"{"id": 482913, "medication": "Amoxicillin", "dosage": "500mg",
                "frequency": "TID", "route": "PO", "refills": "2"}"#,
        )
        .unwrap();
        assert_eq!(rx.id, "482913");
        assert_eq!(rx.refills, 2);
    }

    #[test]
    fn test_entry_ids_unique() {
        let a = new_entry_id();
        let b = new_entry_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36); // UUID format
    }
}
