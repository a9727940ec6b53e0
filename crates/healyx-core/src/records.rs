//! Nested-document editing of a patient's clinical record.
//!
//! Every edit is computed against the current patient and returned as a
//! [`RecordChange`]: the full replacement value of one column. The caller writes
//! that column remotely and only then applies the change locally.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{
    new_entry_id, ClinicalNote, Diagnosis, LabTest, MedicalHistoryEntry, Patient, Prescription,
    Treatment,
};

/// Record editing errors.
#[derive(Error, Debug, PartialEq)]
pub enum RecordError {
    #[error("{kind} not found: {id}")]
    EntryNotFound { kind: &'static str, id: String },

    #[error("No medical history entry is being edited")]
    NotEditing,
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Entries addressable by ID inside a record collection.
pub trait RecordEntry: Clone {
    /// Human-readable entry kind for errors and logs.
    const KIND: &'static str;

    fn entry_id(&self) -> &str;
}

impl RecordEntry for MedicalHistoryEntry {
    const KIND: &'static str = "Medical history entry";

    fn entry_id(&self) -> &str {
        &self.id
    }
}

impl RecordEntry for Diagnosis {
    const KIND: &'static str = "Diagnosis";

    fn entry_id(&self) -> &str {
        &self.id
    }
}

impl RecordEntry for LabTest {
    const KIND: &'static str = "Test";

    fn entry_id(&self) -> &str {
        &self.id
    }
}

impl RecordEntry for Prescription {
    const KIND: &'static str = "Prescription";

    fn entry_id(&self) -> &str {
        &self.id
    }
}

impl RecordEntry for ClinicalNote {
    const KIND: &'static str = "Note";

    fn entry_id(&self) -> &str {
        &self.id
    }
}

/// A replacement value for one nested-document column.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordChange {
    MedicalHistory(Vec<MedicalHistoryEntry>),
    Treatment(Treatment),
}

impl RecordChange {
    /// Remote column written by this change.
    pub fn column(&self) -> &'static str {
        match self {
            RecordChange::MedicalHistory(_) => "medicalHistory",
            RecordChange::Treatment(_) => "treatment",
        }
    }

    /// Update body for the `patients` row.
    pub fn to_patch(&self) -> Result<Value, serde_json::Error> {
        let value = match self {
            RecordChange::MedicalHistory(entries) => serde_json::to_value(entries)?,
            RecordChange::Treatment(treatment) => serde_json::to_value(treatment)?,
        };
        let mut patch = Map::new();
        patch.insert(self.column().to_string(), value);
        Ok(Value::Object(patch))
    }

    /// Apply to the local copy of a patient.
    pub fn apply_to(&self, patient: &mut Patient) {
        match self {
            RecordChange::MedicalHistory(entries) => patient.medical_history = entries.clone(),
            RecordChange::Treatment(treatment) => patient.treatment = treatment.clone(),
        }
    }
}

fn without<T: RecordEntry>(items: &[T], id: &str) -> RecordResult<Vec<T>> {
    if !items.iter().any(|e| e.entry_id() == id) {
        return Err(RecordError::EntryNotFound {
            kind: T::KIND,
            id: id.to_string(),
        });
    }
    Ok(items.iter().filter(|e| e.entry_id() != id).cloned().collect())
}

fn with_appended<T: Clone>(items: &[T], entry: T) -> Vec<T> {
    let mut out = items.to_vec();
    out.push(entry);
    out
}

// =========================================================================
// Drafts
// =========================================================================

/// Medical history form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryDraft {
    pub date: String,
    pub condition: String,
    pub notes: String,
}

/// Diagnosis form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisDraft {
    pub icd_code: String,
    pub description: String,
}

/// Test order form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestDraft {
    pub name: String,
    pub date: String,
}

/// Prescription form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionDraft {
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub route: String,
    pub refills: u32,
}

// =========================================================================
// Medical history
// =========================================================================

pub fn add_history(patient: &Patient, draft: &HistoryDraft) -> RecordChange {
    let entry = MedicalHistoryEntry {
        id: new_entry_id(),
        date: draft.date.clone(),
        condition: draft.condition.clone(),
        notes: draft.notes.clone(),
    };
    RecordChange::MedicalHistory(with_appended(&patient.medical_history, entry))
}

pub fn update_history(
    patient: &Patient,
    entry_id: &str,
    draft: &HistoryDraft,
) -> RecordResult<RecordChange> {
    let mut found = false;
    let entries = patient
        .medical_history
        .iter()
        .map(|e| {
            if e.id == entry_id {
                found = true;
                MedicalHistoryEntry {
                    id: e.id.clone(),
                    date: draft.date.clone(),
                    condition: draft.condition.clone(),
                    notes: draft.notes.clone(),
                }
            } else {
                e.clone()
            }
        })
        .collect();

    if !found {
        return Err(RecordError::EntryNotFound {
            kind: MedicalHistoryEntry::KIND,
            id: entry_id.to_string(),
        });
    }
    Ok(RecordChange::MedicalHistory(entries))
}

pub fn delete_history(patient: &Patient, entry_id: &str) -> RecordResult<RecordChange> {
    Ok(RecordChange::MedicalHistory(without(
        &patient.medical_history,
        entry_id,
    )?))
}

// =========================================================================
// Treatment
// =========================================================================

pub fn add_diagnosis(patient: &Patient, draft: &DiagnosisDraft) -> RecordChange {
    let entry = Diagnosis {
        id: new_entry_id(),
        icd_code: draft.icd_code.clone(),
        description: draft.description.clone(),
    };
    RecordChange::Treatment(Treatment {
        diagnoses: with_appended(&patient.treatment.diagnoses, entry),
        ..patient.treatment.clone()
    })
}

pub fn delete_diagnosis(patient: &Patient, id: &str) -> RecordResult<RecordChange> {
    Ok(RecordChange::Treatment(Treatment {
        diagnoses: without(&patient.treatment.diagnoses, id)?,
        ..patient.treatment.clone()
    }))
}

pub fn add_test(patient: &Patient, draft: &TestDraft) -> RecordChange {
    let entry = LabTest {
        id: new_entry_id(),
        name: draft.name.clone(),
        date: draft.date.clone(),
    };
    RecordChange::Treatment(Treatment {
        tests: with_appended(&patient.treatment.tests, entry),
        ..patient.treatment.clone()
    })
}

pub fn delete_test(patient: &Patient, id: &str) -> RecordResult<RecordChange> {
    Ok(RecordChange::Treatment(Treatment {
        tests: without(&patient.treatment.tests, id)?,
        ..patient.treatment.clone()
    }))
}

pub fn add_prescription(patient: &Patient, draft: &PrescriptionDraft) -> RecordChange {
    let entry = Prescription {
        id: new_entry_id(),
        medication: draft.medication.clone(),
        dosage: draft.dosage.clone(),
        frequency: draft.frequency.clone(),
        route: draft.route.clone(),
        refills: draft.refills,
    };
    RecordChange::Treatment(Treatment {
        prescriptions: with_appended(&patient.treatment.prescriptions, entry),
        ..patient.treatment.clone()
    })
}

pub fn delete_prescription(patient: &Patient, id: &str) -> RecordResult<RecordChange> {
    Ok(RecordChange::Treatment(Treatment {
        prescriptions: without(&patient.treatment.prescriptions, id)?,
        ..patient.treatment.clone()
    }))
}

/// Append a note stamped with `timestamp` (RFC 3339) and `author`.
pub fn add_note(patient: &Patient, content: &str, author: &str, timestamp: &str) -> RecordChange {
    let entry = ClinicalNote {
        id: new_entry_id(),
        content: content.to_string(),
        timestamp: timestamp.to_string(),
        author: author.to_string(),
    };
    RecordChange::Treatment(Treatment {
        notes: with_appended(&patient.treatment.notes, entry),
        ..patient.treatment.clone()
    })
}

pub fn delete_note(patient: &Patient, id: &str) -> RecordResult<RecordChange> {
    Ok(RecordChange::Treatment(Treatment {
        notes: without(&patient.treatment.notes, id)?,
        ..patient.treatment.clone()
    }))
}

// =========================================================================
// Editor state
// =========================================================================

/// Form state of the patient detail tabs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordEditor {
    pub history: HistoryDraft,
    /// History entry loaded into the form for editing
    pub editing_history_id: Option<String>,
    pub diagnosis: DiagnosisDraft,
    pub test: TestDraft,
    pub prescription: PrescriptionDraft,
    pub note: String,
}

impl RecordEditor {
    /// Load an existing entry into the history form.
    pub fn begin_history_edit(&mut self, entry: &MedicalHistoryEntry) {
        self.editing_history_id = Some(entry.id.clone());
        self.history = HistoryDraft {
            date: entry.date.clone(),
            condition: entry.condition.clone(),
            notes: entry.notes.clone(),
        };
    }

    pub fn cancel_history_edit(&mut self) {
        self.editing_history_id = None;
        self.history = HistoryDraft::default();
    }

    /// Clear every form (used when the patient modal closes).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient() -> Patient {
        Patient {
            id: "p1".into(),
            name: "Ada Lovelace".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_then_update_history() {
        let mut p = patient();
        let draft = HistoryDraft {
            date: "2020-03-01".into(),
            condition: "Asthma".into(),
            notes: "Mild".into(),
        };
        add_history(&p, &draft).apply_to(&mut p);
        assert_eq!(p.medical_history.len(), 1);
        let id = p.medical_history[0].id.clone();

        let edited = HistoryDraft {
            notes: "Moderate, inhaler".into(),
            ..draft
        };
        update_history(&p, &id, &edited).unwrap().apply_to(&mut p);
        assert_eq!(p.medical_history.len(), 1);
        assert_eq!(p.medical_history[0].id, id);
        assert_eq!(p.medical_history[0].notes, "Moderate, inhaler");
    }

    #[test]
    fn test_update_missing_history_entry() {
        let p = patient();
        let err = update_history(&p, "nope", &HistoryDraft::default()).unwrap_err();
        assert_eq!(
            err,
            RecordError::EntryNotFound {
                kind: "Medical history entry",
                id: "nope".into()
            }
        );
    }

    #[test]
    fn test_treatment_edits_preserve_siblings() {
        let mut p = patient();
        add_diagnosis(
            &p,
            &DiagnosisDraft {
                icd_code: "B01".into(),
                description: "Varicella [chickenpox]".into(),
            },
        )
        .apply_to(&mut p);
        add_test(
            &p,
            &TestDraft {
                name: "CBC".into(),
                date: "2026-10-19".into(),
            },
        )
        .apply_to(&mut p);
        add_note(&p, "Rash resolving", "dr@example.com", "2026-10-19T10:00:00Z").apply_to(&mut p);

        assert_eq!(p.treatment.diagnoses.len(), 1);
        assert_eq!(p.treatment.tests.len(), 1);
        assert_eq!(p.treatment.notes.len(), 1);

        let test_id = p.treatment.tests[0].id.clone();
        let change = delete_test(&p, &test_id).unwrap();
        change.apply_to(&mut p);
        assert!(p.treatment.tests.is_empty());
        assert_eq!(p.treatment.diagnoses.len(), 1);
        assert_eq!(p.treatment.notes[0].author, "dr@example.com");
    }

    #[test]
    fn test_delete_missing_prescription() {
        let p = patient();
        assert!(matches!(
            delete_prescription(&p, "rx-1"),
            Err(RecordError::EntryNotFound { kind: "Prescription", .. })
        ));
    }

    #[test]
    fn test_patch_shape() {
        let p = patient();
        let change = add_prescription(
            &p,
            &PrescriptionDraft {
                medication: "Amoxicillin".into(),
                dosage: "500mg".into(),
                frequency: "TID".into(),
                route: "PO".into(),
                refills: 1,
            },
        );
        assert_eq!(change.column(), "treatment");
        let patch = change.to_patch().unwrap();
        assert_eq!(patch["treatment"]["prescriptions"][0]["medication"], "Amoxicillin");
        assert!(patch["treatment"]["diagnoses"].as_array().unwrap().is_empty());

        let history = add_history(&p, &HistoryDraft::default()).to_patch().unwrap();
        assert!(history["medicalHistory"].is_array());
    }

    #[test]
    fn test_editor_begin_and_reset() {
        let mut editor = RecordEditor::default();
        let entry = MedicalHistoryEntry {
            id: "h1".into(),
            date: "2019-01-01".into(),
            condition: "Fracture".into(),
            notes: "Left wrist".into(),
        };
        editor.begin_history_edit(&entry);
        assert_eq!(editor.editing_history_id.as_deref(), Some("h1"));
        assert_eq!(editor.history.condition, "Fracture");

        editor.note = "draft".into();
        editor.reset();
        assert_eq!(editor, RecordEditor::default());
    }
}
