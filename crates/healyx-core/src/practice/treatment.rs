//! Medical history and treatment record operations on the open patient.
//!
//! Each operation computes the replacement column from the open patient,
//! writes it, and applies it to the roster only once the write succeeded.
//! Drafts are cleared after a successful add or update.

use super::{Practice, PracticeError, PracticeResult};
use crate::backend::PATIENTS_TABLE;
use crate::models::{MedicalHistoryEntry, Patient};
use crate::records::{self, RecordChange, RecordEditor, RecordEntry, RecordError};

/// Author recorded on notes written without a signed-in email.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

impl Practice {
    pub fn editor(&self) -> &RecordEditor {
        &self.editor
    }

    /// Form drafts of the details panel.
    pub fn editor_mut(&mut self) -> &mut RecordEditor {
        &mut self.editor
    }

    /// Write one record column of the open patient, then apply it locally.
    fn commit_change(&mut self, change: RecordChange) -> PracticeResult<&Patient> {
        let mut patient = self.require_selected()?.clone();
        let patch = change.to_patch()?;

        let rows = self
            .backend
            .update(PATIENTS_TABLE, &patient.id, &patch, self.token())
            .map_err(|e| {
                tracing::error!(
                    patient_id = %patient.id,
                    column = change.column(),
                    error = %e,
                    "Error updating patient record"
                );
                e
            })?;
        if rows.is_empty() {
            return Err(PracticeError::NotFound(format!("patient {}", patient.id)));
        }

        change.apply_to(&mut patient);
        tracing::info!(patient_id = %patient.id, column = change.column(), "Patient record updated");

        let id = patient.id.clone();
        self.roster.replace(patient);
        self.roster
            .get(&id)
            .ok_or_else(|| PracticeError::NotFound(format!("patient {}", id)))
    }

    // =========================================================================
    // Medical history
    // =========================================================================

    pub fn add_history_entry(&mut self) -> PracticeResult<&Patient> {
        let change = records::add_history(self.require_selected()?, &self.editor.history);
        self.commit_change(change)?;
        self.editor.cancel_history_edit();
        self.require_selected()
    }

    /// Load an entry into the history draft for editing.
    pub fn begin_history_edit(&mut self, entry_id: &str) -> PracticeResult<()> {
        let entry = self
            .require_selected()?
            .medical_history
            .iter()
            .find(|e| e.id == entry_id)
            .cloned()
            .ok_or_else(|| RecordError::EntryNotFound {
                kind: MedicalHistoryEntry::KIND,
                id: entry_id.to_string(),
            })?;
        self.editor.begin_history_edit(&entry);
        Ok(())
    }

    pub fn cancel_history_edit(&mut self) {
        self.editor.cancel_history_edit();
    }

    /// Save the entry being edited.
    pub fn update_history_entry(&mut self) -> PracticeResult<&Patient> {
        let patient = self.require_selected()?;
        let entry_id = self
            .editor
            .editing_history_id
            .as_deref()
            .ok_or(RecordError::NotEditing)?;
        let change = records::update_history(patient, entry_id, &self.editor.history)?;
        self.commit_change(change)?;
        self.editor.cancel_history_edit();
        self.require_selected()
    }

    pub fn delete_history_entry(&mut self, entry_id: &str) -> PracticeResult<&Patient> {
        let change = records::delete_history(self.require_selected()?, entry_id)?;
        self.commit_change(change)?;
        if self.editor.editing_history_id.as_deref() == Some(entry_id) {
            self.editor.cancel_history_edit();
        }
        self.require_selected()
    }

    // =========================================================================
    // Treatment
    // =========================================================================

    pub fn add_diagnosis(&mut self) -> PracticeResult<&Patient> {
        let change = records::add_diagnosis(self.require_selected()?, &self.editor.diagnosis);
        self.commit_change(change)?;
        self.editor.diagnosis = Default::default();
        self.require_selected()
    }

    pub fn delete_diagnosis(&mut self, id: &str) -> PracticeResult<&Patient> {
        let change = records::delete_diagnosis(self.require_selected()?, id)?;
        self.commit_change(change)
    }

    pub fn add_test(&mut self) -> PracticeResult<&Patient> {
        let change = records::add_test(self.require_selected()?, &self.editor.test);
        self.commit_change(change)?;
        self.editor.test = Default::default();
        self.require_selected()
    }

    pub fn delete_test(&mut self, id: &str) -> PracticeResult<&Patient> {
        let change = records::delete_test(self.require_selected()?, id)?;
        self.commit_change(change)
    }

    pub fn add_prescription(&mut self) -> PracticeResult<&Patient> {
        let change =
            records::add_prescription(self.require_selected()?, &self.editor.prescription);
        self.commit_change(change)?;
        self.editor.prescription = Default::default();
        self.require_selected()
    }

    pub fn delete_prescription(&mut self, id: &str) -> PracticeResult<&Patient> {
        let change = records::delete_prescription(self.require_selected()?, id)?;
        self.commit_change(change)
    }

    /// Add the drafted note, signed by the current user.
    pub fn add_note(&mut self) -> PracticeResult<&Patient> {
        let author = self
            .session
            .as_ref()
            .and_then(|s| s.user.email.as_deref())
            .filter(|e| !e.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR)
            .to_string();
        let timestamp = chrono::Utc::now().to_rfc3339();

        let change = records::add_note(
            self.require_selected()?,
            &self.editor.note,
            &author,
            &timestamp,
        );
        self.commit_change(change)?;
        self.editor.note.clear();
        self.require_selected()
    }

    pub fn delete_note(&mut self, id: &str) -> PracticeResult<&Patient> {
        let change = records::delete_note(self.require_selected()?, id)?;
        self.commit_change(change)
    }
}
