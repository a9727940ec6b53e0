//! Roster and patient details operations.

use super::{DetailTab, Practice, PracticeError, PracticeResult};
use crate::backend::{decode_rows, row_id, PATIENTS_TABLE};
use crate::export::{roster_billing_csv, BillingExport};
use crate::models::{NewPatient, Patient};
use crate::roster::Roster;

impl Practice {
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn search_patients(&self, query: &str) -> Vec<&Patient> {
        self.roster.search(query)
    }

    /// Replace the roster with the remote table.
    pub fn load_patients(&mut self) -> PracticeResult<usize> {
        let rows = self
            .backend
            .select_all(PATIENTS_TABLE, self.token())
            .map_err(|e| {
                tracing::error!(error = %e, "Error fetching patients");
                e
            })?;
        let patients: Vec<Patient> = decode_rows(rows)?;
        tracing::info!(count = patients.len(), "Patients loaded");

        self.roster.replace_all(patients);
        let stale = self
            .selected_patient_id
            .as_deref()
            .is_some_and(|id| self.roster.get(id).is_none());
        if stale {
            self.selected_patient_id = None;
        }
        Ok(self.roster.len())
    }

    /// Create a patient from the intake form.
    pub fn add_patient(&mut self, form: NewPatient) -> PracticeResult<&Patient> {
        let row = form.to_insert_row();
        tracing::debug!(%row, "Adding patient");

        let stored = self
            .backend
            .insert(PATIENTS_TABLE, &row, self.token())
            .map_err(|e| {
                tracing::error!(error = %e, "Error adding new patient");
                e
            })?;
        let id = row_id(&stored)?;
        tracing::info!(%id, "Patient added");

        self.roster.push(form.into_patient(id.clone()));
        self.roster
            .get(&id)
            .ok_or_else(|| PracticeError::NotFound(format!("patient {}", id)))
    }

    // =========================================================================
    // Details panel
    // =========================================================================

    /// Open the details panel for a patient.
    pub fn select_patient(&mut self, id: &str) -> PracticeResult<&Patient> {
        let patient = self
            .roster
            .get(id)
            .ok_or_else(|| PracticeError::NotFound(format!("patient {}", id)))?;
        if self.selected_patient_id.as_deref() != Some(id) {
            self.editor.reset();
        }
        self.selected_patient_id = Some(patient.id.clone());
        Ok(patient)
    }

    /// Close the details panel; the next patient opens on Demographics.
    pub fn close_patient(&mut self) {
        self.selected_patient_id = None;
        self.tab = DetailTab::Demographics;
        self.editor.reset();
    }

    pub fn selected_patient(&self) -> Option<&Patient> {
        self.selected_patient_id
            .as_deref()
            .and_then(|id| self.roster.get(id))
    }

    pub(super) fn require_selected(&self) -> PracticeResult<&Patient> {
        self.selected_patient().ok_or(PracticeError::NoPatientSelected)
    }

    pub fn tab(&self) -> DetailTab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: DetailTab) {
        self.tab = tab;
    }

    // =========================================================================
    // Billing
    // =========================================================================

    /// Billing tab data for the open patient.
    pub fn billing_export(&self) -> PracticeResult<BillingExport> {
        Ok(BillingExport::from_patient(self.require_selected()?))
    }

    /// Transactions of every patient on the roster as CSV.
    pub fn roster_billing_csv(&self) -> String {
        roster_billing_csv(self.roster.all())
    }
}
