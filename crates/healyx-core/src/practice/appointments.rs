//! Appointment operations.

use chrono::NaiveDate;

use super::{Practice, PracticeError, PracticeResult};
use crate::backend::{decode_rows, APPOINTMENTS_TABLE};
use crate::models::{Appointment, AppointmentDraft};

/// Name stored when the draft's patient is not on the roster.
pub const UNKNOWN_PATIENT: &str = "Unknown Patient";

impl Practice {
    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn appointment(&self, id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    /// Replace the local appointments with the remote table.
    pub fn load_appointments(&mut self) -> PracticeResult<usize> {
        let rows = self
            .backend
            .select_all(APPOINTMENTS_TABLE, self.token())
            .map_err(|e| {
                tracing::error!(error = %e, "Error fetching appointments");
                e
            })?;
        self.appointments = decode_rows(rows)?;
        tracing::info!(count = self.appointments.len(), "Appointments loaded");
        Ok(self.appointments.len())
    }

    // =========================================================================
    // New appointment form
    // =========================================================================

    pub fn appointment_draft(&self) -> &AppointmentDraft {
        &self.appointment_draft
    }

    pub fn appointment_draft_mut(&mut self) -> &mut AppointmentDraft {
        &mut self.appointment_draft
    }

    /// Pick the draft's patient; the name follows from the roster.
    pub fn set_draft_patient(&mut self, patient_id: &str) {
        self.appointment_draft.patient_id = patient_id.to_string();
        self.appointment_draft.patient_name = self
            .roster
            .name_of(patient_id)
            .unwrap_or_default()
            .to_string();
    }

    pub fn reset_appointment_draft(&mut self) {
        self.appointment_draft = AppointmentDraft::new(self.today);
    }

    /// Book the drafted appointment for the signed-in provider.
    pub fn add_appointment(&mut self) -> PracticeResult<&Appointment> {
        let user_id = self.require_session()?.user.id.clone();
        let patient_name = self
            .roster
            .name_of(&self.appointment_draft.patient_id)
            .unwrap_or(UNKNOWN_PATIENT)
            .to_string();

        let row = self.appointment_draft.to_insert_row(&patient_name, &user_id);
        tracing::debug!(%row, "Adding appointment");

        let stored = self
            .backend
            .insert(APPOINTMENTS_TABLE, &row, self.token())
            .map_err(|e| {
                tracing::error!(error = %e, "Error adding appointment");
                e
            })?;
        let appointment: Appointment = serde_json::from_value(stored)?;
        tracing::info!(id = %appointment.id, date = %appointment.date, "Appointment added");

        self.reset_appointment_draft();
        self.appointments.push(appointment);
        Ok(&self.appointments[self.appointments.len() - 1])
    }

    // =========================================================================
    // Edit dialog
    // =========================================================================

    /// Open the edit dialog on a copy of the appointment.
    pub fn begin_appointment_edit(&mut self, id: &str) -> PracticeResult<&mut Appointment> {
        let appointment = self
            .appointment(id)
            .cloned()
            .ok_or_else(|| PracticeError::NotFound(format!("appointment {}", id)))?;
        Ok(self.appointment_edit.insert(appointment))
    }

    pub fn appointment_edit(&self) -> Option<&Appointment> {
        self.appointment_edit.as_ref()
    }

    pub fn appointment_edit_mut(&mut self) -> Option<&mut Appointment> {
        self.appointment_edit.as_mut()
    }

    pub fn cancel_appointment_edit(&mut self) {
        self.appointment_edit = None;
    }

    /// Persist the edit dialog and close it.
    pub fn save_appointment_edit(&mut self) -> PracticeResult<()> {
        let edited = self
            .appointment_edit
            .clone()
            .ok_or_else(|| PracticeError::InvalidInput("No appointment is being edited".into()))?;
        self.update_appointment(edited)?;
        self.appointment_edit = None;
        Ok(())
    }

    /// Write an edited appointment and replace the local copy.
    ///
    /// The booking provider is not editable; an edit without one keeps the
    /// stored owner.
    pub fn update_appointment(&mut self, mut appointment: Appointment) -> PracticeResult<()> {
        let index = self
            .appointments
            .iter()
            .position(|a| a.id == appointment.id)
            .ok_or_else(|| PracticeError::NotFound(format!("appointment {}", appointment.id)))?;
        if appointment.user_id.is_none() {
            appointment.user_id = self.appointments[index].user_id.clone();
        }

        let rows = self
            .backend
            .update(
                APPOINTMENTS_TABLE,
                &appointment.id,
                &appointment.to_update_row(),
                self.token(),
            )
            .map_err(|e| {
                tracing::error!(id = %appointment.id, error = %e, "Error updating appointment");
                e
            })?;
        if rows.is_empty() {
            return Err(PracticeError::NotFound(format!("appointment {}", appointment.id)));
        }

        tracing::info!(id = %appointment.id, date = %appointment.date, "Appointment updated");
        self.appointments[index] = appointment;
        Ok(())
    }

    /// Move an appointment to another day, keeping its time.
    pub fn reschedule_appointment(&mut self, id: &str, date: NaiveDate) -> PracticeResult<()> {
        let mut moved = self
            .appointment(id)
            .cloned()
            .ok_or_else(|| PracticeError::NotFound(format!("appointment {}", id)))?;
        if moved.date == date {
            return Ok(());
        }
        moved.date = date;
        self.update_appointment(moved)
    }

    pub fn delete_appointment(&mut self, id: &str) -> PracticeResult<()> {
        self.backend
            .delete(APPOINTMENTS_TABLE, id, self.token())
            .map_err(|e| {
                tracing::error!(id, error = %e, "Error deleting appointment");
                e
            })?;
        self.appointments.retain(|a| a.id != id);
        if self.appointment_edit.as_ref().is_some_and(|a| a.id == id) {
            self.appointment_edit = None;
        }
        tracing::info!(id, "Appointment deleted");
        Ok(())
    }
}
