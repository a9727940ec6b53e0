//! The practice front-end state container.
//!
//! [`Practice`] owns everything the UI shows (session, roster, appointments,
//! calendar position, open patient, form drafts) and performs every remote
//! write. Local state only changes after the remote write succeeds.

mod appointments;
mod patients;
mod treatment;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{self, AuthError, ProviderSignUp, SignUpOutcome};
use crate::backend::{AuthSession, Backend, BackendError};
use crate::calendar::{
    day_agenda, month_grid, week_grid, CalendarCursor, CalendarView, DayCell, MonthGrid,
    TypeFilter,
};
use crate::config::DEFAULT_STORAGE_BUCKET;
use crate::icd::IcdCatalog;
use crate::intake::{IntakeError, IntakeSlot};
use crate::models::{Appointment, AppointmentDraft, AppointmentType};
use crate::records::{RecordEditor, RecordError};
use crate::roster::Roster;
use crate::uploads::{PendingFile, UploadError, UploadReceipt, UploadSelection, Uploader};

/// Front-end errors.
#[derive(Error, Debug)]
pub enum PracticeError {
    #[error("You must be logged in to do that")]
    NotSignedIn,

    #[error("No patient selected")]
    NoPatientSelected,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type PracticeResult<T> = Result<T, PracticeError>;

/// Tabs of the patient details panel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DetailTab {
    #[default]
    Demographics,
    MedicalHistory,
    Treatment,
    Billing,
}

impl DetailTab {
    pub const ALL: [DetailTab; 4] = [
        DetailTab::Demographics,
        DetailTab::MedicalHistory,
        DetailTab::Treatment,
        DetailTab::Billing,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DetailTab::Demographics => "Demographics",
            DetailTab::MedicalHistory => "Medical History",
            DetailTab::Treatment => "Treatment",
            DetailTab::Billing => "Billing",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let key: String = value
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "demographics" => Some(DetailTab::Demographics),
            "medicalhistory" => Some(DetailTab::MedicalHistory),
            "treatment" => Some(DetailTab::Treatment),
            "billing" => Some(DetailTab::Billing),
            _ => None,
        }
    }
}

/// Front-end state over a backend.
pub struct Practice {
    backend: Box<dyn Backend>,
    session: Option<AuthSession>,
    today: NaiveDate,

    roster: Roster,
    selected_patient_id: Option<String>,
    tab: DetailTab,

    appointments: Vec<Appointment>,
    cursor: CalendarCursor,
    filter: TypeFilter,
    appointment_draft: AppointmentDraft,
    appointment_edit: Option<Appointment>,

    editor: RecordEditor,
    intake: IntakeSlot,
    uploads: UploadSelection,
    uploader: Uploader,
    icd: IcdCatalog,
}

impl Practice {
    /// Start with an empty roster and the calendar on `today`.
    pub fn new(backend: Box<dyn Backend>, today: NaiveDate) -> Self {
        Self {
            backend,
            session: None,
            today,
            roster: Roster::new(),
            selected_patient_id: None,
            tab: DetailTab::default(),
            appointments: Vec::new(),
            cursor: CalendarCursor::new(today),
            filter: TypeFilter::new(),
            appointment_draft: AppointmentDraft::new(today),
            appointment_edit: None,
            editor: RecordEditor::default(),
            intake: IntakeSlot::default(),
            uploads: UploadSelection::default(),
            uploader: Uploader::new(DEFAULT_STORAGE_BUCKET),
            icd: IcdCatalog::with_defaults(),
        }
    }

    /// Upload into `bucket` instead of the default patient-files bucket.
    pub fn with_storage_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.uploader = Uploader::new(bucket);
        self
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Load the roster and the appointments.
    pub fn load(&mut self) -> PracticeResult<()> {
        self.load_patients()?;
        self.load_appointments()?;
        Ok(())
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    /// Access token for remote calls, if signed in.
    fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }

    fn require_session(&self) -> PracticeResult<&AuthSession> {
        self.session.as_ref().ok_or(PracticeError::NotSignedIn)
    }

    /// Adopt a session obtained elsewhere (e.g., restored by the shell).
    pub fn restore_session(&mut self, session: AuthSession) {
        tracing::info!(user_id = %session.user.id, "Session restored");
        self.session = Some(session);
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> PracticeResult<&AuthSession> {
        let session = auth::sign_in(self.backend.as_auth(), email, password)?;
        Ok(self.session.insert(session))
    }

    pub fn sign_up(&mut self, form: &ProviderSignUp) -> PracticeResult<SignUpOutcome> {
        let outcome = auth::sign_up(self.backend.as_auth(), form)?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.session = Some(session.clone());
        }
        Ok(outcome)
    }

    /// Clear the session. The local session is dropped even if the remote
    /// revocation fails; that failure is still reported.
    pub fn sign_out(&mut self) -> PracticeResult<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        tracing::info!(user_id = %session.user.id, "Signing out");
        auth::sign_out(self.backend.as_auth(), &session)?;
        Ok(())
    }

    pub fn check_connection(&self) -> PracticeResult<()> {
        auth::check_connection(self.backend.as_auth())?;
        Ok(())
    }

    // =========================================================================
    // Calendar
    // =========================================================================

    pub fn cursor(&self) -> &CalendarCursor {
        &self.cursor
    }

    pub fn set_view(&mut self, view: CalendarView) {
        self.cursor.set_view(view);
    }

    pub fn go_to_date(&mut self, date: NaiveDate) {
        self.cursor.set_date(date);
    }

    pub fn go_to_today(&mut self) {
        self.cursor.set_date(self.today);
    }

    /// Previous month, week or day depending on the view.
    pub fn step_back(&mut self) {
        self.cursor.step_back();
    }

    pub fn step_forward(&mut self) {
        self.cursor.step_forward();
    }

    pub fn filter(&self) -> &TypeFilter {
        &self.filter
    }

    pub fn toggle_type_filter(&mut self, ty: AppointmentType) {
        self.filter.toggle(ty);
    }

    pub fn clear_type_filter(&mut self) {
        self.filter.clear();
    }

    pub fn month_grid(&self) -> MonthGrid<'_> {
        month_grid(self.cursor.date(), &self.appointments, &self.filter)
    }

    pub fn week_grid(&self) -> Vec<DayCell<'_>> {
        week_grid(self.cursor.date(), &self.appointments, &self.filter)
    }

    pub fn day_agenda(&self) -> DayCell<'_> {
        day_agenda(self.cursor.date(), &self.appointments, &self.filter)
    }

    // =========================================================================
    // Intake, uploads, ICD
    // =========================================================================

    pub fn intake(&self) -> &IntakeSlot {
        &self.intake
    }

    pub fn intake_mut(&mut self) -> &mut IntakeSlot {
        &mut self.intake
    }

    pub fn icd(&self) -> &IcdCatalog {
        &self.icd
    }

    pub fn icd_mut(&mut self) -> &mut IcdCatalog {
        &mut self.icd
    }

    pub fn uploads(&self) -> &UploadSelection {
        &self.uploads
    }

    /// Replace the pending file selection.
    pub fn select_files(&mut self, files: Vec<PendingFile>) {
        tracing::debug!(count = files.len(), "Files selected");
        self.uploads.select(files);
    }

    /// Upload the selected files under the signed-in user's folder.
    pub fn upload_files(
        &mut self,
        on_progress: &mut dyn FnMut(f64),
    ) -> PracticeResult<Vec<UploadReceipt>> {
        if self.uploads.is_empty() {
            return Err(UploadError::NothingSelected.into());
        }
        let session = self.session.as_ref().ok_or(PracticeError::NotSignedIn)?;

        let receipts = self.uploader.upload_all(
            self.backend.as_object_store(),
            &session.user.id,
            Some(&session.access_token),
            &mut self.uploads,
            on_progress,
        )?;
        tracing::info!(count = receipts.len(), "All files uploaded successfully");
        Ok(receipts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;

    fn practice() -> Practice {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        Practice::new(Box::new(LocalBackend::open_in_memory().unwrap()), today)
    }

    fn signed_in() -> Practice {
        let mut p = practice();
        let form = ProviderSignUp {
            email: "dana@riverside.org".into(),
            password: "pw".into(),
            confirm_password: "pw".into(),
            terms_accepted: true,
            ..Default::default()
        };
        p.sign_up(&form).unwrap();
        p
    }

    #[test]
    fn test_detail_tab_parse() {
        assert_eq!(DetailTab::parse("Medical History"), Some(DetailTab::MedicalHistory));
        assert_eq!(DetailTab::parse("billing"), Some(DetailTab::Billing));
        assert_eq!(DetailTab::parse("labs"), None);
        assert_eq!(DetailTab::ALL.len(), 4);
    }

    #[test]
    fn test_sign_up_signs_in_and_out() {
        let mut p = signed_in();
        assert!(p.is_signed_in());
        p.sign_out().unwrap();
        assert!(!p.is_signed_in());
        // Signing out twice is harmless
        p.sign_out().unwrap();
    }

    #[test]
    fn test_sign_in_failure_keeps_signed_out() {
        let mut p = practice();
        assert!(p.sign_in("nobody@clinic.org", "pw").is_err());
        assert!(p.session().is_none());
    }

    #[test]
    fn test_upload_requires_selection_then_session() {
        let mut p = practice();
        assert!(matches!(
            p.upload_files(&mut |_| {}),
            Err(PracticeError::Upload(UploadError::NothingSelected))
        ));

        p.select_files(vec![PendingFile::new("scan.pdf", vec![1, 2, 3])]);
        assert!(matches!(
            p.upload_files(&mut |_| {}),
            Err(PracticeError::NotSignedIn)
        ));
    }

    #[test]
    fn test_upload_stores_under_user_folder() {
        let mut p = signed_in();
        let user_id = p.session().unwrap().user.id.clone();
        p.select_files(vec![
            PendingFile::new("a.pdf", b"first".to_vec()),
            PendingFile::new("b.pdf", b"second".to_vec()),
        ]);

        let mut seen = Vec::new();
        let receipts = p.upload_files(&mut |pct| seen.push(pct)).unwrap();
        assert_eq!(receipts.len(), 2);
        assert_eq!(seen, vec![50.0, 100.0]);
        assert!(receipts[1]
            .path
            .starts_with(&format!("uploads/{}/", user_id)));
        assert_eq!(p.uploads().progress(), 0.0);
    }

    #[test]
    fn test_calendar_navigation_follows_view() {
        let mut p = practice();
        p.set_view(CalendarView::Week);
        p.step_forward();
        assert_eq!(p.cursor().date(), NaiveDate::from_ymd_opt(2026, 10, 26).unwrap());
        p.go_to_today();
        p.set_view(CalendarView::Day);
        p.step_back();
        assert_eq!(p.cursor().date(), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    }
}
