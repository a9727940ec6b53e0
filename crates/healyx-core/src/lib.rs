//! Healyx Core Library
//!
//! Front-end state and behaviour of a healthcare provider's practice app:
//! appointment calendar, patient roster, clinical records and billing, backed
//! by a hosted table/auth/storage service.
//!
//! # Architecture
//!
//! ```text
//!   Native UI shell (Swift / Kotlin)
//!                 │  UniFFI
//!                 ▼
//!          ┌──────────────┐
//!          │  HealyxCore  │   Arc<Mutex<Practice>>
//!          └──────┬───────┘
//!                 │
//!   ┌─────────────┼──────────────┬──────────────┬─────────────┐
//!   ▼             ▼              ▼              ▼             ▼
//! calendar     roster         records        uploads        auth
//! (grids)    (search)     (nested docs)   (batched files) (sessions)
//!                 │              │              │             │
//!                 └──────────────┴──────┬───────┴─────────────┘
//!                                       ▼
//!                            ┌────────────────────┐
//!                            │  backend::Backend  │
//!                            └─────────┬──────────┘
//!                       ┌──────────────┴──────────────┐
//!                       ▼                             ▼
//!                  RestBackend                   LocalBackend
//!              (hosted, over HTTP)             (SQLite, offline)
//! ```
//!
//! # Core Principle
//!
//! **Local state follows the remote.** Every write goes to the backend first;
//! the roster, appointments and open patient only change once it succeeded.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Patient, Appointment, record entries)
//! - [`calendar`]: Month/week/day navigation and grids
//! - [`roster`]: Loaded patients and search
//! - [`records`]: Medical history and treatment edits
//! - [`practice`]: The front-end state container
//! - [`backend`]: Remote service contract, REST client and SQLite store
//! - [`auth`]: Sign-in, sign-up and connection check
//! - [`uploads`]: Patient file uploads
//! - [`export`]: Billing export
//! - [`icd`]: ICD-10 code suggestions
//! - [`intake`]: Structured intake form

pub mod auth;
pub mod backend;
pub mod calendar;
pub mod config;
pub mod export;
pub mod icd;
pub mod intake;
pub mod logging;
pub mod models;
pub mod practice;
pub mod records;
pub mod roster;
pub mod uploads;

// Re-export commonly used types
pub use backend::{Backend, BackendError, LocalBackend, RestBackend};
pub use calendar::{CalendarCursor, CalendarView, TypeFilter};
pub use config::BackendConfig;
pub use models::{
    Appointment, AppointmentDraft, AppointmentType, BillingTransaction, ClinicalNote, Diagnosis,
    LabTest, MedicalHistoryEntry, NewPatient, Patient, Prescription, Treatment,
};
pub use practice::{DetailTab, Practice, PracticeError, PracticeResult};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use auth::{AuthError, ProviderSignUp, SignUpOutcome};
use calendar::DayCell;
use intake::IntakeList;
use records::RecordError;
use uploads::{PendingFile, UploadError, UploadReceipt};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum HealyxError {
    #[error("You must be logged in to do that")]
    NotSignedIn,

    #[error("No patient selected")]
    NoPatientSelected,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Connection(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<PracticeError> for HealyxError {
    fn from(e: PracticeError) -> Self {
        match e {
            PracticeError::NotSignedIn => HealyxError::NotSignedIn,
            PracticeError::NoPatientSelected => HealyxError::NoPatientSelected,
            PracticeError::NotFound(what) => HealyxError::NotFound(what),
            PracticeError::InvalidInput(msg) => HealyxError::InvalidInput(msg),
            PracticeError::Auth(AuthError::Connection) => {
                HealyxError::Connection(auth::CONNECTION_MESSAGE.to_string())
            }
            PracticeError::Auth(AuthError::Backend(e)) => e.into(),
            PracticeError::Auth(other) => HealyxError::Auth(other.to_string()),
            PracticeError::Upload(e @ UploadError::NothingSelected) => {
                HealyxError::InvalidInput(e.to_string())
            }
            PracticeError::Upload(e) => HealyxError::Backend(e.to_string()),
            PracticeError::Record(e @ RecordError::EntryNotFound { .. }) => {
                HealyxError::NotFound(e.to_string())
            }
            PracticeError::Record(e) => HealyxError::InvalidInput(e.to_string()),
            PracticeError::Intake(e) => HealyxError::InvalidInput(e.to_string()),
            PracticeError::Backend(e) => e.into(),
            PracticeError::Serialization(e) => HealyxError::Serialization(e.to_string()),
        }
    }
}

impl From<BackendError> for HealyxError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Connection(_) => HealyxError::Connection(e.to_string()),
            BackendError::Auth(msg) => HealyxError::Auth(msg),
            BackendError::NotFound(what) => HealyxError::NotFound(what),
            BackendError::Json(e) => HealyxError::Serialization(e.to_string()),
            other => HealyxError::Backend(other.user_message()),
        }
    }
}

impl From<config::ConfigError> for HealyxError {
    fn from(e: config::ConfigError) -> Self {
        HealyxError::InvalidInput(e.to_string())
    }
}

impl From<serde_json::Error> for HealyxError {
    fn from(e: serde_json::Error) -> Self {
        HealyxError::Serialization(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for HealyxError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        HealyxError::Backend(format!("Lock poisoned: {}", e))
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, HealyxError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| HealyxError::InvalidInput(format!("Expected YYYY-MM-DD, got {:?}", value)))
}

fn parse_intake_list(value: &str) -> Result<IntakeList, HealyxError> {
    match value {
        "medications" => Ok(IntakeList::Medications),
        "medicalDevices" | "medical_devices" => Ok(IntakeList::MedicalDevices),
        other => Err(HealyxError::InvalidInput(format!("Unknown intake list: {}", other))),
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

fn core_for(practice: Practice) -> Arc<HealyxCore> {
    Arc::new(HealyxCore {
        practice: Arc::new(Mutex::new(practice)),
    })
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Connect to the hosted backend.
#[uniffi::export]
pub fn open_remote(url: String, anon_key: String) -> Result<Arc<HealyxCore>, HealyxError> {
    let config = BackendConfig::new(url, anon_key);
    config.validate()?;
    open_with_config(config)
}

/// Connect using `HEALYX_*` environment variables.
#[uniffi::export]
pub fn open_remote_from_env() -> Result<Arc<HealyxCore>, HealyxError> {
    open_with_config(BackendConfig::from_env()?)
}

fn open_with_config(config: BackendConfig) -> Result<Arc<HealyxCore>, HealyxError> {
    let backend = RestBackend::new(&config)?;
    tracing::info!(url = backend.base_url(), "Opened remote backend");
    let practice =
        Practice::new(Box::new(backend), today()).with_storage_bucket(config.storage_bucket);
    Ok(core_for(practice))
}

/// Open or create a local store at the given path.
#[uniffi::export]
pub fn open_local(path: String) -> Result<Arc<HealyxCore>, HealyxError> {
    let backend = LocalBackend::open(&path)?;
    tracing::info!(%path, "Opened local backend");
    Ok(core_for(Practice::new(Box::new(backend), today())))
}

/// Create an in-memory local store (for testing).
#[uniffi::export]
pub fn open_in_memory() -> Result<Arc<HealyxCore>, HealyxError> {
    let backend = LocalBackend::open_in_memory()?;
    Ok(core_for(Practice::new(Box::new(backend), today())))
}

/// Install the tracing subscriber. Returns false if one was already installed.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> bool {
    logging::init_logging(filter.as_deref())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe front-end state for FFI.
#[derive(uniffi::Object)]
pub struct HealyxCore {
    practice: Arc<Mutex<Practice>>,
}

#[uniffi::export]
impl HealyxCore {
    // =========================================================================
    // Session
    // =========================================================================

    pub fn sign_in(&self, email: String, password: String) -> Result<FfiUser, HealyxError> {
        let mut practice = self.practice.lock()?;
        let session = practice.sign_in(&email, &password)?;
        Ok(FfiUser::from(&session.user))
    }

    pub fn sign_up(&self, form: FfiProviderSignUp) -> Result<FfiSignUpResult, HealyxError> {
        let mut practice = self.practice.lock()?;
        let outcome = practice.sign_up(&form.into())?;
        Ok(FfiSignUpResult {
            signed_in: matches!(outcome, SignUpOutcome::SignedIn(_)),
            message: outcome.message().map(str::to_string),
        })
    }

    pub fn sign_out(&self) -> Result<(), HealyxError> {
        let mut practice = self.practice.lock()?;
        Ok(practice.sign_out()?)
    }

    pub fn current_user(&self) -> Result<Option<FfiUser>, HealyxError> {
        let practice = self.practice.lock()?;
        Ok(practice.session().map(|s| FfiUser::from(&s.user)))
    }

    /// Probe the auth service.
    pub fn check_connection(&self) -> Result<(), HealyxError> {
        let practice = self.practice.lock()?;
        Ok(practice.check_connection()?)
    }

    /// Load patients and appointments.
    pub fn load(&self) -> Result<(), HealyxError> {
        let mut practice = self.practice.lock()?;
        Ok(practice.load()?)
    }

    // =========================================================================
    // Calendar
    // =========================================================================

    /// Switch to "month", "week" or "day".
    pub fn set_view(&self, view: String) -> Result<(), HealyxError> {
        let view = CalendarView::parse(&view)
            .ok_or_else(|| HealyxError::InvalidInput(format!("Unknown view: {}", view)))?;
        self.practice.lock()?.set_view(view);
        Ok(())
    }

    pub fn step_back(&self) -> Result<(), HealyxError> {
        self.practice.lock()?.step_back();
        Ok(())
    }

    pub fn step_forward(&self) -> Result<(), HealyxError> {
        self.practice.lock()?.step_forward();
        Ok(())
    }

    pub fn go_to_date(&self, date: String) -> Result<(), HealyxError> {
        let date = parse_date(&date)?;
        self.practice.lock()?.go_to_date(date);
        Ok(())
    }

    pub fn go_to_today(&self) -> Result<(), HealyxError> {
        self.practice.lock()?.go_to_today();
        Ok(())
    }

    pub fn calendar_title(&self) -> Result<String, HealyxError> {
        Ok(self.practice.lock()?.cursor().title())
    }

    pub fn toggle_type_filter(&self, appointment_type: String) -> Result<(), HealyxError> {
        self.practice
            .lock()?
            .toggle_type_filter(AppointmentType::from(appointment_type));
        Ok(())
    }

    pub fn month_grid(&self) -> Result<FfiMonthGrid, HealyxError> {
        let practice = self.practice.lock()?;
        let grid = practice.month_grid();
        Ok(FfiMonthGrid {
            title: grid.title.clone(),
            leading_blanks: grid.leading_blanks as u32,
            row_count: grid.row_count() as u32,
            days: grid.days.iter().map(FfiDayCell::from).collect(),
        })
    }

    pub fn week_grid(&self) -> Result<Vec<FfiDayCell>, HealyxError> {
        let practice = self.practice.lock()?;
        Ok(practice.week_grid().iter().map(FfiDayCell::from).collect())
    }

    pub fn day_agenda(&self) -> Result<FfiDayCell, HealyxError> {
        let practice = self.practice.lock()?;
        Ok(FfiDayCell::from(&practice.day_agenda()))
    }

    // =========================================================================
    // Appointments
    // =========================================================================

    pub fn list_appointments(&self) -> Result<Vec<FfiAppointment>, HealyxError> {
        let practice = self.practice.lock()?;
        Ok(practice.appointments().iter().map(FfiAppointment::from).collect())
    }

    /// Book an appointment for the signed-in provider.
    pub fn add_appointment(&self, draft: FfiAppointmentDraft) -> Result<FfiAppointment, HealyxError> {
        let mut practice = self.practice.lock()?;
        let date = parse_date(&draft.date)?;
        practice.set_draft_patient(&draft.patient_id);
        {
            let form = practice.appointment_draft_mut();
            form.date = date;
            form.time = draft.time;
            form.duration = draft.duration;
            form.appointment_type = AppointmentType::from(draft.appointment_type);
        }
        let appointment = practice.add_appointment()?;
        Ok(FfiAppointment::from(appointment))
    }

    /// Save an edited appointment. The booking provider is kept from the
    /// stored copy.
    pub fn update_appointment(&self, appointment: FfiAppointment) -> Result<(), HealyxError> {
        let appointment = Appointment::try_from(appointment)?;
        Ok(self.practice.lock()?.update_appointment(appointment)?)
    }

    pub fn reschedule_appointment(&self, id: String, date: String) -> Result<(), HealyxError> {
        let date = parse_date(&date)?;
        Ok(self.practice.lock()?.reschedule_appointment(&id, date)?)
    }

    pub fn delete_appointment(&self, id: String) -> Result<(), HealyxError> {
        Ok(self.practice.lock()?.delete_appointment(&id)?)
    }

    // =========================================================================
    // Patients
    // =========================================================================

    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, HealyxError> {
        let practice = self.practice.lock()?;
        Ok(practice.roster().all().iter().map(FfiPatient::from).collect())
    }

    pub fn search_patients(&self, query: String) -> Result<Vec<FfiPatient>, HealyxError> {
        let practice = self.practice.lock()?;
        Ok(practice
            .search_patients(&query)
            .into_iter()
            .map(FfiPatient::from)
            .collect())
    }

    pub fn add_patient(&self, form: FfiNewPatient) -> Result<FfiPatient, HealyxError> {
        let mut practice = self.practice.lock()?;
        let patient = practice.add_patient(form.into())?;
        Ok(FfiPatient::from(patient))
    }

    /// Open the details panel for a patient.
    pub fn select_patient(&self, id: String) -> Result<FfiPatientRecord, HealyxError> {
        let mut practice = self.practice.lock()?;
        let patient = practice.select_patient(&id)?;
        Ok(FfiPatientRecord::from(patient))
    }

    pub fn close_patient(&self) -> Result<(), HealyxError> {
        self.practice.lock()?.close_patient();
        Ok(())
    }

    pub fn selected_patient(&self) -> Result<Option<FfiPatientRecord>, HealyxError> {
        let practice = self.practice.lock()?;
        Ok(practice.selected_patient().map(FfiPatientRecord::from))
    }

    /// Switch the details tab ("Demographics", "Medical History", "Treatment", "Billing").
    pub fn set_tab(&self, tab: String) -> Result<(), HealyxError> {
        let tab = DetailTab::parse(&tab)
            .ok_or_else(|| HealyxError::InvalidInput(format!("Unknown tab: {}", tab)))?;
        self.practice.lock()?.set_tab(tab);
        Ok(())
    }

    // =========================================================================
    // Medical history and treatment
    // =========================================================================

    pub fn add_history_entry(
        &self,
        date: String,
        condition: String,
        notes: String,
    ) -> Result<FfiPatientRecord, HealyxError> {
        let mut practice = self.practice.lock()?;
        practice.editor_mut().history = records::HistoryDraft { date, condition, notes };
        Ok(FfiPatientRecord::from(practice.add_history_entry()?))
    }

    /// Load a history entry into the edit form; returns the loaded values.
    pub fn begin_history_edit(&self, entry_id: String) -> Result<FfiHistoryEntry, HealyxError> {
        let mut practice = self.practice.lock()?;
        practice.begin_history_edit(&entry_id)?;
        let draft = &practice.editor().history;
        Ok(FfiHistoryEntry {
            id: entry_id,
            date: draft.date.clone(),
            condition: draft.condition.clone(),
            notes: draft.notes.clone(),
        })
    }

    pub fn cancel_history_edit(&self) -> Result<(), HealyxError> {
        self.practice.lock()?.cancel_history_edit();
        Ok(())
    }

    /// Save the entry being edited with these values.
    pub fn update_history_entry(
        &self,
        date: String,
        condition: String,
        notes: String,
    ) -> Result<FfiPatientRecord, HealyxError> {
        let mut practice = self.practice.lock()?;
        practice.editor_mut().history = records::HistoryDraft { date, condition, notes };
        Ok(FfiPatientRecord::from(practice.update_history_entry()?))
    }

    pub fn delete_history_entry(&self, entry_id: String) -> Result<FfiPatientRecord, HealyxError> {
        let mut practice = self.practice.lock()?;
        Ok(FfiPatientRecord::from(practice.delete_history_entry(&entry_id)?))
    }

    pub fn add_diagnosis(
        &self,
        icd_code: String,
        description: String,
    ) -> Result<FfiPatientRecord, HealyxError> {
        let mut practice = self.practice.lock()?;
        practice.editor_mut().diagnosis = records::DiagnosisDraft { icd_code, description };
        Ok(FfiPatientRecord::from(practice.add_diagnosis()?))
    }

    pub fn delete_diagnosis(&self, id: String) -> Result<FfiPatientRecord, HealyxError> {
        let mut practice = self.practice.lock()?;
        Ok(FfiPatientRecord::from(practice.delete_diagnosis(&id)?))
    }

    pub fn add_test(&self, name: String, date: String) -> Result<FfiPatientRecord, HealyxError> {
        let mut practice = self.practice.lock()?;
        practice.editor_mut().test = records::TestDraft { name, date };
        Ok(FfiPatientRecord::from(practice.add_test()?))
    }

    pub fn delete_test(&self, id: String) -> Result<FfiPatientRecord, HealyxError> {
        let mut practice = self.practice.lock()?;
        Ok(FfiPatientRecord::from(practice.delete_test(&id)?))
    }

    pub fn add_prescription(&self, rx: FfiPrescription) -> Result<FfiPatientRecord, HealyxError> {
        let mut practice = self.practice.lock()?;
        practice.editor_mut().prescription = records::PrescriptionDraft {
            medication: rx.medication,
            dosage: rx.dosage,
            frequency: rx.frequency,
            route: rx.route,
            refills: rx.refills,
        };
        Ok(FfiPatientRecord::from(practice.add_prescription()?))
    }

    pub fn delete_prescription(&self, id: String) -> Result<FfiPatientRecord, HealyxError> {
        let mut practice = self.practice.lock()?;
        Ok(FfiPatientRecord::from(practice.delete_prescription(&id)?))
    }

    pub fn add_note(&self, content: String) -> Result<FfiPatientRecord, HealyxError> {
        let mut practice = self.practice.lock()?;
        practice.editor_mut().note = content;
        Ok(FfiPatientRecord::from(practice.add_note()?))
    }

    pub fn delete_note(&self, id: String) -> Result<FfiPatientRecord, HealyxError> {
        let mut practice = self.practice.lock()?;
        Ok(FfiPatientRecord::from(practice.delete_note(&id)?))
    }

    // =========================================================================
    // ICD codes
    // =========================================================================

    pub fn suggest_icd_codes(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiIcdSuggestion>, HealyxError> {
        let practice = self.practice.lock()?;
        Ok(practice
            .icd()
            .suggest(&query, limit as usize)
            .into_iter()
            .map(|s| FfiIcdSuggestion {
                code: s.code.code,
                description: s.code.description,
                score: s.score,
            })
            .collect())
    }

    // =========================================================================
    // Intake form
    // =========================================================================

    pub fn intake_set_field(&self, name: String, value: String) -> Result<(), HealyxError> {
        let mut practice = self.practice.lock()?;
        practice
            .intake_mut()
            .edit()
            .set_field(&name, &value)
            .map_err(|e| HealyxError::InvalidInput(e.to_string()))
    }

    pub fn intake_add_entry(&self, list: String) -> Result<(), HealyxError> {
        let list = parse_intake_list(&list)?;
        self.practice.lock()?.intake_mut().edit().add_entry(list);
        Ok(())
    }

    pub fn intake_set_entry(&self, list: String, index: u32, value: String) -> Result<(), HealyxError> {
        let list = parse_intake_list(&list)?;
        let mut practice = self.practice.lock()?;
        practice
            .intake_mut()
            .edit()
            .set_entry(list, index as usize, &value)
            .map_err(|e| HealyxError::InvalidInput(e.to_string()))
    }

    pub fn intake_remove_entry(&self, list: String, index: u32) -> Result<String, HealyxError> {
        let list = parse_intake_list(&list)?;
        let mut practice = self.practice.lock()?;
        practice
            .intake_mut()
            .edit()
            .remove_entry(list, index as usize)
            .map_err(|e| HealyxError::InvalidInput(e.to_string()))
    }

    /// Replace the intake form with an extracted summary.
    pub fn intake_load_json(&self, json: String) -> Result<(), HealyxError> {
        let form = intake::IntakeForm::from_json(&json)?;
        self.practice.lock()?.intake_mut().replace(form);
        Ok(())
    }

    pub fn intake_json(&self) -> Result<Option<String>, HealyxError> {
        let practice = self.practice.lock()?;
        match practice.intake().form() {
            Some(form) => Ok(Some(form.to_json()?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Uploads
    // =========================================================================

    pub fn select_files(&self, files: Vec<FfiPendingFile>) -> Result<(), HealyxError> {
        self.practice
            .lock()?
            .select_files(files.into_iter().map(PendingFile::from).collect());
        Ok(())
    }

    /// Upload the selected files, reporting progress to `listener`.
    ///
    /// The listener runs on the calling thread while the core is locked; it
    /// must not call back into `HealyxCore`.
    pub fn upload_files(
        &self,
        listener: Box<dyn UploadProgressListener>,
    ) -> Result<Vec<FfiUploadReceipt>, HealyxError> {
        let mut practice = self.practice.lock()?;
        let receipts = practice.upload_files(&mut |percent| listener.on_progress(percent))?;
        Ok(receipts.into_iter().map(FfiUploadReceipt::from).collect())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Billing tab of the open patient as JSON.
    pub fn export_billing_json(&self) -> Result<String, HealyxError> {
        let practice = self.practice.lock()?;
        Ok(practice.billing_export()?.to_json()?)
    }

    /// Transactions of the open patient as CSV.
    pub fn export_billing_csv(&self) -> Result<String, HealyxError> {
        let practice = self.practice.lock()?;
        Ok(practice.billing_export()?.to_csv())
    }

    /// Transactions of the whole roster as CSV.
    pub fn export_roster_billing_csv(&self) -> Result<String, HealyxError> {
        Ok(self.practice.lock()?.roster_billing_csv())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe signed-in user.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUser {
    pub id: String,
    pub email: Option<String>,
    pub organization: Option<String>,
    pub role: Option<String>,
}

impl From<&backend::AuthUser> for FfiUser {
    fn from(user: &backend::AuthUser) -> Self {
        let meta = |key: &str| {
            user.user_metadata
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            organization: meta("organization"),
            role: meta("role"),
        }
    }
}

/// FFI-safe provider sign-up form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProviderSignUp {
    pub organization: String,
    pub location: String,
    pub admin: String,
    pub email: String,
    pub npi: String,
    pub password: String,
    pub confirm_password: String,
    pub terms_accepted: bool,
}

impl From<FfiProviderSignUp> for ProviderSignUp {
    fn from(form: FfiProviderSignUp) -> Self {
        ProviderSignUp {
            organization: form.organization,
            location: form.location,
            admin: form.admin,
            email: form.email,
            npi: form.npi,
            password: form.password,
            confirm_password: form.confirm_password,
            terms_accepted: form.terms_accepted,
        }
    }
}

/// FFI-safe sign-up result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSignUpResult {
    pub signed_in: bool,
    /// Message to show when the account is not usable yet
    pub message: Option<String>,
}

/// FFI-safe appointment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    /// YYYY-MM-DD
    pub date: String,
    /// HH:MM
    pub time: String,
    pub duration: u32,
    pub appointment_type: String,
    pub label: String,
}

impl From<&Appointment> for FfiAppointment {
    fn from(a: &Appointment) -> Self {
        Self {
            id: a.id.clone(),
            patient_id: a.patient_id.clone(),
            patient_name: a.patient_name.clone(),
            date: a.date.format("%Y-%m-%d").to_string(),
            time: a.time.clone(),
            duration: a.duration,
            appointment_type: a.appointment_type.to_string(),
            label: a.label(),
        }
    }
}

impl TryFrom<FfiAppointment> for Appointment {
    type Error = HealyxError;

    fn try_from(a: FfiAppointment) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: a.id,
            patient_id: a.patient_id,
            patient_name: a.patient_name,
            date: parse_date(&a.date)?,
            time: a.time,
            duration: a.duration,
            appointment_type: AppointmentType::from(a.appointment_type),
            user_id: None,
        })
    }
}

/// FFI-safe new-appointment form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointmentDraft {
    pub patient_id: String,
    /// YYYY-MM-DD
    pub date: String,
    pub time: String,
    pub duration: u32,
    pub appointment_type: String,
}

/// FFI-safe calendar cell.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDayCell {
    pub date: String,
    pub day: u32,
    /// Week column header, e.g. "Mon"
    pub weekday: String,
    /// Week column header, e.g. "Oct 19"
    pub short_date: String,
    /// Day view title, e.g. "Monday, October 19, 2026"
    pub title: String,
    pub appointments: Vec<FfiAppointment>,
}

impl From<&DayCell<'_>> for FfiDayCell {
    fn from(cell: &DayCell<'_>) -> Self {
        use chrono::Datelike;
        let (weekday, short_date) = calendar::week_column_header(cell.date);
        Self {
            date: cell.date.format("%Y-%m-%d").to_string(),
            day: cell.date.day(),
            weekday,
            short_date,
            title: calendar::day_title(cell.date),
            appointments: cell.appointments.iter().map(|a| FfiAppointment::from(*a)).collect(),
        }
    }
}

/// FFI-safe month grid.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMonthGrid {
    pub title: String,
    pub leading_blanks: u32,
    pub row_count: u32,
    pub days: Vec<FfiDayCell>,
}

/// FFI-safe roster entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub name: String,
    pub dob: String,
    pub phone: String,
    pub email: String,
    pub label: String,
}

impl From<&Patient> for FfiPatient {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            dob: p.dob.clone(),
            phone: p.phone.clone(),
            email: p.email.clone(),
            label: p.roster_label(),
        }
    }
}

/// FFI-safe new-patient form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewPatient {
    pub name: String,
    pub dob: String,
    pub sex: String,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub race_ethnicity: String,
    pub preferred_language: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub notes: String,
}

impl From<FfiNewPatient> for NewPatient {
    fn from(form: FfiNewPatient) -> Self {
        NewPatient {
            name: form.name,
            dob: form.dob,
            sex: form.sex,
            height: form.height,
            weight: form.weight,
            race_ethnicity: form.race_ethnicity,
            preferred_language: form.preferred_language,
            phone: form.phone,
            email: form.email,
            address: form.address,
            notes: form.notes,
            ..Default::default()
        }
    }
}

/// FFI-safe medical history entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHistoryEntry {
    pub id: String,
    pub date: String,
    pub condition: String,
    pub notes: String,
}

/// FFI-safe diagnosis.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDiagnosis {
    pub id: String,
    pub icd_code: String,
    pub description: String,
}

/// FFI-safe test order.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLabTest {
    pub id: String,
    pub name: String,
    pub date: String,
}

/// FFI-safe prescription; `id` is ignored when adding.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescription {
    pub id: String,
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub route: String,
    pub refills: u32,
}

/// FFI-safe clinical note.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNote {
    pub id: String,
    pub content: String,
    pub timestamp: String,
    pub author: String,
}

/// FFI-safe full patient record for the details panel.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientRecord {
    pub patient: FfiPatient,
    pub sex: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub race_ethnicity: Option<String>,
    pub preferred_language: Option<String>,
    pub address: String,
    pub notes: String,
    pub medical_history: Vec<FfiHistoryEntry>,
    pub diagnoses: Vec<FfiDiagnosis>,
    pub tests: Vec<FfiLabTest>,
    pub prescriptions: Vec<FfiPrescription>,
    pub clinical_notes: Vec<FfiNote>,
    pub billing_notes: String,
    pub has_insurance: bool,
    pub preferred_pharmacy: Option<String>,
    pub subscriber_name: Option<String>,
    pub subscriber_dob: Option<String>,
    pub group_number: Option<String>,
    pub member_id: Option<String>,
    pub insurance_phone: Option<String>,
    pub insurance_url: Option<String>,
}

impl From<&Patient> for FfiPatientRecord {
    fn from(p: &Patient) -> Self {
        Self {
            patient: FfiPatient::from(p),
            sex: p.sex.clone(),
            height: p.height,
            weight: p.weight,
            race_ethnicity: p.race_ethnicity.clone(),
            preferred_language: p.preferred_language.clone(),
            address: p.address.clone(),
            notes: p.notes.clone(),
            medical_history: p
                .medical_history
                .iter()
                .map(|e| FfiHistoryEntry {
                    id: e.id.clone(),
                    date: e.date.clone(),
                    condition: e.condition.clone(),
                    notes: e.notes.clone(),
                })
                .collect(),
            diagnoses: p
                .treatment
                .diagnoses
                .iter()
                .map(|d| FfiDiagnosis {
                    id: d.id.clone(),
                    icd_code: d.icd_code.clone(),
                    description: d.description.clone(),
                })
                .collect(),
            tests: p
                .treatment
                .tests
                .iter()
                .map(|t| FfiLabTest {
                    id: t.id.clone(),
                    name: t.name.clone(),
                    date: t.date.clone(),
                })
                .collect(),
            prescriptions: p
                .treatment
                .prescriptions
                .iter()
                .map(|rx| FfiPrescription {
                    id: rx.id.clone(),
                    medication: rx.medication.clone(),
                    dosage: rx.dosage.clone(),
                    frequency: rx.frequency.clone(),
                    route: rx.route.clone(),
                    refills: rx.refills,
                })
                .collect(),
            clinical_notes: p
                .treatment
                .notes
                .iter()
                .map(|n| FfiNote {
                    id: n.id.clone(),
                    content: n.content.clone(),
                    timestamp: n.timestamp.clone(),
                    author: n.author.clone(),
                })
                .collect(),
            billing_notes: p.billing.clone(),
            has_insurance: p.has_insurance(),
            preferred_pharmacy: p.preferred_pharmacy.clone(),
            subscriber_name: p.subscriber_name.clone(),
            subscriber_dob: p.subscriber_dob.clone(),
            group_number: p.group_number.clone(),
            member_id: p.member_id.clone(),
            insurance_phone: p.insurance_phone.clone(),
            insurance_url: p.insurance_url.clone(),
        }
    }
}

/// FFI-safe ICD suggestion.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiIcdSuggestion {
    pub code: String,
    pub description: String,
    pub score: f64,
}

/// FFI-safe file picked for upload.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPendingFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl From<FfiPendingFile> for PendingFile {
    fn from(file: FfiPendingFile) -> Self {
        let pending = PendingFile::new(file.name, file.bytes);
        match file.content_type {
            Some(ct) => pending.with_content_type(ct),
            None => pending,
        }
    }
}

/// Progress sink for [`HealyxCore::upload_files`], implemented by the shell.
#[uniffi::export(callback_interface)]
pub trait UploadProgressListener: Send + Sync {
    /// Overall batch progress in percent, 0 to 100.
    fn on_progress(&self, percent: f64);
}

/// FFI-safe upload receipt.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUploadReceipt {
    pub file_name: String,
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

impl From<UploadReceipt> for FfiUploadReceipt {
    fn from(r: UploadReceipt) -> Self {
        Self {
            file_name: r.file_name,
            path: r.path,
            size: r.size,
            sha256: r.sha256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TableStore;

    fn sign_up_form() -> FfiProviderSignUp {
        FfiProviderSignUp {
            organization: "Harbor Family Clinic".to_string(),
            location: "Portland, OR".to_string(),
            admin: "Grace Hopper".to_string(),
            email: "dr.hopper@clinic.example".to_string(),
            npi: "1234567890".to_string(),
            password: "secret".to_string(),
            confirm_password: "secret".to_string(),
            terms_accepted: true,
        }
    }

    fn new_patient(name: &str) -> FfiNewPatient {
        FfiNewPatient {
            name: name.to_string(),
            dob: "1815-12-10".to_string(),
            sex: String::new(),
            height: None,
            weight: None,
            race_ethnicity: String::new(),
            preferred_language: String::new(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
            notes: String::new(),
        }
    }

    #[derive(Default, Clone)]
    struct ProgressLog {
        seen: Arc<Mutex<Vec<f64>>>,
    }

    impl UploadProgressListener for ProgressLog {
        fn on_progress(&self, percent: f64) {
            self.seen.lock().unwrap().push(percent);
        }
    }

    #[test]
    fn test_sign_up_and_current_user() {
        let core = open_in_memory().unwrap();
        assert!(core.current_user().unwrap().is_none());

        let result = core.sign_up(sign_up_form()).unwrap();
        assert!(result.signed_in);
        assert!(result.message.is_none());

        let user = core.current_user().unwrap().unwrap();
        assert_eq!(user.organization.as_deref(), Some("Harbor Family Clinic"));
        assert_eq!(user.role.as_deref(), Some("provider"));

        core.sign_out().unwrap();
        assert!(core.current_user().unwrap().is_none());
    }

    #[test]
    fn test_password_mismatch_is_auth_error() {
        let core = open_in_memory().unwrap();
        let mut form = sign_up_form();
        form.confirm_password = "other".to_string();

        match core.sign_up(form) {
            Err(HealyxError::Auth(msg)) => assert_eq!(msg, "Passwords do not match"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_patient_record_round_trip() {
        let core = open_in_memory().unwrap();
        core.sign_up(sign_up_form()).unwrap();
        let patient = core.add_patient(new_patient("Ada Lovelace")).unwrap();
        assert_eq!(patient.label, format!("Ada Lovelace (ID: {})", patient.id));

        assert!(matches!(
            core.add_note("Too early".to_string()),
            Err(HealyxError::NoPatientSelected)
        ));

        core.select_patient(patient.id.clone()).unwrap();
        let record = core
            .add_diagnosis("I10".to_string(), "Essential hypertension".to_string())
            .unwrap();
        assert_eq!(record.diagnoses.len(), 1);

        let record = core.add_note("Follow up in two weeks".to_string()).unwrap();
        assert_eq!(record.clinical_notes[0].author, "dr.hopper@clinic.example");

        let missing = core.delete_test("missing".to_string());
        assert!(matches!(missing, Err(HealyxError::NotFound(_))));

        assert!(core.export_billing_csv().unwrap().starts_with("patient_id,"));
    }

    #[test]
    fn test_appointment_lands_in_month_grid() {
        let core = open_in_memory().unwrap();
        core.sign_up(sign_up_form()).unwrap();
        let patient = core.add_patient(new_patient("Alan Turing")).unwrap();

        core.go_to_date("2026-10-19".to_string()).unwrap();
        let appointment = core
            .add_appointment(FfiAppointmentDraft {
                patient_id: patient.id,
                date: "2026-10-21".to_string(),
                time: "09:30".to_string(),
                duration: 45,
                appointment_type: "Consultation".to_string(),
            })
            .unwrap();
        assert_eq!(appointment.label, "Alan Turing - 09:30");

        let grid = core.month_grid().unwrap();
        assert_eq!(grid.title, "October 2026");
        assert_eq!(grid.leading_blanks, 4);
        let cell = &grid.days[20];
        assert_eq!(cell.date, "2026-10-21");
        assert_eq!(cell.weekday, "Wed");
        assert_eq!(cell.appointments.len(), 1);

        core.toggle_type_filter("Checkup".to_string()).unwrap();
        assert!(core.month_grid().unwrap().days[20].appointments.is_empty());
    }

    #[test]
    fn test_invalid_inputs() {
        let core = open_in_memory().unwrap();
        assert!(matches!(
            core.go_to_date("21/10/2026".to_string()),
            Err(HealyxError::InvalidInput(_))
        ));
        assert!(matches!(
            core.set_view("year".to_string()),
            Err(HealyxError::InvalidInput(_))
        ));
        assert!(matches!(
            core.upload_files(Box::new(ProgressLog::default())),
            Err(HealyxError::InvalidInput(_))
        ));
        assert!(matches!(
            open_remote("ftp://example.com".to_string(), "key".to_string()),
            Err(HealyxError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_upload_reports_progress_per_file() {
        let core = open_in_memory().unwrap();
        core.sign_up(sign_up_form()).unwrap();
        core.select_files(vec![
            FfiPendingFile {
                name: "labs.pdf".to_string(),
                content_type: None,
                bytes: b"%PDF-1.7".to_vec(),
            },
            FfiPendingFile {
                name: "xray.png".to_string(),
                content_type: Some("image/png".to_string()),
                bytes: vec![0x89, b'P', b'N', b'G'],
            },
        ])
        .unwrap();

        let log = ProgressLog::default();
        let receipts = core.upload_files(Box::new(log.clone())).unwrap();
        assert_eq!(receipts.len(), 2);

        let seen = log.seen.lock().unwrap().clone();
        assert_eq!(seen.first().copied(), Some(50.0));
        assert_eq!(seen.last().copied(), Some(100.0));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_patient_record_carries_demographics_and_insurance() {
        let core = open_in_memory().unwrap();
        core.sign_up(sign_up_form()).unwrap();
        let mut form = new_patient("Katherine Johnson");
        form.race_ethnicity = "Black or African American".to_string();
        form.preferred_language = "English".to_string();
        let patient = core.add_patient(form).unwrap();

        core.practice
            .lock()
            .unwrap()
            .backend()
            .update(
                backend::PATIENTS_TABLE,
                &patient.id,
                &serde_json::json!({
                    "subscriber_name": "Katherine Johnson",
                    "member_id": "M-2231",
                    "preferred_pharmacy": "Main St Pharmacy"
                }),
                None,
            )
            .unwrap();
        core.load().unwrap();

        let record = core.select_patient(patient.id).unwrap();
        assert_eq!(record.race_ethnicity.as_deref(), Some("Black or African American"));
        assert_eq!(record.preferred_language.as_deref(), Some("English"));
        assert_eq!(record.subscriber_name.as_deref(), Some("Katherine Johnson"));
        assert_eq!(record.member_id.as_deref(), Some("M-2231"));
        assert_eq!(record.preferred_pharmacy.as_deref(), Some("Main St Pharmacy"));
        assert!(record.group_number.is_none());
        assert!(record.has_insurance);
    }

    #[test]
    fn test_update_appointment_keeps_booking_provider() {
        let core = open_in_memory().unwrap();
        core.sign_up(sign_up_form()).unwrap();
        let patient = core.add_patient(new_patient("Alan Turing")).unwrap();
        let mut appointment = core
            .add_appointment(FfiAppointmentDraft {
                patient_id: patient.id,
                date: "2026-10-21".to_string(),
                time: "09:30".to_string(),
                duration: 30,
                appointment_type: "Checkup".to_string(),
            })
            .unwrap();

        appointment.time = "11:00".to_string();
        core.update_appointment(appointment.clone()).unwrap();

        let practice = core.practice.lock().unwrap();
        let stored = practice.appointment(&appointment.id).unwrap();
        assert_eq!(stored.time, "11:00");
        let owner = practice.session().unwrap().user.id.clone();
        assert_eq!(stored.user_id.as_deref(), Some(owner.as_str()));
    }
}
