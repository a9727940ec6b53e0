//! Patient models.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::record::{MedicalHistoryEntry, Treatment};
use super::wire::{lenient_f64, lenient_opt_f64, null_as_default, string_or_number};

/// A patient row from the `patients` table.
///
/// Demographic columns are snake_case; the nested documents keep the column
/// names the remote schema already uses (`medicalHistory`, `treatment`,
/// `transactions`). Missing or `null` collections load as empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Patient {
    /// Remote-assigned ID
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    /// Date of birth (YYYY-MM-DD)
    #[serde(default, deserialize_with = "null_as_default")]
    pub dob: String,
    #[serde(default)]
    pub sex: Option<String>,
    /// Height in cm
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub height: Option<f64>,
    /// Weight in kg
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub race_ethnicity: Option<String>,
    #[serde(default)]
    pub preferred_language: Option<String>,
    /// Free-text notes entered at intake
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(
        rename = "medicalHistory",
        default,
        deserialize_with = "null_as_default"
    )]
    pub medical_history: Vec<MedicalHistoryEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub treatment: Treatment,
    /// Free-text billing memo
    #[serde(default, deserialize_with = "null_as_default")]
    pub billing: String,
    #[serde(default)]
    pub preferred_pharmacy: Option<String>,
    #[serde(default)]
    pub subscriber_name: Option<String>,
    #[serde(default)]
    pub subscriber_dob: Option<String>,
    #[serde(default)]
    pub group_number: Option<String>,
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub insurance_phone: Option<String>,
    #[serde(default)]
    pub insurance_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transactions: Vec<BillingTransaction>,
}

impl Patient {
    /// Check if the patient has any insurance details on file.
    pub fn has_insurance(&self) -> bool {
        [
            &self.subscriber_name,
            &self.group_number,
            &self.member_id,
            &self.insurance_phone,
            &self.insurance_url,
        ]
        .iter()
        .any(|f| f.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }

    /// Label used in the roster list.
    pub fn roster_label(&self) -> String {
        format!("{} (ID: {})", self.name, self.id)
    }
}

/// A billed line on the patient's account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BillingTransaction {
    #[serde(default, deserialize_with = "null_as_default")]
    pub icd_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub treatment: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub billable_amount: f64,
    /// Claim status as reported by the payer (e.g., "Paid", "Pending", "Denied")
    #[serde(default, deserialize_with = "null_as_default")]
    pub claim_status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bill_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub post_date: String,
    #[serde(default)]
    pub is_cash_transaction: bool,
}

/// Demographics entered in the "Add New Patient" form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NewPatient {
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
    pub billing: String,
    pub preferred_pharmacy: String,
    pub subscriber_name: String,
    pub subscriber_dob: String,
    pub group_number: String,
    pub member_id: String,
    pub insurance_phone: String,
    pub insurance_url: String,
}

impl NewPatient {
    /// Create a form with the required name filled in.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Row inserted into the `patients` table.
    ///
    /// Only columns the remote schema defines are sent; blank optional
    /// demographics are sent as `null`.
    pub fn to_insert_row(&self) -> Value {
        json!({
            "name": self.name,
            "phone": self.phone,
            "email": self.email,
            "address": self.address,
            "sex": blank_to_none(&self.sex),
            "race_ethnicity": blank_to_none(&self.race_ethnicity),
            "preferred_language": blank_to_none(&self.preferred_language),
            "dob": self.dob,
            "notes": self.notes,
        })
    }

    /// Build the local patient once the remote has assigned an ID.
    pub fn into_patient(self, id: String) -> Patient {
        Patient {
            id,
            name: self.name,
            phone: self.phone,
            email: self.email,
            address: self.address,
            dob: self.dob,
            sex: blank_to_none(&self.sex),
            height: self.height,
            weight: self.weight,
            race_ethnicity: blank_to_none(&self.race_ethnicity),
            preferred_language: blank_to_none(&self.preferred_language),
            notes: self.notes,
            medical_history: Vec::new(),
            treatment: Treatment::default(),
            billing: self.billing,
            preferred_pharmacy: blank_to_none(&self.preferred_pharmacy),
            subscriber_name: blank_to_none(&self.subscriber_name),
            subscriber_dob: blank_to_none(&self.subscriber_dob),
            group_number: blank_to_none(&self.group_number),
            member_id: blank_to_none(&self.member_id),
            insurance_phone: blank_to_none(&self.insurance_phone),
            insurance_url: blank_to_none(&self.insurance_url),
            transactions: Vec::new(),
        }
    }
}

fn blank_to_none(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_row_normalized() {
        let row = r#"{"id": 7, "name": "Ada Lovelace", "medicalHistory": null,
                      "treatment": {"notes": null}, "transactions": null}"#;
        let patient: Patient = serde_json::from_str(row).unwrap();
        assert_eq!(patient.id, "7");
        assert!(patient.medical_history.is_empty());
        assert!(patient.treatment.is_empty());
        assert!(patient.transactions.is_empty());
        assert_eq!(patient.phone, "");
    }

    #[test]
    fn test_insert_row_blank_optionals_null() {
        let mut form = NewPatient::new("Grace Hopper");
        form.dob = "1906-12-09".into();
        form.preferred_language = "English".into();

        let row = form.to_insert_row();
        assert_eq!(row["name"], "Grace Hopper");
        assert!(row["sex"].is_null());
        assert!(row["race_ethnicity"].is_null());
        assert_eq!(row["preferred_language"], "English");
        // Nested documents are not part of the insert
        assert!(row.get("medicalHistory").is_none());
        assert!(row.get("billing").is_none());
    }

    #[test]
    fn test_into_patient_has_empty_record() {
        let mut form = NewPatient::new("Grace Hopper");
        form.member_id = "M-100".into();
        let patient = form.into_patient("55".into());
        assert_eq!(patient.id, "55");
        assert!(patient.medical_history.is_empty());
        assert!(patient.treatment.is_empty());
        assert!(patient.has_insurance());
        assert_eq!(patient.roster_label(), "Grace Hopper (ID: 55)");
    }

    #[test]
    fn test_transaction_wire_names() {
        let tx: BillingTransaction = serde_json::from_str(
            r#"{"icdCode": "A00", "treatment": "Rehydration", "billableAmount": "120.50",
                "claimStatus": "Pending", "billDate": "2026-10-01", "postDate": "",
                "isCashTransaction": true}"#,
        )
        .unwrap();
        assert_eq!(tx.icd_code, "A00");
        assert_eq!(tx.billable_amount, 120.5);
        assert!(tx.is_cash_transaction);
    }
}
