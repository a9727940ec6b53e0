//! Billing tab data and transaction export.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{BillingTransaction, Patient};

/// Insurance block shown on the billing tab.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InsuranceInfo {
    pub preferred_pharmacy: Option<String>,
    pub subscriber_name: Option<String>,
    pub subscriber_dob: Option<String>,
    pub group_number: Option<String>,
    pub member_id: Option<String>,
    pub insurance_phone: Option<String>,
    pub insurance_url: Option<String>,
}

impl From<&Patient> for InsuranceInfo {
    fn from(patient: &Patient) -> Self {
        Self {
            preferred_pharmacy: patient.preferred_pharmacy.clone(),
            subscriber_name: patient.subscriber_name.clone(),
            subscriber_dob: patient.subscriber_dob.clone(),
            group_number: patient.group_number.clone(),
            member_id: patient.member_id.clone(),
            insurance_phone: patient.insurance_phone.clone(),
            insurance_url: patient.insurance_url.clone(),
        }
    }
}

/// Totals over a patient's transactions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BillingSummary {
    pub transaction_count: usize,
    pub total_billable: f64,
    pub cash_total: f64,
    pub insurance_total: f64,
    /// Transaction count per claim status; blank statuses count as "Unknown"
    pub by_claim_status: BTreeMap<String, usize>,
}

impl BillingSummary {
    pub fn from_transactions(transactions: &[BillingTransaction]) -> Self {
        let mut summary = Self {
            transaction_count: transactions.len(),
            ..Default::default()
        };

        for tx in transactions {
            summary.total_billable += tx.billable_amount;
            if tx.is_cash_transaction {
                summary.cash_total += tx.billable_amount;
            } else {
                summary.insurance_total += tx.billable_amount;
            }

            let status = match tx.claim_status.trim() {
                "" => "Unknown".to_string(),
                s => s.to_string(),
            };
            *summary.by_claim_status.entry(status).or_default() += 1;
        }

        summary
    }
}

/// Billing export for a single patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingExport {
    pub patient_id: String,
    pub patient_name: String,
    /// Free-text billing memo
    pub billing_notes: String,
    pub insurance: InsuranceInfo,
    pub summary: BillingSummary,
    pub transactions: Vec<BillingTransaction>,
    /// Export timestamp
    pub exported_at: String,
}

impl BillingExport {
    pub fn from_patient(patient: &Patient) -> Self {
        Self {
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            billing_notes: patient.billing.clone(),
            insurance: InsuranceInfo::from(patient),
            summary: BillingSummary::from_transactions(&patient.transactions),
            transactions: patient.transactions.clone(),
            exported_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(CSV_HEADER);
        push_rows(&mut csv, &self.patient_id, &self.patient_name, &self.transactions);
        csv
    }
}

const CSV_HEADER: &str = "patient_id,patient_name,icd_code,treatment,billable_amount,claim_status,bill_date,post_date,cash\n";

/// CSV over every patient on the roster that has transactions.
pub fn roster_billing_csv(patients: &[Patient]) -> String {
    let mut csv = String::from(CSV_HEADER);
    for patient in patients {
        push_rows(&mut csv, &patient.id, &patient.name, &patient.transactions);
    }
    csv
}

fn push_rows(csv: &mut String, patient_id: &str, patient_name: &str, txs: &[BillingTransaction]) {
    for tx in txs {
        csv.push_str(&format!(
            "{},{},{},{},{:.2},{},{},{},{}\n",
            escape_csv(patient_id),
            escape_csv(patient_name),
            escape_csv(&tx.icd_code),
            escape_csv(&tx.treatment),
            tx.billable_amount,
            escape_csv(&tx.claim_status),
            escape_csv(&tx.bill_date),
            escape_csv(&tx.post_date),
            if tx.is_cash_transaction { "yes" } else { "no" },
        ));
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
