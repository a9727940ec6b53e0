//! The patient roster held by the front-end.

use crate::models::Patient;

/// Patients loaded from the remote `patients` table.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    patients: Vec<Patient>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the roster with a fresh load.
    pub fn replace_all(&mut self, patients: Vec<Patient>) {
        self.patients = patients;
    }

    /// Append a newly created patient.
    pub fn push(&mut self, patient: Patient) {
        self.patients.push(patient);
    }

    /// Replace the patient with the same ID. Returns false if absent.
    pub fn replace(&mut self, patient: Patient) -> bool {
        match self.patients.iter_mut().find(|p| p.id == patient.id) {
            Some(slot) => {
                *slot = patient;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    pub fn all(&self) -> &[Patient] {
        &self.patients
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Patient name for an ID, if on the roster.
    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|p| p.name.as_str())
    }

    /// Search by name (case-insensitive substring) or by ID (substring).
    ///
    /// An empty query returns the whole roster in load order.
    pub fn search(&self, query: &str) -> Vec<&Patient> {
        let needle = query.to_lowercase();
        self.patients
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle) || p.id.contains(query))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(id: &str, name: &str) -> Patient {
        Patient {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    fn roster() -> Roster {
        let mut roster = Roster::new();
        roster.replace_all(vec![
            patient("104233", "Ada Lovelace"),
            patient("220871", "Grace Hopper"),
            patient("310442", "Alan Turing"),
        ]);
        roster
    }

    #[test]
    fn test_search_by_name_case_insensitive() {
        let roster = roster();
        let results = roster.search("LOVE");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Ada Lovelace");

        let results = roster.search("a");
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_search_by_id() {
        let roster = roster();
        let results = roster.search("0442");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Alan Turing");
    }

    #[test]
    fn test_empty_query_returns_all() {
        assert_eq!(roster().search("").len(), 3);
    }

    #[test]
    fn test_replace_by_id() {
        let mut roster = roster();
        let mut updated = patient("220871", "Grace B. Hopper");
        updated.phone = "555-0101".into();
        assert!(roster.replace(updated));
        assert_eq!(roster.name_of("220871"), Some("Grace B. Hopper"));

        assert!(!roster.replace(patient("999", "Nobody")));
        assert_eq!(roster.len(), 3);
    }
}
