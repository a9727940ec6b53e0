//! ICD-10 code catalog used by the diagnosis form.
//!
//! Suggestions are ranked by Jaro-Winkler similarity against both the code and
//! the description, so "chicken pox" and "B01" both find varicella.

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

/// Minimum score for a suggestion.
const MIN_SUGGESTION_SCORE: f64 = 0.70;

/// Bonus for a description that contains the query outright.
const SUBSTRING_SCORE: f64 = 0.95;

/// A code and its description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IcdCode {
    pub code: String,
    pub description: String,
}

/// A ranked match.
#[derive(Debug, Clone, PartialEq)]
pub struct IcdSuggestion {
    pub code: IcdCode,
    pub score: f64,
}

/// In-memory code list.
#[derive(Debug, Clone)]
pub struct IcdCatalog {
    codes: Vec<IcdCode>,
}

impl Default for IcdCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl IcdCatalog {
    pub fn empty() -> Self {
        Self { codes: Vec::new() }
    }

    /// Catalog seeded with the codes the diagnosis picker ships with.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::empty();
        catalog.insert("A00", "Cholera");
        catalog.insert("B01", "Varicella [chickenpox]");
        catalog.insert("C50", "Malignant neoplasm of breast");
        catalog
    }

    /// Add a code, replacing the description if the code exists.
    pub fn insert(&mut self, code: &str, description: &str) {
        let code = code.trim().to_ascii_uppercase();
        match self.codes.iter_mut().find(|c| c.code == code) {
            Some(existing) => existing.description = description.to_string(),
            None => self.codes.push(IcdCode {
                code,
                description: description.to_string(),
            }),
        }
    }

    pub fn all(&self) -> &[IcdCode] {
        &self.codes
    }

    /// Exact lookup, case-insensitive.
    pub fn lookup(&self, code: &str) -> Option<&IcdCode> {
        let code = code.trim();
        self.codes.iter().find(|c| c.code.eq_ignore_ascii_case(code))
    }

    /// Ranked suggestions for free text, best first.
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<IcdSuggestion> {
        let query = normalize(query);
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<IcdSuggestion> = self
            .codes
            .iter()
            .map(|c| IcdSuggestion {
                code: c.clone(),
                score: score(&query, c),
            })
            .filter(|s| s.score >= MIN_SUGGESTION_SCORE)
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.code.code.cmp(&b.code.code))
        });
        scored.truncate(limit);
        scored
    }
}

fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn score(query: &str, code: &IcdCode) -> f64 {
    let code_text = code.code.to_lowercase();
    if query == code_text {
        return 1.0;
    }
    let code_score: f64 = if code_text.starts_with(query) { 0.9 } else { 0.0 };

    let description = normalize(&code.description);
    let whole = jaro_winkler(query, &description).max(normalized_levenshtein(query, &description));
    let contained = if description.contains(query) || description.replace(' ', "").contains(&query.replace(' ', "")) {
        SUBSTRING_SCORE
    } else {
        0.0
    };

    // Best single-word match, so "breast" finds "malignant neoplasm of breast"
    let word = description
        .split_whitespace()
        .map(|w| jaro_winkler(query, w))
        .fold(0.0, f64::max);

    code_score.max(whole).max(contained).max(word)
}
