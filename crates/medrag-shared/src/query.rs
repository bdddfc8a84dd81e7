//! Query requests and their validated form.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default number of passages requested from the engine.
pub const DEFAULT_TOP_K: u32 = 32;

/// Largest `k` a caller may request.
pub const MAX_TOP_K: u32 = 100;

fn default_top_k() -> u32 {
    DEFAULT_TOP_K
}

/// Request body for `/query` and `/ablate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Medical question. Redacted before validation.
    pub query: String,

    /// Multiple-choice options, label -> text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,

    /// Number of passages to retrieve
    #[serde(default = "default_top_k")]
    pub k: u32,

    /// Generation temperature
    #[serde(default)]
    pub temperature: f64,

    /// Passage or source ids to exclude (ablation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ablate: Option<Vec<String>>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            options: None,
            k: DEFAULT_TOP_K,
            temperature: 0.0,
            ablate: None,
        }
    }

    pub fn with_k(mut self, k: u32) -> Self {
        self.k = k;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_options(mut self, options: BTreeMap<String, String>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_exclusions<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ablate = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Redact the query text with `sanitize`, then validate.
    pub fn validate<F>(self, sanitize: F) -> Result<Query, ValidationError>
    where
        F: FnOnce(&str) -> String,
    {
        let text = sanitize(&self.query);
        if text.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if !(1..=MAX_TOP_K).contains(&self.k) {
            return Err(ValidationError::TopKOutOfRange(self.k));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ValidationError::TemperatureOutOfRange(self.temperature));
        }

        let mut exclude: Vec<String> = Vec::new();
        for id in self.ablate.unwrap_or_default() {
            if !exclude.contains(&id) {
                exclude.push(id);
            }
        }

        Ok(Query {
            text,
            options: self.options,
            top_k: self.k,
            temperature: self.temperature,
            exclude,
        })
    }

    /// As `validate`, but an empty or absent exclusion list is an error.
    pub fn validate_ablation<F>(self, sanitize: F) -> Result<Query, ValidationError>
    where
        F: FnOnce(&str) -> String,
    {
        if self.ablate.as_ref().map_or(true, |ids| ids.is_empty()) {
            return Err(ValidationError::MissingExclusions);
        }
        self.validate(sanitize)
    }
}

/// A validated, redacted query. Immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    text: String,
    options: Option<BTreeMap<String, String>>,
    top_k: u32,
    temperature: f64,
    exclude: Vec<String>,
}

impl Query {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> Option<&BTreeMap<String, String>> {
        self.options.as_ref()
    }

    pub fn top_k(&self) -> u32 {
        self.top_k
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Exclusion ids in first-seen order, duplicates removed.
    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn has_exclusions(&self) -> bool {
        !self.exclude.is_empty()
    }

    /// Whitespace word count of the question plus option texts.
    pub fn prompt_word_count(&self) -> usize {
        let options = self
            .options
            .iter()
            .flat_map(|map| map.values())
            .map(|value| value.split_whitespace().count())
            .sum::<usize>();
        self.text.split_whitespace().count() + options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(text: &str) -> String {
        text.to_string()
    }

    #[test]
    fn test_defaults_from_json() {
        let req: QueryRequest = serde_json::from_str(r#"{"query": "What causes chest pain?"}"#).unwrap();
        assert_eq!(req.k, 32);
        assert_eq!(req.temperature, 0.0);
        assert!(req.options.is_none());
        assert!(req.ablate.is_none());
    }

    #[test]
    fn test_validate_accepts_bounds() {
        assert!(QueryRequest::new("q").with_k(1).validate(identity).is_ok());
        assert!(QueryRequest::new("q").with_k(100).with_temperature(1.0).validate(identity).is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert_eq!(
            QueryRequest::new("q").with_k(0).validate(identity),
            Err(ValidationError::TopKOutOfRange(0))
        );
        assert_eq!(
            QueryRequest::new("q").with_k(101).validate(identity),
            Err(ValidationError::TopKOutOfRange(101))
        );
        assert_eq!(
            QueryRequest::new("q").with_temperature(1.5).validate(identity),
            Err(ValidationError::TemperatureOutOfRange(1.5))
        );
        assert!(QueryRequest::new("q").with_temperature(f64::NAN).validate(identity).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_text() {
        assert_eq!(
            QueryRequest::new("").validate(identity),
            Err(ValidationError::EmptyQuery)
        );
    }

    #[test]
    fn test_validate_accepts_whitespace_text() {
        let query = QueryRequest::new("   ").validate(identity).unwrap();
        assert_eq!(query.text(), "   ");
        assert_eq!(query.prompt_word_count(), 0);
    }

    #[test]
    fn test_validate_applies_sanitizer() {
        let query = QueryRequest::new("patient 123-45-6789")
            .validate(|_| "patient [REDACTED]".to_string())
            .unwrap();
        assert_eq!(query.text(), "patient [REDACTED]");
    }

    #[test]
    fn test_exclusions_deduplicated_in_order() {
        let query = QueryRequest::new("q")
            .with_exclusions(["doc_3", "doc_1", "doc_3"])
            .validate(identity)
            .unwrap();
        assert_eq!(query.exclude(), ["doc_3".to_string(), "doc_1".to_string()]);
        assert!(query.has_exclusions());
    }

    #[test]
    fn test_validate_ablation_requires_ids() {
        assert_eq!(
            QueryRequest::new("q").validate_ablation(identity),
            Err(ValidationError::MissingExclusions)
        );
        assert_eq!(
            QueryRequest::new("q")
                .with_exclusions(Vec::<String>::new())
                .validate_ablation(identity),
            Err(ValidationError::MissingExclusions)
        );
        assert!(QueryRequest::new("q")
            .with_exclusions(["doc_1"])
            .validate_ablation(identity)
            .is_ok());
    }

    #[test]
    fn test_prompt_word_count_includes_options() {
        let mut options = BTreeMap::new();
        options.insert("A".to_string(), "Diphenhydramine".to_string());
        options.insert("B".to_string(), "Epinephrine IM".to_string());
        let query = QueryRequest::new("first line for anaphylaxis")
            .with_options(options)
            .validate(identity)
            .unwrap();
        assert_eq!(query.prompt_word_count(), 7);
    }
}
