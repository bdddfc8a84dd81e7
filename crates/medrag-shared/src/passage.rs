//! Passage types at the engine boundary.
//!
//! Engines return loosely shaped passages. `RawPassage` accepts whatever
//! fields are present; `PassageRecord::from_raw` substitutes defaults once so
//! nothing downstream deals with missing fields.

use serde::{Deserialize, Deserializer, Serialize};

/// A passage exactly as an engine reported it. Unknown fields are ignored.
///
/// Ids may arrive as any JSON scalar and offsets as any number; both are
/// coerced rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPassage {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, alias = "published_at", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_offset",
        skip_serializing_if = "Option::is_none"
    )]
    pub start: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient_offset",
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Flag(bool),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Offset {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Flag(b) => b.to_string(),
    }))
}

/// Negative offsets clamp to 0, fractional ones round down.
fn lenient_offset<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Offset>::deserialize(deserializer)?.map(|offset| match offset {
        Offset::Unsigned(n) => n,
        Offset::Signed(n) => n.max(0) as u64,
        Offset::Float(f) if f.is_finite() && f > 0.0 => f.floor() as u64,
        Offset::Float(_) => 0,
    }))
}

impl RawPassage {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            title: Some(title.into()),
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_range(mut self, start: u64, end: u64) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}

/// Normalized passage. Read-only once built.
///
/// `source_id` is the second identifier space used by ablation: the engine's
/// explicit source id, else the title, else empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageRecord {
    pub id: String,
    pub source_id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub content: String,
    pub range_start: u64,
    pub range_end: u64,
}

impl PassageRecord {
    /// Build from an engine passage at retrieval rank `rank`.
    ///
    /// A missing id becomes `doc_<rank>`, a missing source id falls back to
    /// the title, and a missing range covers the whole content.
    pub fn from_raw(raw: RawPassage, rank: usize) -> Self {
        let id = raw.id.unwrap_or_else(|| format!("doc_{}", rank));
        let source_id = raw
            .source_id
            .or_else(|| raw.title.clone())
            .unwrap_or_default();
        let content = raw.content.unwrap_or_default();
        let range_start = raw.start.unwrap_or(0);
        let range_end = raw.end.unwrap_or(content.chars().count() as u64);

        Self {
            id,
            source_id,
            title: raw.title,
            url: raw.url,
            published_at: raw.date,
            content,
            range_start,
            range_end,
        }
    }

    /// Character span as reported in evidence: `chars_<start>_<end>`.
    pub fn span(&self) -> String {
        format!("chars_{}_{}", self.range_start, self.range_end)
    }

    /// Whitespace word count of the content.
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// A passage paired with its retrieval similarity. Position in the
/// surrounding sequence is the retrieval rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub passage: PassageRecord,
    pub similarity: f64,
}

impl ScoredPassage {
    /// Pair a passage with a score, forcing the score into [0, 1].
    pub fn new(passage: PassageRecord, similarity: f64) -> Self {
        Self {
            passage,
            similarity: normalize_similarity(similarity),
        }
    }
}

/// Non-finite scores count as zero; everything else is clamped to [0, 1].
pub fn normalize_similarity(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Positional identifier for a rank in the current sequence.
pub fn positional_id(rank: usize) -> String {
    format!("passage_{}", rank)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_fills_defaults() {
        let raw = RawPassage {
            content: Some("fever in children".to_string()),
            ..Default::default()
        };
        let record = PassageRecord::from_raw(raw, 3);

        assert_eq!(record.id, "doc_3");
        assert_eq!(record.source_id, "");
        assert_eq!(record.title, None);
        assert_eq!(record.range_start, 0);
        assert_eq!(record.range_end, 17);
        assert_eq!(record.span(), "chars_0_17");
    }

    #[test]
    fn test_from_raw_keeps_explicit_fields() {
        let raw = RawPassage::new("doc_1", "Chest Pain Guidelines", "Chest pain evaluation")
            .with_source_id("textbook_7")
            .with_range(10, 40);
        let record = PassageRecord::from_raw(raw, 0);

        assert_eq!(record.id, "doc_1");
        assert_eq!(record.source_id, "textbook_7");
        assert_eq!(record.title.as_deref(), Some("Chest Pain Guidelines"));
        assert_eq!(record.span(), "chars_10_40");
        assert_eq!(record.word_count(), 3);
    }

    #[test]
    fn test_raw_passage_parses_engine_json() {
        let json = r#"{
            "id": "pediatric_fever_001",
            "title": "Fever in Children",
            "content": "Common causes",
            "published_at": "2021-04-01",
            "category": "pediatrics"
        }"#;
        let raw: RawPassage = serde_json::from_str(json).unwrap();
        assert_eq!(raw.id.as_deref(), Some("pediatric_fever_001"));
        assert_eq!(raw.date.as_deref(), Some("2021-04-01"));
    }

    #[test]
    fn test_source_id_falls_back_to_title() {
        let raw = RawPassage::new("emergency_001", "Pediatric Emergency Warning Signs", "Seek care");
        let record = PassageRecord::from_raw(raw, 0);
        assert_eq!(record.source_id, "Pediatric Emergency Warning Signs");
    }

    #[test]
    fn test_raw_passage_coerces_loose_fields() {
        let json = r#"{"id": 42, "title": "Croup", "start": -1, "end": 12.7}"#;
        let raw: RawPassage = serde_json::from_str(json).unwrap();
        assert_eq!(raw.id.as_deref(), Some("42"));
        assert_eq!(raw.start, Some(0));
        assert_eq!(raw.end, Some(12));

        let raw: RawPassage = serde_json::from_str(r#"{"id": null, "start": null}"#).unwrap();
        assert_eq!(raw.id, None);
        assert_eq!(raw.start, None);
    }

    #[test]
    fn test_similarity_normalized() {
        assert_eq!(normalize_similarity(1.7), 1.0);
        assert_eq!(normalize_similarity(-0.2), 0.0);
        assert_eq!(normalize_similarity(f64::NAN), 0.0);
        assert_eq!(normalize_similarity(0.42), 0.42);
    }
}
