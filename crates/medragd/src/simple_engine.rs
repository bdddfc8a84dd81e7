//! Keyword-overlap engine over a small medical knowledge base.
//!
//! Used when no external RAG engine is wired in. Retrieval scores each
//! document by the fraction of distinct query words it contains; the answer
//! is templated by topic. Not a substitute for a real retriever.

use crate::config::EngineConfig;
use crate::engine::{EngineError, EngineOutput, RagEngine};
use anyhow::{Context, Result};
use medrag_shared::RawPassage;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").unwrap());

pub const NO_MATCH_ANSWER: &str = "I don't have specific information about this medical topic in my current knowledge base. Please consult with a healthcare professional.";

/// One knowledge-base document. Extra fields in corpus files are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDoc {
    pub id: String,
    pub title: String,
    pub content: String,
}

impl KnowledgeDoc {
    fn new(id: &str, title: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    fn words(&self) -> HashSet<String> {
        tokenize(&format!("{} {}", self.title, self.content))
    }

    fn to_passage(&self) -> RawPassage {
        RawPassage::new(self.id.clone(), self.title.clone(), self.content.clone())
    }
}

/// Lowercased distinct words
pub fn tokenize(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower).map(|m| m.as_str().to_string()).collect()
}

/// Built-in pediatric knowledge base
pub fn builtin_corpus() -> Vec<KnowledgeDoc> {
    vec![
        KnowledgeDoc::new(
            "pediatric_fever_001",
            "Fever in Children - Common Causes",
            "Common causes of fever in children include viral infections (most common), bacterial infections, immunizations, teething, and inflammatory conditions. Viral causes include respiratory viruses, gastroenteritis viruses, and common childhood illnesses like hand-foot-mouth disease.",
        ),
        KnowledgeDoc::new(
            "pediatric_fever_002",
            "Fever Management in Pediatrics",
            "Fever management in children focuses on comfort rather than temperature reduction. Antipyretics like acetaminophen or ibuprofen can be used for comfort. Red flags include fever in infants <3 months, altered mental status, signs of dehydration, or persistent high fever >5 days.",
        ),
        KnowledgeDoc::new(
            "respiratory_001",
            "Pediatric Respiratory Infections",
            "Upper respiratory infections are common in children, often caused by rhinovirus, RSV, or parainfluenza viruses. Symptoms include runny nose, cough, congestion, and low-grade fever. Most are self-limiting and require supportive care.",
        ),
        KnowledgeDoc::new(
            "emergency_001",
            "Pediatric Emergency Warning Signs",
            "Warning signs requiring immediate medical attention in children include difficulty breathing, severe dehydration, altered mental status, high fever with petechial rash, severe abdominal pain, or signs of sepsis including poor feeding and lethargy.",
        ),
        KnowledgeDoc::new(
            "growth_001",
            "Normal Growth and Development",
            "Normal pediatric growth follows predictable patterns. Growth charts help track height, weight, and head circumference. Failure to thrive may indicate underlying medical conditions, feeding problems, or psychosocial issues requiring evaluation.",
        ),
    ]
}

/// Load `<db_dir>/<corpus_name>.json` if present, else the built-in corpus
pub fn load_corpus(db_dir: &Path, corpus_name: &str) -> Result<Vec<KnowledgeDoc>> {
    let path = db_dir.join(format!("{}.json", corpus_name));
    if !path.exists() {
        debug!("No corpus file at {}, using built-in knowledge base", path.display());
        return Ok(builtin_corpus());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("reading corpus {}", path.display()))?;
    let docs: Vec<KnowledgeDoc> = serde_json::from_str(&content)
        .with_context(|| format!("parsing corpus {}", path.display()))?;
    info!("Loaded {} documents from {}", docs.len(), path.display());
    Ok(docs)
}

pub struct SimpleEngine {
    docs: Vec<KnowledgeDoc>,
    /// Pre-tokenized documents, parallel to `docs` (None when caching is off)
    doc_words: Option<Vec<HashSet<String>>>,
    llm_name: String,
    retriever_name: String,
    corpus_name: String,
}

impl SimpleEngine {
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let docs = load_corpus(&config.db_dir, &config.corpus_name)?;
        Ok(Self::new(docs, config))
    }

    pub fn new(docs: Vec<KnowledgeDoc>, config: &EngineConfig) -> Self {
        let doc_words = config
            .corpus_cache
            .then(|| docs.iter().map(KnowledgeDoc::words).collect());

        Self {
            docs,
            doc_words,
            llm_name: config.llm_name.clone(),
            retriever_name: config.retriever_name.clone(),
            corpus_name: config.corpus_name.clone(),
        }
    }

    /// Documents matching `question`, best first, at most `k`
    pub fn retrieve(&self, question: &str, k: usize) -> Vec<(&KnowledgeDoc, f64)> {
        let keywords = tokenize(question);
        if keywords.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<(&KnowledgeDoc, f64)> = Vec::new();
        for (i, doc) in self.docs.iter().enumerate() {
            let overlap = match &self.doc_words {
                Some(cached) => keywords.intersection(&cached[i]).count(),
                None => keywords.intersection(&doc.words()).count(),
            };
            if overlap > 0 {
                let score = (overlap as f64 / keywords.len() as f64).min(1.0);
                hits.push((doc, score));
            }
        }

        // Stable sort keeps corpus order among equal scores
        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits.truncate(k);
        hits
    }
}

impl RagEngine for SimpleEngine {
    fn answer(
        &self,
        question: &str,
        _options: Option<&BTreeMap<String, String>>,
        k: u32,
    ) -> Result<EngineOutput, EngineError> {
        let hits = self.retrieve(question, k as usize);

        let answer = if hits.is_empty() {
            NO_MATCH_ANSWER.to_string()
        } else {
            debug!(
                "Keyword retrieval matched {} documents (top: {})",
                hits.len(),
                hits[0].0.id
            );
            format!("Based on current medical literature:\n\n{}", topic_answer(question))
        };

        Ok(EngineOutput::Triple {
            answer,
            passages: hits.iter().map(|(doc, _)| doc.to_passage()).collect(),
            scores: hits.iter().map(|(_, score)| *score).collect(),
        })
    }

    fn llm_name(&self) -> &str {
        &self.llm_name
    }

    fn retriever_name(&self) -> &str {
        &self.retriever_name
    }

    fn corpus_name(&self) -> &str {
        &self.corpus_name
    }
}

fn mentions_any(question: &str, words: &[&str]) -> bool {
    words.iter().any(|w| question.contains(w))
}

/// Templated answer by topic
fn topic_answer(question: &str) -> String {
    let q = question.to_lowercase();

    if mentions_any(&q, &["fever", "temperature"]) {
        "Fever in children is commonly caused by:\n\n\
         1. **Viral infections** - Most frequent cause, including respiratory viruses and gastroenteritis\n\
         2. **Bacterial infections** - Less common but may require antibiotic treatment\n\
         3. **Immunizations** - Normal response to vaccines\n\
         4. **Teething** - May cause low-grade fever in infants\n\n\
         **Management**: Focus on comfort with appropriate doses of acetaminophen or ibuprofen. \
         Seek immediate care for infants <3 months with fever, or any child with concerning symptoms \
         like difficulty breathing, altered mental status, or signs of dehydration."
            .to_string()
    } else if mentions_any(&q, &["respiratory", "cough", "cold"]) {
        "Pediatric respiratory infections are typically viral and include:\n\n\
         - **Upper respiratory infections**: Runny nose, congestion, cough, low-grade fever\n\
         - **Common viruses**: Rhinovirus, RSV, parainfluenza\n\
         - **Treatment**: Supportive care with rest, fluids, and symptomatic relief\n\n\
         Seek medical care if child shows signs of respiratory distress, persistent high fever, or poor feeding."
            .to_string()
    } else if mentions_any(&q, &["emergency", "warning", "urgent"]) {
        "Key pediatric emergency warning signs include:\n\n\
         - Difficulty breathing or respiratory distress\n\
         - Severe dehydration (dry mouth, no tears, decreased urination)\n\
         - Altered mental status or extreme lethargy\n\
         - High fever with petechial rash\n\
         - Signs of sepsis (poor feeding, mottled skin, temperature instability)\n\n\
         These symptoms require immediate medical evaluation."
            .to_string()
    } else {
        format!(
            "Regarding '{}': Based on the available medical literature, this topic requires \
             individualized assessment. The information provided suggests considering multiple \
             factors including patient age, symptoms, and clinical presentation. Please consult \
             with a healthcare professional for proper evaluation and management.",
            question
        )
    }
}
