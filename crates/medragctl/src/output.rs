//! Output formatting - ASCII-only terminal output

use medrag_shared::evidence::UNKNOWN_SOURCE;
use medrag_shared::{HealthResponse, QueryResponse};
use owo_colors::OwoColorize;
use std::fmt::Write;

const SEPARATOR: &str = "------------------------------------------------------------";

/// Confidence label and its color band
fn confidence_label(confidence: f64) -> String {
    let text = format!("{:.3}", confidence);
    if confidence >= 0.8 {
        format!("{} {}", "[HIGH]".bright_green(), text.bright_green())
    } else if confidence >= 0.5 {
        format!("{} {}", "[MEDIUM]".yellow(), text.yellow())
    } else {
        format!("{} {}", "[LOW]".bright_red(), text.bright_red())
    }
}

pub fn render_health(health: &HealthResponse) -> String {
    let status = if health.is_healthy() {
        format!("{}", "[OK] healthy".bright_green())
    } else {
        format!("{}", "[DOWN] unhealthy".bright_red())
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", status);
    let _ = writeln!(out, "  engine initialized: {}", health.medrag_initialized);
    let _ = writeln!(out, "  proofpath enabled:  {}", health.proofpath_enabled);
    let _ = writeln!(out, "  timestamp:          {}", health.timestamp);
    out
}

pub fn render_response(response: &QueryResponse) -> String {
    let mut out = String::new();

    if response.fallback_used {
        let _ = writeln!(
            out,
            "{}",
            "[FALLBACK] engine failed; placeholder content below".bright_red()
        );
    }

    let _ = writeln!(out, "{}", response.answer);
    let _ = writeln!(out, "{}", SEPARATOR.dimmed());
    let _ = writeln!(
        out,
        "model: {}  latency: {}ms  contexts: {}",
        response.model_info,
        response.latency_ms,
        response.contexts.len()
    );

    if let Some(confidence) = response.answer_confidence {
        let _ = writeln!(out, "confidence: {}", confidence_label(confidence));
    }

    if !response.citations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "[CITATIONS]");
        for citation in &response.citations {
            let _ = writeln!(out, "  * {}", citation.cyan());
        }
    }

    if let Some(trail) = &response.evidence_trail {
        let _ = writeln!(out);
        let _ = writeln!(out, "[EVIDENCE]");
        for evidence in trail {
            let _ = writeln!(
                out,
                "  {:<11} w={:.3} sim={:.3}  {} ({})",
                evidence.id,
                evidence.weight,
                evidence.similarity,
                evidence.title.as_deref().unwrap_or(UNKNOWN_SOURCE),
                evidence.source_id
            );
        }
    }

    if let Some(note) = &response.counterfactual_note {
        let _ = writeln!(out);
        let _ = writeln!(out, "[COUNTERFACTUAL] {}", note.yellow());
    }

    if let Some(meta) = &response.proofpath_meta {
        for warning in &meta.warnings {
            let _ = writeln!(out, "[NOTE] {}", warning.yellow());
        }
    }

    out
}
