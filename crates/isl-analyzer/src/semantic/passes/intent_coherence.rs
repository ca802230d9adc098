//! Intent coherence pass (H06xx).
//!
//! Keyword overlap between what a behavior says it does (name and
//! description) and what its postconditions talk about.
//! - H0600: Low overlap between intent and effects

use std::collections::BTreeSet;

use isl_ast::{Behavior, Domain, Expr, LiteralValue};

use crate::semantic::{PassContext, PassError, SemanticPass};
use crate::Diagnostic;

pub const ID: &str = "intent-coherence";

/// Overlap ratio below which a hint is produced
pub const MIN_OVERLAP: f64 = 0.25;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "into", "that", "this", "when", "then", "are", "was",
    "its", "has", "have", "not", "but", "all", "any", "new", "given", "should", "will", "must",
];

pub fn intent_coherence_pass() -> SemanticPass {
    SemanticPass::new(ID, "Intent Coherence", analyze)
        .with_description("Compares a behavior's stated intent with its postconditions")
        .with_priority(70)
}

fn analyze(domain: &Domain, _ctx: &PassContext) -> Result<Vec<Diagnostic>, PassError> {
    let mut diagnostics = Vec::new();

    for behavior in &domain.behaviors {
        if behavior.postconditions.is_empty() {
            continue;
        }
        let intent = intent_words(behavior);
        if intent.is_empty() {
            continue;
        }
        let effects = effect_words(behavior);
        let shared = intent.intersection(&effects).count();
        let overlap = shared as f64 / intent.len() as f64;

        if overlap < MIN_OVERLAP {
            let intent: Vec<_> = intent.iter().map(String::as_str).collect();
            diagnostics.push(
                Diagnostic::hint(
                    format!(
                        "Postconditions of '{}' say little about its intent ({}); keyword overlap {:.0}%",
                        behavior.name.name,
                        intent.join(", "),
                        overlap * 100.0
                    ),
                    behavior.name.span,
                )
                .with_code("H0600"),
            );
        }
    }

    Ok(diagnostics)
}

fn intent_words(behavior: &Behavior) -> BTreeSet<String> {
    let mut words = BTreeSet::new();
    add_words(&behavior.name.name, &mut words);
    if let Some(description) = &behavior.description {
        add_words(description, &mut words);
    }
    words
}

fn effect_words(behavior: &Behavior) -> BTreeSet<String> {
    let mut words = BTreeSet::new();
    for predicate in &behavior.postconditions {
        predicate.walk(&mut |node| match node {
            Expr::Identifier(ident) => add_words(&ident.name, &mut words),
            Expr::FieldAccess(access) => add_words(&access.field.name, &mut words),
            Expr::Literal(lit) => {
                if let LiteralValue::String(text) = &lit.value {
                    add_words(text, &mut words);
                }
            }
            Expr::ResultRef(_) => {
                if let Some(output) = &behavior.output {
                    add_words(output.name(), &mut words);
                }
            }
            // Call names are reached through their callee expression
            Expr::Binary(_) | Expr::Unary(_) | Expr::Call(_) => {}
        });
    }
    for effect in &behavior.side_effects {
        add_words(&effect.target.name, &mut words);
    }
    words
}

/// Split on case and punctuation boundaries and normalize each word
fn add_words(text: &str, out: &mut BTreeSet<String>) {
    for word in split_words(text) {
        if let Some(word) = normalize(&word) {
            out.insert(word);
        }
    }
}

fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in text.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn normalize(word: &str) -> Option<String> {
    let mut word = word.to_lowercase();
    if word.chars().count() < 3 || STOP_WORDS.contains(&word.as_str()) {
        return None;
    }
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word.pop();
    }
    Some(word)
}
