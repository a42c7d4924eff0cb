//! Query Classifier
//!
//! Decides whether a user message needs external research before the
//! reply is synthesized. The policy is a case-insensitive substring
//! match against a fixed set of finance domain terms: a deliberately
//! coarse proxy for intent. On-topic queries that miss every keyword
//! (false negatives) and keywords used off-topic (false positives) are
//! accepted trade-offs of the design, not bugs.
//!
//! The classifier is a total pure function: deterministic, no side
//! effects, no external calls, and it never fails.

/// Domain terms that trigger the research path
const RESEARCH_KEYWORDS: [&str; 6] = ["stock", "bank", "market", "finance", "invest", "trading"];

/// Returns true when the message warrants external research.
pub fn needs_research(text: &str) -> bool {
    let lowered = text.to_lowercase();
    RESEARCH_KEYWORDS.iter().any(|k| lowered.contains(k))
}
