//! Approximate matching between contradictions and ledger promises.

use contracts::ContradictionFinding;

/// Decides whether a contradiction refers to a given promise. The default
/// implementation is lexical, not semantic; it lives behind this trait so
/// an embedding-based matcher can replace it without touching the ledger's
/// state transitions.
pub trait ContradictionMatcher {
    fn matches(&self, promise_text: &str, finding: &ContradictionFinding) -> bool;
}

/// Lexical matcher: a promise is referenced when its full text appears in
/// the contradiction's description or contradicting-action field, or when
/// at least half of its significant words (longer than three characters)
/// do. Promises shorter than three words are only matched verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordOverlapMatcher;

impl ContradictionMatcher for WordOverlapMatcher {
    fn matches(&self, promise_text: &str, finding: &ContradictionFinding) -> bool {
        let promise = promise_text.to_lowercase();
        let description = finding.description.to_lowercase();
        let action = finding
            .contradicting_action
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();

        description.contains(&promise)
            || action.contains(&promise)
            || significant_overlap(&promise, &description)
            || significant_overlap(&promise, &action)
    }
}

fn significant_overlap(promise: &str, text: &str) -> bool {
    if promise.trim().is_empty() || text.trim().is_empty() {
        return false;
    }

    let words: Vec<&str> = promise.split_whitespace().collect();
    if words.len() < 3 {
        return false;
    }

    let significant: Vec<&str> = words.iter().copied().filter(|w| w.len() > 3).collect();
    if significant.is_empty() {
        return false;
    }

    let matched = significant.iter().filter(|w| text.contains(**w)).count();
    (matched as f64) >= (significant.len() as f64) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Severity;

    fn finding(description: &str, action: Option<&str>) -> ContradictionFinding {
        ContradictionFinding {
            description: description.to_string(),
            speech_quote: None,
            contradicting_action: action.map(str::to_string),
            severity: Severity::High,
        }
    }

    #[test]
    fn matches_verbatim_promise_in_description() {
        let matcher = WordOverlapMatcher;
        assert!(matcher.matches(
            "keep the refinery open",
            &finding("the mayor said to keep the refinery open, then demolished it", None),
        ));
    }

    #[test]
    fn matches_on_significant_word_overlap() {
        let matcher = WordOverlapMatcher;
        assert!(matcher.matches(
            "protect the northern forest",
            &finding("speech praises growth", Some("cleared protect-ed northern forest tiles")),
        ));
    }

    #[test]
    fn short_promises_only_match_verbatim() {
        let matcher = WordOverlapMatcher;
        assert!(!matcher.matches("more jobs", &finding("jobs talk went nowhere", None)));
        assert!(matcher.matches("more jobs", &finding("promised more jobs, delivered none", None)));
    }

    #[test]
    fn unrelated_texts_do_not_match() {
        let matcher = WordOverlapMatcher;
        assert!(!matcher.matches(
            "build a research center by turn four",
            &finding("praised the weather", Some("planted a forest")),
        ));
    }
}
