//! Completion heuristics.
//!
//! Both tiers are plain substring checks over the lowercased response. The
//! loose tier matches bare words like "done" anywhere in the text, so prose
//! such as "the build is done, next I will..." ends a run. That behavior is
//! kept as is; swap in a different [`CompletionClassifier`] to change it.

/// Decides whether a response ends the run.
pub trait CompletionClassifier: Send + Sync {
    /// Ends the run unconditionally, even if the text also holds a tool call.
    fn is_final(&self, text: &str) -> bool;

    /// Consulted only when the response carried no usable tool call.
    fn looks_conclusive(&self, text: &str) -> bool;
}

/// Phrases that end a run no matter what else the response contains.
pub const STRICT_PHRASES: &[&str] = &[
    "task complete",
    "task is complete",
    "finished the task",
    "successfully completed",
    "all done",
];

/// Fallback phrases for answers without a tool call.
pub const LOOSE_PHRASES: &[&str] = &["complete", "done", "finished", "successfully"];

/// Fixed-phrase classifier.
#[derive(Debug, Clone)]
pub struct PhraseClassifier {
    strict: Vec<String>,
    loose: Vec<String>,
}

impl PhraseClassifier {
    /// Build from custom phrase sets. Phrases are lowercased.
    pub fn new(strict: Vec<String>, loose: Vec<String>) -> Self {
        let lower = |v: Vec<String>| v.into_iter().map(|p| p.to_lowercase()).collect();
        Self {
            strict: lower(strict),
            loose: lower(loose),
        }
    }

    fn contains_any(phrases: &[String], text: &str) -> bool {
        let lowered = text.to_lowercase();
        phrases.iter().any(|p| lowered.contains(p.as_str()))
    }
}

impl Default for PhraseClassifier {
    fn default() -> Self {
        Self::new(
            STRICT_PHRASES.iter().map(|s| s.to_string()).collect(),
            LOOSE_PHRASES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl CompletionClassifier for PhraseClassifier {
    fn is_final(&self, text: &str) -> bool {
        Self::contains_any(&self.strict, text)
    }

    fn looks_conclusive(&self, text: &str) -> bool {
        Self::contains_any(&self.loose, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_tier_matches_case_insensitively() {
        let c = PhraseClassifier::default();
        assert!(c.is_final("Task complete. All files updated."));
        assert!(c.is_final("I have FINISHED THE TASK"));
        assert!(c.is_final("Everything was successfully completed"));
        assert!(!c.is_final("Let me read the file first."));
    }

    #[test]
    fn strict_tier_ignores_tool_markers() {
        let c = PhraseClassifier::default();
        let text = r#"All done! <tool_call>{"tool":"read_file","arguments":{"path":"a"}}</tool_call>"#;
        assert!(c.is_final(text));
    }

    #[test]
    fn loose_tier_matches_bare_words() {
        let c = PhraseClassifier::default();
        assert!(c.looks_conclusive("The refactor is done."));
        assert!(c.looks_conclusive("Finished."));
        assert!(!c.looks_conclusive("Which file should I open?"));
    }

    #[test]
    fn loose_tier_false_triggers_inside_prose() {
        let c = PhraseClassifier::default();
        // "done" inside an unrelated explanation still counts
        assert!(c.looks_conclusive("Once the build is done you can run the binary."));
        // and so does "complete" inside "incomplete"
        assert!(c.looks_conclusive("The docs are incomplete."));
    }

    #[test]
    fn custom_phrases_are_lowercased() {
        let c = PhraseClassifier::new(vec!["SHIP IT".into()], vec![]);
        assert!(c.is_final("ok, ship it"));
        assert!(!c.looks_conclusive("done"));
    }
}
