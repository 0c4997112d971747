use std::sync::Arc;

use log::debug;

use crate::error::ConfigError;
use crate::mail_reader::message::MessageDetail;
use crate::settings::environment::{process_env, required, KEYWORDS};

/// Lowercased, trimmed keywords in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    /// Parses a comma-separated list. Every entry is kept, including ones that
    /// are empty after trimming; an empty keyword is a substring of anything.
    pub fn parse(raw: &str) -> Self {
        let keywords = raw
            .split(',')
            .map(|keyword| keyword.trim().to_lowercase())
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// True when an empty entry (`a,,b` or a trailing comma) makes every message match.
    pub fn matches_everything(&self) -> bool {
        self.keywords.iter().any(String::is_empty)
    }

    /// True when some keyword occurs in the snippet or the subject, ignoring case.
    pub fn matches(&self, snippet: &str, subject: &str) -> bool {
        let snippet = snippet.to_lowercase();
        let subject = subject.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| snippet.contains(keyword.as_str()) || subject.contains(keyword.as_str()))
    }

    pub fn matches_message(&self, message: &MessageDetail) -> bool {
        let result = self.matches(&message.snippet, &message.subject);
        let sanitized_subject: String = message
            .subject
            .chars()
            .take(50)
            .filter(|c| *c != '\r' && *c != '\n')
            .collect();
        debug!(
            "Message {} subject {:?} keywords {:?} result {}",
            message.id, sanitized_subject, self.keywords, result
        );
        result
    }
}

/// Variable lookup used by [`KeywordSource::Environment`].
pub type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Where the keyword set comes from at the start of each cycle.
#[derive(Clone)]
pub enum KeywordSource {
    Fixed(KeywordSet),
    /// Re-read from `KEYWORDS` through the lookup every cycle.
    Environment(Lookup),
}

impl KeywordSource {
    /// Reads `KEYWORDS` from the process environment.
    pub fn environment() -> Self {
        KeywordSource::Environment(Arc::new(process_env))
    }

    pub fn load(&self) -> Result<KeywordSet, ConfigError> {
        match self {
            KeywordSource::Fixed(set) => Ok(set.clone()),
            KeywordSource::Environment(lookup) => {
                required(&|name: &str| lookup(name), KEYWORDS).map(|raw| KeywordSet::parse(&raw))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_lowercases() {
        let set = KeywordSet::parse(" Invoice ,URGENT,  asap");
        assert_eq!(set.keywords(), ["invoice", "urgent", "asap"]);
    }

    #[test]
    fn parse_keeps_empty_entries() {
        assert_eq!(KeywordSet::parse("a,, ,b").keywords(), ["a", "", "", "b"]);
        assert_eq!(KeywordSet::parse("invoice,").keywords(), ["invoice", ""]);
        assert!(!KeywordSet::parse("invoice").matches_everything());
    }

    #[test]
    fn trailing_comma_matches_every_message() {
        let set = KeywordSet::parse("invoice,");
        assert!(set.matches_everything());
        assert!(set.matches("hello", ""));
        assert!(set.matches("", ""));
    }

    #[test]
    fn empty_set_matches_nothing() {
        assert!(!KeywordSet::default().matches("anything", "at all"));
    }

    #[test]
    fn matches_snippet_or_subject_ignoring_case() {
        let set = KeywordSet::parse("invoice");
        assert!(set.matches("Your INVOICE #123 is ready", ""));
        assert!(set.matches("", "Re: Invoice overdue"));
        assert!(!set.matches("receipt attached", "thanks"));
    }

    #[test]
    fn matches_substrings_not_words() {
        let set = KeywordSet::parse("pay");
        assert!(set.matches("repayment schedule", ""));
    }

    #[test]
    fn any_keyword_is_enough() {
        let set = KeywordSet::parse("urgent,asap");
        assert!(set.matches("reply asap please", ""));
        assert!(!set.matches("weekly newsletter", "digest"));
    }

    #[test]
    fn message_without_subject_matches_only_through_snippet() {
        let set = KeywordSet::parse("invoice");
        let hit = MessageDetail::new("m1", "Your INVOICE #123 is ready", None);
        let miss = MessageDetail::new("m2", "hello there", None);
        assert!(set.matches_message(&hit));
        assert!(!set.matches_message(&miss));
    }

    #[test]
    fn fixed_source_returns_its_set() {
        let source = KeywordSource::Fixed(KeywordSet::parse("a,b"));
        assert_eq!(source.load().unwrap().keywords(), ["a", "b"]);
    }

    #[test]
    fn environment_source_reads_through_its_lookup() {
        let lookup: Lookup =
            Arc::new(|name: &str| (name == KEYWORDS).then(|| " Invoice,ASAP".to_string()));
        let source = KeywordSource::Environment(lookup);
        assert_eq!(source.load().unwrap().keywords(), ["invoice", "asap"]);
    }

    #[test]
    fn environment_source_without_variable_fails() {
        let source = KeywordSource::Environment(Arc::new(|_: &str| None));
        assert!(matches!(source.load(), Err(ConfigError::MissingEnv(name)) if name == KEYWORDS));
    }
}
