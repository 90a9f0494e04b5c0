use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Lookup contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SummaryError {
    #[error("no article found for '{0}'")]
    NotFound(String),
    #[error("summary lookup is disabled")]
    Unavailable,
    #[error("summary request failed: {0}")]
    Http(String),
}

/// Resolves a place name to a few sentences of descriptive text.
pub trait SummaryLookup {
    fn summary(&self, place: &str, sentences: usize) -> Result<String, SummaryError>;
}

/// Keep the first `n` sentences of `text`. A sentence ends at `.`, `!` or
/// `?` followed by whitespace or the end of the text.
pub fn first_sentences(text: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let mut count = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                count += 1;
                if count == n {
                    return text[..i + c.len_utf8()].to_string();
                }
            }
        }
    }
    text.trim_end().to_string()
}

// ---------------------------------------------------------------------------
// Wikipedia
// ---------------------------------------------------------------------------

const WIKIPEDIA_SUMMARY_ENDPOINT: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";
const USER_AGENT: &str = concat!("carlot/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    extract: String,
}

/// Looks summaries up through the Wikipedia REST API (blocking).
pub struct WikipediaLookup {
    client: Client,
    endpoint: String,
}

impl WikipediaLookup {
    pub fn new(timeout: Duration) -> Result<Self, SummaryError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SummaryError::Http(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: WIKIPEDIA_SUMMARY_ENDPOINT.to_string(),
        })
    }
}

impl SummaryLookup for WikipediaLookup {
    fn summary(&self, place: &str, sentences: usize) -> Result<String, SummaryError> {
        let url = format!("{}/{}", self.endpoint, place.trim().replace(' ', "_"));
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| SummaryError::Http(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(SummaryError::NotFound(place.to_string())),
            status if !status.is_success() => return Err(SummaryError::Http(status.to_string())),
            _ => {}
        }

        let page: PageSummary = response
            .json()
            .map_err(|e| SummaryError::Http(e.to_string()))?;
        if page.kind == "disambiguation" || page.extract.trim().is_empty() {
            return Err(SummaryError::NotFound(place.to_string()));
        }
        Ok(first_sentences(&page.extract, sentences))
    }
}

// ---------------------------------------------------------------------------
// Offline / cached
// ---------------------------------------------------------------------------

/// Used when lookups are disabled in the configuration.
pub struct OfflineLookup;

impl SummaryLookup for OfflineLookup {
    fn summary(&self, _place: &str, _sentences: usize) -> Result<String, SummaryError> {
        Err(SummaryError::Unavailable)
    }
}

/// Remembers every answer (including failures) for the session, so each
/// place is requested at most once.
pub struct CachedLookup<L> {
    inner: L,
    cache: RefCell<HashMap<(String, usize), Result<String, SummaryError>>>,
}

impl<L: SummaryLookup> CachedLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl<L: SummaryLookup> SummaryLookup for CachedLookup<L> {
    fn summary(&self, place: &str, sentences: usize) -> Result<String, SummaryError> {
        let key = (place.to_string(), sentences);
        if let Some(hit) = self.cache.borrow().get(&key) {
            return hit.clone();
        }
        let result = self.inner.summary(place, sentences);
        if let Err(e) = &result {
            log::warn!("Summary lookup for '{place}' failed: {e}");
        }
        self.cache.borrow_mut().insert(key, result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct Counting {
        calls: Cell<usize>,
    }

    impl SummaryLookup for Counting {
        fn summary(&self, place: &str, _sentences: usize) -> Result<String, SummaryError> {
            self.calls.set(self.calls.get() + 1);
            if place == "Atlantis" {
                Err(SummaryError::NotFound(place.to_string()))
            } else {
                Ok(format!("{place} is a place."))
            }
        }
    }

    #[test]
    fn truncates_to_sentence_count() {
        let text = "Massachusetts is a state. It is in New England. Boston is its capital.";
        assert_eq!(first_sentences(text, 1), "Massachusetts is a state.");
        assert_eq!(
            first_sentences(text, 2),
            "Massachusetts is a state. It is in New England."
        );
        assert_eq!(first_sentences(text, 9), text);
        assert_eq!(first_sentences("Pop. 6.9 million people live here. Yes.", 1), "Pop.");
        assert_eq!(first_sentences("No terminator", 1), "No terminator");
    }

    #[test]
    fn cache_answers_repeat_lookups() {
        let lookup = CachedLookup::new(Counting { calls: Cell::new(0) });
        assert_eq!(lookup.summary("Ohio", 2).unwrap(), "Ohio is a place.");
        assert_eq!(lookup.summary("Ohio", 2).unwrap(), "Ohio is a place.");
        assert!(lookup.summary("Atlantis", 2).is_err());
        assert!(lookup.summary("Atlantis", 2).is_err());
        assert_eq!(lookup.inner.calls.get(), 2);
    }

    #[test]
    fn offline_lookup_is_unavailable() {
        assert_eq!(OfflineLookup.summary("Ohio", 3), Err(SummaryError::Unavailable));
    }
}
