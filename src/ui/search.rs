use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

pub const FILTER_FIELD: &str = "filter_choices";
pub const TEXT_FIELD: &str = "search_text";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFilter {
    #[default]
    ReportName,
    OwnerName,
    OwnerEmail,
    Tag,
}

impl SearchFilter {
    pub const ALL: [SearchFilter; 4] = [
        Self::ReportName,
        Self::OwnerName,
        Self::OwnerEmail,
        Self::Tag,
    ];

    /// Value the search endpoint expects in `filter_choices`.
    pub fn choice_value(&self) -> u8 {
        match self {
            Self::ReportName => 0,
            Self::OwnerName => 1,
            Self::OwnerEmail => 2,
            Self::Tag => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ReportName => "Report Name",
            Self::OwnerName => "Owner Name",
            Self::OwnerEmail => "Owner Email",
            Self::Tag => "Tag",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub filter: SearchFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub seq: u64,
    pub query: SearchQuery,
}

impl SearchRequest {
    pub fn form_fields(&self, csrf_field: &str, csrf_token: &str) -> Vec<(String, String)> {
        vec![
            (
                FILTER_FIELD.to_string(),
                self.query.filter.choice_value().to_string(),
            ),
            (TEXT_FIELD.to_string(), self.query.text.clone()),
            (csrf_field.to_string(), csrf_token.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestFailure {
    #[error("search transport failed: {0}")]
    Transport(String),
    #[error("search endpoint returned status {0}")]
    Status(u16),
}

pub type SearchOutcome = Result<String, RequestFailure>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    Failed(RequestFailure),
    /// A response for a superseded request; discarded unseen.
    Stale { seq: u64, latest: u64 },
}

/// Debounced incremental search with response sequencing.
///
/// Every issued request gets the next sequence number. Only the response to
/// the latest issued request may touch the results or the busy flag, so a slow
/// early response can never overwrite a later one.
#[derive(Debug, Clone)]
pub struct SearchController {
    debounce: Duration,
    pending: Option<(SearchQuery, Instant)>,
    latest_issued: u64,
    busy: bool,
    results: Option<String>,
    applied_seq: Option<u64>,
}

impl SearchController {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: None,
            latest_issued: 0,
            busy: false,
            results: None,
            applied_seq: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn results(&self) -> Option<&str> {
        self.results.as_deref()
    }

    #[cfg(test)]
    pub fn applied_seq(&self) -> Option<u64> {
        self.applied_seq
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn input_changed(&mut self, query: SearchQuery, now: Instant) -> Option<SearchRequest> {
        if self.debounce.is_zero() {
            self.pending = None;
            return Some(self.issue(query));
        }
        self.pending = Some((query, now + self.debounce));
        None
    }

    pub fn poll(&mut self, now: Instant) -> Option<SearchRequest> {
        let due = matches!(&self.pending, Some((_, deadline)) if *deadline <= now);
        if !due {
            return None;
        }
        let (query, _) = self.pending.take()?;
        Some(self.issue(query))
    }

    fn issue(&mut self, query: SearchQuery) -> SearchRequest {
        self.latest_issued += 1;
        self.busy = true;
        tracing::info!(
            seq = self.latest_issued,
            filter = query.filter.label(),
            "search issued"
        );
        SearchRequest {
            seq: self.latest_issued,
            query,
        }
    }

    pub fn resolve(&mut self, seq: u64, outcome: SearchOutcome) -> Resolution {
        if seq != self.latest_issued {
            tracing::debug!(seq, latest = self.latest_issued, "discarded stale search response");
            return Resolution::Stale {
                seq,
                latest: self.latest_issued,
            };
        }

        self.busy = false;
        match outcome {
            Ok(fragment) => {
                self.results = Some(fragment);
                self.applied_seq = Some(seq);
                tracing::info!(seq, "search results applied");
                Resolution::Applied
            }
            Err(failure) => {
                tracing::warn!(seq, %failure, "search request failed");
                Resolution::Failed(failure)
            }
        }
    }
}
