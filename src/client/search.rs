//! Debounced pollution search. Filter edits are coalesced, unchanged filters
//! are dropped, and a newer filter cancels whatever lookup is still running.

use std::time::Duration;

use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tracing::{debug, warn};

use super::api::{ApiClient, SubmittedPollution};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub q: String,
    /// Pollution type name; empty means any.
    pub kind: String,
}

impl SearchFilter {
    pub fn new(q: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum SearchState {
    #[default]
    Idle,
    Loading(SearchFilter),
    Ready(SearchFilter, Vec<SubmittedPollution>),
    Failed(SearchFilter, String),
}

pub struct DebouncedSearch {
    client: ApiClient,
    delay: Duration,
    last: Option<SearchFilter>,
    pending: Option<JoinHandle<()>>,
    tx: watch::Sender<SearchState>,
}

impl DebouncedSearch {
    pub fn new(client: ApiClient, delay: Duration) -> Self {
        let (tx, _) = watch::channel(SearchState::Idle);
        Self {
            client,
            delay,
            last: None,
            pending: None,
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.tx.subscribe()
    }

    /// Schedules a lookup for `filter`. Returns `false` when it equals the
    /// previous filter and nothing was scheduled.
    pub fn set_filter(&mut self, filter: SearchFilter) -> bool {
        if self.last.as_ref() == Some(&filter) {
            return false;
        }
        self.last = Some(filter.clone());
        self.schedule(filter);
        true
    }

    /// Re-runs the last filter even though it did not change, e.g. after a
    /// failed lookup or once a listed record was deleted. Returns `false`
    /// when no filter was ever set.
    pub fn refresh(&mut self) -> bool {
        match self.last.clone() {
            Some(filter) => {
                self.schedule(filter);
                true
            }
            None => false,
        }
    }

    fn schedule(&mut self, filter: SearchFilter) {
        if let Some(prev) = self.pending.take() {
            prev.abort();
        }

        let client = self.client.clone();
        let tx = self.tx.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            sleep(delay).await;
            debug!(q = %filter.q, kind = %filter.kind, "running search");
            tx.send_replace(SearchState::Loading(filter.clone()));

            let state = match client
                .list_pollutions(Some(&filter.q), Some(&filter.kind))
                .await
            {
                Ok(items) => SearchState::Ready(filter, items),
                Err(e) => {
                    warn!(error = %e, "search failed");
                    SearchState::Failed(filter, e.to_string())
                }
            };
            tx.send_replace(state);
        }));
    }
}

impl Drop for DebouncedSearch {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
