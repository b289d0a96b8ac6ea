//! Client-side helpers for consumers of the API: a typed HTTP client, form
//! checks, photo compression and a debounced search.

pub mod api;
pub mod compress;
pub mod forms;
pub mod search;

pub use api::{ApiClient, ClientError, PollutionDraft, SubmittedPollution};
pub use compress::{compress_photo, CompressOptions};
pub use search::{DebouncedSearch, SearchFilter, SearchState};
