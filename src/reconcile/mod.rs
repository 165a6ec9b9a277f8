//! Reconciliation of the request queue against the back-ends.
//!
//! One run reads the queue, and for every non-terminal row verifies the
//! catalog id, makes sure a track exists and writes back how far along it is.

mod dispatcher;
mod identity;
mod progress;
mod staleness;
mod staleness_store;

pub use dispatcher::{BackendSetup, Outcome, RequestDispatcher, RunMode, RunReport};
pub use identity::{normalize, titles_match, IdentityCheck, IdentityResolver};
pub use progress::{format_bytes, format_percent, Progress, ProgressEngine};
pub use staleness::{
    AvailabilityVerdict, StalenessConfig, StalenessRecord, StalenessThrottle, TrackKey,
};
pub use staleness_store::{InMemoryStalenessStore, SqliteStalenessStore, StalenessStore};
