//! Request Reconciler Library
//!
//! Keeps a human-edited queue of media requests in sync with a series
//! back-end (Sonarr) and a movie back-end (Radarr).

pub mod backend;
pub mod config;
pub mod reconcile;
pub mod requests;

// Re-export commonly used types for convenience
pub use backend::{AcquisitionProfile, MediaBackend, RadarrClient, SonarrClient};
pub use reconcile::{RequestDispatcher, RunMode, RunReport};
pub use requests::{JsonFileSheet, MemorySheet, RequestSheet};
