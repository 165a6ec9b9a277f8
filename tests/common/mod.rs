//! Common test infrastructure
//!
//! A scriptable in-process back-end plus a harness wiring it to a
//! [`MemorySheet`] and a dispatcher.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestHarness, DAY};
//!
//! #[tokio::test]
//! async fn test_new_movie() {
//!     let harness = TestHarness::new(&[&["Serenity", "MOVIE", "12345"]]);
//!     harness.movie.add_title(12345, "Serenity");
//!     harness.run(DAY).await;
//! }
//! ```

mod fake_backend;
mod harness;

// Public API - this is what tests import
pub use fake_backend::FakeBackend;
#[allow(unused_imports)]
pub use harness::{TestHarness, DAY, HOUR};
