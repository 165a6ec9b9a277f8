//! Identity validation: does the catalog id belong to the requested title?

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::backend::MediaBackend;

lazy_static! {
    static ref NON_ALPHANUMERIC: Regex = Regex::new(r"[^\p{L}\p{N}]+").unwrap();
}

/// Upper-case, turn every non letter/digit into a space, collapse runs of
/// whitespace.
pub fn normalize(title: &str) -> String {
    let upper = title.to_uppercase();
    NON_ALPHANUMERIC
        .replace_all(&upper, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Exact match after normalization, or either title contained in the other.
/// An empty title never matches.
pub fn titles_match(requested: &str, canonical: &str) -> bool {
    let a = normalize(requested);
    let b = normalize(canonical);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}

/// Result of checking a request's id against its title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityCheck {
    Verified { canonical_title: String },
    /// `found` is None when the catalog had no title for the id.
    Mismatch { found: Option<String> },
}

/// Resolves canonical titles through the back-end lookup of the request's
/// kind and gates acquisition on a match.
pub struct IdentityResolver;

impl IdentityResolver {
    pub async fn verify(
        backend: &dyn MediaBackend,
        external_id: u64,
        requested_title: &str,
    ) -> IdentityCheck {
        let kind = backend.kind();
        let canonical = match backend.lookup_canonical_title(external_id).await {
            Ok(title) => title,
            Err(e) => {
                warn!(
                    "{}: lookup of {} {} failed: {:#}",
                    kind.display_name(),
                    kind.id_label(),
                    external_id,
                    e
                );
                None
            }
        };

        match canonical {
            Some(title) if titles_match(requested_title, &title) => {
                debug!(
                    "{} {} verified as '{}'",
                    kind.id_label(),
                    external_id,
                    title
                );
                IdentityCheck::Verified {
                    canonical_title: title,
                }
            }
            found => IdentityCheck::Mismatch { found },
        }
    }
}
