//! Notification fingerprint for duplicate suppression
//!
//! A fingerprint summarizes one cycle's reportable call set:
//! 1. Build one `"<id>:<field>"` entry per classified call
//!    (long calls use their duration in seconds, in-progress calls their status)
//! 2. Sort the entries so fetch order never matters
//! 3. Join with `|` and hash with SHA-256 (lowercase hex)
//!
//! Changing any of these steps changes every stored fingerprint, so the
//! algorithm is versioned through [`FINGERPRINT_VERSION`].

use sha2::{Digest, Sha256};

use crate::calls::ClassifiedCall;

/// Version of the entry format / join / hash combination above
pub const FINGERPRINT_VERSION: u32 = 1;

/// Separator between sorted entries
const ENTRY_SEPARATOR: &str = "|";

/// Build the sorted fingerprint entries for a classified call set
pub fn fingerprint_entries(
    long_calls: &[ClassifiedCall],
    in_progress_calls: &[ClassifiedCall],
) -> Vec<String> {
    let mut entries: Vec<String> = long_calls
        .iter()
        .chain(in_progress_calls.iter())
        .map(|call| format!("{}:{}", call.id, call.distinguishing_field()))
        .collect();
    entries.sort();
    entries
}

/// Generate the fingerprint of a classified call set
///
/// - Same set of calls in any order → same fingerprint
/// - Same call with a new duration or status → different fingerprint
pub fn generate_fingerprint(
    long_calls: &[ClassifiedCall],
    in_progress_calls: &[ClassifiedCall],
) -> String {
    let entries = fingerprint_entries(long_calls, in_progress_calls);
    hash_content(&entries.join(ENTRY_SEPARATOR))
}

/// SHA-256 hex digest of the content
pub fn hash_content(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}
