//! Parsing of reasoning-service replies.
//!
//! Replies are narrative text with a fenced JSON payload embedded in them;
//! `extractor` finds and parses the payload, `verdict` validates review replies.

pub mod extractor;
pub mod verdict;

pub use extractor::{extract_fenced_payload, extract_payload, fence_payload};
pub use verdict::{ACCEPT_TAG, ReviewVerdict, Verdict, parse_verdict};
