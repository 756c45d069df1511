//! Remote API service implementations.

mod data;
mod issues;
mod projects;

pub use data::*;
pub use issues::*;
pub use projects::*;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped when an id is used as a path segment: everything except
/// ASCII alphanumerics and `-_.~`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Encodes an opaque id so it fits in a single path segment.
pub fn encode_id(id: &str) -> String {
    utf8_percent_encode(id, PATH_SEGMENT).to_string()
}
