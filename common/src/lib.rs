//! Shared building blocks for the block library bridge.
//!
//! Every error type in the workspace records where it was raised through
//! [`ErrorLocation`], captured with `#[track_caller]` at the `?` site.

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
