//! SSMI command tables.
//!
//! `request` holds the commands a client sends, `response` the commands a
//! gateway sends back. Each table produces the registry descriptors plus a
//! typed struct per command; see [`crate::codec::TypedCommand`].

pub mod request;
pub mod response;

/// Field defaults merged underneath caller-supplied values by
/// [`crate::codec::Command::build`].
pub type Defaults = &'static [(&'static str, &'static str)];
