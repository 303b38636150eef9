//! Claude Focus Protocol
//!
//! Shared types for the focus webhook server: session descriptors written by
//! the registration hook, Slack thread mappings, reverse-link config, and the
//! `claude-focus://` URL codec.

pub mod focus_url;
pub mod types;

pub use focus_url::{FocusAddress, FocusUrlError, ParsedFocusUrl, RemoteTmux};
pub use types::*;
