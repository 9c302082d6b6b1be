//! Error types and error handling for the binder.
//!
//! This module defines the diagnostics produced while declaring names,
//! building types, registering methods and checking write barriers. It
//! includes:
//!
//! - Error structures with source position information
//! - Specific error variants for every user-facing diagnostic
//! - The non-fatal diagnostic sink the session reports into

pub mod errors;
