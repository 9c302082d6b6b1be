//! Scope and symbol binding.
//!
//! This module owns the compilation session state the front end threads
//! through declaration processing:
//!
//! - Declaration nodes and functions, addressed by stable ids
//! - Declaring names into the current block, with redeclaration checks
//! - Resolving identifiers, including closure capture across functions
//! - Entering and leaving function headers and bodies
//!
//! The session is a single-threaded object; only method-symbol naming and
//! call recording are designed to be reached from concurrent back-end
//! workers.

pub mod binder;
pub mod decl;
pub mod declare;
pub mod func;
pub mod resolve;
