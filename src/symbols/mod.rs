//! Packages, symbols and the block-structured scope stack.
//!
//! A symbol is the process-wide identity of a (package, name) pair. Its
//! current binding changes destructively as scopes open and close; the scope
//! stack keeps an undo log so closing a scope restores every binding exactly.

pub mod symbols;
