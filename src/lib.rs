#![allow(clippy::module_inception)]

//! Declaration and binding core of the compiler front end.
//!
//! The crate owns the lexical symbol table, turns parsed field lists into
//! composite type descriptors, registers methods against their receiver types
//! and, once every function has been lowered, checks that functions forbidden
//! from needing a write barrier never reach one through the call graph.

use std::{fmt::Display, sync::Arc};

#[macro_use]
pub mod macros;

pub mod binder;
pub mod config;
pub mod errors;
pub mod methods;
pub mod setup;
pub mod symbols;
pub mod types;
pub mod writebarrier;

extern crate regex;

/// A source position: file, 1-based line and column.
///
/// Line `0` means the position is unknown (e.g. a declaration that came
/// from an import rather than from source).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub file: Arc<str>,
    pub line: u32,
    pub col: u32,
}

impl Position {
    pub fn new(file: &str, line: u32, col: u32) -> Self {
        Position {
            file: Arc::from(file),
            line,
            col,
        }
    }

    pub fn null() -> Self {
        Position {
            file: Arc::from("<null>"),
            line: 0,
            col: 0,
        }
    }

    pub fn is_known(&self) -> bool {
        self.line != 0
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::null()
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_known() {
            return write!(f, "<unknown line number>");
        }
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::Position;

    #[test]
    fn test_position_display() {
        let pos = Position::new("main.go", 12, 4);
        assert_eq!(pos.to_string(), "main.go:12:4");
        assert!(pos.is_known());

        let pos = Position::null();
        assert!(!pos.is_known());
        assert_eq!(pos.to_string(), "<unknown line number>");
    }
}
