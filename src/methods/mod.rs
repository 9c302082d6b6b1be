//! Method tables and method symbols.
//!
//! Methods hang off the named base type of their receiver. Registration
//! checks receivers, field/method name clashes and redeclarations, and
//! gives every method a linker-level symbol that is unique across packages.

pub mod methods;

#[cfg(test)]
mod tests;
