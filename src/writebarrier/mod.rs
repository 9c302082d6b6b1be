//! The write-barrier recursion check.
//!
//! Functions marked `NOWRITEBARRIERREC` must not need a garbage collector
//! write barrier, and neither may anything they call. The checker collects
//! call edges from two places: a pre-pass over calls made through the
//! runtime's alternate-stack wrapper, and the calls the back end reports
//! while lowering each function. A breadth-first walk from the marked
//! functions then reports every violation together with the call chain
//! that led to it.

pub mod checker;

#[cfg(test)]
mod tests;
