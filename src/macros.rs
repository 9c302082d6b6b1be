//! Utility macros for the compiler.
//!
//! This module defines helper macros used throughout the binder:
//!
//! - `FATAL!` - Aborts on an internal invariant violation
//! - `MK_ID!` - Declares a typed arena index
//!
//! User errors never go through these macros; they are recorded as
//! diagnostics and compilation carries on.

/// Aborts compilation on an internal invariant violation.
///
/// An internal invariant violation means an upstream phase handed the binder
/// something malformed, so there is nothing sensible to recover into. The
/// message is logged before unwinding so it also lands in the trace output.
///
/// # Example
///
/// ```ignore
/// if self.marks.is_empty() {
///     FATAL!("pop_scope: no open scope");
/// }
/// ```
#[macro_export]
macro_rules! FATAL {
    ($($arg:tt)*) => {{
        let message = format!($($arg)*);
        tracing::error!("internal compiler error: {}", message);
        panic!("internal compiler error: {}", message)
    }};
}

/// Defines a `u32` newtype used as a stable index into one of the binder's
/// arenas.
///
/// # Example
///
/// ```ignore
/// MK_ID!(DeclId);
/// let id = DeclId::from_index(decls.len());
/// let decl = &decls[id.index()];
/// ```
#[macro_export]
macro_rules! MK_ID {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn from_index(index: usize) -> Self {
                debug_assert!(index < (u32::MAX as usize));
                Self(index as u32)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}
