//! Type descriptors and the composite type builder.
//!
//! Types live in an arena addressed by [`types::TypeId`] so struct,
//! interface and function descriptors keep a stable identity for the rest of
//! compilation. The builder turns parsed field lists into those descriptors.

pub mod builder;
pub mod types;
