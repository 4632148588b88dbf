//! Reliance analysis and reliance-ordered rule scheduling for existential rules

#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts
)]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_qualifications,
    unused_extern_crates,
    variant_size_differences
)]

pub mod error;
pub mod execution;
pub mod io;
pub mod model;
pub mod reliance;
