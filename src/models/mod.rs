//! Domain model module declarations.

pub mod envelope;
