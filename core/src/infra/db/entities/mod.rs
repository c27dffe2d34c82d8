//! Database entities

pub mod pending_mutation;
