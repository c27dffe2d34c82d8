//! Test helper modules for integration tests

#![allow(dead_code)]

pub mod fake_transport;
pub mod harness;

pub use fake_transport::*;
pub use harness::*;
