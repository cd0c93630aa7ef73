//! Core business logic for the comment service.
//!
//! Services are written against the store traits of `comment-db`, so they run
//! unchanged on Postgres and on the in-memory stores used in tests.

pub mod services;

pub use services::*;
