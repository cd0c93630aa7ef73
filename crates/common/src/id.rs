//! ID generation utilities.

use std::sync::{LazyLock, Mutex, PoisonError};

use crate::error::{AppError, AppResult};
use ulid::{Generator, Ulid};

/// Shared by every [`IdGenerator`] so ordering holds process-wide.
static MONOTONIC: LazyLock<Mutex<Generator>> = LazyLock::new(|| Mutex::new(Generator::new()));

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// IDs from one process are strictly increasing, even within the same
    /// millisecond, so ID order is a tie-breaker for equal `created_at`
    /// values.
    #[must_use]
    pub fn generate(&self) -> String {
        let next = MONOTONIC
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate();
        // Overflow of the random part within one millisecond
        next.unwrap_or_else(|_| Ulid::new()).to_string().to_lowercase()
    }

    /// Check that `id` is a well-formed ID and return it normalized.
    pub fn parse(id: &str) -> AppResult<String> {
        Ulid::from_string(id)
            .map(|u| u.to_string().to_lowercase())
            .map_err(|_| AppError::Validation(format!("malformed ID: {id}")))
    }
}
