//! Common utilities and shared types for the comment service.
//!
//! - **Configuration**: application settings via [`Config`]
//! - **Error handling**: unified error types via [`AppError`], [`AppResult`] and [`ErrorKind`]
//! - **ID generation**: ULID-based identifiers via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use comment_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id = IdGenerator::new().generate();
//!     println!("{} listening on {}", id, config.server.port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::{
    Config, DatabaseConfig, LoggingConfig, ModerationConfig, NotifierConfig, ServerConfig,
};
pub use error::{AppError, AppResult, ErrorKind};
pub use id::IdGenerator;
