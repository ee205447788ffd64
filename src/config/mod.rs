//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → read once at startup by main
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the route table is code, not config
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CorsConfig, ListenerConfig, ObservabilityConfig, PoolConfig, RateLimitConfig, ServerConfig,
    TimeoutConfig,
};
pub use validation::ValidationError;
