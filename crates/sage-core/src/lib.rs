pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use config::SageConfig;
pub use error::{Result, SageError};
pub use text::truncate_chars;
pub use types::*;
