pub mod config;
pub mod error;
pub mod types;

pub use config::ExobioConfig;
pub use error::{ExobioError, Result};
pub use types::*;
