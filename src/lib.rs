pub mod types;
pub mod error;
pub mod time;
pub mod config;
pub mod utils;

pub use types::*;
pub use error::{Result, TimeError};
