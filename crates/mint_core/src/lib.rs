pub mod config;
pub mod error;
pub mod logging;

pub use config::{MintConfig, PriceSource, validate_url};
pub use error::{ErrorKind, MintError};
