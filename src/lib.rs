pub mod analysis;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod util;
pub mod workspace;

pub use cancel::CancellationToken;
pub use error::{Error, Result};
