pub mod cli_interface;
mod error;
mod fs;
pub mod mkfs;
pub mod utils;
pub use error::{FsError, Result};
pub use fs::*;
