//! Prelude module for convenient imports

pub use crate::file::{RegisterFile, INVALID_READ, REGISTER_FILE_SIZE};
pub use crate::map;
