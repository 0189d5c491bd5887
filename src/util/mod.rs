//! Miscellaneous utilities shared across the crate that don't belong to any one subsystem.

pub mod checksum;
pub mod env;
pub mod ext;
mod log_level;

use std::path::{Path, PathBuf};

pub use log_level::LogLevel;

/// Returns the last path component of `path`, e.g. the file name a download would naturally be
/// saved under when only a URL path is available.
pub fn get_last_path_segment<P>(path: P) -> PathBuf
where
    P: AsRef<Path>,
{
    let component = path.as_ref().components().last().expect("no last component in path");
    let last: &Path = component.as_ref();
    last.to_path_buf()
}
