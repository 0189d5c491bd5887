//! Provides extension traits of commonly used functions on various objects.

mod path_ext;
mod response_ext;
mod zip_ext;

pub use path_ext::PathExt;
pub use response_ext::ResponseExt;
pub use zip_ext::ZipExt;
