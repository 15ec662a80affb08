pub mod archive;
pub mod checksum;
pub mod error;

pub use archive::{create_package, extract_all, list_files, read_header, Entry, Header};
pub use error::CommonError;
