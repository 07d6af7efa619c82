//! Article persistence.

pub mod json_file;
pub mod repository;

pub use json_file::JsonFileRepository;
pub use repository::{ArticleRepository, RepositoryError};
