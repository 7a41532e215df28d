pub mod articles;
pub mod metadata;
pub mod source_path;
