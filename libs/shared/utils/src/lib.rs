pub mod extractor;
pub mod files;
pub mod jwt;
pub mod test_utils;
