pub mod calendar;
pub mod extractor;
pub mod jwt;
pub mod signed_token;
pub mod test_utils;
