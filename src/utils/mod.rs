pub mod id_generator;
pub mod password;
pub mod time_parser;
pub mod url_validator;

pub use id_generator::generate_random_id;
pub use time_parser::TimeParser;
pub use url_validator::{normalize_url, validate_url};
