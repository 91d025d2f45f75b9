pub mod url_validator;

pub use url_validator::{UrlValidator, MAX_URL_LEN};
