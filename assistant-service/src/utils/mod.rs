pub mod validation;

pub use validation::{parse_request, JsonBody};
