mod password;
mod validation;

pub use password::{hash_password, verify_password, PasswordError, MIN_PASSWORD_LENGTH};
pub use validation::{is_valid_email, ValidationError};
