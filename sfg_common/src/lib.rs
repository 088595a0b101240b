mod credits;
mod helpers;
pub mod op;
mod secret;

pub use credits::{Credits, CreditsConversionError, CURRENCY_CODE, CURRENCY_CODE_LOWER};
pub use helpers::parse_boolean_flag;
pub use secret::Secret;
