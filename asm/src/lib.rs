pub mod error;
pub mod expr;
pub mod literal;
pub mod macros;
pub mod pass1;
pub mod pass2;
pub mod section;

pub use error::Error;
