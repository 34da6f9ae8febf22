pub mod error;
pub mod exec;
pub mod linker;
pub mod loader;
pub mod map;
pub mod segment;

pub use error::Error;
