pub mod codec;
pub mod error;
pub mod inst;
pub mod reloc;
pub mod symbol;

pub use codec::Module;
pub use error::Error;
