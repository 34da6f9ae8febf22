use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read object file: {0}")]
    FileRead(String, #[source] std::io::Error),

    #[error("Failed to write object file: {0}")]
    FileWrite(String, #[source] std::io::Error),

    #[error("Malformed object document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid hex value: `{0}`")]
    InvalidHex(String),

    #[error("Unknown binding: `{0}`")]
    UnknownBinding(String),

    #[error("Unknown relocation type: `{0}`")]
    UnknownRelocationType(String),

    #[error("Symbol already defined: `{0}`")]
    DuplicateSymbol(String),

    #[error("Symbol `{0}` is defined in more than one module")]
    MultiplyDefined(String),
}
