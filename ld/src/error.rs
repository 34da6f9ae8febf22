use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Object(#[from] obj::Error),

    #[error("Failed to write output file: {0}")]
    FileWrite(String, #[source] std::io::Error),

    #[error("Section `{0}` has more than one absolute origin")]
    MultipleOrigins(String),

    #[error("Write outside segment `{segment}` at offset {offset}")]
    SegmentBounds { segment: String, offset: usize },
}
