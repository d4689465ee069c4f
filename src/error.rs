use thiserror::Error;

/// Failures that abort an analysis. No partial core result is produced.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Unable to decode image: {0}")]
    Decode(String),

    #[error("image dimensions cannot be zero")]
    EmptyImage,

    #[error("palette size must be a power of two between 1 and 256, got {0}")]
    InvalidPaletteSize(usize),

    #[error("invalid analysis options: {0}")]
    InvalidOptions(String),

    #[error("cannot attach AI annotations: {0}")]
    InvalidAnnotations(String),

    #[error("could not serialize analysis result: {0}")]
    Serialize(String),
}

/// Failures at the vision-model boundary. These never abort an analysis;
/// the assembler folds them into a message next to the core result.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("no credential supplied for the vision model")]
    MissingCredential,

    #[error("cannot reach vision model at {0}")]
    Connection(String),

    #[error("vision model request timed out after {0}s")]
    Timeout(u64),

    #[error("vision model request failed: {0}")]
    Http(String),

    #[error("vision model returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("vision model returned no text")]
    EmptyResponse,
}
