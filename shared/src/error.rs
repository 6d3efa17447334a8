use thiserror::Error;

/// Ciphertext that never made it to the parser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("ciphertext length {len} is not a multiple of the 16-byte block size")]
    BlockLength { len: usize },
    #[error("invalid PKCS7 padding")]
    Padding,
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
    #[error("plaintext is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Decrypted text that does not have the expected shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 2 comma-separated fields, found {0}")]
    FieldCount(usize),
    #[error("second field does not start with `PERCENTAGE:`")]
    MissingPercentage,
    #[error("invalid percentage value `{0}`")]
    Percentage(String),
    #[error("non-numeric command value `{0}`")]
    Command(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("plaintext length {len} is not a multiple of the 16-byte block size")]
    BlockLength { len: usize },
    #[error("command text `{0}` does not fit in one block")]
    PayloadTooLong(String),
}

/// Anything that causes a single frame to be dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}
