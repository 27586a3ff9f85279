use thiserror::Error;

/// Errors surfaced by the encoder and decoder.
///
/// The core never attempts recovery; any of these is fatal to the current
/// encode or decode call and propagates straight to the caller.
#[derive(Error, Debug)]
pub enum EcmError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unexpected end of file while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("not an ECM file (bad magic header)")]
    BadHeader,

    #[error("corrupt ECM file: variable-length record count overflowed")]
    CorruptLength,

    #[error("checksum mismatch: trailer EDC {expected:08x} does not match decoded data EDC {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}
