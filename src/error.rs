// This module defines error types for the mat4jit code generator using the thiserror
// crate for idiomatic Rust error handling. CodegenError covers the failure scenarios of
// one generation attempt: an unknown opcode byte (only reported when strict decoding is
// enabled; the default mode skips such bytes), assembly/link failures bubbled up from
// iced-x86 (including unresolvable labels and displacement overflow), and executable
// memory failures from the mmap/mprotect lifecycle. Every failure aborts the whole
// generation attempt before any memory is made executable, so a caller never receives
// a partially linked or half-mapped program. CodegenResult<T> is the convenience alias
// used throughout the crate.

//! Error types for code generation.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

/// Main error type for code generation.
#[derive(Error, Debug)]
pub enum CodegenError {
    /// An opcode byte that decodes to no known operation.
    ///
    /// Only raised when [`CodegenOptions::strict`](crate::CodegenOptions) is set;
    /// the default behavior is to skip the byte.
    #[error("unknown opcode byte {opcode:#04x} at sequence index {index}")]
    UnknownOpcode { opcode: u8, index: usize },

    /// Instruction encoding or label resolution failed.
    #[error("assembly failed: {reason}")]
    Assembly { reason: String },

    /// Mapping an executable region failed.
    #[error("executable memory allocation of {size} bytes failed")]
    ExecMap { size: usize },

    /// Flipping the region from read-write to read-execute failed.
    #[error("could not make {size} byte code region executable")]
    ExecProtect { size: usize },
}

impl From<iced_x86::IcedError> for CodegenError {
    fn from(err: iced_x86::IcedError) -> Self {
        CodegenError::Assembly {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for code generation operations.
pub type CodegenResult<T> = Result<T, CodegenError>;
