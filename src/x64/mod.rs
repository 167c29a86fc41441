//! x86-64 backend: per-opcode SSE emission and the sequence driver.

pub mod codegen;
pub mod emitter;

pub use codegen::{CodeGenerator, CodegenOptions};
