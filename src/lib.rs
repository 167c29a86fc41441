//! mat4jit - Runtime x86-64 code generation for batched 4x4-matrix algebra.
//!
//! A compact opcode byte sequence describing a pipeline of matrix and vector
//! operations is translated once into executable SSE machine code and returned
//! as a [`CompiledProgram`] that can be invoked repeatedly with different
//! parameter blocks. Two logical matrix slots live in fixed SIMD register
//! banks for the whole program, so chained operations never touch memory
//! between steps; opcode bytes occurring more than once are de-duplicated into
//! shared subroutines.
//!
//! # Usage
//!
//! ```no_run
//! use mat4jit::{CodeGenerator, SequenceBuilder, Slot};
//!
//! # #[repr(align(16))] struct Buf([f32; 16]);
//! # let a = Buf([0.0; 16]); let b = Buf([0.0; 16]); let mut out = Buf([0.0; 16]);
//! let mut seq = SequenceBuilder::new();
//! seq.load(Slot::First, a.0.as_ptr())
//!     .load(Slot::Second, b.0.as_ptr())
//!     .mul(Slot::First)
//!     .rotate_y(0.5, Slot::First)
//!     .store(Slot::First, out.0.as_mut_ptr());
//!
//! let program = CodeGenerator::new().generate(seq.opcodes())?;
//! unsafe { program.run_block(seq.params()) };
//! # Ok::<(), mat4jit::CodegenError>(())
//! ```
//!
//! All matrix and vector buffers handed to a program must be 16-byte aligned.
//! Generation only happens on x86-64; running generated code additionally
//! requires a unix host for the executable-memory mapping.
//!
//! # Architecture
//!
//! - [`opcode`] - Opcode vocabulary and operand slots
//! - [`x64`] - Instruction emitter and the sequence driver
//! - [`exec`] - W^X executable memory lifecycle
//! - [`sequence`] / [`params`] - Sequence and argument-buffer construction

pub mod error;
pub mod opcode;
pub mod params;
pub mod sequence;
pub mod x64;

#[cfg(unix)]
pub mod exec;
#[cfg(unix)]
pub mod program;

pub use error::{CodegenError, CodegenResult};
pub use opcode::{Opcode, Slot, TO_SECOND};
pub use params::ParamBlock;
#[cfg(unix)]
pub use program::{BatchFn, CompiledProgram};
pub use sequence::SequenceBuilder;
pub use x64::{CodeGenerator, CodegenOptions};
