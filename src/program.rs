// A CompiledProgram owns the executable mapping produced for one opcode sequence and
// exposes the call into it. The generated entry point follows the System V x86-64
// calling convention and takes a single argument, the base address of the parameter
// block. Ownership gives the release-at-most-once guarantee: the mapping goes away
// when the program is dropped, and a program cannot be invoked after that because the
// value no longer exists.

//! Callable handle to a generated program.

use crate::exec::ExecutableRegion;
use crate::params::ParamBlock;

/// Signature of a generated batch function. The argument is the base address
/// of a 16-byte-aligned parameter block.
pub type BatchFn = unsafe extern "sysv64" fn(*const u8);

/// An executable, immutable translation of one opcode sequence.
///
/// May be invoked concurrently from multiple threads as long as each
/// invocation uses parameter blocks whose destination buffers do not overlap.
pub struct CompiledProgram {
    region: ExecutableRegion,
}

impl CompiledProgram {
    pub(crate) fn new(region: ExecutableRegion) -> Self {
        CompiledProgram { region }
    }

    /// Size of the generated machine code in bytes.
    pub fn code_size(&self) -> usize {
        self.region.code_len()
    }

    /// Base address of the generated code, for inspection or disassembly.
    pub fn as_ptr(&self) -> *const u8 {
        self.region.as_ptr()
    }

    /// Runs the program against a parameter block at `params`.
    ///
    /// # Safety
    ///
    /// `params` must point to a 16-byte-aligned block laid out exactly as the
    /// opcode sequence consumes it, every pointer stored inside it must be
    /// valid and 16-byte aligned for the duration of the call, and destination
    /// buffers must not be written concurrently by other invocations.
    pub unsafe fn run(&self, params: *const u8) {
        let entry: BatchFn = std::mem::transmute(self.region.as_ptr());
        entry(params);
    }

    /// Convenience wrapper over [`run`](Self::run) for a [`ParamBlock`].
    ///
    /// # Safety
    ///
    /// Same as [`run`](Self::run); the block's layout and the pointers pushed
    /// into it are not validated.
    pub unsafe fn run_block(&self, params: &ParamBlock) {
        self.run(params.base_ptr());
    }
}
