// Program driver: walks an opcode byte sequence once and turns it into one linked
// instruction stream. Opcode bytes occurring a single time are emitted inline. A byte
// occurring two or more times (the full byte, so the same operation targeting the
// other slot gets its own body) is emitted once as a shared subroutine at its first
// occurrence, reached by call and skipped by an unconditional jump; later occurrences
// become bare calls. The parameter cursor lives in a register, so a shared body reads
// each call site's own parameters without any extra plumbing. Labels are resolved by
// the assembler's one-pass link in finalize; an unresolved label is a hard error and
// nothing gets mapped.

//! Sequence-to-machine-code translation.

use std::collections::HashMap;

use iced_x86::code_asm::CodeLabel;
use log::{debug, trace, warn};

use crate::error::{CodegenError, CodegenResult};
use crate::opcode::{Opcode, Slot};
use crate::x64::emitter::OpEmitter;

/// Knobs for one generator instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodegenOptions {
    /// Fail with [`CodegenError::UnknownOpcode`] on bytes outside the opcode
    /// vocabulary instead of skipping them.
    pub strict: bool,
}

/// Translates opcode sequences into executable programs.
#[derive(Debug, Default)]
pub struct CodeGenerator {
    options: CodegenOptions,
}

impl CodeGenerator {
    pub fn new() -> Self {
        CodeGenerator::default()
    }

    pub fn with_options(options: CodegenOptions) -> Self {
        CodeGenerator { options }
    }

    /// Assembles `opcodes` into position-independent machine code.
    ///
    /// Identical input bytes always produce identical output bytes.
    pub fn assemble(&self, opcodes: &[u8]) -> CodegenResult<Vec<u8>> {
        debug!("assembling sequence of {} opcode bytes", opcodes.len());

        let mut counts = [0u16; 256];
        for &byte in opcodes {
            counts[byte as usize] = counts[byte as usize].saturating_add(1);
        }

        let mut em = OpEmitter::new()?;
        em.prologue()?;

        let mut shared: HashMap<u8, CodeLabel> = HashMap::new();
        for (index, &byte) in opcodes.iter().enumerate() {
            let Some((op, slot)) = Opcode::decode(byte) else {
                if self.options.strict {
                    return Err(CodegenError::UnknownOpcode {
                        opcode: byte,
                        index,
                    });
                }
                warn!("skipping unknown opcode byte {byte:#04x} at index {index}");
                continue;
            };
            trace!("emitting {op:?} -> {slot:?} at index {index}");

            if counts[byte as usize] < 2 {
                emit_op(&mut em, op, slot)?;
            } else if let Some(&body) = shared.get(&byte) {
                em.call_label(body)?;
            } else {
                trace!("creating shared body for opcode byte {byte:#04x}");
                let mut body = em.create_label();
                let mut resume = em.create_label();
                em.call_label(body)?;
                em.jmp_label(resume)?;
                em.place_label(&mut body)?;
                emit_op(&mut em, op, slot)?;
                em.ret()?;
                em.place_label(&mut resume)?;
                shared.insert(byte, body);
            }
        }

        em.epilogue()?;
        let code = em.finalize()?;
        debug!("assembled {} bytes of machine code", code.len());
        Ok(code)
    }

    /// Assembles `opcodes` and maps the result into executable memory.
    #[cfg(unix)]
    pub fn generate(&self, opcodes: &[u8]) -> CodegenResult<crate::program::CompiledProgram> {
        let code = self.assemble(opcodes)?;
        let region = crate::exec::ExecutableRegion::map(&code)?;
        Ok(crate::program::CompiledProgram::new(region))
    }
}

fn emit_op(em: &mut OpEmitter, op: Opcode, slot: Slot) -> CodegenResult<()> {
    match op {
        Opcode::MulMatrix => em.mul_matrix(slot),
        Opcode::TransformVector => em.transform_vector(slot),
        Opcode::Transpose => em.transpose(slot),
        Opcode::Invert => em.invert(slot),
        Opcode::TranslationRotateScale => em.translation_rotate_scale(slot),
        Opcode::RotateX => em.rotate_x(slot),
        Opcode::RotateY => em.rotate_y(slot),
        Opcode::RotateZ => em.rotate_z(slot),
        Opcode::Translate => em.translate(slot),
        Opcode::Scale => em.scale(slot),
        Opcode::Identity => em.identity(slot),
        Opcode::VectorNegate => em.vector_negate(),
        Opcode::Load => em.load(slot),
        Opcode::Store => em.store(slot),
        Opcode::Copy => em.copy(slot),
        Opcode::CopyMem => em.copy_mem(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::TO_SECOND;

    #[test]
    fn empty_sequence_assembles_to_a_plain_thunk() {
        let code = CodeGenerator::new().assemble(&[]).unwrap();
        // Prologue, epilogue, one ret. Nothing else.
        assert!(!code.is_empty());
        assert_eq!(*code.last().unwrap(), 0xC3);
    }

    #[test]
    fn assembly_is_deterministic() {
        let seq = [0x0D, 0x0D | TO_SECOND, 0x01, 0x03, 0x0E];
        let gen = CodeGenerator::new();
        assert_eq!(gen.assemble(&seq).unwrap(), gen.assemble(&seq).unwrap());
    }

    #[test]
    fn repeated_opcodes_share_one_body() {
        // Four inverts inline would dwarf one shared body plus three calls.
        let inline = CodeGenerator::new().assemble(&[0x04]).unwrap();
        let shared = CodeGenerator::new()
            .assemble(&[0x04, 0x04, 0x04, 0x04])
            .unwrap();
        assert!(shared.len() < inline.len() * 2);
    }

    #[test]
    fn lenient_mode_skips_unknown_bytes() {
        let gen = CodeGenerator::new();
        let clean = gen.assemble(&[0x0B]).unwrap();
        let noisy = gen.assemble(&[0x55, 0x0B, 0x7F]).unwrap();
        assert_eq!(clean, noisy);
    }

    #[test]
    fn strict_mode_reports_the_offending_byte() {
        let gen = CodeGenerator::with_options(CodegenOptions { strict: true });
        match gen.assemble(&[0x0B, 0x55]) {
            Err(CodegenError::UnknownOpcode { opcode, index }) => {
                assert_eq!(opcode, 0x55);
                assert_eq!(index, 1);
            }
            other => panic!("expected UnknownOpcode, got {other:?}"),
        }
    }
}
