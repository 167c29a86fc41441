// Opcode vocabulary for batched 4x4-matrix pipelines. One byte per operation: the low
// seven bits select the operation, the high bit redirects the result into the second
// operand slot. Base values stay inside 0x01..=0x10 so the flag bit can never collide
// with a base opcode. Everything above the instruction emitter talks in terms of
// Opcode and Slot; hardware register numbers never escape the emitter.

//! Opcode and operand-slot definitions.

/// Flag bit: write the result into the second slot instead of the first.
pub const TO_SECOND: u8 = 0x80;

/// One logical operand slot. Each slot holds a full 4x4 matrix in a bank of
/// four SIMD registers inside the generated program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    /// The opposite slot.
    pub fn other(self) -> Slot {
        match self {
            Slot::First => Slot::Second,
            Slot::Second => Slot::First,
        }
    }
}

/// All operations understood by the code generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// dest = first * second.
    MulMatrix = 0x01,
    /// *dst = M_slot * *src, pointers from the parameter block.
    TransformVector = 0x02,
    /// dest = transpose(first).
    Transpose = 0x03,
    /// dest = inverse(first). Singular input produces inf/NaN lanes.
    Invert = 0x04,
    /// dest = T(t) * R(q) * S(s) from 48 bytes of parameters.
    TranslationRotateScale = 0x05,
    /// Post-multiply first by a rotation about the given axis; sin and cos
    /// come from the parameter block.
    RotateX = 0x06,
    RotateY = 0x07,
    RotateZ = 0x08,
    /// dest col3 = first * (x,y,z,0) + first col3.
    Translate = 0x09,
    /// dest columns 0..2 scaled by x,y,z; col3 passes through.
    Scale = 0x0A,
    /// Materialize the identity matrix in the dest slot.
    Identity = 0x0B,
    /// *dst = -*src for four float lanes.
    VectorNegate = 0x0C,
    /// dest slot <- 64 bytes at a caller pointer.
    Load = 0x0D,
    /// 64 bytes at a caller pointer <- selected slot.
    Store = 0x0E,
    /// Slot-to-slot register copy; the flag picks the direction.
    Copy = 0x0F,
    /// Raw 16-float copy between two caller pointers.
    CopyMem = 0x10,
}

impl Opcode {
    /// Decodes one sequence byte into an operation and its destination slot,
    /// or `None` for bytes outside the vocabulary.
    pub fn decode(byte: u8) -> Option<(Opcode, Slot)> {
        let slot = if byte & TO_SECOND != 0 {
            Slot::Second
        } else {
            Slot::First
        };
        let op = match byte & !TO_SECOND {
            0x01 => Opcode::MulMatrix,
            0x02 => Opcode::TransformVector,
            0x03 => Opcode::Transpose,
            0x04 => Opcode::Invert,
            0x05 => Opcode::TranslationRotateScale,
            0x06 => Opcode::RotateX,
            0x07 => Opcode::RotateY,
            0x08 => Opcode::RotateZ,
            0x09 => Opcode::Translate,
            0x0A => Opcode::Scale,
            0x0B => Opcode::Identity,
            0x0C => Opcode::VectorNegate,
            0x0D => Opcode::Load,
            0x0E => Opcode::Store,
            0x0F => Opcode::Copy,
            0x10 => Opcode::CopyMem,
            _ => return None,
        };
        Some((op, slot))
    }

    /// Encodes the operation with the given destination slot into one byte.
    pub fn encode(self, slot: Slot) -> u8 {
        let base = self as u8;
        match slot {
            Slot::First => base,
            Slot::Second => base | TO_SECOND,
        }
    }

    /// Bytes of parameter-block data the generated code consumes for this
    /// operation. Always a multiple of 16 so the cursor stays aligned.
    pub fn param_stride(self) -> usize {
        match self {
            Opcode::MulMatrix
            | Opcode::Transpose
            | Opcode::Invert
            | Opcode::Identity
            | Opcode::Copy => 0,
            Opcode::TranslationRotateScale => 48,
            _ => 16,
        }
    }
}
