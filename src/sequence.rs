// SequenceBuilder keeps the opcode vector and its parameter block in lock-step so the
// positional contract between the two cannot be violated by hand-interleaving
// mistakes: one method per operation appends the opcode byte and exactly the
// parameter bytes that opcode consumes, padded to its 16-byte stride. Angle-taking
// methods pre-compute sin/cos at build time, so a built block is bound to its angles;
// callers who want to re-fill parameters between runs push raw sin/cos through the
// lower-level ParamBlock API instead.

//! Lock-step builder for opcode sequences and their parameter blocks.

use crate::opcode::{Opcode, Slot};
use crate::params::ParamBlock;

/// Builds an opcode sequence together with its matching parameter block.
///
/// ```no_run
/// use mat4jit::{CodeGenerator, SequenceBuilder, Slot};
///
/// let m = [0.0f32; 16];
/// let mut out = [0.0f32; 16];
/// let mut seq = SequenceBuilder::new();
/// seq.load(Slot::First, m.as_ptr())
///     .rotate_z(std::f32::consts::FRAC_PI_2, Slot::First)
///     .store(Slot::First, out.as_mut_ptr());
/// let program = CodeGenerator::new().generate(seq.opcodes())?;
/// unsafe { program.run_block(seq.params()) };
/// # Ok::<(), mat4jit::CodegenError>(())
/// ```
#[derive(Default)]
pub struct SequenceBuilder {
    ops: Vec<u8>,
    params: ParamBlock,
}

impl SequenceBuilder {
    pub fn new() -> Self {
        SequenceBuilder::default()
    }

    fn op(&mut self, op: Opcode, slot: Slot) -> &mut Self {
        debug_assert_eq!(self.params.len() % 16, 0);
        self.ops.push(op.encode(slot));
        self
    }

    /// dest = first * second.
    pub fn mul(&mut self, dest: Slot) -> &mut Self {
        self.op(Opcode::MulMatrix, dest)
    }

    /// Transforms the vector at `src` by the matrix in `matrix`, writing to
    /// `dst`. Both pointers must stay valid and 16-byte aligned until the
    /// program runs.
    pub fn transform_vector(&mut self, matrix: Slot, src: *const f32, dst: *mut f32) -> &mut Self {
        self.op(Opcode::TransformVector, matrix);
        self.params.push_addr(src);
        self.params.push_addr(dst as *const f32);
        self
    }

    pub fn transpose(&mut self, dest: Slot) -> &mut Self {
        self.op(Opcode::Transpose, dest)
    }

    pub fn invert(&mut self, dest: Slot) -> &mut Self {
        self.op(Opcode::Invert, dest)
    }

    /// dest = T(t) * R(q) * S(s). The quaternion should be unit length.
    pub fn translation_rotate_scale(
        &mut self,
        t: [f32; 3],
        q: [f32; 4],
        s: [f32; 3],
        dest: Slot,
    ) -> &mut Self {
        self.op(Opcode::TranslationRotateScale, dest);
        for v in t {
            self.params.push_f32(v);
        }
        self.params.push_f32(0.0);
        for v in q {
            self.params.push_f32(v);
        }
        for v in s {
            self.params.push_f32(v);
        }
        self.params.push_f32(1.0);
        self
    }

    fn rotate(&mut self, op: Opcode, angle: f32, dest: Slot) -> &mut Self {
        self.op(op, dest);
        self.params.push_f32(angle.sin());
        self.params.push_f32(angle.cos());
        self.params.pad16();
        self
    }

    /// Post-multiplies first by a rotation of `angle` radians about X.
    pub fn rotate_x(&mut self, angle: f32, dest: Slot) -> &mut Self {
        self.rotate(Opcode::RotateX, angle, dest)
    }

    pub fn rotate_y(&mut self, angle: f32, dest: Slot) -> &mut Self {
        self.rotate(Opcode::RotateY, angle, dest)
    }

    pub fn rotate_z(&mut self, angle: f32, dest: Slot) -> &mut Self {
        self.rotate(Opcode::RotateZ, angle, dest)
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32, dest: Slot) -> &mut Self {
        self.op(Opcode::Translate, dest);
        self.params.push_f32(x);
        self.params.push_f32(y);
        self.params.push_f32(z);
        self.params.push_f32(0.0);
        self
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32, dest: Slot) -> &mut Self {
        self.op(Opcode::Scale, dest);
        self.params.push_f32(x);
        self.params.push_f32(y);
        self.params.push_f32(z);
        self.params.push_f32(1.0);
        self
    }

    pub fn identity(&mut self, dest: Slot) -> &mut Self {
        self.op(Opcode::Identity, dest)
    }

    /// *dst = -*src for four float lanes.
    pub fn vector_negate(&mut self, src: *const f32, dst: *mut f32) -> &mut Self {
        self.op(Opcode::VectorNegate, Slot::First);
        self.params.push_addr(src);
        self.params.push_addr(dst as *const f32);
        self
    }

    /// Loads 16 floats at `src` into the given slot.
    pub fn load(&mut self, slot: Slot, src: *const f32) -> &mut Self {
        self.op(Opcode::Load, slot);
        self.params.push_addr(src);
        self.params.pad16();
        self
    }

    /// Stores the given slot to 16 floats at `dst`.
    pub fn store(&mut self, slot: Slot, dst: *mut f32) -> &mut Self {
        self.op(Opcode::Store, slot);
        self.params.push_addr(dst as *const f32);
        self.params.pad16();
        self
    }

    /// Copies the other slot into `dest`, registers only.
    pub fn copy(&mut self, dest: Slot) -> &mut Self {
        self.op(Opcode::Copy, dest)
    }

    /// Copies 16 floats from `src` to `dst` without touching the slots.
    pub fn copy_mem(&mut self, src: *const f32, dst: *mut f32) -> &mut Self {
        self.op(Opcode::CopyMem, Slot::First);
        self.params.push_addr(src);
        self.params.push_addr(dst as *const f32);
        self
    }

    /// The opcode bytes accumulated so far.
    pub fn opcodes(&self) -> &[u8] {
        &self.ops
    }

    /// The parameter block matching [`opcodes`](Self::opcodes).
    pub fn params(&self) -> &ParamBlock {
        &self.params
    }

    pub fn into_parts(self) -> (Vec<u8>, ParamBlock) {
        (self.ops, self.params)
    }
}
