// x86-64 instruction emitter built on iced-x86's CodeAssembler. One emission routine
// per opcode, plus the prologue/epilogue and the label plumbing the driver uses for
// shared subroutine bodies. Register convention inside a generated program:
//
//   xmm8..xmm11   first slot, one column per register
//   xmm12..xmm15  second slot
//   xmm0..xmm7    scratch
//   rcx           parameter-block cursor, advanced by each opcode's stride
//   r8, r9, r10   pointer and constant scratch
//
// The prologue saves xmm6..xmm15 with unaligned stores and moves the incoming
// argument into rcx, so the finished program is callable under both the System V and
// Win64 register-preservation expectations. All constants are materialized through
// immediate-to-GP moves and movd, and all control flow is label-relative, so the
// assembled bytes are position independent and can be copied anywhere executable.
//
// Everything is SSE1/SSE2 only. In particular there is no horizontal-add anywhere:
// reductions are done with shufps/addps pairs.

//! Per-opcode x86-64 SSE emission.

use iced_x86::code_asm::*;

use crate::error::CodegenResult;
use crate::opcode::Slot;

/// Shuffle immediate selecting source lanes (a, b, c, d).
const fn swz(a: u32, b: u32, c: u32, d: u32) -> u32 {
    a | b << 2 | c << 4 | d << 6
}

/// Shuffle immediate broadcasting one lane.
const fn bcast(lane: u32) -> u32 {
    swz(lane, lane, lane, lane)
}

const F32_ONE: u32 = 0x3f80_0000;
const F32_NEG_ONE: u32 = 0xbf80_0000;
const F32_SIGN: u32 = 0x8000_0000;

/// Column registers of one slot bank.
fn bank(slot: Slot) -> [AsmRegisterXmm; 4] {
    match slot {
        Slot::First => [xmm8, xmm9, xmm10, xmm11],
        Slot::Second => [xmm12, xmm13, xmm14, xmm15],
    }
}

/// Streams instructions for one generated program.
pub struct OpEmitter {
    asm: CodeAssembler,
}

impl OpEmitter {
    pub fn new() -> CodegenResult<Self> {
        Ok(OpEmitter {
            asm: CodeAssembler::new(64)?,
        })
    }

    pub fn create_label(&mut self) -> CodeLabel {
        self.asm.create_label()
    }

    pub fn place_label(&mut self, label: &mut CodeLabel) -> CodegenResult<()> {
        self.asm.set_label(label)?;
        Ok(())
    }

    pub fn call_label(&mut self, label: CodeLabel) -> CodegenResult<()> {
        self.asm.call(label)?;
        Ok(())
    }

    pub fn jmp_label(&mut self, label: CodeLabel) -> CodegenResult<()> {
        self.asm.jmp(label)?;
        Ok(())
    }

    pub fn ret(&mut self) -> CodegenResult<()> {
        self.asm.ret()?;
        Ok(())
    }

    /// Saves xmm6..xmm15 and moves the parameter-block base into the cursor.
    pub fn prologue(&mut self) -> CodegenResult<()> {
        let a = &mut self.asm;
        a.sub(rsp, 160i32)?;
        let saved = [
            xmm6, xmm7, xmm8, xmm9, xmm10, xmm11, xmm12, xmm13, xmm14, xmm15,
        ];
        for (i, reg) in saved.into_iter().enumerate() {
            a.movdqu(xmmword_ptr(rsp + (16 * i) as i32), reg)?;
        }
        a.mov(rcx, rdi)?;
        Ok(())
    }

    /// Restores the saved registers and returns.
    pub fn epilogue(&mut self) -> CodegenResult<()> {
        let a = &mut self.asm;
        let saved = [
            xmm6, xmm7, xmm8, xmm9, xmm10, xmm11, xmm12, xmm13, xmm14, xmm15,
        ];
        for (i, reg) in saved.into_iter().enumerate() {
            a.movdqu(reg, xmmword_ptr(rsp + (16 * i) as i32))?;
        }
        a.add(rsp, 160i32)?;
        a.ret()?;
        Ok(())
    }

    /// Resolves all labels and returns the final position-independent bytes.
    pub fn finalize(mut self) -> CodegenResult<Vec<u8>> {
        Ok(self.asm.assemble(0)?)
    }

    /// xmm0 = m * xmm0, where m is the matrix in `cols`.
    ///
    /// Broadcasts each lane of the input vector and accumulates the scaled
    /// columns. Clobbers xmm1..xmm4.
    fn linear_product(&mut self, cols: [AsmRegisterXmm; 4]) -> CodegenResult<()> {
        let a = &mut self.asm;
        a.movaps(xmm1, xmm0)?;
        a.shufps(xmm1, xmm1, bcast(0))?;
        a.movaps(xmm2, xmm0)?;
        a.shufps(xmm2, xmm2, bcast(1))?;
        a.movaps(xmm3, xmm0)?;
        a.shufps(xmm3, xmm3, bcast(2))?;
        a.movaps(xmm4, xmm0)?;
        a.shufps(xmm4, xmm4, bcast(3))?;
        a.movaps(xmm0, cols[0])?;
        a.mulps(xmm0, xmm1)?;
        a.movaps(xmm1, cols[1])?;
        a.mulps(xmm1, xmm2)?;
        a.movaps(xmm2, cols[2])?;
        a.mulps(xmm2, xmm3)?;
        a.movaps(xmm3, cols[3])?;
        a.mulps(xmm3, xmm4)?;
        a.addps(xmm0, xmm1)?;
        a.addps(xmm2, xmm3)?;
        a.addps(xmm0, xmm2)?;
        Ok(())
    }

    /// Loads the two pointers of a (src, dst) parameter pair into r8/r9 and
    /// advances the cursor.
    fn load_ptr_pair(&mut self) -> CodegenResult<()> {
        let a = &mut self.asm;
        a.mov(r8, qword_ptr(rcx))?;
        a.mov(r9, qword_ptr(rcx + 8))?;
        a.add(rcx, 16i32)?;
        Ok(())
    }

    /// dest = first * second.
    pub fn mul_matrix(&mut self, dest: Slot) -> CodegenResult<()> {
        let first = bank(Slot::First);
        let second = bank(Slot::Second);
        let d = bank(dest);
        // Columns 0..2 are buffered when the result lands in the first slot,
        // since every iteration still reads all four first-slot columns.
        let buffer = [xmm5, xmm6, xmm7];
        for i in 0..4 {
            self.asm.movaps(xmm0, second[i])?;
            self.linear_product(first)?;
            match dest {
                Slot::First if i < 3 => self.asm.movaps(buffer[i], xmm0)?,
                Slot::First => {
                    self.asm.movaps(d[0], buffer[0])?;
                    self.asm.movaps(d[1], buffer[1])?;
                    self.asm.movaps(d[2], buffer[2])?;
                    self.asm.movaps(d[3], xmm0)?;
                }
                Slot::Second => self.asm.movaps(d[i], xmm0)?,
            }
        }
        Ok(())
    }

    /// *dst = M * *src with the matrix slot chosen by the flag bit.
    pub fn transform_vector(&mut self, matrix: Slot) -> CodegenResult<()> {
        self.load_ptr_pair()?;
        self.asm.movaps(xmm0, xmmword_ptr(r8))?;
        self.linear_product(bank(matrix))?;
        self.asm.movaps(xmmword_ptr(r9), xmm0)?;
        Ok(())
    }

    /// dest = transpose(first), two rounds of pairwise interleaves.
    pub fn transpose(&mut self, dest: Slot) -> CodegenResult<()> {
        let s = bank(Slot::First);
        let d = bank(dest);
        let a = &mut self.asm;
        a.movaps(xmm0, s[0])?;
        a.movaps(xmm2, xmm0)?;
        a.movaps(xmm1, s[1])?;
        a.shufps(xmm0, xmm1, swz(0, 2, 0, 2))?;
        a.shufps(xmm2, xmm1, swz(1, 3, 1, 3))?;
        a.movaps(xmm3, s[2])?;
        a.movaps(xmm5, xmm3)?;
        a.movaps(xmm6, s[3])?;
        a.shufps(xmm3, xmm6, swz(0, 2, 0, 2))?;
        a.shufps(xmm5, xmm6, swz(1, 3, 1, 3))?;
        a.movaps(xmm1, xmm0)?;
        a.shufps(xmm0, xmm3, swz(0, 2, 0, 2))?;
        a.movaps(xmm4, xmm2)?;
        a.shufps(xmm2, xmm5, swz(0, 2, 0, 2))?;
        a.shufps(xmm1, xmm3, swz(1, 3, 1, 3))?;
        a.shufps(xmm4, xmm5, swz(1, 3, 1, 3))?;
        a.movaps(d[0], xmm0)?;
        a.movaps(d[1], xmm2)?;
        a.movaps(d[2], xmm1)?;
        a.movaps(d[3], xmm4)?;
        Ok(())
    }

    /// dest = I. Builds (1,0,0,0) from an immediate and rotates it down the
    /// remaining columns.
    pub fn identity(&mut self, dest: Slot) -> CodegenResult<()> {
        let d = bank(dest);
        let a = &mut self.asm;
        a.mov(r9d, F32_ONE)?;
        a.movd(d[0], r9d)?;
        for i in 1..4 {
            a.movaps(d[i], d[i - 1])?;
            a.shufps(d[i], d[i], swz(3, 0, 1, 2))?;
        }
        Ok(())
    }

    /// Broadcasts sin into xmm0, cos into xmm1 and -sin into xmm2 from the
    /// first 8 parameter bytes, then advances the cursor by 16.
    fn load_sin_cos(&mut self) -> CodegenResult<()> {
        let a = &mut self.asm;
        a.movss(xmm0, dword_ptr(rcx))?;
        a.movss(xmm1, dword_ptr(rcx + 4))?;
        a.add(rcx, 16i32)?;
        a.shufps(xmm0, xmm0, bcast(0))?;
        a.shufps(xmm1, xmm1, bcast(0))?;
        a.xorps(xmm2, xmm2)?;
        a.subps(xmm2, xmm0)?;
        Ok(())
    }

    /// Post-multiplies the first slot by Rx(angle): col1' = cos*col1 +
    /// sin*col2, col2' = -sin*col1 + cos*col2.
    pub fn rotate_x(&mut self, dest: Slot) -> CodegenResult<()> {
        self.load_sin_cos()?;
        let f = bank(Slot::First);
        let d = bank(dest);
        let a = &mut self.asm;
        a.movaps(xmm3, f[1])?;
        a.mulps(xmm3, xmm1)?;
        a.movaps(xmm4, f[2])?;
        a.mulps(xmm4, xmm0)?;
        a.addps(xmm3, xmm4)?;
        a.movaps(xmm4, f[1])?;
        a.mulps(xmm4, xmm2)?;
        a.movaps(xmm5, f[2])?;
        a.mulps(xmm5, xmm1)?;
        a.addps(xmm4, xmm5)?;
        if dest == Slot::Second {
            a.movaps(d[0], f[0])?;
            a.movaps(d[3], f[3])?;
        }
        a.movaps(d[1], xmm3)?;
        a.movaps(d[2], xmm4)?;
        Ok(())
    }

    /// col0' = cos*col0 - sin*col2, col2' = sin*col0 + cos*col2.
    pub fn rotate_y(&mut self, dest: Slot) -> CodegenResult<()> {
        self.load_sin_cos()?;
        let f = bank(Slot::First);
        let d = bank(dest);
        let a = &mut self.asm;
        a.movaps(xmm3, f[0])?;
        a.mulps(xmm3, xmm1)?;
        a.movaps(xmm4, f[2])?;
        a.mulps(xmm4, xmm2)?;
        a.addps(xmm3, xmm4)?;
        a.movaps(xmm4, f[0])?;
        a.mulps(xmm4, xmm0)?;
        a.movaps(xmm5, f[2])?;
        a.mulps(xmm5, xmm1)?;
        a.addps(xmm4, xmm5)?;
        if dest == Slot::Second {
            a.movaps(d[1], f[1])?;
            a.movaps(d[3], f[3])?;
        }
        a.movaps(d[0], xmm3)?;
        a.movaps(d[2], xmm4)?;
        Ok(())
    }

    /// col0' = cos*col0 + sin*col1, col1' = -sin*col0 + cos*col1.
    pub fn rotate_z(&mut self, dest: Slot) -> CodegenResult<()> {
        self.load_sin_cos()?;
        let f = bank(Slot::First);
        let d = bank(dest);
        let a = &mut self.asm;
        a.movaps(xmm3, f[0])?;
        a.mulps(xmm3, xmm1)?;
        a.movaps(xmm4, f[1])?;
        a.mulps(xmm4, xmm0)?;
        a.addps(xmm3, xmm4)?;
        a.movaps(xmm4, f[0])?;
        a.mulps(xmm4, xmm2)?;
        a.movaps(xmm5, f[1])?;
        a.mulps(xmm5, xmm1)?;
        a.addps(xmm4, xmm5)?;
        if dest == Slot::Second {
            a.movaps(d[2], f[2])?;
            a.movaps(d[3], f[3])?;
        }
        a.movaps(d[0], xmm3)?;
        a.movaps(d[1], xmm4)?;
        Ok(())
    }

    /// dest col3 = first * (x,y,z,0) + first col3; columns 0..2 pass through.
    pub fn translate(&mut self, dest: Slot) -> CodegenResult<()> {
        let f = bank(Slot::First);
        let d = bank(dest);
        let a = &mut self.asm;
        a.movaps(xmm0, xmmword_ptr(rcx))?;
        a.add(rcx, 16i32)?;
        a.movaps(xmm1, xmm0)?;
        a.shufps(xmm1, xmm1, bcast(0))?;
        a.movaps(xmm2, f[0])?;
        a.mulps(xmm2, xmm1)?;
        a.movaps(xmm1, xmm0)?;
        a.shufps(xmm1, xmm1, bcast(1))?;
        a.movaps(xmm3, f[1])?;
        a.mulps(xmm3, xmm1)?;
        a.addps(xmm2, xmm3)?;
        a.movaps(xmm1, xmm0)?;
        a.shufps(xmm1, xmm1, bcast(2))?;
        a.movaps(xmm3, f[2])?;
        a.mulps(xmm3, xmm1)?;
        a.addps(xmm2, xmm3)?;
        a.addps(xmm2, f[3])?;
        if dest == Slot::Second {
            a.movaps(d[0], f[0])?;
            a.movaps(d[1], f[1])?;
            a.movaps(d[2], f[2])?;
        }
        a.movaps(d[3], xmm2)?;
        Ok(())
    }

    /// dest columns 0..2 = first columns scaled by x,y,z; col3 passes through.
    pub fn scale(&mut self, dest: Slot) -> CodegenResult<()> {
        let f = bank(Slot::First);
        let d = bank(dest);
        let a = &mut self.asm;
        a.movaps(xmm0, xmmword_ptr(rcx))?;
        a.add(rcx, 16i32)?;
        for i in 0..3 {
            a.movaps(xmm1, xmm0)?;
            a.shufps(xmm1, xmm1, bcast(i as u32))?;
            a.movaps(xmm2, f[i])?;
            a.mulps(xmm2, xmm1)?;
            a.movaps(d[i], xmm2)?;
        }
        if dest == Slot::Second {
            a.movaps(d[3], f[3])?;
        }
        Ok(())
    }

    /// *dst = -*src, sign-bit XOR across four lanes.
    pub fn vector_negate(&mut self) -> CodegenResult<()> {
        self.load_ptr_pair()?;
        let a = &mut self.asm;
        a.movaps(xmm0, xmmword_ptr(r8))?;
        a.mov(r10d, F32_SIGN)?;
        a.movd(xmm1, r10d)?;
        a.shufps(xmm1, xmm1, bcast(0))?;
        a.xorps(xmm0, xmm1)?;
        a.movaps(xmmword_ptr(r9), xmm0)?;
        Ok(())
    }

    /// dest slot <- 64 bytes at the parameter pointer.
    pub fn load(&mut self, dest: Slot) -> CodegenResult<()> {
        let d = bank(dest);
        let a = &mut self.asm;
        a.mov(r8, qword_ptr(rcx))?;
        a.add(rcx, 16i32)?;
        for i in 0..4 {
            a.movaps(d[i], xmmword_ptr(r8 + (16 * i) as i32))?;
        }
        Ok(())
    }

    /// 64 bytes at the parameter pointer <- selected slot.
    pub fn store(&mut self, src: Slot) -> CodegenResult<()> {
        let s = bank(src);
        let a = &mut self.asm;
        a.mov(r8, qword_ptr(rcx))?;
        a.add(rcx, 16i32)?;
        for i in 0..4 {
            a.movaps(xmmword_ptr(r8 + (16 * i) as i32), s[i])?;
        }
        Ok(())
    }

    /// Register-only slot copy into `dest` from the other slot.
    pub fn copy(&mut self, dest: Slot) -> CodegenResult<()> {
        let s = bank(dest.other());
        let d = bank(dest);
        for i in 0..4 {
            self.asm.movaps(d[i], s[i])?;
        }
        Ok(())
    }

    /// Raw 16-float copy between two caller pointers.
    pub fn copy_mem(&mut self) -> CodegenResult<()> {
        self.load_ptr_pair()?;
        let a = &mut self.asm;
        let tmp = [xmm0, xmm1, xmm2, xmm3];
        for (i, t) in tmp.into_iter().enumerate() {
            a.movaps(t, xmmword_ptr(r8 + (16 * i) as i32))?;
        }
        for (i, t) in tmp.into_iter().enumerate() {
            a.movaps(xmmword_ptr(r9 + (16 * i) as i32), t)?;
        }
        Ok(())
    }

    /// dest = inverse(first).
    ///
    /// 2x2-block decomposition: with M = [A B; C D] in row-major 2x2 blocks,
    /// the inverse is assembled from per-block determinants, the adjugate
    /// products D#C and A#B, and 1/det(M) carried with the adjugate sign
    /// pattern. The column registers hold M's columns, so the blocks below are
    /// actually those of the transpose; inv(M^T) = inv(M)^T makes the final
    /// lane interleave come out as the wanted columns. Singular input divides
    /// by zero and yields inf/NaN lanes without faulting.
    pub fn invert(&mut self, dest: Slot) -> CodegenResult<()> {
        let s = bank(Slot::First);
        let d = bank(dest);
        let a = &mut self.asm;

        // 2x2 blocks: xmm0=A, xmm1=B, xmm2=C, xmm3=D.
        a.movaps(xmm0, s[0])?;
        a.movlhps(xmm0, s[1])?;
        a.movaps(xmm1, s[1])?;
        a.movhlps(xmm1, s[0])?;
        a.movaps(xmm2, s[2])?;
        a.movlhps(xmm2, s[3])?;
        a.movaps(xmm3, s[3])?;
        a.movhlps(xmm3, s[2])?;

        // xmm4 = (|A|, |B|, |C|, |D|). The source columns are dead after this,
        // so the dest bank is free scratch even when it aliases the source.
        a.movaps(xmm4, s[0])?;
        a.shufps(xmm4, s[2], swz(0, 2, 0, 2))?;
        a.movaps(xmm5, s[1])?;
        a.shufps(xmm5, s[3], swz(1, 3, 1, 3))?;
        a.mulps(xmm4, xmm5)?;
        a.movaps(xmm5, s[0])?;
        a.shufps(xmm5, s[2], swz(1, 3, 1, 3))?;
        a.movaps(xmm6, s[1])?;
        a.shufps(xmm6, s[3], swz(0, 2, 0, 2))?;
        a.mulps(xmm5, xmm6)?;
        a.subps(xmm4, xmm5)?;

        // xmm5 = D#C (adjugate of D times C).
        a.movaps(xmm5, xmm3)?;
        a.shufps(xmm5, xmm5, swz(3, 3, 0, 0))?;
        a.mulps(xmm5, xmm2)?;
        a.movaps(xmm6, xmm3)?;
        a.shufps(xmm6, xmm6, swz(1, 1, 2, 2))?;
        a.movaps(xmm7, xmm2)?;
        a.shufps(xmm7, xmm7, swz(2, 3, 0, 1))?;
        a.mulps(xmm6, xmm7)?;
        a.subps(xmm5, xmm6)?;

        // xmm6 = A#B.
        a.movaps(xmm6, xmm0)?;
        a.shufps(xmm6, xmm6, swz(3, 3, 0, 0))?;
        a.mulps(xmm6, xmm1)?;
        a.movaps(xmm7, xmm0)?;
        a.shufps(xmm7, xmm7, swz(1, 1, 2, 2))?;
        a.movaps(d[0], xmm1)?;
        a.shufps(d[0], d[0], swz(2, 3, 0, 1))?;
        a.mulps(xmm7, d[0])?;
        a.subps(xmm6, xmm7)?;

        // d0 = X' = |D|*A - B*(D#C)  (2x2 product).
        a.movaps(xmm7, xmm4)?;
        a.shufps(xmm7, xmm7, bcast(3))?;
        a.mulps(xmm7, xmm0)?;
        a.movaps(d[0], xmm5)?;
        a.shufps(d[0], d[0], swz(0, 3, 0, 3))?;
        a.mulps(d[0], xmm1)?;
        a.movaps(d[1], xmm1)?;
        a.shufps(d[1], d[1], swz(1, 0, 3, 2))?;
        a.movaps(d[2], xmm5)?;
        a.shufps(d[2], d[2], swz(2, 1, 2, 1))?;
        a.mulps(d[1], d[2])?;
        a.addps(d[0], d[1])?;
        a.subps(xmm7, d[0])?;
        a.movaps(d[0], xmm7)?;

        // d1 = W' = |A|*D - C*(A#B).
        a.movaps(xmm7, xmm4)?;
        a.shufps(xmm7, xmm7, bcast(0))?;
        a.mulps(xmm7, xmm3)?;
        a.movaps(d[1], xmm6)?;
        a.shufps(d[1], d[1], swz(0, 3, 0, 3))?;
        a.mulps(d[1], xmm2)?;
        a.movaps(d[2], xmm2)?;
        a.shufps(d[2], d[2], swz(1, 0, 3, 2))?;
        a.movaps(d[3], xmm6)?;
        a.shufps(d[3], d[3], swz(2, 1, 2, 1))?;
        a.mulps(d[2], d[3])?;
        a.addps(d[1], d[2])?;
        a.subps(xmm7, d[1])?;
        a.movaps(d[1], xmm7)?;

        // d2 = Y' = |B|*C - D*adj(A#B).
        a.movaps(xmm7, xmm4)?;
        a.shufps(xmm7, xmm7, bcast(1))?;
        a.mulps(xmm7, xmm2)?;
        a.movaps(d[2], xmm6)?;
        a.shufps(d[2], d[2], swz(3, 0, 3, 0))?;
        a.mulps(d[2], xmm3)?;
        a.movaps(d[3], xmm3)?;
        a.shufps(d[3], d[3], swz(1, 0, 3, 2))?;
        a.movaps(xmm2, xmm6)?;
        a.shufps(xmm2, xmm2, swz(2, 1, 2, 1))?;
        a.mulps(d[3], xmm2)?;
        a.subps(d[2], d[3])?;
        a.subps(xmm7, d[2])?;
        a.movaps(d[2], xmm7)?;

        // xmm7 = Z' = |C|*B - A*adj(D#C).
        a.movaps(xmm7, xmm4)?;
        a.shufps(xmm7, xmm7, bcast(2))?;
        a.mulps(xmm7, xmm1)?;
        a.movaps(xmm1, xmm5)?;
        a.shufps(xmm1, xmm1, swz(3, 0, 3, 0))?;
        a.mulps(xmm1, xmm0)?;
        a.movaps(xmm2, xmm0)?;
        a.shufps(xmm2, xmm2, swz(1, 0, 3, 2))?;
        a.movaps(xmm3, xmm5)?;
        a.shufps(xmm3, xmm3, swz(2, 1, 2, 1))?;
        a.mulps(xmm2, xmm3)?;
        a.subps(xmm1, xmm2)?;
        a.subps(xmm7, xmm1)?;

        // xmm0 = det(M) = |A||D| + |B||C| - sum(A#B * swizzled D#C).
        a.movaps(xmm0, xmm4)?;
        a.shufps(xmm0, xmm0, bcast(0))?;
        a.movaps(xmm1, xmm4)?;
        a.shufps(xmm1, xmm1, bcast(3))?;
        a.mulps(xmm0, xmm1)?;
        a.movaps(xmm1, xmm4)?;
        a.shufps(xmm1, xmm1, bcast(1))?;
        a.movaps(xmm2, xmm4)?;
        a.shufps(xmm2, xmm2, bcast(2))?;
        a.mulps(xmm1, xmm2)?;
        a.addps(xmm0, xmm1)?;
        a.movaps(xmm1, xmm5)?;
        a.shufps(xmm1, xmm1, swz(0, 2, 1, 3))?;
        a.mulps(xmm1, xmm6)?;
        a.movaps(xmm2, xmm1)?;
        a.shufps(xmm2, xmm2, swz(1, 0, 3, 2))?;
        a.addps(xmm1, xmm2)?;
        a.movaps(xmm2, xmm1)?;
        a.shufps(xmm2, xmm2, swz(2, 3, 0, 1))?;
        a.addps(xmm1, xmm2)?;
        a.subps(xmm0, xmm1)?;

        // xmm1 = (1,-1,-1,1) / det(M).
        a.mov(r9d, F32_ONE)?;
        a.movd(xmm1, r9d)?;
        a.mov(r9d, F32_NEG_ONE)?;
        a.movd(xmm2, r9d)?;
        a.shufps(xmm1, xmm2, bcast(0))?;
        a.shufps(xmm1, xmm1, swz(0, 2, 2, 0))?;
        a.divps(xmm1, xmm0)?;

        a.mulps(d[0], xmm1)?;
        a.mulps(d[1], xmm1)?;
        a.mulps(d[2], xmm1)?;
        a.mulps(xmm7, xmm1)?;

        // Interleave the scaled adjugate quarters back into columns.
        a.movaps(xmm0, d[0])?;
        a.movaps(xmm2, d[2])?;
        a.movaps(xmm3, d[1])?;
        a.shufps(d[0], xmm2, swz(3, 1, 3, 1))?;
        a.movaps(d[1], xmm0)?;
        a.shufps(d[1], xmm2, swz(2, 0, 2, 0))?;
        a.movaps(d[2], xmm7)?;
        a.shufps(d[2], xmm3, swz(3, 1, 3, 1))?;
        a.movaps(d[3], xmm7)?;
        a.shufps(d[3], xmm3, swz(2, 0, 2, 0))?;
        Ok(())
    }

    /// `reg` = 1 - P1[l1] - P1[l2], the diagonal form of one rotation lane.
    /// P1 lives in xmm2, the broadcast 1.0 in xmm7; `tmp` is clobbered.
    fn trs_diag(
        &mut self,
        reg: AsmRegisterXmm,
        tmp: AsmRegisterXmm,
        l1: u32,
        l2: u32,
    ) -> CodegenResult<()> {
        let a = &mut self.asm;
        a.movaps(reg, xmm7)?;
        a.movaps(tmp, xmm2)?;
        a.shufps(tmp, tmp, bcast(l1))?;
        a.subps(reg, tmp)?;
        a.movaps(tmp, xmm2)?;
        a.shufps(tmp, tmp, bcast(l2))?;
        a.subps(reg, tmp)?;
        Ok(())
    }

    /// `reg` = P2[l2] +/- P3[l3], the off-diagonal form. P2 in xmm3, P3 in
    /// xmm4; `tmp` is clobbered.
    fn trs_off_diag(
        &mut self,
        reg: AsmRegisterXmm,
        tmp: AsmRegisterXmm,
        l2: u32,
        l3: u32,
        add: bool,
    ) -> CodegenResult<()> {
        let a = &mut self.asm;
        a.movaps(reg, xmm3)?;
        a.shufps(reg, reg, bcast(l2))?;
        a.movaps(tmp, xmm4)?;
        a.shufps(tmp, tmp, bcast(l3))?;
        if add {
            a.addps(reg, tmp)?;
        } else {
            a.subps(reg, tmp)?;
        }
        Ok(())
    }

    /// dest = T(t) * R(q) * S(s), composed directly from the quaternion
    /// closed form without intermediate matrices.
    ///
    /// Parameter layout: t as (x,y,z,0), q as (x,y,z,w), s as (x,y,z,1),
    /// 48 bytes total. The quaternion is not normalized here; that is the
    /// builder's contract.
    pub fn translation_rotate_scale(&mut self, dest: Slot) -> CodegenResult<()> {
        let d = bank(dest);
        {
            let a = &mut self.asm;
            a.movaps(xmm5, xmmword_ptr(rcx))?;
            a.movaps(xmm0, xmmword_ptr(rcx + 16))?;
            a.movaps(xmm6, xmmword_ptr(rcx + 32))?;
            a.add(rcx, 48i32)?;

            // dq = q + q, then the three product vectors:
            //   P1 = dq*q           = (2xx, 2yy, 2zz, _)
            //   P2 = dq*q.yzxw      = (2xy, 2yz, 2zx, _)
            //   P3 = dq*broadcast(w) = (2xw, 2yw, 2zw, _)
            a.movaps(xmm1, xmm0)?;
            a.addps(xmm1, xmm0)?;
            a.movaps(xmm2, xmm0)?;
            a.mulps(xmm2, xmm1)?;
            a.movaps(xmm3, xmm0)?;
            a.shufps(xmm3, xmm3, swz(1, 2, 0, 3))?;
            a.mulps(xmm3, xmm1)?;
            a.movaps(xmm4, xmm0)?;
            a.shufps(xmm4, xmm4, bcast(3))?;
            a.mulps(xmm4, xmm1)?;
            a.mov(r9d, F32_ONE)?;
            a.movd(xmm7, r9d)?;
            a.shufps(xmm7, xmm7, bcast(0))?;
        }

        // Rotation columns, each scaled by the matching scale lane. v0/v1
        // accumulate in xmm0/xmm1 (q and dq are dead), v2 goes through d[3]
        // which is written last anyway.
        // col0 = (1-2yy-2zz, 2xy+2zw, 2zx-2yw, 0)
        self.trs_diag(xmm0, d[3], 1, 2)?;
        self.trs_off_diag(xmm1, d[3], 0, 2, true)?;
        self.trs_off_diag(d[0], d[3], 2, 1, false)?;
        self.trs_pack_column(d[0], 0)?;
        // col1 = (2xy-2zw, 1-2zz-2xx, 2yz+2xw, 0)
        self.trs_off_diag(xmm0, d[3], 0, 2, false)?;
        self.trs_diag(xmm1, d[3], 2, 0)?;
        self.trs_off_diag(d[1], d[3], 1, 0, true)?;
        self.trs_pack_column(d[1], 1)?;
        // col2 = (2zx+2yw, 2yz-2xw, 1-2xx-2yy, 0)
        self.trs_off_diag(xmm0, d[3], 2, 1, true)?;
        self.trs_off_diag(xmm1, d[3], 1, 0, false)?;
        self.trs_diag(d[2], d[3], 0, 1)?;
        self.trs_pack_column(d[2], 2)?;

        // col3 = t + (0,0,0,1).
        let a = &mut self.asm;
        a.movaps(xmm0, xmm5)?;
        a.xorps(xmm1, xmm1)?;
        a.shufps(xmm1, xmm7, bcast(0))?;
        a.shufps(xmm1, xmm1, swz(0, 1, 0, 3))?;
        a.addps(xmm0, xmm1)?;
        a.movaps(d[3], xmm0)?;
        Ok(())
    }

    /// Packs (xmm0[*], xmm1[*], col[*], 0) into `col`, scaled by lane `i` of
    /// the scale vector in xmm6. Clobbers xmm0 and xmm1.
    fn trs_pack_column(&mut self, col: AsmRegisterXmm, i: u32) -> CodegenResult<()> {
        let a = &mut self.asm;
        a.shufps(xmm0, xmm1, bcast(0))?;
        a.xorps(xmm1, xmm1)?;
        a.shufps(col, xmm1, bcast(0))?;
        a.shufps(xmm0, col, swz(0, 2, 0, 2))?;
        a.movaps(xmm1, xmm6)?;
        a.shufps(xmm1, xmm1, bcast(i))?;
        a.mulps(xmm0, xmm1)?;
        a.movaps(col, xmm0)?;
        Ok(())
    }
}
