// Parameter blocks are the data half of a sequence: a flat argument buffer the
// generated code walks with a cursor register, consuming a fixed stride per opcode.
// The generated code reads vectors out of it with aligned 128-bit loads, so the
// backing storage is a Vec<u128> to guarantee 16-byte alignment, with a byte-level
// write cursor on top. Callers either fill blocks through SequenceBuilder or push
// values by hand in opcode order.

//! Growable 16-byte-aligned argument buffer for generated programs.

/// A parameter block: the runtime argument buffer one program invocation
/// consumes.
///
/// Values are appended in the order the opcode sequence consumes them. Each
/// opcode's parameters start on a 16-byte boundary; [`pad16`](Self::pad16)
/// closes out a partially filled group.
#[derive(Default)]
pub struct ParamBlock {
    words: Vec<u128>,
    len: usize,
}

impl ParamBlock {
    pub fn new() -> Self {
        ParamBlock::default()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Discards all contents, keeping the allocation.
    pub fn clear(&mut self) {
        self.words.clear();
        self.len = 0;
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        let needed = self.len + bytes.len();
        while self.words.len() * 16 < needed {
            self.words.push(0);
        }
        unsafe {
            let dst = (self.words.as_mut_ptr() as *mut u8).add(self.len);
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
        }
        self.len = needed;
    }

    /// Appends a raw 64-bit address.
    pub fn push_ptr(&mut self, addr: u64) {
        self.push_bytes(&addr.to_ne_bytes());
    }

    /// Appends the address of `ptr`.
    pub fn push_addr<T>(&mut self, ptr: *const T) {
        self.push_ptr(ptr as u64);
    }

    pub fn push_f32(&mut self, val: f32) {
        self.push_bytes(&val.to_ne_bytes());
    }

    /// Zero-pads to the next 16-byte boundary.
    pub fn pad16(&mut self) {
        let rem = self.len % 16;
        if rem != 0 {
            self.push_bytes(&[0u8; 16][..16 - rem]);
        }
    }

    /// Base address handed to [`CompiledProgram::run`](crate::CompiledProgram::run).
    ///
    /// Stays valid until the block is mutated or dropped.
    pub fn base_ptr(&self) -> *const u8 {
        self.words.as_ptr() as *const u8
    }
}
