// Executable memory lifecycle. Generated code is staged in a private anonymous mapping
// while writable, copied in, then flipped read-execute with mprotect so the region is
// never writable and executable at the same time. On x86-64 the protection transition
// also serializes instruction fetch, so no separate icache flush is needed. The region
// owns its mapping and munmaps it exactly once on drop.

//! W^X executable memory region for generated code.

use crate::error::{CodegenError, CodegenResult};

/// An immutable, executable copy of a machine-code buffer.
pub struct ExecutableRegion {
    ptr: *mut u8,
    code_len: usize,
    map_len: usize,
}

impl ExecutableRegion {
    /// Maps `code` into fresh executable memory.
    ///
    /// The bytes are copied into a read-write anonymous mapping rounded up to
    /// whole pages, then the mapping is made read-execute. On any failure the
    /// partial mapping is released before the error is returned.
    pub fn map(code: &[u8]) -> CodegenResult<Self> {
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let map_len = code.len().div_ceil(page).max(1) * page;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(CodegenError::ExecMap { size: map_len });
        }
        let ptr = ptr as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(code.as_ptr(), ptr, code.len());
            if libc::mprotect(
                ptr as *mut libc::c_void,
                map_len,
                libc::PROT_READ | libc::PROT_EXEC,
            ) != 0
            {
                libc::munmap(ptr as *mut libc::c_void, map_len);
                return Err(CodegenError::ExecProtect { size: map_len });
            }
        }

        Ok(ExecutableRegion {
            ptr,
            code_len: code.len(),
            map_len,
        })
    }

    /// Base address of the executable code.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// Length of the machine code, not the page-rounded mapping.
    pub fn code_len(&self) -> usize {
        self.code_len
    }
}

impl Drop for ExecutableRegion {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.map_len);
        }
    }
}

// The mapping is never written after the RX transition.
unsafe impl Send for ExecutableRegion {}
unsafe impl Sync for ExecutableRegion {}
