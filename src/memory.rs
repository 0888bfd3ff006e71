use std::{io, ops::Deref, os::raw::c_int, ptr::NonNull, slice};

use log::warn;

use crate::v4l2;

/// Memory-mapped driver buffer
///
/// The backing memory is owned by the driver and mapped into this process so frames can be
/// copied out of it. The mapping is read-only from our side.
///
/// The destructor automatically unmaps the memory.
pub struct Mmap {
    ptr: NonNull<u8>,
    len: usize,
}

// The mapping is plain memory owned by this value alone.
unsafe impl Send for Mmap {}

impl Mmap {
    /// Maps `len` bytes of the buffer at `offset` of the device behind `fd`
    pub(crate) fn map(fd: c_int, len: usize, offset: u32) -> io::Result<Self> {
        let ptr = unsafe {
            v4l2::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                offset as libc::off_t,
            )?
        };

        NonNull::new(ptr as *mut u8)
            .map(|ptr| Mmap { ptr, len })
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned a null pointer"))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for Mmap {
    fn drop(&mut self) {
        let ret = unsafe { v4l2::munmap(self.ptr.as_ptr() as *mut std::os::raw::c_void, self.len) };
        if let Err(e) = ret {
            warn!("failed to unmap buffer of {} bytes: {}", self.len, e);
        }
    }
}

impl Deref for Mmap {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}
