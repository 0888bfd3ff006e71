use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::time::Duration;
use std::{io, path::Path};

use crate::v4l2::vidioc;

#[cfg(feature = "v4l-sys")]
mod detail {
    use crate::v4l2::vidioc;
    use crate::v4l_sys::*;
    use std::convert::TryInto;

    pub const CONVERSION: bool = true;

    pub unsafe fn open(
        path: *const std::os::raw::c_char,
        flags: i32,
        convert: bool,
    ) -> std::os::raw::c_int {
        let fd = libc::open(path, flags);
        if fd == -1 {
            return fd;
        }

        // libv4l2 takes over the descriptor; conversion stays off unless asked for
        let v4l2_flags = if convert {
            0
        } else {
            V4L2_DISABLE_CONVERSION as std::os::raw::c_int
        };
        let ret = v4l2_fd_open(fd, v4l2_flags);
        if ret == -1 {
            let err = *libc::__errno_location();
            libc::close(fd);
            *libc::__errno_location() = err;
        }
        ret
    }
    pub unsafe fn close(fd: std::os::raw::c_int) -> std::os::raw::c_int {
        v4l2_close(fd)
    }
    pub unsafe fn ioctl(
        fd: std::os::raw::c_int,
        request: vidioc::_IOC_TYPE,
        argp: *mut std::os::raw::c_void,
    ) -> std::os::raw::c_int {
        // libv4l expects `request` to be a u64, but this is not guaranteed on all platforms.
        #![allow(clippy::useless_conversion)]
        v4l2_ioctl(
            fd,
            request.try_into().expect("vidioc::_IOC_TYPE -> u64 failed"),
            argp,
        )
    }
    pub unsafe fn read(
        fd: std::os::raw::c_int,
        buf: *mut std::os::raw::c_void,
        len: usize,
    ) -> isize {
        #![allow(clippy::useless_conversion)]
        v4l2_read(fd, buf, len.try_into().expect("usize -> c size_t failed")) as isize
    }
    pub unsafe fn mmap(
        start: *mut std::os::raw::c_void,
        length: usize,
        prot: std::os::raw::c_int,
        flags: std::os::raw::c_int,
        fd: std::os::raw::c_int,
        offset: libc::off_t,
    ) -> *mut std::os::raw::c_void {
        #![allow(clippy::useless_conversion)]
        v4l2_mmap(
            start,
            length.try_into().expect("usize -> c size_t failed"),
            prot,
            flags,
            fd,
            offset as i64,
        )
    }
    pub unsafe fn munmap(start: *mut std::os::raw::c_void, length: usize) -> std::os::raw::c_int {
        v4l2_munmap(start, length.try_into().expect("usize -> c size_t failed"))
    }
}

#[cfg(feature = "v4l2-sys")]
mod detail {
    use crate::v4l2::vidioc;

    pub const CONVERSION: bool = false;

    pub unsafe fn open(
        path: *const std::os::raw::c_char,
        flags: i32,
        _convert: bool,
    ) -> std::os::raw::c_int {
        libc::open(path, flags)
    }
    pub unsafe fn close(fd: std::os::raw::c_int) -> std::os::raw::c_int {
        libc::close(fd)
    }
    pub unsafe fn ioctl(
        fd: std::os::raw::c_int,
        request: vidioc::_IOC_TYPE,
        argp: *mut std::os::raw::c_void,
    ) -> std::os::raw::c_int {
        /*
         * The libc crate declares ioctl() with different request types per platform.
         * syscall() takes the same arguments everywhere.
         * https://github.com/rust-lang/libc/issues/1036
         */
        libc::syscall(libc::SYS_ioctl, fd, request, argp) as std::os::raw::c_int
    }
    pub unsafe fn read(
        fd: std::os::raw::c_int,
        buf: *mut std::os::raw::c_void,
        len: usize,
    ) -> isize {
        libc::read(fd, buf, len)
    }
    pub unsafe fn mmap(
        start: *mut std::os::raw::c_void,
        length: usize,
        prot: std::os::raw::c_int,
        flags: std::os::raw::c_int,
        fd: std::os::raw::c_int,
        offset: libc::off_t,
    ) -> *mut std::os::raw::c_void {
        libc::mmap(start, length, prot, flags, fd, offset)
    }
    pub unsafe fn munmap(start: *mut std::os::raw::c_void, length: usize) -> std::os::raw::c_int {
        libc::munmap(start, length)
    }
}

/// Whether this build routes calls through libv4l2 and can convert pixel formats
pub const fn supports_conversion() -> bool {
    detail::CONVERSION
}

/// Opens a device node.
///
/// Returns the file descriptor on success.
/// In case of errors, the last OS error will be reported, aka errno on Linux.
///
/// # Arguments
///
/// * `path` - Path to the device node
/// * `flags` - Open flags
/// * `convert` - Let libv4l2 emulate additional pixel formats (only with the `libv4l` feature)
pub fn open<P: AsRef<Path>>(
    path: P,
    flags: i32,
    convert: bool,
) -> io::Result<std::os::raw::c_int> {
    let c_path = CString::new(path.as_ref().as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let fd = unsafe { detail::open(c_path.as_ptr(), flags, convert) };

    if fd == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(fd)
    }
}

/// Closes a previously opened descriptor.
///
/// In case of errors, the last OS error will be reported, aka errno on Linux.
pub fn close(fd: std::os::raw::c_int) -> io::Result<()> {
    let ret = unsafe { detail::close(fd) };

    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Issues an ioctl on a device descriptor.
///
/// In case of errors, the last OS error will be reported, aka errno on Linux.
///
/// # Arguments
///
/// * `fd` - File descriptor
/// * `request` - IO control code (see [`vidioc`])
/// * `argp` - Pointer to memory region holding the argument type
///
/// # Safety
///
/// `argp` must point to a valid instance of the type `request` encodes.
pub unsafe fn ioctl(
    fd: std::os::raw::c_int,
    request: vidioc::_IOC_TYPE,
    argp: *mut std::os::raw::c_void,
) -> io::Result<()> {
    let ret = detail::ioctl(fd, request, argp);

    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Reads up to `buf.len()` bytes of frame data.
///
/// Returns the number of bytes read.
pub fn read(fd: std::os::raw::c_int, buf: &mut [u8]) -> io::Result<usize> {
    let ret = unsafe {
        detail::read(
            fd,
            buf.as_mut_ptr() as *mut std::os::raw::c_void,
            buf.len(),
        )
    };

    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

/// Maps a region of device memory.
///
/// In case of errors, the last OS error will be reported, aka errno on Linux.
///
/// # Safety
///
/// Start must be a raw pointer. Thus, the entire function is unsafe.
pub unsafe fn mmap(
    start: *mut std::os::raw::c_void,
    length: usize,
    prot: std::os::raw::c_int,
    flags: std::os::raw::c_int,
    fd: std::os::raw::c_int,
    offset: libc::off_t,
) -> io::Result<*mut std::os::raw::c_void> {
    let ret = detail::mmap(start, length, prot, flags, fd, offset);
    if ret == libc::MAP_FAILED {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// Unmaps a region previously returned by [`mmap`].
///
/// # Safety
///
/// `start` and `length` must describe a live mapping.
pub unsafe fn munmap(start: *mut std::os::raw::c_void, length: usize) -> io::Result<()> {
    let ret = detail::munmap(start, length);
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Waits until the descriptor becomes readable.
///
/// Returns `false` if the timeout elapsed first. `None` waits forever.
pub fn poll_readable(fd: std::os::raw::c_int, timeout: Option<Duration>) -> io::Result<bool> {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout = match timeout {
        Some(timeout) => timeout.as_millis().min(i32::MAX as u128) as std::os::raw::c_int,
        None => -1,
    };

    match unsafe { libc::poll(&mut pollfd, 1, timeout) } {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(false),
        _ => Ok(true),
    }
}
