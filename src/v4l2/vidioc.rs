use std::mem::size_of;

use crate::v4l_sys::*;

#[cfg(not(target_env = "musl"))]
#[allow(non_camel_case_types)]
pub type _IOC_TYPE = std::os::raw::c_ulong;
#[cfg(target_env = "musl")]
#[allow(non_camel_case_types)]
pub type _IOC_TYPE = std::os::raw::c_int;

// linux ioctl.h
const NRSHIFT: u32 = 0;
const TYPESHIFT: u32 = NRSHIFT + 8;
const SIZESHIFT: u32 = TYPESHIFT + 8;
const DIRSHIFT: u32 = SIZESHIFT + 14;

const WRITE: u32 = 1;
const READ: u32 = 2;

/// Encodes a 'V' request number
const fn ioc(dir: u32, nr: u32, size: usize) -> _IOC_TYPE {
    ((dir << DIRSHIFT)
        | ((b'V' as u32) << TYPESHIFT)
        | (nr << NRSHIFT)
        | ((size as u32) << SIZESHIFT)) as _IOC_TYPE
}

const fn ior(nr: u32, size: usize) -> _IOC_TYPE {
    ioc(READ, nr, size)
}

const fn iow(nr: u32, size: usize) -> _IOC_TYPE {
    ioc(WRITE, nr, size)
}

const fn iowr(nr: u32, size: usize) -> _IOC_TYPE {
    ioc(READ | WRITE, nr, size)
}

pub const VIDIOC_QUERYCAP: _IOC_TYPE = ior(0, size_of::<v4l2_capability>());
pub const VIDIOC_ENUM_FMT: _IOC_TYPE = iowr(2, size_of::<v4l2_fmtdesc>());
pub const VIDIOC_G_FMT: _IOC_TYPE = iowr(4, size_of::<v4l2_format>());
pub const VIDIOC_S_FMT: _IOC_TYPE = iowr(5, size_of::<v4l2_format>());
pub const VIDIOC_REQBUFS: _IOC_TYPE = iowr(8, size_of::<v4l2_requestbuffers>());
pub const VIDIOC_QUERYBUF: _IOC_TYPE = iowr(9, size_of::<v4l2_buffer>());
pub const VIDIOC_QBUF: _IOC_TYPE = iowr(15, size_of::<v4l2_buffer>());
pub const VIDIOC_DQBUF: _IOC_TYPE = iowr(17, size_of::<v4l2_buffer>());
pub const VIDIOC_STREAMON: _IOC_TYPE = iow(18, size_of::<std::os::raw::c_int>());
pub const VIDIOC_STREAMOFF: _IOC_TYPE = iow(19, size_of::<std::os::raw::c_int>());
pub const VIDIOC_G_PARM: _IOC_TYPE = iowr(21, size_of::<v4l2_streamparm>());
pub const VIDIOC_S_PARM: _IOC_TYPE = iowr(22, size_of::<v4l2_streamparm>());
pub const VIDIOC_G_CTRL: _IOC_TYPE = iowr(27, size_of::<v4l2_control>());
pub const VIDIOC_S_CTRL: _IOC_TYPE = iowr(28, size_of::<v4l2_control>());
pub const VIDIOC_QUERYCTRL: _IOC_TYPE = iowr(36, size_of::<v4l2_queryctrl>());
pub const VIDIOC_QUERYMENU: _IOC_TYPE = iowr(37, size_of::<v4l2_querymenu>());
pub const VIDIOC_CROPCAP: _IOC_TYPE = iowr(58, size_of::<v4l2_cropcap>());
pub const VIDIOC_G_CROP: _IOC_TYPE = iowr(59, size_of::<v4l2_crop>());
pub const VIDIOC_S_CROP: _IOC_TYPE = iow(60, size_of::<v4l2_crop>());
pub const VIDIOC_ENUM_FRAMESIZES: _IOC_TYPE = iowr(74, size_of::<v4l2_frmsizeenum>());
pub const VIDIOC_ENUM_FRAMEINTERVALS: _IOC_TYPE = iowr(75, size_of::<v4l2_frmivalenum>());
