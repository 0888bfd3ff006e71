use std::convert::TryFrom;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io, mem};

use log::{debug, warn};

use crate::backend::{Backend, Dequeued, Handle};
use crate::capability::Capabilities;
use crate::control::{self, ControlType, MenuItem};
use crate::crop::{CropCapabilities, Rect};
use crate::format::{self, FourCC, Format, FrameSize};
use crate::frameinterval::FrameIntervalEnum;
use crate::framesize::FrameSizeEnum;
use crate::memory::Mmap;
use crate::rate::Fraction;
use crate::v4l2;
use crate::v4l_sys::*;

const CAPTURE: u32 = v4l2_buf_type_V4L2_BUF_TYPE_VIDEO_CAPTURE;
const MEMORY_MMAP: u32 = v4l2_memory_V4L2_MEMORY_MMAP;

/// Real video4linux backend
#[derive(Debug, Default, Clone, Copy)]
pub struct Kernel;

impl Backend for Kernel {
    type Handle = KernelHandle;

    fn open(&self, path: &Path, convert: bool) -> io::Result<KernelHandle> {
        let meta = fs::metadata(path)?;
        if !meta.file_type().is_char_device() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a character device", path.display()),
            ));
        }

        let fd = v4l2::open(path, libc::O_RDWR | libc::O_NONBLOCK, convert)?;
        debug!("opened {} as fd {}", path.display(), fd);
        Ok(KernelHandle { fd })
    }

    fn nodes(&self) -> io::Result<Vec<PathBuf>> {
        let mut nodes = Vec::new();
        for entry in fs::read_dir("/dev")? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with("video") {
                nodes.push(entry.path());
            }
        }

        nodes.sort();
        Ok(nodes)
    }
}

/// Open device descriptor
///
/// The descriptor is closed on drop unless [`Handle::close`] already did.
#[derive(Debug)]
pub struct KernelHandle {
    fd: std::os::raw::c_int,
}

impl KernelHandle {
    fn ioctl<T>(&self, request: v4l2::vidioc::_IOC_TYPE, arg: &mut T) -> io::Result<()> {
        unsafe {
            v4l2::ioctl(
                self.fd,
                request,
                arg as *mut T as *mut std::os::raw::c_void,
            )
        }
    }

    fn buffer(&self, index: u32) -> v4l2_buffer {
        v4l2_buffer {
            index,
            type_: CAPTURE,
            memory: MEMORY_MMAP,
            ..unsafe { mem::zeroed() }
        }
    }

    fn set_streaming(&self, request: v4l2::vidioc::_IOC_TYPE) -> io::Result<()> {
        let mut typ = CAPTURE as std::os::raw::c_int;
        self.ioctl(request, &mut typ)
    }
}

impl Drop for KernelHandle {
    fn drop(&mut self) {
        if self.fd < 0 {
            return;
        }
        if let Err(e) = v4l2::close(self.fd) {
            warn!("failed to close fd {}: {}", self.fd, e);
        }
    }
}

fn invalid_data(e: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

impl Handle for KernelHandle {
    type Mapping = Mmap;

    fn query_caps(&self) -> io::Result<Capabilities> {
        let mut v4l2_caps: v4l2_capability = unsafe { mem::zeroed() };
        self.ioctl(v4l2::vidioc::VIDIOC_QUERYCAP, &mut v4l2_caps)?;
        Ok(Capabilities::from(v4l2_caps))
    }

    fn enum_format(&self, index: u32) -> io::Result<format::Description> {
        let mut v4l2_fmt = v4l2_fmtdesc {
            index,
            type_: CAPTURE,
            ..unsafe { mem::zeroed() }
        };
        self.ioctl(v4l2::vidioc::VIDIOC_ENUM_FMT, &mut v4l2_fmt)?;
        Ok(format::Description::from(v4l2_fmt))
    }

    fn enum_frame_size(&self, fourcc: FourCC, index: u32) -> io::Result<FrameSizeEnum> {
        let mut v4l2_struct = v4l2_frmsizeenum {
            index,
            pixel_format: fourcc.into(),
            ..unsafe { mem::zeroed() }
        };
        self.ioctl(v4l2::vidioc::VIDIOC_ENUM_FRAMESIZES, &mut v4l2_struct)?;
        FrameSizeEnum::try_from(v4l2_struct).map_err(invalid_data)
    }

    fn enum_frame_interval(
        &self,
        fourcc: FourCC,
        size: FrameSize,
        index: u32,
    ) -> io::Result<FrameIntervalEnum> {
        let mut v4l2_struct = v4l2_frmivalenum {
            index,
            pixel_format: fourcc.into(),
            width: size.width,
            height: size.height,
            ..unsafe { mem::zeroed() }
        };
        self.ioctl(v4l2::vidioc::VIDIOC_ENUM_FRAMEINTERVALS, &mut v4l2_struct)?;
        FrameIntervalEnum::try_from(v4l2_struct).map_err(invalid_data)
    }

    fn format(&self) -> io::Result<Format> {
        let mut v4l2_fmt = v4l2_format {
            type_: CAPTURE,
            ..unsafe { mem::zeroed() }
        };
        self.ioctl(v4l2::vidioc::VIDIOC_G_FMT, &mut v4l2_fmt)?;
        Ok(Format::from(unsafe { v4l2_fmt.fmt.pix }))
    }

    fn set_format(&self, format: &Format) -> io::Result<Format> {
        let mut v4l2_fmt = v4l2_format {
            type_: CAPTURE,
            fmt: v4l2_format__bindgen_ty_1 {
                pix: (*format).into(),
            },
        };
        self.ioctl(v4l2::vidioc::VIDIOC_S_FMT, &mut v4l2_fmt)?;
        Ok(Format::from(unsafe { v4l2_fmt.fmt.pix }))
    }

    fn interval(&self) -> io::Result<Fraction> {
        let mut v4l2_params = v4l2_streamparm {
            type_: CAPTURE,
            ..unsafe { mem::zeroed() }
        };
        self.ioctl(v4l2::vidioc::VIDIOC_G_PARM, &mut v4l2_params)?;
        Ok(Fraction::from(unsafe { v4l2_params.parm.capture.timeperframe }))
    }

    fn set_interval(&self, interval: Fraction) -> io::Result<()> {
        let mut v4l2_params = v4l2_streamparm {
            type_: CAPTURE,
            parm: v4l2_streamparm__bindgen_ty_1 {
                capture: v4l2_captureparm {
                    timeperframe: interval.into(),
                    ..unsafe { mem::zeroed() }
                },
            },
        };
        self.ioctl(v4l2::vidioc::VIDIOC_S_PARM, &mut v4l2_params)
    }

    fn query_control(&self, cid: u32) -> io::Result<control::Description> {
        let mut v4l2_ctrl = v4l2_queryctrl {
            id: cid,
            ..unsafe { mem::zeroed() }
        };
        self.ioctl(v4l2::vidioc::VIDIOC_QUERYCTRL, &mut v4l2_ctrl)?;
        Ok(control::Description::from(v4l2_ctrl))
    }

    fn query_menu(&self, cid: u32, index: u32, typ: ControlType) -> io::Result<MenuItem> {
        let mut v4l2_menu = v4l2_querymenu {
            id: cid,
            index,
            ..unsafe { mem::zeroed() }
        };
        self.ioctl(v4l2::vidioc::VIDIOC_QUERYMENU, &mut v4l2_menu)?;
        MenuItem::try_from((typ, v4l2_menu)).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} controls have no menu", typ),
            )
        })
    }

    fn control(&self, cid: u32) -> io::Result<i32> {
        let mut v4l2_ctrl = v4l2_control { id: cid, value: 0 };
        self.ioctl(v4l2::vidioc::VIDIOC_G_CTRL, &mut v4l2_ctrl)?;
        Ok(v4l2_ctrl.value)
    }

    fn set_control(&self, cid: u32, value: i32) -> io::Result<()> {
        let mut v4l2_ctrl = v4l2_control { id: cid, value };
        self.ioctl(v4l2::vidioc::VIDIOC_S_CTRL, &mut v4l2_ctrl)
    }

    fn crop_capabilities(&self) -> io::Result<CropCapabilities> {
        let mut v4l2_cropcap = v4l2_cropcap {
            type_: CAPTURE,
            ..unsafe { mem::zeroed() }
        };
        self.ioctl(v4l2::vidioc::VIDIOC_CROPCAP, &mut v4l2_cropcap)?;
        Ok(CropCapabilities::from(v4l2_cropcap))
    }

    fn crop(&self) -> io::Result<Rect> {
        let mut v4l2_crop = v4l2_crop {
            type_: CAPTURE,
            ..unsafe { mem::zeroed() }
        };
        self.ioctl(v4l2::vidioc::VIDIOC_G_CROP, &mut v4l2_crop)?;
        Ok(Rect::from(v4l2_crop.c))
    }

    fn set_crop(&self, rect: Rect) -> io::Result<()> {
        let mut v4l2_crop = v4l2_crop {
            type_: CAPTURE,
            c: rect.into(),
        };
        self.ioctl(v4l2::vidioc::VIDIOC_S_CROP, &mut v4l2_crop)
    }

    fn request_buffers(&self, count: u32) -> io::Result<u32> {
        let mut v4l2_reqbufs = v4l2_requestbuffers {
            count,
            type_: CAPTURE,
            memory: MEMORY_MMAP,
            ..unsafe { mem::zeroed() }
        };
        self.ioctl(v4l2::vidioc::VIDIOC_REQBUFS, &mut v4l2_reqbufs)?;
        Ok(v4l2_reqbufs.count)
    }

    fn map_buffer(&self, index: u32) -> io::Result<Mmap> {
        let mut v4l2_buf = self.buffer(index);
        self.ioctl(v4l2::vidioc::VIDIOC_QUERYBUF, &mut v4l2_buf)?;
        let offset = unsafe { v4l2_buf.m.offset };
        Mmap::map(self.fd, v4l2_buf.length as usize, offset)
    }

    fn queue_buffer(&self, index: u32) -> io::Result<()> {
        let mut v4l2_buf = self.buffer(index);
        self.ioctl(v4l2::vidioc::VIDIOC_QBUF, &mut v4l2_buf)
    }

    fn dequeue_buffer(&self) -> io::Result<Dequeued> {
        let mut v4l2_buf = self.buffer(0);
        self.ioctl(v4l2::vidioc::VIDIOC_DQBUF, &mut v4l2_buf)?;
        Ok(Dequeued {
            index: v4l2_buf.index,
            bytesused: v4l2_buf.bytesused,
        })
    }

    fn stream_on(&self) -> io::Result<()> {
        self.set_streaming(v4l2::vidioc::VIDIOC_STREAMON)
    }

    fn stream_off(&self) -> io::Result<()> {
        self.set_streaming(v4l2::vidioc::VIDIOC_STREAMOFF)
    }

    fn poll(&self, timeout: Option<Duration>) -> io::Result<bool> {
        v4l2::poll_readable(self.fd, timeout)
    }

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        v4l2::read(self.fd, buf)
    }

    fn close(mut self) -> io::Result<()> {
        let fd = mem::replace(&mut self.fd, -1);
        debug!("closing fd {}", fd);
        v4l2::close(fd)
    }
}
