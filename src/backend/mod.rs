//! Driver access
//!
//! A [`Device`](crate::Device) never talks to the kernel directly. It goes through a [`Backend`]
//! which opens nodes and hands out [`Handle`]s, one per open descriptor. Every method on a handle
//! is a single driver request; sequencing, validation and state live in the session.
//!
//! [`Kernel`] is the real V4L2 backend.

use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capability::Capabilities;
use crate::control::{self, ControlType, MenuItem};
use crate::crop::{CropCapabilities, Rect};
use crate::format::{self, FourCC, Format, FrameSize};
use crate::frameinterval::FrameIntervalEnum;
use crate::framesize::FrameSizeEnum;
use crate::rate::Fraction;

pub mod kernel;
pub use kernel::{Kernel, KernelHandle};

/// Opens device nodes
pub trait Backend {
    type Handle: Handle;

    /// Opens the node at `path` for non-blocking capture
    ///
    /// `convert` asks for driver-side format emulation where the backend supports it.
    fn open(&self, path: &Path, convert: bool) -> io::Result<Self::Handle>;

    /// Lists candidate capture nodes, sorted
    fn nodes(&self) -> io::Result<Vec<PathBuf>>;
}

/// A buffer dequeued from the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dequeued {
    pub index: u32,
    /// Payload size reported by the driver
    pub bytesused: u32,
}

/// An open device descriptor
///
/// Index based queries fail with `EINVAL` once the index is past the end.
pub trait Handle {
    /// Driver buffer mapped into this process; unmapped on drop
    type Mapping: Deref<Target = [u8]>;

    fn query_caps(&self) -> io::Result<Capabilities>;

    fn enum_format(&self, index: u32) -> io::Result<format::Description>;
    fn enum_frame_size(&self, fourcc: FourCC, index: u32) -> io::Result<FrameSizeEnum>;
    fn enum_frame_interval(
        &self,
        fourcc: FourCC,
        size: FrameSize,
        index: u32,
    ) -> io::Result<FrameIntervalEnum>;

    fn format(&self) -> io::Result<Format>;
    /// Applies `format` and returns what the driver actually chose
    fn set_format(&self, format: &Format) -> io::Result<Format>;

    /// Time per frame
    fn interval(&self) -> io::Result<Fraction>;
    fn set_interval(&self, interval: Fraction) -> io::Result<()>;

    fn query_control(&self, cid: u32) -> io::Result<control::Description>;
    fn query_menu(&self, cid: u32, index: u32, typ: ControlType) -> io::Result<MenuItem>;
    fn control(&self, cid: u32) -> io::Result<i32>;
    fn set_control(&self, cid: u32, value: i32) -> io::Result<()>;

    fn crop_capabilities(&self) -> io::Result<CropCapabilities>;
    fn crop(&self) -> io::Result<Rect>;
    fn set_crop(&self, rect: Rect) -> io::Result<()>;

    /// Requests `count` mmap buffers and returns how many were granted
    fn request_buffers(&self, count: u32) -> io::Result<u32>;
    fn map_buffer(&self, index: u32) -> io::Result<Self::Mapping>;
    fn queue_buffer(&self, index: u32) -> io::Result<()>;
    fn dequeue_buffer(&self) -> io::Result<Dequeued>;
    fn stream_on(&self) -> io::Result<()>;
    fn stream_off(&self) -> io::Result<()>;

    /// Waits until a frame can be read; `false` if `timeout` elapsed first
    fn poll(&self, timeout: Option<Duration>) -> io::Result<bool>;
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Releases the descriptor
    fn close(self) -> io::Result<()>;
}
