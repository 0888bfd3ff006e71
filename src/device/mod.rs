//! Capture sessions
//!
//! A [`Device`] moves through three states: created, open and streaming. Creating one does no
//! I/O. [`Device::open`] acquires the descriptor and checks what the node can do,
//! [`Device::start_stream`] sets up the mmap buffer ring. Each state implies the previous one.
//!
//! Sessions created with a `buffer_count` of zero capture through `read()` instead of mmap
//! buffers. For those, starting and stopping the stream does nothing.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};

use crate::backend::{Backend, Handle, Kernel};
use crate::capability::DeviceInfo;
use crate::error::{Error, Result};
use crate::v4l2;

mod control;
mod crop;
mod format;
pub mod list;
mod stream;

pub use list::{device_info, device_info_with, devices, devices_with};
use stream::Stream;

/// Longest accepted device path, in bytes
pub const MAX_PATH_LEN: usize = 512;

/// How long [`Device::grab`] waits for a frame unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Video capture session
pub struct Device<B: Backend = Kernel> {
    backend: B,
    path: PathBuf,
    convert: bool,
    buffer_count: u32,
    timeout: Option<Duration>,

    // mapped buffers must go before the descriptor
    stream: Option<Stream<<B::Handle as Handle>::Mapping>>,
    handle: Option<B::Handle>,
    info: Option<DeviceInfo>,

    last_error: RefCell<Option<String>>,
}

impl Device<Kernel> {
    /// Returns a new, closed capture session
    ///
    /// # Arguments
    ///
    /// * `path` - Node path, e.g. /dev/video0
    /// * `convert` - Let libv4l2 emulate additional pixel formats (needs the `libv4l` feature)
    /// * `buffer_count` - Number of mmap buffers to stream with; zero captures through `read()`
    ///
    /// # Example
    ///
    /// ```
    /// use vcap::Device;
    /// let dev = Device::new("/dev/video0", false, 4);
    /// assert!(!dev.is_open());
    /// ```
    pub fn new<P: AsRef<Path>>(path: P, convert: bool, buffer_count: u32) -> Self {
        Device::with_backend(Kernel, path, convert, buffer_count)
    }
}

impl<B: Backend> Device<B> {
    /// Returns a new, closed capture session driven by `backend`
    pub fn with_backend<P: AsRef<Path>>(
        backend: B,
        path: P,
        convert: bool,
        buffer_count: u32,
    ) -> Self {
        Device {
            backend,
            path: path.as_ref().to_path_buf(),
            convert,
            buffer_count,
            timeout: Some(DEFAULT_TIMEOUT),
            stream: None,
            handle: None,
            info: None,
            last_error: RefCell::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Number of buffers this session was configured with
    pub fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    /// Number of buffers the driver granted, zero unless streaming
    pub fn active_buffers(&self) -> u32 {
        self.stream.as_ref().map_or(0, |s| s.len() as u32)
    }

    /// Frame wait used by [`Device::grab`]; `None` waits forever
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Message of the most recent failure of this session
    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    /// Node path and capabilities, as queried by [`Device::open`]
    pub fn info(&self) -> Result<&DeviceInfo> {
        let res = self.info.as_ref().ok_or(Error::NotOpen);
        self.record(res)
    }

    /// Opens the node and checks it supports the configured capture mode
    pub fn open(&mut self) -> Result<()> {
        let res = self.open_node();
        self.record(res)
    }

    /// Closes the node, stopping the stream first
    ///
    /// If the stream cannot be stopped the session stays open and streaming.
    pub fn close(&mut self) -> Result<()> {
        let res = self.close_node();
        self.record(res)
    }

    pub(crate) fn record<T>(&self, res: Result<T>) -> Result<T> {
        if let Err(e) = &res {
            *self.last_error.borrow_mut() = Some(e.to_string());
        }
        res
    }

    /// Records `e` and hands it back, for errors surfaced through cursors
    pub(crate) fn note(&self, e: Error) -> Error {
        *self.last_error.borrow_mut() = Some(e.to_string());
        e
    }

    pub(crate) fn handle(&self) -> Result<&B::Handle> {
        self.handle.as_ref().ok_or(Error::NotOpen)
    }

    fn open_node(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Err(Error::AlreadyOpen);
        }
        if self.path.as_os_str().len() > MAX_PATH_LEN {
            return Err(Error::InvalidArgument(format!(
                "device path is longer than {} bytes",
                MAX_PATH_LEN
            )));
        }
        if self.convert && !v4l2::supports_conversion() {
            warn!(
                "{}: format conversion needs the libv4l feature, ignoring",
                self.path.display()
            );
        }

        let handle = self
            .backend
            .open(&self.path, self.convert)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => Error::NotFound(self.path.display().to_string()),
                _ => Error::io("open", e),
            })?;

        // dropping the handle closes it on every early return below
        let caps = handle
            .query_caps()
            .map_err(|e| Error::io("VIDIOC_QUERYCAP", e))?;
        if !caps.can_capture() {
            return Err(Error::Unsupported("video capture".to_string()));
        }
        if self.buffer_count > 0 && !caps.can_stream() {
            return Err(Error::Unsupported("streaming I/O".to_string()));
        }
        if self.buffer_count == 0 && !caps.can_read() {
            return Err(Error::Unsupported("read I/O".to_string()));
        }

        debug!("{}: opened {} ({})", self.path.display(), caps.card, caps.driver);
        self.info = Some(DeviceInfo {
            path: self.path.clone(),
            capabilities: caps,
        });
        self.handle = Some(handle);
        Ok(())
    }

    fn close_node(&mut self) -> Result<()> {
        if self.handle.is_none() {
            return Err(Error::NotOpen);
        }
        if self.stream.is_some() {
            self.stop()?;
        }

        self.info = None;
        if let Some(handle) = self.handle.take() {
            handle.close().map_err(|e| Error::io("close", e))?;
        }
        debug!("{}: closed", self.path.display());
        Ok(())
    }
}

impl<B: Backend> Drop for Device<B> {
    fn drop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        // whatever is left over is released when the fields drop
        if let Err(e) = self.close_node() {
            warn!("{}: failed to close: {}", self.path.display(), e);
        }
    }
}
