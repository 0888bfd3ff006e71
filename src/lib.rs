//! Handle-based video capture for Linux
//!
//! This crate wraps the video4linux2 capture interface in a small session API. A [`Device`]
//! negotiates formats, frame rates, controls and cropping, and delivers frames either from a
//! ring of memory-mapped driver buffers or through plain `read()` calls.
//!
//! Two backends are available, selected at build time:
//!
//! * `v4l2` (default): raw ioctls against the kernel
//! * `libv4l`: calls go through libv4l2, which can emulate extra pixel formats
//!
//! # Example
//!
//! ```no_run
//! use vcap::{Device, FormatId, FrameSize};
//!
//! # fn main() -> vcap::Result<()> {
//! let mut dev = Device::new("/dev/video0", false, 4);
//! dev.open()?;
//! dev.set_format(FormatId::Yuyv, FrameSize::new(640, 480))?;
//! dev.start_stream()?;
//!
//! let mut frame = vec![0u8; dev.image_size()?];
//! let len = dev.grab(&mut frame)?;
//! println!("captured {} bytes", len);
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "v4l-sys")]
pub use v4l_sys;

#[cfg(feature = "v4l2-sys")]
pub use v4l2_sys as v4l_sys;

#[cfg(all(feature = "v4l-sys", feature = "v4l2-sys"))]
compile_error!("the libv4l and v4l2 features are mutually exclusive");

pub mod v4l2;

pub mod backend;
pub use backend::{Backend, Kernel};

pub mod capability;
pub use capability::{Capabilities, DeviceInfo};

pub mod control;
pub use control::{ControlId, ControlInfo, ControlStatus, ControlType, MenuEntry, MenuItem};

pub mod crop;
pub use crop::Rect;

pub mod device;
pub use device::{device_info, devices, devices_with, Device};

pub mod enumerate;
pub use enumerate::{Cursor, Fetch};

mod error;
pub use error::{Error, Result};

pub mod format;
pub use format::{Format, FormatId, FormatInfo, FourCC, FrameSize};

pub mod frameinterval;
pub mod framesize;

pub mod memory;

pub mod rate;
pub use rate::{Fraction, FrameRate};

pub mod settings;
pub use settings::Settings;

#[cfg(test)]
mod mock;
