use bitflags::bitflags;
use std::path::{Path, PathBuf};
use std::fmt;

use crate::v4l_sys::*;

bitflags! {
    #[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Default)]
    /// Device capability flags
    pub struct Flags: u32 {
        const VIDEO_CAPTURE         = 0x00000001;
        const VIDEO_OUTPUT          = 0x00000002;
        const VIDEO_OVERLAY         = 0x00000004;
        const VBI_CAPTURE           = 0x00000010;
        const VBI_OUTPUT            = 0x00000020;
        const SLICED_VBI_CAPTURE    = 0x00000040;
        const SLICED_VBI_OUTPUT     = 0x00000080;
        const RDS_CAPTURE           = 0x00000100;
        const VIDEO_OUTPUT_OVERLAY  = 0x00000200;
        const HW_FREQ_SEEK          = 0x00000400;
        const RDS_OUTPUT            = 0x00000800;

        const VIDEO_CAPTURE_MPLANE  = 0x00001000;
        const VIDEO_OUTPUT_MPLANE   = 0x00002000;
        const VIDEO_M2M_MPLANE      = 0x00004000;
        const VIDEO_M2M             = 0x00008000;

        const TUNER                 = 0x00010000;
        const AUDIO                 = 0x00020000;
        const RADIO                 = 0x00040000;
        const MODULATOR             = 0x00080000;

        const SDR_CAPTURE           = 0x00100000;
        const EXT_PIX_FORMAT        = 0x00200000;
        const SDR_OUTPUT            = 0x00400000;
        const META_CAPTURE          = 0x00800000;

        const READ_WRITE            = 0x01000000;
        const ASYNC_IO              = 0x02000000;
        const STREAMING             = 0x04000000;
        const META_OUTPUT           = 0x08000000;

        const TOUCH                 = 0x10000000;

        const DEVICE_CAPS           = 0x80000000;
    }
}

impl From<u32> for Flags {
    fn from(flags: u32) -> Self {
        Self::from_bits_retain(flags)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Flags::VIDEO_CAPTURE, "Video Capture"),
            (Flags::VIDEO_CAPTURE_MPLANE, "Video Capture Multiplanar"),
            (Flags::VIDEO_OUTPUT, "Video Output"),
            (Flags::VIDEO_OUTPUT_MPLANE, "Video Output Multiplanar"),
            (Flags::VIDEO_M2M, "Video Memory-to-Memory"),
            (Flags::VIDEO_M2M_MPLANE, "Video Memory-to-Memory Multiplanar"),
            (Flags::VIDEO_OVERLAY, "Video Overlay"),
            (Flags::META_CAPTURE, "Metadata Capture"),
            (Flags::READ_WRITE, "Read/Write"),
            (Flags::ASYNC_IO, "Async I/O"),
            (Flags::STREAMING, "Streaming"),
            (Flags::EXT_PIX_FORMAT, "Extended Pix Format"),
            (Flags::DEVICE_CAPS, "Device Capabilities"),
        ];

        let mut prefix = "";
        let mut rest = *self;
        for (flag, name) in names {
            if rest.contains(flag) {
                write!(f, "{}{}", prefix, name)?;
                prefix = ", ";
                rest.remove(flag);
            }
        }

        if !rest.is_empty() {
            write!(f, "{}{:#x}", prefix, rest.bits())?;
        }
        Ok(())
    }
}

/// Decodes a NUL padded byte array filled in by the kernel
pub(crate) fn c_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Device capabilities
pub struct Capabilities {
    /// Driver name, e.g. uvc for usb video class devices
    pub driver: String,
    /// Card name
    pub card: String,
    /// Bus name, e.g. USB or PCI
    pub bus: String,
    /// Version number MAJOR.MINOR.PATCH
    pub version: (u8, u8, u8),

    /// Capabilities of the opened node
    pub flags: Flags,
}

impl Capabilities {
    /// Whether single-planar video capture is available
    pub fn can_capture(&self) -> bool {
        self.flags.contains(Flags::VIDEO_CAPTURE)
    }

    /// Whether mmap streaming I/O is available
    pub fn can_stream(&self) -> bool {
        self.flags.contains(Flags::STREAMING)
    }

    /// Whether read() I/O is available
    pub fn can_read(&self) -> bool {
        self.flags.contains(Flags::READ_WRITE)
    }
}

impl From<v4l2_capability> for Capabilities {
    fn from(cap: v4l2_capability) -> Self {
        // device_caps describes this node, capabilities the whole physical device
        let flags = if Flags::from(cap.capabilities).contains(Flags::DEVICE_CAPS) {
            cap.device_caps
        } else {
            cap.capabilities
        };

        Capabilities {
            driver: c_string(&cap.driver),
            card: c_string(&cap.card),
            bus: c_string(&cap.bus_info),
            version: (
                ((cap.version >> 16) & 0xff) as u8,
                ((cap.version >> 8) & 0xff) as u8,
                (cap.version & 0xff) as u8,
            ),
            flags: Flags::from(flags),
        }
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Driver      : {}", self.driver)?;
        writeln!(f, "Card        : {}", self.card)?;
        writeln!(f, "Bus         : {}", self.bus)?;
        writeln!(
            f,
            "Version     : {}.{}.{}",
            self.version.0, self.version.1, self.version.2
        )?;
        writeln!(f, "Capabilites : {}", self.flags)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A queried video device node
pub struct DeviceInfo {
    pub path: PathBuf,
    pub capabilities: Capabilities,
}

impl DeviceInfo {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the index of the node, e.g. 2 for /dev/video2
    pub fn index(&self) -> Option<usize> {
        let name = self.path.file_name()?.to_str()?;
        let digits = name.trim_start_matches(|c: char| !c.is_ascii_digit());
        digits.parse().ok()
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Path        : {}", self.path.display())?;
        write!(f, "{}", self.capabilities)
    }
}
