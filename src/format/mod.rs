use serde::{Deserialize, Serialize};
use std::{fmt, mem};

use crate::v4l_sys::*;

pub mod description;
pub use description::{Description, Flags};

pub mod fourcc;
pub use fourcc::FourCC;

macro_rules! formats {
    ($($id:ident => $code:literal, $name:literal;)*) => {
        /// Pixel encodings known to this crate
        ///
        /// Every identifier maps to exactly one four character code.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum FormatId {
            $($id,)*
        }

        impl FormatId {
            /// All known identifiers, in table order
            pub const ALL: &'static [FormatId] = &[$(FormatId::$id,)*];

            /// Four character code used at the kernel boundary
            pub const fn fourcc(self) -> FourCC {
                match self {
                    $(FormatId::$id => FourCC::new($code),)*
                }
            }

            /// Short human readable name
            pub const fn name(self) -> &'static str {
                match self {
                    $(FormatId::$id => $name,)*
                }
            }

            /// Looks up the identifier for a four character code
            pub fn from_fourcc(fourcc: FourCC) -> Option<Self> {
                match &fourcc.repr {
                    $($code => Some(FormatId::$id),)*
                    _ => None,
                }
            }
        }
    };
}

formats! {
    Rgb332 => b"RGB1", "RGB332";
    Rgb444 => b"R444", "RGB444";
    Argb444 => b"AR12", "ARGB444";
    Rgb555 => b"RGBO", "RGB555";
    Rgb565 => b"RGBP", "RGB565";
    Rgb555x => b"RGBQ", "RGB555X";
    Rgb565x => b"RGBR", "RGB565X";
    Bgr666 => b"BGRH", "BGR666";
    Bgr24 => b"BGR3", "BGR24";
    Rgb24 => b"RGB3", "RGB24";
    Bgr32 => b"BGR4", "BGR32";
    Rgb32 => b"RGB4", "RGB32";
    Abgr32 => b"AR24", "ABGR32";
    Xbgr32 => b"XR24", "XBGR32";
    Grey => b"GREY", "GREY";
    Y10 => b"Y10 ", "Y10";
    Y12 => b"Y12 ", "Y12";
    Y16 => b"Y16 ", "Y16";
    Yuyv => b"YUYV", "YUYV";
    Yyuv => b"YYUV", "YYUV";
    Yvyu => b"YVYU", "YVYU";
    Uyvy => b"UYVY", "UYVY";
    Vyuy => b"VYUY", "VYUY";
    Y41p => b"Y41P", "Y41P";
    Yuv444 => b"Y444", "YUV444";
    Yuv555 => b"YUVO", "YUV555";
    Yuv565 => b"YUVP", "YUV565";
    Yuv32 => b"YUV4", "YUV32";
    Yuv410 => b"YUV9", "YUV410";
    Yvu410 => b"YVU9", "YVU410";
    Yuv420 => b"YU12", "YUV420";
    Yvu420 => b"YV12", "YVU420";
    Yuv422p => b"422P", "YUV422P";
    Yuv411p => b"411P", "YUV411P";
    Nv12 => b"NV12", "NV12";
    Nv21 => b"NV21", "NV21";
    Nv16 => b"NV16", "NV16";
    Nv61 => b"NV61", "NV61";
    Nv24 => b"NV24", "NV24";
    Nv42 => b"NV42", "NV42";
    Sbggr8 => b"BA81", "SBGGR8";
    Sgbrg8 => b"GBRG", "SGBRG8";
    Sgrbg8 => b"GRBG", "SGRBG8";
    Srggb8 => b"RGGB", "SRGGB8";
    Sbggr16 => b"BYR2", "SBGGR16";
    Mjpeg => b"MJPG", "MJPEG";
    Jpeg => b"JPEG", "JPEG";
    Dv => b"dvsd", "DV";
    Mpeg => b"MPEG", "MPEG";
    H263 => b"H263", "H263";
    H264 => b"H264", "H264";
    Hevc => b"HEVC", "HEVC";
    Mpeg1 => b"MPG1", "MPEG1";
    Mpeg2 => b"MPG2", "MPEG2";
    Mpeg4 => b"MPG4", "MPEG4";
    Xvid => b"XVID", "XVID";
    Vp8 => b"VP80", "VP8";
    Vp9 => b"VP90", "VP9";
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Frame dimensions in pixels
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        FrameSize { width, height }
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A pixel format offered by a device
pub struct FormatInfo {
    pub id: FormatId,
    pub fourcc: FourCC,
    /// Description reported by the driver
    pub name: String,
    pub flags: Flags,
}

impl fmt::Display for FormatInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.fourcc)?;
        if self.flags.contains(Flags::EMULATED) {
            write!(f, " [emulated]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Active capture format (single-planar)
pub struct Format {
    /// width in pixels
    pub width: u32,
    /// height in pixels
    pub height: u32,
    /// pixelformat code
    pub fourcc: FourCC,
    /// bytes per line
    pub stride: u32,
    /// maximum number of bytes required to store an image
    pub size: u32,
}

impl Format {
    /// Returns a format request; stride and size are filled in by the driver
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        Format {
            width,
            height,
            fourcc,
            stride: 0,
            size: 0,
        }
    }

    pub const fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "width          : {}", self.width)?;
        writeln!(f, "height         : {}", self.height)?;
        writeln!(f, "fourcc         : {}", self.fourcc)?;
        writeln!(f, "stride         : {}", self.stride)?;
        writeln!(f, "size           : {}", self.size)?;
        Ok(())
    }
}

impl From<v4l2_pix_format> for Format {
    fn from(fmt: v4l2_pix_format) -> Self {
        Self {
            width: fmt.width,
            height: fmt.height,
            fourcc: FourCC::from(fmt.pixelformat),
            stride: fmt.bytesperline,
            size: fmt.sizeimage,
        }
    }
}

impl From<Format> for v4l2_pix_format {
    fn from(format: Format) -> Self {
        Self {
            width: format.width,
            height: format.height,
            pixelformat: format.fourcc.into(),
            field: v4l2_field_V4L2_FIELD_ANY,
            bytesperline: format.stride,
            sizeimage: format.size,
            ..unsafe { mem::zeroed() }
        }
    }
}
