use std::convert::TryFrom;
use std::fmt;

use crate::capability::c_string;
use crate::error::Error;
use crate::v4l_sys::*;

const USER_BASE: u32 = 0x0098_0900;
const CAMERA_BASE: u32 = 0x009a_0900;

macro_rules! controls {
    ($($id:ident => $cid:expr, $name:literal;)*) => {
        /// Device controls known to this crate
        ///
        /// The set is closed: only these identifiers are enumerated, and a raw control id
        /// outside of it is rejected before reaching the driver.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ControlId {
            $($id,)*
        }

        impl ControlId {
            /// All known identifiers, in enumeration order
            pub const ALL: &'static [ControlId] = &[$(ControlId::$id,)*];

            /// Kernel control id (V4L2_CID_*)
            pub const fn cid(self) -> u32 {
                match self {
                    $(ControlId::$id => $cid,)*
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(ControlId::$id => $name,)*
                }
            }
        }

        impl TryFrom<u32> for ControlId {
            type Error = Error;

            fn try_from(cid: u32) -> Result<Self, Self::Error> {
                $(if cid == $cid {
                    return Ok(ControlId::$id);
                })*
                Err(Error::InvalidArgument(format!("unknown control id {:#x}", cid)))
            }
        }
    };
}

controls! {
    Brightness => USER_BASE, "Brightness";
    Contrast => USER_BASE + 1, "Contrast";
    Saturation => USER_BASE + 2, "Saturation";
    Hue => USER_BASE + 3, "Hue";
    AutoWhiteBalance => USER_BASE + 12, "White Balance, Automatic";
    DoWhiteBalance => USER_BASE + 13, "Do White Balance";
    RedBalance => USER_BASE + 14, "Red Balance";
    BlueBalance => USER_BASE + 15, "Blue Balance";
    Gamma => USER_BASE + 16, "Gamma";
    Exposure => USER_BASE + 17, "Exposure";
    AutoGain => USER_BASE + 18, "Gain, Automatic";
    Gain => USER_BASE + 19, "Gain";
    HorizontalFlip => USER_BASE + 20, "Horizontal Flip";
    VerticalFlip => USER_BASE + 21, "Vertical Flip";
    PowerLineFrequency => USER_BASE + 24, "Power Line Frequency";
    HueAuto => USER_BASE + 25, "Hue, Automatic";
    WhiteBalanceTemperature => USER_BASE + 26, "White Balance Temperature";
    Sharpness => USER_BASE + 27, "Sharpness";
    BacklightCompensation => USER_BASE + 28, "Backlight Compensation";
    ChromaAgc => USER_BASE + 29, "Chroma AGC";
    ColorKiller => USER_BASE + 30, "Color Killer";
    ColorEffects => USER_BASE + 31, "Color Effects";
    AutoBrightness => USER_BASE + 32, "Brightness, Automatic";
    BandStopFilter => USER_BASE + 33, "Band-Stop Filter";
    Rotate => USER_BASE + 34, "Rotate";
    BackgroundColor => USER_BASE + 35, "Background Color";
    ChromaGain => USER_BASE + 36, "Chroma Gain";
    Illuminator1 => USER_BASE + 37, "Illuminator 1";
    Illuminator2 => USER_BASE + 38, "Illuminator 2";
    ExposureAuto => CAMERA_BASE + 1, "Auto Exposure";
    ExposureAbsolute => CAMERA_BASE + 2, "Exposure Time, Absolute";
    ExposureAutoPriority => CAMERA_BASE + 3, "Exposure, Dynamic Framerate";
    PanRelative => CAMERA_BASE + 4, "Pan, Relative";
    TiltRelative => CAMERA_BASE + 5, "Tilt, Relative";
    PanReset => CAMERA_BASE + 6, "Pan, Reset";
    TiltReset => CAMERA_BASE + 7, "Tilt, Reset";
    PanAbsolute => CAMERA_BASE + 8, "Pan, Absolute";
    TiltAbsolute => CAMERA_BASE + 9, "Tilt, Absolute";
    FocusAbsolute => CAMERA_BASE + 10, "Focus, Absolute";
    FocusRelative => CAMERA_BASE + 11, "Focus, Relative";
    FocusAuto => CAMERA_BASE + 12, "Focus, Automatic Continuous";
    ZoomAbsolute => CAMERA_BASE + 13, "Zoom, Absolute";
    ZoomRelative => CAMERA_BASE + 14, "Zoom, Relative";
    ZoomContinuous => CAMERA_BASE + 15, "Zoom, Continuous";
    Privacy => CAMERA_BASE + 16, "Privacy";
    IrisAbsolute => CAMERA_BASE + 17, "Iris, Absolute";
    IrisRelative => CAMERA_BASE + 18, "Iris, Relative";
    AutoExposureBias => CAMERA_BASE + 19, "Auto Exposure, Bias";
    WhiteBalancePreset => CAMERA_BASE + 20, "White Balance, Auto & Preset";
    WideDynamicRange => CAMERA_BASE + 21, "Wide Dynamic Range";
    ImageStabilization => CAMERA_BASE + 22, "Image Stabilization";
    IsoSensitivity => CAMERA_BASE + 23, "ISO Sensitivity";
    IsoSensitivityAuto => CAMERA_BASE + 24, "ISO Sensitivity, Auto";
    ExposureMetering => CAMERA_BASE + 25, "Exposure, Metering Mode";
    SceneMode => CAMERA_BASE + 26, "Scene Mode";
    AutoFocusRange => CAMERA_BASE + 31, "Auto Focus, Range";
    PanSpeed => CAMERA_BASE + 32, "Pan, Speed";
    TiltSpeed => CAMERA_BASE + 33, "Tilt, Speed";
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Control data types this crate can read and write
#[allow(clippy::unreadable_literal)]
#[rustfmt::skip]
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControlType {
    Integer         = 1,
    Boolean         = 2,
    Menu            = 3,
    Button          = 4,
    IntegerMenu     = 9,
}

impl ControlType {
    pub fn is_menu(self) -> bool {
        matches!(self, ControlType::Menu | ControlType::IntegerMenu)
    }
}

impl TryFrom<u32> for ControlType {
    type Error = u32;

    fn try_from(repr: u32) -> Result<Self, Self::Error> {
        match repr {
            1 => Ok(Self::Integer),
            2 => Ok(Self::Boolean),
            3 => Ok(Self::Menu),
            4 => Ok(Self::Button),
            9 => Ok(Self::IntegerMenu),
            repr => Err(repr),
        }
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

bitflags::bitflags! {
    #[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Default)]
    /// Raw control flags as reported by the driver
    pub struct Flags: u32 {
        const DISABLED              = 0x0001;
        const GRABBED               = 0x0002;
        const READ_ONLY             = 0x0004;
        const UPDATE                = 0x0008;
        const INACTIVE              = 0x0010;
        const SLIDER                = 0x0020;
        const WRITE_ONLY            = 0x0040;
        const VOLATILE              = 0x0080;
        const HAS_PAYLOAD           = 0x0100;
        const EXECUTE_ON_WRITE      = 0x0200;
        const MODIFY_LAYOUT         = 0x0400;
    }
}

impl From<u32> for Flags {
    fn from(flags: u32) -> Self {
        Self::from_bits_retain(flags)
    }
}

bitflags::bitflags! {
    #[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Default)]
    /// Current availability of a control
    ///
    /// An empty set means the control can be read and written right now.
    pub struct ControlStatus: u32 {
        const READ_ONLY     = 0x01;
        const WRITE_ONLY    = 0x02;
        const DISABLED      = 0x04;
        /// Depends on another control, e.g. manual exposure while auto exposure is on
        const INACTIVE      = 0x08;
    }
}

impl ControlStatus {
    pub fn is_ok(&self) -> bool {
        self.is_empty()
    }
}

impl From<Flags> for ControlStatus {
    fn from(flags: Flags) -> Self {
        let mut status = ControlStatus::empty();
        // grabbed controls are temporarily read-only
        status.set(
            ControlStatus::READ_ONLY,
            flags.intersects(Flags::READ_ONLY | Flags::GRABBED),
        );
        status.set(ControlStatus::WRITE_ONLY, flags.contains(Flags::WRITE_ONLY));
        status.set(ControlStatus::DISABLED, flags.contains(Flags::DISABLED));
        status.set(ControlStatus::INACTIVE, flags.contains(Flags::INACTIVE));
        status
    }
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "ok");
        }
        let mut prefix = "";
        for (name, _) in self.iter_names() {
            write!(f, "{}{}", prefix, name.to_lowercase().replace('_', "-"))?;
            prefix = ", ";
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Control description as returned by [`crate::v4l2::vidioc::VIDIOC_QUERYCTRL`]
pub struct Description {
    pub id: u32,
    /// Raw type, see [`ControlType`]
    pub typ: u32,
    pub name: String,
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default: i32,
    pub flags: Flags,
}

impl From<v4l2_queryctrl> for Description {
    fn from(ctrl: v4l2_queryctrl) -> Self {
        Self {
            id: ctrl.id,
            typ: ctrl.type_,
            name: c_string(&ctrl.name),
            minimum: ctrl.minimum,
            maximum: ctrl.maximum,
            step: ctrl.step,
            default: ctrl.default_value,
            flags: Flags::from(ctrl.flags),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Device control descriptor
pub struct ControlInfo {
    pub id: ControlId,
    /// Name of the control, as reported by the driver
    pub name: String,
    pub typ: ControlType,
    /// Minimum value, inclusive
    pub minimum: i32,
    /// Maximum value, inclusive
    pub maximum: i32,
    /// Step size, always positive
    pub step: i32,
    pub default_value: i32,
    pub read_only: bool,
}

impl ControlInfo {
    /// Builds the descriptor; `None` for types this crate does not handle
    pub(crate) fn new(id: ControlId, desc: &Description) -> Option<Self> {
        let typ = ControlType::try_from(desc.typ).ok()?;
        Some(ControlInfo {
            id,
            name: desc.name.clone(),
            typ,
            minimum: desc.minimum,
            maximum: desc.maximum,
            step: desc.step,
            default_value: desc.default,
            read_only: desc.flags.contains(Flags::READ_ONLY),
        })
    }
}

impl fmt::Display for ControlInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ID         : {:#x}", self.id.cid())?;
        writeln!(f, "Type       : {}", self.typ)?;
        writeln!(f, "Name       : {}", self.name)?;
        writeln!(f, "Minimum    : {}", self.minimum)?;
        writeln!(f, "Maximum    : {}", self.maximum)?;
        writeln!(f, "Step       : {}", self.step)?;
        writeln!(f, "Default    : {}", self.default_value)?;
        writeln!(f, "Read only  : {}", self.read_only)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Device control menu item
pub enum MenuItem {
    Name(String),
    Value(i64),
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Name(name) => write!(f, "{}", name),
            MenuItem::Value(value) => write!(f, "{}", value),
        }
    }
}

impl TryFrom<(ControlType, v4l2_querymenu)> for MenuItem {
    type Error = ();

    fn try_from(item: (ControlType, v4l2_querymenu)) -> Result<Self, Self::Error> {
        // copy out of the packed union before looking at it
        let menu = item.1;
        match item.0 {
            ControlType::Menu => {
                let name = unsafe { menu.__bindgen_anon_1.name };
                Ok(MenuItem::Name(c_string(&name)))
            }
            ControlType::IntegerMenu => Ok(MenuItem::Value(unsafe { menu.__bindgen_anon_1.value })),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One entry of a menu control
pub struct MenuEntry {
    /// Value to pass to `set_control` to select this entry
    pub index: u32,
    pub item: MenuItem,
}

impl fmt::Display for MenuEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.index, self.item)
    }
}
