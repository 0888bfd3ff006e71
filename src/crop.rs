use std::fmt;

use crate::v4l_sys::*;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Rectangle in sensor coordinates
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Rect {
            left,
            top,
            width,
            height,
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width, self.height, self.left, self.top
        )
    }
}

impl From<v4l2_rect> for Rect {
    fn from(rect: v4l2_rect) -> Self {
        Self {
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
        }
    }
}

impl From<Rect> for v4l2_rect {
    fn from(rect: Rect) -> Self {
        Self {
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Cropping limits as returned by [`crate::v4l2::vidioc::VIDIOC_CROPCAP`]
pub struct CropCapabilities {
    /// Largest valid crop rectangle
    pub bounds: Rect,
    /// Rectangle covering the whole picture, used when cropping is reset
    pub default: Rect,
}

impl From<v4l2_cropcap> for CropCapabilities {
    fn from(cap: v4l2_cropcap) -> Self {
        Self {
            bounds: Rect::from(cap.bounds),
            default: Rect::from(cap.defrect),
        }
    }
}
