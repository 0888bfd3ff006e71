use std::io;

use log::debug;

use crate::backend::{Backend, Handle};
use crate::crop::Rect;
use crate::device::Device;
use crate::error::{Error, Result};

fn crop_error(op: &'static str, e: io::Error) -> Error {
    match e.raw_os_error() {
        Some(libc::EINVAL) | Some(libc::ENODATA) | Some(libc::ENOTTY) => {
            Error::Unsupported("cropping".to_string())
        }
        _ => Error::io(op, e),
    }
}

impl<B: Backend> Device<B> {
    /// Largest valid crop rectangle
    pub fn crop_bounds(&self) -> Result<Rect> {
        let res = self.handle().and_then(|h| {
            h.crop_capabilities()
                .map(|cap| cap.bounds)
                .map_err(|e| crop_error("VIDIOC_CROPCAP", e))
        });
        self.record(res)
    }

    /// Active crop rectangle
    pub fn crop(&self) -> Result<Rect> {
        let res = self
            .handle()
            .and_then(|h| h.crop().map_err(|e| crop_error("VIDIOC_G_CROP", e)));
        self.record(res)
    }

    /// Sets the crop rectangle; the driver may adjust it to fit
    pub fn set_crop(&mut self, rect: Rect) -> Result<()> {
        let res = self.apply_crop(rect);
        self.record(res)
    }

    /// Restores the driver's default crop rectangle
    pub fn reset_crop(&mut self) -> Result<()> {
        let res = self
            .handle()
            .and_then(|h| {
                h.crop_capabilities()
                    .map_err(|e| crop_error("VIDIOC_CROPCAP", e))
            })
            .and_then(|cap| self.apply_crop(cap.default));
        self.record(res)
    }

    fn apply_crop(&self, rect: Rect) -> Result<()> {
        self.handle()?
            .set_crop(rect)
            .map_err(|e| crop_error("VIDIOC_S_CROP", e))?;
        debug!("{}: crop set to {}", self.path.display(), rect);
        Ok(())
    }
}
