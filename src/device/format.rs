use std::io;

use log::{debug, warn};

use crate::backend::{Backend, Handle};
use crate::device::Device;
use crate::enumerate::{Cursor, Fetch};
use crate::error::{is_out_of_range, Error, Result};
use crate::format::{Format, FormatId, FormatInfo, FrameSize};
use crate::frameinterval::FrameIntervalEnum;
use crate::framesize::FrameSizeEnum;
use crate::rate::{Fraction, FrameRate};

impl<B: Backend> Device<B> {
    /// Maps a failed index query to the end of the sequence or a recorded error
    pub(super) fn fetch_error<T>(&self, op: &'static str, e: io::Error) -> Fetch<T> {
        if is_out_of_range(&e) {
            Fetch::Invalid
        } else {
            Fetch::Error(self.note(Error::io(op, e)))
        }
    }

    /// Runs `cursor` against the open handle, or returns a failed cursor
    pub(super) fn cursor<'a, T, F>(&'a self, fetch: F) -> Cursor<'a, T>
    where
        F: FnMut(&'a B::Handle, u32) -> Fetch<T> + 'a,
    {
        match self.handle() {
            Ok(handle) => {
                let mut fetch = fetch;
                Cursor::new(move |index| fetch(handle, index))
            }
            Err(e) => Cursor::failed(self.note(e)),
        }
    }

    /// Active format as reported by the driver, including stride and image size
    pub fn raw_format(&self) -> Result<Format> {
        let res = self
            .handle()
            .and_then(|h| h.format().map_err(|e| Error::io("VIDIOC_G_FMT", e)));
        self.record(res)
    }

    /// Active pixel format and frame size
    pub fn format(&self) -> Result<(FormatId, FrameSize)> {
        let res = self.raw_format().and_then(|fmt| {
            FormatId::from_fourcc(fmt.fourcc)
                .map(|id| (id, fmt.frame_size()))
                .ok_or_else(|| Error::NotFound(format!("pixel format {}", fmt.fourcc)))
        });
        self.record(res)
    }

    /// Applies a pixel format and frame size
    ///
    /// Drivers may refuse a new format on a configured descriptor, so an open node is closed
    /// and the node is (re)opened before the format is applied. A closed session ends up open.
    /// A streaming session is restarted afterwards, even when the driver rejected the format.
    ///
    /// If reopening or restarting fails, the session is left closed.
    pub fn set_format(&mut self, id: FormatId, size: FrameSize) -> Result<()> {
        let res = self.apply_format(id, size);
        self.record(res)
    }

    fn apply_format(&mut self, id: FormatId, size: FrameSize) -> Result<()> {
        let was_streaming = self.is_streaming();

        if self.is_open() {
            self.close_node()?;
        }
        self.open_node()?;

        let applied = self.write_format(id, size);

        if was_streaming {
            if let Err(e) = self.start() {
                if let Err(close) = self.close_node() {
                    warn!("{}: failed to close: {}", self.path.display(), close);
                }
                return Err(e);
            }
        }
        applied
    }

    fn write_format(&self, id: FormatId, size: FrameSize) -> Result<()> {
        let request = Format::new(size.width, size.height, id.fourcc());
        let applied = self
            .handle()?
            .set_format(&request)
            .map_err(|e| Error::io("VIDIOC_S_FMT", e))?;
        if applied.fourcc != request.fourcc || applied.frame_size() != size {
            return Err(Error::Unsupported(format!("{} at {}", id, size)));
        }
        debug!(
            "{}: format set to {} {} ({} bytes per frame)",
            self.path.display(),
            id,
            size,
            applied.size
        );
        Ok(())
    }

    pub(super) fn image_size_of(&self, handle: &B::Handle) -> Result<usize> {
        let fmt = handle
            .format()
            .map_err(|e| Error::io("VIDIOC_G_FMT", e))?;
        Ok(fmt.size as usize)
    }

    /// Number of bytes one frame of the active format occupies
    pub fn image_size(&self) -> Result<usize> {
        let res = self.handle().and_then(|h| self.image_size_of(h));
        self.record(res)
    }

    /// Pixel formats the device offers
    ///
    /// Formats without a [`FormatId`] are skipped.
    pub fn formats(&self) -> Cursor<'_, FormatInfo> {
        self.cursor(move |handle, index| match handle.enum_format(index) {
            Ok(desc) => match FormatId::from_fourcc(desc.fourcc) {
                Some(id) => Fetch::Item(FormatInfo {
                    id,
                    fourcc: desc.fourcc,
                    name: desc.description,
                    flags: desc.flags,
                }),
                None => Fetch::Disabled,
            },
            Err(e) => self.fetch_error("VIDIOC_ENUM_FMT", e),
        })
    }

    /// Looks up the device's description of `id`
    pub fn format_info(&self, id: FormatId) -> Result<FormatInfo> {
        let res = self.formats().into_vec().and_then(|formats| {
            formats
                .into_iter()
                .find(|f| f.id == id)
                .ok_or_else(|| Error::NotFound(format!("pixel format {}", id)))
        });
        self.record(res)
    }

    /// Discrete frame sizes offered for `id`
    ///
    /// Stepwise and continuous ranges are not listed.
    pub fn sizes(&self, id: FormatId) -> Cursor<'_, FrameSize> {
        let fourcc = id.fourcc();
        self.cursor(move |handle, index| match handle.enum_frame_size(fourcc, index) {
            Ok(FrameSizeEnum::Discrete(size)) => Fetch::Item(size),
            Ok(FrameSizeEnum::Stepwise(_)) => Fetch::Disabled,
            Err(e) => self.fetch_error("VIDIOC_ENUM_FRAMESIZES", e),
        })
    }

    /// Discrete frame rates offered for `id` at `size`
    ///
    /// Stepwise and continuous ranges are not listed.
    pub fn rates(&self, id: FormatId, size: FrameSize) -> Cursor<'_, FrameRate> {
        let fourcc = id.fourcc();
        self.cursor(
            move |handle, index| match handle.enum_frame_interval(fourcc, size, index) {
                Ok(FrameIntervalEnum::Discrete(interval)) => Fetch::Item(FrameRate::from(interval)),
                Ok(FrameIntervalEnum::Stepwise(_)) => Fetch::Disabled,
                Err(e) => self.fetch_error("VIDIOC_ENUM_FRAMEINTERVALS", e),
            },
        )
    }

    /// Active frame rate
    pub fn rate(&self) -> Result<FrameRate> {
        let res = self.handle().and_then(|h| {
            h.interval()
                .map(FrameRate::from)
                .map_err(|e| Error::io("VIDIOC_G_PARM", e))
        });
        self.record(res)
    }

    pub fn set_rate(&mut self, rate: FrameRate) -> Result<()> {
        let res = self.apply_rate(rate);
        self.record(res)
    }

    fn apply_rate(&mut self, rate: FrameRate) -> Result<()> {
        if rate.numerator == 0 || rate.denominator == 0 {
            return Err(Error::InvalidArgument(format!(
                "frame rate {}/{} is not representable",
                rate.numerator, rate.denominator
            )));
        }
        self.handle()?
            .set_interval(Fraction::from(rate))
            .map_err(|e| Error::io("VIDIOC_S_PARM", e))?;
        debug!("{}: frame rate set to {}", self.path.display(), rate);
        Ok(())
    }
}
