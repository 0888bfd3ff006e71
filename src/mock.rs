//! Simulated driver for tests without hardware.

use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use crate::backend::{Backend, Dequeued, Handle};
use crate::capability::{self, Capabilities};
use crate::control::{self, ControlId, ControlType, MenuItem};
use crate::crop::{CropCapabilities, Rect};
use crate::format::{self, FormatId, FourCC, Format, FrameSize};
use crate::frameinterval::{self, FrameIntervalEnum};
use crate::framesize::{self, FrameSizeEnum};
use crate::rate::Fraction;

fn errno(code: i32) -> io::Error {
    io::Error::from_raw_os_error(code)
}

pub(crate) fn capabilities(flags: capability::Flags) -> Capabilities {
    Capabilities {
        driver: "mock".to_owned(),
        card: "Mock Camera".to_owned(),
        bus: "platform:mock".to_owned(),
        version: (6, 1, 0),
        flags,
    }
}

pub(crate) struct MockFormat {
    pub fourcc: FourCC,
    pub name: &'static str,
    pub sizes: Vec<FrameSizeEnum>,
}

pub(crate) struct MockControl {
    pub desc: control::Description,
    pub value: i32,
    /// Menu entries starting at `desc.minimum`; `None` is rejected by the driver
    pub menu: Vec<Option<MenuItem>>,
}

impl MockControl {
    fn new(id: ControlId, typ: u32, range: (i32, i32, i32), default: i32) -> Self {
        MockControl {
            desc: control::Description {
                id: id.cid(),
                typ,
                name: id.name().to_owned(),
                minimum: range.0,
                maximum: range.1,
                step: range.2,
                default,
                flags: control::Flags::empty(),
            },
            value: default,
            menu: Vec::new(),
        }
    }

    fn flags(mut self, flags: control::Flags) -> Self {
        self.desc.flags = flags;
        self
    }

    fn value(mut self, value: i32) -> Self {
        self.value = value;
        self
    }

    fn menu(mut self, menu: Vec<Option<MenuItem>>) -> Self {
        self.menu = menu;
        self
    }
}

/// Driver state shared between the backend and all handles it opened
pub(crate) struct State {
    /// Existing nodes; `None` capabilities make QUERYCAP fail
    pub nodes: Vec<(PathBuf, Option<Capabilities>)>,
    pub formats: Vec<MockFormat>,
    pub intervals: Vec<FrameIntervalEnum>,
    pub format: Format,
    pub interval: Fraction,
    pub controls: Vec<MockControl>,
    pub crop: Option<(CropCapabilities, Rect)>,
    /// Upper bound on granted buffers
    pub grant_limit: u32,

    /// Opens beyond this count fail with EIO
    pub fail_opens_after: Option<u32>,
    pub fail_enum_format_at: Option<u32>,
    pub fail_map_at: Option<u32>,
    pub fail_queue_at: Option<u32>,
    pub fail_stream_on: bool,
    pub fail_stream_off: bool,
    /// errno values returned by the next DQBUF calls
    pub dequeue_errors: VecDeque<i32>,
    /// errno values returned by the next read calls
    pub read_errors: VecDeque<i32>,
    /// Outcomes of the next poll calls; ready once drained
    pub poll_results: VecDeque<bool>,
    /// errno values returned by the next poll calls, ahead of `poll_results`
    pub poll_errors: VecDeque<i32>,

    pub opens: u32,
    pub closes: u32,
    pub open_handles: u32,
    pub granted: u32,
    pub live_mappings: u32,
    pub queued: VecDeque<u32>,
    pub streaming: bool,
    pub dequeues: u32,
    pub requeues: u32,
    pub reads: u32,
    pub polls: u32,
    pub format_sets: u32,
    pub released: u32,
}

impl State {
    fn bytes_per_pixel(fourcc: FourCC) -> u32 {
        match FormatId::from_fourcc(fourcc) {
            Some(FormatId::Rgb24) | Some(FormatId::Bgr24) => 3,
            Some(FormatId::Grey) => 1,
            _ => 2,
        }
    }

    fn negotiate(&self, request: &Format) -> Format {
        let chosen = self
            .formats
            .iter()
            .find(|f| f.fourcc == request.fourcc)
            .or_else(|| self.formats.first());
        let (fourcc, sizes) = match chosen {
            Some(f) => (f.fourcc, &f.sizes[..]),
            None => (request.fourcc, &[][..]),
        };

        let wanted = FrameSizeEnum::Discrete(request.frame_size());
        let size = if sizes.contains(&wanted) {
            request.frame_size()
        } else {
            sizes
                .iter()
                .find_map(|s| match s {
                    FrameSizeEnum::Discrete(s) => Some(*s),
                    _ => None,
                })
                .unwrap_or_else(|| request.frame_size())
        };

        let stride = size.width * Self::bytes_per_pixel(fourcc);
        Format {
            width: size.width,
            height: size.height,
            fourcc,
            stride,
            size: stride * size.height,
        }
    }

    fn control(&self, cid: u32) -> io::Result<&MockControl> {
        self.controls
            .iter()
            .find(|c| c.desc.id == cid)
            .ok_or_else(|| errno(libc::EINVAL))
    }

    fn crop(&self) -> io::Result<(CropCapabilities, Rect)> {
        self.crop.ok_or_else(|| errno(libc::ENODATA))
    }
}

impl Default for State {
    fn default() -> Self {
        let flags = capability::Flags::VIDEO_CAPTURE
            | capability::Flags::STREAMING
            | capability::Flags::READ_WRITE;
        let full = Rect::new(0, 0, 640, 480);

        let mut state = State {
            nodes: vec![(PathBuf::from("/dev/video0"), Some(capabilities(flags)))],
            formats: vec![
                MockFormat {
                    fourcc: FormatId::Rgb24.fourcc(),
                    name: "24-bit RGB 8-8-8",
                    sizes: vec![
                        FrameSizeEnum::Discrete(FrameSize::new(640, 480)),
                        FrameSizeEnum::Stepwise(framesize::Stepwise {
                            min_width: 16,
                            max_width: 1920,
                            step_width: 16,
                            min_height: 16,
                            max_height: 1080,
                            step_height: 16,
                        }),
                        FrameSizeEnum::Discrete(FrameSize::new(1280, 720)),
                    ],
                },
                MockFormat {
                    fourcc: FourCC::new(b"ZZZZ"),
                    name: "Vendor specific",
                    sizes: vec![FrameSizeEnum::Discrete(FrameSize::new(640, 480))],
                },
                MockFormat {
                    fourcc: FormatId::Yuyv.fourcc(),
                    name: "YUYV 4:2:2",
                    sizes: vec![FrameSizeEnum::Discrete(FrameSize::new(640, 480))],
                },
            ],
            intervals: vec![
                FrameIntervalEnum::Discrete(Fraction::new(1, 30)),
                FrameIntervalEnum::Stepwise(frameinterval::Stepwise {
                    min: Fraction::new(1, 60),
                    max: Fraction::new(1, 1),
                    step: Fraction::new(1, 60),
                }),
                FrameIntervalEnum::Discrete(Fraction::new(1, 15)),
            ],
            format: Format::new(0, 0, FourCC::default()),
            interval: Fraction::new(1, 30),
            controls: vec![
                MockControl::new(ControlId::Brightness, ControlType::Integer as u32, (0, 255, 1), 128)
                    .value(100),
                MockControl::new(ControlId::Contrast, ControlType::Integer as u32, (0, 255, 1), 32),
                MockControl::new(ControlId::Saturation, ControlType::Integer as u32, (0, 255, 1), 64)
                    .flags(control::Flags::DISABLED),
                MockControl::new(ControlId::Hue, ControlType::Integer as u32, (-180, 180, 1), 0)
                    .flags(control::Flags::READ_ONLY),
                MockControl::new(ControlId::DoWhiteBalance, ControlType::Button as u32, (0, 0, 0), 0),
                MockControl::new(ControlId::PowerLineFrequency, ControlType::Menu as u32, (0, 2, 1), 1)
                    .value(2)
                    .menu(vec![
                        Some(MenuItem::Name("Disabled".to_owned())),
                        Some(MenuItem::Name("50 Hz".to_owned())),
                        Some(MenuItem::Name("60 Hz".to_owned())),
                    ]),
                // 64 bit integer, not handled by this crate
                MockControl::new(ControlId::Sharpness, 5, (0, 10, 1), 3),
                MockControl::new(ControlId::ExposureAuto, ControlType::Menu as u32, (0, 3, 1), 3)
                    .menu(vec![
                        Some(MenuItem::Name("Auto Mode".to_owned())),
                        Some(MenuItem::Name("Manual Mode".to_owned())),
                        None,
                        Some(MenuItem::Name("Aperture Priority Mode".to_owned())),
                    ]),
                MockControl::new(ControlId::ExposureAbsolute, ControlType::Integer as u32, (1, 5000, 1), 166)
                    .flags(control::Flags::INACTIVE)
                    .value(300),
                MockControl::new(ControlId::AutoExposureBias, ControlType::IntegerMenu as u32, (0, 2, 1), 1)
                    .menu(vec![
                        Some(MenuItem::Value(-2000)),
                        Some(MenuItem::Value(0)),
                        Some(MenuItem::Value(2000)),
                    ]),
            ],
            crop: Some((
                CropCapabilities {
                    bounds: full,
                    default: full,
                },
                full,
            )),
            grant_limit: 32,

            fail_opens_after: None,
            fail_enum_format_at: None,
            fail_map_at: None,
            fail_queue_at: None,
            fail_stream_on: false,
            fail_stream_off: false,
            dequeue_errors: VecDeque::new(),
            read_errors: VecDeque::new(),
            poll_results: VecDeque::new(),
            poll_errors: VecDeque::new(),

            opens: 0,
            closes: 0,
            open_handles: 0,
            granted: 0,
            live_mappings: 0,
            queued: VecDeque::new(),
            streaming: false,
            dequeues: 0,
            requeues: 0,
            reads: 0,
            polls: 0,
            format_sets: 0,
            released: 0,
        };
        state.format = state.negotiate(&Format::new(640, 480, FormatId::Yuyv.fourcc()));
        state
    }
}

/// Backend whose handles all share one simulated driver
#[derive(Clone, Default)]
pub(crate) struct MockBackend {
    state: Rc<RefCell<State>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives access to the simulated driver; do not hold across device calls
    pub fn state(&self) -> RefMut<'_, State> {
        self.state.borrow_mut()
    }
}

impl Backend for MockBackend {
    type Handle = MockHandle;

    fn open(&self, path: &Path, _convert: bool) -> io::Result<MockHandle> {
        let mut state = self.state.borrow_mut();
        let caps = match state.nodes.iter().find(|(p, _)| p == path) {
            Some((_, caps)) => caps.clone(),
            None => return Err(errno(libc::ENOENT)),
        };
        if let Some(limit) = state.fail_opens_after {
            if state.opens >= limit {
                return Err(errno(libc::EIO));
            }
        }

        state.opens += 1;
        state.open_handles += 1;
        Ok(MockHandle {
            state: self.state.clone(),
            caps,
            open: true,
        })
    }

    fn nodes(&self) -> io::Result<Vec<PathBuf>> {
        let mut nodes: Vec<PathBuf> = self
            .state
            .borrow()
            .nodes
            .iter()
            .map(|(p, _)| p.clone())
            .collect();
        nodes.sort();
        Ok(nodes)
    }
}

/// Buffer contents are filled with `index + 1`
pub(crate) struct MockMapping {
    data: Vec<u8>,
    state: Rc<RefCell<State>>,
}

impl Deref for MockMapping {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for MockMapping {
    fn drop(&mut self) {
        self.state.borrow_mut().live_mappings -= 1;
    }
}

pub(crate) struct MockHandle {
    state: Rc<RefCell<State>>,
    caps: Option<Capabilities>,
    open: bool,
}

impl MockHandle {
    fn state(&self) -> RefMut<'_, State> {
        self.state.borrow_mut()
    }

    fn release(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        let mut state = self.state();
        state.closes += 1;
        state.open_handles -= 1;
        state.streaming = false;
        state.granted = 0;
        state.queued.clear();
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl Handle for MockHandle {
    type Mapping = MockMapping;

    fn query_caps(&self) -> io::Result<Capabilities> {
        self.caps.clone().ok_or_else(|| errno(libc::ENOTTY))
    }

    fn enum_format(&self, index: u32) -> io::Result<format::Description> {
        let state = self.state();
        if state.fail_enum_format_at == Some(index) {
            return Err(errno(libc::EIO));
        }
        let fmt = state
            .formats
            .get(index as usize)
            .ok_or_else(|| errno(libc::EINVAL))?;
        Ok(format::Description {
            index,
            flags: format::Flags::empty(),
            description: fmt.name.to_owned(),
            fourcc: fmt.fourcc,
        })
    }

    fn enum_frame_size(&self, fourcc: FourCC, index: u32) -> io::Result<FrameSizeEnum> {
        let state = self.state();
        state
            .formats
            .iter()
            .find(|f| f.fourcc == fourcc)
            .and_then(|f| f.sizes.get(index as usize))
            .copied()
            .ok_or_else(|| errno(libc::EINVAL))
    }

    fn enum_frame_interval(
        &self,
        fourcc: FourCC,
        size: FrameSize,
        index: u32,
    ) -> io::Result<FrameIntervalEnum> {
        let state = self.state();
        let known = state
            .formats
            .iter()
            .find(|f| f.fourcc == fourcc)
            .map(|f| f.sizes.contains(&FrameSizeEnum::Discrete(size)))
            .unwrap_or(false);
        if !known {
            return Err(errno(libc::EINVAL));
        }
        state
            .intervals
            .get(index as usize)
            .copied()
            .ok_or_else(|| errno(libc::EINVAL))
    }

    fn format(&self) -> io::Result<Format> {
        Ok(self.state().format)
    }

    fn set_format(&self, format: &Format) -> io::Result<Format> {
        let mut state = self.state();
        if state.streaming || state.granted > 0 {
            return Err(errno(libc::EBUSY));
        }
        state.format = state.negotiate(format);
        state.format_sets += 1;
        Ok(state.format)
    }

    fn interval(&self) -> io::Result<Fraction> {
        Ok(self.state().interval)
    }

    fn set_interval(&self, interval: Fraction) -> io::Result<()> {
        let mut state = self.state();
        let offered = FrameIntervalEnum::Discrete(interval);
        if !state.intervals.contains(&offered) {
            return Err(errno(libc::EINVAL));
        }
        state.interval = interval;
        Ok(())
    }

    fn query_control(&self, cid: u32) -> io::Result<control::Description> {
        Ok(self.state().control(cid)?.desc.clone())
    }

    fn query_menu(&self, cid: u32, index: u32, typ: ControlType) -> io::Result<MenuItem> {
        let state = self.state();
        let ctrl = state.control(cid)?;
        if !typ.is_menu() {
            return Err(errno(libc::EINVAL));
        }
        let slot = i64::from(index) - i64::from(ctrl.desc.minimum);
        usize::try_from(slot)
            .ok()
            .and_then(|slot| ctrl.menu.get(slot))
            .cloned()
            .flatten()
            .ok_or_else(|| errno(libc::EINVAL))
    }

    fn control(&self, cid: u32) -> io::Result<i32> {
        let state = self.state();
        let ctrl = state.control(cid)?;
        if ctrl.desc.flags.contains(control::Flags::WRITE_ONLY) {
            return Err(errno(libc::EACCES));
        }
        Ok(ctrl.value)
    }

    fn set_control(&self, cid: u32, value: i32) -> io::Result<()> {
        let mut state = self.state();
        let ctrl = state
            .controls
            .iter_mut()
            .find(|c| c.desc.id == cid)
            .ok_or_else(|| errno(libc::EINVAL))?;
        if ctrl.desc.flags.contains(control::Flags::READ_ONLY) {
            return Err(errno(libc::EACCES));
        }
        if value < ctrl.desc.minimum || value > ctrl.desc.maximum {
            return Err(errno(libc::ERANGE));
        }
        ctrl.value = value;
        Ok(())
    }

    fn crop_capabilities(&self) -> io::Result<CropCapabilities> {
        Ok(self.state().crop()?.0)
    }

    fn crop(&self) -> io::Result<Rect> {
        Ok(self.state().crop()?.1)
    }

    fn set_crop(&self, rect: Rect) -> io::Result<()> {
        let mut state = self.state();
        let (cap, _) = state.crop()?;
        let bounds = cap.bounds;
        let width = rect.width.min(bounds.width);
        let height = rect.height.min(bounds.height);
        let left = rect
            .left
            .clamp(bounds.left, bounds.left + (bounds.width - width) as i32);
        let top = rect
            .top
            .clamp(bounds.top, bounds.top + (bounds.height - height) as i32);
        state.crop = Some((cap, Rect::new(left, top, width, height)));
        Ok(())
    }

    fn request_buffers(&self, count: u32) -> io::Result<u32> {
        let mut state = self.state();
        if state.streaming {
            return Err(errno(libc::EBUSY));
        }
        if count == 0 {
            state.released += 1;
        }
        state.granted = count.min(state.grant_limit);
        state.queued.clear();
        Ok(state.granted)
    }

    fn map_buffer(&self, index: u32) -> io::Result<MockMapping> {
        let mut state = self.state();
        if index >= state.granted {
            return Err(errno(libc::EINVAL));
        }
        if state.fail_map_at == Some(index) {
            return Err(errno(libc::ENOMEM));
        }
        state.live_mappings += 1;
        let len = state.format.size as usize;
        Ok(MockMapping {
            data: vec![index as u8 + 1; len],
            state: self.state.clone(),
        })
    }

    fn queue_buffer(&self, index: u32) -> io::Result<()> {
        let mut state = self.state();
        if index >= state.granted {
            return Err(errno(libc::EINVAL));
        }
        if state.fail_queue_at == Some(index) {
            return Err(errno(libc::EIO));
        }
        if state.streaming {
            state.requeues += 1;
        }
        state.queued.push_back(index);
        Ok(())
    }

    fn dequeue_buffer(&self) -> io::Result<Dequeued> {
        let mut state = self.state();
        state.dequeues += 1;
        if let Some(code) = state.dequeue_errors.pop_front() {
            return Err(errno(code));
        }
        if !state.streaming {
            return Err(errno(libc::EINVAL));
        }
        let index = state.queued.pop_front().ok_or_else(|| errno(libc::EAGAIN))?;
        Ok(Dequeued {
            index,
            bytesused: state.format.size,
        })
    }

    fn stream_on(&self) -> io::Result<()> {
        let mut state = self.state();
        if state.fail_stream_on || state.queued.is_empty() {
            return Err(errno(libc::EIO));
        }
        state.streaming = true;
        Ok(())
    }

    fn stream_off(&self) -> io::Result<()> {
        let mut state = self.state();
        if state.fail_stream_off {
            return Err(errno(libc::EIO));
        }
        state.streaming = false;
        state.queued.clear();
        Ok(())
    }

    fn poll(&self, _timeout: Option<Duration>) -> io::Result<bool> {
        let mut state = self.state();
        state.polls += 1;
        if let Some(code) = state.poll_errors.pop_front() {
            return Err(errno(code));
        }
        Ok(state.poll_results.pop_front().unwrap_or(true))
    }

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        state.reads += 1;
        if let Some(code) = state.read_errors.pop_front() {
            return Err(errno(code));
        }
        let len = buf.len().min(state.format.size as usize);
        buf[..len].fill(0xab);
        Ok(len)
    }

    fn close(mut self) -> io::Result<()> {
        self.release();
        Ok(())
    }
}
