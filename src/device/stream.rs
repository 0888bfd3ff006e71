use std::io;
use std::ops::Deref;
use std::time::Duration;

use log::{debug, trace, warn};

use crate::backend::{Backend, Handle};
use crate::device::Device;
use crate::error::{is_transient, Error, Result};

/// Mapped buffer ring of a streaming session
///
/// Dropping the ring unmaps every buffer. Releasing the buffers on the driver side is up to the
/// owner.
pub(crate) struct Stream<M> {
    buffers: Vec<M>,
}

impl<M: Deref<Target = [u8]>> Stream<M> {
    /// Requests, maps and queues `count` buffers, then starts streaming
    ///
    /// On failure nothing stays mapped and the driver's buffers are released.
    fn start<H: Handle<Mapping = M>>(handle: &H, count: u32) -> Result<Self> {
        let granted = handle
            .request_buffers(count)
            .map_err(|e| Error::io("VIDIOC_REQBUFS", e))?;
        if granted == 0 {
            return Err(Error::NoBuffers);
        }
        debug!("driver granted {} of {} buffers", granted, count);

        Self::setup(handle, granted).map_err(|e| {
            release(handle);
            e
        })
    }

    fn setup<H: Handle<Mapping = M>>(handle: &H, granted: u32) -> Result<Self> {
        // anything mapped so far is unmapped when the vector drops on error
        let buffers = (0..granted)
            .map(|index| handle.map_buffer(index))
            .collect::<io::Result<Vec<_>>>()
            .map_err(|e| Error::io("mmap", e))?;

        for index in 0..granted {
            handle
                .queue_buffer(index)
                .map_err(|e| Error::io("VIDIOC_QBUF", e))?;
        }

        handle
            .stream_on()
            .map_err(|e| Error::io("VIDIOC_STREAMON", e))?;
        Ok(Stream { buffers })
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Copies the head of buffer `index` into `out`
    fn copy(&self, index: u32, out: &mut [u8]) -> Result<()> {
        let buf = self.buffers.get(index as usize).ok_or_else(|| {
            Error::io(
                "VIDIOC_DQBUF",
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("driver returned unknown buffer {}", index),
                ),
            )
        })?;
        if buf.len() < out.len() {
            return Err(Error::io(
                "VIDIOC_DQBUF",
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("buffer {} holds {} bytes, need {}", index, buf.len(), out.len()),
                ),
            ));
        }

        out.copy_from_slice(&buf[..out.len()]);
        Ok(())
    }
}

/// Frees the driver side buffers, best effort
fn release<H: Handle>(handle: &H) {
    if let Err(e) = handle.request_buffers(0) {
        warn!("failed to release driver buffers: {}", e);
    }
}

impl<B: Backend> Device<B> {
    /// Starts mmap streaming
    ///
    /// The driver may grant fewer buffers than configured, see [`Device::active_buffers`].
    /// Does nothing for read mode sessions.
    pub fn start_stream(&mut self) -> Result<()> {
        let res = self.start();
        self.record(res)
    }

    /// Stops mmap streaming and frees all buffers
    ///
    /// If the driver refuses to stop, the session keeps streaming with its buffers intact.
    /// Does nothing for read mode sessions.
    pub fn stop_stream(&mut self) -> Result<()> {
        let res = if self.handle.is_none() {
            Err(Error::NotOpen)
        } else if self.buffer_count == 0 {
            Ok(())
        } else if self.stream.is_none() {
            Err(Error::NotStreaming)
        } else {
            self.stop()
        };
        self.record(res)
    }

    pub(super) fn start(&mut self) -> Result<()> {
        let handle = self.handle()?;
        if self.buffer_count == 0 {
            return Ok(());
        }
        if self.stream.is_some() {
            return Err(Error::AlreadyStreaming);
        }

        let stream = Stream::start(handle, self.buffer_count)?;
        debug!(
            "{}: streaming with {} buffers",
            self.path.display(),
            stream.len()
        );
        self.stream = Some(stream);
        Ok(())
    }

    pub(super) fn stop(&mut self) -> Result<()> {
        let handle = self.handle()?;
        if self.stream.is_none() {
            return Ok(());
        }

        handle
            .stream_off()
            .map_err(|e| Error::io("VIDIOC_STREAMOFF", e))?;
        self.stream = None;
        if let Some(handle) = &self.handle {
            release(handle);
        }
        debug!("{}: stream stopped", self.path.display());
        Ok(())
    }

    /// Captures one frame into `out`
    ///
    /// `out` must be exactly [`Device::image_size`] bytes long. Returns the payload size the
    /// driver reported, which may be smaller for compressed formats.
    ///
    /// Waits up to [`Device::timeout`] for a frame and fails with [`Error::Timeout`] if none
    /// arrives.
    pub fn grab(&mut self, out: &mut [u8]) -> Result<usize> {
        let res = self.grab_frame(out);
        self.record(res)
    }

    fn grab_frame(&self, out: &mut [u8]) -> Result<usize> {
        let handle = self.handle()?;
        let size = self.image_size_of(handle)?;
        if out.len() != size {
            return Err(Error::InvalidArgument(format!(
                "frame buffer holds {} bytes, image size is {}",
                out.len(),
                size
            )));
        }

        if self.buffer_count == 0 {
            return self.read_frame(handle, out);
        }
        let stream = self.stream.as_ref().ok_or(Error::NotStreaming)?;

        let frame = loop {
            self.wait(handle)?;
            match handle.dequeue_buffer() {
                Ok(frame) => break frame,
                Err(e) if is_transient(&e) => trace!("dequeue: {}, retrying", e),
                Err(e) => return Err(Error::io("VIDIOC_DQBUF", e)),
            }
        };

        // the buffer goes back to the driver even if the copy failed
        let copied = stream.copy(frame.index, out);
        handle
            .queue_buffer(frame.index)
            .map_err(|e| Error::io("VIDIOC_QBUF", e))?;
        copied?;

        trace!("frame from buffer {} ({} bytes)", frame.index, frame.bytesused);
        Ok(frame.bytesused as usize)
    }

    fn read_frame(&self, handle: &B::Handle, out: &mut [u8]) -> Result<usize> {
        loop {
            self.wait(handle)?;
            match handle.read(out) {
                Ok(len) => {
                    trace!("read frame ({} bytes)", len);
                    return Ok(len);
                }
                Err(e) if is_transient(&e) => trace!("read: {}, retrying", e),
                Err(e) => return Err(Error::io("read", e)),
            }
        }
    }

    fn wait(&self, handle: &B::Handle) -> Result<()> {
        loop {
            match handle.poll(self.timeout) {
                Ok(true) => return Ok(()),
                Ok(false) => return Err(Error::Timeout(self.timeout.unwrap_or(Duration::ZERO))),
                Err(e) if is_transient(&e) => continue,
                Err(e) => return Err(Error::io("poll", e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::device::Device;
    use crate::error::Error;
    use crate::format::{FormatId, FrameSize};
    use crate::mock::MockBackend;
    use std::time::Duration;

    fn streaming(backend: &MockBackend, buffer_count: u32) -> Device<MockBackend> {
        let mut dev = Device::with_backend(backend.clone(), "/dev/video0", false, buffer_count);
        dev.open().unwrap();
        dev.start_stream().unwrap();
        dev
    }

    #[test]
    fn start_stop_restores_bookkeeping() {
        let backend = MockBackend::new();
        let mut dev = streaming(&backend, 4);
        assert!(dev.is_streaming());
        assert_eq!(dev.active_buffers(), 4);
        assert_eq!(backend.state().live_mappings, 4);

        dev.stop_stream().unwrap();
        assert!(!dev.is_streaming());
        assert_eq!(dev.active_buffers(), 0);
        {
            let state = backend.state();
            assert_eq!(state.live_mappings, 0);
            assert_eq!(state.granted, 0);
        }

        dev.start_stream().unwrap();
        assert_eq!(backend.state().live_mappings, 4);
    }

    #[test]
    fn stream_state_errors() {
        let backend = MockBackend::new();
        let mut dev = Device::with_backend(backend.clone(), "/dev/video0", false, 4);
        assert!(matches!(dev.start_stream(), Err(Error::NotOpen)));

        dev.open().unwrap();
        assert!(matches!(dev.stop_stream(), Err(Error::NotStreaming)));
        dev.start_stream().unwrap();
        assert!(matches!(dev.start_stream(), Err(Error::AlreadyStreaming)));
        assert_eq!(dev.last_error().as_deref(), Some("device is already streaming"));
    }

    #[test]
    fn granted_count_wins() {
        let backend = MockBackend::new();
        backend.state().grant_limit = 2;

        let dev = streaming(&backend, 3);
        assert_eq!(dev.buffer_count(), 3);
        assert_eq!(dev.active_buffers(), 2);
        assert_eq!(backend.state().live_mappings, 2);
    }

    #[test]
    fn zero_grant_is_an_error() {
        let backend = MockBackend::new();
        backend.state().grant_limit = 0;

        let mut dev = Device::with_backend(backend.clone(), "/dev/video0", false, 4);
        dev.open().unwrap();
        assert!(matches!(dev.start_stream(), Err(Error::NoBuffers)));
        assert!(!dev.is_streaming());
    }

    #[test]
    fn partial_map_failure_unmaps_everything() {
        let backend = MockBackend::new();
        backend.state().fail_map_at = Some(2);

        let mut dev = Device::with_backend(backend.clone(), "/dev/video0", false, 4);
        dev.open().unwrap();
        let err = dev.start_stream().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOMEM));
        assert!(!dev.is_streaming());
        {
            let state = backend.state();
            assert_eq!(state.live_mappings, 0);
            assert_eq!(state.granted, 0);
            assert_eq!(state.released, 1);
        }

        // the next attempt starts from scratch
        backend.state().fail_map_at = None;
        dev.start_stream().unwrap();
        assert_eq!(dev.active_buffers(), 4);
    }

    #[test]
    fn queue_failure_unmaps_everything() {
        let backend = MockBackend::new();
        backend.state().fail_queue_at = Some(1);

        let mut dev = Device::with_backend(backend.clone(), "/dev/video0", false, 4);
        dev.open().unwrap();
        let err = dev.start_stream().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EIO));
        assert!(dev.last_error().unwrap().starts_with("VIDIOC_QBUF failed"));
        assert!(!dev.is_streaming());
        {
            let state = backend.state();
            assert_eq!(state.live_mappings, 0);
            assert_eq!(state.released, 1);
            assert!(!state.streaming);
        }

        backend.state().fail_queue_at = None;
        dev.start_stream().unwrap();
        assert_eq!(backend.state().live_mappings, 4);
    }

    #[test]
    fn stream_on_failure_unmaps_everything() {
        let backend = MockBackend::new();
        backend.state().fail_stream_on = true;

        let mut dev = Device::with_backend(backend.clone(), "/dev/video0", false, 4);
        dev.open().unwrap();
        assert!(dev.start_stream().is_err());
        assert!(!dev.is_streaming());
        assert_eq!(backend.state().live_mappings, 0);
    }

    #[test]
    fn failed_stream_off_keeps_streaming() {
        let backend = MockBackend::new();
        let mut dev = streaming(&backend, 4);
        backend.state().fail_stream_off = true;

        assert!(dev.stop_stream().is_err());
        assert!(dev.is_streaming());
        assert_eq!(backend.state().live_mappings, 4);

        // close stops first, so it fails the same way and keeps the descriptor
        assert!(dev.close().is_err());
        assert!(dev.is_open());
        assert!(dev.is_streaming());

        backend.state().fail_stream_off = false;
        dev.close().unwrap();
        assert!(!dev.is_open());
        assert_eq!(backend.state().live_mappings, 0);
    }

    #[test]
    fn close_while_streaming_tears_down() {
        let backend = MockBackend::new();
        let mut dev = streaming(&backend, 4);
        dev.close().unwrap();
        assert!(!dev.is_streaming());
        assert_eq!(backend.state().live_mappings, 0);
    }

    #[test]
    fn grab_rgb24_frame() {
        let backend = MockBackend::new();
        let mut dev = Device::with_backend(backend.clone(), "/dev/video0", false, 4);
        dev.open().unwrap();
        dev.set_format(FormatId::Rgb24, FrameSize::new(640, 480))
            .unwrap();
        assert_eq!(dev.image_size().unwrap(), 640 * 480 * 3);

        dev.start_stream().unwrap();
        let mut frame = vec![0u8; 640 * 480 * 3];
        assert_eq!(dev.grab(&mut frame).unwrap(), 921_600);
        // buffer 0 is filled with ones
        assert!(frame.iter().all(|&b| b == 1));

        let state = backend.state();
        assert_eq!(state.dequeues, 1);
        assert_eq!(state.requeues, 1);
        assert_eq!(state.queued.len(), 4);
    }

    #[test]
    fn grab_cycles_through_buffers() {
        let backend = MockBackend::new();
        let mut dev = streaming(&backend, 2);
        let mut frame = vec![0u8; dev.image_size().unwrap()];

        dev.grab(&mut frame).unwrap();
        assert_eq!(frame[0], 1);
        dev.grab(&mut frame).unwrap();
        assert_eq!(frame[0], 2);
        dev.grab(&mut frame).unwrap();
        assert_eq!(frame[0], 1);
    }

    #[test]
    fn grab_checks_size_and_state() {
        let backend = MockBackend::new();
        let mut dev = Device::with_backend(backend.clone(), "/dev/video0", false, 4);
        let mut frame = vec![0u8; 16];
        assert!(matches!(dev.grab(&mut frame), Err(Error::NotOpen)));

        dev.open().unwrap();
        assert!(matches!(dev.grab(&mut frame), Err(Error::InvalidArgument(_))));

        let mut frame = vec![0u8; dev.image_size().unwrap()];
        assert!(matches!(dev.grab(&mut frame), Err(Error::NotStreaming)));
        assert_eq!(backend.state().dequeues, 0);
    }

    #[test]
    fn transient_dequeue_errors_are_retried() {
        let backend = MockBackend::new();
        let mut dev = streaming(&backend, 4);
        backend
            .state()
            .dequeue_errors
            .extend([libc::EAGAIN, libc::EINTR, libc::EAGAIN]);

        let mut frame = vec![0u8; dev.image_size().unwrap()];
        dev.grab(&mut frame).unwrap();
        assert_eq!(backend.state().dequeues, 4);
    }

    #[test]
    fn hard_dequeue_error_is_fatal() {
        let backend = MockBackend::new();
        let mut dev = streaming(&backend, 4);
        backend.state().dequeue_errors.push_back(libc::EIO);

        let mut frame = vec![0u8; dev.image_size().unwrap()];
        let err = dev.grab(&mut frame).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EIO));
        assert!(dev.last_error().unwrap().starts_with("VIDIOC_DQBUF failed"));
    }

    #[test]
    fn stalled_device_times_out() {
        let backend = MockBackend::new();
        let mut dev = streaming(&backend, 4);
        dev.set_timeout(Some(Duration::from_millis(20)));
        backend.state().poll_results.push_back(false);

        let mut frame = vec![0u8; dev.image_size().unwrap()];
        match dev.grab(&mut frame) {
            Err(Error::Timeout(wait)) => assert_eq!(wait, Duration::from_millis(20)),
            other => panic!("expected a timeout, got {:?}", other),
        }
        {
            let state = backend.state();
            assert_eq!(state.polls, 1);
            assert_eq!(state.dequeues, 0);
        }

        // the stream is still usable afterwards
        dev.grab(&mut frame).unwrap();
        assert_eq!(backend.state().polls, 2);
    }

    #[test]
    fn interrupted_poll_is_retried() {
        let backend = MockBackend::new();
        let mut dev = streaming(&backend, 4);
        backend
            .state()
            .poll_errors
            .extend([libc::EINTR, libc::EAGAIN]);

        let mut frame = vec![0u8; dev.image_size().unwrap()];
        dev.grab(&mut frame).unwrap();
        let state = backend.state();
        assert_eq!(state.polls, 3);
        assert_eq!(state.dequeues, 1);
    }

    #[test]
    fn hard_poll_error_is_fatal() {
        let backend = MockBackend::new();
        let mut dev = streaming(&backend, 4);
        backend.state().poll_errors.push_back(libc::EBADF);

        let mut frame = vec![0u8; dev.image_size().unwrap()];
        let err = dev.grab(&mut frame).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
        assert_eq!(backend.state().dequeues, 0);
    }

    #[test]
    fn read_mode_never_touches_buffers() {
        let backend = MockBackend::new();
        let mut dev = Device::with_backend(backend.clone(), "/dev/video0", false, 0);
        dev.open().unwrap();
        dev.start_stream().unwrap();
        assert!(!dev.is_streaming());
        backend.state().read_errors.push_back(libc::EAGAIN);

        let mut frame = vec![0u8; dev.image_size().unwrap()];
        assert_eq!(dev.grab(&mut frame).unwrap(), frame.len());
        assert!(frame.iter().all(|&b| b == 0xab));

        dev.stop_stream().unwrap();
        let state = backend.state();
        assert_eq!(state.reads, 2);
        assert_eq!(state.dequeues, 0);
        assert_eq!(state.requeues, 0);
        assert_eq!(state.granted, 0);
        assert_eq!(state.live_mappings, 0);
    }

    #[test]
    fn read_mode_hard_error_is_fatal() {
        let backend = MockBackend::new();
        let mut dev = Device::with_backend(backend.clone(), "/dev/video0", false, 0);
        dev.open().unwrap();
        backend.state().read_errors.push_back(libc::EIO);

        let mut frame = vec![0u8; dev.image_size().unwrap()];
        let err = dev.grab(&mut frame).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EIO));
        assert_eq!(backend.state().reads, 1);
    }
}
