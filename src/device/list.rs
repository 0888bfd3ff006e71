//! Device discovery

use std::io;
use std::path::Path;

use crate::backend::{Backend, Handle, Kernel};
use crate::capability::DeviceInfo;
use crate::enumerate::{Cursor, Fetch};
use crate::error::{Error, Result};

static KERNEL: Kernel = Kernel;

/// Capture devices currently known to the system
///
/// Nodes are visited in sorted path order. Nodes that cannot be queried or cannot capture video
/// are skipped.
///
/// # Example
///
/// ```no_run
/// for dev in vcap::devices() {
///     println!("{}", dev);
/// }
/// ```
pub fn devices() -> Cursor<'static, DeviceInfo> {
    devices_with(&KERNEL)
}

/// Capture devices known to `backend`
pub fn devices_with<B: Backend>(backend: &B) -> Cursor<'_, DeviceInfo> {
    let nodes = match backend.nodes() {
        Ok(nodes) => nodes,
        Err(e) => return Cursor::failed(Error::io("read_dir", e)),
    };

    Cursor::new(move |index| {
        let path = match nodes.get(index as usize) {
            Some(path) => path,
            None => return Fetch::Invalid,
        };
        match device_info_with(backend, path) {
            Ok(info) if info.capabilities.can_capture() => Fetch::Item(info),
            _ => Fetch::Disabled,
        }
    })
}

/// Queries a single node without starting a session
pub fn device_info<P: AsRef<Path>>(path: P) -> Result<DeviceInfo> {
    device_info_with(&KERNEL, path)
}

/// Queries a single node of `backend` without starting a session
pub fn device_info_with<B: Backend, P: AsRef<Path>>(backend: &B, path: P) -> Result<DeviceInfo> {
    let path = path.as_ref();
    let handle = backend.open(path, false).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
        _ => Error::io("open", e),
    })?;
    let capabilities = handle
        .query_caps()
        .map_err(|e| Error::io("VIDIOC_QUERYCAP", e))?;
    handle.close().map_err(|e| Error::io("close", e))?;

    Ok(DeviceInfo {
        path: path.to_path_buf(),
        capabilities,
    })
}
