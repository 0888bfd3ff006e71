//! Saving and restoring device configuration
//!
//! A [`Settings`] document captures the pixel format, frame rate and the value of every
//! available control. It is stored as JSON.
//!
//! ```no_run
//! use vcap::{Device, Settings};
//!
//! # fn main() -> vcap::Result<()> {
//! let mut dev = Device::new("/dev/video0", false, 4);
//! dev.open()?;
//! Settings::export(&dev)?.save("camera.json")?;
//!
//! Settings::load("camera.json")?.apply(&mut dev)?;
//! # Ok(())
//! # }
//! ```

use std::convert::TryFrom;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::control::{ControlId, ControlType};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::format::{FormatId, FourCC, FrameSize};
use crate::rate::FrameRate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSettings {
    /// Four character code, e.g. "YUYV"
    pub fourcc: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSetting {
    /// Kernel control id
    pub id: u32,
    /// Informational only
    pub name: String,
    pub value: i32,
}

/// Device configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub format: FormatSettings,
    pub rate: FrameRate,
    /// Applied in order
    pub controls: Vec<ControlSetting>,
}

impl Settings {
    /// Captures the current configuration of an open device
    ///
    /// Buttons and controls that are not currently available are left out.
    pub fn export<B: Backend>(device: &Device<B>) -> Result<Self> {
        let (id, size) = device.format()?;
        let rate = device.rate()?;

        let mut controls = Vec::new();
        for info in device.controls().into_vec()? {
            if info.typ == ControlType::Button || !device.control_status(info.id)?.is_ok() {
                continue;
            }
            controls.push(ControlSetting {
                id: info.id.cid(),
                name: info.name,
                value: device.control(info.id)?,
            });
        }

        Ok(Settings {
            format: FormatSettings {
                fourcc: id.fourcc().to_string(),
                width: size.width,
                height: size.height,
            },
            rate,
            controls,
        })
    }

    /// Applies format, rate and controls to an open device, in that order
    ///
    /// Unknown formats and control ids are rejected before anything is changed.
    pub fn apply<B: Backend>(&self, device: &mut Device<B>) -> Result<()> {
        let fourcc: FourCC = self.format.fourcc.parse()?;
        let id = FormatId::from_fourcc(fourcc).ok_or_else(|| {
            Error::InvalidArgument(format!("unknown pixel format {}", self.format.fourcc))
        })?;
        let controls = self
            .controls
            .iter()
            .map(|c| ControlId::try_from(c.id).map(|id| (id, c.value)))
            .collect::<Result<Vec<_>>>()?;

        device.set_format(id, FrameSize::new(self.format.width, self.format.height))?;
        device.set_rate(self.rate)?;
        for (id, value) in controls {
            device.set_control(id, value)?;
        }

        debug!(
            "{}: applied settings ({} controls)",
            device.path().display(),
            self.controls.len()
        );
        Ok(())
    }

    /// Writes the document as pretty printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| Error::io("write settings", e))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| Error::io("read settings", e))?;
        Ok(serde_json::from_str(&json)?)
    }
}
