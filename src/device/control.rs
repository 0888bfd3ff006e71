use std::convert::TryFrom;
use std::io;

use log::debug;

use crate::backend::{Backend, Handle};
use crate::control::{
    self, ControlId, ControlInfo, ControlStatus, ControlType, MenuEntry,
};
use crate::device::Device;
use crate::enumerate::{Cursor, Fetch};
use crate::error::{is_out_of_range, Error, Result};

impl<B: Backend> Device<B> {
    fn describe(&self, id: ControlId) -> Result<control::Description> {
        self.handle()?
            .query_control(id.cid())
            .map_err(|e| control_error(id, "VIDIOC_QUERYCTRL", e))
    }

    fn describe_supported(&self, id: ControlId) -> Result<(ControlInfo, ControlStatus)> {
        let desc = self.describe(id)?;
        let info = ControlInfo::new(id, &desc).ok_or(Error::InvalidControl(id))?;
        Ok((info, ControlStatus::from(desc.flags)))
    }

    /// Full descriptor of a control
    ///
    /// Fails with [`Error::InvalidControl`] if the device lacks the control or its type is not
    /// supported.
    pub fn control_info(&self, id: ControlId) -> Result<ControlInfo> {
        let res = self.describe_supported(id).map(|(info, _)| info);
        self.record(res)
    }

    /// Current availability of a control
    ///
    /// This changes with other settings, e.g. manual exposure is inactive while auto exposure
    /// is on.
    pub fn control_status(&self, id: ControlId) -> Result<ControlStatus> {
        let res = self.describe(id).map(|desc| ControlStatus::from(desc.flags));
        self.record(res)
    }

    /// Controls the device offers
    ///
    /// Unknown, disabled and unsupported controls are skipped.
    pub fn controls(&self) -> Cursor<'_, ControlInfo> {
        self.cursor(move |handle, index| {
            let id = match ControlId::ALL.get(index as usize) {
                Some(id) => *id,
                None => return Fetch::Invalid,
            };
            match handle.query_control(id.cid()) {
                Ok(desc) if desc.flags.contains(control::Flags::DISABLED) => Fetch::Disabled,
                Ok(desc) => ControlInfo::new(id, &desc).map_or(Fetch::Disabled, Fetch::Item),
                Err(e) if is_out_of_range(&e) => Fetch::Disabled,
                Err(e) => Fetch::Error(self.note(Error::io("VIDIOC_QUERYCTRL", e))),
            }
        })
    }

    /// Entries of a menu or integer menu control
    ///
    /// The cursor fails right away if the control is missing, read-only or not a menu.
    pub fn menu(&self, id: ControlId) -> Cursor<'_, MenuEntry> {
        let (info, status) = match self.describe_supported(id) {
            Ok(described) => described,
            Err(e) => return Cursor::failed(self.note(e)),
        };
        if status.contains(ControlStatus::READ_ONLY) {
            return Cursor::failed(self.note(Error::ControlUnavailable { id, status }));
        }
        if !info.typ.is_menu() {
            return Cursor::failed(self.note(Error::InvalidArgument(format!(
                "{} is a {} control, not a menu",
                id, info.typ
            ))));
        }

        let (minimum, maximum, typ) = (i64::from(info.minimum), i64::from(info.maximum), info.typ);
        self.cursor(move |handle, offset| {
            let index = minimum + i64::from(offset);
            if index > maximum {
                return Fetch::Invalid;
            }
            let index = match u32::try_from(index) {
                Ok(index) => index,
                Err(_) => return Fetch::Disabled,
            };
            match handle.query_menu(id.cid(), index, typ) {
                Ok(item) => Fetch::Item(MenuEntry { index, item }),
                // drivers may leave holes in the advertised range
                Err(e) if is_out_of_range(&e) => Fetch::Disabled,
                Err(e) => Fetch::Error(self.note(Error::io("VIDIOC_QUERYMENU", e))),
            }
        })
    }

    /// Current value of a control
    pub fn control(&self, id: ControlId) -> Result<i32> {
        let res = self.handle().and_then(|h| {
            h.control(id.cid())
                .map_err(|e| control_error(id, "VIDIOC_G_CTRL", e))
        });
        self.record(res)
    }

    /// Writes a control
    ///
    /// The status is queried first: read-only and disabled controls are refused, inactive ones
    /// are written since the driver keeps their value for later.
    pub fn set_control(&mut self, id: ControlId, value: i32) -> Result<()> {
        let res = self.write_control(id, value);
        self.record(res)
    }

    fn write_control(&self, id: ControlId, value: i32) -> Result<()> {
        let (info, status) = self.describe_supported(id)?;
        if status.intersects(ControlStatus::READ_ONLY | ControlStatus::DISABLED) {
            return Err(Error::ControlUnavailable { id, status });
        }
        if info.typ != ControlType::Button && (value < info.minimum || value > info.maximum) {
            return Err(Error::InvalidArgument(format!(
                "{} is out of range for {} ({}..={})",
                value, id, info.minimum, info.maximum
            )));
        }

        self.handle()?
            .set_control(id.cid(), value)
            .map_err(|e| control_error(id, "VIDIOC_S_CTRL", e))?;
        debug!("{}: {} set to {}", self.path.display(), id, value);
        Ok(())
    }

    /// Restores the default value of a control
    ///
    /// Controls that are not currently available, and buttons, are left alone.
    pub fn reset_control(&mut self, id: ControlId) -> Result<()> {
        let res = self.restore_default(id);
        self.record(res)
    }

    fn restore_default(&self, id: ControlId) -> Result<()> {
        let (info, status) = self.describe_supported(id)?;
        if !status.is_ok() || info.typ == ControlType::Button {
            debug!("{}: not resetting {} ({})", self.path.display(), id, status);
            return Ok(());
        }
        self.write_control(id, info.default_value)
    }

    /// Restores the default value of every available control
    ///
    /// Stops at the first failure; controls before it have already been reset.
    pub fn reset_controls(&mut self) -> Result<()> {
        let res = self.controls().into_vec().and_then(|controls| {
            controls
                .iter()
                .try_for_each(|info| self.restore_default(info.id))
        });
        self.record(res)
    }
}

fn control_error(id: ControlId, op: &'static str, e: io::Error) -> Error {
    match e.raw_os_error() {
        Some(libc::EINVAL) => Error::InvalidControl(id),
        Some(libc::ERANGE) => Error::InvalidArgument(format!("value out of range for {}", id)),
        _ => Error::io(op, e),
    }
}
