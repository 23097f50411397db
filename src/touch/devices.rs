//! Input device listing.
//!
//! Useful when a touchscreen produces nothing: it shows whether the server
//! sees a touch class at all and how many simultaneous contacts it claims.

use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchMode {
    /// Touchscreen: contacts land where they are reported.
    Direct,
    /// Touchpad style: contacts steer a pointer.
    Dependent,
}

impl TouchMode {
    pub fn as_label(self) -> &'static str {
        match self {
            TouchMode::Direct => "direct",
            TouchMode::Dependent => "dependent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchCapability {
    pub mode: TouchMode,
    pub max_touches: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    pub name: String,
    pub touch: Vec<TouchCapability>,
}

/// Writes one `Device name` line per device, followed by its touch classes.
pub fn write_report<W: Write>(out: &mut W, devices: &[InputDevice]) -> std::io::Result<()> {
    for device in devices {
        writeln!(out, "Device name {}", device.name)?;
        for touch in &device.touch {
            writeln!(
                out,
                "   {} touch device, supporting {} touches.",
                touch.mode.as_label(),
                touch.max_touches
            )?;
        }
    }
    out.flush()
}

pub fn log_devices(devices: &[InputDevice]) {
    for device in devices {
        if device.touch.is_empty() {
            tracing::debug!(name = %device.name, "input device");
        }
        for touch in &device.touch {
            tracing::info!(
                name = %device.name,
                mode = touch.mode.as_label(),
                max_touches = touch.max_touches,
                "touch input device"
            );
        }
    }
    if devices.iter().all(|device| device.touch.is_empty()) {
        tracing::warn!("no touch-capable input device reported");
    }
}

/// Asks the X server for every input device and its touch classes.
#[cfg(all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android"))))]
pub fn query() -> anyhow::Result<Vec<InputDevice>> {
    use anyhow::Context;
    use x11rb::protocol::xinput::{self, ConnectionExt as _};

    let (conn, _screen) = x11rb::connect(None).context("connect to X server")?;
    conn.xinput_xi_query_version(2, 2)
        .context("request XInput version")?
        .reply()
        .context("XInput 2.2 not available")?;
    let reply = conn
        .xinput_xi_query_device(xinput::Device::ALL)
        .context("request input devices")?
        .reply()
        .context("query input devices")?;

    Ok(reply
        .infos
        .iter()
        .map(|info| InputDevice {
            name: String::from_utf8_lossy(&info.name).into_owned(),
            touch: info
                .classes
                .iter()
                .filter_map(|class| match &class.data {
                    xinput::DeviceClassData::Touch(touch) => Some(TouchCapability {
                        mode: if touch.mode == xinput::TouchMode::DIRECT {
                            TouchMode::Direct
                        } else {
                            TouchMode::Dependent
                        },
                        max_touches: touch.num_touches,
                    }),
                    _ => None,
                })
                .collect(),
        })
        .collect())
}

#[cfg(not(all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android")))))]
pub fn query() -> anyhow::Result<Vec<InputDevice>> {
    anyhow::bail!("input device listing needs an X11 server")
}
