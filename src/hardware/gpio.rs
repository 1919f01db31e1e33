// src/hardware/gpio.rs

use crate::error::{Result, SignalError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

impl PinDirection {
    fn as_sysfs(self) -> &'static str {
        match self {
            PinDirection::Input => "in",
            PinDirection::Output => "out",
        }
    }
}

pub trait GpioPin {
    fn number(&self) -> u32;
    fn set(&mut self, high: bool) -> Result<()>;
    fn is_high(&mut self) -> Result<bool>;
}

/// Pin driven through the kernel's sysfs GPIO interface
#[derive(Debug)]
pub struct SysfsPin {
    number: u32,
    value_path: PathBuf,
}

impl SysfsPin {
    /// Export the pin (if needed) and set its direction. Outputs start low.
    pub fn open(root: &Path, number: u32, direction: PinDirection) -> Result<Self> {
        let pin_dir = root.join(format!("gpio{}", number));
        let io_err = |source| SignalError::Gpio {
            pin: number,
            source,
        };

        if !pin_dir.exists() {
            fs::write(root.join("export"), number.to_string()).map_err(io_err)?;
        }

        let direction_value = match direction {
            PinDirection::Output => "low",
            PinDirection::Input => direction.as_sysfs(),
        };
        fs::write(pin_dir.join("direction"), direction_value).map_err(io_err)?;

        debug!("gpio{} ready as {}", number, direction.as_sysfs());

        Ok(Self {
            number,
            value_path: pin_dir.join("value"),
        })
    }
}

impl GpioPin for SysfsPin {
    fn number(&self) -> u32 {
        self.number
    }

    fn set(&mut self, high: bool) -> Result<()> {
        fs::write(&self.value_path, if high { "1" } else { "0" }).map_err(|source| {
            SignalError::Gpio {
                pin: self.number,
                source,
            }
        })
    }

    fn is_high(&mut self) -> Result<bool> {
        let raw = fs::read_to_string(&self.value_path).map_err(|source| SignalError::Gpio {
            pin: self.number,
            source,
        })?;
        Ok(raw.trim() != "0")
    }
}
