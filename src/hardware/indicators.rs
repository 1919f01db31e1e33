// src/hardware/indicators.rs

use super::gpio::{GpioPin, PinDirection, SysfsPin};
use super::Indicators;
use crate::error::Result;
use crate::types::{Approach, ApproachPins, LampColor};
use std::path::Path;
use tracing::warn;

pub struct LampPins<P> {
    pub green: P,
    pub red: P,
}

/// Green/red lamp pair per approach on GPIO outputs
pub struct GpioIndicators<P: GpioPin> {
    north: LampPins<P>,
    west: LampPins<P>,
}

impl<P: GpioPin> GpioIndicators<P> {
    pub fn new(north: LampPins<P>, west: LampPins<P>) -> Self {
        Self { north, west }
    }

    pub fn pin_numbers(&self, approach: Approach) -> (u32, u32) {
        let lamps = match approach {
            Approach::North => &self.north,
            Approach::West => &self.west,
        };
        (lamps.green.number(), lamps.red.number())
    }
}

impl GpioIndicators<SysfsPin> {
    pub fn open(root: &Path, north: ApproachPins, west: ApproachPins) -> Result<Self> {
        let lamps = |pins: ApproachPins| -> Result<LampPins<SysfsPin>> {
            Ok(LampPins {
                green: SysfsPin::open(root, pins.green, PinDirection::Output)?,
                red: SysfsPin::open(root, pins.red, PinDirection::Output)?,
            })
        };
        Ok(Self::new(lamps(north)?, lamps(west)?))
    }
}

impl<P: GpioPin> Indicators for GpioIndicators<P> {
    fn set_indicator(&mut self, approach: Approach, color: LampColor, on: bool) {
        let lamps = match approach {
            Approach::North => &mut self.north,
            Approach::West => &mut self.west,
        };
        let pin = match color {
            LampColor::Green => &mut lamps.green,
            LampColor::Red => &mut lamps.red,
        };

        // A stuck lamp must not stop the controller
        if let Err(e) = pin.set(on) {
            warn!("⚠️  {} {:?} lamp write failed: {}", approach, color, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sysfs_lamps_follow_calls() {
        let root = tempfile::tempdir().unwrap();
        for pin in [18, 46, 3, 1] {
            let dir = root.path().join(format!("gpio{}", pin));
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("value"), "0").unwrap();
        }
        let north = ApproachPins {
            green: 18,
            red: 46,
            trigger: 19,
            echo: 2,
        };
        let west = ApproachPins {
            green: 3,
            red: 1,
            trigger: 11,
            echo: 0,
        };

        let mut lamps = GpioIndicators::open(root.path(), north, west).unwrap();
        assert_eq!(lamps.pin_numbers(Approach::West), (3, 1));

        lamps.set_indicator(Approach::North, LampColor::Green, true);
        lamps.set_indicator(Approach::West, LampColor::Red, true);

        let value = |pin: u32| {
            fs::read_to_string(root.path().join(format!("gpio{}/value", pin))).unwrap()
        };
        assert_eq!(value(18), "1");
        assert_eq!(value(1), "1");
        assert_eq!(value(46), "0");

        lamps.all_off();
        assert_eq!(value(18), "0");
        assert_eq!(value(1), "0");
    }
}
