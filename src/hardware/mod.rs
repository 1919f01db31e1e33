// src/hardware/mod.rs
//
// Sensor and lamp collaborators. The controller only sees the two
// traits below; the GPIO and simulated backends plug in behind them.

pub mod gpio;
pub mod indicators;
pub mod simulated;
pub mod ultrasonic;

use crate::types::{Approach, Detection, LampColor};

pub use gpio::{PinDirection, SysfsPin};
pub use indicators::GpioIndicators;
pub use simulated::{LoggedIndicators, SimulatedTraffic};
pub use ultrasonic::UltrasonicDetector;

/// One bounded detection attempt per call
pub trait ProximityDetector {
    fn detect(&mut self, approach: Approach) -> Detection;

    /// Raw range (metres) behind the most recent detection, if the backend measures one
    fn last_reading(&self) -> Option<f64> {
        None
    }
}

pub trait Indicators {
    fn set_indicator(&mut self, approach: Approach, color: LampColor, on: bool);

    fn all_off(&mut self) {
        for approach in Approach::ALL {
            self.set_indicator(approach, LampColor::Green, false);
            self.set_indicator(approach, LampColor::Red, false);
        }
    }
}

impl<T: ProximityDetector + ?Sized> ProximityDetector for Box<T> {
    fn detect(&mut self, approach: Approach) -> Detection {
        (**self).detect(approach)
    }

    fn last_reading(&self) -> Option<f64> {
        (**self).last_reading()
    }
}

impl<T: Indicators + ?Sized> Indicators for Box<T> {
    fn set_indicator(&mut self, approach: Approach, color: LampColor, on: bool) {
        (**self).set_indicator(approach, color, on)
    }

    fn all_off(&mut self) {
        (**self).all_off()
    }
}
