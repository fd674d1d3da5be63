pub mod status_led;

pub use status_led::{AlertActuator, LedError, StatusLed};
