/// ハードウェア制御モジュール
pub mod camera;
pub mod env_sensor;
#[cfg(target_os = "linux")]
pub mod gpio;
pub mod led;
// Mock実装（テストと mock フィーチャーでのみ使用可能）
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod moisture_sensor;
pub mod ph_sensor;

pub use camera::{Camera, CameraError, CameraHandle, CommandCamera};
pub use env_sensor::{EnvironmentSensor, IioDhtSensor, SensorReadError};
pub use led::{AlertActuator, LedError, StatusLed};
pub use moisture_sensor::{DigitalMoistureSensor, MoistureSensor};
pub use ph_sensor::{AdcPhSensor, PhProbe, PhReadError, PhReading};
