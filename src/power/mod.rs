/// サイクル間の待機
pub mod sleep;

pub use sleep::{SleepPlatform, ThreadSleep};
