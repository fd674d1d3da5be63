use std::time::Duration;

use log::info;

/// サイクル間スリープの抽象化
pub trait SleepPlatform {
    /// 指定時間だけ処理を止める
    fn sleep(&self, duration: Duration);
}

/// スレッドを止めて待つ実装
///
/// 状態（カメラ以外のピン・設定）はそのまま保持される。
pub struct ThreadSleep;

impl SleepPlatform for ThreadSleep {
    fn sleep(&self, duration: Duration) {
        info!("次の測定まで {}秒 スリープします", duration.as_secs());
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_thread_sleep_waits() {
        let start = Instant::now();
        ThreadSleep.sleep(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
