//! 远程调用限流器 - 业务能力层
//!
//! 滑动窗口限流：滚动窗口内最多发出 `max_calls` 次远程调用。
//! 整个批改活动构造一个实例，以 `Arc` 显式传入每个调用方，
//! 不做任何全局单例。

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// 滑动窗口限流器
///
/// `acquire` 只挂起当前任务，不阻塞其他任务；
/// 限制的是"发出"的速率，与调用完成时刻无关
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    issued: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            // 0 配额会让所有任务永久挂起，按 1 处理
            max_calls: max_calls.max(1),
            window,
            issued: Mutex::new(VecDeque::new()),
        }
    }

    /// 占用一次调用额度；额度不足时挂起直到窗口滑出
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut issued = self.issued.lock().await;
                let now = Instant::now();

                // 移除已滑出窗口的时间戳
                while let Some(&front) = issued.front() {
                    if now.duration_since(front) >= self.window {
                        issued.pop_front();
                    } else {
                        break;
                    }
                }

                if issued.len() < self.max_calls {
                    issued.push_back(now);
                    return;
                }

                // 等到最早一次调用滑出窗口
                let oldest = *issued.front().expect("队列已满必有队首");
                self.window - now.duration_since(oldest)
            };

            debug!("限流: 等待 {:?} 后重试", wait);
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// 任意滚动窗口内的发出次数不超过配额
    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_window_budget() {
        let limit = 5;
        let window = Duration::from_millis(200);
        let limiter = Arc::new(RateLimiter::new(limit, window));

        let mut handles = Vec::new();
        for _ in 0..17 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }

        let mut stamps = Vec::new();
        for h in handles {
            stamps.push(h.await.unwrap());
        }
        stamps.sort();

        for i in 0..stamps.len() {
            let in_window = stamps[i..]
                .iter()
                .take_while(|&&t| t.duration_since(stamps[i]) < window)
                .count();
            assert!(
                in_window <= limit,
                "窗口 [{:?}] 内发出 {} 次，超过配额 {}",
                stamps[i],
                in_window,
                limit
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_under_budget_does_not_wait() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_treated_as_one() {
        let limiter = RateLimiter::new(0, Duration::from_millis(10));
        limiter.acquire().await;
        limiter.acquire().await;
    }
}
