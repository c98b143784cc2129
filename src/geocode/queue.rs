//! レート制限付き検証キュー
//!
//! Nominatimの利用規約（1秒1リクエスト）を守るため、ジオコーディング要求を
//! FIFOで1件ずつ処理する。何件同時に投入されても、連続する2件の送信開始は
//! 必ず `min_interval` 以上空く。
//!
//! - キューが空で停止中のときに投入されると処理ループを起動
//! - 失敗した要求も結果（エラー付き）として返し、後続の処理は止めない
//! - 再試行はしない

use super::{GeocodeOutcome, Geocoder};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Nominatimの既定リクエスト間隔
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1100);

/// 時刻と待機の抽象（テストで差し替える）
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// tokioタイマーによる実時間クロック
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

struct QueueItem {
    address: String,
    responder: oneshot::Sender<GeocodeOutcome>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueueItem>,
    processing: bool,
    /// 直前の送信開始時刻（成功・失敗を問わない）
    last_request: Option<Instant>,
}

/// 処理ループが途中で終わった（パニック等）ときにキューを停止状態へ戻す
struct DrainGuard<'a> {
    state: &'a Mutex<QueueState>,
    finished: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.processing = false;
        // 送信側を破棄して待機中の要求に停止を通知
        state.pending.clear();
    }
}

struct Inner<G, C> {
    geocoder: G,
    clock: C,
    min_interval: Duration,
    state: Mutex<QueueState>,
}

impl<G, C> Inner<G, C>
where
    G: Geocoder,
    C: Clock,
{
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn drain(&self) {
        let mut guard = DrainGuard {
            state: &self.state,
            finished: false,
        };

        loop {
            let (item, last_request) = {
                let mut state = self.lock();
                match state.pending.pop_front() {
                    Some(item) => (item, state.last_request),
                    None => {
                        state.processing = false;
                        guard.finished = true;
                        return;
                    }
                }
            };

            if let Some(last) = last_request {
                let elapsed = self.clock.now().saturating_duration_since(last);
                if elapsed < self.min_interval {
                    self.clock.sleep(self.min_interval - elapsed).await;
                }
            }

            self.lock().last_request = Some(self.clock.now());

            let outcome = match self.geocoder.search(&item.address).await {
                Ok(search) => GeocodeOutcome::from(search),
                Err(e) => {
                    tracing::debug!(address = %item.address, "ジオコーディング失敗: {}", e);
                    GeocodeOutcome::failed(e.to_string())
                }
            };

            // 受け取り側が破棄済みなら結果は捨てる
            let _ = item.responder.send(outcome);
        }
    }
}

/// 投入済みの検証要求
pub struct PendingValidation {
    receiver: oneshot::Receiver<GeocodeOutcome>,
}

impl PendingValidation {
    /// 結果を待つ（キューが止まった場合もエラー付きの結果を返す）
    pub async fn outcome(self) -> GeocodeOutcome {
        self.receiver
            .await
            .unwrap_or_else(|_| GeocodeOutcome::failed("検証キューが停止しました"))
    }
}

/// レート制限付き住所検証キュー
///
/// clone しても同じキューを共有する。
pub struct RateLimitedValidator<G, C = TokioClock> {
    inner: Arc<Inner<G, C>>,
}

impl<G, C> Clone for RateLimitedValidator<G, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G> RateLimitedValidator<G, TokioClock>
where
    G: Geocoder + 'static,
{
    pub fn new(geocoder: G, min_interval: Duration) -> Self {
        Self::with_clock(geocoder, TokioClock, min_interval)
    }
}

impl<G, C> RateLimitedValidator<G, C>
where
    G: Geocoder + 'static,
    C: Clock + 'static,
{
    pub fn with_clock(geocoder: G, clock: C, min_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                geocoder,
                clock,
                min_interval,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.inner.min_interval
    }

    /// 待機中の要求数（処理中の1件は含まない）
    pub fn queued(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// 要求をキュー末尾に追加（tokioランタイム内で呼ぶこと）
    pub fn enqueue(&self, address: impl Into<String>) -> PendingValidation {
        let (responder, receiver) = oneshot::channel();

        let start = {
            let mut state = self.inner.lock();
            state.pending.push_back(QueueItem {
                address: address.into(),
                responder,
            });
            !std::mem::replace(&mut state.processing, true)
        };

        if start {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.drain().await });
        }

        PendingValidation { receiver }
    }

    /// 住所を検証（キューの順番が来るまで待つ）
    pub async fn validate_address(&self, address: impl Into<String>) -> GeocodeOutcome {
        self.enqueue(address).outcome().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, RouteAiError};
    use crate::geocode::GeocodeSearch;

    /// 待機すると即座に時刻が進むクロック
    struct FakeClock {
        origin: Instant,
        offset: Mutex<Duration>,
    }

    impl FakeClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                origin: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            })
        }

        fn advance(&self, duration: Duration) {
            *self.offset.lock().unwrap() += duration;
        }

        fn elapsed(&self) -> Duration {
            *self.offset.lock().unwrap()
        }
    }

    #[async_trait]
    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        async fn sleep(&self, duration: Duration) {
            self.advance(duration);
            tokio::task::yield_now().await;
        }
    }

    /// 送信時刻を記録するジオコーダ
    struct RecordingGeocoder {
        clock: Arc<FakeClock>,
        latency: Duration,
        calls: Mutex<Vec<(String, Duration)>>,
    }

    impl RecordingGeocoder {
        fn new(clock: Arc<FakeClock>, latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                clock,
                latency,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, Duration)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Geocoder for RecordingGeocoder {
        async fn search(&self, address: &str) -> Result<GeocodeSearch> {
            self.calls
                .lock()
                .unwrap()
                .push((address.to_string(), self.clock.elapsed()));
            self.clock.advance(self.latency);

            if address.contains("panic") {
                panic!("geocoder panicked on {}", address);
            }
            if address.contains("fail") {
                return Err(RouteAiError::Geocode("Nominatim API error: 503".into()));
            }
            if address.contains("nowhere") {
                return Ok(GeocodeSearch::default());
            }
            Ok(GeocodeSearch {
                verified: true,
                latitude: Some(43.6),
                longitude: Some(-116.2),
            })
        }
    }

    fn assert_spaced(calls: &[(String, Duration)], interval: Duration) {
        for pair in calls.windows(2) {
            let gap = pair[1].1 - pair[0].1;
            assert!(gap >= interval, "送信間隔が短い: {:?} ({} → {})", gap, pair[0].0, pair[1].0);
        }
    }

    #[tokio::test]
    async fn test_burst_is_spaced_and_fifo() {
        let clock = FakeClock::new();
        let geocoder = RecordingGeocoder::new(Arc::clone(&clock), Duration::ZERO);
        let validator = RateLimitedValidator::with_clock(
            Arc::clone(&geocoder),
            Arc::clone(&clock),
            DEFAULT_MIN_INTERVAL,
        );

        let addresses: Vec<String> = (1..=5).map(|i| format!("{} Main St", i)).collect();
        let pending: Vec<_> = addresses.iter().map(|a| validator.enqueue(a.clone())).collect();

        for p in pending {
            let outcome = p.outcome().await;
            assert!(outcome.verified);
            assert_eq!(outcome.coordinates(), Some((43.6, -116.2)));
        }

        let calls = geocoder.calls();
        let order: Vec<&str> = calls.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(order, addresses.iter().map(String::as_str).collect::<Vec<_>>());
        assert_spaced(&calls, DEFAULT_MIN_INTERVAL);
        // 先頭は待たずに送信
        assert_eq!(calls[0].1, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_slow_request_counts_toward_interval() {
        let clock = FakeClock::new();
        let geocoder = RecordingGeocoder::new(Arc::clone(&clock), Duration::from_millis(500));
        let validator = RateLimitedValidator::with_clock(
            Arc::clone(&geocoder),
            Arc::clone(&clock),
            DEFAULT_MIN_INTERVAL,
        );

        let a = validator.enqueue("1 First Ave");
        let b = validator.enqueue("2 Second Ave");
        a.outcome().await;
        b.outcome().await;

        let calls = geocoder.calls();
        // 送信開始基準で1.1秒、応答待ちの0.5秒を含む
        assert_eq!(calls[1].1 - calls[0].1, DEFAULT_MIN_INTERVAL);
    }

    #[tokio::test]
    async fn test_failure_does_not_block_queue() {
        let clock = FakeClock::new();
        let geocoder = RecordingGeocoder::new(Arc::clone(&clock), Duration::ZERO);
        let validator = RateLimitedValidator::with_clock(
            Arc::clone(&geocoder),
            Arc::clone(&clock),
            DEFAULT_MIN_INTERVAL,
        );

        let first = validator.enqueue("1 fail Rd");
        let second = validator.enqueue("2 nowhere Ln");
        let third = validator.enqueue("3 Oak St");

        let first = first.outcome().await;
        assert!(!first.verified);
        assert_eq!(first.error.as_deref(), Some("ジオコーディングエラー: Nominatim API error: 503"));

        let second = second.outcome().await;
        assert!(!second.verified);
        assert!(second.error.is_none());
        assert!(second.coordinates().is_none());

        assert!(third.outcome().await.verified);

        // 失敗した要求も間隔の基準になる
        assert_spaced(&geocoder.calls(), DEFAULT_MIN_INTERVAL);
    }

    #[tokio::test]
    async fn test_panicking_geocoder_releases_waiters() {
        let clock = FakeClock::new();
        let geocoder = RecordingGeocoder::new(Arc::clone(&clock), Duration::ZERO);
        let validator = RateLimitedValidator::with_clock(
            Arc::clone(&geocoder),
            Arc::clone(&clock),
            DEFAULT_MIN_INTERVAL,
        );

        let first = validator.enqueue("1 panic Way");
        let second = validator.enqueue("2 Main St");

        // 処理ループが落ちても待機側は停止エラーで戻る
        let first = first.outcome().await;
        assert!(!first.verified);
        assert_eq!(first.error.as_deref(), Some("検証キューが停止しました"));
        assert!(second.outcome().await.error.is_some());
        assert_eq!(validator.queued(), 0);

        // 次の投入で処理ループが再起動する
        assert!(validator.validate_address("3 Main St").await.verified);

        let calls = geocoder.calls();
        let order: Vec<&str> = calls.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(order, vec!["1 panic Way", "3 Main St"]);
        assert_spaced(&calls, DEFAULT_MIN_INTERVAL);
    }

    #[tokio::test]
    async fn test_restarts_after_idle() {
        let clock = FakeClock::new();
        let geocoder = RecordingGeocoder::new(Arc::clone(&clock), Duration::ZERO);
        let validator = RateLimitedValidator::with_clock(
            Arc::clone(&geocoder),
            Arc::clone(&clock),
            DEFAULT_MIN_INTERVAL,
        );

        assert!(validator.validate_address("1 Main St").await.verified);
        // キューが空になった後の投入でも処理が再開し、間隔も守られる
        clock.advance(Duration::from_millis(300));
        assert!(validator.validate_address("2 Main St").await.verified);

        let calls = geocoder.calls();
        assert_eq!(calls.len(), 2);
        assert_spaced(&calls, DEFAULT_MIN_INTERVAL);
        assert_eq!(validator.queued(), 0);
    }

    #[tokio::test]
    async fn test_idle_longer_than_interval_does_not_wait() {
        let clock = FakeClock::new();
        let geocoder = RecordingGeocoder::new(Arc::clone(&clock), Duration::ZERO);
        let validator = RateLimitedValidator::with_clock(
            Arc::clone(&geocoder),
            Arc::clone(&clock),
            DEFAULT_MIN_INTERVAL,
        );

        validator.validate_address("1 Main St").await;
        clock.advance(Duration::from_secs(5));
        validator.validate_address("2 Main St").await;

        let calls = geocoder.calls();
        assert_eq!(calls[1].1, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_spacing() {
        struct AlwaysFound;

        #[async_trait]
        impl Geocoder for AlwaysFound {
            async fn search(&self, _address: &str) -> Result<GeocodeSearch> {
                Ok(GeocodeSearch {
                    verified: true,
                    ..Default::default()
                })
            }
        }

        let validator = RateLimitedValidator::new(AlwaysFound, DEFAULT_MIN_INTERVAL);
        let start = Instant::now();

        let pending: Vec<_> = (0..3).map(|i| validator.enqueue(format!("{} Elm St", i))).collect();
        for p in pending {
            assert!(p.outcome().await.verified);
        }

        // 3件目は2間隔分待つ
        assert!(start.elapsed() >= DEFAULT_MIN_INTERVAL * 2);
    }
}
