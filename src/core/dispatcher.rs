//! Rate-limited dispatch of rendered messages.
//!
//! A single coordinator releases recipients in fixed-size batches, one batch
//! per interval tick, onto a job queue. A fixed number of workers pull from
//! the queue, render and send. Releasing a batch never waits for earlier
//! sends to finish; the coordinator only waits for them once, at the end,
//! when it drains the worker pool.
//!
//! Releasing a batch only makes work available. Workers additionally pass a
//! sliding send window before each send, so that no more than `batch_size`
//! sends start within any `batch_interval_ms`, even when a backlog built up
//! behind slow sends is drained at once.

use crate::core::render::render_message;
use crate::domain::model::{DispatchFailure, DispatchOutcome, DispatchReport, Recipient};
use crate::domain::ports::MessageSender;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum sends in flight at once.
    pub concurrency: usize,
    /// Messages released per interval.
    pub batch_size: usize,
    pub batch_interval_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 16,
            batch_size: 19,
            batch_interval_ms: 1001,
        }
    }
}

impl DispatchConfig {
    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }

    pub fn batch_count(&self, total: usize) -> usize {
        total.div_ceil(self.batch_size.max(1))
    }
}

/// Snapshot published after every individual outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    pub sent: usize,
    pub failed: usize,
}

impl Progress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed * 100) / self.total) as u8
    }

    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

/// Outcome accumulator shared by every worker.
struct ProgressTracker {
    total: usize,
    sent: AtomicUsize,
    failed: AtomicUsize,
    publisher: Arc<watch::Sender<Progress>>,
}

impl ProgressTracker {
    fn new(total: usize, publisher: Arc<watch::Sender<Progress>>) -> Self {
        publisher.send_replace(Progress {
            total,
            ..Progress::default()
        });
        Self {
            total,
            sent: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            publisher,
        }
    }

    fn record(&self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Sent => self.sent.fetch_add(1, Ordering::SeqCst),
            DispatchOutcome::Failed(_) => self.failed.fetch_add(1, Ordering::SeqCst),
        };
        let snapshot = self.snapshot();
        // 併發下可能晚到的舊快照，不可覆蓋較新的
        self.publisher.send_if_modified(|current| {
            if snapshot.completed > current.completed {
                *current = snapshot;
                true
            } else {
                false
            }
        });
    }

    fn snapshot(&self) -> Progress {
        let sent = self.sent.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        Progress {
            total: self.total,
            completed: sent + failed,
            sent,
            failed,
        }
    }
}

/// Start times of the most recent sends, at most `limit` of them.
struct SendWindow {
    limit: usize,
    interval: Duration,
    starts: Mutex<VecDeque<Instant>>,
}

impl SendWindow {
    fn new(limit: usize, interval: Duration) -> Self {
        Self {
            limit,
            interval,
            starts: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    /// Waits until one more send may start without exceeding `limit` starts
    /// within `interval`, then records the start.
    async fn admit(&self) {
        let mut starts = self.starts.lock().await;
        if starts.len() >= self.limit {
            // 第 limit+1 次送出必須距離最舊的一次至少一個間隔
            if let Some(oldest) = starts.pop_front() {
                tokio::time::sleep_until(oldest + self.interval).await;
            }
        }
        starts.push_back(Instant::now());
    }
}

struct SendJob {
    index: usize,
    recipient: Recipient,
}

pub struct Dispatcher {
    sender: Arc<dyn MessageSender>,
    config: DispatchConfig,
    progress: Arc<watch::Sender<Progress>>,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn MessageSender>, config: DispatchConfig) -> Self {
        let (progress, _) = watch::channel(Progress::default());
        Self {
            sender,
            config,
            progress: Arc::new(progress),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Progress updates for the current or next run. Never blocks the dispatcher.
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    /// Sends one rendered message per recipient and reports the outcome.
    ///
    /// Every recipient is attempted exactly once; failures are collected in
    /// the report and never stop later sends.
    pub async fn dispatch(&self, template: &str, recipients: Vec<Recipient>) -> DispatchReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let total = recipients.len();
        let tracker = Arc::new(ProgressTracker::new(total, self.progress.clone()));

        let batch_size = self.config.batch_size.max(1);
        let worker_count = self.config.concurrency.max(1).min(total.max(1));

        tracing::info!("🚀 Sending {} messages...", total);
        tracing::info!(
            "🧵 {} workers, {} messages per {}ms",
            worker_count,
            batch_size,
            self.config.batch_interval_ms
        );

        let (job_tx, job_rx) = mpsc::unbounded_channel::<SendJob>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let template: Arc<str> = Arc::from(template);
        let window = Arc::new(SendWindow::new(batch_size, self.config.batch_interval()));

        let mut pool = JoinSet::new();
        for worker_id in 0..worker_count {
            pool.spawn(run_worker(
                worker_id,
                job_rx.clone(),
                self.sender.clone(),
                template.clone(),
                window.clone(),
                tracker.clone(),
            ));
        }

        // 排程：每個間隔釋出一批，不等待前一批完成
        let mut ticker = (self.config.batch_interval_ms > 0).then(|| {
            let mut ticker = tokio::time::interval(self.config.batch_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        let mut batches = 0;
        let mut pending = recipients.into_iter().enumerate();
        loop {
            let batch: Vec<(usize, Recipient)> = pending.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }
            if let Some(ticker) = ticker.as_mut() {
                ticker.tick().await;
            }
            batches += 1;
            tracing::debug!(
                "📤 Releasing batch {} ({} messages) at {:?}",
                batches,
                batch.len(),
                start.elapsed()
            );
            for (index, recipient) in batch {
                if job_tx.send(SendJob { index, recipient }).is_err() {
                    tracing::error!("❗️ No workers left to accept message #{}", index);
                }
            }
        }
        drop(job_tx);

        // Drain: 等待所有工作者處理完佇列
        let mut failures = Vec::new();
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(mut worker_failures) => failures.append(&mut worker_failures),
                Err(e) => tracing::error!("❗️ Dispatch worker aborted: {}", e),
            }
        }
        failures.sort_by_key(|f: &DispatchFailure| f.index);

        let progress = tracker.snapshot();
        if progress.completed < total {
            tracing::error!(
                "❗️ {} messages have no recorded outcome",
                total - progress.completed
            );
        }

        let report = DispatchReport {
            attempted: progress.completed,
            sent: progress.sent,
            failed: progress.failed,
            batches,
            started_at,
            finished_at: Utc::now(),
            elapsed: start.elapsed(),
            failures,
        };

        tracing::info!(
            "✅ Dispatch finished: {} sent, {} failed ({:.3}s)",
            report.sent,
            report.failed,
            report.elapsed.as_secs_f64()
        );
        report
    }
}

async fn run_worker(
    worker_id: usize,
    jobs: Arc<Mutex<mpsc::UnboundedReceiver<SendJob>>>,
    sender: Arc<dyn MessageSender>,
    template: Arc<str>,
    window: Arc<SendWindow>,
    tracker: Arc<ProgressTracker>,
) -> Vec<DispatchFailure> {
    let mut failures = Vec::new();

    loop {
        let job = {
            let mut queue = jobs.lock().await;
            queue.recv().await
        };
        let Some(SendJob { index, recipient }) = job else {
            break;
        };

        let message = render_message(&template, &recipient);
        window.admit().await;
        let outcome = match sender.send(&message.to, &message.body).await {
            Ok(()) => DispatchOutcome::Sent,
            Err(e) => {
                tracing::warn!("❗️ Message #{} to {} failed: {}", index, message.to, e);
                DispatchOutcome::Failed(e.to_string())
            }
        };
        tracker.record(&outcome);

        if let DispatchOutcome::Failed(error) = outcome {
            failures.push(DispatchFailure {
                index,
                recipient,
                error,
            });
        }
    }

    tracing::trace!("Worker {} drained", worker_id);
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CanonicalPhone, FieldMap};
    use crate::domain::ports::SendError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    /// Records each call with the (virtual) instant it started.
    #[derive(Default)]
    struct RecordingSender {
        calls: StdMutex<Vec<(String, String, Instant)>>,
        fail_for: HashSet<String>,
        delay: Duration,
        /// Only the first this many calls are delayed.
        slow_first: Option<usize>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send(&self, to: &CanonicalPhone, body: &str) -> Result<(), SendError> {
            let call_no = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((to.as_str().to_string(), body.to_string(), Instant::now()));
                calls.len() - 1
            };
            let slow = self.slow_first.map_or(true, |n| call_no < n);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if slow && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_for.contains(to.as_str()) {
                Err(SendError::Rejected {
                    status: 400,
                    body: "invalid destination".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn recipients(count: usize) -> Vec<Recipient> {
        (0..count)
            .map(|i| {
                let mut fields = FieldMap::new();
                fields.insert("name".to_string(), serde_json::json!(format!("R{i}")));
                Recipient::new(CanonicalPhone::new(format!("+1415555{:04}", i)), fields)
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_paces_batches_by_interval() {
        let sender = Arc::new(RecordingSender::default());
        let dispatcher = Dispatcher::new(
            sender.clone(),
            DispatchConfig {
                concurrency: 16,
                batch_size: 19,
                batch_interval_ms: 1000,
            },
        );

        let report = dispatcher.dispatch("Hi {name}", recipients(40)).await;

        assert_eq!(report.batches, 3);
        assert_eq!(report.sent, 40);
        assert_eq!(report.failed, 0);
        assert!(report.elapsed >= Duration::from_millis(2000));

        let calls = sender.calls.lock().unwrap();
        let first = calls.iter().map(|c| c.2).min().unwrap();
        let mut per_second = [0usize; 3];
        for (_, _, at) in calls.iter() {
            let slot = (at.duration_since(first).as_millis() / 1000) as usize;
            per_second[slot] += 1;
        }
        assert_eq!(per_second, [19, 19, 2]);
        assert!(max_starts_within(&calls, Duration::from_millis(1000)) <= 19);
    }

    fn max_starts_within(calls: &[(String, String, Instant)], window: Duration) -> usize {
        let mut starts: Vec<Instant> = calls.iter().map(|c| c.2).collect();
        starts.sort();
        (0..starts.len())
            .map(|i| starts[i..].iter().take_while(|t| t.duration_since(starts[i]) < window).count())
            .max()
            .unwrap_or(0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_backlog_after_slow_sends_stays_under_rate_ceiling() {
        // 前 16 筆卡住 5 秒，期間釋出的批次堆積在佇列裡
        let sender = Arc::new(RecordingSender {
            delay: Duration::from_millis(5000),
            slow_first: Some(16),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(sender.clone(), DispatchConfig::default());

        let report = dispatcher.dispatch("x", recipients(100)).await;

        assert_eq!(report.sent, 100);
        let calls = sender.calls.lock().unwrap();
        assert_eq!(calls.len(), 100);
        let busiest = max_starts_within(&calls, Duration::from_millis(1001));
        assert!(busiest <= 19, "{} sends started within one interval", busiest);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_does_not_wait_for_slow_sends() {
        let sender = Arc::new(RecordingSender {
            delay: Duration::from_millis(5000),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(
            sender.clone(),
            DispatchConfig {
                concurrency: 40,
                batch_size: 10,
                batch_interval_ms: 1000,
            },
        );

        let report = dispatcher.dispatch("x", recipients(30)).await;

        let calls = sender.calls.lock().unwrap();
        let first = calls.iter().map(|c| c.2).min().unwrap();
        let last = calls.iter().map(|c| c.2).max().unwrap();
        // 第三批在第一批完成前就已送出
        assert_eq!(last.duration_since(first), Duration::from_millis(2000));
        assert_eq!(report.sent, 30);
        assert!(report.elapsed >= Duration::from_millis(7000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_bounds_in_flight_sends() {
        let sender = Arc::new(RecordingSender {
            delay: Duration::from_millis(50),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(
            sender.clone(),
            DispatchConfig {
                concurrency: 4,
                batch_size: 19,
                batch_interval_ms: 1000,
            },
        );

        let report = dispatcher.dispatch("x", recipients(19)).await;

        assert_eq!(report.sent, 19);
        assert_eq!(sender.max_in_flight.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_failure_is_reported_and_run_completes() {
        let all = recipients(25);
        let failing = all[7].phone().as_str().to_string();
        let sender = Arc::new(RecordingSender {
            fail_for: HashSet::from([failing.clone()]),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(sender.clone(), DispatchConfig::default());

        let report = dispatcher.dispatch("Hi {name}", all).await;

        assert_eq!(report.attempted, 25);
        assert_eq!(report.sent, 24);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 7);
        assert_eq!(report.failures[0].recipient.phone().as_str(), failing);
        assert!(report.failures[0].error.contains("invalid destination"));
        assert_eq!(sender.calls.lock().unwrap().len(), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renders_each_message_for_its_recipient() {
        let sender = Arc::new(RecordingSender::default());
        let dispatcher = Dispatcher::new(sender.clone(), DispatchConfig::default());

        dispatcher.dispatch("Hi {name}", recipients(3)).await;

        let mut calls: Vec<(String, String)> = sender
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(to, body, _)| (to.clone(), body.clone()))
            .collect();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                ("+14155550000".to_string(), "Hi R0".to_string()),
                ("+14155550001".to_string(), "Hi R1".to_string()),
                ("+14155550002".to_string(), "Hi R2".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_reaches_total() {
        let sender = Arc::new(RecordingSender::default());
        let dispatcher = Dispatcher::new(sender, DispatchConfig::default());
        let progress = dispatcher.subscribe();

        dispatcher.dispatch("x", recipients(5)).await;

        let last = *progress.borrow();
        assert_eq!(last.total, 5);
        assert_eq!(last.completed, 5);
        assert!(last.is_done());
        assert_eq!(last.percent(), 100);
    }

    #[tokio::test]
    async fn test_empty_recipient_list_returns_immediately() {
        let sender = Arc::new(RecordingSender::default());
        let dispatcher = Dispatcher::new(sender, DispatchConfig::default());

        let report = dispatcher.dispatch("x", Vec::new()).await;

        assert_eq!(report.attempted, 0);
        assert_eq!(report.batches, 0);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_batch_count() {
        let config = DispatchConfig::default();
        assert_eq!(config.batch_count(40), 3);
        assert_eq!(config.batch_count(38), 2);
        assert_eq!(config.batch_count(0), 0);
    }
}
