//! In-memory campaign queue with a single background drain worker.
//!
//! Campaigns are processed strictly sequentially with a randomized pause
//! between sends: rate limiting by construction, not a correctness need.
//! Nothing survives a process restart.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use zapcast_core::campaign::{CampaignJob, MediaFile, Target};
use zapcast_core::config::CampaignConfig;
use zapcast_core::error::BridgeError;
use zapcast_core::phone;
use zapcast_core::traits::SessionClient;

/// FIFO queue of campaign jobs, drained by at most one worker at a time.
pub struct CampaignQueue {
    session: Arc<dyn SessionClient>,
    config: CampaignConfig,
    jobs: Mutex<VecDeque<CampaignJob>>,
    /// Re-entrancy guard: set while a drain task is running.
    draining: AtomicBool,
}

impl CampaignQueue {
    pub fn new(session: Arc<dyn SessionClient>, config: CampaignConfig) -> Arc<Self> {
        Arc::new(Self {
            session,
            config,
            jobs: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        })
    }

    /// Jobs still waiting in the queue (the job currently being drained is
    /// no longer counted).
    pub fn pending(&self) -> usize {
        self.jobs.lock().expect("queue poisoned").len()
    }

    /// Append a job and make sure a drain worker is running.
    pub fn enqueue(self: &Arc<Self>, job: CampaignJob) {
        self.jobs.lock().expect("queue poisoned").push_back(job);
        self.kick();
    }

    /// Spawn the drain worker unless one is already active.
    fn kick(self: &Arc<Self>) {
        if self.draining.swap(true, Ordering::SeqCst) {
            return;
        }
        let queue = Arc::clone(self);
        tokio::spawn(async move { queue.drain().await });
    }

    fn pop(&self) -> Option<CampaignJob> {
        self.jobs.lock().expect("queue poisoned").pop_front()
    }

    async fn drain(self: Arc<Self>) {
        loop {
            while self.session.is_ready() {
                let Some(job) = self.pop() else { break };
                if self.process_job(job).await {
                    // Session dropped mid-job. Leave the remaining jobs
                    // queued for a future drain once reconnected.
                    break;
                }
            }

            self.draining.store(false, Ordering::SeqCst);
            // A job may have been enqueued between the last pop and the
            // guard release; reclaim the guard and keep going if so.
            if self.jobs.lock().expect("queue poisoned").is_empty()
                || !self.session.is_ready()
                || self.draining.swap(true, Ordering::SeqCst)
            {
                return;
            }
        }
    }

    /// Process one job. Returns `true` if the job was aborted because the
    /// session readiness flag dropped; remaining targets are not retried.
    async fn process_job(&self, job: CampaignJob) -> bool {
        info!("campaign batch started: {} targets", job.targets.len());

        for target in &job.targets {
            if !self.session.is_ready() {
                warn!("campaign aborted: session disconnected");
                return true;
            }

            let digits = phone::normalize(&target.phone, &self.config.country_code);
            let dest = match self.session.resolve(&digits).await {
                Ok(dest) => dest,
                Err(e) => {
                    warn!("skipping target {digits}: {e}");
                    continue;
                }
            };

            match self.send_target(&dest, target, &job.media_files).await {
                Ok(()) => info!("sent -> {digits}"),
                Err(e) => warn!("send to {digits} failed: {e}"),
            }

            self.pause_between_sends().await;
        }

        info!("campaign batch complete");
        false
    }

    /// Text and/or media for one target, sequentially. The target's message
    /// rides as the caption of the first media file when media is present.
    async fn send_target(
        &self,
        dest: &str,
        target: &Target,
        media_files: &[MediaFile],
    ) -> Result<(), BridgeError> {
        if !media_files.is_empty() {
            for (i, media) in media_files.iter().enumerate() {
                let caption = if i == 0 { target.message.as_deref() } else { None };
                self.session.send_media(dest, media, caption).await?;
            }
        } else if let Some(message) = target.message.as_deref() {
            self.session.send_text(dest, message).await?;
        }
        Ok(())
    }

    /// Humanized pause between sends, uniform in the configured bound.
    async fn pause_between_sends(&self) {
        let lo = self.config.pause_min_ms;
        let hi = self.config.pause_max_ms.max(lo);
        let ms = { rand::thread_rng().gen_range(lo..=hi) };
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockSession;
    use std::time::Instant;

    fn fast_config() -> CampaignConfig {
        CampaignConfig {
            country_code: "55".into(),
            pause_min_ms: 1,
            pause_max_ms: 2,
        }
    }

    fn text_job(phones: &[&str]) -> CampaignJob {
        CampaignJob {
            targets: phones
                .iter()
                .map(|p| Target {
                    phone: (*p).to_string(),
                    message: Some(format!("hello {p}")),
                })
                .collect(),
            media_files: vec![],
        }
    }

    /// Wait until the worker has gone idle with an empty queue.
    async fn drained(queue: &Arc<CampaignQueue>) {
        for _ in 0..200 {
            if queue.pending() == 0 && !queue.draining.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("queue did not drain in time");
    }

    #[tokio::test]
    async fn test_jobs_processed_in_order_none_lost() {
        let session = MockSession::ready();
        let queue = CampaignQueue::new(session.clone(), fast_config());

        queue.enqueue(text_job(&["11911110001", "11911110002"]));
        queue.enqueue(text_job(&["11911110003"]));
        drained(&queue).await;

        let sent = session.sent_texts();
        assert_eq!(sent.len(), 3, "every target across both jobs is sent");
        assert!(sent[0].0.starts_with("5511911110001"));
        assert!(sent[1].0.starts_with("5511911110002"));
        assert!(sent[2].0.starts_with("5511911110003"));
    }

    #[tokio::test]
    async fn test_enqueue_while_draining_is_picked_up() {
        let session = MockSession::ready();
        let queue = CampaignQueue::new(session.clone(), fast_config());

        queue.enqueue(text_job(&["11911110001", "11911110002", "11911110003"]));
        // Let the drain start, then add more work mid-flight.
        tokio::time::sleep(Duration::from_millis(2)).await;
        queue.enqueue(text_job(&["11911110004"]));
        drained(&queue).await;

        assert_eq!(session.sent_texts().len(), 4);
    }

    #[tokio::test]
    async fn test_readiness_loss_aborts_job_keeps_rest_queued() {
        // Session drops after the first successful send.
        let session = MockSession::ready_until(1);
        let queue = CampaignQueue::new(session.clone(), fast_config());

        queue.enqueue(text_job(&["11911110001", "11911110002", "11911110003"]));
        queue.enqueue(text_job(&["11911110004"]));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(
            session.sent_texts().len(),
            1,
            "remaining targets of the aborted job must not be sent"
        );
        assert_eq!(queue.pending(), 1, "the second job stays queued");
    }

    #[tokio::test]
    async fn test_abort_releases_guard_for_next_drain() {
        let session = MockSession::ready_until(1);
        let queue = CampaignQueue::new(session.clone(), fast_config());

        queue.enqueue(text_job(&["11911110001", "11911110002"]));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(session.sent_texts().len(), 1);
        assert!(
            !queue.draining.load(Ordering::SeqCst),
            "guard must be released after an abort"
        );

        // Session comes back; a fresh enqueue starts a new drain.
        session.set_ready(true);
        queue.enqueue(text_job(&["11911110003"]));
        for _ in 0..200 {
            if session.sent_texts().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(session.sent_texts().len(), 2);
    }

    #[tokio::test]
    async fn test_per_target_failure_does_not_halt_batch() {
        let session = MockSession::ready();
        session.fail_sends_to("5511911110002");
        let queue = CampaignQueue::new(session.clone(), fast_config());

        queue.enqueue(text_job(&["11911110001", "11911110002", "11911110003"]));
        drained(&queue).await;

        let sent = session.sent_texts();
        assert_eq!(sent.len(), 2, "failed target is skipped, not fatal");
        assert!(sent[0].0.starts_with("5511911110001"));
        assert!(sent[1].0.starts_with("5511911110003"));
    }

    #[tokio::test]
    async fn test_unresolvable_target_skipped() {
        let session = MockSession::ready();
        let queue = CampaignQueue::new(session.clone(), fast_config());

        // "190" stays 3 digits after normalization and cannot resolve.
        queue.enqueue(text_job(&["190", "11911110001"]));
        drained(&queue).await;

        let sent = session.sent_texts();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.starts_with("5511911110001"));
    }

    #[tokio::test]
    async fn test_media_caption_on_first_file_only() {
        use zapcast_core::campaign::MediaFile;

        let session = MockSession::ready();
        let queue = CampaignQueue::new(session.clone(), fast_config());

        let media = vec![
            MediaFile {
                mimetype: "image/png".into(),
                base64: "aGk=".into(),
                name: Some("a.png".into()),
            },
            MediaFile {
                mimetype: "image/png".into(),
                base64: "aGk=".into(),
                name: Some("b.png".into()),
            },
        ];
        queue.enqueue(CampaignJob {
            targets: vec![Target {
                phone: "11911110001".into(),
                message: Some("promo".into()),
            }],
            media_files: media,
        });
        drained(&queue).await;

        let sent = session.sent_media();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].2.as_deref(), Some("promo"), "caption on first");
        assert!(sent[1].2.is_none(), "no caption on second");
        // No separate text message when media is present.
        assert!(session.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn test_pause_between_sends_within_bound() {
        let session = MockSession::ready();
        let config = CampaignConfig {
            country_code: "55".into(),
            pause_min_ms: 20,
            pause_max_ms: 40,
        };
        let queue = CampaignQueue::new(session.clone(), config);

        let started = Instant::now();
        queue.enqueue(text_job(&["11911110001", "11911110002", "11911110003"]));
        drained(&queue).await;

        let stamps = session.sent_instants();
        assert_eq!(stamps.len(), 3);
        for pair in stamps.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(
                gap >= Duration::from_millis(20),
                "gap below configured minimum: {gap:?}"
            );
            assert!(
                gap < Duration::from_millis(500),
                "gap far above configured maximum: {gap:?}"
            );
        }
        // Sanity: total runtime reflects the pacing, not parallel sends.
        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
