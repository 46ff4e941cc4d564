//! # Scanner Service
//!
//! Tokio driver around the pure burst classifier.
//!
//! The classifier decides *what* commits and *when* it should commit; this
//! service owns the actual timer. One background task multiplexes the key
//! event stream with a single cancelable sleep armed from
//! [`ScanClassifier::commit_deadline`].
//!
//! ## Teardown
//! `stop()` (or dropping the service) ends the task. The sleep lives
//! inside the task, so after teardown there is no callback left anywhere
//! that could fire against dead state - reattaching simply spawns a fresh
//! service with a fresh classifier.

use tokio::sync::mpsc;
use tracing::{debug, info};

use caja_core::scanner::{KeyPress, ScanClassifier, ScannerConfig};

use crate::error::{ErrorCode, TerminalError, TerminalResult};

/// Handle to the scanner driver task.
#[derive(Debug, Clone)]
pub struct ScannerService {
    key_tx: mpsc::Sender<KeyPress>,
    stop_tx: mpsc::Sender<()>,
}

impl ScannerService {
    /// Spawns the driver. Returns the service handle and the stream of
    /// completed codes.
    pub fn spawn(config: ScannerConfig) -> (ScannerService, mpsc::Receiver<String>) {
        let (key_tx, key_rx) = mpsc::channel::<KeyPress>(64);
        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        let (codes_tx, codes_rx) = mpsc::channel::<String>(16);

        tokio::spawn(run(ScanClassifier::new(config), key_rx, stop_rx, codes_tx));

        (ScannerService { key_tx, stop_tx }, codes_rx)
    }

    /// Feeds one keystroke to the classifier.
    pub async fn key(&self, press: KeyPress) -> TerminalResult<()> {
        self.key_tx
            .send(press)
            .await
            .map_err(|_| TerminalError::new(ErrorCode::Internal, "Scanner service is stopped"))
    }

    /// Stops the driver and cancels any pending commit timer.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(()).await;
    }
}

/// Driver loop: keys in, codes out, one commit timer in between.
async fn run(
    mut classifier: ScanClassifier,
    mut key_rx: mpsc::Receiver<KeyPress>,
    mut stop_rx: mpsc::Receiver<()>,
    codes_tx: mpsc::Sender<String>,
) {
    debug!("Scanner service started");

    loop {
        let deadline = classifier.commit_deadline();

        tokio::select! {
            maybe_key = key_rx.recv() => match maybe_key {
                None => break,
                Some(press) => {
                    let now = tokio::time::Instant::now().into_std();
                    if let Some(code) = classifier.on_key(&press, now) {
                        info!(%code, "Scanner code committed (enter)");
                        if codes_tx.send(code).await.is_err() {
                            break;
                        }
                    }
                }
            },

            _ = stop_rx.recv() => break,

            _ = commit_wait(deadline) => {
                let now = tokio::time::Instant::now().into_std();
                if let Some(code) = classifier.on_deadline(now) {
                    info!(%code, "Scanner code committed (timer)");
                    if codes_tx.send(code).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    // Dropping the classifier here is the teardown: no timer outlives it.
    classifier.reset();
    debug!("Scanner service stopped");
}

/// Sleeps until the commit deadline, or forever when none is armed.
async fn commit_wait(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await
        }
        None => std::future::pending().await,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use caja_core::scanner::Key;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn feed(service: &ScannerService, code: &str) {
        for c in code.chars() {
            service.key(KeyPress::char(c)).await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_commits_after_idle_window() {
        let (service, mut codes) = ScannerService::spawn(ScannerConfig::default());

        feed(&service, "7790895000782").await;

        let code = timeout(Duration::from_secs(1), codes.recv())
            .await
            .expect("commit timer never fired")
            .expect("code stream closed");
        assert_eq!(code, "7790895000782");
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_commits_without_waiting() {
        let (service, mut codes) = ScannerService::spawn(ScannerConfig::default());

        feed(&service, "ABC-123").await;
        service.key(KeyPress::key(Key::Enter)).await.unwrap();

        let code = timeout(Duration::from_millis(10), codes.recv())
            .await
            .expect("enter commit did not arrive")
            .expect("code stream closed");
        assert_eq!(code, "ABC-123");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_typing_never_emits() {
        let (service, mut codes) = ScannerService::spawn(ScannerConfig::default());

        // Human-speed keystrokes: each one commits alone and is too short.
        for c in "779".chars() {
            service.key(KeyPress::char(c)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(codes.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_commit() {
        let (service, mut codes) = ScannerService::spawn(ScannerConfig::default());

        feed(&service, "7790895").await;
        service.stop().await;

        // The task is gone: the code stream closes without ever emitting.
        let ended = timeout(Duration::from_secs(1), codes.recv())
            .await
            .expect("stream did not close");
        assert!(ended.is_none());

        // Further keys are rejected, not silently buffered.
        assert!(service.key(KeyPress::char('1')).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_focused_field_input_is_ignored() {
        let (service, mut codes) = ScannerService::spawn(ScannerConfig::default());

        for c in "7790895000782".chars() {
            service
                .key(KeyPress {
                    key: Key::Char(c),
                    modifier_held: false,
                    editing_focused: true,
                })
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(codes.try_recv().is_err());
    }
}
