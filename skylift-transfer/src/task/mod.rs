use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    error::TransferError,
    event::TransferObserver,
    model::{TransferState, UploadItem},
};

pub mod http;

/// Called with `(sent, total)` bytes. Transports without length information
/// never call it.
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

#[async_trait]
pub trait UrlIssuer: Send + Sync {
    async fn issue(&self, key: &str, content_type: &str) -> Result<String, TransferError>;
}

#[async_trait]
pub trait ObjectTransport: Send + Sync {
    /// Uploads the item and returns the http status of the response.
    async fn put(
        &self,
        url: &str,
        content_type: &str,
        item: &UploadItem,
        progress: ProgressCallback,
    ) -> Result<u16, TransferError>;
}

pub struct TransferUnit {
    pub content_type: String,
    pub index: usize,
    pub issuer: Arc<dyn UrlIssuer>,
    pub item: UploadItem,
    pub key: String,
    pub observer: Arc<dyn TransferObserver>,
    pub transport: Arc<dyn ObjectTransport>,
}

impl TransferUnit {
    /// Drives the upload to a terminal state. Cancellation resolves to
    /// `Cancelled` and is never reported as an error.
    pub async fn run(self, cancellation: CancellationToken) -> TransferState {
        tracing::debug!("starting transfer {} to {:?}", self.index, self.key);

        let reporter = Arc::new(Reporter::new(self.observer.clone()));
        reporter.started();

        let state = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                tracing::debug!("transfer {} cancelled", self.index);
                TransferState::Cancelled
            }
            result = self.transfer(reporter.clone()) => match result {
                Ok(()) => TransferState::Success,
                Err(error) => {
                    tracing::error!(
                        "transfer {} of {:?} failed: {}",
                        self.index,
                        self.item.source,
                        error
                    );
                    TransferState::Error
                }
            },
        };

        reporter.terminal(state);
        state
    }

    async fn transfer(&self, reporter: Arc<Reporter>) -> Result<(), TransferError> {
        let url = self.issuer.issue(&self.key, &self.content_type).await?;

        let progress: ProgressCallback =
            Arc::new(move |sent: u64, total: u64| reporter.progress(sent, total));
        let status = self
            .transport
            .put(&url, &self.content_type, &self.item, progress)
            .await?;

        if is_success(status) {
            tracing::debug!("transfer {} finished with status {}", self.index, status);
            Ok(())
        } else {
            Err(TransferError::ServerRejected(status))
        }
    }
}

pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Keeps the observer contract: percentages only rise and nothing is
/// reported after the terminal event, even from transport tasks that outlive
/// the unit.
struct Reporter {
    observer: Arc<dyn TransferObserver>,
    state: Mutex<ReporterState>,
}

#[derive(Default)]
struct ReporterState {
    closed: bool,
    percent: u8,
}

impl Reporter {
    fn new(observer: Arc<dyn TransferObserver>) -> Self {
        Self {
            observer,
            state: Mutex::new(ReporterState::default()),
        }
    }

    fn started(&self) {
        self.observer.on_started();
    }

    fn progress(&self, sent: u64, total: u64) {
        if total == 0 {
            return;
        }

        let percent = (sent.min(total) * 100 / total) as u8;
        if let Ok(mut state) = self.state.lock() {
            if state.closed || percent <= state.percent {
                return;
            }

            state.percent = percent;
            self.observer.on_progress(percent);
        }
    }

    fn terminal(&self, terminal: TransferState) {
        match self.state.lock() {
            Ok(mut state) => {
                if state.closed {
                    return;
                }
                state.closed = true;
                self.observer.on_terminal(terminal);
            }
            Err(error) => {
                tracing::error!("reporter state poisoned: {:?}", error);
                self.observer.on_terminal(terminal);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        fn events(&self) -> Vec<String> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }

        fn push(&self, event: String) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }
    }

    impl TransferObserver for RecordingObserver {
        fn on_started(&self) {
            self.push("started".to_owned());
        }

        fn on_progress(&self, percent: u8) {
            self.push(format!("{}%", percent));
        }

        fn on_terminal(&self, state: TransferState) {
            self.push(format!("{:?}", state));
        }
    }

    struct StaticIssuer(Result<String, TransferError>);

    #[async_trait]
    impl UrlIssuer for StaticIssuer {
        async fn issue(&self, _: &str, _: &str) -> Result<String, TransferError> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct StepTransport {
        calls: AtomicUsize,
        status: u16,
        steps: Vec<(u64, u64)>,
        stall: bool,
    }

    #[async_trait]
    impl ObjectTransport for StepTransport {
        async fn put(
            &self,
            _: &str,
            _: &str,
            _: &UploadItem,
            progress: ProgressCallback,
        ) -> Result<u16, TransferError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for (sent, total) in &self.steps {
                progress(*sent, *total);
            }

            if self.stall {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }

            Ok(self.status)
        }
    }

    fn unit(
        issuer: StaticIssuer,
        transport: Arc<StepTransport>,
        observer: Arc<RecordingObserver>,
    ) -> TransferUnit {
        TransferUnit {
            content_type: "text/plain".to_owned(),
            index: 0,
            issuer: Arc::new(issuer),
            item: UploadItem {
                content_type: Some("text/plain".to_owned()),
                relative_path: "a.txt".to_owned(),
                size: 200,
                source: PathBuf::from("a.txt"),
            },
            key: "docs/a.txt".to_owned(),
            observer,
            transport,
        }
    }

    fn ok_issuer() -> StaticIssuer {
        StaticIssuer(Ok("http://bucket/a.txt".to_owned()))
    }

    #[tokio::test]
    async fn success_reports_rising_progress_then_terminal() {
        let observer = Arc::new(RecordingObserver::default());
        let transport = Arc::new(StepTransport {
            status: 200,
            steps: vec![(50, 200), (50, 200), (100, 200), (40, 200), (200, 200)],
            ..Default::default()
        });

        let state = unit(ok_issuer(), transport, observer.clone())
            .run(CancellationToken::new())
            .await;

        assert_eq!(TransferState::Success, state);
        assert_eq!(
            vec!["started", "25%", "50%", "100%", "Success"],
            observer.events()
        );
    }

    #[tokio::test]
    async fn no_content_accepted_as_success() {
        let observer = Arc::new(RecordingObserver::default());
        let transport = Arc::new(StepTransport {
            status: 204,
            ..Default::default()
        });

        let state = unit(ok_issuer(), transport, observer)
            .run(CancellationToken::new())
            .await;

        assert_eq!(TransferState::Success, state);
    }

    #[tokio::test]
    async fn missing_length_omits_progress() {
        let observer = Arc::new(RecordingObserver::default());
        let transport = Arc::new(StepTransport {
            status: 200,
            steps: vec![(10, 0), (20, 0)],
            ..Default::default()
        });

        unit(ok_issuer(), transport, observer.clone())
            .run(CancellationToken::new())
            .await;

        assert_eq!(vec!["started", "Success"], observer.events());
    }

    #[tokio::test]
    async fn rejected_status_resolves_to_error() {
        let observer = Arc::new(RecordingObserver::default());
        let transport = Arc::new(StepTransport {
            status: 403,
            ..Default::default()
        });

        let state = unit(ok_issuer(), transport, observer.clone())
            .run(CancellationToken::new())
            .await;

        assert_eq!(TransferState::Error, state);
        assert_eq!(vec!["started", "Error"], observer.events());
    }

    #[tokio::test]
    async fn failed_url_issue_never_starts_transport() {
        let observer = Arc::new(RecordingObserver::default());
        let transport = Arc::new(StepTransport {
            status: 200,
            ..Default::default()
        });

        let issuer = StaticIssuer(Err(TransferError::UrlIssueFailed("500".to_owned())));
        let state = unit(issuer, transport.clone(), observer)
            .run(CancellationToken::new())
            .await;

        assert_eq!(TransferState::Error, state);
        assert_eq!(0, transport.calls.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_resolves_to_cancelled_not_error() {
        let observer = Arc::new(RecordingObserver::default());
        let transport = Arc::new(StepTransport {
            status: 200,
            steps: vec![(80, 200)],
            stall: true,
            ..Default::default()
        });

        let token = CancellationToken::new();
        let handle = tokio::spawn(unit(ok_issuer(), transport, observer.clone()).run(token.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        let state = handle.await.expect("unit task panicked");

        assert_eq!(TransferState::Cancelled, state);
        assert_eq!(vec!["started", "40%", "Cancelled"], observer.events());
    }

    #[test]
    fn progress_after_terminal_is_dropped() {
        let observer = Arc::new(RecordingObserver::default());
        let reporter = Reporter::new(observer.clone());

        reporter.progress(10, 100);
        reporter.terminal(TransferState::Cancelled);
        reporter.progress(90, 100);
        reporter.terminal(TransferState::Error);

        assert_eq!(vec!["10%", "Cancelled"], observer.events());
    }
}
