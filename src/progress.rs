use ahash::AHashMap;
use tracing::debug;

/// Outcome the backend reports for one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Ok,
    Failed,
}

/// Receives aggregated download progress.
///
/// `percentage` fires only when the overall percentage strictly increases,
/// so implementations can render it directly without de-bouncing.
pub trait ProgressObserver {
    fn payload_started(&mut self, payload: &str);
    fn percentage(&mut self, pct: u8, files_done: usize, total_files: usize);
    fn payload_finished(&mut self, payload: &str, status: DownloadStatus, msg: Option<&str>);
}

/// Aggregates per-payload byte counts from a download phase into one
/// monotonically increasing percentage.
///
/// Overall percentage = bytes done across all in-flight payloads divided
/// by the total announced in [`start`](DownloadTracker::start), clamped
/// to 100. Some backends announce a placeholder total for metadata
/// fetches; once more bytes than the total have been seen, percentage
/// reporting is suppressed for the rest of the phase.
pub struct DownloadTracker<O> {
    observer: O,
    total_files: usize,
    total_bytes: u64,
    files_done: usize,
    done: AHashMap<String, u64>,
    last_pct: u8,
    total_is_estimate: bool,
}

impl<O: ProgressObserver> DownloadTracker<O> {
    pub fn new(observer: O) -> Self {
        Self {
            observer,
            total_files: 0,
            total_bytes: 0,
            files_done: 0,
            done: AHashMap::new(),
            last_pct: 0,
            total_is_estimate: false,
        }
    }

    /// Begin a download phase. Resets all per-phase state.
    pub fn start(&mut self, total_files: usize, total_bytes: u64) {
        debug!("Downloading {total_files} files, {total_bytes} bytes");
        self.total_files = total_files;
        self.total_bytes = total_bytes;
        self.files_done = 0;
        self.done.clear();
        self.last_pct = 0;
        self.total_is_estimate = false;
    }

    /// Per-chunk notification for one payload. The first call for a
    /// payload registers it; later calls update its byte count.
    pub fn progress(&mut self, payload: &str, bytes_done: u64) {
        match self.done.get_mut(payload) {
            None => {
                self.done.insert(payload.to_string(), 0);
                self.observer.payload_started(payload);
            }
            Some(done) => {
                *done = bytes_done;
                self.report();
            }
        }
    }

    pub fn end(&mut self, payload: &str, status: DownloadStatus, msg: Option<&str>) {
        if status == DownloadStatus::Ok {
            self.files_done += 1;
        }
        self.observer.payload_finished(payload, status, msg);
        self.report();
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    fn report(&mut self) {
        let done: u64 = self.done.values().sum();

        if self.total_bytes == 0 || done > self.total_bytes {
            self.total_is_estimate = true;
        }

        if self.total_is_estimate {
            return;
        }

        let pct = (done * 100 / self.total_bytes).min(100) as u8;
        if pct > self.last_pct {
            self.last_pct = pct;
            self.observer
                .percentage(pct, self.files_done, self.total_files);
        }
    }
}
