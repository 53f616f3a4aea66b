use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::selection::SelectionHandle;
use crate::supply::question::{Difficulty, QuestionRecord};
use crate::supply::source::{FetchError, FetchRequest, QuestionSource};

pub mod decoder;
pub mod filter;
pub mod question;
pub mod source;


/// Buffer size at or below which a pool tops itself up.
pub const MIN_QUESTION_COUNT: usize = 10;
/// Target buffer size after a successful replenish.
pub const MAX_QUESTION_COUNT: usize = 20;
/// Upstream enforces a rate limit window of 5 seconds per session.
pub const RETRY_DELAY: Duration = Duration::from_millis(5500);

/// A FIFO buffer of not-yet-served questions for one difficulty level.
///
/// Serving (`peek`/`advance`) is synchronous and never fails; absence is
/// `None`. Refilling happens in spawned background tasks the caller never
/// waits on. The `in_flight` flag is the only mutual exclusion: it is set
/// before a fetch task is spawned and cleared in every completion path, so a
/// pool never has two outstanding requests.
pub struct QuestionPool<S: QuestionSource + 'static> {
    inner: Arc<PoolInner<S>>,
}

struct PoolInner<S> {
    difficulty: Difficulty,
    source: Arc<S>,
    selection: SelectionHandle,
    buffer: RwLock<VecDeque<QuestionRecord>>,
    fetch_state: Mutex<FetchState>,
}

#[derive(Default)]
struct FetchState {
    in_flight: bool,
    retry_timer: Option<JoinHandle<()>>,
    transport_failed_once: bool,
    last_error: Option<anyhow::Error>,
    shut_down: bool,
}

impl<S: QuestionSource + 'static> QuestionPool<S> {
    pub fn new(difficulty: Difficulty, source: Arc<S>, selection: SelectionHandle) -> Self {
        QuestionPool {
            inner: Arc::new(PoolInner {
                difficulty,
                source,
                selection,
                buffer: RwLock::new(VecDeque::new()),
                fetch_state: Mutex::new(Default::default()),
            }),
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.inner.difficulty
    }

    pub fn len(&self) -> usize {
        self.inner.buffer.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.buffer.read().is_empty()
    }

    /// The next question to serve, without consuming it. Never triggers a
    /// fetch.
    pub fn peek(&self) -> Option<QuestionRecord> {
        self.inner.buffer.read().front().cloned()
    }

    /// Consumes and returns the next question. Dropping to or below the
    /// low-water mark kicks off a background replenish; the caller is never
    /// blocked on it.
    pub fn advance(&self) -> Option<QuestionRecord> {
        let (record, remaining) = {
            let mut buffer = self.inner.buffer.write();
            let record = buffer.pop_front();
            (record, buffer.len())
        };
        if remaining <= MIN_QUESTION_COUNT {
            self.inner.request_replenish();
        }
        record
    }

    /// Asks the pool to top itself up. No-op while a fetch is in flight or
    /// when the user has deselected every category.
    pub fn request_replenish(&self) {
        self.inner.request_replenish();
    }

    /// Re-filters the resident buffer against the current category selection.
    /// Must be called whenever the selection or the catalogue changes.
    pub fn handle_selection_changed(&self) {
        self.inner.handle_selection_changed();
    }

    /// True while a fetch is outstanding or a back-off retry is pending.
    pub fn is_replenishing(&self) -> bool {
        let state = self.inner.fetch_state.lock();
        state.in_flight || state.retry_timer.is_some()
    }

    /// The network error from the last failed replenish, if retrying did not
    /// recover it. Cleared by reading it or by a later success.
    pub fn take_last_error(&self) -> Option<anyhow::Error> {
        self.inner.fetch_state.lock().last_error.take()
    }

    /// Cancels any pending back-off timer and refuses further fetches. An
    /// already in-flight request is left to finish; its result is discarded
    /// at the guard.
    pub fn shutdown(&self) {
        let mut state = self.inner.fetch_state.lock();
        state.shut_down = true;
        if let Some(timer) = state.retry_timer.take() {
            timer.abort();
        }
    }
}

impl<S: QuestionSource + 'static> Drop for QuestionPool<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<S: QuestionSource + 'static> PoolInner<S> {
    fn request_replenish(self: &Arc<Self>) {
        let request = {
            let selection = self.selection.read();
            if selection.is_empty_selection() {
                return;
            }
            FetchRequest {
                amount: MAX_QUESTION_COUNT - MIN_QUESTION_COUNT,
                difficulty: self.difficulty,
                category_id: selection.single_selected_category(),
            }
        };

        // The flag must be set before the task is spawned, so that a second
        // request arriving before the task runs still sees it.
        {
            let mut state = self.fetch_state.lock();
            if state.in_flight || state.shut_down {
                return;
            }
            state.in_flight = true;
        }

        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let result = pool.source.fetch(request).await;
            pool.complete_replenish(result);
        });
    }

    fn complete_replenish(
        self: &Arc<Self>,
        result: Result<Vec<decoder::WireQuestion>, FetchError>,
    ) {
        {
            let mut state = self.fetch_state.lock();
            if state.shut_down {
                state.in_flight = false;
                return;
            }
        }
        match result {
            Ok(batch) => {
                let raw_empty = batch.is_empty();
                let records = decoder::decode_batch(&batch);
                let (records, selection_active) = {
                    let selection = self.selection.read();
                    (
                        filter::filter_by_categories(
                            records,
                            selection.catalogue(),
                            selection.selected_category_ids(),
                        ),
                        !selection.selected_category_ids().is_empty(),
                    )
                };

                let mut state = self.fetch_state.lock();
                state.in_flight = false;
                state.transport_failed_once = false;
                state.last_error = None;

                if records.is_empty() {
                    // Either the upstream is exhausted for these filters or
                    // everything we got was filtered out client-side. Try
                    // again later rather than starving for good.
                    if raw_empty || selection_active {
                        self.schedule_retry(&mut state);
                    }
                    return;
                }

                let buffered = {
                    let mut buffer = self.buffer.write();
                    buffer.extend(records);
                    buffer.len()
                };
                debug!(
                    "Replenished {} pool, now holding {} question(s)",
                    self.difficulty, buffered
                );
                if buffered <= MIN_QUESTION_COUNT {
                    self.schedule_retry(&mut state);
                }
            }
            Err(FetchError::RateLimited) => {
                debug!("Rate limited while replenishing {} pool", self.difficulty);
                let mut state = self.fetch_state.lock();
                state.in_flight = false;
                self.schedule_retry(&mut state);
            }
            Err(FetchError::Transport(error)) => {
                let mut state = self.fetch_state.lock();
                state.in_flight = false;
                if state.transport_failed_once {
                    warn!(
                        "Giving up on replenishing {} pool: {:#}",
                        self.difficulty, error
                    );
                    state.transport_failed_once = false;
                    state.last_error = Some(error);
                } else {
                    state.transport_failed_once = true;
                    self.schedule_retry(&mut state);
                }
            }
        }
    }

    // One timer per pool. Scheduling while a timer is pending keeps the
    // existing one.
    fn schedule_retry(self: &Arc<Self>, state: &mut FetchState) {
        if state.retry_timer.is_some() || state.shut_down {
            return;
        }
        let pool = Arc::clone(self);
        state.retry_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(RETRY_DELAY).await;
            pool.fetch_state.lock().retry_timer = None;
            pool.request_replenish();
        }));
    }

    fn handle_selection_changed(self: &Arc<Self>) {
        let buffered = {
            let selection = self.selection.read();
            let mut buffer = self.buffer.write();
            let resident: Vec<QuestionRecord> = buffer.drain(..).collect();
            let filtered = filter::filter_by_categories(
                resident,
                selection.catalogue(),
                selection.selected_category_ids(),
            );
            buffer.extend(filtered);
            buffer.len()
        };

        if self.selection.read().is_empty_selection() {
            // Terminal until the user re-enables something. Stop any pending
            // retry so the timer cannot fetch for a selection of nothing.
            let mut state = self.fetch_state.lock();
            if let Some(timer) = state.retry_timer.take() {
                timer.abort();
            }
            return;
        }

        if buffered <= MIN_QUESTION_COUNT {
            self.request_replenish();
        }
    }
}
