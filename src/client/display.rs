//! Display state and its single-transition cell.
//!
//! # State Transitions
//! ```text
//! Loading → Success(text)
//! Loading → Failed(reason)
//! ```
//!
//! The writer half is consumed by `commit`, so a session can settle at most
//! once. If the writer is dropped without committing (the fetch was
//! discarded), readers keep seeing `Loading`.

use serde::Serialize;
use tokio::sync::watch;

use crate::client::fetcher::FetchError;

/// What the viewer sees.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisplayState {
    #[default]
    Loading,
    Success(String),
    Failed(FetchError),
}

impl DisplayState {
    pub fn is_loading(&self) -> bool {
        matches!(self, DisplayState::Loading)
    }

    /// Serializable view, e.g. `{"status":"success","text":"..."}`.
    pub fn view(&self) -> DisplayView<'_> {
        match self {
            DisplayState::Loading => DisplayView {
                status: "loading",
                text: None,
                reason: None,
            },
            DisplayState::Success(text) => DisplayView {
                status: "success",
                text: Some(text),
                reason: None,
            },
            DisplayState::Failed(err) => DisplayView {
                status: "failed",
                text: None,
                reason: Some(err.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DisplayView<'a> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Create a fresh cell in the `Loading` state.
pub fn display_cell() -> (DisplayWriter, DisplayHandle) {
    let (tx, rx) = watch::channel(DisplayState::Loading);
    (DisplayWriter { tx }, DisplayHandle { rx })
}

/// The single writer. Not `Clone`.
#[derive(Debug)]
pub struct DisplayWriter {
    tx: watch::Sender<DisplayState>,
}

impl DisplayWriter {
    /// Perform the one legal transition out of `Loading`.
    /// Returns whether the state changed.
    pub fn commit(self, outcome: Result<String, FetchError>) -> bool {
        let next = match outcome {
            Ok(text) => DisplayState::Success(text),
            Err(err) => DisplayState::Failed(err),
        };
        self.tx.send_if_modified(|state| {
            if state.is_loading() {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

/// Read side; cheap to clone.
#[derive(Debug, Clone)]
pub struct DisplayHandle {
    rx: watch::Receiver<DisplayState>,
}

impl DisplayHandle {
    pub fn current(&self) -> DisplayState {
        self.rx.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        !self.rx.borrow().is_loading()
    }

    /// Wait until the state leaves `Loading`. If the writer goes away
    /// without committing, the state is `Loading` forever and that is
    /// returned.
    pub async fn settled(&self) -> DisplayState {
        let mut rx = self.rx.clone();
        let state = match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            Err(_) => self.rx.borrow().clone(),
        };
        state
    }
}
