//! View lifetime and cancellation of in-flight stages.
//!
//! A [`ViewScope`] lives as long as the view that started the pipeline.
//! Tearing it down (or dropping it) cancels every [`ViewToken`] derived from
//! it; a stage that resolves afterwards is discarded instead of writing into
//! state that no longer has a view.

use std::future::Future;

use tokio::sync::watch;
use uuid::Uuid;

use crate::stage::Stage;

#[derive(Debug)]
pub struct ViewScope {
    id: Uuid,
    torn_down: watch::Sender<bool>,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewScope {
    #[must_use]
    pub fn new() -> Self {
        let (torn_down, _rx) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            torn_down,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn token(&self) -> ViewToken {
        ViewToken {
            view: self.id,
            torn_down: self.torn_down.subscribe(),
        }
    }

    /// Cancels all tokens. Idempotent.
    pub fn teardown(&self) {
        let first = self.torn_down.send_if_modified(|torn| !std::mem::replace(torn, true));
        if first {
            tracing::debug!(view = %self.id, "view torn down");
        }
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Cancellation signal handed to each pipeline run.
#[derive(Debug, Clone)]
pub struct ViewToken {
    view: Uuid,
    torn_down: watch::Receiver<bool>,
}

impl ViewToken {
    #[must_use]
    pub fn view_id(&self) -> Uuid {
        self.view
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.torn_down.borrow()
    }

    /// Resolves once the owning scope is torn down or dropped.
    pub async fn cancelled(&self) {
        let mut rx = self.torn_down.clone();
        // An error means the scope is gone, which is cancellation too.
        let _ = rx.wait_for(|torn| *torn).await;
    }

    /// Runs `stage_future` unless the view is torn down first.
    ///
    /// Returns `None` when the result must be discarded.
    pub async fn guard<F: Future>(&self, stage: Stage, stage_future: F) -> Option<F::Output> {
        if self.is_cancelled() {
            tracing::debug!(view = %self.view, %stage, "view already torn down; stage skipped");
            return None;
        }
        tokio::select! {
            biased;
            () = self.cancelled() => {
                tracing::debug!(view = %self.view, %stage, "view torn down; stage result discarded");
                None
            }
            output = stage_future => Some(output),
        }
    }
}
