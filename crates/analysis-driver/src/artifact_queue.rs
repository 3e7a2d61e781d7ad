//! A [`Queue`] fed by a build event stream.
//!
//! Every event is shown to every selector (stateful selectors must see the
//! whole stream). Each selected artifact is turned into compilations by a
//! [`UnitLoader`], which are then handed out one at a time.
//!
//! An artifact stays queued until its load succeeds. A failed load fails
//! the current `next` call; the following call (or a queue resumed from a
//! snapshot) loads it again.

use std::collections::VecDeque;
use std::sync::Arc;

use artifact_selector::{AnySelector, Artifact, ArtifactSelector, BuildEvent, StatePayload};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tracing::{debug, warn};

use crate::cancel::Cancellation;
use crate::compilation::Compilation;
use crate::error::{DriverError, Result};
use crate::queue::{CompilationHandler, Fetched, Queue};

/// Type url of the payload holding selected artifacts not yet loaded.
pub const UNLOADED_ARTIFACTS_TYPE: &str = "analysis_driver.UnloadedArtifacts";

/// Turns a selected artifact into analyzable compilations, typically by
/// fetching and unpacking the files it names.
#[async_trait]
pub trait UnitLoader: Send + Sync {
    async fn load(&self, cancel: &Cancellation, artifact: &Artifact)
        -> anyhow::Result<Vec<Compilation>>;
}

/// Stream of build events as delivered by the transport.
pub type EventStream = BoxStream<'static, anyhow::Result<BuildEvent>>;

pub struct ArtifactQueue {
    events: EventStream,
    selectors: Vec<AnySelector>,
    loader: Arc<dyn UnitLoader>,
    unloaded: VecDeque<Artifact>,
    ready: VecDeque<Compilation>,
    events_seen: u64,
}

impl ArtifactQueue {
    pub fn new(events: EventStream, selectors: Vec<AnySelector>, loader: Arc<dyn UnitLoader>) -> Self {
        Self {
            events,
            selectors,
            loader,
            unloaded: VecDeque::new(),
            ready: VecDeque::new(),
            events_seen: 0,
        }
    }

    /// Continue a stream from a snapshot taken with
    /// [`ArtifactQueue::selector_state`].
    ///
    /// `events` must start right after the last event consumed when the
    /// snapshot was taken. Replaying earlier events is harmless.
    pub fn resume(
        events: EventStream,
        mut selectors: Vec<AnySelector>,
        loader: Arc<dyn UnitLoader>,
        state: &[StatePayload],
    ) -> Result<Self> {
        for selector in &mut selectors {
            selector.deserialize(state).map_err(|e| {
                DriverError::Queue(anyhow::Error::new(e).context(format!(
                    "restoring {} selector state",
                    selector.name()
                )))
            })?;
        }

        let mut queue = Self::new(events, selectors, loader);
        for payload in state.iter().filter(|p| p.type_url == UNLOADED_ARTIFACTS_TYPE) {
            let artifacts: Vec<Artifact> = payload
                .unpack(UNLOADED_ARTIFACTS_TYPE)
                .map_err(|e| {
                    DriverError::Queue(anyhow::Error::new(e).context("restoring unloaded artifacts"))
                })?;
            queue.unloaded.extend(artifacts);
        }
        Ok(queue)
    }

    /// Snapshot every stateful selector, plus any selected artifacts whose
    /// load has not succeeded yet.
    ///
    /// Compilations already loaded but not yet handed out are not part of
    /// the snapshot; capture it while [`ArtifactQueue::buffered`] is zero.
    pub fn selector_state(&self) -> Vec<StatePayload> {
        let mut state: Vec<StatePayload> = self
            .selectors
            .iter()
            .filter_map(|selector| {
                let mut payload = StatePayload::default();
                selector.serialize_into(&mut payload).then_some(payload)
            })
            .collect();

        if !self.unloaded.is_empty() {
            match StatePayload::pack(UNLOADED_ARTIFACTS_TYPE, &self.unloaded) {
                Ok(payload) => state.push(payload),
                Err(e) => warn!(error = %e, "failed to encode unloaded artifacts"),
            }
        }
        state
    }

    /// Compilations loaded but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.ready.len()
    }

    /// Selected artifacts waiting for a successful load.
    pub fn unloaded(&self) -> usize {
        self.unloaded.len()
    }

    pub fn events_seen(&self) -> u64 {
        self.events_seen
    }

    /// Load queued artifacts and pull events until at least one
    /// compilation is ready. Returns false at end of stream.
    async fn fill(&mut self, cancel: &Cancellation) -> Result<bool> {
        while self.ready.is_empty() {
            if let Some(artifact) = self.unloaded.front() {
                debug!(artifact = %artifact.id, files = artifact.files.len(), "loading artifact");
                let units = self
                    .loader
                    .load(cancel, artifact)
                    .await
                    .map_err(|e| DriverError::Queue(e.context(format!("loading {}", artifact.id))))?;
                self.unloaded.pop_front();
                self.ready.extend(units);
                continue;
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DriverError::Cancelled),
                next = self.events.next() => next,
            };
            let event = match next {
                Some(event) => event.map_err(DriverError::Queue)?,
                None => {
                    self.report_unresolved();
                    return Ok(false);
                }
            };
            self.events_seen += 1;

            for selector in &mut self.selectors {
                if let Some(artifact) = selector.select(&event) {
                    self.unloaded.push_back(artifact);
                }
            }
        }
        Ok(true)
    }

    fn report_unresolved(&self) {
        for selector in &self.selectors {
            let pending = selector.pending_filesets();
            if !pending.is_empty() {
                warn!(
                    selector = selector.name(),
                    filesets = ?pending,
                    "event stream ended with unresolved filesets"
                );
            }
        }
    }
}

#[async_trait]
impl Queue for ArtifactQueue {
    async fn next(
        &mut self,
        cancel: &Cancellation,
        handler: &dyn CompilationHandler,
    ) -> Result<Fetched> {
        if !self.fill(cancel).await? {
            return Ok(Fetched::EndOfStream);
        }
        match self.ready.pop_front() {
            Some(compilation) => {
                handler.handle(cancel, compilation).await?;
                Ok(Fetched::Item)
            }
            None => Ok(Fetched::EndOfStream),
        }
    }
}
