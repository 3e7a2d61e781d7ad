//! Ordered sources of compilations.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::cancel::Cancellation;
use crate::compilation::Compilation;
use crate::error::Result;

/// Outcome of a successful [`Queue::next`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    /// An item was handed to the handler and it succeeded.
    Item,
    /// The queue is exhausted; the handler was not called.
    EndOfStream,
}

/// Processes one compilation pulled from a [`Queue`].
#[async_trait]
pub trait CompilationHandler: Send + Sync {
    async fn handle(&self, cancel: &Cancellation, compilation: Compilation) -> Result<()>;
}

/// An ordered sequence of compilations.
#[async_trait]
pub trait Queue: Send {
    /// Invoke `handler` with the next available compilation, returning its
    /// error unchanged. Returns [`Fetched::EndOfStream`] without calling
    /// `handler` once no further compilations are available. May suspend
    /// while waiting for work.
    async fn next(
        &mut self,
        cancel: &Cancellation,
        handler: &dyn CompilationHandler,
    ) -> Result<Fetched>;
}

/// A queue over a fixed, in-memory list of compilations.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    items: VecDeque<Compilation>,
}

impl MemoryQueue {
    pub fn new(items: impl IntoIterator<Item = Compilation>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn push(&mut self, compilation: Compilation) {
        self.items.push_back(compilation);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn next(
        &mut self,
        cancel: &Cancellation,
        handler: &dyn CompilationHandler,
    ) -> Result<Fetched> {
        match self.items.pop_front() {
            Some(compilation) => {
                handler.handle(cancel, compilation).await?;
                Ok(Fetched::Item)
            }
            None => Ok(Fetched::EndOfStream),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilation::CompilationUnit;
    use crate::error::DriverError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl CompilationHandler for Collect {
        async fn handle(&self, _cancel: &Cancellation, compilation: Compilation) -> Result<()> {
            self.seen.lock().unwrap().push(compilation.revision);
            if self.fail {
                return Err(DriverError::Analysis(anyhow::anyhow!("nope")));
            }
            Ok(())
        }
    }

    fn compilation(rev: &str) -> Compilation {
        Compilation::new(CompilationUnit::new(serde_json::Value::Null), rev)
    }

    #[tokio::test]
    async fn test_memory_queue_in_order_then_eos() {
        let mut queue = MemoryQueue::new([compilation("a"), compilation("b")]);
        let handler = Collect::default();
        let cancel = Cancellation::never();

        assert_eq!(queue.next(&cancel, &handler).await.unwrap(), Fetched::Item);
        assert_eq!(queue.next(&cancel, &handler).await.unwrap(), Fetched::Item);
        assert_eq!(
            queue.next(&cancel, &handler).await.unwrap(),
            Fetched::EndOfStream
        );
        assert_eq!(*handler.seen.lock().unwrap(), vec!["a", "b"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let mut queue = MemoryQueue::default();
        queue.push(compilation("a"));
        assert_eq!(queue.len(), 1);
        let handler = Collect {
            fail: true,
            ..Default::default()
        };
        let err = queue
            .next(&Cancellation::never(), &handler)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Analysis(_)));
    }
}
