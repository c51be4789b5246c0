//! Broadcaster: delivers one server frame to every other active session.
//!
//! # Failure isolation
//!
//! Recipients are written to concurrently, each under its own
//! `write_timeout`.  A recipient whose write fails or stalls is logged and
//! counted, and delivery to everyone else carries on.  Its connection is
//! then closed for writing, since a cut-off write leaves part of a frame on
//! the wire and nothing more may follow it.  The broadcaster never removes
//! anyone from the registry: a broken recipient's own session task notices
//! the dead connection on its next read and cleans up after itself, so the
//! registry is only ever mutated by the session that owns the entry.

use std::time::Duration;

use chatingo_core::ServerMessage;
use futures_util::future::join_all;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::registry::{Recipient, SessionId, SessionRegistry};

/// Outcome of one broadcast pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fan-out engine bound to one registry.
#[derive(Clone)]
pub struct Broadcaster {
    registry: SessionRegistry,
    write_timeout: Duration,
}

impl Broadcaster {
    pub fn new(registry: SessionRegistry, write_timeout: Duration) -> Self {
        Self {
            registry,
            write_timeout,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Sends `message` to every announced session except `excluding`.
    ///
    /// Never fails: per-recipient problems are reported in the returned
    /// [`BroadcastReport`] and in the log.
    pub async fn broadcast(
        &self,
        message: &ServerMessage,
        excluding: Option<SessionId>,
    ) -> BroadcastReport {
        let recipients = self.registry.active_sessions(excluding);
        if recipients.is_empty() {
            return BroadcastReport::default();
        }

        let frame = message.to_frame();
        let outcomes = join_all(recipients.iter().map(|r| self.deliver(r, &frame))).await;

        let delivered = outcomes.iter().filter(|ok| **ok).count();
        let report = BroadcastReport {
            delivered,
            failed: outcomes.len() - delivered,
        };
        debug!(
            "broadcast to {} recipient(s): {} delivered, {} failed",
            outcomes.len(),
            report.delivered,
            report.failed
        );
        report
    }

    async fn deliver(&self, recipient: &Recipient, frame: &str) -> bool {
        let delivered = self.try_deliver(recipient, frame).await;
        if !delivered {
            self.shut_out(recipient).await;
        }
        delivered
    }

    async fn try_deliver(&self, recipient: &Recipient, frame: &str) -> bool {
        match timeout(self.write_timeout, recipient.sink.send_frame(frame)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(
                    "broadcast to {} (session {}) failed: {e}",
                    recipient.name, recipient.id
                );
                false
            }
            Err(_) => {
                warn!(
                    "broadcast to {} (session {}) timed out after {:?}",
                    recipient.name, recipient.id, self.write_timeout
                );
                false
            }
        }
    }

    async fn shut_out(&self, recipient: &Recipient) {
        match timeout(self.write_timeout, recipient.sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("closing {} after failed write: {e}", recipient.name),
            Err(_) => debug!("closing {} after failed write timed out", recipient.name),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::Registration;
    use crate::application::FrameSink;
    use async_trait::async_trait;
    use chatingo_core::{FrameError, Username};
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingSink {
        frames: Mutex<Vec<String>>,
        closed: AtomicBool,
    }

    impl RecordingSink {
        fn frames(&self) -> Vec<String> {
            self.frames.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn send_frame(&self, frame: &str) -> Result<(), FrameError> {
            self.frames.lock().unwrap().push(frame.to_string());
            Ok(())
        }

        async fn close(&self) -> Result<(), FrameError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FailingSink {
        closed: AtomicBool,
    }

    #[async_trait]
    impl FrameSink for FailingSink {
        async fn send_frame(&self, _frame: &str) -> Result<(), FrameError> {
            Err(FrameError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "injected failure",
            )))
        }

        async fn close(&self) -> Result<(), FrameError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// A peer that never drains its socket.
    struct StalledSink;

    #[async_trait]
    impl FrameSink for StalledSink {
        async fn send_frame(&self, _frame: &str) -> Result<(), FrameError> {
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn close(&self) -> Result<(), FrameError> {
            Ok(())
        }
    }

    fn join(
        registry: &SessionRegistry,
        raw: &str,
        sink: Arc<dyn FrameSink>,
    ) -> (SessionId, Registration) {
        let id = Uuid::new_v4();
        let reg = registry
            .try_claim(Username::parse(raw).unwrap(), id, sink)
            .unwrap();
        reg.announce();
        (id, reg)
    }

    fn chat(from: &str, text: &str) -> ServerMessage {
        ServerMessage::Chat {
            from: from.to_string(),
            text: text.to_string(),
        }
    }

    fn broadcaster(registry: &SessionRegistry) -> Broadcaster {
        Broadcaster::new(registry.clone(), Duration::from_millis(100))
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        // Arrange
        let registry = SessionRegistry::new();
        let a = Arc::new(RecordingSink::default());
        let b = Arc::new(RecordingSink::default());
        let c = Arc::new(RecordingSink::default());
        let (alice, _ra) = join(&registry, "alice", a.clone());
        let (_, _rb) = join(&registry, "bob", b.clone());
        let (_, _rc) = join(&registry, "carol", c.clone());

        // Act
        let report = broadcaster(&registry)
            .broadcast(&chat("alice", "Hello!"), Some(alice))
            .await;

        // Assert
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 0 });
        assert!(a.frames().is_empty(), "sender must not receive its own line");
        assert_eq!(b.frames(), vec!["(alice) Hello!\n".to_string()]);
        assert_eq!(c.frames(), vec!["(alice) Hello!\n".to_string()]);
    }

    #[tokio::test]
    async fn test_broadcast_without_exclusion_reaches_everyone() {
        let registry = SessionRegistry::new();
        let a = Arc::new(RecordingSink::default());
        let b = Arc::new(RecordingSink::default());
        let (_, _ra) = join(&registry, "alice", a.clone());
        let (_, _rb) = join(&registry, "bob", b.clone());

        let report = broadcaster(&registry)
            .broadcast(&ServerMessage::Left { name: "zed".into() }, None)
            .await;

        assert_eq!(report.delivered, 2);
        assert_eq!(a.frames(), b.frames());
    }

    #[tokio::test]
    async fn test_broadcast_skips_released_sessions() {
        let registry = SessionRegistry::new();
        let a = Arc::new(RecordingSink::default());
        let gone = Arc::new(RecordingSink::default());
        let (_, _ra) = join(&registry, "alice", a.clone());
        let (_, rb) = join(&registry, "bob", gone.clone());
        let _ = rb.release();

        broadcaster(&registry)
            .broadcast(&chat("x", "after leave"), None)
            .await;

        assert_eq!(a.frames().len(), 1);
        assert!(gone.frames().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_skips_unannounced_claims() {
        let registry = SessionRegistry::new();
        let pending = Arc::new(RecordingSink::default());
        let _reg = registry
            .try_claim(Username::parse("newbie").unwrap(), Uuid::new_v4(), pending.clone())
            .unwrap();

        let report = broadcaster(&registry).broadcast(&chat("x", "hi"), None).await;

        assert_eq!(report, BroadcastReport::default());
        assert!(pending.frames().is_empty());
    }

    #[tokio::test]
    async fn test_failing_recipient_does_not_block_others() {
        // Arrange: the failing peer sits between two healthy ones
        let registry = SessionRegistry::new();
        let a = Arc::new(RecordingSink::default());
        let c = Arc::new(RecordingSink::default());
        let (_, _ra) = join(&registry, "alice", a.clone());
        let bob = Arc::new(FailingSink::default());
        let (_, _rb) = join(&registry, "bob", bob.clone());
        let (_, _rc) = join(&registry, "carol", c.clone());

        // Act
        let report = broadcaster(&registry).broadcast(&chat("dave", "yo"), None).await;

        // Assert: the failure is counted, never removed, never propagated
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 1 });
        assert_eq!(a.frames().len(), 1);
        assert_eq!(c.frames().len(), 1);
        assert!(registry.contains("bob"), "removal belongs to bob's own session");
        assert!(bob.closed.load(Ordering::SeqCst), "a failed write closes the peer");
        assert!(!a.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_stalled_recipient_is_bounded_by_write_timeout() {
        let registry = SessionRegistry::new();
        let a = Arc::new(RecordingSink::default());
        let (_, _ra) = join(&registry, "alice", a.clone());
        let (_, _rs) = join(&registry, "slowpoke", Arc::new(StalledSink));

        let started = std::time::Instant::now();
        let report = Broadcaster::new(registry.clone(), Duration::from_millis(50))
            .broadcast(&chat("x", "tick"), None)
            .await;

        assert_eq!(report, BroadcastReport { delivered: 1, failed: 1 });
        assert_eq!(a.frames().len(), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
