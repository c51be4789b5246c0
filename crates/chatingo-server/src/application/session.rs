//! Session: the per-connection state machine.
//!
//! # Lifecycle
//!
//! ```text
//! Negotiating ──► Active ──► Closed
//!      │                       ▲
//!      └───────────────────────┘
//! ```
//!
//! - `Negotiating`: every frame is a candidate display name.  Invalid names
//!   get `InvalidUsername`, taken names get `UsernameAlreadyInUse`; either
//!   way the peer may try again.  A successful claim is confirmed to the
//!   peer, then announced to everyone else.
//! - `Active`: every frame is a chat line, logged and relayed as
//!   `(<name>) <text>` to all other sessions.
//! - `Closed`: entered on the first read or write error in either state.
//!   The name is released, the departure is announced and logged, and the
//!   connection is shut down.  Nothing is read or written afterwards.
//!
//! Cleanup runs in exactly one place, [`Session::terminate`], after the
//! state loops return.  The [`Registration`] guard backs it up: if the task
//! is dropped mid-flight the name is still released.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chatingo_core::{read_frame, FrameError, LogEvent, ServerMessage, Username};
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio::time::timeout;
use tracing::{debug, info};
use uuid::Uuid;

use super::broadcast::Broadcaster;
use super::registry::{Registration, SessionId, SessionRegistry};
use super::{EventSink, FrameSink};

/// Why a session ended abnormally.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection lost: {0}")]
    Transport(#[from] FrameError),
}

/// Lifecycle state of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the peer to claim a free display name.
    Negotiating,
    /// Relaying chat lines under `name`.
    Active { name: Username },
    /// Terminal; the connection has been shut down.
    Closed,
}

impl SessionState {
    /// Returns `true` if moving from `self` to `next` is a legal step.
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Negotiating, SessionState::Active { .. })
                | (SessionState::Negotiating, SessionState::Closed)
                | (SessionState::Active { .. }, SessionState::Closed)
        )
    }
}

/// Everything sessions share: the registry (via the broadcaster), the event
/// sink and the chat settings.
#[derive(Clone)]
pub struct ChatHub {
    broadcaster: Broadcaster,
    events: Arc<dyn EventSink>,
    max_username_length: usize,
    write_timeout: Duration,
}

impl ChatHub {
    pub fn new(
        registry: SessionRegistry,
        events: Arc<dyn EventSink>,
        max_username_length: usize,
        write_timeout: Duration,
    ) -> Self {
        Self {
            broadcaster: Broadcaster::new(registry, write_timeout),
            events,
            max_username_length,
            write_timeout,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        self.broadcaster.registry()
    }
}

/// One connected peer.
///
/// `reader` is the buffered read half of the connection and is owned
/// exclusively by the session.  `sink` is the write half; a clone of it is
/// stored in the registry so other sessions can broadcast to this peer.
pub struct Session<R> {
    id: SessionId,
    peer: SocketAddr,
    reader: R,
    sink: Arc<dyn FrameSink>,
    hub: ChatHub,
    state: SessionState,
}

impl<R> Session<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(peer: SocketAddr, reader: R, sink: Arc<dyn FrameSink>, hub: ChatHub) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            reader,
            sink,
            hub,
            state: SessionState::Negotiating,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Drives the session until its connection ends.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] when the connection failed rather
    /// than closing cleanly.  Either way the session has been fully torn down
    /// when this returns.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let ended = match self.negotiate().await {
            Ok(registration) => {
                let ended = self.chat(&registration).await;
                self.terminate(Some(registration)).await;
                ended
            }
            Err(e) => {
                self.terminate(None).await;
                e
            }
        };

        if ended.is_clean_close() {
            Ok(())
        } else {
            Err(SessionError::Transport(ended))
        }
    }

    async fn negotiate(&mut self) -> Result<Registration, FrameError> {
        loop {
            let candidate = read_frame(&mut self.reader).await?;

            let name = match Username::parse_with_limit(&candidate, self.hub.max_username_length)
            {
                Ok(name) => name,
                Err(e) => {
                    debug!("session {}: rejected username: {e}", self.peer);
                    self.send(&ServerMessage::InvalidUsername).await?;
                    continue;
                }
            };

            let Some(registration) =
                self.hub
                    .registry()
                    .try_claim(name.clone(), self.id, Arc::clone(&self.sink))
            else {
                debug!("session {}: username {name} already in use", self.peer);
                self.send(&ServerMessage::UsernameAlreadyInUse).await?;
                continue;
            };

            // On failure `registration` drops here and the name is freed
            // before anyone else heard about it.
            self.send(&ServerMessage::UsernameAccepted {
                name: name.to_string(),
            })
            .await?;
            registration.announce();
            self.transition(SessionState::Active { name: name.clone() });

            info!("session {}: {name} joined", self.peer);
            self.hub.events.record(LogEvent::joined(&name));
            self.hub
                .broadcaster
                .broadcast(
                    &ServerMessage::Joined {
                        name: name.to_string(),
                    },
                    Some(self.id),
                )
                .await;

            return Ok(registration);
        }
    }

    /// Relays chat lines until the connection ends, returning the reason.
    async fn chat(&mut self, registration: &Registration) -> FrameError {
        let name = registration.name();
        loop {
            let text = match read_frame(&mut self.reader).await {
                Ok(text) => text,
                Err(e) => return e,
            };

            self.hub.events.record(LogEvent::message(name, &text));
            self.hub
                .broadcaster
                .broadcast(
                    &ServerMessage::Chat {
                        from: name.to_string(),
                        text,
                    },
                    Some(self.id),
                )
                .await;
        }
    }

    /// Tears the session down.  Runs exactly once, from [`Session::run`].
    async fn terminate(&mut self, registration: Option<Registration>) {
        if let Some(name) = registration.and_then(Registration::release) {
            info!("session {}: {name} left", self.peer);
            self.hub
                .broadcaster
                .broadcast(
                    &ServerMessage::Left {
                        name: name.to_string(),
                    },
                    Some(self.id),
                )
                .await;
            self.hub.events.record(LogEvent::left(&name));
        }

        match timeout(self.hub.write_timeout, self.sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("session {}: shutdown failed: {e}", self.peer),
            Err(_) => debug!("session {}: shutdown timed out", self.peer),
        }

        self.transition(SessionState::Closed);
    }

    async fn send(&self, message: &ServerMessage) -> Result<(), FrameError> {
        self.sink.send_frame(&message.to_frame()).await
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "illegal session transition {:?} -> {next:?}",
            self.state
        );
        debug!("session {}: {:?} -> {next:?}", self.peer, self.state);
        self.state = next;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::MockEventSink;
    use async_trait::async_trait;
    use std::io;
    use std::sync::Mutex;
    use tokio::io::{AsyncWriteExt, BufReader, DuplexStream};

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingSink {
        frames: Mutex<Vec<String>>,
        closed: Mutex<u32>,
    }

    impl RecordingSink {
        fn frames(&self) -> Vec<String> {
            self.frames.lock().unwrap().clone()
        }

        fn close_count(&self) -> u32 {
            *self.closed.lock().unwrap()
        }
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn send_frame(&self, frame: &str) -> Result<(), FrameError> {
            self.frames.lock().unwrap().push(frame.to_string());
            Ok(())
        }

        async fn close(&self) -> Result<(), FrameError> {
            *self.closed.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl FrameSink for FailingSink {
        async fn send_frame(&self, _frame: &str) -> Result<(), FrameError> {
            Err(FrameError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "gone")))
        }

        async fn close(&self) -> Result<(), FrameError> {
            Ok(())
        }
    }

    fn quiet_events() -> Arc<dyn EventSink> {
        let mut events = MockEventSink::new();
        events.expect_record().return_const(());
        Arc::new(events)
    }

    fn hub(registry: &SessionRegistry, events: Arc<dyn EventSink>) -> ChatHub {
        ChatHub::new(registry.clone(), events, 20, Duration::from_millis(200))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    /// Builds a reader pre-loaded with `input`, followed by EOF.
    async fn scripted_reader(input: &str) -> BufReader<DuplexStream> {
        let (mut client, server) = tokio::io::duplex(4096);
        client.write_all(input.as_bytes()).await.unwrap();
        drop(client);
        BufReader::new(server)
    }

    /// Registers an already-active bystander and returns its sink.
    fn bystander(registry: &SessionRegistry, raw: &str) -> (Arc<RecordingSink>, Registration) {
        let sink = Arc::new(RecordingSink::default());
        let reg = registry
            .try_claim(Username::parse(raw).unwrap(), Uuid::new_v4(), sink.clone())
            .unwrap();
        reg.announce();
        (sink, reg)
    }

    // ── State table ───────────────────────────────────────────────────────────

    #[test]
    fn test_state_transitions_follow_lifecycle() {
        let active = SessionState::Active {
            name: Username::parse("a").unwrap(),
        };
        assert!(SessionState::Negotiating.can_transition_to(&active));
        assert!(SessionState::Negotiating.can_transition_to(&SessionState::Closed));
        assert!(active.can_transition_to(&SessionState::Closed));

        assert!(!active.can_transition_to(&SessionState::Negotiating));
        assert!(!SessionState::Closed.can_transition_to(&SessionState::Negotiating));
        assert!(!SessionState::Closed.can_transition_to(&active));
    }

    #[tokio::test]
    async fn test_new_session_starts_negotiating() {
        let registry = SessionRegistry::new();
        let session = Session::new(
            peer(),
            scripted_reader("").await,
            Arc::new(RecordingSink::default()),
            hub(&registry, quiet_events()),
        );
        assert_eq!(session.state(), &SessionState::Negotiating);
    }

    // ── Full lifecycle ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_session_joins_chats_and_leaves() {
        // Arrange
        let registry = SessionRegistry::new();
        let (bob, _bob_reg) = bystander(&registry, "bob");
        let alice = Arc::new(RecordingSink::default());
        let session = Session::new(
            peer(),
            scripted_reader("alice\r\nHello!\n").await,
            alice.clone(),
            hub(&registry, quiet_events()),
        );

        // Act: the script ends with EOF, which is a clean disconnect
        let result = session.run().await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(alice.frames(), vec!["Your username : alice\n".to_string()]);
        assert_eq!(
            bob.frames(),
            vec![
                "***Here is a new friend. Welcome alice!***\n".to_string(),
                "(alice) Hello!\n".to_string(),
                "alice is disconnected. Goodbye!\n".to_string(),
            ]
        );
        assert!(!registry.contains("alice"));
        assert_eq!(alice.close_count(), 1, "connection is closed exactly once");
        registry.assert_consistent();
    }

    #[tokio::test]
    async fn test_taken_name_is_rejected_and_retry_succeeds() {
        let registry = SessionRegistry::new();
        let (_alice, _alice_reg) = bystander(&registry, "alice");
        let sink = Arc::new(RecordingSink::default());
        let session = Session::new(
            peer(),
            scripted_reader("alice\nbob\n").await,
            sink.clone(),
            hub(&registry, quiet_events()),
        );

        session.run().await.unwrap();

        assert_eq!(
            sink.frames(),
            vec![
                "UsernameAlreadyInUse\n".to_string(),
                "Your username : bob\n".to_string(),
            ]
        );
        assert!(registry.contains("alice"), "rejection must not disturb the holder");
    }

    #[tokio::test]
    async fn test_invalid_names_are_rejected_without_touching_registry() {
        // Arrange: an empty name, then a 25-character one
        let registry = SessionRegistry::new();
        let (observer, _reg) = bystander(&registry, "observer");
        let sink = Arc::new(RecordingSink::default());
        let script = format!("\n{}\n", "x".repeat(25));
        let session = Session::new(
            peer(),
            scripted_reader(&script).await,
            sink.clone(),
            hub(&registry, quiet_events()),
        );

        // Act
        session.run().await.unwrap();

        // Assert: two rejections, no claim, no announcements
        assert_eq!(
            sink.frames(),
            vec!["InvalidUsername\n".to_string(), "InvalidUsername\n".to_string()]
        );
        assert_eq!(registry.len(), 1);
        assert!(observer.frames().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_during_negotiation_is_silent() {
        let registry = SessionRegistry::new();
        let (observer, _reg) = bystander(&registry, "observer");
        let mut events = MockEventSink::new();
        events.expect_record().never();
        let sink = Arc::new(RecordingSink::default());
        let session = Session::new(
            peer(),
            scripted_reader("half a na").await,
            sink.clone(),
            hub(&registry, Arc::new(events)),
        );

        let result = session.run().await;

        // EOF mid-line is a transport error, not a clean close.
        assert!(matches!(
            result,
            Err(SessionError::Transport(FrameError::UnexpectedEof { .. }))
        ));
        assert!(observer.frames().is_empty());
        assert_eq!(sink.close_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_confirmation_releases_claim() {
        let registry = SessionRegistry::new();
        let (observer, _reg) = bystander(&registry, "observer");
        let session = Session::new(
            peer(),
            scripted_reader("alice\n").await,
            Arc::new(FailingSink),
            hub(&registry, quiet_events()),
        );

        let result = session.run().await;

        assert!(result.is_err());
        assert!(!registry.contains("alice"));
        assert!(observer.frames().is_empty(), "nobody heard about alice");
        registry.assert_consistent();
    }

    #[tokio::test]
    async fn test_events_are_recorded_in_lifecycle_order() {
        // Arrange
        let registry = SessionRegistry::new();
        let mut seq = mockall::Sequence::new();
        let mut events = MockEventSink::new();
        for expected in ["alice is connected.", "(alice) Hello!", "alice is disconnected."] {
            events
                .expect_record()
                .withf(move |e: &LogEvent| e.text == expected)
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
        }
        let session = Session::new(
            peer(),
            scripted_reader("alice\nHello!\n").await,
            Arc::new(RecordingSink::default()),
            hub(&registry, Arc::new(events)),
        );

        // Act / Assert: the mock panics on any unexpected or out-of-order record
        session.run().await.unwrap();
    }
}
