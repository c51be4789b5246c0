//! chatingo-server library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the `chatingo` binary share the same module tree.
//!
//! # Architecture
//!
//! ```text
//! ChatServer (infrastructure::network)
//!  └─ accept loop ── one tokio task per connection
//!       └─ Session (application::session)
//!            ├─ read_frame / write_frame   (chatingo-core framer)
//!            ├─ SessionRegistry::try_claim (application::registry)
//!            ├─ Broadcaster::broadcast     (application::broadcast)
//!            └─ EventSink::record          (infrastructure::event_log)
//! ```

pub mod application;
pub mod infrastructure;
