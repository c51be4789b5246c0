//! SessionRegistry: the server's authoritative name ↔ session directory.
//!
//! Every connected peer that has claimed a display name has exactly one
//! entry here.  The registry is shared by all session tasks, so every access
//! goes through one mutex guarding both directions of the mapping:
//!
//! ```text
//! by_name:    Username  ──►  SessionId
//! by_session: SessionId ──►  Member { name, sink, announced }
//! ```
//!
//! Both maps are updated inside the same critical section, so they always
//! describe the same set of bindings.
//!
//! # Claim lifecycle
//!
//! ```text
//! try_claim ──► Registration ──► announce() ──► release() / drop
//!   (hidden)                      (visible to broadcasts)
//! ```
//!
//! A fresh claim is invisible to [`SessionRegistry::active_sessions`] until
//! the owning session calls [`Registration::announce`].  The session does that
//! after writing its confirmation frame, so a peer never receives relayed
//! chat before learning that its name was accepted.
//!
//! The lock is a `std::sync::Mutex` and is never held across an `.await`:
//! broadcasts copy the recipient list out and write to it afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chatingo_core::Username;
use uuid::Uuid;

use super::FrameSink;

/// Identifies one accepted connection for its whole lifetime.
pub type SessionId = Uuid;

/// One broadcast target, copied out of the registry.
#[derive(Clone)]
pub struct Recipient {
    pub id: SessionId,
    pub name: Username,
    pub sink: Arc<dyn FrameSink>,
}

struct Member {
    name: Username,
    sink: Arc<dyn FrameSink>,
    announced: bool,
}

#[derive(Default)]
struct Directory {
    by_name: HashMap<Username, SessionId>,
    by_session: HashMap<SessionId, Member>,
}

/// Cheaply clonable handle to the shared directory.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<Directory>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section below leaves both maps consistent before it can
    // panic, so a poisoned lock still guards valid data.
    fn lock(&self) -> MutexGuard<'_, Directory> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds `name` to session `id` if the name is free.
    ///
    /// The absence check and the insertion happen under one lock, so of two
    /// sessions racing for the same name exactly one gets a
    /// [`Registration`].  A session that already holds a name cannot claim a
    /// second one.
    ///
    /// Returns `None` and leaves the registry untouched on conflict.
    pub fn try_claim(
        &self,
        name: Username,
        id: SessionId,
        sink: Arc<dyn FrameSink>,
    ) -> Option<Registration> {
        let mut dir = self.lock();
        if dir.by_name.contains_key(&name) || dir.by_session.contains_key(&id) {
            return None;
        }
        dir.by_name.insert(name.clone(), id);
        dir.by_session.insert(
            id,
            Member {
                name: name.clone(),
                sink,
                announced: false,
            },
        );
        drop(dir);

        Some(Registration {
            registry: self.clone(),
            id,
            name,
            released: false,
        })
    }

    /// Removes the binding held by session `id`, returning the freed name.
    ///
    /// Idempotent: releasing a session that never claimed a name, or one
    /// that was already released, is a no-op returning `None`.
    pub fn release(&self, id: SessionId) -> Option<Username> {
        let mut dir = self.lock();
        let member = dir.by_session.remove(&id)?;
        dir.by_name.remove(&member.name);
        Some(member.name)
    }

    fn announce(&self, id: SessionId) {
        if let Some(member) = self.lock().by_session.get_mut(&id) {
            member.announced = true;
        }
    }

    /// Snapshot of every announced session except `excluding`.
    ///
    /// The list is copied under the lock, so joins and leaves that happen
    /// while the caller is still writing to it cannot disturb the iteration.
    pub fn active_sessions(&self, excluding: Option<SessionId>) -> Vec<Recipient> {
        self.lock()
            .by_session
            .iter()
            .filter(|(id, member)| member.announced && Some(**id) != excluding)
            .map(|(id, member)| Recipient {
                id: *id,
                name: member.name.clone(),
                sink: Arc::clone(&member.sink),
            })
            .collect()
    }

    /// Number of claimed names, announced or not.
    pub fn len(&self) -> usize {
        self.lock().by_session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `name` is currently claimed.
    pub fn contains(&self, name: &str) -> bool {
        self.lock().by_name.contains_key(name)
    }

    /// Returns the name held by session `id`, if any.
    pub fn name_of(&self, id: SessionId) -> Option<Username> {
        self.lock().by_session.get(&id).map(|m| m.name.clone())
    }

    /// Panics unless both directions of the mapping agree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let dir = self.lock();
        assert_eq!(dir.by_name.len(), dir.by_session.len(), "map sizes differ");
        for (name, id) in &dir.by_name {
            let member = dir
                .by_session
                .get(id)
                .unwrap_or_else(|| panic!("{name} points at missing session {id}"));
            assert_eq!(&member.name, name, "session {id} maps back to another name");
        }
    }
}

/// Proof that a session holds a name.
///
/// Dropping the guard releases the name, so a session task that ends for any
/// reason (including a panic or cancellation) cannot leak its binding.
#[must_use = "dropping a Registration immediately releases the name"]
pub struct Registration {
    registry: SessionRegistry,
    id: SessionId,
    name: Username,
    released: bool,
}

impl Registration {
    pub fn name(&self) -> &Username {
        &self.name
    }

    /// Makes the session visible to broadcasts.
    pub fn announce(&self) {
        self.registry.announce(self.id);
    }

    /// Releases the name now and returns it.
    pub fn release(mut self) -> Option<Username> {
        self.released = true;
        self.registry.release(self.id)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if !self.released {
            self.registry.release(self.id);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
