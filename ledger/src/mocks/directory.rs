//! In-memory member directory.

use crate::error::{LedgerError, Result};
use crate::providers::MemberDirectory;
use crate::types::{ExternalIdentity, MemberId, MemberRef};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// In-memory member directory. Clones share the same members.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMemberDirectory {
    members: Arc<Mutex<HashMap<MemberId, MemberRef>>>,
}

impl InMemoryMemberDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a member.
    pub fn insert(&self, member: MemberRef) {
        if let Ok(mut members) = self.members.lock() {
            members.insert(member.id, member);
        }
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with_member(self, member: MemberRef) -> Self {
        self.insert(member);
        self
    }
}

fn poisoned() -> LedgerError {
    LedgerError::Storage("in-memory directory lock poisoned".to_string())
}

impl MemberDirectory for InMemoryMemberDirectory {
    fn resolve_by_external_identity(
        &self,
        identity: ExternalIdentity,
    ) -> impl Future<Output = Result<Option<MemberRef>>> + Send {
        let members = Arc::clone(&self.members);

        async move {
            Ok(members
                .lock()
                .map_err(|_| poisoned())?
                .values()
                .find(|member| member.matches(identity))
                .cloned())
        }
    }

    fn resolve_by_id(
        &self,
        id: MemberId,
    ) -> impl Future<Output = Result<Option<MemberRef>>> + Send {
        let members = Arc::clone(&self.members);

        async move { Ok(members.lock().map_err(|_| poisoned())?.get(&id).cloned()) }
    }
}
