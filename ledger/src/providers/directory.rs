//! Member directory.

use crate::error::Result;
use crate::types::{ExternalIdentity, MemberId, MemberRef};
use std::future::Future;

/// Read-only view of the member registry.
///
/// Registration and promotion live with the transport; the ledger only
/// resolves identities.
pub trait MemberDirectory: Send + Sync {
    /// Member linked to a chat or user identity.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails. Unknown identities are `Ok(None)`.
    fn resolve_by_external_identity(
        &self,
        identity: ExternalIdentity,
    ) -> impl Future<Output = Result<Option<MemberRef>>> + Send;

    /// Member by id.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails. Unknown ids are `Ok(None)`.
    fn resolve_by_id(&self, id: MemberId) -> impl Future<Output = Result<Option<MemberRef>>> + Send;

    /// Whether the member holds admin capabilities.
    fn is_admin(&self, member: &MemberRef) -> bool {
        member.admin
    }
}
