//! Capability checks.
//!
//! The ledger operations themselves are permission-agnostic. Transports
//! call [`authorize_with`] (or [`authorize`] when no directory is at hand)
//! with the resolved actor before invoking anything that needs an admin.

use crate::error::{LedgerError, Result};
use crate::providers::MemberDirectory;
use crate::types::MemberRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something an actor may want to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Record an expense
    CreateExpense,
    /// Settle part or all of an expense
    ClearExpense,
    /// Change an uncleared expense
    EditExpense,
    /// Soft-delete an expense
    DeleteExpense,
    /// Grant admin rights to another member
    PromoteMember,
}

impl Permission {
    /// Whether this permission is reserved for admins.
    #[must_use]
    pub const fn requires_admin(self) -> bool {
        !matches!(self, Self::CreateExpense)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateExpense => "create expense",
            Self::ClearExpense => "clear expense",
            Self::EditExpense => "edit expense",
            Self::DeleteExpense => "delete expense",
            Self::PromoteMember => "promote member",
        };
        f.write_str(name)
    }
}

/// Checks that `actor` holds `permission`, reading the member's own admin flag.
///
/// # Errors
///
/// Returns [`LedgerError::PermissionDenied`] if the permission is admin-only
/// and the actor is not an admin.
pub fn authorize(actor: &MemberRef, permission: Permission) -> Result<()> {
    check(actor, actor.admin, permission)
}

/// Checks that `actor` holds `permission`, asking `directory` whether the
/// actor is an admin.
///
/// # Errors
///
/// Returns [`LedgerError::PermissionDenied`] if the permission is admin-only
/// and the directory does not report the actor as an admin.
pub fn authorize_with<D: MemberDirectory>(
    directory: &D,
    actor: &MemberRef,
    permission: Permission,
) -> Result<()> {
    check(actor, directory.is_admin(actor), permission)
}

fn check(actor: &MemberRef, is_admin: bool, permission: Permission) -> Result<()> {
    if permission.requires_admin() && !is_admin {
        tracing::debug!(member = %actor.id, %permission, "Permission denied");
        return Err(LedgerError::PermissionDenied { permission });
    }
    Ok(())
}
