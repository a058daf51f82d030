//! Conversational front end.
//!
//! [`ChatLedger`] turns chat messages into ledger calls: an expense message
//! creates an entry owned by the sender, and a `<amount> given` reply to
//! the announcing message clears it. Transports stay responsible for
//! delivery and for rendering errors to the user.

use crate::capability::{self, Permission};
use crate::commands;
use crate::error::{LedgerError, Result};
use crate::history::{BoundedHistory, ExportKind, ExportRecord};
use crate::providers::{LedgerStore, MemberDirectory, PaymentLog};
use crate::service::ExpenseLedger;
use crate::settlement;
use crate::types::{ClearingOutcome, ExternalIdentity, LedgerEntry, MemberRef, MessageId};
use roomledger_core::environment::Clock;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};

/// Bounded set of reply ids that were processed or are in flight.
#[derive(Debug)]
struct ReplyCache {
    seen: HashSet<MessageId>,
    order: VecDeque<MessageId>,
    capacity: usize,
}

impl ReplyCache {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns `false` if the id is already present.
    fn claim(&mut self, id: MessageId) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    fn release(&mut self, id: MessageId) {
        if self.seen.remove(&id) {
            self.order.retain(|claimed| *claimed != id);
        }
    }
}

/// Chat-driven ledger.
pub struct ChatLedger<S, D, P, C> {
    ledger: ExpenseLedger<S, D, P, C>,
    replies: Mutex<ReplyCache>,
    exports: BoundedHistory<ExportRecord>,
}

impl<S, D, P, C> ChatLedger<S, D, P, C>
where
    S: LedgerStore,
    D: MemberDirectory,
    P: PaymentLog,
    C: Clock,
{
    /// Wrap a ledger; cache sizes come from its configuration.
    #[must_use]
    pub fn new(ledger: ExpenseLedger<S, D, P, C>) -> Self {
        let config = ledger.config();
        let replies = Mutex::new(ReplyCache::new(config.reply_dedup_capacity));
        let exports = BoundedHistory::new(config.export_history_capacity);
        Self {
            ledger,
            replies,
            exports,
        }
    }

    /// The wrapped ledger.
    #[must_use]
    pub const fn ledger(&self) -> &ExpenseLedger<S, D, P, C> {
        &self.ledger
    }

    /// Handle `<description>, <amount>[, <date>]` from `sender`.
    ///
    /// The new entry is owned by the sender. When the transport already
    /// knows the id of the message announcing the entry, it is linked so
    /// replies can find the entry.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the sender is not registered → `LedgerError::UnregisteredActor`
    /// - the text does not parse (see [`commands::parse_creation_command`])
    /// - the ledger rejects the expense
    #[tracing::instrument(skip(self, text))]
    pub async fn handle_expense_message(
        &self,
        text: &str,
        sender: ExternalIdentity,
        announcement: Option<MessageId>,
    ) -> Result<LedgerEntry> {
        let member = self.resolve_sender(sender).await?;
        capability::authorize_with(self.ledger.directory(), &member, Permission::CreateExpense)?;

        let request = commands::parse_creation_command(
            text,
            self.ledger.clock(),
            self.ledger.config().max_description_len,
        )
        .inspect_err(|err| tracing::debug!(error = %err, "Expense message rejected"))?;

        let entry = self
            .ledger
            .create_expense(
                Some(member.id),
                &request.description,
                request.amount,
                Some(request.date),
            )
            .await?;

        match announcement {
            Some(message_id) => self.ledger.attach_message_id(entry.id(), message_id).await,
            None => Ok(entry),
        }
    }

    /// Handle a `<amount> given` reply.
    ///
    /// `reply_id` is the reply's own message id and is used to drop
    /// redelivered replies; `replied_to` identifies the expense. The id is
    /// claimed before processing starts, so a copy arriving while the first
    /// is still in flight is rejected as a duplicate. If processing fails
    /// without committing anything the claim is released and the reply can
    /// be sent again.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the reply was already processed → `LedgerError::DuplicateReply`
    /// - the text does not parse → `LedgerError::MalformedInput` / `InvalidAmount`
    /// - the sender is not registered → `LedgerError::UnregisteredActor`
    /// - the sender is not an admin → `LedgerError::PermissionDenied`
    /// - no entry is linked to `replied_to` → `LedgerError::NoEntryForMessage`
    /// - the entry is settled → `LedgerError::AlreadyCleared`
    /// - the clearing itself fails (see [`ExpenseLedger::clear`])
    #[tracing::instrument(skip(self, text))]
    pub async fn handle_reply(
        &self,
        text: &str,
        reply_id: MessageId,
        replied_to: MessageId,
        sender: ExternalIdentity,
    ) -> Result<ClearingOutcome> {
        let claimed = self.replies().claim(reply_id);
        if !claimed {
            tracing::debug!(reply = %reply_id, "Duplicate reply ignored");
            return Err(LedgerError::DuplicateReply {
                message_id: reply_id,
            });
        }

        let result = self.clear_from_reply(text, replied_to, sender).await;
        if let Err(err) = &result {
            if !err.is_committed() {
                self.replies().release(reply_id);
            }
        }
        result
    }

    /// Remember an export produced by the transport.
    ///
    /// Returns the record that fell out of the history, if any.
    pub fn record_export(
        &self,
        kind: ExportKind,
        filename: impl Into<String>,
        size_bytes: u64,
    ) -> Option<ExportRecord> {
        let record = ExportRecord {
            kind,
            timestamp: self.ledger.clock().now(),
            filename: filename.into(),
            size_bytes,
        };
        tracing::info!(
            %kind,
            filename = %record.filename,
            size = %record.display_size(),
            "Export recorded"
        );
        self.exports.push(record)
    }

    /// Recent exports, oldest first.
    #[must_use]
    pub fn export_history(&self) -> Vec<ExportRecord> {
        self.exports.snapshot()
    }

    async fn clear_from_reply(
        &self,
        text: &str,
        replied_to: MessageId,
        sender: ExternalIdentity,
    ) -> Result<ClearingOutcome> {
        let request = commands::parse_clearing_command(text)
            .inspect_err(|err| tracing::debug!(error = %err, "Reply rejected"))?;

        let member = self.resolve_sender(sender).await?;
        if let Err(err) =
            capability::authorize_with(self.ledger.directory(), &member, Permission::ClearExpense)
        {
            tracing::warn!(member = %member.id, "Non-admin clearing attempt");
            return Err(err);
        }

        let entry = self.ledger.find_by_message_id(replied_to).await?;
        if entry.is_cleared() {
            return Err(settlement::already_cleared(&entry));
        }

        self.ledger.clear(entry.id(), member.id, request.amount).await
    }

    async fn resolve_sender(&self, sender: ExternalIdentity) -> Result<MemberRef> {
        self.ledger
            .directory()
            .resolve_by_external_identity(sender)
            .await?
            .ok_or(LedgerError::UnregisteredActor { identity: sender })
    }

    fn replies(&self) -> std::sync::MutexGuard<'_, ReplyCache> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_cache_forgets_oldest_beyond_capacity() {
        let mut cache = ReplyCache::new(2);
        assert!(cache.claim(MessageId(1)));
        assert!(cache.claim(MessageId(2)));
        assert!(!cache.claim(MessageId(2)));
        assert!(cache.claim(MessageId(3)));
        assert!(cache.claim(MessageId(1)));
    }

    #[test]
    fn released_ids_can_be_claimed_again() {
        let mut cache = ReplyCache::new(4);
        assert!(cache.claim(MessageId(7)));
        cache.release(MessageId(7));
        assert!(cache.claim(MessageId(7)));
        assert_eq!(cache.order.len(), 1);
    }
}
