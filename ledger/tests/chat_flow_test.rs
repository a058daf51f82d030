//! Integration tests for the chat flow: expense messages, `<amount> given`
//! replies, duplicates, permissions and export history.

#![allow(clippy::unwrap_used)]

use roomledger::mocks::{InMemoryLedgerStore, InMemoryMemberDirectory, InMemoryPaymentLog};
use roomledger::providers::MemberDirectory;
use roomledger::{
    ChatLedger, EntryStatus, ErrorKind, ExpenseLedger, ExportKind, ExternalIdentity,
    LedgerConfig, LedgerEntry, LedgerError, MemberId, MemberRef, MessageId, Permission,
};
use roomledger_core::Money;
use roomledger_core::environment::Clock;
use roomledger_testing::{FixedClock, test_clock};

type TestChat =
    ChatLedger<InMemoryLedgerStore, InMemoryMemberDirectory, InMemoryPaymentLog, FixedClock>;

const RAVI: ExternalIdentity = ExternalIdentity::User(101);
const MEERA_ADMIN: ExternalIdentity = ExternalIdentity::User(102);
const STRANGER: ExternalIdentity = ExternalIdentity::User(999);
const ANNOUNCEMENT: MessageId = MessageId(1);

fn create_test_chat(config: LedgerConfig) -> (TestChat, FixedClock) {
    let (chat, clock, _) = create_test_chat_with_log(config);
    (chat, clock)
}

fn create_test_chat_with_log(config: LedgerConfig) -> (TestChat, FixedClock, InMemoryPaymentLog) {
    let directory = InMemoryMemberDirectory::new()
        .with_member(MemberRef::new(MemberId::new(), "Ravi").with_user_id(101))
        .with_member(
            MemberRef::new(MemberId::new(), "Meera")
                .with_user_id(102)
                .with_admin(true),
        );
    let clock = test_clock();
    let payments = InMemoryPaymentLog::new();
    let ledger = ExpenseLedger::new(
        InMemoryLedgerStore::new(),
        directory,
        payments.clone(),
        clock.clone(),
    )
    .with_config(config);
    (ChatLedger::new(ledger), clock, payments)
}

async fn member(chat: &TestChat, identity: ExternalIdentity) -> MemberRef {
    chat.ledger()
        .directory()
        .resolve_by_external_identity(identity)
        .await
        .unwrap()
        .unwrap()
}

async fn post_groceries(chat: &TestChat) -> LedgerEntry {
    chat.handle_expense_message("Groceries, 2500", RAVI, Some(ANNOUNCEMENT))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_expense_message_creates_entry_owned_by_sender() {
    let (chat, clock) = create_test_chat(LedgerConfig::default());
    let entry = post_groceries(&chat).await;

    let ravi = member(&chat, RAVI).await;
    assert_eq!(entry.owed_by(), Some(ravi.id));
    assert_eq!(entry.description(), "Groceries");
    assert_eq!(entry.amount(), Money::from_major(2500));
    assert_eq!(entry.date(), clock.today());
    assert_eq!(entry.message_id(), Some(ANNOUNCEMENT));
}

#[tokio::test]
async fn test_expense_message_errors() {
    let (chat, _) = create_test_chat(LedgerConfig::default());

    assert_eq!(
        chat.handle_expense_message("Groceries, 2500", STRANGER, None).await,
        Err(LedgerError::UnregisteredActor { identity: STRANGER })
    );
    assert!(matches!(
        chat.handle_expense_message("Groceries", RAVI, None).await,
        Err(LedgerError::MalformedInput { .. })
    ));
    assert!(matches!(
        chat.handle_expense_message("Groceries, abc", RAVI, None).await,
        Err(LedgerError::InvalidAmount { .. })
    ));
    assert!(matches!(
        chat.handle_expense_message("Groceries, 0", RAVI, None).await,
        Err(LedgerError::NonPositiveAmount { .. })
    ));
    assert!(chat.ledger().list_active().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_amounts_are_rejected_before_they_reach_the_ledger() {
    let (chat, _) = create_test_chat(LedgerConfig::default());

    for _ in 0..2 {
        assert_eq!(
            chat.handle_expense_message("Rent, 50000000000000000000000000000", RAVI, None)
                .await,
            Err(LedgerError::InvalidAmount {
                input: "50000000000000000000000000000".to_string()
            })
        );
    }
    for _ in 0..2 {
        chat.handle_expense_message("Rent, 1000000000000", RAVI, None)
            .await
            .unwrap();
    }

    let ravi = member(&chat, RAVI).await;
    let report = chat.ledger().summarize().await.unwrap();
    assert_eq!(
        report.for_member(ravi.id).total,
        Money::from_major(2_000_000_000_000)
    );
}

#[tokio::test]
async fn test_reply_whose_payment_record_failed_is_not_replayed() {
    let (chat, _, payments) = create_test_chat_with_log(LedgerConfig::default());
    let entry = post_groceries(&chat).await;
    payments.set_unavailable(true);

    let err = chat
        .handle_reply("500 given", MessageId(10), ANNOUNCEMENT, MEERA_ADMIN)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PaymentRecordMissing { .. }));

    // The clearing was saved, so a redelivery must not apply it again.
    payments.set_unavailable(false);
    assert_eq!(
        chat.handle_reply("500 given", MessageId(10), ANNOUNCEMENT, MEERA_ADMIN)
            .await
            .unwrap_err(),
        LedgerError::DuplicateReply {
            message_id: MessageId(10)
        }
    );
    let stored = chat.ledger().get_expense(entry.id()).await.unwrap();
    assert_eq!(stored.cleared_amount(), Money::from_major(500));
}

#[tokio::test]
async fn test_replies_clear_the_announced_expense() {
    let (chat, clock) = create_test_chat(LedgerConfig::default());
    let entry = post_groceries(&chat).await;
    let meera = member(&chat, MEERA_ADMIN).await;

    let first = chat
        .handle_reply("1000 given", MessageId(10), ANNOUNCEMENT, MEERA_ADMIN)
        .await
        .unwrap();
    assert_eq!(first.applied, Money::from_major(1000));
    assert_eq!(first.remaining(), Money::from_major(1500));
    assert_eq!(first.status(), EntryStatus::PartiallyCleared);
    assert_eq!(first.entry.last_cleared_by(), Some(meera.id));

    clock.advance(chrono::Duration::hours(1));
    let second = chat
        .handle_reply("1,500 Given", MessageId(11), ANNOUNCEMENT, MEERA_ADMIN)
        .await
        .unwrap();
    assert!(second.fully_cleared());
    assert_eq!(second.entry.id(), entry.id());
    assert_eq!(second.entry.cleared_at(), Some(clock.now()));

    let history = chat.ledger().payment_history(entry.id()).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_reply_to_settled_expense_reports_who_cleared_it() {
    let (chat, clock) = create_test_chat(LedgerConfig::default());
    let entry = post_groceries(&chat).await;
    let meera = member(&chat, MEERA_ADMIN).await;

    chat.handle_reply("2500 given", MessageId(10), ANNOUNCEMENT, MEERA_ADMIN)
        .await
        .unwrap();

    let err = chat
        .handle_reply("1 given", MessageId(11), ANNOUNCEMENT, MEERA_ADMIN)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::AlreadyCleared {
            id: entry.id(),
            total: Money::from_major(2500),
            cleared_by: Some(meera.id),
            cleared_at: Some(clock.now()),
        }
    );
}

#[tokio::test]
async fn test_reply_errors_are_typed() {
    let (chat, _) = create_test_chat(LedgerConfig::default());
    post_groceries(&chat).await;

    let cases = [
        ("50", ErrorKind::InvalidInput),
        ("-5 given", ErrorKind::InvariantViolation),
        ("3000 given", ErrorKind::InvariantViolation),
    ];
    for (i, (text, kind)) in cases.into_iter().enumerate() {
        let reply = MessageId(100 + i64::try_from(i).unwrap());
        let err = chat
            .handle_reply(text, reply, ANNOUNCEMENT, MEERA_ADMIN)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), kind, "{text}");
    }

    assert_eq!(
        chat.handle_reply("-5 given", MessageId(200), ANNOUNCEMENT, MEERA_ADMIN)
            .await
            .unwrap_err(),
        LedgerError::NonPositiveAmount {
            amount: Money::from_major(-5)
        }
    );
    assert_eq!(
        chat.handle_reply("50 given", MessageId(201), ANNOUNCEMENT, RAVI)
            .await
            .unwrap_err(),
        LedgerError::PermissionDenied {
            permission: Permission::ClearExpense
        }
    );
    assert_eq!(
        chat.handle_reply("50 given", MessageId(202), ANNOUNCEMENT, STRANGER)
            .await
            .unwrap_err(),
        LedgerError::UnregisteredActor { identity: STRANGER }
    );
    assert_eq!(
        chat.handle_reply("50 given", MessageId(203), MessageId(77), MEERA_ADMIN)
            .await
            .unwrap_err(),
        LedgerError::NoEntryForMessage {
            message_id: MessageId(77)
        }
    );

    let totals = chat.ledger().totals().await.unwrap();
    assert_eq!(totals.cleared, Money::ZERO);
}

#[tokio::test]
async fn test_duplicate_reply_is_applied_once() {
    let (chat, _) = create_test_chat(LedgerConfig::default());
    let entry = post_groceries(&chat).await;

    chat.handle_reply("100 given", MessageId(10), ANNOUNCEMENT, MEERA_ADMIN)
        .await
        .unwrap();
    assert_eq!(
        chat.handle_reply("100 given", MessageId(10), ANNOUNCEMENT, MEERA_ADMIN)
            .await
            .unwrap_err(),
        LedgerError::DuplicateReply {
            message_id: MessageId(10)
        }
    );

    let stored = chat.ledger().get_expense(entry.id()).await.unwrap();
    assert_eq!(stored.cleared_amount(), Money::from_major(100));
}

#[tokio::test]
async fn test_failed_reply_can_be_resent() {
    let (chat, _) = create_test_chat(LedgerConfig::default());
    post_groceries(&chat).await;

    assert!(
        chat.handle_reply("9000 given", MessageId(10), ANNOUNCEMENT, MEERA_ADMIN)
            .await
            .is_err()
    );
    // Same reply id, corrected text (an edited message).
    let outcome = chat
        .handle_reply("900 given", MessageId(10), ANNOUNCEMENT, MEERA_ADMIN)
        .await
        .unwrap();
    assert_eq!(outcome.applied, Money::from_major(900));
}

#[tokio::test]
async fn test_deleted_expense_no_longer_answers_replies() {
    let (chat, _) = create_test_chat(LedgerConfig::default());
    let entry = post_groceries(&chat).await;
    let meera = member(&chat, MEERA_ADMIN).await;

    chat.ledger().soft_delete(entry.id(), meera.id).await.unwrap();

    assert_eq!(
        chat.handle_reply("10 given", MessageId(10), ANNOUNCEMENT, MEERA_ADMIN)
            .await
            .unwrap_err(),
        LedgerError::NoEntryForMessage {
            message_id: ANNOUNCEMENT
        }
    );
}

#[tokio::test]
async fn test_export_history_keeps_the_most_recent() {
    let (chat, _) = create_test_chat(LedgerConfig::default().with_export_history_capacity(3));

    for month in 1..=5 {
        chat.record_export(ExportKind::Monthly, format!("expenses_2025_{month:02}.csv"), 2048);
    }

    let history = chat.export_history();
    let names: Vec<_> = history.iter().map(|record| record.filename.as_str()).collect();
    assert_eq!(
        names,
        ["expenses_2025_03.csv", "expenses_2025_04.csv", "expenses_2025_05.csv"]
    );
    assert_eq!(history[0].display_size(), "2.0 KB");
}
