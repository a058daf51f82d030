//! Demo of the chat-driven ledger against the in-memory providers.
//!
//! Run with `RUST_LOG=roomledger=debug` to see the service spans.

use anyhow::Context;
use roomledger::mocks::{InMemoryLedgerStore, InMemoryMemberDirectory, InMemoryPaymentLog};
use roomledger::{
    ChatLedger, ExpenseLedger, ExportKind, ExternalIdentity, LedgerConfig, MemberId, MemberRef,
    MessageId,
};
use roomledger_core::environment::SystemClock;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    roomledger::metrics::register_ledger_metrics();

    println!("=== Room Ledger: settling shared expenses ===\n");

    let ravi = MemberRef::new(MemberId::new(), "Ravi").with_user_id(101);
    let meera = MemberRef::new(MemberId::new(), "Meera")
        .with_user_id(102)
        .with_admin(true);
    let directory = InMemoryMemberDirectory::new()
        .with_member(ravi.clone())
        .with_member(meera.clone());

    let ledger = ExpenseLedger::new(
        InMemoryLedgerStore::new(),
        directory,
        InMemoryPaymentLog::new(),
        SystemClock,
    )
    .with_config(LedgerConfig::from_env());
    let chat = ChatLedger::new(ledger);

    // Ravi posts an expense; the bot's announcement is message 1.
    let entry = chat
        .handle_expense_message("Groceries, 2500", ExternalIdentity::User(101), Some(MessageId(1)))
        .await
        .context("recording expense")?;
    println!("{} recorded {} for '{}'", ravi.name, entry.amount(), entry.description());

    // Meera clears it in two replies.
    for (reply, text) in [(10, "1000 given"), (11, "1500 GIVEN")] {
        let outcome = chat
            .handle_reply(text, MessageId(reply), MessageId(1), ExternalIdentity::User(102))
            .await
            .with_context(|| format!("processing reply '{text}'"))?;
        println!(
            "{} cleared {}: remaining {} ({})",
            meera.name,
            outcome.applied,
            outcome.remaining(),
            outcome.status()
        );
    }

    // A third reply is rejected with the settlement details.
    if let Err(err) = chat
        .handle_reply("10 given", MessageId(12), MessageId(1), ExternalIdentity::User(102))
        .await
    {
        println!("Rejected: {err}");
    }

    let report = chat.ledger().summarize().await?;
    println!("\nBalances:");
    for member in [&ravi, &meera] {
        let balance = report.for_member(member.id);
        println!(
            "  {}: total {} | cleared {} | remaining {}",
            member.name, balance.total, balance.cleared, balance.remaining
        );
    }

    chat.record_export(ExportKind::Monthly, "expenses_this_month.csv", 1_536);
    for export in chat.export_history() {
        println!("\nExported {} ({}, {})", export.filename, export.kind, export.display_size());
    }

    Ok(())
}
