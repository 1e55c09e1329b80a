use std::sync::Arc;

use chrono::Local;
use futures_util::future::BoxFuture;
use gala_core::{Broadcaster, Config, GatePermit, Message, SerialGate, Subscription};
use log::{info, warn};
use serde::Serialize;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::{
    current_sequence, insert_journal_record, journal_records_since, GalaResult,
    IntoDatabaseError, JournalEntry, JournalRecord, Result,
};

/// A populated journal entry and its place in the journal.
///
/// This is what subscribers receive and what the snapshot endpoint returns.
#[derive(Debug, Clone, Serialize)]
pub struct Delta {
    pub sequence: i64,
    #[serde(flatten)]
    pub entry: JournalEntry,
}

/// The ordered, persistent log of every committed change, and the front door for
/// changing the store.
///
/// Everything that reads or writes the store goes through the serial gate, so journal
/// rows are appended, and broadcast, in exactly the order their changes were committed.
pub struct Journal {
    pool: SqlitePool,
    gate: SerialGate,
    broadcaster: Broadcaster,
}

/// An open, gated transaction together with the entities it has touched so far.
///
/// Dropping a mutation without committing it rolls the transaction back and lets the
/// next caller through the gate.
pub struct Mutation {
    tx: Transaction<'static, Sqlite>,
    pub(crate) entry: JournalEntry,
    actor: Option<String>,
    broadcaster: Broadcaster,
    _permit: GatePermit,
}

impl Journal {
    /// Creates the journal and starts its fan-out loop on the current runtime.
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        Self {
            pool,
            gate: SerialGate::new(),
            broadcaster: Broadcaster::spawn(config),
        }
    }

    /// Waits for the gate and opens a transaction on behalf of `actor`.
    pub async fn begin(&self, actor: Option<String>) -> Result<Mutation> {
        let permit = self.gate.acquire().await;
        let tx = self.pool.begin().await.map_err(|e| e.any())?;

        Ok(Mutation {
            tx,
            entry: JournalEntry::default(),
            actor,
            broadcaster: self.broadcaster.clone(),
            _permit: permit,
        })
    }

    /// Runs a change to the store and commits it to the journal.
    ///
    /// If `mutate` fails nothing is written, no journal row is appended and nothing is
    /// broadcast.
    pub async fn run<T, F>(&self, actor: Option<String>, mutate: F) -> GalaResult<(T, Delta)>
    where
        F: for<'m> FnOnce(&'m mut Mutation) -> BoxFuture<'m, GalaResult<T>>,
    {
        let mut mutation = self.begin(actor).await?;

        let outcome = match mutate(&mut mutation).await {
            Ok(outcome) => outcome,
            Err(e) => {
                mutation.rollback().await;
                return Err(e);
            }
        };

        let delta = mutation.commit().await?;
        Ok((outcome, delta))
    }

    /// Returns the whole store as one delta, tagged with the sequence of the latest
    /// change it includes.
    pub async fn snapshot(&self) -> Result<Delta> {
        let _permit = self.gate.acquire().await;
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let sequence = current_sequence(&mut tx).await?;
        let mut entry = JournalEntry::default();
        entry.mark_everything(&mut tx).await?;
        entry.populate(&mut tx).await?;

        tx.rollback().await.map_err(|e| e.any())?;
        Ok(Delta { sequence, entry })
    }

    /// Registers a new subscriber and returns the sequence it starts after.
    ///
    /// Taking the gate guarantees the subscriber receives every change committed after
    /// that sequence and none committed before it.
    pub async fn subscribe(&self) -> Result<(Subscription, i64)> {
        let _permit = self.gate.acquire().await;
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let sequence = current_sequence(&mut tx).await?;
        tx.rollback().await.map_err(|e| e.any())?;

        Ok((self.broadcaster.subscribe(), sequence))
    }

    /// Journal rows with a sequence greater than `sequence`, oldest first
    pub async fn records_since(&self, sequence: i64) -> Result<Vec<JournalRecord>> {
        let _permit = self.gate.acquire().await;
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let records = journal_records_since(&mut tx, sequence).await?;
        tx.rollback().await.map_err(|e| e.any())?;

        Ok(records)
    }

    /// Disconnects every subscriber
    pub fn shutdown(&self) {
        self.broadcaster.shutdown();
    }
}

impl Mutation {
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// What this mutation has marked so far
    pub fn entry(&self) -> &JournalEntry {
        &self.entry
    }

    /// Populates the delta unless that was already done, appends it to the journal, commits, and broadcasts it.
    ///
    /// The gate is held until the broadcast has been queued, so subscribers see
    /// deltas in commit order.
    pub async fn commit(mut self) -> Result<Delta> {
        if !self.entry.is_populated() {
            self.entry.populate(&mut self.tx).await?;
        }

        let change = serde_json::to_string(&self.entry).map_err(|e| e.any())?;
        let timestamp = Local::now().to_rfc3339();
        let sequence =
            insert_journal_record(&mut self.tx, self.actor.as_deref(), &timestamp, &change)
                .await?;

        self.tx.commit().await.map_err(|e| e.any())?;

        let delta = Delta {
            sequence,
            entry: self.entry,
        };

        let payload = serde_json::to_string(&delta).map_err(|e| e.any())?;
        self.broadcaster.broadcast(Message {
            sequence,
            payload: Arc::from(payload),
        });

        info!(
            "Journal {} by {}: {} table(s), {} party(ies), {} guest(s), {} item(s), {} purchase(s){}",
            sequence,
            self.actor.as_deref().unwrap_or("nobody"),
            delta.entry.tables.len(),
            delta.entry.parties.len(),
            delta.entry.guests.len(),
            delta.entry.items.len(),
            delta.entry.purchases.len(),
            if delta.entry.bidder_to_guest.is_some() {
                ", bidders remapped"
            } else {
                ""
            }
        );

        Ok(delta)
    }

    /// Abandons every change made so far
    pub async fn rollback(self) {
        if let Err(e) = self.tx.rollback().await {
            warn!("Could not roll back mutation: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::Mutation;
    use crate::{
        ops::items::{add_item, NewItem},
        test_util::gala,
        Entity, GalaError, Item,
    };

    fn item(name: &str) -> NewItem {
        NewItem {
            name: name.into(),
            amount: 100,
            value: 100,
        }
    }

    #[tokio::test]
    async fn sequences_grow_with_every_commit() {
        let gala = gala().await;

        let (_, first) = gala
            .journal
            .run(None, |m| Box::pin(add_item(m, item("Vase"))))
            .await
            .unwrap();
        let (_, second) = gala
            .journal
            .run(Some("auctioneer".into()), |m| Box::pin(add_item(m, item("Lamp"))))
            .await
            .unwrap();

        assert!(second.sequence > first.sequence);

        let snapshot = gala.journal.snapshot().await.unwrap();
        assert_eq!(snapshot.sequence, second.sequence);
        assert_eq!(snapshot.entry.items.len(), 3);
        assert!(snapshot.entry.bidder_to_guest.is_some());

        let records = gala.journal.records_since(first.sequence).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sequence, second.sequence);
        assert_eq!(records[0].user.as_deref(), Some("auctioneer"));
        assert_eq!(
            records[0].change,
            serde_json::to_value(&second.entry).unwrap()
        );
    }

    #[tokio::test]
    async fn commit_keeps_an_entry_already_populated() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();
        let id = add_item(&mut mutation, item("Vase")).await.unwrap();

        let Mutation { tx, entry, .. } = &mut mutation;
        entry.populate(tx).await.unwrap();
        assert!(entry.is_populated());

        // Written behind the entry's back, so only a second populate would see it
        let mut renamed = Item::get(tx, id).await.unwrap();
        renamed.name = "Lamp".into();
        renamed.update_row(tx).await.unwrap();

        let delta = mutation.commit().await.unwrap();
        assert_eq!(delta.entry.items[&id].as_ref().unwrap().name, "Vase");
    }

    #[tokio::test]
    async fn marking_after_populating_loads_the_new_marks() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();
        let id = add_item(&mut mutation, item("Vase")).await.unwrap();

        let Mutation { tx, entry, .. } = &mut mutation;
        entry.populate(tx).await.unwrap();
        entry.mark_item(1);
        assert!(!entry.is_populated());

        let delta = mutation.commit().await.unwrap();
        assert_eq!(delta.entry.items[&id].as_ref().unwrap().name, "Vase");
        assert_eq!(delta.entry.items[&1].as_ref().unwrap().amount, 0);
    }

    #[tokio::test]
    async fn failed_changes_leave_no_trace() {
        let gala = gala().await;
        let before = gala.journal.snapshot().await.unwrap();

        let result = gala
            .journal
            .run(None, |m| {
                Box::pin(async move {
                    add_item(m, item("Vase")).await?;
                    Err::<(), _>(GalaError::invalid("changed my mind"))
                })
            })
            .await;
        assert!(matches!(result, Err(GalaError::Invalid(_))));

        // The gate must be free again
        let mutation = tokio::time::timeout(Duration::from_secs(1), gala.journal.begin(None))
            .await
            .expect("gate released")
            .unwrap();
        mutation.rollback().await;

        let after = gala.journal.snapshot().await.unwrap();
        assert_eq!(after.sequence, before.sequence);
        assert_eq!(after.entry.items.len(), before.entry.items.len());
    }

    #[tokio::test]
    async fn subscribers_hear_every_later_change_in_order() {
        let gala = gala().await;
        gala.journal
            .run(None, |m| Box::pin(add_item(m, item("Before"))))
            .await
            .unwrap();

        let (mut subscription, since) = gala.journal.subscribe().await.unwrap();

        for name in ["One", "Two", "Three"] {
            gala.journal
                .run(None, |m| Box::pin(add_item(m, item(name))))
                .await
                .unwrap();
        }

        for expected in since + 1..=since + 3 {
            let message = subscription.recv().await.unwrap();
            assert_eq!(message.sequence, expected);

            let json: serde_json::Value = serde_json::from_str(&message.payload).unwrap();
            assert_eq!(json["sequence"], expected);
        }
    }
}
