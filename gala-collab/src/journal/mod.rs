use std::collections::{btree_map::Entry as MapEntry, BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::{Entity, Guest, Item, Party, PrimaryKey, Purchase, Result, Table};

mod mutation;
pub use mutation::*;

/// The set of entities touched by a mutation.
///
/// Marking only records an id. Once the mutation's writes are done, [JournalEntry::populate]
/// loads the current state of every marked entity, or `None` for entities that no longer
/// exist. Marking the same entity twice is the same as marking it once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tables: BTreeMap<PrimaryKey, Option<Table>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parties: BTreeMap<PrimaryKey, Option<Party>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub guests: BTreeMap<PrimaryKey, Option<Guest>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub items: BTreeMap<PrimaryKey, Option<Item>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub purchases: BTreeMap<PrimaryKey, Option<Purchase>>,
    /// Present when bidder numbers changed, and then holds the complete index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidder_to_guest: Option<BTreeMap<i64, PrimaryKey>>,

    #[serde(skip)]
    populated: bool,
}

impl JournalEntry {
    pub fn mark_table(&mut self, id: PrimaryKey) {
        mark(&mut self.tables, id, &mut self.populated);
    }

    pub fn mark_party(&mut self, id: PrimaryKey) {
        mark(&mut self.parties, id, &mut self.populated);
    }

    pub fn mark_guest(&mut self, id: PrimaryKey) {
        mark(&mut self.guests, id, &mut self.populated);
    }

    pub fn mark_item(&mut self, id: PrimaryKey) {
        mark(&mut self.items, id, &mut self.populated);
    }

    pub fn mark_purchase(&mut self, id: PrimaryKey) {
        mark(&mut self.purchases, id, &mut self.populated);
    }

    /// Requests the full bidder index in the delta
    pub fn mark_bidder_remap(&mut self) {
        if self.bidder_to_guest.is_none() {
            self.bidder_to_guest = Some(BTreeMap::new());
            self.populated = false;
        }
    }

    /// Marks every entity in the store, for a full snapshot
    pub async fn mark_everything(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        for id in Table::fetch_ids(&mut *conn).await? {
            self.mark_table(id);
        }
        for id in Party::fetch_ids(&mut *conn).await? {
            self.mark_party(id);
        }
        for id in Guest::fetch_ids(&mut *conn).await? {
            self.mark_guest(id);
        }
        for id in Item::fetch_ids(&mut *conn).await? {
            self.mark_item(id);
        }
        for id in Purchase::fetch_ids(&mut *conn).await? {
            self.mark_purchase(id);
        }

        self.mark_bidder_remap();
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.parties.is_empty()
            && self.guests.is_empty()
            && self.items.is_empty()
            && self.purchases.is_empty()
            && self.bidder_to_guest.is_none()
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Loads the current state of everything marked.
    pub async fn populate(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        populate_marked(&mut *conn, &mut self.tables).await?;
        populate_marked(&mut *conn, &mut self.parties).await?;
        populate_marked(&mut *conn, &mut self.guests).await?;
        populate_marked(&mut *conn, &mut self.items).await?;
        populate_marked(&mut *conn, &mut self.purchases).await?;

        if let Some(index) = &mut self.bidder_to_guest {
            *index = bidder_index(conn).await?;
        }

        self.populated = true;
        Ok(())
    }
}

fn mark<T>(marked: &mut BTreeMap<PrimaryKey, Option<T>>, id: PrimaryKey, populated: &mut bool) {
    // 0 is the "none" reference, there is nothing to mark
    if id == 0 {
        return;
    }

    marked.insert(id, None);
    *populated = false;
}

async fn populate_marked<E: Entity>(
    conn: &mut SqliteConnection,
    marked: &mut BTreeMap<PrimaryKey, Option<E>>,
) -> Result<()> {
    for (&id, slot) in marked.iter_mut() {
        *slot = match E::fetch(&mut *conn, id).await? {
            Some(mut entity) => {
                entity.populate(&mut *conn).await?;
                Some(entity)
            }
            None => None,
        };
    }

    Ok(())
}

/// Maps every bidder number in use to one guest holding it.
///
/// Guests billed to someone share their payer's number, so where a number is held by
/// several guests the one paying their own way is chosen. Among equals the oldest wins.
async fn bidder_index(conn: &mut SqliteConnection) -> Result<BTreeMap<i64, PrimaryKey>> {
    let mut index = BTreeMap::new();
    let mut held_by_self_payer = HashSet::new();

    for (guest, bidder, payer) in Guest::fetch_bidders(conn).await? {
        match index.entry(bidder) {
            MapEntry::Vacant(entry) => {
                entry.insert(guest);

                if payer == 0 {
                    held_by_self_payer.insert(bidder);
                }
            }
            MapEntry::Occupied(mut entry) => {
                if payer == 0 && held_by_self_payer.insert(bidder) {
                    entry.insert(guest);
                }
            }
        }
    }

    Ok(index)
}

#[cfg(test)]
mod test {
    use crate::{
        ops::guests::{add_guest, NewGuest},
        test_util::gala,
        Entity, Guest, JournalEntry,
    };

    #[test]
    fn marking_twice_is_marking_once() {
        let mut once = JournalEntry::default();
        once.mark_guest(4);
        once.mark_table(2);

        let mut twice = JournalEntry::default();
        twice.mark_guest(4);
        twice.mark_table(2);
        twice.mark_guest(4);
        twice.mark_table(2);

        assert_eq!(once, twice);
    }

    #[test]
    fn nothing_is_marked_for_the_none_reference() {
        let mut entry = JournalEntry::default();
        entry.mark_guest(0);
        entry.mark_party(0);

        assert!(entry.is_empty());
    }

    #[test]
    fn empty_maps_are_left_out_of_the_wire_format() {
        let mut entry = JournalEntry::default();
        entry.mark_item(3);

        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json, serde_json::json!({ "items": { "3": null } }));
    }

    #[tokio::test]
    async fn populating_loads_current_state_and_nulls_for_the_missing() {
        let gala = gala().await;

        let mut mutation = gala.journal.begin(None).await.unwrap();
        let id = add_guest(&mut mutation, NewGuest::named("Ada Lovelace"))
            .await
            .unwrap();
        mutation.commit().await.unwrap();

        let mut mutation = gala.journal.begin(None).await.unwrap();
        let guest = Guest::get(mutation.conn(), id).await.unwrap();

        let mut entry = JournalEntry::default();
        entry.mark_guest(id);
        entry.mark_guest(id);
        entry.mark_party(guest.party);
        entry.mark_guest(999);
        entry.populate(mutation.conn()).await.unwrap();

        let populated = entry.guests[&id].as_ref().expect("guest exists");
        assert_eq!(populated.name, "Ada Lovelace");
        assert_eq!(populated.sortname, "Lovelace, Ada");
        assert_eq!(populated.purchases.len(), 1);
        assert_eq!(entry.parties[&guest.party].as_ref().unwrap().guests, vec![id]);
        assert_eq!(entry.guests[&999], None);
        assert!(entry.is_populated());
    }

    #[tokio::test]
    async fn bidder_index_prefers_the_guest_paying() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();

        // The older guest is billed to the younger one
        let older = add_guest(&mut mutation, NewGuest::named("Dee Pendent")).await.unwrap();
        let payer = add_guest(&mut mutation, NewGuest::named("Pat Payer")).await.unwrap();

        let mut dependent = Guest::get(mutation.conn(), older).await.unwrap();
        dependent.payer = payer;
        dependent.save(&mut mutation).await.unwrap();

        for id in [older, payer] {
            Guest::update_bidder(mutation.conn(), id, 288).await.unwrap();
        }

        let mut entry = JournalEntry::default();
        entry.mark_bidder_remap();
        entry.populate(mutation.conn()).await.unwrap();

        let index = entry.bidder_to_guest.unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index[&288], payer);
    }
}
