//! Removal of containers a mutation has left empty.
//!
//! A party without guests goes, and then its table if no party is left there. The chain is
//! only ever two levels deep, so it is spelled out rather than left to the store.

use log::debug;

use crate::{Entity, Mutation, Party, PrimaryKey, Result, Table};

/// Deletes the party if nobody is left in it, then prunes its table.
pub(crate) async fn prune_party(m: &mut Mutation, party_id: PrimaryKey) -> Result<()> {
    if party_id == 0 {
        return Ok(());
    }

    let Some(party) = Party::fetch(m.conn(), party_id).await? else {
        return Ok(());
    };

    if Party::has_guests(m.conn(), party.id).await? {
        return Ok(());
    }

    Party::delete_row(m.conn(), party.id).await?;
    m.entry.mark_party(party.id);
    m.entry.mark_table(party.table);
    debug!("Removed empty party {}", party.id);

    prune_table(m, party.table).await
}

/// Deletes the table if no party is seated at it.
pub(crate) async fn prune_table(m: &mut Mutation, table_id: PrimaryKey) -> Result<()> {
    if table_id == 0 || Table::fetch(m.conn(), table_id).await?.is_none() {
        return Ok(());
    }

    if Table::has_parties(m.conn(), table_id).await? {
        return Ok(());
    }

    Table::delete_row(m.conn(), table_id).await?;
    m.entry.mark_table(table_id);
    debug!("Removed empty table {table_id}");

    Ok(())
}

#[cfg(test)]
mod test {
    use crate::{
        ops::{
            guests::{add_guest, delete_guest, NewGuest},
            purchases::delete_purchase,
        },
        test_util::gala,
        Entity, Guest, Party, Purchase,
    };

    #[tokio::test]
    async fn removing_the_last_guest_removes_party_and_table() {
        let gala = gala().await;

        let mut mutation = gala.journal.begin(None).await.unwrap();
        let id = add_guest(&mut mutation, NewGuest::named("Solo Diner")).await.unwrap();
        let guest = Guest::get(mutation.conn(), id).await.unwrap();
        let party = Party::get(mutation.conn(), guest.party).await.unwrap();
        mutation.commit().await.unwrap();

        // The registration ticket has to go before the guest can
        let mut mutation = gala.journal.begin(None).await.unwrap();
        for purchase in Purchase::fetch_for_guest(mutation.conn(), id).await.unwrap() {
            delete_purchase(&mut mutation, purchase.id).await.unwrap();
        }
        mutation.commit().await.unwrap();

        let mut mutation = gala.journal.begin(None).await.unwrap();
        delete_guest(&mut mutation, id).await.unwrap();
        let delta = mutation.commit().await.unwrap();

        assert_eq!(delta.entry.guests.get(&id), Some(&None));
        assert_eq!(delta.entry.parties.get(&party.id), Some(&None));
        assert_eq!(delta.entry.tables.get(&party.table), Some(&None));
    }

    #[tokio::test]
    async fn parties_with_guests_left_are_kept() {
        let gala = gala().await;

        let mut mutation = gala.journal.begin(None).await.unwrap();
        let mut host = NewGuest::named("Hal Host");
        host.companions = 1;
        let id = add_guest(&mut mutation, host).await.unwrap();
        let guest = Guest::get(mutation.conn(), id).await.unwrap();
        mutation.commit().await.unwrap();

        let mut mutation = gala.journal.begin(None).await.unwrap();
        super::prune_party(&mut mutation, guest.party).await.unwrap();
        assert!(mutation.entry().is_empty());

        let party = Party::get(mutation.conn(), guest.party).await.unwrap();
        super::prune_table(&mut mutation, party.table).await.unwrap();
        assert!(mutation.entry().is_empty());
    }
}
