use log::info;

use crate::{bidder, Entity, GalaResult, Mutation, Table};

impl Table {
    /// Saves the table, creating it if it has no id yet.
    ///
    /// Table numbers are unique, so taking a number another table holds demotes that table
    /// to number 0 first. A change of number renumbers every bidder seated at the table.
    pub async fn save(&mut self, m: &mut Mutation) -> GalaResult<()> {
        let previous_number = match self.id {
            0 => 0,
            id => Table::get(m.conn(), id).await?.number,
        };
        let renumbered = self.number != previous_number;

        if renumbered && self.number != 0 {
            if let Some(mut holder) = Table::fetch_by_number(m.conn(), self.number).await? {
                info!(
                    "Table {} gives up number {} to table {}",
                    holder.id, holder.number, self.id
                );

                holder.number = 0;
                holder.update_row(m.conn()).await?;
                m.entry.mark_table(holder.id);
                bidder::renumber(m, &holder).await?;
            }
        }

        if self.id == 0 {
            self.insert_row(m.conn()).await?;
        } else {
            self.update_row(m.conn()).await?;
        }

        m.entry.mark_table(self.id);

        if renumbered {
            bidder::renumber(m, self).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{
        ops::{
            guests::{add_guest, NewGuest},
            tables::{update_table, UpdatedTable},
        },
        test_util::gala,
        Entity, Guest, Party, Table,
    };

    /// Seats a host with companions and returns the guests, in seating order, and the table
    async fn seat_party(m: &mut crate::Mutation, name: &str, companions: u32) -> (Vec<i64>, i64) {
        let mut host = NewGuest::named(name);
        host.companions = companions;
        let id = add_guest(m, host).await.unwrap();

        let guest = Guest::get(m.conn(), id).await.unwrap();
        let party = Party::get(m.conn(), guest.party).await.unwrap();
        let guests = Guest::fetch_in_party(m.conn(), party.id)
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();

        (guests, party.table)
    }

    fn numbering(table: i64, number: i64) -> UpdatedTable {
        UpdatedTable {
            id: table,
            x: 0,
            y: 0,
            number,
        }
    }

    #[tokio::test]
    async fn numbering_a_table_hands_out_bidders() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();
        let (guests, table) = seat_party(&mut mutation, "Tia Table", 2).await;
        mutation.commit().await.unwrap();

        let mut mutation = gala.journal.begin(None).await.unwrap();
        update_table(&mut mutation, numbering(table, 12)).await.unwrap();
        let delta = mutation.commit().await.unwrap();

        let bidders: Vec<_> = guests
            .iter()
            .map(|id| delta.entry.guests[id].as_ref().unwrap().bidder)
            .collect();
        assert_eq!(bidders, vec![288, 289, 290]);

        let index = delta.entry.bidder_to_guest.expect("bidders were remapped");
        assert_eq!(index.len(), 3);
        assert_eq!(index[&289], guests[1]);

        // Back to the placeholder number takes them away again
        let mut mutation = gala.journal.begin(None).await.unwrap();
        update_table(&mut mutation, numbering(table, 0)).await.unwrap();
        let delta = mutation.commit().await.unwrap();

        for id in &guests {
            assert_eq!(delta.entry.guests[id].as_ref().unwrap().bidder, 0);
        }
        assert_eq!(delta.entry.bidder_to_guest, Some(Default::default()));
    }

    #[tokio::test]
    async fn moving_without_renumbering_changes_no_bidders() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();
        let (_, table) = seat_party(&mut mutation, "Tia Table", 1).await;
        update_table(&mut mutation, numbering(table, 3)).await.unwrap();
        mutation.commit().await.unwrap();

        let mut mutation = gala.journal.begin(None).await.unwrap();
        update_table(
            &mut mutation,
            UpdatedTable {
                id: table,
                x: 40,
                y: 80,
                number: 3,
            },
        )
        .await
        .unwrap();
        let delta = mutation.commit().await.unwrap();

        assert!(delta.entry.guests.is_empty());
        assert!(delta.entry.bidder_to_guest.is_none());
        assert_eq!(delta.entry.tables[&table].as_ref().unwrap().x, 40);
    }

    #[tokio::test]
    async fn taking_a_number_demotes_its_holder() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();
        let (first_guests, first) = seat_party(&mut mutation, "Fay First", 0).await;
        let (second_guests, second) = seat_party(&mut mutation, "Sid Second", 0).await;
        update_table(&mut mutation, numbering(first, 5)).await.unwrap();
        mutation.commit().await.unwrap();

        let mut mutation = gala.journal.begin(None).await.unwrap();
        update_table(&mut mutation, numbering(second, 5)).await.unwrap();
        let delta = mutation.commit().await.unwrap();

        let demoted = delta.entry.tables[&first].as_ref().unwrap();
        assert_eq!(demoted.number, 0);
        assert_eq!(delta.entry.tables[&second].as_ref().unwrap().number, 5);

        let stripped = delta.entry.guests[&first_guests[0]].as_ref().unwrap();
        let promoted = delta.entry.guests[&second_guests[0]].as_ref().unwrap();
        assert_eq!(stripped.bidder, 0);
        assert_eq!(promoted.bidder, 80);

        let mut mutation = gala.journal.begin(None).await.unwrap();
        let holder = Table::fetch_by_number(mutation.conn(), 5).await.unwrap();
        assert_eq!(holder.map(|t| t.id), Some(second));
    }
}
