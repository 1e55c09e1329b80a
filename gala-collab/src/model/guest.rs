use crate::{bidder, cascade, Entity, GalaResult, Guest, Mutation, Party};

impl Guest {
    /// Saves the guest, creating it if it has no id yet.
    ///
    /// A guest without a party gets a party of their own at a new, unnumbered table.
    /// Leaving a party prunes it, and a change of party or payer renumbers the bidders at
    /// the tables involved.
    pub async fn save(&mut self, m: &mut Mutation) -> GalaResult<()> {
        let (previous_party, previous_payer, previous_bidder) = match self.id {
            0 => (0, 0, 0),
            id => {
                let previous = Guest::get(m.conn(), id).await?;
                (previous.party, previous.payer, previous.bidder)
            }
        };

        if self.party == 0 {
            let mut party = Party::default();
            party.save(m).await?;
            self.party = party.id;
        }

        let previous_table = match Party::fetch(m.conn(), previous_party).await? {
            Some(party) => party.table,
            None => 0,
        };

        if self.id == 0 {
            self.insert_row(m.conn()).await?;
        } else {
            self.update_row(m.conn()).await?;
        }

        m.entry.mark_guest(self.id);

        if self.payer != previous_payer {
            m.entry.mark_guest(previous_payer);
            m.entry.mark_guest(self.payer);
        }

        if self.bidder != previous_bidder {
            m.entry.mark_bidder_remap();
        }

        let moved = self.party != previous_party;

        if moved {
            m.entry.mark_party(previous_party);
            m.entry.mark_party(self.party);
            cascade::prune_party(m, previous_party).await?;
        }

        if moved || self.payer != previous_payer {
            let table = Party::get(m.conn(), self.party).await?.table;

            if previous_table != table {
                bidder::renumber_table(m, previous_table).await?;
            }

            bidder::renumber_table(m, table).await?;
            self.bidder = Guest::get(m.conn(), self.id).await?.bidder;
        }

        Ok(())
    }

    /// Deletes the guest and whatever it leaves empty.
    ///
    /// Nobody may still be billed to the guest, and the guest must have no purchases.
    pub async fn delete(&self, m: &mut Mutation) -> GalaResult<()> {
        let table = match Party::fetch(m.conn(), self.party).await? {
            Some(party) => party.table,
            None => 0,
        };

        Guest::delete_row(m.conn(), self.id).await?;

        m.entry.mark_guest(self.id);
        m.entry.mark_guest(self.payer);
        m.entry.mark_party(self.party);

        if self.bidder != 0 {
            m.entry.mark_bidder_remap();
        }

        cascade::prune_party(m, self.party).await?;
        bidder::renumber_table(m, table).await?;

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
        Entity, Guest, Party,
    };

    #[tokio::test]
    async fn guests_inherit_their_payers_bidder() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();

        let mut host = NewGuest::named("Ann Host");
        host.companions = 1;
        let host = add_guest(&mut mutation, host).await.unwrap();
        let host = Guest::get(mutation.conn(), host).await.unwrap();
        let table = Party::get(mutation.conn(), host.party).await.unwrap().table;

        update_table(
            &mut mutation,
            UpdatedTable {
                id: table,
                x: 0,
                y: 0,
                number: 12,
            },
        )
        .await
        .unwrap();
        mutation.commit().await.unwrap();

        let mut mutation = gala.journal.begin(None).await.unwrap();
        let companion = Guest::fetch_in_party(mutation.conn(), host.party)
            .await
            .unwrap()
            .into_iter()
            .find(|g| g.id != host.id)
            .unwrap();
        assert_eq!(companion.bidder, 289);

        let mut companion = companion;
        companion.payer = host.id;
        companion.save(&mut mutation).await.unwrap();
        let delta = mutation.commit().await.unwrap();

        assert_eq!(companion.bidder, 288);
        assert_eq!(delta.entry.guests[&companion.id].as_ref().unwrap().bidder, 288);

        let payer = delta.entry.guests[&host.id].as_ref().unwrap();
        assert_eq!(payer.bidder, 288);
        assert_eq!(payer.paying_for, vec![companion.id]);

        let index = delta.entry.bidder_to_guest.unwrap();
        assert_eq!(index.get(&288), Some(&host.id));
        assert_eq!(index.get(&289), None);
    }

    #[tokio::test]
    async fn a_new_guest_gets_a_party_and_table_of_their_own() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();

        let mut guest = Guest {
            name: "Nell New".into(),
            ..Guest::default()
        };
        guest.save(&mut mutation).await.unwrap();
        let delta = mutation.commit().await.unwrap();

        let party = delta.entry.parties[&guest.party].as_ref().unwrap();
        assert_eq!(party.guests, vec![guest.id]);

        let table = delta.entry.tables[&party.table].as_ref().unwrap();
        assert_eq!(table.number, 0);
        assert_eq!(table.parties, vec![party.id]);
    }
}
