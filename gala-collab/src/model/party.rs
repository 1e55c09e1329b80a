use crate::{bidder, cascade, Entity, GalaResult, Mutation, Party, Table};

impl Party {
    /// Saves the party, creating it if it has no id yet.
    ///
    /// A party without a table is seated at a new, unnumbered one. Moving to another table
    /// puts the party last in that table's seating order and prunes the table it left.
    pub async fn save(&mut self, m: &mut Mutation) -> GalaResult<()> {
        let previous_table = match self.id {
            0 => 0,
            id => Party::get(m.conn(), id).await?.table,
        };

        if self.table == 0 {
            let mut table = Table::default();
            table.save(m).await?;
            self.table = table.id;
        }

        let moved = self.table != previous_table;

        if moved {
            self.place = Table::next_place(m.conn(), self.table).await?;
        }

        if self.id == 0 {
            self.insert_row(m.conn()).await?;
        } else {
            self.update_row(m.conn()).await?;
        }

        m.entry.mark_party(self.id);

        if moved {
            m.entry.mark_table(previous_table);
            m.entry.mark_table(self.table);

            cascade::prune_table(m, previous_table).await?;
            bidder::renumber_table(m, previous_table).await?;
            bidder::renumber_table(m, self.table).await?;
        }

        Ok(())
    }
}
