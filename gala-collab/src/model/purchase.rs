use crate::{Entity, GalaResult, Mutation, Purchase};

impl Purchase {
    /// Saves the purchase, creating it if it has no id yet.
    ///
    /// Guests and items on both sides of a change are marked, since their purchase
    /// lists and paid state are derived from it.
    pub async fn save(&mut self, m: &mut Mutation) -> GalaResult<()> {
        let previous = match self.id {
            0 => None,
            id => Some(Purchase::get(m.conn(), id).await?),
        };

        if self.id == 0 {
            self.insert_row(m.conn()).await?;
        } else {
            self.update_row(m.conn()).await?;
        }

        m.entry.mark_purchase(self.id);
        m.entry.mark_guest(self.guest);
        m.entry.mark_guest(self.payer);
        m.entry.mark_item(self.item);

        if let Some(previous) = previous {
            m.entry.mark_guest(previous.guest);
            m.entry.mark_guest(previous.payer);
            m.entry.mark_item(previous.item);
        }

        Ok(())
    }

    pub async fn delete(&self, m: &mut Mutation) -> GalaResult<()> {
        Purchase::delete_row(m.conn(), self.id).await?;

        m.entry.mark_purchase(self.id);
        m.entry.mark_guest(self.guest);
        m.entry.mark_guest(self.payer);
        m.entry.mark_item(self.item);

        Ok(())
    }
}
