use crate::{GalaResult, Item, Mutation};

impl Item {
    pub async fn save(&mut self, m: &mut Mutation) -> GalaResult<()> {
        if self.id == 0 {
            self.insert_row(m.conn()).await?;
        } else {
            self.update_row(m.conn()).await?;
        }

        m.entry.mark_item(self.id);
        Ok(())
    }

    /// Deletes the item. It must not have any purchases.
    pub async fn delete(&self, m: &mut Mutation) -> GalaResult<()> {
        Item::delete_row(m.conn(), self.id).await?;
        m.entry.mark_item(self.id);

        Ok(())
    }
}
