use crate::{GalaResult, Mutation, Party, PrimaryKey, Table};

use super::{reference, require, tables::move_table};

#[derive(Debug)]
pub struct UpdatedParty {
    pub id: PrimaryKey,
    /// The table to seat the party at, 0 for a new table of its own
    pub table: PrimaryKey,
    /// Where to put the table the party ends up at
    pub position: Option<(i64, i64)>,
}

pub async fn update_party(m: &mut Mutation, updated: UpdatedParty) -> GalaResult<()> {
    let mut party: Party = require(m, updated.id).await?;

    if updated.table != 0 && updated.table != party.table {
        reference::<Table>(m, updated.table).await?;
    }

    if updated.table != party.table {
        party.table = updated.table;
        party.save(m).await?;
    }

    if let Some((x, y)) = updated.position {
        move_table(m, party.table, x, y).await?;
    }

    Ok(())
}
