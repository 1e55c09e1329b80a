use gala_core::plan_bidders;
use log::debug;

use crate::{Entity, GalaResult, Guest, Mutation, PrimaryKey, Table};

/// Brings the bidder numbers of everyone seated at a table in line with its number.
pub(crate) async fn renumber(m: &mut Mutation, table: &Table) -> GalaResult<()> {
    let seats = Guest::fetch_seats(m.conn(), table.id).await?;
    let assignments = plan_bidders(table.number, &seats)?;

    if assignments.is_empty() {
        return Ok(());
    }

    for assignment in &assignments {
        Guest::update_bidder(m.conn(), assignment.guest, assignment.bidder).await?;
        m.entry.mark_guest(assignment.guest);
    }

    m.entry.mark_bidder_remap();
    debug!(
        "Renumbered {} bidder(s) at table {} (number {})",
        assignments.len(),
        table.id,
        table.number
    );

    Ok(())
}

/// Like [renumber], for a table that may have been removed in the meantime
pub(crate) async fn renumber_table(m: &mut Mutation, table_id: PrimaryKey) -> GalaResult<()> {
    match Table::fetch(m.conn(), table_id).await? {
        Some(table) => renumber(m, &table).await,
        None => Ok(()),
    }
}
