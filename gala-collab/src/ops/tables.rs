use crate::{GalaError, GalaResult, Mutation, PrimaryKey, Table};

use super::require;

#[derive(Debug)]
pub struct UpdatedTable {
    pub id: PrimaryKey,
    pub x: i64,
    pub y: i64,
    pub number: i64,
}

#[derive(Debug)]
pub struct TablePosition {
    pub id: PrimaryKey,
    pub x: i64,
    pub y: i64,
}

pub async fn update_table(m: &mut Mutation, updated: UpdatedTable) -> GalaResult<()> {
    if updated.number < 0 {
        return Err(GalaError::invalid("Table number must not be negative"));
    }

    let mut table: Table = require(m, updated.id).await?;
    table.x = updated.x;
    table.y = updated.y;
    table.number = updated.number;

    table.save(m).await
}

/// Moves several tables at once
pub async fn reposition_tables(m: &mut Mutation, positions: Vec<TablePosition>) -> GalaResult<()> {
    for position in positions {
        move_table(m, position.id, position.x, position.y).await?;
    }

    Ok(())
}

pub(crate) async fn move_table(m: &mut Mutation, id: PrimaryKey, x: i64, y: i64) -> GalaResult<()> {
    let mut table: Table = require(m, id).await?;

    if table.x != x || table.y != y {
        table.x = x;
        table.y = y;
        table.save(m).await?;
    }

    Ok(())
}
