use crate::{GalaError, GalaResult, Item, Mutation, PrimaryKey, Purchase};

use super::{require, TICKET_ITEM};

#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub name: String,
    pub amount: i64,
    pub value: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatedItem {
    pub id: PrimaryKey,
    pub name: String,
    pub amount: i64,
    pub value: i64,
}

fn validate(name: &str, amount: i64, value: i64) -> GalaResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(GalaError::invalid("Item name is required"));
    }
    if amount < 0 || value < 0 {
        return Err(GalaError::invalid(
            "Item amount and value cannot be negative",
        ));
    }

    Ok(name.to_string())
}

pub async fn add_item(m: &mut Mutation, new: NewItem) -> GalaResult<PrimaryKey> {
    let mut item = Item {
        name: validate(&new.name, new.amount, new.value)?,
        amount: new.amount,
        value: new.value,
        ..Item::default()
    };

    item.save(m).await?;
    Ok(item.id)
}

pub async fn update_item(m: &mut Mutation, updated: UpdatedItem) -> GalaResult<()> {
    let mut item: Item = require(m, updated.id).await?;

    item.name = validate(&updated.name, updated.amount, updated.value)?;
    item.amount = updated.amount;
    item.value = updated.value;

    item.save(m).await
}

/// Removes an item nobody has bought. The ticket item always stays.
pub async fn delete_item(m: &mut Mutation, id: PrimaryKey) -> GalaResult<()> {
    let item: Item = require(m, id).await?;

    if item.id == TICKET_ITEM {
        return Err(GalaError::conflict("The ticket item cannot be removed"));
    }
    if !Purchase::fetch_of_item(m.conn(), id).await?.is_empty() {
        return Err(GalaError::conflict(format!(
            "{} has been purchased and cannot be removed",
            item.name
        )));
    }

    item.delete(m).await
}
