use std::collections::BTreeSet;

use crate::{GalaError, GalaResult, Guest, Item, Mutation, PrimaryKey, Purchase};

use super::{now, reference, require, TICKET_ITEM};

#[derive(Debug, Clone, Default)]
pub struct NewPurchase {
    pub guest: PrimaryKey,
    pub item: PrimaryKey,
    pub amount: i64,
}

/// Money received from a payer, settling some of the purchases billed to them
#[derive(Debug, Clone, Default)]
pub struct Payment {
    pub payer: PrimaryKey,
    pub purchases: Vec<PrimaryKey>,
    /// How the money was received, e.g. "Cash" or "Check #1001"
    pub method: String,
    /// Must equal the sum of the purchases' amounts
    pub total: i64,
}

/// Records a purchase, billed to whoever pays for the guest.
pub async fn add_purchase(m: &mut Mutation, new: NewPurchase) -> GalaResult<PrimaryKey> {
    if new.amount <= 0 {
        return Err(GalaError::invalid("Purchase amount must be positive"));
    }

    let guest: Guest = reference(m, new.guest).await?;
    let item: Item = reference(m, new.item).await?;

    // Donations without a fair market value are pledged once per guest
    if item.value == 0 && item.id != TICKET_ITEM {
        let pledged = Purchase::fetch_for_guest(m.conn(), guest.id)
            .await?
            .into_iter()
            .any(|p| p.item == item.id);

        if pledged {
            return Err(GalaError::conflict(format!(
                "{} has already pledged to {}",
                guest.name, item.name
            )));
        }
    }

    let mut purchase = Purchase {
        guest: guest.id,
        payer: match guest.payer {
            0 => guest.id,
            payer => payer,
        },
        item: item.id,
        amount: new.amount,
        ..Purchase::default()
    };

    purchase.save(m).await?;
    Ok(purchase.id)
}

/// Removes a purchase that hasn't been paid yet
pub async fn delete_purchase(m: &mut Mutation, id: PrimaryKey) -> GalaResult<()> {
    let purchase: Purchase = require(m, id).await?;

    if purchase.is_paid() {
        return Err(GalaError::conflict(format!(
            "Purchase {id} has been paid and cannot be removed"
        )));
    }

    purchase.delete(m).await
}

pub async fn pick_up_purchase(m: &mut Mutation, id: PrimaryKey) -> GalaResult<()> {
    let mut purchase: Purchase = require(m, id).await?;

    if !purchase.is_paid() {
        return Err(GalaError::conflict(format!(
            "Purchase {id} must be paid before it is picked up"
        )));
    }
    if purchase.picked_up {
        return Err(GalaError::conflict(format!(
            "Purchase {id} has already been picked up"
        )));
    }

    purchase.picked_up = true;
    purchase.save(m).await
}

/// Marks purchases paid. Every purchase must be unpaid and billed to the payer, and the
/// total must match to the cent.
pub async fn record_payment(m: &mut Mutation, payment: Payment) -> GalaResult<()> {
    let method = payment.method.trim();

    if method.is_empty() {
        return Err(GalaError::invalid("Payment method is required"));
    }
    if payment.purchases.is_empty() {
        return Err(GalaError::invalid("A payment must cover some purchases"));
    }

    let payer: Guest = reference(m, payment.payer).await?;
    let mut seen = BTreeSet::new();
    let mut purchases = Vec::with_capacity(payment.purchases.len());

    for &id in &payment.purchases {
        if !seen.insert(id) {
            return Err(GalaError::invalid(format!(
                "Purchase {id} is listed more than once"
            )));
        }

        let purchase: Purchase = reference(m, id).await?;

        if purchase.payer != payer.id {
            return Err(GalaError::invalid(format!(
                "Purchase {id} is not billed to {}",
                payer.name
            )));
        }
        if purchase.is_paid() {
            return Err(GalaError::conflict(format!(
                "Purchase {id} has already been paid"
            )));
        }

        purchases.push(purchase);
    }

    let due = purchases
        .iter()
        .try_fold(0i64, |due, p| due.checked_add(p.amount))
        .ok_or_else(|| GalaError::invalid("Purchases add up to more than one payment can hold"))?;

    if due != payment.total {
        return Err(GalaError::invalid(format!(
            "Payment of {} does not match {} due",
            payment.total, due
        )));
    }

    let timestamp = now();

    for mut purchase in purchases {
        purchase.payment_timestamp = timestamp.clone();
        purchase.payment_description = method.to_string();
        purchase.save(m).await?;
    }

    Ok(())
}
