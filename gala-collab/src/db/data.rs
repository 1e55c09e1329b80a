use serde::{Deserialize, Serialize};

pub use gala_core::PrimaryKey;

/// A table in the ballroom
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: PrimaryKey,
    pub x: i64,
    pub y: i64,
    /// 0 until the table is numbered
    pub number: i64,
    /// Parties seated here, in seating order
    pub parties: Vec<PrimaryKey>,
}

/// Guests who arrive together and sit together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: PrimaryKey,
    pub table: PrimaryKey,
    /// Position in the table's seating order
    pub place: i64,
    /// Members, in the order they were added
    pub guests: Vec<PrimaryKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: PrimaryKey,
    pub name: String,
    pub sortname: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub phone: String,
    pub requests: String,
    pub party: PrimaryKey,
    /// 0 while the guest has no bidder number
    pub bidder: i64,
    /// Reference to the guest's record with the payment processor
    #[serde(skip)]
    pub customer: String,
    /// Human readable description of the card on file
    pub card_description: String,
    /// Whether purchases are charged to the card on file
    pub use_card: bool,
    /// 0 if the guest pays their own way
    pub payer: PrimaryKey,

    /// Guests this guest pays for
    pub paying_for: Vec<PrimaryKey>,
    /// Purchases made by this guest
    pub purchases: Vec<PrimaryKey>,
    /// Purchases billed to this guest
    pub paying_for_purchases: Vec<PrimaryKey>,
    /// Whether every purchase billed to this guest has been paid
    pub all_paid: bool,
}

/// Something that can be bought, bid on or donated to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: PrimaryKey,
    pub name: String,
    /// Default purchase amount
    pub amount: i64,
    /// Fair market value. 0 for donations.
    pub value: i64,
    pub purchases: Vec<PrimaryKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: PrimaryKey,
    pub guest: PrimaryKey,
    pub payer: PrimaryKey,
    pub item: PrimaryKey,
    pub amount: i64,
    /// Empty while the purchase is unpaid
    pub payment_timestamp: String,
    pub payment_description: String,
    /// External order reference, 0 if none
    pub order_number: i64,
    pub picked_up: bool,

    /// Whether the payer has a card on file to charge
    pub have_card: bool,
}

impl Purchase {
    pub fn is_paid(&self) -> bool {
        !self.payment_timestamp.is_empty()
    }
}

/// A stored journal row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalRecord {
    pub sequence: i64,
    pub user: Option<String>,
    pub timestamp: String,
    pub change: serde_json::Value,
}
