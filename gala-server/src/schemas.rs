use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use gala_collab::{
    ops::{
        guests::{Contact, NewGuest, UpdatedGuest},
        items::{NewItem, UpdatedItem},
        parties::UpdatedParty,
        purchases::{NewPurchase, Payment},
        tables::{TablePosition, UpdatedTable},
    },
    PrimaryKey,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Largest amount a single item or purchase may have
const MAX_AMOUNT: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, ToSchema, Validate, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PositionSchema {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TableSchema {
    pub x: i64,
    pub y: i64,
    /// 0 takes the number off the table
    #[validate(range(min = 0, max = 9999))]
    pub number: i64,
}

#[derive(Debug, ToSchema, Validate, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TablePositionSchema {
    pub id: PrimaryKey,
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RepositionSchema {
    #[validate(length(min = 1, max = 500))]
    pub tables: Vec<TablePositionSchema>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PartySchema {
    /// 0 seats the party at a table of its own
    pub table: PrimaryKey,
    #[serde(default)]
    pub position: Option<PositionSchema>,
}

#[derive(Debug, Default, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct NewGuestSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 256))]
    pub email: String,
    #[validate(length(max = 256))]
    pub address: String,
    #[validate(length(max = 128))]
    pub city: String,
    #[validate(length(max = 64))]
    pub state: String,
    #[validate(length(max = 16))]
    pub zip: String,
    #[validate(length(max = 32))]
    pub phone: String,
    #[validate(length(max = 2048))]
    pub requests: String,
    pub payer: PrimaryKey,
    #[validate(length(max = 64))]
    pub paying_for: Vec<PrimaryKey>,
    /// How the ticket was paid for. Leave out if it hasn't been.
    #[validate(length(min = 1, max = 128))]
    pub ticket: Option<String>,
    #[validate(range(max = 32))]
    pub companions: u32,
}

#[derive(Debug, Default, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GuestSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 256))]
    pub email: String,
    #[validate(length(max = 256))]
    pub address: String,
    #[validate(length(max = 128))]
    pub city: String,
    #[validate(length(max = 64))]
    pub state: String,
    #[validate(length(max = 16))]
    pub zip: String,
    #[validate(length(max = 32))]
    pub phone: String,
    #[validate(length(max = 2048))]
    pub requests: String,
    /// 0 splits the guest off into a party of their own
    pub party: PrimaryKey,
    pub payer: PrimaryKey,
    #[validate(length(max = 64))]
    pub paying_for: Vec<PrimaryKey>,
    pub use_card: bool,
    /// Table to move the guest's party to, 0 to leave it in place
    pub table: PrimaryKey,
    pub position: Option<PositionSchema>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignPurchasesSchema {
    #[validate(length(min = 1, max = 500))]
    pub purchases: Vec<PrimaryKey>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ItemSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(range(min = 0, max = MAX_AMOUNT))]
    pub amount: i64,
    #[validate(range(min = 0))]
    pub value: i64,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPurchaseSchema {
    pub guest: PrimaryKey,
    pub item: PrimaryKey,
    #[validate(range(min = 1, max = MAX_AMOUNT))]
    pub amount: i64,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PaymentSchema {
    pub payer: PrimaryKey,
    #[validate(length(min = 1, max = 500))]
    pub purchases: Vec<PrimaryKey>,
    /// e.g. "Cash" or "Check #1001"
    #[validate(length(min = 1, max = 128))]
    pub method: String,
    pub total: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JournalQuery {
    /// Only changes after this sequence are returned
    #[serde(default)]
    pub since: i64,
}

impl TableSchema {
    pub fn into_update(self, id: PrimaryKey) -> UpdatedTable {
        UpdatedTable {
            id,
            x: self.x,
            y: self.y,
            number: self.number,
        }
    }
}

impl From<TablePositionSchema> for TablePosition {
    fn from(value: TablePositionSchema) -> Self {
        Self {
            id: value.id,
            x: value.x,
            y: value.y,
        }
    }
}

impl PartySchema {
    pub fn into_update(self, id: PrimaryKey) -> UpdatedParty {
        UpdatedParty {
            id,
            table: self.table,
            position: self.position.map(|p| (p.x, p.y)),
        }
    }
}

impl From<NewGuestSchema> for NewGuest {
    fn from(value: NewGuestSchema) -> Self {
        Self {
            contact: Contact {
                name: value.name,
                email: value.email,
                address: value.address,
                city: value.city,
                state: value.state,
                zip: value.zip,
                phone: value.phone,
                requests: value.requests,
            },
            payer: value.payer,
            paying_for: value.paying_for,
            ticket: value.ticket,
            companions: value.companions,
        }
    }
}

impl GuestSchema {
    pub fn into_update(self, id: PrimaryKey) -> UpdatedGuest {
        UpdatedGuest {
            id,
            contact: Contact {
                name: self.name,
                email: self.email,
                address: self.address,
                city: self.city,
                state: self.state,
                zip: self.zip,
                phone: self.phone,
                requests: self.requests,
            },
            party: self.party,
            payer: self.payer,
            paying_for: self.paying_for,
            use_card: self.use_card,
            table: self.table,
            position: self.position.map(|p| (p.x, p.y)),
        }
    }
}

impl From<ItemSchema> for NewItem {
    fn from(value: ItemSchema) -> Self {
        Self {
            name: value.name,
            amount: value.amount,
            value: value.value,
        }
    }
}

impl ItemSchema {
    pub fn into_update(self, id: PrimaryKey) -> UpdatedItem {
        UpdatedItem {
            id,
            name: self.name,
            amount: self.amount,
            value: self.value,
        }
    }
}

impl From<NewPurchaseSchema> for NewPurchase {
    fn from(value: NewPurchaseSchema) -> Self {
        Self {
            guest: value.guest,
            item: value.item,
            amount: value.amount,
        }
    }
}

impl From<PaymentSchema> for Payment {
    fn from(value: PaymentSchema) -> Self {
        Self {
            payer: value.payer,
            purchases: value.purchases,
            method: value.method,
            total: value.total,
        }
    }
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, String);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.body_text()))?;

        extracted_json
            .0
            .validate()
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Request body is invalid: {e}")))?;

        Ok(Self(extracted_json.0))
    }
}
