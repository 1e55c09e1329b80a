use async_trait::async_trait;
use gala_core::Seat;
use sqlx::{sqlite::SqliteRow, Error as SqlxError, FromRow, Row, SqliteConnection};

use super::{
    DatabaseError, Entity, Guest, IntoDatabaseError, Item, JournalRecord, Party, PrimaryKey,
    Purchase, Result, Table,
};

/// Foreign keys that may be absent are stored as NULL rather than 0
fn nullable(id: PrimaryKey) -> Option<PrimaryKey> {
    (id != 0).then_some(id)
}

impl<'r> FromRow<'r, SqliteRow> for Table {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            x: row.try_get("x")?,
            y: row.try_get("y")?,
            number: row.try_get("number")?,
            parties: Vec::new(),
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Party {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            table: row.try_get("gtable")?,
            place: row.try_get("place")?,
            guests: Vec::new(),
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Guest {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            sortname: row.try_get("sortname")?,
            email: row.try_get("email")?,
            address: row.try_get("address")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            zip: row.try_get("zip")?,
            phone: row.try_get("phone")?,
            requests: row.try_get("requests")?,
            party: row.try_get("party")?,
            bidder: row.try_get("bidder")?,
            customer: row.try_get("customer")?,
            card_description: row.try_get("card_description")?,
            use_card: row.try_get("use_card")?,
            payer: row.try_get("payer")?,
            ..Self::default()
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Item {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            amount: row.try_get("amount")?,
            value: row.try_get("value")?,
            purchases: Vec::new(),
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Purchase {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            guest: row.try_get("guest")?,
            payer: row.try_get("payer")?,
            item: row.try_get("item")?,
            amount: row.try_get("amount")?,
            payment_timestamp: row.try_get("payment_timestamp")?,
            payment_description: row.try_get("payment_description")?,
            order_number: row.try_get("order_number")?,
            picked_up: row.try_get("picked_up")?,
            have_card: false,
        })
    }
}

#[async_trait]
impl Entity for Table {
    const RESOURCE: &'static str = "table";

    async fn fetch(conn: &mut SqliteConnection, id: PrimaryKey) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT id, x, y, number FROM gtable WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| e.any())
    }

    async fn fetch_ids(conn: &mut SqliteConnection) -> Result<Vec<PrimaryKey>> {
        sqlx::query_scalar("SELECT id FROM gtable ORDER BY id")
            .fetch_all(conn)
            .await
            .map_err(|e| e.any())
    }

    async fn populate(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        self.parties = Party::fetch_at_table(conn, self.id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        Ok(())
    }
}

#[async_trait]
impl Entity for Party {
    const RESOURCE: &'static str = "party";

    async fn fetch(conn: &mut SqliteConnection, id: PrimaryKey) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT id, gtable, place FROM party WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| e.any())
    }

    async fn fetch_ids(conn: &mut SqliteConnection) -> Result<Vec<PrimaryKey>> {
        sqlx::query_scalar("SELECT id FROM party ORDER BY id")
            .fetch_all(conn)
            .await
            .map_err(|e| e.any())
    }

    async fn populate(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        self.guests = Guest::fetch_in_party(conn, self.id)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();

        Ok(())
    }
}

const GUEST_COLUMNS: &str = "SELECT id, name, sortname, email, address, city, state, zip, \
    phone, requests, party, bidder, customer, card_description, use_card, \
    COALESCE(payer, 0) AS payer FROM guest";

#[async_trait]
impl Entity for Guest {
    const RESOURCE: &'static str = "guest";

    async fn fetch(conn: &mut SqliteConnection, id: PrimaryKey) -> Result<Option<Self>> {
        let sql = format!("{GUEST_COLUMNS} WHERE id = ?");

        sqlx::query_as::<_, Self>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| e.any())
    }

    async fn fetch_ids(conn: &mut SqliteConnection) -> Result<Vec<PrimaryKey>> {
        sqlx::query_scalar("SELECT id FROM guest ORDER BY id")
            .fetch_all(conn)
            .await
            .map_err(|e| e.any())
    }

    async fn populate(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        self.paying_for = Guest::fetch_paid_by(&mut *conn, self.id)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();

        self.purchases = Purchase::fetch_for_guest(&mut *conn, self.id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let billed = Purchase::fetch_paid_by(&mut *conn, self.id).await?;
        self.all_paid = billed.iter().all(Purchase::is_paid);
        self.paying_for_purchases = billed.into_iter().map(|p| p.id).collect();

        Ok(())
    }
}

#[async_trait]
impl Entity for Item {
    const RESOURCE: &'static str = "item";

    async fn fetch(conn: &mut SqliteConnection, id: PrimaryKey) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT id, name, amount, value FROM item WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| e.any())
    }

    async fn fetch_ids(conn: &mut SqliteConnection) -> Result<Vec<PrimaryKey>> {
        sqlx::query_scalar("SELECT id FROM item ORDER BY id")
            .fetch_all(conn)
            .await
            .map_err(|e| e.any())
    }

    async fn populate(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        self.purchases = Purchase::fetch_of_item(conn, self.id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        Ok(())
    }
}

const PURCHASE_COLUMNS: &str = "SELECT id, guest, payer, item, amount, payment_timestamp, \
    payment_description, order_number, picked_up FROM purchase";

#[async_trait]
impl Entity for Purchase {
    const RESOURCE: &'static str = "purchase";

    async fn fetch(conn: &mut SqliteConnection, id: PrimaryKey) -> Result<Option<Self>> {
        let sql = format!("{PURCHASE_COLUMNS} WHERE id = ?");

        sqlx::query_as::<_, Self>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| e.any())
    }

    async fn fetch_ids(conn: &mut SqliteConnection) -> Result<Vec<PrimaryKey>> {
        sqlx::query_scalar("SELECT id FROM purchase ORDER BY id")
            .fetch_all(conn)
            .await
            .map_err(|e| e.any())
    }

    async fn populate(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        self.have_card = Guest::fetch(conn, self.payer)
            .await?
            .is_some_and(|payer| payer.use_card);

        Ok(())
    }
}

impl Table {
    /// Finds the table currently holding a number
    pub async fn fetch_by_number(
        conn: &mut SqliteConnection,
        number: i64,
    ) -> Result<Option<Table>> {
        sqlx::query_as::<_, Table>("SELECT id, x, y, number FROM gtable WHERE number = ?")
            .bind(number)
            .fetch_optional(conn)
            .await
            .map_err(|e| e.any())
    }

    /// The place a party moving to this table takes, after everyone already seated
    pub async fn next_place(conn: &mut SqliteConnection, table_id: PrimaryKey) -> Result<i64> {
        sqlx::query_scalar("SELECT COALESCE(MAX(place), 0) + 1 FROM party WHERE gtable = ?")
            .bind(table_id)
            .fetch_one(conn)
            .await
            .map_err(|e| e.any())
    }

    pub async fn has_parties(conn: &mut SqliteConnection, table_id: PrimaryKey) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM party WHERE gtable = ?)")
            .bind(table_id)
            .fetch_one(conn)
            .await
            .map_err(|e| e.any())
    }

    pub async fn insert_row(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        let result = sqlx::query("INSERT INTO gtable (x, y, number) VALUES (?, ?, ?)")
            .bind(self.x)
            .bind(self.y)
            .bind(self.number)
            .execute(conn)
            .await
            .map_err(|e| e.any())?;

        self.id = result.last_insert_rowid();
        Ok(())
    }

    pub async fn update_row(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query("UPDATE gtable SET x = ?, y = ?, number = ? WHERE id = ?")
            .bind(self.x)
            .bind(self.y)
            .bind(self.number)
            .bind(self.id)
            .execute(conn)
            .await
            .map_err(|e| e.any())
            .and_then(|r| expect_row(r.rows_affected(), Table::RESOURCE, self.id))
    }

    pub async fn delete_row(conn: &mut SqliteConnection, id: PrimaryKey) -> Result<()> {
        sqlx::query("DELETE FROM gtable WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| e.any())?;

        Ok(())
    }
}

impl Party {
    /// Parties at a table, in seating order
    pub async fn fetch_at_table(
        conn: &mut SqliteConnection,
        table_id: PrimaryKey,
    ) -> Result<Vec<Party>> {
        sqlx::query_as::<_, Party>(
            "SELECT id, gtable, place FROM party WHERE gtable = ? ORDER BY place, id",
        )
        .bind(table_id)
        .fetch_all(conn)
        .await
        .map_err(|e| e.any())
    }

    pub async fn has_guests(conn: &mut SqliteConnection, party_id: PrimaryKey) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM guest WHERE party = ?)")
            .bind(party_id)
            .fetch_one(conn)
            .await
            .map_err(|e| e.any())
    }

    pub async fn insert_row(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        let result = sqlx::query("INSERT INTO party (gtable, place) VALUES (?, ?)")
            .bind(self.table)
            .bind(self.place)
            .execute(conn)
            .await
            .map_err(|e| e.any())?;

        self.id = result.last_insert_rowid();
        Ok(())
    }

    pub async fn update_row(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query("UPDATE party SET gtable = ?, place = ? WHERE id = ?")
            .bind(self.table)
            .bind(self.place)
            .bind(self.id)
            .execute(conn)
            .await
            .map_err(|e| e.any())
            .and_then(|r| expect_row(r.rows_affected(), Party::RESOURCE, self.id))
    }

    pub async fn delete_row(conn: &mut SqliteConnection, id: PrimaryKey) -> Result<()> {
        sqlx::query("DELETE FROM party WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| e.any())?;

        Ok(())
    }
}

impl Guest {
    /// Members of a party, in the order they were added
    pub async fn fetch_in_party(
        conn: &mut SqliteConnection,
        party_id: PrimaryKey,
    ) -> Result<Vec<Guest>> {
        let sql = format!("{GUEST_COLUMNS} WHERE party = ? ORDER BY id");

        sqlx::query_as::<_, Guest>(&sql)
            .bind(party_id)
            .fetch_all(conn)
            .await
            .map_err(|e| e.any())
    }

    /// Guests billed to a payer
    pub async fn fetch_paid_by(
        conn: &mut SqliteConnection,
        payer_id: PrimaryKey,
    ) -> Result<Vec<Guest>> {
        let sql = format!("{GUEST_COLUMNS} WHERE payer = ? ORDER BY id");

        sqlx::query_as::<_, Guest>(&sql)
            .bind(payer_id)
            .fetch_all(conn)
            .await
            .map_err(|e| e.any())
    }

    /// Guests seated at a table, in seating order
    pub async fn fetch_seats(
        conn: &mut SqliteConnection,
        table_id: PrimaryKey,
    ) -> Result<Vec<Seat>> {
        let rows: Vec<(PrimaryKey, i64, PrimaryKey)> = sqlx::query_as(
            "SELECT guest.id, guest.bidder, COALESCE(guest.payer, 0) \
             FROM guest JOIN party ON guest.party = party.id \
             WHERE party.gtable = ? \
             ORDER BY party.place, party.id, guest.id",
        )
        .bind(table_id)
        .fetch_all(conn)
        .await
        .map_err(|e| e.any())?;

        Ok(rows
            .into_iter()
            .map(|(guest, bidder, payer)| Seat {
                guest,
                bidder,
                payer,
            })
            .collect())
    }

    /// Every guest holding a bidder number, as `(id, bidder, payer)`, oldest first
    pub async fn fetch_bidders(
        conn: &mut SqliteConnection,
    ) -> Result<Vec<(PrimaryKey, i64, PrimaryKey)>> {
        sqlx::query_as(
            "SELECT id, bidder, COALESCE(payer, 0) FROM guest WHERE bidder != 0 ORDER BY id",
        )
        .fetch_all(conn)
        .await
        .map_err(|e| e.any())
    }

    pub async fn insert_row(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO guest (name, sortname, email, address, city, state, zip, phone, \
             requests, party, bidder, customer, card_description, use_card, payer) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.name)
        .bind(&self.sortname)
        .bind(&self.email)
        .bind(&self.address)
        .bind(&self.city)
        .bind(&self.state)
        .bind(&self.zip)
        .bind(&self.phone)
        .bind(&self.requests)
        .bind(self.party)
        .bind(self.bidder)
        .bind(&self.customer)
        .bind(&self.card_description)
        .bind(self.use_card)
        .bind(nullable(self.payer))
        .execute(conn)
        .await
        .map_err(|e| e.any())?;

        self.id = result.last_insert_rowid();
        Ok(())
    }

    pub async fn update_row(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            "UPDATE guest SET name = ?, sortname = ?, email = ?, address = ?, city = ?, \
             state = ?, zip = ?, phone = ?, requests = ?, party = ?, bidder = ?, \
             customer = ?, card_description = ?, use_card = ?, payer = ? WHERE id = ?",
        )
        .bind(&self.name)
        .bind(&self.sortname)
        .bind(&self.email)
        .bind(&self.address)
        .bind(&self.city)
        .bind(&self.state)
        .bind(&self.zip)
        .bind(&self.phone)
        .bind(&self.requests)
        .bind(self.party)
        .bind(self.bidder)
        .bind(&self.customer)
        .bind(&self.card_description)
        .bind(self.use_card)
        .bind(nullable(self.payer))
        .bind(self.id)
        .execute(conn)
        .await
        .map_err(|e| e.any())
        .and_then(|r| expect_row(r.rows_affected(), Guest::RESOURCE, self.id))
    }

    pub async fn update_bidder(
        conn: &mut SqliteConnection,
        id: PrimaryKey,
        bidder: i64,
    ) -> Result<()> {
        sqlx::query("UPDATE guest SET bidder = ? WHERE id = ?")
            .bind(bidder)
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| e.any())
            .and_then(|r| expect_row(r.rows_affected(), Guest::RESOURCE, id))
    }

    pub async fn delete_row(conn: &mut SqliteConnection, id: PrimaryKey) -> Result<()> {
        sqlx::query("DELETE FROM guest WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| e.any())?;

        Ok(())
    }
}

impl Item {
    pub async fn insert_row(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        let result = sqlx::query("INSERT INTO item (name, amount, value) VALUES (?, ?, ?)")
            .bind(&self.name)
            .bind(self.amount)
            .bind(self.value)
            .execute(conn)
            .await
            .map_err(|e| e.any())?;

        self.id = result.last_insert_rowid();
        Ok(())
    }

    pub async fn update_row(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query("UPDATE item SET name = ?, amount = ?, value = ? WHERE id = ?")
            .bind(&self.name)
            .bind(self.amount)
            .bind(self.value)
            .bind(self.id)
            .execute(conn)
            .await
            .map_err(|e| e.any())
            .and_then(|r| expect_row(r.rows_affected(), Item::RESOURCE, self.id))
    }

    pub async fn delete_row(conn: &mut SqliteConnection, id: PrimaryKey) -> Result<()> {
        sqlx::query("DELETE FROM item WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| e.any())?;

        Ok(())
    }
}

impl Purchase {
    /// Purchases made by a guest
    pub async fn fetch_for_guest(
        conn: &mut SqliteConnection,
        guest_id: PrimaryKey,
    ) -> Result<Vec<Purchase>> {
        let sql = format!("{PURCHASE_COLUMNS} WHERE guest = ? ORDER BY id");

        sqlx::query_as::<_, Purchase>(&sql)
            .bind(guest_id)
            .fetch_all(conn)
            .await
            .map_err(|e| e.any())
    }

    /// Purchases billed to a guest
    pub async fn fetch_paid_by(
        conn: &mut SqliteConnection,
        payer_id: PrimaryKey,
    ) -> Result<Vec<Purchase>> {
        let sql = format!("{PURCHASE_COLUMNS} WHERE payer = ? ORDER BY id");

        sqlx::query_as::<_, Purchase>(&sql)
            .bind(payer_id)
            .fetch_all(conn)
            .await
            .map_err(|e| e.any())
    }

    pub async fn fetch_of_item(
        conn: &mut SqliteConnection,
        item_id: PrimaryKey,
    ) -> Result<Vec<Purchase>> {
        let sql = format!("{PURCHASE_COLUMNS} WHERE item = ? ORDER BY id");

        sqlx::query_as::<_, Purchase>(&sql)
            .bind(item_id)
            .fetch_all(conn)
            .await
            .map_err(|e| e.any())
    }

    pub async fn insert_row(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO purchase (guest, payer, item, amount, payment_timestamp, \
             payment_description, order_number, picked_up) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.guest)
        .bind(self.payer)
        .bind(self.item)
        .bind(self.amount)
        .bind(&self.payment_timestamp)
        .bind(&self.payment_description)
        .bind(self.order_number)
        .bind(self.picked_up)
        .execute(conn)
        .await
        .map_err(|e| e.any())?;

        self.id = result.last_insert_rowid();
        Ok(())
    }

    pub async fn update_row(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            "UPDATE purchase SET guest = ?, payer = ?, item = ?, amount = ?, \
             payment_timestamp = ?, payment_description = ?, order_number = ?, picked_up = ? \
             WHERE id = ?",
        )
        .bind(self.guest)
        .bind(self.payer)
        .bind(self.item)
        .bind(self.amount)
        .bind(&self.payment_timestamp)
        .bind(&self.payment_description)
        .bind(self.order_number)
        .bind(self.picked_up)
        .bind(self.id)
        .execute(conn)
        .await
        .map_err(|e| e.any())
        .and_then(|r| expect_row(r.rows_affected(), Purchase::RESOURCE, self.id))
    }

    pub async fn delete_row(conn: &mut SqliteConnection, id: PrimaryKey) -> Result<()> {
        sqlx::query("DELETE FROM purchase WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| e.any())?;

        Ok(())
    }
}

/// Appends a journal row and returns its sequence number
pub async fn insert_journal_record(
    conn: &mut SqliteConnection,
    user: Option<&str>,
    timestamp: &str,
    change: &str,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO journal (user, timestamp, change) VALUES (?, ?, ?)")
        .bind(user)
        .bind(timestamp)
        .bind(change)
        .execute(conn)
        .await
        .map_err(|e| e.any())?;

    Ok(result.last_insert_rowid())
}

/// The sequence number of the latest journal row, 0 if the journal is empty
pub async fn current_sequence(conn: &mut SqliteConnection) -> Result<i64> {
    sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM journal")
        .fetch_one(conn)
        .await
        .map_err(|e| e.any())
}

pub async fn journal_records_since(
    conn: &mut SqliteConnection,
    sequence: i64,
) -> Result<Vec<JournalRecord>> {
    let rows: Vec<(i64, Option<String>, String, String)> = sqlx::query_as(
        "SELECT id, user, timestamp, change FROM journal WHERE id > ? ORDER BY id",
    )
    .bind(sequence)
    .fetch_all(conn)
    .await
    .map_err(|e| e.any())?;

    rows.into_iter()
        .map(|(sequence, user, timestamp, change)| {
            Ok(JournalRecord {
                sequence,
                user,
                timestamp,
                change: serde_json::from_str(&change).map_err(|e| e.any())?,
            })
        })
        .collect()
}

fn expect_row(affected: u64, resource: &'static str, id: PrimaryKey) -> Result<()> {
    match affected {
        0 => Err(DatabaseError::NotFound { resource, id }),
        _ => Ok(()),
    }
}
