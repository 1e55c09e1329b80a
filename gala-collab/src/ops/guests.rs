use std::collections::BTreeSet;

use crate::{
    Entity, GalaError, GalaResult, Guest, Item, Mutation, Party, PrimaryKey, Purchase, Table,
};

use super::{now, reference, require, tables::move_table, TICKET_ITEM};

/// Name endings that stay after the first names when sorting by last name
const KNOWN_SUFFIXES: [&str; 7] = [" jr", " jr.", " sr", " sr.", " iii", " md", " m.d."];

/// A guest's contact details
#[derive(Debug, Clone, Default)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub phone: String,
    pub requests: String,
}

#[derive(Debug, Default)]
pub struct NewGuest {
    pub contact: Contact,
    /// The guest paying for the new guest, 0 if they pay their own way
    pub payer: PrimaryKey,
    /// Existing guests the new guest pays for
    pub paying_for: Vec<PrimaryKey>,
    /// How the ticket was paid for, if it was
    pub ticket: Option<String>,
    /// Unnamed guests coming along in the same party
    pub companions: u32,
}

#[derive(Debug, Default)]
pub struct UpdatedGuest {
    pub id: PrimaryKey,
    pub contact: Contact,
    /// 0 splits the guest off into a party of their own
    pub party: PrimaryKey,
    pub payer: PrimaryKey,
    pub paying_for: Vec<PrimaryKey>,
    pub use_card: bool,
    /// Table to move the guest's party to, 0 to leave it where it is
    pub table: PrimaryKey,
    /// Where to put the guest's table
    pub position: Option<(i64, i64)>,
}

impl NewGuest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            contact: Contact {
                name: name.into(),
                ..Contact::default()
            },
            ..Self::default()
        }
    }
}

impl Contact {
    fn validate(mut self) -> GalaResult<Self> {
        self.name = self.name.trim().to_string();

        if self.name.is_empty() {
            return Err(GalaError::invalid("Guest name is required"));
        }

        // A partial address can't be mailed to
        let address = [&self.address, &self.city, &self.state, &self.zip];
        if address.iter().any(|part| part.trim().is_empty()) {
            self.address.clear();
            self.city.clear();
            self.state.clear();
            self.zip.clear();
        }

        Ok(self)
    }

    fn apply(self, guest: &mut Guest) {
        if guest.name != self.name || guest.sortname.is_empty() {
            guest.sortname = sortname(&self.name);
        }

        guest.name = self.name;
        guest.email = self.email;
        guest.address = self.address;
        guest.city = self.city;
        guest.state = self.state;
        guest.zip = self.zip;
        guest.phone = self.phone;
        guest.requests = self.requests;
    }
}

/// Registers a guest along with their ticket, and any companions along with theirs.
/// Returns the id of the new guest.
pub async fn add_guest(m: &mut Mutation, new: NewGuest) -> GalaResult<PrimaryKey> {
    let contact = new.contact.validate()?;
    check_billing(m, &Guest::default(), new.payer, &new.paying_for).await?;
    let ticket: Item = reference(m, TICKET_ITEM).await?;

    let mut guest = Guest {
        payer: new.payer,
        ..Guest::default()
    };
    contact.apply(&mut guest);
    guest.save(m).await?;

    bill_to(m, guest.id, new.paying_for.iter().copied()).await?;

    let mut purchase = Purchase {
        guest: guest.id,
        payer: match guest.payer {
            0 => guest.id,
            payer => payer,
        },
        item: ticket.id,
        amount: ticket.amount,
        ..Purchase::default()
    };

    if let Some(description) = new.ticket {
        purchase.payment_timestamp = now();
        purchase.payment_description = description;
    }

    purchase.save(m).await?;

    for number in 1..=new.companions {
        let mut companion = Guest {
            name: format!("{} Guest #{number}", guest.name),
            sortname: format!("{} Guest #{number}", guest.sortname),
            party: guest.party,
            ..Guest::default()
        };
        companion.save(m).await?;

        let mut companion_ticket = Purchase {
            id: 0,
            guest: companion.id,
            ..purchase.clone()
        };
        companion_ticket.save(m).await?;
    }

    Ok(guest.id)
}

pub async fn update_guest(m: &mut Mutation, updated: UpdatedGuest) -> GalaResult<()> {
    let mut guest: Guest = require(m, updated.id).await?;
    let contact = updated.contact.validate()?;
    check_billing(m, &guest, updated.payer, &updated.paying_for).await?;

    if updated.use_card && updated.payer != 0 {
        return Err(GalaError::invalid(
            "A guest with a payer cannot be charged to a card",
        ));
    }
    if updated.use_card && guest.customer.is_empty() {
        return Err(GalaError::invalid(format!(
            "{} has no card on file",
            guest.name
        )));
    }
    if updated.party != 0 && updated.party != guest.party {
        reference::<Party>(m, updated.party).await?;
    }
    if updated.table != 0 {
        reference::<Table>(m, updated.table).await?;
    }

    let wanted: BTreeSet<PrimaryKey> = updated.paying_for.iter().copied().collect();

    for mut payee in Guest::fetch_paid_by(m.conn(), guest.id).await? {
        if !wanted.contains(&payee.id) {
            payee.payer = 0;
            payee.save(m).await?;
        }
    }

    // Releasing payees may have renumbered this guest
    guest.bidder = Guest::get(m.conn(), guest.id).await?.bidder;

    contact.apply(&mut guest);
    guest.party = updated.party;
    guest.payer = updated.payer;
    guest.use_card = updated.use_card;
    guest.save(m).await?;

    bill_to(m, guest.id, wanted.into_iter()).await?;

    if updated.table != 0 {
        let mut party = Party::get(m.conn(), guest.party).await?;

        if party.table != updated.table {
            party.table = updated.table;
            party.save(m).await?;
        }
    }

    if let Some((x, y)) = updated.position {
        let party = Party::get(m.conn(), guest.party).await?;
        move_table(m, party.table, x, y).await?;
    }

    Ok(())
}

/// Removes a guest who has nothing bought or billed. Guests they paid for pay their own way
/// afterwards.
pub async fn delete_guest(m: &mut Mutation, id: PrimaryKey) -> GalaResult<()> {
    let guest: Guest = require(m, id).await?;

    let bought = Purchase::fetch_for_guest(m.conn(), id).await?;
    let billed = Purchase::fetch_paid_by(m.conn(), id).await?;

    if !bought.is_empty() || !billed.is_empty() {
        return Err(GalaError::conflict(format!(
            "{} has purchases and cannot be removed",
            guest.name
        )));
    }

    for mut payee in Guest::fetch_paid_by(m.conn(), id).await? {
        payee.payer = 0;
        payee.save(m).await?;
    }

    let guest = Guest::get(m.conn(), id).await?;
    guest.delete(m).await
}

/// Bills unpaid purchases to a guest
pub async fn assign_purchases(
    m: &mut Mutation,
    payer_id: PrimaryKey,
    purchase_ids: Vec<PrimaryKey>,
) -> GalaResult<()> {
    let payer: Guest = require(m, payer_id).await?;

    for id in purchase_ids {
        let mut purchase: Purchase = reference(m, id).await?;

        if purchase.is_paid() {
            return Err(GalaError::conflict(format!(
                "Purchase {id} has already been paid"
            )));
        }

        if purchase.payer != payer.id {
            purchase.payer = payer.id;
            purchase.save(m).await?;
        }
    }

    Ok(())
}

/// Derives the name a guest is listed under, "Last, First" plus any suffix.
pub fn sortname(name: &str) -> String {
    let name = name.trim();

    let (name, suffix) = match name.find(',') {
        Some(at) => name.split_at(at),
        None => KNOWN_SUFFIXES
            .iter()
            .find_map(|suffix| {
                let at = name.len().checked_sub(suffix.len())?;

                (name.is_char_boundary(at) && name[at..].eq_ignore_ascii_case(suffix))
                    .then(|| name.split_at(at))
            })
            .unwrap_or((name, "")),
    };

    let name = name.trim();

    match name.rfind(' ') {
        Some(at) => format!("{}, {}{}", &name[at + 1..], &name[..at], suffix),
        None => format!("{name}{suffix}"),
    }
}

/// Payers can't have payers of their own, and nobody pays for themselves.
async fn check_billing(
    m: &mut Mutation,
    guest: &Guest,
    payer_id: PrimaryKey,
    paying_for: &[PrimaryKey],
) -> GalaResult<()> {
    if payer_id != 0 && !paying_for.is_empty() {
        return Err(GalaError::invalid(
            "A guest with a payer cannot pay for other guests",
        ));
    }

    if payer_id != 0 {
        if payer_id == guest.id {
            return Err(GalaError::invalid("A guest cannot pay for themselves"));
        }

        let payer: Guest = reference(m, payer_id).await?;

        if payer.payer != 0 {
            return Err(GalaError::invalid(format!(
                "{} is paid for by someone else and cannot pay for others",
                payer.name
            )));
        }
    }

    for &id in paying_for {
        if id == guest.id {
            return Err(GalaError::invalid("A guest cannot pay for themselves"));
        }

        let payee: Guest = reference(m, id).await?;

        // Swapping with the current payer is fine, they stop paying for this guest
        if id != guest.payer && !Guest::fetch_paid_by(m.conn(), id).await?.is_empty() {
            return Err(GalaError::invalid(format!(
                "{} pays for other guests and cannot be paid for",
                payee.name
            )));
        }
    }

    Ok(())
}

async fn bill_to(
    m: &mut Mutation,
    payer_id: PrimaryKey,
    payees: impl Iterator<Item = PrimaryKey> + Send,
) -> GalaResult<()> {
    for id in payees {
        let mut payee = Guest::get(m.conn(), id).await?;

        if payee.payer != payer_id {
            payee.payer = payer_id;
            payee.use_card = false;
            payee.save(m).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::{
        add_guest, assign_purchases, delete_guest, sortname, update_guest, Contact, NewGuest,
        UpdatedGuest,
    };
    use crate::{
        ops::tables::{update_table, UpdatedTable},
        test_util::gala,
        Entity, GalaError, Guest, Mutation, Party, PrimaryKey, Purchase,
    };

    fn unchanged(guest: &Guest) -> UpdatedGuest {
        UpdatedGuest {
            id: guest.id,
            contact: Contact {
                name: guest.name.clone(),
                ..Contact::default()
            },
            party: guest.party,
            payer: guest.payer,
            paying_for: guest.paying_for.clone(),
            ..UpdatedGuest::default()
        }
    }

    async fn fetch_populated(m: &mut Mutation, id: PrimaryKey) -> Guest {
        let mut guest = Guest::get(m.conn(), id).await.unwrap();
        guest.populate(m.conn()).await.unwrap();
        guest
    }

    /// Gives the table the guest sits at a number, returning the table and party
    async fn number_table_of(
        m: &mut Mutation,
        id: PrimaryKey,
        number: i64,
    ) -> (PrimaryKey, PrimaryKey) {
        let guest = Guest::get(m.conn(), id).await.unwrap();
        let table = Party::get(m.conn(), guest.party).await.unwrap().table;

        let updated = UpdatedTable {
            id: table,
            x: 0,
            y: 0,
            number,
        };
        update_table(m, updated).await.unwrap();

        (table, guest.party)
    }

    #[test]
    fn sort_names() {
        assert_eq!(sortname("Ada Lovelace"), "Lovelace, Ada");
        assert_eq!(sortname("  Mary Ann Evans "), "Evans, Mary Ann");
        assert_eq!(sortname("Martin Luther King Jr."), "King, Martin Luther Jr.");
        assert_eq!(sortname("Jane Doe, PhD"), "Doe, Jane, PhD");
        assert_eq!(sortname("Cher"), "Cher");
    }

    #[tokio::test]
    async fn registering_a_guest_sells_tickets() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(Some("frontdesk".into())).await.unwrap();

        let mut host = NewGuest::named("Hana Host");
        host.ticket = Some("Check #1001".into());
        host.companions = 2;
        let id = add_guest(&mut mutation, host).await.unwrap();

        let host = fetch_populated(&mut mutation, id).await;
        assert_eq!(host.paying_for_purchases.len(), 3);
        assert!(host.all_paid);

        let party = Guest::fetch_in_party(mutation.conn(), host.party).await.unwrap();
        let names: Vec<_> = party.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["Hana Host", "Hana Host Guest #1", "Hana Host Guest #2"]);
    }

    #[tokio::test]
    async fn partial_addresses_are_dropped() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();

        let mut new = NewGuest::named("Pip Partial");
        new.contact.address = "1 Main St".into();
        new.contact.city = "Springfield".into();
        let id = add_guest(&mut mutation, new).await.unwrap();

        let guest = Guest::get(mutation.conn(), id).await.unwrap();
        assert!(guest.address.is_empty());
        assert!(guest.city.is_empty());
    }

    #[tokio::test]
    async fn payers_cannot_be_chained() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();

        let payer = add_guest(&mut mutation, NewGuest::named("Pat Payer")).await.unwrap();
        let mut dependent = NewGuest::named("Dee Pendent");
        dependent.payer = payer;
        let dependent = add_guest(&mut mutation, dependent).await.unwrap();

        let mut chained = NewGuest::named("Chad Chain");
        chained.payer = dependent;
        let result = add_guest(&mut mutation, chained).await;
        assert!(matches!(result, Err(GalaError::Invalid(_))));

        let mut both = NewGuest::named("Bo Both");
        both.payer = payer;
        both.paying_for = vec![dependent];
        let result = add_guest(&mut mutation, both).await;
        assert!(matches!(result, Err(GalaError::Invalid(_))));
    }

    #[tokio::test]
    async fn payer_and_payee_can_swap() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();

        let first = add_guest(&mut mutation, NewGuest::named("Fran First")).await.unwrap();
        let mut second = NewGuest::named("Sam Second");
        second.payer = first;
        let second = add_guest(&mut mutation, second).await.unwrap();

        let guest = fetch_populated(&mut mutation, second).await;
        let mut swapped = unchanged(&guest);
        swapped.payer = 0;
        swapped.paying_for = vec![first];
        update_guest(&mut mutation, swapped).await.unwrap();

        let first = fetch_populated(&mut mutation, first).await;
        let second = fetch_populated(&mut mutation, second).await;
        assert_eq!(first.payer, second.id);
        assert_eq!(second.payer, 0);
        assert_eq!(second.paying_for, vec![first.id]);
    }

    #[tokio::test]
    async fn guests_with_purchases_stay() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();
        let id = add_guest(&mut mutation, NewGuest::named("Bea Buyer")).await.unwrap();

        let result = delete_guest(&mut mutation, id).await;

        assert!(matches!(result, Err(GalaError::Conflict(_))));
    }

    #[tokio::test]
    async fn deleting_a_payer_frees_their_guests() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();

        let payer = add_guest(&mut mutation, NewGuest::named("Pat Payer")).await.unwrap();
        let mut dependent = NewGuest::named("Dee Pendent");
        dependent.payer = payer;
        let dependent = add_guest(&mut mutation, dependent).await.unwrap();

        // Move every ticket over to the dependent so the payer has nothing left
        let tickets: Vec<_> = Purchase::fetch_paid_by(mutation.conn(), payer)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(tickets.len(), 2);
        assign_purchases(&mut mutation, dependent, tickets.clone()).await.unwrap();

        let mut ticket = Purchase::get(mutation.conn(), tickets[0]).await.unwrap();
        ticket.guest = dependent;
        ticket.save(&mut mutation).await.unwrap();
        mutation.commit().await.unwrap();

        let mut mutation = gala.journal.begin(None).await.unwrap();
        delete_guest(&mut mutation, payer).await.unwrap();
        let delta = mutation.commit().await.unwrap();

        assert_eq!(delta.entry.guests[&payer], None);
        assert_eq!(delta.entry.guests[&dependent].as_ref().unwrap().payer, 0);
    }

    #[tokio::test]
    async fn moving_a_guest_away_empties_their_old_party_and_table() {
        let gala = gala().await;
        let mut mutation = gala.journal.begin(None).await.unwrap();

        let lone = add_guest(&mut mutation, NewGuest::named("Lou Lone")).await.unwrap();
        let (old_table, old_party) = number_table_of(&mut mutation, lone, 12).await;
        let host = add_guest(&mut mutation, NewGuest::named("Hal Host")).await.unwrap();
        let (_, party) = number_table_of(&mut mutation, host, 5).await;

        assert_eq!(fetch_populated(&mut mutation, lone).await.bidder, 288);
        assert_eq!(fetch_populated(&mut mutation, host).await.bidder, 80);
        mutation.commit().await.unwrap();

        let mut mutation = gala.journal.begin(None).await.unwrap();
        let guest = fetch_populated(&mut mutation, lone).await;
        let mut moved = unchanged(&guest);
        moved.party = party;
        update_guest(&mut mutation, moved).await.unwrap();
        let delta = mutation.commit().await.unwrap();

        assert_eq!(delta.entry.parties.get(&old_party), Some(&None));
        assert_eq!(delta.entry.tables.get(&old_table), Some(&None));

        let guest = delta.entry.guests[&lone].as_ref().unwrap();
        assert_eq!(guest.party, party);
        assert_eq!(guest.bidder, 81);

        let remap = delta.entry.bidder_to_guest.as_ref().unwrap();
        assert_eq!(remap.get(&80), Some(&host));
        assert_eq!(remap.get(&81), Some(&lone));
    }
}
