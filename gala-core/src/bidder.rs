//! Bidder number assignment.
//!
//! Every table number owns a block of 16 bidder numbers. The block is derived so that
//! a bidder number printed in hexadecimal reads as the table number followed by a seat
//! digit (table 12 bids with 0x120 through 0x12f).
//!
//! Guests who pay their own way get their own number. Guests who have a payer share a
//! number with everyone else billed to the same payer, so that everything bid at the
//! table ends up on one bill.

use std::{
    collections::{HashMap, HashSet},
    ops::RangeInclusive,
};

use thiserror::Error;

use crate::PrimaryKey;

/// How many bidder numbers a single table owns
pub const BIDDERS_PER_TABLE: i64 = 16;

/// A guest seated at a table, as far as bidder numbers are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seat {
    pub guest: PrimaryKey,
    /// The guest's current bidder number, 0 if none
    pub bidder: i64,
    /// The guest paying for this guest, 0 if they pay their own way
    pub payer: PrimaryKey,
}

/// A bidder number that has to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub guest: PrimaryKey,
    pub bidder: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BidderError {
    #[error("Table {table} has more than {BIDDERS_PER_TABLE} bidders")]
    TableFull { table: i64 },
}

/// Returns the base of a table's bidder block.
pub fn bidder_base(table_number: i64) -> i64 {
    (table_number / 10) * 16 + table_number % 10
}

/// Returns the bidder numbers that belong to a table.
pub fn bidder_range(table_number: i64) -> RangeInclusive<i64> {
    let first = bidder_base(table_number) * BIDDERS_PER_TABLE;
    first..=first + BIDDERS_PER_TABLE - 1
}

/// Works out which seated guests need a new bidder number.
///
/// `seats` must be in seating order. Numbers that are already valid for the table are
/// kept, so rerunning this on an unchanged table produces no assignments. At the
/// placeholder table number 0 everybody loses their number.
pub fn plan_bidders(table_number: i64, seats: &[Seat]) -> Result<Vec<Assignment>, BidderError> {
    if table_number == 0 {
        let cleared = seats
            .iter()
            .filter(|seat| seat.bidder != 0)
            .map(|seat| Assignment {
                guest: seat.guest,
                bidder: 0,
            })
            .collect();

        return Ok(cleared);
    }

    let range = bidder_range(table_number);
    let seated: HashSet<PrimaryKey> = seats.iter().map(|seat| seat.guest).collect();

    // Self-payers go first, so their groups claim numbers before anyone billed to them.
    let ordered: Vec<&Seat> = seats
        .iter()
        .filter(|seat| seat.payer == 0)
        .chain(seats.iter().filter(|seat| seat.payer != 0))
        .collect();

    let mut numbers: HashMap<PrimaryKey, i64> = HashMap::new();
    let mut used: HashSet<i64> = HashSet::new();

    for seat in &ordered {
        let group = group_of(seat);
        let payer_is_seated = seat.payer != 0 && seated.contains(&seat.payer);

        if numbers.contains_key(&group)
            || payer_is_seated
            || !range.contains(&seat.bidder)
            || used.contains(&seat.bidder)
        {
            continue;
        }

        used.insert(seat.bidder);
        numbers.insert(group, seat.bidder);
    }

    for seat in &ordered {
        let group = group_of(seat);

        if !numbers.contains_key(&group) {
            let number = next_unused(&mut used, &range, table_number)?;
            numbers.insert(group, number);
        }
    }

    let assignments = seats
        .iter()
        .filter_map(|seat| {
            let bidder = numbers.get(&group_of(seat)).copied().unwrap_or(0);

            (bidder != seat.bidder).then_some(Assignment {
                guest: seat.guest,
                bidder,
            })
        })
        .collect();

    Ok(assignments)
}

/// Guests share a number with everyone billed to the same payer
fn group_of(seat: &Seat) -> PrimaryKey {
    match seat.payer {
        0 => seat.guest,
        payer => payer,
    }
}

fn next_unused(
    used: &mut HashSet<i64>,
    range: &RangeInclusive<i64>,
    table_number: i64,
) -> Result<i64, BidderError> {
    let number = range
        .clone()
        .find(|number| !used.contains(number))
        .ok_or(BidderError::TableFull {
            table: table_number,
        })?;

    used.insert(number);
    Ok(number)
}
