//! How each kind of entity is saved and deleted: which writes it takes, which entities
//! it marks in the journal entry and what it sets off (cascades, bidder renumbering).

mod guest;
mod item;
mod party;
mod purchase;
mod table;
