//! Business operations. Each runs inside a single [Mutation](crate::Mutation), validates
//! its input against the current state of the store and then saves or deletes entities.

use crate::{Entity, GalaError, GalaResult, Mutation, PrimaryKey};

pub mod guests;
pub mod items;
pub mod parties;
pub mod purchases;
pub mod tables;

/// The registration ticket item
pub const TICKET_ITEM: PrimaryKey = 1;

/// Loads the entity a request is about
async fn require<E: Entity>(m: &mut Mutation, id: PrimaryKey) -> GalaResult<E> {
    E::fetch(m.conn(), id).await?.ok_or(GalaError::NotFound {
        resource: E::RESOURCE,
        id,
    })
}

/// Loads an entity a request refers to. Referring to one that doesn't exist is a mistake
/// in the request rather than a missing resource.
async fn reference<E: Entity>(m: &mut Mutation, id: PrimaryKey) -> GalaResult<E> {
    E::fetch(m.conn(), id)
        .await?
        .ok_or_else(|| GalaError::invalid(format!("No such {} {id}", E::RESOURCE)))
}

fn now() -> String {
    chrono::Local::now().to_rfc3339()
}
