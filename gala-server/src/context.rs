use std::{convert::Infallible, sync::Arc};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    Json,
};
use futures_util::future::BoxFuture;
use gala_collab::{Delta, Gala, GalaResult, Mutation};

use crate::{auth::Actor, errors::ServerResult};

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub gala: Arc<Gala>,
}

impl ServerContext {
    /// Runs a business operation on behalf of `actor` and responds with what changed
    pub async fn mutate<T, F>(&self, actor: Actor, mutate: F) -> ServerResult<Json<Delta>>
    where
        F: for<'m> FnOnce(&'m mut Mutation) -> BoxFuture<'m, GalaResult<T>>,
    {
        let (_, delta) = self.gala.journal.run(actor.into_name(), mutate).await?;

        Ok(Json(delta))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ServerContext
where
    ServerContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_ref(state))
    }
}
