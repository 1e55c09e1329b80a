use axum::{extract::Path, routing::put, Json};
use gala_collab::{ops::parties::update_party, Delta, PrimaryKey};

use crate::{
    auth::Actor,
    context::ServerContext,
    errors::ServerResult,
    schemas::{PartySchema, ValidatedJson},
    Router,
};

#[utoipa::path(
    put,
    path = "/party/{id}",
    tag = "parties",
    params(("id" = i64, Path, description = "Party id")),
    request_body = PartySchema,
    responses(
        (status = 200, description = "The party was seated"),
        (status = 400, description = "No such table"),
        (status = 404, description = "No such party")
    )
)]
async fn put_party(
    context: ServerContext,
    actor: Actor,
    Path(id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<PartySchema>,
) -> ServerResult<Json<Delta>> {
    let updated = body.into_update(id);

    context
        .mutate(actor, move |m| Box::pin(update_party(m, updated)))
        .await
}

pub fn router() -> Router {
    Router::new().route("/party/:id", put(put_party))
}
