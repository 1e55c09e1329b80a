use axum::{extract::Query, routing::get, Json};
use gala_collab::{Delta, JournalRecord};

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::JournalQuery,
    Router,
};

#[utoipa::path(
    get,
    path = "/all",
    tag = "journal",
    responses(
        (
            status = 200,
            description = "Every table, party, guest, item and purchase, tagged with the sequence of the latest change"
        )
    )
)]
async fn all(context: ServerContext) -> ServerResult<Json<Delta>> {
    let snapshot = context.gala.journal.snapshot().await?;

    Ok(Json(snapshot))
}

#[utoipa::path(
    get,
    path = "/journal",
    tag = "journal",
    params(JournalQuery),
    responses(
        (status = 200, description = "Journaled changes after the given sequence, oldest first"),
        (status = 400, description = "The sequence is negative")
    )
)]
async fn journal(
    context: ServerContext,
    Query(query): Query<JournalQuery>,
) -> ServerResult<Json<Vec<JournalRecord>>> {
    if query.since < 0 {
        return Err(ServerError::Invalid("since cannot be negative".into()));
    }

    let records = context.gala.journal.records_since(query.since).await?;

    Ok(Json(records))
}

pub fn router() -> Router {
    Router::new()
        .route("/all", get(all))
        .route("/journal", get(journal))
}
