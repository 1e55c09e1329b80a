use axum::{
    extract::Path,
    routing::{post, put},
    Json,
};
use gala_collab::{
    ops::tables::{reposition_tables, update_table, TablePosition},
    Delta, PrimaryKey,
};

use crate::{
    auth::Actor,
    context::ServerContext,
    errors::ServerResult,
    schemas::{RepositionSchema, TableSchema, ValidatedJson},
    Router,
};

#[utoipa::path(
    put,
    path = "/table/{id}",
    tag = "tables",
    params(("id" = i64, Path, description = "Table id")),
    request_body = TableSchema,
    responses(
        (status = 200, description = "The table was moved or renumbered"),
        (status = 400, description = "The table number is not allowed"),
        (status = 404, description = "No such table")
    )
)]
async fn put_table(
    context: ServerContext,
    actor: Actor,
    Path(id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<TableSchema>,
) -> ServerResult<Json<Delta>> {
    let updated = body.into_update(id);

    context
        .mutate(actor, move |m| Box::pin(update_table(m, updated)))
        .await
}

#[utoipa::path(
    post,
    path = "/table/reposition",
    tag = "tables",
    request_body = RepositionSchema,
    responses(
        (status = 200, description = "The tables were moved"),
        (status = 404, description = "One of the tables doesn't exist")
    )
)]
async fn reposition(
    context: ServerContext,
    actor: Actor,
    ValidatedJson(body): ValidatedJson<RepositionSchema>,
) -> ServerResult<Json<Delta>> {
    let positions = body.tables.into_iter().map(TablePosition::from).collect();

    context
        .mutate(actor, move |m| Box::pin(reposition_tables(m, positions)))
        .await
}

pub fn router() -> Router {
    Router::new()
        .route("/table/reposition", post(reposition))
        .route("/table/:id", put(put_table))
}
