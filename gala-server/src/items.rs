use axum::{
    extract::Path,
    routing::{post, put},
    Json,
};
use gala_collab::{
    ops::items::{add_item, delete_item, update_item},
    Delta, PrimaryKey,
};

use crate::{
    auth::Actor,
    context::ServerContext,
    errors::ServerResult,
    schemas::{ItemSchema, ValidatedJson},
    Router,
};

#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    request_body = ItemSchema,
    responses(
        (status = 200, description = "The item was added"),
        (status = 400, description = "The item is not valid")
    )
)]
async fn post_item(
    context: ServerContext,
    actor: Actor,
    ValidatedJson(body): ValidatedJson<ItemSchema>,
) -> ServerResult<Json<Delta>> {
    let new = body.into();

    context
        .mutate(actor, move |m| Box::pin(add_item(m, new)))
        .await
}

#[utoipa::path(
    put,
    path = "/item/{id}",
    tag = "items",
    params(("id" = i64, Path, description = "Item id")),
    request_body = ItemSchema,
    responses(
        (status = 200, description = "The item was updated"),
        (status = 404, description = "No such item")
    )
)]
async fn put_item(
    context: ServerContext,
    actor: Actor,
    Path(id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<ItemSchema>,
) -> ServerResult<Json<Delta>> {
    let updated = body.into_update(id);

    context
        .mutate(actor, move |m| Box::pin(update_item(m, updated)))
        .await
}

#[utoipa::path(
    delete,
    path = "/item/{id}",
    tag = "items",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 200, description = "The item was removed"),
        (status = 404, description = "No such item"),
        (status = 409, description = "The item is the ticket or has been purchased")
    )
)]
async fn remove_item(
    context: ServerContext,
    actor: Actor,
    Path(id): Path<PrimaryKey>,
) -> ServerResult<Json<Delta>> {
    context
        .mutate(actor, move |m| Box::pin(delete_item(m, id)))
        .await
}

pub fn router() -> Router {
    Router::new()
        .route("/items", post(post_item))
        .route("/item/:id", put(put_item).delete(remove_item))
}
