use axum::{
    extract::Path,
    routing::{post, put},
    Json,
};
use gala_collab::{
    ops::guests::{add_guest, assign_purchases, delete_guest, update_guest},
    Delta, PrimaryKey,
};

use crate::{
    auth::Actor,
    context::ServerContext,
    errors::ServerResult,
    schemas::{AssignPurchasesSchema, GuestSchema, NewGuestSchema, ValidatedJson},
    Router,
};

#[utoipa::path(
    post,
    path = "/guests",
    tag = "guests",
    request_body = NewGuestSchema,
    responses(
        (status = 200, description = "The guest was registered with their ticket"),
        (status = 400, description = "The guest's details or billing are not allowed")
    )
)]
async fn post_guest(
    context: ServerContext,
    actor: Actor,
    ValidatedJson(body): ValidatedJson<NewGuestSchema>,
) -> ServerResult<Json<Delta>> {
    let new = body.into();

    context
        .mutate(actor, move |m| Box::pin(add_guest(m, new)))
        .await
}

#[utoipa::path(
    put,
    path = "/guest/{id}",
    tag = "guests",
    params(("id" = i64, Path, description = "Guest id")),
    request_body = GuestSchema,
    responses(
        (status = 200, description = "The guest was updated"),
        (status = 400, description = "The guest's details or billing are not allowed"),
        (status = 404, description = "No such guest")
    )
)]
async fn put_guest(
    context: ServerContext,
    actor: Actor,
    Path(id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<GuestSchema>,
) -> ServerResult<Json<Delta>> {
    let updated = body.into_update(id);

    context
        .mutate(actor, move |m| Box::pin(update_guest(m, updated)))
        .await
}

#[utoipa::path(
    delete,
    path = "/guest/{id}",
    tag = "guests",
    params(("id" = i64, Path, description = "Guest id")),
    responses(
        (status = 200, description = "The guest was removed"),
        (status = 404, description = "No such guest"),
        (status = 409, description = "The guest has purchases")
    )
)]
async fn remove_guest(
    context: ServerContext,
    actor: Actor,
    Path(id): Path<PrimaryKey>,
) -> ServerResult<Json<Delta>> {
    context
        .mutate(actor, move |m| Box::pin(delete_guest(m, id)))
        .await
}

#[utoipa::path(
    post,
    path = "/guest/{id}/purchases",
    tag = "guests",
    params(("id" = i64, Path, description = "Id of the guest who will pay")),
    request_body = AssignPurchasesSchema,
    responses(
        (status = 200, description = "The purchases are billed to the guest"),
        (status = 404, description = "No such guest"),
        (status = 409, description = "One of the purchases has been paid")
    )
)]
async fn post_guest_purchases(
    context: ServerContext,
    actor: Actor,
    Path(id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<AssignPurchasesSchema>,
) -> ServerResult<Json<Delta>> {
    context
        .mutate(actor, move |m| {
            Box::pin(assign_purchases(m, id, body.purchases))
        })
        .await
}

pub fn router() -> Router {
    Router::new()
        .route("/guests", post(post_guest))
        .route("/guest/:id", put(put_guest).delete(remove_guest))
        .route("/guest/:id/purchases", post(post_guest_purchases))
}
