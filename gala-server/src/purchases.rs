use axum::{
    extract::Path,
    routing::{delete, post},
    Json,
};
use gala_collab::{
    ops::purchases::{add_purchase, delete_purchase, pick_up_purchase, record_payment},
    Delta, PrimaryKey,
};

use crate::{
    auth::Actor,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewPurchaseSchema, PaymentSchema, ValidatedJson},
    Router,
};

#[utoipa::path(
    post,
    path = "/purchases",
    tag = "purchases",
    request_body = NewPurchaseSchema,
    responses(
        (status = 200, description = "The purchase was recorded"),
        (status = 400, description = "No such guest or item"),
        (status = 409, description = "The guest has already pledged to this need")
    )
)]
async fn post_purchase(
    context: ServerContext,
    actor: Actor,
    ValidatedJson(body): ValidatedJson<NewPurchaseSchema>,
) -> ServerResult<Json<Delta>> {
    let new = body.into();

    context
        .mutate(actor, move |m| Box::pin(add_purchase(m, new)))
        .await
}

#[utoipa::path(
    delete,
    path = "/purchase/{id}",
    tag = "purchases",
    params(("id" = i64, Path, description = "Purchase id")),
    responses(
        (status = 200, description = "The purchase was removed"),
        (status = 404, description = "No such purchase"),
        (status = 409, description = "The purchase has been paid")
    )
)]
async fn remove_purchase(
    context: ServerContext,
    actor: Actor,
    Path(id): Path<PrimaryKey>,
) -> ServerResult<Json<Delta>> {
    context
        .mutate(actor, move |m| Box::pin(delete_purchase(m, id)))
        .await
}

#[utoipa::path(
    post,
    path = "/purchase/{id}/pickup",
    tag = "purchases",
    params(("id" = i64, Path, description = "Purchase id")),
    responses(
        (status = 200, description = "The purchase was handed over"),
        (status = 404, description = "No such purchase"),
        (status = 409, description = "The purchase is unpaid or already picked up")
    )
)]
async fn pick_up(
    context: ServerContext,
    actor: Actor,
    Path(id): Path<PrimaryKey>,
) -> ServerResult<Json<Delta>> {
    context
        .mutate(actor, move |m| Box::pin(pick_up_purchase(m, id)))
        .await
}

#[utoipa::path(
    post,
    path = "/payments",
    tag = "purchases",
    request_body = PaymentSchema,
    responses(
        (status = 200, description = "The purchases were marked paid"),
        (status = 400, description = "The payment doesn't match what is owed"),
        (status = 409, description = "One of the purchases has already been paid")
    )
)]
async fn post_payment(
    context: ServerContext,
    actor: Actor,
    ValidatedJson(body): ValidatedJson<PaymentSchema>,
) -> ServerResult<Json<Delta>> {
    let payment = body.into();

    context
        .mutate(actor, move |m| Box::pin(record_payment(m, payment)))
        .await
}

pub fn router() -> Router {
    Router::new()
        .route("/purchases", post(post_purchase))
        .route("/purchase/:id", delete(remove_purchase))
        .route("/purchase/:id/pickup", post(pick_up))
        .route("/payments", post(post_payment))
}
