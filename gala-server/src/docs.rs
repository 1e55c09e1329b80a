use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::schemas::{
    AssignPurchasesSchema, GuestSchema, ItemSchema, NewGuestSchema, NewPurchaseSchema,
    PartySchema, PaymentSchema, PositionSchema, RepositionSchema, TablePositionSchema,
    TableSchema,
};

#[derive(OpenApi)]
#[openapi(
    info(
        description = "gala-server exposes the seating, guests, items and payments of a gala, and a live journal of every change to them"
    ),
    paths(
        crate::journal::all,
        crate::journal::journal,
        crate::live::live,
        crate::tables::put_table,
        crate::tables::reposition,
        crate::parties::put_party,
        crate::guests::post_guest,
        crate::guests::put_guest,
        crate::guests::remove_guest,
        crate::guests::post_guest_purchases,
        crate::items::post_item,
        crate::items::put_item,
        crate::items::remove_item,
        crate::purchases::post_purchase,
        crate::purchases::remove_purchase,
        crate::purchases::pick_up,
        crate::purchases::post_payment,
    ),
    components(schemas(
        PositionSchema,
        TableSchema,
        TablePositionSchema,
        RepositionSchema,
        PartySchema,
        NewGuestSchema,
        GuestSchema,
        AssignPurchasesSchema,
        ItemSchema,
        NewPurchaseSchema,
        PaymentSchema,
    ))
)]
pub struct ApiDoc;

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod test {
    use utoipa::OpenApi;

    use super::ApiDoc;

    #[test]
    fn every_route_is_documented() {
        let api = ApiDoc::openapi();

        for path in [
            "/all",
            "/journal",
            "/ws",
            "/table/{id}",
            "/table/reposition",
            "/party/{id}",
            "/guests",
            "/guest/{id}",
            "/guest/{id}/purchases",
            "/items",
            "/item/{id}",
            "/purchases",
            "/purchase/{id}",
            "/purchase/{id}/pickup",
            "/payments",
        ] {
            assert!(api.paths.paths.contains_key(path), "{path} is documented");
        }
    }
}
