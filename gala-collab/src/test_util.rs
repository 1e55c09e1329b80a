use gala_core::Config;

use crate::{db, Gala};

/// A gala backed by a fresh in-memory database
pub(crate) async fn gala() -> Gala {
    let pool = db::connect("sqlite::memory:")
        .await
        .expect("in-memory database opens");

    Gala::new(pool, Config::default())
}
