use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use tracing::info;

use toolshare::config::Settings;
use toolshare::db::{init_pool, run_migrations, DieselStore};
use toolshare::handlers::{self, AppState};
use toolshare::services::{system_clock, Services};
use toolshare::store::Store;
use toolshare::telemetry;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let settings = Settings::load().map_err(io::Error::other)?;
    telemetry::init(&settings.log);

    let pool = init_pool(&settings.database).map_err(io::Error::other)?;
    run_migrations(&pool).map_err(io::Error::other)?;

    let store: Arc<dyn Store> = Arc::new(DieselStore::new(pool));
    let services = Services::new(store, system_clock(), &settings);
    let state = web::Data::new(AppState::new(services));

    let (host, port) = settings.bind_address();
    info!(%host, port, "starting HTTP server");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
