use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};

use todoforge::auth::{AuthMiddleware, TokenBlacklist};
use todoforge::config::Config;
use todoforge::routes;
use todoforge::store::{self, TodoStore, UserStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    // The initial store connection is the one fatal condition: without it the
    // process exits non-zero instead of serving.
    let pool = match store::connect(&config.database_url).await {
        Ok(pool) => pool,
        Err(err) => {
            log::error!("failed to connect to database: {}", err);
            std::process::exit(1);
        }
    };

    let user_store = UserStore::new(pool.clone());
    if let Err(err) = user_store.seed_admin().await {
        log::warn!("admin seeding failed: {}", err);
    }

    let todo_store = web::Data::new(TodoStore::new(pool.clone()));
    let user_store = web::Data::new(user_store);
    let blacklist = web::Data::new(TokenBlacklist::new());

    log::info!("starting server at {}", config.server_url());

    HttpServer::new(move || {
        App::new()
            .app_data(todo_store.clone())
            .app_data(user_store.clone())
            .app_data(blacklist.clone())
            .wrap(AuthMiddleware)
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(routes::health::health)
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await?;

    // Actix has already drained in-flight requests by the time run() returns;
    // close the store connection last.
    pool.close().await;
    Ok(())
}
