use std::net::TcpListener;
use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server, web};
use alerts::push::SubscriberStore;
use alerts::rate_limit::RateLimiter;
use alerts_config::shared::PgConnectionConfig;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;
use tracing_actix_web::TracingLogger;
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::db::subscribers::PostgresSubscriberStore;
use crate::rate_limiting::RateLimiting;
use crate::routes::{
    ErrorMessage,
    health_check::health_check,
    subscribers::{
        ReadSubscriberResponse, UpsertSubscriberRequest, delete_subscriber, read_subscriber,
        upsert_subscriber,
    },
};

/// Alerts API application server wrapper.
pub struct Application {
    port: u16,
    server: Server,
    limiter: Arc<RateLimiter>,
}

impl Application {
    /// Builds the server with a Postgres-backed subscriber store.
    pub async fn build(config: ApiConfig) -> anyhow::Result<Self> {
        config.database.tls.validate()?;

        let connection_pool = get_connection_pool(&config.database);
        let store: Arc<dyn SubscriberStore> =
            Arc::new(PostgresSubscriberStore::new(connection_pool));

        Self::build_with_store(config, store).await
    }

    /// Builds the server with an explicit subscriber store.
    pub async fn build_with_store(
        config: ApiConfig,
        store: Arc<dyn SubscriberStore>,
    ) -> anyhow::Result<Self> {
        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let limiter = Arc::new(RateLimiter::new(config.rate_limit)?);
        limiter.init();

        let server = run(listener, store, limiter.clone()).await?;

        info!(port, "alerts api listening");

        Ok(Self {
            port,
            server,
            limiter,
        })
    }

    /// Applies all pending migrations from the migrations directory.
    pub async fn migrate_database(config: PgConnectionConfig) -> anyhow::Result<()> {
        config.tls.validate()?;

        let connection_pool = get_connection_pool(&config);

        sqlx::migrate!("./migrations").run(&connection_pool).await?;

        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Runs the server until it receives a shutdown signal, then stops the limiter sweep.
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        let result = self.server.await;
        self.limiter.shutdown().await;

        result
    }
}

/// Creates a lazily connecting Postgres pool.
pub fn get_connection_pool(config: &PgConnectionConfig) -> PgPool {
    PgPoolOptions::new().connect_lazy_with(config.connect_options())
}

/// Creates the HTTP server with all routes and middleware.
///
/// Every `/v1` route is throttled by `limiter`; the health check is not.
pub async fn run(
    listener: TcpListener,
    store: Arc<dyn SubscriberStore>,
    limiter: Arc<RateLimiter>,
) -> Result<Server, anyhow::Error> {
    let store: web::Data<dyn SubscriberStore> = store.into();

    #[derive(OpenApi)]
    #[openapi(
        paths(
            crate::routes::health_check::health_check,
            crate::routes::subscribers::upsert_subscriber,
            crate::routes::subscribers::read_subscriber,
            crate::routes::subscribers::delete_subscriber,
        ),
        components(schemas(ErrorMessage, UpsertSubscriberRequest, ReadSubscriberResponse))
    )]
    struct ApiDoc;

    let openapi = web::Data::new(ApiDoc::openapi());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .service(health_check)
            .route(
                "/api-docs/openapi.json",
                web::get().to(|openapi: web::Data<utoipa::openapi::OpenApi>| async move {
                    web::Json(openapi.get_ref().clone())
                }),
            )
            .service(
                web::scope("v1")
                    .wrap(RateLimiting::new(limiter.clone()))
                    .service(upsert_subscriber)
                    .service(read_subscriber)
                    .service(delete_subscriber),
            )
            .app_data(store.clone())
            .app_data(openapi.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
