use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use api::routes::build_router;
use api::sessions::{CLEANUP_PERIOD, open_store, sweep_expired_every};
use api::state::AppState;
use common::{init_logging, settings::Settings};
use repos::Repo;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    #[arg(short = 'C', long, default_value = "config")]
    config_dir: String,
}

struct AttendanceApp {
    settings: Arc<Settings>,
}

impl AttendanceApp {
    fn new(config_dir: &str) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            settings: Arc::new(Settings::with_config_dir(config_dir)?),
        })
    }

    async fn run(&self) -> Result<(), Box<dyn Error>> {
        let db = self.init_db().await?;
        let repo = Repo::new(db.clone());

        let session_store = open_store(db.clone()).await?;
        tokio::spawn(sweep_expired_every(session_store.clone(), CLEANUP_PERIOD));

        let state = AppState::new(repo, self.settings.clone());
        let app = build_router(state, session_store);

        let server = &self.settings.server;
        let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;

        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        if let Some((public_key, private_key)) = server.tls_pem() {
            let config = RustlsConfig::from_pem(
                public_key.as_bytes().to_vec(),
                private_key.as_bytes().to_vec(),
            )
            .await?;

            info!("Starting server on https://{}", addr);
            axum_server::bind_rustls(addr, config)
                .serve(app.into_make_service())
                .await?;
        } else {
            info!("Starting server on http://{}", addr);
            axum_server::bind(addr)
                .serve(app.into_make_service())
                .await?;
        }

        Ok(())
    }

    async fn init_db(&self) -> Result<PgPool, Box<dyn Error>> {
        let database = &self.settings.database;
        let mut opts: PgConnectOptions = database.uri.parse()?;
        opts = opts.log_statements(log::LevelFilter::Debug);

        let pool = PgPoolOptions::new()
            .max_connections(database.max_connections)
            .connect_with(opts)
            .await?;

        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("Database migrations applied");
        Ok(pool)
    }
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let app = match AttendanceApp::new(&args.config_dir) {
        Ok(app) => app,
        Err(err) => {
            eprintln!("Failed to load settings from {}: {}", args.config_dir, err);
            std::process::exit(1);
        }
    };

    let _guard = match init_logging(&app.settings.logger) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Failed to initialise logging: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = app.run().await {
        error!("Server terminated: {}", err);
        std::process::exit(1);
    }
}
