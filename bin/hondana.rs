#[macro_use]
extern crate log;

use std::sync::Arc;

use clap::Parser;
use hondana::{
    domain::services::user::UserService,
    infrastructure::{
        config::Config,
        database,
        repositories::{
            book::BookRepositoryImpl, cover::CoverRepositoryImpl, user::UserRepositoryImpl,
        },
    },
    presentation::{session::SessionRegistry, ServerBuilder},
};

#[derive(Parser)]
struct Opts {
    /// Path to config file
    #[clap(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let mut log_builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("hondana=info"),
    );
    if std::env::var("RUST_LOG").is_err() {
        if let Ok(hondana_log) = std::env::var("HONDANA_LOG") {
            log_builder.parse_filters(&format!("hondana={hondana_log}"));
        }
    }
    log_builder.init();

    let opts: Opts = Opts::parse();
    let config = Config::open(opts.config)?;

    debug!("config: {:?}", config);

    let pool = database::establish_connection(&config.database_path, config.create_database)
        .await?;

    let user_repo = UserRepositoryImpl::new(pool.clone());
    let user_svc = UserService::new(user_repo.clone());

    let book_repo = BookRepositoryImpl::new(pool.clone());
    let cover_repo = CoverRepositoryImpl::new(config.cover_path.clone());

    let registry = Arc::new(SessionRegistry::new(
        book_repo,
        cover_repo.clone(),
        user_repo,
    ));

    let server_fut = ServerBuilder::new()
        .with_config(config.clone())
        .with_user_svc(user_svc)
        .with_registry(registry)
        .with_cover_repo(cover_repo)
        .build()?
        .serve(([0, 0, 0, 0], config.port));

    tokio::select! {
        res = server_fut => {
            if let Err(e) = res {
                error!("server quit: {e}");
            } else {
                info!("server shutdown");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl+c signal");
        }
    }

    info!("closing database...");
    pool.close().await;

    Ok(())
}
