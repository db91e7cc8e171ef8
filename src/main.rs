use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use tracing::info;

use stags::{
  app::{
    auth::HttpAuthBridge,
    database::{pg_store::run_migrations, DocumentStore, MemoryStore, PgStore},
    server::{self, AppState},
    session::SessionCodec,
  },
  cli::{run_cli, Cli},
  config::Config,
  trace_dbg,
  utils::{initialize_logging, initialize_panic_handler},
};

async fn tokio_main() -> Result<()> {
  initialize_panic_handler()?;
  let args = Cli::parse();
  let config = Config::new(args.config.as_deref())?;
  initialize_logging()?;
  trace_dbg!(&config.listen);

  let database_url =
    || config.database_url.as_deref().ok_or_else(|| eyre!("database_url is not configured"));

  if args.migrate {
    run_migrations(database_url()?).await?;
    println!("migrations applied");
    return Ok(());
  }

  let store: Arc<dyn DocumentStore> = if args.memory {
    info!("using the in-memory store");
    Arc::new(MemoryStore::new())
  } else {
    Arc::new(PgStore::connect(database_url()?, config.pool_size).await?)
  };

  if let Some(output) = run_cli(&args, store.as_ref()).await? {
    println!("{}", output);
    return Ok(());
  }

  let auth = HttpAuthBridge::new(
    &config.auth.server_url,
    &config.auth.api_key,
    config.auth.ca_cert.as_deref(),
  )?;
  let sessions = SessionCodec::from_secret(config.session.secret.as_deref())?;
  let state = AppState::new(store, Arc::new(auth), sessions, &config.session.cookie_name);
  server::serve(state, config.listen_addr(args.port)?).await?;
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  if let Err(e) = tokio_main().await {
    eprintln!("{} error: Something went wrong", env!("CARGO_PKG_NAME"));
    Err(e)
  } else {
    Ok(())
  }
}
