mod api;
mod trace;

#[cfg(test)]
mod tests;

use anyhow::Context;
use libgivematch::prelude::*;
use rustls::crypto::aws_lc_rs;
use tokio::signal;

use crate::api::config::Config;

shadow_rs::shadow!(build);

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  aws_lc_rs::default_provider()
    .install_default()
    .map_err(|_| anyhow::anyhow!("could not install default cryptography provider"))?;

  let config = Config::from_env()?;
  let store = PostgrestStore::new(&config.store_url, &config.store_api_key, config.store_timeout)?;

  run(config, store).await
}

async fn run<S: Store>(config: Config, store: S) -> anyhow::Result<()> {
  let _guards = trace::init_tracing(&config, std::io::stdout());
  let app = api::routes(&config, store).await?;
  let listener = tokio::net::TcpListener::bind(&config.listen_addr).await.context("could not create listener")?;

  tracing::info!(givematch = build::PKG_VERSION, "listening on {}", listener.local_addr()?);

  axum::serve(listener, app).with_graceful_shutdown(shutdown()).await.context("could not start app")?;

  Ok(())
}

async fn shutdown() {
  let ctrl_c = async {
    if let Err(err) = signal::ctrl_c().await {
      tracing::error!(error = %err, "failed to install ^C handler");
      std::future::pending::<()>().await;
    }
  };

  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut signal) => {
        signal.recv().await;
      }

      Err(err) => {
        tracing::error!(error = %err, "failed to install terminate signal handler");
        std::future::pending::<()>().await;
      }
    }
  };

  tokio::select! {
      () = ctrl_c => tracing::info!("received ^C, initiating shutdown"),
      () = terminate => tracing::info!("received terminate signal, initiating shutdown"),
  }
}
