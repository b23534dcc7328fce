// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use the_taskwood::config::{load_config, Config};
use the_taskwood::engine::Scheduler;
use the_taskwood::observability::init_tracing;
use the_taskwood::transport::ConnectionManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [config.yaml]", args[0]);
        std::process::exit(1);
    }

    let config = match args.get(1) {
        Some(path) => load_config(path).with_context(|| format!("loading {path}"))?,
        None => Config::default(),
    };
    init_tracing(&config.logging);

    let shutdown = CancellationToken::new();
    let (scheduler, scheduler_task) =
        Scheduler::start_with_shutdown(config.dispatch.options(), shutdown.clone());

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    let manager = ConnectionManager::new(scheduler);

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
        }
        signal_shutdown.cancel();
    });

    manager.serve(listener, shutdown.clone()).await?;
    shutdown.cancel();
    scheduler_task.await?;
    Ok(())
}
