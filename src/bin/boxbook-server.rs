// ABOUTME: Main entry point for the boxbook booking server
// ABOUTME: Loads configuration, opens the database, and runs the HTTP server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Boxbook server binary.

use anyhow::Result;
use boxbook::config::environment::ServerConfig;
use boxbook::database::Database;
use boxbook::server::{HttpServer, ServerResources};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "boxbook-server",
    about = "Class booking and attendance server",
    version
)]
struct Args {
    /// HTTP listen port (overrides HTTP_PORT)
    #[arg(long)]
    http_port: Option<u16>,

    /// SQLite database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    boxbook::logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    info!("starting boxbook-server: {}", config.summary());

    let database = Database::new(&config.database_url).await?;
    database.migrate().await?;

    let resources = Arc::new(ServerResources::new(database, config));
    HttpServer::new(resources).run().await
}
