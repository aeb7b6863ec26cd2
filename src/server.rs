// ABOUTME: Shared server resources and HTTP server assembly
// ABOUTME: Builds the axum router with middleware and runs the serve loop
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Server assembly.

use crate::config::environment::ServerConfig;
use crate::database::Database;
use crate::notifications::{LogNotifier, Notifier};
use crate::routes::{
    attendance::AttendanceRoutes, bookings::BookingRoutes, health::HealthRoutes,
    members::MemberRoutes, slots::SlotRoutes, templates::TemplateRoutes,
};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared resources injected into every route handler
pub struct ServerResources {
    /// Database manager with the shared pool
    pub database: Arc<Database>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Notification sink for booking lifecycle events
    pub notifier: Arc<dyn Notifier>,
}

impl ServerResources {
    /// Create server resources with the default log-only notifier
    #[must_use]
    pub fn new(database: Database, config: ServerConfig) -> Self {
        Self {
            database: Arc::new(database),
            config: Arc::new(config),
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Replace the notification sink
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

/// The HTTP server
pub struct HttpServer {
    resources: Arc<ServerResources>,
}

impl HttpServer {
    /// Create a server around shared resources
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Assemble the full application router
    #[must_use]
    pub fn router(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .merge(HealthRoutes::routes())
            .merge(SlotRoutes::routes(resources.clone()))
            .merge(MemberRoutes::routes(resources.clone()))
            .merge(BookingRoutes::routes(resources.clone()))
            .merge(AttendanceRoutes::routes(resources.clone()))
            .merge(TemplateRoutes::routes(resources))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(30)))
            .layer(CorsLayer::permissive())
    }

    /// Bind and serve until shutdown
    ///
    /// # Errors
    ///
    /// Returns an error if the listen socket cannot be bound.
    pub async fn run(self) -> Result<()> {
        let port = self.resources.config.http_port;
        let app = Self::router(self.resources);
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
        info!("listening on port {port}");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install shutdown handler: {e}");
    }
    info!("shutdown signal received");
}
