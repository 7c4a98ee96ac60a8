//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::client::ResourceClient;
use crate::config::OperatorConfig;
use crate::error::{OperatorError, OperatorResult};
use crate::reconciler::OrderReconciler;
use crate::scheduler::Controller;
use crate::storage::{load_manifests, InMemoryStorage, Storage};
use std::sync::Arc;
use taco_fulfillment::{FulfillmentApi, MealMeClient};
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Taco operator: REST API plus the order controller
pub struct Server {
    config: OperatorConfig,
    storage: Arc<dyn Storage>,
    fulfillment: Arc<dyn FulfillmentApi>,
}

impl Server {
    /// Create a server backed by in-memory storage and the MealMe client
    pub fn new(config: OperatorConfig) -> OperatorResult<Self> {
        let fulfillment = Arc::new(MealMeClient::new(config.fulfillment.clone())?);
        let storage = Arc::new(InMemoryStorage::new());
        Ok(Self::with_parts(config, storage, fulfillment))
    }

    /// Create a server from explicit collaborators
    pub fn with_parts(
        config: OperatorConfig,
        storage: Arc<dyn Storage>,
        fulfillment: Arc<dyn FulfillmentApi>,
    ) -> Self {
        Self {
            config,
            storage,
            fulfillment,
        }
    }

    /// Run until Ctrl+C or SIGTERM
    pub async fn run(self) -> OperatorResult<()> {
        let listener = TcpListener::bind(self.config.server.listen_addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` completes, then drain the controller
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> OperatorResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if let Some(path) = &self.config.storage.manifests {
            load_manifests(path, self.storage.as_ref()).await?;
        }

        let reconciler = Arc::new(OrderReconciler::new(
            ResourceClient::new(self.storage.clone()),
            self.fulfillment.clone(),
        ));
        let controller = Controller::new(
            self.config.controller.clone(),
            self.storage.clone(),
            reconciler,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let controller_handle = tokio::spawn(controller.run(shutdown_rx));

        let app = create_router(
            AppState::new(self.storage.clone()),
            self.config.server.enable_cors,
        );

        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            fulfillment = %self.config.fulfillment.base_url,
            "Taco operator listening"
        );

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| OperatorError::Server(e.to_string()));

        tracing::info!("Taco operator shutting down");

        shutdown_tx.send_replace(true);
        if let Err(e) = controller_handle.await {
            tracing::error!(error = %e, "Controller task failed");
        }

        served
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
