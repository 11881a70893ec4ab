//! Assembly of one listening server instance.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use deploy_config::{Config, resolve_server_root};

use crate::deployer::Deployer;
use crate::dispatch::Dispatcher;
use crate::lifecycle::{LifecycleMonitor, LifecycleSettings, ServerState, ShutdownReason};
use crate::process::{LaunchError, PROCESS_TARGET};
use crate::session::{SessionContext, SessionHandler};
use crate::transport::SocketListener;

/// A bound listener plus the shared state its sessions use.
pub struct Server {
    listener: SocketListener,
    state: Arc<ServerState>,
    context: Arc<SessionContext>,
}

impl Server {
    /// Binds the loopback port and identity described by `config`.
    ///
    /// # Errors
    ///
    /// Fails when the identity cannot be resolved or the port is taken.
    pub fn bind(config: &Config, deployer: Arc<dyn Deployer>) -> Result<Self, LaunchError> {
        let identity = resolve_server_root(config)?;
        Self::bind_at(
            config.listen_addr(),
            identity.into_string(),
            deployer,
            LifecycleSettings::from_config(config),
        )
    }

    /// Binds `addr` with explicit identity and timing.
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be bound.
    pub fn bind_at(
        addr: SocketAddr,
        identity: String,
        deployer: Arc<dyn Deployer>,
        settings: LifecycleSettings,
    ) -> Result<Self, LaunchError> {
        let listener = SocketListener::bind(addr)?;
        let state = Arc::new(ServerState::new(&settings));
        let context = Arc::new(SessionContext {
            state: Arc::clone(&state),
            dispatcher: Dispatcher::new(Arc::clone(&state)),
            deployer,
            identity,
            settings,
        });
        Ok(Self {
            listener,
            state,
            context,
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Identity announced in every session preamble.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.context.identity
    }

    /// Shared runtime state, for stop requests from outside a session.
    #[must_use]
    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Accepts sessions until the lifecycle monitor decides to stop.
    ///
    /// # Errors
    ///
    /// Fails when the accept thread cannot start or panics.
    pub fn run(self) -> Result<ShutdownReason, LaunchError> {
        let Self {
            listener,
            state,
            context,
        } = self;
        let addr = listener.local_addr();
        let poll_interval = context.settings.poll_interval;
        let handle = listener.start(Arc::new(SessionHandler::new(Arc::clone(&context))))?;
        info!(
            target: PROCESS_TARGET,
            %addr,
            identity = %context.identity,
            "deployment server listening"
        );

        let reason = LifecycleMonitor::new(state, poll_interval).run();
        handle.shutdown();
        handle.join()?;
        Ok(reason)
    }
}
