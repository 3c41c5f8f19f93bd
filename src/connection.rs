use std::sync::Arc;
use std::time::Duration;
use parking_lot::RwLock;
use serde_json::{json, Value};
use strum_macros::Display;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};
use crate::broker::{with_deadline, AdminHandle, BrokerClient, Connector, ProducerHandle};
use crate::config::ClientConfig;
use crate::error::{BrokerError, BrokerResult, Error, Result};
use crate::events::{EventBus, EventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Everything tied to one resolved client. The admin and producer handles are created
/// on first use and then shared; a reconnect builds a new session.
pub struct Session {
    client: Arc<dyn BrokerClient>,
    request_timeout: Duration,
    admin: OnceCell<Arc<dyn AdminHandle>>,
    producer: OnceCell<Arc<dyn ProducerHandle>>,
}

impl Session {
    fn new(client: Arc<dyn BrokerClient>, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
            admin: OnceCell::new(),
            producer: OnceCell::new(),
        }
    }

    pub fn client(&self) -> &Arc<dyn BrokerClient> {
        &self.client
    }

    pub async fn admin(&self) -> BrokerResult<Arc<dyn AdminHandle>> {
        let handle = self
            .admin
            .get_or_try_init(|| self.bounded(self.client.admin()))
            .await?;
        Ok(handle.clone())
    }

    pub async fn producer(&self) -> BrokerResult<Arc<dyn ProducerHandle>> {
        let handle = self
            .producer
            .get_or_try_init(|| self.bounded(self.client.producer()))
            .await?;
        Ok(handle.clone())
    }

    /// Runs one broker request under the configured request timeout.
    pub(crate) async fn bounded<T, F>(&self, fut: F) -> BrokerResult<T>
    where
        F: std::future::Future<Output = BrokerResult<T>>,
    {
        with_deadline(self.request_timeout, fut).await
    }
}

struct Slot {
    state: ConnectionState,
    session: Option<Arc<Session>>,
}

/// Owns the shared client session. Other components never hold the client
/// themselves; they ask for the current [`Session`] on every call.
pub struct ConnectionManager {
    config: Arc<ClientConfig>,
    connector: Arc<dyn Connector>,
    events: EventBus,
    connect_lock: Mutex<()>,
    slot: RwLock<Slot>,
}

impl ConnectionManager {
    pub fn new(config: Arc<ClientConfig>, connector: Arc<dyn Connector>, events: EventBus) -> Self {
        Self {
            config,
            connector,
            events,
            connect_lock: Mutex::new(()),
            slot: RwLock::new(Slot {
                state: ConnectionState::Disconnected,
                session: None,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.slot.read().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Resolves the client and synchronizes metadata once. Returns whether a live
    /// client is in place afterwards. A live session is kept as is, so repeated calls
    /// never create a second client.
    pub async fn connect(&self) -> bool {
        let _guard = self.connect_lock.lock().await;

        if self.has_live_session() {
            debug!(host = %self.config.host, "already connected, keeping client");
            return true;
        }

        self.slot.write().state = ConnectionState::Connecting;
        self.events
            .emit(EventKind::WaitResolve, json!({ "host": self.config.host }));

        let timeout = self.config.connection_timeout();
        let resolved = with_deadline(timeout, self.connector.connect(&self.config)).await;

        let client = match resolved {
            Ok(client) => client,
            Err(e) => {
                {
                    let mut slot = self.slot.write();
                    slot.state = ConnectionState::Failed;
                    slot.session = None;
                }
                self.events
                    .emit(EventKind::ConnectNotOk, Value::String(e.to_string()));
                return false;
            }
        };

        let session = Arc::new(Session::new(client.clone(), self.config.request_timeout()));
        {
            let mut slot = self.slot.write();
            slot.state = ConnectionState::Connected;
            slot.session = Some(session);
        }
        info!(node = %self.config.name, host = %self.config.host, "client resolved");
        self.events.emit(
            EventKind::ConnectOk,
            json!({ "name": self.config.name, "host": self.config.host }),
        );

        // a failed sync leaves the connection in place
        match with_deadline(self.config.request_timeout(), client.load_metadata()).await {
            Ok(()) => self.events.emit(EventKind::MetadataOk, Value::Null),
            Err(e) => self.report_sync_failure(e),
        }
        true
    }

    /// The current session, or `NoClient` when `connect` has not succeeded.
    pub fn session(&self) -> Result<Arc<Session>> {
        match &self.slot.read().session {
            Some(session) => Ok(session.clone()),
            None => {
                self.events.emit(EventKind::NoClient, Value::Null);
                Err(Error::NoClient)
            }
        }
    }

    fn has_live_session(&self) -> bool {
        self.slot
            .read()
            .session
            .as_ref()
            .is_some_and(|s| s.client.is_live())
    }

    fn report_sync_failure(&self, e: BrokerError) {
        self.events.emit(
            EventKind::Error,
            Value::String(format!("metadata sync failed: {}", e)),
        );
    }
}
