//! Session factory and registry for one database endpoint.
//!
//! A [`Cluster`] owns a lazily started master session plus any number of
//! extra sessions made with [`Cluster::new_session`]. Every method takes
//! `&self`; share the cluster behind an `Arc` across tasks and threads.
//!
//! Once [`Cluster::close`] runs, the cluster is terminal. A `new_session`
//! racing with `close` either registers its session before the close drains
//! the registry (and the close stops it) or sees the closed flag and stops
//! the session itself. `connect` starts the master under the master lock,
//! which `close` takes first. No running session is ever left unregistered.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::config::Configuration;
use crate::error::{DriverError, Result};
use crate::session::Session;

#[derive(Default)]
struct Registry {
    sessions: Vec<Arc<Session>>,
    closed: bool,
}

pub struct Cluster {
    host: String,
    port: u16,
    config: Arc<Configuration>,
    master: Mutex<Option<Arc<Session>>>,
    registry: Mutex<Registry>,
}

impl Cluster {
    /// A cluster for `host:port`. No connection is made until [`connect`](Self::connect).
    pub fn new(host: impl Into<String>, port: u16, config: Configuration) -> Result<Self> {
        config.validate()?;
        let host = host.into();
        let config = Arc::new(config);
        let master = Session::new(host.clone(), port, Arc::clone(&config));
        Ok(Self {
            host,
            port,
            config,
            master: Mutex::new(Some(Arc::new(master))),
            registry: Mutex::new(Registry::default()),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn config(&self) -> &Arc<Configuration> {
        &self.config
    }

    /// Start the master session (no-op if running) and return it.
    ///
    /// The master lock is held across the start, so a concurrent
    /// [`close`](Self::close) either finds the master already running and
    /// stops it, or finds it gone and `connect` fails.
    pub fn connect(&self) -> Result<Arc<Session>> {
        let slot = self.master.lock().unwrap_or_else(|e| e.into_inner());
        let master = slot.as_ref().ok_or(DriverError::ClusterClosed)?;
        if !master.is_running() {
            master.start()?;
            info!("Connected to {}:{}", self.host, self.port);
        }
        Ok(Arc::clone(master))
    }

    /// Create, start and register an extra session.
    pub fn new_session(&self) -> Result<Arc<Session>> {
        let session = Arc::new(Session::new(self.host.clone(), self.port, Arc::clone(&self.config)));
        session.start()?;

        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        if registry.closed {
            drop(registry);
            session.close();
            return Err(DriverError::ClusterClosed);
        }
        registry.sessions.push(Arc::clone(&session));
        debug!("Registered session #{} for {}:{}", registry.sessions.len(), self.host, self.port);
        Ok(session)
    }

    /// Stop `session` and remove it from the registry.
    ///
    /// Returns whether the session was registered here. The session is
    /// stopped either way.
    pub fn close_session(&self, session: &Arc<Session>) -> bool {
        session.close();
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let before = registry.sessions.len();
        registry.sessions.retain(|s| !Arc::ptr_eq(s, session));
        registry.sessions.len() != before
    }

    /// Snapshot of the registered sessions, in creation order.
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sessions
            .clone()
    }

    pub fn is_closed(&self) -> bool {
        self.registry.lock().unwrap_or_else(|e| e.into_inner()).closed
    }

    /// Stop the master and every registered session, then clear the
    /// registry. Terminal; later `connect` and `new_session` calls fail with
    /// [`DriverError::ClusterClosed`].
    pub fn close(&self) {
        let master = self.master.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(master) = master {
            master.close();
        }

        let drained = {
            let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry.closed = true;
            std::mem::take(&mut registry.sessions)
        };
        let count = drained.len();
        for session in drained {
            session.close();
        }
        info!("Cluster {}:{} closed ({} sessions)", self.host, self.port, count);
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> Cluster {
        let config = Configuration::default()
            .with_io_threads(1)
            .with_pool_size(2)
            .with_max_route(1);
        Cluster::new("127.0.0.1", 4242, config).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = Configuration::default().with_max_route(0);
        assert!(matches!(
            Cluster::new("127.0.0.1", 4242, config),
            Err(DriverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn connect_is_idempotent() {
        let cluster = cluster();
        let a = cluster.connect().unwrap();
        let b = cluster.connect().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.is_running());
        // The master is not part of the registry.
        assert!(cluster.sessions().is_empty());
    }

    #[test]
    fn close_session_deregisters() {
        let cluster = cluster();
        let s1 = cluster.new_session().unwrap();
        let s2 = cluster.new_session().unwrap();
        assert_eq!(cluster.sessions().len(), 2);

        assert!(cluster.close_session(&s1));
        assert!(!s1.is_running());
        assert!(s2.is_running());
        let left = cluster.sessions();
        assert_eq!(left.len(), 1);
        assert!(Arc::ptr_eq(&left[0], &s2));

        // Second close is a no-op on the registry.
        assert!(!cluster.close_session(&s1));
    }

    #[test]
    fn close_is_terminal() {
        let cluster = cluster();
        let master = cluster.connect().unwrap();
        let session = cluster.new_session().unwrap();
        cluster.close();

        assert!(cluster.is_closed());
        assert!(cluster.sessions().is_empty());
        assert!(!master.is_running());
        assert!(!session.is_running());
        assert!(matches!(cluster.connect(), Err(DriverError::ClusterClosed)));
        assert!(matches!(cluster.new_session(), Err(DriverError::ClusterClosed)));

        // Closing twice tolerates the empty registry.
        cluster.close();
    }
}
