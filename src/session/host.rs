use std::sync::{Arc, Mutex, PoisonError};

use super::SessionError;
use crate::cluster::Cluster;

/// What a session exposes to the calls it runs: the hosted cluster slot.
#[derive(Default)]
pub struct SessionHost {
    cluster: Mutex<Option<Arc<dyn Cluster>>>,
}

impl SessionHost {
    /// Installs `cluster`, returning the one it replaces.
    pub fn install(&self, cluster: Arc<dyn Cluster>) -> Option<Arc<dyn Cluster>> {
        self.slot().replace(cluster)
    }

    /// Returns the hosted cluster.
    pub fn cluster(&self) -> Result<Arc<dyn Cluster>, SessionError> {
        self.slot().clone().ok_or(SessionError::NoCluster)
    }

    /// Removes and returns the hosted cluster.
    pub fn take(&self) -> Option<Arc<dyn Cluster>> {
        self.slot().take()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn Cluster>>> {
        self.cluster.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
