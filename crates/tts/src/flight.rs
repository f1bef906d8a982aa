//! Coalescing of concurrent synthesis work for the same cache key

use std::{future::Future, sync::Arc};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};

use crate::error::{Result, TtsError};

type Pending = Shared<BoxFuture<'static, Result<()>>>;

/// At most one in-flight synthesis per cache key
///
/// The first caller for a key spawns the work as its own task; later
/// callers await the same outcome. The task removes its map entry when it
/// finishes, so the next miss for that key starts fresh. Because the work
/// is spawned, a disconnecting client does not abort it.
#[derive(Clone, Default)]
pub struct SingleFlight {
    in_flight: Arc<DashMap<String, Pending>>,
}

/// Removes a key from the in-flight map when the owning task ends,
/// including by panic
struct Landing {
    in_flight: Arc<DashMap<String, Pending>>,
    key: String,
}

impl Drop for Landing {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key`, or join the run already in progress
    ///
    /// `work` is dropped unpolled when joining an existing run.
    pub async fn run<F>(&self, key: &str, work: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let pending = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                tracing::debug!(cache_key = key, "joining in-flight synthesis");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let landing = Landing {
                    in_flight: Arc::clone(&self.in_flight),
                    key: key.to_string(),
                };

                // The spawned task cannot remove its entry before this
                // shard lock is released, so the insert below always wins
                let handle = tokio::spawn(async move {
                    let _landing = landing;
                    work.await
                });

                let pending = async move {
                    handle.await.unwrap_or_else(|e| {
                        tracing::error!("synthesis task failed: {e}");
                        Err(TtsError::InternalError(None))
                    })
                }
                .boxed()
                .shared();

                entry.insert(pending.clone());
                pending
            }
        };

        pending.await
    }

    /// Number of keys with synthesis in progress
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}
