//! HTTP-client-shaped dispatchers backed by a [`FileStore`].
//!
//! [`ReplayClient`] only ever reads records. [`RecordingClient`] reads records
//! and, on any load failure, asks the real client and stores what it returns.
//! Neither keeps state between calls beyond the files themselves, so
//! concurrent first-time requests for the same key may both reach the real
//! client; the last write wins.

use crate::config::AppConfig;
use crate::errors::{TapedeckError, TransportError};
use crate::logging::JsonlLogger;
use crate::runtime::{FileSystem, HttpClient};
use crate::store::FileStore;
use crate::types::{DispatchMode, Request, Response};
use std::sync::Arc;

pub struct ReplayClient {
    store: FileStore,
    logger: Option<JsonlLogger>,
}

impl ReplayClient {
    pub fn new(store: FileStore) -> Self {
        Self {
            store,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: JsonlLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }
}

impl HttpClient for ReplayClient {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        match self.store.load(request) {
            Ok(response) => {
                log(&self.logger, "info", "replay_hit", request, None);
                Ok(response)
            }
            Err(err) => {
                let message = format!(
                    "no usable record at {}: {err}",
                    self.store.path_for(request).display()
                );
                log(&self.logger, "warn", "replay_miss", request, Some(&message));
                Err(TransportError::new(request, message))
            }
        }
    }
}

pub struct RecordingClient {
    store: FileStore,
    real: Arc<dyn HttpClient>,
    logger: Option<JsonlLogger>,
}

impl RecordingClient {
    pub fn new(store: FileStore, real: Arc<dyn HttpClient>) -> Self {
        Self {
            store,
            real,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: JsonlLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }
}

impl HttpClient for RecordingClient {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        // Missing, unreadable and malformed records all fall through to a
        // fresh fetch, which overwrites whatever was there.
        if let Ok(response) = self.store.load(request) {
            log(&self.logger, "info", "record_hit", request, None);
            return Ok(response);
        }

        let response = self.real.execute(request).inspect_err(|err| {
            log(
                &self.logger,
                "error",
                "record_fetch_failed",
                request,
                Some(&err.message),
            );
        })?;

        match self.store.save(request, &response) {
            Ok(_) => log(&self.logger, "info", "record_fetch", request, None),
            Err(err) => log(
                &self.logger,
                "warn",
                "record_save_failed",
                request,
                Some(&err.to_string()),
            ),
        }
        Ok(response)
    }
}

fn log(
    logger: &Option<JsonlLogger>,
    level: &str,
    event_type: &str,
    request: &Request,
    detail: Option<&str>,
) {
    if let Some(logger) = logger {
        logger.dispatch_event(level, event_type, request, detail);
    }
}

/// Either dispatcher variant, chosen from configuration.
pub enum Dispatcher {
    Replay(ReplayClient),
    Record(RecordingClient),
}

impl Dispatcher {
    /// Record mode needs `real`; replay mode ignores it.
    pub fn from_config(
        cfg: &AppConfig,
        fs: Arc<dyn FileSystem>,
        real: Option<Arc<dyn HttpClient>>,
    ) -> Result<Self, TapedeckError> {
        let store = FileStore::new(cfg.store.root.clone(), fs);
        let logger = cfg.logger();
        let dispatcher = match cfg.dispatch.mode {
            DispatchMode::Replay => {
                let client = ReplayClient::new(store);
                Dispatcher::Replay(match logger {
                    Some(logger) => client.with_logger(logger),
                    None => client,
                })
            }
            DispatchMode::Record => {
                let real = real.ok_or_else(|| {
                    TapedeckError::InvalidConfig(format!(
                        "dispatch.mode = {:?} requires a real http client",
                        DispatchMode::Record.as_str()
                    ))
                })?;
                let client = RecordingClient::new(store, real);
                Dispatcher::Record(match logger {
                    Some(logger) => client.with_logger(logger),
                    None => client,
                })
            }
        };
        Ok(dispatcher)
    }

    pub fn mode(&self) -> DispatchMode {
        match self {
            Dispatcher::Replay(_) => DispatchMode::Replay,
            Dispatcher::Record(_) => DispatchMode::Record,
        }
    }

    pub fn store(&self) -> &FileStore {
        match self {
            Dispatcher::Replay(client) => client.store(),
            Dispatcher::Record(client) => client.store(),
        }
    }
}

impl HttpClient for Dispatcher {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        match self {
            Dispatcher::Replay(client) => client.execute(request),
            Dispatcher::Record(client) => client.execute(request),
        }
    }
}
