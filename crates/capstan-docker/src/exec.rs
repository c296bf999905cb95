//! Exec operations.

use crate::{Docker, Request, Result, StreamConfig, StreamSession};
use serde_json::{json, Value};
use tracing::instrument;

impl Docker {
    /// Creates an exec instance in a running container. `config` uses
    /// caller-style keys (`cmd`, `attach-stdout`, `tty`, ...); the
    /// result carries the exec id under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 201.
    pub async fn create_exec(&self, container: &str, config: Value) -> Result<Value> {
        let req = Request::post(format!("/containers/{container}/exec")).json(config);
        let response = self.call(req, &[201]).await?;
        Ok(response.into_json()?)
    }

    /// Low-level details for one exec instance, including its running
    /// state and exit code.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn inspect_exec(&self, id: &str) -> Result<Value> {
        let response = self
            .call(Request::get(format!("/exec/{id}/json")), &[200])
            .await?;
        Ok(response.into_json()?)
    }

    /// Starts an exec instance interactively over a hijacked
    /// connection.
    ///
    /// Dials a fresh connection for the upgrade, so other requests on
    /// this client are unaffected.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon refuses the upgrade.
    #[instrument(skip(self))]
    pub async fn start_exec(
        &self,
        id: &str,
        streams: StreamConfig,
        tty: bool,
    ) -> Result<StreamSession> {
        let req = Request::post(format!("/exec/{id}/start"))
            .json(json!({"detach": false, "tty": tty}));
        self.upgrade(req, streams).await
    }

    /// Starts an exec instance detached; output goes to the container's
    /// log, not the caller.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn start_exec_detached(&self, id: &str) -> Result<()> {
        let req = Request::post(format!("/exec/{id}/start")).json(json!({"detach": true}));
        self.call(req, &[200]).await?;
        Ok(())
    }
}
