//! Container operations.

use crate::{Docker, Request, Result, StreamConfig, StreamSession};
use capstan_http::HttpError;
use serde_json::Value;
use tokio::io::AsyncRead;
use tracing::instrument;

/// Outcome of a start request, derived from the response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// 204: the container was started.
    Started,
    /// 304: the container was already running.
    AlreadyStarted,
}

/// Outcome of a stop request, derived from the response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// 204: the container was stopped.
    Stopped,
    /// 304: the container was not running.
    AlreadyStopped,
}

/// Header carrying archive metadata on `HEAD /containers/{id}/archive`.
const PATH_STAT_HEADER: &str = "x-docker-container-path-stat";

impl Docker {
    /// Creates a container from `config` (caller-style keys, e.g.
    /// `image`, `host-config`, `exposed-ports`).
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 201.
    pub async fn create_container(&self, name: Option<&str>, config: Value) -> Result<Value> {
        let mut req = Request::post("/containers/create").json(config);
        if let Some(name) = name {
            req = req.query("name", name);
        }
        let response = self.call(req, &[201]).await?;
        Ok(response.into_json()?)
    }

    /// Lists containers; `all` includes stopped ones.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn list_containers(&self, all: bool) -> Result<Value> {
        let req = Request::get("/containers/json").query("all", all);
        let response = self.call(req, &[200]).await?;
        Ok(response.into_json()?)
    }

    /// Low-level details for one container.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn inspect_container(&self, id: &str) -> Result<Value> {
        let response = self
            .call(Request::get(format!("/containers/{id}/json")), &[200])
            .await?;
        Ok(response.into_json()?)
    }

    /// Starts a container.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 204 or 304.
    pub async fn start_container(&self, id: &str) -> Result<StartOutcome> {
        let response = self
            .call(Request::post(format!("/containers/{id}/start")), &[204, 304])
            .await?;
        Ok(if response.status == 304 {
            StartOutcome::AlreadyStarted
        } else {
            StartOutcome::Started
        })
    }

    /// Stops a container, waiting up to `timeout` seconds before the
    /// daemon kills it.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 204 or 304.
    pub async fn stop_container(&self, id: &str, timeout: Option<i64>) -> Result<StopOutcome> {
        let mut req = Request::post(format!("/containers/{id}/stop"));
        if let Some(timeout) = timeout {
            req = req.query("t", timeout);
        }
        let response = self.call(req, &[204, 304]).await?;
        Ok(if response.status == 304 {
            StopOutcome::AlreadyStopped
        } else {
            StopOutcome::Stopped
        })
    }

    /// Sends a signal (default `SIGKILL`) to a container.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 204.
    pub async fn kill_container(&self, id: &str, signal: Option<&str>) -> Result<()> {
        let mut req = Request::post(format!("/containers/{id}/kill"));
        if let Some(signal) = signal {
            req = req.query("signal", signal);
        }
        self.call(req, &[204]).await?;
        Ok(())
    }

    /// Restarts a container.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 204.
    pub async fn restart_container(&self, id: &str, timeout: Option<i64>) -> Result<()> {
        let mut req = Request::post(format!("/containers/{id}/restart"));
        if let Some(timeout) = timeout {
            req = req.query("t", timeout);
        }
        self.call(req, &[204]).await?;
        Ok(())
    }

    /// Blocks until a container exits; the result carries the exit
    /// status under `status-code`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn wait_container(&self, id: &str) -> Result<Value> {
        let response = self
            .call(Request::post(format!("/containers/{id}/wait")), &[200])
            .await?;
        Ok(response.into_json()?)
    }

    /// Removes a container; `volumes` also removes its anonymous
    /// volumes.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 204.
    pub async fn remove_container(&self, id: &str, force: bool, volumes: bool) -> Result<()> {
        let req = Request::delete(format!("/containers/{id}"))
            .query("force", force)
            .query("v", volumes);
        self.call(req, &[204]).await?;
        Ok(())
    }

    /// Deletes stopped containers.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn prune_containers(&self) -> Result<Value> {
        let response = self.call(Request::post("/containers/prune"), &[200]).await?;
        Ok(response.into_json()?)
    }

    /// Filesystem changes since the container was created.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn container_changes(&self, id: &str) -> Result<Value> {
        let response = self
            .call(Request::get(format!("/containers/{id}/changes")), &[200])
            .await?;
        Ok(response.into_json()?)
    }

    /// Fetches a path from the container's filesystem as a tar archive.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn container_archive(&self, id: &str, path: &str) -> Result<Vec<u8>> {
        let req = Request::get(format!("/containers/{id}/archive")).query("path", path);
        let response = self.call(req, &[200]).await?;
        Ok(response.into_bytes()?)
    }

    /// Stat for a path inside the container, without the archive body.
    ///
    /// Returns the raw `x-docker-container-path-stat` header value
    /// (base64-encoded JSON, decoded by the caller if needed).
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200 with the stat
    /// header.
    pub async fn container_archive_info(&self, id: &str, path: &str) -> Result<String> {
        let req = Request::head(format!("/containers/{id}/archive")).query("path", path);
        let response = self.call(req, &[200]).await?;
        response
            .header(PATH_STAT_HEADER)
            .map(str::to_string)
            .ok_or_else(|| {
                HttpError::protocol(format!("missing {PATH_STAT_HEADER} header")).into()
            })
    }

    /// Extracts a tar archive into the container at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn extract_to_container(&self, id: &str, path: &str, archive: Vec<u8>) -> Result<()> {
        let req = Request::put(format!("/containers/{id}/archive"))
            .query("path", path)
            .bytes(archive);
        self.call(req, &[200]).await?;
        Ok(())
    }

    /// Streaming variant of [`Docker::extract_to_container`] for
    /// archives too large to buffer.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn extract_to_container_from(
        &self,
        id: &str,
        path: &str,
        archive: Box<dyn AsyncRead + Send + Unpin>,
    ) -> Result<()> {
        let req = Request::put(format!("/containers/{id}/archive"))
            .query("path", path)
            .reader(archive);
        self.call(req, &[200]).await?;
        Ok(())
    }

    /// Attaches to a container's streams over a hijacked connection.
    ///
    /// Dials a fresh connection for the upgrade, so other requests on
    /// this client are unaffected.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon refuses the upgrade.
    #[instrument(skip(self))]
    pub async fn attach_container(
        &self,
        id: &str,
        streams: StreamConfig,
    ) -> Result<StreamSession> {
        let req = Request::post(format!("/containers/{id}/attach"))
            .query("stream", true)
            .query("stdin", streams.stdin)
            .query("stdout", streams.stdout)
            .query("stderr", streams.wants_stderr());
        self.upgrade(req, streams).await
    }
}
