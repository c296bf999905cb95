//! System operations: ping, version, info.

use crate::{Docker, Request, Result};
use serde_json::Value;

impl Docker {
    /// Pings the daemon. Returns the literal body, normally `OK`.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<String> {
        let response = self.call(Request::get("/_ping"), &[200]).await?;
        Ok(response.into_text()?)
    }

    /// Daemon version information.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-200 status.
    pub async fn version(&self) -> Result<Value> {
        let response = self.call(Request::get("/version"), &[200]).await?;
        Ok(response.into_json()?)
    }

    /// System-wide information.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-200 status.
    pub async fn info(&self) -> Result<Value> {
        let response = self.call(Request::get("/info"), &[200]).await?;
        Ok(response.into_json()?)
    }
}
