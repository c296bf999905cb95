//! Network operations.

use crate::{Docker, Request, Result};
use serde_json::Value;

impl Docker {
    /// Lists networks.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn list_networks(&self) -> Result<Value> {
        let response = self.call(Request::get("/networks"), &[200]).await?;
        Ok(response.into_json()?)
    }

    /// Creates a network from `config` (caller-style keys; `name` is
    /// required by the daemon).
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 201.
    pub async fn create_network(&self, config: Value) -> Result<Value> {
        let req = Request::post("/networks/create").json(config);
        let response = self.call(req, &[201]).await?;
        Ok(response.into_json()?)
    }

    /// Inspects a network. The `containers` subtree keeps its container
    /// ids verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn inspect_network(&self, id: &str) -> Result<Value> {
        let response = self
            .call(Request::get(format!("/networks/{id}")), &[200])
            .await?;
        Ok(response.into_json()?)
    }

    /// Removes a network.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 204.
    pub async fn remove_network(&self, id: &str) -> Result<()> {
        self.call(Request::delete(format!("/networks/{id}")), &[204])
            .await?;
        Ok(())
    }
}
