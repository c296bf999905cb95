//! Volume operations.

use crate::{Docker, Request, Result};
use serde_json::Value;

impl Docker {
    /// Lists volumes.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn list_volumes(&self) -> Result<Value> {
        let response = self.call(Request::get("/volumes"), &[200]).await?;
        Ok(response.into_json()?)
    }

    /// Creates a volume from `config` (caller-style keys).
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 201.
    pub async fn create_volume(&self, config: Value) -> Result<Value> {
        let req = Request::post("/volumes/create").json(config);
        let response = self.call(req, &[201]).await?;
        Ok(response.into_json()?)
    }

    /// Low-level details for one volume.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn inspect_volume(&self, name: &str) -> Result<Value> {
        let response = self
            .call(Request::get(format!("/volumes/{name}")), &[200])
            .await?;
        Ok(response.into_json()?)
    }

    /// Removes a volume.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 204.
    pub async fn remove_volume(&self, name: &str, force: bool) -> Result<()> {
        let req = Request::delete(format!("/volumes/{name}")).query("force", force);
        self.call(req, &[204]).await?;
        Ok(())
    }
}
