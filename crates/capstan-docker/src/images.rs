//! Image operations.

use crate::{Docker, Request, Result};
use serde_json::Value;
use tracing::instrument;

impl Docker {
    /// Lists images.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn list_images(&self) -> Result<Value> {
        let response = self.call(Request::get("/images/json"), &[200]).await?;
        Ok(response.into_json()?)
    }

    /// Pulls an image, returning the decoded pull-event sequence.
    ///
    /// The response body is one JSON object per line; the whole sequence
    /// is read before returning, because closing early cancels the pull
    /// server-side.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    #[instrument(skip(self))]
    pub async fn pull_image(&self, from_image: &str, tag: &str) -> Result<Vec<Value>> {
        let req = Request::post("/images/create")
            .query("fromImage", from_image)
            .query("tag", tag)
            .json_seq();
        let response = self.call(req, &[200]).await?;
        let events = response.into_json_seq()?;
        tracing::debug!(from_image, tag, events = events.len(), "pull finished");
        Ok(events)
    }

    /// Low-level details for one image.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn inspect_image(&self, name: &str) -> Result<Value> {
        let response = self
            .call(Request::get(format!("/images/{name}/json")), &[200])
            .await?;
        Ok(response.into_json()?)
    }

    /// Removes an image. The result lists untagged and deleted layers.
    ///
    /// # Errors
    ///
    /// Returns an error unless the daemon answers 200.
    pub async fn remove_image(&self, name: &str, force: bool) -> Result<Value> {
        let req = Request::delete(format!("/images/{name}")).query("force", force);
        let response = self.call(req, &[200]).await?;
        Ok(response.into_json()?)
    }
}
