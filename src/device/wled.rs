use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::{DeviceError, PatchSender};
use crate::patch::Patch;

/// Controller reached through its JSON state endpoint
pub struct WledDevice {
    client: Client,
    url: Url,
}

impl WledDevice {
    pub fn new(url: Url, timeout: Option<Duration>) -> Result<Self, DeviceError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url,
        })
    }
}

#[async_trait]
impl PatchSender for WledDevice {
    #[instrument(skip(self, patch), fields(url = %self.url, leds = patch.len()))]
    async fn send(&self, patch: &Patch) -> Result<(), DeviceError> {
        let response = self.client.post(self.url.clone()).json(patch).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeviceError::Rejected(status));
        }

        trace!(status = %status, "patch accepted");
        Ok(())
    }
}
