use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::patch::Patch;

// Device implementation modules

mod dummy;
mod wled;

pub use dummy::DummyDevice;
pub use wled::WledDevice;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("request to the controller failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("controller rejected the update: {0}")]
    Rejected(reqwest::StatusCode),
}

/// Destination of LED patches
///
/// Each call is exactly one outbound update. Implementations do not retry.
#[async_trait]
pub trait PatchSender: Send + Sync {
    async fn send(&self, patch: &Patch) -> Result<(), DeviceError>;
}

/// Build the sender for the controller at `url`, or a logging dummy when there is none
pub fn from_url(
    url: Option<reqwest::Url>,
    timeout: Option<Duration>,
) -> Result<Box<dyn PatchSender>, DeviceError> {
    match url {
        Some(url) => {
            info!(url = %url, "sending patches to controller");
            Ok(Box::new(WledDevice::new(url, timeout)?))
        }
        None => {
            warn!("no controller URL configured, patches will only be logged");
            Ok(Box::new(DummyDevice::new()))
        }
    }
}
