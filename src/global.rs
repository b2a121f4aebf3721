use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    catalog::Catalog,
    device::{DeviceError, PatchSender},
    geometry::{Geometry, Pixel},
    models::Config,
    patch::Patch,
    store::{LedStore, Snapshot},
    tasks::TaskRegistry,
};

/// Application context shared by the handlers and background tasks
#[derive(Clone)]
pub struct Global(Arc<GlobalData>);

pub struct GlobalData {
    config: Config,
    geometry: Geometry,
    catalog: Catalog,
    store: Mutex<LedStore>,
    /// Held for a whole update, so patches reach the device in mutation order
    sending: Mutex<()>,
    device: Box<dyn PatchSender>,
    tasks: TaskRegistry,
}

impl GlobalData {
    pub fn new(config: &Config, device: Box<dyn PatchSender>) -> Self {
        let geometry = Geometry::new(&config.common);

        Self {
            config: config.clone(),
            store: Mutex::new(LedStore::new(&geometry)),
            sending: Mutex::new(()),
            catalog: Catalog::new(config),
            geometry,
            device,
            tasks: TaskRegistry::new(),
        }
    }

    pub fn wrap(self) -> Global {
        Global(Arc::new(self))
    }
}

impl Global {
    pub fn config(&self) -> &Config {
        &self.0.config
    }

    pub fn geometry(&self) -> &Geometry {
        &self.0.geometry
    }

    pub fn catalog(&self) -> &Catalog {
        &self.0.catalog
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.0.tasks
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.0.store.lock().await.snapshot()
    }

    /// Mutate the store with `f` and send the pixels it returns as one patch
    ///
    /// Updates run one at a time and their patches are sent in the same order
    /// as the mutations. The store itself is only locked while `f` runs, so
    /// snapshots never wait on the controller. Nothing is sent if `f` fails.
    pub async fn update<F, E>(&self, f: F) -> Result<Vec<Pixel>, E>
    where
        F: FnOnce(&mut LedStore, &Geometry) -> Result<Vec<Pixel>, E>,
        E: From<DeviceError>,
    {
        let _sending = self.0.sending.lock().await;

        let (pixels, patch) = {
            let mut store = self.0.store.lock().await;
            let pixels = f(&mut store, &self.0.geometry)?;
            let patch = Patch::build(&self.0.geometry, &pixels);
            (pixels, patch)
        };

        self.0.device.send(&patch).await?;

        Ok(pixels)
    }
}
