use std::{
    collections::VecDeque,
    fmt::Write,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;

use super::{DeviceError, PatchSender};
use crate::patch::Patch;

const HISTORY_LEN: usize = 64;

/// Device that logs patches and remembers the most recent ones
#[derive(Debug, Default, Clone)]
pub struct DummyDevice {
    history: Arc<Mutex<VecDeque<Patch>>>,
}

impl DummyDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded patches, oldest first
    pub fn patches(&self) -> Vec<Patch> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn last(&self) -> Option<Patch> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }

    pub fn clear(&self) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn ansi(patch: &Patch) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();

        for (_, color) in patch.entries() {
            let color = color.color();
            write!(
                &mut buf,
                "\x1B[38;2;{red};{green};{blue}m█",
                red = color.red,
                green = color.green,
                blue = color.blue
            )?;
        }

        write!(&mut buf, "\x1B[0m")?;
        Ok(buf)
    }
}

#[async_trait]
impl PatchSender for DummyDevice {
    async fn send(&self, patch: &Patch) -> Result<(), DeviceError> {
        match Self::ansi(patch) {
            Ok(line) => debug!(leds = patch.len(), "patch {}", line),
            Err(_) => debug!(leds = patch.len(), "patch"),
        }

        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        if history.len() == HISTORY_LEN {
            history.pop_front();
        }
        history.push_back(patch.clone());

        Ok(())
    }
}
