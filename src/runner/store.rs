//! In-memory stores shared across runs: the single-slot report store and
//! the content-addressed screenshot store.

use image::GenericImageView;
use log::warn;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::state::SuiteReport;

/// Single-slot store for the most recently completed report.
///
/// `set` always replaces; readers observe either the old or the new value,
/// never a torn one, because the slot swaps an `Arc` under a short lock.
#[derive(Default)]
pub struct ResultStore {
    slot: RwLock<Option<Arc<SuiteReport>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<SuiteReport>> {
        match self.slot.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, report: Arc<SuiteReport>) {
        match self.slot.write() {
            Ok(mut slot) => *slot = Some(report),
            Err(poisoned) => *poisoned.into_inner() = Some(report),
        }
    }

    pub fn clear(&self) {
        match self.slot.write() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

/// One captured screenshot with its decoded dimensions.
pub struct Screenshot {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// In-memory screenshot store keyed by an opaque content-addressed
/// reference: `{test_id}-{label}-{sha256 prefix}.png`.
#[derive(Default)]
pub struct ScreenshotStore {
    entries: RwLock<HashMap<String, Arc<Screenshot>>>,
}

impl ScreenshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store PNG bytes and return the reference they are retrievable under.
    pub fn insert(&self, test_id: &str, label: &str, bytes: Vec<u8>) -> String {
        let digest = Sha256::digest(&bytes);
        let key = format!("{}-{}-{}.png", test_id, label, &hex::encode(digest)[..12]);

        let (width, height) = match image::load_from_memory(&bytes) {
            Ok(img) => (img.width(), img.height()),
            Err(e) => {
                warn!("could not decode screenshot {}: {}", key, e);
                (0, 0)
            }
        };

        let entry = Arc::new(Screenshot {
            bytes,
            width,
            height,
        });
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(key.clone(), entry);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(key.clone(), entry);
            }
        }
        key
    }

    pub fn get(&self, key: &str) -> Option<Arc<Screenshot>> {
        match self.entries.read() {
            Ok(entries) => entries.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
