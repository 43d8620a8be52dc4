//! Shared property table.
//!
//! One parameter map per planned stage, behind a single mutex.  The pipeline
//! writes live values into it; elements read from it on the streaming thread
//! (once at instantiation, or per buffer for `volume`/`mute`).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::description::{ParamValue, Params};

/// Cloneable handle to every stage's parameters.
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    inner: Arc<Mutex<Vec<Params>>>,
}

impl PropertyTable {
    pub fn new(stages: Vec<Params>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(stages)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Params>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, stage: usize, key: &str) -> Option<ParamValue> {
        self.lock().get(stage).and_then(|p| p.get(key).cloned())
    }

    /// Write a value.  Out-of-bounds stage indices are ignored.
    pub fn set(&self, stage: usize, key: &str, value: ParamValue) {
        if let Some(params) = self.lock().get_mut(stage) {
            params.insert(key.to_string(), value);
        }
    }

    /// Copy of one stage's parameters.
    pub fn snapshot(&self, stage: usize) -> Params {
        self.lock().get(stage).cloned().unwrap_or_default()
    }

    /// View scoped to a single stage, handed to that stage's element.
    pub fn stage(&self, index: usize) -> StageProps {
        StageProps {
            table: self.clone(),
            index,
        }
    }
}

/// One stage's slice of a [`PropertyTable`].
#[derive(Debug, Clone)]
pub struct StageProps {
    table: PropertyTable,
    index: usize,
}

impl StageProps {
    /// Stand-alone parameters not backed by a pipeline.
    pub fn detached(params: Params) -> Self {
        PropertyTable::new(vec![params]).stage(0)
    }

    pub fn get(&self, key: &str) -> Option<ParamValue> {
        self.table.get(self.index, key)
    }

    pub fn set(&self, key: &str, value: ParamValue) {
        self.table.set(self.index, key, value);
    }

    pub fn str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn i64(&self, key: &str) -> Option<i64> {
        self.get(key)?.as_i64()
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_f64()
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }
}
