#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use serde_json::Value;
use stepform_core::{
    config::EngineConfig,
    form::{FormModel, SteppedForm},
    storage::JsonRecordStore,
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Fresh directory that outlives the calling test.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Record store and config backed by an isolated directory.
pub fn setup_store() -> (JsonRecordStore, EngineConfig) {
    let base = temp_base();
    let config = EngineConfig {
        data_dir: Some(base),
        ..EngineConfig::default()
    };
    let store = JsonRecordStore::from_config(&config).expect("create record store");
    (store, config)
}

pub fn open<M: FormModel>(model: M) -> SteppedForm<M> {
    SteppedForm::new(model, &EngineConfig::default()).expect("open form")
}

pub fn set<M: FormModel>(form: &mut SteppedForm<M>, fields: &[(&str, &str)]) {
    for (path, value) in fields {
        form.set_value(path, Value::String((*value).to_string()))
            .expect("write field");
    }
}
