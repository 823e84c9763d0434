#![doc(test(attr(deny(warnings))))]

//! Stepform Core is a stepped form engine: multi-step data entry with
//! per-step validation, repeatable item groups and a single guarded
//! submission, plus the master-data forms and console built on it.

pub mod cli;
pub mod config;
pub mod errors;
pub mod form;
pub mod masters;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Stepform tracing initialized.");
    });
}
