use std::{fs, path::PathBuf};

use serde_json::Value;

use crate::{
    config::EngineConfig,
    errors::Result,
    form::{RecordGateway, SaveResponse},
    utils::{self, ensure_dir, write_atomic},
};

use super::{is_safe_id, stamp_new, stamp_update, target_id, ID_FIELD};

const RECORD_EXTENSION: &str = "json";

/// One pretty-printed JSON file per record under
/// `<root>/records/<form>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    records_dir: PathBuf,
}

impl JsonRecordStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        let records_dir = utils::records_dir_in(&root);
        ensure_dir(&records_dir)?;
        Ok(Self { records_dir })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::new(config.records_root())
    }

    fn form_dir(&self, form: &str) -> PathBuf {
        self.records_dir.join(canonical_name(form))
    }

    pub fn record_path(&self, form: &str, id: &str) -> PathBuf {
        self.form_dir(form)
            .join(format!("{}.{}", id, RECORD_EXTENSION))
    }

    pub fn fetch(&self, form: &str, id: &str) -> Result<Option<Value>> {
        if !is_safe_id(id) {
            return Ok(None);
        }
        let path = self.record_path(form, id);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    /// All records of `form`, ordered by id. Unreadable files are skipped.
    pub fn list(&self, form: &str) -> Result<Vec<Value>> {
        let dir = self.form_dir(form);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let record: Value = match fs::read_to_string(&path)
                .ok()
                .and_then(|data| serde_json::from_str(&data).ok())
            {
                Some(record) => record,
                None => {
                    tracing::warn!(path = %path.display(), "skipping unreadable record");
                    continue;
                }
            };
            records.push(record);
        }
        records.sort_by(|a, b| record_id(a).cmp(record_id(b)));
        Ok(records)
    }

    pub fn save(&self, form: &str, payload: &Value) -> Result<SaveResponse> {
        let Some(fields) = payload.as_object() else {
            return Ok(SaveResponse::failed("Payload must be a JSON object"));
        };
        let (id, record) = match target_id(fields) {
            Some(id) => {
                let Some(existing) = self.fetch(form, id)? else {
                    return Ok(SaveResponse::failed(format!("Record `{}` does not exist", id)));
                };
                (id.to_string(), stamp_update(&existing, fields))
            }
            None => stamp_new(fields),
        };
        let path = self.record_path(form, &id);
        let json = serde_json::to_string_pretty(&record)?;
        write_atomic(&path, &json)?;
        tracing::debug!(form, id = %id, "record written");
        Ok(SaveResponse::ok(record))
    }
}

impl RecordGateway for JsonRecordStore {
    fn fetch_record(&self, form: &str, id: &str) -> Result<Option<Value>> {
        self.fetch(form, id)
    }

    fn save_record(&mut self, form: &str, payload: &Value) -> Result<SaveResponse> {
        self.save(form, payload)
    }
}

fn record_id(record: &Value) -> &str {
    record.get(ID_FIELD).and_then(Value::as_str).unwrap_or_default()
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "form".into()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn create_assigns_id_and_lands_on_disk() {
        let dir = tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path().to_path_buf()).unwrap();
        let response = store.save("part", &json!({ "partNumber": "PN-1" })).unwrap();
        assert!(response.success);
        let data = response.data.unwrap();
        let id = data["id"].as_str().unwrap();
        assert!(store.record_path("part", id).exists());
        assert!(data["createdAt"].is_string());
        assert_eq!(store.fetch("part", id).unwrap(), Some(data.clone()));
    }

    #[test]
    fn fetch_rejects_path_like_ids() {
        let dir = tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(store.fetch("part", "../config").unwrap(), None);
    }

    #[test]
    fn non_object_payload_is_a_reported_failure() {
        let dir = tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path().to_path_buf()).unwrap();
        let response = store.save("part", &json!([1, 2])).unwrap();
        assert!(!response.success);
    }

    #[test]
    fn save_leaves_only_record_files() {
        let dir = tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path().to_path_buf()).unwrap();
        let created = store.save("part", &json!({ "partNumber": "PN-1" })).unwrap();
        let id = created.data.unwrap()["id"].as_str().unwrap().to_string();
        store
            .save("part", &json!({ "id": id, "partNumber": "PN-2" }))
            .unwrap();

        let names: Vec<String> = fs::read_dir(store.record_path("part", &id).parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{}.json", id)]);
        assert!(!utils::tmp_path(&store.record_path("part", &id)).exists());
    }
}
