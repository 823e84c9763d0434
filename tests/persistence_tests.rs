mod common;

use std::fs;

use common::{open, set, setup_store};
use serde_json::json;
use stepform_core::{
    config::{ConfigManager, EngineConfig},
    form::{FormEvent, SteppedForm},
    masters::PartForm,
    storage::JsonRecordStore,
};

#[test]
fn records_survive_a_new_store_instance() {
    let (store, config) = setup_store();
    let saved = store
        .save("part", &json!({ "partNumber": "PN-1", "description": "Gear" }))
        .unwrap();
    let id = saved.data.unwrap()["id"].as_str().unwrap().to_string();

    let reopened = JsonRecordStore::from_config(&config).unwrap();
    let record = reopened.fetch("part", &id).unwrap().unwrap();
    assert_eq!(record["description"], "Gear");
}

#[test]
fn update_replaces_fields_and_stamps_update_time() {
    let (store, _) = setup_store();
    let created = store
        .save("part", &json!({ "partNumber": "PN-1", "description": "Gear" }))
        .unwrap()
        .data
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let updated = store
        .save("part", &json!({ "id": id, "partNumber": "PN-1", "description": "Pinion" }))
        .unwrap();
    assert!(updated.success);
    let record = store.fetch("part", id).unwrap().unwrap();
    assert_eq!(record["description"], "Pinion");
    assert_eq!(record["createdAt"], created["createdAt"]);
    assert!(record["updatedAt"].is_string());
    assert_eq!(store.list("part").unwrap().len(), 1);
}

#[test]
fn update_of_unknown_id_is_reported_not_created() {
    let (store, _) = setup_store();
    let response = store
        .save("part", &json!({ "id": "missing-1", "partNumber": "PN-1" }))
        .unwrap();
    assert!(!response.success);
    assert!(response.error_message.unwrap().contains("missing-1"));
    assert!(store.list("part").unwrap().is_empty());
}

#[test]
fn list_is_sorted_and_skips_corrupt_files() {
    let (store, _) = setup_store();
    for number in ["PN-3", "PN-1", "PN-2"] {
        store.save("part", &json!({ "partNumber": number })).unwrap();
    }
    fs::write(store.record_path("part", "broken"), "{ not json").unwrap();

    let records = store.list("part").unwrap();
    assert_eq!(records.len(), 3);
    let ids: Vec<&str> = records.iter().map(|r| r["id"].as_str().unwrap()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    assert!(store.list("catalyst").unwrap().is_empty());
}

#[test]
fn form_session_saves_and_edits_through_the_json_store() {
    let (mut store, config) = setup_store();
    let mut form = SteppedForm::new(PartForm, &config).unwrap();
    set(
        &mut form,
        &[
            ("partNumber", "PN-42"),
            ("description", "Bracket"),
            ("material", "S235"),
            ("weightKg", "0.8"),
        ],
    );
    form.next(&mut store).unwrap();
    form.next(&mut store).unwrap();
    let FormEvent::Saved { data: Some(record) } = form.next(&mut store).unwrap() else {
        panic!("expected a saved record");
    };
    let id = record["id"].as_str().unwrap();

    let mut edit = open(PartForm);
    edit.load(&store, id).unwrap();
    assert_eq!(edit.value("weightKg").unwrap(), Some(&json!("0.8")));
    edit.set_value("description", json!("Angle bracket")).unwrap();
    assert!(edit.is_dirty());
    edit.next(&mut store).unwrap();
    edit.next(&mut store).unwrap();
    assert!(matches!(edit.next(&mut store).unwrap(), FormEvent::Saved { .. }));

    let stored = store.fetch("part", id).unwrap().unwrap();
    assert_eq!(stored["description"], "Angle bracket");
    assert_eq!(store.list("part").unwrap().len(), 1);
}

#[test]
fn config_roundtrips_and_defaults_when_absent() {
    let base = common::temp_base();
    let manager = ConfigManager::with_base_dir(base.clone()).unwrap();
    assert_eq!(manager.load().unwrap(), EngineConfig::default());

    let config = EngineConfig {
        pin_first_item: false,
        failure_message: "Save failed.".into(),
        data_dir: Some(base.join("data")),
        ..EngineConfig::default()
    };
    manager.save(&config).unwrap();
    assert_eq!(manager.load().unwrap(), config);
}
