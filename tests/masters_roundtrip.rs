mod common;

use common::{open, set};
use serde_json::{json, Value};
use stepform_core::{
    form::{FieldPath, FormEvent, FormModel, SteppedForm},
    masters::{
        CatalystChartForm, InspectionForm, MasterKind, PartForm, PrcTemplateForm,
        ProcessSequenceForm, ProductionExecutionForm,
    },
    storage::MemoryGateway,
};

/// Walks every step and submits; panics if any step blocks.
fn submit<M: FormModel>(form: &mut SteppedForm<M>, gateway: &mut MemoryGateway) -> Value {
    for _ in 0..=form.step_count() {
        match form.next(gateway).unwrap() {
            FormEvent::Advanced { .. } => continue,
            FormEvent::Saved { data } => return data.expect("saved record"),
            other => panic!("unexpected {other:?}, errors: {:?}", form.errors()),
        }
    }
    panic!("form never submitted");
}

/// Saves a filled form, reopens the stored record and checks the rebuilt
/// payload matches what was sent.
fn assert_roundtrip<M: FormModel>(model: M, reopen: M, fields: &[(&str, &str)], extra: &[&str]) {
    let mut gateway = MemoryGateway::new();
    let mut form = open(model);
    for group in extra {
        form.append(group).unwrap();
    }
    set(&mut form, fields);
    let sent = form.payload_preview().unwrap();
    let record = submit(&mut form, &mut gateway);
    let id = record["id"].as_str().unwrap().to_string();
    assert_eq!(gateway.saves()[0].1, sent);

    let mut edit = open(reopen);
    edit.load(&gateway, &id).unwrap();
    let mut expected = sent.clone();
    expected["id"] = json!(id);
    assert_eq!(edit.payload_preview().unwrap(), expected);

    let updated = submit(&mut edit, &mut gateway);
    assert_eq!(updated["id"], json!(id));
    assert_eq!(updated["createdAt"], record["createdAt"]);
    assert_eq!(gateway.records(edit.model().name()).len(), 1);
}

#[test]
fn part_roundtrip() {
    assert_roundtrip(
        PartForm,
        PartForm,
        &[
            ("partNumber", "PN-1001"),
            ("description", "Drive shaft"),
            ("revision", "C"),
            ("material", "42CrMo4"),
            ("weightKg", "2.5"),
            ("drawingNumber", "DRW-77"),
        ],
        &[],
    );
}

#[test]
fn catalyst_roundtrip() {
    assert_roundtrip(
        CatalystChartForm,
        CatalystChartForm,
        &[
            ("chartName", "Zeolite A"),
            ("catalystType", "ZSM-5"),
            ("catalystConfiguration[0].minTemperature", "180"),
            ("catalystConfiguration[0].maxTemperature", "220.5"),
            ("catalystConfiguration[0].quantity", "12"),
            ("catalystConfiguration[1].minTemperature", "200"),
            ("catalystConfiguration[1].maxTemperature", "260"),
            ("catalystConfiguration[1].quantity", "3"),
            ("catalystConfiguration[1].unit", "L"),
        ],
        &["catalystConfiguration"],
    );
}

#[test]
fn inspection_roundtrip() {
    assert_roundtrip(
        InspectionForm,
        InspectionForm,
        &[
            ("inspectionName", "Bore check"),
            ("category", "final"),
            ("parameters[0].name", "Bore diameter"),
            ("parameters[0].isCtq", "yes"),
            ("parameters[0].minValue", "24.98"),
            ("parameters[0].maxValue", "25.02"),
            ("parameters[0].unit", "mm"),
            ("parameters[1].name", "Finish"),
            ("parameters[1].dataType", "text"),
            ("parameters[1].expectedText", "No burrs"),
        ],
        &["parameters"],
    );
}

#[test]
fn sequence_roundtrip() {
    assert_roundtrip(
        ProcessSequenceForm,
        ProcessSequenceForm,
        &[
            ("sequenceName", "Shaft line"),
            ("partNumber", "PN-1"),
            ("stepGroups[0].operationName", "Turn"),
            ("stepGroups[0].workCenter", "Lathe 1"),
            ("stepGroups[0].cycleTimeMinutes", "12.5"),
            ("stepGroups[1].sequenceNumber", "2"),
            ("stepGroups[1].operationName", "Grind"),
            ("stepGroups[1].workCenter", "Grinder"),
            ("stepGroups[1].cycleTimeMinutes", "8"),
        ],
        &["stepGroups"],
    );
}

#[test]
fn template_roundtrip() {
    assert_roundtrip(
        PrcTemplateForm,
        PrcTemplateForm,
        &[
            ("templateName", "Shaft PRC"),
            ("partNumber", "PN-1"),
            ("templateSteps[0].stepName", "Rough turn"),
            ("templateSteps[0].stepType", "MACHINING"),
            ("templateSteps[0].mandatory", "yes"),
            ("templateSteps[1].stepName", "Pack"),
            ("templateSteps[1].stepType", "packaging"),
        ],
        &["templateSteps"],
    );
}

#[test]
fn production_roundtrip() {
    assert_roundtrip(
        ProductionExecutionForm,
        ProductionExecutionForm,
        &[
            ("executionNumber", "EX-1"),
            ("prcTemplateId", "t-1"),
            ("partNumber", "PN-1"),
            ("plannedQuantity", "40"),
            ("plannedStart", "2024-05-01"),
            ("plannedEnd", "2024-05-03"),
        ],
        &[],
    );
}

#[test]
fn template_payload_starts_with_implicit_steps() {
    let mut form = open(PrcTemplateForm);
    set(
        &mut form,
        &[
            ("templateName", "Shaft PRC"),
            ("partNumber", "PN-1"),
            ("templateSteps[0].stepName", "Turn"),
            ("templateSteps[0].stepType", "MACHINING"),
        ],
    );
    let payload = form.payload_preview().unwrap();
    let steps = payload["templateSteps"].as_array().unwrap();
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0]["stepOrder"], json!(1));
    assert_eq!(steps[1]["stepType"], json!("INCOMING_INSPECTION"));
    assert_eq!(steps[2]["stepOrder"], json!(3));
}

#[test]
fn production_schedule_must_not_end_before_it_starts() {
    let mut gateway = MemoryGateway::new();
    let mut form = open(ProductionExecutionForm);
    set(
        &mut form,
        &[
            ("executionNumber", "EX-2"),
            ("prcTemplateId", "t-1"),
            ("partNumber", "PN-1"),
            ("plannedQuantity", "5"),
            ("plannedStart", "2024-05-03"),
            ("plannedEnd", "2024-05-01"),
        ],
    );
    form.next(&mut gateway).unwrap();
    assert_eq!(form.next(&mut gateway).unwrap(), FormEvent::Blocked { errors: 1 });
    assert!(form
        .errors()
        .contains_key(&FieldPath::parse("plannedStart").unwrap()));
}

#[test]
fn numeric_parameters_need_bounds_but_text_parameters_do_not() {
    let mut form = open(InspectionForm);
    set(
        &mut form,
        &[
            ("inspectionName", "Visual"),
            ("category", "AUDIT"),
            ("parameters[0].name", "Surface"),
            ("parameters[0].dataType", "text"),
        ],
    );
    let report = form.validate_all();
    assert_eq!(report.errors.len(), 1);
    assert!(report
        .errors
        .contains_key(&FieldPath::parse("parameters[0].expectedText").unwrap()));

    form.set_value("parameters[0].dataType", json!("numeric")).unwrap();
    let report = form.validate_all();
    for field in ["minValue", "maxValue", "unit"] {
        let path = FieldPath::parse(&format!("parameters[0].{field}")).unwrap();
        assert!(report.errors.contains_key(&path), "{field}");
    }
}

#[test]
fn every_master_opens_with_a_consistent_definition() {
    for kind in MasterKind::all() {
        let form = SteppedForm::new(kind.model(), &Default::default()).unwrap();
        assert!(form.step_count() >= 2, "{kind}");
        assert!(form.steps().last().unwrap().scope.is_empty(), "{kind}");
        assert_eq!(kind.name().parse::<MasterKind>().unwrap(), kind);
    }
}
