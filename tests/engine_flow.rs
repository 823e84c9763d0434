mod common;

use common::{open, set};
use serde_json::json;
use stepform_core::{
    config::EngineConfig,
    form::{Banner, FieldPath, FormEvent, SteppedForm, DEFAULT_FAILURE_MESSAGE},
    masters::{PartForm, PrcTemplateForm, ProcessSequenceForm},
    storage::{MemoryGateway, SaveFailure},
};

fn path(raw: &str) -> FieldPath {
    FieldPath::parse(raw).unwrap()
}

fn filled_part() -> SteppedForm<PartForm> {
    let mut form = open(PartForm);
    set(
        &mut form,
        &[
            ("partNumber", "PN-1001"),
            ("description", "Drive shaft"),
            ("revision", "B"),
            ("material", "42CrMo4"),
            ("weightKg", "2.5"),
        ],
    );
    form
}

fn orders(form: &SteppedForm<PrcTemplateForm>) -> Vec<i64> {
    form.tree()
        .as_value()["templateSteps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|step| step["stepOrder"].as_i64().unwrap())
        .collect()
}

#[test]
fn empty_required_fields_are_always_reported() {
    let form = open(PartForm);
    let report = form.validate_all();
    for field in ["partNumber", "description", "material", "weightKg"] {
        assert!(report.errors.contains_key(&path(field)), "{field} missing");
    }
    assert!(!report.errors.contains_key(&path("revision")));
    assert!(!report.errors.contains_key(&path("drawingNumber")));
}

#[test]
fn duplicate_sequence_numbers_yield_one_collection_error() {
    let mut form = open(ProcessSequenceForm);
    form.append("stepGroups").unwrap();
    set(
        &mut form,
        &[
            ("sequenceName", "Shaft line"),
            ("partNumber", "PN-1"),
            ("stepGroups[0].operationName", "Turn"),
            ("stepGroups[0].workCenter", "Lathe 1"),
            ("stepGroups[0].cycleTimeMinutes", "12"),
            ("stepGroups[1].sequenceNumber", "1"),
            ("stepGroups[1].operationName", "Grind"),
            ("stepGroups[1].workCenter", "Grinder"),
            ("stepGroups[1].cycleTimeMinutes", "8"),
        ],
    );

    let report = form.validate_all();
    assert_eq!(report.errors.len(), 1);
    assert_eq!(
        report.errors.get(&path("stepGroups")).map(String::as_str),
        Some("Sequence numbers must be unique")
    );

    form.set_value("stepGroups[1].sequenceNumber", json!("2")).unwrap();
    assert!(form.validate_all().is_valid());
}

#[test]
fn removal_renumbers_from_the_base_offset() {
    let mut form = open(PrcTemplateForm);
    form.append("templateSteps").unwrap();
    form.append("templateSteps").unwrap();
    form.set_value("templateSteps[1].stepName", json!("Grind")).unwrap();
    assert_eq!(orders(&form), vec![3, 4, 5]);

    form.remove("templateSteps", 0).unwrap();
    assert_eq!(orders(&form), vec![3, 4]);
    assert_eq!(
        form.value("templateSteps[0].stepName").unwrap(),
        Some(&json!("Grind"))
    );

    form.move_item("templateSteps", 1, 0).unwrap();
    assert_eq!(orders(&form), vec![3, 4]);
    assert_eq!(
        form.value("templateSteps[1].stepName").unwrap(),
        Some(&json!("Grind"))
    );
}

#[test]
fn removing_the_new_item_keeps_the_first_one_untouched() {
    let mut form = open(PrcTemplateForm);
    assert!(!form.toggle("templateSteps", 0).unwrap());
    let before = form.items("templateSteps").unwrap();

    form.append("templateSteps").unwrap();
    let grown = form.items("templateSteps").unwrap();
    assert!(grown[1].expanded);

    form.remove("templateSteps", 1).unwrap();
    let after = form.items("templateSteps").unwrap();
    assert_eq!(after, before);
    assert!(after[0].manually_collapsed);
    assert_eq!(orders(&form), vec![3]);
}

#[test]
fn first_item_is_forced_open_on_error_despite_manual_collapse() {
    let mut form = open(PrcTemplateForm);
    let mut gateway = MemoryGateway::new();
    form.append("templateSteps").unwrap();
    form.toggle("templateSteps", 0).unwrap();
    form.toggle("templateSteps", 1).unwrap();
    set(&mut form, &[("templateName", "Shaft PRC"), ("partNumber", "PN-1")]);
    assert_eq!(form.next(&mut gateway).unwrap(), FormEvent::Advanced { step: 1 });

    assert!(matches!(
        form.next(&mut gateway).unwrap(),
        FormEvent::Blocked { .. }
    ));
    let items = form.items("templateSteps").unwrap();
    assert!(items[0].expanded);
    assert!(!items[1].expanded);
    assert!(items[1].manually_collapsed);
}

#[test]
fn first_item_honours_manual_collapse_when_not_pinned() {
    let config = EngineConfig {
        pin_first_item: false,
        ..EngineConfig::default()
    };
    let mut form = SteppedForm::new(PrcTemplateForm, &config).unwrap();
    let mut gateway = MemoryGateway::new();
    assert!(!form.items("templateSteps").unwrap()[0].expanded);
    assert!(form.toggle("templateSteps", 0).unwrap());
    assert!(!form.toggle("templateSteps", 0).unwrap());
    set(&mut form, &[("templateName", "Shaft PRC"), ("partNumber", "PN-1")]);
    form.next(&mut gateway).unwrap();
    form.next(&mut gateway).unwrap();
    assert!(!form.items("templateSteps").unwrap()[0].expanded);
}

#[test]
fn next_never_advances_past_errors_and_back_always_works() {
    let mut form = open(PartForm);
    let mut gateway = MemoryGateway::new();
    assert_eq!(form.back(), 0);

    let event = form.next(&mut gateway).unwrap();
    assert!(matches!(event, FormEvent::Blocked { errors } if errors == 2));
    assert_eq!(form.active_step(), 0);
    assert!(!form.errors().contains_key(&path("material")));

    set(&mut form, &[("partNumber", "PN-7"), ("description", "Gear")]);
    assert_eq!(form.next(&mut gateway).unwrap(), FormEvent::Advanced { step: 1 });
    assert!(form.errors().is_empty());

    assert_eq!(form.back(), 0);
    assert_eq!(form.active_step(), 0);
    assert_eq!(gateway.save_count(), 0);
}

#[test]
fn invalid_part_number_blocks_the_first_step() {
    let mut form = filled_part();
    let mut gateway = MemoryGateway::new();
    form.set_value("partNumber", json!("pn 1")).unwrap();
    assert!(matches!(
        form.next(&mut gateway).unwrap(),
        FormEvent::Blocked { errors: 1 }
    ));
    assert!(form.errors().contains_key(&path("partNumber")));
}

#[test]
fn valid_submission_calls_the_gateway_exactly_once() {
    let mut form = filled_part();
    let mut gateway = MemoryGateway::new();
    form.next(&mut gateway).unwrap();
    form.next(&mut gateway).unwrap();
    let event = form.next(&mut gateway).unwrap();

    assert!(matches!(event, FormEvent::Saved { .. }));
    assert_eq!(gateway.save_count(), 1);
    assert!(form.is_submitted());
    assert!(form.record_id().is_some());
    assert_eq!(form.banner().map(Banner::message), Some("Part saved."));
    assert!(form.next(&mut gateway).is_err());
    assert_eq!(gateway.save_count(), 1);
}

#[test]
fn invalid_tree_at_submit_never_reaches_the_gateway() {
    let mut form = filled_part();
    let mut gateway = MemoryGateway::new();
    form.next(&mut gateway).unwrap();
    form.next(&mut gateway).unwrap();
    form.set_value("description", json!("")).unwrap();

    assert_eq!(form.next(&mut gateway).unwrap(), FormEvent::Rejected { errors: 1 });
    assert_eq!(gateway.save_count(), 0);
    assert!(matches!(form.banner(), Some(Banner::Rejected(_))));
    assert!(!form.is_submitted());

    form.set_value("description", json!("Gear")).unwrap();
    assert!(form.errors().is_empty());
    assert!(form.banner().is_none());
}

#[test]
fn reported_failure_is_shown_verbatim_and_allows_retry() {
    let mut form = filled_part();
    let mut gateway = MemoryGateway::new();
    gateway.fail_next(SaveFailure::Reported("Part number already exists".into()));
    form.next(&mut gateway).unwrap();
    form.next(&mut gateway).unwrap();

    assert_eq!(
        form.next(&mut gateway).unwrap(),
        FormEvent::Failed {
            message: "Part number already exists".into()
        }
    );
    assert!(!form.is_submitted());
    assert_eq!(form.active_step(), 2);

    assert!(matches!(form.next(&mut gateway).unwrap(), FormEvent::Saved { .. }));
    assert_eq!(gateway.save_count(), 2);
}

#[test]
fn transport_failure_uses_the_generic_message() {
    let mut form = filled_part();
    let mut gateway = MemoryGateway::new();
    gateway.fail_next(SaveFailure::Transport("connection reset".into()));
    form.next(&mut gateway).unwrap();
    form.next(&mut gateway).unwrap();

    assert_eq!(
        form.next(&mut gateway).unwrap(),
        FormEvent::Failed {
            message: DEFAULT_FAILURE_MESSAGE.into()
        }
    );
    assert!(form.banner().is_some_and(Banner::is_error));
}

#[test]
fn subscribers_fire_for_their_field_and_its_ancestors() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut form = open(PrcTemplateForm);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let id = form
        .subscribe("templateSteps[0].stepName", move |_, value| {
            sink.borrow_mut().push(value.cloned());
        })
        .unwrap();

    form.set_value("templateSteps[0].stepName", json!("Turn")).unwrap();
    form.set_value("templateName", json!("Shaft")).unwrap();
    assert_eq!(*seen.borrow(), vec![Some(json!("Turn"))]);

    form.append("templateSteps").unwrap();
    assert!(seen.borrow().len() >= 2);

    assert!(form.unsubscribe(id));
    let count = seen.borrow().len();
    form.set_value("templateSteps[0].stepName", json!("Mill")).unwrap();
    assert_eq!(seen.borrow().len(), count);
}

#[test]
fn collection_subscriber_hears_item_field_edits() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut form = open(PrcTemplateForm);
    let seen = Rc::new(RefCell::new(0usize));
    let sink = Rc::clone(&seen);
    form.subscribe("templateSteps", move |_, value| {
        assert!(value.is_some_and(|steps| steps.is_array()));
        *sink.borrow_mut() += 1;
    })
    .unwrap();

    form.set_value("templateSteps[0].stepName", json!("Turn")).unwrap();
    assert_eq!(*seen.borrow(), 1);
    form.set_value("templateName", json!("Shaft")).unwrap();
    assert_eq!(*seen.borrow(), 1);
}
