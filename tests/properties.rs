mod common;

use std::collections::HashSet;

use proptest::prelude::*;
use serde_json::json;
use stepform_core::{
    form::{FieldPath, FormEvent},
    masters::{PartForm, PrcTemplateForm, ProcessSequenceForm},
    storage::MemoryGateway,
};

#[derive(Debug, Clone)]
enum Op {
    Append,
    Remove(usize),
    Move(usize, usize),
    Toggle(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Append),
        (0usize..6).prop_map(Op::Remove),
        (0usize..6, 0usize..6).prop_map(|(from, to)| Op::Move(from, to)),
        (0usize..6).prop_map(Op::Toggle),
    ]
}

proptest! {
    #[test]
    fn step_orders_stay_contiguous_from_three(ops in prop::collection::vec(op(), 0..24)) {
        let mut form = common::open(PrcTemplateForm);
        for op in ops {
            let len = form.items("templateSteps").unwrap().len();
            let result = match op {
                Op::Append => form.append("templateSteps").map(|_| ()),
                Op::Remove(index) => form.remove("templateSteps", index).map(|_| ()),
                Op::Move(from, to) => form.move_item("templateSteps", from, to),
                Op::Toggle(index) => form.toggle("templateSteps", index).map(|_| ()),
            };
            let out_of_range = match op {
                Op::Append => false,
                Op::Remove(index) | Op::Toggle(index) => index >= len,
                Op::Move(from, to) => from >= len || to >= len,
            };
            prop_assert_eq!(result.is_err(), out_of_range);
        }

        let items = form.items("templateSteps").unwrap();
        let steps = form.tree().as_value()["templateSteps"].as_array().unwrap().clone();
        prop_assert_eq!(items.len(), steps.len());
        let unique: HashSet<_> = items.iter().map(|item| item.id).collect();
        prop_assert_eq!(unique.len(), items.len());
        for (index, step) in steps.iter().enumerate() {
            prop_assert_eq!(step["stepOrder"].as_i64(), Some(3 + index as i64));
        }
    }

    #[test]
    fn next_only_advances_when_the_step_is_clean(
        name in prop_oneof![Just(String::new()), "[A-Za-z ]{1,12}"],
        part in prop_oneof![Just(String::new()), Just("pn 1".to_string()), "PN-[0-9]{1,4}"],
    ) {
        let mut form = common::open(ProcessSequenceForm);
        let mut gateway = MemoryGateway::new();
        form.set_value("sequenceName", json!(name)).unwrap();
        form.set_value("partNumber", json!(part)).unwrap();

        let clean = !name.trim().is_empty() && part.starts_with("PN-");
        let event = form.next(&mut gateway).unwrap();
        if clean {
            prop_assert_eq!(event, FormEvent::Advanced { step: 1 });
        } else {
            prop_assert!(matches!(event, FormEvent::Blocked { .. }), "unexpected advance");
            prop_assert_eq!(form.active_step(), 0);
        }
        prop_assert_eq!(gateway.save_count(), 0);
    }

    #[test]
    fn blank_required_fields_are_exactly_the_reported_ones(
        blanks in prop::collection::vec(any::<bool>(), 4),
    ) {
        let fields = [
            ("partNumber", "PN-1"),
            ("description", "Gear"),
            ("material", "Steel"),
            ("weightKg", "3"),
        ];
        let mut form = common::open(PartForm);
        for ((field, value), blank) in fields.iter().zip(&blanks) {
            let value = if *blank { "  " } else { value };
            form.set_value(field, json!(value)).unwrap();
        }

        let report = form.validate_all();
        for ((field, _), blank) in fields.iter().zip(&blanks) {
            let path = FieldPath::parse(field).unwrap();
            prop_assert_eq!(report.errors.contains_key(&path), *blank);
        }
        prop_assert_eq!(report.errors.len(), blanks.iter().filter(|b| **b).count());
    }

    #[test]
    fn duplicate_sequence_numbers_report_a_single_error(
        numbers in prop::collection::vec(1u32..5, 1..6),
    ) {
        let mut form = common::open(ProcessSequenceForm);
        for _ in 1..numbers.len() {
            form.append("stepGroups").unwrap();
        }
        for (index, number) in numbers.iter().enumerate() {
            let row = format!("stepGroups[{index}]");
            form.set_value(&format!("{row}.sequenceNumber"), json!(number.to_string())).unwrap();
            form.set_value(&format!("{row}.operationName"), json!("Op")).unwrap();
            form.set_value(&format!("{row}.workCenter"), json!("WC")).unwrap();
            form.set_value(&format!("{row}.cycleTimeMinutes"), json!("5")).unwrap();
        }

        let report = form.validate_all();
        let distinct: HashSet<_> = numbers.iter().collect();
        let group_errors = report
            .errors
            .keys()
            .filter(|path| path.to_string().starts_with("stepGroups"))
            .count();
        let expected = usize::from(distinct.len() != numbers.len());
        prop_assert_eq!(group_errors, expected);
    }
}
