use asl::{
    ChoiceStateBuilder, Condition, IntrinsicRegistry, LeafOperator, Operand, PassStateBuilder,
    StateMachineBuilder, StatesLanguageError, SucceedStateBuilder, TriState,
};
use serde_json::json;

#[test]
fn s1_validation_catches_unreachable_start() {
    let doc = r#"{"StartAt":"X","States":{"Y":{"Type":"Succeed"}}}"#;
    let err = asl::parse_and_validate(doc).unwrap_err();
    match err {
        StatesLanguageError::Validation { violations } => {
            assert!(violations.iter().any(|v| v.path.ends_with("StartAt")));
        }
        other => panic!("expected Validation error, got {other:?}"),
    }
}

#[test]
fn s2_choice_order_first_match_wins() {
    let input = json!({"v": 5});
    let less_than_10 = Condition::leaf(
        LeafOperator::NumericLessThan,
        "$.v",
        Some(Operand::NumberLit(10.into())),
    );
    let less_than_100 = Condition::leaf(
        LeafOperator::NumericLessThan,
        "$.v",
        Some(Operand::NumberLit(100.into())),
    );

    let machine = StateMachineBuilder::new()
        .start_at("Check")
        .state(
            "Check",
            ChoiceStateBuilder::new()
                .choice(less_than_10, "A")
                .choice(less_than_100, "B")
                .default_next("D")
                .build(),
        )
        .state("A", SucceedStateBuilder::new().build())
        .state("B", SucceedStateBuilder::new().build())
        .state("D", SucceedStateBuilder::new().build())
        .build()
        .unwrap();

    let choice_state = match machine.states.get("Check").unwrap() {
        asl::State::Choice(c) => c,
        _ => unreachable!(),
    };

    let selected = asl::condition_eval::dispatch_choice(choice_state, &input).unwrap();

    assert_eq!(selected, "A");
}

#[test]
fn s3_result_path_creates_nested_skeleton() {
    let input = json!({"a": 1});
    let result = json!(42);
    let output = asl::io::merge_result_path(&input, &TriState::Value("$.b.c".to_string()), &result).unwrap();
    assert_eq!(output, json!({"a": 1, "b": {"c": 42}}));

    let final_output = asl::io::effective_output(&TriState::Unset, &output).unwrap();
    assert_eq!(final_output, output);
}

#[test]
fn s4_parameters_dollar_dollar_with_context_and_intrinsic() {
    let registry = IntrinsicRegistry::with_standard_functions();
    let input = json!({"n": [1, 2, 3]});
    let context = json!({"ExecutionId": "e-1"});
    let template = json!({
        "who.$": "$.n",
        "run.$": "$$.ExecutionId",
        "len.$": "States.ArrayLength($.n)",
    });
    let result = asl::io::apply_payload_template(Some(&template), &input, &context, &registry).unwrap();
    assert_eq!(
        result,
        json!({"who": [1, 2, 3], "run": "e-1", "len": 3})
    );
}

#[test]
fn s5_fail_path_type_check() {
    let input = json!({"msg": 42});
    let err = asl::io::fail_field(None, Some("$.msg"), &input).unwrap_err();
    assert!(matches!(err, StatesLanguageError::PathMatchFailure { .. }));
}

#[test]
fn s6_states_format() {
    let registry = IntrinsicRegistry::with_standard_functions();
    let input = json!({"name": "Grace", "age": 84});
    let result = registry
        .evaluate("States.Format('Hi {} you are {}', $.name, $.age)", &input)
        .unwrap();
    assert_eq!(result, json!("Hi Grace you are 84"));
}

#[test]
fn builder_round_trips_through_serde() {
    let machine = StateMachineBuilder::new()
        .start_at("Start")
        .state("Start", PassStateBuilder::new().result(json!({"ok": true})).end().build())
        .build()
        .unwrap();
    let text = asl::to_json(&machine).unwrap();
    let reparsed = asl::parse_and_validate(&text).unwrap();
    assert_eq!(machine, reparsed);
}
