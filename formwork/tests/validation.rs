//! Tests for validation batching, ordering and failure handling.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use formwork::prelude::*;
use formwork::{OrchestratorPhase, ValidatorError};
use serde_json::{Value, json};

fn errors_for(pairs: &[(&str, &str)]) -> ErrorMap {
    let mut map = ErrorMap::new();
    for (path, message) in pairs {
        map.entry(Path::parse(path).unwrap())
            .or_insert_with(Vec::new)
            .push(FieldError::new(*message));
    }
    map
}

/// Records every target it is asked to validate; flags empty strings.
#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<ValidationTarget>>>,
}

impl Recorder {
    fn calls(&self) -> Vec<ValidationTarget> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl FormValidator for Recorder {
    async fn validate(
        &self,
        value: Arc<Value>,
        target: ValidationTarget,
    ) -> Result<ErrorMap, ValidatorError> {
        self.calls.lock().unwrap().push(target.clone());
        let mut errors = ErrorMap::new();
        if let Value::Object(fields) = value.as_ref() {
            for (key, v) in fields {
                let path = path!(key.as_str());
                if v == &json!("") && target.covers(&path) {
                    errors.insert(path, vec![FieldError::with_code("required", "required")]);
                }
            }
        }
        Ok(errors)
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn test_events_in_one_tick_share_one_call() {
    let recorder = Recorder::default();
    let form = Form::builder(json!({"a": "", "b": "", "c": "x"}))
        .validator(recorder.clone())
        .build();

    assert!(form.notify_event("a", EVENT_CHANGED).unwrap());
    assert!(form.notify_event("b", EVENT_BLURRED).unwrap());
    assert!(form.notify_event("a", EVENT_BLURRED).unwrap());
    assert_eq!(form.phase(), OrchestratorPhase::Collecting);

    settle().await;

    let calls = recorder.calls();
    assert_eq!(calls, vec![ValidationTarget::paths([path!("a"), path!("b")])]);
    assert_eq!(form.errors("a", ErrorPolicy::Exclusive).unwrap().len(), 1);
    assert_eq!(form.errors("b", ErrorPolicy::Exclusive).unwrap().len(), 1);
    assert_eq!(form.phase(), OrchestratorPhase::Idle);
}

#[tokio::test]
async fn test_whole_form_request_absorbs_the_batch() {
    let recorder = Recorder::default();
    let form = Form::builder(json!({"a": "", "b": ""}))
        .validator(recorder.clone())
        .build();

    form.notify_event("a", EVENT_CHANGED).unwrap();
    let result = form.validate_all().await.unwrap();

    assert_eq!(recorder.calls(), vec![ValidationTarget::All]);
    assert!(result.is_invalid());
    assert_eq!(result.errors().len(), 2);
}

#[tokio::test]
async fn test_separate_ticks_make_separate_calls() {
    let recorder = Recorder::default();
    let form = Form::builder(json!({"a": "x"})).validator(recorder.clone()).build();

    form.notify_event("a", EVENT_CHANGED).unwrap();
    settle().await;
    form.notify_event("a", EVENT_BLURRED).unwrap();
    settle().await;

    assert_eq!(recorder.calls().len(), 2);
}

#[tokio::test]
async fn test_revalidation_clears_fixed_errors() {
    let form = Form::builder(json!({"a": ""}))
        .validator(Recorder::default())
        .build();

    let result = form.validate(["a"]).await.unwrap();
    assert_eq!(
        result.first_invalid_path().map(ToString::to_string),
        Some("a".to_string())
    );

    form.set_value("a", json!("filled")).unwrap();
    let result = form.validate(["a"]).await.unwrap();
    assert!(result.is_valid());
    assert!(form.all_errors().is_empty());
}

/// Answers field requests slowly and whole-form requests quickly, or the
/// other way round.
fn timed_validator(field_ms: u64, field: ErrorMap, all_ms: u64, all: ErrorMap) -> impl FormValidator {
    ValidateFn(move |_value: Arc<Value>, target: ValidationTarget| {
        let (delay, result) = if target.is_all() {
            (all_ms, all.clone())
        } else {
            (field_ms, field.clone())
        };
        async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, ValidatorError>(result)
        }
    })
}

#[tokio::test]
async fn test_slow_field_result_does_not_overwrite_later_whole_form_result() {
    let validator = timed_validator(
        80,
        errors_for(&[("a", "stale")]),
        5,
        errors_for(&[("a", "fresh")]),
    );
    let form = Form::builder(json!({"a": ""})).validator(validator).build();

    form.trigger(["a"], EVENT_CHANGED).unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(form.phase(), OrchestratorPhase::Validating);

    form.validate_all().await.unwrap();
    assert_eq!(form.messages(["a"]).unwrap(), vec!["fresh".to_string()]);

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(form.messages(["a"]).unwrap(), vec!["fresh".to_string()]);
}

#[tokio::test]
async fn test_slow_whole_form_result_only_fills_untouched_paths() {
    let validator = timed_validator(
        5,
        ErrorMap::new(),
        80,
        errors_for(&[("a", "old"), ("b", "b is wrong")]),
    );
    let form = Form::builder(json!({"a": "", "b": ""})).validator(validator).build();

    let slow = {
        let form = form.clone();
        tokio::spawn(async move { form.validate_all().await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    let fast = form.validate(["a"]).await.unwrap();
    assert!(fast.is_valid());

    let slow = slow.await.unwrap().unwrap();
    assert!(form.errors("a", ErrorPolicy::Exclusive).unwrap().is_empty());
    assert_eq!(form.messages(["b"]).unwrap(), vec!["b is wrong".to_string()]);
    assert_eq!(slow.errors().len(), 1);
}

#[tokio::test]
async fn test_validator_failure_keeps_previous_errors() {
    let form = Form::builder(json!({"a": ""}))
        .validator(ValidateFn(|_: Arc<Value>, _: ValidationTarget| async {
            Err::<ErrorMap, _>(ValidatorError::new("schema service unavailable"))
        }))
        .default_errors(errors_for(&[("a", "known bad")]))
        .build();

    let err = form.validate(["a"]).await.unwrap_err();
    assert_eq!(
        err,
        FormError::Validation(ValidatorError::new("schema service unavailable"))
    );
    assert_eq!(form.messages(["a"]).unwrap(), vec!["known bad".to_string()]);
    assert_eq!(form.phase(), OrchestratorPhase::Idle);

    // still usable afterwards
    assert!(form.notify_event("a", EVENT_CHANGED).unwrap());
}

#[tokio::test]
async fn test_reset_discards_results_in_flight() {
    let validator = timed_validator(30, errors_for(&[("a", "late")]), 30, ErrorMap::new());
    let form = Form::builder(json!({"a": ""})).validator(validator).build();

    form.trigger(["a"], EVENT_CHANGED).unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    form.reset(json!({"a": "new"}));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(form.all_errors().is_empty());
    assert!(!form.touched("a").unwrap());
}

#[tokio::test]
async fn test_empty_validate_is_valid() {
    let recorder = Recorder::default();
    let form = Form::builder(json!({})).validator(recorder.clone()).build();

    let result = form.validate(Vec::<Path>::new()).await.unwrap();
    assert!(result.is_valid());
    assert!(recorder.calls().is_empty());
}

#[test]
fn test_events_need_a_runtime() {
    let form = Form::new(json!({"a": ""}));
    assert_eq!(form.notify_event("a", EVENT_CHANGED), Err(FormError::NoRuntime));
    assert!(!form.touched("a").unwrap());
}

#[tokio::test(flavor = "current_thread")]
async fn test_back_to_back_events_always_share_a_call() {
    let recorder = Recorder::default();
    let form = Form::builder(json!({"a": "", "b": ""}))
        .validator(recorder.clone())
        .build();

    for round in 1..=100 {
        form.notify_event("a", EVENT_CHANGED).unwrap();
        form.notify_event("b", EVENT_CHANGED).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(recorder.calls().len(), round);
    }
    assert!(
        recorder
            .calls()
            .iter()
            .all(|target| *target == ValidationTarget::paths([path!("a"), path!("b")]))
    );
}

#[tokio::test]
async fn test_validate_marks_paths_touched() {
    let form = Form::builder(json!({"a": "", "b": ""}))
        .validator(Recorder::default())
        .build();

    form.validate(["a"]).await.unwrap();

    assert!(form.touched("a").unwrap());
    assert!(!form.touched("b").unwrap());
}

#[test]
fn test_validate_needs_a_runtime() {
    let form = Form::new(json!({"a": ""}));
    let result = futures::executor::block_on(form.validate(["a"]));
    assert_eq!(result.unwrap_err(), FormError::NoRuntime);
    assert!(!form.touched("a").unwrap());
}
