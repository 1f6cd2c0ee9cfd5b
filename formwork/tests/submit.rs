//! Tests for the submission lifecycle.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use formwork::prelude::*;
use formwork::SubmitFailure;
use serde_json::{Value, json};

/// Counts calls, waits a little, then answers with `fail`.
fn counting_submitter(calls: Arc<AtomicUsize>, fail: Option<&'static str>) -> impl FormSubmitter {
    SubmitFn(move |_value: Arc<Value>| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            match fail {
                Some(message) => Err(SubmitFailure::new(message)),
                None => Ok(()),
            }
        }
    })
}

fn required_name() -> RuleSchema {
    RuleSchema::builder()
        .field("name")
        .required("Name is required")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_concurrent_submits_coalesce() {
    let calls = Arc::new(AtomicUsize::new(0));
    let form = Form::builder(json!({"name": "Ada"}))
        .validator(required_name())
        .submitter(counting_submitter(Arc::clone(&calls), None))
        .build();

    let (first, second) = tokio::join!(form.submit(), form.submit());

    assert_eq!(first.unwrap(), SubmitOutcome::Submitted);
    assert_eq!(second.unwrap(), SubmitOutcome::Submitted);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        form.submit_meta(),
        SubmitMeta {
            submitting: false,
            submit_count: 1,
            submit_attempts: 1,
        }
    );

    form.submit().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(form.submit_meta().submit_attempts, 2);
    assert_eq!(form.submit_meta().submit_count, 2);
}

#[tokio::test]
async fn test_invalid_form_is_not_submitted() {
    let calls = Arc::new(AtomicUsize::new(0));
    let form = Form::builder(json!({"name": ""}))
        .validator(required_name())
        .submitter(counting_submitter(Arc::clone(&calls), None))
        .build();

    let outcome = form.submit().await.unwrap();

    let SubmitOutcome::Invalid(errors) = outcome else {
        panic!("expected invalid outcome, got {outcome:?}");
    };
    assert_eq!(errors[&path!("name")][0].message, "Name is required");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let meta = form.submit_meta();
    assert!(!meta.submitting);
    assert_eq!(meta.submit_count, 0);
    assert_eq!(meta.submit_attempts, 1);
}

#[tokio::test]
async fn test_submit_failure_counts_attempt_only() {
    let calls = Arc::new(AtomicUsize::new(0));
    let form = Form::builder(json!({"name": "Ada"}))
        .submitter(counting_submitter(Arc::clone(&calls), Some("server said no")))
        .build();

    let err = form.submit().await.unwrap_err();

    assert_eq!(err, FormError::Submit(SubmitFailure::new("server said no")));
    let meta = form.submit_meta();
    assert!(!meta.submitting);
    assert_eq!(meta.submit_count, 0);
    assert_eq!(meta.submit_attempts, 1);
}

#[tokio::test]
async fn test_validator_failure_aborts_submit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let form = Form::builder(json!({"name": "Ada"}))
        .validator(ValidateFn(|_: Arc<Value>, _: ValidationTarget| async {
            Err::<ErrorMap, _>(ValidatorError::new("offline"))
        }))
        .submitter(counting_submitter(Arc::clone(&calls), None))
        .build();

    let err = form.submit().await.unwrap_err();

    assert!(matches!(err, FormError::Validation(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!form.submit_meta().submitting);
}

#[tokio::test]
async fn test_submitting_flag_is_visible_while_in_flight() {
    let calls = Arc::new(AtomicUsize::new(0));
    let form = Form::builder(json!({"name": "Ada"}))
        .submitter(counting_submitter(Arc::clone(&calls), None))
        .build();
    let mut events = form.subscribe();

    let pending = {
        let form = form.clone();
        tokio::spawn(async move { form.submit().await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(form.submit_meta().submitting);

    pending.await.unwrap().unwrap();

    let mut metas = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let FormEvent::SubmitChanged { meta, .. } = event {
            metas.push(meta);
        }
    }
    assert_eq!(metas.len(), 2);
    assert!(metas[0].submitting);
    assert!(!metas[1].submitting);
    assert_eq!(metas[1].submit_count, 1);
}

/// Takes 20ms per call and flags `a` when it is empty.
fn slow_required_a(calls: Arc<AtomicUsize>) -> impl FormValidator {
    ValidateFn(move |value: Arc<Value>, _: ValidationTarget| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let mut errors = ErrorMap::new();
            if value["a"] == json!("") {
                errors.insert(path!("a"), vec![FieldError::new("required")]);
            }
            Ok::<_, ValidatorError>(errors)
        }
    })
}

fn recording_submitter(seen: Arc<Mutex<Vec<Value>>>) -> impl FormSubmitter {
    SubmitFn(move |value: Arc<Value>| {
        let seen = Arc::clone(&seen);
        async move {
            seen.lock().unwrap().push((*value).clone());
            Ok::<_, SubmitFailure>(())
        }
    })
}

#[tokio::test]
async fn test_reset_during_submit_validation_abandons_attempt() {
    let validations = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let form = Form::builder(json!({"a": "ok"}))
        .validator(slow_required_a(Arc::clone(&validations)))
        .submitter(recording_submitter(Arc::clone(&seen)))
        .build();

    let pending = {
        let form = form.clone();
        tokio::spawn(async move { form.submit().await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    form.reset(json!({"a": ""}));

    assert_eq!(pending.await.unwrap(), Err(FormError::Reset));
    assert!(seen.lock().unwrap().is_empty());
    let meta = form.submit_meta();
    assert!(!meta.submitting);
    assert_eq!(meta.submit_count, 0);
}

#[tokio::test]
async fn test_edit_during_submit_validation_is_revalidated() {
    let validations = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let form = Form::builder(json!({"a": "ok"}))
        .validator(slow_required_a(Arc::clone(&validations)))
        .submitter(recording_submitter(Arc::clone(&seen)))
        .build();

    let pending = {
        let form = form.clone();
        tokio::spawn(async move { form.submit().await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    form.set_value("a", json!("")).unwrap();

    let outcome = pending.await.unwrap().unwrap();

    assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
    assert_eq!(validations.load(Ordering::SeqCst), 2);
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(form.submit_meta().submit_count, 0);
}

#[tokio::test]
async fn test_submitter_receives_the_validated_value() {
    let validations = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let form = Form::builder(json!({"a": "first"}))
        .validator(slow_required_a(Arc::clone(&validations)))
        .submitter(recording_submitter(Arc::clone(&seen)))
        .build();

    let pending = {
        let form = form.clone();
        tokio::spawn(async move { form.submit().await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    form.set_value("a", json!("second")).unwrap();

    assert_eq!(pending.await.unwrap(), Ok(SubmitOutcome::Submitted));
    assert_eq!(*seen.lock().unwrap(), vec![json!({"a": "second"})]);
    assert_eq!(form.submit_meta().submit_count, 1);
}

#[test]
fn test_submit_needs_a_runtime() {
    let form = Form::new(json!({}));
    let result = futures::executor::block_on(form.submit());
    assert_eq!(result, Err(FormError::NoRuntime));
    assert_eq!(form.submit_meta().submit_attempts, 0);
}
