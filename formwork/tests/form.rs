//! Tests for the form surface: bindings, events, groups and notifications.

use std::time::Duration;

use formwork::prelude::*;
use formwork::SubmitMeta;
use serde_json::json;

fn schema() -> RuleSchema {
    RuleSchema::builder()
        .field("name.first")
        .required("First name is required")
        .field("name.last")
        .required("Last name is required")
        .field("email")
        .required("Email is required")
        .email("Invalid email")
        .build()
        .unwrap()
}

fn blank() -> serde_json::Value {
    json!({"name": {"first": "", "last": ""}, "email": ""})
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn test_change_validates_and_touches_field() {
    let form = Form::builder(blank()).validator(schema()).build();

    assert!(form.change("name.first", json!("")).unwrap());
    settle().await;

    let field = form.field("name.first").unwrap();
    assert!(field.touched);
    assert!(field.invalid);
    assert_eq!(field.messages(), vec!["First name is required".to_string()]);
    // untouched siblings were not validated
    assert!(form.field("name.last").unwrap().valid);
    assert!(!form.touched("name.last").unwrap());
}

#[tokio::test]
async fn test_validates_override_replaces_self() {
    let form = Form::builder(blank())
        .validator(schema())
        .field(
            FieldBinding::new("name.first")
                .unwrap()
                .validates(["name.first", "name.last"])
                .unwrap(),
        )
        .build();

    form.notify_event("name.first", EVENT_BLURRED).unwrap();
    settle().await;

    assert_eq!(form.all_errors().len(), 2);
    assert!(form.touched("name.last").unwrap());
}

#[tokio::test]
async fn test_inclusive_group_field_sees_child_errors() {
    let form = Form::builder(blank())
        .validator(schema())
        .field(FieldBinding::new("name").unwrap())
        .field(FieldBinding::new("email").unwrap().exclusive(true))
        .build();

    form.validate_all().await.unwrap();

    let name = form.field("name").unwrap();
    assert_eq!(name.errors.len(), 2);
    assert!(name.invalid);
    assert!(form.errors("name", ErrorPolicy::Exclusive).unwrap().is_empty());

    let email = form.field("email").unwrap();
    assert_eq!(email.errors.len(), 1);
    assert_eq!(email.errors[0].code.as_deref(), Some("required"));
}

#[tokio::test]
async fn test_exclusive_binding_hides_descendants() {
    let form = Form::builder(blank())
        .validator(schema())
        .field(FieldBinding::new("name").unwrap().exclusive(true))
        .build();

    form.validate_all().await.unwrap();
    assert!(form.field("name").unwrap().valid);
}

#[tokio::test]
async fn test_fixed_events_and_no_validate() {
    let form = Form::builder(blank())
        .validator(schema())
        .field(
            FieldBinding::new("email")
                .unwrap()
                .events(EventPolicy::fixed(["blurred"])),
        )
        .field(FieldBinding::new("name.first").unwrap().no_validate(true))
        .build();

    assert!(!form.notify_event("email", EVENT_CHANGED).unwrap());
    assert!(form.notify_event("email", EVENT_BLURRED).unwrap());
    assert!(!form.notify_event("name.first", EVENT_CHANGED).unwrap());
    settle().await;

    assert!(form.touched("email").unwrap());
    assert!(!form.touched("name.first").unwrap());
    assert_eq!(form.all_errors().len(), 1);
}

#[tokio::test]
async fn test_form_level_no_validate_can_be_overridden() {
    let form = Form::builder(blank())
        .validator(schema())
        .config(FormConfig::new().with_no_validate(true))
        .field(FieldBinding::new("email").unwrap().no_validate(false))
        .build();

    assert!(!form.notify_event("name.first", EVENT_CHANGED).unwrap());
    assert!(form.notify_event("email", EVENT_CHANGED).unwrap());
}

#[tokio::test]
async fn test_dynamic_events_follow_field_state() {
    // validate on blur until the field is invalid, then on every change
    let policy = EventPolicy::dynamic(|field: &FieldState| {
        if field.invalid {
            vec![EVENT_CHANGED.to_string()]
        } else {
            vec![EVENT_BLURRED.to_string()]
        }
    });
    let form = Form::builder(blank())
        .validator(schema())
        .field(FieldBinding::new("email").unwrap().events(policy))
        .build();

    assert!(!form.change("email", json!("nope")).unwrap());
    assert!(form.notify_event("email", EVENT_BLURRED).unwrap());
    settle().await;
    assert!(form.field("email").unwrap().invalid);

    assert!(form.change("email", json!("ada@example.com")).unwrap());
    settle().await;
    assert!(form.field("email").unwrap().valid);
}

#[tokio::test]
async fn test_trigger_groups() {
    let form = Form::builder(blank())
        .validator(schema())
        .field(FieldBinding::new("name.first").unwrap().group("person"))
        .field(FieldBinding::new("name.last").unwrap().group("person"))
        .field(FieldBinding::new("email").unwrap().group("contact"))
        .build();

    assert!(form.trigger_group("person", "click").unwrap());
    assert!(!form.trigger_group("nobody", "click").unwrap());
    settle().await;

    let errors = form.all_errors();
    assert_eq!(errors.len(), 2);
    assert!(!errors.contains_key(&path!("email")));

    assert!(form.trigger_group("@all", "click").unwrap());
    settle().await;
    assert_eq!(form.all_errors().len(), 3);
    assert!(form.touched("email").unwrap());
}

#[tokio::test]
async fn test_set_values_writes_several_paths() {
    let form = Form::new(json!({}));
    let mut events = form.subscribe();

    let written = form
        .set_values([("name.first", json!("Ada")), ("name.last", json!("Lovelace"))])
        .unwrap();

    assert_eq!(written, vec![path!("name", "first"), path!("name", "last")]);
    assert_eq!(
        *form.value(),
        json!({"name": {"first": "Ada", "last": "Lovelace"}})
    );
    assert_eq!(
        events.try_recv().unwrap(),
        FormEvent::ValueChanged {
            form: form.id(),
            paths: written,
        }
    );
}

#[test]
fn test_bad_write_changes_nothing() {
    let form = Form::new(json!({"list": [1, 2]}));
    let before = form.value();

    let err = form
        .set_values([("ok", json!(1)), ("list.name", json!(2))])
        .unwrap_err();

    assert!(err.is_invalid_path());
    assert_eq!(form.value(), before);
    assert!(form.set_value("a..b", json!(1)).unwrap_err().is_invalid_path());
}

#[test]
fn test_messages_are_unique_and_joined() {
    let mut defaults = ErrorMap::new();
    defaults.insert(path!("a"), vec![FieldError::new("required")]);
    defaults.insert(path!("b", "x"), vec![FieldError::new("required")]);
    defaults.insert(path!("b", "y"), vec![FieldError::new("too short")]);
    let form = Form::builder(json!({})).default_errors(defaults).build();

    assert_eq!(
        form.messages(["a", "b"]).unwrap(),
        vec!["required".to_string(), "too short".to_string()]
    );
}

#[tokio::test]
async fn test_notifications() {
    let form = Form::builder(blank()).validator(schema()).build();
    let mut events = form.subscribe();

    form.notify_event("email", EVENT_BLURRED).unwrap();
    settle().await;
    form.reset(blank());

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    let id = form.id();
    assert_eq!(
        seen,
        vec![
            FormEvent::Touched {
                form: id,
                paths: vec![path!("email")],
            },
            FormEvent::ErrorsChanged {
                form: id,
                paths: vec![path!("email")],
            },
            FormEvent::Reset { form: id },
        ]
    );
}

#[test]
fn test_reset_restores_a_clean_form() {
    let mut defaults = ErrorMap::new();
    defaults.insert(path!("a"), vec![FieldError::new("bad")]);
    let form = Form::builder(json!({"a": 1})).default_errors(defaults).build();

    form.reset(json!({"a": 2}));

    assert!(form.is_valid());
    assert_eq!(form.get("a").unwrap(), Some(json!(2)));
    assert_eq!(form.submit_meta(), SubmitMeta::default());
}

#[test]
fn test_config_from_json() {
    let config: FormConfig =
        serde_json::from_value(json!({"policy": "exclusive", "no_validate": true})).unwrap();
    assert_eq!(config.policy, ErrorPolicy::Exclusive);
    assert!(config.no_validate);
    assert_eq!(config.events, vec!["changed".to_string(), "blurred".to_string()]);
}
