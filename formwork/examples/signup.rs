//! A signup form driven from the terminal: field events, a trigger group,
//! a color list, and a submit that only goes through once the form is valid.
//!
//! Run with `cargo run -p formwork --example signup`; the engine's log goes to
//! `signup.log`.

use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use formwork::prelude::*;
use regex::Regex;
use serde_json::{Value, json};
use simplelog::{Config, LevelFilter, WriteLogger};

fn schema() -> FormResult<RuleSchema> {
    RuleSchema::builder()
        .field("name.first")
        .required("First name is required")
        .field("name.last")
        .required("Last name is required")
        .field("email")
        .required("Email is required")
        .email("That does not look like an email address")
        .field("password")
        .required("Choose a password")
        .min_length(8, "Use at least 8 characters")
        .pattern(Regex::new(r"\d").expect("static regex"), "Add a digit")
        .field("confirm")
        .equals_field("password", "Passwords do not match")
        .field("colors[].name")
        .required("Every color needs a name")
        .build()
}

fn print_field(form: &Form, name: &str) -> FormResult<()> {
    let field = form.field(name)?;
    let status = if field.valid { "ok" } else { "INVALID" };
    println!(
        "  {:<12} {:<8} touched={:<5} {}",
        name,
        status,
        field.touched,
        field.messages().join("; ")
    );
    Ok(())
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(log_file) = File::create("signup.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, Config::default(), log_file);
    }

    let submitter = SubmitFn(|value: Arc<Value>| async move {
        println!("  -> submitting {}", value);
        Ok::<_, SubmitFailure>(())
    });

    let form = Form::builder(json!({
        "name": {"first": "", "last": ""},
        "email": "",
        "password": "",
        "confirm": "",
        "colors": [{"name": "red"}],
    }))
    .validator(schema()?)
    .submitter(submitter)
    .field(FieldBinding::new("name.first")?.group("person"))
    .field(FieldBinding::new("name.last")?.group("person"))
    .field(
        FieldBinding::new("password")?
            .validates(["password", "confirm"])?
            .events(EventPolicy::fixed([EVENT_BLURRED])),
    )
    .field(FieldBinding::new("name")?)
    .build();

    let fields = ["name", "name.first", "name.last", "email", "password", "confirm"];

    println!("typing an email:");
    form.change("email", json!("ada@"))?;
    settle().await;
    print_field(&form, "email")?;

    println!("'next' button validates the person group:");
    form.trigger_group("person", "click")?;
    settle().await;
    for name in fields {
        print_field(&form, name)?;
    }

    println!("first submit:");
    match form.submit().await? {
        SubmitOutcome::Submitted => println!("  submitted"),
        SubmitOutcome::Invalid(errors) => println!("  blocked by {} invalid path(s)", errors.len()),
    }

    println!("fixing everything:");
    form.set_values([
        ("name.first", json!("Ada")),
        ("name.last", json!("Lovelace")),
        ("email", json!("ada@example.com")),
        ("password", json!("analytical1")),
        ("confirm", json!("analytical1")),
    ])?;
    form.push("colors", json!({"name": ""}))?;
    form.remove("colors", 1)?;
    form.validate_all().await?;
    for name in fields {
        print_field(&form, name)?;
    }

    println!("double-clicked submit:");
    let (a, b) = tokio::join!(form.submit(), form.submit());
    println!("  outcomes: {:?} / {:?}", a?, b?);
    println!("  meta: {:?}", form.submit_meta());

    Ok(())
}
