use serde_json::{Value as Json, json};

use kconfig_tools::config::DefaultsPolicy;
use kconfig_tools::report::Verbosity;
use kconfig_tools::server::Session;
use kconfig_tools::world::World;

const KCONFIG: &str = "\
config A
    bool \"A\"
    default y

config B
    int \"B\"
    depends on A
    range 0 100
    default 42 if A
    default 0

choice
    prompt \"mode\"

config M1
    bool \"1\"

config M2
    bool \"2\"

endchoice
";

fn session() -> Session {
    let world = World::from_source(KCONFIG).unwrap();
    Session::new(
        world,
        None,
        None,
        DefaultsPolicy::Sdkconfig,
        Verbosity::Quiet,
    )
}

fn to_json(response: &kconfig_tools::server::Response) -> Json {
    serde_json::to_value(response).unwrap()
}

#[test]
fn initial_message_carries_the_full_state() {
    let mut session = session();
    let initial = to_json(&session.initial_message());

    assert_eq!(initial["version"], json!(3));
    assert_eq!(initial["values"]["A"], json!(true));
    assert_eq!(initial["values"]["B"], json!(42));
    assert_eq!(initial["values"]["M1"], json!(true));
    assert_eq!(initial["values"]["M2"], json!(false));
    assert_eq!(initial["visible"]["A"], json!(true));
    assert_eq!(initial["defaults"]["A"], json!(true));
    assert_eq!(initial["ranges"]["B"], json!([0, 100]));
    assert!(initial.get("error").is_none());
}

#[test]
fn set_applies_changes_and_reports_unknown_symbols() {
    let mut session = session();
    let _ = session.initial_message();

    let response = to_json(&session.handle_line(r#"{"version":3,"set":{"A":true,"UNKNOWN":1}}"#));
    assert_eq!(response["error"], json!(["Unknown symbol: UNKNOWN"]));
    // A was already y by default; the user write changes only `defaults`.
    assert_eq!(response["defaults"]["A"], json!(false));
}

#[test]
fn responses_carry_only_changes() {
    let mut session = session();
    let _ = session.initial_message();

    let response = to_json(&session.handle_line(r#"{"version":2,"set":{"A":false}}"#));
    assert_eq!(response["version"], json!(2));
    assert_eq!(response["values"]["A"], json!(false));
    // B falls back to its unconditional default and loses its visibility.
    assert_eq!(response["values"]["B"], json!(0));
    assert_eq!(response["visible"]["B"], json!(false));
    // The untouched choice members do not reappear.
    assert!(response["values"].get("M1").is_none());

    // A second identical write changes nothing.
    let response = to_json(&session.handle_line(r#"{"version":2,"set":{"A":false}}"#));
    assert!(response.get("values").is_none());
    assert!(response.get("visible").is_none());
}

#[test]
fn choice_member_switch_is_reflected_in_the_delta() {
    let mut session = session();
    let _ = session.initial_message();

    let response = to_json(&session.handle_line(r#"{"version":3,"set":{"M2":true}}"#));
    assert_eq!(response["values"]["M1"], json!(false));
    assert_eq!(response["values"]["M2"], json!(true));
}

#[test]
fn unsupported_version_is_an_error_and_mutates_nothing() {
    let mut session = session();
    let _ = session.initial_message();

    let response = to_json(&session.handle_line(r#"{"version":9,"set":{"A":false}}"#));
    let error = response["error"][0].as_str().unwrap();
    assert!(error.contains("Unsupported protocol version 9"));
    assert!(error.contains("1, 2, 3"));
    assert!(response.get("values").is_none());

    // The rejected set was not applied.
    let response = to_json(&session.handle_line(r#"{"version":3,"set":{}}"#));
    assert!(response.get("values").is_none());
}

#[test]
fn malformed_json_is_an_error_and_mutates_nothing() {
    let mut session = session();
    let _ = session.initial_message();

    let response = to_json(&session.handle_line("{not json"));
    assert!(response["error"][0].as_str().unwrap().contains("Invalid request"));

    let response = to_json(&session.handle_line(r#"{"version":3}"#));
    assert!(response.get("values").is_none());
}

#[test]
fn reset_reverts_to_computed_defaults() {
    let mut session = session();
    let _ = session.initial_message();

    let response = to_json(&session.handle_line(r#"{"version":3,"set":{"B":7}}"#));
    assert_eq!(response["values"]["B"], json!(7));
    assert_eq!(response["defaults"]["B"], json!(false));

    let response = to_json(&session.handle_line(r#"{"version":3,"reset":["B"]}"#));
    assert_eq!(response["values"]["B"], json!(42));
    assert_eq!(response["defaults"]["B"], json!(true));

    let response = to_json(&session.handle_line(r#"{"version":3,"reset":["all"]}"#));
    assert!(response.get("error").is_none(), "{response}");
}

#[test]
fn reset_of_an_unknown_name_is_reported() {
    let mut session = session();
    let _ = session.initial_message();

    let response = to_json(&session.handle_line(r#"{"version":3,"reset":["NOPE"]}"#));
    assert_eq!(response["error"], json!(["Unknown symbol or menu: NOPE"]));
}

#[test]
fn out_of_range_set_is_clamped() {
    let mut session = session();
    let _ = session.initial_message();

    let response = to_json(&session.handle_line(r#"{"version":3,"set":{"B":1000}}"#));
    assert_eq!(response["values"]["B"], json!(100));
}

#[test]
fn warnings_appear_in_the_initial_message() {
    let src = "\
config OLD_API
    bool \"old api\"
    default y
    warning \"OLD_API is deprecated\" if OLD_API
";
    let world = World::from_source(src).unwrap();
    let mut session = Session::new(
        world,
        None,
        None,
        DefaultsPolicy::Sdkconfig,
        Verbosity::Quiet,
    );
    let initial = to_json(&session.initial_message());
    assert_eq!(
        initial["warnings"]["OLD_API"],
        json!("OLD_API is deprecated")
    );
}
