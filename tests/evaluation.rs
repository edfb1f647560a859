use kconfig_tools::eval::Bounds;
use kconfig_tools::report::Category;
use kconfig_tools::symbol::{Origin, Tristate, Value};
use kconfig_tools::world::World;

fn y() -> Value {
    Value::Tristate(Tristate::Y)
}

fn n() -> Value {
    Value::Tristate(Tristate::N)
}

#[test]
fn conditional_defaults_follow_dependencies() {
    let src = "\
config A
    bool \"A\"
    default y

config B
    int \"B\"
    depends on A
    default 42 if A
    default 0
";
    let mut world = World::from_source(src).unwrap();
    let a = world.defined_sym_id("A").unwrap();
    let b = world.defined_sym_id("B").unwrap();

    assert_eq!(world.value(a), y());
    assert_eq!(world.value(b), Value::Int(42));
    assert!(world.visible(b));

    world
        .set_user_value("A", "n", Origin::CommandLine, false)
        .unwrap();
    assert_eq!(world.value(a), n());
    assert_eq!(world.value(b), Value::Int(0));
    assert!(!world.visible(b));
}

#[test]
fn select_forces_y_and_warns_about_unmet_deps() {
    let src = "\
config OTHER
    bool
    default n

config SRC
    bool
    default y
    select TGT

config TGT
    bool \"T\"
    depends on OTHER
";
    let mut world = World::from_source(src).unwrap();
    let tgt = world.defined_sym_id("TGT").unwrap();

    assert_eq!(world.value(tgt), y());
    assert!(
        world
            .report
            .diagnostics()
            .iter()
            .any(|d| d.category == Category::ReverseDepOverride && d.message.contains("TGT")),
        "expected a reverse-dependency override warning"
    );
    // Forced y, but not visible: its dependencies are still unmet.
    assert!(!world.visible(tgt));
}

#[test]
fn imply_respects_direct_dependencies() {
    let src = "\
config SRC
    bool
    default y
    imply TGT

config OTHER
    bool \"O\"
    default n

config TGT
    bool \"T\"
    depends on OTHER
";
    let mut world = World::from_source(src).unwrap();
    let tgt = world.defined_sym_id("TGT").unwrap();

    assert_eq!(world.value(tgt), n());

    world
        .set_user_value("OTHER", "y", Origin::CommandLine, false)
        .unwrap();
    assert_eq!(world.value(tgt), y());
}

#[test]
fn set_overrides_defaults_when_source_is_enabled() {
    let src = "\
config MODE
    bool \"Mode\"
    default n
    set SPEED=9600 if MODE

config SPEED
    int \"Speed\"
    default 115200
";
    let mut world = World::from_source(src).unwrap();
    let speed = world.defined_sym_id("SPEED").unwrap();

    assert_eq!(world.value(speed), Value::Int(115200));

    world
        .set_user_value("MODE", "y", Origin::CommandLine, false)
        .unwrap();
    assert_eq!(world.value(speed), Value::Int(9600));

    // An explicit user decision outranks `set`.
    world
        .set_user_value("SPEED", "4800", Origin::CommandLine, false)
        .unwrap();
    assert_eq!(world.value(speed), Value::Int(4800));
}

#[test]
fn set_default_loses_to_user_but_beats_kconfig_default() {
    let src = "\
config PROFILE
    bool \"Profile\"
    default y
    set default TIMEOUT=30

config TIMEOUT
    int \"Timeout\"
    default 10
";
    let mut world = World::from_source(src).unwrap();
    let timeout = world.defined_sym_id("TIMEOUT").unwrap();

    assert_eq!(world.value(timeout), Value::Int(30));

    world
        .set_user_value("TIMEOUT", "99", Origin::CommandLine, false)
        .unwrap();
    assert_eq!(world.value(timeout), Value::Int(99));

    let id = world.defined_sym_id("TIMEOUT").unwrap();
    world.reset_symbol(id);
    assert_eq!(world.value(timeout), Value::Int(30));
}

#[test]
fn values_are_clamped_to_the_active_range() {
    let src = "\
config N
    int \"N\"
    range 1 10
    default 50
";
    let mut world = World::from_source(src).unwrap();
    let id = world.defined_sym_id("N").unwrap();

    assert_eq!(world.active_range(id), Some(Bounds::Int(1, 10)));
    assert_eq!(world.value(id), Value::Int(10));
    assert!(
        world
            .report
            .diagnostics()
            .iter()
            .any(|d| d.category == Category::RangeViolation)
    );

    world
        .set_user_value("N", "0", Origin::CommandLine, false)
        .unwrap();
    assert_eq!(world.value(id), Value::Int(1));
}

#[test]
fn conditional_ranges_switch_with_state() {
    let src = "\
config WIDE
    bool \"wide\"
    default n

config N
    int \"N\"
    range 1 10 if !WIDE
    range 1 1000
    default 5
";
    let mut world = World::from_source(src).unwrap();
    let id = world.defined_sym_id("N").unwrap();
    assert_eq!(world.active_range(id), Some(Bounds::Int(1, 10)));

    world
        .set_user_value("WIDE", "y", Origin::CommandLine, false)
        .unwrap();
    assert_eq!(world.active_range(id), Some(Bounds::Int(1, 1000)));
}

#[test]
fn choice_selects_first_visible_member_without_defaults() {
    let src = "\
choice
    prompt \"c\"

config M1
    bool \"1\"

config M2
    bool \"2\"

endchoice
";
    let mut world = World::from_source(src).unwrap();
    let m1 = world.defined_sym_id("M1").unwrap();
    let m2 = world.defined_sym_id("M2").unwrap();

    assert_eq!(world.value(m1), y());
    assert_eq!(world.value(m2), n());

    world
        .set_user_value("M2", "y", Origin::CommandLine, false)
        .unwrap();
    assert_eq!(world.value(m1), n());
    assert_eq!(world.value(m2), y());
}

#[test]
fn choice_honors_choice_level_default() {
    let src = "\
choice
    prompt \"c\"
    default M2

config M1
    bool \"1\"

config M2
    bool \"2\"

endchoice
";
    let mut world = World::from_source(src).unwrap();
    let m1 = world.defined_sym_id("M1").unwrap();
    let m2 = world.defined_sym_id("M2").unwrap();
    assert_eq!(world.value(m1), n());
    assert_eq!(world.value(m2), y());
}

#[test]
fn disabling_the_selected_member_is_rejected() {
    let src = "\
choice
    prompt \"c\"

config M1
    bool \"1\"

config M2
    bool \"2\"

endchoice
";
    let mut world = World::from_source(src).unwrap();
    let err = world
        .set_user_value("M1", "n", Origin::CommandLine, false)
        .unwrap_err();
    assert!(err.contains("selected member"), "{err}");

    let m1 = world.defined_sym_id("M1").unwrap();
    assert_eq!(world.value(m1), y());
}

#[test]
fn choice_with_all_members_disabled_is_deselected() {
    let src = "\
config GATE
    bool \"gate\"
    default n

choice
    prompt \"c\"

config M1
    bool \"1\"
    depends on GATE

config M2
    bool \"2\"
    depends on GATE

endchoice
";
    let mut world = World::from_source(src).unwrap();
    let m1 = world.defined_sym_id("M1").unwrap();
    let m2 = world.defined_sym_id("M2").unwrap();
    assert_eq!(world.value(m1), n());
    assert_eq!(world.value(m2), n());
}

#[test]
fn self_referential_default_terminates() {
    let src = "\
config A
    bool \"a\"
    default A if A
";
    let mut world = World::from_source(src).unwrap();
    let a = world.defined_sym_id("A").unwrap();
    assert_eq!(world.value(a), n());
}

#[test]
fn menu_visible_if_hides_but_does_not_change_semantics() {
    let src = "\
config SHOW
    bool \"show\"
    default n

menu \"Hidden\"
    visible if SHOW

config INSIDE
    bool \"inside\"
    default y

endmenu
";
    let mut world = World::from_source(src).unwrap();
    let inside = world.defined_sym_id("INSIDE").unwrap();

    assert!(!world.visible(inside));
    assert_eq!(world.value(inside), y());

    world
        .set_user_value("SHOW", "y", Origin::CommandLine, false)
        .unwrap();
    assert!(world.visible(inside));
}

#[test]
fn undefined_reference_warns_once_and_reads_as_n() {
    let src = "\
config A
    bool \"a\"
    depends on NOPE
    default y
";
    let mut world = World::from_source(src).unwrap();
    let a = world.defined_sym_id("A").unwrap();
    assert_eq!(world.value(a), n());
    assert!(!world.visible(a));

    let count = |world: &World| {
        world
            .report
            .diagnostics()
            .iter()
            .filter(|d| d.category == Category::UndefinedSymbol)
            .count()
    };
    let first = count(&world);
    assert_eq!(first, 1);
    let _ = world.value(a);
    assert_eq!(count(&world), first);
}

#[test]
fn visibility_implies_dependencies_hold() {
    let src = "\
config A
    bool \"a\"
    default n

config B
    bool \"b\"
    depends on A
";
    let mut world = World::from_source(src).unwrap();
    let b = world.defined_sym_id("B").unwrap();
    assert!(!world.visible(b));
    world
        .set_user_value("A", "y", Origin::CommandLine, false)
        .unwrap();
    assert!(world.visible(b));
}

#[test]
fn reevaluation_is_idempotent() {
    let src = "\
config A
    bool \"a\"
    default y

config B
    int \"b\"
    depends on A
    default 7
";
    let mut world = World::from_source(src).unwrap();
    world.refresh();
    let a = world.defined_sym_id("A").unwrap();
    let b = world.defined_sym_id("B").unwrap();
    let before = (world.value(a), world.value(b), world.visible(b));
    world.refresh();
    let after = (world.value(a), world.value(b), world.visible(b));
    assert_eq!(before, after);
}

#[test]
fn warning_option_activates_with_its_condition() {
    let src = "\
config OLD_API
    bool \"old api\"
    default y
    warning \"OLD_API is deprecated\" if OLD_API
";
    let mut world = World::from_source(src).unwrap();
    let id = world.defined_sym_id("OLD_API").unwrap();
    assert_eq!(
        world.active_warning(id).as_deref(),
        Some("OLD_API is deprecated")
    );

    world
        .set_user_value("OLD_API", "n", Origin::CommandLine, false)
        .unwrap();
    assert_eq!(world.active_warning(id), None);
}

#[test]
fn string_and_numeric_comparisons() {
    let src = "\
config NAME
    string \"name\"
    default \"linux\"

config LEVEL
    int \"level\"
    default 5

config BY_NAME
    bool \"by name\"
    default y if NAME = \"linux\"

config BY_LEVEL
    bool \"by level\"
    default y if LEVEL > 3

config BY_BOOL
    bool \"legacy bool compare\"
    default y if BY_NAME = 2
";
    let mut world = World::from_source(src).unwrap();
    let by_name = world.defined_sym_id("BY_NAME").unwrap();
    let by_level = world.defined_sym_id("BY_LEVEL").unwrap();
    let by_bool = world.defined_sym_id("BY_BOOL").unwrap();
    assert_eq!(world.value(by_name), y());
    assert_eq!(world.value(by_level), y());
    // Legacy coercion: y compares as 2.
    assert_eq!(world.value(by_bool), y());
}
