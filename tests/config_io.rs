use pretty_assertions::assert_eq;
use tempfile::TempDir;

use kconfig_tools::config::{self, DefaultsPolicy};
use kconfig_tools::renames::RenameMap;
use kconfig_tools::report::Category;
use kconfig_tools::symbol::{Origin, Value};
use kconfig_tools::world::World;

const AB_KCONFIG: &str = "\
config A
    bool \"A\"
    default y

config B
    int \"B\"
    depends on A
    default 42 if A
    default 0
";

#[test]
fn user_set_n_disables_dependent_defaults() {
    let mut world = World::from_source(AB_KCONFIG).unwrap();
    config::load_config_str(
        &mut world,
        "CONFIG_A=n\n",
        Origin::PrimaryConfig,
        None,
        DefaultsPolicy::Sdkconfig,
    );

    let rendered = config::render_config(&mut world, None);
    assert!(rendered.contains("# CONFIG_A is not set\n"));
    assert!(!rendered.contains("# default:\n# CONFIG_A is not set\n"));
    assert!(rendered.contains("# default:\nCONFIG_B=0\n"));
}

#[test]
fn default_marked_entries_follow_the_kconfig_tree() {
    let mut world = World::from_source(AB_KCONFIG).unwrap();
    config::load_config_str(
        &mut world,
        "# default:\nCONFIG_A=y\n# default:\nCONFIG_B=42\n",
        Origin::PrimaryConfig,
        None,
        DefaultsPolicy::Sdkconfig,
    );

    let b = world.defined_sym_id("B").unwrap();
    assert_eq!(world.value(b), Value::Int(42));

    world
        .set_user_value("A", "n", Origin::CommandLine, false)
        .unwrap();

    let rendered = config::render_config(&mut world, None);
    assert!(rendered.contains("# CONFIG_A is not set\n"));
    assert!(!rendered.contains("# default:\n# CONFIG_A is not set\n"));
    assert!(rendered.contains("# default:\nCONFIG_B=0\n"));
}

#[test]
fn default_marker_is_preserved_until_the_user_writes() {
    let mut world = World::from_source(AB_KCONFIG).unwrap();
    config::load_config_str(
        &mut world,
        "# default:\nCONFIG_A=y\n",
        Origin::PrimaryConfig,
        None,
        DefaultsPolicy::Sdkconfig,
    );
    let rendered = config::render_config(&mut world, None);
    assert!(rendered.contains("# default:\nCONFIG_A=y\n"));

    world
        .set_user_value("A", "y", Origin::CommandLine, false)
        .unwrap();
    let rendered = config::render_config(&mut world, None);
    assert!(rendered.contains("\nCONFIG_A=y\n"));
    assert!(!rendered.contains("# default:\nCONFIG_A=y\n"));
}

#[test]
fn promptless_symbols_are_written_with_the_kconfig_default() {
    let src = "\
config X
    int
    default 100
";
    let mut world = World::from_source(src).unwrap();
    config::load_config_str(
        &mut world,
        "CONFIG_X=42\n",
        Origin::PrimaryConfig,
        None,
        DefaultsPolicy::Sdkconfig,
    );

    // The stored override is dropped with a (verbose-level) warning.
    assert!(
        world
            .report
            .diagnostics()
            .iter()
            .any(|d| d.category == Category::PromptlessMismatch)
    );
    let x = world.defined_sym_id("X").unwrap();
    assert_eq!(world.value(x), Value::Int(100));

    let rendered = config::render_config(&mut world, None);
    assert!(rendered.contains("# default:\nCONFIG_X=100\n"));
}

#[test]
fn kconfig_policy_adopts_the_tree_default() {
    let mut world = World::from_source(AB_KCONFIG).unwrap();
    config::load_config_str(
        &mut world,
        "# default:\nCONFIG_B=7\n",
        Origin::PrimaryConfig,
        None,
        DefaultsPolicy::Kconfig,
    );
    let b = world.defined_sym_id("B").unwrap();
    assert_eq!(world.value(b), Value::Int(42));
    assert!(
        world
            .report
            .diagnostics()
            .iter()
            .any(|d| d.category == Category::DefaultMismatch)
    );
}

#[test]
fn sdkconfig_policy_keeps_the_stored_default() {
    let mut world = World::from_source(AB_KCONFIG).unwrap();
    config::load_config_str(
        &mut world,
        "# default:\nCONFIG_B=7\n",
        Origin::PrimaryConfig,
        None,
        DefaultsPolicy::Sdkconfig,
    );
    let b = world.defined_sym_id("B").unwrap();
    assert_eq!(world.value(b), Value::Int(7));
}

#[test]
fn interactive_policy_reports_conflicts_to_the_caller() {
    let mut world = World::from_source(AB_KCONFIG).unwrap();
    let outcome = config::load_config_str(
        &mut world,
        "# default:\nCONFIG_B=7\n",
        Origin::PrimaryConfig,
        None,
        DefaultsPolicy::Interactive,
    );
    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].name, "B");
    assert_eq!(outcome.conflicts[0].stored, "7");
    assert_eq!(outcome.conflicts[0].kconfig, "42");
}

const FULL_KCONFIG: &str = "\
mainmenu \"Round Trip\"

config ENABLE
    bool \"enable\"
    default y

menu \"Tuning\"

config COUNT
    int \"count\"
    range 1 64
    default 8

config ADDR
    hex \"address\"
    default 0xff

config RATIO
    float \"ratio\"
    default 0.5

config LABEL
    string \"label\"
    default \"with \\\"quotes\\\" and \\\\slash\"

endmenu

choice
    prompt \"mode\"

config MODE_A
    bool \"mode a\"

config MODE_B
    bool \"mode b\"

endchoice

config INTERNAL
    int
    default 123
";

#[test]
fn hex_values_are_canonicalized_to_uppercase() {
    let mut world = World::from_source(FULL_KCONFIG).unwrap();
    let rendered = config::render_config(&mut world, None);
    assert!(rendered.contains("CONFIG_ADDR=0xFF\n"), "{rendered}");
}

#[test]
fn write_load_write_round_trips_byte_identical() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("sdkconfig");

    let mut world = World::from_source(FULL_KCONFIG).unwrap();
    world
        .set_user_value("COUNT", "16", Origin::CommandLine, false)
        .unwrap();
    world
        .set_user_value("MODE_B", "y", Origin::CommandLine, false)
        .unwrap();
    config::save_config(&mut world, &path, None).unwrap();
    let first = std::fs::read_to_string(&path).unwrap();

    let mut reloaded = World::from_source(FULL_KCONFIG).unwrap();
    config::load_config(
        &mut reloaded,
        &path,
        Origin::PrimaryConfig,
        None,
        DefaultsPolicy::Sdkconfig,
    )
    .unwrap();
    config::save_config(&mut reloaded, &path, None).unwrap();
    let second = std::fs::read_to_string(&path).unwrap();

    assert_eq!(first, second);
    assert!(first.contains("CONFIG_COUNT=16\n"));
    assert!(first.contains("# default:\n# CONFIG_MODE_A is not set\n"));
    assert!(first.contains("CONFIG_MODE_B=y\n"));
    assert!(first.contains("# default:\nCONFIG_INTERNAL=123\n"));
    // Menu banner in traversal order.
    assert!(first.contains("#\n# Tuning\n#\n"));
    assert!(first.ends_with('\n'));
}

#[test]
fn deprecated_section_keeps_old_names_alive() {
    let renames = RenameMap::parse_str("OLD_ENABLE ENABLE\n").unwrap();
    let mut world = World::from_source(FULL_KCONFIG).unwrap();

    let rendered = config::render_config(&mut world, Some(&renames));
    assert!(rendered.contains("# Deprecated options for backward compatibility\n"));
    assert!(rendered.contains("CONFIG_OLD_ENABLE=y\n"));
    assert!(rendered.contains("# End of deprecated options\n"));

    // A config written against the old name still loads.
    let mut world2 = World::from_source(FULL_KCONFIG).unwrap();
    config::load_config_str(
        &mut world2,
        "# CONFIG_OLD_ENABLE is not set\n",
        Origin::PrimaryConfig,
        Some(&renames),
        DefaultsPolicy::Sdkconfig,
    );
    let enable = world2.defined_sym_id("ENABLE").unwrap();
    assert_eq!(
        world2.value(enable),
        Value::Tristate(kconfig_tools::symbol::Tristate::N)
    );
}

#[test]
fn deprecated_section_round_trips() {
    let renames = RenameMap::parse_str("OLD_ENABLE ENABLE\n").unwrap();
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("sdkconfig");

    let mut world = World::from_source(FULL_KCONFIG).unwrap();
    config::save_config(&mut world, &path, Some(&renames)).unwrap();
    let first = std::fs::read_to_string(&path).unwrap();

    let mut reloaded = World::from_source(FULL_KCONFIG).unwrap();
    config::load_config(
        &mut reloaded,
        &path,
        Origin::PrimaryConfig,
        Some(&renames),
        DefaultsPolicy::Sdkconfig,
    )
    .unwrap();
    config::save_config(&mut reloaded, &path, Some(&renames)).unwrap();
    let second = std::fs::read_to_string(&path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn unknown_records_are_reported_not_fatal() {
    let mut world = World::from_source(AB_KCONFIG).unwrap();
    config::load_config_str(
        &mut world,
        "CONFIG_NO_SUCH=y\nnot a config line\n",
        Origin::PrimaryConfig,
        None,
        DefaultsPolicy::Sdkconfig,
    );
    let diags = world.report.diagnostics();
    assert!(
        diags
            .iter()
            .any(|d| d.message.contains("unknown symbol CONFIG_NO_SUCH"))
    );
    assert!(
        diags
            .iter()
            .any(|d| d.message.contains("unrecognized configuration line"))
    );
    assert!(!world.report.has_errors());
}

#[test]
fn header_output_defines_enabled_symbols() {
    let mut world = World::from_source(FULL_KCONFIG).unwrap();
    let header = config::render_header(&mut world);
    assert!(header.contains("#pragma once"));
    assert!(header.contains("#define CONFIG_ENABLE 1\n"));
    assert!(header.contains("#define CONFIG_COUNT 8\n"));
    assert!(header.contains("#define CONFIG_ADDR 0xFF\n"));
    assert!(header.contains("#define CONFIG_LABEL \"with \\\"quotes\\\" and \\\\slash\"\n"));
    // Disabled bools are not defined at all.
    assert!(!header.contains("CONFIG_MODE_B"));
}

#[test]
fn empty_tree_still_writes_a_valid_file() {
    let mut world = World::from_source("").unwrap();
    let rendered = config::render_config(&mut world, None);
    assert!(rendered.starts_with("#\n# Automatically generated file"));
}
