use tempfile::TempDir;

use kconfig_tools::checker;

#[test]
fn clean_input_has_no_issues() {
    let src = "\
config GOOD
    bool \"good\"
    default y
";
    let (issues, fixed) = checker::check_source(src);
    assert!(issues.is_empty(), "{issues:?}");
    assert_eq!(fixed, src);
}

#[test]
fn tabs_and_trailing_whitespace_are_fixed() {
    let src = "config A\n\tbool \"a\"   \n";
    let (issues, fixed) = checker::check_source(src);
    assert!(issues.iter().any(|i| i.message.contains("tab")));
    assert!(
        issues
            .iter()
            .any(|i| i.message.contains("trailing whitespace"))
    );
    assert_eq!(fixed, "config A\n    bool \"a\"\n");
}

#[test]
fn odd_indentation_is_rounded() {
    let src = "config A\n   bool \"a\"\n";
    let (issues, fixed) = checker::check_source(src);
    assert!(
        issues
            .iter()
            .any(|i| i.message.contains("not a multiple of 4"))
    );
    assert_eq!(fixed, "config A\n    bool \"a\"\n");
}

#[test]
fn lowercase_hex_is_canonicalized() {
    let src = "config A\n    hex \"a\"\n    default 0xdead\n";
    let (issues, fixed) = checker::check_source(src);
    assert!(issues.iter().any(|i| i.message.contains("lowercase hex")));
    assert!(fixed.contains("default 0xDEAD"));
}

#[test]
fn hex_inside_strings_is_left_alone() {
    let src = "config A\n    string \"a\"\n    default \"0xdead\"\n";
    let (issues, _) = checker::check_source(src);
    assert!(!issues.iter().any(|i| i.message.contains("lowercase hex")));
}

#[test]
fn lowercase_symbol_names_are_flagged_without_a_fix() {
    let src = "config bad_name\n    bool \"b\"\n";
    let (issues, fixed) = checker::check_source(src);
    let issue = issues
        .iter()
        .find(|i| i.message.contains("bad_name"))
        .expect("name issue");
    assert!(!issue.fixable);
    assert_eq!(fixed, src);
}

#[test]
fn overlong_lines_are_flagged() {
    let src = format!("config A\n    bool \"{}\"\n", "x".repeat(150));
    let (issues, _) = checker::check_source(&src);
    assert!(issues.iter().any(|i| i.message.contains("longer than 120")));
}

#[test]
fn check_file_writes_a_new_sibling_only_when_fixable() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("Kconfig");
    std::fs::write(&path, "config A\n\tbool \"a\"\n").unwrap();

    let outcome = checker::check_file(&path).unwrap();
    let new_path = outcome.fixed.expect("fixed file");
    assert_eq!(new_path, tmp.path().join("Kconfig.new"));
    let fixed = std::fs::read_to_string(&new_path).unwrap();
    assert_eq!(fixed, "config A\n    bool \"a\"\n");

    let clean = tmp.path().join("Kconfig.ok");
    std::fs::write(&clean, "config B\n    bool \"b\"\n").unwrap();
    let outcome = checker::check_file(&clean).unwrap();
    assert!(outcome.issues.is_empty());
    assert!(outcome.fixed.is_none());
}
