use kconfig_tools::renames::RenameMap;

#[test]
fn chains_collapse_to_the_latest_name() {
    let map = RenameMap::parse_str(
        "\
# historic renames, oldest first
FIRST SECOND
SECOND THIRD
THIRD FOURTH
",
    )
    .unwrap();

    assert_eq!(map.canonical_name("FIRST"), Some("FOURTH"));
    assert_eq!(map.canonical_name("SECOND"), Some("FOURTH"));
    assert_eq!(map.canonical_name("THIRD"), Some("FOURTH"));
    assert_eq!(map.canonical_name("FOURTH"), None);
}

#[test]
fn lookup_works_in_both_directions() {
    let map = RenameMap::parse_str("OLD NEW\n").unwrap();
    // A record may use either generation of the name.
    assert!(map.candidates("OLD").contains(&"NEW".to_string()));
    assert!(map.candidates("NEW").contains(&"OLD".to_string()));
}

#[test]
fn self_rename_is_rejected() {
    let err = RenameMap::parse_str("SAME SAME\n").unwrap_err();
    assert!(err.to_string().contains("renamed to itself"), "{err}");
}

#[test]
fn cycles_are_rejected() {
    let err = RenameMap::parse_str("A B\nB C\nC A\n").unwrap_err();
    assert!(err.to_string().contains("cycle"), "{err}");
}

#[test]
fn duplicate_old_names_are_rejected() {
    let err = RenameMap::parse_str("A B\nA C\n").unwrap_err();
    assert!(err.to_string().contains("more than once"), "{err}");
}

#[test]
fn inverted_declaration_aliases_without_extending_the_chain() {
    // NEW was rolled back to OLD; the alias must not read as a cycle.
    let map = RenameMap::parse_str("OLD NEW\n!OLD NEW\n").unwrap();
    assert_eq!(map.canonical_name("OLD"), Some("NEW"));
    assert_eq!(map.canonical_name("NEW"), Some("NEW"));
    assert!(map.candidates("NEW").contains(&"OLD".to_string()));
}

#[test]
fn malformed_lines_are_rejected() {
    let err = RenameMap::parse_str("JUST_ONE\n").unwrap_err();
    assert!(err.to_string().contains("expected two names"), "{err}");
}

#[test]
fn deprecated_pairs_resolve_through_chains() {
    let map = RenameMap::parse_str("A B\nB C\n").unwrap();
    let pairs = map.deprecated_pairs();
    assert_eq!(
        pairs,
        vec![
            ("A".to_string(), "C".to_string()),
            ("B".to_string(), "C".to_string())
        ]
    );
}
