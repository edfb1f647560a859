use kconfig_tools::report::{Category, Report, Severity, Status};

#[test]
fn status_reflects_the_worst_collected_severity() {
    let mut report = Report::new();
    assert_eq!(report.status(), Status::Ok);

    report.add(Severity::Info, Category::DeprecatedSyntax, None, "noted");
    assert_eq!(report.status(), Status::Ok);

    report.add(
        Severity::Notification,
        Category::MultipleDefinition,
        None,
        "merged",
    );
    assert_eq!(report.status(), Status::OkWithNotifications);

    report.add(Severity::Warning, Category::RangeViolation, None, "clamped");
    assert_eq!(report.status(), Status::OkWithWarnings);

    report.add(Severity::Error, Category::Syntax, None, "bad entry");
    assert_eq!(report.status(), Status::Failed);
    assert!(report.has_errors());
}

#[test]
fn status_names_are_stable() {
    assert_eq!(Status::Ok.as_str(), "ok");
    assert_eq!(
        Status::OkWithNotifications.as_str(),
        "ok_with_notifications"
    );
    assert_eq!(Status::OkWithWarnings.as_str(), "ok_with_warnings");
    assert_eq!(Status::Failed.as_str(), "failed");
}
