//! Process-wide configuration. Kept in its own test binary since it mutates
//! global state.

use moth::{Issue, IssueConfig, Record, RecordStyle, config};

#[test]
fn installed_configuration_applies_to_new_issues() {
    IssueConfig {
        record_style: RecordStyle::Flat,
        context_record_style: RecordStyle::Json,
        ..IssueConfig::DEFAULT
    }
    .install()
    .unwrap();
    assert!(IssueConfig::DEFAULT.install().is_err());

    let issue = Issue::builder(Record::new().with("a", 1).with("b", 2))
        .context(Record::new().with("c", 3))
        .build();
    assert_eq!(issue.state(), "a:1,b:2");
    assert_eq!(issue.states(), [r#"{"c":3}"#]);

    config::set_trace_limit(2);
    let issue = Issue::new("limited");
    assert!(issue.traces().len() <= 2);
    assert_eq!(IssueConfig::current().record_style, RecordStyle::Flat);

    // An explicit configuration wins over the installed one.
    let issue = Issue::builder(Record::new().with("a", 1))
        .config(IssueConfig::DEFAULT)
        .build();
    assert_eq!(issue.state(), "{ a: 1 }");

    let previous = IssueConfig::DEFAULT.replace();
    assert_eq!(previous.map(|config| config.trace_limit), Some(2));
    assert_eq!(IssueConfig::current(), IssueConfig::DEFAULT);
}
