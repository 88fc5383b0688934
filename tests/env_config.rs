//! Configuration read from the environment. Kept in its own test binary since
//! it sets environment variables and the process default is read only once.

use std::sync::atomic::{AtomicUsize, Ordering};

use moth::{IssueConfig, RecordStyle, config};
use tracing::{Event, Level, Metadata, Subscriber, span};

static WARNINGS: AtomicUsize = AtomicUsize::new(0);
static SEEN_LIMIT: AtomicUsize = AtomicUsize::new(usize::MAX);

/// Counts warnings and reads the current configuration while handling each.
struct ConfigReadingSubscriber;

impl Subscriber for ConfigReadingSubscriber {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn new_span(&self, _span: &span::Attributes<'_>) -> span::Id {
        span::Id::from_u64(1)
    }

    fn record(&self, _span: &span::Id, _values: &span::Record<'_>) {}

    fn record_follows_from(&self, _span: &span::Id, _follows: &span::Id) {}

    fn event(&self, event: &Event<'_>) {
        if *event.metadata().level() == Level::WARN {
            WARNINGS.fetch_add(1, Ordering::SeqCst);
            SEEN_LIMIT.store(IssueConfig::current().trace_limit, Ordering::SeqCst);
        }
    }

    fn enter(&self, _span: &span::Id) {}

    fn exit(&self, _span: &span::Id) {}
}

#[test]
fn invalid_environment_warns_once_without_blocking_readers() {
    // SAFETY: this binary runs a single test, so no other thread reads the
    // environment concurrently.
    unsafe {
        std::env::set_var("MOTH_TRACE_LIMIT", "lots");
    }

    tracing::subscriber::with_default(ConfigReadingSubscriber, || {
        config::set_trace_limit(5);
        assert_eq!(IssueConfig::current().trace_limit, 5);
        config::set_trace_limit(6);
    });

    assert_eq!(WARNINGS.load(Ordering::SeqCst), 1);
    // The subscriber saw the default, stored before the warning fired.
    assert_eq!(
        SEEN_LIMIT.load(Ordering::SeqCst),
        config::DEFAULT_TRACE_LIMIT
    );

    let current = IssueConfig::current();
    assert_eq!(current.trace_limit, 6);
    assert_eq!(current.record_style, RecordStyle::Inspect);
    assert_eq!(current.context_record_style, RecordStyle::Flat);
}
