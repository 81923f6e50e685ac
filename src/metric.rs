use opentelemetry::{KeyValue, metrics::UpDownCounter};
use std::sync::LazyLock;

static STATDS: LazyLock<UpDownCounter<i64>> = LazyLock::new(|| {
    logfire::i64_up_down_counter("messenger_relay_statds")
        .with_description("Messenger relay statistics")
        .with_unit("event")
        .build()
});

fn incr_statds(metric: String, value: String) {
    STATDS.add(1, &[KeyValue::new(metric, value)]);
}

pub fn incr_event_kind_statds(kind: &str) {
    incr_statds("event_kind".to_string(), kind.into())
}

pub fn incr_send_status_statds(status: &str) {
    incr_statds("send_status".to_string(), status.into())
}

pub fn incr_signature_statds(outcome: &str) {
    incr_statds("signature".to_string(), outcome.into())
}
