//! Tests for fault sinks

use poolworks::core::{build_fault, FaultSink, InMemoryFaultSink, TracingFaultSink};

#[test]
fn test_in_memory_sink_collects() {
    let sink = InMemoryFaultSink::new(10);
    assert!(sink.is_empty());

    sink.report(build_fault("pool-a", &anyhow::anyhow!("first")));
    sink.report(build_fault("worker-3", &anyhow::anyhow!("second")));

    assert_eq!(sink.len(), 2);
    let faults = sink.faults();
    assert_eq!(faults[0].source, "pool-a");
    assert_eq!(faults[1].message, "second");
    assert_ne!(faults[0].id, faults[1].id);
}

#[test]
fn test_zero_capacity_sink_stores_nothing() {
    let sink = InMemoryFaultSink::new(0);
    sink.report(build_fault("x", &anyhow::anyhow!("dropped")));
    assert!(sink.is_empty());
}

#[test]
fn test_tracing_sink_does_not_panic() {
    poolworks::util::init_tracing_with_default("error");
    TracingFaultSink.report(build_fault("worker", &anyhow::anyhow!("logged")));
}

#[test]
fn test_install_default_sink_once() {
    use poolworks::core::{fault_sink, install_fault_sink, report_fault};
    use std::sync::Arc;

    let sink = Arc::new(InMemoryFaultSink::new(4));
    assert!(install_fault_sink(sink.clone()));
    assert!(!install_fault_sink(Arc::new(TracingFaultSink)));

    report_fault("unit", &anyhow::anyhow!("via default"));
    fault_sink().report(build_fault("unit", &anyhow::anyhow!("direct")));

    let messages: Vec<_> = sink.faults().into_iter().map(|f| f.message).collect();
    assert_eq!(messages, vec!["via default", "direct"]);
}
