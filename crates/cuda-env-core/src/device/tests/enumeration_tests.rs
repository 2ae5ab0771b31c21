use crate::device::{enumerate_devices, DeviceDescriptor, DeviceError, MockDeviceQuery};
use crate::report::PlainTextReporter;

fn render(query: &MockDeviceQuery) -> (crate::device::EnumerationReport, String) {
    let mut sink = PlainTextReporter::new(Vec::new());
    let report = enumerate_devices(query, &mut sink).expect("writing to a Vec cannot fail");
    let text = String::from_utf8(sink.into_inner()).expect("report is valid UTF-8");
    (report, text)
}

#[test]
fn test_descriptor_helpers() {
    let descriptor = DeviceDescriptor {
        name: "GPU".to_string(),
        compute_capability_major: 8,
        compute_capability_minor: 6,
        total_global_memory_bytes: 12 * 1024 * 1024 * 1024 + 512 * 1024,
        clock_rate_khz: 1_695_999,
    };
    assert_eq!(descriptor.compute_capability(), "8.6");
    // Both units truncate.
    assert_eq!(descriptor.total_memory_mb(), 12 * 1024);
    assert_eq!(descriptor.clock_rate_mhz(), 1695);
}

#[test]
fn test_reports_every_device_in_original_layout() {
    let query = MockDeviceQuery::builtin();
    let (report, text) = render(&query);

    assert!(report.is_success());
    assert_eq!(report.device_count, 2);
    assert!(text.contains("Number of CUDA devices: 2\n"));
    assert!(text.contains(
        "\nDevice 0: Mock RTX 4090\nCompute Capability: 8.9\nTotal Memory: 24564 MB\nClock Rate: 2520 MHz\n"
    ));
    assert!(text.contains("\nDevice 1: Mock A100\nCompute Capability: 8.0\n"));
    assert!(text.ends_with("\nCUDA environment test completed successfully!\n"));
}

#[test]
fn test_zero_devices_makes_no_describe_calls() {
    let query = MockDeviceQuery::new(Vec::new());
    let stats = query.stats();
    let (report, text) = render(&query);

    assert!(report.is_success());
    assert_eq!(report.device_count, 0);
    assert!(report.devices.is_empty());
    assert_eq!(stats.count_calls(), 1);
    assert_eq!(stats.opened(), 0);
    assert_eq!(stats.describe_calls(), 0);
    assert!(text.contains("Number of CUDA devices: 0\n"));
    assert!(!text.contains("Device 0"));
}

#[test]
fn test_failing_device_does_not_stop_the_next() {
    let query = MockDeviceQuery::builtin().failing_describe(0);
    let stats = query.stats();
    let (report, text) = render(&query);

    assert!(!report.is_success());
    assert_eq!(report.failed_devices(), 1);
    assert!(report.devices[0].error.is_some());
    assert_eq!(
        report.devices[1].descriptor.as_ref().map(|d| d.name.as_str()),
        Some("Mock A100")
    );
    assert!(text.contains("Device 0: error: Failed to describe device 0"));
    assert!(text.contains("Device 1: Mock A100"));
    assert!(text.contains("completed with 1 device error(s)"));
    assert_eq!(stats.describe_calls(), 2);
}

#[test]
fn test_open_failure_is_reported_per_device() {
    let query = MockDeviceQuery::builtin().failing_open(1);
    let stats = query.stats();
    let (report, _) = render(&query);

    assert!(report.devices[0].is_success());
    assert!(!report.devices[1].is_success());
    assert_eq!(stats.opened(), 1);
    assert_eq!(stats.describe_calls(), 1);
}

#[test]
fn test_every_opened_handle_is_released() {
    let query = MockDeviceQuery::builtin().failing_describe(1);
    let stats = query.stats();
    let _ = render(&query);

    assert_eq!(stats.opened(), 2);
    assert_eq!(stats.released(), stats.opened());
}

#[test]
fn test_count_failure_sets_enumeration_error() {
    let query = MockDeviceQuery::builtin().failing_count("no driver");
    let stats = query.stats();
    let (report, text) = render(&query);

    let err = report.error.as_ref().expect("enumeration error expected");
    assert_eq!(err.backend, "mock");
    assert_eq!(
        err.source,
        DeviceError::Count {
            message: "no driver".to_string()
        }
    );
    assert!(report.devices.is_empty());
    assert_eq!(stats.opened(), 0);
    assert!(text.starts_with("Error during CUDA test: Could not enumerate devices via 'mock'"));
}
