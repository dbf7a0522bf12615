//! Integration tests for metrics server functionality.

use logmeter_core::config::MetricsConfig;
use logmeter_daemon::metrics_server;
use serial_test::serial;

fn config(listen_addr: &str, port: u16) -> MetricsConfig {
    MetricsConfig {
        enabled: true,
        listen_addr: listen_addr.to_string(),
        port,
        endpoint: "/metrics".to_string(),
    }
}

#[test]
fn test_listen_socket_combines_address_and_port() {
    let addr = metrics_server::listen_socket(&config("127.0.0.1", 9100)).unwrap();
    assert_eq!(addr.to_string(), "127.0.0.1:9100");

    let addr = metrics_server::listen_socket(&config("::1", 9100)).unwrap();
    assert_eq!(addr.to_string(), "[::1]:9100");
}

#[test]
fn test_listen_socket_rejects_hostname() {
    let err = metrics_server::listen_socket(&config("localhost", 9100)).unwrap_err();
    assert!(err.to_string().contains("invalid metrics listen address"));
}

#[test]
#[serial]
fn test_install_metrics_recorder_fails_with_invalid_address() {
    // Given: An invalid metrics configuration (invalid IP)
    let config = config("999.999.999.999", 9100);

    // When: Installing the metrics recorder
    let result = metrics_server::install_metrics_recorder(&config);

    // Then: Should fail before touching the global recorder
    assert!(
        result.is_err(),
        "install_metrics_recorder should fail with invalid address"
    );
}

#[tokio::test]
#[serial]
async fn test_install_metrics_recorder_succeeds_with_valid_config() {
    // Given: A valid metrics configuration on a non-standard port
    let config = config("127.0.0.1", 19190);

    // When: Installing the metrics recorder
    let result = metrics_server::install_metrics_recorder(&config);

    // Then: Should succeed
    assert!(
        result.is_ok(),
        "install_metrics_recorder should succeed with valid config: {:?}",
        result.err()
    );

    // And: A second install in the same process is rejected
    let second = metrics_server::install_metrics_recorder(&config);
    assert!(second.is_err(), "global recorder can only be installed once");
}
