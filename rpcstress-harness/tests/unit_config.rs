use rpcstress_common::DEFAULT_METHOD;
use rpcstress_harness::config::{Config, ConfigError, MAX_CONCURRENCY};
use std::time::Duration;

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();
    assert_eq!(config.server_address, "localhost:1234");
    assert_eq!(config.total_requests, 1000);
    assert_eq!(config.concurrency, 50);
    assert_eq!(config.method, DEFAULT_METHOD);
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn test_each_bound_is_checked() {
    let cases = [
        (Config { total_requests: 0, ..Config::default() }, ConfigError::NoRequests),
        (Config { concurrency: 0, ..Config::default() }, ConfigError::NoWorkers),
        (Config { concurrency: MAX_CONCURRENCY + 1, ..Config::default() }, ConfigError::TooManyWorkers),
        (Config { server_address: "  ".to_string(), ..Config::default() }, ConfigError::EmptyAddress),
        (Config { method: String::new(), ..Config::default() }, ConfigError::EmptyMethod),
        (Config { timeout: Duration::ZERO, ..Config::default() }, ConfigError::ZeroTimeout),
        (Config { duration: Some(Duration::ZERO), ..Config::default() }, ConfigError::ZeroDuration),
    ];
    for (config, expected) in cases {
        assert_eq!(config.validate(), Err(expected));
    }
}

#[test]
fn test_error_messages_are_descriptive() {
    assert_eq!(ConfigError::NoRequests.to_string(), "total requests must be at least 1");
    assert_eq!(ConfigError::NoWorkers.to_string(), "concurrency must be at least 1");
    assert_eq!(ConfigError::ZeroTimeout.to_string(), "timeout must be greater than zero");
}

#[test]
fn test_timed_run_config_is_valid() {
    let config = Config { duration: Some(Duration::from_secs(10)), ..Config::default() };
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn test_client_config_carries_address_and_timeout() {
    let config = Config {
        server_address: "10.0.0.7:9000".to_string(),
        timeout: Duration::from_millis(750),
        ..Config::default()
    };
    let client_config = config.client_config();
    assert_eq!(client_config.address, "10.0.0.7:9000");
    assert_eq!(client_config.timeout, Duration::from_millis(750));
}

#[test]
fn test_concurrency_bound_is_inclusive() {
    let at_bound = Config { concurrency: MAX_CONCURRENCY, ..Config::default() };
    assert_eq!(at_bound.validate(), Ok(()));

    let huge = Config { concurrency: usize::MAX, duration: Some(Duration::from_secs(1)), ..Config::default() };
    assert_eq!(huge.validate(), Err(ConfigError::TooManyWorkers));
    assert_eq!(ConfigError::TooManyWorkers.to_string(), format!("concurrency must be at most {MAX_CONCURRENCY}"));
}
