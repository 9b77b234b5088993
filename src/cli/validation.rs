//! Value parsers for CLI arguments.

use std::fs;
use std::path::PathBuf;

const MAX_ROLLBACK_STEPS: u32 = 100;
const MAX_BATCH_SIZE: u32 = 100;

/// Port number in 1-65535.
pub fn validate_port(port_str: &str) -> Result<u16, String> {
    let port: u16 = port_str.parse().map_err(|_| {
        format!("Port must be a valid number between 1 and 65535, got: '{}'", port_str)
    })?;

    if port == 0 {
        return Err("Port must be between 1 and 65535. Port 0 is not allowed.".to_string());
    }

    Ok(port)
}

/// An existing, readable file.
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(format!(
            "Configuration file does not exist or is not a file: '{}'",
            path_str
        ));
    }

    fs::File::open(&path)
        .map(|_| path)
        .map_err(|e| format!("Cannot read configuration file '{}': {}", path_str, e))
}

pub fn validate_rollback_steps(steps_str: &str) -> Result<u32, String> {
    parse_bounded(steps_str, "Rollback steps", MAX_ROLLBACK_STEPS)
}

pub fn validate_batch_size(size_str: &str) -> Result<u32, String> {
    parse_bounded(size_str, "Batch size", MAX_BATCH_SIZE)
}

fn parse_bounded(value: &str, what: &str, max: u32) -> Result<u32, String> {
    let parsed: u32 = value
        .parse()
        .map_err(|_| format!("{} must be a valid positive number, got: '{}'", what, value))?;

    if parsed == 0 || parsed > max {
        return Err(format!("{} must be between 1 and {}", what, max));
    }

    Ok(parsed)
}

/// Hostname, `localhost` or dotted IPv4.
pub fn validate_host_address(host_str: &str) -> Result<String, String> {
    let host = host_str.trim();

    if host.is_empty() {
        return Err("Host address cannot be empty".to_string());
    }

    if host.contains(char::is_whitespace) {
        return Err("Host address cannot contain spaces".to_string());
    }

    if host.len() > 253 {
        return Err("Host address is too long (maximum 253 characters)".to_string());
    }

    let looks_like_ipv4 = host.chars().all(|c| c.is_ascii_digit() || c == '.');
    if looks_like_ipv4 && host.parse::<std::net::Ipv4Addr>().is_err() {
        return Err(format!("Invalid IPv4 address format: '{}'", host_str));
    }

    Ok(host.to_string())
}
