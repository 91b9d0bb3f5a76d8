use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

use crate::server::{ServerConfig, DEFAULT_PORT};

/// Environment variable that replaces the default port when `--port` is not given.
pub const PORT_ENV_VAR: &str = "KV_PORT";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for --{arg}")]
    InvalidArg { arg: &'static str, value: String },
    #[error("Invalid value '{0}' for KV_PORT")]
    InvalidEnvPort(String),
}

/// Raw command-line values, as handed over by clap.
#[derive(Debug, Default)]
pub struct RawArgs<'a> {
    pub address: Option<&'a str>,
    pub port: Option<&'a str>,
    pub shards: Option<&'a str>,
}

fn parse_arg<T: FromStr>(arg: &'static str, raw: Option<&str>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidArg {
            arg,
            value: raw.to_string(),
        }),
        None => Ok(default),
    }
}

/// Resolves the server configuration. `env_port` is the value of `KV_PORT`, if set.
pub fn build_config(args: &RawArgs<'_>, env_port: Option<String>) -> Result<ServerConfig, ConfigError> {
    let default_port = match env_port {
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidEnvPort(raw))?,
        None => DEFAULT_PORT,
    };
    let defaults = ServerConfig::default();
    Ok(ServerConfig {
        address: parse_arg::<IpAddr>("address", args.address, defaults.address)?,
        port: parse_arg("port", args.port, default_port)?,
        shard_count: parse_arg("shards", args.shards, defaults.shard_count)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_defaults() {
        let config = build_config(&RawArgs::default(), None).unwrap();
        assert_eq!(config.address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.port, 8080);
        assert_eq!(config.shard_count, 8);
    }

    #[test]
    fn test_env_port_replaces_default() {
        let config = build_config(&RawArgs::default(), Some("9090".into())).unwrap();
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn test_port_arg_wins_over_env() {
        let args = RawArgs {
            port: Some("7000"),
            ..RawArgs::default()
        };
        let config = build_config(&args, Some("9090".into())).unwrap();
        assert_eq!(config.port, 7000);
    }

    #[test]
    fn test_explicit_args() {
        let args = RawArgs {
            address: Some("127.0.0.1"),
            port: Some("8181"),
            shards: Some("16"),
        };
        let config = build_config(&args, None).unwrap();
        assert_eq!(config.address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.port, 8181);
        assert_eq!(config.shard_count, 16);
    }

    #[test]
    fn test_invalid_values() {
        let args = RawArgs {
            port: Some("eighty"),
            ..RawArgs::default()
        };
        let err = build_config(&args, None).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value 'eighty' for --port");

        let args = RawArgs {
            address: Some("not-an-ip"),
            ..RawArgs::default()
        };
        assert!(matches!(
            build_config(&args, None),
            Err(ConfigError::InvalidArg { arg: "address", .. })
        ));

        let err = build_config(&RawArgs::default(), Some("70000".into())).unwrap_err();
        assert_eq!(err, ConfigError::InvalidEnvPort("70000".into()));
        assert_eq!(err.to_string(), "Invalid value '70000' for KV_PORT");
    }
}
