//! Service configuration loaded from environment variables.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `HUB_HOOKS_LISTEN_ADDR` | `0.0.0.0:3000` | Socket address to bind |
//! | `HUB_HOOKS_SECRET` | empty | Webhook secret; empty disables verification |
//! | `HUB_HOOKS_CHANNEL_CAPACITY` | `5` | Channel size, or `unbounded` |
//! | `HUB_HOOKS_OVERFLOW` | `block` | `block` or `reject` when the channel is full |
//! | `HUB_HOOKS_PUBLISH_TIMEOUT_MS` | unset | Longest a blocked publish may wait |
//! | `HUB_HOOKS_MAX_BODY_BYTES` | 25 MiB | Largest accepted body |
//!
//! A publish timeout only bounds a blocking publish, so setting it together
//! with `HUB_HOOKS_OVERFLOW=reject` is rejected.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::delivery::{DEFAULT_CAPACITY, DeliveryConfig, Overflow};
use crate::server::DEFAULT_MAX_BODY_BYTES;
use crate::webhooks::Secret;

const VAR_LISTEN_ADDR: &str = "HUB_HOOKS_LISTEN_ADDR";
const VAR_SECRET: &str = "HUB_HOOKS_SECRET";
const VAR_CHANNEL_CAPACITY: &str = "HUB_HOOKS_CHANNEL_CAPACITY";
const VAR_OVERFLOW: &str = "HUB_HOOKS_OVERFLOW";
const VAR_PUBLISH_TIMEOUT_MS: &str = "HUB_HOOKS_PUBLISH_TIMEOUT_MS";
const VAR_MAX_BODY_BYTES: &str = "HUB_HOOKS_MAX_BODY_BYTES";

/// Errors in the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set to something that does not parse.
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on.
    pub listen_addr: SocketAddr,

    /// Secret every delivery is verified with.
    pub secret: Secret,

    /// Delivery channel settings.
    pub delivery: DeliveryConfig,

    /// Body size limit in bytes.
    pub max_body_bytes: usize,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var_os(var))
    }

    /// Loads configuration through `lookup`, which returns the raw value of a
    /// variable or `None` when unset.
    ///
    /// A value that is not valid UTF-8 is an error, never "unset".
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self, ConfigError> {
        let listen_addr = parse_or(&lookup, VAR_LISTEN_ADDR, SocketAddr::from(([0, 0, 0, 0], 3000)))?;
        let secret = text(&lookup, VAR_SECRET)?.map(Secret::from).unwrap_or_default();

        let capacity = match text(&lookup, VAR_CHANNEL_CAPACITY)? {
            None => Some(DEFAULT_CAPACITY),
            Some(v) if v.trim().eq_ignore_ascii_case("unbounded") => None,
            Some(v) => Some(v.trim().parse::<NonZeroUsize>().map_err(|e| ConfigError::Invalid {
                var: VAR_CHANNEL_CAPACITY,
                value: v.clone(),
                reason: format!("{e}; use a positive number or \"unbounded\""),
            })?),
        };

        let overflow = match text(&lookup, VAR_OVERFLOW)? {
            None => Overflow::default(),
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "block" => Overflow::Block,
                "reject" => Overflow::Reject,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: VAR_OVERFLOW,
                        value: v,
                        reason: "expected \"block\" or \"reject\"".to_string(),
                    });
                }
            },
        };

        let publish_timeout = match text(&lookup, VAR_PUBLISH_TIMEOUT_MS)? {
            None => None,
            Some(v) if overflow == Overflow::Reject => {
                return Err(ConfigError::Invalid {
                    var: VAR_PUBLISH_TIMEOUT_MS,
                    value: v,
                    reason: format!("has no effect when {VAR_OVERFLOW} is \"reject\""),
                });
            }
            Some(v) => Some(parse(VAR_PUBLISH_TIMEOUT_MS, &v).map(Duration::from_millis)?),
        };

        let max_body_bytes = parse_or(&lookup, VAR_MAX_BODY_BYTES, DEFAULT_MAX_BODY_BYTES)?;

        Ok(Config {
            listen_addr,
            secret,
            delivery: DeliveryConfig {
                capacity,
                overflow,
                publish_timeout,
            },
            max_body_bytes,
        })
    }
}

/// Reads `var` as text. Set but not UTF-8 is an error.
fn text(
    lookup: &impl Fn(&str) -> Option<OsString>,
    var: &'static str,
) -> Result<Option<String>, ConfigError> {
    lookup(var)
        .map(|raw| {
            raw.into_string().map_err(|raw| ConfigError::Invalid {
                var,
                value: raw.to_string_lossy().into_owned(),
                reason: "not valid UTF-8".to_string(),
            })
        })
        .transpose()
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<OsString>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match text(lookup, var)? {
        Some(value) => parse(var, &value),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[cfg(unix)]
    fn non_utf8(bytes: &[u8]) -> OsString {
        use std::os::unix::ffi::OsStringExt;
        OsString::from_vec(bytes.to_vec())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:3000".parse().unwrap());
        assert!(config.secret.is_empty());
        assert_eq!(config.delivery, DeliveryConfig::default());
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn all_variables_set() {
        let config = load(&[
            (VAR_LISTEN_ADDR, "127.0.0.1:8080"),
            (VAR_SECRET, "super-secret"),
            (VAR_CHANNEL_CAPACITY, "32"),
            (VAR_OVERFLOW, "Block"),
            (VAR_PUBLISH_TIMEOUT_MS, "1500"),
            (VAR_MAX_BODY_BYTES, "1024"),
        ])
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.secret, Secret::from("super-secret"));
        assert_eq!(config.delivery.capacity, NonZeroUsize::new(32));
        assert_eq!(config.delivery.overflow, Overflow::Block);
        assert_eq!(
            config.delivery.publish_timeout,
            Some(Duration::from_millis(1500))
        );
        assert_eq!(config.max_body_bytes, 1024);
    }

    #[test]
    fn unbounded_capacity() {
        let config = load(&[(VAR_CHANNEL_CAPACITY, "unbounded")]).unwrap();
        assert_eq!(config.delivery.capacity, None);
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = load(&[(VAR_CHANNEL_CAPACITY, "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { var: VAR_CHANNEL_CAPACITY, .. }
        ));
    }

    #[test]
    fn unknown_overflow_rejected() {
        let err = load(&[(VAR_OVERFLOW, "drop-oldest")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: VAR_OVERFLOW, .. }));
    }

    #[test]
    fn bad_listen_addr_rejected() {
        let err = load(&[(VAR_LISTEN_ADDR, "localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: VAR_LISTEN_ADDR, .. }));
    }

    #[test]
    fn bad_timeout_rejected() {
        let err = load(&[(VAR_PUBLISH_TIMEOUT_MS, "soon")]).unwrap_err();
        assert!(err.to_string().contains(VAR_PUBLISH_TIMEOUT_MS));
    }

    #[test]
    fn reject_overflow_without_timeout() {
        let config = load(&[(VAR_OVERFLOW, "reject")]).unwrap();
        assert_eq!(config.delivery.overflow, Overflow::Reject);
        assert_eq!(config.delivery.publish_timeout, None);
    }

    #[test]
    fn timeout_with_reject_overflow_rejected() {
        let err = load(&[(VAR_OVERFLOW, "reject"), (VAR_PUBLISH_TIMEOUT_MS, "250")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { var: VAR_PUBLISH_TIMEOUT_MS, .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_secret_is_an_error() {
        let err = Config::from_lookup(|var| (var == VAR_SECRET).then(|| non_utf8(b"s3cr\xffet")))
            .unwrap_err();

        assert_eq!(
            err,
            ConfigError::Invalid {
                var: VAR_SECRET,
                value: "s3cr\u{FFFD}et".to_string(),
                reason: "not valid UTF-8".to_string(),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_value_is_not_treated_as_unset() {
        for var in [
            VAR_LISTEN_ADDR,
            VAR_CHANNEL_CAPACITY,
            VAR_OVERFLOW,
            VAR_PUBLISH_TIMEOUT_MS,
            VAR_MAX_BODY_BYTES,
        ] {
            let err = Config::from_lookup(|name| (name == var).then(|| non_utf8(b"\xfe32")))
                .unwrap_err();
            assert!(
                matches!(&err, ConfigError::Invalid { var: v, .. } if *v == var),
                "{var}: {err}"
            );
        }
    }
}
