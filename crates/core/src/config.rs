// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node configuration.
//!
//! All nodes in a deployment share one TOML file. A section is a table
//! (`[network]`); node-specific overrides live in a nested table named
//! after the node (`[network.elevator_0]`) and beat the generic section
//! when that node reads it. Keys may be dotted paths, so the address of
//! a peer is reachable from anywhere as `network` / `elevator_0.port`.
//!
//! Configuration is immutable after load; missing or malformed values
//! are fatal at startup.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("configuration not found: [{section}] {key}")]
    Missing { section: String, key: String },

    #[error("configuration [{section}] {key} is not a {expected}")]
    WrongType {
        section: String,
        key: String,
        expected: &'static str,
    },

    #[error("configuration [{section}] {key} is not a valid address: {value}")]
    BadAddress {
        section: String,
        key: String,
        value: String,
    },
}

/// Parsed configuration for one node.
#[derive(Debug, Clone)]
pub struct Config {
    root: toml::Table,
    node_name: String,
}

impl Config {
    /// Load the shared configuration file for the node named `node_name`.
    pub fn load(path: &Path, node_name: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let root = text.parse::<toml::Table>().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { root, node_name: node_name.to_string() })
    }

    /// Build a configuration from an already-parsed table.
    pub fn from_table(root: toml::Table, node_name: &str) -> Self {
        Self { root, node_name: node_name.to_string() }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Raw lookup: node-specific override first, then the generic section.
    fn lookup(&self, section: &str, key: &str) -> Option<&toml::Value> {
        let table = self.root.get(section)?.as_table()?;
        if let Some(over) = table.get(&self.node_name).and_then(toml::Value::as_table) {
            if let Some(value) = lookup_path(over, key) {
                return Some(value);
            }
        }
        lookup_path(table, key)
    }

    pub fn get_str(&self, section: &str, key: &str) -> Result<&str, ConfigError> {
        match self.lookup(section, key) {
            Some(value) => value.as_str().ok_or_else(|| wrong_type(section, key, "string")),
            None => Err(missing(section, key)),
        }
    }

    pub fn get_str_or<'a>(
        &'a self,
        section: &str,
        key: &str,
        default: &'a str,
    ) -> Result<&'a str, ConfigError> {
        match self.lookup(section, key) {
            Some(value) => value.as_str().ok_or_else(|| wrong_type(section, key, "string")),
            None => Ok(default),
        }
    }

    pub fn get_int(&self, section: &str, key: &str) -> Result<i64, ConfigError> {
        match self.lookup(section, key) {
            Some(value) => value.as_integer().ok_or_else(|| wrong_type(section, key, "integer")),
            None => Err(missing(section, key)),
        }
    }

    pub fn get_int_or(&self, section: &str, key: &str, default: i64) -> Result<i64, ConfigError> {
        match self.lookup(section, key) {
            Some(value) => value.as_integer().ok_or_else(|| wrong_type(section, key, "integer")),
            None => Ok(default),
        }
    }

    pub fn get_usize(&self, section: &str, key: &str) -> Result<usize, ConfigError> {
        usize::try_from(self.get_int(section, key)?)
            .map_err(|_| wrong_type(section, key, "non-negative integer"))
    }

    pub fn get_float(&self, section: &str, key: &str) -> Result<f64, ConfigError> {
        match self.lookup(section, key) {
            Some(value) => as_float(value).ok_or_else(|| wrong_type(section, key, "number")),
            None => Err(missing(section, key)),
        }
    }

    pub fn get_float_or(&self, section: &str, key: &str, default: f64) -> Result<f64, ConfigError> {
        match self.lookup(section, key) {
            Some(value) => as_float(value).ok_or_else(|| wrong_type(section, key, "number")),
            None => Ok(default),
        }
    }

    /// A number of seconds (float or integer) as a [`Duration`].
    pub fn get_duration(&self, section: &str, key: &str) -> Result<Duration, ConfigError> {
        Ok(Duration::from_secs_f64(self.get_float(section, key)?))
    }

    pub fn get_duration_or(
        &self,
        section: &str,
        key: &str,
        default: Duration,
    ) -> Result<Duration, ConfigError> {
        Ok(Duration::from_secs_f64(
            self.get_float_or(section, key, default.as_secs_f64())?,
        ))
    }

    /// The UDP address of the peer node `name` (e.g. `elevator_0`),
    /// read from `[network]` as `<name>.ip_address` / `<name>.port`.
    pub fn peer_addr(&self, name: &str) -> Result<SocketAddr, ConfigError> {
        self.addr("network", name)
    }

    /// An `ip_address`/`port` pair below `section` (dotted prefix optional).
    pub fn addr(&self, section: &str, prefix: &str) -> Result<SocketAddr, ConfigError> {
        let (ip_key, port_key) = if prefix.is_empty() {
            ("ip_address".to_string(), "port".to_string())
        } else {
            (format!("{prefix}.ip_address"), format!("{prefix}.port"))
        };

        let ip_text = self.get_str(section, &ip_key)?;
        let ip: IpAddr = ip_text.parse().map_err(|_| ConfigError::BadAddress {
            section: section.to_string(),
            key: ip_key,
            value: ip_text.to_string(),
        })?;

        let port = self.get_int(section, &port_key)?;
        let port = u16::try_from(port).map_err(|_| ConfigError::BadAddress {
            section: section.to_string(),
            key: port_key,
            value: port.to_string(),
        })?;

        Ok(SocketAddr::new(ip, port))
    }
}

fn lookup_path<'a>(table: &'a toml::Table, key: &str) -> Option<&'a toml::Value> {
    let mut current = table;
    let mut parts = key.split('.').peekable();
    while let Some(part) = parts.next() {
        let value = current.get(part)?;
        if parts.peek().is_none() {
            return Some(value);
        }
        current = value.as_table()?;
    }
    None
}

fn as_float(value: &toml::Value) -> Option<f64> {
    match value {
        toml::Value::Float(f) => Some(*f),
        toml::Value::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

fn missing(section: &str, key: &str) -> ConfigError {
    ConfigError::Missing { section: section.to_string(), key: key.to_string() }
}

fn wrong_type(section: &str, key: &str, expected: &'static str) -> ConfigError {
    ConfigError::WrongType {
        section: section.to_string(),
        key: key.to_string(),
        expected,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
