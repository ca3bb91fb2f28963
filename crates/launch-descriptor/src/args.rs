//! Argument line tokenization and server target extraction.
//!
//! The `args` field of a descriptor is a single shell-style string. It is
//! split with POSIX shell rules, and the tokens are then read the way a
//! Python ASGI runner reads them: `-m <runner> <module:attr> --host H --port P`.

use launch_common::{Error, Result};
use std::fmt;
use std::net::IpAddr;

/// Host a runner binds to when `--host` is absent.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port a runner binds to when `--port` is absent.
pub const DEFAULT_PORT: u16 = 8000;

const HOST_FLAG: &str = "--host";
const PORT_FLAG: &str = "--port";
const MODULE_FLAG: &str = "-m";

/// A tokenized argument line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgLine {
    tokens: Vec<String>,
}

impl ArgLine {
    /// Split an argument line by shell rules.
    pub fn parse(line: &str) -> Result<Self> {
        let tokens = shell_words::split(line)
            .map_err(|e| Error::parse("argument line", format!("{}: {}", e, line)))?;
        Ok(Self { tokens })
    }

    pub fn from_tokens(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Join tokens back into a line, quoting where the shell would need it.
    pub fn to_line(&self) -> String {
        shell_words::join(&self.tokens)
    }

    /// Every value of a long flag, given as `--flag value` or `--flag=value`,
    /// in order.
    pub fn flag_values(&self, flag: &str) -> Result<Vec<&str>> {
        let prefix = format!("{}=", flag);
        let mut values = Vec::new();
        let mut iter = self.tokens.iter();

        while let Some(token) = iter.next() {
            if token == flag {
                match iter.next() {
                    Some(value) => values.push(value.as_str()),
                    None => return Err(Error::validation(format!("{} requires a value", flag))),
                }
            } else if let Some(value) = token.strip_prefix(&prefix) {
                values.push(value);
            }
        }

        Ok(values)
    }

    /// Effective value of a long flag. A repeated flag takes its last value.
    pub fn flag_value(&self, flag: &str) -> Result<Option<&str>> {
        Ok(self.flag_values(flag)?.pop())
    }

    /// Check every host and port flag carries a usable value.
    pub fn check_flags(&self) -> Result<()> {
        for host in self.flag_values(HOST_FLAG)? {
            validate_host(host)?;
        }
        for port in self.flag_values(PORT_FLAG)? {
            parse_port(port)?;
        }
        Ok(())
    }
}

impl fmt::Display for ArgLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// The importable application object a runner serves, e.g. `app.main:app`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTarget {
    pub module: String,
    pub attribute: Option<String>,
}

impl AppTarget {
    pub fn parse(target: &str) -> Result<Self> {
        let (module, attribute) = match target.rsplit_once(':') {
            Some((module, attribute)) => (module, Some(attribute)),
            None => (target, None),
        };

        if module.is_empty() {
            return Err(Error::validation(format!(
                "Server target has an empty module path: {}",
                target
            )));
        }
        if attribute.is_some_and(str::is_empty) {
            return Err(Error::validation(format!(
                "Server target has an empty attribute: {}",
                target
            )));
        }

        Ok(Self {
            module: module.to_string(),
            attribute: attribute.map(str::to_string),
        })
    }
}

impl fmt::Display for AppTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attribute) => write!(f, "{}:{}", self.module, attribute),
            None => f.write_str(&self.module),
        }
    }
}

/// What an argument line asks the interpreter to serve, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTarget {
    /// Module run with `-m`, e.g. `uvicorn`
    pub runner: Option<String>,
    /// Server module target
    pub app: AppTarget,
    pub host: String,
    pub port: u16,
    /// Every token not consumed above, in order
    pub extra: Vec<String>,
}

impl ServerTarget {
    /// Read runner, app target, host and port out of argument tokens.
    ///
    /// The app target is the first positional token containing `:`, or the
    /// first positional token when none does.
    pub fn from_tokens(tokens: &[String]) -> Result<Self> {
        let mut runner = None;
        let mut host = None;
        let mut port = None;
        // indices into `extra`
        let mut positionals: Vec<usize> = Vec::new();
        let mut extra: Vec<String> = Vec::new();

        let mut iter = tokens.iter();
        while let Some(token) = iter.next() {
            let token = token.as_str();

            if token == MODULE_FLAG {
                runner = Some(required_value(MODULE_FLAG, iter.next())?);
            } else if token == HOST_FLAG {
                host = Some(checked_host(&required_value(HOST_FLAG, iter.next())?)?);
            } else if token == PORT_FLAG {
                port = Some(parse_port(&required_value(PORT_FLAG, iter.next())?)?);
            } else if let Some(value) = token.strip_prefix("--host=") {
                host = Some(checked_host(value)?);
            } else if let Some(value) = token.strip_prefix("--port=") {
                port = Some(parse_port(value)?);
            } else if token.len() > 2
                && token.starts_with(MODULE_FLAG)
                && !token.starts_with("--")
            {
                runner = Some(token[2..].to_string());
            } else {
                if !token.starts_with('-') {
                    positionals.push(extra.len());
                }
                extra.push(token.to_string());
            }
        }

        let app_index = positionals
            .iter()
            .copied()
            .find(|&i| extra[i].contains(':'))
            .or_else(|| positionals.first().copied())
            .ok_or_else(|| {
                Error::validation("Argument line does not name a server module target")
            })?;

        let app = AppTarget::parse(&extra.remove(app_index))?;

        let host = host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = port.unwrap_or(DEFAULT_PORT);

        Ok(Self {
            runner,
            app,
            host,
            port,
            extra,
        })
    }

    /// `host:port`, with IPv6 hosts bracketed.
    pub fn socket_addr(&self) -> String {
        format_addr(&self.host, self.port)
    }

    /// Whether the server listens on every interface.
    pub fn is_wildcard(&self) -> bool {
        is_wildcard_host(&self.host)
    }

    /// Address a local client should connect to. Wildcard binds are
    /// reached over loopback.
    pub fn probe_addr(&self) -> String {
        let host = match self.host.trim_matches(|c| c == '[' || c == ']') {
            "0.0.0.0" => "127.0.0.1",
            "::" => "::1",
            other => other,
        };
        format_addr(host, self.port)
    }
}

impl fmt::Display for ServerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(runner) = &self.runner {
            write!(f, "{} ", runner)?;
        }
        write!(f, "{} on {}", self.app, self.socket_addr())
    }
}

fn required_value(flag: &str, value: Option<&String>) -> Result<String> {
    value
        .cloned()
        .ok_or_else(|| Error::validation(format!("{} requires a value", flag)))
}

fn checked_host(host: &str) -> Result<String> {
    validate_host(host)?;
    Ok(host.to_string())
}

fn format_addr(host: &str, port: u16) -> String {
    let host = host.trim_matches(|c| c == '[' || c == ']');
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

fn is_wildcard_host(host: &str) -> bool {
    matches!(host.trim_matches(|c| c == '[' || c == ']'), "0.0.0.0" | "::")
}

/// Parse a port flag value. Port 0 is rejected.
pub fn parse_port(value: &str) -> Result<u16> {
    let port: u16 = value.parse().map_err(|_| {
        Error::validation(format!("Port must be between 1 and 65535, got: {}", value))
    })?;

    if port == 0 {
        return Err(Error::validation("Port must be between 1 and 65535, got: 0"));
    }

    Ok(port)
}

/// Accept IP literals (IPv6 optionally bracketed) and DNS host names.
pub fn validate_host(host: &str) -> Result<()> {
    let bare = host.trim_matches(|c| c == '[' || c == ']');
    if bare.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    let valid_name = !bare.is_empty()
        && bare.len() <= 253
        && bare.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });

    if valid_name {
        Ok(())
    } else {
        Err(Error::validation(format!("Invalid host: {:?}", host)))
    }
}
