//! Launch descriptor and ecosystem file models.

use launch_common::{AppName, Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::args::{ArgLine, ServerTarget};
use crate::format::ConfigFormat;
use crate::validation;

/// One managed process: its label, entry point and argument line.
///
/// Serialized with exactly the keys `name`, `script` and `args`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchDescriptor {
    /// Label the supervisor knows the process by
    pub name: AppName,
    /// Executable or interpreter to invoke
    pub script: String,
    /// Shell-style argument line passed to `script`
    pub args: String,
}

impl LaunchDescriptor {
    pub fn new(
        name: impl Into<AppName>,
        script: impl Into<String>,
        args: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            args: args.into(),
        }
    }

    /// Tokenize `args` by shell rules.
    pub fn arg_line(&self) -> Result<ArgLine> {
        ArgLine::parse(&self.args).context(format!("Invalid args for app '{}'", self.name))
    }

    /// Extract the server module, host and port from `args`.
    pub fn server_target(&self) -> Result<ServerTarget> {
        let line = self.arg_line()?;
        ServerTarget::from_tokens(line.tokens())
            .context(format!("No server target for app '{}'", self.name))
    }

    pub fn validate(&self) -> Result<()> {
        validation::validate_descriptor(self)
    }
}

/// Top-level ecosystem file: the `apps` list a supervisor reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EcosystemFile {
    pub apps: Vec<LaunchDescriptor>,
}

impl EcosystemFile {
    pub fn new(apps: Vec<LaunchDescriptor>) -> Self {
        Self { apps }
    }

    /// Load and validate an ecosystem file, picking the format from its name.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e).context(format!("Failed to read config file: {}", path.display()))
        })?;

        debug!(path = %path.display(), format = %format, "Loading ecosystem file");

        Self::load_from_str(&content, format)
            .context(format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate ecosystem content in the given format.
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<Self> {
        let file = format.parse(content)?;
        file.validate()?;
        Ok(file)
    }

    /// Serialize into the given format.
    pub fn to_string(&self, format: ConfigFormat) -> Result<String> {
        format.render(self)
    }

    /// Serialize and write to `path`, picking the format from its name.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = self.to_string(format)?;

        std::fs::write(path, content).map_err(|e| {
            Error::from(e).context(format!("Failed to write config file: {}", path.display()))
        })
    }

    pub fn validate(&self) -> Result<()> {
        validation::validate_ecosystem(self)
    }

    /// Look up an app by name.
    pub fn app(&self, name: &str) -> Result<&LaunchDescriptor> {
        self.apps
            .iter()
            .find(|app| app.name.as_str() == name)
            .ok_or_else(|| Error::not_found(format!("app '{}'", name)))
    }

    /// The only app in the file, if there is exactly one.
    pub fn single(&self) -> Result<&LaunchDescriptor> {
        match self.apps.as_slice() {
            [app] => Ok(app),
            [] => Err(Error::not_found("app (ecosystem file is empty)")),
            apps => Err(Error::validation(format!(
                "{} apps defined, choose one of: {}",
                apps.len(),
                self.names().join(", ")
            ))),
        }
    }

    /// Pick an app by name, or the only one when no name is given.
    pub fn select(&self, name: Option<&str>) -> Result<&LaunchDescriptor> {
        match name {
            Some(name) => self.app(name),
            None => self.single(),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.apps.iter().map(|app| app.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> LaunchDescriptor {
        LaunchDescriptor::new(
            "betaione_backend",
            "env/bin/python",
            "-m uvicorn app.main:app --host 0.0.0.0 --port 8000",
        )
    }

    #[test]
    fn test_server_target_from_descriptor() {
        let target = backend().server_target().unwrap();
        assert_eq!(target.runner.as_deref(), Some("uvicorn"));
        assert_eq!(target.app.to_string(), "app.main:app");
        assert_eq!(target.host, "0.0.0.0");
        assert_eq!(target.port, 8000);
    }

    #[test]
    fn test_select_single_and_by_name() {
        let file = EcosystemFile::new(vec![backend()]);
        assert_eq!(file.select(None).unwrap().name.as_str(), "betaione_backend");
        assert_eq!(
            file.select(Some("betaione_backend")).unwrap().script,
            "env/bin/python"
        );
        assert!(matches!(
            file.select(Some("worker")),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_single_with_many_apps_lists_names() {
        let mut worker = backend();
        worker.name = AppName::from("worker");
        let file = EcosystemFile::new(vec![backend(), worker]);

        let err = file.single().unwrap_err();
        assert!(err.to_string().contains("betaione_backend, worker"));
    }

    #[test]
    fn test_unknown_descriptor_field_rejected() {
        let yaml = "apps:\n  - name: a\n    script: b\n    args: c\n    cwd: /tmp\n";
        assert!(EcosystemFile::load_from_str(yaml, ConfigFormat::Yaml).is_err());
    }

    #[test]
    fn test_missing_descriptor_field_rejected() {
        let yaml = "apps:\n  - name: a\n    script: b\n";
        let err = EcosystemFile::load_from_str(yaml, ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
