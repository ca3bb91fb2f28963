use launch_common::{AppName, Error, Result, ResultExt};
use std::collections::HashSet;

use crate::args::ArgLine;
use crate::descriptor::{EcosystemFile, LaunchDescriptor};

/// Longest app name a supervisor will accept.
pub const MAX_NAME_LEN: usize = 64;

/// Validate the complete ecosystem file
pub fn validate_ecosystem(file: &EcosystemFile) -> Result<()> {
    if file.apps.is_empty() {
        return Err(Error::validation("At least one app must be configured"));
    }

    // Check for duplicate names
    let mut names = HashSet::new();
    for app in &file.apps {
        if !names.insert(app.name.as_str()) {
            return Err(Error::validation(format!("Duplicate app name: {}", app.name)));
        }

        validate_descriptor(app)?;
    }

    Ok(())
}

/// Validate a single launch descriptor
pub fn validate_descriptor(app: &LaunchDescriptor) -> Result<()> {
    validate_name(&app.name)?;
    validate_script(&app.script).context(format!("App '{}'", app.name))?;
    validate_args(&app.args).context(format!("App '{}'", app.name))?;
    Ok(())
}

fn validate_name(app_name: &AppName) -> Result<()> {
    if app_name.is_empty() {
        return Err(Error::validation("App name cannot be empty"));
    }

    let name = app_name.as_str();
    if name.len() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "App name too long (max {} characters): {}",
            MAX_NAME_LEN, name
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(Error::validation(format!(
            "App name can only contain alphanumeric characters, hyphens, underscores and dots: {}",
            name
        )));
    }

    Ok(())
}

fn validate_script(script: &str) -> Result<()> {
    if script.trim().is_empty() {
        return Err(Error::validation("Script cannot be empty"));
    }

    if script.trim() != script {
        return Err(Error::validation(format!(
            "Script path has surrounding whitespace: {:?}",
            script
        )));
    }

    if script.contains('\0') {
        return Err(Error::validation("Script path cannot contain NUL bytes"));
    }

    Ok(())
}

fn validate_args(args: &str) -> Result<()> {
    if args.trim().is_empty() {
        return Err(Error::validation("Args cannot be empty"));
    }

    let line = ArgLine::parse(args)?;
    if line.is_empty() {
        return Err(Error::validation("Args contain no arguments"));
    }

    line.check_flags()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str, script: &str, args: &str) -> LaunchDescriptor {
        LaunchDescriptor::new(name, script, args)
    }

    fn backend() -> LaunchDescriptor {
        app(
            "betaione_backend",
            "env/bin/python",
            "-m uvicorn app.main:app --host 0.0.0.0 --port 8000",
        )
    }

    #[test]
    fn test_valid_ecosystem() {
        let file = EcosystemFile::new(vec![backend()]);
        assert!(validate_ecosystem(&file).is_ok());
    }

    #[test]
    fn test_empty_ecosystem_rejected() {
        let err = validate_ecosystem(&EcosystemFile::new(vec![])).unwrap_err();
        assert!(err.to_string().contains("At least one app"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let file = EcosystemFile::new(vec![backend(), backend()]);
        let err = validate_ecosystem(&file).unwrap_err();
        assert!(err.to_string().contains("Duplicate app name: betaione_backend"));
    }

    #[test]
    fn test_empty_fields_rejected() {
        assert!(validate_descriptor(&app("", "python", "-m http.server")).is_err());
        assert!(validate_descriptor(&app("web", "", "-m http.server")).is_err());
        assert!(validate_descriptor(&app("web", "python", "   ")).is_err());
        assert!(validate_descriptor(&app("web", "python", "''")).is_ok());
    }

    #[test]
    fn test_blank_name_reported_as_empty() {
        let err = validate_descriptor(&app("  ", "python", "-m http.server")).unwrap_err();
        assert!(err.to_string().contains("App name cannot be empty"));
    }

    #[test]
    fn test_name_rules() {
        let name = |s: &str| validate_name(&AppName::from(s));
        assert!(name("api.v2-worker_1").is_ok());
        assert!(name("has space").is_err());
        assert!(name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_script_whitespace_rejected() {
        let padded = app("web", " env/bin/python", "-m uvicorn a:b");
        let err = validate_descriptor(&padded).unwrap_err();
        assert!(err.to_string().contains("App 'web'"));
    }

    #[test]
    fn test_bad_args_rejected() {
        assert!(validate_descriptor(&app("web", "python", "-m uvicorn 'a:b")).is_err());
        assert!(validate_descriptor(&app("web", "python", "-m uvicorn a:b --port 0")).is_err());
        assert!(validate_descriptor(&app("web", "python", "-m uvicorn a:b --host")).is_err());
    }

    #[test]
    fn test_repeated_port_flag_rejected() {
        let repeated = app("api", "python", "-m uvicorn app.main:app --port 8000 --port 0");
        let err = validate_descriptor(&repeated).unwrap_err();
        assert!(err.to_string().contains("got: 0"));
    }

    #[test]
    fn test_non_server_args_allowed() {
        assert!(validate_descriptor(&app("worker", "node", "worker.js --queue jobs")).is_ok());
    }
}
