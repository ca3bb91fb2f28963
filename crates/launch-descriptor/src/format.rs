//! Config file formats an ecosystem file can be read from and written to.

use launch_common::{Error, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::descriptor::EcosystemFile;

const MODULE_EXPORTS: &str = "module.exports";
const EXPORT_DEFAULT: &str = "export default";

/// Supported ecosystem file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    /// `module.exports = { apps: [...] };` object literal
    EcosystemJs,
    Yaml,
    Json,
}

impl ConfigFormat {
    pub const ALL: [ConfigFormat; 3] = [Self::EcosystemJs, Self::Yaml, Self::Json];

    /// Pick a format from a file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "js" | "cjs" | "mjs" | "json5" => Ok(Self::EcosystemJs),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(Error::UnsupportedFormat {
                extension: if extension.is_empty() {
                    path.display().to_string()
                } else {
                    extension
                },
            }),
        }
    }

    /// Conventional file name for this format.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            Self::EcosystemJs => "ecosystem.config.js",
            Self::Yaml => "ecosystem.yaml",
            Self::Json => "ecosystem.json",
        }
    }

    pub(crate) fn parse(&self, content: &str) -> Result<EcosystemFile> {
        match self {
            Self::Yaml => serde_yaml::from_str(content)
                .map_err(|e| Error::parse(self.to_string(), e.to_string())),
            Self::Json => serde_json::from_str(content)
                .map_err(|e| Error::parse(self.to_string(), e.to_string())),
            Self::EcosystemJs => {
                let literal = object_literal(content)?;
                json5::from_str(literal).map_err(|e| Error::parse(self.to_string(), e.to_string()))
            }
        }
    }

    pub(crate) fn render(&self, file: &EcosystemFile) -> Result<String> {
        match self {
            Self::Yaml => serde_yaml::to_string(file)
                .map_err(|e| Error::serialize(self.to_string(), e.to_string())),
            Self::Json => serde_json::to_string_pretty(file)
                .map(|mut json| {
                    json.push('\n');
                    json
                })
                .map_err(|e| Error::serialize(self.to_string(), e.to_string())),
            Self::EcosystemJs => render_ecosystem_js(file),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EcosystemJs => "ecosystem JS",
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        };
        f.write_str(name)
    }
}

impl FromStr for ConfigFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "js" | "ecosystem" | "json5" => Ok(Self::EcosystemJs),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(Error::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }
}

/// Cut the exported object literal out of an ecosystem JS file.
///
/// Accepts an optional `module.exports =` or `export default` prefix,
/// comments around the literal and a trailing `;`.
fn object_literal(content: &str) -> Result<&str> {
    let js_error = |message: &str| Error::parse(ConfigFormat::EcosystemJs.to_string(), message);

    let body = skip_trivia(content);
    let body = if let Some(rest) = body.strip_prefix(MODULE_EXPORTS) {
        rest.trim_start()
            .strip_prefix('=')
            .ok_or_else(|| js_error("expected '=' after module.exports"))?
    } else if let Some(rest) = body.strip_prefix(EXPORT_DEFAULT) {
        rest
    } else {
        body
    };

    let body = skip_trivia(body);
    if !body.starts_with('{') {
        return Err(js_error("expected an object literal"));
    }

    let end = closing_brace(body).ok_or_else(|| js_error("unterminated object literal"))?;

    let tail = skip_trivia(&body[end + 1..]);
    let tail = tail.strip_prefix(';').unwrap_or(tail);
    if !skip_trivia(tail).is_empty() {
        return Err(js_error("unexpected content after the exported object"));
    }

    Ok(&body[..=end])
}

/// Byte offset of the `}` that closes the `{` at the start of `body`.
/// Braces inside strings and comments do not count.
fn closing_brace(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            quote @ (b'"' | b'\'' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = body[i..].find('\n').map_or(bytes.len(), |n| i + n);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = body[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 1);
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Skip leading whitespace and comments.
fn skip_trivia(mut s: &str) -> &str {
    loop {
        let trimmed = s.trim_start();
        if let Some(rest) = trimmed.strip_prefix("//") {
            s = rest.find('\n').map(|i| &rest[i + 1..]).unwrap_or("");
        } else if let Some(rest) = trimmed.strip_prefix("/*") {
            s = rest.find("*/").map(|i| &rest[i + 2..]).unwrap_or("");
        } else {
            return trimmed;
        }
    }
}

fn render_ecosystem_js(file: &EcosystemFile) -> Result<String> {
    let quote = |value: &str| {
        serde_json::to_string(value)
            .map_err(|e| Error::serialize(ConfigFormat::EcosystemJs.to_string(), e.to_string()))
    };

    let mut apps = Vec::with_capacity(file.apps.len());
    for app in &file.apps {
        apps.push(format!(
            "    {{\n      name: {},\n      script: {},\n      args: {}\n    }}",
            quote(app.name.as_str())?,
            quote(&app.script)?,
            quote(&app.args)?,
        ));
    }

    Ok(format!(
        "module.exports = {{\n  apps: [\n{}\n  ]\n}};\n",
        apps.join(",\n")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::LaunchDescriptor;

    const ECOSYSTEM_JS: &str = r#"module.exports = {
  apps: [
    {
      name: "betaione_backend",
      script: "env/bin/python",
      args: "-m uvicorn app.main:app --host 0.0.0.0 --port 8000"
    }
  ]
};"#;

    #[test]
    fn test_parse_ecosystem_js() {
        let file = ConfigFormat::EcosystemJs.parse(ECOSYSTEM_JS).unwrap();
        assert_eq!(file.apps.len(), 1);
        assert_eq!(file.apps[0].name.as_str(), "betaione_backend");
        assert_eq!(file.apps[0].script, "env/bin/python");
    }

    #[test]
    fn test_parse_js_with_comments_and_single_quotes() {
        let js = concat!(
            "// process list\n/* pm2 */ module.exports = {\n",
            "  apps: [{ name: 'api', script: 'node', args: 'server.js', },],\n",
            "}; // end\n",
        );
        let file = ConfigFormat::EcosystemJs.parse(js).unwrap();
        assert_eq!(file.apps[0].args, "server.js");
    }

    #[test]
    fn test_braces_in_trailing_comments_ignored() {
        let line_comment = format!("{}; // see {{docs}}\n", ECOSYSTEM_JS.trim_end_matches(';'));
        let file = ConfigFormat::EcosystemJs.parse(&line_comment).unwrap();
        assert_eq!(file.apps[0].name.as_str(), "betaione_backend");

        let block_comment = format!("{}; /* }} */\n", ECOSYSTEM_JS.trim_end_matches(';'));
        let file = ConfigFormat::EcosystemJs.parse(&block_comment).unwrap();
        assert_eq!(file.apps.len(), 1);
    }

    #[test]
    fn test_braces_inside_strings_and_comments_ignored() {
        let js = concat!(
            "module.exports = {\n",
            "  // { not a brace\n",
            "  apps: [{ name: 'api', script: 'node', args: \"server.js --tag '}'\" /* } */ }]\n",
            "};\n",
        );
        let file = ConfigFormat::EcosystemJs.parse(js).unwrap();
        assert_eq!(file.apps[0].args, "server.js --tag '}'");
    }

    #[test]
    fn test_unterminated_literal_rejected() {
        let err = ConfigFormat::EcosystemJs
            .parse("module.exports = { apps: [] ; // }")
            .unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_bare_object_literal_accepted() {
        let file = ConfigFormat::EcosystemJs
            .parse("{ apps: [{ name: 'a', script: 'b', args: 'c' }] }")
            .unwrap();
        assert_eq!(file.apps.len(), 1);
    }

    #[test]
    fn test_js_requiring_evaluation_rejected() {
        let js = "const path = require('path');\nmodule.exports = { apps: [] };";
        assert!(matches!(
            ConfigFormat::EcosystemJs.parse(js),
            Err(Error::Parse { .. })
        ));

        let js = "module.exports = { apps: [{ name: 'a', script: path.join('x'), args: 'c' }] };";
        assert!(ConfigFormat::EcosystemJs.parse(js).is_err());
    }

    #[test]
    fn test_trailing_statement_rejected() {
        let js = "module.exports = { apps: [] };\nconsole.log('x');";
        assert!(ConfigFormat::EcosystemJs.parse(js).is_err());
    }

    #[test]
    fn test_rendered_js_matches_ecosystem_layout() {
        let file = EcosystemFile::new(vec![LaunchDescriptor::new(
            "betaione_backend",
            "env/bin/python",
            "-m uvicorn app.main:app --host 0.0.0.0 --port 8000",
        )]);

        let rendered = ConfigFormat::EcosystemJs.render(&file).unwrap();
        assert_eq!(rendered.trim_end(), ECOSYSTEM_JS);
    }

    #[test]
    fn test_format_from_path_and_name() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("ecosystem.config.js")).unwrap(),
            ConfigFormat::EcosystemJs
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("apps.YML")).unwrap(),
            ConfigFormat::Yaml
        );
        assert!(matches!(
            ConfigFormat::from_path(Path::new("apps.toml")),
            Err(Error::UnsupportedFormat { .. })
        ));
        assert_eq!("json".parse::<ConfigFormat>().unwrap(), ConfigFormat::Json);
        assert!("xml".parse::<ConfigFormat>().is_err());
    }
}
