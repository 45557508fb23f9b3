//! TOML configuration.
//!
//! ```toml
//! [engine]
//! sci_path = "/usr/share/scilab"
//! library_dir = "/usr/lib/scilab"
//!
//! [functions]
//! script_dir = "scripts"
//!
//! [[disciplines]]
//! function = "dummy_func2"
//! inputs = { d = "float64", e = "float64", f = "float64" }
//! outputs = { a = "float64", b = "float64", c = "float64" }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scilink_engine::{Engine, NativeEngine, Session, StartOptions};
use scilink_registry::{Registry, DEFAULT_EXTENSION};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DisciplineError, Result};
use crate::grammar::{Grammar, VarType};
use crate::scilab::{default_grammars, ScilabDiscipline};

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScilinkConfig {
    pub engine: EngineConfig,
    #[serde(default)]
    pub functions: FunctionsConfig,
    #[serde(default)]
    pub disciplines: Vec<DisciplineConfig>,
}

/// The `[engine]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Scilab home directory (`SCI`).
    pub sci_path: PathBuf,
    /// Directory holding the Scilab shared libraries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_script: Option<String>,
    #[serde(default)]
    pub stack_size: i32,
    #[serde(default = "default_true")]
    pub terminate_on_drop: bool,
}

/// The `[functions]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionsConfig {
    #[serde(default = "default_script_dir")]
    pub script_dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
}

/// One `[[disciplines]]` entry.
///
/// Omitted grammars default to double arrays for every signature name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisciplineConfig {
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<BTreeMap<String, VarType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<BTreeMap<String, VarType>>,
}

fn default_true() -> bool {
    true
}

fn default_script_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        FunctionsConfig {
            script_dir: default_script_dir(),
            extension: default_extension(),
        }
    }
}

impl EngineConfig {
    pub fn start_options(&self) -> StartOptions {
        StartOptions {
            sci_path: self.sci_path.clone(),
            startup_script: self.startup_script.clone(),
            stack_size: self.stack_size,
        }
    }
}

impl ScilinkConfig {
    /// Parse a configuration from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        let config: ScilinkConfig = toml::from_str(input)?;

        if config.engine.sci_path.as_os_str().is_empty() {
            return Err(DisciplineError::Config {
                detail: "engine.sci_path is required".to_string(),
            });
        }
        if config.functions.extension.is_empty() {
            return Err(DisciplineError::Config {
                detail: "functions.extension must not be empty".to_string(),
            });
        }
        if let Some(d) = config.disciplines.iter().find(|d| d.function.is_empty()) {
            return Err(DisciplineError::Config {
                detail: format!("discipline with empty function name: {d:?}"),
            });
        }

        Ok(config)
    }

    /// Load a configuration file. A relative `script_dir` is resolved
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        if config.functions.script_dir.is_relative() {
            if let Some(base) = path.parent() {
                config.functions.script_dir = base.join(&config.functions.script_dir);
            }
        }
        Ok(config)
    }

    /// Serialize this configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DisciplineError::Config {
            detail: format!("failed to serialize: {e}"),
        })
    }

    /// Scan the configured script directory.
    pub fn registry(&self) -> Result<Registry> {
        Ok(Registry::scan_with_extension(
            &self.functions.script_dir,
            &self.functions.extension,
        )?)
    }

    /// Load the Scilab libraries and start a session.
    pub fn start_native_session(&self) -> Result<Session<NativeEngine>> {
        let library_dir = self
            .engine
            .library_dir
            .as_deref()
            .ok_or_else(|| DisciplineError::Config {
                detail: "engine.library_dir is required to start Scilab".to_string(),
            })?;
        let engine = NativeEngine::load(library_dir)?;
        let session = Session::start(engine, &self.engine.start_options())?;
        Ok(session.with_terminate_on_drop(self.engine.terminate_on_drop))
    }

    /// Build every configured discipline on `session`.
    pub fn build_disciplines<E: Engine>(
        &self,
        session: Arc<Session<E>>,
    ) -> Result<Vec<ScilabDiscipline<E>>> {
        let registry = self.registry()?;
        let mut disciplines = Vec::with_capacity(self.disciplines.len());
        for entry in &self.disciplines {
            let (input_grammar, output_grammar) = entry.grammars(&registry)?;
            disciplines.push(ScilabDiscipline::from_registry(
                session.clone(),
                &registry,
                &entry.function,
                input_grammar,
                output_grammar,
            )?);
        }
        info!(count = disciplines.len(), "built Scilab disciplines");
        Ok(disciplines)
    }
}

impl DisciplineConfig {
    fn grammars(&self, registry: &Registry) -> Result<(Grammar, Grammar)> {
        let function = registry
            .get(&self.function)
            .ok_or_else(|| DisciplineError::UnknownFunction {
                function: self.function.clone(),
                script_dir: registry.script_dir().display().to_string(),
            })?;
        let (default_input, default_output) = default_grammars(function);
        let input = match &self.inputs {
            Some(types) => Grammar::from_types(default_input.name, types.clone()),
            None => default_input,
        };
        let output = match &self.outputs {
            Some(types) => Grammar::from_types(default_output.name, types.clone()),
            None => default_output,
        };
        Ok((input, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discipline::Discipline;
    use crate::grammar::{DataMap, DataValue};
    use scilink_engine::{MemoryEngine, Value};

    const CONFIG: &str = r#"
[engine]
sci_path = "/opt/scilab"
library_dir = "/opt/scilab/lib/scilab"
stack_size = 1000000

[functions]
script_dir = "scripts"

[[disciplines]]
function = "dummy_func2"
inputs = { d = "float64", e = "float64", f = "float64" }
outputs = { a = "float64", b = "float64", c = "float64" }

[[disciplines]]
function = "dummy_func1"
"#;

    #[test]
    fn parse_full_config() {
        let config = ScilinkConfig::parse(CONFIG).unwrap();
        assert_eq!(config.engine.sci_path, PathBuf::from("/opt/scilab"));
        assert_eq!(config.engine.stack_size, 1_000_000);
        assert!(config.engine.terminate_on_drop);
        assert_eq!(config.functions.extension, "sci");
        assert_eq!(config.disciplines.len(), 2);
        assert!(config.disciplines[1].inputs.is_none());

        let options = config.engine.start_options();
        assert_eq!(options.sci_path, PathBuf::from("/opt/scilab"));
        assert!(options.startup_script.is_none());
    }

    #[test]
    fn parse_minimal_config() {
        let config = ScilinkConfig::parse("[engine]\nsci_path = \"/opt/scilab\"\n").unwrap();
        assert_eq!(config.functions, FunctionsConfig::default());
        assert!(config.disciplines.is_empty());
        assert!(config.engine.library_dir.is_none());
    }

    #[test]
    fn reject_invalid_config() {
        assert!(matches!(
            ScilinkConfig::parse("[engine]\nsci_path = \"\"\n"),
            Err(DisciplineError::Config { .. })
        ));
        assert!(matches!(
            ScilinkConfig::parse("[functions]\nscript_dir = \"x\"\n"),
            Err(DisciplineError::Toml(_))
        ));
        assert!(matches!(
            ScilinkConfig::parse("[engine]\nsci_path = \"/s\"\n[[disciplines]]\nfunction = \"\"\n"),
            Err(DisciplineError::Config { .. })
        ));
        assert!(matches!(
            ScilinkConfig::parse(concat!(
                "[engine]\nsci_path = \"/s\"\n",
                "[[disciplines]]\nfunction = \"f\"\ninputs = { x = \"complex\" }\n",
            )),
            Err(DisciplineError::Toml(_))
        ));
    }

    #[test]
    fn native_session_needs_library_dir() {
        let config = ScilinkConfig::parse("[engine]\nsci_path = \"/opt/scilab\"\n").unwrap();
        let err = config.start_native_session().err().unwrap();
        assert!(err.to_string().contains("library_dir"));
    }

    #[test]
    fn round_trip_through_toml() {
        let config = ScilinkConfig::parse(CONFIG).unwrap();
        let reparsed = ScilinkConfig::parse(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, reparsed);
    }

    #[test]
    fn load_and_build_disciplines() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("scripts");
        std::fs::create_dir(&scripts).unwrap();
        std::fs::write(
            scripts.join("dummy_func1.sci"),
            "function [a] = dummy_func1(b)\n  a = 2 * b\nendfunction\n",
        )
        .unwrap();
        std::fs::write(
            scripts.join("dummy_func2.sci"),
            "function [a,b,c]=dummy_func2(d,e,f)\n  a=3*d\n  b=5*d+e\n  c=6*f+2\nendfunction\n",
        )
        .unwrap();
        let path = dir.path().join("scilink.toml");
        std::fs::write(&path, CONFIG).unwrap();

        let config = ScilinkConfig::load(&path).unwrap();
        assert_eq!(config.functions.script_dir, scripts);

        let engine = MemoryEngine::new()
            .with_function("dummy_func1", |args| {
                vec![Value::Float64(2.0 * args[0].as_f64().unwrap_or_default())]
            })
            .with_function("dummy_func2", |args| {
                let x: Vec<f64> = args.iter().map(|v| v.as_f64().unwrap_or_default()).collect();
                vec![
                    Value::Float64(3.0 * x[0]),
                    Value::Float64(5.0 * x[0] + x[1]),
                    Value::Float64(6.0 * x[2] + 2.0),
                ]
            });
        let session = Arc::new(Session::start(engine, &config.engine.start_options()).unwrap());
        let mut disciplines = config.build_disciplines(session).unwrap();
        assert_eq!(disciplines.len(), 2);
        assert_eq!(disciplines[1].input_grammar().get_type("b"), Some(VarType::Float64Array));

        let inputs: DataMap = [
            ("d".to_string(), DataValue::Float64(1.0)),
            ("e".to_string(), DataValue::Float64(2.0)),
            ("f".to_string(), DataValue::Float64(3.0)),
        ]
        .into_iter()
        .collect();
        let out = disciplines[0].execute(&inputs).unwrap();
        assert_eq!(out["b"], DataValue::Float64(7.0));
    }

    #[test]
    fn build_rejects_unknown_function() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScilinkConfig {
            engine: EngineConfig {
                sci_path: PathBuf::from("/opt/scilab"),
                library_dir: None,
                startup_script: None,
                stack_size: 0,
                terminate_on_drop: true,
            },
            functions: FunctionsConfig {
                script_dir: dir.path().to_path_buf(),
                extension: "sci".to_string(),
            },
            disciplines: vec![DisciplineConfig {
                function: "ghost".to_string(),
                inputs: None,
                outputs: None,
            }],
        };
        let session =
            Arc::new(Session::start(MemoryEngine::new(), &StartOptions::default()).unwrap());
        let err = config.build_disciplines(session).err().unwrap();
        assert!(matches!(err, DisciplineError::UnknownFunction { .. }));
    }
}
