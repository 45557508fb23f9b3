//! Script directory scanning.
//!
//! Every `*.sci` file of a directory is read in file-name order and each line
//! opening a `function` definition is parsed. One malformed definition fails
//! the whole scan. When two definitions share a name the one scanned last
//! wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use scilink_engine::{Engine, Marshaller};
use tracing::{debug, info, warn};

use crate::error::{RegistryError, Result};
use crate::function::ScilabFunction;
use crate::signature::{is_definition, FunctionSignature};

/// Extension of Scilab function files.
pub const DEFAULT_EXTENSION: &str = "sci";

/// The functions defined in a script directory.
#[derive(Debug, Clone)]
pub struct Registry {
    script_dir: PathBuf,
    functions: BTreeMap<String, ScilabFunction>,
}

impl Registry {
    /// Scan the `*.sci` files of `script_dir`.
    pub fn scan(script_dir: &Path) -> Result<Self> {
        Self::scan_with_extension(script_dir, DEFAULT_EXTENSION)
    }

    /// Scan the files of `script_dir` having the given extension.
    pub fn scan_with_extension(script_dir: &Path, extension: &str) -> Result<Self> {
        if !script_dir.is_dir() {
            return Err(RegistryError::NotFound {
                path: script_dir.to_path_buf(),
            });
        }
        info!(script_dir = %script_dir.display(), "scanning Scilab script directory");

        let mut functions = BTreeMap::new();
        for path in script_files(script_dir, extension)? {
            info!(file = %path.display(), "found script file");
            let content = std::fs::read_to_string(&path)?;
            for (index, line) in content.lines().enumerate() {
                if !is_definition(line) {
                    continue;
                }
                let signature = FunctionSignature::parse(line).map_err(|e| match e {
                    RegistryError::Parse { detail, line, .. } => RegistryError::Parse {
                        detail,
                        line,
                        location: Some(format!("{}:{}", path.display(), index + 1)),
                    },
                    other => other,
                })?;
                debug!(%signature, "detected function");

                let function = ScilabFunction::new(signature, path.clone());
                if let Some(previous) = functions.insert(function.name().to_string(), function) {
                    warn!(
                        function = previous.name(),
                        previous = %previous.source().display(),
                        replacement = %path.display(),
                        "duplicate function definition, keeping the last one"
                    );
                }
            }
        }

        Ok(Registry {
            script_dir: script_dir.to_path_buf(),
            functions,
        })
    }

    pub fn script_dir(&self) -> &Path {
        &self.script_dir
    }

    pub fn get(&self, name: &str) -> Option<&ScilabFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Function names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn functions(&self) -> impl Iterator<Item = &ScilabFunction> {
        self.functions.values()
    }

    /// Name → signature view of the registry.
    pub fn signatures(&self) -> BTreeMap<&str, &FunctionSignature> {
        self.functions
            .iter()
            .map(|(name, f)| (name.as_str(), f.signature()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Compile the script directory in the engine so its functions can be called.
    pub fn load_into<E: Engine>(&self, marshaller: &mut Marshaller<'_, E>) -> Result<()> {
        marshaller.load_functions(&self.script_dir)?;
        Ok(())
    }

    /// Human-readable listing of the available functions.
    pub fn describe(&self) -> String {
        let mut out = String::from("Scilab functions in ");
        out.push_str(&self.script_dir.display().to_string());
        out.push('\n');
        for function in self.functions.values() {
            out.push_str(&function.signature().describe());
        }
        out
    }
}

/// Files of `dir` with the given extension, sorted by file name.
fn script_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::CallOutput;
    use ndarray::array;
    use scilink_engine::{MemoryEngine, Session, StartOptions, Value};

    const DUMMY_FUNC1: &str = "function [a] = dummy_func1(b)\n  a = 2 * b\nendfunction\n";
    const DUMMY_FUNC2: &str =
        "function [a,b,c]=dummy_func2(d,e,f)\n  a=3*d\n  b=5*d+e\n  c=6*f+2\nendfunction\n";

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    fn dummy_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "dummy_func1.sci", DUMMY_FUNC1);
        write(dir.path(), "dummy_func2.sci", DUMMY_FUNC2);
        write(dir.path(), "notes.txt", "function [x] = not_scanned(y)\n");
        dir
    }

    fn scalar(value: &Value) -> f64 {
        value.as_f64().unwrap()
    }

    fn dummy_session() -> Session<MemoryEngine> {
        let engine = MemoryEngine::new()
            .with_function("dummy_func1", |args| vec![Value::Float64(2.0 * scalar(&args[0]))])
            .with_function("dummy_func2", |args| {
                let (d, e, f) = (scalar(&args[0]), scalar(&args[1]), scalar(&args[2]));
                vec![
                    Value::Float64(3.0 * d),
                    Value::Float64(5.0 * d + e),
                    Value::Float64(6.0 * f + 2.0),
                ]
            });
        Session::start(engine, &StartOptions::default()).unwrap()
    }

    #[test]
    fn scan_dummy_functions() {
        let dir = dummy_dir();
        let registry = Registry::scan(dir.path()).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), ["dummy_func1", "dummy_func2"]);

        let func1 = registry.get("dummy_func1").unwrap();
        assert_eq!(func1.name(), "dummy_func1");
        assert_eq!(func1.args(), ["b"]);
        assert_eq!(func1.outs(), ["a"]);

        let func2 = registry.get("dummy_func2").unwrap();
        assert_eq!(func2.args(), ["d", "e", "f"]);
        assert_eq!(func2.outs(), ["a", "b", "c"]);
        assert!(!registry.contains("not_scanned"));

        let sources: Vec<_> = registry.functions().map(|f| f.source().to_path_buf()).collect();
        assert_eq!(
            sources,
            [dir.path().join("dummy_func1.sci"), dir.path().join("dummy_func2.sci")]
        );
    }

    #[test]
    fn scan_is_deterministic() {
        let dir = dummy_dir();
        let first = Registry::scan(dir.path()).unwrap();
        let second = Registry::scan(dir.path()).unwrap();
        assert_eq!(first.signatures(), second.signatures());
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            Registry::scan(&missing),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn malformed_definition_fails_whole_scan() {
        let dir = dummy_dir();
        write(dir.path(), "broken.sci", "// helper\nfunction y = broken(x)\n");
        match Registry::scan(dir.path()) {
            Err(RegistryError::Parse { detail, location, .. }) => {
                assert_eq!(detail, "no outputs");
                assert!(location.unwrap().ends_with("broken.sci:2"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_names_last_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.sci", "function [y] = twin(x)\n");
        write(dir.path(), "b.sci", "function [y, z] = twin(x)\n");
        let registry = Registry::scan(dir.path()).unwrap();
        let twin = registry.get("twin").unwrap();
        assert_eq!(twin.outs(), ["y", "z"]);
        assert!(twin.source().ends_with("b.sci"));
    }

    #[test]
    fn several_functions_in_one_file() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "lib.sci",
            "function [y] = f(x)\nendfunction\n\nfunction [u,v] = g(x, w)\nendfunction\n",
        );
        let registry = Registry::scan(dir.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("g").unwrap().args(), ["x", "w"]);
    }

    #[test]
    fn custom_extension() {
        let dir = dummy_dir();
        let registry = Registry::scan_with_extension(dir.path(), "txt").unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), ["not_scanned"]);
    }

    #[test]
    fn call_returns_tuple_and_single() {
        let dir = dummy_dir();
        let registry = Registry::scan(dir.path()).unwrap();
        let session = dummy_session();
        let mut m = session.lock();
        registry.load_into(&mut m).unwrap();

        let func2 = registry.get("dummy_func2").unwrap();
        let out = func2
            .call(&mut m, &[Value::Float64(1.0), Value::Float64(2.0), Value::Float64(3.0)])
            .unwrap();
        assert_eq!(
            out,
            CallOutput::Tuple(vec![
                Value::Float64(3.0),
                Value::Float64(7.0),
                Value::Float64(20.0),
            ])
        );

        let func1 = registry.get("dummy_func1").unwrap();
        let out = func1.call(&mut m, &[Value::Float64(0.2)]).unwrap();
        assert_eq!(out, CallOutput::Single(Value::Float64(0.4)));
        assert_eq!(out.into_values(), [Value::Float64(0.4)]);

        let values = func2
            .call(&mut m, &[Value::Float64(0.0), Value::Float64(1.0), Value::Float64(0.0)])
            .unwrap()
            .into_values();
        assert_eq!(values, [Value::Float64(0.0), Value::Float64(1.0), Value::Float64(2.0)]);
    }

    #[test]
    fn call_named_matches_positional() {
        let dir = dummy_dir();
        let registry = Registry::scan(dir.path()).unwrap();
        let session = dummy_session();
        let mut m = session.lock();
        let func2 = registry.get("dummy_func2").unwrap();

        let args: BTreeMap<String, Value> = [("f", 3.0), ("d", 1.0), ("e", 2.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::Float64(v)))
            .collect();
        let named = func2.call_named(&mut m, &args).unwrap();
        let positional = func2
            .call(&mut m, &[Value::Float64(1.0), Value::Float64(2.0), Value::Float64(3.0)])
            .unwrap();
        assert_eq!(named, positional);
    }

    #[test]
    fn call_sends_arrays_with_their_shape() {
        let dir = dummy_dir();
        let registry = Registry::scan(dir.path()).unwrap();
        let engine = MemoryEngine::new().with_function("dummy_func1", |args| vec![args[0].clone()]);
        let session = Session::start(engine, &StartOptions::default()).unwrap();
        let mut m = session.lock();
        let out = registry
            .get("dummy_func1")
            .unwrap()
            .call(&mut m, &[Value::Matrix(array![[1.0, 2.0], [3.0, 4.0]])])
            .unwrap();
        assert_eq!(out, CallOutput::Single(Value::Matrix(array![[1.0, 2.0], [3.0, 4.0]])));
    }

    #[test]
    fn call_checks_arity() {
        let dir = dummy_dir();
        let registry = Registry::scan(dir.path()).unwrap();
        let session = dummy_session();
        let mut m = session.lock();
        let func2 = registry.get("dummy_func2").unwrap();
        assert!(matches!(
            func2.call(&mut m, &[Value::Float64(1.0)]),
            Err(RegistryError::Arity { .. })
        ));
        let partial: BTreeMap<String, Value> =
            [("d".to_string(), Value::Float64(1.0))].into_iter().collect();
        assert!(matches!(
            func2.call_named(&mut m, &partial),
            Err(RegistryError::Arity { .. })
        ));
    }

    #[test]
    fn failed_engine_call_propagates() {
        let dir = dummy_dir();
        let registry = Registry::scan(dir.path()).unwrap();
        // No function registered in the engine: the invocation itself fails.
        let session = Session::start(MemoryEngine::new(), &StartOptions::default()).unwrap();
        let mut m = session.lock();
        let err = registry
            .get("dummy_func1")
            .unwrap()
            .call(&mut m, &[Value::Float64(1.0)])
            .unwrap_err();
        assert!(matches!(err, RegistryError::Engine(_)));
        assert!(err.to_string().contains("[a]=dummy_func1(b);"));
    }

    #[test]
    fn describe_lists_functions() {
        let dir = dummy_dir();
        let registry = Registry::scan(dir.path()).unwrap();
        let text = registry.describe();
        assert!(text.contains("name : dummy_func2\narguments : d, e, f\noutputs : a, b, c\n"));
    }
}
