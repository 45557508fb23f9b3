//! Scilab function signature parser.
//!
//! Recovers `(name, arguments, outputs)` from a definition line of the form
//! `function [out1, out2] = name(arg1, arg2)` without running any Scilab.
//! Only the bracketed output form is recognised: `function y = f(x)` is
//! rejected. Names are identifiers, so all whitespace is stripped before
//! matching.

use crate::error::{RegistryError, Result};

/// Keyword opening a definition line.
pub const FUNCTION_KEYWORD: &str = "function";

/// A parsed Scilab function signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    /// Function name.
    pub name: String,
    /// Argument names, in declaration order.
    pub arguments: Vec<String>,
    /// Output names, in declaration order.
    pub outputs: Vec<String>,
}

impl FunctionSignature {
    /// Parse a definition line.
    ///
    /// Examples:
    /// - `"function [a] = f(b)"`
    /// - `"function [a,b,c]=dummy_func2(d,e,f)"`
    pub fn parse(line: &str) -> Result<Self> {
        let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        let compact = compact.strip_prefix(FUNCTION_KEYWORD).unwrap_or(compact.as_str());

        // Each part is searched in the whole line, not in what the previous step left.
        let name = between(compact, '=', '(')
            .filter(|name| !name.is_empty())
            .ok_or_else(|| parse_error(line, "no function name"))?;

        let equals = compact.find('=').unwrap_or(compact.len());
        let outputs = compact
            .find('[')
            .and_then(|open| between(&compact[open..], '[', ']').map(|inner| (open, inner)))
            .filter(|(open, inner)| open + inner.len() + 1 < equals)
            .map(|(_, inner)| inner)
            .ok_or_else(|| parse_error(line, "no outputs"))?;
        let outputs = split_names(outputs).ok_or_else(|| parse_error(line, "no outputs"))?;

        let arguments = between(compact, '(', ')')
            .and_then(split_names)
            .ok_or_else(|| parse_error(line, "no arguments"))?;

        Ok(FunctionSignature {
            name: name.to_string(),
            arguments,
            outputs,
        })
    }

    /// The Scilab line calling this function with its own argument names and
    /// binding its own output names: `[a,b]=f(x,y);`.
    pub fn invocation(&self) -> String {
        format!(
            "[{}]={}({});",
            self.outputs.join(","),
            self.name,
            self.arguments.join(",")
        )
    }

    /// Multi-line summary, as listed by [`Registry::describe`](crate::Registry::describe).
    pub fn describe(&self) -> String {
        format!(
            "name : {}\narguments : {}\noutputs : {}\n",
            self.name,
            self.arguments.join(", "),
            self.outputs.join(", ")
        )
    }
}

impl std::fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "function [{}] = {}({})",
            self.outputs.join(", "),
            self.name,
            self.arguments.join(", ")
        )
    }
}

/// Whether a source line opens a function definition.
pub fn is_definition(line: &str) -> bool {
    match line.trim_start().strip_prefix(FUNCTION_KEYWORD) {
        Some(rest) => rest.starts_with(|c: char| c.is_whitespace() || c == '['),
        None => false,
    }
}

/// Text strictly between the first `open` and the next `close` after it.
fn between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)? + open.len_utf8();
    let len = text[start..].find(close)?;
    Some(&text[start..start + len])
}

/// Split a comma-separated name list; `None` if it is empty or has an empty entry.
fn split_names(list: &str) -> Option<Vec<String>> {
    if list.is_empty() {
        return None;
    }
    let names: Vec<String> = list.split(',').map(str::to_string).collect();
    if names.iter().any(String::is_empty) {
        return None;
    }
    Some(names)
}

fn parse_error(line: &str, detail: &str) -> RegistryError {
    RegistryError::Parse {
        detail: detail.to_string(),
        line: line.trim().to_string(),
        location: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(line: &str) -> String {
        match FunctionSignature::parse(line) {
            Err(RegistryError::Parse { detail, .. }) => detail,
            other => panic!("expected parse error for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn parse_single_output() {
        let sig = FunctionSignature::parse("function [a] = f(b)").unwrap();
        assert_eq!(sig.name, "f");
        assert_eq!(sig.arguments, vec!["b"]);
        assert_eq!(sig.outputs, vec!["a"]);
    }

    #[test]
    fn parse_multiple_outputs() {
        let sig = FunctionSignature::parse("function [a,b,c]=dummy_func2(d,e,f)").unwrap();
        assert_eq!(sig.name, "dummy_func2");
        assert_eq!(sig.arguments, vec!["d", "e", "f"]);
        assert_eq!(sig.outputs, vec!["a", "b", "c"]);
    }

    #[test]
    fn parse_with_irregular_spacing() {
        let line = "  function  [a, b,c_interface ,d,e] =\tdummy_func_mat_float( A , x )  ";
        let sig = FunctionSignature::parse(line).unwrap();
        assert_eq!(sig.name, "dummy_func_mat_float");
        assert_eq!(sig.arguments, vec!["A", "x"]);
        assert_eq!(sig.outputs, vec!["a", "b", "c_interface", "d", "e"]);
    }

    #[test]
    fn parse_ignores_trailing_comment() {
        let sig = FunctionSignature::parse("function [y] = g(x) // doubles x").unwrap();
        assert_eq!(sig.name, "g");
        assert_eq!(sig.arguments, vec!["x"]);
    }

    #[test]
    fn reject_missing_equals() {
        assert_eq!(detail("function [a] f(b)"), "no function name");
        assert_eq!(detail("function f(b)"), "no function name");
    }

    #[test]
    fn reject_empty_name() {
        assert_eq!(detail("function [a] = (b)"), "no function name");
    }

    #[test]
    fn reject_unmatched_brackets() {
        assert_eq!(detail("function [a = f(b)"), "no outputs");
        assert_eq!(detail("function a] = f(b)"), "no outputs");
    }

    #[test]
    fn reject_bracketless_output() {
        assert_eq!(detail("function a = f(b)"), "no outputs");
    }

    #[test]
    fn reject_empty_outputs() {
        assert_eq!(detail("function [] = f(b)"), "no outputs");
        assert_eq!(detail("function [a,] = f(b)"), "no outputs");
    }

    #[test]
    fn reject_missing_arguments() {
        assert_eq!(detail("function [a] = f()"), "no arguments");
        assert_eq!(detail("function [a] = f(b"), "no arguments");
    }

    #[test]
    fn invocation_uses_declaration_order() {
        let sig = FunctionSignature::parse("function [a,b,c]=dummy_func2(d,e,f)").unwrap();
        assert_eq!(sig.invocation(), "[a,b,c]=dummy_func2(d,e,f);");
        assert_eq!(sig.to_string(), "function [a, b, c] = dummy_func2(d, e, f)");
    }

    #[test]
    fn definition_lines() {
        assert!(is_definition("function [a] = f(b)"));
        assert!(is_definition("    function[a]=f(b)"));
        assert!(!is_definition("endfunction"));
        assert!(!is_definition("functional = 3"));
        assert!(!is_definition("// function [a] = f(b)"));
    }
}
