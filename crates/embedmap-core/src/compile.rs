/*
 * compile.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The snippet compiler seam.
 *
 * The compiler may answer with bare code or with code plus its native map;
 * the answer is resolved once, here, into a CompileOutput.
 */

use crate::error::CompileError;
use crate::raw::CompilerNativeMap;
use serde::Deserialize;
use std::io::Write;
use std::process::{Command, Stdio};

/// What a compiler produced for one snippet.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileOutput {
    Code(String),
    CodeWithMap {
        code: String,
        map: CompilerNativeMap,
    },
}

impl CompileOutput {
    pub fn code(&self) -> &str {
        match self {
            CompileOutput::Code(code) | CompileOutput::CodeWithMap { code, .. } => code,
        }
    }

    pub fn map(&self) -> Option<&CompilerNativeMap> {
        match self {
            CompileOutput::Code(_) => None,
            CompileOutput::CodeWithMap { map, .. } => Some(map),
        }
    }

    pub fn into_parts(self) -> (String, Option<CompilerNativeMap>) {
        match self {
            CompileOutput::Code(code) => (code, None),
            CompileOutput::CodeWithMap { code, map } => (code, Some(map)),
        }
    }
}

/// Compiles snippet text into intermediate code.
pub trait SnippetCompiler: Send + Sync {
    fn compile(&self, snippet: &str, file_name: &str) -> Result<CompileOutput, CompileError>;
}

/// Runs an external bridge process as the compiler.
///
/// The snippet is written to the process's stdin and `--filename <name>` is
/// appended to the configured arguments. Stdout must hold either a JSON
/// string (code only) or an object `{"code": ..., "sourceMap": {"lines": ...,
/// "names": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl SnippetCompiler for CommandCompiler {
    fn compile(&self, snippet: &str, file_name: &str) -> Result<CompileOutput, CompileError> {
        tracing::debug!(program = %self.program, file = file_name, "Compiling snippet");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--filename")
            .arg(file_name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CompileError::Unavailable {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A compiler that exits without reading stdin is not an error here;
            // its exit status decides.
            if let Err(e) = stdin.write_all(snippet.as_bytes()) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(CompileError::Failed {
                        file: file_name.to_string(),
                        message: format!("failed to write snippet to compiler: {}", e),
                    });
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|source| CompileError::Unavailable {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CompileError::Failed {
                file: file_name.to_string(),
                message: match output.status.code() {
                    Some(code) => format!("exited with status {}: {}", code, stderr.trim()),
                    None => format!("terminated by signal: {}", stderr.trim()),
                },
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| CompileError::Output {
            file: file_name.to_string(),
            message: "output is not valid UTF-8".to_string(),
        })?;
        parse_output(file_name, &stdout)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCompileResult {
    Code(String),
    Object {
        code: String,
        #[serde(rename = "sourceMap", default)]
        source_map: Option<serde_json::Value>,
    },
}

/// Resolve a compiler's JSON answer into a [`CompileOutput`].
pub fn parse_output(file_name: &str, stdout: &str) -> Result<CompileOutput, CompileError> {
    let output_error = |message: String| CompileError::Output {
        file: file_name.to_string(),
        message,
    };

    let raw: RawCompileResult =
        serde_json::from_str(stdout).map_err(|e| output_error(e.to_string()))?;
    match raw {
        RawCompileResult::Code(code) | RawCompileResult::Object { code, source_map: None } => {
            Ok(CompileOutput::Code(code))
        }
        RawCompileResult::Object {
            code,
            source_map: Some(value),
        } => {
            let map = CompilerNativeMap::from_value(value)
                .map_err(|e| output_error(e.to_string()))?;
            Ok(CompileOutput::CodeWithMap { code, map })
        }
    }
}
