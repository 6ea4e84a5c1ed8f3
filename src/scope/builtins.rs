// SPDX-License-Identifier: MIT

//! Host commands shipped with the command-line tool

use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dsl::command::Command;
use crate::dsl::error::BoxError;
use crate::dsl::value::{Object, Value};

/// Every builtin, with `vars` backing the `var` command
pub fn default_commands(vars: HashMap<String, String>) -> Vec<Arc<dyn Command>> {
    vec![
        Arc::new(EnvCommand),
        Arc::new(VarCommand { vars }),
        Arc::new(OsCommand),
        Arc::new(ArchCommand),
        Arc::new(CwdCommand),
        Arc::new(PathCommand),
    ]
}

fn string_arg(command: &str, args: &[Value], index: usize) -> Result<String, BoxError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(_)) | Some(Value::Bool(_)) => Ok(args[index].to_string()),
        Some(other) => Err(format!("{}: argument {} must be a string, got {}", command, index + 1, other).into()),
        None => Err(format!("{}: missing argument {}", command, index + 1).into()),
    }
}

/// `env(name)`: process environment variable or null
pub struct EnvCommand;

#[async_trait]
impl Command for EnvCommand {
    fn name(&self) -> &str {
        "env"
    }

    fn description(&self) -> &str {
        "Value of an environment variable, or null when unset"
    }

    async fn execute(&self, args: Vec<Value>) -> Result<Value, BoxError> {
        let name = string_arg(self.name(), &args, 0)?;
        Ok(env::var(name).ok().into())
    }
}

/// `var(name)`: variable supplied on the command line or null
pub struct VarCommand {
    vars: HashMap<String, String>,
}

#[async_trait]
impl Command for VarCommand {
    fn name(&self) -> &str {
        "var"
    }

    fn description(&self) -> &str {
        "Value of a --var KEY=VALUE pair, or null when not given"
    }

    async fn execute(&self, args: Vec<Value>) -> Result<Value, BoxError> {
        let name = string_arg(self.name(), &args, 0)?;
        Ok(self.vars.get(&name).cloned().into())
    }
}

pub struct OsCommand;

#[async_trait]
impl Command for OsCommand {
    fn name(&self) -> &str {
        "os"
    }

    fn description(&self) -> &str {
        "Operating system name, e.g. linux, macos, windows"
    }

    async fn execute(&self, _args: Vec<Value>) -> Result<Value, BoxError> {
        Ok(Value::from(env::consts::OS))
    }
}

pub struct ArchCommand;

#[async_trait]
impl Command for ArchCommand {
    fn name(&self) -> &str {
        "arch"
    }

    fn description(&self) -> &str {
        "CPU architecture, e.g. x86_64, aarch64"
    }

    async fn execute(&self, _args: Vec<Value>) -> Result<Value, BoxError> {
        Ok(Value::from(env::consts::ARCH))
    }
}

pub struct CwdCommand;

#[async_trait]
impl Command for CwdCommand {
    fn name(&self) -> &str {
        "cwd"
    }

    fn description(&self) -> &str {
        "Current working directory"
    }

    async fn execute(&self, _args: Vec<Value>) -> Result<Value, BoxError> {
        let cwd = env::current_dir()?;
        Ok(Value::from(cwd.display().to_string()))
    }
}

/// `path(p)`: a handle for inspecting a filesystem path
pub struct PathCommand;

#[async_trait]
impl Command for PathCommand {
    fn name(&self) -> &str {
        "path"
    }

    fn description(&self) -> &str {
        "Filesystem path handle with exists, isFile, isDir, name, extension, join() and read()"
    }

    async fn execute(&self, args: Vec<Value>) -> Result<Value, BoxError> {
        let path = string_arg(self.name(), &args, 0)?;
        Ok(Value::handle(PathHandle::new(path)))
    }
}

/// Filesystem path exposed to chain steps
pub struct PathHandle {
    path: PathBuf,
}

impl PathHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Object for PathHandle {
    fn type_name(&self) -> &str {
        "path"
    }

    fn member(&self, key: &str) -> Option<Value> {
        let value = match key {
            "exists" => Value::Bool(self.path.exists()),
            "isFile" => Value::Bool(self.path.is_file()),
            "isDir" => Value::Bool(self.path.is_dir()),
            "name" => self
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .into(),
            "extension" => self
                .path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .into(),
            "toString" => {
                let text = self.path.display().to_string();
                Value::function(move |_| Ok(Value::from(text.as_str())))
            }
            "join" => {
                let base = self.path.clone();
                Value::function(move |args| {
                    let segment = string_arg("join", &args, 0)?;
                    Ok(Value::handle(PathHandle::new(base.join(segment))))
                })
            }
            "read" => {
                let path = self.path.clone();
                Value::async_function(move |_| {
                    let path = path.clone();
                    async move {
                        let content = tokio::fs::read_to_string(&path).await?;
                        Ok::<_, BoxError>(Value::from(content))
                    }
                })
            }
            _ => return None,
        };
        Some(value)
    }
}
