use crate::error::{ReleaseError, Result};
use crate::steps::StepContext;
use std::process::Command;
use tracing::debug;

/// Runs configured external commands for pipeline steps
pub struct StepExecutor;

impl StepExecutor {
    /// Execute one command line with the given context
    ///
    /// Placeholders in every argument are substituted from the context and
    /// the context's RELEASE_* variables are added to the environment. Exit
    /// code 0 is success; anything else is a failure carrying the output.
    ///
    /// # Arguments
    /// * `argv` - Program followed by its arguments
    /// * `context` - Step context
    ///
    /// # Returns
    /// * `Ok(())` if the command succeeds (exit code 0)
    /// * `Err` if argv is empty, the program cannot be spawned, or it exits non-zero
    pub fn execute(argv: &[String], context: &StepContext) -> Result<()> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            ReleaseError::config(format!("{} command is empty", context.kind.name()))
        })?;

        let program = context.substitute(program);
        let args: Vec<String> = args.iter().map(|a| context.substitute(a)).collect();
        debug!(step = context.kind.name(), %program, ?args, "running step");

        let output = Command::new(&program)
            .args(&args)
            .envs(context.to_env_vars())
            .output()
            .map_err(|e| {
                ReleaseError::command(format!(
                    "Failed to execute {} step '{}': {}",
                    context.kind.name(),
                    program,
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(ReleaseError::command(format!(
                "{} step '{}' failed with exit code {}\nStdout: {}\nStderr: {}",
                context.kind.name(),
                program,
                output.status.code().unwrap_or(-1),
                stdout,
                stderr
            )));
        }

        Ok(())
    }

    /// Execute a step if a command is configured for it
    ///
    /// # Returns
    /// * `Ok(true)` if the command ran and succeeded
    /// * `Ok(false)` if no command is configured
    pub fn execute_configured(argv: Option<&[String]>, context: &StepContext) -> Result<bool> {
        match argv {
            Some(argv) => Self::execute(argv, context).map(|()| true),
            None => Ok(false),
        }
    }
}
