//! External build command execution.

use std::path::Path;
use std::process::Command;

use a3s_aci_core::error::{AciError, Result};

/// Run `args[0]` with the remaining arguments and wait for it.
///
/// `env` is applied on top of the inherited environment. stdout and stderr
/// are inherited so build output reaches the user.
pub fn run_command(args: &[String], env: &[(String, String)], cwd: Option<&Path>) -> Result<()> {
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| AciError::ConfigError("No command to execute".to_string()))?;

    let mut cmd = Command::new(program);
    cmd.args(rest);
    for (key, value) in env {
        cmd.env(key, value);
    }
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let command_line = args.join(" ");
    tracing::debug!(command = %command_line, "Running command");

    let status = cmd.status().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AciError::CommandNotFound {
                program: program.clone(),
            }
        } else {
            AciError::io(format!("Failed to execute {}", program), e)
        }
    })?;

    if !status.success() {
        return Err(AciError::CommandFailed {
            command: command_line,
            code: status.code().unwrap_or(-1),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_args() {
        let err = run_command(&[], &[], None).unwrap_err();
        assert!(matches!(err, AciError::ConfigError(_)));
    }

    #[test]
    fn test_missing_program() {
        let err = run_command(&args(&["a3s-aci-no-such-program"]), &[], None).unwrap_err();
        assert!(matches!(err, AciError::CommandNotFound { .. }));
    }

    #[test]
    fn test_success_with_env_and_cwd() {
        let tmp = tempfile::TempDir::new().unwrap();
        let env = vec![("A3S_ACI_TEST_VALUE".to_string(), "42".to_string())];
        run_command(
            &args(&["sh", "-c", "echo $A3S_ACI_TEST_VALUE > out.txt"]),
            &env,
            Some(tmp.path()),
        )
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("out.txt")).unwrap(),
            "42\n"
        );
    }

    #[test]
    fn test_failure_exit_code() {
        let err = run_command(&args(&["sh", "-c", "exit 3"]), &[], None).unwrap_err();
        match err {
            AciError::CommandFailed { code, .. } => assert_eq!(code, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
