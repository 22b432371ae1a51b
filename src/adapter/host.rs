// ABOUTME: Runs template hook commands on the host rather than in a container.
// ABOUTME: Passes the target instance and image to the command through the environment.

use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;

use crate::types::{ContainerName, ImageRef};

/// What a host command is acting on.
#[derive(Debug, Clone)]
pub struct HookContext<'a> {
    pub container: &'a ContainerName,
    pub image: &'a ImageRef,
}

impl HookContext<'_> {
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("ROLLOVER_CONTAINER".to_string(), self.container.to_string());
        env.insert("ROLLOVER_IMAGE".to_string(), self.image.to_string());
        env
    }
}

#[derive(Debug)]
pub struct HostOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl HostOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run `argv` on the host with the context and `extra` variables set.
pub async fn run(
    argv: &[String],
    context: &HookContext<'_>,
    extra: &HashMap<String, String>,
) -> std::io::Result<HostOutput> {
    let Some((program, args)) = argv.split_first() else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty command",
        ));
    };

    tracing::debug!("Running host command {:?}", argv);

    let output = Command::new(program)
        .args(args)
        .envs(context.to_env())
        .envs(extra)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    Ok(HostOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
