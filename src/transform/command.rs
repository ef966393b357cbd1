// src/transform/command.rs

//! Pipe each asset through an external command.
//!
//! The command reads one file on stdin and writes the transformed file to
//! stdout, e.g. `npx babel --presets @babel/env` for script transpilation.
//! Without a command the stage is a pass-through.

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, info};

use crate::errors::{PipelineError, Result};
use crate::transform::{map_each, Asset, Transform};

#[derive(Debug, Clone)]
pub struct CommandTransform {
    stage: &'static str,
    cmd: Option<String>,
}

impl CommandTransform {
    pub fn new(stage: &'static str, cmd: Option<String>) -> Self {
        let cmd = cmd.filter(|c| !c.trim().is_empty());
        Self { stage, cmd }
    }

    pub fn command(&self) -> Option<&str> {
        self.cmd.as_deref()
    }

    fn run_one(&self, cmd: &str, asset: &Asset) -> Result<Vec<u8>> {
        debug!(stage = self.stage, cmd = %cmd, file = ?asset.rel_path, "piping asset through command");

        // Build a shell command appropriate for the platform.
        let mut command = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(cmd);
            c
        };

        let mut child = command
            .env("SITEPIPE_FILE", &asset.rel_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PipelineError::transform(self.stage, &asset.rel_path, format!("spawning `{cmd}`: {e}"))
            })?;

        // Feed stdin from a separate thread so a chatty child can't deadlock
        // us on a full stdout pipe.
        let stdin = child.stdin.take();
        let input = asset.contents.clone();
        let writer = thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&input)?;
            }
            Ok(())
        });

        let output = child.wait_with_output()?;

        // A broken pipe just means the child stopped reading early; the exit
        // status below is what decides success.
        let _ = writer.join();

        if !output.status.success() {
            return Err(PipelineError::transform(
                self.stage,
                &asset.rel_path,
                format!(
                    "`{cmd}` exited with {}: {}",
                    output.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(output.stdout)
    }
}

impl Transform for CommandTransform {
    fn name(&self) -> &'static str {
        self.stage
    }

    fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        let Some(cmd) = self.cmd.as_deref() else {
            debug!(stage = self.stage, "no command configured; passing assets through");
            return Ok(assets);
        };
        info!(stage = self.stage, cmd = %cmd, files = assets.len(), "running external transform");
        map_each(assets, |asset| {
            let out = self.run_one(cmd, &asset)?;
            Ok(asset.with_contents(out))
        })
    }
}
