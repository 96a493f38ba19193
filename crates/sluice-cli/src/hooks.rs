//! Collaborators backed by external commands.
//!
//! A hook is invoked as `<program> <path> [release name]`. Its exit status is
//! the success flag and its combined stdout/stderr becomes the collaborator
//! log appended to the pass report.

use std::path::Path;
use std::process::{Command, Output};

use sluice_postproc::sentinel::write_marker;
use sluice_postproc::{
    EpisodePostProcessor, FailedDownloadProcessor, PostProcessReport, ProcessingFailure,
};
use tracing::debug;

/// External command wrapper shared by both hook kinds.
#[derive(Debug, Clone)]
pub(crate) struct CommandHook {
    program: String,
}

impl CommandHook {
    pub(crate) fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn invoke(
        &self,
        path: &Path,
        name_hint: Option<&str>,
    ) -> Result<PostProcessReport, ProcessingFailure> {
        debug!(program = %self.program, path = %path.display(), "invoking hook");
        let mut command = Command::new(&self.program);
        command.arg(path);
        if let Some(hint) = name_hint {
            command.arg(hint);
        }
        let output = command.output().map_err(|err| {
            ProcessingFailure::new(format!("unable to run hook {}: {err}", self.program))
        })?;
        Ok(PostProcessReport {
            success: output.status.success(),
            log: combined_output(&output),
        })
    }
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}

/// Episode hook; writes the `.processed` marker after success when the
/// policy keeps processed directories.
#[derive(Debug, Clone)]
pub(crate) struct CommandPostProcessor {
    hook: CommandHook,
    write_markers: bool,
}

impl CommandPostProcessor {
    pub(crate) const fn new(hook: CommandHook, write_markers: bool) -> Self {
        Self {
            hook,
            write_markers,
        }
    }
}

impl EpisodePostProcessor for CommandPostProcessor {
    fn process(
        &self,
        file: &Path,
        name_hint: Option<&str>,
    ) -> Result<PostProcessReport, ProcessingFailure> {
        let mut report = self.hook.invoke(file, name_hint)?;
        if report.success
            && self.write_markers
            && let Err(err) = write_marker(file)
        {
            report
                .log
                .push_str(&format!("\nunable to write processed marker: {}", err.describe()));
        }
        Ok(report)
    }
}

/// Failed-download hook.
#[derive(Debug, Clone)]
pub(crate) struct CommandFailedProcessor {
    hook: CommandHook,
}

impl CommandFailedProcessor {
    pub(crate) const fn new(hook: CommandHook) -> Self {
        Self { hook }
    }
}

impl FailedDownloadProcessor for CommandFailedProcessor {
    fn process(
        &self,
        dir: &Path,
        name_hint: Option<&str>,
    ) -> Result<PostProcessReport, ProcessingFailure> {
        self.hook.invoke(dir, name_hint)
    }
}

/// Stand-in for a hook the invocation does not use.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UnconfiguredHook {
    flag: &'static str,
}

impl UnconfiguredHook {
    pub(crate) const fn new(flag: &'static str) -> Self {
        Self { flag }
    }

    fn refuse(self) -> ProcessingFailure {
        ProcessingFailure::new(format!("no hook configured; pass {}", self.flag))
    }
}

impl EpisodePostProcessor for UnconfiguredHook {
    fn process(
        &self,
        _file: &Path,
        _name_hint: Option<&str>,
    ) -> Result<PostProcessReport, ProcessingFailure> {
        Err(self.refuse())
    }
}

impl FailedDownloadProcessor for UnconfiguredHook {
    fn process(
        &self,
        _dir: &Path,
        _name_hint: Option<&str>,
    ) -> Result<PostProcessReport, ProcessingFailure> {
        Err(self.refuse())
    }
}
