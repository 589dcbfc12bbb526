//! External tile engine invocation.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::BuildError;
use crate::config::EngineSettings;
use crate::signal::InterruptState;

/// One run of the tile engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    /// Source extracts (`.pbf`), passed as repeated `--input`
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub config: PathBuf,
    pub process: PathBuf,

    /// Extra arguments appended verbatim
    pub passthrough: Vec<String>,

    /// Directory the engine runs in; relative `require`s in slice
    /// modules resolve against it
    pub working_dir: Option<PathBuf>,
}

impl EngineInvocation {
    /// Command-line arguments for this run
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::with_capacity(self.inputs.len() * 2 + 6 + self.passthrough.len());
        for input in &self.inputs {
            args.push(OsString::from("--input"));
            args.push(input.clone().into_os_string());
        }
        args.push(OsString::from("--output"));
        args.push(self.output.clone().into_os_string());
        args.push(OsString::from("--config"));
        args.push(self.config.clone().into_os_string());
        args.push(OsString::from("--process"));
        args.push(self.process.clone().into_os_string());
        args.extend(self.passthrough.iter().map(OsString::from));
        args
    }
}

/// Something that can run the tile engine.
///
/// Returns the engine's exit code; 0 is success.
pub trait TileEngine {
    fn run(&self, invocation: &EngineInvocation) -> Result<i32, BuildError>;
}

/// Runs the engine as a child process with inherited stdio
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: String,
    args: Vec<String>,
    interrupt: Option<Arc<InterruptState>>,
}

impl ProcessEngine {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
            interrupt: None,
        }
    }

    /// Kill the child when a second interrupt arrives
    pub fn with_interrupt(mut self, state: Arc<InterruptState>) -> Self {
        self.interrupt = Some(state);
        self
    }

    fn exit_now(&self) -> bool {
        self.interrupt.as_ref().is_some_and(|s| s.is_immediate_exit())
    }
}

impl TileEngine for ProcessEngine {
    fn run(&self, invocation: &EngineInvocation) -> Result<i32, BuildError> {
        let args = invocation.to_args();
        debug!(program = %self.program, ?args, "spawning tile engine");

        let mut command = Command::new(&self.program);
        command.args(&self.args).args(&args);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| BuildError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let status = loop {
            if self.exit_now() {
                warn!(program = %self.program, "killing tile engine");
                let _ = child.kill();
                break child.wait()?;
            }
            match child.try_wait()? {
                Some(status) => break status,
                None => std::thread::sleep(Duration::from_millis(100)),
            }
        };

        Ok(exit_code(status))
    }
}

/// Exit code of a finished child; signals map to `128 + signal`.
fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
