//! External per-language tagger processes.
//!
//! The tagger is opaque: it receives the absolute path of the document as its
//! last argument and writes tab-separated annotations to stdout, one token per
//! line. Its command line is assembled by plain concatenation, so document
//! paths containing spaces are refused before anything is spawned.

use crate::error::{Result, SieveError};
use crate::language::Language;
use crate::snapshot::LossyLines;
use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Platform {
    Unix,
    Windows,
}

fn host_platform() -> Result<Platform> {
    if cfg!(windows) {
        Ok(Platform::Windows)
    } else if cfg!(unix) {
        Ok(Platform::Unix)
    } else {
        Err(SieveError::UnsupportedPlatform(std::env::consts::OS.to_string()))
    }
}

/// A fully resolved tagger invocation for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggerCommand {
    program: String,
    args: Vec<String>,
}

impl TaggerCommand {
    /// Resolve the tagger bound to `language` for `document`.
    ///
    /// Fails before touching the process table when no language is selected,
    /// no tagger is bound, or the document path contains a space.
    pub fn resolve(
        language: Option<Language>,
        taggers: &BTreeMap<Language, PathBuf>,
        document: &Path,
    ) -> Result<Self> {
        let language = language.ok_or_else(|| {
            SieveError::Configuration("choose the appropriate language".to_string())
        })?;
        let tagger = taggers.get(&language).ok_or_else(|| {
            SieveError::Configuration(format!("no tagger was specified for {}", language))
        })?;

        let absolute = std::path::absolute(document).map_err(|e| {
            SieveError::io(format!("failed to resolve {}", document.display()), e)
        })?;
        let absolute = absolute.to_string_lossy().into_owned();
        if absolute.contains(' ') {
            return Err(SieveError::PathFormat(PathBuf::from(absolute)));
        }

        Self::for_platform(host_platform()?, language, tagger, absolute)
    }

    fn for_platform(
        platform: Platform,
        language: Language,
        tagger: &Path,
        document: String,
    ) -> Result<Self> {
        match platform {
            Platform::Unix => {
                let tagger = tagger.to_string_lossy();
                let mut words = tagger.split_whitespace().map(str::to_string);
                let program = words.next().ok_or_else(|| {
                    SieveError::Configuration(format!("tagger for {} is empty", language))
                })?;
                let mut args: Vec<String> = words.collect();
                args.push(document);
                Ok(Self { program, args })
            }
            Platform::Windows => Ok(Self {
                program: "cmd.exe".to_string(),
                args: vec![
                    "/c".to_string(),
                    format!("tag-{}", language.name().to_lowercase()),
                    document,
                ],
            }),
        }
    }

    pub fn spawn(&self) -> Result<TaggerProcess> {
        debug!(program = %self.program, args = ?self.args, "spawning tagger");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SieveError::io(format!("failed to run tagger {}", self.program), e))?;
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SieveError::io(
                    format!("failed to capture output of tagger {}", self.program),
                    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout not captured"),
                ));
            }
        };
        Ok(TaggerProcess {
            program: self.program.clone(),
            child,
            lines: LossyLines::new(BufReader::new(stdout)),
        })
    }
}

/// A running tagger whose stdout is consumed line by line, decoded lossily.
///
/// Must be ended with [`finish`](Self::finish) after the output is drained,
/// or [`abort`](Self::abort) when reading stops early.
pub struct TaggerProcess {
    program: String,
    child: Child,
    lines: LossyLines<BufReader<ChildStdout>>,
}

impl Iterator for TaggerProcess {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let program = &self.program;
        self.lines.next().map(|line| {
            line.map_err(|e| {
                SieveError::io(format!("failed to read output of tagger {}", program), e)
            })
        })
    }
}

impl TaggerProcess {
    /// Wait for the tagger to exit. A non-zero status is only logged.
    pub fn finish(self) -> Result<ExitStatus> {
        let TaggerProcess {
            program,
            mut child,
            lines,
        } = self;
        drop(lines);
        let status = child
            .wait()
            .map_err(|e| SieveError::io(format!("failed to wait for tagger {}", program), e))?;
        if !status.success() {
            warn!(tagger = %program, %status, "tagger exited unsuccessfully");
        }
        Ok(status)
    }

    /// Kill the tagger and reap it.
    pub fn abort(self) {
        let TaggerProcess {
            program,
            mut child,
            lines,
        } = self;
        drop(lines);
        if let Err(e) = child.kill() {
            debug!(tagger = %program, error = %e, "tagger already gone");
        }
        let _ = child.wait();
    }
}
