//! Test doubles for tool discovery and process execution.
//!
//! Enabled with the `mock` feature so downstream crates can exercise their
//! pipelines without the real external programs installed.
//!
//! [`ScriptedRunner::emulating_tools`] understands the command lines gvault
//! issues and reproduces their filesystem effects. Every "archive" it reads
//! (7-Zip inputs, disc images, packages, install images) is a ZIP file, so
//! tests can build fixtures with [`write_zip`].

use crate::archive::zip_directory;
use crate::process::{CommandRunner, Invocation, ProcessOutput};
use crate::tools::{Tool, ToolLocator};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Confirmation line printed by the emulated `chdman verify`.
pub const VERIFY_OK_LINE: &str = "Overall SHA1 verification successful!";

/// Locator that resolves tools to fake `/mock/bin/<name>` paths.
#[derive(Debug, Clone, Default)]
pub struct MockLocator {
    available: HashSet<Tool>,
}

impl MockLocator {
    /// Every tool is available.
    pub fn all() -> Self {
        Self {
            available: Tool::ALL.into_iter().collect(),
        }
    }

    /// No tool is available.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn without(mut self, tool: Tool) -> Self {
        self.available.remove(&tool);
        self
    }
}

impl ToolLocator for MockLocator {
    fn locate(&self, tool: Tool) -> Option<Utf8PathBuf> {
        self.available
            .contains(&tool)
            .then(|| Utf8PathBuf::from(format!("/mock/bin/{}", tool.name())))
    }
}

type Handler = Arc<dyn Fn(&Invocation) -> io::Result<ProcessOutput> + Send + Sync>;

/// Runner that records invocations and answers them with per-tool handlers.
///
/// Tools without a handler succeed with empty output. Clones share the
/// recorded calls and handlers.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    handlers: Arc<Mutex<HashMap<Tool, Handler>>>,
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer invocations of `tool` with `handler`.
    pub fn on<F>(self, tool: Tool, handler: F) -> Self
    where
        F: Fn(&Invocation) -> io::Result<ProcessOutput> + Send + Sync + 'static,
    {
        self.set(tool, handler);
        self
    }

    pub fn set<F>(&self, tool: Tool, handler: F)
    where
        F: Fn(&Invocation) -> io::Result<ProcessOutput> + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.insert(tool, Arc::new(handler));
        }
    }

    /// A runner that emulates every tool gvault drives.
    pub fn emulating_tools() -> Self {
        Self::new()
            .on(Tool::Chdman, emulate_chdman)
            .on(Tool::SevenZip, emulate_seven_zip)
            .on(Tool::ExtractXiso, |_| Ok(ProcessOutput::default()))
            .on(Tool::Ps3Dec, emulate_ps3dec)
            .on(Tool::Pkg2Zip, emulate_pkg2zip)
            .on(Tool::Installer, emulate_installer)
    }

    /// Every invocation seen so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Invocations of a single tool.
    pub fn calls_to(&self, tool: Tool) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|call| call.tool == tool)
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }

        let handler = self
            .handlers
            .lock()
            .ok()
            .and_then(|handlers| handlers.get(&invocation.tool).cloned());
        match handler {
            Some(handler) => handler(invocation),
            None => Ok(ProcessOutput::default()),
        }
    }
}

/// Write a ZIP file containing `entries` of `(name, content)`.
pub fn write_zip(path: impl AsRef<Utf8Path>, entries: &[(&str, &[u8])]) -> io::Result<()> {
    let file = std::fs::File::create(path.as_ref().as_std_path())?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        zip.start_file(*name, options).map_err(io::Error::other)?;
        zip.write_all(content)?;
    }
    zip.finish().map_err(io::Error::other)?;
    Ok(())
}

fn failure(message: impl Into<String>) -> ProcessOutput {
    ProcessOutput {
        code: 1,
        stdout: String::new(),
        stderr: message.into(),
    }
}

fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn unzip_into(archive: &Utf8Path, dir: &Utf8Path) -> io::Result<ProcessOutput> {
    let file = match std::fs::File::open(archive.as_std_path()) {
        Ok(file) => file,
        Err(e) => return Ok(failure(format!("cannot open {}: {}", archive, e))),
    };
    let mut zip = match zip::ZipArchive::new(file) {
        Ok(zip) => zip,
        Err(e) => return Ok(failure(format!("cannot open {} as archive: {}", archive, e))),
    };
    std::fs::create_dir_all(dir.as_std_path())?;
    zip.extract(dir.as_std_path()).map_err(io::Error::other)?;
    Ok(ProcessOutput::default())
}

fn emulate_chdman(invocation: &Invocation) -> io::Result<ProcessOutput> {
    let args = &invocation.args;
    match args.first().map(String::as_str) {
        Some("createcd") => {
            let (Some(input), Some(output)) = (arg_after(args, "-i"), arg_after(args, "-o")) else {
                return Ok(failure("missing arguments"));
            };
            std::fs::copy(input, output)?;
            Ok(ProcessOutput::default())
        }
        Some("extractcd") => {
            let (Some(input), Some(toc), Some(bin)) = (
                arg_after(args, "-i"),
                arg_after(args, "-o"),
                arg_after(args, "-ob"),
            ) else {
                return Ok(failure("missing arguments"));
            };
            if !Utf8Path::new(input).is_file() {
                return Ok(failure(format!("Error opening CHD file {}", input)));
            }
            std::fs::copy(input, bin)?;
            std::fs::write(toc, b"CD_ROM\nTRACK MODE1\n")?;
            Ok(ProcessOutput::default())
        }
        Some("verify") => Ok(ProcessOutput {
            code: 0,
            stdout: format!("Raw SHA1 verification successful!\n{}\n", VERIFY_OK_LINE),
            stderr: String::new(),
        }),
        _ => Ok(failure("unknown command")),
    }
}

fn emulate_seven_zip(invocation: &Invocation) -> io::Result<ProcessOutput> {
    let args = &invocation.args;
    let Some(dir) = args.iter().find_map(|a| a.strip_prefix("-o")) else {
        return Ok(failure("no output directory"));
    };
    let Some(archive) = args.last() else {
        return Ok(failure("no archive"));
    };
    unzip_into(Utf8Path::new(archive), Utf8Path::new(dir))
}

fn emulate_ps3dec(invocation: &Invocation) -> io::Result<ProcessOutput> {
    // d key <key> <in> <out>
    let args = &invocation.args;
    if args.len() != 5 || args[0] != "d" || args[1] != "key" {
        return Ok(failure("usage: ps3dec d key <key> <in> <out>"));
    }
    std::fs::copy(&args[3], &args[4])?;
    Ok(ProcessOutput::default())
}

fn emulate_pkg2zip(invocation: &Invocation) -> io::Result<ProcessOutput> {
    let Some(pkg) = invocation.args.last() else {
        return Ok(failure("no package"));
    };
    let Some(cwd) = &invocation.cwd else {
        return Ok(failure("no working directory"));
    };
    unzip_into(Utf8Path::new(pkg), cwd)
}

fn emulate_installer(invocation: &Invocation) -> io::Result<ProcessOutput> {
    // build <source_dir> <output_image> [--keep-setup-files]
    let args = &invocation.args;
    if args.len() < 3 || args[0] != "build" {
        return Ok(failure("usage: installer build <source_dir> <output_image>"));
    }
    zip_directory(Utf8Path::new(&args[1]), Utf8Path::new(&args[2])).map_err(io::Error::other)?;
    Ok(ProcessOutput::default())
}
