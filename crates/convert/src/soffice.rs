//! PDF conversion through the LibreOffice command line.

use estudo_core::{ConversionError, Settings};
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};
use std::process::Command;

/// Directory, inside the output directory, holding the per-call user profile.
pub const PROFILE_DIR_NAME: &str = "lo-profile";

/// Converts a rendered presentation into PDF bytes.
pub trait DocumentConverter: Send + Sync {
    fn convert(&self, source: &Path) -> Result<Vec<u8>, ConversionError>;
}

/// Runs `soffice --headless --convert-to pdf --outdir <dir> <source>`.
///
/// The PDF is written next to the source and read back whole. Each call gets
/// its own user profile under the output directory
/// (`-env:UserInstallation=file://<dir>/lo-profile`), so concurrent
/// conversions never contend for the default profile lock. The call blocks
/// until the tool exits; no timeout is applied.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: String,
    launcher_args: Vec<String>,
    search_path: Option<OsString>,
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self::new(estudo_core::config::DEFAULT_CONVERTER)
    }
}

impl SofficeConverter {
    /// Create a converter running `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            launcher_args: Vec::new(),
            search_path: None,
        }
    }

    /// Create a converter from the shared settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.converter.clone()).with_launcher_args(settings.launcher_args.clone())
    }

    /// Arguments inserted between the program and the conversion arguments.
    pub fn with_launcher_args(mut self, args: Vec<String>) -> Self {
        self.launcher_args = args;
        self
    }

    /// Search these directories instead of `PATH`.
    pub fn with_search_path(mut self, paths: impl Into<OsString>) -> Self {
        self.search_path = Some(paths.into());
        self
    }

    /// Locate the executable, if it exists.
    pub fn resolve(&self) -> Option<PathBuf> {
        resolve_program(&self.program, self.search_path.as_deref())
    }
}

impl DocumentConverter for SofficeConverter {
    fn convert(&self, source: &Path) -> Result<Vec<u8>, ConversionError> {
        let program = self
            .resolve()
            .ok_or_else(|| ConversionError::ToolMissing(self.program.clone()))?;

        let stem = source.file_stem().ok_or_else(|| {
            ConversionError::InvocationFailed(format!("{} has no file name", source.display()))
        })?;
        let outdir = match source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let outdir = if outdir.is_absolute() {
            outdir
        } else {
            let cwd = env::current_dir().map_err(|e| {
                ConversionError::InvocationFailed(format!("Failed to resolve {}: {}", outdir.display(), e))
            })?;
            cwd.join(outdir)
        };
        let profile = format!(
            "-env:UserInstallation={}",
            file_url(&outdir.join(PROFILE_DIR_NAME))
        );

        let mut command = Command::new(&program);
        command
            .args(&self.launcher_args)
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(&outdir)
            .arg(source)
            .arg(&profile);
        log::info!("Converting {} to PDF: {:?}", source.display(), command);

        let output = command.output().map_err(|e| {
            ConversionError::InvocationFailed(format!("Failed to run {}: {}", program.display(), e))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::debug!("Converter stdout: {}", stdout.trim_end());
        if !stderr.is_empty() {
            log::debug!("Converter stderr: {}", stderr.trim_end());
        }

        if !output.status.success() {
            log::warn!("Converter failed with {}", output.status);
            return Err(ConversionError::NonZeroExit {
                code: output.status.code(),
                stderr: stderr.into_owned(),
            });
        }

        let mut pdf_name = stem.to_os_string();
        pdf_name.push(".pdf");
        let expected = outdir.join(pdf_name);
        if !expected.is_file() {
            return Err(ConversionError::OutputMissing {
                listing: list_dir(&outdir),
                expected,
            });
        }

        std::fs::read(&expected).map_err(|e| {
            ConversionError::InvocationFailed(format!("Failed to read {}: {}", expected.display(), e))
        })
    }
}

/// Find `program` on the search path, or check it directly when it is a path.
fn resolve_program(program: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }

    let candidate = Path::new(program);
    if candidate.is_absolute() || candidate.components().count() > 1 {
        return executable_candidates(candidate).into_iter().find(|p| is_executable(p));
    }

    let paths = match search_path {
        Some(paths) => paths.to_os_string(),
        None => env::var_os("PATH")?,
    };
    env::split_paths(&paths)
        .flat_map(|dir| executable_candidates(&dir.join(program)))
        .find(|p| is_executable(p))
}

#[cfg(windows)]
fn executable_candidates(path: &Path) -> Vec<PathBuf> {
    vec![path.to_path_buf(), path.with_extension("exe")]
}

#[cfg(not(windows))]
fn executable_candidates(path: &Path) -> Vec<PathBuf> {
    vec![path.to_path_buf()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// `file://` URL for an absolute path, each component percent-encoded.
fn file_url(path: &Path) -> String {
    let mut url = String::from("file://");
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => {
                url.push('/');
                url.push_str(&prefix.as_os_str().to_string_lossy());
            }
            Component::Normal(part) => {
                url.push('/');
                url.push_str(&urlencoding::encode(&part.to_string_lossy()));
            }
            Component::RootDir | Component::CurDir | Component::ParentDir => {}
        }
    }
    url
}

/// Sorted names of the entries of a directory, for diagnostics.
fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(e) => vec![format!("<unreadable: {}>", e)],
    };
    names.sort();
    names
}
