use super::{ConverterDiag, PresentationConverter, intermediate_path};
use crate::config::Config;
use crate::error::{ConversionFailure, ConversionResult};
use crate::util::find_executable;
use anyhow::{Context, Result, anyhow};
use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// LibreOffice/OpenOffice in headless mode.
pub struct SofficeConverter {
    exe: PathBuf,
    timeout: Duration,
    doctor_timeout: Duration,
}

impl SofficeConverter {
    pub fn new(exe: PathBuf, timeout: Duration) -> Self {
        Self {
            exe,
            timeout,
            doctor_timeout: Duration::from_secs(30),
        }
    }

    /// Resolves the converter once from config. `None` means presentations
    /// cannot be converted on this machine.
    pub fn locate(cfg: &Config) -> Option<Self> {
        let exe = resolve_soffice_exe(cfg)?;
        let mut conv = Self::new(exe, Duration::from_secs(cfg.converter.timeout_seconds));
        conv.doctor_timeout = Duration::from_secs(cfg.converter.doctor_timeout_seconds);
        Some(conv)
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    fn run(&self, args: &[&OsStr], timeout: Duration) -> Result<Output> {
        debug!("soffice run {} {:?} timeout={:?}", self.exe.display(), args, timeout);
        let mut cmd = Command::new(&self.exe);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own group, so a timeout can take down soffice.bin as well.
            cmd.process_group(0);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("launching {}", self.exe.display()))?;
        wait_with_timeout(&mut child, timeout)
    }
}

impl PresentationConverter for SofficeConverter {
    fn convert(&self, input: &Path, out_dir: &Path) -> ConversionResult {
        let expected = intermediate_path(input, out_dir);
        let args = [
            OsStr::new("--headless"),
            OsStr::new("--convert-to"),
            OsStr::new("pdf"),
            OsStr::new("--outdir"),
            out_dir.as_os_str(),
            input.as_os_str(),
        ];

        let result = self.run(&args, self.timeout);

        // soffice can exit 0 without writing anything, so only the file counts.
        if expected.is_file() {
            if let Err(err) = &result {
                warn!("soffice reported an error but produced output: {err:#}");
            }
            return Ok(expected);
        }

        match result {
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stderr = stderr.trim();
                let mut reason = format!(
                    "expected PDF not found at {} ({})",
                    expected.display(),
                    output.status
                );
                if !stderr.is_empty() {
                    reason.push_str(&format!("; stderr: {stderr}"));
                }
                Err(ConversionFailure::new(reason))
            }
            Err(err) => Err(ConversionFailure::new(format!("{err:#}"))),
        }
    }

    fn doctor(&self) -> Result<ConverterDiag> {
        let output = self.run(&[OsStr::new("--version")], self.doctor_timeout)?;
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(ConverterDiag {
            converter_path: Some(self.exe.display().to_string()),
            version: (!version.is_empty()).then_some(version),
            ok: output.status.success(),
            error: (!output.status.success())
                .then(|| String::from_utf8_lossy(&output.stderr).trim().to_string()),
        })
    }
}

fn resolve_soffice_exe(cfg: &Config) -> Option<PathBuf> {
    let raw = cfg.converter.soffice_path.trim();
    if !raw.is_empty() && !raw.eq_ignore_ascii_case("auto") {
        return find_executable(raw);
    }

    if let Ok(env_val) = std::env::var("SOFFICE_PATH") {
        if let Some(p) = find_executable(&env_val) {
            return Some(p);
        }
    }

    cfg.converter
        .extra_candidates
        .iter()
        .map(String::as_str)
        .chain(platform_candidates().iter().copied())
        .find_map(find_executable)
}

fn platform_candidates() -> &'static [&'static str] {
    if cfg!(target_os = "macos") {
        &[
            "/Applications/LibreOffice.app/Contents/MacOS/soffice",
            "/usr/local/bin/soffice",
            "/opt/homebrew/bin/soffice",
            "soffice",
            "libreoffice",
        ]
    } else if cfg!(windows) {
        &[
            r"C:\Program Files\LibreOffice\program\soffice.exe",
            r"C:\Program Files (x86)\LibreOffice\program\soffice.exe",
            r"C:\Program Files\LibreOffice 7\program\soffice.exe",
            r"C:\Program Files (x86)\LibreOffice 7\program\soffice.exe",
            "soffice.exe",
            "soffice",
        ]
    } else {
        &[
            "soffice",
            "libreoffice",
            "/usr/bin/soffice",
            "/usr/local/bin/soffice",
            "/usr/lib/libreoffice/program/soffice",
            "/snap/bin/libreoffice",
        ]
    }
}

const DOWNLOAD_URL: &str = "https://www.libreoffice.org/download/";

/// How to get a converter on this platform, for warnings and `doctor`.
pub fn install_hint() -> String {
    let command = if cfg!(target_os = "macos") {
        "brew install --cask libreoffice"
    } else if cfg!(windows) {
        "winget install TheDocumentFoundation.LibreOffice"
    } else {
        let os_release = std::fs::read_to_string("/etc/os-release").unwrap_or_default();
        linux_install_command(&os_release)
    };
    format!("install LibreOffice: {command} (or download from {DOWNLOAD_URL})")
}

/// Picks the package manager from the contents of `/etc/os-release`.
fn linux_install_command(os_release: &str) -> &'static str {
    let os = os_release.to_ascii_lowercase();
    if os.contains("ubuntu") || os.contains("debian") {
        "sudo apt-get update && sudo apt-get install libreoffice"
    } else if os.contains("fedora") || os.contains("rhel") || os.contains("centos") {
        "sudo dnf install libreoffice"
    } else if os.contains("arch") {
        "sudo pacman -S libreoffice-fresh"
    } else {
        "sudo apt-get install libreoffice"
    }
}

type Captured = Arc<Mutex<Vec<u8>>>;

/// Waits for `child` and everything it spawned, never longer than `timeout`.
///
/// soffice hands the work to `soffice.bin`, which inherits our pipes, so the
/// readers can outlive the direct child. They are never joined unless they
/// have already finished.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    let (stdout, stdout_thread) = drain(child.stdout.take());
    let (stderr, stderr_thread) = drain(child.stderr.take());
    let deadline = Instant::now() + timeout;

    let status = loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            break Some(status);
        }
        if Instant::now() >= deadline {
            break None;
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    let readers_done = || stdout_thread.is_finished() && stderr_thread.is_finished();
    while status.is_some() && !readers_done() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }

    let Some(status) = status else {
        warn!("soffice timed out after {:?}", timeout);
        kill_tree(child);
        child.wait().with_context(|| "wait after kill")?;
        return Err(anyhow!(
            "conversion timed out after {:?}; stderr: {}",
            timeout,
            String::from_utf8_lossy(&take(&stderr)).trim()
        ));
    };

    if readers_done() {
        stdout_thread
            .join()
            .map_err(|_| anyhow!("stdout reader thread panicked"))?;
        stderr_thread
            .join()
            .map_err(|_| anyhow!("stderr reader thread panicked"))?;
    } else {
        warn!("soffice exited but its helpers kept the pipes open; stopping them");
        kill_tree(child);
    }

    Ok(Output {
        status,
        stdout: take(&stdout),
        stderr: take(&stderr),
    })
}

fn drain<R: Read + Send + 'static>(reader: Option<R>) -> (Captured, JoinHandle<()>) {
    let buf = Captured::default();
    let sink = Arc::clone(&buf);
    let handle = std::thread::spawn(move || {
        let Some(mut reader) = reader else { return };
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => lock(&sink).extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("soffice pipe read failed: {e}");
                    break;
                }
            }
        }
    });
    (buf, handle)
}

fn lock(buf: &Captured) -> MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(PoisonError::into_inner)
}

fn take(buf: &Captured) -> Vec<u8> {
    std::mem::take(&mut *lock(buf))
}

/// Kills the child's whole process group, then the child itself.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        if let Err(e) = quiet("kill", &["-KILL", "--", &group]) {
            debug!("could not kill soffice process group: {e}");
        }
    }
    #[cfg(windows)]
    {
        let pid = child.id().to_string();
        if let Err(e) = quiet("taskkill", &["/T", "/F", "/PID", &pid]) {
            debug!("could not kill soffice process tree: {e}");
        }
    }
    let _ = child.kill();
}

#[cfg(any(unix, windows))]
fn quiet(program: &str, args: &[&str]) -> io::Result<std::process::ExitStatus> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
}
