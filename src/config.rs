use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub converter: Converter,
    #[serde(default)]
    pub image: Image,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Loads `path` when it exists, otherwise falls back to built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn input_dir(&self) -> PathBuf {
        self.paths.resolve(&self.paths.input_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.paths.resolve(&self.paths.output_dir)
    }

    /// Parent directory for per-run scratch areas. `None` means the system temp dir.
    pub fn scratch_parent(&self) -> Option<PathBuf> {
        if self.paths.scratch_dir.is_empty() {
            None
        } else {
            Some(self.paths.resolve(&self.paths.scratch_dir))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub input_dir: String,
    pub output_dir: String,
    pub output_name: String,
    /// Where scratch directories are created. Empty uses the system temp dir.
    pub scratch_dir: String,
    /// Base for relative paths above: "exe" (program directory) or "cwd".
    pub relative_to: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            input_dir: "input".into(),
            output_dir: "output".into(),
            output_name: "merged.pdf".into(),
            scratch_dir: "".into(),
            relative_to: "exe".into(),
        }
    }
}

impl Paths {
    pub fn resolve(&self, raw: &str) -> PathBuf {
        let p = crate::util::expand_tilde(raw);
        if p.is_absolute() {
            return p;
        }
        match self.relative_to.as_str() {
            "cwd" => p,
            _ => crate::util::program_dir().join(p),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Converter {
    /// Path to `soffice`, or "auto" to search the usual install locations.
    pub soffice_path: String,
    pub timeout_seconds: u64,
    pub doctor_timeout_seconds: u64,
    /// Extra candidates tried before the built-in list when `soffice_path` is "auto".
    #[serde(default)]
    pub extra_candidates: Vec<String>,
}
impl Default for Converter {
    fn default() -> Self {
        Self {
            soffice_path: "auto".into(),
            timeout_seconds: 120,
            doctor_timeout_seconds: 30,
            extra_candidates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub dpi: f32,
}
impl Default for Image {
    fn default() -> Self {
        Self { dpi: 100.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub write_report_json: bool,
    pub report_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_report_json: false,
            report_filename: "merge-report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
