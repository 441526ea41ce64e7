use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// Directory holding the running executable, or `.` if it cannot be determined.
pub fn program_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolves a bare program name against `PATH`, or checks an explicit path.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let candidate = expand_tilde(name);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.is_file().then_some(candidate);
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(&candidate))
        .find(|p| p.is_file())
}

/// Appends `.pdf` to a user-supplied output name that lacks it.
pub fn with_pdf_extension(name: &str) -> String {
    let name = name.trim();
    if name.to_ascii_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_is_added_once() {
        assert_eq!(with_pdf_extension("deck"), "deck.pdf");
        assert_eq!(with_pdf_extension("deck.PDF"), "deck.PDF");
        assert_eq!(with_pdf_extension(" merged.pdf "), "merged.pdf");
    }

    #[test]
    fn explicit_missing_path_is_not_found() {
        assert!(find_executable("/definitely/not/here/soffice").is_none());
    }
}
