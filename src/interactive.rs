//! Terminal front end used when the binary is started without arguments.
//!
//! Each merge runs on a worker thread; progress comes back over a channel
//! and is printed here, so the prompt loop never shares state with the run.

use crate::{
    config::Config,
    engine::{
        PresentationConverter,
        soffice::{SofficeConverter, install_hint},
    },
    pipeline::{Pipeline, RunRequest},
    progress::{ChannelProgress, ProgressEvent},
};
use anyhow::{Context, Result, anyhow};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;

pub fn run(cfg: &Config) -> Result<()> {
    let converter = SofficeConverter::locate(cfg);
    if let Some(conv) = &converter {
        info!("using office converter {}", conv.exe().display());
    }
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut prompter = Prompter::new(stdin.lock(), stdout.lock());
    session(cfg, converter.as_ref(), &mut prompter)
}

/// Prompt loop: ask for folders, merge, offer another round. `converter` is
/// resolved once by the caller and shared by every round.
pub fn session<C, R, W>(
    cfg: &Config,
    converter: Option<&C>,
    prompter: &mut Prompter<R, W>,
) -> Result<()>
where
    C: PresentationConverter + Sync,
    R: BufRead,
    W: Write,
{
    writeln!(
        prompter.out,
        "pdf-stitch: merge presentations, images and PDFs into one PDF"
    )?;
    if converter.is_none() {
        writeln!(
            prompter.out,
            "warning: no office converter found, presentations will be skipped ({})",
            install_hint()
        )?;
    }

    let mut req = RunRequest::from_config(cfg);
    loop {
        let Some(input) = prompter.ask("Input folder", &req.input_dir.display().to_string())? else {
            break;
        };
        let Some(output) = prompter.ask("Output folder", &req.output_dir.display().to_string())?
        else {
            break;
        };
        let Some(name) = prompter.ask("Output file name", &req.output_name)? else {
            break;
        };

        req.input_dir = PathBuf::from(input);
        req.output_dir = PathBuf::from(output);
        req.set_output_name(&name);

        let ok = merge_in_background(cfg, converter, req.clone(), &mut prompter.out)?;
        if ok {
            writeln!(prompter.out, "PDF created: {}", req.output_path().display())?;
        } else {
            writeln!(prompter.out, "Merge failed; see the messages above.")?;
        }

        if !prompter.confirm("Merge another folder?")? {
            break;
        }
    }
    Ok(())
}

/// Runs one merge on a worker thread and prints its progress as it arrives.
pub fn merge_in_background<C, W>(
    cfg: &Config,
    converter: Option<&C>,
    req: RunRequest,
    out: &mut W,
) -> Result<bool>
where
    C: PresentationConverter + Sync,
    W: Write,
{
    let (tx, rx) = crossbeam_channel::unbounded();
    let ok = std::thread::scope(|scope| -> Result<bool> {
        let worker = std::thread::Builder::new()
            .name("pdf-stitch-merge".into())
            .spawn_scoped(scope, move || {
                let pipeline = Pipeline::new(cfg, converter);
                pipeline.run(&req, &ChannelProgress(tx)).is_ok()
            })
            .with_context(|| "spawning merge worker")?;

        // Ends once the worker drops its sender.
        for event in rx.iter() {
            if matches!(event, ProgressEvent::Stage(_)) {
                continue;
            }
            writeln!(out, "{event}")?;
        }

        worker.join().map_err(|_| anyhow!("merge worker panicked"))
    })?;
    info!("interactive merge finished ok={ok}");
    Ok(ok)
}

pub struct Prompter<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    /// Returns the trimmed answer, `default` for an empty line, or `None`
    /// once input is closed.
    pub fn ask(&mut self, label: &str, default: &str) -> io::Result<Option<String>> {
        write!(self.out, "{label} [{default}]: ")?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.out)?;
            return Ok(None);
        }
        let answer = line.trim();
        Ok(Some(if answer.is_empty() {
            default.to_string()
        } else {
            answer.to_string()
        }))
    }

    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{question} (y/N)"), "n")?;
        Ok(matches!(
            answer.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("y" | "yes")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_answer_keeps_default() {
        let mut p = Prompter::new(Cursor::new("\n  other  \n"), Vec::new());
        assert_eq!(p.ask("Input", "input").unwrap().as_deref(), Some("input"));
        assert_eq!(p.ask("Input", "input").unwrap().as_deref(), Some("other"));
        assert_eq!(p.ask("Input", "input").unwrap(), None);
    }

    #[test]
    fn confirm_defaults_to_no() {
        let mut p = Prompter::new(Cursor::new("\nY\nnope\n"), Vec::new());
        assert!(!p.confirm("Again?").unwrap());
        assert!(p.confirm("Again?").unwrap());
        assert!(!p.confirm("Again?").unwrap());
    }

    #[test]
    fn closed_input_ends_the_session() {
        let cfg = Config::default();
        let mut p = Prompter::new(Cursor::new(""), Vec::new());
        session(&cfg, None::<&SofficeConverter>, &mut p).unwrap();
        let printed = String::from_utf8(p.out).unwrap();
        assert!(printed.contains("Input folder"));
        assert!(printed.contains("presentations will be skipped"));
    }
}
