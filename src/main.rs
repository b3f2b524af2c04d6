#![allow(clippy::print_stderr, clippy::print_stdout)]

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use glimpse::commands::{self, CreateParams, ListFilter, Lookup, Overview, RevealStatus};
use glimpse::config::{
    Config, DATA_DIR_ENV, DEFAULT_DATA_DIR, GOOGLE_MAPS_API_KEY_ENV, UNSPLASH_ACCESS_KEY_ENV,
};
use glimpse::render;
use glimpse::session::{Session, Target};
use glimpse::source::{self, ImageSourceKind};
use glimpse::store::SessionStore;
use glimpse::view::{LookupView, RevealView, SessionView};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use time::{OffsetDateTime, UtcOffset};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "glimpse",
    version,
    about = "Time-delayed reveal sessions with random target images"
)]
struct Cli {
    /// Print machine-readable JSON instead of formatted text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    /// Directory holding the `sessions` folder.
    #[arg(long, global = true, env = DATA_DIR_ENV, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long, env = UNSPLASH_ACCESS_KEY_ENV, hide = true, hide_env_values = true)]
    unsplash_access_key: Option<String>,
    #[arg(long, env = GOOGLE_MAPS_API_KEY_ENV, hide = true, hide_env_values = true)]
    google_maps_api_key: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new session with random target images.
    Create {
        /// Minutes until the targets may be revealed.
        #[arg(short, long, default_value_t = 60)]
        duration: u32,
        /// Number of targets to create (1-10).
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        targets: i64,
        /// Optional session name.
        #[arg(short, long)]
        name: Option<String>,
        /// Image provider.
        #[arg(
            short,
            long,
            value_enum,
            ignore_case = true,
            default_value_t = ImageSourceKind::Unsplash
        )]
        source: ImageSourceKind,
        /// Print target details (images included) after creation.
        #[arg(long)]
        debug: bool,
    },
    /// List sessions (by default, those with hidden targets).
    List {
        /// Show every session.
        #[arg(long)]
        all: bool,
        /// Show only fully revealed sessions.
        #[arg(long)]
        revealed: bool,
    },
    /// Show a session or target by id or code, or an overview of everything.
    Status {
        /// Session id or target code.
        code: Option<String>,
    },
    /// Reveal a target by its code.
    Reveal {
        /// Target code, e.g. AB3D-X7K2 (case and dashes ignored).
        code: String,
        /// Reveal even if the reveal time has not been reached.
        #[arg(short, long)]
        force: bool,
    },
    /// Check that an image provider answers with the configured credential.
    Check {
        /// Image provider.
        #[arg(
            short,
            long,
            value_enum,
            ignore_case = true,
            default_value_t = ImageSourceKind::Unsplash
        )]
        source: ImageSourceKind,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {err:#}", "Error:".red());
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // Local offset lookup has to happen while the process is single-threaded.
    let cfg = Config::new(cli.data_dir)
        .with_credentials(cli.unsplash_access_key, cli.google_maps_api_key)
        .with_local_offset();
    init_tracing(cli.verbose);

    let store = SessionStore::from_config(&cfg);
    let now = OffsetDateTime::now_utc();
    let offset = cfg.display_offset;

    match cli.command {
        Commands::Create {
            duration,
            targets,
            name,
            source: kind,
            debug,
        } => {
            let targets = commands::validate_target_count(targets)?;
            let image_source = source::from_config(kind, &cfg)?;
            let progress = if cli.json {
                ProgressBar::hidden()
            } else {
                creating_progress_bar()?
            };
            let session = commands::create_session(
                &store,
                image_source.as_ref(),
                &CreateParams {
                    duration_minutes: duration,
                    targets,
                    name,
                },
                now,
                &progress,
            )?;
            if cli.json && debug {
                write_json(&SessionView::full(&session))?;
            } else if cli.json {
                write_json(&SessionView::redacted(&session))?;
            } else {
                println!("{}", render::created(&session, duration, offset));
                println!();
                if debug {
                    println!("{}", render::debug_targets(&session));
                    println!();
                }
            }
        }

        Commands::List { all, revealed } => {
            let sessions = commands::list_sessions(&store, ListFilter::from_flags(all, revealed))?;
            if cli.json {
                let views: Vec<SessionView<'_>> =
                    sessions.iter().map(SessionView::redacted).collect();
                write_json(&views)?;
            } else if sessions.is_empty() {
                println!("{}", render::no_sessions());
            } else {
                println!("{}", render::session_list(&sessions, now, offset));
            }
        }

        Commands::Status { code: Some(query) } => {
            let found = commands::lookup(&store, &query)?;
            if cli.json {
                write_json(&LookupView::from(&found))?;
            } else {
                match &found {
                    Lookup::Session { session } => {
                        println!("{}", render::session_status(session, now, offset));
                    }
                    Lookup::Target { session, index } => {
                        let target = session
                            .targets
                            .get(*index)
                            .context("target index out of range")?;
                        println!("{}", render::target_status(session, target, now, offset));
                    }
                }
            }
        }

        Commands::Status { code: None } => {
            let sessions = store.list()?;
            let overview = Overview::build(&sessions, now);
            if cli.json {
                write_json(&overview)?;
            } else if sessions.is_empty() {
                println!("{}", render::no_sessions());
            } else {
                println!("{}", render::overview(&overview));
                println!();
            }
        }

        Commands::Reveal { code, force } => {
            let mut prompt = TerminalConfirm {
                offset,
                json: cli.json,
            };
            let report = commands::reveal_target(&store, &code, force, now, &mut prompt)?;
            if cli.json {
                write_json(&RevealView::from(&report))?;
            } else {
                let target = report.target().context("target index out of range")?;
                match report.status {
                    RevealStatus::Cancelled => {
                        println!("{}", "\nReveal cancelled.\n".bright_black());
                    }
                    RevealStatus::AlreadyRevealed => {
                        println!(
                            "{}",
                            format!("\nTarget {} was already revealed.\n", target.code).yellow()
                        );
                        println!("{}", render::revealed_target(target, &report.session, offset));
                    }
                    RevealStatus::Revealed => {
                        println!("{}", "\nTarget revealed!\n".green());
                        println!("{}", render::revealed_target(target, &report.session, offset));
                    }
                }
            }
        }

        Commands::Check { source: kind } => {
            let image_source = source::from_config(kind, &cfg)?;
            let report = commands::check_source(image_source.as_ref());
            if cli.json {
                write_json(&report)?;
            } else if report.reachable {
                println!("{} {}", kind.to_string().cyan(), "is reachable".green());
            }
            if !report.reachable {
                return Err(anyhow::anyhow!("{kind} did not answer; check your key and network"));
            }
        }
    }

    Ok(())
}

fn creating_progress_bar() -> anyhow::Result<ProgressBar> {
    let style = ProgressStyle::with_template("Creating targets [{bar:30}] {pos}/{len}")
        .map_err(|err| anyhow::anyhow!("progress bar template: {err}"))?;
    Ok(ProgressBar::new(0).with_style(style))
}

const EARLY_REVEAL_PROMPT: &str = "Do you want to force reveal anyway?";

/// Shows why a reveal is early and waits for a yes/no answer.
///
/// On a terminal this is an interactive prompt; otherwise one line is read
/// from stdin, and anything but `y`/`yes` (including end of input) declines.
/// In JSON mode the notice goes to stderr.
struct TerminalConfirm {
    offset: UtcOffset,
    json: bool,
}

impl commands::Confirm for TerminalConfirm {
    fn confirm_early_reveal(
        &mut self,
        session: &Session,
        target: &Target,
        now: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let notice = render::not_ready(target, session, now, self.offset);
        if self.json {
            eprintln!("{notice}");
        } else {
            println!("{notice}");
        }

        let stdin = std::io::stdin();
        if stdin.is_terminal() {
            return dialoguer::Confirm::new()
                .with_prompt(EARLY_REVEAL_PROMPT)
                .default(false)
                .interact()
                .context("read confirmation");
        }

        eprint!("{EARLY_REVEAL_PROMPT} [y/N]: ");
        let mut answer = String::new();
        stdin
            .lock()
            .read_line(&mut answer)
            .context("read confirmation")?;
        eprintln!();
        Ok(commands::is_yes(&answer))
    }
}

fn write_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    let raw = serde_json::to_string_pretty(value).context("serialize JSON")?;
    stdout.write_all(raw.as_bytes()).context("write stdout")?;
    stdout.write_all(b"\n").context("write stdout newline")?;
    Ok(())
}
