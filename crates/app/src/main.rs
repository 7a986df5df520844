use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use prep_core::model::{SessionId, SessionState, TestDefinition, TestDefinitionDraft};
use services::{AppServices, Clock, EngineConfig, LearnerAction, SessionRunner};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod render;

const DEFAULT_DB_URL: &str = "sqlite://prep.sqlite3";
const DEFAULT_LOG_FILTER: &str = "info,sqlx=warn";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingTestFile,
    MissingSessionId,
    InvalidDbUrl { raw: String },
    InvalidDelay { raw: String },
    InvalidSessionId { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingTestFile => write!(f, "--test (or PREP_TEST_FILE) is required"),
            ArgsError::MissingSessionId => write!(f, "--session is required"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidDelay { raw } => write!(f, "invalid --delay-ms value: {raw}"),
            ArgsError::InvalidSessionId { raw } => write!(f, "invalid --session value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- take    --test <file.json> [--db <sqlite_url>] [--delay-ms <ms>]");
    eprintln!("  cargo run -p app -- results --test <file.json> --session <id> [--db <sqlite_url>] [--json]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --delay-ms {}", services::config::DEFAULT_TRANSITION_DELAY.as_millis());
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PREP_DB_URL, PREP_TEST_FILE, PREP_TRANSITION_DELAY_MS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Take,
    Results,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "results" => Some(Self::Results),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    test_file: PathBuf,
    config: EngineConfig,
    session_id: Option<SessionId>,
    json: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("PREP_DB_URL")
            .ok()
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut test_file = std::env::var("PREP_TEST_FILE").ok().map(PathBuf::from);
        let mut config = EngineConfig::default();
        if let Some(delay) = std::env::var("PREP_TRANSITION_DELAY_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
        {
            config = config.with_transition_delay(Duration::from_millis(delay));
        }
        let mut session_id = None;
        let mut json = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--test" => test_file = Some(PathBuf::from(require_value(args, "--test")?)),
                "--delay-ms" => {
                    let value = require_value(args, "--delay-ms")?;
                    let millis: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidDelay { raw: value.clone() })?;
                    config = config.with_transition_delay(Duration::from_millis(millis));
                }
                "--session" => {
                    let value = require_value(args, "--session")?;
                    let parsed = value
                        .parse::<SessionId>()
                        .map_err(|_| ArgsError::InvalidSessionId { raw: value.clone() })?;
                    session_id = Some(parsed);
                }
                "--json" => json = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            test_file: test_file.ok_or(ArgsError::MissingTestFile)?,
            config,
            session_id,
            json,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn load_test(path: &std::path::Path) -> Result<Arc<TestDefinition>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let draft: TestDefinitionDraft = serde_json::from_str(&raw)?;
    let test = draft.validate()?;
    tracing::debug!(
        slug = test.slug(),
        questions = test.question_count(),
        "test definition loaded"
    );
    Ok(Arc::new(test))
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// What the terminal loop should do with one line of input.
enum Input {
    Send(LearnerAction),
    ConfirmSkip,
    Unknown,
}

fn parse_input(line: &str, state: &SessionState, confirming: bool) -> Input {
    let line = line.trim().to_ascii_lowercase();
    if confirming {
        return if line == "y" || line == "yes" {
            Input::Send(LearnerAction::Skip)
        } else {
            Input::Unknown
        };
    }
    match line.as_str() {
        "a" | "b" | "c" | "d" => {
            let index = line.as_bytes()[0] - b'a';
            Input::Send(LearnerAction::SelectOption(usize::from(index)))
        }
        "s" | "skip" if state.is_last_question() => Input::ConfirmSkip,
        "s" | "skip" => Input::Send(LearnerAction::Skip),
        "n" | "next" => Input::Send(LearnerAction::Next),
        "submit" => Input::Send(LearnerAction::Submit),
        "q" | "quit" => Input::Send(LearnerAction::Quit),
        _ => Input::Unknown,
    }
}

async fn take(
    services: &AppServices,
    test: Arc<TestDefinition>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = services.engine_for(Arc::clone(&test));
    let started = engine.start().await?;
    let session_id = started.session_id();
    println!("{} ({} questions)", test.name(), test.question_count());
    render::question(&test, &started);

    let (handle, task) = SessionRunner::new(engine).spawn();
    let mut updates = handle.updates();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown = started;
    let mut confirming = false;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if state.is_complete() {
                    break;
                }
                if state.current_question_index() != shown.current_question_index() {
                    confirming = false;
                    render::question(&test, &state);
                } else if state.is_locked() && !shown.is_locked() {
                    render::locked(&test, &state);
                } else if state.error() != shown.error() {
                    render::error(&state);
                } else if state.time_left() != shown.time_left() {
                    render::timer(&state);
                }
                shown = state;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line, &shown, confirming) {
                    Input::Send(action) => {
                        confirming = false;
                        if handle.act(action).await.is_err() || action == LearnerAction::Quit {
                            break;
                        }
                    }
                    Input::ConfirmSkip => {
                        confirming = true;
                        println!("  skipping the last question submits the test; type y to confirm");
                    }
                    Input::Unknown => {
                        confirming = false;
                        println!("  ?");
                    }
                }
            }
        }
    }

    drop(handle);
    let last = task.await?;
    match (last.results(), session_id) {
        (Some(summary), Some(id)) => {
            render::results(&test, summary);
            println!("session {id}");
        }
        (Some(summary), None) => render::results(&test, summary),
        (None, Some(id)) => {
            println!("progress saved; run `take` again to resume session {id}");
        }
        (None, None) => {}
    }
    Ok(())
}

async fn results(
    services: &AppServices,
    test: Arc<TestDefinition>,
    session_id: SessionId,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = services.backend_for(Arc::clone(&test));
    let summary = backend.load_results(session_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        render::results(&test, &summary);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Without a subcommand the test is taken.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Take,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Take,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let test = load_test(&parsed.test_file)?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::system(), parsed.config).await?;

    match cmd {
        Command::Take => take(&services, test).await,
        Command::Results => {
            let session_id = parsed.session_id.ok_or(ArgsError::MissingSessionId)?;
            results(&services, test, session_id, parsed.json).await
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
