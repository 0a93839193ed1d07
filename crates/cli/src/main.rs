use anyhow::{bail, Context};
use rosterspin_core::{
    Clock, DrawOutcome, Event, FrameScheduler, RefusalReason, SystemClock, VirtualClock,
};
use rosterspin_data::{default_assets_dir, default_data_dir, open_session, FileSession};
use std::fs;
use std::io::{self, Write};
#[cfg(unix)]
use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::time::Duration;

const USAGE: &str = "\
usage: rosterspin [command] [--seed N] [--assets DIR] [--data DIR] [--instant]

commands:
  cui                 interactive terminal UI (default on a terminal)
  draw                draw one entry and play the reveal (default otherwise)
  history             list past draws, most recent first
  pool                list entries that can still be drawn
  purge               clear the draw history
  icons               list custom icons
  icon-add ID FILE    set a PNG (max 10 MiB) as the icon for ID
  icon-rm ID          remove the custom icon for ID";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Cui,
    Draw,
    History,
    Pool,
    Purge,
    Icons,
    IconAdd { id: String, file: PathBuf },
    IconRemove { id: String },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    command: Option<Command>,
    seed: Option<u64>,
    assets_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    instant: bool,
}

fn parse_cli_options(args: &[String]) -> anyhow::Result<CliOptions> {
    let mut options = CliOptions {
        command: None,
        seed: None,
        assets_dir: None,
        data_dir: None,
        instant: false,
    };
    let mut positional = Vec::new();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--instant" => options.instant = true,
            "--help" | "-h" => options.command = Some(Command::Help),
            "--seed" => {
                let value = args.get(idx + 1).context("--seed needs a value")?;
                options.seed = Some(
                    value
                        .parse::<u64>()
                        .with_context(|| format!("invalid seed {value}"))?,
                );
                idx += 1;
            }
            "--assets" => {
                let value = args.get(idx + 1).context("--assets needs a value")?;
                options.assets_dir = Some(PathBuf::from(value));
                idx += 1;
            }
            "--data" => {
                let value = args.get(idx + 1).context("--data needs a value")?;
                options.data_dir = Some(PathBuf::from(value));
                idx += 1;
            }
            other if other.starts_with("--") => bail!("unknown option {other}"),
            other => positional.push(other.to_string()),
        }
        idx += 1;
    }
    if options.command.is_none() {
        options.command = parse_command(&positional)?;
    }
    Ok(options)
}

fn parse_command(positional: &[String]) -> anyhow::Result<Option<Command>> {
    let Some((name, rest)) = positional.split_first() else {
        return Ok(None);
    };
    let command = match (name.as_str(), rest) {
        ("cui", []) => Command::Cui,
        ("draw", []) => Command::Draw,
        ("history", []) => Command::History,
        ("pool", []) => Command::Pool,
        ("purge", []) => Command::Purge,
        ("icons", []) => Command::Icons,
        ("help", []) => Command::Help,
        ("icon-add", [id, file]) => Command::IconAdd {
            id: id.clone(),
            file: PathBuf::from(file),
        },
        ("icon-rm", [id]) => Command::IconRemove { id: id.clone() },
        _ => bail!("unrecognized command: {}", positional.join(" ")),
    };
    Ok(Some(command))
}

#[cfg(unix)]
fn is_interactive() -> bool {
    let stdin = io::stdin().as_raw_fd();
    let stdout = io::stdout().as_raw_fd();
    unsafe { libc::isatty(stdin) == 1 && libc::isatty(stdout) == 1 }
}

#[cfg(not(unix))]
fn is_interactive() -> bool {
    false
}

fn init_logging() {
    let level = std::env::var("ROSTERSPIN_LOG")
        .ok()
        .and_then(|value| value.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::WARN);
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .try_init();
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_cli_options(&args) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err:#}\n\n{USAGE}");
            std::process::exit(2);
        }
    };
    let command = options.command.clone().unwrap_or_else(|| {
        if is_interactive() {
            Command::Cui
        } else {
            Command::Draw
        }
    });
    if command == Command::Cui {
        if let Err(err) = rosterspin_cui::init_file_logging() {
            eprintln!("log setup error: {err:#}");
        }
        let launch = rosterspin_cui::LaunchOptions {
            seed: options.seed,
            assets_dir: options.assets_dir.clone(),
            data_dir: options.data_dir.clone(),
        };
        if let Err(err) = rosterspin_cui::run(launch) {
            eprintln!("cui launch error: {err:#}");
            std::process::exit(1);
        }
        return;
    }
    init_logging();
    if let Err(err) = run_command(&options, command) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run_command(options: &CliOptions, command: Command) -> anyhow::Result<()> {
    if command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }
    let assets_dir = options.assets_dir.clone().unwrap_or_else(default_assets_dir);
    let data_dir = options
        .data_dir
        .clone()
        .or_else(default_data_dir)
        .context("no data directory: set ROSTERSPIN_DATA or HOME, or pass --data")?;

    if command == Command::Draw && !options.instant && is_interactive() {
        let scheduler = FrameScheduler::new(SystemClock::new());
        let mut session = open_session(&assets_dir, &data_dir, options.seed, scheduler)?;
        return draw_live(&mut session);
    }

    let clock = VirtualClock::new(SystemClock::new().epoch_ms());
    let scheduler = FrameScheduler::new(clock.clone());
    let mut session = open_session(&assets_dir, &data_dir, options.seed, scheduler)?;
    let mut out = io::stdout().lock();
    match command {
        Command::Draw => {
            let picked = play_draw(&mut session, |ms| clock.advance(ms))?;
            writeln!(out, "{}", picked)?;
        }
        Command::History => {
            for entry in session.history().entries() {
                writeln!(out, "{}\t{}", entry.timestamp, entry.id)?;
            }
        }
        Command::Pool => {
            for entry in session.available_pool() {
                writeln!(out, "{}", entry.id)?;
            }
        }
        Command::Purge => {
            let cleared = session.history().len();
            session.purge();
            writeln!(out, "cleared {cleared} entries")?;
        }
        Command::Icons => {
            for (id, uri) in session.icons().icons().iter() {
                writeln!(out, "{id}\t{} bytes", uri.len())?;
            }
        }
        Command::IconAdd { id, file } => {
            let bytes = fs::read(&file).with_context(|| format!("read {}", file.display()))?;
            let uri = session
                .upload_icon(&id, &bytes)
                .with_context(|| format!("upload icon for {id}"))?;
            writeln!(out, "{id}\t{} bytes", uri.len())?;
        }
        Command::IconRemove { id } => {
            if session.remove_icon(&id)? {
                writeln!(out, "removed icon for {id}")?;
            } else {
                writeln!(out, "{id} has no custom icon")?;
            }
        }
        Command::Cui | Command::Help => {}
    }
    report_persist_failures(&mut session);
    Ok(())
}

/// Runs one draw to completion, letting `wait` pass the time between wake-ups.
fn play_draw<C: Clock>(
    session: &mut FileSession<C>,
    mut wait: impl FnMut(u64),
) -> anyhow::Result<String> {
    match session.trigger_draw() {
        DrawOutcome::Started(_) => {}
        DrawOutcome::Refused(RefusalReason::PoolEmpty) => {
            bail!("every entry has been drawn; run `rosterspin purge` to start over")
        }
        DrawOutcome::Refused(reason) => bail!("draw refused: {reason:?}"),
    }
    loop {
        let Some(delay) = session.time_until_next_wakeup() else {
            bail!("reveal stopped without settling");
        };
        wait(delay);
        if let Some(entry) = session.pump() {
            return Ok(entry.id);
        }
    }
}

fn draw_live(session: &mut FileSession<SystemClock>) -> anyhow::Result<()> {
    let mut shown = String::new();
    let mut stdout = io::stdout();
    match session.trigger_draw() {
        DrawOutcome::Started(_) => {}
        DrawOutcome::Refused(RefusalReason::PoolEmpty) => {
            bail!("every entry has been drawn; run `rosterspin purge` to start over")
        }
        DrawOutcome::Refused(reason) => bail!("draw refused: {reason:?}"),
    }
    let picked = loop {
        let Some(delay) = session.time_until_next_wakeup() else {
            bail!("reveal stopped without settling");
        };
        std::thread::sleep(Duration::from_millis(delay));
        let committed = session.pump();
        if let Some(entry) = session.animator().centered() {
            if entry.id != shown {
                shown = entry.id.clone();
                write!(stdout, "\r\x1b[2K{shown}")?;
                stdout.flush()?;
            }
        }
        if let Some(entry) = committed {
            break entry;
        }
    };
    writeln!(stdout, "\r\x1b[2K{}", picked.id)?;
    report_persist_failures(session);
    Ok(())
}

fn report_persist_failures<C: Clock>(session: &mut FileSession<C>) {
    for event in session.events().drain() {
        if let Event::PersistFailed { target, message } = event {
            eprintln!("warning: could not save {target:?}: {message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "rosterspin_cli_{tag}_{}_{}",
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn parses_commands_and_flags() {
        let options =
            parse_cli_options(&args(&["draw", "--seed", "9", "--instant", "--data", "d"]))
                .expect("parse");
        assert_eq!(options.command, Some(Command::Draw));
        assert_eq!(options.seed, Some(9));
        assert!(options.instant);
        assert_eq!(options.data_dir, Some(PathBuf::from("d")));

        let options = parse_cli_options(&args(&["icon-add", "Ash", "ash.png"])).expect("parse");
        assert_eq!(
            options.command,
            Some(Command::IconAdd {
                id: "Ash".to_string(),
                file: PathBuf::from("ash.png"),
            })
        );
        assert_eq!(parse_cli_options(&[]).expect("parse").command, None);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_cli_options(&args(&["--seed", "x"])).is_err());
        assert!(parse_cli_options(&args(&["--wat"])).is_err());
        assert!(parse_cli_options(&args(&["icon-rm"])).is_err());
        assert!(parse_cli_options(&args(&["draw", "extra"])).is_err());
    }

    #[test]
    fn instant_draws_exhaust_the_pool() {
        let assets = unique_temp_dir("assets");
        let data = unique_temp_dir("data");
        fs::create_dir_all(&assets).expect("mkdir");
        fs::write(assets.join("roster.json"), r#"["A","B"]"#).expect("roster");
        let clock = VirtualClock::new(0);
        let mut session = open_session(&assets, &data, Some(3), FrameScheduler::new(clock.clone()))
            .expect("open");

        let first = play_draw(&mut session, |ms| clock.advance(ms.max(1))).expect("first");
        let second = play_draw(&mut session, |ms| clock.advance(ms.max(1))).expect("second");
        assert_ne!(first, second);
        let err = play_draw(&mut session, |ms| clock.advance(ms.max(1))).expect_err("empty");
        assert!(err.to_string().contains("purge"));
        let _ = fs::remove_dir_all(assets);
        let _ = fs::remove_dir_all(data);
    }
}
