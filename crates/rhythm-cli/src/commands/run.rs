use std::io::Write;

use clap::Args;
use rhythm_core::storage::Database;
use rhythm_core::timer::{parse_minutes, Notifier, ALERT_PATTERN_MS};
use rhythm_core::{
    BreakSuggester, Config, Mood, Phase, SessionDriver, SessionEvent, SessionMachine,
};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

#[derive(Args)]
pub struct RunArgs {
    /// Work minutes for this session (1-60)
    #[arg(long)]
    work: Option<u32>,
    /// Break minutes for this session (1-30)
    #[arg(long = "break")]
    break_minutes: Option<u32>,
    /// Also print the per-second tick events
    #[arg(long)]
    ticks: bool,
}

const HELP: &str = "commands: start | pause | reset | skip | mood <tired|good|stressed|keep_going> | settings <work> <break> | suggest | status | quit";

/// Rings the terminal bell once per buzz of the alert pattern.
struct TerminalBell;

impl Notifier for TerminalBell {
    fn phase_completed(&self, phase: Phase) {
        let buzzes = ALERT_PATTERN_MS.iter().skip(1).step_by(2).count();
        let mut err = std::io::stderr();
        let _ = write!(err, "{}", "\x07".repeat(buzzes));
        let _ = writeln!(err, "{} is over", phase.label());
    }
}

enum Line {
    Start,
    Pause,
    Reset,
    Skip,
    Mood(Mood),
    Settings(u32, u32),
    Suggest,
    Status,
    Quit,
}

fn parse_line(line: &str) -> Result<Line, String> {
    let mut words = line.split_whitespace();
    let cmd = words.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = words.collect();
    match (cmd.as_str(), args.as_slice()) {
        ("start", []) => Ok(Line::Start),
        ("pause", []) => Ok(Line::Pause),
        ("reset", []) => Ok(Line::Reset),
        ("skip", []) => Ok(Line::Skip),
        ("mood", [m]) => m.parse().map(Line::Mood),
        ("settings", [w, b]) => {
            let work = parse_minutes("work", w).map_err(|e| e.to_string())?;
            let brk = parse_minutes("break", b).map_err(|e| e.to_string())?;
            Ok(Line::Settings(work, brk))
        }
        ("suggest", []) => Ok(Line::Suggest),
        ("status", []) => Ok(Line::Status),
        ("quit" | "exit", []) => Ok(Line::Quit),
        _ => Err(format!("unrecognized: {line}\n{HELP}")),
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if let Some(work) = args.work {
        config.apply("timer.work_minutes", &work.to_string())?;
    }
    if let Some(brk) = args.break_minutes {
        config.apply("timer.break_minutes", &brk.to_string())?;
    }

    let db = Database::open()?;
    let machine = SessionMachine::new(&config.timer, Box::new(db), Box::new(TerminalBell));
    let suggester = BreakSuggester::from_config(&config.providers);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(session(SessionDriver::new(machine, suggester), args.ticks))
}

async fn session(driver: SessionDriver, show_ticks: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut events = driver.subscribe();
    let renderer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Ticked { .. }) if !show_ticks => {}
                Ok(event) => {
                    match &event {
                        SessionEvent::MoodRequested { .. } => {
                            eprintln!("how did that go? mood <tired|good|stressed|keep_going>");
                        }
                        SessionEvent::SuggestionReady { suggestion } => {
                            eprintln!("break idea: {}", suggestion.headline());
                        }
                        _ => {}
                    }
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{line}"),
                        Err(e) => warn!(error = %e, "could not render event"),
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "renderer fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    eprintln!("{HELP}");
    print_status(&driver).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command = match parse_line(line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        let result = match command {
            Line::Start => driver.start().await,
            Line::Pause => {
                driver.pause().await;
                Ok(())
            }
            Line::Reset => {
                driver.reset().await;
                Ok(())
            }
            Line::Skip => driver.toggle_cycle().await,
            Line::Mood(mood) => driver.resolve_mood(mood).await,
            Line::Settings(work, brk) => driver.save_settings(work, brk).await,
            Line::Suggest => driver.refresh_suggestion().await,
            Line::Status => {
                print_status(&driver).await?;
                Ok(())
            }
            Line::Quit => break,
        };
        if let Err(e) = result {
            eprintln!("error: {e}");
        }
    }

    driver.shutdown();
    renderer.abort();
    Ok(())
}

async fn print_status(driver: &SessionDriver) -> Result<(), serde_json::Error> {
    let status = json!({
        "status": driver.status().await,
        "remaining": driver.remaining_display().await,
        "state": driver.state().await,
        "statistics": driver.statistics().await,
        "suggestion": driver.current_suggestion(),
    });
    println!("{}", serde_json::to_string(&status)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_commands() {
        assert!(matches!(parse_line("start"), Ok(Line::Start)));
        assert!(matches!(parse_line("  SKIP "), Ok(Line::Skip)));
        assert!(matches!(parse_line("mood keep-going"), Ok(Line::Mood(Mood::KeepGoing))));
        assert!(matches!(parse_line("settings 50 10"), Ok(Line::Settings(50, 10))));
        assert!(matches!(parse_line("suggest"), Ok(Line::Suggest)));
        assert!(matches!(parse_line("quit"), Ok(Line::Quit)));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_line("mood sleepy").is_err());
        assert!(parse_line("settings fifty 10").is_err());
        assert!(parse_line("settings 25").is_err());
        assert!(parse_line("suggest again").is_err());
        assert!(parse_line("dance").is_err());
    }
}
