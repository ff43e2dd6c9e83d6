use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveTime, Timelike};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use tapereplay::{
    Command, CommandOutcome, LoadSummary, LogConfig, OneMinuteBar, Player, RenderFrame,
    ReplayConfig, Session, SpeedMultiplier, VirtualTime, format_price, init_logging,
};
use tracing::warn;

#[derive(Parser)]
#[command(version, about = "Replay a time-and-sales tape as one-minute bars")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, value_name = "FILE", env = "TAPEREPLAY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print load statistics for a tape
    Summary {
        #[arg(value_name = "TAPE")]
        file: PathBuf,
    },
    /// Print the chart series at one clock position
    Show {
        #[arg(value_name = "TAPE")]
        file: PathBuf,
        /// Scrubber position 0-100
        #[arg(long, conflicts_with = "at")]
        seek: Option<f64>,
        /// Tape clock time, HH:MM:SS[.mmm]
        #[arg(long)]
        at: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Play the tape back, printing the clock and forming bar as it moves
    Play {
        #[arg(value_name = "TAPE")]
        file: PathBuf,
        /// One of 0.1, 1, 2, 3, 5, 10, 30, 60
        #[arg(long)]
        speed: Option<f64>,
        /// Starting scrubber position 0-100
        #[arg(long, default_value_t = 0.0)]
        from: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&LogConfig::from_env()) {
        eprintln!("logging disabled: {err}");
    }

    let config = ReplayConfig::load(cli.config.as_deref())?;
    let mut player = Player::new(config.session_options()?);

    match cli.cmd {
        Cmd::Summary { file } => {
            let summary = load_file(&mut player, &file)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Cmd::Show {
            file,
            seek,
            at,
            format,
        } => {
            load_file(&mut player, &file)?;
            if let Some(seek) = seek {
                player.handle(Command::Seek(seek))?;
            }
            if let Some(at) = at {
                let time = clock_on_tape_day(player.session(), &at)?;
                player.handle(Command::SeekTo(time))?;
            }

            let frame = player.session().frame();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&frame)?),
                OutputFormat::Table => print_frame(&frame),
            }
        }
        Cmd::Play { file, speed, from } => {
            load_file(&mut player, &file)?;
            if let Some(speed) = speed {
                player.handle(Command::SetSpeed(SpeedMultiplier::try_from(speed)?))?;
            }
            player.handle(Command::Seek(from))?;
            player.handle(Command::Play)?;

            let mut last_second = None;
            player
                .run_until_stopped(|session| {
                    let Some(now) = session.current_time() else {
                        return;
                    };
                    if last_second == Some(now.whole_second()) {
                        return;
                    }
                    last_second = Some(now.whole_second());
                    print_progress(session, now);
                })
                .await;
            println!("end of tape");
        }
    }

    Ok(())
}

fn load_file(player: &mut Player, file: &Path) -> Result<LoadSummary, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(file)?;
    let name = file.display().to_string();
    match player.handle(Command::AddFile { name, text })? {
        CommandOutcome::Loaded(summary) => {
            if summary.rows_skipped > 0 {
                warn!(rows_skipped = summary.rows_skipped, "some tape rows were skipped");
            }
            Ok(summary)
        }
        other => Err(format!("unexpected load outcome: {other:?}").into()),
    }
}

/// Resolve `HH:MM:SS[.mmm]` on the date of the tape's first bar.
fn clock_on_tape_day(
    session: &Session,
    text: &str,
) -> Result<VirtualTime, Box<dyn std::error::Error>> {
    let time = NaiveTime::parse_from_str(text.trim(), "%H:%M:%S%.f")?;
    let first = session.bars().first().ok_or("tape has no bars")?;
    let day_start = first.time - first.time.rem_euclid(86_400);
    let millis = (day_start + i64::from(time.num_seconds_from_midnight())) * 1_000
        + i64::from(time.nanosecond() / 1_000_000);
    Ok(VirtualTime::from_millis(millis as f64))
}

fn print_frame(frame: &RenderFrame) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["time", "open", "high", "low", "close", "color"]);

    for bar in &frame.bars {
        table.add_row(bar_row(bar, frame.decimal_places));
    }

    println!("{table}");
    println!(
        "clock {}  seek {:.3}  bars {}",
        frame.clock.as_deref().unwrap_or("--:--:--.---"),
        frame.seek_value,
        frame.bars.len()
    );
}

fn bar_row(bar: &OneMinuteBar, decimal_places: u32) -> Vec<Cell> {
    let time = VirtualTime::from_secs(bar.time).clock_label();
    let color = bar
        .colors
        .as_ref()
        .map(|c| c.color.clone())
        .unwrap_or_default();
    vec![
        Cell::new(&time[..5]),
        Cell::new(format_price(bar.open, decimal_places)),
        Cell::new(format_price(bar.high, decimal_places)),
        Cell::new(format_price(bar.low, decimal_places)),
        Cell::new(format_price(bar.close, decimal_places)),
        Cell::new(color),
    ]
}

fn print_progress(session: &Session, now: VirtualTime) {
    let bars = session.display_bars();
    let places = session.decimal_places();
    match bars.last() {
        Some(bar) => println!(
            "{}  {}  O {} H {} L {} C {}",
            now.clock_label(),
            session.speed(),
            format_price(bar.open, places),
            format_price(bar.high, places),
            format_price(bar.low, places),
            format_price(bar.close, places),
        ),
        None => println!("{}  {}", now.clock_label(), session.speed()),
    }
}
