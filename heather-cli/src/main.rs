mod simulated;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::{LevelFilter, info};

use heather::view::{elapsed_label, heart_rate_label};
use heather::{
    ActivityType, Control, ControllerConfig, DisplayAdapter, LocationType, ViewState,
    WorkoutManager, WorkoutState,
};

use crossterm::event::{self, KeyCode, KeyEventKind};
use ratatui::{
    DefaultTerminal,
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
};

use simulated::SimulatedService;

#[derive(Parser, Debug)]
#[command(version, about = "Heather - workout heart rate tracker", long_about = None)]
struct Args {
    /// JSON controller config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    tick_ms: Option<u64>,
    #[arg(long, global = true)]
    activity: Option<String>,
    #[arg(long, global = true)]
    location: Option<String>,
    /// Resting heart rate of the simulated sensor
    #[arg(long, global = true, default_value_t = 62)]
    resting_bpm: u32,
    /// Simulate a denied authorization prompt
    #[arg(long, global = true)]
    deny_authorization: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive workout screen
    Interactive {
        /// Write logs here instead of discarding them
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Scripted start/pause/resume/end run printed to stdout
    Headless {
        #[arg(long, default_value_t = 5)]
        run_secs: u64,
        #[arg(long, default_value_t = 3)]
        pause_secs: u64,
        #[arg(long, default_value_t = 2)]
        resume_secs: u64,
    },
}

fn init_logger(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .format(move |buf, record| {
            writeln!(
                buf,
                "{}: {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter_level(level)
        .parse_default_env();
    if let Some(path) = log_file {
        builder.target(env_logger::Target::Pipe(Box::new(File::create(path)?)));
    }
    let _ = builder.try_init();
    Ok(())
}

fn load_config(args: &Args) -> Result<ControllerConfig> {
    let mut config = match &args.config {
        Some(path) => ControllerConfig::from_json_file(path)?,
        None => ControllerConfig::default(),
    }
    .with_env_overrides();
    if let Some(ms) = args.tick_ms {
        config.tick_interval_ms = ms;
    }
    if let Some(activity) = &args.activity {
        config.workout.activity_type = activity.parse::<ActivityType>()?;
    }
    if let Some(location) = &args.location {
        config.workout.location_type = location.parse::<LocationType>()?;
    }
    Ok(config)
}

fn control_key(control: Control) -> &'static str {
    match control {
        Control::Start => "s: start",
        Control::Pause => "p: pause",
        Control::Resume => "r: resume",
        Control::End => "e: end",
    }
}

fn state_color(state: WorkoutState) -> Color {
    match state {
        WorkoutState::Running => Color::Green,
        WorkoutState::Paused => Color::Yellow,
        WorkoutState::Idle | WorkoutState::Ended => Color::Gray,
    }
}

async fn run_workout_screen(mut terminal: DefaultTerminal, mut adapter: DisplayAdapter) -> Result<()> {
    adapter.on_appear()?;
    let mut status_message = String::new();

    loop {
        let view = adapter.snapshot();
        let controls = adapter.controls();

        terminal.draw(|frame| {
            let chunks = Layout::vertical([
                Constraint::Length(3),
                Constraint::Min(4),
                Constraint::Length(3),
            ])
            .split(frame.area());

            // Header
            let header = Paragraph::new(format!("Heather - {}", view.run_state))
                .style(
                    Style::default()
                        .fg(state_color(view.run_state))
                        .add_modifier(Modifier::BOLD),
                )
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(header, chunks[0]);

            let readings = Paragraph::new(vec![
                Line::from(elapsed_label(&view)),
                Line::from(heart_rate_label(&view)),
            ])
            .block(Block::default().borders(Borders::ALL).title("Workout"));
            frame.render_widget(readings, chunks[1]);

            // Footer with the controls on offer
            let mut hints: Vec<&str> = controls.iter().map(|c| control_key(*c)).collect();
            hints.push("q: quit");
            let footer_text = if status_message.is_empty() {
                hints.join(" | ")
            } else {
                format!("{} | {}", status_message, hints.join(" | "))
            };
            let footer = Paragraph::new(footer_text)
                .style(Style::default().fg(Color::White))
                .block(Block::default().borders(Borders::ALL).title("Controls"));
            frame.render_widget(footer, chunks[2]);
        })?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        if let event::Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let control = match key.code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                    return Ok(());
                }
                KeyCode::Char('s') | KeyCode::Char('S') => Control::Start,
                KeyCode::Char('p') | KeyCode::Char('P') => Control::Pause,
                KeyCode::Char('r') | KeyCode::Char('R') => Control::Resume,
                KeyCode::Char('e') | KeyCode::Char('E') => Control::End,
                _ => continue,
            };
            status_message = if adapter.press(control)? {
                String::new()
            } else {
                format!("{} is not available", control)
            };
        }
    }
}

fn print_view(view: &ViewState) {
    println!(
        "[{:>7}] {:<24} {}",
        view.run_state.to_string(),
        elapsed_label(view),
        heart_rate_label(view)
    );
}

async fn run_headless(mut adapter: DisplayAdapter, steps: [(Control, u64); 4]) -> Result<()> {
    adapter.on_appear()?;

    for (control, hold_secs) in steps {
        println!("> {}", control);
        adapter.press(control)?;
        adapter.manager().flush().await?;
        print_view(&adapter.snapshot());
        for _ in 0..hold_secs {
            tokio::time::sleep(Duration::from_secs(1)).await;
            print_view(&adapter.snapshot());
        }
    }
    Ok(())
}

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();
    let config = load_config(&args)?;
    let service = Arc::new(SimulatedService::new(
        !args.deny_authorization,
        args.resting_bpm,
        Duration::from_secs(1),
    ));

    match args.command {
        Commands::Interactive { log_file } => {
            if let Some(path) = &log_file {
                init_logger(LevelFilter::Info, Some(path))?;
            }
            let manager = WorkoutManager::spawn(service, config);
            let terminal = ratatui::init();
            let result = run_workout_screen(terminal, DisplayAdapter::new(manager)).await;
            ratatui::restore();
            result
        }
        Commands::Headless {
            run_secs,
            pause_secs,
            resume_secs,
        } => {
            init_logger(LevelFilter::Info, None)?;
            info!("Headless run with {:?}", config);
            let manager = WorkoutManager::spawn(service, config);
            run_headless(
                DisplayAdapter::new(manager),
                [
                    (Control::Start, run_secs),
                    (Control::Pause, pause_secs),
                    (Control::Resume, resume_secs),
                    (Control::End, 0),
                ],
            )
            .await
        }
    }
}
