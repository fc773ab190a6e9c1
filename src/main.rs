mod cli;
mod commands;
mod drag;
mod model;
mod settings;
mod slots;
mod storage;
mod typing;
mod ui;

use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    init_logging(matches!(command, cli::Command::Tui));
    log::debug!("running {:?}", command);
    match command {
        cli::Command::Init { name } => commands::init(name),
        cli::Command::List {
            date,
            range,
            search,
        } => commands::list(date, range, search),
        cli::Command::Slots { increment, range } => commands::slots(increment, range),
        cli::Command::Add {
            title,
            date,
            time,
            notes,
            category,
            remind,
        } => commands::add(title, date, time, notes, category, remind),
        cli::Command::Schedule { task_id, time } => commands::schedule(task_id, time),
        cli::Command::Unschedule { task_id } => commands::unschedule(task_id),
        cli::Command::Done { task_id } => commands::done(task_id),
        cli::Command::Delete { task_id } => commands::delete(task_id),
        cli::Command::Copy { task_id, to } => commands::copy_task(task_id, to),
        cli::Command::Move { task_id, to } => commands::move_task(task_id, to),
        cli::Command::CopyDay { from, to } => commands::copy_day(from, to),
        cli::Command::MoveDay { from, to } => commands::move_day(from, to),
        cli::Command::Clear { date } => commands::clear(date),
        cli::Command::Category { name } => commands::category(name),
        cli::Command::Remind { task_id, time } => commands::remind(task_id, time),
        cli::Command::Reminders { date, at } => commands::reminders(date, at),
        cli::Command::Increment { minutes } => commands::increment(minutes),
        cli::Command::Tui => commands::tui(),
    }
}

/// `RUST_LOG` picks the level. The TUI owns the terminal, so it logs to a file in the data directory.
fn init_logging(to_file: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if to_file {
        let log_file = commands::current_planner_location()
            .ok()
            .map(|location| location.data_dir())
            .and_then(|dir| {
                std::fs::create_dir_all(&dir).ok()?;
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(dir.join("dayplan.log"))
                    .ok()
            });
        match log_file {
            Some(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            None => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }
    builder.init();
}
