use crate::drag::DragState;
use crate::model::{Planner, Task};
use crate::slots::{
    filter_by_range, format_label, generate_slots, normalize_time, slot_for, DisplayRange,
    TimeIncrement,
};
use crate::storage::{init_project_planner, load_planner, save_planner, PlannerLocation};
use crate::ui;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate, Timelike};
use std::collections::HashSet;
use std::env;

pub fn init(name: Option<String>) -> Result<()> {
    let location = init_project_planner(name)?;
    println!("Initialized planner at {}", location.path.display());
    Ok(())
}

pub fn list(date: Option<String>, range: DisplayRange, search: Option<String>) -> Result<()> {
    let (planner, location) = load_current_planner()?;
    let settings = location.load_settings();
    let date = parse_date(date.as_deref())?;
    let increment = settings.time_increment();
    let visible: HashSet<String> = filter_by_range(&generate_slots(increment), range)
        .into_iter()
        .collect();

    println!(
        "Planner: {} ({})",
        planner.name,
        location.scope.label()
    );
    println!("{}", date.format("%A %Y-%m-%d"));
    let tasks: Vec<&Task> = planner
        .tasks_on(date)
        .into_iter()
        .filter(|t| search.as_deref().map_or(true, |q| t.matches(q)))
        .filter(|t| match t.time_of_day.as_deref() {
            Some(time) => slot_for(time, increment).is_some_and(|slot| visible.contains(&slot)),
            None => range == DisplayRange::All,
        })
        .collect();
    if tasks.is_empty() {
        println!("  (empty)");
    }
    for task in tasks {
        print_task(task);
    }
    Ok(())
}

pub fn slots(increment: Option<TimeIncrement>, range: DisplayRange) -> Result<()> {
    let increment = match increment {
        Some(inc) => inc,
        None => {
            let location = PlannerLocation::discover(&env::current_dir()?)?;
            location.load_settings().time_increment()
        }
    };
    for slot in filter_by_range(&generate_slots(increment), range) {
        println!("{}", slot);
    }
    Ok(())
}

pub fn add(
    title: String,
    date: Option<String>,
    time: Option<String>,
    notes: Option<String>,
    category: Option<String>,
    remind: Option<String>,
) -> Result<()> {
    let (mut planner, location) = load_current_planner()?;
    let mut task = Task::new(title, parse_date(date.as_deref())?);
    task.time_of_day = time.as_deref().map(normalize_time).transpose()?;
    task.reminder = remind.as_deref().map(normalize_time).transpose()?;
    task.notes = notes;
    task.category = match category {
        Some(name) => Some(canonical_category(&planner, &name)?),
        None => None,
    };
    let id = task.id.clone();
    let date = task.date;
    planner.add_task(task).context("adding task")?;
    save_planner(&location, &planner)?;
    println!("Added task {} on {}", id, date);
    Ok(())
}

pub fn schedule(task_id: String, time: String) -> Result<()> {
    let (mut planner, location) = load_current_planner()?;
    let slot = normalize_time(&time)?;
    let task = planner
        .find_task(&task_id)
        .cloned()
        .ok_or_else(|| anyhow!("task {} not found", task_id))?;

    let mut drag = DragState::default();
    drag.begin(task);
    drag.hover_slot(slot);
    let moved = drag
        .end(&mut planner)
        .ok_or_else(|| anyhow!("task {} was not rescheduled", task_id))?;
    save_planner(&location, &planner)?;
    println!("{}", moved);
    Ok(())
}

pub fn unschedule(task_id: String) -> Result<()> {
    let (mut planner, location) = load_current_planner()?;
    planner
        .update_task(&task_id, |t| t.time_of_day = None)
        .with_context(|| format!("unscheduling task {}", task_id))?;
    save_planner(&location, &planner)?;
    println!("Task {} is now unscheduled", task_id);
    Ok(())
}

pub fn done(task_id: String) -> Result<()> {
    let (mut planner, location) = load_current_planner()?;
    let completed = planner
        .toggle_completed(&task_id)
        .with_context(|| format!("updating task {}", task_id))?;
    save_planner(&location, &planner)?;
    if completed {
        println!("Completed {}", task_id);
    } else {
        println!("Reopened {}", task_id);
    }
    Ok(())
}

pub fn delete(task_id: String) -> Result<()> {
    let (mut planner, location) = load_current_planner()?;
    let task = planner
        .delete_task(&task_id)
        .with_context(|| format!("deleting task {}", task_id))?;
    save_planner(&location, &planner)?;
    println!("Deleted {}: {}", task.id, task.title);
    Ok(())
}

pub fn copy_task(task_id: String, to: String) -> Result<()> {
    let (mut planner, location) = load_current_planner()?;
    let to = parse_date(Some(&to))?;
    let new_id = planner
        .copy_task(&task_id, to)
        .with_context(|| format!("copying task {}", task_id))?;
    save_planner(&location, &planner)?;
    println!("Copied {} to {} as {}", task_id, to, new_id);
    Ok(())
}

pub fn move_task(task_id: String, to: String) -> Result<()> {
    let (mut planner, location) = load_current_planner()?;
    let to = parse_date(Some(&to))?;
    planner
        .move_task(&task_id, to)
        .with_context(|| format!("moving task {}", task_id))?;
    save_planner(&location, &planner)?;
    println!("Moved {} to {}", task_id, to);
    Ok(())
}

pub fn copy_day(from: String, to: String) -> Result<()> {
    let (mut planner, location) = load_current_planner()?;
    let (from, to) = (parse_date(Some(&from))?, parse_date(Some(&to))?);
    let count = planner.copy_day(from, to);
    save_planner(&location, &planner)?;
    println!("Copied {} task(s) from {} to {}", count, from, to);
    Ok(())
}

pub fn move_day(from: String, to: String) -> Result<()> {
    let (mut planner, location) = load_current_planner()?;
    let (from, to) = (parse_date(Some(&from))?, parse_date(Some(&to))?);
    let count = planner.move_day(from, to);
    save_planner(&location, &planner)?;
    println!("Moved {} task(s) from {} to {}", count, from, to);
    Ok(())
}

pub fn clear(date: Option<String>) -> Result<()> {
    let (mut planner, location) = load_current_planner()?;
    let date = parse_date(date.as_deref())?;
    let count = planner.clear_day(date);
    save_planner(&location, &planner)?;
    println!("Cleared {} task(s) from {}", count, date);
    Ok(())
}

pub fn category(name: Option<String>) -> Result<()> {
    let (mut planner, location) = load_current_planner()?;
    match name {
        Some(name) => {
            planner.add_category(&name)?;
            save_planner(&location, &planner)?;
            println!("Added category {}", name.trim());
        }
        None => {
            for category in &planner.categories {
                let count = planner
                    .tasks
                    .iter()
                    .filter(|t| t.category.as_deref() == Some(category.as_str()))
                    .count();
                println!("{} ({})", category, count);
            }
        }
    }
    Ok(())
}

pub fn remind(task_id: String, time: Option<String>) -> Result<()> {
    let (mut planner, location) = load_current_planner()?;
    let reminder = time.as_deref().map(normalize_time).transpose()?;
    planner
        .update_task(&task_id, |t| t.reminder = reminder.clone())
        .with_context(|| format!("updating reminder of {}", task_id))?;
    save_planner(&location, &planner)?;
    match reminder {
        Some(at) => println!("Reminder for {} set to {}", task_id, at),
        None => println!("Reminder for {} cleared", task_id),
    }
    Ok(())
}

pub fn reminders(date: Option<String>, at: Option<String>) -> Result<()> {
    let (planner, _) = load_current_planner()?;
    let date = parse_date(date.as_deref())?;
    let at = match at {
        Some(raw) => normalize_time(&raw)?,
        None => current_label(),
    };
    let due = planner.reminders_due(date, &at);
    if due.is_empty() {
        println!("No reminders due by {}", at);
    }
    for task in due {
        print_task(task);
    }
    Ok(())
}

pub fn increment(minutes: Option<TimeIncrement>) -> Result<()> {
    let location = PlannerLocation::discover(&env::current_dir()?)?;
    let mut settings = location.load_settings();
    match minutes {
        Some(inc) => {
            settings.set_time_increment(inc)?;
            println!(
                "Slot increment set to {} minutes ({})",
                inc,
                settings.path().display()
            );
        }
        None => println!("Slot increment: {} minutes", settings.time_increment()),
    }
    Ok(())
}

pub fn tui() -> Result<()> {
    let (planner, location) = load_current_planner()?;
    let settings = location.load_settings();
    ui::run(planner, location, settings)
}

pub fn current_planner_location() -> Result<PlannerLocation> {
    PlannerLocation::discover(&env::current_dir()?)
}

fn load_current_planner() -> Result<(Planner, PlannerLocation)> {
    let location = current_planner_location()?;
    let planner = load_planner(&location)?;
    Ok((planner, location))
}

fn canonical_category(planner: &Planner, name: &str) -> Result<String> {
    planner
        .find_category(name)
        .map(String::from)
        .ok_or_else(|| anyhow!("unknown category {} (add it with `dayplan category`)", name))
}

pub fn parse_date(input: Option<&str>) -> Result<NaiveDate> {
    let raw = match input.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => return Ok(Local::now().date_naive()),
    };
    match raw {
        "today" => Ok(Local::now().date_naive()),
        "tomorrow" => Local::now()
            .date_naive()
            .succ_opt()
            .ok_or_else(|| anyhow!("date out of range")),
        _ => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Ok(date),
            Err(_) => bail!("invalid date format (use YYYY-MM-DD): {}", raw),
        },
    }
}

fn current_label() -> String {
    let now = Local::now();
    format_label(now.hour() * 60 + now.minute())
}

fn print_task(task: &Task) {
    let check = if task.completed { "x" } else { " " };
    let time = task.time_of_day.as_deref().unwrap_or("anytime");
    println!("  [{}] {} {:>8}  {}", check, task.id, time, task.title);
    if let Some(category) = &task.category {
        println!("      category: {}", category);
    }
    if let Some(notes) = &task.notes {
        println!("      {}", notes);
    }
    if let Some(reminder) = &task.reminder {
        println!("      reminder: {}", reminder);
    }
}
