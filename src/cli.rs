use crate::slots::{DisplayRange, TimeIncrement};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "dayplan", version, about = "Terminal daily planner with time slots")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a project planner in the current directory
    Init {
        /// Optional planner name
        #[arg(long)]
        name: Option<String>,
    },
    /// List the tasks of a day
    List {
        /// Day in YYYY-MM-DD format (defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// Only show scheduled tasks in this range (all, morning, afternoon, evening)
        #[arg(long, default_value = "all")]
        range: DisplayRange,
        /// Only show tasks matching this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Print the time slots of a day
    Slots {
        /// Minutes between slots (15, 30 or 60); defaults to the saved increment
        #[arg(long)]
        increment: Option<TimeIncrement>,
        /// Range filter (all, morning, afternoon, evening)
        #[arg(long, default_value = "all")]
        range: DisplayRange,
    },
    /// Add a new task
    Add {
        /// Title of the task
        title: String,
        /// Day in YYYY-MM-DD format (defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// Time of day, e.g. "3:00 PM" or 15:00
        #[arg(long)]
        time: Option<String>,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
        /// Category name
        #[arg(long)]
        category: Option<String>,
        /// Reminder time, e.g. "2:45 PM"
        #[arg(long)]
        remind: Option<String>,
    },
    /// Reschedule a task to a time slot
    Schedule {
        /// Task id
        task_id: String,
        /// Time of day, e.g. "3:00 PM" or 15:00
        time: String,
    },
    /// Remove the time of day from a task
    Unschedule {
        /// Task id
        task_id: String,
    },
    /// Toggle a task's completed flag
    Done {
        /// Task id
        task_id: String,
    },
    /// Delete a task
    Delete {
        /// Task id
        task_id: String,
    },
    /// Copy a task to another day
    Copy {
        /// Task id
        task_id: String,
        /// Destination day (YYYY-MM-DD)
        to: String,
    },
    /// Move a task to another day
    Move {
        /// Task id
        task_id: String,
        /// Destination day (YYYY-MM-DD)
        to: String,
    },
    /// Copy every task of a day to another day
    CopyDay {
        /// Source day (YYYY-MM-DD)
        from: String,
        /// Destination day (YYYY-MM-DD)
        to: String,
    },
    /// Move every task of a day to another day
    MoveDay {
        /// Source day (YYYY-MM-DD)
        from: String,
        /// Destination day (YYYY-MM-DD)
        to: String,
    },
    /// Delete every task of a day
    Clear {
        /// Day in YYYY-MM-DD format (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
    /// List categories, or add one
    Category {
        /// Name of a category to add
        name: Option<String>,
    },
    /// Set or clear a task's reminder
    Remind {
        /// Task id
        task_id: String,
        /// Reminder time; omit to clear
        time: Option<String>,
    },
    /// Show reminders that are due
    Reminders {
        /// Day in YYYY-MM-DD format (defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// Time to check against (defaults to now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Show or change the slot increment
    Increment {
        /// New increment in minutes (15, 30 or 60)
        minutes: Option<TimeIncrement>,
    },
    /// Launch the interactive TUI
    Tui,
}
