//! Drag-to-reschedule for tasks in the day view.
//!
//! A drag carries one task across the slot rows. The last slot hovered before
//! the drop becomes the task's new `time_of_day`. Drops without a target, and
//! drops of a task that disappeared mid-drag, leave the collection untouched.

use crate::model::{Planner, Task, TaskId};
use std::fmt;

/// Read-all / replace-all access to the tasks a drag can reschedule.
pub trait TaskCollection {
    fn tasks(&self) -> &[Task];
    fn replace_tasks(&mut self, tasks: Vec<Task>);
}

impl TaskCollection for Planner {
    fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    fn replace_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        task: Task,
        target: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassignment {
    pub task_id: TaskId,
    pub title: String,
    pub slot: String,
}

impl fmt::Display for Reassignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Moved \"{}\" to {}", self.title, self.slot)
    }
}

impl DragState {
    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging { .. })
    }

    pub fn dragged_task(&self) -> Option<&Task> {
        match self {
            DragState::Dragging { task, .. } => Some(task),
            DragState::Idle => None,
        }
    }

    pub fn target_slot(&self) -> Option<&str> {
        match self {
            DragState::Dragging { target, .. } => target.as_deref(),
            DragState::Idle => None,
        }
    }

    pub fn begin(&mut self, task: Task) {
        log::debug!("drag started for task {}", task.id);
        *self = DragState::Dragging { task, target: None };
    }

    pub fn hover_slot(&mut self, slot: impl Into<String>) {
        if let DragState::Dragging { target, .. } = self {
            *target = Some(slot.into());
        }
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.dragged_task() {
            log::debug!("drag canceled for task {}", task.id);
        }
        *self = DragState::Idle;
    }

    /// Finishes the drag and returns to `Idle`. Returns the reassignment when a task was rescheduled.
    pub fn end<C: TaskCollection>(&mut self, collection: &mut C) -> Option<Reassignment> {
        let (task, target) = match std::mem::take(self) {
            DragState::Dragging {
                task,
                target: Some(target),
            } => (task, target),
            DragState::Dragging { task, target: None } => {
                log::debug!("drag of task {} ended outside any slot", task.id);
                return None;
            }
            DragState::Idle => return None,
        };

        let Some(title) = collection
            .tasks()
            .iter()
            .find(|t| t.id == task.id)
            .map(|t| t.title.clone())
        else {
            log::debug!("dragged task {} no longer exists", task.id);
            return None;
        };

        let updated = collection
            .tasks()
            .iter()
            .map(|t| {
                if t.id == task.id {
                    Task {
                        time_of_day: Some(target.clone()),
                        ..t.clone()
                    }
                } else {
                    t.clone()
                }
            })
            .collect();
        collection.replace_tasks(updated);

        let reassignment = Reassignment {
            task_id: task.id,
            title,
            slot: target,
        };
        log::info!(
            "task {} rescheduled to {}",
            reassignment.task_id,
            reassignment.slot
        );
        Some(reassignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn planner() -> Planner {
        let date = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let mut planner = Planner::default_named("drag");
        let mut write = Task::new("write report".into(), date);
        write.time_of_day = Some("9:00 AM".into());
        write.notes = Some("quarterly".into());
        planner.add_task(write).unwrap();
        planner.add_task(Task::new("lunch".into(), date)).unwrap();
        planner
    }

    #[test]
    fn test_drop_without_hover_is_a_noop() {
        let mut planner = planner();
        let before = planner.tasks.clone();
        let mut drag = DragState::default();

        drag.begin(before[0].clone());
        assert!(drag.is_dragging());
        assert_eq!(drag.end(&mut planner), None);
        assert_eq!(drag, DragState::Idle);
        assert_eq!(planner.tasks, before);
    }

    #[test]
    fn test_drop_on_slot_rewrites_only_time_of_day() {
        let mut planner = planner();
        let before = planner.tasks.clone();
        let mut drag = DragState::default();

        drag.begin(before[0].clone());
        drag.hover_slot("11:00 AM");
        drag.hover_slot("3:00 PM");
        assert_eq!(drag.target_slot(), Some("3:00 PM"));

        let moved = drag.end(&mut planner).unwrap();
        assert_eq!(moved.slot, "3:00 PM");
        assert_eq!(moved.to_string(), "Moved \"write report\" to 3:00 PM");
        assert!(!drag.is_dragging());
        assert!(drag.dragged_task().is_none());

        assert_eq!(
            planner.tasks[0],
            Task {
                time_of_day: Some("3:00 PM".into()),
                ..before[0].clone()
            }
        );
        assert_eq!(planner.tasks[1], before[1]);
    }

    #[test]
    fn test_drop_keeps_updated_at() {
        let mut planner = planner();
        let before = planner.tasks.clone();
        let mut drag = DragState::default();

        drag.begin(before[1].clone());
        std::thread::sleep(std::time::Duration::from_millis(5));
        drag.hover_slot("3:00 PM");
        drag.end(&mut planner).unwrap();

        assert_eq!(planner.tasks[1].updated_at, before[1].updated_at);
        assert_eq!(planner.tasks[0], before[0]);
    }

    #[test]
    fn test_confirmation_uses_stored_title() {
        let mut planner = planner();
        let mut drag = DragState::default();
        let task = planner.tasks[1].clone();

        drag.begin(task.clone());
        planner
            .update_task(&task.id, |t| t.title = "team lunch".into())
            .unwrap();
        drag.hover_slot("12:00 PM");

        let moved = drag.end(&mut planner).unwrap();
        assert_eq!(moved.title, "team lunch");
        assert_eq!(moved.to_string(), "Moved \"team lunch\" to 12:00 PM");
    }

    #[test]
    fn test_hover_while_idle_does_nothing() {
        let mut drag = DragState::default();
        drag.hover_slot("3:00 PM");
        assert_eq!(drag, DragState::Idle);
        assert_eq!(drag.target_slot(), None);
    }

    #[test]
    fn test_begin_clears_stale_target() {
        let planner = planner();
        let mut drag = DragState::default();
        drag.begin(planner.tasks[0].clone());
        drag.hover_slot("1:00 PM");
        drag.begin(planner.tasks[1].clone());
        assert_eq!(drag.target_slot(), None);
        assert_eq!(drag.dragged_task().unwrap().title, "lunch");
    }

    #[test]
    fn test_cancel_discards_target() {
        let mut planner = planner();
        let before = planner.tasks.clone();
        let mut drag = DragState::default();
        drag.begin(before[1].clone());
        drag.hover_slot("12:00 PM");
        drag.cancel();
        assert_eq!(drag.end(&mut planner), None);
        assert_eq!(planner.tasks, before);
    }

    #[test]
    fn test_drop_of_deleted_task_is_a_noop() {
        let mut planner = planner();
        let mut drag = DragState::default();
        let task = planner.tasks[1].clone();
        drag.begin(task.clone());
        drag.hover_slot("4:00 PM");
        planner.delete_task(&task.id).unwrap();
        let before = planner.tasks.clone();

        assert_eq!(drag.end(&mut planner), None);
        assert_eq!(planner.tasks, before);
        assert_eq!(drag, DragState::Idle);
    }
}
