use crate::slots::{label_minutes, slot_for, TimeIncrement};
use chrono::{DateTime, NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

pub type TaskId = String;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Planner {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub time_of_day: Option<String>,
    #[serde(default)]
    pub reminder: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug)]
pub enum PlannerError {
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("category not found: {0}")]
    CategoryNotFound(String),
    #[error("category already exists: {0}")]
    DuplicateCategory(String),
}

impl Planner {
    pub fn default_named(name: impl Into<String>) -> Self {
        Planner {
            name: name.into(),
            categories: vec!["Work".into(), "Personal".into(), "Health".into()],
            tasks: Vec::new(),
        }
    }

    pub fn find_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn add_task(&mut self, task: Task) -> Result<(), PlannerError> {
        if let Some(category) = task.category.as_deref() {
            self.ensure_category(category)?;
        }
        self.tasks.push(task);
        Ok(())
    }

    pub fn update_task<F>(&mut self, id: &str, mut f: F) -> Result<(), PlannerError>
    where
        F: FnMut(&mut Task),
    {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| PlannerError::TaskNotFound(id.to_string()))?;
        let mut updated = self.tasks[idx].clone();
        f(&mut updated);
        if let Some(category) = updated.category.as_deref() {
            self.ensure_category(category)?;
        }
        updated.updated_at = Utc::now();
        self.tasks[idx] = updated;
        Ok(())
    }

    pub fn delete_task(&mut self, id: &str) -> Result<Task, PlannerError> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| PlannerError::TaskNotFound(id.to_string()))?;
        Ok(self.tasks.remove(idx))
    }

    pub fn toggle_completed(&mut self, id: &str) -> Result<bool, PlannerError> {
        let mut state = false;
        self.update_task(id, |t| {
            t.completed = !t.completed;
            state = t.completed;
        })?;
        Ok(state)
    }

    /// Tasks on `date`, scheduled ones by time first, then unscheduled in insertion order.
    pub fn tasks_on(&self, date: NaiveDate) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().filter(|t| t.date == date).collect();
        tasks.sort_by_key(|t| {
            t.time_of_day
                .as_deref()
                .and_then(label_minutes)
                .unwrap_or(u32::MAX)
        });
        tasks
    }

    pub fn unscheduled_on(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.date == date && t.time_of_day.is_none())
            .collect()
    }

    pub fn tasks_in_slot(
        &self,
        date: NaiveDate,
        slot: &str,
        increment: TimeIncrement,
    ) -> Vec<&Task> {
        self.tasks_on(date)
            .into_iter()
            .filter(|t| {
                t.time_of_day
                    .as_deref()
                    .and_then(|time| slot_for(time, increment))
                    .is_some_and(|s| s == slot)
            })
            .collect()
    }

    pub fn copy_task(&mut self, id: &str, date: NaiveDate) -> Result<TaskId, PlannerError> {
        let source = self
            .find_task(id)
            .ok_or_else(|| PlannerError::TaskNotFound(id.to_string()))?;
        let copy = source.duplicate_to(date);
        let new_id = copy.id.clone();
        self.tasks.push(copy);
        Ok(new_id)
    }

    pub fn move_task(&mut self, id: &str, date: NaiveDate) -> Result<(), PlannerError> {
        self.update_task(id, |t| t.date = date)
    }

    pub fn copy_day(&mut self, from: NaiveDate, to: NaiveDate) -> usize {
        let copies: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.date == from)
            .map(|t| t.duplicate_to(to))
            .collect();
        let count = copies.len();
        self.tasks.extend(copies);
        count
    }

    pub fn move_day(&mut self, from: NaiveDate, to: NaiveDate) -> usize {
        if from == to {
            return 0;
        }
        let now = Utc::now();
        let mut count = 0;
        for task in self.tasks.iter_mut().filter(|t| t.date == from) {
            task.date = to;
            task.updated_at = now;
            count += 1;
        }
        count
    }

    pub fn clear_day(&mut self, date: NaiveDate) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.date != date);
        before - self.tasks.len()
    }

    pub fn add_category(&mut self, name: &str) -> Result<(), PlannerError> {
        let name = name.trim();
        if self.find_category(name).is_some() {
            return Err(PlannerError::DuplicateCategory(name.to_string()));
        }
        self.categories.push(name.to_string());
        Ok(())
    }

    /// Case-insensitive lookup returning the stored spelling.
    pub fn find_category(&self, name: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.eq_ignore_ascii_case(name.trim()))
            .map(String::as_str)
    }

    /// Incomplete tasks on `date` whose reminder is at or before `now_label`.
    pub fn reminders_due(&self, date: NaiveDate, now_label: &str) -> Vec<&Task> {
        let Some(now) = label_minutes(now_label) else {
            return Vec::new();
        };
        self.tasks
            .iter()
            .filter(|t| t.date == date && !t.completed)
            .filter(|t| {
                t.reminder
                    .as_deref()
                    .and_then(label_minutes)
                    .is_some_and(|at| at <= now)
            })
            .collect()
    }

    fn ensure_category(&self, name: &str) -> Result<(), PlannerError> {
        self.find_category(name)
            .map(|_| ())
            .ok_or_else(|| PlannerError::CategoryNotFound(name.to_string()))
    }
}

impl Task {
    pub fn new(title: String, date: NaiveDate) -> Self {
        let now = Utc::now();
        Task {
            id: generate_id(),
            title,
            notes: None,
            category: None,
            date,
            time_of_day: None,
            reminder: None,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [Some(&self.title), self.notes.as_ref(), self.category.as_ref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&query))
    }

    fn duplicate_to(&self, date: NaiveDate) -> Task {
        let now = Utc::now();
        Task {
            id: generate_id(),
            date,
            completed: false,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }
}

pub fn generate_id() -> TaskId {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn task_at(title: &str, date: NaiveDate, time: Option<&str>) -> Task {
        let mut task = Task::new(title.into(), date);
        task.time_of_day = time.map(String::from);
        task
    }

    fn planner_with(tasks: Vec<Task>) -> Planner {
        let mut planner = Planner::default_named("test");
        for task in tasks {
            planner.add_task(task).unwrap();
        }
        planner
    }

    #[test]
    fn test_tasks_on_sorts_scheduled_before_unscheduled() {
        let planner = planner_with(vec![
            task_at("later", day(1), Some("3:00 PM")),
            task_at("anytime", day(1), None),
            task_at("early", day(1), Some("8:30 AM")),
            task_at("other day", day(2), Some("7:00 AM")),
        ]);
        let titles: Vec<&str> = planner
            .tasks_on(day(1))
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, vec!["early", "later", "anytime"]);
    }

    #[test]
    fn test_tasks_in_slot_uses_increment_grid() {
        let planner = planner_with(vec![
            task_at("standup", day(1), Some("9:10 AM")),
            task_at("review", day(1), Some("9:40 AM")),
        ]);
        let half_hour = planner.tasks_in_slot(day(1), "9:00 AM", TimeIncrement::Thirty);
        assert_eq!(half_hour.len(), 1);
        assert_eq!(half_hour[0].title, "standup");
        let hourly = planner.tasks_in_slot(day(1), "9:00 AM", TimeIncrement::Sixty);
        assert_eq!(hourly.len(), 2);
    }

    #[test]
    fn test_copy_day_assigns_fresh_ids_and_keeps_source() {
        let mut source = task_at("gym", day(1), Some("6:00 AM"));
        source.completed = true;
        let mut planner = planner_with(vec![source, task_at("read", day(1), None)]);

        assert_eq!(planner.copy_day(day(1), day(2)), 2);
        assert_eq!(planner.tasks_on(day(1)).len(), 2);
        let copies = planner.tasks_on(day(2));
        assert_eq!(copies.len(), 2);
        assert!(copies.iter().all(|t| !t.completed));
        for copy in &copies {
            assert!(planner
                .tasks_on(day(1))
                .iter()
                .all(|orig| orig.id != copy.id));
        }
        assert_eq!(copies[0].time_of_day.as_deref(), Some("6:00 AM"));
    }

    #[test]
    fn test_move_day_and_clear_day() {
        let mut planner = planner_with(vec![
            task_at("a", day(1), None),
            task_at("b", day(1), None),
            task_at("c", day(3), None),
        ]);
        assert_eq!(planner.move_day(day(1), day(3)), 2);
        assert!(planner.tasks_on(day(1)).is_empty());
        assert_eq!(planner.tasks_on(day(3)).len(), 3);

        planner.add_task(task_at("d", day(4), None)).unwrap();
        assert_eq!(planner.clear_day(day(3)), 3);
        assert_eq!(planner.tasks.len(), 1);
        assert_eq!(planner.tasks[0].title, "d");
    }

    #[test]
    fn test_copy_and_move_single_task() {
        let task = task_at("call mom", day(1), Some("5:00 PM"));
        let id = task.id.clone();
        let mut planner = planner_with(vec![task]);

        let copy_id = planner.copy_task(&id, day(2)).unwrap();
        assert_ne!(copy_id, id);
        planner.move_task(&id, day(5)).unwrap();
        assert_eq!(planner.find_task(&id).unwrap().date, day(5));
        assert_eq!(planner.find_task(&copy_id).unwrap().date, day(2));
        assert!(matches!(
            planner.move_task("nope", day(1)),
            Err(PlannerError::TaskNotFound(_))
        ));
    }

    #[test]
    fn test_categories_are_case_insensitive() {
        let mut planner = Planner::default_named("test");
        assert!(matches!(
            planner.add_category("work"),
            Err(PlannerError::DuplicateCategory(_))
        ));
        planner.add_category("Errands").unwrap();
        assert_eq!(planner.find_category("errands"), Some("Errands"));

        let mut task = task_at("groceries", day(1), None);
        task.category = Some("Chores".into());
        assert!(matches!(
            planner.add_task(task),
            Err(PlannerError::CategoryNotFound(_))
        ));
    }

    #[test]
    fn test_reminders_due_skips_completed_and_future() {
        let mut due = task_at("pills", day(1), None);
        due.reminder = Some("8:00 AM".into());
        let mut later = task_at("dinner", day(1), None);
        later.reminder = Some("6:00 PM".into());
        let mut done = task_at("water", day(1), None);
        done.reminder = Some("7:00 AM".into());
        done.completed = true;
        let planner = planner_with(vec![due, later, done]);

        let titles: Vec<&str> = planner
            .reminders_due(day(1), "9:00 AM")
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, vec!["pills"]);
        assert!(planner.reminders_due(day(1), "whenever").is_empty());
    }

    #[test]
    fn test_toggle_completed_and_delete() {
        let task = task_at("stretch", day(1), None);
        let id = task.id.clone();
        let mut planner = planner_with(vec![task]);
        assert!(planner.toggle_completed(&id).unwrap());
        assert!(!planner.toggle_completed(&id).unwrap());
        let removed = planner.delete_task(&id).unwrap();
        assert_eq!(removed.title, "stretch");
        assert!(planner.delete_task(&id).is_err());
    }

    #[test]
    fn test_matches_searches_title_notes_and_category() {
        let mut task = task_at("Dentist", day(1), None);
        task.notes = Some("bring insurance card".into());
        task.category = Some("Health".into());
        assert!(task.matches("dent"));
        assert!(task.matches("INSURANCE"));
        assert!(task.matches("health"));
        assert!(task.matches("  "));
        assert!(!task.matches("gym"));
    }
}
