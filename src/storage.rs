//! Where the planner and its settings live on disk.
//!
//! A `.dayplan/` directory in the working directory or any ancestor makes the
//! planner project-local. Otherwise the per-user data directory is used. The
//! planner file, `settings.yml` and the TUI log all share that directory.

use crate::model::Planner;
use crate::settings::{Settings, SETTINGS_FILE};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const PROJECT_DIR: &str = ".dayplan";
const PLANNER_FILE: &str = "planner.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerScope {
    Project,
    Global,
}

impl PlannerScope {
    pub fn label(self) -> &'static str {
        match self {
            PlannerScope::Project => "project",
            PlannerScope::Global => "global",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlannerLocation {
    pub path: PathBuf,
    pub scope: PlannerScope,
}

impl PlannerLocation {
    /// The nearest project planner at or above `start`, else the per-user one.
    pub fn discover(start: &Path) -> Result<PlannerLocation> {
        let project = start
            .ancestors()
            .map(|dir| dir.join(PROJECT_DIR).join(PLANNER_FILE))
            .find(|candidate| candidate.is_file());
        match project {
            Some(path) => Ok(PlannerLocation {
                path,
                scope: PlannerScope::Project,
            }),
            None => PlannerLocation::global(),
        }
    }

    pub fn project(root: &Path) -> PlannerLocation {
        PlannerLocation {
            path: root.join(PROJECT_DIR).join(PLANNER_FILE),
            scope: PlannerScope::Project,
        }
    }

    pub fn global() -> Result<PlannerLocation> {
        let dirs = ProjectDirs::from("", "", "dayplan").context("locating data directory")?;
        Ok(PlannerLocation {
            path: dirs.data_dir().join(PLANNER_FILE),
            scope: PlannerScope::Global,
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir().join(SETTINGS_FILE)
    }

    pub fn load_settings(&self) -> Settings {
        Settings::load(self.settings_path())
    }

    /// Name for a freshly created planner: the project folder, or "default".
    fn default_name(&self) -> String {
        match self.scope {
            PlannerScope::Project => self
                .data_dir()
                .parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str())
                .unwrap_or("project")
                .to_string(),
            PlannerScope::Global => "default".to_string(),
        }
    }
}

pub fn init_project_planner(name: Option<String>) -> Result<PlannerLocation> {
    let cwd = env::current_dir()?;
    init_planner_in(&cwd, name)
}

fn init_planner_in(root: &Path, name: Option<String>) -> Result<PlannerLocation> {
    let location = PlannerLocation::project(root);
    if location.path.exists() {
        log::info!("planner already initialized at {:?}", location.path);
        return Ok(location);
    }
    let name = name.unwrap_or_else(|| location.default_name());
    save_planner(&location, &Planner::default_named(name))?;
    Ok(location)
}

/// Reads the planner, creating and saving a default one on first use.
pub fn load_planner(location: &PlannerLocation) -> Result<Planner> {
    if !location.path.exists() {
        log::info!("creating new planner at {:?}", location.path);
        let planner = Planner::default_named(location.default_name());
        save_planner(location, &planner)?;
        return Ok(planner);
    }
    let data = fs::read_to_string(&location.path)
        .with_context(|| format!("reading {:?}", location.path))?;
    let planner: Planner = serde_yaml::from_str(&data)
        .with_context(|| format!("parsing planner file {:?}", location.path))?;
    log::debug!(
        "loaded {} tasks from {:?}",
        planner.tasks.len(),
        location.path
    );
    Ok(planner)
}

pub fn save_planner(location: &PlannerLocation, planner: &Planner) -> Result<()> {
    let dir = location.data_dir();
    fs::create_dir_all(&dir).with_context(|| format!("creating {:?}", dir))?;
    let serialized = serde_yaml::to_string(planner).context("serializing planner")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    log::debug!("saved {} tasks to {:?}", planner.tasks.len(), location.path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Task;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_init_then_locate_from_subdirectory() {
        let root = tempdir().unwrap();
        let created = init_planner_in(root.path(), Some("home".into())).unwrap();
        let nested = root.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let found = PlannerLocation::discover(&nested).unwrap();
        assert_eq!(found.scope, PlannerScope::Project);
        assert_eq!(found.path, created.path);
        assert_eq!(load_planner(&found).unwrap().name, "home");
        assert_eq!(
            found.settings_path(),
            root.path().join(".dayplan").join("settings.yml")
        );
    }

    #[test]
    fn test_round_trip_keeps_schedule() {
        let root = tempdir().unwrap();
        let location = init_planner_in(root.path(), None).unwrap();
        let mut planner = load_planner(&location).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut task = Task::new("plan week".into(), date);
        task.time_of_day = Some("10:30 AM".into());
        task.category = Some("Work".into());
        planner.add_task(task.clone()).unwrap();
        save_planner(&location, &planner).unwrap();

        let reloaded = load_planner(&location).unwrap();
        assert_eq!(reloaded.tasks, vec![task]);
        assert_eq!(reloaded.categories, planner.categories);
    }

    #[test]
    fn test_missing_file_creates_default_planner() {
        let root = tempdir().unwrap();
        let location = PlannerLocation {
            path: root.path().join("nested").join(PLANNER_FILE),
            scope: PlannerScope::Global,
        };
        let planner = load_planner(&location).unwrap();
        assert_eq!(planner.name, "default");
        assert!(location.path.exists());
    }

    #[test]
    fn test_project_planner_is_named_after_folder() {
        let root = tempdir().unwrap();
        let project = root.path().join("garden");
        fs::create_dir_all(&project).unwrap();
        let location = init_planner_in(&project, None).unwrap();
        assert_eq!(load_planner(&location).unwrap().name, "garden");

        let again = init_planner_in(&project, Some("other".into())).unwrap();
        assert_eq!(load_planner(&again).unwrap().name, "garden");
    }

    #[test]
    fn test_settings_live_next_to_planner() {
        let root = tempdir().unwrap();
        let location = init_planner_in(root.path(), None).unwrap();
        let mut settings = location.load_settings();
        settings
            .set_time_increment(crate::slots::TimeIncrement::Sixty)
            .unwrap();
        assert!(root.path().join(".dayplan").join("settings.yml").is_file());
        assert_eq!(
            location.load_settings().time_increment(),
            crate::slots::TimeIncrement::Sixty
        );
    }
}
