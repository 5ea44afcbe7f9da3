use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ClubError;
use crate::models::{new_id, ScheduleItem, User, UserId};
use crate::state::club::{self, ClubStore};

/// Payload of `POST /schedule/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchedule {
    pub date: DateTime<Utc>,
    pub task: String,
    #[serde(alias = "assignedTo")]
    pub assigned_to: Vec<UserId>,
}

pub fn create(store: &ClubStore, req: NewSchedule) -> Result<ScheduleItem, ClubError> {
    let task = req.task.trim().to_string();
    if task.is_empty() {
        return Err(ClubError::Validation("task must not be empty".into()));
    }

    let mut assigned: Vec<UserId> = Vec::with_capacity(req.assigned_to.len());
    for id in req.assigned_to {
        if !assigned.contains(&id) {
            assigned.push(id);
        }
    }
    if assigned.is_empty() {
        return Err(ClubError::Validation(
            "at least one member must be assigned".into(),
        ));
    }

    let mut data = club::write(store);
    if let Some(unknown) = assigned.iter().find(|id| !data.accounts.contains_key(*id)) {
        return Err(ClubError::Validation(format!("unknown member id '{unknown}'")));
    }

    let item = ScheduleItem {
        id: new_id(),
        date: req.date,
        task,
        assigned_to: assigned,
        completed: false,
        completed_at: None,
        completed_by: None,
        created_at: Utc::now(),
    };
    data.schedule.push(item.clone());

    tracing::info!(
        "Scheduled '{}' on {} for {} member(s)",
        item.task,
        item.date,
        item.assigned_to.len()
    );
    Ok(item)
}

/// Schedule ordered by date; `mine_only` keeps items assigned to `viewer`.
pub fn list(store: &ClubStore, viewer: &User, mine_only: bool) -> Vec<ScheduleItem> {
    let data = club::read(store);
    let mut out: Vec<ScheduleItem> = data
        .schedule
        .iter()
        .filter(|s| !mine_only || s.assigned_to.contains(&viewer.id))
        .cloned()
        .collect();
    out.sort_by(|a, b| a.date.cmp(&b.date));
    out
}

/// Mark an item done. Only members assigned to it may do so.
pub fn complete(store: &ClubStore, id: &str, user: &User) -> Result<ScheduleItem, ClubError> {
    let mut data = club::write(store);
    let item = data
        .schedule
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or(ClubError::NotFound("Schedule item"))?;

    if !item.assigned_to.contains(&user.id) {
        return Err(ClubError::Forbidden);
    }
    if item.completed {
        return Err(ClubError::Conflict("task is already completed".into()));
    }

    item.completed = true;
    item.completed_at = Some(Utc::now());
    item.completed_by = Some(user.id.clone());

    tracing::info!("'{}' completed by {}", item.task, user.username);
    Ok(item.clone())
}

pub fn delete(store: &ClubStore, id: &str) -> Result<ScheduleItem, ClubError> {
    let mut data = club::write(store);
    let pos = data
        .schedule
        .iter()
        .position(|s| s.id == id)
        .ok_or(ClubError::NotFound("Schedule item"))?;
    Ok(data.schedule.remove(pos))
}
