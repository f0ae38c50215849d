//! Who may see and change what. These rules are evaluated on every request
//! before a row is touched; the database only sees already-authorized writes.

use chrono::{DateTime, Utc};

use crate::{
    models::{
        profilemodel::Profile,
        taskmodel::{Task, TaskStatus},
    },
    service::error::ServiceError,
};

pub fn is_owner(viewer: &Profile, task: &Task) -> bool {
    viewer.id == task.poster_id
}

/// Approved and completed tasks are public; everything else is only shown to
/// its poster and to admins.
pub fn can_view_task(viewer: Option<&Profile>, task: &Task) -> bool {
    if matches!(task.status, TaskStatus::Approved | TaskStatus::Completed) {
        return true;
    }
    viewer.map_or(false, |v| v.is_admin || is_owner(v, task))
}

/// Contact details go to the poster, admins, and workers that are approved
/// and currently subscribed.
pub fn can_view_contact(viewer: Option<&Profile>, task: &Task, now: DateTime<Utc>) -> bool {
    match viewer {
        Some(v) if is_owner(v, task) || v.is_admin => true,
        Some(v) => v.is_approved_worker() && v.has_active_subscription(now),
        None => false,
    }
}

/// Checks that `actor` may move `task` to `next` and that the move is legal.
pub fn authorize_transition(
    actor: &Profile,
    task: &Task,
    next: TaskStatus,
) -> Result<(), ServiceError> {
    let allowed = match next {
        TaskStatus::Approved | TaskStatus::Rejected => actor.is_admin,
        TaskStatus::Completed | TaskStatus::Cancelled => is_owner(actor, task),
        TaskStatus::Pending => false,
    };
    if !allowed {
        return Err(ServiceError::UnauthorizedTaskAccess(actor.id, task.id));
    }

    if !task.status.can_transition_to(next) {
        return Err(ServiceError::InvalidTaskTransition(task.id, task.status, next));
    }

    Ok(())
}

pub fn authorize_edit(actor: &Profile, task: &Task) -> Result<(), ServiceError> {
    if !is_owner(actor, task) {
        return Err(ServiceError::UnauthorizedTaskAccess(actor.id, task.id));
    }
    if task.status != TaskStatus::Pending {
        return Err(ServiceError::Conflict(
            "Only tasks awaiting approval can be edited".to_string(),
        ));
    }
    Ok(())
}

pub fn authorize_delete(actor: &Profile, task: &Task) -> Result<(), ServiceError> {
    if is_owner(actor, task) || actor.is_admin {
        Ok(())
    } else {
        Err(ServiceError::UnauthorizedTaskAccess(actor.id, task.id))
    }
}

/// A worker may bid on someone else's approved task once approved by an admin.
pub fn authorize_offer(worker: &Profile, task: &Task) -> Result<(), ServiceError> {
    if is_owner(worker, task) {
        return Err(ServiceError::Forbidden(
            "You cannot make an offer on your own task".to_string(),
        ));
    }
    if !worker.is_approved_worker() {
        return Err(ServiceError::Forbidden(
            "Only approved workers can make offers".to_string(),
        ));
    }
    if task.status != TaskStatus::Approved {
        return Err(ServiceError::Conflict(
            "Offers can only be made on open tasks".to_string(),
        ));
    }
    Ok(())
}

/// Chat on a task runs between its poster and one worker. Workers open the
/// conversation only while they may see the poster's contact details.
pub fn authorize_message(
    sender: &Profile,
    task: &Task,
    receiver: &Profile,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if sender.id == receiver.id {
        return Err(ServiceError::Validation(
            "You cannot message yourself".to_string(),
        ));
    }
    if !matches!(task.status, TaskStatus::Approved | TaskStatus::Completed) {
        return Err(ServiceError::Conflict(
            "Messages can only be sent on open or completed tasks".to_string(),
        ));
    }

    if is_owner(sender, task) {
        if !receiver.is_worker {
            return Err(ServiceError::Forbidden(
                "Posters can only message workers".to_string(),
            ));
        }
        return Ok(());
    }

    if receiver.id != task.poster_id {
        return Err(ServiceError::Forbidden(
            "Workers can only message the task's poster".to_string(),
        ));
    }
    if !can_view_contact(Some(sender), task, now) {
        return Err(ServiceError::Forbidden(
            "An approved worker account with an active subscription is required".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        profilemodel::{sample_profile, WorkerStatus},
        taskmodel::sample_task,
    };
    use chrono::Duration;

    fn subscribed_worker() -> Profile {
        let mut worker = sample_profile();
        worker.is_worker = true;
        worker.worker_status = Some(WorkerStatus::Approved);
        worker.subscription_active = true;
        worker.subscription_expires_at = Some(Utc::now() + Duration::days(20));
        worker
    }

    fn admin() -> Profile {
        let mut admin = sample_profile();
        admin.is_admin = true;
        admin
    }

    #[test]
    fn contact_hidden_from_anonymous_and_unapproved_workers() {
        let now = Utc::now();
        let poster = sample_profile();
        let task = sample_task(poster.id);

        assert!(!can_view_contact(None, &task, now));

        let mut pending = subscribed_worker();
        pending.worker_status = Some(WorkerStatus::Pending);
        assert!(!can_view_contact(Some(&pending), &task, now));

        let mut unsubscribed = subscribed_worker();
        unsubscribed.subscription_active = false;
        assert!(!can_view_contact(Some(&unsubscribed), &task, now));

        let mut lapsed = subscribed_worker();
        lapsed.subscription_expires_at = Some(now - Duration::hours(1));
        assert!(!can_view_contact(Some(&lapsed), &task, now));
    }

    #[test]
    fn contact_shown_to_subscribed_worker_owner_and_admin() {
        let now = Utc::now();
        let poster = sample_profile();
        let task = sample_task(poster.id);

        assert!(can_view_contact(Some(&subscribed_worker()), &task, now));
        assert!(can_view_contact(Some(&poster), &task, now));
        assert!(can_view_contact(Some(&admin()), &task, now));
    }

    #[test]
    fn pending_task_hidden_from_public() {
        let poster = sample_profile();
        let mut task = sample_task(poster.id);
        task.status = TaskStatus::Pending;

        assert!(!can_view_task(None, &task));
        assert!(!can_view_task(Some(&subscribed_worker()), &task));
        assert!(can_view_task(Some(&poster), &task));
        assert!(can_view_task(Some(&admin()), &task));
    }

    #[test]
    fn only_admin_moderates() {
        let poster = sample_profile();
        let mut task = sample_task(poster.id);
        task.status = TaskStatus::Pending;

        assert!(matches!(
            authorize_transition(&poster, &task, TaskStatus::Approved),
            Err(ServiceError::UnauthorizedTaskAccess(_, _))
        ));
        assert!(authorize_transition(&admin(), &task, TaskStatus::Approved).is_ok());
        assert!(authorize_transition(&admin(), &task, TaskStatus::Rejected).is_ok());
    }

    #[test]
    fn only_owner_closes_approved_task() {
        let poster = sample_profile();
        let task = sample_task(poster.id);

        assert!(authorize_transition(&poster, &task, TaskStatus::Completed).is_ok());
        assert!(authorize_transition(&poster, &task, TaskStatus::Cancelled).is_ok());
        assert!(authorize_transition(&subscribed_worker(), &task, TaskStatus::Completed).is_err());
    }

    #[test]
    fn illegal_transition_is_reported_even_for_owner() {
        let poster = sample_profile();
        let mut task = sample_task(poster.id);
        task.status = TaskStatus::Pending;

        assert!(matches!(
            authorize_transition(&poster, &task, TaskStatus::Completed),
            Err(ServiceError::InvalidTaskTransition(_, TaskStatus::Pending, TaskStatus::Completed))
        ));
    }

    #[test]
    fn edits_only_while_pending() {
        let poster = sample_profile();
        let mut task = sample_task(poster.id);
        assert!(matches!(
            authorize_edit(&poster, &task),
            Err(ServiceError::Conflict(_))
        ));

        task.status = TaskStatus::Pending;
        assert!(authorize_edit(&poster, &task).is_ok());
        assert!(authorize_edit(&admin(), &task).is_err());
    }

    #[test]
    fn delete_by_owner_or_admin() {
        let poster = sample_profile();
        let task = sample_task(poster.id);
        assert!(authorize_delete(&poster, &task).is_ok());
        assert!(authorize_delete(&admin(), &task).is_ok());
        assert!(authorize_delete(&subscribed_worker(), &task).is_err());
    }

    #[test]
    fn offers_need_approved_worker_on_open_task() {
        let poster = sample_profile();
        let mut task = sample_task(poster.id);
        let worker = subscribed_worker();

        assert!(authorize_offer(&worker, &task).is_ok());
        assert!(authorize_offer(&poster, &task).is_err());

        task.status = TaskStatus::Completed;
        assert!(matches!(
            authorize_offer(&worker, &task),
            Err(ServiceError::Conflict(_))
        ));
    }

    #[test]
    fn workers_message_only_the_poster() {
        let now = Utc::now();
        let poster = sample_profile();
        let task = sample_task(poster.id);
        let worker = subscribed_worker();

        assert!(authorize_message(&worker, &task, &poster, now).is_ok());
        assert!(authorize_message(&worker, &task, &sample_profile(), now).is_err());
        assert!(authorize_message(&poster, &task, &worker, now).is_ok());
        assert!(authorize_message(&poster, &task, &poster, now).is_err());

        let mut unsubscribed = subscribed_worker();
        unsubscribed.subscription_active = false;
        assert!(matches!(
            authorize_message(&unsubscribed, &task, &poster, now),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn posters_message_only_workers() {
        let now = Utc::now();
        let poster = sample_profile();
        let task = sample_task(poster.id);
        let bystander = sample_profile();

        assert!(matches!(
            authorize_message(&poster, &task, &bystander, now),
            Err(ServiceError::Forbidden(_))
        ));
    }
}
