//! In-memory filtering and ordering for the task board and the worker
//! directory. Both operate on the page of rows already fetched from the
//! database; every filter that is set narrows the result, so combining
//! filters yields their intersection.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{
    profilemodel::WorkerListing,
    taskmodel::{BudgetType, TaskListing},
};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskSort {
    #[default]
    Newest,
    Oldest,
    BudgetHigh,
    BudgetLow,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TaskFilter {
    pub category: Option<String>,
    pub location: Option<String>,
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
    pub budget_type: Option<BudgetType>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: TaskSort,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

impl TaskFilter {
    pub fn matches(&self, listing: &TaskListing) -> bool {
        let task = &listing.task;

        if let Some(category) = non_blank(&self.category) {
            if listing.category_slug != category {
                return false;
            }
        }
        if let Some(location) = non_blank(&self.location) {
            if listing.location_slug != location {
                return false;
            }
        }
        if let Some(min) = self.min_budget {
            if task.budget_amount < min {
                return false;
            }
        }
        if let Some(max) = self.max_budget {
            if task.budget_amount > max {
                return false;
            }
        }
        if let Some(budget_type) = self.budget_type {
            if task.budget_type != budget_type {
                return false;
            }
        }
        if let Some(search) = non_blank(&self.search) {
            let needle = search.to_lowercase();
            if !contains_ci(&task.title, &needle) && !contains_ci(&task.description, &needle) {
                return false;
            }
        }
        true
    }

    /// Filters then orders `listings`. Tasks with a live featured boost come
    /// first; the requested order applies within each group.
    pub fn apply(&self, listings: Vec<TaskListing>, now: DateTime<Utc>) -> Vec<TaskListing> {
        let mut filtered: Vec<TaskListing> =
            listings.into_iter().filter(|l| self.matches(l)).collect();

        filtered.sort_by(|a, b| {
            let featured = b.task.is_featured_at(now).cmp(&a.task.is_featured_at(now));
            featured.then_with(|| self.compare(a, b))
        });
        filtered
    }

    fn compare(&self, a: &TaskListing, b: &TaskListing) -> Ordering {
        match self.sort {
            TaskSort::Newest => b.task.created_at.cmp(&a.task.created_at),
            TaskSort::Oldest => a.task.created_at.cmp(&b.task.created_at),
            TaskSort::BudgetHigh => b.task.budget_amount.total_cmp(&a.task.budget_amount),
            TaskSort::BudgetLow => a.task.budget_amount.total_cmp(&b.task.budget_amount),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerSort {
    #[default]
    Rating,
    RateLow,
    RateHigh,
    Newest,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WorkerFilter {
    pub skill: Option<String>,
    pub location_id: Option<Uuid>,
    pub min_rate: Option<f64>,
    pub max_rate: Option<f64>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: WorkerSort,
}

impl WorkerFilter {
    pub fn matches(&self, worker: &WorkerListing) -> bool {
        if let Some(skill) = non_blank(&self.skill) {
            let skill = skill.to_lowercase();
            if !worker.skills.iter().any(|s| s.to_lowercase() == skill) {
                return false;
            }
        }
        if let Some(location_id) = self.location_id {
            if !worker.location_ids.contains(&location_id) {
                return false;
            }
        }
        // Workers without a listed rate never fall inside a rate bound.
        if self.min_rate.is_some() || self.max_rate.is_some() {
            let Some(rate) = worker.hourly_rate else {
                return false;
            };
            if self.min_rate.map_or(false, |min| rate < min)
                || self.max_rate.map_or(false, |max| rate > max)
            {
                return false;
            }
        }
        if let Some(search) = non_blank(&self.search) {
            let needle = search.to_lowercase();
            let in_bio = worker
                .bio
                .as_deref()
                .map_or(false, |bio| contains_ci(bio, &needle));
            let in_skills = worker.skills.iter().any(|s| contains_ci(s, &needle));
            if !contains_ci(&worker.full_name, &needle) && !in_bio && !in_skills {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, workers: Vec<WorkerListing>) -> Vec<WorkerListing> {
        let mut filtered: Vec<WorkerListing> =
            workers.into_iter().filter(|w| self.matches(w)).collect();

        filtered.sort_by(|a, b| match self.sort {
            WorkerSort::Rating => b
                .average_rating
                .unwrap_or(0.0)
                .total_cmp(&a.average_rating.unwrap_or(0.0))
                .then_with(|| b.review_count.cmp(&a.review_count)),
            WorkerSort::RateLow => a
                .hourly_rate
                .unwrap_or(f64::MAX)
                .total_cmp(&b.hourly_rate.unwrap_or(f64::MAX)),
            WorkerSort::RateHigh => b
                .hourly_rate
                .unwrap_or(0.0)
                .total_cmp(&a.hourly_rate.unwrap_or(0.0)),
            WorkerSort::Newest => b.created_at.cmp(&a.created_at),
        });
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::taskmodel::sample_task;
    use chrono::Duration;

    fn listing(title: &str, category: &str, location: &str, budget: f64) -> TaskListing {
        let mut task = sample_task(Uuid::new_v4());
        task.title = title.to_string();
        task.budget_amount = budget;
        TaskListing {
            task,
            category_name: category.to_string(),
            category_slug: category.to_string(),
            location_name: location.to_string(),
            location_slug: location.to_string(),
            poster_name: "Poster".to_string(),
            poster_avatar_url: None,
        }
    }

    fn board() -> Vec<TaskListing> {
        vec![
            listing("Deep clean flat", "cleaning", "zagreb", 80.0),
            listing("Move sofa", "moving", "zagreb", 40.0),
            listing("Window cleaning", "cleaning", "split", 30.0),
            listing("Office clean", "cleaning", "zagreb", 150.0),
        ]
    }

    fn titles(listings: &[TaskListing]) -> Vec<&str> {
        listings.iter().map(|l| l.task.title.as_str()).collect()
    }

    #[test]
    fn category_filter_keeps_only_that_slug() {
        let filter = TaskFilter {
            category: Some("cleaning".to_string()),
            ..Default::default()
        };
        let result = filter.apply(board(), Utc::now());
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|l| l.category_slug == "cleaning"));
    }

    #[test]
    fn category_and_budget_range_intersect() {
        let filter = TaskFilter {
            category: Some("cleaning".to_string()),
            min_budget: Some(50.0),
            max_budget: Some(100.0),
            ..Default::default()
        };
        let result = filter.apply(board(), Utc::now());
        assert_eq!(titles(&result), vec!["Deep clean flat"]);
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let filter = TaskFilter {
            search: Some("SOFA".to_string()),
            ..Default::default()
        };
        assert_eq!(titles(&filter.apply(board(), Utc::now())), vec!["Move sofa"]);

        let filter = TaskFilter {
            search: Some("tools provided".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.apply(board(), Utc::now()).len(), 4);
    }

    #[test]
    fn blank_filters_are_ignored() {
        let filter = TaskFilter {
            category: Some("  ".to_string()),
            search: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(filter.apply(board(), Utc::now()).len(), 4);
    }

    #[test]
    fn budget_sorts() {
        let filter = TaskFilter {
            sort: TaskSort::BudgetHigh,
            ..Default::default()
        };
        assert_eq!(
            titles(&filter.apply(board(), Utc::now())),
            vec!["Office clean", "Deep clean flat", "Move sofa", "Window cleaning"]
        );

        let filter = TaskFilter {
            sort: TaskSort::BudgetLow,
            location: Some("zagreb".to_string()),
            ..Default::default()
        };
        assert_eq!(
            titles(&filter.apply(board(), Utc::now())),
            vec!["Move sofa", "Deep clean flat", "Office clean"]
        );
    }

    #[test]
    fn newest_first_by_default() {
        let now = Utc::now();
        let mut rows = board();
        for (i, row) in rows.iter_mut().enumerate() {
            row.task.created_at = now - Duration::hours(i as i64);
        }
        let result = TaskFilter::default().apply(rows, now);
        assert_eq!(titles(&result)[0], "Deep clean flat");
        assert_eq!(titles(&result)[3], "Office clean");
    }

    #[test]
    fn live_featured_tasks_come_first() {
        let now = Utc::now();
        let mut rows = board();
        rows[2].task.is_featured = true;
        rows[2].task.featured_until = Some(now + Duration::days(3));
        rows[3].task.is_featured = true;
        rows[3].task.featured_until = Some(now - Duration::days(1));

        let filter = TaskFilter {
            sort: TaskSort::BudgetHigh,
            ..Default::default()
        };
        let result = filter.apply(rows, now);
        assert_eq!(titles(&result)[0], "Window cleaning");
        assert_eq!(titles(&result)[1], "Office clean");
    }

    fn worker(name: &str, skills: &[&str], rate: Option<f64>, rating: Option<f64>) -> WorkerListing {
        WorkerListing {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            avatar_url: None,
            bio: Some(format!("{} has plenty of experience", name)),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            location_ids: Vec::new(),
            hourly_rate: rate,
            average_rating: rating,
            review_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn worker_skill_and_rate_filters_intersect() {
        let workers = vec![
            worker("Ana", &["Plumbing", "Tiling"], Some(25.0), Some(4.5)),
            worker("Ivo", &["plumbing"], Some(45.0), Some(4.9)),
            worker("Maja", &["Gardening"], Some(20.0), None),
            worker("Luka", &["Plumbing"], None, Some(3.0)),
        ];
        let filter = WorkerFilter {
            skill: Some("plumbing".to_string()),
            max_rate: Some(30.0),
            ..Default::default()
        };
        let result = filter.apply(workers);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].full_name, "Ana");
    }

    #[test]
    fn worker_location_filter_uses_covered_locations() {
        let zagreb = Uuid::new_v4();
        let mut ana = worker("Ana", &["Cleaning"], None, None);
        ana.location_ids = vec![zagreb];
        let ivo = worker("Ivo", &["Cleaning"], None, None);

        let filter = WorkerFilter {
            location_id: Some(zagreb),
            ..Default::default()
        };
        let result = filter.apply(vec![ana, ivo]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].full_name, "Ana");
    }

    #[test]
    fn workers_sorted_by_rating_unrated_last() {
        let workers = vec![
            worker("Maja", &[], None, None),
            worker("Ana", &[], None, Some(4.5)),
            worker("Ivo", &[], None, Some(4.9)),
        ];
        let result = WorkerFilter::default().apply(workers);
        let names: Vec<&str> = result.iter().map(|w| w.full_name.as_str()).collect();
        assert_eq!(names, vec!["Ivo", "Ana", "Maja"]);
    }
}
