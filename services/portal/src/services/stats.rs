//! Fault log analytics for the explorer

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::fault::{FaultRecord, Priority, Status};
use crate::services::clock::Clock;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_problems: usize,
    pub active_problems: usize,
    pub urgent_problems: usize,
    pub completed_problems: usize,
    pub avg_resolution_days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ZoneCounts {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Breakdown {
    pub zones: BTreeMap<String, ZoneCounts>,
    pub categories: BTreeMap<String, usize>,
    pub priorities: BTreeMap<String, usize>,
    pub statuses: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    pub completion_rate: i64,
    pub active_rate: i64,
    pub urgent_rate: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Analytics {
    pub summary: Summary,
    pub breakdown: Breakdown,
    pub trends: Trends,
}

fn label(value: &str, fallback: &str) -> String {
    let text = if value.is_empty() { fallback } else { value };
    text.to_string()
}

fn percent(part: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as i64
}

/// Whole days from report to completion, rounded up; unreadable or
/// negative spans count as zero
fn resolution_days(problem: &FaultRecord, clock: &Clock) -> i64 {
    match (clock.parse(&problem.timestamp), clock.parse(&problem.completion_date)) {
        (Some(reported), Some(completed)) => {
            let seconds = (completed - reported).num_seconds() as f64;
            let days = (seconds / 86_400.0).ceil() as i64;
            days.max(0)
        }
        _ => 0,
    }
}

fn is(problem: &FaultRecord, status: Status) -> bool {
    problem.status() == Some(status)
}

pub fn analyze(problems: &[FaultRecord], clock: &Clock) -> Analytics {
    let total = problems.len();
    let active = problems
        .iter()
        .filter(|p| !is(p, Status::Completed) && !is(p, Status::Cancelled))
        .count();
    let urgent = problems
        .iter()
        .filter(|p| p.priority() == Some(Priority::Urgent))
        .count();
    let completed = problems.iter().filter(|p| is(p, Status::Completed)).count();

    let mut breakdown = Breakdown::default();
    for problem in problems {
        let zone = breakdown
            .zones
            .entry(label(&problem.zone, "Unknown"))
            .or_default();
        zone.total += 1;
        if is(problem, Status::Completed) {
            zone.completed += 1;
        } else if !is(problem, Status::Cancelled) {
            zone.active += 1;
        }

        *breakdown
            .categories
            .entry(label(&problem.category, "Uncategorized"))
            .or_default() += 1;
        *breakdown
            .priorities
            .entry(label(&problem.problem_priority, Priority::Medium.as_str()))
            .or_default() += 1;
        *breakdown
            .statuses
            .entry(label(&problem.problem_status, Status::Reported.as_str()))
            .or_default() += 1;
    }

    let resolved: Vec<&FaultRecord> = problems
        .iter()
        .filter(|p| is(p, Status::Completed) && !p.completion_date.is_empty() && !p.timestamp.is_empty())
        .collect();
    let avg_resolution_days = if resolved.is_empty() {
        0
    } else {
        let total_days: i64 = resolved.iter().map(|p| resolution_days(p, clock)).sum();
        (total_days as f64 / resolved.len() as f64).round() as i64
    };

    Analytics {
        summary: Summary {
            total_problems: total,
            active_problems: active,
            urgent_problems: urgent,
            completed_problems: completed,
            avg_resolution_days,
        },
        breakdown,
        trends: Trends {
            completion_rate: percent(completed, total),
            active_rate: percent(active, total),
            urgent_rate: percent(urgent, total),
        },
    }
}
