//! Trainee roadmap: which cases are locked, completed and starred.
//!
//! A pure projection over the ordered case list and the user's progress rows.
//! Cases unlock strictly in order: the first is always open, and each later
//! case opens once every case before it has been completed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use rehearsal_core::models::{Case, CaseMetaData, Progress, MAX_STARS};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub cases: Vec<CaseProgressView>,
    pub summary: ProgressSummary,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaseProgressView {
    pub case_id: Uuid,
    pub order_index: i64,
    pub customer_name: String,
    pub intro: String,
    pub avatar: String,
    pub meta_data: CaseMetaData,
    pub progress: CaseProgress,
    pub is_locked: bool,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaseProgress {
    pub is_completed: bool,
    pub best_stars: u8,
    pub best_score: u8,
    pub total_attempts: u32,
    pub first_completed_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub completed_count: usize,
    pub total_stars: u32,
    pub max_total_stars: u32,
    pub completion_percentage: u32,
    pub total_attempts: u32,
    pub total_cases: usize,
}

impl From<&Progress> for CaseProgress {
    fn from(p: &Progress) -> Self {
        Self {
            is_completed: p.is_completed(),
            best_stars: p.best_stars,
            best_score: p.best_score,
            total_attempts: p.total_attempts,
            first_completed_at: p.first_completed_at,
            last_attempt_at: Some(p.last_attempt_at),
        }
    }
}

/// Joins cases with progress. `cases` is sorted by `order_index` here, so
/// callers may pass them in any order.
pub fn project(cases: &[Case], progress: &[Progress]) -> ProgressView {
    let by_case: HashMap<Uuid, &Progress> = progress.iter().map(|p| (p.case_id, p)).collect();

    let mut ordered: Vec<&Case> = cases.iter().collect();
    ordered.sort_by_key(|c| c.order_index);

    let mut summary = ProgressSummary {
        total_cases: ordered.len(),
        max_total_stars: ordered.len() as u32 * MAX_STARS as u32,
        ..ProgressSummary::default()
    };

    let mut last_unlocked = 0usize;
    let mut views = Vec::with_capacity(ordered.len());
    for (index, case) in ordered.into_iter().enumerate() {
        let progress = by_case
            .get(&case.id)
            .map(|p| CaseProgress::from(*p))
            .unwrap_or_default();

        let is_locked = index > last_unlocked;
        if !is_locked && progress.is_completed {
            last_unlocked = index + 1;
        }

        if progress.is_completed {
            summary.completed_count += 1;
        }
        summary.total_stars += progress.best_stars as u32;
        summary.total_attempts += progress.total_attempts;

        views.push(CaseProgressView {
            case_id: case.id,
            order_index: case.order_index,
            customer_name: case.customer_name.clone(),
            intro: case.intro.clone(),
            avatar: case.avatar.clone(),
            meta_data: case.meta_data.clone(),
            progress,
            is_locked,
        });
    }

    summary.completion_percentage = if summary.max_total_stars > 0 {
        (summary.total_stars as f64 / summary.max_total_stars as f64 * 100.0).round() as u32
    } else {
        0
    };

    ProgressView {
        cases: views,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(order_index: i64) -> Case {
        Case {
            id: Uuid::new_v4(),
            customer_name: format!("Customer {order_index}"),
            intro: "intro".into(),
            avatar: "/avatars/a.png".into(),
            order_index,
            meta_data: CaseMetaData::default(),
            script: None,
            created_at: Utc::now(),
        }
    }

    fn completed(case: &Case, stars: u8, attempts: u32) -> Progress {
        let now = Utc::now();
        Progress {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            case_id: case.id,
            best_score: stars * 20,
            best_stars: stars,
            total_attempts: attempts,
            first_completed_at: Some(now),
            last_attempt_at: now,
            created_at: now,
        }
    }

    fn locks(view: &ProgressView) -> Vec<bool> {
        view.cases.iter().map(|c| c.is_locked).collect()
    }

    #[test]
    fn fresh_user_sees_only_first_case_unlocked() {
        let cases = vec![case(1), case(2)];
        let view = project(&cases, &[]);
        assert_eq!(locks(&view), vec![false, true]);
        assert_eq!(view.summary.completed_count, 0);
        assert_eq!(view.summary.max_total_stars, 10);
        assert_eq!(view.summary.completion_percentage, 0);
    }

    #[test]
    fn completing_a_case_unlocks_the_next_one() {
        let cases = vec![case(1), case(2), case(3)];
        let progress = vec![completed(&cases[0], 4, 2)];
        let view = project(&cases, &progress);
        assert_eq!(locks(&view), vec![false, false, true]);
        assert_eq!(view.summary.total_stars, 4);
        assert_eq!(view.summary.total_attempts, 2);
        assert_eq!(view.summary.completion_percentage, 27);
    }

    #[test]
    fn unlocking_needs_a_contiguous_completed_prefix() {
        let cases = vec![case(1), case(2), case(3), case(4)];
        // Case 3 completed out of band, but case 2 never was.
        let progress = vec![completed(&cases[0], 3, 1), completed(&cases[2], 5, 1)];
        let view = project(&cases, &progress);
        assert_eq!(locks(&view), vec![false, false, true, true]);
        assert_eq!(view.summary.completed_count, 2);
    }

    #[test]
    fn sorts_cases_by_order_index() {
        let cases = vec![case(3), case(1), case(2)];
        let view = project(&cases, &[]);
        let order: Vec<i64> = view.cases.iter().map(|c| c.order_index).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(!view.cases[0].is_locked);
    }

    #[test]
    fn progress_without_completion_does_not_unlock() {
        let cases = vec![case(1), case(2)];
        let mut partial = completed(&cases[0], 0, 0);
        partial.first_completed_at = None;
        let view = project(&cases, &[partial]);
        assert_eq!(locks(&view), vec![false, true]);
    }

    #[test]
    fn unlocked_cases_always_form_a_prefix() {
        let cases: Vec<Case> = (1..=6).map(case).collect();
        for mask in 0u32..64 {
            let progress: Vec<Progress> = cases
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, c)| completed(c, 3, 1))
                .collect();
            let view = project(&cases, &progress);
            for (i, entry) in view.cases.iter().enumerate() {
                if i > 0 && !entry.is_locked {
                    assert!(
                        view.cases[..i].iter().all(|c| c.progress.is_completed),
                        "case {i} unlocked with an incomplete predecessor (mask {mask:06b})"
                    );
                }
            }
        }
    }

    #[test]
    fn empty_case_list_has_zero_percentage() {
        let view = project(&[], &[]);
        assert!(view.cases.is_empty());
        assert_eq!(view.summary, ProgressSummary::default());
    }
}
