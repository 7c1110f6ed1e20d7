// src/handlers/leaderboard.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::{
    config::{DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT},
    error::AppError,
    models::quiz_result::{LeaderboardEntry, OverallEntry, RankedResultRow},
};

/// Mean rounded to 1 decimal place.
fn average_1dp(sum: i64, count: i64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (sum as f64 / count as f64 * 10.0).round() / 10.0
}

/// Builds the subject leaderboard from that subject's full result history.
///
/// Groups rows per user, projects latest/average/best, then ranks by
/// latest score with the most recent completion winning ties. When a
/// user has two results with the same `completed_at`, the higher row id
/// (the later insert) counts as latest, so the projection never depends
/// on row iteration order. The final user-id tie-break in the sort only
/// makes the output order deterministic when both ranking keys collide.
fn rank_subject(rows: &[RankedResultRow], limit: i64) -> Vec<LeaderboardEntry> {
    if limit <= 0 {
        return Vec::new();
    }

    let mut groups: HashMap<i64, Vec<&RankedResultRow>> = HashMap::new();
    for row in rows {
        groups.entry(row.user_id).or_default().push(row);
    }

    let mut entries: Vec<LeaderboardEntry> = groups
        .into_values()
        .filter_map(|group| {
            let latest = group.iter().max_by_key(|r| (r.completed_at, r.id))?;
            let sum: i64 = group.iter().map(|r| r.score as i64).sum();
            let best = group.iter().map(|r| r.score).max().unwrap_or(0);

            Some(LeaderboardEntry {
                user_id: latest.user_id,
                username: latest.username.clone(),
                avatar_url: latest.avatar_url.clone(),
                latest_score: latest.score,
                latest_completed_at: latest.completed_at,
                average_score: average_1dp(sum, group.len() as i64),
                best_score: best,
                total_quizzes: group.len() as i64,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.latest_score
            .cmp(&a.latest_score)
            .then(b.latest_completed_at.cmp(&a.latest_completed_at))
            .then(a.user_id.cmp(&b.user_id))
    });
    entries.truncate(limit as usize);
    entries
}

/// Builds the overall leaderboard across all subjects, ranked by average
/// score with the higher quiz count winning ties.
fn rank_overall(rows: &[RankedResultRow], limit: i64) -> Vec<OverallEntry> {
    if limit <= 0 {
        return Vec::new();
    }

    let mut groups: HashMap<i64, Vec<&RankedResultRow>> = HashMap::new();
    for row in rows {
        groups.entry(row.user_id).or_default().push(row);
    }

    let mut entries: Vec<OverallEntry> = groups
        .into_values()
        .filter_map(|group| {
            let latest = group.iter().max_by_key(|r| (r.completed_at, r.id))?;
            let sum: i64 = group.iter().map(|r| r.score as i64).sum();

            Some(OverallEntry {
                user_id: latest.user_id,
                username: latest.username.clone(),
                avatar_url: latest.avatar_url.clone(),
                total_score: sum,
                total_quizzes: group.len() as i64,
                average_score: average_1dp(sum, group.len() as i64),
                last_quiz: latest.completed_at,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.average_score
            .partial_cmp(&a.average_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.total_quizzes.cmp(&a.total_quizzes))
            .then(a.user_id.cmp(&b.user_id))
    });
    entries.truncate(limit as usize);
    entries
}

/// Query parameters for leaderboard endpoints.
#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<i64>,
}

fn effective_limit(params: &LeaderboardParams) -> i64 {
    params
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .min(MAX_LEADERBOARD_LIMIT)
}

/// Fetches result rows joined with the user directory. The inner join
/// silently drops results whose user was deleted; a dangling result must
/// never abort the ranking.
async fn fetch_rows(pool: &PgPool, subject: Option<&str>) -> Result<Vec<RankedResultRow>, AppError> {
    let rows = sqlx::query_as::<_, RankedResultRow>(
        r#"
        SELECT r.id, r.user_id, u.username, u.avatar_url, r.subject, r.score, r.completed_at
        FROM quiz_results r
        JOIN users u ON r.user_id = u.id
        WHERE ($1::TEXT IS NULL OR r.subject = $1)
        "#,
    )
    .bind(subject)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard rows: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(rows)
}

/// GET /api/leaderboard/{subject}
/// Top users for one subject. An unknown subject returns an empty list.
pub async fn subject_leaderboard(
    State(pool): State<PgPool>,
    Path(subject): Path<String>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = fetch_rows(&pool, Some(&subject)).await?;
    Ok(Json(rank_subject(&rows, effective_limit(&params))))
}

/// GET /api/leaderboard
/// Cross-subject ranking by average score.
pub async fn overall_leaderboard(
    State(pool): State<PgPool>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = fetch_rows(&pool, None).await?;
    Ok(Json(rank_overall(&rows, effective_limit(&params))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap()
    }

    fn row_with_id(id: i64, user_id: i64, score: i32, minute: u32) -> RankedResultRow {
        RankedResultRow {
            id,
            user_id,
            username: format!("user{}", user_id),
            avatar_url: None,
            subject: "Mathematics".to_string(),
            score,
            completed_at: at(minute),
        }
    }

    fn row(user_id: i64, score: i32, minute: u32) -> RankedResultRow {
        // Distinct (user, minute) pairs per test keep these ids unique.
        row_with_id(user_id * 100 + minute as i64, user_id, score, minute)
    }

    #[test]
    fn ranks_by_latest_score_then_recency() {
        let rows = vec![
            row(1, 70, 0),
            row(1, 90, 10), // user 1 latest: 90
            row(2, 90, 5),  // user 2 latest: 90, but older
            row(3, 95, 1),  // user 3 latest: 95
        ];

        let board = rank_subject(&rows, 10);
        let order: Vec<i64> = board.iter().map(|e| e.user_id).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn order_is_independent_of_insertion_order() {
        let mut rows = vec![row(1, 70, 0), row(1, 90, 10), row(2, 90, 5), row(3, 95, 1)];
        let forward = rank_subject(&rows, 10);
        rows.reverse();
        let backward = rank_subject(&rows, 10);
        assert_eq!(forward, backward);
    }

    #[test]
    fn latest_on_a_timestamp_tie_is_the_later_insert() {
        // Two results for the same user at the same completed_at; the
        // external path accepts a client-supplied completion time, so
        // exact ties are reachable. The higher row id wins, whichever
        // way the rows are ordered.
        let mut rows = vec![row_with_id(1, 5, 50, 7), row_with_id(2, 5, 90, 7)];

        let forward = rank_subject(&rows, 10);
        rows.reverse();
        let backward = rank_subject(&rows, 10);

        assert_eq!(forward[0].latest_score, 90);
        assert_eq!(forward, backward);

        let forward = rank_overall(&rows, 10);
        rows.reverse();
        let backward = rank_overall(&rows, 10);
        assert_eq!(forward, backward);
        assert_eq!(forward[0].last_quiz, at(7));
    }

    #[test]
    fn single_result_collapses_the_projection() {
        let rows = vec![row(7, 85, 3)];
        let board = rank_subject(&rows, 10);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].latest_score, 85);
        assert_eq!(board[0].best_score, 85);
        assert_eq!(board[0].average_score, 85.0);
        assert_eq!(board[0].total_quizzes, 1);
    }

    #[test]
    fn average_is_rounded_to_one_decimal() {
        let rows = vec![row(1, 60, 0), row(1, 80, 1), row(1, 100, 2)];
        let board = rank_subject(&rows, 10);
        assert_eq!(board[0].average_score, 80.0);
        assert_eq!(board[0].best_score, 100);
        assert_eq!(board[0].latest_score, 100);

        // 50 + 83 + 67 = 200 / 3 = 66.66.. -> 66.7
        let rows = vec![row(2, 50, 0), row(2, 83, 1), row(2, 67, 2)];
        let board = rank_subject(&rows, 10);
        assert_eq!(board[0].average_score, 66.7);
    }

    #[test]
    fn empty_history_and_non_positive_limits() {
        assert!(rank_subject(&[], 10).is_empty());
        let rows = vec![row(1, 50, 0)];
        assert!(rank_subject(&rows, 0).is_empty());
        assert!(rank_subject(&rows, -3).is_empty());
        assert!(rank_overall(&rows, 0).is_empty());
    }

    #[test]
    fn truncates_to_limit() {
        let rows = vec![row(1, 10, 0), row(2, 20, 1), row(3, 30, 2)];
        assert_eq!(rank_subject(&rows, 2).len(), 2);
    }

    #[test]
    fn overall_ranks_by_average_then_count() {
        let rows = vec![
            row(1, 80, 0),
            row(1, 80, 1), // avg 80.0 over 2 quizzes
            row(2, 80, 2), // avg 80.0 over 1 quiz
            row(3, 90, 3), // avg 90.0
        ];

        let board = rank_overall(&rows, 10);
        let order: Vec<i64> = board.iter().map(|e| e.user_id).collect();
        assert_eq!(order, vec![3, 1, 2]);
        assert_eq!(board[1].total_score, 160);
        assert_eq!(board[1].total_quizzes, 2);
        assert_eq!(board[1].last_quiz, at(1));
    }
}
