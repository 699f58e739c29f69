use std::cmp::Ordering;

use crate::error::AppError;
use crate::models::matching::Match;

pub const DEFAULT_LIMIT: usize = 20;

/// Conjunctive constraints recognised by the candidate filter.
///
/// Built from an open key/value option set; keys it does not know are
/// skipped so clients can send options newer servers understand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateConstraints {
    pub min_pay: Option<f64>,
    pub max_distance_km: Option<f64>,
    pub urgent_only: bool,
    pub service_type: Option<String>,
    pub service_types: Vec<String>,
}

impl CandidateConstraints {
    pub fn from_options<'a, I>(options: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut constraints = Self::default();

        for (key, value) in options {
            match key {
                "min_pay" => constraints.min_pay = Some(parse_number(key, value)?),
                "max_distance" | "max_distance_km" => {
                    constraints.max_distance_km = Some(parse_number(key, value)?)
                }
                "urgent_only" => constraints.urgent_only = parse_flag(key, value)?,
                "service_type" if !value.trim().is_empty() => {
                    constraints.service_type = Some(value.trim().to_string())
                }
                "service_types" | "service_types[]" => constraints.service_types.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                ),
                _ => tracing::trace!(option = key, "ignoring unrecognised match option"),
            }
        }

        Ok(constraints)
    }

    pub fn admits(&self, candidate: &Match) -> bool {
        let job = &candidate.job;

        if self.min_pay.is_some_and(|min| job.amount < min) {
            return false;
        }
        if self.max_distance_km.is_some_and(|max| candidate.distance > max) {
            return false;
        }
        if self.urgent_only && !job.urgent {
            return false;
        }
        if self
            .service_type
            .as_ref()
            .is_some_and(|wanted| !wanted.eq_ignore_ascii_case(&job.service_type))
        {
            return false;
        }
        if !self.service_types.is_empty()
            && !self
                .service_types
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(&job.service_type))
        {
            return false;
        }

        true
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64, AppError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .ok_or_else(|| AppError::BadRequest(format!("{key} must be a non-negative number")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(AppError::BadRequest(format!("{key} must be a boolean"))),
    }
}

/// Score descending, then distance ascending, then job id ascending.
pub fn ranking_order(a: &Match, b: &Match) -> Ordering {
    b.match_score
        .total_cmp(&a.match_score)
        .then_with(|| a.distance.total_cmp(&b.distance))
        .then_with(|| a.job.id.cmp(&b.job.id))
}

pub fn rank(candidates: &mut [Match]) {
    candidates.sort_by(ranking_order);
}

/// Stable filter: survivors keep their relative order.
pub fn filter(candidates: Vec<Match>, constraints: &CandidateConstraints, limit: usize) -> Vec<Match> {
    candidates
        .into_iter()
        .filter(|candidate| constraints.admits(candidate))
        .take(limit)
        .collect()
}

pub fn rank_and_filter(
    mut candidates: Vec<Match>,
    constraints: &CandidateConstraints,
    limit: usize,
) -> Vec<Match> {
    rank(&mut candidates);
    filter(candidates, constraints, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::job;
    use crate::models::matching::ScoreBreakdown;

    fn candidate(id: &str, score: f64, distance: f64, amount: f64, urgent: bool, service: &str) -> Match {
        let mut job = job(id, -33.88, 151.20);
        job.amount = amount;
        job.urgent = urgent;
        job.service_type = service.to_string();
        Match {
            job,
            match_score: score,
            distance,
            travel_time: distance * 1.5,
            earnings_potential: amount * 0.85,
            score_breakdown: ScoreBreakdown::default(),
        }
    }

    fn sample() -> Vec<Match> {
        vec![
            candidate("job_c", 70.0, 4.0, 120.0, false, "cleaning"),
            candidate("job_a", 80.0, 2.0, 60.0, true, "gardening"),
            candidate("job_b", 70.0, 4.0, 200.0, true, "cleaning"),
            candidate("job_d", 70.0, 1.0, 90.0, false, "cleaning"),
            candidate("job_e", 40.0, 12.0, 300.0, true, "handyman"),
        ]
    }

    fn ids(matches: &[Match]) -> Vec<&str> {
        matches.iter().map(|m| m.job.id.as_str()).collect()
    }

    #[test]
    fn ties_break_on_distance_then_id() {
        let mut matches = sample();
        rank(&mut matches);
        assert_eq!(ids(&matches), vec!["job_a", "job_d", "job_b", "job_c", "job_e"]);
    }

    #[test]
    fn constraints_apply_conjunctively() {
        let constraints = CandidateConstraints {
            min_pay: Some(100.0),
            urgent_only: true,
            ..CandidateConstraints::default()
        };
        let result = rank_and_filter(sample(), &constraints, DEFAULT_LIMIT);
        assert_eq!(ids(&result), vec!["job_b", "job_e"]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let constraints = CandidateConstraints {
            max_distance_km: Some(5.0),
            service_type: Some("cleaning".to_string()),
            ..CandidateConstraints::default()
        };
        let once = rank_and_filter(sample(), &constraints, DEFAULT_LIMIT);
        let twice = filter(once.clone(), &constraints, DEFAULT_LIMIT);
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn filter_never_reorders() {
        let constraints = CandidateConstraints {
            min_pay: Some(80.0),
            ..CandidateConstraints::default()
        };
        let mut ranked = sample();
        rank(&mut ranked);

        let filtered = filter(ranked.clone(), &constraints, DEFAULT_LIMIT);
        let mut resorted = filtered.clone();
        rank(&mut resorted);

        assert_eq!(ids(&filtered), ids(&resorted));
        let positions: Vec<usize> = filtered
            .iter()
            .map(|m| ranked.iter().position(|r| r.job.id == m.job.id).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn limit_truncates_after_filtering() {
        let result = rank_and_filter(sample(), &CandidateConstraints::default(), 2);
        assert_eq!(ids(&result), vec!["job_a", "job_d"]);
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let constraints = CandidateConstraints {
            min_pay: Some(10_000.0),
            ..CandidateConstraints::default()
        };
        assert!(rank_and_filter(sample(), &constraints, DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn unknown_options_are_ignored() {
        let constraints = CandidateConstraints::from_options([
            ("min_pay", "50"),
            ("favourite_colour", "teal"),
            ("urgent_only", "true"),
            ("service_types[]", "cleaning"),
            ("service_types[]", "gardening"),
        ])
        .unwrap();

        assert_eq!(constraints.min_pay, Some(50.0));
        assert!(constraints.urgent_only);
        assert_eq!(constraints.service_types, vec!["cleaning", "gardening"]);
    }

    #[test]
    fn malformed_known_option_is_rejected() {
        assert!(CandidateConstraints::from_options([("min_pay", "lots")]).is_err());
        assert!(CandidateConstraints::from_options([("urgent_only", "maybe")]).is_err());
    }
}
