use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::engine::filter::{rank_and_filter, CandidateConstraints, DEFAULT_LIMIT};
use crate::engine::ledger::DispatchLedger;
use crate::engine::scoring::compute_score;
use crate::error::AppError;
use crate::geo::{haversine_km, travel_time_minutes, validate};
use crate::models::job::{Job, JobStatus};
use crate::models::matching::Match;
use crate::models::professional::{GeoPoint, Location, Professional};
use crate::store::{AvailabilityOracle, JobStore, ProfessionalStore};

#[derive(Debug, Clone, Copy)]
pub struct MatchSettings {
    pub default_limit: usize,
    pub max_limit: usize,
    pub platform_fee_rate: f64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: 100,
            platform_fee_rate: 0.15,
        }
    }
}

#[derive(Debug)]
pub struct MatchResult {
    pub matches: Vec<Match>,
    pub total_candidates: usize,
}

/// Candidate pipeline: open jobs, scored, ranked, then filtered.
pub struct Matcher {
    jobs: Arc<dyn JobStore>,
    professionals: Arc<dyn ProfessionalStore>,
    availability: Arc<dyn AvailabilityOracle>,
    ledger: Arc<DispatchLedger>,
    settings: MatchSettings,
}

impl Matcher {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        professionals: Arc<dyn ProfessionalStore>,
        availability: Arc<dyn AvailabilityOracle>,
        ledger: Arc<DispatchLedger>,
        settings: MatchSettings,
    ) -> Self {
        Self {
            jobs,
            professionals,
            availability,
            ledger,
            settings,
        }
    }

    /// Rank open jobs for a professional.
    ///
    /// `position`, when given, replaces the stored location. When the caller gives no
    /// distance cap the professional's service radius applies.
    pub fn find_matches(
        &self,
        professional_id: &str,
        position: Option<(f64, f64)>,
        constraints: &CandidateConstraints,
        limit: Option<usize>,
    ) -> Result<MatchResult, AppError> {
        let position = position.map(|(lat, lng)| validate(lat, lng)).transpose()?;

        let professional = self
            .professionals
            .fetch_professional(professional_id)
            .ok_or_else(|| AppError::NotFound(format!("professional {professional_id} not found")))?;

        // Accept checks the radius against the stored location.
        if let Some(point) = position {
            self.professionals.update_location(
                professional_id,
                Location {
                    lat: point.lat,
                    lng: point.lng,
                    accuracy: None,
                    heading: None,
                    speed: None,
                    recorded_at: self.ledger.now(),
                },
            )?;
        }

        let position = position
            .or_else(|| professional.location.as_ref().map(|l| l.point()))
            .ok_or_else(|| {
                AppError::BadRequest(format!("no position known for professional {professional_id}"))
            })?;

        let mut constraints = constraints.clone();
        constraints
            .max_distance_km
            .get_or_insert(professional.service_radius_km);

        let now = self.ledger.now();
        let candidates: Vec<Match> = self
            .jobs
            .fetch_candidate_jobs()
            .into_iter()
            .filter(|job| self.is_candidate(job, professional_id, now))
            .map(|job| self.score(&professional, job, &position))
            .collect();
        let total_candidates = candidates.len();

        let limit = limit
            .unwrap_or(self.settings.default_limit)
            .clamp(1, self.settings.max_limit);
        let matches = rank_and_filter(candidates, &constraints, limit);

        tracing::debug!(
            professional_id,
            total_candidates,
            returned = matches.len(),
            "matches computed"
        );

        Ok(MatchResult {
            matches,
            total_candidates,
        })
    }

    /// Default-constraint list from the stored location, used after a lost race.
    pub fn refresh_for(&self, professional_id: &str) -> Result<Vec<Match>, AppError> {
        self.find_matches(professional_id, None, &CandidateConstraints::default(), None)
            .map(|result| result.matches)
    }

    fn is_candidate(&self, job: &Job, professional_id: &str, now: DateTime<Utc>) -> bool {
        let open_to_me = match job.status {
            JobStatus::Available => true,
            JobStatus::Offered => {
                job.offered_to.as_deref() == Some(professional_id)
                    && job.offer_expires_at.is_none_or(|expiry| expiry > now)
            }
            _ => false,
        };

        open_to_me && !self.ledger.has_declined(professional_id, &job.id)
    }

    fn score(&self, professional: &Professional, job: Job, position: &GeoPoint) -> Match {
        let available = self.availability.is_available(&professional.id, &job)
            && !self.ledger.recently_declined(&professional.id, &job.service_type);
        let (match_score, score_breakdown) = compute_score(professional, &job, position, available);
        let distance = haversine_km(position, &job.location);

        Match {
            match_score,
            distance,
            travel_time: travel_time_minutes(distance),
            earnings_potential: job.amount * (1.0 - self.settings.platform_fee_rate),
            score_breakdown,
            job,
        }
    }
}
