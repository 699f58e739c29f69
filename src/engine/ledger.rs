use std::cell::Cell;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::engine::sessions::SessionBook;
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::job::{Job, JobStatus};
use crate::models::professional::{GeoPoint, Professional};
use crate::models::tracking::{SessionSummary, SessionType, TrackingSession};
use crate::store::{JobStore, ProfessionalStore};

const MAX_CAS_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct LedgerSettings {
    pub offer_ttl: Duration,
    pub decline_cooldown: Duration,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            offer_ttl: Duration::seconds(300),
            decline_cooldown: Duration::minutes(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeclineRecord {
    pub job_id: String,
    pub service_type: String,
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

/// Per-professional declines: every declined job id, plus the records still
/// inside the cooldown window.
#[derive(Debug, Default)]
struct DeclineHistory {
    jobs: HashSet<String>,
    recent: Vec<DeclineRecord>,
}

/// Owner of job status after creation.
///
/// Every status write is a version-guarded compare-and-swap on a single
/// job, so callers working on different jobs never wait on each other.
/// A professional holds at most one accepted or in-progress job.
pub struct DispatchLedger {
    jobs: Arc<dyn JobStore>,
    professionals: Arc<dyn ProfessionalStore>,
    clock: Arc<dyn Clock>,
    commitments: DashMap<String, String>,
    declines: DashMap<String, DeclineHistory>,
    sessions: SessionBook,
    settings: LedgerSettings,
}

impl DispatchLedger {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        professionals: Arc<dyn ProfessionalStore>,
        clock: Arc<dyn Clock>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            jobs,
            professionals,
            clock,
            commitments: DashMap::new(),
            declines: DashMap::new(),
            sessions: SessionBook::new(),
            settings,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Register a freshly booked job as available.
    pub fn create_job(&self, mut job: Job) -> Result<Job, AppError> {
        if job.window.end <= job.window.start {
            return Err(AppError::BadRequest(
                "job window must end after it starts".to_string(),
            ));
        }
        if !job.amount.is_finite() || job.amount < 0.0 {
            return Err(AppError::BadRequest("amount must be non-negative".to_string()));
        }

        let now = self.clock.now();
        job.status = JobStatus::Available;
        job.assigned_professional = None;
        job.offered_to = None;
        job.offer_expires_at = None;
        job.arrived_at = None;
        job.version = 0;
        job.created_at = now;
        job.updated_at = now;

        self.jobs.insert_job(job.clone())?;
        info!(job_id = %job.id, service_type = %job.service_type, "job created");
        Ok(job)
    }

    pub fn job(&self, job_id: &str) -> Result<Job, AppError> {
        self.jobs
            .fetch_job(job_id)
            .ok_or_else(|| AppError::NotFound(format!("job {job_id} not found")))
    }

    fn professional(&self, professional_id: &str) -> Result<Professional, AppError> {
        self.professionals
            .fetch_professional(professional_id)
            .ok_or_else(|| AppError::NotFound(format!("professional {professional_id} not found")))
    }

    /// Attribute an open job to exactly one professional.
    ///
    /// The eligibility check runs against the same snapshot whose version
    /// guards the write; a version mismatch means another transition won.
    pub fn accept(
        &self,
        job_id: &str,
        professional_id: &str,
        expected_version: Option<u64>,
    ) -> Result<Job, AppError> {
        let professional = self.professional(professional_id)?;
        let snapshot = self.job(job_id)?;
        let now = self.clock.now();

        let stale = expected_version.is_some_and(|version| version != snapshot.version);
        let offered_elsewhere = snapshot.status == JobStatus::Offered
            && (snapshot.offered_to.as_deref() != Some(professional_id)
                || snapshot.offer_expires_at.is_some_and(|expiry| expiry <= now));

        if !snapshot.status.is_open() || stale || offered_elsewhere {
            debug!(job_id, professional_id, status = snapshot.status.as_str(), stale, "accept on unavailable job");
            return Err(AppError::JobNoLongerAvailable(job_id.to_string()));
        }

        check_eligibility(&professional, &snapshot)?;
        self.claim(professional_id, job_id)?;

        let mut next = snapshot.clone();
        next.status = JobStatus::Accepted;
        next.assigned_professional = Some(professional_id.to_string());
        next.offered_to = None;
        next.offer_expires_at = None;
        next.version = snapshot.version + 1;
        next.updated_at = now;

        if self.jobs.compare_and_swap(snapshot.version, next.clone()) {
            info!(job_id, professional_id, version = next.version, "job accepted");
            Ok(next)
        } else {
            self.release(professional_id, job_id);
            debug!(job_id, professional_id, "lost accept race");
            Err(AppError::JobNoLongerAvailable(job_id.to_string()))
        }
    }

    /// Reserve an available job for one professional until the offer expires.
    pub fn offer(&self, job_id: &str, professional_id: &str) -> Result<Job, AppError> {
        self.professional(professional_id)?;
        let expires_at = self.clock.now() + self.settings.offer_ttl;

        let job = self.transition(job_id, |current| {
            let mut next = expect_transition(current, JobStatus::Offered)?;
            next.offered_to = Some(professional_id.to_string());
            next.offer_expires_at = Some(expires_at);
            Ok(next)
        })?;

        info!(job_id, professional_id, %expires_at, "job offered");
        Ok(job)
    }

    /// Record a professional passing on a job.
    ///
    /// An open job stays open; only the recipient of a targeted offer
    /// turning it down moves the job, to `declined`.
    pub fn decline(
        &self,
        job_id: &str,
        professional_id: &str,
        reason: Option<String>,
    ) -> Result<Job, AppError> {
        let current = self.job(job_id)?;

        if current.assigned_professional.as_deref() == Some(professional_id)
            && current.status.is_assigned()
        {
            return Err(AppError::InvalidTransition(format!(
                "job {job_id} is already accepted by this professional"
            )));
        }

        let now = self.clock.now();
        let cutoff = now - self.settings.decline_cooldown;
        {
            let mut history = self.declines.entry(professional_id.to_string()).or_default();
            history.recent.retain(|record| record.at > cutoff);
            history.jobs.insert(job_id.to_string());
            history.recent.push(DeclineRecord {
                job_id: job_id.to_string(),
                service_type: current.service_type.clone(),
                reason: reason.clone(),
                at: now,
            });
        }

        info!(job_id, professional_id, reason = reason.as_deref().unwrap_or(""), "job declined");

        if current.status == JobStatus::Offered
            && current.offered_to.as_deref() == Some(professional_id)
        {
            return self.transition(job_id, |current| {
                if current.offered_to.as_deref() != Some(professional_id) {
                    return Err(AppError::JobNoLongerAvailable(job_id.to_string()));
                }
                let mut next = expect_transition(current, JobStatus::Declined)?;
                next.offer_expires_at = None;
                Ok(next)
            });
        }

        Ok(current)
    }

    pub fn has_declined(&self, professional_id: &str, job_id: &str) -> bool {
        self.declines
            .get(professional_id)
            .is_some_and(|history| history.jobs.contains(job_id))
    }

    /// Whether the professional turned down this kind of work recently.
    pub fn recently_declined(&self, professional_id: &str, service_type: &str) -> bool {
        let cutoff = self.clock.now() - self.settings.decline_cooldown;
        self.declines.get(professional_id).is_some_and(|history| {
            history.recent.iter().any(|record| {
                record.at > cutoff && record.service_type.eq_ignore_ascii_case(service_type)
            })
        })
    }

    pub fn start_job(&self, job_id: &str, professional_id: &str) -> Result<Job, AppError> {
        let job = self.transition(job_id, |current| {
            ensure_assignee(current, professional_id)?;
            expect_transition(current, JobStatus::InProgress)
        })?;
        info!(job_id, professional_id, "job started");
        Ok(job)
    }

    pub fn complete_job(&self, job_id: &str, professional_id: &str) -> Result<Job, AppError> {
        let job = self.transition(job_id, |current| {
            ensure_assignee(current, professional_id)?;
            expect_transition(current, JobStatus::Completed)
        })?;
        self.release(professional_id, job_id);
        info!(job_id, professional_id, "job completed");
        Ok(job)
    }

    pub fn cancel_job(&self, job_id: &str, reason: Option<&str>) -> Result<Job, AppError> {
        let job = self.transition(job_id, |current| {
            expect_transition(current, JobStatus::Cancelled)
        })?;
        if let Some(professional_id) = job.assigned_professional.as_deref() {
            self.release(professional_id, job_id);
        }
        info!(job_id, reason = reason.unwrap_or(""), "job cancelled");
        Ok(job)
    }

    /// Stamp the first arrival on the job. Returns the job and whether this
    /// call was the one that recorded it.
    pub fn mark_arrived(&self, job_id: &str, professional_id: &str) -> Result<(Job, bool), AppError> {
        let current = self.job(job_id)?;
        ensure_assignee(&current, professional_id)?;
        if !current.status.is_assigned() {
            return Err(AppError::InvalidTransition(format!(
                "job {job_id} is {}",
                current.status.as_str()
            )));
        }
        if current.arrived_at.is_some() {
            return Ok((current, false));
        }

        let now = self.clock.now();
        let recorded = Cell::new(false);
        let job = self.transition(job_id, |current| {
            ensure_assignee(current, professional_id)?;
            let mut next = current.clone();
            recorded.set(next.arrived_at.is_none());
            next.arrived_at.get_or_insert(now);
            Ok(next)
        })?;
        if recorded.get() {
            info!(job_id, professional_id, "professional arrived");
        }
        Ok((job, recorded.get()))
    }

    /// Move offers past their expiry to `expired`.
    pub fn expire_offers(&self) -> Vec<Job> {
        let now = self.clock.now();
        let due: Vec<String> = self
            .jobs
            .fetch_candidate_jobs()
            .into_iter()
            .filter(|job| {
                job.status == JobStatus::Offered
                    && job.offer_expires_at.is_some_and(|expiry| expiry <= now)
            })
            .map(|job| job.id)
            .collect();

        let mut expired = Vec::with_capacity(due.len());
        for job_id in due {
            let result = self.transition(&job_id, |current| {
                if current.offer_expires_at.is_none_or(|expiry| expiry > now) {
                    return Err(AppError::InvalidTransition("offer renewed".to_string()));
                }
                expect_transition(current, JobStatus::Expired)
            });
            match result {
                Ok(job) => {
                    info!(job_id = %job.id, "offer expired");
                    expired.push(job);
                }
                Err(err) => debug!(job_id = %job_id, error = %err, "offer not expired"),
            }
        }
        expired
    }

    pub fn active_job_for(&self, professional_id: &str) -> Option<Job> {
        let job_id = self.commitments.get(professional_id)?.value().clone();
        self.jobs
            .fetch_job(&job_id)
            .filter(|job| job.status.is_assigned())
    }

    pub fn start_tracking(
        &self,
        professional_id: &str,
        job_id: Option<String>,
        session_type: SessionType,
    ) -> Result<TrackingSession, AppError> {
        self.professional(professional_id)?;

        if let Some(job_id) = job_id.as_deref() {
            let job = self.job(job_id)?;
            ensure_assignee(&job, professional_id)?;
            if !job.status.is_assigned() {
                return Err(AppError::InvalidTransition(format!(
                    "job {job_id} is {}",
                    job.status.as_str()
                )));
            }
        }

        let session = self
            .sessions
            .start(professional_id, job_id, session_type, self.clock.now())?;
        info!(session_id = %session.id, professional_id, "tracking started");
        Ok(session)
    }

    pub fn stop_tracking(
        &self,
        session_id: &str,
        professional_id: &str,
    ) -> Result<SessionSummary, AppError> {
        let summary = self
            .sessions
            .stop(session_id, professional_id, self.clock.now())?;
        info!(
            session_id,
            professional_id,
            distance_km = summary.total_distance,
            "tracking stopped"
        );
        Ok(summary)
    }

    pub fn record_fix(&self, professional_id: &str, point: GeoPoint, speed_mps: Option<f64>) {
        self.sessions.record_fix(professional_id, point, speed_mps);
    }

    pub fn active_session(&self, professional_id: &str) -> Option<TrackingSession> {
        self.sessions.active_for(professional_id)
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.active_count()
    }

    /// Read-modify-CAS loop for transitions that are safe to re-evaluate.
    fn transition<F>(&self, job_id: &str, apply: F) -> Result<Job, AppError>
    where
        F: Fn(&Job) -> Result<Job, AppError>,
    {
        for attempt in 0..MAX_CAS_ATTEMPTS {
            let current = self.job(job_id)?;
            let mut next = apply(&current)?;
            next.version = current.version + 1;
            next.updated_at = self.clock.now();

            if self.jobs.compare_and_swap(current.version, next.clone()) {
                return Ok(next);
            }
            debug!(job_id, attempt, "version conflict; re-reading job");
        }

        warn!(job_id, "transition abandoned after repeated version conflicts");
        Err(AppError::InvalidTransition(format!("job {job_id} is under contention")))
    }

    fn claim(&self, professional_id: &str, job_id: &str) -> Result<(), AppError> {
        match self.commitments.entry(professional_id.to_string()) {
            Entry::Occupied(held) => Err(AppError::IneligibleProfessional(format!(
                "already committed to job {}",
                held.get()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(job_id.to_string());
                Ok(())
            }
        }
    }

    fn release(&self, professional_id: &str, job_id: &str) {
        self.commitments
            .remove_if(professional_id, |_, held| held == job_id);
    }
}

fn expect_transition(current: &Job, next_status: JobStatus) -> Result<Job, AppError> {
    if !current.status.can_transition_to(next_status) {
        return Err(AppError::InvalidTransition(format!(
            "job {} cannot move from {} to {}",
            current.id,
            current.status.as_str(),
            next_status.as_str()
        )));
    }
    let mut next = current.clone();
    next.status = next_status;
    Ok(next)
}

fn ensure_assignee(job: &Job, professional_id: &str) -> Result<(), AppError> {
    if job.assigned_professional.as_deref() == Some(professional_id) {
        Ok(())
    } else {
        Err(AppError::IneligibleProfessional(format!(
            "job {} is not assigned to {professional_id}",
            job.id
        )))
    }
}

pub fn check_eligibility(professional: &Professional, job: &Job) -> Result<(), AppError> {
    if !professional.offers(&job.service_type) {
        return Err(AppError::IneligibleProfessional(format!(
            "does not offer {}",
            job.service_type
        )));
    }

    let location = professional.location.as_ref().ok_or_else(|| {
        AppError::IneligibleProfessional("no known location".to_string())
    })?;
    let distance_km = haversine_km(&location.point(), &job.location);
    if distance_km > professional.service_radius_km {
        return Err(AppError::IneligibleProfessional(format!(
            "job is {distance_km:.1} km away, outside the {:.1} km service radius",
            professional.service_radius_km
        )));
    }

    if let Some(min_rating) = job.min_rating {
        if professional.rating < min_rating {
            return Err(AppError::IneligibleProfessional(format!(
                "rating {:.1} is below the required {min_rating:.1}",
                professional.rating
            )));
        }
    }

    if !professional.holds_all(&job.required_certifications) {
        return Err(AppError::IneligibleProfessional(
            "missing required certification".to_string(),
        ));
    }

    Ok(())
}
