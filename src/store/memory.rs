use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::AppError;
use crate::models::job::Job;
use crate::models::professional::{Location, Professional};
use crate::store::{JobStore, ProfessionalStore};

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: DashMap<String, Job>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl JobStore for MemoryJobStore {
    fn fetch_job(&self, job_id: &str) -> Option<Job> {
        self.jobs.get(job_id).map(|entry| entry.value().clone())
    }

    fn fetch_candidate_jobs(&self) -> Vec<Job> {
        self.jobs
            .iter()
            .filter(|entry| entry.value().status.is_open())
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn list_jobs(&self) -> Vec<Job> {
        self.jobs.iter().map(|entry| entry.value().clone()).collect()
    }

    fn insert_job(&self, job: Job) -> Result<(), AppError> {
        match self.jobs.entry(job.id.clone()) {
            Entry::Occupied(_) => Err(AppError::BadRequest(format!(
                "job {} already exists",
                job.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(job);
                Ok(())
            }
        }
    }

    fn compare_and_swap(&self, expected_version: u64, next: Job) -> bool {
        // The shard write guard makes check and write one step for this key.
        match self.jobs.get_mut(&next.id) {
            Some(mut current) if current.version == expected_version => {
                *current = next;
                true
            }
            _ => false,
        }
    }
}

#[derive(Default)]
pub struct MemoryProfessionalStore {
    professionals: DashMap<String, Professional>,
}

impl MemoryProfessionalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.professionals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.professionals.is_empty()
    }
}

impl ProfessionalStore for MemoryProfessionalStore {
    fn fetch_professional(&self, professional_id: &str) -> Option<Professional> {
        self.professionals
            .get(professional_id)
            .map(|entry| entry.value().clone())
    }

    fn list_professionals(&self) -> Vec<Professional> {
        self.professionals
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn upsert_professional(&self, professional: Professional) {
        self.professionals
            .insert(professional.id.clone(), professional);
    }

    fn update_location(&self, professional_id: &str, location: Location) -> Result<(), AppError> {
        let mut professional = self
            .professionals
            .get_mut(professional_id)
            .ok_or_else(|| AppError::NotFound(format!("professional {professional_id} not found")))?;

        professional.updated_at = location.recorded_at;
        professional.location = Some(location);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::job::{JobStatus, TimeWindow};
    use crate::models::professional::GeoPoint;

    fn job(id: &str) -> Job {
        let now = Utc::now();
        Job {
            id: id.to_string(),
            service_type: "cleaning".to_string(),
            location: GeoPoint::new(-33.8915, 151.2767),
            address: None,
            window: TimeWindow {
                start: now,
                end: now + Duration::hours(2),
            },
            amount: 85.0,
            urgent: false,
            customer_rating: 4.8,
            requirements: vec![],
            required_certifications: vec![],
            min_rating: None,
            status: JobStatus::Available,
            assigned_professional: None,
            offered_to: None,
            offer_expires_at: None,
            arrived_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn compare_and_swap_rejects_stale_version() {
        let store = MemoryJobStore::new();
        store.insert_job(job("job_001")).unwrap();

        let mut next = job("job_001");
        next.status = JobStatus::Accepted;
        next.version = 1;

        assert!(store.compare_and_swap(0, next.clone()));
        assert!(!store.compare_and_swap(0, next));
        assert_eq!(store.fetch_job("job_001").unwrap().status, JobStatus::Accepted);
    }

    #[test]
    fn duplicate_job_insert_fails() {
        let store = MemoryJobStore::new();
        store.insert_job(job("job_001")).unwrap();
        assert!(store.insert_job(job("job_001")).is_err());
    }

    #[test]
    fn candidate_jobs_exclude_assigned() {
        let store = MemoryJobStore::new();
        store.insert_job(job("open")).unwrap();
        let mut taken = job("taken");
        taken.status = JobStatus::Accepted;
        store.insert_job(taken).unwrap();

        let candidates = store.fetch_candidate_jobs();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "open");
    }
}
