//! Owned batch state with copy-on-write mutation semantics
//!
//! The controller never mutates a published snapshot: every mutation runs on
//! a private clone which is then swapped in as the new `Arc<BatchState>`.
//! Observers holding an older snapshot keep a consistent view.

use uuid::Uuid;

use crate::selection::SelectionTracker;
use crate::types::{BatchProgress, ImageBlob, ImageJob, JobStatus, Operation, Quality};

/// Maximum number of images accepted in one upload
pub const MAX_BATCH_SIZE: usize = 50;

/// The ordered collection of jobs created by one upload action, plus the
/// selection set and the batch generation tag
///
/// `generation` increases on every upload and reset; scheduler writes carry
/// the generation they were dispatched under and are dropped on mismatch, so
/// a discarded batch's in-flight completions can never resurface.
#[derive(Debug, Clone)]
pub struct BatchState {
    pub generation: u64,
    pub operation: Option<Operation>,
    pub quality: Quality,
    pub jobs: Vec<ImageJob>,
    pub selection: SelectionTracker,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl BatchState {
    /// Empty state before any upload
    pub fn empty() -> Self {
        let now = chrono::Utc::now();
        Self {
            generation: 0,
            operation: None,
            quality: Quality::default(),
            jobs: Vec::new(),
            selection: SelectionTracker::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a fresh batch of queued jobs, replacing whatever came before
    ///
    /// Jobs keep the upload order; every job gets a new unique id even for
    /// duplicate filenames.
    pub fn new_batch(
        generation: u64,
        operation: Operation,
        quality: Quality,
        uploads: Vec<(String, ImageBlob)>,
    ) -> Self {
        let now = chrono::Utc::now();
        let jobs = uploads
            .into_iter()
            .map(|(filename, source)| ImageJob::new(filename, source))
            .collect();
        Self {
            generation,
            operation: Some(operation),
            quality,
            jobs,
            selection: SelectionTracker::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Empty state carrying the next generation (reset)
    pub fn cleared(generation: u64) -> Self {
        Self {
            generation,
            ..Self::empty()
        }
    }

    pub fn job(&self, id: Uuid) -> Option<&ImageJob> {
        self.jobs.iter().find(|j| j.id == id)
    }

    fn job_mut(&mut self, id: Uuid) -> Option<&mut ImageJob> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now();
    }

    /// `queued -> processing`; refuses any other source state
    pub fn mark_processing(&mut self, id: Uuid) -> bool {
        let Some(job) = self.job_mut(id) else {
            return false;
        };
        if job.status != JobStatus::Queued {
            return false;
        }
        job.status = JobStatus::Processing;
        self.touch();
        true
    }

    /// `processing -> done`, storing the transformed output
    pub fn complete_job(&mut self, id: Uuid, output: ImageBlob) -> bool {
        let Some(job) = self.job_mut(id) else {
            return false;
        };
        if job.status != JobStatus::Processing {
            return false;
        }
        job.status = JobStatus::Done;
        job.output = Some(output);
        job.error = None;
        self.touch();
        true
    }

    /// `processing -> error`, storing the failure message
    pub fn fail_job(&mut self, id: Uuid, message: String) -> bool {
        let Some(job) = self.job_mut(id) else {
            return false;
        };
        if job.status != JobStatus::Processing {
            return false;
        }
        job.status = JobStatus::Error;
        job.output = None;
        job.error = Some(message);
        self.touch();
        true
    }

    /// Reset a terminal job back to `queued` for a retry run
    ///
    /// Clears output/error and drops the id from the selection, since the
    /// selection may only reference `done` jobs.
    pub fn requeue_job(&mut self, id: Uuid) -> bool {
        let Some(job) = self.job_mut(id) else {
            return false;
        };
        if !job.status.is_terminal() {
            return false;
        }
        job.status = JobStatus::Queued;
        job.output = None;
        job.error = None;
        if self.selection.contains(&id) {
            self.selection.toggle(id);
        }
        self.touch();
        true
    }

    /// Flip selection membership; no-op unless the job exists and is `done`
    pub fn toggle_selection(&mut self, id: Uuid) -> bool {
        let selectable = self.job(id).map(|j| j.is_done()).unwrap_or(false);
        if !selectable {
            return false;
        }
        self.selection.toggle(id);
        self.touch();
        true
    }

    /// Replace the selection with exactly the ids of all `done` jobs
    pub fn select_all_done(&mut self) {
        let done_ids: Vec<Uuid> = self
            .jobs
            .iter()
            .filter(|j| j.is_done())
            .map(|j| j.id)
            .collect();
        self.selection.replace_with(done_ids);
        self.touch();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.touch();
    }

    /// Aggregate progress: terminal jobs out of the total
    pub fn progress(&self) -> BatchProgress {
        let completed = self.jobs.iter().filter(|j| j.status.is_terminal()).count();
        BatchProgress {
            completed,
            total: self.jobs.len(),
        }
    }

    /// Selected jobs that actually carry an output, in batch order
    pub fn selected_outputs(&self) -> Vec<&ImageJob> {
        self.jobs
            .iter()
            .filter(|j| self.selection.contains(&j.id) && j.output.is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_blob() -> ImageBlob {
        ImageBlob::new(vec![1u8, 2, 3], "image/png")
    }

    fn three_job_batch() -> BatchState {
        BatchState::new_batch(
            1,
            Operation::BackgroundRemoval,
            Quality::Medium,
            vec![
                ("a.png".to_string(), png_blob()),
                ("b.png".to_string(), png_blob()),
                ("c.png".to_string(), png_blob()),
            ],
        )
    }

    #[test]
    fn test_new_batch_queues_everything_in_order() {
        let state = three_job_batch();
        assert_eq!(state.jobs.len(), 3);
        assert_eq!(state.jobs[0].filename, "a.png");
        assert_eq!(state.jobs[2].filename, "c.png");
        assert!(state.jobs.iter().all(|j| j.status == JobStatus::Queued));
        assert!(state.selection.is_empty());
        assert_eq!(state.progress(), BatchProgress { completed: 0, total: 3 });
    }

    #[test]
    fn test_output_present_iff_done() {
        let mut state = three_job_batch();
        let id = state.jobs[0].id;

        assert!(state.mark_processing(id));
        assert!(state.job(id).unwrap().output.is_none());

        assert!(state.complete_job(id, png_blob()));
        let job = state.job(id).unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.output.is_some());
        assert!(job.error.is_none());

        // terminal: no second completion, no failure after done
        assert!(!state.complete_job(id, png_blob()));
        assert!(!state.fail_job(id, "late".to_string()));
    }

    #[test]
    fn test_failure_sets_error_and_clears_output() {
        let mut state = three_job_batch();
        let id = state.jobs[1].id;

        assert!(state.mark_processing(id));
        assert!(state.fail_job(id, "overloaded".to_string()));

        let job = state.job(id).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.output.is_none());
        assert_eq!(job.error.as_deref(), Some("overloaded"));
    }

    #[test]
    fn test_no_transition_skips_processing() {
        let mut state = three_job_batch();
        let id = state.jobs[0].id;

        // completing or failing a queued job is refused
        assert!(!state.complete_job(id, png_blob()));
        assert!(!state.fail_job(id, "nope".to_string()));
        assert_eq!(state.job(id).unwrap().status, JobStatus::Queued);
    }

    #[test]
    fn test_toggle_selection_gated_to_done() {
        let mut state = three_job_batch();
        let queued = state.jobs[0].id;
        let done = state.jobs[1].id;
        state.mark_processing(done);
        state.complete_job(done, png_blob());

        assert!(!state.toggle_selection(queued));
        assert!(!state.toggle_selection(Uuid::new_v4()));
        assert!(state.selection.is_empty());

        assert!(state.toggle_selection(done));
        assert!(state.selection.contains(&done));
    }

    #[test]
    fn test_select_all_done_then_clear() {
        let mut state = three_job_batch();
        for job_id in [state.jobs[0].id, state.jobs[2].id] {
            state.mark_processing(job_id);
            state.complete_job(job_id, png_blob());
        }
        let failed = state.jobs[1].id;
        state.mark_processing(failed);
        state.fail_job(failed, "overloaded".to_string());

        state.select_all_done();
        assert_eq!(state.selection.len(), 2);
        assert!(!state.selection.contains(&failed));

        state.clear_selection();
        assert!(state.selection.is_empty());
    }

    #[test]
    fn test_requeue_clears_output_and_selection() {
        let mut state = three_job_batch();
        let id = state.jobs[0].id;
        state.mark_processing(id);
        state.complete_job(id, png_blob());
        state.toggle_selection(id);

        assert!(state.requeue_job(id));
        let job = state.job(id).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.output.is_none());
        assert!(job.error.is_none());
        assert!(!state.selection.contains(&id));

        // only terminal jobs can be requeued
        assert!(!state.requeue_job(id));
    }

    #[test]
    fn test_selected_outputs_keep_batch_order() {
        let mut state = three_job_batch();
        let ids: Vec<Uuid> = state.jobs.iter().map(|j| j.id).collect();
        for id in &ids {
            state.mark_processing(*id);
            state.complete_job(*id, png_blob());
        }
        // select in reverse order; export order must follow the batch
        state.toggle_selection(ids[2]);
        state.toggle_selection(ids[0]);

        let selected: Vec<Uuid> = state.selected_outputs().iter().map(|j| j.id).collect();
        assert_eq!(selected, vec![ids[0], ids[2]]);
    }
}
