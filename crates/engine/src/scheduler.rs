// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job scheduler
//!
//! One mutex guards all scheduler state; one condition variable wakes
//! workers. Every collection holds [`JobId`] handles and resolves them
//! through the owning `jobs` table under the lock, so there is exactly one
//! mutable home for each record. Workers drop the lock around the child
//! process wait, which is the only long suspension point.

use crate::cores::CoreTable;
use crate::deps::DependencyIndex;
use crate::error::SchedulerError;
use crate::events::{EventSink, JobEvent};
use crate::lifecycle;
use crate::ready::ReadySet;
use crate::stats::{self, StatsCounters, SystemStats};
use chrono::{DateTime, Utc};
use jsh_core::{
    simulate_metrics, Clock, JobId, JobPriority, JobRecord, JobStatus, JobType, ResourceLimits,
    SchedulingPolicy, SystemClock,
};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// Completed-jobs FIFO capacity; the oldest entries are evicted beyond this
const COMPLETED_JOBS_CAP: usize = 1000;

/// Everything guarded by the scheduler mutex
struct State {
    /// Owning table, source of truth for lookup by id
    jobs: HashMap<JobId, JobRecord>,
    ready: ReadySet,
    waiting: HashSet<JobId>,
    running_set: HashSet<JobId>,
    completed: VecDeque<JobId>,
    cores: CoreTable,
    deps: DependencyIndex,
    policy: SchedulingPolicy,
    counters: StatsCounters,
    /// Cumulative runtime per array group, for FAIR_SHARE
    cpu_ms_by_group: HashMap<JobId, i64>,
}

struct Shared<C: Clock> {
    state: Mutex<State>,
    work_ready: Condvar,
    running: AtomicBool,
    next_job_id: AtomicU64,
    max_concurrent_jobs: AtomicUsize,
    cpu_affinity_enabled: AtomicBool,
    num_cores: usize,
    sink: Arc<dyn EventSink>,
    clock: C,
    started_at: DateTime<Utc>,
}

impl<C: Clock> Shared<C> {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A job ready to be entered into the scheduler
struct NewJob {
    command: String,
    name: Option<String>,
    priority: JobPriority,
    job_type: JobType,
    limits: ResourceLimits,
    dependencies: HashSet<JobId>,
    array: Option<(JobId, u32)>,
}

impl NewJob {
    fn new(command: String, priority: JobPriority) -> Self {
        Self {
            command,
            name: None,
            priority,
            job_type: JobType::Interactive,
            limits: ResourceLimits::default(),
            dependencies: HashSet::new(),
            array: None,
        }
    }
}

/// Multi-threaded job scheduler for a single host
pub struct JobScheduler<C: Clock + 'static = SystemClock> {
    shared: Arc<Shared<C>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobScheduler<SystemClock> {
    /// Create a scheduler with an explicit core count
    pub fn new(num_cores: usize, sink: Arc<dyn EventSink>) -> Self {
        Self::with_clock(num_cores, sink, SystemClock)
    }

    /// Create a scheduler sized to the detected logical CPU count
    pub fn with_detected_cores(sink: Arc<dyn EventSink>) -> Self {
        let cores = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(cores, sink)
    }
}

impl<C: Clock + 'static> JobScheduler<C> {
    /// Create a scheduler with an injected clock (tests)
    pub fn with_clock(num_cores: usize, sink: Arc<dyn EventSink>, clock: C) -> Self {
        let num_cores = num_cores.max(1);
        let started_at = clock.now();
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    jobs: HashMap::new(),
                    ready: ReadySet::new(),
                    waiting: HashSet::new(),
                    running_set: HashSet::new(),
                    completed: VecDeque::new(),
                    cores: CoreTable::new(num_cores),
                    deps: DependencyIndex::new(),
                    policy: SchedulingPolicy::default(),
                    counters: StatsCounters::default(),
                    cpu_ms_by_group: HashMap::new(),
                }),
                work_ready: Condvar::new(),
                running: AtomicBool::new(false),
                next_job_id: AtomicU64::new(1),
                max_concurrent_jobs: AtomicUsize::new(num_cores * 2),
                cpu_affinity_enabled: AtomicBool::new(false),
                num_cores,
                sink,
                clock,
                started_at,
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Number of logical cores, fixed at construction
    pub fn num_cores(&self) -> usize {
        self.shared.num_cores
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Spawn the worker pool, one thread per core. Idempotent.
    pub fn start(&self) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        for worker in 0..self.shared.num_cores {
            let shared = Arc::clone(&self.shared);
            workers.push(thread::spawn(move || Self::worker_loop(shared, worker)));
        }
        tracing::info!(workers = self.shared.num_cores, "scheduler started");
    }

    /// Stop dispatch, join workers, then best-effort terminate any child
    /// still tracked as active and clear the active set.
    pub fn stop(&self) {
        {
            let state = self.shared.lock_state();
            self.shared.running.store(false, Ordering::SeqCst);
            // A stopped child never exits, and its worker would block the
            // join below; let suspended jobs run out
            for id in state.running_set.iter() {
                if let Some(job) = state.jobs.get(id) {
                    if job.status == JobStatus::Suspended {
                        signal_child(job.process_id, Signal::SIGCONT);
                    }
                }
            }
        }
        self.shared.work_ready.notify_all();

        let handles: Vec<_> = {
            let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
            workers.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.join();
        }

        let mut state = self.shared.lock_state();
        let leftover: Vec<JobId> = state.running_set.iter().copied().collect();
        for id in leftover {
            if let Some(job) = state.jobs.get(&id) {
                signal_child(job.process_id, Signal::SIGTERM);
            }
        }
        state.running_set.clear();
        drop(state);
        tracing::info!("scheduler stopped");
    }

    // ------------------------------------------------------------------
    // Submission

    /// Submit a shell command; always succeeds with a fresh id
    pub fn submit(&self, command: impl Into<String>, priority: JobPriority) -> JobRecord {
        let job = {
            let mut state = self.shared.lock_state();
            self.enqueue(&mut state, NewJob::new(command.into(), priority))
        };
        self.shared.work_ready.notify_one();
        job
    }

    /// Submit a command gated on other jobs reaching COMPLETED
    pub fn submit_with_deps(
        &self,
        command: impl Into<String>,
        dependencies: &[JobId],
        priority: JobPriority,
    ) -> JobRecord {
        let mut spec = NewJob::new(command.into(), priority);
        spec.dependencies = dependencies.iter().copied().collect();
        let job = {
            let mut state = self.shared.lock_state();
            self.enqueue(&mut state, spec)
        };
        self.shared.work_ready.notify_one();
        job
    }

    /// Parse a job script and submit it as a BATCH job
    pub fn submit_script(&self, path: &Path) -> Result<JobRecord, SchedulerError> {
        let script = jsh_core::load_script(path)?;
        let mut spec = NewJob::new(script.command, script.priority);
        spec.name = script.name;
        spec.limits = script.limits;
        spec.job_type = JobType::Batch;
        spec.dependencies = script.dependencies.into_iter().collect();
        let job = {
            let mut state = self.shared.lock_state();
            self.enqueue(&mut state, spec)
        };
        self.shared.work_ready.notify_one();
        Ok(job)
    }

    /// Expand a template into `size` tasks sharing one array identity.
    ///
    /// The literal `$ARRAY_ID` is substituted with the task index; the
    /// shared `array_job_id` is the id of the first task.
    pub fn submit_array(
        &self,
        template: &str,
        size: u32,
        priority: JobPriority,
    ) -> Vec<JobRecord> {
        let jobs = {
            let mut state = self.shared.lock_state();
            let array_id = JobId(self.shared.next_job_id.load(Ordering::SeqCst));
            (0..size)
                .map(|task| {
                    let command = template.replacen("$ARRAY_ID", &task.to_string(), 1);
                    let mut spec = NewJob::new(command, priority);
                    spec.job_type = JobType::ArrayJob;
                    spec.array = Some((array_id, task));
                    self.enqueue(&mut state, spec)
                })
                .collect()
        };
        self.shared.work_ready.notify_all();
        jobs
    }

    fn enqueue(&self, state: &mut State, spec: NewJob) -> JobRecord {
        let id = JobId(self.shared.next_job_id.fetch_add(1, Ordering::SeqCst));
        let now = self.shared.clock.now();

        let mut job = JobRecord::new(id, spec.command, spec.priority, now);
        job.name = spec.name;
        job.job_type = spec.job_type;
        job.limits = spec.limits;
        job.dependencies = spec.dependencies;
        if let Some((array_id, task)) = spec.array {
            job.array_job_id = Some(array_id);
            job.array_task_id = Some(task);
        }

        state.deps.register(id, &job.dependencies);
        for dep in &job.dependencies {
            if let Some(dep_job) = state.jobs.get_mut(dep) {
                dep_job.dependents.insert(id);
            }
        }

        if job.dependencies_satisfied(&state.jobs) {
            job.status = JobStatus::Pending;
            state.ready.push(id);
        } else {
            job.status = JobStatus::WaitingDeps;
            state.waiting.insert(id);
        }

        state.counters.submitted += 1;
        self.shared.sink.record(&job, JobEvent::Submitted);
        tracing::info!(
            job_id = %id,
            priority = %job.priority,
            status = %job.status,
            command = %job.command,
            "job submitted"
        );

        state.jobs.insert(id, job.clone());
        job
    }

    // ------------------------------------------------------------------
    // Job control

    /// Kill a RUNNING job: flips it to KILLED, records the event, and
    /// best-effort SIGTERMs the child. False for any other pre-state.
    pub fn kill(&self, id: JobId) -> bool {
        let mut state = self.shared.lock_state();
        let Some(job) = state.jobs.get_mut(&id) else {
            return false;
        };
        if job.status != JobStatus::Running {
            return false;
        }
        job.status = JobStatus::Killed;
        let pid = job.process_id;
        self.shared.sink.record(job, JobEvent::Killed);
        state.counters.killed += 1;
        signal_child(pid, Signal::SIGTERM);
        tracing::info!(job_id = %id, pid = ?pid, "job killed");
        true
    }

    /// Suspend a RUNNING job via SIGSTOP
    pub fn suspend(&self, id: JobId) -> bool {
        let mut state = self.shared.lock_state();
        let Some(job) = state.jobs.get_mut(&id) else {
            return false;
        };
        if job.status != JobStatus::Running {
            return false;
        }
        job.status = JobStatus::Suspended;
        let pid = job.process_id;
        signal_child(pid, Signal::SIGSTOP);
        tracing::info!(job_id = %id, pid = ?pid, "job suspended");
        true
    }

    /// Resume a SUSPENDED job via SIGCONT
    pub fn resume(&self, id: JobId) -> bool {
        let mut state = self.shared.lock_state();
        let Some(job) = state.jobs.get_mut(&id) else {
            return false;
        };
        if job.status != JobStatus::Suspended {
            return false;
        }
        job.status = JobStatus::Running;
        let pid = job.process_id;
        signal_child(pid, Signal::SIGCONT);
        tracing::info!(job_id = %id, pid = ?pid, "job resumed");
        true
    }

    /// Re-prioritize a job still PENDING in the queue
    pub fn change_priority(&self, id: JobId, priority: JobPriority) -> bool {
        let mut state = self.shared.lock_state();
        let Some(job) = state.jobs.get_mut(&id) else {
            return false;
        };
        if job.status != JobStatus::Pending {
            return false;
        }
        job.priority = priority;
        tracing::info!(job_id = %id, priority = %priority, "job priority changed");
        true
    }

    // ------------------------------------------------------------------
    // Queries (all return point-in-time snapshots by value)

    pub fn get_job(&self, id: JobId) -> Option<JobRecord> {
        self.shared.lock_state().jobs.get(&id).cloned()
    }

    pub fn get_jobs(&self) -> Vec<JobRecord> {
        let state = self.shared.lock_state();
        let mut jobs: Vec<JobRecord> = state.jobs.values().cloned().collect();
        jobs.sort_by_key(|j| j.id);
        jobs
    }

    pub fn get_active_jobs(&self) -> Vec<JobRecord> {
        let state = self.shared.lock_state();
        let mut jobs: Vec<JobRecord> = state
            .running_set
            .iter()
            .filter_map(|id| state.jobs.get(id))
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.id);
        jobs
    }

    pub fn get_completed_jobs(&self) -> Vec<JobRecord> {
        let state = self.shared.lock_state();
        state
            .completed
            .iter()
            .filter_map(|id| state.jobs.get(id))
            .cloned()
            .collect()
    }

    pub fn get_system_stats(&self) -> SystemStats {
        let state = self.shared.lock_state();
        let now = self.shared.clock.now();
        let completed: Vec<&JobRecord> = state
            .completed
            .iter()
            .filter_map(|id| state.jobs.get(id))
            .collect();
        let active: Vec<&JobRecord> = state
            .running_set
            .iter()
            .filter_map(|id| state.jobs.get(id))
            .collect();
        stats::snapshot(
            &state.counters,
            completed.into_iter(),
            active.into_iter(),
            self.shared.started_at,
            now,
        )
    }

    /// Simulated per-core utilization: 0 for a free core, else the
    /// assigned job's synthetic CPU figure captured at its start
    pub fn get_core_utilization(&self) -> Vec<u32> {
        let state = self.shared.lock_state();
        (0..state.cores.len())
            .map(|core| {
                state
                    .cores
                    .owner(core)
                    .and_then(|id| state.jobs.get(&id))
                    .map(|job| job.cpu_utilization as u32)
                    .unwrap_or(0)
            })
            .collect()
    }

    pub fn get_queue_length(&self) -> usize {
        self.shared.lock_state().ready.len()
    }

    // ------------------------------------------------------------------
    // Configuration

    pub fn scheduling_policy(&self) -> SchedulingPolicy {
        self.shared.lock_state().policy
    }

    /// Takes effect for future dispatch decisions only
    pub fn set_scheduling_policy(&self, policy: SchedulingPolicy) {
        self.shared.lock_state().policy = policy;
        tracing::info!(policy = %policy, "scheduling policy changed");
    }

    pub fn max_concurrent_jobs(&self) -> usize {
        self.shared.max_concurrent_jobs.load(Ordering::SeqCst)
    }

    pub fn set_max_concurrent_jobs(&self, max_jobs: usize) {
        self.shared
            .max_concurrent_jobs
            .store(max_jobs.max(1), Ordering::SeqCst);
        // Raising the cap may unblock waiting workers
        self.shared.work_ready.notify_all();
    }

    pub fn cpu_affinity_enabled(&self) -> bool {
        self.shared.cpu_affinity_enabled.load(Ordering::SeqCst)
    }

    /// Recorded but not enforced at the OS level
    pub fn enable_cpu_affinity(&self, enabled: bool) {
        self.shared
            .cpu_affinity_enabled
            .store(enabled, Ordering::SeqCst);
        tracing::debug!(enabled, "cpu affinity flag updated");
    }

    // ------------------------------------------------------------------
    // Worker pool

    fn worker_loop(shared: Arc<Shared<C>>, worker: usize) {
        tracing::debug!(worker, "worker started");
        while let Some(id) = Self::claim_next(&shared) {
            Self::execute(&shared, id, worker);
            Self::finalize(&shared, id);
        }
        tracing::debug!(worker, "worker exiting");
    }

    /// Block until shutdown or a dispatchable job, then claim it
    fn claim_next(shared: &Shared<C>) -> Option<JobId> {
        let mut state = shared.lock_state();
        loop {
            if !shared.running.load(Ordering::SeqCst) {
                return None;
            }
            let cap = shared.max_concurrent_jobs.load(Ordering::SeqCst);
            if !state.ready.is_empty() && state.running_set.len() < cap {
                let now = shared.clock.now();
                if let Some(id) =
                    state
                        .ready
                        .select(state.policy, &state.jobs, &state.cpu_ms_by_group, now)
                {
                    state.ready.remove(id);
                    state.running_set.insert(id);
                    return Some(id);
                }
            }
            state = shared
                .work_ready
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Lifecycle driver: mark running, spawn the child, reap it, and
    /// settle the terminal state. The lock is dropped across the wait.
    fn execute(shared: &Shared<C>, id: JobId, worker: usize) {
        let command = {
            let mut state = shared.lock_state();
            let now = shared.clock.now();

            let Some(job) = state.jobs.get(&id) else {
                return;
            };
            let command = job.command.clone();
            let limits = job.limits.clone();

            let want = limits.max_cpu_cores as usize;
            let assigned = if want > 1 {
                // Fall back to a single core when the full set is not free
                state
                    .cores
                    .allocate_n(id, want, now)
                    .or_else(|| state.cores.allocate(id, now).map(|c| vec![c]))
            } else {
                state.cores.allocate(id, now).map(|c| vec![c])
            };

            let metrics = simulate_metrics(&command, &limits);
            let Some(job) = state.jobs.get_mut(&id) else {
                return;
            };
            job.status = JobStatus::Running;
            job.worker_id = Some(worker);
            job.start_time = Some(now);
            job.cpu_utilization = metrics.cpu_utilization;
            job.memory_usage_mb = metrics.memory_usage_mb;
            job.context_switches = metrics.context_switches;
            job.assigned_cores = assigned.unwrap_or_default();
            job.assigned_core = job.assigned_cores.first().copied();

            shared.sink.record(job, JobEvent::Started);
            tracing::info!(
                job_id = %id,
                worker,
                core = ?job.assigned_core,
                "job started"
            );
            command
        };

        match lifecycle::spawn_shell(&command) {
            Ok(mut child) => {
                {
                    let mut state = shared.lock_state();
                    if let Some(job) = state.jobs.get_mut(&id) {
                        job.process_id = Some(child.id() as i32);
                    }
                }

                let outcome = lifecycle::wait_child(&mut child);

                let mut state = shared.lock_state();
                let now = shared.clock.now();
                let Some(job) = state.jobs.get_mut(&id) else {
                    return;
                };
                job.end_time = Some(now);
                job.actual_runtime_ms = job
                    .start_time
                    .map(|start| (now - start).num_milliseconds())
                    .unwrap_or(0);

                if job.status == JobStatus::Killed {
                    // A kill already settled the terminal state and event;
                    // keep it, but note how the child actually died.
                    if let Ok(outcome) = outcome {
                        job.exit_code = Some(outcome.exit_code);
                    }
                } else {
                    match outcome {
                        Ok(outcome) => {
                            job.exit_code = Some(outcome.exit_code);
                            job.status = if outcome.succeeded() {
                                JobStatus::Completed
                            } else {
                                JobStatus::Failed
                            };
                        }
                        Err(e) => {
                            job.exit_code = Some(-1);
                            job.status = JobStatus::Failed;
                            tracing::error!(job_id = %id, error = %e, "failed to reap job child");
                        }
                    }
                    let event = if job.status == JobStatus::Completed {
                        JobEvent::Completed
                    } else {
                        JobEvent::Failed
                    };
                    shared.sink.record(job, event);
                }
                tracing::info!(
                    job_id = %id,
                    status = %job.status,
                    exit_code = ?job.exit_code,
                    runtime_ms = job.actual_runtime_ms,
                    "job finished"
                );
            }
            Err(e) => {
                // Spawn failure: the job fails without ever having a child
                let mut state = shared.lock_state();
                let now = shared.clock.now();
                if let Some(job) = state.jobs.get_mut(&id) {
                    job.status = JobStatus::Failed;
                    job.exit_code = Some(-1);
                    job.end_time = Some(now);
                    job.actual_runtime_ms = job
                        .start_time
                        .map(|start| (now - start).num_milliseconds())
                        .unwrap_or(0);
                    shared.sink.record(job, JobEvent::Failed);
                }
                tracing::error!(job_id = %id, error = %e, "failed to spawn job child");
            }
        }
    }

    /// Post-run bookkeeping: leave the running set, settle counters,
    /// release cores, promote dependents, wake workers.
    fn finalize(shared: &Shared<C>, id: JobId) {
        let mut state = shared.lock_state();
        state.running_set.remove(&id);

        if let Some(job) = state.jobs.get(&id) {
            if job.status.is_terminal() {
                let status = job.status;
                let cores = job.assigned_cores.clone();
                let runtime = job.actual_runtime_ms;
                let group = job.array_job_id.unwrap_or(id);

                state.cores.release_all(&cores);
                match status {
                    JobStatus::Completed => state.counters.completed += 1,
                    JobStatus::Failed => state.counters.failed += 1,
                    // Killed was counted when the kill was issued
                    _ => {}
                }
                state.completed.push_back(id);
                while state.completed.len() > COMPLETED_JOBS_CAP {
                    state.completed.pop_front();
                }
                *state.cpu_ms_by_group.entry(group).or_insert(0) += runtime.max(0);

                if status == JobStatus::Completed {
                    promote_dependents(&mut state, id);
                }
            }
        }

        drop(state);
        shared.work_ready.notify_all();
    }
}

/// Move every waiter whose dependencies are now all COMPLETED into the
/// ready set. One completion is necessary but not sufficient, so each
/// candidate is re-checked against the full table.
fn promote_dependents(state: &mut State, completed: JobId) {
    for candidate in state.deps.dependents_of(completed) {
        if !state.waiting.contains(&candidate) {
            continue;
        }
        let satisfied = state
            .jobs
            .get(&candidate)
            .map(|job| job.dependencies_satisfied(&state.jobs))
            .unwrap_or(false);
        if satisfied {
            state.waiting.remove(&candidate);
            if let Some(job) = state.jobs.get_mut(&candidate) {
                job.status = JobStatus::Pending;
            }
            state.ready.push(candidate);
            tracing::debug!(job_id = %candidate, "dependencies satisfied, job promoted");
        }
    }
}

/// Best-effort signal delivery to a recorded child pid
fn signal_child(pid: Option<i32>, sig: Signal) {
    if let Some(pid) = pid {
        if pid > 0 {
            let _ = signal::kill(Pid::from_raw(pid), sig);
        }
    }
}

impl<C: Clock + 'static> Drop for JobScheduler<C> {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
