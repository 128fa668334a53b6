#![warn(
    clippy::unwrap_used,
    clippy::cast_lossless,
    clippy::unimplemented,
    clippy::indexing_slicing,
    clippy::expect_used
)]
//! Runs futures on bevy's async compute pool and hands their outcomes back to
//! systems on the main schedule.
//!
//! A [`Job`] is spawned through [`JobSpawner`]; while it runs an
//! [`InProgressJob`] entity tracks it. Once the future resolves, its outcome is
//! parked in [`FinishedJobs`] until a system claims it with
//! [`FinishedJobs::take_next`].
use bevy::prelude::*;
use std::{any, future, pin};

pub struct JobsPlugin;

impl Plugin for JobsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FinishedJobs>()
            .add_systems(PreUpdate, poll_in_progress_jobs);
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub type AsyncReturn<Output> = pin::Pin<Box<dyn future::Future<Output = Output> + Send + 'static>>;
#[cfg(target_arch = "wasm32")]
pub type AsyncReturn<Output> = pin::Pin<Box<dyn future::Future<Output = Output> + 'static>>;

pub trait Job: any::Any + Sized + Send + Sync + 'static {
    type Outcome: any::Any + Send + Sync;

    fn name(&self) -> String;

    fn perform(self, context: Context) -> AsyncReturn<Self::Outcome>;

    fn spawn(self, commands: &mut Commands) {
        let (outcome_tx, outcome_rx) = async_channel::bounded::<JobOutcomePayload>(1);
        let (progress_tx, progress_rx) = async_channel::unbounded::<Progress>();

        let job_name = self.name();
        let in_progress_job = InProgressJob {
            name: job_name.clone(),
            progress: 0,
            progress_rx,
            outcome_rx,
        };

        bevy::tasks::AsyncComputeTaskPool::get()
            .spawn(async move {
                let started = instant::Instant::now();
                bevy::log::debug!("Starting job '{}'", job_name);
                let outcome = self.perform(Context { progress_tx }).await;
                bevy::log::debug!("Finished job '{}' in {:?}", job_name, started.elapsed());
                let payload = JobOutcomePayload {
                    job_type_id: any::TypeId::of::<Self>(),
                    outcome: Box::new(outcome),
                };
                if let Err(e) = outcome_tx.send(payload).await {
                    bevy::log::error!(
                        "Failed to send result of job '{}' back to the main thread: {:?}",
                        job_name,
                        e
                    );
                }
            })
            .detach();

        commands.spawn(in_progress_job);
    }
}

fn poll_in_progress_jobs(
    mut query: Query<(Entity, &mut InProgressJob)>,
    mut commands: Commands,
    mut finished_jobs: ResMut<FinishedJobs>,
) {
    for (entity, mut job) in &mut query {
        while let Ok(progress) = job.progress_rx.try_recv() {
            job.progress = progress;
        }
        match job.outcome_rx.try_recv() {
            Ok(outcome) => {
                commands.entity(entity).despawn();
                finished_jobs.outcomes.push(outcome);
            }
            Err(async_channel::TryRecvError::Closed) => {
                bevy::log::error!("Job '{}' ended without reporting an outcome", job.name);
                commands.entity(entity).despawn();
            }
            Err(async_channel::TryRecvError::Empty) => {}
        }
    }
}

pub struct Context {
    progress_tx: async_channel::Sender<Progress>,
}

impl Context {
    pub fn send_progress(&self, progress: Progress) -> async_channel::Send<'_, Progress> {
        self.progress_tx.send(progress.min(100))
    }
}

struct JobOutcomePayload {
    job_type_id: any::TypeId,
    outcome: Box<dyn any::Any + Send + Sync>,
}

#[derive(bevy::ecs::system::SystemParam)]
pub struct JobSpawner<'w, 's> {
    commands: Commands<'w, 's>,
}

impl<'w, 's> JobSpawner<'w, 's> {
    pub fn spawn<J: Job>(&mut self, job: J) {
        job.spawn(&mut self.commands)
    }
}

/// Percentage in `0..=100`.
pub type Progress = u8;

#[derive(Component)]
pub struct InProgressJob {
    pub name: String,
    pub progress: Progress,
    progress_rx: async_channel::Receiver<Progress>,
    outcome_rx: async_channel::Receiver<JobOutcomePayload>,
}

#[derive(Resource, Default)]
pub struct FinishedJobs {
    outcomes: Vec<JobOutcomePayload>,
}

impl FinishedJobs {
    /// Removes and returns the oldest unclaimed outcome of job type `J`.
    pub fn take_next<J: Job>(&mut self) -> Option<J::Outcome> {
        let index = self.outcomes.iter().position(|payload| {
            payload.job_type_id == any::TypeId::of::<J>() && payload.outcome.is::<J::Outcome>()
        })?;
        let payload = self.outcomes.remove(index);
        match payload.outcome.downcast::<J::Outcome>() {
            Ok(outcome) => Some(*outcome),
            Err(_) => {
                bevy::log::error!("encountered unexpected job outcome type");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
