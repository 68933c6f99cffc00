use std::sync::Arc;

use apalis::cron::CronStream;
use apalis::prelude::*;
use apalis::utils::TokioExecutor;

use crate::{modules, types};

pub async fn monitor(ctx: Arc<types::Context>) -> apalis::prelude::Monitor<TokioExecutor> {
    let all_jobs = modules::order::job::list(ctx);

    let mut monitor = apalis::prelude::Monitor::<TokioExecutor>::new();

    for job in all_jobs {
        tracing::debug!("Scheduling {}", job.name);

        let job_clone = job.clone();
        let worker = WorkerBuilder::new(job.name)
            .stream(CronStream::new(job.schedule.clone()).into_stream())
            .build_fn(move |_tick: types::Tick| {
                let job_clone = job_clone.clone();
                async move { job_clone.run().await }
            });
        monitor = monitor.register_with_count(1, worker);
    }

    monitor
}
