// Ordered pipeline demo
//
// Spawns jobs with staggered latencies on a LocalSet and prints their results
// in submission order. Run with RUST_LOG=trace to watch admissions and
// deliveries.

use anyhow::{Result, anyhow};
use futures::StreamExt;
use kodegen_pipeline::{AsyncTask, PipelineBuilder, ordered_with};
use log::info;
use std::time::Duration;
use tokio::task::LocalSet;

const JOBS: u64 = 25;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    LocalSet::new().run_until(run()).await
}

async fn run() -> Result<()> {
    let (pipeline, mut results) = ordered_with(PipelineBuilder::new().name("demo"));
    let mut received = 0;

    for job in 0..JOBS {
        // Backpressure: the pipeline only frees a slot by delivering its head.
        while pipeline.is_full() {
            let line = results
                .next()
                .await
                .ok_or_else(|| anyhow!("result stream closed early"))?;
            println!("{line}");
            received += 1;
        }
        pipeline.admit(AsyncTask::spawn_local(work(job)))?;
        info!("Admitted job {job}, {} outstanding", pipeline.len());
    }

    while received < JOBS {
        let line = results
            .next()
            .await
            .ok_or_else(|| anyhow!("result stream closed early"))?;
        println!("{line}");
        received += 1;
    }

    info!("Delivered {received} jobs in order");
    Ok(())
}

async fn work(job: u64) -> String {
    let latency = (job * 7 % 5 + 1) * 20;
    tokio::time::sleep(Duration::from_millis(latency)).await;
    format!("job {job:>2} finished after {latency}ms")
}
