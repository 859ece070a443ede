//! Given steps for crash recovery BDD scenarios.

use super::world::{RecoveryWorld, run_async};
use atelier::ledger::domain::{PendingRequest, RequestStatus};
use atelier::provider::domain::ProviderFamily;
use atelier::task::domain::{Task, TaskInput};
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest_bdd_macros::given;
use std::sync::Arc;
use std::time::Duration;

#[given("a durable pending request ledger")]
fn durable_ledger(world: &mut RecoveryWorld) -> Result<(), eyre::Report> {
    world.open_tracker()?;
    Ok(())
}

#[given("a video request was polling when the process crashed")]
fn request_polling_at_crash(world: &mut RecoveryWorld) -> Result<(), eyre::Report> {
    let tracker = Arc::clone(world.tracker()?);
    let task = Task::new(TaskInput::from_prompt("aurora over fjord"))
        .wrap_err("build task")?;
    let provider_id = world.studio.provider_id();
    let runner = Arc::clone(&tracker);
    let process = tokio::spawn(async move { runner.run(&provider_id, &task).await });

    let polling = run_async(async {
        for _ in 0..400 {
            let entries = tracker.ledger().list().await?;
            if let Some(entry) = entries
                .into_iter()
                .find(|entry| entry.status() == RequestStatus::Polling && entry.retry_count() > 0)
            {
                return Ok(Some(entry));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok::<_, atelier::ledger::services::LedgerError>(None)
    })
    .wrap_err("watch ledger")?
    .ok_or_else(|| eyre::eyre!("request never reached polling"))?;

    process.abort();
    run_async(tokio::time::sleep(Duration::from_millis(50)));
    world.request_id = Some(polling.request_id());
    Ok(())
}

#[given("a video request was recorded but never submitted")]
fn request_recorded_only(world: &mut RecoveryWorld) -> Result<(), eyre::Report> {
    let task = Task::new(TaskInput::from_prompt("tide pools at noon"))
        .wrap_err("build task")?;
    let request = PendingRequest::new(
        world.studio.provider_id(),
        ProviderFamily::Video,
        task,
        500,
        &DefaultClock,
    );
    run_async(world.tracker()?.ledger().record(&request))
        .wrap_err("record request")?;
    world.request_id = Some(request.request_id());
    Ok(())
}

#[given(r#"the remote service completes new operations with "{url}""#)]
fn remote_completes_new_operations(world: &mut RecoveryWorld, url: String) {
    world.studio.complete_new_operations(&url);
}
