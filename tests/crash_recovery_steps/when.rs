//! When steps for crash recovery BDD scenarios.

use super::world::{RecoveryWorld, run_async};
use rstest_bdd_macros::when;
use std::sync::Arc;

#[when("the process restarts")]
fn process_restarts(world: &mut RecoveryWorld) -> Result<(), eyre::Report> {
    world.tracker = None;
    world.open_tracker()?;
    Ok(())
}

#[when(r#"the remote operation finishes with "{url}""#)]
fn remote_operation_finishes(world: &mut RecoveryWorld, url: String) -> Result<(), eyre::Report> {
    let request = world.request()?;
    let handle = request
        .operation()
        .ok_or_else(|| eyre::eyre!("request has no operation handle"))?;
    world.studio.finish(handle, &url);
    Ok(())
}

#[when("the request is resumed")]
fn request_resumed(world: &mut RecoveryWorld) -> Result<(), eyre::Report> {
    let tracker = Arc::clone(world.tracker()?);
    let id = world.request_id()?;
    world.last_settlement = Some(run_async(tracker.resume(id)));
    Ok(())
}

#[when("the request is cancelled")]
fn request_cancelled(world: &mut RecoveryWorld) -> Result<(), eyre::Report> {
    let tracker = Arc::clone(world.tracker()?);
    let id = world.request_id()?;
    world.last_cancellation = Some(run_async(tracker.cancel(id)));
    Ok(())
}
