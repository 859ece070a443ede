//! Then steps for crash recovery BDD scenarios.

use super::world::{RecoveryWorld, run_async};
use atelier::ledger::domain::RequestStatus;
use atelier::ledger::services::Settlement;
use eyre::WrapErr;
use rstest_bdd_macros::then;

#[then("the ledger lists {count:usize} unfinished requests")]
fn ledger_lists_unfinished(world: &RecoveryWorld, count: usize) -> Result<(), eyre::Report> {
    let unfinished = run_async(world.tracker()?.ledger().list_non_terminal())
        .wrap_err("list non-terminal")?;
    eyre::ensure!(
        unfinished.len() == count,
        "expected {count} unfinished requests, found {}",
        unfinished.len()
    );
    Ok(())
}

#[then(r#"the request is "{status}""#)]
fn request_has_status(world: &RecoveryWorld, status: String) -> Result<(), eyre::Report> {
    let expected = RequestStatus::try_from(status.as_str())
        .wrap_err("invalid expected status in scenario")?;
    let request = world.request()?;
    eyre::ensure!(
        request.status() == expected,
        "expected status {expected}, found {}",
        request.status()
    );
    Ok(())
}

#[then("the request still holds its operation handle")]
fn request_holds_handle(world: &RecoveryWorld) -> Result<(), eyre::Report> {
    let request = world.request()?;
    eyre::ensure!(
        request.operation().is_some(),
        "request lost its operation handle"
    );
    Ok(())
}

#[then(r#"the request result is at "{url}""#)]
fn request_result_at(world: &RecoveryWorld, url: String) -> Result<(), eyre::Report> {
    let settlement = world
        .last_settlement
        .as_ref()
        .ok_or_else(|| eyre::eyre!("request was never resumed"))?;
    let Ok(Settlement::Completed(payload)) = settlement else {
        return Err(eyre::eyre!("expected completed settlement, got {settlement:?}"));
    };
    eyre::ensure!(
        payload.result_url.as_deref() == Some(url.as_str()),
        "unexpected result url {:?}",
        payload.result_url
    );
    let request = world.request()?;
    eyre::ensure!(
        request.result_url() == Some(url.as_str()),
        "ledger result url {:?} does not match",
        request.result_url()
    );
    Ok(())
}

#[then(r#"the request failed with "{reason}""#)]
fn request_failed_with(world: &RecoveryWorld, reason: String) -> Result<(), eyre::Report> {
    let cancelled = world
        .last_cancellation
        .as_ref()
        .ok_or_else(|| eyre::eyre!("request was never cancelled"))?
        .as_ref()
        .map_err(|err| eyre::eyre!("cancel failed: {err}"))?;
    eyre::ensure!(
        cancelled.status() == RequestStatus::Failed,
        "cancelled request is {}",
        cancelled.status()
    );
    let request = world.request()?;
    eyre::ensure!(
        request.error() == Some(reason.as_str()),
        "expected failure reason {reason:?}, found {:?}",
        request.error()
    );
    Ok(())
}

#[then("the remote service received {count:u32} submissions")]
fn remote_received_submissions(world: &RecoveryWorld, count: u32) -> Result<(), eyre::Report> {
    let submits = world.studio.submits();
    eyre::ensure!(
        submits == count,
        "expected {count} submissions, found {submits}"
    );
    Ok(())
}
