//! Then steps for deployment lifecycle BDD scenarios.

use super::world::{DeploymentWorld, run_async};
use gropius::api::ErrorClass;
use gropius::deployment::domain::DeploymentState;
use rstest_bdd_macros::then;
use serde_json::Value;

#[then("the deployment is running on an assigned port")]
fn deployment_is_running(world: &DeploymentWorld) -> Result<(), eyre::Report> {
    let record = match world.last_deploy.as_ref() {
        Some(Ok(record)) => record,
        Some(Err(err)) => return Err(eyre::eyre!("deploy failed: {err}")),
        None => return Err(eyre::eyre!("missing deploy result")),
    };
    eyre::ensure!(
        record.state() == DeploymentState::Running,
        "expected running, found {}",
        record.state()
    );

    let statuses = run_async(world.api.list())?;
    let listed = statuses
        .iter()
        .find(|status| status.artifact_id == record.artifact_id())
        .ok_or_else(|| eyre::eyre!("deployed artifact missing from listing"))?;
    eyre::ensure!(
        listed.port == Some(record.port()),
        "listing reports port {:?}, expected {}",
        listed.port,
        record.port()
    );
    Ok(())
}

#[then("the prediction is {expected}")]
fn prediction_is(world: &DeploymentWorld, expected: String) -> Result<(), eyre::Report> {
    let expected_value: Value = serde_json::from_str(&expected)?;
    match world.last_inference.as_ref() {
        Some(Ok(response)) => {
            eyre::ensure!(
                response.prediction == expected_value,
                "expected prediction {expected_value}, got {}",
                response.prediction
            );
            Ok(())
        }
        Some(Err(err)) => Err(eyre::eyre!("inference failed: {err}")),
        None => Err(eyre::eyre!("missing inference result")),
    }
}

#[then("inference with input {input:i64} is rejected as not found")]
fn inference_is_not_found(world: &DeploymentWorld, input: i64) -> Result<(), eyre::Report> {
    let id = world.artifact_id()?;
    match run_async(world.api.infer(&id, &Value::from(input))) {
        Ok(response) => Err(eyre::eyre!(
            "expected not found, got prediction {}",
            response.prediction
        )),
        Err(err) if err.class() == ErrorClass::NotFound => Ok(()),
        Err(err) => Err(eyre::eyre!("expected not found, got {err}")),
    }
}

#[then(r#"the deploy fails with a server error mentioning "{text}""#)]
fn deploy_fails_with_server_error(
    world: &DeploymentWorld,
    text: String,
) -> Result<(), eyre::Report> {
    match world.last_deploy.as_ref() {
        Some(Err(err)) => {
            eyre::ensure!(
                err.class() == ErrorClass::ServerError,
                "expected server error, got {err}"
            );
            let rendered = format!("{err:?}");
            eyre::ensure!(rendered.contains(&text), "{rendered} does not mention {text}");
            Ok(())
        }
        Some(Ok(record)) => Err(eyre::eyre!("deploy unexpectedly succeeded: {record:?}")),
        None => Err(eyre::eyre!("missing deploy result")),
    }
}

#[then("the deploy fails with a conflict")]
fn deploy_fails_with_conflict(world: &DeploymentWorld) -> Result<(), eyre::Report> {
    match world.last_deploy.as_ref() {
        Some(Err(err)) if err.class() == ErrorClass::Conflict => Ok(()),
        Some(Err(err)) => Err(eyre::eyre!("expected conflict, got {err}")),
        Some(Ok(record)) => Err(eyre::eyre!("deploy unexpectedly succeeded: {record:?}")),
        None => Err(eyre::eyre!("missing deploy result")),
    }
}

#[then("no instance is left behind")]
fn no_instance_left_behind(world: &DeploymentWorld) -> Result<(), eyre::Report> {
    eyre::ensure!(
        world.runtime.instance_count() == 0,
        "{} instances remain",
        world.runtime.instance_count()
    );
    let statuses = run_async(world.api.list())?;
    eyre::ensure!(
        statuses.iter().all(|status| !status.deployed),
        "a deployment is still listed"
    );
    Ok(())
}
