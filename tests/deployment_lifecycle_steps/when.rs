//! When steps for deployment lifecycle BDD scenarios.

use super::world::{DeploymentWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use serde_json::Value;

#[when("the artifact is deployed")]
fn artifact_is_deployed(world: &mut DeploymentWorld) -> Result<(), eyre::Report> {
    let id = world.artifact_id()?;
    world.last_deploy = Some(run_async(world.api.deploy(&id)));
    Ok(())
}

#[when("inference is requested with input {input:i64}")]
fn inference_is_requested(world: &mut DeploymentWorld, input: i64) -> Result<(), eyre::Report> {
    let id = world.artifact_id()?;
    world.last_inference = Some(run_async(world.api.infer(&id, &Value::from(input))));
    Ok(())
}

#[when("the artifact is torn down")]
fn artifact_is_torn_down(world: &mut DeploymentWorld) -> Result<(), eyre::Report> {
    let id = world.artifact_id()?;
    run_async(world.api.teardown(&id)).wrap_err("tear down deployed artifact")?;
    Ok(())
}
