//! Given steps for deployment lifecycle BDD scenarios.

use super::world::{DeploymentWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use serde_json::Value;

fn upload(world: &mut DeploymentWorld, filename: &str) -> Result<String, eyre::Report> {
    let record = run_async(world.api.upload(filename, b"serialized-model".to_vec()))
        .wrap_err("upload artifact for scenario")?;
    let id = record.id().to_string();
    world.artifact_id = Some(id.clone());
    Ok(id)
}

#[given(r#"an uploaded artifact "{filename}" whose model reports parity"#)]
fn uploaded_parity_model(
    world: &mut DeploymentWorld,
    filename: String,
) -> Result<(), eyre::Report> {
    let id = upload(world, &filename)?;
    let artifact_id = id
        .parse()
        .map_err(|err| eyre::eyre!("uploaded id does not parse: {err}"))?;
    world.runtime.install_model(artifact_id, |input| {
        input
            .as_i64()
            .map(|number| Value::Bool(number.rem_euclid(2) == 0))
            .ok_or_else(|| "input must be an integer".to_owned())
    });
    Ok(())
}

#[given(r#"an uploaded artifact "{filename}" whose instance exits with "{logs}""#)]
fn uploaded_exiting_model(
    world: &mut DeploymentWorld,
    filename: String,
    logs: String,
) -> Result<(), eyre::Report> {
    let id = upload(world, &filename)?;
    let artifact_id = id
        .parse()
        .map_err(|err| eyre::eyre!("uploaded id does not parse: {err}"))?;
    world.runtime.exit_after_start(artifact_id, logs);
    Ok(())
}

#[given("the artifact has been deployed")]
fn artifact_has_been_deployed(world: &mut DeploymentWorld) -> Result<(), eyre::Report> {
    let id = world.artifact_id()?;
    run_async(world.api.deploy(&id)).wrap_err("deploy artifact in scenario setup")?;
    Ok(())
}
