//! In-memory integration tests for listing after out-of-band instance exits.

use super::helpers::{TestApi, artifact_id, test_api};
use gropius::api::ErrorClass;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn crashed_deployment_disappears_from_listing(
    test_api: Result<TestApi, eyre::Report>,
) -> Result<(), eyre::Report> {
    let harness = test_api?;
    let id = harness.upload("model.pkl").await?;
    harness.api.deploy(&id).await?;
    let crashed = harness.runtime.crash(artifact_id(&id)?);
    eyre::ensure!(crashed == 1, "expected one crashed instance");

    let statuses = harness.api.list().await?;

    eyre::ensure!(
        statuses.iter().all(|status| !status.deployed),
        "crashed deployment still listed as deployed"
    );
    let err = harness
        .api
        .infer(&id, &json!(1))
        .await
        .expect_err("no deployment remains");
    eyre::ensure!(err.class() == ErrorClass::NotFound, "expected not found");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reconciled_artifact_can_be_deployed_again(
    test_api: Result<TestApi, eyre::Report>,
) -> Result<(), eyre::Report> {
    let harness = test_api?;
    let id = harness.upload("model.pkl").await?;
    harness.api.deploy(&id).await?;
    let crashed = harness.runtime.crash(artifact_id(&id)?);
    eyre::ensure!(crashed == 1, "expected one crashed instance");
    harness.api.list().await?;

    let record = harness.api.deploy(&id).await?;

    let response = harness.api.infer(&id, &json!({"x": [1, 2]})).await?;
    eyre::ensure!(response.prediction == json!({"x": [1, 2]}), "echo mismatch");
    eyre::ensure!(
        harness.runtime.live_instance_count() == 1,
        "exactly one instance should run on port {}",
        record.port()
    );
    Ok(())
}
