//! In-memory integration tests for the upload to teardown lifecycle.

use super::helpers::{TestApi, artifact_id, build_api, test_api};
use gropius::api::ErrorClass;
use gropius::deployment::domain::DeploymentState;
use rstest::rstest;
use serde_json::{Value, json};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn uploaded_artifact_is_listed_as_not_deployed(
    test_api: Result<TestApi, eyre::Report>,
) -> Result<(), eyre::Report> {
    let harness = test_api?;
    let id = harness.upload("is_even.pkl").await?;

    let statuses = harness.api.list().await?;

    let status = statuses
        .first()
        .ok_or_else(|| eyre::eyre!("expected one listed artifact"))?;
    eyre::ensure!(statuses.len() == 1, "expected exactly one artifact");
    eyre::ensure!(status.artifact_id == artifact_id(&id)?, "id mismatch");
    eyre::ensure!(status.filename.as_str() == "is_even.pkl", "filename mismatch");
    eyre::ensure!(!status.deployed && status.port.is_none(), "should not be deployed");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn full_lifecycle_relays_predictions_and_cleans_up(
    test_api: Result<TestApi, eyre::Report>,
) -> Result<(), eyre::Report> {
    let harness = test_api?;
    let id = harness.upload("is_even.pkl").await?;
    harness.runtime.install_model(artifact_id(&id)?, |input| {
        let number = input
            .as_i64()
            .ok_or_else(|| "input must be an integer".to_owned())?;
        Ok(Value::Bool(number.rem_euclid(2) == 0))
    });

    let record = harness.api.deploy(&id).await?;
    eyre::ensure!(record.state() == DeploymentState::Running, "not running");
    let listed = harness.api.list().await?;
    eyre::ensure!(
        listed
            .iter()
            .any(|status| status.deployed && status.port == Some(record.port())),
        "listing should report the assigned port"
    );

    let response = harness.api.infer(&id, &json!(4)).await?;
    eyre::ensure!(response.prediction == json!(true), "unexpected prediction");

    let removed = harness.api.teardown(&id).await?;
    eyre::ensure!(removed.port() == record.port(), "teardown port mismatch");
    let after = harness
        .api
        .infer(&id, &json!(4))
        .await
        .expect_err("inference after teardown must fail");
    eyre::ensure!(after.class() == ErrorClass::NotFound, "expected not found");
    eyre::ensure!(harness.runtime.instance_count() == 0, "instance leaked");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn model_failure_surfaces_as_server_error_with_detail(
    test_api: Result<TestApi, eyre::Report>,
) -> Result<(), eyre::Report> {
    let harness = test_api?;
    let id = harness.upload("is_even.pkl").await?;
    harness
        .runtime
        .install_model(artifact_id(&id)?, |_| Err("input must be an integer".to_owned()));
    harness.api.deploy(&id).await?;

    let err = harness
        .api
        .infer(&id, &json!("four"))
        .await
        .expect_err("model rejects strings");

    eyre::ensure!(err.class() == ErrorClass::ServerError, "expected server error");
    eyre::ensure!(
        err.to_string().contains("input must be an integer"),
        "detail missing from {err}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn null_input_is_rejected_before_reaching_the_model(
    test_api: Result<TestApi, eyre::Report>,
) -> Result<(), eyre::Report> {
    let harness = test_api?;
    let id = harness.upload("is_even.pkl").await?;
    harness
        .runtime
        .install_model(artifact_id(&id)?, |_| Err("model must not run".to_owned()));
    harness.api.deploy(&id).await?;

    let err = harness
        .api
        .infer(&id, &Value::Null)
        .await
        .expect_err("null input must be rejected");

    eyre::ensure!(err.class() == ErrorClass::InvalidInput, "expected invalid input");
    eyre::ensure!(
        !err.to_string().contains("model must not run"),
        "model was invoked: {err}"
    );
    Ok(())
}

#[rstest]
#[case("not-a-uuid")]
#[case("00000000-0000-0000-0000-000000000000")]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_artifacts_are_not_found_everywhere(
    #[case] id: &str,
    test_api: Result<TestApi, eyre::Report>,
) -> Result<(), eyre::Report> {
    let harness = test_api?;

    let deploy = harness.api.deploy(id).await.expect_err("deploy must fail");
    let teardown = harness.api.teardown(id).await.expect_err("teardown must fail");
    let infer = harness
        .api
        .infer(id, &json!(1))
        .await
        .expect_err("infer must fail");

    for err in [deploy, teardown, infer] {
        eyre::ensure!(err.class() == ErrorClass::NotFound, "{err} is not a 404");
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn redeploying_a_running_artifact_conflicts(
    test_api: Result<TestApi, eyre::Report>,
) -> Result<(), eyre::Report> {
    let harness = test_api?;
    let id = harness.upload("model.pkl").await?;
    harness.api.deploy(&id).await?;

    let err = harness.api.deploy(&id).await.expect_err("second deploy");

    eyre::ensure!(err.class() == ErrorClass::Conflict, "expected conflict");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_upload_is_invalid_input(
    test_api: Result<TestApi, eyre::Report>,
) -> Result<(), eyre::Report> {
    let harness = test_api?;

    let err = harness
        .api
        .upload("model.pkl", Vec::new())
        .await
        .expect_err("empty payload is rejected");

    eyre::ensure!(err.class() == ErrorClass::InvalidInput, "expected invalid input");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn exiting_instance_fails_deploy_and_frees_resources() -> Result<(), eyre::Report> {
    let harness = build_api(1)?;
    let broken = harness.upload("broken.pkl").await?;
    let healthy = harness.upload("healthy.pkl").await?;
    harness
        .runtime
        .exit_after_start(artifact_id(&broken)?, "ImportError: no module named numpy");

    let err = harness.api.deploy(&broken).await.expect_err("deploy fails");
    eyre::ensure!(err.class() == ErrorClass::ServerError, "expected server error");
    eyre::ensure!(harness.runtime.instance_count() == 0, "instance leaked");

    harness.api.deploy(&healthy).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_tears_down_every_deployment() -> Result<(), eyre::Report> {
    let harness = build_api(4)?;
    for name in ["a.pkl", "b.pkl", "c.pkl"] {
        let id = harness.upload(name).await?;
        harness.api.deploy(&id).await?;
    }

    let removed = harness.api.shutdown().await?;

    eyre::ensure!(removed.len() == 3, "expected three removals");
    eyre::ensure!(harness.runtime.instance_count() == 0, "instances leaked");
    eyre::ensure!(
        harness.api.list().await?.iter().all(|status| !status.deployed),
        "nothing should remain deployed"
    );
    Ok(())
}
