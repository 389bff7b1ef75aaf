//! In-memory integration tests for concurrent deployments.

use super::helpers::build_api;
use gropius::api::{ApiError, ErrorClass};
use gropius::deployment::domain::DeploymentRecord;
use std::collections::HashSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_deploys_of_distinct_artifacts_get_distinct_ports() -> Result<(), eyre::Report> {
    let harness = build_api(16)?;
    let mut ids = Vec::new();
    for index in 0..12 {
        ids.push(harness.upload(&format!("model-{index}.pkl")).await?);
    }

    let tasks: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let api = harness.api.clone();
            tokio::spawn(async move { api.deploy(&id).await })
        })
        .collect();
    let mut records: Vec<DeploymentRecord> = Vec::new();
    for task in tasks {
        records.push(task.await??);
    }

    let ports: HashSet<_> = records.iter().map(DeploymentRecord::port).collect();
    eyre::ensure!(ports.len() == records.len(), "ports must be exclusive");
    eyre::ensure!(
        harness.runtime.live_instance_count() == 12,
        "every deployment should have a running instance"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_deploys_of_one_artifact_yield_one_deployment() -> Result<(), eyre::Report> {
    let harness = build_api(8)?;
    let id = harness.upload("model.pkl").await?;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let api = harness.api.clone();
            let target = id.clone();
            tokio::spawn(async move { api.deploy(&target).await })
        })
        .collect();
    let mut outcomes: Vec<Result<DeploymentRecord, ApiError>> = Vec::new();
    for task in tasks {
        outcomes.push(task.await?);
    }

    let succeeded = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|outcome| {
            outcome
                .as_ref()
                .is_err_and(|err| err.class() == ErrorClass::Conflict)
        })
        .count();
    eyre::ensure!(succeeded == 1, "expected one success, got {succeeded}");
    eyre::ensure!(conflicts == 7, "expected seven conflicts, got {conflicts}");
    eyre::ensure!(harness.runtime.instance_count() == 1, "duplicate instance");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn oversubscribed_port_range_reports_exhaustion_without_leaks() -> Result<(), eyre::Report> {
    let harness = build_api(2)?;
    let mut ids = Vec::new();
    for index in 0..5 {
        ids.push(harness.upload(&format!("model-{index}.pkl")).await?);
    }

    let tasks: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let api = harness.api.clone();
            tokio::spawn(async move { api.deploy(&id).await })
        })
        .collect();
    let mut succeeded = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => succeeded += 1,
            Err(err) => eyre::ensure!(
                err.class() == ErrorClass::ServerError,
                "unexpected failure class for {err}"
            ),
        }
    }

    eyre::ensure!(succeeded == 2, "expected two deployments, got {succeeded}");
    eyre::ensure!(harness.runtime.instance_count() == 2, "instance leaked");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_teardowns_remove_once() -> Result<(), eyre::Report> {
    let harness = build_api(4)?;
    let id = harness.upload("model.pkl").await?;
    harness.api.deploy(&id).await?;

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let api = harness.api.clone();
            let target = id.clone();
            tokio::spawn(async move { api.teardown(&target).await })
        })
        .collect();
    let mut removed = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => removed += 1,
            Err(err) => eyre::ensure!(
                matches!(err.class(), ErrorClass::NotFound | ErrorClass::Conflict),
                "unexpected teardown failure {err}"
            ),
        }
    }

    eyre::ensure!(removed == 1, "expected one removal, got {removed}");
    eyre::ensure!(harness.runtime.instance_count() == 0, "instance leaked");
    Ok(())
}
