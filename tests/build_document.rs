//! End-to-end builds of stack documents through the library API.

use stackbuild_cli::args::{ArgValue, Scalar};
use stackbuild_cli::build::Orchestrator;
use stackbuild_cli::config::StackDocument;
use stackbuild_cli::core::{BuildStage, StackbuildError};
use stackbuild_cli::naming::RegionTable;
use stackbuild_cli::provider::HandleOrigin;
use stackbuild_cli::provider::memory::MemoryEngine;
use stackbuild_cli::resolver::StaticSecretProvider;
use stackbuild_cli::test_utils::{SAMPLE_DOCUMENT, init_test_logging};
use std::path::Path;

fn sample() -> StackDocument {
    StackDocument::from_yaml_str(SAMPLE_DOCUMENT, Path::new("sample.yaml")).unwrap()
}

#[tokio::test]
async fn test_sample_document_builds() {
    init_test_logging(None);
    let document = sample();
    let regions = RegionTable::builtin();
    let engine = MemoryEngine::new();
    let locator = engine.catalog();
    let secrets = StaticSecretProvider::new().with_secret("db-password", "hunter2");

    let registry = Orchestrator::new(&document.scope, &regions, &locator, &secrets)
        .build_all(document.resources.clone())
        .unwrap();

    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        vec!["vpc-01", "subnet-01", "db", "shared-logs"]
    );

    // The existing bucket is looked up, never created
    let created: Vec<_> = engine.created().into_iter().map(|r| r.resource_type).collect();
    assert_eq!(created, vec!["ec2.Vpc", "ec2.Subnet", "rds.Instance"]);
    assert_eq!(registry.get("shared-logs").unwrap().origin(), HandleOrigin::LookedUp);

    // Global tags reach every taggable created resource
    let vpc_record = &engine.created()[0];
    assert_eq!(vpc_record.args["tags"]["owner"], "platform-team");

    // Deferred ids stay pending until the engine is applied, then flow through references
    let db = registry.get("db").unwrap();
    let Some(ArgValue::Sequence(subnet_ids)) = db.attribute("subnet_ids") else {
        panic!("subnet_ids should be a sequence");
    };
    let ArgValue::Deferred(subnet_id) = &subnet_ids[0] else {
        panic!("subnet id should be deferred");
    };
    assert!(!subnet_id.is_resolved());

    assert_eq!(engine.apply(), 3);
    assert_eq!(
        subnet_id.resolve().await.unwrap(),
        Scalar::from("subnet-00000000000000002")
    );
}

#[test]
fn test_failure_stops_the_run() {
    let document = sample();
    let regions = RegionTable::builtin();
    let engine = MemoryEngine::new();
    engine.reject("rds.Instance", "InsufficientDBInstanceCapacity");
    let locator = engine.catalog();
    let secrets = StaticSecretProvider::new().with_secret("db-password", "hunter2");

    let err = Orchestrator::new(&document.scope, &regions, &locator, &secrets)
        .build_all(document.resources)
        .unwrap_err();

    assert_eq!(err.declaration, "db");
    assert_eq!(err.stage, BuildStage::Constructing);
    assert!(matches!(err.source, StackbuildError::ProvisioningError { .. }));

    // Nothing after the failing declaration was attempted
    assert!(engine.records().iter().all(|r| r.resource_type != "s3.Bucket"));
}
