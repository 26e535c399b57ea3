//! The build orchestrator.
//!
//! Declarations are processed one at a time, in document order, each moving through
//! [`BuildStage`]s:
//!
//! 1. **Pending** - reject a name that is already registered
//! 2. **ArgsResolving** - substitute `secret:` placeholders, then `ref:` placeholders
//! 3. **TypeResolving** - locate the create or lookup implementation
//! 4. **Constructing** - inject common parameters, name the resource (create only),
//!    and call the provisioning engine
//! 5. **Registered** - store the handle under the declared name
//!
//! The first failure stops the run. Nothing after the failing declaration is
//! attempted and the failing declaration leaves no registry entry.

use tracing::{debug, info};

use super::params::{inject_common_parameters, lookup_parameters};
use super::registry::Registry;
use crate::args::{ArgMap, ArgValue};
use crate::config::{GlobalScope, ResourceDeclaration};
use crate::core::{BuildError, BuildStage, StackbuildError};
use crate::naming::{RegionTable, resource_name};
use crate::provider::{BuildMode, Implementation, ResourceHandle, TypeLocator};
use crate::resolver::{ReferenceResolver, SecretProvider, SecretResolver};

/// Tracks and logs the stage of one declaration.
struct StageTracker<'d> {
    declaration: &'d str,
    stage: BuildStage,
}

impl<'d> StageTracker<'d> {
    fn start(declaration: &'d str) -> Self {
        debug!("'{}': {}", declaration, BuildStage::Pending);
        Self {
            declaration,
            stage: BuildStage::Pending,
        }
    }

    fn advance(&mut self, next: BuildStage) {
        debug_assert!(self.stage.can_advance_to(next), "{} -> {}", self.stage, next);
        debug!("'{}': {} -> {}", self.declaration, self.stage, next);
        self.stage = next;
    }

    /// Move to `Failed`, wrapping `source` with the stage that was active.
    fn fail(&mut self, source: StackbuildError) -> BuildError {
        let failed_in = self.stage;
        self.advance(BuildStage::Failed);
        BuildError::new(self.declaration, failed_in, source)
    }
}

/// Builds declarations into a [`Registry`].
///
/// The orchestrator owns the registry for the duration of the run. Collaborators are
/// borrowed and never mutated.
pub struct Orchestrator<'a> {
    scope: &'a GlobalScope,
    regions: &'a RegionTable,
    locator: &'a TypeLocator,
    secrets: &'a dyn SecretProvider,
    registry: Registry,
}

impl<'a> Orchestrator<'a> {
    /// Orchestrator with an empty registry.
    #[must_use]
    pub fn new(
        scope: &'a GlobalScope,
        regions: &'a RegionTable,
        locator: &'a TypeLocator,
        secrets: &'a dyn SecretProvider,
    ) -> Self {
        Self {
            scope,
            regions,
            locator,
            secrets,
            registry: Registry::new(),
        }
    }

    /// Everything built so far.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Give up the registry.
    #[must_use]
    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Build every declaration in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// The [`BuildError`] of the first declaration that failed.
    pub fn build_all<I>(mut self, declarations: I) -> Result<Registry, BuildError>
    where
        I: IntoIterator<Item = ResourceDeclaration>,
    {
        for declaration in declarations {
            self.build(declaration)?;
        }
        info!("Built {} resources", self.registry.len());
        Ok(self.registry)
    }

    /// Build a single declaration and register its handle.
    ///
    /// # Errors
    ///
    /// A [`BuildError`] naming the declaration and the stage it failed in. The registry
    /// is unchanged on failure.
    pub fn build(&mut self, declaration: ResourceDeclaration) -> Result<(), BuildError> {
        let ResourceDeclaration {
            name,
            resource_type,
            custom_name,
            existing,
            args,
        } = declaration;
        let mut tracker = StageTracker::start(&name);

        if self.registry.contains(&name) {
            return Err(tracker.fail(StackbuildError::DuplicateDeclaration {
                name: name.clone(),
            }));
        }

        tracker.advance(BuildStage::ArgsResolving);
        let mut args = self.resolve_args(args).map_err(|e| tracker.fail(e))?;

        tracker.advance(BuildStage::TypeResolving);
        let implementation = self
            .locator
            .locate(&resource_type, BuildMode::for_existing(existing))
            .map_err(|e| tracker.fail(e))?;

        tracker.advance(BuildStage::Constructing);
        inject_common_parameters(&name, &mut args, implementation.capabilities(), self.scope);
        let handle = self
            .construct(&name, &resource_type, custom_name.as_deref(), implementation, args)
            .map_err(|e| tracker.fail(e))?;

        info!(
            "{} {} '{}' as '{}'",
            match implementation.mode() {
                BuildMode::Create => "Created",
                BuildMode::Lookup => "Found",
            },
            resource_type,
            name,
            handle.physical_name()
        );

        self.registry.insert(name.clone(), handle).map_err(|e| tracker.fail(e))?;
        tracker.advance(BuildStage::Registered);
        Ok(())
    }

    fn resolve_args(&self, args: ArgMap) -> Result<ArgMap, StackbuildError> {
        let args = SecretResolver::new(self.secrets).resolve_map(args)?;
        let args = ReferenceResolver::new(&self.registry).resolve_map(args)?;
        debug_assert!(!args.values().any(ArgValue::has_placeholders));
        Ok(args)
    }

    fn construct(
        &self,
        name: &str,
        resource_type: &str,
        custom_name: Option<&str>,
        implementation: Implementation<'_>,
        args: ArgMap,
    ) -> Result<ResourceHandle, StackbuildError> {
        let provisioning_error = |error: anyhow::Error| StackbuildError::ProvisioningError {
            resource_type: resource_type.to_string(),
            reason: format!("{error:#}"),
        };

        match implementation {
            Implementation::Create(factory) => {
                let physical_name = resource_name(self.scope, self.regions, name, custom_name)?;
                factory.create(&physical_name, args).map_err(provisioning_error)
            }
            Implementation::Lookup(lookup) => {
                let params = lookup_parameters(resource_type, &lookup.required_params(), &args)?;
                lookup.lookup(params).map_err(provisioning_error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{Reference, Scalar, SecretRef};
    use crate::provider::memory::MemoryEngine;
    use crate::provider::{CapabilitySet, HandleOrigin, ResourceFactory};
    use crate::resolver::StaticSecretProvider;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scope() -> GlobalScope {
        let mut scope = GlobalScope::new("team", "svc", "dev", "us-east-1");
        scope.tags.insert("owner".to_string(), "team".to_string());
        scope
    }

    fn declaration(name: &str, resource_type: &str, args: &[(&str, ArgValue)]) -> ResourceDeclaration {
        ResourceDeclaration::new(name, resource_type)
            .with_args(args.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect())
    }

    fn reference(resource: &str, attribute: &str) -> ArgValue {
        ArgValue::Reference(Reference::new(resource, attribute))
    }

    struct Fixture {
        scope: GlobalScope,
        regions: RegionTable,
        engine: MemoryEngine,
        locator: TypeLocator,
        secrets: StaticSecretProvider,
    }

    impl Fixture {
        fn new() -> Self {
            let engine = MemoryEngine::new();
            Self {
                scope: scope(),
                regions: RegionTable::builtin(),
                locator: engine.catalog(),
                engine,
                secrets: StaticSecretProvider::new().with_secret("db-pass", "hunter2"),
            }
        }

        fn orchestrator(&self) -> Orchestrator<'_> {
            Orchestrator::new(&self.scope, &self.regions, &self.locator, &self.secrets)
        }
    }

    #[test]
    fn test_builds_in_document_order() {
        let fixture = Fixture::new();
        let registry = fixture
            .orchestrator()
            .build_all([
                declaration("vpc-01", "ec2.Vpc", &[("cidr_block", ArgValue::string("10.0.0.0/16"))]),
                declaration("subnet-01", "ec2.Subnet", &[("vpc_id", reference("vpc-01", "id"))]),
            ])
            .unwrap();

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["vpc-01", "subnet-01"]);
        let created = fixture.engine.created();
        assert_eq!(created[0].physical_name, "team-svc-dev-use1-vpc-01");
        assert_eq!(created[1].physical_name, "team-svc-dev-use1-subnet-01");
    }

    #[test]
    fn test_reversed_order_fails_with_unresolved_reference() {
        let fixture = Fixture::new();
        let err = fixture
            .orchestrator()
            .build_all([
                declaration("subnet-01", "ec2.Subnet", &[("vpc_id", reference("vpc-01", "id"))]),
                declaration("vpc-01", "ec2.Vpc", &[]),
            ])
            .unwrap_err();

        assert_eq!(err.declaration, "subnet-01");
        assert_eq!(err.stage, BuildStage::ArgsResolving);
        assert!(matches!(err.source, StackbuildError::UnresolvedReference { .. }));
        assert!(fixture.engine.records().is_empty());
    }

    #[tokio::test]
    async fn test_reference_wires_deferred_through() {
        let fixture = Fixture::new();
        let registry = fixture
            .orchestrator()
            .build_all([
                declaration("vpc-01", "ec2.Vpc", &[]),
                declaration("subnet-01", "ec2.Subnet", &[("vpc_id", reference("vpc-01", "id"))]),
            ])
            .unwrap();

        let subnet = registry.get("subnet-01").unwrap();
        let Some(ArgValue::Deferred(vpc_id)) = subnet.attribute("vpc_id") else {
            panic!("vpc_id should still be deferred");
        };
        assert!(!vpc_id.is_resolved());

        fixture.engine.apply();
        let Some(ArgValue::Deferred(vpc_handle_id)) = registry.get("vpc-01").unwrap().id() else {
            panic!("vpc id should be deferred");
        };
        assert_eq!(vpc_id.resolve().await.unwrap(), vpc_handle_id.resolve().await.unwrap());
    }

    #[test]
    fn test_secret_is_resolved_before_construction() {
        let fixture = Fixture::new();
        let registry = fixture
            .orchestrator()
            .build_all([declaration(
                "db",
                "rds.Instance",
                &[("password", ArgValue::Secret(SecretRef::new("db-pass")))],
            )])
            .unwrap();

        let password = registry.get("db").unwrap().attribute("password").unwrap();
        assert_eq!(password.as_str(), Some("hunter2"));
        assert!(matches!(password, ArgValue::Literal(Scalar::Sensitive(_))));
        assert_eq!(fixture.engine.created()[0].args["password"], "***");
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let fixture = Fixture::new();
        let err = fixture
            .orchestrator()
            .build_all([
                declaration("db", "rds.Instance", &[("password", ArgValue::Secret(SecretRef::new("nope")))]),
                declaration("vpc", "ec2.Vpc", &[]),
            ])
            .unwrap_err();

        assert_eq!(err.stage, BuildStage::ArgsResolving);
        assert!(matches!(err.source, StackbuildError::SecretNotFound { ref key, .. } if key == "nope"));
        assert!(fixture.engine.records().is_empty());
    }

    #[test]
    fn test_existing_never_creates() {
        struct CountingFactory(Arc<AtomicUsize>);

        impl ResourceFactory for CountingFactory {
            fn capabilities(&self) -> CapabilitySet {
                CapabilitySet::TAGS
            }

            fn create(&self, name: &str, _args: ArgMap) -> anyhow::Result<ResourceHandle> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(ResourceHandle::builder("ec2.Vpc", name).build())
            }
        }

        let mut fixture = Fixture::new();
        let creates = Arc::new(AtomicUsize::new(0));
        fixture.locator.register_factory("ec2.Vpc", CountingFactory(Arc::clone(&creates)));

        let mut vpc = declaration("vpc", "ec2.Vpc", &[("id", ArgValue::string("vpc-existing"))]);
        vpc.existing = true;
        let registry = fixture.orchestrator().build_all([vpc]).unwrap();

        assert_eq!(creates.load(Ordering::SeqCst), 0);
        let handle = registry.get("vpc").unwrap();
        assert_eq!(handle.origin(), HandleOrigin::LookedUp);
        assert_eq!(handle.id(), Some(&ArgValue::string("vpc-existing")));
        assert!(handle.attribute("tags").is_none());
    }

    #[test]
    fn test_existing_without_lookup_support_fails() {
        let fixture = Fixture::new();
        let mut assoc = declaration("assoc", "ec2.RouteTableAssociation", &[]);
        assoc.existing = true;
        let err = fixture.orchestrator().build_all([assoc]).unwrap_err();

        assert_eq!(err.stage, BuildStage::TypeResolving);
        assert!(matches!(err.source, StackbuildError::UnknownResourceType { ref mode, .. } if mode == "lookup"));
        assert!(fixture.engine.records().is_empty());
    }

    #[test]
    fn test_missing_lookup_parameter() {
        let fixture = Fixture::new();
        let mut bucket = declaration("logs", "s3.Bucket", &[("acl", ArgValue::string("private"))]);
        bucket.existing = true;
        let err = fixture.orchestrator().build_all([bucket]).unwrap_err();

        assert_eq!(err.stage, BuildStage::Constructing);
        assert!(matches!(err.source, StackbuildError::MissingLookupParameters { .. }));
        assert!(fixture.engine.created().is_empty());
    }

    #[tokio::test]
    async fn test_existing_identified_by_deferred_reference() {
        let fixture = Fixture::new();
        let mut same_vpc = declaration("same-vpc", "ec2.Vpc", &[("id", reference("vpc", "id"))]);
        same_vpc.existing = true;
        let registry = fixture
            .orchestrator()
            .build_all([declaration("vpc", "ec2.Vpc", &[]), same_vpc])
            .unwrap();

        let looked_up = registry.get("same-vpc").unwrap();
        assert_eq!(looked_up.origin(), HandleOrigin::LookedUp);
        assert_eq!(fixture.engine.created().len(), 1);

        let Some(ArgValue::Deferred(id)) = looked_up.id() else {
            panic!("id should stay deferred");
        };
        assert!(!id.is_resolved());

        fixture.engine.apply();
        let Some(ArgValue::Deferred(vpc_id)) = registry.get("vpc").unwrap().id() else {
            panic!("vpc id should be deferred");
        };
        assert_eq!(id.resolve().await.unwrap(), vpc_id.resolve().await.unwrap());
    }

    #[test]
    fn test_unknown_type_leaves_registry_unchanged() {
        let fixture = Fixture::new();
        let mut orchestrator = fixture.orchestrator();
        orchestrator.build(declaration("vpc", "ec2.Vpc", &[])).unwrap();

        let err = orchestrator.build(declaration("thing", "ec2.Thing", &[])).unwrap_err();
        assert_eq!(err.declaration, "thing");
        assert_eq!(err.stage, BuildStage::TypeResolving);
        assert!(matches!(err.source, StackbuildError::UnknownResourceType { .. }));
        assert_eq!(orchestrator.registry().names().collect::<Vec<_>>(), vec!["vpc"]);
    }

    #[test]
    fn test_unknown_region_fails_constructing() {
        let mut fixture = Fixture::new();
        fixture.scope = GlobalScope::new("t", "s", "e", "moon-base-1");
        let err = fixture.orchestrator().build_all([declaration("vpc", "ec2.Vpc", &[])]).unwrap_err();

        assert_eq!(err.stage, BuildStage::Constructing);
        assert!(matches!(err.source, StackbuildError::UnknownRegion { .. }));
    }

    #[test]
    fn test_custom_name_used_verbatim() {
        let fixture = Fixture::new();
        let mut bucket = declaration("logs", "s3.Bucket", &[]);
        bucket.custom_name = Some("My-Legacy-Bucket".to_string());
        let registry = fixture.orchestrator().build_all([bucket]).unwrap();

        assert_eq!(registry.get("logs").unwrap().physical_name(), "My-Legacy-Bucket");
    }

    #[test]
    fn test_common_parameters_follow_capabilities() {
        let fixture = Fixture::new();
        let registry = fixture
            .orchestrator()
            .build_all([
                declaration("logs", "s3.Bucket", &[]),
                declaration("vpc", "ec2.Vpc", &[]),
                declaration(
                    "assoc",
                    "ec2.RouteTableAssociation",
                    &[("tags", ArgValue::Mapping(ArgMap::new()))],
                ),
            ])
            .unwrap();

        let bucket = registry.get("logs").unwrap();
        assert_eq!(bucket.attribute("region"), Some(&ArgValue::string("us-east-1")));
        assert!(bucket.attribute("tags").is_some());

        let vpc = registry.get("vpc").unwrap();
        assert!(vpc.attribute("region").is_none());
        assert!(vpc.attribute("tags").is_some());

        assert!(registry.get("assoc").unwrap().attribute("tags").is_none());
    }

    #[test]
    fn test_provisioning_error_passes_through() {
        let fixture = Fixture::new();
        fixture.engine.reject("iam.Role", "AccessDenied: not allowed");
        let err = fixture
            .orchestrator()
            .build_all([declaration("role", "iam.Role", &[])])
            .unwrap_err();

        assert_eq!(err.stage, BuildStage::Constructing);
        assert!(matches!(
            err.source,
            StackbuildError::ProvisioningError { ref reason, .. } if reason.contains("AccessDenied")
        ));
    }

    #[test]
    fn test_duplicate_name_fails_pending() {
        let fixture = Fixture::new();
        let err = fixture
            .orchestrator()
            .build_all([declaration("vpc", "ec2.Vpc", &[]), declaration("vpc", "ec2.Vpc", &[])])
            .unwrap_err();

        assert_eq!(err.stage, BuildStage::Pending);
        assert!(matches!(err.source, StackbuildError::DuplicateDeclaration { .. }));
        assert_eq!(fixture.engine.created().len(), 1);
    }
}
