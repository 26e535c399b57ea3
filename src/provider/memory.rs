//! In-memory provisioning engine.
//!
//! [`MemoryEngine`] stands in for a cloud provisioning backend. Creating a resource
//! records the request and returns a handle whose `id` and `arn` are
//! [`Deferred`] values; they complete only when [`MemoryEngine::apply`] drains the
//! engine, the way a real engine completes outputs after issuing every call. Lookups
//! answer immediately from their identifying parameters. When the identifier is
//! itself deferred, the looked-up `id` and `arn` stay deferred too.
//!
//! The set of supported kinds is the static [`CATALOG`]; [`MemoryEngine::catalog`]
//! turns it into a [`TypeLocator`].

use anyhow::{Result, anyhow, bail};
use futures::channel::oneshot;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

use super::{
    CapabilitySet, HandleOrigin, ResourceFactory, ResourceHandle, ResourceLookup, TypeLocator,
};
use crate::args::{ArgMap, ArgValue, Deferred, DeferredError, Scalar, map_to_redacted_json};

/// How the engine makes up identifiers for created resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStyle {
    /// `<prefix>-<17 hex digits>`, like EC2 identifiers
    Prefixed(&'static str),
    /// The physical name itself, like bucket or role names
    Name,
    /// A random UUID, like KMS key ids
    Uuid,
}

/// One resource kind the engine can provision.
#[derive(Debug, Clone, Copy)]
pub struct ResourceKind {
    /// Dotted type identifier
    pub resource_type: &'static str,
    /// Common parameters accepted on create
    pub capabilities: CapabilitySet,
    /// Identifier style for created resources
    pub id_style: IdStyle,
    /// Parameters required to look up an existing resource; empty when lookup is unsupported
    pub lookup_params: &'static [&'static str],
}

impl ResourceKind {
    fn service(&self) -> &'static str {
        self.resource_type.split_once('.').map_or(self.resource_type, |(service, _)| service)
    }

    fn kind_name(&self) -> &'static str {
        self.resource_type.rsplit_once('.').map_or(self.resource_type, |(_, kind)| kind)
    }

    fn arn(&self, id: &Scalar) -> Scalar {
        Scalar::String(format!(
            "arn:aws:{}::000000000000:{}/{}",
            self.service(),
            self.kind_name().to_lowercase(),
            id
        ))
    }
}

/// Kinds known to the in-memory engine.
pub const CATALOG: &[ResourceKind] = &[
    ResourceKind {
        resource_type: "ec2.Vpc",
        capabilities: CapabilitySet::TAGS,
        id_style: IdStyle::Prefixed("vpc"),
        lookup_params: &["id"],
    },
    ResourceKind {
        resource_type: "ec2.Subnet",
        capabilities: CapabilitySet::TAGS,
        id_style: IdStyle::Prefixed("subnet"),
        lookup_params: &["id"],
    },
    ResourceKind {
        resource_type: "ec2.SecurityGroup",
        capabilities: CapabilitySet::TAGS,
        id_style: IdStyle::Prefixed("sg"),
        lookup_params: &["id"],
    },
    ResourceKind {
        resource_type: "ec2.InternetGateway",
        capabilities: CapabilitySet::TAGS,
        id_style: IdStyle::Prefixed("igw"),
        lookup_params: &["internetGatewayId"],
    },
    ResourceKind {
        resource_type: "ec2.RouteTableAssociation",
        capabilities: CapabilitySet::NONE,
        id_style: IdStyle::Prefixed("rtbassoc"),
        lookup_params: &[],
    },
    ResourceKind {
        resource_type: "s3.Bucket",
        capabilities: CapabilitySet::TAGS_AND_REGION,
        id_style: IdStyle::Name,
        lookup_params: &["bucket"],
    },
    ResourceKind {
        resource_type: "rds.Instance",
        capabilities: CapabilitySet::TAGS,
        id_style: IdStyle::Name,
        lookup_params: &["dbInstanceIdentifier"],
    },
    ResourceKind {
        resource_type: "iam.Role",
        capabilities: CapabilitySet::TAGS,
        id_style: IdStyle::Name,
        lookup_params: &["name"],
    },
    ResourceKind {
        resource_type: "kms.Key",
        capabilities: CapabilitySet::TAGS_AND_REGION,
        id_style: IdStyle::Uuid,
        lookup_params: &["keyId"],
    },
    ResourceKind {
        resource_type: "lambda.Function",
        capabilities: CapabilitySet::TAGS,
        id_style: IdStyle::Name,
        lookup_params: &["functionName"],
    },
    ResourceKind {
        resource_type: "route53.Zone",
        capabilities: CapabilitySet::TAGS,
        id_style: IdStyle::Prefixed("zone"),
        lookup_params: &["zoneId"],
    },
];

/// What the engine was asked to do for one declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionRecord {
    /// Dotted type identifier
    pub resource_type: String,
    /// Physical name (create) or identifier (lookup)
    pub physical_name: String,
    /// Create or lookup
    pub origin: HandleOrigin,
    /// Arguments as received, secrets redacted
    pub args: serde_json::Value,
}

#[derive(Default)]
struct EngineState {
    next_serial: u64,
    pending: Vec<(String, oneshot::Sender<Scalar>, Scalar)>,
    records: Vec<ProvisionRecord>,
    rejections: BTreeMap<String, String>,
}

/// Shared in-memory engine. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    state: Arc<Mutex<EngineState>>,
}

impl MemoryEngine {
    /// Empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A locator with every [`CATALOG`] kind wired to this engine.
    #[must_use]
    pub fn catalog(&self) -> TypeLocator {
        let mut locator = TypeLocator::new();
        for kind in CATALOG {
            locator.register_factory(
                kind.resource_type,
                MemoryFactory {
                    kind: *kind,
                    engine: self.clone(),
                },
            );
            if !kind.lookup_params.is_empty() {
                locator.register_lookup(
                    kind.resource_type,
                    MemoryLookup {
                        kind: *kind,
                        engine: self.clone(),
                    },
                );
            }
        }
        locator
    }

    /// Make every later create or lookup of `resource_type` fail with `reason`.
    pub fn reject(&self, resource_type: impl Into<String>, reason: impl Into<String>) {
        self.lock().rejections.insert(resource_type.into(), reason.into());
    }

    /// Complete every outstanding deferred value. Returns how many were completed.
    pub fn apply(&self) -> usize {
        let pending = std::mem::take(&mut self.lock().pending);
        let count = pending.len();
        for (label, sender, value) in pending {
            if sender.send(value).is_err() {
                debug!("Nobody is waiting for '{}'", label);
            }
        }
        debug!("Applied {} deferred values", count);
        count
    }

    /// Deferred values not yet completed.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Every create and lookup issued so far, in order.
    #[must_use]
    pub fn records(&self) -> Vec<ProvisionRecord> {
        self.lock().records.clone()
    }

    /// Only the create calls.
    #[must_use]
    pub fn created(&self) -> Vec<ProvisionRecord> {
        self.lock()
            .records
            .iter()
            .filter(|record| record.origin == HandleOrigin::Created)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_rejection(&self, resource_type: &str) -> Result<()> {
        if let Some(reason) = self.lock().rejections.get(resource_type) {
            bail!("{reason}");
        }
        Ok(())
    }

    fn defer(&self, label: String, value: Scalar) -> Deferred {
        let (sender, receiver) = oneshot::channel();
        let error_label = label.clone();
        let deferred = Deferred::new(label.clone(), async move {
            receiver.await.map_err(|_| DeferredError {
                label: error_label,
                reason: "provisioning engine was dropped before applying".to_string(),
            })
        });
        self.lock().pending.push((label, sender, value));
        deferred
    }
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MemoryEngine")
            .field("records", &state.records.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}

struct MemoryFactory {
    kind: ResourceKind,
    engine: MemoryEngine,
}

impl ResourceFactory for MemoryFactory {
    fn capabilities(&self) -> CapabilitySet {
        self.kind.capabilities
    }

    fn create(&self, name: &str, args: ArgMap) -> Result<ResourceHandle> {
        self.engine.check_rejection(self.kind.resource_type)?;

        let id = {
            let mut state = self.engine.lock();
            state.next_serial += 1;
            state.records.push(ProvisionRecord {
                resource_type: self.kind.resource_type.to_string(),
                physical_name: name.to_string(),
                origin: HandleOrigin::Created,
                args: map_to_redacted_json(&args),
            });
            match self.kind.id_style {
                IdStyle::Prefixed(prefix) => format!("{prefix}-{:017x}", state.next_serial),
                IdStyle::Name => name.to_string(),
                IdStyle::Uuid => Uuid::new_v4().to_string(),
            }
        };

        debug!("Issued create of {} '{}'", self.kind.resource_type, name);

        let id = self.engine.defer(format!("{name}.id"), Scalar::String(id));
        let kind = self.kind;
        let arn = id.map(format!("{name}.arn"), move |id| kind.arn(&id));

        Ok(ResourceHandle::builder(self.kind.resource_type, name)
            .attributes(args)
            .attribute("resource_name", name)
            .attribute("id", id)
            .attribute("arn", arn)
            .build())
    }
}

struct MemoryLookup {
    kind: ResourceKind,
    engine: MemoryEngine,
}

impl ResourceLookup for MemoryLookup {
    fn required_params(&self) -> Vec<String> {
        self.kind.lookup_params.iter().map(|param| (*param).to_string()).collect()
    }

    fn lookup(&self, params: ArgMap) -> Result<ResourceHandle> {
        self.engine.check_rejection(self.kind.resource_type)?;

        let first = self
            .kind
            .lookup_params
            .first()
            .ok_or_else(|| anyhow!("{} does not support lookup", self.kind.resource_type))?;
        let (physical_name, id, arn) = match params.get(*first) {
            Some(ArgValue::Deferred(id)) => {
                let kind = self.kind;
                let arn = id.map(format!("{}.arn", id.label()), move |id| kind.arn(&id));
                (
                    id.label().to_string(),
                    ArgValue::Deferred(id.clone()),
                    ArgValue::Deferred(arn),
                )
            }
            Some(ArgValue::Literal(Scalar::Null)) | None => {
                bail!("lookup parameter '{first}' has no value")
            }
            Some(ArgValue::Literal(id)) => (
                id.to_string(),
                ArgValue::Literal(id.clone()),
                ArgValue::Literal(self.kind.arn(id)),
            ),
            Some(_) => bail!("lookup parameter '{first}' must be a single value"),
        };

        self.engine.lock().records.push(ProvisionRecord {
            resource_type: self.kind.resource_type.to_string(),
            physical_name: physical_name.clone(),
            origin: HandleOrigin::LookedUp,
            args: map_to_redacted_json(&params),
        });

        debug!("Looked up {} '{}'", self.kind.resource_type, physical_name);

        Ok(ResourceHandle::builder(self.kind.resource_type, physical_name)
            .looked_up()
            .attributes(params)
            .attribute("id", id)
            .attribute("arn", arn)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{BuildMode, Implementation};

    fn args(pairs: &[(&str, &str)]) -> ArgMap {
        pairs.iter().map(|(k, v)| ((*k).to_string(), ArgValue::string(*v))).collect()
    }

    #[tokio::test]
    async fn test_create_defers_id_until_apply() {
        let engine = MemoryEngine::new();
        let locator = engine.catalog();
        let Implementation::Create(factory) = locator.locate("ec2.Vpc", BuildMode::Create).unwrap()
        else {
            panic!("expected create path");
        };

        let handle = factory.create("t-s-e-use1-vpc", args(&[("cidr_block", "10.0.0.0/16")])).unwrap();
        let Some(ArgValue::Deferred(id)) = handle.id() else {
            panic!("id should be deferred");
        };
        assert!(!id.is_resolved());
        assert_eq!(handle.attribute("cidr_block"), Some(&ArgValue::string("10.0.0.0/16")));
        assert_eq!(engine.pending_count(), 1);

        assert_eq!(engine.apply(), 1);
        let id = id.resolve().await.unwrap();
        assert!(id.to_string().starts_with("vpc-"));

        let Some(ArgValue::Deferred(arn)) = handle.attribute("arn") else {
            panic!("arn should be deferred");
        };
        assert_eq!(
            arn.resolve().await.unwrap().to_string(),
            format!("arn:aws:ec2::000000000000:vpc/{id}")
        );
    }

    #[tokio::test]
    async fn test_dropped_engine_fails_pending_values() {
        let engine = MemoryEngine::new();
        let locator = engine.catalog();
        let Implementation::Create(factory) = locator.locate("s3.Bucket", BuildMode::Create).unwrap()
        else {
            panic!("expected create path");
        };
        let handle = factory.create("logs", ArgMap::new()).unwrap();
        let Some(ArgValue::Deferred(id)) = handle.id().cloned() else {
            panic!("id should be deferred");
        };

        engine.lock().pending.clear();
        let err = id.resolve().await.unwrap_err();
        assert_eq!(err.label, "logs.id");
    }

    #[test]
    fn test_lookup_uses_first_parameter() {
        let engine = MemoryEngine::new();
        let locator = engine.catalog();
        let Implementation::Lookup(lookup) =
            locator.locate("ec2.InternetGateway", BuildMode::Lookup).unwrap()
        else {
            panic!("expected lookup path");
        };

        assert_eq!(lookup.required_params(), vec!["internetGatewayId".to_string()]);
        let handle = lookup.lookup(args(&[("internetGatewayId", "igw-42")])).unwrap();
        assert_eq!(handle.origin(), HandleOrigin::LookedUp);
        assert_eq!(handle.id(), Some(&ArgValue::string("igw-42")));
        assert!(engine.created().is_empty());
        assert_eq!(engine.records().len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_by_deferred_identifier() {
        let engine = MemoryEngine::new();
        let locator = engine.catalog();
        let Implementation::Lookup(lookup) = locator.locate("ec2.Vpc", BuildMode::Lookup).unwrap()
        else {
            panic!("expected lookup path");
        };

        let pending = engine.defer("vpc.id".to_string(), Scalar::from("vpc-0abc"));
        let mut params = ArgMap::new();
        params.insert("id".into(), ArgValue::Deferred(pending));
        let handle = lookup.lookup(params).unwrap();

        assert_eq!(handle.physical_name(), "vpc.id");
        let Some(ArgValue::Deferred(arn)) = handle.attribute("arn").cloned() else {
            panic!("arn should be deferred");
        };
        assert!(!arn.is_resolved());

        engine.apply();
        assert_eq!(
            arn.resolve().await.unwrap().to_string(),
            "arn:aws:ec2::000000000000:vpc/vpc-0abc"
        );
    }

    #[test]
    fn test_kinds_without_lookup() {
        let locator = MemoryEngine::new().catalog();
        assert!(locator.supports("ec2.RouteTableAssociation", BuildMode::Create));
        assert!(!locator.supports("ec2.RouteTableAssociation", BuildMode::Lookup));
        assert_eq!(locator.types().len(), CATALOG.len());
    }

    #[test]
    fn test_rejection() {
        let engine = MemoryEngine::new();
        engine.reject("iam.Role", "access denied");
        let locator = engine.catalog();
        let Implementation::Create(factory) = locator.locate("iam.Role", BuildMode::Create).unwrap()
        else {
            panic!("expected create path");
        };
        let err = factory.create("role", ArgMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "access denied");
        assert!(engine.created().is_empty());
    }

    #[test]
    fn test_records_redact_secrets() {
        let engine = MemoryEngine::new();
        let locator = engine.catalog();
        let Implementation::Create(factory) = locator.locate("rds.Instance", BuildMode::Create).unwrap()
        else {
            panic!("expected create path");
        };
        let mut arguments = ArgMap::new();
        arguments.insert(
            "password".into(),
            ArgValue::Literal(Scalar::Sensitive(crate::args::SecretValue::new("hunter2"))),
        );
        factory.create("db", arguments).unwrap();

        let record = &engine.created()[0];
        assert_eq!(record.args["password"], "***");
    }
}
