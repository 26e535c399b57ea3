//! Argument preparation before a provisioning call.
//!
//! Two steps sit between resolution and the provisioning engine:
//!
//! - [`inject_common_parameters`] adds the document's global tags and region to kinds
//!   that accept them, and strips them from kinds that do not
//! - [`lookup_parameters`] picks the identifying parameters a lookup needs out of the
//!   resolved arguments

use tracing::{debug, warn};

use crate::args::{ArgMap, ArgValue};
use crate::config::GlobalScope;
use crate::constants::{REGION_PARAM, TAGS_PARAM};
use crate::core::StackbuildError;
use crate::provider::CapabilitySet;

/// Apply the global tags and region according to `capabilities`.
///
/// For a supported parameter the global value is inserted only when the declaration
/// did not set its own; empty global tags are never inserted. For an unsupported
/// parameter any declared value is removed, since the engine would reject it.
pub fn inject_common_parameters(
    declaration: &str,
    args: &mut ArgMap,
    capabilities: CapabilitySet,
    scope: &GlobalScope,
) {
    if capabilities.tags {
        if !scope.tags.is_empty() && !args.contains_key(TAGS_PARAM) {
            let tags = scope
                .tags
                .iter()
                .map(|(key, value)| (key.clone(), ArgValue::string(value.clone())))
                .collect::<ArgMap>();
            debug!("Injecting {} global tags into '{}'", tags.len(), declaration);
            args.insert(TAGS_PARAM.to_string(), ArgValue::Mapping(tags));
        }
    } else if args.remove(TAGS_PARAM).is_some() {
        warn!("Resource '{}' does not support tags; ignoring its 'tags' argument", declaration);
    }

    if capabilities.region {
        args.entry(REGION_PARAM.to_string())
            .or_insert_with(|| ArgValue::string(scope.region.trim().to_lowercase()));
    } else if args.remove(REGION_PARAM).is_some() {
        warn!("Resource '{}' does not support region; ignoring its 'region' argument", declaration);
    }
}

/// Collect the parameters a lookup requires from resolved arguments.
///
/// Each required name is taken from `args` by its snake_case spelling first and then
/// verbatim, and stored under the provider's spelling.
///
/// # Errors
///
/// [`StackbuildError::MissingLookupParameters`] listing every required name found in
/// neither spelling.
pub fn lookup_parameters(
    resource_type: &str,
    required: &[String],
    args: &ArgMap,
) -> Result<ArgMap, StackbuildError> {
    let mut params = ArgMap::new();
    let mut missing = Vec::new();

    for name in required {
        let snake = to_snake_case(name);
        match args.get(&snake).or_else(|| args.get(name)) {
            Some(value) => {
                params.insert(name.clone(), value.clone());
            }
            None => missing.push(name.clone()),
        }
    }

    if missing.is_empty() {
        Ok(params)
    } else {
        Err(StackbuildError::MissingLookupParameters {
            resource_type: resource_type.to_string(),
            missing,
        })
    }
}

/// `internetGatewayId` -> `internet_gateway_id`.
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut previous: Option<char> = None;

    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if previous.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit()) {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
        previous = Some(c);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn scope_with_tags() -> GlobalScope {
        let mut scope = GlobalScope::new("t", "s", "e", "US-East-1 ");
        scope.tags = BTreeMap::from([("owner".to_string(), "platform".to_string())]);
        scope
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("internetGatewayId"), "internet_gateway_id");
        assert_eq!(to_snake_case("dbInstanceIdentifier"), "db_instance_identifier");
        assert_eq!(to_snake_case("id"), "id");
        assert_eq!(to_snake_case("zoneID"), "zone_id");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_injects_supported_parameters() {
        let mut args = ArgMap::new();
        inject_common_parameters("b", &mut args, CapabilitySet::TAGS_AND_REGION, &scope_with_tags());

        assert_eq!(args["region"], ArgValue::string("us-east-1"));
        let tags = args["tags"].as_mapping().unwrap();
        assert_eq!(tags["owner"], ArgValue::string("platform"));
    }

    #[test]
    fn test_declared_values_win() {
        let mut args = ArgMap::new();
        args.insert("tags".into(), ArgValue::Mapping(ArgMap::new()));
        args.insert("region".into(), ArgValue::string("eu-west-1"));
        inject_common_parameters("b", &mut args, CapabilitySet::TAGS_AND_REGION, &scope_with_tags());

        assert_eq!(args["region"], ArgValue::string("eu-west-1"));
        assert!(args["tags"].as_mapping().unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_parameters_are_stripped() {
        let mut args = ArgMap::new();
        args.insert("tags".into(), ArgValue::Mapping(ArgMap::new()));
        args.insert("region".into(), ArgValue::string("eu-west-1"));
        args.insert("subnet_id".into(), ArgValue::string("subnet-1"));
        inject_common_parameters("assoc", &mut args, CapabilitySet::NONE, &scope_with_tags());

        assert_eq!(args.keys().collect::<Vec<_>>(), vec!["subnet_id"]);
    }

    #[test]
    fn test_empty_tags_not_injected() {
        let mut args = ArgMap::new();
        let scope = GlobalScope::new("t", "s", "e", "us-east-1");
        inject_common_parameters("vpc", &mut args, CapabilitySet::TAGS, &scope);
        assert!(args.is_empty());
    }

    #[test]
    fn test_lookup_parameters_prefer_snake_case() {
        let mut args = ArgMap::new();
        args.insert("internet_gateway_id".into(), ArgValue::string("igw-snake"));
        args.insert("internetGatewayId".into(), ArgValue::string("igw-camel"));

        let params =
            lookup_parameters("ec2.InternetGateway", &["internetGatewayId".to_string()], &args)
                .unwrap();
        assert_eq!(params["internetGatewayId"], ArgValue::string("igw-snake"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_lookup_parameters_verbatim_fallback() {
        let mut args = ArgMap::new();
        args.insert("keyId".into(), ArgValue::string("k-1"));
        let params = lookup_parameters("kms.Key", &["keyId".to_string()], &args).unwrap();
        assert_eq!(params["keyId"], ArgValue::string("k-1"));
    }

    #[test]
    fn test_missing_lookup_parameters() {
        let err = lookup_parameters(
            "rds.Instance",
            &["dbInstanceIdentifier".to_string()],
            &ArgMap::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StackbuildError::MissingLookupParameters { ref missing, .. }
                if missing == &vec!["dbInstanceIdentifier".to_string()]
        ));
    }
}
