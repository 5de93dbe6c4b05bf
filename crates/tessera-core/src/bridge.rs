//! The execution boundary.
//!
//! The host never executes capabilities itself. It hands a capability id and
//! a structured input to a [`CapabilityBridge`] and gets a structured result
//! back. Two system actions are all the host needs from the boundary:
//!
//! - `GetPipelineRegistry` - the capability descriptors
//! - `GetPipelineUIComponent` - the UI module source text of one capability
//!
//! Both are sent to [`SYSTEM_CAPABILITY`] unless the host is configured
//! otherwise.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{BridgeError, BridgeResult};
use crate::{CapabilityId, RegistryResponse};

/// Capability that answers the host's system actions.
pub const SYSTEM_CAPABILITY: CapabilityId = CapabilityId::new(0);

/// Action name of the generic registry retrieval.
pub const ACTION_GET_REGISTRY: &str = "GetPipelineRegistry";

/// Action name of the UI module source retrieval.
pub const ACTION_GET_UI_COMPONENT: &str = "GetPipelineUIComponent";

/// Keys under which a source retrieval may carry its text, in priority order.
const SOURCE_KEYS: [&str; 3] = ["source", "code", "component"];

/// Request/response boundary to the backend that owns capabilities.
#[async_trait]
pub trait CapabilityBridge: Send + Sync {
    /// Invoke a numbered capability with a structured input.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] if the invocation cannot be delivered or the
    /// far side reports a failure.
    async fn invoke(&self, capability: CapabilityId, input: Value) -> BridgeResult<Value>;

    /// Dedicated registry accessor.
    ///
    /// Boundaries that have a cheaper way to list capabilities than the
    /// generic `GetPipelineRegistry` invocation override this. The default
    /// reports [`BridgeError::Unsupported`], which makes the host fall back to
    /// the generic path.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] if the accessor is missing or fails.
    async fn fetch_registry(&self) -> BridgeResult<RegistryResponse> {
        Err(BridgeError::Unsupported("dedicated registry accessor".into()))
    }
}

impl std::fmt::Debug for dyn CapabilityBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityBridge").finish_non_exhaustive()
    }
}

/// Input of the generic registry retrieval.
#[must_use]
pub fn registry_request() -> Value {
    json!({ "action": ACTION_GET_REGISTRY })
}

/// Input of the UI module source retrieval for `capability`.
#[must_use]
pub fn ui_component_request(capability: CapabilityId) -> Value {
    json!({
        "action": ACTION_GET_UI_COMPONENT,
        "capabilityId": capability.get(),
    })
}

/// Extract the module source text from a `GetPipelineUIComponent` result.
///
/// Returns `None` when the result reports `success: false`, or carries no
/// non-blank source string.
#[must_use]
pub fn source_from_response(response: &Value) -> Option<String> {
    if response.get("success").and_then(Value::as_bool) == Some(false) {
        return None;
    }
    SOURCE_KEYS
        .iter()
        .filter_map(|key| response.get(*key).and_then(Value::as_str))
        .find(|text| !text.trim().is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_component_request_shape() {
        let request = ui_component_request(CapabilityId::new(12));
        assert_eq!(request["action"], ACTION_GET_UI_COMPONENT);
        assert_eq!(request["capabilityId"], 12);
    }

    #[test]
    fn test_source_from_response_variants() {
        assert_eq!(
            source_from_response(&json!({"success": true, "source": "return {}"})).as_deref(),
            Some("return {}")
        );
        assert_eq!(
            source_from_response(&json!({"code": "x = 1"})).as_deref(),
            Some("x = 1")
        );
        assert_eq!(
            source_from_response(&json!({"source": "  ", "component": "y = 2"})).as_deref(),
            Some("y = 2")
        );
    }

    #[test]
    fn test_source_from_response_rejects_failures_and_blanks() {
        assert!(source_from_response(&json!({"success": false, "source": "x = 1"})).is_none());
        assert!(source_from_response(&json!({"success": true})).is_none());
        assert!(source_from_response(&json!({"source": ""})).is_none());
        assert!(source_from_response(&json!({"source": 42})).is_none());
        assert!(source_from_response(&Value::Null).is_none());
    }

    #[tokio::test]
    async fn test_default_fetch_registry_is_unsupported() {
        struct InvokeOnly;

        #[async_trait]
        impl CapabilityBridge for InvokeOnly {
            async fn invoke(&self, _capability: CapabilityId, input: Value) -> BridgeResult<Value> {
                Ok(input)
            }
        }

        let result = InvokeOnly.fetch_registry().await;
        assert!(matches!(result, Err(BridgeError::Unsupported(_))));
    }
}
