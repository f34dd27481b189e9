//! RpcChannel - Camera Control Boundary
//!
//! ## Responsibilities
//!
//! - Method-name + positional-params round trip to the device
//! - Sparse result slots on success, typed `Error::Rpc` on device error
//!
//! The core only depends on [`RpcChannel`]; [`JsonRpcClient`] is the HTTP
//! adapter used by the binary.

pub mod http;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use http::JsonRpcClient;

/// Control channel to the device
#[async_trait]
pub trait RpcChannel: Send + Sync {
    /// Invoke `method` with positional `params`
    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<RpcSlots>;
}

/// Ordered, sparse result of a successful RPC call
///
/// Slot `i` is "absent" when the array is shorter than `i + 1` or holds
/// `null` there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RpcSlots(Vec<Value>);

impl RpcSlots {
    pub fn new(slots: Vec<Value>) -> Self {
        Self(slots)
    }

    /// Wrap a raw `result` member; non-array results become a single slot
    pub fn from_result(result: Value) -> Self {
        match result {
            Value::Array(items) => Self(items),
            Value::Null => Self(Vec::new()),
            other => Self(vec![other]),
        }
    }

    /// Present slot at `index`, `None` when absent
    pub fn slot(&self, index: usize) -> Option<&Value> {
        self.0.get(index).filter(|v| !v.is_null())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slot_absence() {
        let slots = RpcSlots::new(vec![Value::Null, json!({"cameraStatus": "IDLE"})]);
        assert!(slots.slot(0).is_none());
        assert!(slots.slot(1).is_some());
        assert!(slots.slot(57).is_none());
    }

    #[test]
    fn test_from_result_scalar() {
        let slots = RpcSlots::from_result(json!(0));
        assert_eq!(slots.len(), 1);
        assert_eq!(slots.slot(0), Some(&json!(0)));
        assert!(RpcSlots::from_result(Value::Null).is_empty());
    }
}
