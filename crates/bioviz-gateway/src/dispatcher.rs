//! Execution dispatcher: the boundary between the gateway and handler code.
//!
//! Fills blank parameters from ambient context, runs the handler in its own
//! task so a panic cannot take the gateway down, and converts every failure
//! mode (error return, panic, timeout) into a typed [`DispatchError`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::DispatchError;
use crate::registry::CapabilityHandler;
use crate::types::AmbientContext;

/// Invokes capability handlers with argument injection and failure isolation.
#[derive(Clone, Default)]
pub struct Dispatcher {
    default_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher. With `None`, handlers may block indefinitely.
    pub fn new(default_timeout: Option<Duration>) -> Self {
        Self { default_timeout }
    }

    /// Invoke a handler with the configured default timeout.
    pub async fn invoke(
        &self,
        handler: Arc<dyn CapabilityHandler>,
        arguments: Value,
        ambient: &AmbientContext,
    ) -> Result<Value, DispatchError> {
        self.invoke_with_timeout(handler, arguments, ambient, self.default_timeout)
            .await
    }

    /// Invoke a handler, overriding the default timeout.
    ///
    /// On expiry the in-flight handler keeps running detached; its eventual
    /// result is dropped and never reaches decision state.
    pub async fn invoke_with_timeout(
        &self,
        handler: Arc<dyn CapabilityHandler>,
        arguments: Value,
        ambient: &AmbientContext,
        timeout: Option<Duration>,
    ) -> Result<Value, DispatchError> {
        let name = handler.name().to_string();
        let arguments = inject_context(handler.as_ref(), arguments, ambient);

        let task = tokio::spawn(async move { handler.execute(&arguments).await });

        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(capability = %name, timeout_secs = limit.as_secs(), "Handler timed out");
                    return Err(DispatchError::Timeout(limit.as_secs()));
                }
            },
            None => task.await,
        };

        match joined {
            Ok(result) => result.map_err(DispatchError::from),
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    panic_message(join_err.into_panic())
                } else {
                    "execution task was cancelled".to_string()
                };
                tracing::error!(capability = %name, error = %message, "Handler panicked");
                Err(DispatchError::Panicked(message))
            }
        }
    }
}

/// Fill blank parameters from ambient context under matching names.
///
/// Blank mirrors the caller omitting the value: missing, null, or an empty
/// string/object/array. Explicitly supplied values are never overwritten.
fn inject_context(
    handler: &dyn CapabilityHandler,
    mut arguments: Value,
    ambient: &AmbientContext,
) -> Value {
    if let Some(obj) = arguments.as_object_mut() {
        for key in handler.context_keys() {
            if !is_blank(obj.get(*key)) {
                continue;
            }
            if let Some(value) = ambient.get(key) {
                tracing::debug!(capability = handler.name(), key = %key, "Injected ambient context value");
                obj.insert((*key).to_string(), value.clone());
            }
        }
    }
    arguments
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Object(m)) => m.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(_) => false,
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
