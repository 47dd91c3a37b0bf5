// jmap-core/src/extract.rs
use crate::error::{MethodError, MethodErrorType, Result};
use crate::types::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Decode the result of one method call out of a (possibly combined) response.
///
/// The first invocation whose method name and call id both match is used.
/// A missing pair is a `notFound` method error; a payload that does not
/// decode as `T` is a `serverFail` method error. Both carry `call_id`.
pub fn extract<T: DeserializeOwned>(
    response: &Response,
    method_name: &str,
    call_id: &str,
) -> Result<T> {
    let arguments = extract_value(response, method_name, call_id)?;
    T::deserialize(arguments).map_err(|e| {
        MethodError::new(MethodErrorType::ServerFail, call_id)
            .with_description(format!("invalid {} response: {}", method_name, e))
            .into()
    })
}

/// Raw result arguments for `method_name` / `call_id`.
pub fn extract_value<'a>(
    response: &'a Response,
    method_name: &str,
    call_id: &str,
) -> Result<&'a Value> {
    response
        .method_response(method_name, call_id)
        .map(|inv| &inv.arguments)
        .ok_or_else(|| {
            MethodError::new(MethodErrorType::NotFound, call_id)
                .with_description(format!("no {} response for call {}", method_name, call_id))
                .into()
        })
}
