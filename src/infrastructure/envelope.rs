// Response envelope decoding
//
// The backend answers with a bare array, `{ data: ... }` or `{ result: ... }`,
// optionally carrying `statusCode` and `message`.
use crate::application::incubation_api::ApiError;
use crate::domain::dashboard::Row;
use serde::de::DeserializeOwned;
use serde_json::Value;

const SUCCESS: u64 = 200;
const PAYLOAD_KEYS: [&str; 2] = ["data", "result"];

/// Fail on an explicit non-success `statusCode`
pub fn check_status(path: &str, body: &Value) -> Result<(), ApiError> {
    let Some(status) = body.get("statusCode").and_then(Value::as_u64) else {
        return Ok(());
    };
    if status == SUCCESS {
        return Ok(());
    }

    Err(ApiError::Status {
        path: path.to_string(),
        status: u16::try_from(status).unwrap_or(u16::MAX),
        message: message_of(body).unwrap_or_default(),
    })
}

pub fn message_of(body: &Value) -> Option<String> {
    body.get("message").and_then(Value::as_str).map(str::to_string)
}

/// Extract the payload: the body itself when it is an array, else `data`, else `result`
pub fn decode_envelope(path: &str, body: Value) -> Result<Value, ApiError> {
    if body.is_array() {
        return Ok(body);
    }
    check_status(path, &body)?;

    let Value::Object(mut fields) = body else {
        return Err(ApiError::UnexpectedShape {
            path: path.to_string(),
        });
    };
    PAYLOAD_KEYS
        .iter()
        .filter_map(|key| fields.remove(*key))
        .find(|payload| !payload.is_null())
        .ok_or_else(|| ApiError::UnexpectedShape {
            path: path.to_string(),
        })
}

/// Decode a list payload, skipping null entries
pub fn decode_list<T: DeserializeOwned>(path: &str, body: Value) -> Result<Vec<T>, ApiError> {
    let Value::Array(items) = decode_envelope(path, body)? else {
        return Err(ApiError::UnexpectedShape {
            path: path.to_string(),
        });
    };

    items
        .into_iter()
        .filter(|item| !item.is_null())
        .map(|item| {
            serde_json::from_value(item).map_err(|e| ApiError::Decode {
                path: path.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

pub fn decode_rows(path: &str, body: Value) -> Result<Vec<Row>, ApiError> {
    decode_list(path, body)
}
