use serde::Serialize;
use tracing::{debug, error};

use crate::constants::{INTERNAL_ERROR, OK_RESPONSE};
use crate::error::CustomError;
use crate::utils::{message, ser_to_str};

pub type Response = (String, String);

pub fn ok<T: Serialize>(payload: &T) -> Response {
    match ser_to_str(payload) {
        Ok(json) => (OK_RESPONSE.to_string(), json),
        Err(e) => {
            error!(error = %e, "serde error");
            (INTERNAL_ERROR.to_string(), message("Internal Server Error"))
        }
    }
}

pub fn error(err: &CustomError) -> Response {
    let status = err.status_line();
    if status == INTERNAL_ERROR {
        error!(error = ?err, "request failed");
    } else {
        debug!(error = ?err, "request rejected");
    }
    (status.to_string(), message(&err.public_message()))
}

pub fn respond<T: Serialize>(result: Result<T, CustomError>) -> Response {
    match result {
        Ok(payload) => ok(&payload),
        Err(err) => error(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BAD_REQUEST, NOT_FOUND};

    #[test]
    fn ok_serializes_payload() {
        let (status, body) = ok(&serde_json::json!({ "message": "success" }));
        assert_eq!(status, OK_RESPONSE);
        assert_eq!(body, r#"{"message":"success"}"#);
    }

    #[test]
    fn errors_use_message_shape() {
        let (status, body) = respond::<()>(Err(CustomError::SelfTransfer));
        assert_eq!(status, BAD_REQUEST);
        assert_eq!(body, r#"{"message":"Can not transfer to same beneficiary"}"#);

        let (status, _) = respond::<()>(Err(CustomError::UserNotFound));
        assert_eq!(status, NOT_FOUND);
    }
}
