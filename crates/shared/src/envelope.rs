use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Uniform reply wrapper returned by every backend endpoint.
///
/// `data` is only meaningful when `success` is true. Payload shapes differ per
/// endpoint, so the default parameter keeps the payload as raw JSON and lets the
/// caller decode it with [`Envelope::decode_data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = serde_json::Value> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Successful reply without a payload (e.g. DELETE)
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// The payload, only if the call succeeded
    pub fn into_data(self) -> Option<T> {
        if self.success {
            self.data
        } else {
            None
        }
    }

    /// Non-empty error text carried by the envelope
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.trim().is_empty())
    }
}

impl Envelope<serde_json::Value> {
    /// Decode the raw payload into an endpoint-specific type.
    ///
    /// Returns `Ok(None)` when the envelope is a failure or carries no data.
    pub fn decode_data<D: DeserializeOwned>(&self) -> Result<Option<D>, serde_json::Error> {
        match (&self.data, self.success) {
            (Some(value), true) if !value.is_null() => serde_json::from_value(value.clone()).map(Some),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_success_with_data() {
        let env: Envelope = serde_json::from_str(r#"{"success":true,"data":{"answer":"3"}}"#).unwrap();
        assert!(env.success);
        assert_eq!(env.data, Some(json!({"answer": "3"})));
        assert_eq!(env.error, None);
    }

    #[test]
    fn test_envelope_failure_without_data() {
        let env: Envelope = serde_json::from_str(r#"{"success":false,"error":"ת.ז כפולה"}"#).unwrap();
        assert!(!env.success);
        assert_eq!(env.error_message(), Some("ת.ז כפולה"));
        assert_eq!(env.clone().into_data(), None);
    }

    #[test]
    fn test_envelope_blank_error_is_ignored() {
        let env: Envelope = serde_json::from_str(r#"{"success":false,"error":"  "}"#).unwrap();
        assert_eq!(env.error_message(), None);
    }

    #[test]
    fn test_envelope_serialization_omits_empty_fields() {
        let json = serde_json::to_string(&Envelope::<serde_json::Value>::empty()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }

    #[test]
    fn test_decode_data_skips_failures_and_null() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Payload {
            n: u32,
        }

        let ok: Envelope = Envelope::ok(json!({"n": 7}));
        assert_eq!(ok.decode_data::<Payload>().unwrap(), Some(Payload { n: 7 }));

        let null: Envelope = serde_json::from_str(r#"{"success":true,"data":null}"#).unwrap();
        assert_eq!(null.decode_data::<Payload>().unwrap(), None);

        let failed: Envelope = Envelope::failure("boom");
        assert_eq!(failed.decode_data::<Payload>().unwrap(), None);

        let wrong: Envelope = Envelope::ok(json!({"n": "seven"}));
        assert!(wrong.decode_data::<Payload>().is_err());
    }
}
