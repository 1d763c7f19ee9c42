//! Shipping address value type.
//!
//! Field names are camelCase on the wire - the same shape is used by the
//! public API body and by the `orderUpdate` GraphQL input, so the extension
//! payload passes through without remapping.

use serde::{Deserialize, Serialize};

/// A customer shipping address as submitted by the checkout extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_extension_payload() {
        let json = r#"{
            "firstName": "Jane",
            "lastName": "Doe",
            "address1": "123 Main St",
            "city": "Ottawa",
            "zip": "K1A 0B1"
        }"#;

        let address: ShippingAddress = serde_json::from_str(json).expect("valid payload");
        assert_eq!(address.first_name.as_deref(), Some("Jane"));
        assert_eq!(address.zip.as_deref(), Some("K1A 0B1"));
        assert_eq!(address.address2, None);
    }

    #[test]
    fn test_serializes_camel_case_and_skips_missing_fields() {
        let address = ShippingAddress {
            first_name: Some("Jane".into()),
            zip: Some("K1A 0B1".into()),
            ..ShippingAddress::default()
        };

        let json = serde_json::to_value(&address).expect("serialize");
        assert_eq!(json["firstName"], "Jane");
        assert!(json.get("lastName").is_none());
    }
}
