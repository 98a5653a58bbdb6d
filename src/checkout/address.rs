//! Shipping Address

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where an order ships to. Every field is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    /// Recipient name
    pub full_name: String,

    /// Street address
    pub address_line: String,

    /// City
    pub city: String,

    /// Postal PIN code
    pub pin_code: String,

    /// Contact phone number
    pub phone: String,
}

/// A required address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AddressField {
    /// `fullName`
    FullName,

    /// `addressLine`
    AddressLine,

    /// `city`
    City,

    /// `pinCode`
    PinCode,

    /// `phone`
    Phone,
}

impl AddressField {
    /// Wire name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullName => "fullName",
            Self::AddressLine => "addressLine",
            Self::City => "city",
            Self::PinCode => "pinCode",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ShippingAddress {
    /// First required field that is empty or whitespace, in form order.
    pub fn first_missing_field(&self) -> Option<AddressField> {
        [
            (AddressField::FullName, &self.full_name),
            (AddressField::AddressLine, &self.address_line),
            (AddressField::City, &self.city),
            (AddressField::PinCode, &self.pin_code),
            (AddressField::Phone, &self.phone),
        ]
        .into_iter()
        .find_map(|(field, value)| value.trim().is_empty().then_some(field))
    }
}
