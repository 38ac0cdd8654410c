//! Authentication for the two trust domains.
//!
//! Devices present tokens minted by [`DeviceTokenIssuer`]. Operators present
//! either the admin Basic credential or a dashboard-issued bearer token,
//! checked by [`OperatorVerifier`].

pub mod credential;
pub mod device_token;
pub mod operator;
pub mod password;

pub use credential::Credential;
pub use device_token::{DeviceClaims, DeviceTokenIssuer, TokenError};
pub use operator::{Operator, OperatorVerifier, Role, authorize};
