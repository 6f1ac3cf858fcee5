// ABOUTME: Defines USSD session type codes carried in the `type` field of USSD commands
// ABOUTME: Also knows which of them a client may use to drive an extended USSD session

use num_enum::TryFromPrimitive;

/// USSD session type
///
/// A client steering an extended USSD session may only open it, continue it
/// or end it; the remaining values are reported by the gateway.
#[derive(TryFromPrimitive)]
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UssdType {
    /// Session start
    New = 1,
    /// Continue an open session
    Response = 2,
    End = 3,
    Timeout = 4,
    Redirect = 5,
    /// Network initiated session
    Initiate = 6,
}

impl UssdType {
    /// Whether a client may send this type on `SEND_EXTENDED_USSD_MESSAGE`
    pub fn is_client_session_type(&self) -> bool {
        matches!(self, UssdType::New | UssdType::Response | UssdType::End)
    }
}

impl_wire_code!(UssdType, u16);
