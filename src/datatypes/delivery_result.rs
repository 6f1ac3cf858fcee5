// ABOUTME: Defines delivery report result codes carried in the DR `ret_code` field
// ABOUTME: Only Success means the handset received the message

use num_enum::TryFromPrimitive;

/// Outcome reported by a `DR` (delivery report)
#[derive(TryFromPrimitive)]
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryResult {
    Success = 0,
    /// Validity period elapsed before delivery
    Expired = 1,
    SimFull = 2,
    DestinationBarred = 3,
    InvalidDestination = 4,
    Blacklisted = 5,
}

impl DeliveryResult {
    pub fn is_success(&self) -> bool {
        *self == DeliveryResult::Success
    }
}

impl_wire_code!(DeliveryResult, u16);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_result_codes() {
        assert_eq!("0".parse::<DeliveryResult>().unwrap(), DeliveryResult::Success);
        assert_eq!("5".parse::<DeliveryResult>().unwrap(), DeliveryResult::Blacklisted);
        assert!(DeliveryResult::Success.is_success());
        assert!(!DeliveryResult::Expired.is_success());
        assert!("6".parse::<DeliveryResult>().is_err());
    }
}
