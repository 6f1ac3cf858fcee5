// ABOUTME: Defines the SSMI binary message coding field values
// ABOUTME: Distinguishes GSM 7-bit packed payloads from raw 8-bit data

use num_enum::TryFromPrimitive;

/// Data coding of a binary SMS payload (`coding` field)
///
/// Used by `SEND_BINARY_SMS` and reported back on `BINARY_MO` and
/// `PREMIUM_BINARY_MO`.
#[derive(TryFromPrimitive)]
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Coding {
    /// GSM 7-bit default alphabet
    SevenBit = 0,
    /// 8-bit binary data
    EightBit = 246,
}

impl_wire_code!(Coding, u16);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coding_wire_form() {
        assert_eq!(Coding::SevenBit.to_string(), "0");
        assert_eq!(Coding::EightBit.to_string(), "246");
        assert_eq!("246".parse::<Coding>().unwrap(), Coding::EightBit);
        assert!("8".parse::<Coding>().is_err());
    }
}
