// ABOUTME: Defines the USSD phase reported on inbound USSD messages

use num_enum::TryFromPrimitive;

#[derive(TryFromPrimitive)]
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UssdPhase {
    Unknown = 0,
    Phase1 = 1,
    Phase2 = 2,
}

impl_wire_code!(UssdPhase, u16);
