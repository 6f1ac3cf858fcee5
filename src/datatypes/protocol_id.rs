// ABOUTME: Defines the SSMI protocol identifier values for binary messages

use num_enum::TryFromPrimitive;

#[derive(TryFromPrimitive)]
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProtocolId {
    Standard = 0,
    Enhanced = 15,
}

impl_wire_code!(ProtocolId, u16);
