// ABOUTME: Defines ACK sub-types sent by the gateway in reply to LOGIN and LINK_CHECK

use num_enum::TryFromPrimitive;

/// Sub-type carried by an `ACK` reply
#[derive(TryFromPrimitive)]
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AckType {
    /// LOGIN accepted
    LoginOk = 1,
    /// Answer to LINK_CHECK
    LinkCheckResponse = 2,
}

impl_wire_code!(AckType, u16);
