mod ack_type;
mod coding;
mod delivery_result;
mod protocol_id;
mod ussd_phase;
mod ussd_type;

pub use ack_type::AckType;
pub use coding::Coding;
pub use delivery_result::DeliveryResult;
pub use protocol_id::ProtocolId;
pub use ussd_phase::UssdPhase;
pub use ussd_type::UssdType;
