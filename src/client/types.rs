// ABOUTME: Supporting types for SSMI client operations including message builders and events
// ABOUTME: Provides simplified interfaces for common SSMI operations with sensible defaults

use crate::codec::{CodecError, Command, TypedCommand};
use crate::commands::response::{
    Ack, BinaryMo, Dr, ExtendedUssdMessage, FreeForm, Logout, Mo, Nack, PremiumBinaryMo,
    PremiumMo, UssdMessage,
};
use crate::datatypes::{Coding, ProtocolId};

/// Binary SMS for `send_binary_message`
///
/// Only the destination and hex payload are required; validity, protocol id
/// and coding fall back to the command's declared defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMessage {
    /// Destination phone number
    pub msisdn: String,
    /// Hex encoded payload
    pub hex_msg: String,
    pub validity: Option<u32>,
    pub protocol_id: Option<ProtocolId>,
    pub coding: Option<Coding>,
}

impl BinaryMessage {
    pub fn new(msisdn: impl Into<String>, hex_msg: impl Into<String>) -> Self {
        Self {
            msisdn: msisdn.into(),
            hex_msg: hex_msg.into(),
            validity: None,
            protocol_id: None,
            coding: None,
        }
    }

    /// Create a builder for constructing binary messages
    pub fn builder() -> BinaryMessageBuilder {
        BinaryMessageBuilder::default()
    }

    pub fn with_validity(mut self, validity: u32) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn with_protocol_id(mut self, protocol_id: ProtocolId) -> Self {
        self.protocol_id = Some(protocol_id);
        self
    }

    pub fn with_coding(mut self, coding: Coding) -> Self {
        self.coding = Some(coding);
        self
    }

    /// Explicitly set fields, ready to be layered over the defaults
    pub(crate) fn into_values(self) -> Vec<(&'static str, String)> {
        let mut values = vec![("msisdn", self.msisdn), ("hex_msg", self.hex_msg)];
        if let Some(validity) = self.validity {
            values.push(("validity", validity.to_string()));
        }
        if let Some(protocol_id) = self.protocol_id {
            values.push(("pid", protocol_id.to_string()));
        }
        if let Some(coding) = self.coding {
            values.push(("coding", coding.to_string()));
        }
        values
    }
}

/// Builder for constructing binary messages with fluent API
#[derive(Debug, Default)]
pub struct BinaryMessageBuilder {
    msisdn: Option<String>,
    hex_msg: Option<String>,
    validity: Option<u32>,
    protocol_id: Option<ProtocolId>,
    coding: Option<Coding>,
}

impl BinaryMessageBuilder {
    pub fn to(mut self, msisdn: impl Into<String>) -> Self {
        self.msisdn = Some(msisdn.into());
        self
    }

    /// Raw payload bytes, hex encoded for the wire
    pub fn payload(mut self, bytes: &[u8]) -> Self {
        self.hex_msg = Some(bytes.iter().map(|b| format!("{b:02X}")).collect());
        self
    }

    pub fn hex(mut self, hex_msg: impl Into<String>) -> Self {
        self.hex_msg = Some(hex_msg.into());
        self
    }

    pub fn validity(mut self, validity: u32) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn protocol_id(mut self, protocol_id: ProtocolId) -> Self {
        self.protocol_id = Some(protocol_id);
        self
    }

    pub fn coding(mut self, coding: Coding) -> Self {
        self.coding = Some(coding);
        self
    }

    pub fn build(self) -> Result<BinaryMessage, CodecError> {
        let msisdn = self.msisdn.ok_or(CodecError::InvalidField {
            field: "msisdn",
            reason: "destination is required".to_string(),
        })?;
        let hex_msg = self.hex_msg.ok_or(CodecError::InvalidField {
            field: "hex_msg",
            reason: "payload is required".to_string(),
        })?;

        if hex_msg.len() % 2 != 0 || !hex_msg.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CodecError::InvalidField {
                field: "hex_msg",
                reason: "payload must be an even number of hex digits".to_string(),
            });
        }

        Ok(BinaryMessage {
            msisdn,
            hex_msg,
            validity: self.validity,
            protocol_id: self.protocol_id,
            coding: self.coding,
        })
    }
}

/// Acknowledgement-class reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckReply {
    Ack(Ack),
    Nack(Nack),
}

/// Outcome of `authenticate`
///
/// Rejection is a value: inspect `reply` for the gateway's reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    pub authenticated: bool,
    pub reply: AckReply,
}

/// Unsolicited inbound traffic queued for the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// ACK with nobody waiting on it, including link-check responses
    Ack(Ack),
    Nack(Nack),
    MobileOriginated(Mo),
    DeliveryReport(Dr),
    FreeForm(FreeForm),
    BinaryMobileOriginated(BinaryMo),
    PremiumMobileOriginated(PremiumMo),
    PremiumBinaryMobileOriginated(PremiumBinaryMo),
    Ussd(UssdMessage),
    ExtendedUssd(ExtendedUssdMessage),
    /// Gateway ended the session
    Logout(Logout),
}

impl Event {
    /// The event as a wire-level command
    pub fn to_command(&self) -> Command {
        match self.clone() {
            Event::Ack(c) => c.into_command(),
            Event::Nack(c) => c.into_command(),
            Event::MobileOriginated(c) => c.into_command(),
            Event::DeliveryReport(c) => c.into_command(),
            Event::FreeForm(c) => c.into_command(),
            Event::BinaryMobileOriginated(c) => c.into_command(),
            Event::PremiumMobileOriginated(c) => c.into_command(),
            Event::PremiumBinaryMobileOriginated(c) => c.into_command(),
            Event::Ussd(c) => c.into_command(),
            Event::ExtendedUssd(c) => c.into_command(),
            Event::Logout(c) => c.into_command(),
        }
    }
}
