// ABOUTME: Server-originated SSMI commands covering acknowledgements, inbound messages and lookups
// ABOUTME: Typed accessors expose the enumerated codes carried as plain strings on the wire

use crate::datatypes::{AckType, Coding, DeliveryResult, ProtocolId, UssdPhase, UssdType};

ssmi_commands! {
    direction: Response;

    /// Acknowledges a message send; correlated to the request by msisdn
    Seq => "SEQ", "100", [msisdn, sequence];
    Ack => "ACK", "101", [ack_type];
    Nack => "NACK", "102", [nack_type];
    /// Mobile originated text message
    Mo => "MO", "103", [msisdn, sequence, message];
    /// Delivery report
    Dr => "DR", "104", [msisdn, sequence, ret_code];
    FreeForm => "FREE_FORM", "105", [text];
    BinaryMo => "BINARY_MO", "106", [msisdn, sequence, pid, coding, hex_msg];
    PremiumMo => "PREMIUM_MO", "107", [msisdn, sequence, destination, message];
    PremiumBinaryMo => "PREMIUM_BINARY_MO", "108", [msisdn, sequence, pid, coding, destination, hex_msg];
    UssdMessage => "USSD_MESSAGE", "110", [msisdn, ussd_type as "type", phase, message];
    ExtendedUssdMessage => "EXTENDED_USSD_MESSAGE", "111", [msisdn, ussd_type as "type", phase, genfields, message];
    /// Server initiated logout
    Logout => "LOGOUT", "199", [ip];
    ImsiLookupReply => "IMSI_LOOKUP_REPLY", "600", [sequence, msisdn, imsi, spid];
}

impl Ack {
    pub fn kind(&self) -> Option<AckType> {
        self.ack_type.parse().ok()
    }

    pub fn is_login_ok(&self) -> bool {
        self.kind() == Some(AckType::LoginOk)
    }
}

impl Dr {
    pub fn result(&self) -> Option<DeliveryResult> {
        self.ret_code.parse().ok()
    }
}

impl BinaryMo {
    pub fn protocol_id(&self) -> Option<ProtocolId> {
        self.pid.parse().ok()
    }

    pub fn data_coding(&self) -> Option<Coding> {
        self.coding.parse().ok()
    }
}

impl PremiumBinaryMo {
    pub fn protocol_id(&self) -> Option<ProtocolId> {
        self.pid.parse().ok()
    }

    pub fn data_coding(&self) -> Option<Coding> {
        self.coding.parse().ok()
    }
}

impl UssdMessage {
    pub fn session_type(&self) -> Option<UssdType> {
        self.ussd_type.parse().ok()
    }

    pub fn session_phase(&self) -> Option<UssdPhase> {
        self.phase.parse().ok()
    }
}

impl ExtendedUssdMessage {
    pub fn session_type(&self) -> Option<UssdType> {
        self.ussd_type.parse().ok()
    }

    pub fn session_phase(&self) -> Option<UssdPhase> {
        self.phase.parse().ok()
    }
}
