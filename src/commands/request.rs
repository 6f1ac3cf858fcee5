// ABOUTME: Client-originated SSMI commands with their wire ids, field order and declared defaults
// ABOUTME: Generated through ssmi_commands! so descriptors and typed structs cannot drift apart

use super::Defaults;

ssmi_commands! {
    direction: Request;

    /// Authenticate the session
    Login => "LOGIN", "1", [username, password];
    /// Plain text SMS
    SendSms => "SEND_SMS", "2", [validity, msisdn, message];
    /// Link health probe, answered with an ACK of type 2
    LinkCheck => "LINK_CHECK", "3", [];
    /// Binary SMS with explicit protocol id and coding
    SendBinarySms => "SEND_BINARY_SMS", "4", [validity, msisdn, pid, coding, hex_msg];
    /// End the session
    Logout => "LOGOUT", "99", [];
    SendUssdMessage => "SEND_USSD_MESSAGE", "110", [msisdn, ussd_type as "type", message];
    SendMmsMessage => "SEND_MMS_MESSAGE", "111", [msisdn, subject, name, content];
    SendWapPushMessage => "SEND_WAP_PUSH_MESSAGE", "112", [msisdn, subject, url];
    SendExtendedUssdMessage => "SEND_EXTENDED_USSD_MESSAGE", "120", [msisdn, ussd_type as "type", genfields, message];
    /// Resolve the IMSI behind an MSISDN
    ImsiLookup => "IMSI_LOOKUP", "600", [sequence, msisdn, imsi];
}

impl SendSms {
    pub const DEFAULTS: Defaults = &[("validity", "0")];
}

impl SendBinarySms {
    // Standard protocol id, 8-bit coding
    pub const DEFAULTS: Defaults = &[("validity", "0"), ("pid", "0"), ("coding", "246")];
}

impl SendExtendedUssdMessage {
    pub const DEFAULTS: Defaults = &[("genfields", "")];
}

impl ImsiLookup {
    pub const DEFAULTS: Defaults = &[("imsi", "")];
}
