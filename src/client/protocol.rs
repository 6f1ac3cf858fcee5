// ABOUTME: SSMI connection state machine owning authentication, correlation and link checks
// ABOUTME: Encodes typed sends onto a transport and dispatches decoded inbound lines to handlers

use crate::client::error::{SsmiError, SsmiResult};
use crate::client::link_check::{LinkCheckConfig, LinkCheckManager, LinkCheckStatus, LinkCheckTick};
use crate::client::types::{AckReply, Authentication, BinaryMessage, Event};
use crate::clock::{Clock, SystemClock};
use crate::codec::{CodecError, Command, TypedCommand};
use crate::commands::request::{
    ImsiLookup, LinkCheck, Login, Logout, SendBinarySms, SendExtendedUssdMessage, SendMmsMessage,
    SendSms, SendUssdMessage, SendWapPushMessage,
};
use crate::commands::response::{self, Ack, ImsiLookupReply, Nack, Seq};
use crate::correlation::{CorrelationMap, PendingReply};
use crate::datatypes::{AckType, UssdType};
use crate::payload::{Passthrough, PayloadCodec};
use crate::registry::Direction;
use crate::transport::Transport;
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Upper bound (exclusive) for generated IMSI lookup sequence numbers
const MAX_GENERATED_SEQUENCE: u32 = 10_000_000;

/// Session state of one physical connection
///
/// ```text
/// Unauthenticated ⇄ Authenticated
///        ↓                ↓
///      Disconnected (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, no successful login yet (or logged out)
    Unauthenticated,
    Authenticated,
    /// Transport gone; every operation fails from here on
    Disconnected,
}

/// Inbound command handler
pub type Handler<T, C> = fn(&mut SsmiProtocol<T, C>, Command) -> SsmiResult<()>;

/// Explicit mapping from inbound command name to handler.
///
/// A registered command without an entry fails dispatch with
/// `UnhandledCommand` instead of being dropped.
pub struct HandlerTable<T, C> {
    handlers: HashMap<&'static str, Handler<T, C>>,
}

impl<T: Transport, C: Clock> HandlerTable<T, C> {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Handlers for every server-originated command
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.insert(Seq::DESCRIPTOR.name, handle_seq::<T, C>);
        table.insert(Ack::DESCRIPTOR.name, handle_ack::<T, C>);
        table.insert(Nack::DESCRIPTOR.name, handle_nack::<T, C>);
        table.insert(response::Mo::DESCRIPTOR.name, handle_mo::<T, C>);
        table.insert(response::Dr::DESCRIPTOR.name, handle_dr::<T, C>);
        table.insert(response::FreeForm::DESCRIPTOR.name, handle_free_form::<T, C>);
        table.insert(response::BinaryMo::DESCRIPTOR.name, handle_binary_mo::<T, C>);
        table.insert(response::PremiumMo::DESCRIPTOR.name, handle_premium_mo::<T, C>);
        table.insert(
            response::PremiumBinaryMo::DESCRIPTOR.name,
            handle_premium_binary_mo::<T, C>,
        );
        table.insert(response::UssdMessage::DESCRIPTOR.name, handle_ussd_message::<T, C>);
        table.insert(
            response::ExtendedUssdMessage::DESCRIPTOR.name,
            handle_extended_ussd_message::<T, C>,
        );
        table.insert(response::Logout::DESCRIPTOR.name, handle_logout::<T, C>);
        table.insert(ImsiLookupReply::DESCRIPTOR.name, handle_imsi_lookup_reply::<T, C>);
        table
    }

    pub fn insert(&mut self, name: &'static str, handler: Handler<T, C>) -> Option<Handler<T, C>> {
        self.handlers.insert(name, handler)
    }

    pub fn remove(&mut self, name: &str) -> Option<Handler<T, C>> {
        self.handlers.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Handler<T, C>> {
        self.handlers.get(name).copied()
    }
}

/// SSMI client-side protocol engine for one connection.
///
/// Owns all connection state and is driven from a single task: inbound lines
/// arrive through [`line_received`](Self::line_received), timer ticks through
/// [`poll_link_check`](Self::poll_link_check), and sends are plain method
/// calls that write to the [`Transport`] without blocking. Replies that the
/// protocol correlates come back as [`PendingReply`] handles.
pub struct SsmiProtocol<T, C = SystemClock> {
    transport: T,
    clock: C,
    payload_codec: Arc<dyn PayloadCodec>,
    state: ConnectionState,
    link_check: LinkCheckManager,
    sequence_replies: CorrelationMap<Seq>,
    imsi_replies: CorrelationMap<ImsiLookupReply>,
    pending_auth: VecDeque<oneshot::Sender<Authentication>>,
    events: VecDeque<Event>,
    handlers: HandlerTable<T, C>,
}

impl<T: Transport, C: Clock> SsmiProtocol<T, C> {
    pub fn new(transport: T, clock: C) -> Self {
        Self {
            transport,
            clock,
            payload_codec: Arc::new(Passthrough),
            state: ConnectionState::Unauthenticated,
            link_check: LinkCheckManager::new(LinkCheckConfig::default()),
            sequence_replies: CorrelationMap::new("sequence replies"),
            imsi_replies: CorrelationMap::new("imsi lookups"),
            pending_auth: VecDeque::new(),
            events: VecDeque::new(),
            handlers: HandlerTable::standard(),
        }
    }

    pub fn with_link_check(mut self, config: LinkCheckConfig) -> Self {
        self.link_check = LinkCheckManager::new(config);
        self
    }

    pub fn with_payload_codec(mut self, codec: Arc<dyn PayloadCodec>) -> Self {
        self.payload_codec = codec;
        self
    }

    pub fn with_handlers(mut self, handlers: HandlerTable<T, C>) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == ConnectionState::Authenticated
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Encode and write one command
    pub fn send_command(&mut self, command: &Command) -> SsmiResult<()> {
        if self.state == ConnectionState::Disconnected {
            return Err(SsmiError::InvalidState(format!(
                "cannot send {} on a disconnected session",
                command.name()
            )));
        }

        let line = command.encode();
        debug!(">> {}: {}", command.name(), line);
        self.transport.write_line(&line)
    }

    pub fn login(&mut self, username: &str, password: &str) -> SsmiResult<()> {
        let login = Login {
            username: username.to_owned(),
            password: password.to_owned(),
        };
        self.send_command(&login.into_command())
    }

    /// Send LOGIN and resolve on the next ACK or NACK.
    ///
    /// The session becomes authenticated only for an ACK of type login-ok.
    /// A rejection resolves normally with `authenticated == false`.
    pub fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> SsmiResult<PendingReply<Authentication>> {
        self.login(username, password)?;

        let (sender, receiver) = oneshot::channel();
        self.pending_auth.push_back(sender);
        Ok(PendingReply::new(username, receiver))
    }

    /// Send LOGOUT; the session drops back to unauthenticated immediately
    pub fn logout(&mut self) -> SsmiResult<()> {
        self.send_command(&Logout {}.into_command())?;
        if self.state == ConnectionState::Authenticated {
            info!("Logged out");
            self.state = ConnectionState::Unauthenticated;
        }
        Ok(())
    }

    /// Plain text SMS; validity defaults to 0.
    ///
    /// The gateway answers with a SEQ for the msisdn; the handle may be
    /// dropped if the caller does not care.
    pub fn send_message(
        &mut self,
        msisdn: &str,
        message: &str,
        validity: Option<u32>,
    ) -> SsmiResult<PendingReply<Seq>> {
        let mut values = vec![
            ("msisdn", msisdn.to_owned()),
            ("message", self.payload_codec.encode(message)?),
        ];
        if let Some(validity) = validity {
            values.push(("validity", validity.to_string()));
        }

        let command = Command::build(SendSms::DESCRIPTOR, values, SendSms::DEFAULTS)?;
        self.send_correlated(&command)
    }

    pub fn send_binary_message(&mut self, message: BinaryMessage) -> SsmiResult<PendingReply<Seq>> {
        let command = Command::build(
            SendBinarySms::DESCRIPTOR,
            message.into_values(),
            SendBinarySms::DEFAULTS,
        )?;
        self.send_correlated(&command)
    }

    pub fn send_ussd_message(
        &mut self,
        msisdn: &str,
        message: &str,
        ussd_type: UssdType,
    ) -> SsmiResult<PendingReply<Seq>> {
        let command = SendUssdMessage {
            msisdn: msisdn.to_owned(),
            ussd_type: ussd_type.to_string(),
            message: self.payload_codec.encode(message)?,
        }
        .into_command();
        self.send_correlated(&command)
    }

    /// Extended USSD; `session_type` must be new, continue (response) or end.
    pub fn send_extended_ussd_message(
        &mut self,
        msisdn: &str,
        message: &str,
        session_type: UssdType,
        genfields: Option<&str>,
    ) -> SsmiResult<PendingReply<Seq>> {
        if !session_type.is_client_session_type() {
            return Err(CodecError::InvalidField {
                field: "type",
                reason: format!(
                    "session type {session_type:?} is not one of New, Response or End"
                ),
            }
            .into());
        }

        let mut values = vec![
            ("msisdn", msisdn.to_owned()),
            ("type", session_type.to_string()),
            ("message", self.payload_codec.encode(message)?),
        ];
        if let Some(genfields) = genfields {
            values.push(("genfields", genfields.to_owned()));
        }

        let command = Command::build(
            SendExtendedUssdMessage::DESCRIPTOR,
            values,
            SendExtendedUssdMessage::DEFAULTS,
        )?;
        self.send_correlated(&command)
    }

    pub fn send_wap_push_message(
        &mut self,
        msisdn: &str,
        subject: &str,
        url: &str,
    ) -> SsmiResult<PendingReply<Seq>> {
        let command = SendWapPushMessage {
            msisdn: msisdn.to_owned(),
            subject: subject.to_owned(),
            url: url.to_owned(),
        }
        .into_command();
        self.send_correlated(&command)
    }

    pub fn send_mms_message(
        &mut self,
        msisdn: &str,
        subject: &str,
        name: &str,
        content: &str,
    ) -> SsmiResult<PendingReply<Seq>> {
        let command = SendMmsMessage {
            msisdn: msisdn.to_owned(),
            subject: subject.to_owned(),
            name: name.to_owned(),
            content: content.to_owned(),
        }
        .into_command();
        self.send_correlated(&command)
    }

    /// Look up the IMSI for `msisdn`.
    ///
    /// Without an explicit `sequence` a random one not currently in flight is
    /// chosen; the reply is correlated on it (see [`PendingReply::key`]).
    pub fn imsi_lookup(
        &mut self,
        msisdn: &str,
        imsi: Option<&str>,
        sequence: Option<u32>,
    ) -> SsmiResult<PendingReply<ImsiLookupReply>> {
        let sequence = match sequence {
            Some(sequence) => sequence.to_string(),
            None => self.generate_sequence(),
        };

        let mut values = vec![("sequence", sequence.clone()), ("msisdn", msisdn.to_owned())];
        if let Some(imsi) = imsi {
            values.push(("imsi", imsi.to_owned()));
        }

        let command = Command::build(ImsiLookup::DESCRIPTOR, values, ImsiLookup::DEFAULTS)?;
        self.send_command(&command)?;
        Ok(self.imsi_replies.wait(&sequence))
    }

    /// Send LINK_CHECK now, outside the timer
    pub fn link_check(&mut self) -> SsmiResult<()> {
        self.send_command(&LinkCheck {}.into_command())?;
        self.link_check.on_check_sent();
        Ok(())
    }

    /// Arm the periodic link check. Returns false if configuration disables it.
    pub fn start_link_check(&mut self) -> bool {
        let now = self.clock.now();
        self.link_check.start(now)
    }

    pub fn stop_link_check(&mut self) {
        self.link_check.stop();
    }

    /// Fire the link-check timer if due.
    ///
    /// While unauthenticated a due tick is dropped, not deferred.
    pub fn poll_link_check(&mut self) -> SsmiResult<LinkCheckTick> {
        let now = self.clock.now();
        let tick = self.link_check.poll(now, self.is_authenticated());
        if tick == LinkCheckTick::Due {
            self.link_check()?;
        }
        Ok(tick)
    }

    pub fn link_check_status(&self) -> LinkCheckStatus {
        self.link_check.status()
    }

    pub fn is_link_failed(&self) -> bool {
        self.link_check.is_link_failed()
    }

    /// Decode and dispatch one inbound line.
    ///
    /// A malformed line fails on its own; the session stays usable.
    pub fn line_received(&mut self, line: &str) -> SsmiResult<()> {
        let command = Command::decode(line, Direction::Response)?;
        debug!("<< {}: {}", command.name(), line);
        self.dispatch(command)
    }

    /// Route a decoded command to its handler
    pub fn dispatch(&mut self, command: Command) -> SsmiResult<()> {
        let handler = self
            .handlers
            .get(command.name())
            .ok_or_else(|| SsmiError::UnhandledCommand(command.name().to_owned()))?;
        handler(self, command)
    }

    pub fn next_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Replies still awaited across both correlation maps and authentication
    pub fn pending_replies(&self) -> usize {
        self.sequence_replies.waiting() + self.imsi_replies.waiting() + self.pending_auth.len()
    }

    /// Forget outstanding SEQ waiters and buffered SEQs for `msisdn`
    pub fn cancel_sequence_replies(&mut self, msisdn: &str) -> usize {
        self.sequence_replies.remove(msisdn)
    }

    pub fn cancel_imsi_lookup(&mut self, sequence: &str) -> usize {
        self.imsi_replies.remove(sequence)
    }

    /// Tear the session down after the transport went away.
    ///
    /// Every pending handle resolves with `ConnectionClosed`.
    pub fn connection_lost(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        let pending = self.pending_replies();
        if pending > 0 {
            warn!("Connection lost with {pending} replies outstanding");
        } else {
            info!("Connection closed");
        }

        self.state = ConnectionState::Disconnected;
        self.link_check.stop();
        self.sequence_replies.clear();
        self.imsi_replies.clear();
        self.pending_auth.clear();
    }

    fn send_correlated(&mut self, command: &Command) -> SsmiResult<PendingReply<Seq>> {
        self.send_command(command)?;
        let msisdn = command.get_field("msisdn")?;
        Ok(self.sequence_replies.wait(msisdn))
    }

    fn generate_sequence(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let sequence = rng.gen_range(1..MAX_GENERATED_SEQUENCE).to_string();
            if self.imsi_replies.get(&sequence).is_none() {
                return sequence;
            }
        }
    }

    fn queue_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    fn complete_authentication(&mut self, reply: AckReply) -> Result<(), AckReply> {
        let Some(waiter) = self.pending_auth.pop_front() else {
            return Err(reply);
        };

        let authenticated = matches!(&reply, AckReply::Ack(ack) if ack.is_login_ok());
        if self.state != ConnectionState::Disconnected {
            self.state = if authenticated {
                ConnectionState::Authenticated
            } else {
                ConnectionState::Unauthenticated
            };
        }

        if authenticated {
            info!("Authenticated");
        } else {
            info!("Authentication rejected: {:?}", reply);
        }

        if waiter.send(Authentication { authenticated, reply }).is_err() {
            debug!("Authentication result dropped by caller");
        }
        Ok(())
    }
}

fn handle_seq<T: Transport, C: Clock>(
    p: &mut SsmiProtocol<T, C>,
    command: Command,
) -> SsmiResult<()> {
    let seq: Seq = command.to_typed()?;
    let msisdn = seq.msisdn.clone();
    p.sequence_replies.resolve(&msisdn, seq);
    Ok(())
}

fn handle_ack<T: Transport, C: Clock>(
    p: &mut SsmiProtocol<T, C>,
    command: Command,
) -> SsmiResult<()> {
    let ack: Ack = command.to_typed()?;

    // An answer to our own LINK_CHECK is fully consumed here
    if ack.kind() == Some(AckType::LinkCheckResponse) && p.link_check.on_response() {
        return Ok(());
    }

    if let Err(AckReply::Ack(ack)) = p.complete_authentication(AckReply::Ack(ack)) {
        p.queue_event(Event::Ack(ack));
    }
    Ok(())
}

fn handle_nack<T: Transport, C: Clock>(
    p: &mut SsmiProtocol<T, C>,
    command: Command,
) -> SsmiResult<()> {
    let nack: Nack = command.to_typed()?;
    if let Err(AckReply::Nack(nack)) = p.complete_authentication(AckReply::Nack(nack)) {
        warn!("Unsolicited NACK: {}", nack.nack_type);
        p.queue_event(Event::Nack(nack));
    }
    Ok(())
}

fn handle_mo<T: Transport, C: Clock>(
    p: &mut SsmiProtocol<T, C>,
    command: Command,
) -> SsmiResult<()> {
    p.queue_event(Event::MobileOriginated(command.to_typed()?));
    Ok(())
}

fn handle_dr<T: Transport, C: Clock>(
    p: &mut SsmiProtocol<T, C>,
    command: Command,
) -> SsmiResult<()> {
    p.queue_event(Event::DeliveryReport(command.to_typed()?));
    Ok(())
}

fn handle_free_form<T: Transport, C: Clock>(
    p: &mut SsmiProtocol<T, C>,
    command: Command,
) -> SsmiResult<()> {
    p.queue_event(Event::FreeForm(command.to_typed()?));
    Ok(())
}

fn handle_binary_mo<T: Transport, C: Clock>(
    p: &mut SsmiProtocol<T, C>,
    command: Command,
) -> SsmiResult<()> {
    p.queue_event(Event::BinaryMobileOriginated(command.to_typed()?));
    Ok(())
}

fn handle_premium_mo<T: Transport, C: Clock>(
    p: &mut SsmiProtocol<T, C>,
    command: Command,
) -> SsmiResult<()> {
    p.queue_event(Event::PremiumMobileOriginated(command.to_typed()?));
    Ok(())
}

fn handle_premium_binary_mo<T: Transport, C: Clock>(
    p: &mut SsmiProtocol<T, C>,
    command: Command,
) -> SsmiResult<()> {
    p.queue_event(Event::PremiumBinaryMobileOriginated(command.to_typed()?));
    Ok(())
}

fn handle_ussd_message<T: Transport, C: Clock>(
    p: &mut SsmiProtocol<T, C>,
    command: Command,
) -> SsmiResult<()> {
    p.queue_event(Event::Ussd(command.to_typed()?));
    Ok(())
}

fn handle_extended_ussd_message<T: Transport, C: Clock>(
    p: &mut SsmiProtocol<T, C>,
    command: Command,
) -> SsmiResult<()> {
    p.queue_event(Event::ExtendedUssd(command.to_typed()?));
    Ok(())
}

fn handle_logout<T: Transport, C: Clock>(
    p: &mut SsmiProtocol<T, C>,
    command: Command,
) -> SsmiResult<()> {
    let logout: response::Logout = command.to_typed()?;
    if p.state == ConnectionState::Authenticated {
        info!("Gateway logged the session out (ip {})", logout.ip);
        p.state = ConnectionState::Unauthenticated;
    }
    p.queue_event(Event::Logout(logout));
    Ok(())
}

fn handle_imsi_lookup_reply<T: Transport, C: Clock>(
    p: &mut SsmiProtocol<T, C>,
    command: Command,
) -> SsmiResult<()> {
    let reply: ImsiLookupReply = command.to_typed()?;
    let sequence = reply.sequence.clone();
    p.imsi_replies.resolve(&sequence, reply);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::datatypes::{Coding, ProtocolId};
    use crate::payload::StrictAscii;
    use std::time::Duration;

    type TestProtocol = SsmiProtocol<Vec<String>, ManualClock>;

    fn protocol() -> TestProtocol {
        SsmiProtocol::new(Vec::new(), ManualClock::new())
    }

    fn authenticated() -> TestProtocol {
        let mut p = protocol();
        let mut auth = p.authenticate("u", "p").unwrap();
        p.line_received("SSMI,101,1").unwrap();
        assert!(auth.try_take().unwrap().unwrap().authenticated);
        p.transport_mut().clear();
        p
    }

    fn sent(p: &TestProtocol) -> Vec<Command> {
        p.transport()
            .iter()
            .map(|line| Command::decode(line, Direction::Request).unwrap())
            .collect()
    }

    #[test]
    fn test_login() {
        let mut p = protocol();
        p.login("username", "password").unwrap();
        assert_eq!(p.transport(), &vec!["SSMI,1,username,password".to_string()]);
        assert!(!p.is_authenticated());
    }

    #[test]
    fn test_authenticate_success() {
        let mut p = protocol();
        let mut auth = p.authenticate("u", "p").unwrap();
        assert_eq!(sent(&p)[0].name(), "LOGIN");
        assert!(auth.try_take().is_none());

        p.line_received("SSMI,101,1").unwrap();
        let outcome = auth.try_take().unwrap().unwrap();
        assert!(outcome.authenticated);
        assert!(matches!(outcome.reply, AckReply::Ack(ref ack) if ack.is_login_ok()));
        assert!(p.is_authenticated());
        assert_eq!(p.pending_events(), 0);
    }

    #[test]
    fn test_authenticate_wrong_ack_type() {
        let mut p = protocol();
        let mut auth = p.authenticate("u", "p").unwrap();
        p.line_received("SSMI,101,2").unwrap();

        let outcome = auth.try_take().unwrap().unwrap();
        assert!(!outcome.authenticated);
        assert!(!p.is_authenticated());
    }

    #[test]
    fn test_authenticate_nack() {
        let mut p = protocol();
        let mut auth = p.authenticate("u", "bad").unwrap();
        p.line_received("SSMI,102,1").unwrap();

        let outcome = auth.try_take().unwrap().unwrap();
        assert!(!outcome.authenticated);
        assert!(matches!(outcome.reply, AckReply::Nack(ref nack) if nack.nack_type == "1"));
        assert_eq!(p.state(), ConnectionState::Unauthenticated);
    }

    #[test]
    fn test_unsolicited_ack_is_queued() {
        let mut p = protocol();
        p.line_received("SSMI,101,1").unwrap();
        assert!(!p.is_authenticated());
        assert!(matches!(p.next_event(), Some(Event::Ack(ack)) if ack.is_login_ok()));
    }

    #[test]
    fn test_send_sms() {
        let mut p = protocol();
        p.send_message("2700000000", "hi there!", Some(2)).unwrap();
        let cmd = &sent(&p)[0];
        assert_eq!(cmd.name(), "SEND_SMS");
        assert_eq!(cmd.get_field("msisdn").unwrap(), "2700000000");
        assert_eq!(cmd.get_field("message").unwrap(), "hi there!");
        assert_eq!(cmd.get_field("validity").unwrap(), "2");
    }

    #[test]
    fn test_send_sms_default_validity() {
        let mut p = protocol();
        p.send_message("2700000000", "hi", None).unwrap();
        assert_eq!(p.transport()[0], "SSMI,2,0,2700000000,hi");
    }

    #[test]
    fn test_payload_codec_applies_to_text() {
        let mut p = protocol().with_payload_codec(Arc::new(StrictAscii));
        let err = p.send_message("27", "héllo", None).unwrap_err();
        assert!(matches!(err, SsmiError::Payload(_)));
        assert!(p.transport().is_empty());
    }

    #[test]
    fn test_binary_messages_fifo_per_msisdn() {
        let mut p = protocol();
        let mut first = p
            .send_binary_message(BinaryMessage::new("2700000000", "AA"))
            .unwrap();
        let mut second = p
            .send_binary_message(BinaryMessage::new("2700000000", "BB"))
            .unwrap();
        assert_eq!(p.transport()[0], "SSMI,4,0,2700000000,0,246,AA");

        p.line_received("SSMI,100,2700000000,1").unwrap();
        p.line_received("SSMI,100,2700000000,2").unwrap();

        assert_eq!(first.try_take().unwrap().unwrap().sequence, "1");
        assert_eq!(second.try_take().unwrap().unwrap().sequence, "2");
    }

    #[test]
    fn test_binary_message_overrides() {
        let mut p = protocol();
        let message = BinaryMessage::new("27", "0B")
            .with_validity(5)
            .with_protocol_id(ProtocolId::Enhanced)
            .with_coding(Coding::SevenBit);
        p.send_binary_message(message).unwrap();
        assert_eq!(p.transport()[0], "SSMI,4,5,27,15,0,0B");
    }

    #[test]
    fn test_seq_before_send_is_buffered() {
        let mut p = protocol();
        p.line_received("SSMI,100,27,9").unwrap();
        let mut pending = p.send_ussd_message("27", "menu", UssdType::New).unwrap();
        assert_eq!(pending.try_take().unwrap().unwrap().sequence, "9");
        assert_eq!(p.transport()[0], "SSMI,110,27,1,menu");
    }

    #[test]
    fn test_extended_ussd_rejects_gateway_only_types() {
        let mut p = protocol();
        for session_type in [UssdType::Timeout, UssdType::Redirect, UssdType::Initiate] {
            let err = p
                .send_extended_ussd_message("27", "hi", session_type, None)
                .unwrap_err();
            assert!(err.is_schema());
        }
        assert!(p.transport().is_empty());

        p.send_extended_ussd_message("27", "bye", UssdType::End, None)
            .unwrap();
        assert_eq!(p.transport()[0], "SSMI,120,27,3,,bye");
    }

    #[test]
    fn test_wap_push_and_mms() {
        let mut p = protocol();
        let mut wap = p
            .send_wap_push_message("27", "News", "http://example.org/a,b")
            .unwrap();
        let mut mms = p.send_mms_message("28", "Pic", "cat.jpg", "BASE64").unwrap();
        assert_eq!(p.transport()[0], "SSMI,112,27,News,http://example.org/a,b");
        assert_eq!(p.transport()[1], "SSMI,111,28,Pic,cat.jpg,BASE64");

        p.line_received("SSMI,100,28,2").unwrap();
        assert!(wap.try_take().is_none());
        assert_eq!(mms.try_take().unwrap().unwrap().msisdn, "28");
    }

    #[test]
    fn test_imsi_lookup_explicit_sequence() {
        let mut p = protocol();
        let mut pending = p.imsi_lookup("27", None, Some(42)).unwrap();
        assert_eq!(pending.key(), "42");
        assert_eq!(p.transport()[0], "SSMI,600,42,27,");

        p.line_received("SSMI,600,42,27,655010000000001,7").unwrap();
        let reply = pending.try_take().unwrap().unwrap();
        assert_eq!(reply.imsi, "655010000000001");
        assert_eq!(reply.spid, "7");
    }

    #[test]
    fn test_imsi_lookup_random_sequence() {
        let mut p = protocol();
        let mut pending = p.imsi_lookup("27", Some("655"), None).unwrap();
        let sequence: u32 = pending.key().parse().unwrap();
        assert!((1..MAX_GENERATED_SEQUENCE).contains(&sequence));

        let cmd = &sent(&p)[0];
        assert_eq!(cmd.get_field("sequence").unwrap(), pending.key());
        assert_eq!(cmd.get_field("imsi").unwrap(), "655");

        let line = format!("SSMI,600,{},27,655,1", pending.key());
        p.line_received(&line).unwrap();
        assert!(pending.try_take().unwrap().is_ok());
    }

    #[test]
    fn test_link_check_gated_on_authentication() {
        let interval = Duration::from_secs(60);
        let mut p = protocol().with_link_check(LinkCheckConfig::new(interval));
        assert!(p.start_link_check());

        for _ in 0..3 {
            p.clock().advance(interval);
            assert_eq!(p.poll_link_check().unwrap(), LinkCheckTick::Skipped);
        }
        assert!(p.transport().is_empty());

        p.state = ConnectionState::Authenticated;
        p.clock().advance(interval);
        assert_eq!(p.poll_link_check().unwrap(), LinkCheckTick::Due);
        assert_eq!(p.transport(), &vec!["SSMI,3".to_string()]);

        p.clock().advance(interval);
        p.poll_link_check().unwrap();
        assert_eq!(p.transport().len(), 2);
        assert_eq!(p.link_check_status().ticks_skipped, 3);
    }

    #[test]
    fn test_link_check_response_resets_unanswered() {
        let mut p = authenticated();
        p.link_check().unwrap();
        assert_eq!(p.link_check_status().unanswered, 1);

        p.line_received("SSMI,101,2").unwrap();
        assert_eq!(p.link_check_status().unanswered, 0);
        assert_eq!(p.pending_events(), 0);

        // Nothing outstanding, so this one is unsolicited
        p.line_received("SSMI,101,2").unwrap();
        assert!(matches!(
            p.next_event(),
            Some(Event::Ack(ack)) if ack.kind() == Some(AckType::LinkCheckResponse)
        ));
    }

    #[test]
    fn test_answered_link_checks_do_not_queue_events() {
        let interval = Duration::from_secs(30);
        let mut p = authenticated().with_link_check(LinkCheckConfig::new(interval));
        assert!(p.start_link_check());

        for _ in 0..100 {
            p.clock().advance(interval);
            assert_eq!(p.poll_link_check().unwrap(), LinkCheckTick::Due);
            p.line_received("SSMI,101,2").unwrap();
        }

        let status = p.link_check_status();
        assert_eq!(status.checks_sent, 100);
        assert_eq!(status.responses, 100);
        assert_eq!(status.unanswered, 0);
        assert_eq!(p.pending_events(), 0);
    }

    #[test]
    fn test_link_check_answer_does_not_resolve_login() {
        let mut p = authenticated();
        p.link_check().unwrap();
        let mut auth = p.authenticate("u", "p").unwrap();

        p.line_received("SSMI,101,2").unwrap();
        assert!(auth.try_take().is_none());
        assert!(p.is_authenticated());

        p.line_received("SSMI,101,1").unwrap();
        assert!(auth.try_take().unwrap().unwrap().authenticated);
    }

    #[test]
    fn test_logout() {
        let mut p = authenticated();
        p.logout().unwrap();
        assert_eq!(p.transport(), &vec!["SSMI,99".to_string()]);
        assert_eq!(p.state(), ConnectionState::Unauthenticated);
    }

    #[test]
    fn test_server_logout() {
        let mut p = authenticated();
        p.line_received("SSMI,199,10.0.0.1").unwrap();
        assert!(!p.is_authenticated());
        assert!(matches!(p.next_event(), Some(Event::Logout(l)) if l.ip == "10.0.0.1"));
    }

    #[test]
    fn test_unsolicited_events() {
        let mut p = protocol();
        p.line_received("SSMI,103,27,1,hello, world").unwrap();
        p.line_received("SSMI,104,27,1,0").unwrap();
        p.line_received("SSMI,105,gateway restart").unwrap();
        p.line_received("SSMI,110,27,1,2,*120#").unwrap();

        let events = p.drain_events();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], Event::MobileOriginated(mo) if mo.message == "hello, world"));
        assert!(
            matches!(&events[1], Event::DeliveryReport(dr) if dr.result().unwrap().is_success())
        );
        assert!(matches!(&events[2], Event::FreeForm(_)));
        assert!(matches!(&events[3], Event::Ussd(u) if u.session_type() == Some(UssdType::New)));
    }

    #[test]
    fn test_missing_handler_fails_loudly() {
        let mut handlers = HandlerTable::standard();
        handlers.remove("DR");
        let mut p = protocol().with_handlers(handlers);

        let err = p.line_received("SSMI,104,27,1,0").unwrap_err();
        assert!(matches!(err, SsmiError::UnhandledCommand(name) if name == "DR"));
    }

    #[test]
    fn test_malformed_line_does_not_poison_session() {
        let mut p = protocol();
        let err = p.line_received("BOGUS,1,x").unwrap_err();
        assert!(err.is_protocol());
        p.line_received("SSMI,105,still here").unwrap();
        assert_eq!(p.pending_events(), 1);
    }

    #[test]
    fn test_connection_lost_closes_pending() {
        let mut p = protocol();
        let mut seq = p.send_binary_message(BinaryMessage::new("27", "AA")).unwrap();
        let mut auth = p.authenticate("u", "p").unwrap();
        assert_eq!(p.pending_replies(), 2);

        p.connection_lost();
        assert_eq!(p.state(), ConnectionState::Disconnected);
        assert!(matches!(seq.try_take(), Some(Err(SsmiError::ConnectionClosed))));
        assert!(matches!(auth.try_take(), Some(Err(SsmiError::ConnectionClosed))));
        assert!(matches!(
            p.send_message("27", "hi", None),
            Err(SsmiError::InvalidState(_))
        ));
    }

    #[test]
    fn test_cancel_sequence_replies() {
        let mut p = protocol();
        let mut pending = p.send_wap_push_message("27", "s", "u").unwrap();
        assert_eq!(p.cancel_sequence_replies("27"), 1);
        assert!(matches!(pending.try_take(), Some(Err(SsmiError::ConnectionClosed))));

        // A late SEQ is kept for the next send rather than lost
        p.line_received("SSMI,100,27,1").unwrap();
        assert_eq!(p.pending_replies(), 0);
        assert_eq!(p.cancel_imsi_lookup("1"), 0);
    }
}
