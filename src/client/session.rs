// ABOUTME: Async SSMI session where one tokio task owns the protocol state machine
// ABOUTME: Client handles talk to the driver through channels; no locks guard protocol state

use crate::client::builder::ClientConfig;
use crate::client::error::{SsmiError, SsmiResult};
use crate::client::link_check::LinkCheckStatus;
use crate::client::protocol::{ConnectionState, SsmiProtocol};
use crate::client::types::{Authentication, BinaryMessage, Event};
use crate::clock::SystemClock;
use crate::commands::response::{ImsiLookupReply, Seq};
use crate::connection::{LineReader, LineWriter};
use crate::correlation::PendingReply;
use crate::datatypes::UssdType;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Coarsest resolution at which the driver polls the link-check timer
const MAX_POLL_PERIOD: Duration = Duration::from_secs(1);

type Protocol = SsmiProtocol<mpsc::UnboundedSender<String>, SystemClock>;
type Job = Box<dyn FnOnce(&mut Protocol) + Send>;

/// Handle to a running SSMI session.
///
/// Every operation is forwarded to the driver task, which owns the
/// [`SsmiProtocol`] together with the socket. Sends return as soon as the
/// line is queued; correlated replies come back through [`PendingReply`].
///
/// ```rust,no_run
/// use ssmi::client::ClientBuilder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ClientBuilder::quick("localhost:2020", "user", "secret").await?;
///
/// let seq = client.send_message("27821234567", "hello", None).await?.await?;
/// println!("gateway sequence {}", seq.sequence);
///
/// while let Some(event) = client.next_event().await {
///     println!("{event:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct SsmiClient {
    jobs: mpsc::UnboundedSender<Job>,
    events: tokio::sync::Mutex<mpsc::UnboundedReceiver<Event>>,
    driver: JoinHandle<SsmiResult<()>>,
}

impl SsmiClient {
    /// Start a session over an already connected stream
    pub fn new<S>(stream: S, config: &ClientConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let protocol = SsmiProtocol::new(outbound_tx, SystemClock)
            .with_link_check(config.link_check.clone())
            .with_payload_codec(config.payload_codec.clone());
        let poll_period = config.link_check.interval.min(MAX_POLL_PERIOD);

        let driver = tokio::spawn(drive(
            stream,
            protocol,
            outbound_rx,
            jobs_rx,
            events_tx,
            poll_period,
        ));

        Self {
            jobs: jobs_tx,
            events: tokio::sync::Mutex::new(events_rx),
            driver,
        }
    }

    /// Run `f` against the protocol on the driver task
    async fn call<R, F>(&self, f: F) -> SsmiResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Protocol) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |protocol| {
            let _ = reply_tx.send(f(protocol));
        });

        self.jobs.send(job).map_err(|_| SsmiError::ConnectionClosed)?;
        reply_rx.await.map_err(|_| SsmiError::ConnectionClosed)
    }

    pub async fn login(&self, username: &str, password: &str) -> SsmiResult<()> {
        let (username, password) = (username.to_owned(), password.to_owned());
        self.call(move |p| p.login(&username, &password)).await?
    }

    /// Log in and wait for the gateway's verdict
    pub async fn authenticate(&self, username: &str, password: &str) -> SsmiResult<Authentication> {
        let (username, password) = (username.to_owned(), password.to_owned());
        let pending = self
            .call(move |p| p.authenticate(&username, &password))
            .await??;
        pending.await
    }

    pub async fn logout(&self) -> SsmiResult<()> {
        self.call(|p| p.logout()).await?
    }

    pub async fn send_message(
        &self,
        msisdn: &str,
        message: &str,
        validity: Option<u32>,
    ) -> SsmiResult<PendingReply<Seq>> {
        let (msisdn, message) = (msisdn.to_owned(), message.to_owned());
        self.call(move |p| p.send_message(&msisdn, &message, validity))
            .await?
    }

    pub async fn send_binary_message(
        &self,
        message: BinaryMessage,
    ) -> SsmiResult<PendingReply<Seq>> {
        self.call(move |p| p.send_binary_message(message)).await?
    }

    pub async fn send_ussd_message(
        &self,
        msisdn: &str,
        message: &str,
        ussd_type: UssdType,
    ) -> SsmiResult<PendingReply<Seq>> {
        let (msisdn, message) = (msisdn.to_owned(), message.to_owned());
        self.call(move |p| p.send_ussd_message(&msisdn, &message, ussd_type))
            .await?
    }

    pub async fn send_extended_ussd_message(
        &self,
        msisdn: &str,
        message: &str,
        session_type: UssdType,
        genfields: Option<&str>,
    ) -> SsmiResult<PendingReply<Seq>> {
        let (msisdn, message) = (msisdn.to_owned(), message.to_owned());
        let genfields = genfields.map(str::to_owned);
        self.call(move |p| {
            p.send_extended_ussd_message(&msisdn, &message, session_type, genfields.as_deref())
        })
        .await?
    }

    pub async fn send_wap_push_message(
        &self,
        msisdn: &str,
        subject: &str,
        url: &str,
    ) -> SsmiResult<PendingReply<Seq>> {
        let (msisdn, subject, url) = (msisdn.to_owned(), subject.to_owned(), url.to_owned());
        self.call(move |p| p.send_wap_push_message(&msisdn, &subject, &url))
            .await?
    }

    pub async fn send_mms_message(
        &self,
        msisdn: &str,
        subject: &str,
        name: &str,
        content: &str,
    ) -> SsmiResult<PendingReply<Seq>> {
        let (msisdn, subject) = (msisdn.to_owned(), subject.to_owned());
        let (name, content) = (name.to_owned(), content.to_owned());
        self.call(move |p| p.send_mms_message(&msisdn, &subject, &name, &content))
            .await?
    }

    pub async fn imsi_lookup(
        &self,
        msisdn: &str,
        imsi: Option<&str>,
        sequence: Option<u32>,
    ) -> SsmiResult<PendingReply<ImsiLookupReply>> {
        let msisdn = msisdn.to_owned();
        let imsi = imsi.map(str::to_owned);
        self.call(move |p| p.imsi_lookup(&msisdn, imsi.as_deref(), sequence))
            .await?
    }

    /// Send a LINK_CHECK right away
    pub async fn link_check(&self) -> SsmiResult<()> {
        self.call(|p| p.link_check()).await?
    }

    pub async fn start_link_check(&self) -> SsmiResult<bool> {
        self.call(|p| p.start_link_check()).await
    }

    pub async fn stop_link_check(&self) -> SsmiResult<()> {
        self.call(|p| p.stop_link_check()).await
    }

    pub async fn link_check_status(&self) -> SsmiResult<LinkCheckStatus> {
        self.call(|p| p.link_check_status()).await
    }

    pub async fn is_link_failed(&self) -> SsmiResult<bool> {
        self.call(|p| p.is_link_failed()).await
    }

    pub async fn state(&self) -> SsmiResult<ConnectionState> {
        self.call(|p| p.state()).await
    }

    pub async fn is_authenticated(&self) -> SsmiResult<bool> {
        self.call(|p| p.is_authenticated()).await
    }

    pub async fn cancel_sequence_replies(&self, msisdn: &str) -> SsmiResult<usize> {
        let msisdn = msisdn.to_owned();
        self.call(move |p| p.cancel_sequence_replies(&msisdn)).await
    }

    pub async fn cancel_imsi_lookup(&self, sequence: &str) -> SsmiResult<usize> {
        let sequence = sequence.to_owned();
        self.call(move |p| p.cancel_imsi_lookup(&sequence)).await
    }

    /// Next unsolicited event; `None` once the session has ended
    pub async fn next_event(&self) -> Option<Event> {
        self.events.lock().await.recv().await
    }

    /// Stop the driver after flushing queued lines, and report how it ended
    pub async fn close(self) -> SsmiResult<()> {
        let Self { jobs, driver, .. } = self;
        drop(jobs);
        driver.await.map_err(|err| SsmiError::Connection(io::Error::other(err)))?
    }
}

/// Session loop: the only place the protocol and the socket are touched
async fn drive<S>(
    stream: S,
    mut protocol: Protocol,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    events: mpsc::UnboundedSender<Event>,
    poll_period: Duration,
) -> SsmiResult<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = LineReader::new(read_half);
    let mut writer = LineWriter::new(write_half);

    let mut ticker = tokio::time::interval(poll_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            line = reader.read_line() => match line {
                Ok(Some(line)) => {
                    // A bad line is reported and skipped; the session carries on
                    if let Err(err) = protocol.line_received(&line) {
                        warn!("Discarding inbound line {:?}: {}", line, err);
                    }
                }
                Ok(None) => {
                    info!("Gateway closed the connection");
                    break Ok(());
                }
                Err(err) => break Err(err),
            },
            Some(line) = outbound.recv() => {
                if let Err(err) = writer.write_line(&line).await {
                    break Err(err.into());
                }
            }
            job = jobs.recv() => match job {
                Some(job) => job(&mut protocol),
                None => {
                    debug!("Session handle dropped, closing");
                    break flush(&mut outbound, &mut writer).await;
                }
            },
            _ = ticker.tick() => {
                if let Err(err) = protocol.poll_link_check() {
                    break Err(err);
                }
            }
        }

        for event in protocol.drain_events() {
            if events.send(event).is_err() {
                debug!("Event receiver gone, dropping event");
            }
        }
    };

    protocol.connection_lost();
    result
}

/// Write whatever is still queued, then shut the write side down
async fn flush<W>(
    outbound: &mut mpsc::UnboundedReceiver<String>,
    writer: &mut LineWriter<W>,
) -> SsmiResult<()>
where
    W: AsyncWrite + Unpin,
{
    while let Ok(line) = outbound.try_recv() {
        writer.write_line(&line).await?;
    }
    writer.shutdown().await?;
    Ok(())
}
