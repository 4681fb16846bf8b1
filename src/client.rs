//! The client facade: socket ownership, background tasks, and the public
//! send/subscribe/query surface.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::device::{Device, DeviceRegistry, DeviceStatus, Transition};
use crate::dispatcher::{Dispatcher, HandlerId, ResponseHandler};
use crate::errors::Error;
use crate::event::Event;
use crate::light::Light;
use crate::packet::{
    self, DEFAULT_PORT, MessageKind, Packet, PacketOptions, Payload, target_from_id,
};
use crate::queue::{OutboundUnit, SendQueue};

type Result<T> = std::result::Result<T, Error>;

/// Client configuration; every field has a sensible default.
///
/// # Example
///
/// ```
/// use lifx_lan_rs::ClientConfig;
///
/// let config = ClientConfig {
///     start_discovery: false,
///     ..ClientConfig::default()
/// };
/// assert_eq!(config.resend_max_times, 3);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address to bind the UDP socket to.
    pub address: IpAddr,
    /// Port to bind to; 0 picks an ephemeral port.
    pub port: u16,
    /// Log every inbound and outbound packet.
    pub debug: bool,
    /// Discovery rounds a light may miss before it is marked offline.
    pub light_offline_tolerance: u64,
    /// How long a sequence-correlated handler may wait for its reply.
    pub message_handler_timeout: Duration,
    /// Client source identifier as 8 lowercase-hex characters; random when
    /// absent.
    pub source: Option<String>,
    /// Start the discovery loop on init.
    pub start_discovery: bool,
    /// Known device addresses to probe directly, for networks where
    /// broadcast is unavailable.
    pub lights: Vec<IpAddr>,
    /// Cancel the discovery loop once the first round has completed.
    pub stop_after_discovery: bool,
    /// Broadcast address used for discovery.
    pub broadcast: Ipv4Addr,
    /// Destination port for discovery probes and broadcast sends.
    pub send_port: u16,
    /// Delay before re-transmitting an unacknowledged packet.
    pub resend_packet_delay: Duration,
    /// Extra transmissions after the first one.
    pub resend_max_times: u8,
    /// Minimum spacing between any two transmissions.
    pub message_rate_limit: Duration,
    /// Spacing between discovery rounds.
    pub discovery_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
            debug: false,
            light_offline_tolerance: 3,
            message_handler_timeout: Duration::from_millis(45000),
            source: None,
            start_discovery: true,
            lights: Vec::new(),
            stop_after_discovery: false,
            broadcast: Ipv4Addr::BROADCAST,
            send_port: DEFAULT_PORT,
            resend_packet_delay: Duration::from_millis(150),
            resend_max_times: 3,
            message_rate_limit: Duration::from_millis(50),
            discovery_interval: Duration::from_millis(5000),
        }
    }
}

/// Per-send routing options.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Device identifier to address; `None` broadcasts.
    pub target: Option<String>,
    /// Ask the device to confirm receipt.
    pub ack_required: bool,
    /// Ask the device to reply with its State message.
    pub res_required: bool,
}

struct State {
    sequence: u8,
    dispatcher: Dispatcher,
    queue: SendQueue,
    registry: DeviceRegistry,
}

struct Shared {
    socket: Arc<UdpSocket>,
    source: u32,
    config: ClientConfig,
    state: Mutex<State>,
    events: broadcast::Sender<Event>,
    closed: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// A LIFX LAN client.
///
/// Owns the UDP transport and runs four background activities: the datagram
/// receive loop, the discovery loop, the send-queue drain tick, and the
/// handler-timeout sweep. Cloning is cheap and shares the same client.
///
/// # Example
///
/// ```ignore
/// use lifx_lan_rs::{Client, ClientConfig, Event};
///
/// let client = Client::init(ClientConfig::default()).await?;
/// let mut events = client.subscribe();
/// while let Ok(event) = events.recv().await {
///     if let Event::Discovered(device) = event {
///         println!("found {} at {}", device.id, device.address);
///     }
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

impl Client {
    /// Bind the socket and start the background activities.
    pub async fn init(config: ClientConfig) -> Result<Client> {
        let source = match &config.source {
            Some(source) => parse_source(source)?,
            None => random_source(),
        };

        let socket = UdpSocket::bind((config.address, config.port))
            .await
            .map_err(|e| Error::socket("bind", e))?;
        socket
            .set_broadcast(true)
            .map_err(|e| Error::socket("set_broadcast", e))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| Error::socket("local_addr", e))?;

        let (events, _) = broadcast::channel(256);
        let shared = Arc::new(Shared {
            socket: Arc::new(socket),
            source,
            state: Mutex::new(State {
                sequence: 0,
                dispatcher: Dispatcher::new(),
                queue: SendQueue::new(config.message_rate_limit, config.resend_packet_delay),
                registry: DeviceRegistry::new(),
            }),
            events,
            closed: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
            config,
        });

        // The loops hold weak references so that dropping the last client
        // clone tears everything down even without an explicit destroy.
        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(receive_loop(
            Arc::clone(&shared.socket),
            Arc::downgrade(&shared),
        )));
        tasks.push(tokio::spawn(rate_limit_loop(Arc::downgrade(&shared))));
        tasks.push(tokio::spawn(sweep_loop(Arc::downgrade(&shared))));
        if shared.config.start_discovery {
            tasks.push(tokio::spawn(discovery_loop(Arc::downgrade(&shared))));
        }
        *shared.tasks.lock().unwrap() = tasks;

        let _ = shared.events.send(Event::Listening { addr: local_addr });
        debug!("client listening on {local_addr}, source {source:08x}");
        Ok(Client { shared })
    }

    /// Subscribe to client notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.events.subscribe()
    }

    /// The 32-bit source identifier stamped on outgoing packets.
    pub fn source(&self) -> u32 {
        self.shared.source
    }

    /// The bound socket address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.shared
            .socket
            .local_addr()
            .map_err(|e| Error::socket("local_addr", e))
    }

    /// Enqueue a packet and return its sequence number.
    ///
    /// The packet leaves on a rate-limit tick. When `ack_required` or
    /// `res_required` is set the transmission is retried until a reply
    /// resolves it or retries run out.
    pub fn send(&self, payload: Payload, options: SendOptions) -> Result<u8> {
        self.shared.enqueue(payload, &options, None)
    }

    /// Send a packet and await the first reply of one of the expected kinds.
    ///
    /// Resolution is exactly-once: the matching reply, retry exhaustion, the
    /// handler-timeout sweep, or shutdown, whichever happens first.
    pub async fn request(
        &self,
        payload: Payload,
        options: SendOptions,
        expected: &[MessageKind],
    ) -> Result<Packet> {
        let accept_ack = options.ack_required;
        let (tx, rx) = oneshot::channel();
        let handler: ResponseHandler = Box::new(move |result| {
            let _ = tx.send(result);
        });
        self.shared
            .enqueue(payload, &options, Some((expected.to_vec(), accept_ack, handler)))?;
        rx.await.map_err(|_| Error::Closed)?
    }

    /// Register a long-lived handler for a message kind; `None` receives
    /// every decoded packet. These handlers are not subject to the timeout
    /// sweep. They run on the receive path and must not block.
    pub fn add_message_handler<F>(&self, kind: Option<MessageKind>, handler: F) -> Result<HandlerId>
    where
        F: Fn(&Packet, SocketAddr) + Send + Sync + 'static,
    {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        let mut state = self.shared.state.lock().unwrap();
        Ok(state.dispatcher.add_observer(kind, Arc::new(handler)))
    }

    /// Remove a handler registered with [`Client::add_message_handler`].
    pub fn remove_message_handler(&self, id: HandlerId) -> bool {
        let mut state = self.shared.state.lock().unwrap();
        state.dispatcher.remove_observer(id)
    }

    /// Find a light by id, label, or address.
    pub fn light(&self, identifier: &str) -> Result<Light> {
        let state = self.shared.state.lock().unwrap();
        state
            .registry
            .find(identifier)
            .map(|device| Light::new(self.clone(), device.id.clone()))
            .ok_or_else(|| Error::DeviceNotFound(identifier.to_string()))
    }

    /// Snapshot of known devices, optionally filtered by status.
    pub fn lights(&self, filter: Option<DeviceStatus>) -> Vec<Device> {
        let state = self.shared.state.lock().unwrap();
        state.registry.list(filter)
    }

    /// Snapshot of one device record.
    pub fn device(&self, id: &str) -> Result<Device> {
        let state = self.shared.state.lock().unwrap();
        state
            .registry
            .get(id)
            .cloned()
            .ok_or_else(|| Error::DeviceNotFound(id.to_string()))
    }

    /// Stop the client: cancel the background activities, fail in-flight
    /// requests with [`Error::Closed`], and reject further sends.
    ///
    /// Idempotent; the socket itself is released when the last clone of the
    /// client is dropped.
    pub fn destroy(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for task in self.shared.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        let pending = {
            let mut state = self.shared.state.lock().unwrap();
            state.dispatcher.drain()
        };
        for entry in pending {
            (entry.handler)(Err(Error::Closed));
        }
        debug!("client destroyed");
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }
}

impl Shared {
    fn enqueue(
        &self,
        payload: Payload,
        options: &SendOptions,
        handler: Option<(Vec<MessageKind>, bool, ResponseHandler)>,
    ) -> Result<u8> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }

        let target = options.target.as_deref().map(target_from_id).transpose()?;
        let needs_reply = options.ack_required || options.res_required;

        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let sequence = next_sequence(&mut state.sequence, &state.dispatcher)?;

        let addr = options
            .target
            .as_deref()
            .and_then(|id| state.registry.get(id))
            .map(|device| device.address)
            .unwrap_or_else(|| {
                SocketAddr::new(IpAddr::V4(self.config.broadcast), self.config.send_port)
            });

        let packet = Packet::compose(
            payload,
            PacketOptions {
                target,
                ack_required: options.ack_required,
                res_required: options.res_required,
                sequence,
                source: self.source,
            },
        );
        let bytes = packet.to_bytes()?;
        if self.config.debug {
            debug!("queueing {} to {addr}: {bytes:02x?}", packet.payload.kind());
        }

        if let Some((expected, accept_ack, handler)) = handler {
            state.dispatcher.register(
                sequence,
                expected,
                accept_ack,
                Instant::now() + self.config.message_handler_timeout,
                handler,
            );
        }
        state.queue.push(OutboundUnit {
            bytes,
            addr,
            sequence,
            needs_reply,
            sends_remaining: self.config.resend_max_times + 1,
        });
        Ok(sequence)
    }

    fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }
}

/// Allocate the next sequence number, skipping numbers still referenced by a
/// pending request. Numbers are only reused after wrapping around once free.
fn next_sequence(sequence: &mut u8, dispatcher: &Dispatcher) -> Result<u8> {
    for _ in 0..=u8::MAX as usize {
        let candidate = sequence.wrapping_add(1);
        *sequence = candidate;
        if !dispatcher.is_pending(candidate) {
            return Ok(candidate);
        }
    }
    Err(Error::validation(
        "no free sequence number: 256 requests in flight",
    ))
}

fn parse_source(source: &str) -> Result<u32> {
    let valid = source.len() == 8
        && source
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !valid {
        return Err(Error::validation(format!(
            "source must be 8 lowercase-hex characters, got {source:?}"
        )));
    }
    u32::from_str_radix(source, 16)
        .map_err(|_| Error::validation(format!("source is not hexadecimal: {source:?}")))
}

/// A random non-zero source id; zero would invite broadcast replies.
fn random_source() -> u32 {
    let bytes = *Uuid::new_v4().as_bytes();
    let source = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if source == 0 { 1 } else { source }
}

async fn receive_loop(socket: Arc<UdpSocket>, shared: Weak<Shared>) {
    let mut buf = [0u8; 2048];
    loop {
        let (len, addr) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                error!("socket receive error: {e}");
                if let Some(shared) = shared.upgrade() {
                    shared.emit(Event::Error(format!("receive failed: {e}")));
                }
                continue;
            }
        };
        let Some(shared) = shared.upgrade() else {
            return;
        };
        handle_datagram(&shared, &buf[..len], addr);
    }
}

/// Decode one datagram and route it: device-state update first, then
/// pending-request resolution, then the generic message notification.
fn handle_datagram(shared: &Shared, bytes: &[u8], addr: SocketAddr) {
    let packet = match Packet::parse(bytes) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("dropping undecodable datagram from {addr}: {e}");
            shared.emit(Event::Error(format!("bad datagram from {addr}: {e}")));
            return;
        }
    };
    let kind = packet.payload.kind();

    // Our own broadcasts loop back; a request stamped with our source id is
    // an echo, not a device talking to us.
    if packet.header.source == shared.source && !kind.is_reply() {
        return;
    }
    if shared.config.debug {
        debug!("received {kind} from {addr}: {bytes:02x?}");
    }

    let device_id = (packet.header.target != [0u8; 8])
        .then(|| packet::id_from_target(&packet.header.target));

    let mut events = Vec::new();
    let mut resolved = None;
    let observers;
    {
        let mut state = shared.state.lock().unwrap();

        if let Some(id) = &device_id
            && kind.is_reply()
        {
            let device_addr = match &packet.payload {
                // The reply names the service port; trust it over the
                // datagram source port when present.
                Payload::StateService { port, .. } if *port > 0 => {
                    SocketAddr::new(addr.ip(), *port as u16)
                }
                _ => addr,
            };
            let transition = if kind == MessageKind::StateService
                || state.registry.get(id).is_some()
            {
                state.registry.note_seen(id, device_addr)
            } else {
                None
            };
            match &packet.payload {
                Payload::StateLight { label, power, .. } => {
                    state.registry.update_label(id, label);
                    state.registry.update_power(id, *power > 0);
                }
                Payload::StateLabel { label } => state.registry.update_label(id, label),
                Payload::StatePower { level } => state.registry.update_power(id, *level > 0),
                _ => {}
            }
            if let Some(transition) = transition
                && let Some(device) = state.registry.get(id).cloned()
            {
                events.push(match transition {
                    Transition::Discovered => Event::Discovered(device),
                    Transition::Online => Event::Online(device),
                });
            }
        }

        // Replies echo the requester's source id; a foreign source must not
        // settle one of our requests that happens to share a sequence.
        if packet.header.source == shared.source
            && let Some(entry) = state.dispatcher.resolve(packet.header.sequence, kind)
        {
            resolved = Some(entry.handler);
        }
        observers = state.dispatcher.observers_for(kind);
    }

    for event in events {
        shared.emit(event);
    }
    if let Some(handler) = resolved {
        handler(Ok(packet.clone()));
    }
    for observer in &observers {
        observer(&packet, addr);
    }
    shared.emit(Event::Message { packet, addr });
}

async fn rate_limit_loop(shared: Weak<Shared>) {
    let Some(period) = shared.upgrade().map(|s| s.config.message_rate_limit) else {
        return;
    };
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let Some(shared) = shared.upgrade() else {
            return;
        };

        let (transmit, timed_out) = {
            let mut state = shared.state.lock().unwrap();
            let State {
                queue, dispatcher, ..
            } = &mut *state;
            let result = queue.tick(Instant::now(), |sequence| dispatcher.is_pending(sequence));
            let timed_out: Vec<_> = result
                .expired
                .into_iter()
                .filter_map(|sequence| dispatcher.take(sequence))
                .collect();
            (result.transmit, timed_out)
        };

        for entry in timed_out {
            (entry.handler)(Err(Error::Timeout));
        }

        if let Some((bytes, addr, sequence)) = transmit
            && let Err(e) = shared.socket.send_to(&bytes, addr).await
        {
            error!("transmit to {addr} failed: {e}");
            let failed = {
                let mut state = shared.state.lock().unwrap();
                state.dispatcher.take(sequence)
            };
            if let Some(entry) = failed {
                (entry.handler)(Err(Error::socket("send_to", e)));
            } else {
                shared.emit(Event::Error(format!("transmit to {addr} failed: {e}")));
            }
        }
    }
}

async fn sweep_loop(shared: Weak<Shared>) {
    // Sweep a few times per handler-timeout window so deadlines are not
    // overshot by much.
    let Some(period) = shared
        .upgrade()
        .map(|s| s.config.message_handler_timeout / 4)
    else {
        return;
    };
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let expired = {
            let mut state = shared.state.lock().unwrap();
            state.dispatcher.sweep(Instant::now())
        };
        for entry in expired {
            (entry.handler)(Err(Error::Timeout));
        }
    }
}

async fn discovery_loop(shared: Weak<Shared>) {
    let Some(period) = shared.upgrade().map(|s| s.config.discovery_interval) else {
        return;
    };
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let Some(shared) = shared.upgrade() else {
            return;
        };

        let (completed, stop) = {
            let mut state = shared.state.lock().unwrap();
            let completed_round = state.registry.round();
            let mut completed = Vec::new();
            if completed_round > 0 {
                for device in state
                    .registry
                    .sweep_offline(shared.config.light_offline_tolerance)
                {
                    completed.push(Event::Offline(device));
                }
                completed.push(Event::DiscoveryCompleted {
                    round: completed_round,
                });
            }
            let stop = shared.config.stop_after_discovery && completed_round > 0;
            if !stop {
                state.registry.next_round();
            }
            (completed, stop)
        };
        for event in completed {
            shared.emit(event);
        }
        if stop {
            debug!("discovery stopped after first round");
            return;
        }

        if let Err(e) = shared.enqueue(Payload::GetService, &SendOptions::default(), None) {
            warn!("discovery broadcast not queued: {e}");
        }
        for ip in &shared.config.lights {
            // Direct probes reach lights on networks that swallow broadcast.
            if let Err(e) = unicast_probe(&shared, *ip) {
                warn!("discovery probe to {ip} not queued: {e}");
            }
        }
    }
}

/// Queue a getService probe straight to a known address.
fn unicast_probe(shared: &Shared, ip: IpAddr) -> Result<u8> {
    if shared.closed.load(Ordering::SeqCst) {
        return Err(Error::Closed);
    }
    let mut guard = shared.state.lock().unwrap();
    let state = &mut *guard;
    let sequence = next_sequence(&mut state.sequence, &state.dispatcher)?;
    let packet = Packet::compose(
        Payload::GetService,
        PacketOptions {
            sequence,
            source: shared.source,
            ..PacketOptions::default()
        },
    );
    state.queue.push(OutboundUnit {
        bytes: packet.to_bytes()?,
        addr: SocketAddr::new(ip, shared.config.send_port),
        sequence,
        needs_reply: false,
        sends_remaining: shared.config.resend_max_times + 1,
    });
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.light_offline_tolerance, 3);
        assert_eq!(config.message_handler_timeout, Duration::from_millis(45000));
        assert_eq!(config.resend_packet_delay, Duration::from_millis(150));
        assert_eq!(config.resend_max_times, 3);
        assert_eq!(config.message_rate_limit, Duration::from_millis(50));
        assert_eq!(config.discovery_interval, Duration::from_millis(5000));
        assert_eq!(config.send_port, 56700);
        assert_eq!(config.broadcast, Ipv4Addr::BROADCAST);
        assert!(config.start_discovery);
        assert!(!config.stop_after_discovery);
    }

    #[test]
    fn test_parse_source() {
        assert_eq!(parse_source("ff2c4807").unwrap(), 0xff2c4807);
        assert_eq!(parse_source("00000001").unwrap(), 1);
        for bad in ["FF2C4807", "ff2c480", "ff2c48071", "gg2c4807", ""] {
            assert!(parse_source(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_random_source_is_never_zero() {
        for _ in 0..64 {
            assert_ne!(random_source(), 0);
        }
    }

    #[test]
    fn test_sequence_wraps_and_skips_pending() {
        let mut dispatcher = Dispatcher::new();
        let mut sequence = 254u8;

        assert_eq!(next_sequence(&mut sequence, &dispatcher).unwrap(), 255);
        assert_eq!(next_sequence(&mut sequence, &dispatcher).unwrap(), 0);
        assert_eq!(next_sequence(&mut sequence, &dispatcher).unwrap(), 1);

        // 2 is taken by an in-flight request; the allocator must skip it.
        dispatcher.register(
            2,
            vec![MessageKind::Acknowledgement],
            true,
            Instant::now() + Duration::from_secs(45),
            Box::new(|_| {}),
        );
        assert_eq!(next_sequence(&mut sequence, &dispatcher).unwrap(), 3);

        // Once freed, the number becomes available again after wrapping.
        dispatcher.take(2);
        sequence = 1;
        assert_eq!(next_sequence(&mut sequence, &dispatcher).unwrap(), 2);
    }

    #[test]
    fn test_sequence_exhaustion_reported() {
        let mut dispatcher = Dispatcher::new();
        for seq in 0..=u8::MAX {
            dispatcher.register(
                seq,
                vec![MessageKind::Acknowledgement],
                true,
                Instant::now() + Duration::from_secs(45),
                Box::new(|_| {}),
            );
        }
        let mut sequence = 0u8;
        assert!(next_sequence(&mut sequence, &dispatcher).is_err());
    }

    #[tokio::test]
    async fn test_send_after_destroy_fails_immediately() {
        let client = Client::init(ClientConfig {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            start_discovery: false,
            ..ClientConfig::default()
        })
        .await
        .unwrap();

        client.destroy();
        client.destroy(); // idempotent

        let err = client
            .send(Payload::GetService, SendOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Closed));
    }

    #[tokio::test]
    async fn test_unanswered_request_fails_after_retries() {
        let sink = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = Client::init(ClientConfig {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            start_discovery: false,
            broadcast: Ipv4Addr::LOCALHOST,
            send_port: sink.local_addr().unwrap().port(),
            message_rate_limit: Duration::from_millis(10),
            resend_packet_delay: Duration::from_millis(50),
            resend_max_times: 3,
            ..ClientConfig::default()
        })
        .await
        .unwrap();

        let start = tokio::time::Instant::now();
        let err = client
            .request(
                Payload::GetPower,
                SendOptions {
                    res_required: true,
                    ..SendOptions::default()
                },
                &[MessageKind::StatePower],
            )
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, Error::Timeout));
        // Four wire attempts spaced by the resend delay, then the failure.
        assert!(elapsed >= Duration::from_millis(200), "failed too early: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(10), "failed too late: {elapsed:?}");

        client.destroy();
    }

    #[tokio::test]
    async fn test_malformed_datagram_emits_error_and_resolves_nothing() {
        let sink = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = Client::init(ClientConfig {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            start_discovery: false,
            broadcast: Ipv4Addr::LOCALHOST,
            send_port: sink.local_addr().unwrap().port(),
            // Keep the retry machinery far away from this test's timings.
            resend_packet_delay: Duration::from_secs(2),
            ..ClientConfig::default()
        })
        .await
        .unwrap();
        let mut events = client.subscribe();

        let inflight = {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .request(
                        Payload::GetPower,
                        SendOptions {
                            res_required: true,
                            ..SendOptions::default()
                        },
                        &[MessageKind::StatePower],
                    )
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        // A statePower reply carrying the in-flight sequence, but one byte
        // short of its declared size.
        let mut bytes = Packet::compose(
            Payload::StatePower { level: 65535 },
            PacketOptions {
                sequence: 1,
                source: client.source(),
                ..PacketOptions::default()
            },
        )
        .to_bytes()
        .unwrap();
        bytes.truncate(bytes.len() - 1);
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(&bytes, client.local_addr().unwrap())
            .await
            .unwrap();

        let error = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Event::Error(message) = events.recv().await.unwrap() {
                    break message;
                }
            }
        })
        .await
        .expect("no error event for the malformed datagram");
        assert!(error.contains("bad datagram"), "unexpected error: {error}");

        // The malformed buffer must not have settled the pending request.
        assert!(!inflight.is_finished());

        client.destroy();
        assert!(matches!(inflight.await.unwrap(), Err(Error::Closed)));
    }

    #[tokio::test]
    async fn test_destroy_resolves_inflight_requests_with_closed() {
        // Aim the "broadcast" at a throwaway local socket so transmissions
        // succeed without touching the network.
        let sink = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = Client::init(ClientConfig {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            start_discovery: false,
            broadcast: Ipv4Addr::LOCALHOST,
            send_port: sink.local_addr().unwrap().port(),
            ..ClientConfig::default()
        })
        .await
        .unwrap();

        let pending = {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .request(
                        Payload::GetService,
                        SendOptions {
                            res_required: true,
                            ..SendOptions::default()
                        },
                        &[MessageKind::StateService],
                    )
                    .await
            })
        };
        // Let the request register before shutting down.
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.destroy();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(Error::Closed)));
    }
}
