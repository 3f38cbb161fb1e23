//! The SSU node
//!
//! One UDP socket, a bounded inbound queue, a pool of dispatch workers,
//! and a periodic sweeper for the reassembly and in-flight tables. The
//! receive path never blocks on a handler: hooks run on spawned tasks and
//! their failures are logged with context.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use veilnet_core::{upgrade, FragmentPacket, Packet, TagKind, header};

use crate::config::SsuConfig;
use crate::fragment::Reassembler;
use crate::handler::{HandlerContext, PacketHandler, SsuSender};
use crate::request::{PendingTable, SsuRequest};
use crate::{Result, SsuError};

/// Bound on unprocessed inbound datagrams; overflow drops the oldest.
pub const INBOUND_QUEUE_CAPACITY: usize = 1024;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Transport health counters.
#[derive(Debug, Clone)]
pub struct SsuStats {
    pub in_flight: usize,
    pub dropped_datagrams: u64,
    pub pending_fragments: usize,
    pub uptime_secs: u64,
}

struct InboundQueue {
    queue: Mutex<VecDeque<(Vec<u8>, SocketAddr)>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
}

impl InboundQueue {
    fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    fn push(&self, raw: Vec<u8>, from: SocketAddr) {
        {
            let mut queue = self.queue.lock();
            if queue.len() >= self.capacity {
                queue.pop_front();
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(dropped, "inbound queue full, dropped oldest datagram");
            }
            queue.push_back((raw, from));
        }
        self.notify.notify_one();
    }

    async fn pop(&self) -> (Vec<u8>, SocketAddr) {
        loop {
            if let Some(item) = self.queue.lock().pop_front() {
                return item;
            }
            self.notify.notified().await;
        }
    }
}

/// The UDP listener/sender for all packet types.
pub struct SsuNode {
    config: SsuConfig,
    hooks: RwLock<HashMap<String, Arc<dyn PacketHandler>>>,
    pending: PendingTable,
    reassembler: Reassembler,
    inbound: InboundQueue,
    socket: RwLock<Option<Arc<UdpSocket>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
    started_at: Mutex<Option<Instant>>,
}

impl SsuNode {
    pub fn new(config: SsuConfig) -> Self {
        Self {
            config,
            hooks: RwLock::new(HashMap::new()),
            pending: PendingTable::new(),
            reassembler: Reassembler::new(),
            inbound: InboundQueue::new(INBOUND_QUEUE_CAPACITY),
            socket: RwLock::new(None),
            tasks: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            started_at: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SsuConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bind the socket and spawn the receive loop, dispatch workers, and
    /// the table sweeper. Idempotent.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("SSU node already running");
            return Ok(());
        }

        let socket = UdpSocket::bind(self.config.bind_addr())
            .await
            .map_err(SsuError::Bind)?;
        let socket = Arc::new(socket);
        let local = socket.local_addr().map_err(SsuError::Bind)?;
        *self.socket.write() = Some(Arc::clone(&socket));
        *self.started_at.lock() = Some(Instant::now());

        let mut tasks = self.tasks.lock();

        // Receive loop: drain the socket into the bounded queue
        let node = Arc::clone(self);
        tasks.push(tokio::spawn(async move {
            let mut buf = vec![0u8; 65535];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, from)) => node.inbound.push(buf[..len].to_vec(), from),
                    Err(e) => {
                        if node.is_running() {
                            error!("SSU receive error: {e}");
                        } else {
                            break;
                        }
                    }
                }
            }
        }));

        // Dispatch workers
        for worker in 0..self.config.max_ssu_loop_index.max(1) {
            let node = Arc::clone(self);
            tasks.push(tokio::spawn(async move {
                loop {
                    let (raw, from) = node.inbound.pop().await;
                    node.process_datagram(raw, from).await;
                }
            }));
            debug!(worker, "dispatch worker started");
        }

        // Table sweeper
        let node = Arc::clone(self);
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                let evicted = node.reassembler.evict_expired();
                if evicted > 0 {
                    debug!(evicted, "evicted stale fragment sets");
                }
                node.pending.sweep_expired(node.config.connection_timeout);
            }
        }));

        info!(%local, "SSU node listening");
        Ok(())
    }

    /// Close the socket and cancel every waiter with a shutdown signal.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        *self.socket.write() = None;
        self.pending.drain_shutdown();
        info!("SSU node stopped");
    }

    /// Register a hook for a header token. At most one hook per header;
    /// the last one bound wins.
    pub fn bind_hook(&self, header: &str, hook: Arc<dyn PacketHandler>) {
        let previous = self.hooks.write().insert(header.to_string(), hook);
        if previous.is_some() {
            warn!(header, "hook overridden, last bound wins");
        } else {
            debug!(header, "hook bound");
        }
    }

    /// The sending half of the socket; fails when the node is stopped.
    pub fn sender(&self) -> Result<SsuSender> {
        self.socket
            .read()
            .as_ref()
            .map(|socket| SsuSender::new(Arc::clone(socket)))
            .ok_or(SsuError::NotRunning)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket
            .read()
            .as_ref()
            .and_then(|socket| socket.local_addr().ok())
    }

    /// Emit a packet to its address, fragmenting when needed.
    pub async fn send_packet(&self, packet: &Packet) -> Result<()> {
        self.sender()?.send_packet(packet).await
    }

    /// Emit a tagged request without waiting for the response. The entry
    /// still lands in the in-flight table so the response is consumed
    /// rather than re-dispatched.
    pub async fn send_ssu_request(&self, request: SsuRequest) -> Result<()> {
        let _rx = self.pending.insert(request.request_id);
        let mut packet = request.payload;
        packet.set_tag(TagKind::Request, request.request_id);
        packet.addr = Some(request.addr);
        self.send_packet(&packet).await
    }

    /// Emit a tagged request and suspend until its response arrives or
    /// the timeout elapses.
    pub async fn send_ssu_request_and_wait(
        &self,
        request: SsuRequest,
        timeout: Duration,
    ) -> Result<Packet> {
        let request_id = request.request_id;
        let rx = self.pending.insert(request_id);

        let mut packet = request.payload;
        packet.set_tag(TagKind::Request, request_id);
        packet.addr = Some(request.addr);
        if let Err(e) = self.send_packet(&packet).await {
            self.pending.remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_closed)) => Err(SsuError::Shutdown),
            Err(_elapsed) => {
                self.pending.remove(&request_id);
                Err(SsuError::Timeout)
            }
        }
    }

    /// Deliver a packet to the local hook table as if it had arrived on
    /// the wire (used by the propagation engine).
    pub async fn dispatch_local(&self, packet: Packet, from: SocketAddr) {
        self.process_packet(packet, from).await;
    }

    pub fn stats(&self) -> SsuStats {
        SsuStats {
            in_flight: self.pending.len(),
            dropped_datagrams: self.inbound.dropped.load(Ordering::Relaxed),
            pending_fragments: self.reassembler.pending_sets(),
            uptime_secs: self
                .started_at
                .lock()
                .map(|t| t.elapsed().as_secs())
                .unwrap_or(0),
        }
    }

    async fn process_datagram(&self, raw: Vec<u8>, from: SocketAddr) {
        let packet = Packet::from_raw(raw).with_addr(from);
        self.process_packet(packet, from).await;
    }

    async fn process_packet(&self, mut packet: Packet, from: SocketAddr) {
        // Reassemble fragments before anything else
        if packet.has_header(header::SSU_FRAGMENT) {
            let fragment = match FragmentPacket::from_packet(packet) {
                Ok(fragment) => fragment,
                Err(e) => {
                    warn!(%from, "bad fragment: {e}");
                    return;
                }
            };
            match self.reassembler.accept(from, &fragment) {
                Some(raw) => packet = Packet::from_raw(raw).with_addr(from),
                None => return,
            }
        }

        // Response correlation
        let request_tag = match packet.tag() {
            Some((TagKind::Response, id)) => {
                let _ = packet.strip_tag();
                if !self.pending.resolve(id, packet) {
                    debug!(request_id = %id, %from, "late response for unknown request, dropped");
                }
                return;
            }
            Some((TagKind::Request, id)) => {
                let _ = packet.strip_tag();
                Some(id)
            }
            None => None,
        };

        self.dispatch(packet, from, request_tag).await;
    }

    async fn dispatch(&self, packet: Packet, from: SocketAddr, request_tag: Option<Uuid>) {
        let Some(header_token) = packet.header().map(str::to_string) else {
            debug!(%from, "packet without header, dropped");
            return;
        };

        let hook = self.hooks.read().get(&header_token).cloned();
        let Some(hook) = hook else {
            debug!(header = %header_token, %from, "no hook bound, dropped");
            return;
        };

        let typed = match upgrade(packet) {
            Ok(typed) => typed,
            Err(e) => {
                warn!(header = %header_token, %from, "failed to upgrade packet: {e}");
                return;
            }
        };

        let sender = match self.sender() {
            Ok(sender) => sender,
            Err(_) => return,
        };
        let ctx = HandlerContext {
            sender,
            peer: from,
            request_tag,
        };

        // Never block the worker on a slow hook
        tokio::spawn(async move {
            if let Err(e) = hook.handle(typed, ctx).await {
                error!(header = %header_token, peer = %from, "handler failed: {e}");
            }
        });
    }
}
