//! VeilNet net manager
//!
//! The process-wide hub: owns the SSU node, DNS store, propagation
//! engine, record store, and the local keypair; wires the packet hooks at
//! startup and exposes the outbound request path. Tests instantiate
//! isolated managers against temp directories and ephemeral ports.

mod handlers;

pub use handlers::{ControlHandler, InternalHttpHandler};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use veilnet_core::{
    header, NodeRecord, Packet, RelayRecord, RequestProtocol, Result, TargetRi, VeilNetError,
};
use veilnet_crypto::RsaKeypair;
use veilnet_dns::{DnsHandler, DnsStore};
use veilnet_propagation::{PeerDirectory, Propagator};
use veilnet_relay::RelayHandler;
use veilnet_routing::{request_factory, ChainStrategy, Request, RI_LIST_EXTRA};
use veilnet_settings::Settings;
use veilnet_ssu::{SsuConfig, SsuNode, SsuRequest};
use veilnet_store::RecordStore;

/// Key file names under the local dir.
const PUBLIC_KEY_FILE: &str = "rsa_public";
const PRIVATE_KEY_FILE: &str = "rsa_private";

/// The process-wide network hub.
pub struct NetManager {
    settings: Settings,
    keypair: RsaKeypair,
    local_record: NodeRecord,
    ssu: Arc<SsuNode>,
    dns: Arc<DnsStore>,
    peers: Arc<PeerDirectory>,
    propagator: Arc<Propagator>,
    store: Arc<RecordStore>,
}

fn detect_container() -> bool {
    Path::new("/.dockerenv").exists() || std::env::var_os("container").is_some()
}

fn load_or_generate_keypair(store: &RecordStore) -> Result<RsaKeypair> {
    if store.key_exists(PUBLIC_KEY_FILE) && store.key_exists(PRIVATE_KEY_FILE) {
        let public_pem = store.load_key(PUBLIC_KEY_FILE)?;
        let private_pem = store.load_key(PRIVATE_KEY_FILE)?;
        info!("loaded existing RSA keypair");
        return Ok(RsaKeypair::from_pems(public_pem, private_pem));
    }

    let keypair = RsaKeypair::generate()
        .map_err(|e| VeilNetError::Config(format!("keypair generation: {e}")))?;
    store.save_key(PUBLIC_KEY_FILE, &keypair.public_pem)?;
    store.save_key(PRIVATE_KEY_FILE, &keypair.private_pem)?;
    info!(key_id = %keypair.key_id, "generated new RSA keypair");
    Ok(keypair)
}

impl NetManager {
    /// Build a manager from settings: open the store, load or create the
    /// node's keypair and local record, and construct the components.
    /// Nothing is bound to the network until [`NetManager::start`].
    pub fn new(settings: Settings) -> Result<Self> {
        let store = Arc::new(RecordStore::open(
            &settings.storage.data_dir,
            &settings.storage.sub_dirs.nri,
            &settings.storage.sub_dirs.rri,
            &settings.storage.sub_dirs.local,
        )?);

        let keypair = load_or_generate_keypair(&store)?;

        let node_id = settings
            .node
            .node_id
            .clone()
            .unwrap_or_else(|| format!("node-{}", Uuid::new_v4()));

        let local_record = match store.load_local_node() {
            Ok(record) => record,
            Err(_) => {
                // Advertise the bind host when it is a concrete address
                let advertised_ip = match settings.ssu.host.as_str() {
                    "0.0.0.0" | "" => "127.0.0.1".to_string(),
                    host => host.to_string(),
                };
                let mut record = NodeRecord::new(node_id, advertised_ip, settings.ssu.port);
                record.node_type = settings
                    .node
                    .node_type
                    .parse()
                    .unwrap_or_default();
                record.capabilities = settings.node.capabilities.clone();
                record
            }
        };

        let ssu = Arc::new(SsuNode::new(SsuConfig {
            host: settings.ssu.host.clone(),
            port: settings.ssu.port,
            max_ssu_loop_index: settings.ssu.max_ssu_loop_index,
            connection_timeout: Duration::from_secs(settings.ssu.connection_timeout_secs),
        }));
        let dns = Arc::new(DnsStore::new());
        let peers = Arc::new(PeerDirectory::new());
        let propagator = Arc::new(Propagator::new(Arc::downgrade(&ssu), Arc::clone(&peers)));

        Ok(Self {
            settings,
            keypair,
            local_record,
            ssu,
            dns,
            peers,
            propagator,
            store,
        })
    }

    /// Best-effort UPnP. The IGD client itself is an external
    /// collaborator; here we only surface the manual-forwarding hint,
    /// which is the common case in containers anyway.
    pub fn setup_upnp(&self) {
        if detect_container() {
            warn!("running in a container - UPnP is typically unavailable, consider host networking");
        }
        info!("UPnP not negotiated - running in manual port forwarding mode");
        info!(
            "please manually forward this port on your router: {}/udp",
            self.settings.ssu.port
        );
    }

    /// Bind the socket, wire all packet hooks, persist the local record,
    /// and load known peers from the store.
    pub async fn start(&self) -> Result<()> {
        self.ssu.start().await?;

        self.ssu.bind_hook(
            header::DNS,
            Arc::new(DnsHandler::new(Arc::clone(&self.dns))),
        );
        let propagation_hook: Arc<dyn veilnet_ssu::PacketHandler> =
            Arc::clone(&self.propagator) as Arc<dyn veilnet_ssu::PacketHandler>;
        self.ssu
            .bind_hook(header::PROPAGATION_PACKET, propagation_hook);
        self.ssu.bind_hook(
            header::SSU,
            Arc::new(RelayHandler::new(
                Arc::downgrade(&self.ssu),
                self.keypair.private_pem.clone(),
            )?),
        );
        self.ssu.bind_hook(
            header::SSU_CONTROL,
            Arc::new(ControlHandler::new(
                Arc::downgrade(&self.ssu),
                Arc::clone(&self.peers),
            )),
        );
        self.ssu
            .bind_hook(header::INTERNAL_HTTP_PACKET, Arc::new(InternalHttpHandler::new()));

        let mut record = self.local_record.clone();
        self.store.save_local_node(&mut record)?;
        self.load_peers_from_store()?;

        info!(
            node_id = %self.local_record.node_id,
            peers = self.peers.nri_count() + self.peers.rri_count(),
            "net manager serving"
        );
        Ok(())
    }

    pub async fn stop(&self) {
        self.ssu.stop().await;
    }

    fn load_peers_from_store(&self) -> Result<()> {
        for record in self.store.list_nri(None)? {
            if let Ok(addr) = veilnet_core::parse_addr(&record.addr_string()) {
                self.peers.add_nri_peer(addr);
            }
        }
        for record in self.store.list_rri(None)? {
            if let Ok(addr) = veilnet_core::parse_addr(&record.addr_string()) {
                self.peers.add_rri_peer(addr);
            }
        }
        Ok(())
    }

    /// Register a relay record: persist it and track its address.
    pub fn register_relay(&self, mut record: RelayRecord) -> Result<()> {
        self.store.save_rri(&mut record)?;
        if let Ok(addr) = veilnet_core::parse_addr(&record.addr_string()) {
            self.peers.add_rri_peer(addr);
        }
        Ok(())
    }

    /// Register a node record: persist it and track its address.
    pub fn register_node(&self, mut record: NodeRecord) -> Result<()> {
        self.store.save_nri(&mut record)?;
        if let Ok(addr) = veilnet_core::parse_addr(&record.addr_string()) {
            self.peers.add_nri_peer(addr);
        }
        Ok(())
    }

    /// Build a request against the currently known relay set.
    pub fn request_factory(
        &self,
        target: &str,
        payload_protocol: &str,
        contents: serde_json::Value,
    ) -> Result<Request> {
        let limit = self.settings.node.max_map_size + RI_LIST_EXTRA;
        let relays = self.store.list_rri(Some(limit))?;
        request_factory(
            target,
            payload_protocol,
            contents,
            &relays,
            self.settings.node.max_map_size,
        )
    }

    /// Send a request through the overlay and wait for its response.
    ///
    /// Returns `None` on timeout. The `i2p` branch is a stub.
    pub async fn send_request(
        &self,
        mut request: Request,
        timeout: Option<Duration>,
    ) -> Result<Option<Packet>> {
        match request.protocol {
            RequestProtocol::Ssu => {
                if !self.ssu.is_running() {
                    return Err(VeilNetError::Transport(
                        "SSU node is not running".to_string(),
                    ));
                }
                if request.chain.is_none() {
                    let strategy =
                        ChainStrategy::parse(&self.settings.node.routing_chain_method);
                    request.generate_routing_chain(strategy).await?;
                }
                let packet = request.to_ssu_packet()?;
                let addr = packet
                    .addr
                    .ok_or_else(|| VeilNetError::Transport("chain has no address".to_string()))?;
                let ssu_request = SsuRequest::new(packet, addr);
                let timeout = timeout
                    .unwrap_or_else(|| self.ssu.config().connection_timeout);

                match self.ssu.send_ssu_request_and_wait(ssu_request, timeout).await {
                    Ok(response) => Ok(Some(response)),
                    Err(veilnet_ssu::SsuError::Timeout) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
            // TODO(i2p): validation accepts the protocol but no transport
            // exists for it yet
            RequestProtocol::I2p => Err(VeilNetError::Unsupported(
                "i2p transport is not implemented".to_string(),
            )),
        }
    }

    /// Flood a packet to known peers at the configured depth.
    pub async fn propagate_packet(&self, inner: &Packet, target: TargetRi) -> Result<()> {
        self.propagator
            .propagate(inner, self.settings.node.propagation_depth, target)
            .await
    }

    pub fn ssu(&self) -> &Arc<SsuNode> {
        &self.ssu
    }

    pub fn dns(&self) -> &Arc<DnsStore> {
        &self.dns
    }

    pub fn peers(&self) -> &Arc<PeerDirectory> {
        &self.peers
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn keypair(&self) -> &RsaKeypair {
        &self.keypair
    }

    pub fn local_record(&self) -> &NodeRecord {
        &self.local_record
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
