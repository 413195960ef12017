use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};

use crate::error::{Error, Result};

/// Maximum payload this multiplexer will ever hand to the OS. Anything
/// larger is a programmer error in the caller, not something the network
/// layer should try to cope with.
pub const MAX_DATAGRAM_SIZE: usize = 512;

type Listener = mpsc::UnboundedSender<Vec<u8>>;

/// A single bound UDP socket shared by every Pair Tester whose local
/// candidate lives at this (address, port) (§4.2). One multiplexer per
/// Candidate Tester.
///
/// Single-writer, single-reader: sends go straight through the socket,
/// and one background task owns the only `recv_from` loop. The listener
/// map is the only state touched from both the reader task and the
/// registering thread (the Session/Candidate Tester side), so it alone
/// needs a mutex.
pub struct UdpMux {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    listeners: Mutex<HashMap<SocketAddr, Listener>>,
    closed_tx: watch::Sender<bool>,
}

impl UdpMux {
    /// Binds a new multiplexer to `local_addr`. Returns `Err(Error::Bind)`
    /// on any OS error, letting the caller skip this endpoint without
    /// aborting the session (§7, BindFailure).
    pub async fn bind(local_addr: SocketAddr) -> Result<Arc<Self>> {
        let socket = UdpSocket::bind(local_addr).await.map_err(Error::Bind)?;
        let local_addr = socket.local_addr().map_err(Error::Bind)?;
        let (closed_tx, closed_rx) = watch::channel(false);

        let mux = Arc::new(UdpMux {
            socket: Arc::new(socket),
            local_addr,
            listeners: Mutex::new(HashMap::new()),
            closed_tx,
        });

        mux.clone().spawn_reader(closed_rx);
        Ok(mux)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn spawn_reader(self: Arc<Self>, mut closed_rx: watch::Receiver<bool>) {
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            loop {
                tokio::select! {
                    _ = closed_rx.changed() => {
                        break;
                    }
                    res = self.socket.recv_from(&mut buf) => {
                        match res {
                            Ok((n, sender)) => self.route(&buf[..n], sender),
                            Err(err) => {
                                log::warn!("UDP read error on {}: {}", self.local_addr, err);
                                break;
                            }
                        }
                    }
                }
            }
        });
    }

    fn route(&self, datagram: &[u8], sender: SocketAddr) {
        let listener = {
            let listeners = self.listeners.lock().unwrap();
            listeners.get(&sender).cloned()
        };
        match listener {
            Some(tx) => {
                // "Invoke it synchronously": a single send to the
                // registered pair's channel, no further buffering or
                // re-dispatch.
                let _ = tx.send(datagram.to_vec());
            }
            None => {
                log::warn!(
                    "peer-reflexive candidate encountered, ignored: {}",
                    sender
                );
            }
        }
    }

    /// Registers a listener keyed on the sender address; returns the
    /// receiving half so the caller (a Pair Tester) can await datagrams
    /// from exactly that remote peer.
    pub fn register_listener(&self, remote: SocketAddr) -> mpsc::UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().unwrap().insert(remote, tx);
        rx
    }

    pub fn unregister_listener(&self, remote: SocketAddr) {
        self.listeners.lock().unwrap().remove(&remote);
    }

    /// Best-effort single datagram send. `payload` must be ≤
    /// `MAX_DATAGRAM_SIZE` bytes; violating that is a programmer error.
    pub async fn send(&self, payload: &[u8], remote: SocketAddr) -> Result<()> {
        debug_assert!(
            payload.len() <= MAX_DATAGRAM_SIZE,
            "STUN datagram exceeds the 512-byte budget"
        );
        self.socket
            .send_to(payload, remote)
            .await
            .map_err(Error::Bind)?;
        Ok(())
    }

    /// Releases the socket; pending sends in flight are dropped along with
    /// the reader task. No further datagrams are processed once this
    /// returns.
    pub fn unbind(&self) {
        let _ = self.closed_tx.send(true);
        self.listeners.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod mux_test {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn loopback(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    #[tokio::test]
    async fn routes_datagram_to_registered_sender_only() {
        let a = UdpMux::bind(loopback(0)).await.unwrap();
        let b = UdpMux::bind(loopback(0)).await.unwrap();

        let mut from_b = a.register_listener(b.local_addr());

        b.send(b"hello", a.local_addr()).await.unwrap();

        let got = tokio::time::timeout(Duration::from_secs(1), from_b.recv())
            .await
            .expect("datagram arrives")
            .expect("channel stays open");
        assert_eq!(got, b"hello");
    }

    #[tokio::test]
    async fn datagram_from_unregistered_sender_is_dropped_not_delivered() {
        let a = UdpMux::bind(loopback(0)).await.unwrap();
        let b = UdpMux::bind(loopback(0)).await.unwrap();
        let c = UdpMux::bind(loopback(0)).await.unwrap();

        let mut from_b = a.register_listener(b.local_addr());

        c.send(b"unexpected", a.local_addr()).await.unwrap();

        let res = tokio::time::timeout(Duration::from_millis(200), from_b.recv()).await;
        assert!(res.is_err(), "no datagram should have been routed to b's listener");
    }

    #[tokio::test]
    async fn unbind_stops_further_routing() {
        let a = UdpMux::bind(loopback(0)).await.unwrap();
        let b = UdpMux::bind(loopback(0)).await.unwrap();
        let mut from_b = a.register_listener(b.local_addr());

        a.unbind();
        // Give the reader task a moment to observe the close signal.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let _ = b.send(b"late", a.local_addr()).await;
        let res = tokio::time::timeout(Duration::from_millis(100), from_b.recv()).await;
        assert!(res.is_err() || res.unwrap().is_none());
    }
}
