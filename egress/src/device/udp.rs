//! datagram egress over a non-blocking UDP socket.
//!
//! every frame becomes one datagram to the configured target. the socket
//! never blocks the egress thread: a full send buffer ends the burst early
//! and surfaces as a short send, which the transmitter retries.

use log::{debug, warn};
use mio::net::UdpSocket;
use pulse_traits::{DeviceError, NetworkDevice, TxFrame};
use std::io;
use std::marker::PhantomData;
use std::net::SocketAddr;

/// UDP transmit device.
pub struct UdpDevice<P> {
    socket: UdpSocket,
    local_addr: SocketAddr,
    target: SocketAddr,
    port: u16,
    _packet: PhantomData<fn() -> P>,
}

impl<P> UdpDevice<P> {
    /// bind a socket on `local` sending to `target`, reported as `port`.
    pub fn bind(local: SocketAddr, target: SocketAddr, port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind(local)?;
        let local_addr = socket.local_addr()?;
        Self::configure_socket(&socket);
        debug!("UdpDevice::bind: {} -> {} (port {})", local_addr, target, port);

        Ok(Self {
            socket,
            local_addr,
            target,
            port,
            _packet: PhantomData,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    // best effort: expedited forwarding class
    #[cfg(target_os = "linux")]
    fn configure_socket(socket: &UdpSocket) {
        use std::os::unix::io::AsRawFd;

        let tos: libc::c_int = 0xB8; // DSCP EF (46) << 2
        // safety: fd owned by `socket` for the whole call, optval points to a
        // live c_int and optlen matches its size
        let rc = unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                libc::IPPROTO_IP,
                libc::IP_TOS,
                &tos as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            warn!(
                "UdpDevice: failed to set IP_TOS: {}",
                io::Error::last_os_error()
            );
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn configure_socket(_socket: &UdpSocket) {}
}

impl<P: AsRef<[u8]> + Send + Sync> NetworkDevice for UdpDevice<P> {
    type Packet = P;

    #[inline]
    fn port_id(&self) -> u16 {
        self.port
    }

    fn send_packets(
        &self,
        frames: &[TxFrame<'_, P>],
        _queue_id: u16,
        _flush: bool,
    ) -> Result<usize, DeviceError> {
        let mut sent = 0;

        for frame in frames {
            match self.socket.send_to(frame.packet().as_ref(), self.target) {
                Ok(_) => sent += 1,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => break,
                Err(e) if sent == 0 => return Err(e.into()),
                Err(e) => {
                    // report what went out, the tail gets retried
                    warn!("UdpDevice: send_to {} failed after {} frames: {}", self.target, sent, e);
                    break;
                }
            }
        }

        Ok(sent)
    }
}
