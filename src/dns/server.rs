use crate::config::SharedDnsConfig;
use crate::dns::handlers::Handler;
use crate::dns::resolver::Resolver;
use crate::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use trust_dns_server::ServerFuture;

/// The UDP DNS responder. Bound on creation, served by [`DnsServer::run`].
pub struct DnsServer {
    socket: UdpSocket,
    handler: Handler,
}

impl DnsServer {
    /// Bind the UDP socket. Failing to do so is fatal for the DNS responder.
    pub async fn bind(config: SharedDnsConfig, resolver: Resolver) -> Result<Self, Error> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        info!(
            domain = %resolver.domain(),
            addr = %socket.local_addr()?,
            "DNS listening on UDP"
        );
        Ok(DnsServer {
            socket,
            handler: Handler::new(Arc::new(resolver)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.socket.local_addr()?)
    }

    /// Serve until `shutdown` is cancelled or the transport fails. Per-message errors are logged
    /// by the handler and never end the server. Whatever the outcome, `shutdown` is cancelled on
    /// return so that sibling listeners stop too.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), Error> {
        let _guard = ShutdownGuard(shutdown.clone());
        let mut server = ServerFuture::new(self.handler);
        server.register_socket(self.socket);

        tokio::select! {
            res = server.block_until_done() => {
                if let Err(err) = &res {
                    error!(error = %err, "DNS server failed");
                }
                Ok(res?)
            }
            () = shutdown.cancelled() => Ok(()),
        }
    }
}

struct ShutdownGuard(CancellationToken);

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.0.cancel();
        info!("DNS server stopped");
    }
}
