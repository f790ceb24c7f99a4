//! Transport capability consumed by the dial driver.
//!
//! A transport attempts a connection to exactly one address. Cancellation is
//! the caller's job: the driver races every attempt against its cancellation
//! token and drops the in-flight future, which releases whatever the
//! transport had partially set up.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::net::TcpStream;

/// Make the dial driver testable and transport-agnostic.
pub trait Transport: Send + Sync + 'static {
    type Connection: Send + 'static;

    fn connect(
        &self,
        addr: SocketAddr,
    ) -> impl Future<Output = io::Result<Self::Connection>> + Send;
}

/// Plain TCP via tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl Transport for TcpTransport {
    type Connection = TcpStream;

    async fn connect(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        TcpStream::connect(addr).await
    }
}
