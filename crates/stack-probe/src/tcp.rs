use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Whether something accepts TCP connections on `host:port` within `limit`.
pub async fn port_open(host: &str, port: u16, limit: Duration) -> bool {
    match timeout(limit, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(%host, port, error = %e, "port closed");
            false
        }
        Err(_) => {
            debug!(%host, port, "port check timed out");
            false
        }
    }
}
