//! Accept loop

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use super::error::ListenerError;
use super::session::{Session, SessionEnd, SessionSummary};
use crate::config::ListenerConfig;
use crate::shutdown::Shutdown;
use crate::sink::RecordSink;

/// Bound server socket plus the configuration its sessions use
pub struct Listener {
    inner: TcpListener,
    config: Arc<ListenerConfig>,
}

impl Listener {
    /// Bind the server socket described by `config`
    pub async fn bind(config: ListenerConfig) -> Result<Self, ListenerError> {
        config.validate()?;

        let inner = TcpListener::bind((config.address.as_str(), config.port))
            .await
            .map_err(|source| ListenerError::Bind {
                addr: config.bind_address(),
                source,
            })?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Run the accept loop until shutdown is requested or accept fails.
    ///
    /// Clients are served one after another unless the configuration asks
    /// for concurrent sessions.
    pub async fn run(
        self,
        sink: Arc<dyn RecordSink>,
        mut shutdown: Shutdown,
    ) -> Result<(), ListenerError> {
        match self.local_addr() {
            Ok(addr) => info!(
                "Waiting for connections on {} (read policy: {}, byte order: {})",
                addr, self.config.read_policy, self.config.byte_order
            ),
            Err(e) => info!("Waiting for connections (local address unknown: {})", e),
        }

        // Concurrent sessions, drained before returning on shutdown
        let mut sessions = JoinSet::new();

        loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.requested() => None,
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    log_joined(joined);
                    continue;
                }
                accepted = self.inner.accept() => Some(accepted),
            };

            let Some(accepted) = accepted else {
                info!("Shutdown requested, no longer accepting clients");
                while let Some(joined) = sessions.join_next().await {
                    log_joined(joined);
                }
                return Ok(());
            };

            let (stream, peer) = accepted.map_err(|e| {
                error!("Accept failed: {}", e);
                ListenerError::Accept(e)
            })?;
            info!("Client connected: {}", peer);

            let session = Session::new(stream, peer, &self.config);

            if self.config.concurrent {
                let sink = sink.clone();
                let mut shutdown = shutdown.clone();
                sessions.spawn(async move { session.run(sink.as_ref(), &mut shutdown).await });
            } else {
                let summary = session.run(sink.as_ref(), &mut shutdown).await;
                log_summary(&summary);
            }
        }
    }
}

fn log_joined(joined: Result<SessionSummary, JoinError>) {
    match joined {
        Ok(summary) => log_summary(&summary),
        Err(e) => warn!("Session task failed: {}", e),
    }
}

fn log_summary(summary: &SessionSummary) {
    let reason = match summary.end {
        SessionEnd::PeerClosed => "peer closed".to_string(),
        SessionEnd::ReadOnce => "single read done".to_string(),
        SessionEnd::ReadFailed(kind) => format!("read failed ({:?})", kind),
        SessionEnd::Shutdown => "shutdown".to_string(),
    };

    info!(
        "Client {} disconnected: {} ({} records, {} bytes, {} dropped)",
        summary.peer, reason, summary.records, summary.bytes_read, summary.dropped_bytes
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReadPolicy;
    use crate::shutdown::{self, ShutdownTrigger};
    use crate::sink::ChannelSink;
    use sensor_shared::{ByteOrder, SensorRecord};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    type Received = UnboundedReceiver<(SocketAddr, SensorRecord)>;

    async fn start(
        config: ListenerConfig,
    ) -> (
        SocketAddr,
        Received,
        ShutdownTrigger,
        JoinHandle<Result<(), ListenerError>>,
    ) {
        let listener = Listener::bind(config).await.expect("bind loopback");
        let addr = listener.local_addr().unwrap();
        let (sink, rx) = ChannelSink::new();
        let (trigger, shutdown) = shutdown::channel();
        let handle = tokio::spawn(listener.run(Arc::new(sink), shutdown));
        (addr, rx, trigger, handle)
    }

    async fn send(stream: &mut TcpStream, records: &[SensorRecord]) {
        for record in records {
            stream
                .write_all(&record.to_bytes(ByteOrder::Native))
                .await
                .unwrap();
        }
    }

    async fn next(rx: &mut Received) -> (SocketAddr, SensorRecord) {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("record within timeout")
            .expect("sink open")
    }

    #[tokio::test]
    async fn test_end_to_end_reports_in_order() {
        let (addr, mut rx, trigger, handle) = start(ListenerConfig::loopback()).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        send(
            &mut client,
            &[SensorRecord::new(7, 2, 23.5), SensorRecord::new(7, 3, -1.0)],
        )
        .await;
        client.shutdown().await.unwrap();

        let (_, first) = next(&mut rx).await;
        let (_, second) = next(&mut rx).await;
        assert_eq!(
            (first.device_id, first.measurement_type, first.formatted_value()),
            (7, 2, "23.50".to_string())
        );
        assert_eq!(
            (second.device_id, second.measurement_type, second.formatted_value()),
            (7, 3, "-1.00".to_string())
        );

        // The listener closes its side once the session is over
        let mut buf = [0u8; 1];
        let read = timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("server should close the connection");
        assert!(matches!(read, Ok(0) | Err(_)));

        trigger.trigger();
        let result = timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_sequential_clients_are_isolated() {
        let (addr, mut rx, trigger, _handle) = start(ListenerConfig::loopback()).await;

        let mut first = TcpStream::connect(addr).await.unwrap();
        let first_addr = first.local_addr().unwrap();
        // Half a record that must not leak into the next client's stream
        let partial = SensorRecord::new(99, 99, 99.0).to_bytes(ByteOrder::Native);
        send(&mut first, &[SensorRecord::new(1, 1, 10.0)]).await;
        first.write_all(&partial[..6]).await.unwrap();
        first.shutdown().await.unwrap();

        let mut second = TcpStream::connect(addr).await.unwrap();
        let second_addr = second.local_addr().unwrap();
        send(&mut second, &[SensorRecord::new(2, 2, 20.0)]).await;
        second.shutdown().await.unwrap();

        assert_eq!(next(&mut rx).await, (first_addr, SensorRecord::new(1, 1, 10.0)));
        assert_eq!(next(&mut rx).await, (second_addr, SensorRecord::new(2, 2, 20.0)));

        trigger.trigger();
    }

    #[tokio::test]
    async fn test_next_client_waits_for_current_session() {
        let (addr, mut rx, trigger, _handle) = start(ListenerConfig::loopback()).await;

        let mut first = TcpStream::connect(addr).await.unwrap();
        send(&mut first, &[SensorRecord::new(1, 1, 10.0)]).await;
        assert_eq!(next(&mut rx).await.1, SensorRecord::new(1, 1, 10.0));

        let mut second = TcpStream::connect(addr).await.unwrap();
        send(&mut second, &[SensorRecord::new(2, 2, 20.0)]).await;
        second.shutdown().await.unwrap();

        // First session still open: the second client is not served yet
        let pending = timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(pending.is_err());

        drop(first);
        assert_eq!(next(&mut rx).await.1, SensorRecord::new(2, 2, 20.0));

        trigger.trigger();
    }

    #[tokio::test]
    async fn test_concurrent_sessions_overlap() {
        let config = ListenerConfig {
            concurrent: true,
            ..ListenerConfig::loopback()
        };
        let (addr, mut rx, trigger, _handle) = start(config).await;

        let mut first = TcpStream::connect(addr).await.unwrap();
        send(&mut first, &[SensorRecord::new(1, 1, 10.0)]).await;
        assert_eq!(next(&mut rx).await.1, SensorRecord::new(1, 1, 10.0));

        let mut second = TcpStream::connect(addr).await.unwrap();
        send(&mut second, &[SensorRecord::new(2, 2, 20.0)]).await;

        // Served while the first client is still connected
        assert_eq!(next(&mut rx).await.1, SensorRecord::new(2, 2, 20.0));

        drop(first);
        drop(second);
        trigger.trigger();
    }

    #[tokio::test]
    async fn test_reset_client_does_not_stop_listener() {
        let (addr, mut rx, trigger, handle) = start(ListenerConfig::loopback()).await;

        let mut first = TcpStream::connect(addr).await.unwrap();
        send(&mut first, &[SensorRecord::new(1, 1, 10.0)]).await;
        assert_eq!(next(&mut rx).await.1, SensorRecord::new(1, 1, 10.0));

        // Zero linger makes the close an RST, so the session's next read fails
        #[allow(deprecated)]
        first.set_linger(Some(Duration::ZERO)).unwrap();
        drop(first);

        let mut second = TcpStream::connect(addr).await.unwrap();
        send(&mut second, &[SensorRecord::new(2, 2, 20.0)]).await;
        second.shutdown().await.unwrap();
        assert_eq!(next(&mut rx).await.1, SensorRecord::new(2, 2, 20.0));

        assert!(!handle.is_finished());
        trigger.trigger();
        let result = timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_concurrent_sessions() {
        let config = ListenerConfig {
            concurrent: true,
            ..ListenerConfig::loopback()
        };
        let (addr, mut rx, trigger, handle) = start(config).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        send(&mut client, &[SensorRecord::new(3, 1, 30.0)]).await;
        assert_eq!(next(&mut rx).await.1, SensorRecord::new(3, 1, 30.0));

        trigger.trigger();
        let result = timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert!(result.is_ok());

        // Every session finished and released its sink before run returned
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));

        let mut buf = [0u8; 1];
        let read = timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("session should have closed the connection");
        assert!(matches!(read, Ok(0) | Err(_)));
    }

    #[tokio::test]
    async fn test_single_read_policy_closes_after_first_read() {
        let config = ListenerConfig {
            read_policy: ReadPolicy::Single,
            ..ListenerConfig::loopback()
        };
        let (addr, mut rx, trigger, _handle) = start(config).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        send(&mut client, &[SensorRecord::new(5, 1, 1.5)]).await;
        assert_eq!(next(&mut rx).await.1, SensorRecord::new(5, 1, 1.5));

        // Later data on the same connection is never decoded
        let _ = client
            .write_all(&SensorRecord::new(5, 1, 2.5).to_bytes(ByteOrder::Native))
            .await;
        let pending = timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(pending.is_err());

        trigger.trigger();
    }

    #[tokio::test]
    async fn test_big_endian_records() {
        let config = ListenerConfig {
            byte_order: ByteOrder::Big,
            ..ListenerConfig::loopback()
        };
        let (addr, mut rx, trigger, _handle) = start(config).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(&SensorRecord::new(300, 4, 0.25).to_bytes(ByteOrder::Big))
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        assert_eq!(next(&mut rx).await.1, SensorRecord::new(300, 4, 0.25));
        trigger.trigger();
    }

    #[tokio::test]
    async fn test_shutdown_stops_idle_listener() {
        let (_addr, _rx, trigger, handle) = start(ListenerConfig::loopback()).await;

        trigger.trigger();
        let result = timeout(Duration::from_secs(2), handle)
            .await
            .expect("listener should stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_bind_occupied_port_fails() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();

        let config = ListenerConfig {
            port,
            ..ListenerConfig::loopback()
        };
        let err = match Listener::bind(config).await {
            Ok(_) => panic!("port {} should be in use", port),
            Err(e) => e,
        };

        assert!(matches!(err, ListenerError::Bind { .. }));
        assert!(err.to_string().contains(&format!("127.0.0.1:{}", port)));
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let config = ListenerConfig {
            chunk_size: 0,
            ..ListenerConfig::loopback()
        };
        assert!(matches!(
            Listener::bind(config).await,
            Err(ListenerError::InvalidConfig(_))
        ));
    }
}
