//! End-to-end dials against real localhost listeners through the public API.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use testresult::TestResult;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use eyeballs::{AddressFamily, Connector, DialConfig, DialError, ResolutionError, Resolver, TcpTransport};

/// Hands out fixed per-family address lists, like a stub DNS zone.
struct StaticResolver {
    v4: Vec<IpAddr>,
    v6: Vec<IpAddr>,
}

impl Resolver for StaticResolver {
    async fn lookup(
        &self,
        _host: &str,
        family: AddressFamily,
    ) -> Result<Vec<IpAddr>, ResolutionError> {
        let addrs = match family {
            AddressFamily::Ipv4 => self.v4.clone(),
            AddressFamily::Ipv6 => self.v6.clone(),
        };
        if addrs.is_empty() {
            return Err(ResolutionError::new(family, "no test records"));
        }
        Ok(addrs)
    }
}

fn quick_config() -> DialConfig {
    let mut config = DialConfig::default();
    config
        .resolution_delay(Duration::from_millis(10))
        .connection_attempt_delay(Duration::from_millis(25));
    config
}

#[test_log::test(tokio::test)]
async fn dials_a_local_listener_through_the_full_race() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let accept = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4];
        socket.read_exact(&mut buf).await.unwrap();
        socket.write_all(&buf).await.unwrap();
    });

    let resolver = StaticResolver {
        v4: vec![addr.ip()],
        v6: vec![],
    };
    let connector = Connector::with_parts(resolver, TcpTransport, quick_config());
    let mut stream = connector.connect("stub.test", addr.port()).await?;
    assert_eq!(stream.peer_addr()?, addr);

    stream.write_all(b"ping").await?;
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf).await?;
    assert_eq!(&buf, b"ping");

    accept.await?;
    Ok(())
}

#[test_log::test(tokio::test)]
async fn falls_through_a_dead_candidate_to_a_live_one() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let live_addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = listener.accept().await;
    });

    // nothing listens on the first candidate's loopback address, so that
    // attempt is refused and the race falls through to the live one
    let resolver = StaticResolver {
        v4: vec![
            IpAddr::V4(Ipv4Addr::new(127, 63, 255, 254)),
            live_addr.ip(),
        ],
        v6: vec![],
    };
    let mut config = quick_config();
    config.overall_timeout(Duration::from_secs(10));
    let connector = Connector::with_parts(resolver, TcpTransport, config);
    let stream = connector.connect("stub.test", live_addr.port()).await?;
    assert_eq!(stream.peer_addr()?, live_addr);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn address_literal_needs_no_resolver() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = listener.accept().await;
    });

    struct NoResolver;
    impl Resolver for NoResolver {
        async fn lookup(
            &self,
            host: &str,
            _family: AddressFamily,
        ) -> Result<Vec<IpAddr>, ResolutionError> {
            panic!("literal dial must not resolve {host}");
        }
    }

    let connector = Connector::with_parts(NoResolver, TcpTransport, quick_config());
    let stream = connector.connect("127.0.0.1", addr.port()).await?;
    assert_eq!(stream.peer_addr()?, addr);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn reports_every_cause_when_nothing_is_reachable() -> TestResult {
    let dead = TcpListener::bind("127.0.0.1:0").await?;
    let dead_addr = dead.local_addr()?;
    drop(dead);

    let resolver = StaticResolver {
        v4: vec![dead_addr.ip()],
        v6: vec![],
    };
    let mut config = quick_config();
    config.overall_timeout(Duration::from_secs(10));
    let connector = Connector::with_parts(resolver, TcpTransport, config);
    let err = connector
        .connect("stub.test", dead_addr.port())
        .await
        .unwrap_err();

    match err {
        DialError::Exhausted { attempts, lookups } => {
            assert_eq!(attempts.len(), 1);
            assert_eq!(lookups.len(), 1);
            assert_eq!(lookups[0].family, AddressFamily::Ipv6);
        }
        other => panic!("expected Exhausted, got {other}"),
    }
    Ok(())
}
