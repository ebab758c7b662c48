//! Resolver facade: recursive lookups, directed queries, zone transfers.
//!
//! Recursive resolution goes through a shared Hickory resolver configured
//! with public upstreams (UDP with automatic TCP fallback, one retry against
//! the secondary). Directed queries build raw protocol messages and speak to
//! a specific server IP, which is what the parent-delegation probe and the
//! per-nameserver sub-checks need: they must see authority sections, AA
//! flags, and response codes that the resolver API hides.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_resolver::proto::rr::{DNSClass, Name, Record, RecordType};
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::{ResolveError, TokioResolver};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use crate::error::{LookupError, LookupErrorKind, LookupResult};
use crate::types::SoaRecord;

/// Hard timeout for a single DNS exchange.
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for a zone-transfer attempt (connect and per-read).
const AXFR_TIMEOUT: Duration = Duration::from_secs(5);

/// Receive buffer for UDP responses (EDNS-sized).
const UDP_BUFFER_SIZE: usize = 4096;

/// Default public upstreams used for recursive lookups.
const DEFAULT_UPSTREAMS: [IpAddr; 2] = [
    IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
    IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
];

/// A directed query response with all sections exposed.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    pub additionals: Vec<Record>,
    pub authoritative: bool,
    pub response_code: ResponseCode,
}

/// Facade over the stub resolver and the directed-query primitives.
///
/// Cheap to share behind an `Arc`; safe for many concurrent queries.
pub struct DnsClient {
    resolver: TokioResolver,
    resolver_label: String,
}

impl Default for DnsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsClient {
    /// Build a client resolving through the default public upstreams.
    pub fn new() -> Self {
        Self::with_upstreams(&DEFAULT_UPSTREAMS)
    }

    /// Build a client resolving through the given upstream IPs.
    ///
    /// `attempts = 2` gives one retry, which lands on the secondary upstream
    /// when two are configured.
    pub fn with_upstreams(upstreams: &[IpAddr]) -> Self {
        let config = ResolverConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(upstreams, 53, true),
        );
        let provider = TokioConnectionProvider::default();
        let mut opts = ResolverOpts::default();
        opts.timeout = QUERY_TIMEOUT;
        opts.attempts = 2;
        let resolver = TokioResolver::builder_with_config(config, provider)
            .with_options(opts)
            .build();
        let resolver_label = upstreams
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self {
            resolver,
            resolver_label,
        }
    }

    /// Human-readable list of the configured upstream resolvers.
    pub fn resolver_label(&self) -> &str {
        &self.resolver_label
    }

    // ─── Recursive lookups ─────────────────────────────────

    /// Resolve A records.
    pub async fn ipv4(&self, name: &str) -> LookupResult<Vec<Ipv4Addr>> {
        let response = self.resolver.ipv4_lookup(name).await.map_err(classify)?;
        Ok(response.iter().map(|a| a.0).collect())
    }

    /// Resolve AAAA records.
    pub async fn ipv6(&self, name: &str) -> LookupResult<Vec<std::net::Ipv6Addr>> {
        let response = self.resolver.ipv6_lookup(name).await.map_err(classify)?;
        Ok(response.iter().map(|aaaa| aaaa.0).collect())
    }

    /// Resolve MX records as `(priority, exchange)` pairs, trailing dots
    /// stripped.
    pub async fn mx(&self, name: &str) -> LookupResult<Vec<(u16, String)>> {
        let response = self.resolver.mx_lookup(name).await.map_err(classify)?;
        Ok(response
            .iter()
            .map(|mx| (mx.preference(), strip_dot(&mx.exchange().to_string())))
            .collect())
    }

    /// Resolve TXT records, concatenating character-string segments.
    pub async fn txt(&self, name: &str) -> LookupResult<Vec<String>> {
        let response = self.resolver.txt_lookup(name).await.map_err(classify)?;
        Ok(response
            .iter()
            .map(|txt| {
                txt.iter()
                    .map(|segment| String::from_utf8_lossy(segment).to_string())
                    .collect::<String>()
            })
            .collect())
    }

    /// Resolve NS records; returns the target hostnames and the RRset TTL.
    pub async fn ns(&self, name: &str) -> LookupResult<(Vec<String>, Option<u32>)> {
        let response = self.resolver.ns_lookup(name).await.map_err(classify)?;
        let ttl = response
            .as_lookup()
            .record_iter()
            .next()
            .map(hickory_resolver::proto::rr::Record::ttl);
        let hosts = response
            .iter()
            .map(|ns| strip_dot(&ns.to_string()))
            .collect();
        Ok((hosts, ttl))
    }

    /// Resolve the SOA record of the nearest enclosing zone.
    pub async fn soa(&self, name: &str) -> LookupResult<SoaRecord> {
        let response = self.resolver.soa_lookup(name).await.map_err(classify)?;
        response
            .iter()
            .next()
            .map(|soa| SoaRecord {
                mname: strip_dot(&soa.mname().to_string()),
                rname: strip_dot(&soa.rname().to_string()),
                serial: soa.serial(),
                refresh: soa.refresh(),
                retry: soa.retry(),
                expire: soa.expire(),
                minimum: soa.minimum(),
            })
            .ok_or_else(|| LookupError::new(LookupErrorKind::NoData, format!("no SOA for {name}")))
    }

    /// Resolve CNAME targets (usually zero or one), trailing dots stripped.
    pub async fn cname(&self, name: &str) -> LookupResult<Vec<String>> {
        let response = self
            .resolver
            .lookup(name, RecordType::CNAME)
            .await
            .map_err(classify)?;
        Ok(response
            .record_iter()
            .filter_map(|record| record.data().as_cname())
            .map(|cname| strip_dot(&cname.0.to_string()))
            .collect())
    }

    /// Generic recursive lookup returning raw records (CAA, DS, DNSKEY, ...).
    pub async fn lookup_raw(&self, name: &str, rtype: RecordType) -> LookupResult<Vec<Record>> {
        let response = self
            .resolver
            .lookup(name, rtype)
            .await
            .map_err(classify)?;
        Ok(response.record_iter().cloned().collect())
    }

    /// Reverse lookup: PTR names for an IP, trailing dots stripped.
    pub async fn reverse(&self, ip: IpAddr) -> LookupResult<Vec<String>> {
        let response = self.resolver.reverse_lookup(ip).await.map_err(classify)?;
        Ok(response
            .iter()
            .map(|ptr| strip_dot(&ptr.0.to_string()))
            .collect())
    }

    // ─── Directed queries ──────────────────────────────────

    /// Send one query straight to `server` and return the full response.
    ///
    /// Response codes are data here, not errors: an NXDOMAIN answer from a
    /// directly-queried nameserver is a diagnostic result. Only transport
    /// failures (timeout, unreachable, undecodable) produce `Err`.
    pub async fn query_at(
        &self,
        server: IpAddr,
        name: &str,
        rtype: RecordType,
        recursion_desired: bool,
    ) -> LookupResult<RawResponse> {
        let wire = build_query(name, rtype, recursion_desired)?;
        let response = match self.udp_exchange(server, &wire).await {
            Ok(message) if message.truncated() => self.tcp_exchange(server, &wire).await?,
            Ok(message) => message,
            Err(err) => return Err(err),
        };
        Ok(RawResponse {
            answers: response.answers().to_vec(),
            authorities: response.name_servers().to_vec(),
            additionals: response.additionals().to_vec(),
            authoritative: response.authoritative(),
            response_code: response.response_code(),
        })
    }

    /// Query the SOA serial of `zone` directly at `server`.
    pub async fn soa_serial_at(&self, server: IpAddr, zone: &str) -> LookupResult<Option<u32>> {
        let response = self.query_at(server, zone, RecordType::SOA, false).await?;
        Ok(response
            .answers
            .iter()
            .find_map(|record| record.data().as_soa().map(|soa| soa.serial())))
    }

    async fn udp_exchange(&self, server: IpAddr, wire: &[u8]) -> LookupResult<Message> {
        let bind_addr: (&str, u16) = if server.is_ipv4() {
            ("0.0.0.0", 0)
        } else {
            ("::", 0)
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| LookupError::new(LookupErrorKind::Network, e.to_string()))?;
        socket
            .send_to(wire, (server, 53))
            .await
            .map_err(|e| LookupError::new(LookupErrorKind::Network, e.to_string()))?;

        let mut buf = vec![0u8; UDP_BUFFER_SIZE];
        let (len, _) = timeout(QUERY_TIMEOUT, socket.recv_from(&mut buf))
            .await
            .map_err(|_| {
                LookupError::new(
                    LookupErrorKind::Timeout,
                    format!("no response from {server} within {}s", QUERY_TIMEOUT.as_secs()),
                )
            })?
            .map_err(|e| LookupError::new(LookupErrorKind::Network, e.to_string()))?;

        let message = Message::from_vec(&buf[..len])
            .map_err(|e| LookupError::new(LookupErrorKind::Parse, e.to_string()))?;
        if message.id() != u16::from_be_bytes([wire[0], wire[1]]) {
            return Err(LookupError::new(
                LookupErrorKind::Parse,
                format!("mismatched response id from {server}"),
            ));
        }
        Ok(message)
    }

    async fn tcp_exchange(&self, server: IpAddr, wire: &[u8]) -> LookupResult<Message> {
        let mut stream = timeout(QUERY_TIMEOUT, TcpStream::connect((server, 53)))
            .await
            .map_err(|_| {
                LookupError::new(LookupErrorKind::Timeout, format!("connect to {server} timed out"))
            })?
            .map_err(|e| LookupError::new(LookupErrorKind::Network, e.to_string()))?;

        write_framed(&mut stream, wire).await?;
        let body = timeout(QUERY_TIMEOUT, read_framed(&mut stream))
            .await
            .map_err(|_| {
                LookupError::new(LookupErrorKind::Timeout, format!("read from {server} timed out"))
            })??;
        Message::from_vec(&body).map_err(|e| LookupError::new(LookupErrorKind::Parse, e.to_string()))
    }

    // ─── Zone transfer ─────────────────────────────────────

    /// Attempt a full zone transfer of `zone` from `server`.
    ///
    /// A completed transfer returns the record set (excluding the trailing
    /// SOA repeat); a refusal or error response comes back as a
    /// [`LookupError`] so callers can treat "transfer denied" as the healthy
    /// outcome it is.
    pub async fn zone_transfer(&self, server: IpAddr, zone: &str) -> LookupResult<Vec<Record>> {
        let wire = build_query(zone, RecordType::AXFR, false)?;
        let mut stream = timeout(AXFR_TIMEOUT, TcpStream::connect((server, 53)))
            .await
            .map_err(|_| {
                LookupError::new(LookupErrorKind::Timeout, format!("connect to {server} timed out"))
            })?
            .map_err(|e| LookupError::new(LookupErrorKind::Network, e.to_string()))?;

        write_framed(&mut stream, &wire).await?;

        let mut records: Vec<Record> = Vec::new();
        let mut soa_count = 0usize;
        while soa_count < 2 {
            let body = match timeout(AXFR_TIMEOUT, read_framed(&mut stream)).await {
                Ok(Ok(body)) => body,
                // Closed or quiet stream: treat whatever arrived as the answer
                Ok(Err(_)) | Err(_) => break,
            };
            let message = Message::from_vec(&body)
                .map_err(|e| LookupError::new(LookupErrorKind::Parse, e.to_string()))?;
            match message.response_code() {
                ResponseCode::NoError => {}
                ResponseCode::Refused | ResponseCode::NotAuth => {
                    return Err(LookupError::new(
                        LookupErrorKind::Refused,
                        format!("{server} refused zone transfer"),
                    ));
                }
                code => {
                    return Err(LookupError::new(
                        LookupErrorKind::ServFail,
                        format!("{server} answered {code} to zone transfer"),
                    ));
                }
            }
            if message.answers().is_empty() {
                break;
            }
            for record in message.answers() {
                if record.record_type() == RecordType::SOA {
                    soa_count += 1;
                    if soa_count == 2 {
                        break;
                    }
                }
                records.push(record.clone());
            }
        }

        if records.is_empty() {
            return Err(LookupError::new(
                LookupErrorKind::Refused,
                format!("{server} returned no records for zone transfer"),
            ));
        }
        Ok(records)
    }

    // ─── ICMP reachability ─────────────────────────────────

    /// Send one ICMP echo via the system `ping` binary.
    ///
    /// Returns `false` on no reply, non-zero exit, or a missing binary;
    /// firewalled nameservers commonly fail this while being healthy.
    pub async fn ping(&self, ip: &str) -> bool {
        #[cfg(windows)]
        let args: [&str; 5] = ["-n", "1", "-w", "2000", ip];
        #[cfg(not(windows))]
        let args: [&str; 5] = ["-c", "1", "-W", "2", ip];

        let status = tokio::process::Command::new("ping")
            .args(args)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
        matches!(
            timeout(Duration::from_secs(3), status).await,
            Ok(Ok(code)) if code.success()
        )
    }
}

/// Serialize a query message for `name`/`rtype` with a random id.
fn build_query(name: &str, rtype: RecordType, recursion_desired: bool) -> LookupResult<Vec<u8>> {
    let name = Name::from_ascii(name)
        .map_err(|e| LookupError::new(LookupErrorKind::Parse, format!("bad name {name}: {e}")))?;
    let mut query = Query::query(name, rtype);
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new();
    message.set_id(rand::random());
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(recursion_desired);
    message.add_query(query);
    message
        .to_vec()
        .map_err(|e| LookupError::new(LookupErrorKind::Parse, e.to_string()))
}

async fn write_framed(stream: &mut TcpStream, wire: &[u8]) -> LookupResult<()> {
    // u16 framing bounds the length; queries are always tiny
    #[allow(clippy::cast_possible_truncation)]
    let len = (wire.len() as u16).to_be_bytes();
    stream
        .write_all(&len)
        .await
        .map_err(|e| LookupError::new(LookupErrorKind::Network, e.to_string()))?;
    stream
        .write_all(wire)
        .await
        .map_err(|e| LookupError::new(LookupErrorKind::Network, e.to_string()))
}

async fn read_framed(stream: &mut TcpStream) -> LookupResult<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| LookupError::new(LookupErrorKind::Network, e.to_string()))?;
    let len = usize::from(u16::from_be_bytes(len_buf));
    let mut body = vec![0u8; len];
    stream
        .read_exact(&mut body)
        .await
        .map_err(|e| LookupError::new(LookupErrorKind::Network, e.to_string()))?;
    Ok(body)
}

/// Strip one trailing dot from a presentation-format name.
fn strip_dot(name: &str) -> String {
    name.trim_end_matches('.').to_string()
}

/// Map a resolver error onto the engine's lookup taxonomy.
fn classify(err: ResolveError) -> LookupError {
    let message = err.to_string();
    if let Some(proto) = err.proto() {
        match proto.kind() {
            ProtoErrorKind::NoRecordsFound { response_code, .. } => {
                let kind = match *response_code {
                    ResponseCode::NXDomain => LookupErrorKind::NxDomain,
                    ResponseCode::ServFail => LookupErrorKind::ServFail,
                    ResponseCode::Refused => LookupErrorKind::Refused,
                    _ => LookupErrorKind::NoData,
                };
                return LookupError::new(kind, message);
            }
            ProtoErrorKind::Timeout => {
                return LookupError::new(LookupErrorKind::Timeout, message);
            }
            ProtoErrorKind::Io(_) => {
                return LookupError::new(LookupErrorKind::Network, message);
            }
            _ => {}
        }
    }
    if err.is_nx_domain() {
        LookupError::new(LookupErrorKind::NxDomain, message)
    } else if err.is_no_records_found() {
        LookupError::new(LookupErrorKind::NoData, message)
    } else {
        LookupError::new(LookupErrorKind::Network, message)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_dot() {
        assert_eq!(strip_dot("example.com."), "example.com");
        assert_eq!(strip_dot("example.com"), "example.com");
        assert_eq!(strip_dot(""), "");
    }

    #[test]
    fn test_build_query_round_trips() {
        let wire = build_query("example.com", RecordType::NS, false).unwrap();
        let message = Message::from_vec(&wire).unwrap();
        assert_eq!(message.queries().len(), 1);
        assert_eq!(message.queries()[0].query_type(), RecordType::NS);
        assert!(!message.recursion_desired());

        let wire = build_query("example.com", RecordType::A, true).unwrap();
        let message = Message::from_vec(&wire).unwrap();
        assert!(message.recursion_desired());
    }

    #[test]
    fn test_build_query_rejects_garbage_name() {
        let overlong = format!("{}.com", "a".repeat(300));
        assert!(build_query(&overlong, RecordType::A, true).is_err());
    }

    #[test]
    fn test_client_construction() {
        let client = DnsClient::new();
        assert_eq!(client.resolver_label(), "8.8.8.8,1.1.1.1");

        let client = DnsClient::with_upstreams(&[IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9))]);
        assert_eq!(client.resolver_label(), "9.9.9.9");
    }

    #[tokio::test]
    async fn test_query_at_rejects_bad_name() {
        let client = DnsClient::new();
        let overlong = format!("{}.com", "a".repeat(300));
        let result = client
            .query_at(
                IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
                &overlong,
                RecordType::A,
                false,
            )
            .await;
        assert!(matches!(result, Err(e) if e.kind == LookupErrorKind::Parse));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_ipv4_lookup_real() {
        let client = DnsClient::new();
        let ips = client.ipv4("google.com").await.unwrap();
        assert!(!ips.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_query_at_real() {
        let client = DnsClient::new();
        let response = client
            .query_at(
                IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
                "google.com",
                RecordType::A,
                true,
            )
            .await
            .unwrap();
        assert_eq!(response.response_code, ResponseCode::NoError);
        assert!(!response.answers.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_reverse_real() {
        let client = DnsClient::new();
        let names = client
            .reverse(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)))
            .await
            .unwrap();
        assert!(names.iter().any(|n| n.contains("dns.google")));
    }
}
