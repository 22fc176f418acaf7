use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};

use serde::{Deserialize, Serialize};
use socket2::{Domain, Socket, Type};
use tracing::debug;

use crate::error::{Result, SocketError};

/// 客户端角色下缺省主机解析为的回环地址。
pub const LOOPBACK_HOST: &str = "127.0.0.1";
/// 服务端角色下缺省主机解析为的“任意”地址。
pub const ANY_HOST: &str = "0.0.0.0";

/// 传输协议，决定句柄的类型（流/数据报）与协议号。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// 对应的套接字类型。
    pub fn socket_type(self) -> Type {
        match self {
            Self::Tcp => Type::STREAM,
            Self::Udp => Type::DGRAM,
        }
    }

    /// 对应的 IP 协议号。
    pub fn ip_protocol(self) -> socket2::Protocol {
        match self {
            Self::Tcp => socket2::Protocol::TCP,
            Self::Udp => socket2::Protocol::UDP,
        }
    }

    fn scheme(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// 套接字在本次通信中的角色，只影响缺省主机的解析方式。
///
/// - `Client`：缺省主机解析为回环地址，适合连接本机服务；
/// - `Host`：缺省主机解析为 `0.0.0.0`（被动解析），适合绑定全部网卡。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Client,
    Host,
}

impl Role {
    fn default_host(self) -> &'static str {
        match self {
            Self::Client => LOOPBACK_HOST,
            Self::Host => ANY_HOST,
        }
    }
}

/// 已解析的传输端点。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 在构造套接字时一次性完成解析，之后的 `connect`/`bind`/`send_to` 均复用该结果，
///   重连时不会再次触发名称解析。
///
/// ## 契约（What）
/// - `host`：调用方给出的主机名，`None` 表示按角色取缺省地址；
/// - `service`：原始端口字符串；
/// - `address`：解析得到的具体地址，构造后不可变；
/// - **后置条件**：端点由所属套接字独占，随套接字一同释放。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    host: Option<String>,
    service: String,
    protocol: Protocol,
    role: Role,
    address: SocketAddr,
}

impl Endpoint {
    /// 调用方给出的主机名。
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// 原始端口/服务字符串。
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn port(&self) -> u16 {
        self.address.port()
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// 解析后的具体地址。
    pub fn address(&self) -> SocketAddr {
        self.address
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol.scheme(), self.address)
    }
}

/// 将 `(host, service, protocol)` 解析为具体地址，并创建匹配的原始句柄。
///
/// # 教案级注释
///
/// ## 逻辑（How）
/// 1. `service` 必须是十进制端口号，否则返回 [`SocketError::Resolve`]；
/// 2. 缺省主机按 [`Role`] 取回环或任意地址；
/// 3. 通过标准库解析器解析，优先选择 IPv4 结果，没有 IPv4 时退回首个结果；
/// 4. [`EndpointResolver::open`] 在同一步内按地址族/类型/协议创建句柄，
///    解析与创建不可分别重试。
///
/// ## 注意事项（Trade-offs）
/// - 解析是阻塞调用，耗时取决于系统解析器配置。
#[derive(Clone, Copy, Debug, Default)]
pub struct EndpointResolver {
    role: Role,
}

impl EndpointResolver {
    pub fn new(role: Role) -> Self {
        Self { role }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// 仅解析，不创建句柄。
    pub fn resolve(
        &self,
        host: Option<&str>,
        service: &str,
        protocol: Protocol,
    ) -> Result<Endpoint> {
        let lookup_host = host.unwrap_or(self.role.default_host());
        let resolve_error = |source: io::Error| SocketError::Resolve {
            host: lookup_host.to_owned(),
            service: service.to_owned(),
            source,
        };

        let port: u16 = service.trim().parse().map_err(|_| {
            resolve_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "service must be a numeric port",
            ))
        })?;

        let candidates: Vec<SocketAddr> = (lookup_host, port)
            .to_socket_addrs()
            .map_err(resolve_error)?
            .collect();
        let address = candidates
            .iter()
            .copied()
            .find(SocketAddr::is_ipv4)
            .or_else(|| candidates.first().copied())
            .ok_or_else(|| {
                resolve_error(io::Error::new(
                    io::ErrorKind::NotFound,
                    "resolver returned no addresses",
                ))
            })?;

        debug!(host = lookup_host, service, %address, "endpoint resolved");
        Ok(Endpoint {
            host: host.map(str::to_owned),
            service: service.to_owned(),
            protocol,
            role: self.role,
            address,
        })
    }

    /// 解析端点并创建匹配的原始句柄。
    pub fn open(
        &self,
        host: Option<&str>,
        service: &str,
        protocol: Protocol,
    ) -> Result<(Endpoint, Socket)> {
        let endpoint = self.resolve(host, service, protocol)?;
        let socket = Socket::new(
            Domain::for_address(endpoint.address),
            protocol.socket_type(),
            Some(protocol.ip_protocol()),
        )
        .map_err(SocketError::Create)?;
        Ok((endpoint, socket))
    }
}

/// 直接由数值 IP 与端口构造地址，不经过名称解析。
///
/// `ip` 为 `None` 时在所有平台上一律返回 IPv4 回环地址。
pub fn create_address(ip: Option<&str>, port: u16) -> Result<SocketAddr> {
    let ip = match ip {
        None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Some(text) => text
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| SocketError::InvalidAddress {
                input: text.to_owned(),
            })?,
    };
    Ok(SocketAddr::new(ip, port))
}
