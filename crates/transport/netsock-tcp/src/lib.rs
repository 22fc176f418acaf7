#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
#![doc = r#"
# netsock-tcp

## 设计动机（Why）
- **定位**：在 `netsock` 共享基础层之上实现面向连接的流式套接字，覆盖客户端建连
  与服务端监听/接受两条路径。
- **架构角色**：供单线程、轮询驱动的宿主使用；宿主每轮先调用
  [`TcpSocket::update`] 探测就绪，再据此收发。

## 核心契约（What）
- [`TcpSocketConfig`]：构造参数（端点、阻塞模式、自动建连、重试预算、探测超时）
  与套接字选项，可由 `serde` 加载；
- [`TcpSocket`]：建连、监听、接受、就绪门控的收发与健康状态；
- [`ConnectStatus`]：单次建连尝试的归一化结果；
- [`AcceptedStream`]：监听端接受得到的连接，收发不经过就绪门控；
- [`Readiness`]：最近一次探测的可读/可写快照，收发时按方向消费。

## 实现策略（How）
- 自动建连把“进行中”视为瞬态并立即重试，其余失败在 `retries` 预算内重试；
- 所有错误以 [`netsock::SocketError`] 返回，致命错误同时把健康标志置为 `Bad`。

## 风险提示（Trade-offs）
- 瞬态重试没有退避，在非阻塞建连上会忙等直到平台给出确定结果；
- 构造期自动建连失败不会让构造失败，调用方应检查 [`TcpSocket::connect_error`]
  或健康状态。
"#]

mod config;
mod connect;
mod peer;
mod readiness;
mod socket;

pub use config::{DEFAULT_WAIT_SEC, TcpSocketConfig};
pub use connect::ConnectStatus;
pub use netsock::{CloseMode, ConnectionState, TransportSocket};
pub use peer::AcceptedStream;
pub use readiness::Readiness;
pub use socket::TcpSocket;
