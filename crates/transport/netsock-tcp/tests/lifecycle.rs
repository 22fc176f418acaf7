//! 回环地址上的 TCP 套接字生命周期：监听、建连、就绪门控的收发与关闭。

use std::net::{SocketAddr, TcpListener};

use netsock::{SocketError, TERMINATOR};
use netsock_tcp::{
    AcceptedStream, CloseMode, ConnectStatus, ConnectionState, TcpSocket, TcpSocketConfig,
    TransportSocket,
};
use tracing_test::traced_test;

const WAIT_USEC: u32 = 200_000;

fn listening_server() -> TcpSocket {
    let config = TcpSocketConfig::server("0")
        .with_host("127.0.0.1")
        .with_wait(0, WAIT_USEC);
    let mut server = TcpSocket::open(&config).expect("服务端构造");
    server.bind_endpoint().expect("绑定回环端口");
    server.listen(0).expect("监听");
    server
}

fn client_config(addr: SocketAddr) -> TcpSocketConfig {
    TcpSocketConfig::new(addr.port().to_string())
        .with_host("127.0.0.1")
        .with_wait(2, 0)
}

/// 建立一对已连接的客户端与服务端连接。
fn connected_pair() -> (TcpSocket, TcpSocket, AcceptedStream) {
    let mut server = listening_server();
    let addr = server.local_addr().expect("读取监听地址");
    let client = TcpSocket::open(&client_config(addr)).expect("客户端构造");
    let accepted = server
        .accept()
        .expect("接受连接")
        .expect("阻塞模式下必有连接");
    (server, client, accepted)
}

/// 绑定后立即释放，得到一个当前无人监听的端口。
fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("临时监听");
    listener.local_addr().expect("读取端口").port()
}

#[test]
fn listening_socket_is_good() {
    let server = listening_server();
    assert_eq!(server.state(), ConnectionState::Good);
    assert!(server.connect_error().is_none());
}

#[test]
fn socket_without_auto_connect_starts_bad() {
    let config = TcpSocketConfig::new(unused_port().to_string())
        .with_host("127.0.0.1")
        .with_auto_connect(false);
    let socket = TcpSocket::open(&config).expect("构造");
    assert_eq!(socket.state(), ConnectionState::Bad);
    assert!(socket.connect_error().is_none());
    assert!(!socket.can_read());
    assert!(!socket.can_send());
}

#[test]
fn auto_connect_marks_client_good() {
    let (_server, client, accepted) = connected_pair();
    assert_eq!(client.state(), ConnectionState::Good);
    assert!(client.connect_error().is_none());
    assert_eq!(
        accepted.peer_addr(),
        client.local_addr().expect("客户端本地地址")
    );
}

#[test]
#[traced_test]
fn refused_auto_connect_exhausts_retries() {
    let config = TcpSocketConfig::new(unused_port().to_string())
        .with_host("127.0.0.1")
        .with_retries(3);
    let socket = TcpSocket::open(&config).expect("构造本身不因建连失败而失败");
    assert_eq!(socket.state(), ConnectionState::Bad);
    match socket.connect_error() {
        Some(SocketError::Connect { attempts, .. }) => assert_eq!(*attempts, 4),
        other => panic!("意外的建连结果: {other:?}"),
    }
    assert!(logs_contain("auto-connect gave up"));
}

#[test]
#[traced_test]
fn peer_close_is_logged_as_warning() {
    let (_server, mut client, accepted) = connected_pair();
    drop(accepted);
    client.update().expect("探测");
    let mut buf = [0u8; 8];
    assert!(matches!(client.recv(&mut buf, 0), Err(SocketError::PeerClosed)));
    assert!(logs_contain("WARN"));
    assert!(logs_contain("peer closed connection"));
}

#[test]
fn nonblocking_auto_connect_reaches_good() {
    let mut server = listening_server();
    let addr = server.local_addr().expect("监听地址");
    let client =
        TcpSocket::open(&client_config(addr).with_blocking(false)).expect("非阻塞客户端构造");
    assert_eq!(client.state(), ConnectionState::Good);
    assert!(client.connect_error().is_none());
    assert!(!client.is_blocking());
    assert!(server.accept().expect("接受").is_some());
}

#[test]
fn nonblocking_refused_auto_connect_spends_whole_budget() {
    let config = TcpSocketConfig::new(unused_port().to_string())
        .with_host("127.0.0.1")
        .with_blocking(false)
        .with_retries(3);
    let socket = TcpSocket::open(&config).expect("构造本身不因建连失败而失败");
    assert_eq!(socket.state(), ConnectionState::Bad);
    match socket.connect_error() {
        Some(SocketError::Connect { attempts, .. }) => assert_eq!(*attempts, 4),
        other => panic!("意外的建连结果: {other:?}"),
    }
}

#[test]
fn explicit_connect_reports_connected_once_established() {
    let mut server = listening_server();
    let addr = server.local_addr().expect("监听地址");
    let mut client =
        TcpSocket::open(&client_config(addr).with_auto_connect(false)).expect("客户端构造");
    assert!(client.connect().expect("句柄有效").is_connected());
    assert_eq!(client.state(), ConnectionState::Good);

    // 已连接的句柄再次建连同样视为成功。
    let again = client.connect().expect("句柄有效");
    assert!(matches!(again, ConnectStatus::Connected));
    let _accepted = server.accept().expect("接受");
}

#[test]
fn idle_listener_skips_send_and_recv() {
    let mut server = listening_server();
    let readiness = server.update().expect("探测");
    assert!(!readiness.can_read());
    assert!(!readiness.can_send());

    let mut buf = [b'x'; 8];
    assert_eq!(server.send(b"ignored").expect("未就绪时为空操作"), 0);
    assert_eq!(server.recv(&mut buf, 0).expect("未就绪时为空操作"), 0);
    assert_eq!(buf, [b'x'; 8]);
}

#[test]
fn nonblocking_accept_without_pending_connection_returns_none() {
    let config = TcpSocketConfig::server("0")
        .with_host("127.0.0.1")
        .with_blocking(false);
    let mut server = TcpSocket::open(&config).expect("构造");
    server.bind_endpoint().expect("绑定");
    server.listen(-1).expect("监听");
    assert!(server.accept().expect("非阻塞接受").is_none());
    assert_eq!(server.state(), ConnectionState::Good);
}

#[test]
fn round_trip_writes_terminator_after_payload() {
    let (server, mut client, accepted) = connected_pair();

    assert!(client.update().expect("探测").can_send());
    assert_eq!(client.send(b"hello").expect("发送"), 5);

    let mut inbound = [b'#'; 16];
    let received = server.recv_on(&accepted, &mut inbound, 0).expect("接收");
    assert_eq!(&inbound[..received], b"hello");
    assert_eq!(inbound[received], TERMINATOR);

    assert_eq!(server.send_on(&accepted, b"pong").expect("回复"), 4);
    assert!(client.update().expect("探测").can_read());
    let mut reply = [b'#'; 16];
    assert_eq!(client.recv(&mut reply, 2).expect("接收回复"), 4);
    assert_eq!(&reply[2..6], b"pong");
    assert_eq!(reply[6], TERMINATOR);
    assert_eq!(&reply[..2], b"##");
}

#[test]
fn send_consumes_writable_flag() {
    let (_server, mut client, _accepted) = connected_pair();
    client.update().expect("探测");
    assert_eq!(client.send(b"a").expect("首次发送"), 1);
    assert!(!client.can_send());
    // 未重新探测前，第二次发送不会触碰句柄。
    assert_eq!(client.send(b"b").expect("标志已消费"), 0);
}

#[test]
fn recv_rejects_buffer_without_payload_room() {
    let (server, mut client, accepted) = connected_pair();
    server.send_on(&accepted, b"data").expect("发送");
    assert!(client.update().expect("探测").can_read());

    let mut tiny = [0u8; 3];
    let err = client.recv(&mut tiny, 2).expect_err("没有载荷空间");
    assert!(matches!(err, SocketError::BufferTooSmall { .. }));
    assert!(client.can_read());
}

#[test]
fn peer_close_marks_client_bad() {
    let (_server, mut client, accepted) = connected_pair();
    accepted.shutdown().expect("关闭对端");
    drop(accepted);

    assert!(client.update().expect("探测").can_read());
    let mut buf = [0u8; 8];
    let err = client.recv(&mut buf, 0).expect_err("对端已关闭");
    assert!(matches!(err, SocketError::PeerClosed));
    assert_eq!(client.state(), ConnectionState::Bad);
}

#[test]
fn accepted_peer_close_leaves_listener_good() {
    let (server, client, accepted) = connected_pair();
    drop(client);

    let mut buf = [0u8; 8];
    let err = server
        .recv_on(&accepted, &mut buf, 0)
        .expect_err("客户端已关闭");
    assert!(matches!(err, SocketError::PeerClosed));
    assert_eq!(server.state(), ConnectionState::Good);
}

#[test]
fn close_is_idempotent_and_clears_readiness() {
    let (_server, mut client, _accepted) = connected_pair();
    client.update().expect("探测");
    client.close(CloseMode::Immediate).expect("关闭");
    client.close(CloseMode::Immediate).expect("重复关闭");

    assert!(client.is_closed());
    assert_eq!(client.state(), ConnectionState::Bad);
    assert!(!client.can_send());
    assert!(matches!(client.update(), Err(SocketError::Closed)));
    assert_eq!(client.send(b"late").expect("未就绪"), 0);
}

#[test]
fn graceful_close_then_immediate_release() {
    let (_server, mut client, _accepted) = connected_pair();
    assert!(client.update().expect("探测").can_send());
    client.close(CloseMode::Graceful).expect("关闭数据流");
    assert!(!client.is_closed());
    assert!(!client.can_send());
    assert_eq!(client.send(b"late").expect("标志已清零"), 0);
    assert_eq!(client.state(), ConnectionState::Bad);
    client.close(CloseMode::Immediate).expect("释放句柄");
    assert!(client.is_closed());
}
