//! 平台协作层：就绪等待、阻塞模式与原始收包。
//!
//! 套接字状态机只依赖本模块暴露的少量原语，POSIX 与 WinSock 的差异全部收敛在这里。
#![allow(unsafe_code)]

use std::io;
use std::mem::MaybeUninit;
use std::net::SocketAddr;
use std::time::Duration;

use socket2::{SockAddr, Socket};

/// `listen` 允许的最大 backlog。
#[cfg(unix)]
pub const MAX_BACKLOG: i32 = nix::libc::SOMAXCONN;
#[cfg(windows)]
pub const MAX_BACKLOG: i32 = windows_sys::Win32::Networking::WinSock::SOMAXCONN as i32;

/// 一次有界等待后句柄在读/写兴趣集合中的去留。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadyEvents {
    pub readable: bool,
    pub writable: bool,
}

/// 切换句柄的阻塞模式。
pub fn set_blocking(socket: &Socket, blocking: bool) -> io::Result<()> {
    socket.set_nonblocking(!blocking)
}

/// 对单个句柄的读、写兴趣执行一次有界等待。
///
/// 超时并非错误：返回的两个标志均为 `false`。每次调用都会重新登记兴趣集合
/// 并重新构造超时值，不受上一次等待剩余时间的影响。
pub fn wait_ready(socket: &Socket, timeout: Duration) -> io::Result<ReadyEvents> {
    sys::select_single(socket, timeout)
}

/// 将数据读入调用方缓冲区。
pub fn recv(socket: &Socket, buf: &mut [u8]) -> io::Result<usize> {
    socket.recv(as_uninit(buf))
}

/// 读取一个数据报并返回来源地址。
pub fn recv_from(socket: &Socket, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
    let (len, from) = socket.recv_from(as_uninit(buf))?;
    Ok((len, to_socket_addr(&from)?))
}

/// 将 `SockAddr` 转换为 IP 地址。
pub fn to_socket_addr(addr: &SockAddr) -> io::Result<SocketAddr> {
    addr.as_socket().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "peer address is not an IPv4/IPv6 address",
        )
    })
}

fn as_uninit(buf: &mut [u8]) -> &mut [MaybeUninit<u8>] {
    // SAFETY: `MaybeUninit<u8>` 与 `u8` 布局一致；socket2 只向切片写入已初始化的字节，
    // 不会写入未初始化值。
    unsafe { &mut *(buf as *mut [u8] as *mut [MaybeUninit<u8>]) }
}

#[cfg(unix)]
mod sys {
    use std::io;
    use std::os::fd::{AsFd, AsRawFd};
    use std::time::Duration;

    use nix::libc;
    use nix::sys::select::{FdSet, select};
    use nix::sys::time::TimeVal;
    use socket2::Socket;

    use super::ReadyEvents;

    pub(super) fn select_single(socket: &Socket, timeout: Duration) -> io::Result<ReadyEvents> {
        let fd = socket.as_fd();
        if fd.as_raw_fd() as usize >= libc::FD_SETSIZE as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "descriptor exceeds FD_SETSIZE",
            ));
        }

        let mut readfds = FdSet::new();
        let mut writefds = FdSet::new();
        readfds.insert(fd);
        writefds.insert(fd);
        // 超大秒数截断到 i32::MAX，避免转换成负的 time_t 让 select 返回 EINVAL。
        let secs = timeout.as_secs().min(i32::MAX as u64);
        let mut tv = TimeVal::new(secs as _, timeout.subsec_micros() as _);

        select(None, &mut readfds, &mut writefds, None, &mut tv).map_err(io::Error::from)?;

        Ok(ReadyEvents {
            readable: readfds.contains(fd),
            writable: writefds.contains(fd),
        })
    }
}

#[cfg(windows)]
mod sys {
    use std::io;
    use std::os::windows::io::AsRawSocket;
    use std::ptr;
    use std::time::Duration;

    use socket2::Socket;
    use windows_sys::Win32::Networking::WinSock::{self, FD_SET, SOCKET, SOCKET_ERROR, TIMEVAL};

    use super::ReadyEvents;

    pub(super) fn select_single(socket: &Socket, timeout: Duration) -> io::Result<ReadyEvents> {
        let raw = socket.as_raw_socket() as SOCKET;
        let mut read_set = FD_SET {
            fd_count: 1,
            fd_array: [0; 64],
        };
        read_set.fd_array[0] = raw;
        let mut write_set = read_set;
        let tv = TIMEVAL {
            tv_sec: timeout.as_secs().min(i32::MAX as u64) as i32,
            tv_usec: timeout.subsec_micros() as i32,
        };

        // SAFETY: 两个集合与超时值在调用期间均有效，nfds 在 WinSock 中被忽略。
        let rc = unsafe { WinSock::select(0, &mut read_set, &mut write_set, ptr::null_mut(), &tv) };
        if rc == SOCKET_ERROR {
            return Err(io::Error::last_os_error());
        }

        Ok(ReadyEvents {
            readable: contains(&read_set, raw),
            writable: contains(&write_set, raw),
        })
    }

    fn contains(set: &FD_SET, raw: SOCKET) -> bool {
        set.fd_array[..set.fd_count as usize].contains(&raw)
    }
}
