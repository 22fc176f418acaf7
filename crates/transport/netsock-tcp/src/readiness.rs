use std::mem;

use netsock::ReadyEvents;

/// 最近一次就绪探测的快照。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 把“可读/可写”两个标志与探测动作解耦：探测只负责置位，收发负责消费，
///   调用方据此形成“先探测、再收发”的节奏。
///
/// ## 契约 (What)
/// - `observe`：以本次探测结果整体覆盖两个标志；
/// - `take_read` / `take_send`：返回标志当前值并将其清零，收发无论成败都只消费一次；
/// - `clear`：探测失败或关闭时同时清零两个标志。
///
/// ## 注意事项 (Trade-offs)
/// - 标志在一次收发后即失效，即便内核缓冲区仍有数据，调用方也必须重新探测；
///   这样每轮收发最多触碰一次句柄。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Readiness {
    can_read: bool,
    can_send: bool,
}

impl Readiness {
    pub fn can_read(&self) -> bool {
        self.can_read
    }

    pub fn can_send(&self) -> bool {
        self.can_send
    }

    pub(crate) fn observe(&mut self, events: ReadyEvents) {
        self.can_read = events.readable;
        self.can_send = events.writable;
    }

    pub(crate) fn take_read(&mut self) -> bool {
        mem::take(&mut self.can_read)
    }

    pub(crate) fn take_send(&mut self) -> bool {
        mem::take(&mut self.can_send)
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}
