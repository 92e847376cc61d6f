//! reader から consumer への info イベント用の有界チャネル

use crossbeam_channel::{Receiver, SendError, Sender, TrySendError, bounded};
use log::debug;

use crate::config::OverflowPolicy;
use crate::protocol::InfoLine;

/// 探索世代つきの info 行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisEvent {
    pub generation: u64,
    pub info: InfoLine,
}

pub type InfoReceiver = Receiver<AnalysisEvent>;

/// 送信側（reader スレッドが唯一の所有者）
pub struct InfoSender {
    tx: Sender<AnalysisEvent>,
    /// DropOldest のときだけ、最古のイベントを捨てるための受信側を持つ
    evict: Option<Receiver<AnalysisEvent>>,
}

/// 容量 `capacity`（最小 1）のチャネルを作る
pub fn info_channel(capacity: usize, policy: OverflowPolicy) -> (InfoSender, InfoReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    let evict = match policy {
        OverflowPolicy::Block => None,
        OverflowPolicy::DropOldest => Some(rx.clone()),
    };
    (InfoSender { tx, evict }, rx)
}

impl InfoSender {
    /// イベントを送る。Block では空きができるまで待つ。
    ///
    /// 受信側がすべて破棄されていれば `Err` を返す。
    pub fn send(&self, event: AnalysisEvent) -> Result<(), SendError<AnalysisEvent>> {
        let Some(evict) = &self.evict else {
            return self.tx.send(event);
        };
        let mut event = event;
        loop {
            match self.tx.try_send(event) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Disconnected(ev)) => return Err(SendError(ev)),
                Err(TrySendError::Full(ev)) => {
                    if let Ok(dropped) = evict.try_recv() {
                        debug!(
                            "info channel full, dropped oldest event (generation {}, multipv {})",
                            dropped.generation, dropped.info.multipv
                        );
                    }
                    event = ev;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(generation: u64, multipv: u32) -> AnalysisEvent {
        AnalysisEvent {
            generation,
            info: InfoLine {
                multipv,
                ..InfoLine::default()
            },
        }
    }

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = info_channel(4, OverflowPolicy::Block);
        for i in 1..=3 {
            tx.send(event(1, i)).unwrap();
        }
        let got: Vec<u32> = rx.try_iter().map(|e| e.info.multipv).collect();
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[test]
    fn test_drop_oldest_keeps_newest() {
        let (tx, rx) = info_channel(2, OverflowPolicy::DropOldest);
        for i in 1..=5 {
            tx.send(event(1, i)).unwrap();
        }
        let got: Vec<u32> = rx.try_iter().map(|e| e.info.multipv).collect();
        assert_eq!(got, vec![4, 5]);
    }

    #[test]
    fn test_block_waits_for_consumer() {
        let (tx, rx) = info_channel(1, OverflowPolicy::Block);
        tx.send(event(1, 1)).unwrap();
        let producer = std::thread::spawn(move || {
            tx.send(event(1, 2)).unwrap();
        });
        assert_eq!(rx.recv().unwrap().info.multipv, 1);
        assert_eq!(rx.recv().unwrap().info.multipv, 2);
        producer.join().unwrap();
    }

    #[test]
    fn test_disconnected_receiver() {
        let (tx, rx) = info_channel(1, OverflowPolicy::Block);
        drop(rx);
        assert!(tx.send(event(1, 1)).is_err());
    }
}
