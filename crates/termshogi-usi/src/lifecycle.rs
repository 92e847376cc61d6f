//! エンジンの状態遷移
//!
//! `Lifecycle` は値型で、`on` は現在の値とイベントから次の値を返す純粋関数。
//! 表にない組み合わせは何も変えない。セッションはこれを 1 つの Mutex で
//! 保護し、コマンドの書き込みと遷移を同じロックの中で行う。

use crate::error::{Result, UsiError};
use crate::protocol::EngineCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Uninitialized,
    WaitingHandshakeAck,
    WaitingReadyAck,
    Idling,
    Thinking,
}

impl EngineState {
    /// ステータス行の表示
    pub const fn label(self) -> &'static str {
        match self {
            EngineState::Uninitialized => "初期化完了",
            EngineState::WaitingHandshakeAck => "waiting usiok",
            EngineState::WaitingReadyAck => "waiting readyok",
            EngineState::Idling => "待機中",
            EngineState::Thinking => "検討中",
        }
    }
}

/// 状態遷移を引き起こすイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    UsiSent,
    UsiOkReceived,
    IsReadySent,
    ReadyOkReceived,
    GoSent,
    StopSent,
    BestMoveReceived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lifecycle {
    state: EngineState,
    ready_ok: bool,
    stop_sent: bool,
    bestmove_seen: bool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// 直近の isready に readyok が返っているか
    #[inline]
    pub fn ready_ok(&self) -> bool {
        self.ready_ok
    }

    #[inline]
    pub fn is_idle_and_ready(&self) -> bool {
        self.state == EngineState::Idling && self.ready_ok
    }

    /// 探索中で、まだ stop を送っていないか
    #[inline]
    pub fn stop_needed(&self) -> bool {
        self.state == EngineState::Thinking && !self.stop_sent
    }

    /// 次の状態
    #[must_use]
    pub fn on(self, event: LifecycleEvent) -> Lifecycle {
        use EngineState::*;
        use LifecycleEvent::*;

        let mut next = self;
        match (self.state, event) {
            (Uninitialized, UsiSent) => next.state = WaitingHandshakeAck,
            (WaitingHandshakeAck, UsiOkReceived) => next.state = Idling,
            (Idling, IsReadySent) => {
                next.state = WaitingReadyAck;
                next.ready_ok = false;
            }
            (WaitingReadyAck, ReadyOkReceived) => {
                next.state = Idling;
                next.ready_ok = true;
            }
            (Idling, GoSent) => {
                next.state = Thinking;
                next.stop_sent = false;
                next.bestmove_seen = false;
            }
            // stop と bestmove は順不同で両方揃ったら待機中に戻る
            (Thinking, StopSent) => {
                next.stop_sent = true;
                if self.bestmove_seen {
                    next.state = Idling;
                }
            }
            (Thinking, BestMoveReceived) => {
                next.bestmove_seen = true;
                if self.stop_sent {
                    next.state = Idling;
                }
            }
            _ => {}
        }
        next
    }

    pub fn apply(&mut self, event: LifecycleEvent) {
        *self = self.on(event);
    }

    /// 現在の状態でコマンドを送ってよいか
    pub fn check(&self, command: &EngineCommand) -> Result<()> {
        let allowed = match command {
            EngineCommand::Usi => self.state == EngineState::Uninitialized,
            EngineCommand::SetOption { .. }
            | EngineCommand::IsReady
            | EngineCommand::UsiNewGame
            | EngineCommand::Position { .. }
            | EngineCommand::GoInfinite => self.state == EngineState::Idling,
            EngineCommand::Stop | EngineCommand::Quit => true,
        };
        if allowed {
            Ok(())
        } else {
            Err(UsiError::IllegalCommand {
                command: command.keyword().to_string(),
                state: self.state,
            })
        }
    }
}

/// 送ったコマンドに対応するイベント
pub fn event_for(command: &EngineCommand) -> Option<LifecycleEvent> {
    match command {
        EngineCommand::Usi => Some(LifecycleEvent::UsiSent),
        EngineCommand::IsReady => Some(LifecycleEvent::IsReadySent),
        EngineCommand::GoInfinite => Some(LifecycleEvent::GoSent),
        EngineCommand::Stop => Some(LifecycleEvent::StopSent),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EngineState::*;
    use LifecycleEvent::*;

    const ALL_EVENTS: [LifecycleEvent; 7] = [
        UsiSent,
        UsiOkReceived,
        IsReadySent,
        ReadyOkReceived,
        GoSent,
        StopSent,
        BestMoveReceived,
    ];

    fn run(events: &[LifecycleEvent]) -> Lifecycle {
        events.iter().fold(Lifecycle::new(), |lc, &ev| lc.on(ev))
    }

    #[test]
    fn test_documented_path() {
        let lc = run(&[UsiSent]);
        assert_eq!(lc.state(), WaitingHandshakeAck);
        let lc = lc.on(UsiOkReceived);
        assert_eq!(lc.state(), Idling);
        assert!(!lc.ready_ok());
        let lc = lc.on(IsReadySent);
        assert_eq!(lc.state(), WaitingReadyAck);
        let lc = lc.on(ReadyOkReceived);
        assert!(lc.is_idle_and_ready());
        let lc = lc.on(GoSent);
        assert_eq!(lc.state(), Thinking);
        let lc = lc.on(StopSent);
        assert_eq!(lc.state(), Thinking, "stop alone does not end the search");
        let lc = lc.on(BestMoveReceived);
        assert!(lc.is_idle_and_ready());
    }

    #[test]
    fn test_bestmove_before_stop() {
        let lc = run(&[UsiSent, UsiOkReceived, IsReadySent, ReadyOkReceived, GoSent]);
        let lc = lc.on(BestMoveReceived);
        assert_eq!(lc.state(), Thinking);
        assert!(lc.stop_needed());
        assert_eq!(lc.on(StopSent).state(), Idling);
    }

    #[test]
    fn test_undocumented_events_are_noops() {
        let documented = [
            (Uninitialized, UsiSent),
            (WaitingHandshakeAck, UsiOkReceived),
            (Idling, IsReadySent),
            (WaitingReadyAck, ReadyOkReceived),
            (Idling, GoSent),
            (Thinking, StopSent),
            (Thinking, BestMoveReceived),
        ];
        let reach: [(EngineState, &[LifecycleEvent]); 5] = [
            (Uninitialized, &[]),
            (WaitingHandshakeAck, &[UsiSent]),
            (WaitingReadyAck, &[UsiSent, UsiOkReceived, IsReadySent]),
            (Idling, &[UsiSent, UsiOkReceived, IsReadySent, ReadyOkReceived]),
            (Thinking, &[UsiSent, UsiOkReceived, IsReadySent, ReadyOkReceived, GoSent]),
        ];
        for (state, path) in reach {
            let lc = run(path);
            assert_eq!(lc.state(), state);
            for ev in ALL_EVENTS {
                if documented.contains(&(state, ev)) {
                    continue;
                }
                assert_eq!(lc.on(ev), lc, "{state:?} + {ev:?} must not change anything");
            }
        }
    }

    #[test]
    fn test_stop_while_idle_has_no_effect() {
        let lc = run(&[UsiSent, UsiOkReceived]);
        assert_eq!(lc.on(StopSent), lc);
        assert!(!lc.stop_needed());
    }

    #[test]
    fn test_command_legality() {
        let fresh = Lifecycle::new();
        assert!(fresh.check(&EngineCommand::Usi).is_ok());
        assert!(fresh.check(&EngineCommand::GoInfinite).is_err());

        let waiting = run(&[UsiSent]);
        let err = waiting.check(&EngineCommand::Position { sfen: String::new() }).unwrap_err();
        match err {
            UsiError::IllegalCommand { command, state } => {
                assert_eq!(command, "position");
                assert_eq!(state, WaitingHandshakeAck);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(waiting.check(&EngineCommand::Usi).is_err());
        assert!(waiting.check(&EngineCommand::Stop).is_ok());
        assert!(waiting.check(&EngineCommand::Quit).is_ok());

        let idle = run(&[UsiSent, UsiOkReceived]);
        assert!(idle.check(&EngineCommand::IsReady).is_ok());
        assert!(idle.check(&EngineCommand::UsiNewGame).is_ok());

        let thinking = run(&[UsiSent, UsiOkReceived, IsReadySent, ReadyOkReceived, GoSent]);
        assert!(thinking.check(&EngineCommand::GoInfinite).is_err());
        assert!(thinking.check(&EngineCommand::IsReady).is_err());
        assert!(thinking.check(&EngineCommand::Stop).is_ok());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Idling.label(), "待機中");
        assert_eq!(Thinking.label(), "検討中");
        assert_eq!(WaitingHandshakeAck.label(), "waiting usiok");
    }
}
