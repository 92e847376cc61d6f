//! 読み筋変換の性質テスト

use proptest::prelude::*;
use proptest::sample::Index;
use termshogi_core::{Color, Move, Position, Square};
use termshogi_usi::{BoardSnapshot, translate_pv};

/// 合法手から選び続けた読み筋。合法手が尽きたらそこまで
fn legal_walk(start: &Position, picks: &[Index]) -> (Vec<String>, Position) {
    let mut pos = start.clone();
    let mut tokens = Vec::with_capacity(picks.len());
    for pick in picks {
        let moves = pos.legal_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[pick.index(moves.len())];
        pos.do_move(mv).unwrap();
        tokens.push(mv.to_usi());
    }
    (tokens, pos)
}

/// 駒のないマスから動かす手。どの局面でも指せない
fn move_from_empty_square(pos: &Position) -> String {
    let from = Square::all().find(|&sq| pos.piece_at(sq).is_none()).unwrap();
    let to = Square::all().find(|&sq| sq != from).unwrap();
    Move::Normal {
        from,
        to,
        promote: false,
    }
    .to_usi()
}

fn arb_picks(max: usize) -> impl Strategy<Value = Vec<Index>> {
    prop::collection::vec(any::<Index>(), 1..max)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn legal_pv_translates_every_token(picks in arb_picks(24)) {
        let start = Position::startpos();
        let (tokens, _) = legal_walk(&start, &picks);
        let translation = translate_pv(&tokens, &BoardSnapshot::new(start, None));

        prop_assert!(translation.stale.is_none());
        prop_assert_eq!(translation.moves.len(), tokens.len());
        for (i, mv) in translation.moves.iter().enumerate() {
            let expected = if i % 2 == 0 { Color::Black } else { Color::White };
            prop_assert_eq!(mv.color, expected);
        }
    }

    #[test]
    fn illegal_token_at_k_keeps_k_minus_one_moves(
        picks in arb_picks(16),
        k in any::<Index>(),
        tail in arb_picks(6),
        unparseable in any::<bool>(),
    ) {
        let start = Position::startpos();
        let (prefix, before) = legal_walk(&start, &picks);
        // k は 1 始まり。prefix の後ろに置く場合も含む
        let k = k.index(prefix.len() + 1) + 1;
        let mut tokens: Vec<String> = prefix[..k - 1].to_vec();
        let at = legal_walk(&start, &picks[..k - 1]).1;
        let bad = if unparseable { "xyz".to_string() } else { move_from_empty_square(&at) };
        tokens.push(bad.clone());
        // 不正手より後ろは合法かどうかに関係なく読まれない
        tokens.extend(legal_walk(&before, &tail).0);

        let translation = translate_pv(&tokens, &BoardSnapshot::new(start, None));
        prop_assert_eq!(translation.moves.len(), k - 1);
        let stale = translation.stale.unwrap();
        prop_assert_eq!(stale.index, k);
        prop_assert_eq!(stale.token, bad);
    }
}
