//! Property tests over random intent sequences.
//!
//! Invariants covered:
//! - Every active-piece cell stays inside the board.
//! - The active piece never overlaps a locked cell while play continues
//!   under game-over detection.
//! - Score only grows, in steps of whole cleared rows.
//! - The game-over latch never resets.
//! - Rejected intents leave the state untouched.

use blockdrop::game::{
    collides, step, GameState, Intent, RandomPieceProvider, Rules, SCORE_PER_LINE,
};
use proptest::prelude::*;

fn intent_strategy() -> impl Strategy<Value = Intent> {
    prop_oneof![
        Just(Intent::Left),
        Just(Intent::Right),
        Just(Intent::SoftDrop),
        Just(Intent::Rotate),
        Just(Intent::Tick),
    ]
}

fn assert_in_bounds(state: &GameState) {
    let rows = state.board.rows() as i16;
    let cols = state.board.cols() as i16;
    for block in state.active_piece.blocks() {
        assert!(block.x >= 0 && block.x < cols, "x out of range: {:?}", block);
        assert!(block.y >= 0 && block.y < rows, "y out of range: {:?}", block);
    }
}

fn assert_no_overlap(state: &GameState) {
    for block in state.active_piece.blocks() {
        assert!(
            !state.board.get(block.x as usize, block.y as usize).is_filled(),
            "active piece overlaps locked cell at {:?}",
            block
        );
    }
}

proptest! {
    #[test]
    fn random_play_respects_core_invariants(
        seed in any::<u64>(),
        intents in prop::collection::vec(intent_strategy(), 1..400),
        narrow in any::<bool>(),
        detect in any::<bool>(),
    ) {
        let rules = Rules {
            rows: if narrow { 8 } else { 20 },
            cols: if narrow { 6 } else { 10 },
            detect_game_over: detect,
        };
        let mut pieces = RandomPieceProvider::seeded(seed);
        let mut state = GameState::new(&rules, &mut pieces).unwrap();
        assert_in_bounds(&state);
        assert_no_overlap(&state);

        for intent in intents {
            let next = step(&state, intent, &rules, &mut pieces);

            prop_assert!(next.score >= state.score);
            prop_assert_eq!((next.score - state.score) % SCORE_PER_LINE, 0);
            prop_assert!(!state.is_game_over || next.is_game_over);
            prop_assert!(detect || !next.is_game_over);
            prop_assert_eq!(next.board.rows(), rules.rows);
            prop_assert_eq!(next.board.cols(), rules.cols);

            // Without the latch a spawn may land on locked cells.
            assert_in_bounds(&next);
            if detect && !next.is_game_over {
                assert_no_overlap(&next);
                prop_assert!(!collides(
                    &next.active_piece.shape,
                    next.active_piece.position,
                    &next.board
                ));
            }

            state = next;
        }
    }

    #[test]
    fn horizontal_rejections_are_no_ops(
        seed in any::<u64>(),
        warmup in prop::collection::vec(intent_strategy(), 0..60),
    ) {
        let rules = Rules::default();
        let mut pieces = RandomPieceProvider::seeded(seed);
        let mut state = GameState::new(&rules, &mut pieces).unwrap();
        for intent in warmup {
            state = step(&state, intent, &rules, &mut pieces);
        }

        for intent in [Intent::Left, Intent::Right, Intent::Rotate] {
            let piece = &state.active_piece;
            let proposed = match intent {
                Intent::Left => (piece.shape.clone(), piece.position.offset(-1, 0)),
                Intent::Right => (piece.shape.clone(), piece.position.offset(1, 0)),
                _ => (piece.shape.rotated(), piece.position),
            };
            let next = step(&state, intent, &rules, &mut pieces);
            if state.is_game_over || collides(&proposed.0, proposed.1, &state.board) {
                prop_assert_eq!(&next, &state);
            } else {
                prop_assert_eq!(&next.board, &state.board);
                prop_assert_eq!(next.score, state.score);
                prop_assert_eq!(&next.active_piece.shape, &proposed.0);
                prop_assert_eq!(next.active_piece.position, proposed.1);
            }
        }
    }
}
