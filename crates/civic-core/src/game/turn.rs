use tracing::info;

use super::*;

impl Game {
    /// End-of-turn resolution. Fixed order: passive grid tick, citizen
    /// lifecycle, resource recompute from the grid, deadline settlement,
    /// defeat check, win check (final turn only), then advance with a
    /// fresh action budget.
    pub fn end_turn(&mut self) -> Result<(), GameError> {
        self.require_running()?;

        self.tick_tiles();
        self.tick_citizen_lifecycle();
        self.recompute_resources();
        self.resolve_deadline_promises();

        if self.check_defeat() {
            info!(
                game_id = self.game_id,
                turn = self.turn,
                reason = ?self.defeat_reason,
                "game lost"
            );
            return Ok(());
        }

        if self.turn >= contracts::MAX_TURNS {
            self.decide_rank();
            self.settle_promises_on_win();
            info!(
                game_id = self.game_id,
                rank = ?self.result_rank,
                "game won"
            );
            return Ok(());
        }

        let next = self.turn + 1;
        self.turns.push(TurnRecord {
            turn: next,
            speech_text: None,
            remaining_actions: ACTIONS_PER_TURN,
        });
        self.turn = next;
        info!(game_id = self.game_id, turn = next, "turn advanced");

        Ok(())
    }

    /// Defeat checks in fixed order; the first that fires names the reason.
    pub(super) fn check_defeat(&mut self) -> bool {
        if self.resources.ecology < COLLAPSE_THRESHOLD {
            self.status = GameStatus::Lost;
            self.defeat_reason = DefeatReason::EcologicalCollapse;
            return true;
        }

        if self.resources.economy < COLLAPSE_THRESHOLD {
            self.status = GameStatus::Lost;
            self.defeat_reason = DefeatReason::EconomicCollapse;
            return true;
        }

        let all_voted_out = {
            let mut core = self.core_citizens().peekable();
            core.peek().is_some() && self.core_citizens().all(|c| c.approval < VOTED_OUT_APPROVAL)
        };
        if all_voted_out {
            self.status = GameStatus::Lost;
            self.defeat_reason = DefeatReason::VotedOut;
            return true;
        }

        false
    }

    /// Terminal-turn ranking, highest tier first.
    pub(super) fn decide_rank(&mut self) {
        let Resources {
            ecology,
            economy,
            research,
        } = self.resources;

        self.status = GameStatus::Won;
        self.result_rank = if ecology > 80 && economy > 80 && research > 75 {
            ResultRank::Gold
        } else if ecology > 65 && economy > 65 {
            ResultRank::Silver
        } else {
            ResultRank::Bronze
        };
    }
}
