use tracing::{debug, info};

use super::*;
use contracts::{ContradictionFinding, ExtractedPromise, PromiseSnapshot};

use crate::matcher::ContradictionMatcher;

impl Game {
    /// Writes extracted promises into the ledger as active entries. The
    /// target citizen is linked only on an exact case-insensitive name
    /// match; an unknown name leaves the link absent, never errors.
    pub(super) fn record_promises(
        &mut self,
        extracted: &[ExtractedPromise],
    ) -> Vec<PromiseSnapshot> {
        let mut recorded = Vec::new();

        for entry in extracted {
            let target_citizen = entry
                .target_citizen
                .as_deref()
                .filter(|name| !name.trim().is_empty())
                .and_then(|name| self.citizen_by_name(name))
                .map(|citizen| citizen.name.clone());

            let promise = Promise {
                promise_id: self.next_promise_id,
                text: entry.text.clone(),
                turn_made: self.turn,
                deadline: entry.deadline_turn,
                status: PromiseStatus::Active,
                target_citizen,
            };
            self.next_promise_id += 1;

            recorded.push(promise_snapshot(&promise));
            self.promises.push(promise);
        }

        if !recorded.is_empty() {
            info!(
                game_id = self.game_id,
                turn = self.turn,
                count = recorded.len(),
                "promises recorded"
            );
        }

        recorded
    }

    /// Breaks promises referenced by clear contradictions. Low or unrated
    /// severity never breaks anything; each eligible contradiction breaks
    /// at most the first active promise the matcher accepts.
    pub(super) fn mark_broken(
        &mut self,
        matcher: &dyn ContradictionMatcher,
        contradictions: &[ContradictionFinding],
    ) {
        let game_id = self.game_id;
        for finding in contradictions {
            if !finding.severity.breaks_promises() {
                debug!(
                    game_id,
                    severity = ?finding.severity,
                    "contradiction below breaking severity"
                );
                continue;
            }

            let hit = self
                .promises
                .iter_mut()
                .filter(|promise| promise.status == PromiseStatus::Active)
                .find(|promise| matcher.matches(&promise.text, finding));

            if let Some(promise) = hit {
                promise.status = PromiseStatus::Broken;
                info!(
                    game_id,
                    promise_id = promise.promise_id,
                    text = %promise.text,
                    description = %finding.description,
                    "promise broken"
                );
            }
        }
    }

    /// Deadline rule: a promise whose deadline turn has finished without a
    /// matched contradiction counts as kept. Runs during end-of-turn
    /// resolution, after contradiction matching had its chance.
    pub(super) fn resolve_deadline_promises(&mut self) {
        let turn = self.turn;
        let game_id = self.game_id;
        for promise in &mut self.promises {
            if promise.status != PromiseStatus::Active {
                continue;
            }
            if matches!(promise.deadline, Some(deadline) if deadline <= turn) {
                promise.status = PromiseStatus::Kept;
                info!(
                    game_id,
                    promise_id = promise.promise_id,
                    "promise deadline passed unbroken, marked kept"
                );
            }
        }
    }

    /// A won game settles the ledger: everything still active was honored
    /// over the full mandate.
    pub(super) fn settle_promises_on_win(&mut self) {
        for promise in &mut self.promises {
            if promise.status == PromiseStatus::Active {
                promise.status = PromiseStatus::Kept;
            }
        }
    }

    pub(super) fn active_promises(&self) -> impl Iterator<Item = &Promise> {
        self.promises
            .iter()
            .filter(|promise| promise.status == PromiseStatus::Active)
    }
}

pub(super) fn promise_snapshot(promise: &Promise) -> PromiseSnapshot {
    PromiseSnapshot {
        promise_id: promise.promise_id,
        text: promise.text.clone(),
        turn_made: promise.turn_made,
        deadline: promise.deadline,
        status: promise.status,
        target_citizen: promise.target_citizen.clone(),
    }
}
