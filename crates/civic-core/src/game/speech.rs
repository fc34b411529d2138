use std::fmt::Write as _;

use tracing::{debug, info, warn};

use super::*;
use contracts::{
    CitizenReaction, ExtractionPayload, ReactionsPayload, SpeechOutcome, SCHEMA_VERSION_V1,
};

use crate::language::CompletionClient;
use crate::matcher::ContradictionMatcher;

/// A single reaction may move a citizen's approval at most this far in
/// either direction, whatever the model claims.
pub const REACTION_DELTA_LIMIT: i64 = 15;

const EXTRACTION_SYSTEM_PROMPT: &str = "\
You are the speech analyst for a city-management game. The player is the \
mayor of a small town. Analyze the mayor's speech and extract the promises \
it makes, explicit (\"I promise to...\", \"I will...\") or implicit (\"The \
forest stays\", \"We protect nature\"). Then compare the speech and the \
recent grid actions against ALL active promises and report contradictions.

Rules:
- Respond with valid JSON only. No markdown, no code fences, no extra text.
- Rate contradiction severity conservatively:
  - \"low\": minor inconsistency, could be read either way
  - \"medium\": clear contradiction, but a strategic justification is conceivable
  - \"high\": blatant broken promise with no reasonable explanation
- For promise type use \"explicit\" or \"implicit\".
- For targetCitizen use the citizen's exact name when the promise addresses \
one citizen in particular, otherwise null.
- For deadlineTurn extract a turn number only when the speech names one, \
otherwise null.

Respond with exactly this structure:
{
  \"promises\": [
    {\"text\": \"promise description\", \"type\": \"explicit|implicit\", \"targetCitizen\": \"name or null\", \"deadlineTurn\": null}
  ],
  \"contradictions\": [
    {\"description\": \"what the contradiction is\", \"speechQuote\": \"relevant quote from the speech\", \"contradictingAction\": \"action description\", \"severity\": \"low|medium|high\"}
  ]
}

Use empty arrays when there is nothing to report.";

impl Game {
    /// Runs the full speech pipeline for the active turn:
    /// validate, persist the speech, extract promises and contradictions,
    /// settle the ledger, generate citizen reactions, apply the approval
    /// shifts, commit.
    ///
    /// Everything mutates a working copy of the aggregate; only a fully
    /// successful run is written back. The extraction call is best-effort
    /// (a failure degrades to an empty result), the reaction call is the
    /// turn's required product and fails the pipeline.
    pub fn process_speech(
        &mut self,
        client: &dyn CompletionClient,
        matcher: &dyn ContradictionMatcher,
        speech_text: &str,
    ) -> Result<SpeechOutcome, GameError> {
        self.require_running()?;

        info!(
            game_id = self.game_id,
            turn = self.turn,
            chars = speech_text.len(),
            "processing speech"
        );

        let mut draft = self.clone();
        draft.current_turn_record_mut().speech_text = Some(speech_text.to_string());

        let extraction = draft.extract_promises(client, speech_text);
        debug!(
            promises = extraction.promises.len(),
            contradictions = extraction.contradictions.len(),
            "extraction complete"
        );

        let recorded = draft.record_promises(&extraction.promises);
        draft.mark_broken(matcher, &extraction.contradictions);

        let reactions = draft.generate_reactions(client, speech_text, &extraction)?;
        info!(
            game_id = self.game_id,
            reactions = reactions.reactions.len(),
            "citizen reactions generated"
        );

        draft.apply_reaction_deltas(&reactions.reactions);

        *self = draft;

        Ok(SpeechOutcome {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            promises: recorded,
            contradictions: extraction.contradictions,
            reactions: reactions.reactions,
        })
    }

    /// First service call. Transport failures and malformed answers both
    /// degrade to an empty payload; the turn still completes.
    fn extract_promises(
        &self,
        client: &dyn CompletionClient,
        speech_text: &str,
    ) -> ExtractionPayload {
        let user_prompt = self.extraction_user_prompt(speech_text);

        let raw = match client.complete(EXTRACTION_SYSTEM_PROMPT, &user_prompt) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(game_id = self.game_id, %err, "extraction call failed, continuing without");
                return ExtractionPayload::default();
            }
        };

        match ExtractionPayload::parse(&raw) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(game_id = self.game_id, %err, "extraction answer unparseable, continuing without");
                ExtractionPayload::default()
            }
        }
    }

    /// Second service call; depends on the first call's output and is
    /// required. Any failure here aborts the pipeline.
    fn generate_reactions(
        &self,
        client: &dyn CompletionClient,
        speech_text: &str,
        extraction: &ExtractionPayload,
    ) -> Result<ReactionsPayload, GameError> {
        let system_prompt = self.reactions_system_prompt(extraction);
        let user_prompt = format!("The mayor's speech:\n\n\"{speech_text}\"");

        let raw = client
            .complete(&system_prompt, &user_prompt)
            .map_err(PipelineError::from)?;

        if raw.trim().is_empty() {
            return Err(PipelineError::MalformedReactions("empty answer".to_string()).into());
        }

        ReactionsPayload::parse(&raw)
            .map_err(|err| PipelineError::MalformedReactions(err.to_string()).into())
    }

    /// Applies reaction approval shifts, each clamped to the per-reaction
    /// limit and then to the meter range. Reactions naming a citizen who
    /// is not present are logged and skipped.
    fn apply_reaction_deltas(&mut self, reactions: &[CitizenReaction]) {
        let game_id = self.game_id;
        for reaction in reactions {
            let shift = reaction
                .approval_delta
                .clamp(-REACTION_DELTA_LIMIT, REACTION_DELTA_LIMIT);

            match self.citizen_by_name_mut(&reaction.citizen_name) {
                Some(citizen) => {
                    let previous = citizen.approval;
                    citizen.approval = contracts::clamp_meter(previous + shift);
                    debug!(
                        game_id,
                        name = %citizen.name,
                        previous,
                        approval = citizen.approval,
                        shift,
                        "reaction applied"
                    );
                }
                None => warn!(
                    game_id,
                    name = %reaction.citizen_name,
                    "reaction for unknown citizen ignored"
                ),
            }
        }
    }

    fn extraction_user_prompt(&self, speech_text: &str) -> String {
        let mut prompt = String::new();

        let _ = writeln!(prompt, "## Game Context");
        let _ = writeln!(prompt, "Current Turn: {}", self.turn);
        let _ = writeln!(
            prompt,
            "Resources: Ecology={}, Economy={}, Research={}",
            self.resources.ecology, self.resources.economy, self.resources.research
        );

        if !self.citizens.is_empty() {
            let _ = writeln!(prompt, "\n## Citizens");
            for citizen in &self.citizens {
                let _ = writeln!(
                    prompt,
                    "- {} ({}), approval: {}%",
                    citizen.name, citizen.profession, citizen.approval
                );
            }
        }

        let active: Vec<&Promise> = self.active_promises().collect();
        if !active.is_empty() {
            let _ = writeln!(prompt, "\n## Active Promises");
            for promise in active {
                let _ = write!(
                    prompt,
                    "- Turn {}: \"{}\"",
                    promise.turn_made, promise.text
                );
                if let Some(target) = &promise.target_citizen {
                    let _ = write!(prompt, " (to {target})");
                }
                if let Some(deadline) = promise.deadline {
                    let _ = write!(prompt, " [deadline: turn {deadline}]");
                }
                let _ = writeln!(prompt);
            }
        }

        let previous: Vec<&TurnRecord> = self
            .turns
            .iter()
            .filter(|record| record.turn < self.turn)
            .filter(|record| {
                record
                    .speech_text
                    .as_deref()
                    .is_some_and(|text| !text.trim().is_empty())
            })
            .collect();
        if !previous.is_empty() {
            let _ = writeln!(prompt, "\n## Previous Speeches");
            for record in previous {
                let _ = writeln!(
                    prompt,
                    "Turn {}: \"{}\"",
                    record.turn,
                    record.speech_text.as_deref().unwrap_or_default()
                );
            }
        }

        if !self.tiles.is_empty() {
            let _ = writeln!(prompt, "\n## Current Tile Map");
            let map = self
                .tiles
                .iter()
                .map(|tile| format!("({},{}): {:?}", tile.x, tile.y, tile.kind))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(prompt, "{map}");
        }

        let _ = writeln!(prompt, "\n## Current Speech (Turn {})", self.turn);
        let _ = writeln!(prompt, "{speech_text}");

        prompt
    }

    fn reactions_system_prompt(&self, extraction: &ExtractionPayload) -> String {
        let mut prompt = String::new();

        let _ = writeln!(
            prompt,
            "You are the reaction engine for a city-management game. The \
             player is the mayor of a small town making speeches to the \
             citizens. Generate an in-character reaction for EACH citizen \
             listed below.\n"
        );

        let _ = writeln!(prompt, "=== GAME CONTEXT ===");
        let _ = writeln!(
            prompt,
            "Current turn: {} of {}",
            self.turn,
            contracts::MAX_TURNS
        );
        let _ = writeln!(prompt, "Resources:");
        let _ = writeln!(prompt, "  - Ecology: {}/100", self.resources.ecology);
        let _ = writeln!(prompt, "  - Economy: {}/100", self.resources.economy);
        let _ = writeln!(prompt, "  - Research: {}/100\n", self.resources.research);

        let _ = writeln!(prompt, "=== CITIZENS (generate a reaction for EACH) ===");
        for citizen in &self.citizens {
            let _ = writeln!(
                prompt,
                "- {} ({}, age {}, type: {:?}, current approval: {}/100)",
                citizen.name, citizen.profession, citizen.age, citizen.kind, citizen.approval
            );
            let _ = writeln!(prompt, "  Personality: {}", citizen.personality);
            if let Some(remaining) = citizen.remaining_turns {
                let _ = writeln!(prompt, "  Remaining turns in town: {remaining}");
            }
            let _ = writeln!(prompt);
        }

        let _ = writeln!(prompt, "=== EXTRACTED PROMISES FROM THIS SPEECH ===");
        if extraction.promises.is_empty() {
            let _ = writeln!(prompt, "No promises detected in this speech.");
        } else {
            for promise in &extraction.promises {
                let _ = write!(prompt, "- \"{}\" (type: {:?})", promise.text, promise.kind);
                if let Some(target) = &promise.target_citizen {
                    let _ = write!(prompt, " [targeted at: {target}]");
                }
                let _ = writeln!(prompt);
            }
        }

        let _ = writeln!(prompt, "\n=== DETECTED CONTRADICTIONS ===");
        if extraction.contradictions.is_empty() {
            let _ = writeln!(prompt, "No contradictions detected.");
        } else {
            for finding in &extraction.contradictions {
                let _ = writeln!(prompt, "- {}", finding.description);
                if let Some(quote) = &finding.speech_quote {
                    let _ = writeln!(prompt, "  Speech quote: \"{quote}\"");
                }
                if let Some(action) = &finding.contradicting_action {
                    let _ = writeln!(prompt, "  Contradicting action: {action}");
                }
                let _ = writeln!(prompt, "  Severity: {:?}", finding.severity);
            }
        }
        let _ = writeln!(prompt);

        self.append_promise_history(&mut prompt);
        self.append_speech_history(&mut prompt);

        let _ = writeln!(
            prompt,
            "=== CITIZEN PERSONALITY GUIDELINES ===\n\n\
             **Karl** (Factory Worker, 48): Conservative, family-oriented. \
             Reacts well to factory building, economic growth, job creation, \
             stability; badly to factory closures, heavy research spending, \
             radical change. He sides with workers who lose their jobs and \
             speaks plainly about his family's worries.\n\n\
             **Mia** (Climate Activist, 24): Idealistic, impatient, \
             passionate. Reacts well to forest planting, demolishing fossil \
             industry, renewables, fast climate action; badly to new \
             factories, deforestation, incrementalism. She uses emotional \
             language and invokes generational justice.\n\n\
             **Sarah** (Opposition Politician, 42): Strategic, opportunistic, \
             sharp-tongued, almost always negative. She QUOTES the mayor \
             VERBATIM when promises are broken or contradictions exist, and \
             exploits citizen suffering for political gain. Only an \
             exceptionally clean record quiets her down.\n\n\
             **Dynamic citizens**: react from their personality field and \
             the situation that brought them to the town hall. Two arrivals \
             from the same event should reference each other.\n"
        );

        let _ = writeln!(
            prompt,
            "=== REACTION RULES ===\n\n\
             1. Generate EXACTLY one reaction per citizen listed above.\n\
             2. Each dialogue is 2-4 sentences maximum.\n\
             3. approvalDelta is an integer between -{limit} and +{limit}.\n\
             4. Sarah quotes the mayor verbatim when promises are broken or \
             contradictions are detected.\n\
             5. Freshly arrived citizens react to their personal situation.\n\
             6. Reference SPECIFIC parts of the speech.\n\
             7. Keep dialogue authentic, emotional, and in character.\n\
             8. Valid tones: angry, hopeful, sarcastic, desperate, grateful, \
             suspicious, neutral.\n\
             9. High-approval citizens are forgiving; low-approval citizens \
             are critical.\n",
            limit = REACTION_DELTA_LIMIT
        );

        let names = self
            .citizens
            .iter()
            .map(|citizen| citizen.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            prompt,
            "=== OUTPUT FORMAT ===\n\n\
             Respond with ONLY valid JSON. No markdown, no code fences, no \
             explanation. The JSON must match this exact structure:\n\n\
             {{\n  \"reactions\": [\n    {{\"citizenName\": \"Name\", \
             \"dialogue\": \"...\", \"tone\": \"suspicious\", \
             \"approvalDelta\": -3}}\n  ]\n}}\n\n\
             You MUST include a reaction for each of these citizens: {names}\n\n\
             Valid tones: angry, hopeful, sarcastic, desperate, grateful, \
             suspicious, neutral\n\
             approvalDelta range: -{limit} to +{limit}",
            limit = REACTION_DELTA_LIMIT
        );

        prompt
    }

    fn append_promise_history(&self, prompt: &mut String) {
        if self.promises.is_empty() {
            return;
        }

        let _ = writeln!(prompt, "=== PROMISE HISTORY ===");

        let broken: Vec<&Promise> = self
            .promises
            .iter()
            .filter(|p| p.status == PromiseStatus::Broken)
            .collect();
        if !broken.is_empty() {
            let _ = writeln!(prompt, "BROKEN promises (important for Sarah!):");
            for promise in broken {
                let _ = writeln!(
                    prompt,
                    "  - \"{}\" (made turn {})",
                    promise.text, promise.turn_made
                );
            }
        }

        let active: Vec<&Promise> = self.active_promises().collect();
        if !active.is_empty() {
            let _ = writeln!(prompt, "Active promises (still pending):");
            for promise in active {
                let _ = write!(
                    prompt,
                    "  - \"{}\" (made turn {}",
                    promise.text, promise.turn_made
                );
                if let Some(deadline) = promise.deadline {
                    let _ = write!(prompt, ", deadline: turn {deadline}");
                }
                let _ = writeln!(prompt, ")");
            }
        }

        let kept = self
            .promises
            .iter()
            .filter(|p| p.status == PromiseStatus::Kept)
            .count();
        if kept > 0 {
            let _ = writeln!(prompt, "Kept promises: {kept} total");
        }

        let _ = writeln!(prompt);
    }

    fn append_speech_history(&self, prompt: &mut String) {
        let previous: Vec<&TurnRecord> = self
            .turns
            .iter()
            .filter(|record| record.turn < self.turn)
            .filter(|record| record.speech_text.is_some())
            .collect();
        if previous.is_empty() {
            return;
        }

        let _ = writeln!(prompt, "=== PREVIOUS SPEECHES ===");
        for record in previous {
            let _ = writeln!(
                prompt,
                "Turn {}: \"{}\"",
                record.turn,
                record.speech_text.as_deref().unwrap_or_default()
            );
        }
        let _ = writeln!(prompt);
    }
}
