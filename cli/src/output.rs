//! Console output for turn results and progress

use colored::Colorize;
use table_application::TurnProgressNotifier;
use table_domain::{AgentId, Phase, SessionState, Stance, TurnResult, TurnStatus};

/// Formats turn results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a turn result for humans
    pub fn format(result: &TurnResult) -> String {
        let mut output = String::new();

        output.push_str(&Self::header(&format!(
            "Session {} - Turn {}",
            result.session, result.turn
        )));
        output.push('\n');
        output.push_str(&format!(
            "{} {}\n",
            "Status:".cyan().bold(),
            Self::status_label(result.status)
        ));
        output.push_str(&format!(
            "{} {} (last committed: {})\n",
            "Phase:".cyan().bold(),
            result.current_phase,
            result.completed_phase
        ));

        if let Some(consensus) = &result.consensus {
            output.push_str(&Self::section_header("Discussion"));
            output.push_str(&format!(
                "{} {} after {} round(s), {} agree / {} disagree\n",
                consensus.stance_summary(),
                consensus.classification,
                consensus.rounds,
                consensus.count(Stance::Agree),
                consensus.count(Stance::Disagree)
            ));
            for (agent, position) in &consensus.positions {
                output.push_str(&format!(
                    "  {} {} ({:.2})\n",
                    agent.to_string().yellow(),
                    position.stance,
                    position.confidence
                ));
            }
        }

        if !result.contributions.is_empty() {
            output.push_str(&Self::section_header("Contributions"));
            for contribution in &result.contributions {
                let title = format!("── {} [{}] ──", contribution.agent, contribution.phase);
                if contribution.degraded {
                    output.push_str(&format!("\n{}\n", title.red().bold()));
                } else {
                    output.push_str(&format!("\n{}\n", title.yellow().bold()));
                }
                output.push_str(&contribution.intent_text);
                output.push('\n');
                if let Some(dialogue) = &contribution.dialogue_text {
                    output.push_str(&format!("  \"{}\"\n", dialogue.italic()));
                }
            }
        }

        if !result.validations.is_empty() {
            output.push_str(&Self::section_header("Validation"));
            for (agent, outcome) in &result.validations {
                let mark = if outcome.warning_flag {
                    "!".yellow().bold()
                } else if outcome.valid {
                    "v".green()
                } else {
                    "x".red()
                };
                let mut line = format!("  {} {} (attempt {})", mark, agent, outcome.attempt);
                if outcome.auto_fixed {
                    line.push_str(" auto-fixed");
                }
                if let Some(violation) = outcome.violation {
                    line.push_str(&format!(" {}", violation));
                }
                output.push_str(&line);
                output.push('\n');
            }
        }

        if !result.warnings.is_empty() {
            output.push_str(&format!("\n{}\n", "Warnings:".yellow().bold()));
            for warning in &result.warnings {
                let agent = warning
                    .agent
                    .as_ref()
                    .map(|a| format!(" {}", a))
                    .unwrap_or_default();
                output.push_str(&format!(
                    "  * [{}]{} {}: {}\n",
                    warning.phase,
                    agent,
                    warning.kind.as_str(),
                    warning.detail
                ));
            }
        }

        if result.status == TurnStatus::Suspended {
            output.push_str(&format!(
                "\n{} quorum-table resume -s {} \"<ruling>\"\n",
                "Awaiting ruling:".green().bold(),
                result.session
            ));
        }

        output
    }

    /// Format as JSON
    pub fn format_json(result: &TurnResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format a persisted session for `status`
    pub fn format_status(state: &SessionState) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} {}\n", "Session:".cyan().bold(), state.session));
        output.push_str(&format!("{} {}\n", "Turn:".cyan().bold(), state.turn));
        output.push_str(&format!("{} {}\n", "Phase:".cyan().bold(), state.phase));
        if let Some(suspension) = &state.suspension {
            output.push_str(&format!(
                "{} since {}\n",
                "Suspended".green().bold(),
                suspension.since.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        output.push_str(&format!(
            "{} {}\n",
            "Participants:".cyan().bold(),
            state
                .participants
                .iter()
                .map(|p| format!("{} ({})", p.name, p.character.display_name))
                .collect::<Vec<_>>()
                .join(", ")
        ));
        output.push_str(&format!("{} {}\n", "Messages:".cyan().bold(), state.messages.len()));
        output
    }

    fn status_label(status: TurnStatus) -> String {
        match status {
            TurnStatus::Suspended => "suspended at adjudication".green().to_string(),
            TurnStatus::Completed => "turn completed".to_string(),
            TurnStatus::SessionEnded => "session ended".dimmed().to_string(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }
}

/// Prints one line per phase and agent on stderr
pub struct SimpleProgress;

impl TurnProgressNotifier for SimpleProgress {
    fn on_phase_start(&self, phase: Phase, agents: usize) {
        if agents == 0 {
            eprintln!("{} {}", "->".cyan(), phase.to_string().bold());
        } else {
            eprintln!("{} {} ({} agents)", "->".cyan(), phase.to_string().bold(), agents);
        }
    }

    fn on_agent_complete(&self, _phase: Phase, agent: &AgentId, success: bool) {
        if success {
            eprintln!("  {} {}", "v".green(), agent);
        } else {
            eprintln!("  {} {} (degraded)", "x".red(), agent);
        }
    }

    fn on_phase_complete(&self, _phase: Phase) {}

    fn on_suspended(&self, session: u64, turn: u64) {
        eprintln!(
            "{} session {} turn {} waits for the game master",
            "||".green(),
            session,
            turn
        );
    }
}
