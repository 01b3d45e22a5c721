//! Console output formatter for council outcomes

use colored::Colorize;
use council_domain::{
    ConsensusRound, CouncilAnswer, CouncilEscalation, CouncilOutcome, EscalationTicket,
    MemberParticipation, TicketStatus,
};
use council_domain::core::string::truncate;

const PREVIEW_LEN: usize = 80;

/// Formats council outcomes and tickets for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format an outcome; `show_rounds` adds the per-round breakdown
    pub fn format(outcome: &CouncilOutcome, show_rounds: bool) -> String {
        let mut output = String::new();

        match outcome {
            CouncilOutcome::Synthesized(answer) => Self::answer(&mut output, answer),
            CouncilOutcome::Escalated(escalation) => Self::escalation(&mut output, escalation),
        }

        if show_rounds {
            output.push_str(&Self::section_header("Rounds"));
            for round in outcome.rounds() {
                output.push_str(&Self::round(round));
            }
        }

        output.push_str(&Self::section_header("Participation"));
        for participation in outcome.participation() {
            output.push_str(&Self::participation(participation));
        }

        output
    }

    /// Format as JSON
    pub fn format_json(outcome: &CouncilOutcome) -> String {
        serde_json::to_string_pretty(outcome).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn format_tickets(tickets: &[EscalationTicket]) -> String {
        if tickets.is_empty() {
            return format!("{}\n", "No tickets.".dimmed());
        }
        let mut output = String::new();
        for ticket in tickets {
            output.push_str(&Self::ticket(ticket));
        }
        output
    }

    pub fn format_tickets_json(tickets: &[EscalationTicket]) -> String {
        serde_json::to_string_pretty(tickets).unwrap_or_else(|_| "[]".to_string())
    }

    /// One ticket, with its resolution when closed
    pub fn ticket(ticket: &EscalationTicket) -> String {
        let label = ticket.status.as_str();
        let status = match ticket.status {
            TicketStatus::Pending => label.yellow().bold(),
            TicketStatus::Resolved => label.green().bold(),
            TicketStatus::RateLimited => label.red().bold(),
        };
        let mut line = format!(
            "{} [{}] request {} at {}\n    {}\n",
            ticket.id.to_string().bold(),
            status,
            ticket.request_id,
            ticket.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            ticket.reason
        );
        if let (Some(reviewer), Some(resolution)) = (&ticket.reviewer, &ticket.resolution) {
            line.push_str(&format!("    {} {}: {}\n", "resolved by".dimmed(), reviewer, resolution));
        }
        line
    }

    fn answer(output: &mut String, answer: &CouncilAnswer) {
        output.push_str(&Self::header("Council Answer"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Q:".bold(), answer.question));
        output.push_str(&format!(
            "{} {} after {} round(s), agreement {:.2}\n",
            "Strategy:".cyan().bold(),
            answer.strategy,
            answer.rounds.len(),
            answer.score
        ));
        let cited: Vec<&str> = answer.cited.iter().map(|m| m.as_str()).collect();
        output.push_str(&format!("{} {}\n\n", "Cited:".cyan().bold(), cited.join(", ")));
        output.push_str(&answer.content);
        output.push('\n');
    }

    fn escalation(output: &mut String, escalation: &CouncilEscalation) {
        output.push_str(&Self::header("Escalated to Human Review"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Q:".bold(), escalation.question));
        output.push_str(&format!(
            "{} {}\n",
            "Reason:".yellow().bold(),
            escalation.reason
        ));
        output.push_str(&format!(
            "{} {} ({})\n",
            "Ticket:".yellow().bold(),
            escalation.ticket.id,
            escalation.ticket.status
        ));
        if !escalation.persisted {
            output.push_str(&format!(
                "{}\n",
                "Warning: ticket could not be stored and is held in memory only".red()
            ));
        }
    }

    fn round(round: &ConsensusRound) -> String {
        let cluster: Vec<&str> = round.cluster.members.iter().map(|m| m.as_str()).collect();
        let mut text = format!(
            "\n{} score {:.2} ({}), cluster [{}] -> {}\n",
            format!("Round {}", round.round + 1).yellow().bold(),
            round.score(),
            round.method(),
            cluster.join(", "),
            round.verdict
        );
        for response in &round.responses {
            match &response.error {
                None => text.push_str(&format!(
                    "  {} {} ({} ms): {}\n",
                    "v".green(),
                    response.member,
                    response.latency_ms,
                    Self::preview(&response.content)
                )),
                Some(error) => text.push_str(&format!(
                    "  {} {} ({} ms): {}\n",
                    "x".red(),
                    response.member,
                    response.latency_ms,
                    error
                )),
            }
        }
        text
    }

    fn participation(p: &MemberParticipation) -> String {
        let marker = if p.in_final_cluster {
            "*".green().bold()
        } else if p.non_participating {
            "-".red()
        } else {
            " ".normal()
        };
        format!(
            " {} {:<16} responded {}, errored {}, absent {}\n",
            marker, p.member, p.rounds_responded, p.rounds_errored, p.rounds_absent
        )
    }

    fn preview(content: &str) -> String {
        let mut lines = content.trim().lines();
        let first = truncate(lines.next().unwrap_or("").trim(), PREVIEW_LEN);
        if lines.next().is_some() && !first.ends_with("...") {
            format!("{}...", first)
        } else {
            first
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
