use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};

use tourpass_core::{
    CheckInReport, CompletionState, IssuedReward, PointOfInterest, PreferenceProfile,
    RewardValidity, RouteSegment, Schedule,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Colored terminal output
    Console,
    Json,
    Markdown,
}

/// A command result that can be rendered in every report format.
pub trait Report: Serialize {
    fn console(&self, out: &mut dyn Write) -> io::Result<()>;
    fn markdown(&self, out: &mut dyn Write) -> io::Result<()>;
}

pub fn emit<R: Report + ?Sized>(out: &mut dyn Write, format: ReportFormat, report: &R) -> Result<()> {
    match format {
        ReportFormat::Console => report.console(out)?,
        ReportFormat::Markdown => report.markdown(out)?,
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn percent_bar(ratio: f64) -> String {
    let filled = tourpass_core::numbers::round_f64_to_u32(ratio / 10.0).min(10);
    let filled = usize::try_from(filled).unwrap_or(10);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(10 - filled))
}

fn reward_line(reward: &IssuedReward) -> String {
    format!(
        "{} ({}) at {}, valid until {}",
        reward.title, reward.discount, reward.spot_name, reward.valid_until
    )
}

#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub profile: PreferenceProfile,
    pub schedule: Schedule,
    pub segments: Vec<RouteSegment>,
    /// Why a requested spot is missing from the plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unresolved: Option<String>,
}

impl Report for PlanReport {
    fn console(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", "🗺️  Suggested itinerary".bright_cyan().bold())?;
        writeln!(out, "{}", "=======================".cyan())?;
        writeln!(out, "Profile: {}", self.profile.preference_text())?;
        for stop in &self.schedule.stops {
            writeln!(
                out,
                "{:>2}. {}-{} {} [{} / {}]",
                stop.order,
                stop.start_label(),
                stop.end_label(),
                stop.spot.name.bold(),
                stop.spot.area,
                stop.spot.category
            )?;
            if let Some(segment) = self
                .segments
                .iter()
                .find(|segment| segment.from_id == stop.spot.id)
            {
                writeln!(
                    out,
                    "    ↓ {} ({})",
                    segment.recommendation.method.to_string().yellow(),
                    segment.recommendation.reason
                )?;
            }
        }
        writeln!(out, "Estimated total: {} minutes", self.schedule.total_minutes)?;
        if let Some(reason) = &self.unresolved {
            writeln!(out, "{} {reason}", "⚠️".yellow())?;
        }
        Ok(())
    }

    fn markdown(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "# Suggested itinerary\n")?;
        writeln!(out, "Profile: {}\n", self.profile.preference_text())?;
        writeln!(out, "| # | Time | Spot | Area | Next leg |")?;
        writeln!(out, "|---|------|------|------|----------|")?;
        for stop in &self.schedule.stops {
            let next = self
                .segments
                .iter()
                .find(|segment| segment.from_id == stop.spot.id)
                .map_or_else(String::new, |segment| {
                    segment.recommendation.method.to_string()
                });
            writeln!(
                out,
                "| {} | {}-{} | {} | {} | {} |",
                stop.order,
                stop.start_label(),
                stop.end_label(),
                stop.spot.name,
                stop.spot.area,
                next
            )?;
        }
        writeln!(
            out,
            "\n- **Estimated total**: {} minutes",
            self.schedule.total_minutes
        )?;
        if let Some(reason) = &self.unresolved {
            writeln!(out, "- **Not included**: {reason}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct AcceptReport {
    pub visitor: String,
    pub stops: Vec<PointOfInterest>,
    pub instant_rewards: Vec<IssuedReward>,
}

impl Report for AcceptReport {
    fn console(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "{} {} stops accepted for {}",
            "✅".green(),
            self.stops.len(),
            self.visitor.bold()
        )?;
        for reward in &self.instant_rewards {
            writeln!(out, "   🎁 {}", reward_line(reward).green())?;
        }
        Ok(())
    }

    fn markdown(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "# Itinerary accepted\n")?;
        writeln!(out, "- **Visitor**: {}", self.visitor)?;
        writeln!(out, "- **Stops**: {}", self.stops.len())?;
        for reward in &self.instant_rewards {
            writeln!(out, "- Reward: {}", reward_line(reward))?;
        }
        Ok(())
    }
}

impl Report for CheckInReport {
    fn console(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.result.is_success() {
            writeln!(out, "{}", self.message().green().bold())?;
        } else {
            writeln!(out, "{}", self.message().yellow())?;
        }
        let ratio = self.progress.completion_percentage();
        writeln!(
            out,
            "Progress: {} {ratio:.0}% ({} points)",
            percent_bar(ratio),
            self.progress.points
        )?;
        for tier in &self.milestones_crossed {
            writeln!(out, "   🏅 {}", format!("{tier}% milestone reached").bright_yellow())?;
        }
        for reward in &self.rewards_issued {
            writeln!(out, "   🎁 {}", reward_line(reward).green())?;
        }
        Ok(())
    }

    fn markdown(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "# Check-in\n")?;
        writeln!(out, "{}\n", self.message())?;
        writeln!(
            out,
            "- **Progress**: {:.0}%",
            self.progress.completion_percentage()
        )?;
        writeln!(out, "- **Points**: {}", self.progress.points)?;
        for tier in &self.milestones_crossed {
            writeln!(out, "- Milestone: {tier}%")?;
        }
        for reward in &self.rewards_issued {
            writeln!(out, "- Reward: {}", reward_line(reward))?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct RewardList {
    pub title: String,
    pub rewards: Vec<IssuedReward>,
}

impl Report for RewardList {
    fn console(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", self.title.bright_cyan().bold())?;
        if self.rewards.is_empty() {
            writeln!(out, "   (none)")?;
        }
        for reward in &self.rewards {
            let status = if reward.used {
                "used".red()
            } else {
                "open".green()
            };
            writeln!(
                out,
                "   [{status}] {} {}",
                reward.id.dimmed(),
                reward_line(reward)
            )?;
        }
        Ok(())
    }

    fn markdown(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "# {}\n", self.title)?;
        for reward in &self.rewards {
            writeln!(
                out,
                "- `{}` [{}] {}",
                reward.id,
                reward.category,
                reward_line(reward)
            )?;
        }
        Ok(())
    }
}

impl Report for IssuedReward {
    fn console(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{} {}", "🎟️  Redeemed".green().bold(), reward_line(self))?;
        if let Some(used_at) = self.used_at {
            writeln!(out, "   at {}", used_at.format("%Y-%m-%d %H:%M UTC"))?;
        }
        Ok(())
    }

    fn markdown(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "# Reward redeemed\n")?;
        writeln!(out, "- **Reward**: {}", reward_line(self))?;
        if let Some(used_at) = self.used_at {
            writeln!(out, "- **Used at**: {}", used_at.to_rfc3339())?;
        }
        Ok(())
    }
}

impl Report for RewardValidity {
    fn console(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.valid {
            writeln!(out, "{} {}", "✅".green(), self.message)
        } else {
            writeln!(out, "{} {}", "❌".red(), self.message.red())
        }
    }

    fn markdown(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "- **Valid**: {}\n- **Message**: {}", self.valid, self.message)
    }
}

#[derive(Debug, Serialize)]
pub struct ProgressReport {
    pub progress: CompletionState,
    pub completion_percentage: f64,
    pub milestone: Option<String>,
    pub next_stop: Option<String>,
}

impl ProgressReport {
    pub fn new(progress: CompletionState, stops: &[PointOfInterest]) -> Self {
        let completion_percentage = progress.completion_percentage();
        let next_stop =
            tourpass_core::next_unvisited(stops, &progress).map(|spot| spot.name.clone());
        Self {
            milestone: tourpass_core::milestone_label(completion_percentage),
            completion_percentage,
            next_stop,
            progress,
        }
    }
}

impl Report for ProgressReport {
    fn console(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", "📍 Tour progress".bright_cyan().bold())?;
        writeln!(
            out,
            "{} {:.0}% ({}/{} spots, {} points)",
            percent_bar(self.completion_percentage),
            self.completion_percentage,
            self.progress.visited_spots.len(),
            self.progress.total_spots,
            self.progress.points
        )?;
        if let Some(milestone) = &self.milestone {
            writeln!(out, "Reached: {}", milestone.bright_yellow())?;
        }
        if let Some(next) = &self.next_stop {
            writeln!(out, "Next stop: {}", next.bold())?;
        }
        Ok(())
    }

    fn markdown(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "# Tour progress\n")?;
        writeln!(
            out,
            "- **Completion**: {:.0}%",
            self.completion_percentage
        )?;
        writeln!(
            out,
            "- **Visited**: {}/{}",
            self.progress.visited_spots.len(),
            self.progress.total_spots
        )?;
        writeln!(out, "- **Points**: {}", self.progress.points)?;
        if let Some(next) = &self.next_stop {
            writeln!(out, "- **Next stop**: {next}")?;
        }
        Ok(())
    }
}
