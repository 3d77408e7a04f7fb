//! Command handlers for tallyctl

use crate::client::TallyClient;
use anyhow::{anyhow, Context, Result};
use owo_colors::OwoColorize;
use std::collections::HashMap;
use tally_common::projection;

/// Handle status command
pub async fn status(client: &TallyClient) -> Result<()> {
    let health = client.health().await?;
    println!("{} v{}", "tallyd".bold(), health.version);
    println!("  status  {}", health.status.green());
    println!("  uptime  {}s", health.uptime_seconds);
    Ok(())
}

/// Handle stats command
pub async fn stats(client: &TallyClient) -> Result<()> {
    let stats = client.stats().await?;

    println!("{}", "Performance".bold());
    println!(
        "  overall {}%  grade {}",
        stats.overall_score,
        stats.grade.bold()
    );
    println!("  papers  {}", stats.paper_count);

    if !stats.topics.is_empty() {
        println!();
        println!("{}", "Topics, weakest first".bold());
        for topic in &stats.topics {
            println!(
                "  {:<24} {:>5.1}%   {}/{} marks",
                topic.topic, topic.accuracy, topic.marks_obtained, topic.marks_available
            );
        }
    }

    if !stats.question_type_weakness.is_empty() {
        println!();
        println!("{}", "Question types, most marks lost".bold());
        for weakness in &stats.question_type_weakness {
            println!(
                "  {:<24} {:>5.1}%   {} marks lost",
                weakness.question_type, weakness.accuracy, weakness.marks_lost
            );
        }
    }

    Ok(())
}

/// Handle streak command
pub async fn streak(client: &TallyClient) -> Result<()> {
    let streak = client.streak().await?;

    println!("{}", "Streak".bold());
    println!("  current {} day(s)", streak.current_streak);
    println!("  longest {} day(s)", streak.longest_streak);
    match streak.last_activity_date {
        Some(date) => println!("  last activity {}", date),
        None => println!("  last activity never"),
    }

    Ok(())
}

/// Handle points command
pub async fn points(client: &TallyClient) -> Result<()> {
    let points = client.points().await?;

    println!("{}", "Points".bold());
    println!("  total      {}", points.total_points);
    println!("  experience {}", points.experience);
    println!("  level      {}", points.level);
    println!("  next level at {} xp", points.next_level_at);

    Ok(())
}

/// Handle badges command
pub async fn badges(client: &TallyClient) -> Result<()> {
    let response = client.badges().await?;

    if response.badges.is_empty() {
        println!("No badges earned yet");
        return Ok(());
    }

    println!("{}", "Badges".bold());
    for badge in &response.badges {
        println!(
            "  {:<16} earned {}",
            badge.badge_id.green(),
            badge.earned_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}

/// Handle leaderboard command
pub async fn leaderboard(client: &TallyClient) -> Result<()> {
    let response = client.leaderboard().await?;

    if response.entries.is_empty() {
        println!("Leaderboard is empty");
        return Ok(());
    }

    println!("{}", "Leaderboard".bold());
    for entry in &response.entries {
        println!(
            "  {:>3}. {:<20} level {:<3} {:>8} pts",
            entry.rank, entry.username, entry.level, entry.total_points
        );
    }

    Ok(())
}

/// Handle opt-in and opt-out commands
pub async fn set_visibility(client: &TallyClient, is_public: bool) -> Result<()> {
    let response = client.toggle_visibility(is_public).await?;
    let label = if response.leaderboard_opt_in {
        "public".green().to_string()
    } else {
        "hidden".yellow().to_string()
    };
    println!("Leaderboard visibility: {}", label);
    Ok(())
}

/// Handle project command: fetch current stats and run the what-if locally
pub async fn project(client: &TallyClient, improve: &[String]) -> Result<()> {
    let improvements = parse_improvements(improve)?;

    let stats = client.stats().await?;
    if stats.topics.is_empty() {
        println!("No submissions yet, nothing to project");
        return Ok(());
    }

    let projection = projection::project(&stats.topics, &improvements)?;

    println!("{}", "Projection".bold());
    println!(
        "  current   {}%  grade {}",
        stats.overall_score, stats.grade
    );
    println!(
        "  projected {:.1}%  grade {}",
        projection.projected_overall,
        projection.projected_grade.bold()
    );
    println!();
    for topic in &projection.topics {
        let marker = if improvements.contains_key(&topic.topic) {
            "+"
        } else {
            " "
        };
        println!(
            "  {} {:<24} {:>5.1}% to {:>5.1}%",
            marker, topic.topic, topic.current_accuracy, topic.projected_accuracy
        );
    }

    Ok(())
}

/// Parse repeated TOPIC=POINTS arguments into an improvements map.
fn parse_improvements(improve: &[String]) -> Result<HashMap<String, f64>> {
    let mut improvements = HashMap::new();
    for entry in improve {
        let (topic, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected TOPIC=POINTS, got {:?}", entry))?;
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(anyhow!("Empty topic in {:?}", entry));
        }
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("Invalid points in {:?}", entry))?;
        improvements.insert(topic.to_string(), value);
    }
    Ok(improvements)
}
