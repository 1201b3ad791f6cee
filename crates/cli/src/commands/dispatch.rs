use super::{load_runtime, print_json};
use color_eyre::eyre::{eyre, Result};
use colored::Colorize;
use dk_protocol::{AgentScore, RequestContext};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct RouteOutput<'a> {
    selected: Vec<String>,
    fallback_used: bool,
    scores: &'a [AgentScore],
}

pub async fn route(root: &Path, message: &str, json: bool) -> Result<()> {
    let runtime = load_runtime(root).await?;
    let decision = runtime.orchestrator().route(message, &RequestContext::new())?;
    let selected = decision.agent_ids();

    if json {
        return print_json(&RouteOutput {
            selected,
            fallback_used: decision.fallback_used,
            scores: &decision.scores,
        });
    }

    let policy = runtime.policy();
    println!("{} (threshold {:.2})", "Scores:".bold(), policy.threshold);
    for score in &decision.scores {
        let marker = if selected.contains(&score.agent_id) {
            "→".green()
        } else {
            " ".normal()
        };
        println!("  {marker} {:<16} {:.2}", score.agent_id, score.score);
    }
    if decision.fallback_used {
        println!("  {} no agent reached the threshold, using {}", "⚠".yellow(), policy.default_agent.cyan());
    }
    Ok(())
}

pub async fn ask(root: &Path, message: &str, conversation: Option<&str>, json: bool) -> Result<()> {
    let runtime = load_runtime(root).await?;
    let context = match conversation {
        Some(id) => RequestContext::new().with_conversation_id(id),
        None => RequestContext::new(),
    };

    let result = runtime.orchestrator().route_and_dispatch(message, &context).await;

    if json {
        print_json(&result)?;
    } else if result.is_success() {
        println!("{}", result.content);
        println!();
        println!(
            "{}",
            format!(
                "agents: {} | {} ms | {} tokens",
                result.agents_used.join(", "),
                result.total_time.as_millis(),
                result.total_tokens()
            )
            .dimmed()
        );
    }

    if result.is_success() {
        return Ok(());
    }
    let reason = result
        .failure
        .as_ref()
        .and_then(|f| f.error_message())
        .unwrap_or("dispatch failed");
    Err(eyre!("{reason}"))
}
