// Terminal front end: streams replies as they are revealed and maps slash commands onto the app

use crate::metrics::{format_currency, format_percent, TokenMetrics};
use crate::nft::NftListing;
use crate::persona::PERSONA_NAME;
use crate::session::{ChatMessage, Role};
use crate::trades::{format_time_ago, Trade};
use crate::{get_chat_history, get_nft_listings, get_recent_trades, get_token_metrics, reset_chat, send_message, App};
use chrono::{DateTime, Utc};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "Commands: /history /reset /stats /nfts /trades /help /quit. Anything else goes to the SewerKing.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Send(String),
    History,
    Reset,
    Stats,
    Nfts,
    Trades,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

pub fn parse_line(line: &str) -> ShellCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ShellCommand::Empty;
    }
    if !trimmed.starts_with('/') {
        return ShellCommand::Send(trimmed.to_string());
    }

    match trimmed.to_lowercase().as_str() {
        "/history" => ShellCommand::History,
        "/reset" => ShellCommand::Reset,
        "/stats" => ShellCommand::Stats,
        "/nfts" => ShellCommand::Nfts,
        "/trades" => ShellCommand::Trades,
        "/help" => ShellCommand::Help,
        "/quit" | "/exit" => ShellCommand::Quit,
        _ => ShellCommand::Unknown(trimmed.to_string()),
    }
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => PERSONA_NAME,
    }
}

pub fn render_history(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", speaker(m.role), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_stats(metrics: &TokenMetrics) -> String {
    format!(
        "Price: {} ({} 24h)\nMarket cap: {}\nVolume 24h: {}\nLiquidity: {}\nHolders: {}",
        format_currency(metrics.price),
        format_percent(metrics.price_change_24h),
        format_currency(metrics.market_cap),
        format_currency(metrics.volume_24h),
        format_currency(metrics.liquidity),
        metrics.holders
    )
}

pub fn render_nfts(listings: &[NftListing]) -> String {
    if listings.is_empty() {
        return "No NFTs found".to_string();
    }
    listings
        .iter()
        .map(|n| {
            let tag = if n.is_one_of_one { " [1/1]" } else { "" };
            format!("{}{} - {} SOL on {} ({})", n.name, tag, n.price, n.marketplace, n.marketplace_url)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_trades(trades: &[Trade], now: DateTime<Utc>) -> String {
    if trades.is_empty() {
        return "No recent trades detected".to_string();
    }
    trades
        .iter()
        .map(|t| {
            let market: String = t.market_address.chars().take(8).collect();
            format!(
                "{} {} - {} ({}...)",
                t.token_symbol,
                format_currency(t.price_usd),
                format_time_ago(t.timestamp, now),
                market
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read lines from stdin until /quit or EOF
pub async fn run_shell(app: &App) {
    app.engine().set_character_observer(|c, _| {
        let mut out = std::io::stdout();
        let _ = write!(out, "{}", c);
        let _ = out.flush();
    });

    println!("{}", render_history(&get_chat_history(app)));
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            ShellCommand::Empty => {}
            ShellCommand::Send(text) => {
                print!("{}: ", PERSONA_NAME);
                let _ = std::io::stdout().flush();
                match send_message(app, &text).await {
                    Ok(_) => println!(),
                    Err(e) => println!("\n{}", e),
                }
            }
            ShellCommand::History => println!("{}", render_history(&get_chat_history(app))),
            ShellCommand::Reset => match reset_chat(app) {
                Ok(()) => println!("{}", render_history(&get_chat_history(app))),
                Err(e) => println!("{}", e),
            },
            ShellCommand::Stats => println!("{}", render_stats(&get_token_metrics(app))),
            ShellCommand::Nfts => println!("{}", render_nfts(&get_nft_listings(app).await)),
            ShellCommand::Trades => println!("{}", render_trades(&get_recent_trades(app), Utc::now())),
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Unknown(cmd) => println!("Unknown command {}. {}", cmd, HELP),
            ShellCommand::Quit => break,
        }
    }
}
