//! Response composer
//!
//! Turns an intent plus the current context and market snapshot into reply text.
//! Informational and default replies can carry a greeting prefix, a market line
//! and a catchphrase suffix; joke, greeting, compliment, insult and farewell
//! replies are a single line from their pool.

use crate::config::ChatConfig;
use crate::context::{ContextEvent, ConversationContext, KnowledgeLevel, Sentiment, Topic};
use crate::intent::Intent;
use crate::knowledge::{project_summary, tokenomics_breakdown, KNOWLEDGE};
use crate::logging;
use crate::metrics::{format_currency, format_percent, TokenMetrics};
use crate::persona::{self, FlavorCategory, CATCHPHRASES};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// Max characters of the user's input echoed back by the default reply
const ECHO_LIMIT: usize = 30;

#[derive(Debug, Clone, PartialEq)]
pub enum ComposeError {
    EmptyPool(FlavorCategory),
    InvalidMetrics,
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeError::EmptyPool(category) => write!(f, "No {} lines to pick from", category.as_str()),
            ComposeError::InvalidMetrics => write!(f, "Token metrics contain invalid numbers"),
        }
    }
}

impl std::error::Error for ComposeError {}

/// A composed reply plus what it consumed, so the context can advance
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub text: String,
    pub intent: Intent,
    pub greeted: bool,
    pub joked_at: Option<DateTime<Utc>>,
    pub market_comment_at: Option<DateTime<Utc>>,
    pub catchphrase_index: Option<usize>,
}

impl Composition {
    pub fn to_event(&self) -> ContextEvent {
        ContextEvent::ResponseComposed {
            intent: self.intent,
            greeted: self.greeted,
            joked_at: self.joked_at,
            market_comment_at: self.market_comment_at,
            catchphrase_index: self.catchphrase_index,
        }
    }
}

pub struct ResponseComposer {
    rng: StdRng,
    config: ChatConfig,
}

impl ResponseComposer {
    /// Seeded from `config.rng_seed` when set, otherwise from the OS
    pub fn new(config: &ChatConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            config: config.clone().sanitized(),
        }
    }

    pub fn compose(
        &mut self,
        intent: Intent,
        input: &str,
        context: &ConversationContext,
        metrics: &TokenMetrics,
        now: DateTime<Utc>,
    ) -> Result<Composition, ComposeError> {
        if !metrics.is_valid() {
            return Err(ComposeError::InvalidMetrics);
        }

        let mut composition = Composition {
            text: String::new(),
            intent,
            greeted: false,
            joked_at: None,
            market_comment_at: None,
            catchphrase_index: None,
        };

        let text = match intent {
            Intent::Joke => {
                composition.joked_at = Some(now);
                self.line(FlavorCategory::Joke)?.to_string()
            }
            Intent::Greeting => {
                composition.greeted = true;
                format!(
                    "{} How can I help you navigate the sewers today? Want some alpha on our token, NFTs, or community?",
                    self.line(FlavorCategory::Greeting)?
                )
            }
            Intent::Compliment => self.line(FlavorCategory::Compliment)?.to_string(),
            Intent::InsultResponse => self.line(FlavorCategory::Insult)?.to_string(),
            Intent::Farewell => self.line(FlavorCategory::Farewell)?.to_string(),
            _ => self.decorated(intent, input, context, metrics, now, &mut composition)?,
        };

        composition.text = match self.config.max_response_chars {
            Some(limit) => truncate_chars(&text, limit),
            None => text,
        };

        logging::log_composer(None, &format!(
            "Composed {} reply ({} chars, greeted={}, market_line={}, catchphrase={:?})",
            intent.as_str(),
            composition.text.chars().count(),
            composition.greeted,
            composition.market_comment_at.is_some(),
            composition.catchphrase_index
        ));

        Ok(composition)
    }

    /// Informational and default replies: greeting prefix, market line, body, catchphrase
    fn decorated(
        &mut self,
        intent: Intent,
        input: &str,
        context: &ConversationContext,
        metrics: &TokenMetrics,
        now: DateTime<Utc>,
        composition: &mut Composition,
    ) -> Result<String, ComposeError> {
        let mut parts: Vec<String> = Vec::new();

        if !context.greeted && context.question_count == 0 {
            parts.push(self.line(FlavorCategory::Greeting)?.to_string());
            composition.greeted = true;
        }

        if self.wants_market_line(intent, context, now) {
            let category = persona::market_sentiment_category(metrics.price_change_24h);
            parts.push(self.line(category)?.to_string());
            composition.market_comment_at = Some(now);
        }

        if intent == Intent::Default {
            // The default pitch always carries a catchphrase in its body
            let index = self.catchphrase_index(context)?;
            composition.catchphrase_index = Some(index);
            parts.push(self.default_body(input, context, CATCHPHRASES[index]));

            if self.wants_bonus_joke(context, now) {
                parts.push(format!("Bonus joke for ya: {}", self.line(FlavorCategory::Joke)?));
                composition.joked_at = Some(now);
            }
        } else {
            parts.push(self.body(intent, context, metrics));

            if self.rng.random_bool(self.config.catchphrase_chance) {
                let index = self.catchphrase_index(context)?;
                composition.catchphrase_index = Some(index);
                parts.push(CATCHPHRASES[index].to_string());
            }
        }

        Ok(parts.join(" "))
    }

    fn body(&self, intent: Intent, context: &ConversationContext, metrics: &TokenMetrics) -> String {
        let kb = &KNOWLEDGE;
        let repeat = Topic::for_intent(intent)
            .map(|topic| context.has_been_told(topic))
            .unwrap_or(false);

        match intent {
            Intent::Price => {
                let mut text = format!(
                    "The {} token is currently trading at {} with a {} change in the last 24 hours. \
                     Our all-time high is {}! Market cap is sitting at {} with {} in liquidity. \
                     Volume in the last 24 hours is {}, and we've got {} holders in the sewer.",
                    kb.token.name,
                    format_currency(metrics.price),
                    format_percent(metrics.price_change_24h),
                    kb.token.all_time_high,
                    format_currency(metrics.market_cap),
                    format_currency(metrics.liquidity),
                    format_currency(metrics.volume_24h),
                    metrics.holders
                );
                if context.knowledge_level == KnowledgeLevel::Advanced && metrics.market_cap > 0.0 {
                    text.push_str(&format!(
                        " Liquidity sits at {:.1}% of market cap, for the chart nerds.",
                        metrics.liquidity / metrics.market_cap * 100.0
                    ));
                }
                if context.sentiment == Sentiment::Negative {
                    text.push_str(" Don't sweat the candles, rats zoom out.");
                }
                text
            }
            Intent::Buy => {
                let mut text = format!(
                    "Ready to join the rat pack? You can buy {} on Jupiter Exchange ({}) or PumpFun ({}).",
                    kb.token.name, kb.token.jupiter_url, kb.token.pumpfun_url
                );
                if context.knowledge_level == KnowledgeLevel::Beginner && !repeat {
                    text.push_str(&format!(
                        " Just connect your Solana wallet, swap some SOL for {}, and you're in! \
                         Need help with the swap? Hit us up in the Discord and a mod will guide you through it.",
                        kb.token.name
                    ));
                }
                text.push_str(&format!(
                    " Current price is {}. Contract address is {} - always double-check it!",
                    format_currency(metrics.price),
                    kb.token.contract
                ));
                text
            }
            Intent::Nft => {
                if repeat {
                    format!(
                        "Quick recap: {} rats total, {} to mint, and minting is {}. Grab yours on {}!",
                        kb.nft.total,
                        kb.nft.mint_price,
                        kb.nft.mint_status,
                        kb.nft.marketplaces.join(", ")
                    )
                } else {
                    format!(
                        "Our NFT collection is FIRE! We've got {} total {} - {} standard editions and {} super rare 1:1 special editions. \
                         Mint price is just {} - absolute steal! Minting is {}! Each NFT gets you {}. You can find them on {}. \
                         These rats are gonna MOON! 🐀💎",
                        kb.nft.total,
                        kb.nft.collection,
                        kb.nft.standard,
                        kb.nft.special,
                        kb.nft.mint_price,
                        kb.nft.mint_status,
                        kb.nft.benefits.join(", "),
                        kb.nft.marketplaces.join(", ")
                    )
                }
            }
            Intent::Utility => format!(
                "Holding a Degen Rug-Rat isn't just for the flex. You get {}. Token holders also unlock our premium tools: {}. {}.",
                kb.nft.benefits.join(", "),
                kb.tooling.ai_tools.join(", "),
                kb.tooling.holder_requirement
            ),
            Intent::Security => {
                let mut text = format!(
                    "Security first, rat fam! {} We take security seriously - despite our name, we're not here to rug anyone! \
                     The liquidity is locked, and the team tokens are vested with a transparent schedule.",
                    kb.token.audit
                );
                if context.sentiment == Sentiment::Negative {
                    text.push_str(" I hear the worry, and that's exactly why everything's on-chain for you to verify.");
                }
                text.push_str(" Always DYOR, but we've made sure this project is as safe as a rat in its burrow!");
                text
            }
            Intent::Community => {
                let events = kb
                    .community
                    .events
                    .iter()
                    .map(|e| format!("{} on {}", e.name, e.date))
                    .collect::<Vec<_>>()
                    .join(" and ");
                format!(
                    "The Degen Rug-Rats community is the most savage crew in the sewers! Join our Discord at {} or follow us on Twitter at {}. \
                     We've got {} rats in Discord and {} following us on Twitter. We've got upcoming events like {}. Don't miss out on the alpha!",
                    kb.community.discord_url,
                    kb.community.twitter_url,
                    kb.community.discord_members,
                    kb.community.twitter_followers,
                    events
                )
            }
            Intent::Roadmap => {
                let (next, later) = kb.roadmap.upcoming.split_at(kb.roadmap.upcoming.len().min(3));
                let mut text = format!(
                    "Our roadmap is stacked, rat fam! We've already completed {}. Right now we're focused on {}. Coming up next is {}",
                    kb.roadmap.completed.join(", "),
                    kb.roadmap.current.join(", "),
                    next.join(", ")
                );
                if !later.is_empty() {
                    text.push_str(&format!(", and long-term we're looking at {}", later.join(", ")));
                }
                text.push_str(". The future's bright for us rats! 💰🔮");
                text
            }
            Intent::Team => "The Degen Rug-Rats team is a group of crypto OGs who've been through multiple market cycles. \
                 They prefer to stay anon (smart in this space, ya know?), but they're super active in the Discord. \
                 Come chat with them directly - they're always dropping alpha!"
                .to_string(),
            Intent::Tokenomics => format!(
                "Here's the cheese on our tokenomics: Total supply is {} {}. {}. Market cap right now is {}. \
                 No presale, no VCs, just a fair launch for all the rats in the sewer!",
                kb.token.total_supply,
                kb.token.name,
                tokenomics_breakdown(),
                format_currency(metrics.market_cap)
            ),
            Intent::SniperBot => format!(
                "The SewerKing sniper bot is for rats who move fast: {}. {}. Sniping responsibly is still sniping, so size your bags!",
                kb.tooling.sniper_bot_features.join(", "),
                kb.tooling.holder_requirement
            ),
            Intent::AiTools => {
                let mut text = format!(
                    "Our premium AI tools give rats an edge: {}. {}.",
                    kb.tooling.ai_tools.join(", "),
                    kb.tooling.holder_requirement
                );
                if context.knowledge_level == KnowledgeLevel::Beginner {
                    text.push_str(" New to this? Start with the rug-risk scanner before you ape into anything.");
                }
                text
            }
            Intent::Events => {
                let events = kb
                    .community
                    .events
                    .iter()
                    .map(|e| format!("{} ({}): {}", e.name, e.date, e.description))
                    .collect::<Vec<_>>()
                    .join(". ");
                format!(
                    "Here's what's happening in the sewers: {}. Details drop in the Discord at {}.",
                    events, kb.community.discord_url
                )
            }
            // Single-pool intents never reach here
            _ => String::new(),
        }
    }

    fn default_body(&self, input: &str, context: &ConversationContext, catchphrase: &str) -> String {
        let mut text = format!(
            "Thanks for asking about \"{}\". {} {}",
            echo(input),
            catchphrase,
            project_summary()
        );
        if let Some(topic) = context.latest_interest() {
            text.push_str(&format!(
                " Since you've been sniffing around {}, ask me more about it anytime.",
                topic_phrase(topic)
            ));
        }
        text.push_str(" Anything specific about our token, NFTs, or community you'd like to know more about? I'm your rat, just ask!");
        text
    }

    /// Price, buy and tokenomics always comment when off cooldown; others roll for it
    fn wants_market_line(&mut self, intent: Intent, context: &ConversationContext, now: DateTime<Utc>) -> bool {
        let cooled = off_cooldown(context.last_market_comment_at, now, self.config.market_comment_cooldown_secs);
        if !cooled {
            return false;
        }
        matches!(intent, Intent::Price | Intent::Buy | Intent::Tokenomics)
            || self.rng.random_bool(self.config.market_comment_chance)
    }

    fn wants_bonus_joke(&mut self, context: &ConversationContext, now: DateTime<Utc>) -> bool {
        off_cooldown(context.last_joke_at, now, self.config.joke_cooldown_secs)
            && self.rng.random_bool(self.config.bonus_joke_chance)
    }

    fn catchphrase_index(&mut self, context: &ConversationContext) -> Result<usize, ComposeError> {
        persona::pick_index_avoiding(&mut self.rng, CATCHPHRASES.len(), context.last_catchphrase_index)
            .ok_or(ComposeError::EmptyPool(FlavorCategory::Catchphrase))
    }

    fn line(&mut self, category: FlavorCategory) -> Result<&'static str, ComposeError> {
        persona::pick_line(&mut self.rng, category).ok_or(ComposeError::EmptyPool(category))
    }
}

// A cooldown too long to represent never clears
fn off_cooldown(last: Option<DateTime<Utc>>, now: DateTime<Utc>, cooldown_secs: i64) -> bool {
    match (last, Duration::try_seconds(cooldown_secs)) {
        (None, _) => true,
        (Some(at), Some(cooldown)) => now - at >= cooldown,
        (Some(_), None) => false,
    }
}

/// Up to `ECHO_LIMIT` chars of the trimmed input, with "..." when cut
fn echo(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.chars().count() > ECHO_LIMIT {
        format!("{}...", trimmed.chars().take(ECHO_LIMIT).collect::<String>())
    } else {
        trimmed.to_string()
    }
}

/// Cut to `limit` chars on a char boundary and append "..."
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

fn topic_phrase(topic: Topic) -> &'static str {
    match topic {
        Topic::Token => "the token",
        Topic::Nft => "the NFTs",
        Topic::Community => "the community",
        Topic::Roadmap => "the roadmap",
        Topic::Security => "security",
        Topic::Team => "the team",
        Topic::AiTools => "our tools",
        Topic::Events => "our events",
    }
}
