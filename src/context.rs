//! Per-session conversation context
//!
//! All changes go through `reduce`, which never mutates its input. The engine
//! feeds it one `UserMessage` event before composing and one `ResponseComposed`
//! event after.

use crate::intent::{matches_any, Intent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Max entries kept in `recent_topics` (duplicates allowed)
pub const TOPIC_HISTORY_LIMIT: usize = 5;
/// Max distinct entries kept in `interests`
pub const INTEREST_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    Token,
    Nft,
    Community,
    Roadmap,
    Security,
    Team,
    AiTools,
    Events,
}

impl Topic {
    pub const ALL: [Topic; 8] = [
        Topic::Token,
        Topic::Nft,
        Topic::Community,
        Topic::Roadmap,
        Topic::Security,
        Topic::Team,
        Topic::AiTools,
        Topic::Events,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Token => "token",
            Topic::Nft => "nft",
            Topic::Community => "community",
            Topic::Roadmap => "roadmap",
            Topic::Security => "security",
            Topic::Team => "team",
            Topic::AiTools => "ai-tools",
            Topic::Events => "events",
        }
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Topic::Token => &[
                "token", "degen", "coin", "price", "worth", "value", "chart", "buy", "purchase",
                "supply", "distribution", "allocation",
            ],
            Topic::Nft => &["nft", "mint", "collection", "rare", "1/1", "one of one"],
            Topic::Community => &["community", "discord", "telegram", "twitter", "join", "members"],
            Topic::Roadmap => &["roadmap", "future", "plan", "coming", "staking"],
            Topic::Security => &["audit", "safe", "security", "rug", "scam"],
            Topic::Team => &["team", "founder", "dev"],
            Topic::AiTools => &["ai", "tool", "premium", "bot", "snipe", "sniping"],
            Topic::Events => &["event", "meetup", "happening", "raid"],
        }
    }

    /// Topic an answered intent covers, if any
    pub fn for_intent(intent: Intent) -> Option<Topic> {
        match intent {
            Intent::Price | Intent::Buy | Intent::Tokenomics => Some(Topic::Token),
            Intent::Nft | Intent::Utility => Some(Topic::Nft),
            Intent::Community => Some(Topic::Community),
            Intent::Roadmap => Some(Topic::Roadmap),
            Intent::Security => Some(Topic::Security),
            Intent::Team => Some(Topic::Team),
            Intent::AiTools | Intent::SniperBot => Some(Topic::AiTools),
            Intent::Events => Some(Topic::Events),
            _ => None,
        }
    }
}

const POSITIVE_WORDS: &[&str] = &[
    "love", "great", "awesome", "amazing", "bullish", "moon", "lfg", "excited", "cool", "based",
];
const NEGATIVE_WORDS: &[&str] = &[
    "hate", "bad", "scam", "terrible", "worried", "bearish", "dump", "suck", "scared",
];
const INTERMEDIATE_WORDS: &[&str] = &[
    "wallet", "phantom", "swap", "solana", "staking", "airdrop", "floor", "jupiter", "dex",
];
const ADVANCED_WORDS: &[&str] = &[
    "liquidity pool", "market cap", "slippage", "amm", "fdv", "mev", "vesting", "smart contract",
    "contract address", "bonding curve", "apr", "apy",
];
const GREETING_WORDS: &[&str] = &["hi", "hello", "hey", "sup", "yo", "gm"];
const QUESTION_WORDS: &[&str] = &["what", "why", "how", "when", "where", "who", "which"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub recent_topics: Vec<Topic>,     // Oldest first, duplicates allowed
    pub sentiment: Sentiment,
    pub knowledge_level: KnowledgeLevel,
    pub interests: Vec<Topic>,         // Oldest first, distinct
    pub question_count: u32,
    pub last_response_type: Option<Intent>,
    pub told_about_nft: bool,
    pub told_about_token: bool,
    pub told_about_community: bool,
    pub told_about_roadmap: bool,
    pub greeted: bool,
    pub last_joke_at: Option<DateTime<Utc>>,
    pub last_market_comment_at: Option<DateTime<Utc>>,
    pub last_catchphrase_index: Option<usize>,
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self {
            recent_topics: Vec::new(),
            sentiment: Sentiment::Neutral,
            knowledge_level: KnowledgeLevel::Beginner,
            interests: Vec::new(),
            question_count: 0,
            last_response_type: None,
            told_about_nft: false,
            told_about_token: false,
            told_about_community: false,
            told_about_roadmap: false,
            greeted: false,
            last_joke_at: None,
            last_market_comment_at: None,
            last_catchphrase_index: None,
        }
    }
}

impl ConversationContext {
    pub fn has_been_told(&self, topic: Topic) -> bool {
        match topic {
            Topic::Token => self.told_about_token,
            Topic::Nft => self.told_about_nft,
            Topic::Community => self.told_about_community,
            Topic::Roadmap => self.told_about_roadmap,
            _ => false,
        }
    }

    /// Most recently mentioned interest, if any
    pub fn latest_interest(&self) -> Option<Topic> {
        self.interests.last().copied()
    }
}

/// Everything that can change a conversation context
#[derive(Debug, Clone, PartialEq)]
pub enum ContextEvent {
    /// A user message arrived
    UserMessage { input: String },
    /// A reply was composed; carries what it used so cooldowns and flags advance
    ResponseComposed {
        intent: Intent,
        greeted: bool,
        joked_at: Option<DateTime<Utc>>,
        market_comment_at: Option<DateTime<Utc>>,
        catchphrase_index: Option<usize>,
    },
    /// Chat was reset
    Reset,
}

/// Apply one event to a context, returning the new context
pub fn reduce(context: &ConversationContext, event: &ContextEvent) -> ConversationContext {
    match event {
        ContextEvent::UserMessage { input } => apply_user_message(context, input),
        ContextEvent::ResponseComposed {
            intent,
            greeted,
            joked_at,
            market_comment_at,
            catchphrase_index,
        } => {
            let mut next = context.clone();
            next.last_response_type = Some(*intent);
            next.greeted |= *greeted;
            match Topic::for_intent(*intent) {
                Some(Topic::Token) => next.told_about_token = true,
                Some(Topic::Nft) => next.told_about_nft = true,
                Some(Topic::Community) => next.told_about_community = true,
                Some(Topic::Roadmap) => next.told_about_roadmap = true,
                _ => {}
            }
            if joked_at.is_some() {
                next.last_joke_at = *joked_at;
            }
            if market_comment_at.is_some() {
                next.last_market_comment_at = *market_comment_at;
            }
            if catchphrase_index.is_some() {
                next.last_catchphrase_index = *catchphrase_index;
            }
            next
        }
        ContextEvent::Reset => ConversationContext::default(),
    }
}

/// Fold a user message into the context
pub fn analyze(input: &str, context: &ConversationContext) -> ConversationContext {
    reduce(context, &ContextEvent::UserMessage { input: input.to_string() })
}

fn apply_user_message(context: &ConversationContext, input: &str) -> ConversationContext {
    let mut next = context.clone();
    let text = input.to_lowercase();

    for topic in Topic::ALL {
        if matches_any(&text, topic.keywords()) {
            push_topic(&mut next.recent_topics, topic);
            push_interest(&mut next.interests, topic);
        }
    }

    // Negative wins a tie; no keywords leaves sentiment where it was
    if matches_any(&text, NEGATIVE_WORDS) {
        next.sentiment = Sentiment::Negative;
    } else if matches_any(&text, POSITIVE_WORDS) {
        next.sentiment = Sentiment::Positive;
    }

    // Escalate only
    if matches_any(&text, ADVANCED_WORDS) {
        next.knowledge_level = KnowledgeLevel::Advanced;
    } else if matches_any(&text, INTERMEDIATE_WORDS) {
        next.knowledge_level = next.knowledge_level.max(KnowledgeLevel::Intermediate);
    }

    if matches_any(&text, GREETING_WORDS) {
        next.greeted = true;
    }

    if input.contains('?') || matches_any(&text, QUESTION_WORDS) {
        next.question_count += 1;
    }

    next
}

fn push_topic(topics: &mut Vec<Topic>, topic: Topic) {
    topics.push(topic);
    if topics.len() > TOPIC_HISTORY_LIMIT {
        let overflow = topics.len() - TOPIC_HISTORY_LIMIT;
        topics.drain(..overflow);
    }
}

fn push_interest(interests: &mut Vec<Topic>, topic: Topic) {
    interests.retain(|t| *t != topic);
    interests.push(topic);
    if interests.len() > INTEREST_LIMIT {
        let overflow = interests.len() - INTEREST_LIMIT;
        interests.drain(..overflow);
    }
}
