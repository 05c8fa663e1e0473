use serde::{Deserialize, Serialize};

// ============ Intents ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intent {
    Price,
    Buy,
    Nft,
    Utility,
    Security,
    Community,
    Roadmap,
    Team,
    Tokenomics,
    SniperBot,
    AiTools,
    Events,
    Joke,
    Greeting,
    Compliment,
    InsultResponse,
    Farewell,
    Default,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Price => "price",
            Intent::Buy => "buy",
            Intent::Nft => "nft",
            Intent::Utility => "utility",
            Intent::Security => "security",
            Intent::Community => "community",
            Intent::Roadmap => "roadmap",
            Intent::Team => "team",
            Intent::Tokenomics => "tokenomics",
            Intent::SniperBot => "sniper-bot",
            Intent::AiTools => "ai-tools",
            Intent::Events => "events",
            Intent::Joke => "joke",
            Intent::Greeting => "greeting",
            Intent::Compliment => "compliment",
            Intent::InsultResponse => "insult-response",
            Intent::Farewell => "farewell",
            Intent::Default => "default",
        }
    }
}

/// Fixed classification order. The first entry with a matching keyword wins.
/// Common questions come first; sniper-bot sits ahead of ai-tools so "trading bot"
/// is not swallowed by "bot".
pub const INTENT_PRIORITY: &[(Intent, &[&str])] = &[
    (Intent::Price, &["price", "worth", "value", "chart"]),
    (Intent::Buy, &["buy", "get", "purchase"]),
    (Intent::Nft, &["nft", "mint", "collection"]),
    (Intent::Utility, &["utility", "utilities", "benefit"]),
    (Intent::Security, &["audit", "safe", "security", "rug"]),
    (Intent::Community, &["community", "discord", "telegram", "twitter", "join"]),
    (Intent::Roadmap, &["roadmap", "future", "plan", "coming"]),
    (Intent::Team, &["team", "founder", "dev", "who"]),
    (Intent::Tokenomics, &["tokenomics", "supply", "distribution", "allocation"]),
    (Intent::SniperBot, &["snipe", "sniping", "trading bot"]),
    (Intent::AiTools, &["ai", "tool", "premium", "bot"]),
    (Intent::Events, &["event", "meetup", "happening"]),
    (Intent::Joke, &["joke", "funny", "laugh", "lol"]),
    (Intent::Greeting, &["hi", "hello", "hey", "sup", "yo", "gm"]),
    (Intent::Compliment, &["thank", "good job", "nice", "helpful"]),
    (Intent::InsultResponse, &["bad", "suck", "terrible", "hate"]),
    (Intent::Farewell, &["bye", "later", "cya"]),
];

// ============ Keyword Matching ============

/// True if `keyword` occurs anywhere in the already lower-cased `text`.
/// Inflections match through their stem ("rugged" hits "rug").
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    !keyword.is_empty() && text.contains(keyword)
}

/// True if any keyword of the set occurs in the already lower-cased `text`
pub fn matches_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| contains_keyword(text, kw))
}

/// Map free-text input to an intent. Never fails; unmatched input is `Default`.
pub fn classify(input: &str) -> Intent {
    let text = input.trim().to_lowercase();
    if text.is_empty() {
        return Intent::Default;
    }

    INTENT_PRIORITY
        .iter()
        .find(|(_, keywords)| matches_any(&text, keywords))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::Default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_and_unmatched_are_default() {
        assert_eq!(classify(""), Intent::Default);
        assert_eq!(classify("   \t\n "), Intent::Default);
        assert_eq!(classify("purple elephants dance"), Intent::Default);
        assert_eq!(classify("?!?!"), Intent::Default);
    }

    #[test]
    fn test_single_intent_keywords_regardless_of_case() {
        for (intent, keywords) in INTENT_PRIORITY {
            for keyword in keywords.iter() {
                assert_eq!(classify(keyword), *intent, "input {:?}", keyword);
                assert_eq!(classify(&keyword.to_uppercase()), *intent, "input {:?}", keyword);
            }
        }
    }

    #[test]
    fn test_no_keyword_contains_an_earlier_intents_keyword() {
        for (n, (intent, keywords)) in INTENT_PRIORITY.iter().enumerate() {
            for keyword in keywords.iter() {
                for (earlier, earlier_keywords) in &INTENT_PRIORITY[..n] {
                    assert!(
                        !matches_any(keyword, earlier_keywords),
                        "{} keyword {:?} is shadowed by {}",
                        intent.as_str(),
                        keyword,
                        earlier.as_str()
                    );
                }
            }
        }
    }

    #[test]
    fn test_inflected_inputs_match_their_stem() {
        let cases = [
            ("rugged?", Intent::Security),
            ("audits?", Intent::Security),
            ("laughing", Intent::Joke),
            ("jokes pls", Intent::Joke),
            ("purchased some", Intent::Buy),
            ("any planning", Intent::Roadmap),
            ("minting soon", Intent::Nft),
            ("the founders", Intent::Team),
            ("thanks", Intent::Compliment),
            ("Benefits", Intent::Utility),
            ("goodbye", Intent::Farewell),
        ];
        for (input, expected) in cases {
            assert_eq!(classify(input), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_price_takes_precedence_over_joke() {
        assert_eq!(classify("tell me a joke about the price"), Intent::Price);
        assert_eq!(classify("tell me a joke"), Intent::Joke);
    }

    #[test]
    fn test_sniper_bot_precedes_ai_tools() {
        assert_eq!(classify("do you have a trading bot"), Intent::SniperBot);
        assert_eq!(classify("is there a bot"), Intent::AiTools);
    }

    #[test]
    fn test_short_keywords_fire_inside_words() {
        // "yo" inside "you", "hi" inside "this"
        assert_eq!(classify("you there"), Intent::Greeting);
        assert_eq!(classify("this one"), Intent::Greeting);
        // Only when nothing earlier in the order matches
        assert_eq!(classify("you have a discord?"), Intent::Community);
    }

    #[test]
    fn test_end_to_end_question_shapes() {
        assert_eq!(classify("what's the price?"), Intent::Price);
        assert_eq!(classify("How do I buy?"), Intent::Buy);
        assert_eq!(classify("Is it safe or a rug?"), Intent::Security);
        assert_eq!(classify("thanks, very helpful"), Intent::Compliment);
        assert_eq!(classify("ok bye"), Intent::Farewell);
    }

    #[test]
    fn test_contains_keyword_phrases() {
        assert!(contains_keyword("great work, good job team!", "good job"));
        assert!(!contains_keyword("great work, good job team!", "job good"));
        assert!(!contains_keyword("anything", ""));
    }
}
