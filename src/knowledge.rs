// Static knowledge base for SewerKing
// Everything the persona is allowed to state as fact about the project lives here

/// Token facts. Live price data comes from `metrics`; these are the fixed ones.
#[derive(Debug, Clone, Copy)]
pub struct TokenFacts {
    pub name: &'static str,
    pub contract: &'static str,
    pub total_supply: &'static str,
    pub jupiter_url: &'static str,
    pub pumpfun_url: &'static str,
    pub all_time_high: &'static str,
    pub audit: &'static str,
    pub holders: u64,
}

/// One slice of the token allocation
#[derive(Debug, Clone, Copy)]
pub struct Allocation {
    pub share_percent: u8,
    pub purpose: &'static str,
    pub lockup: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub struct NftFacts {
    pub collection: &'static str,
    pub total: u32,
    pub standard: u32,
    pub special: u32,
    pub mint_price: &'static str,
    pub mint_status: &'static str,
    pub marketplaces: &'static [&'static str],
    pub benefits: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct CommunityEvent {
    pub name: &'static str,
    pub date: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct CommunityFacts {
    pub discord_url: &'static str,
    pub twitter_url: &'static str,
    pub discord_members: u32,
    pub twitter_followers: u32,
    pub events: &'static [CommunityEvent],
}

#[derive(Debug, Clone, Copy)]
pub struct RoadmapFacts {
    pub completed: &'static [&'static str],
    pub current: &'static [&'static str],
    pub upcoming: &'static [&'static str],
}

/// Product facts for the premium tooling the persona pitches
#[derive(Debug, Clone, Copy)]
pub struct ToolingFacts {
    pub ai_tools: &'static [&'static str],
    pub sniper_bot_features: &'static [&'static str],
    pub holder_requirement: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct KnowledgeBase {
    pub token: TokenFacts,
    pub tokenomics: &'static [Allocation],
    pub nft: NftFacts,
    pub community: CommunityFacts,
    pub roadmap: RoadmapFacts,
    pub tooling: ToolingFacts,
}

pub static KNOWLEDGE: KnowledgeBase = KnowledgeBase {
    token: TokenFacts {
        name: "$DEGEN",
        contract: "G7o5yXGyQPxUbPPJC6Apme7p5M1YqVoapQ2YbUsWpump",
        total_supply: "1,000,000,000",
        jupiter_url: "https://jup.ag/swap/SOL-G7o5yXGyQPxUbPPJC6Apme7p5M1YqVoapQ2YbUsWpump",
        pumpfun_url: "https://pump.fun/coin/G7o5yXGyQPxUbPPJC6Apme7p5M1YqVoapQ2YbUsWpump",
        all_time_high: "$0.000069",
        audit: "Audited by RatSec, no vulnerabilities found. Contract is non-upgradeable and ownership is renounced.",
        holders: 24,
    },
    tokenomics: &[
        Allocation { share_percent: 40, purpose: "liquidity", lockup: Some("locked for 6 months") },
        Allocation { share_percent: 20, purpose: "marketing", lockup: Some("vested over 12 months") },
        Allocation { share_percent: 15, purpose: "development", lockup: Some("vested over 18 months") },
        Allocation { share_percent: 15, purpose: "community rewards and airdrops", lockup: None },
        Allocation { share_percent: 10, purpose: "the team", lockup: Some("vested over 24 months") },
    ],
    nft: NftFacts {
        collection: "Degen Rug-Rats",
        total: 89,
        standard: 69,
        special: 20,
        mint_price: "0.1 SOL",
        mint_status: "LIVE NOW",
        marketplaces: &["Tensor", "Magic Eden", "LaunchMyNFT"],
        benefits: &["Exclusive Discord access", "Future airdrops", "Staking rewards", "Governance rights"],
    },
    community: CommunityFacts {
        discord_url: "https://discord.gg/TnHKnJKP5w",
        twitter_url: "https://x.com/MoandChi",
        discord_members: 18,
        twitter_followers: 42,
        events: &[
            CommunityEvent {
                name: "First RugPull",
                date: "April 25-26, 2025",
                description: "Community RugPull event to learn the art of the pull",
            },
            CommunityEvent {
                name: "Sewer Raid",
                date: "May 10, 2025",
                description: "Coordinated buying event to pump the token",
            },
        ],
    },
    roadmap: RoadmapFacts {
        completed: &["Token launch", "Website launch"],
        current: &["NFT minting - 69 standard and 20 special editions"],
        upcoming: &[
            "Staking platform",
            "NFT marketplace",
            "AI trading tools",
            "Strategic partnerships",
            "Metaverse integration",
            "DEX launch",
        ],
    },
    tooling: ToolingFacts {
        ai_tools: &["AI chart reader", "Wallet-flow tracker", "Rug-risk scanner"],
        sniper_bot_features: &["new-pair sniping on Solana DEXs", "anti-rug liquidity checks", "auto take-profit"],
        holder_requirement: "Hold at least 1,000,000 $DEGEN to unlock the premium tier",
    },
};

/// One-paragraph project pitch used by the default reply
pub fn project_summary() -> String {
    let kb = &KNOWLEDGE;
    format!(
        "The {} project combines a Solana token with an NFT collection, creating a community of crypto enthusiasts. \
         Our token {} is on Solana with a total supply of {}. We're currently minting our NFT collection with {} standard and {} special editions.",
        kb.nft.collection,
        kb.token.name,
        kb.token.total_supply,
        kb.nft.standard,
        kb.nft.special
    )
}

/// Tokenomics split rendered as prose, e.g. "40% for liquidity (locked for 6 months), ..."
pub fn tokenomics_breakdown() -> String {
    KNOWLEDGE
        .tokenomics
        .iter()
        .map(|a| match a.lockup {
            Some(lockup) => format!("{}% for {} ({})", a.share_percent, a.purpose, lockup),
            None => format!("{}% for {}", a.share_percent, a.purpose),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenomics_sums_to_hundred() {
        let total: u32 = KNOWLEDGE.tokenomics.iter().map(|a| a.share_percent as u32).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_nft_editions_add_up() {
        let nft = &KNOWLEDGE.nft;
        assert_eq!(nft.standard + nft.special, nft.total);
    }

    #[test]
    fn test_tokenomics_breakdown_mentions_lockups() {
        let text = tokenomics_breakdown();
        assert!(text.starts_with("40% for liquidity (locked for 6 months)"));
        assert!(text.contains("15% for community rewards and airdrops,"));
    }

    #[test]
    fn test_buy_links_use_contract() {
        let token = &KNOWLEDGE.token;
        assert!(token.jupiter_url.ends_with(token.contract));
        assert!(token.pumpfun_url.ends_with(token.contract));
    }
}
