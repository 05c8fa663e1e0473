// SewerKing persona tables - the flavor text layered on top of knowledge-base facts

use rand::Rng;

pub const PERSONA_NAME: &str = "SewerKing";

pub const SEED_MESSAGE: &str = "Yo, what's up rat gang! SewerKing here, your guide to all things Degen Rug-Rats. Wanna know about our token, NFT collection, or how to join the community? Just ask and I'll hook you up with that sweet alpha!";

/// Reply used when composing fails for any reason
pub const APOLOGY_MESSAGE: &str = "Yo, the sewers are flooded right now! Try again in a bit, rat fam!";

/// Logged when a pending reply is superseded or its view goes away
pub const CANCELLED_MESSAGE: &str = "Request cancelled. Try again, ya filthy rat!";

pub const CATCHPHRASES: &[&str] = &[
    "Down in the sewers, we know what's up!",
    "That's some juicy alpha, rat!",
    "Let's get this cheese!",
    "Rats always find the best opportunities!",
    "In the crypto sewers, we thrive!",
    "Squeak squeak, number go up! 🐀",
    "Stay filthy, stay rich! 🧀",
];

pub const JOKES: &[&str] = &[
    "Why did the rat buy $DEGEN? Because it couldn't resist a project that's already down in the sewer - nowhere to go but up!",
    "What's a rat's favorite trading strategy? Buy the dip, then hide in the dip until it pumps.",
    "How many paper-handed rats does it take to change a lightbulb? None, they sold the lightbulb at the bottom.",
    "Why don't rats ever get rugged? We ARE the rug. Well, we live under it. Same thing.",
    "My portfolio and the sewer have one thing in common: both smell like opportunity if you squint hard enough.",
    "What did the rat say to the whale? Nice bags. Mind if I nibble?",
];

pub const INSULTS: &[&str] = &[
    "Whoa there, sewer-mouth! Talk like that and you'll be cleaning the drains with your tongue.",
    "Big words from someone who probably paper-handed at the bottom. The sewer remembers.",
    "You kiss your mama with that mouth? Even the sewer rats got more class than that.",
    "Hating on rats is a bear market mindset. We'll see who's laughing at the next ATH.",
];

pub const COMPLIMENTS: &[&str] = &[
    "Appreciate you, rat fam! You've got the cleanest whiskers in the whole sewer.",
    "That's what I'm talking about! You're a true degen with diamond paws. 💎",
    "Respect! The sewer's a better place with rats like you in it.",
    "Thanks, legend. Now go tell your friends the SewerKing hooked you up.",
];

pub const GREETINGS: &[&str] = &[
    "Yo, what's good rat gang!",
    "Ayy, a fresh rat in the sewers!",
    "Sup, degen! Welcome to the underground.",
    "Well well well, look who crawled out of the drain!",
];

pub const FAREWELLS: &[&str] = &[
    "Later, rat! Keep your bags heavy and your paws diamond. 💎",
    "Catch you in the sewers, degen! Don't let the cats get you.",
    "Peace out, rat fam! Come back when you're ready for more alpha.",
];

pub const BULLISH_LINES: &[&str] = &[
    "The sewer's PUMPING today, rats are feasting! 🚀",
    "Green candles everywhere, the cheese is flowing!",
    "We're mooning, rat fam! The bears are hiding in the drains.",
];

pub const BEARISH_LINES: &[&str] = &[
    "Market's a little wet today, perfect time to scoop cheap cheese.",
    "Red candles? Rats don't panic, rats accumulate.",
    "Bears in the sewer today, but we've survived worse floods.",
];

pub const NEUTRAL_LINES: &[&str] = &[
    "Market's chilling in the sewer today, calm before the pump.",
    "Sideways action - the rats are loading up quietly.",
    "Steady as a rat in its burrow today.",
];

/// A change beyond this many percent in 24h flips the sentiment pool
pub const MARKET_SWING_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlavorCategory {
    Catchphrase,
    Joke,
    Insult,
    Compliment,
    Greeting,
    Farewell,
    Bullish,
    Bearish,
    Neutral,
}

impl FlavorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlavorCategory::Catchphrase => "catchphrase",
            FlavorCategory::Joke => "joke",
            FlavorCategory::Insult => "insult",
            FlavorCategory::Compliment => "compliment",
            FlavorCategory::Greeting => "greeting",
            FlavorCategory::Farewell => "farewell",
            FlavorCategory::Bullish => "bullish",
            FlavorCategory::Bearish => "bearish",
            FlavorCategory::Neutral => "neutral",
        }
    }
}

/// Get the flavor pool for a category
pub fn get_flavor_pool(category: FlavorCategory) -> &'static [&'static str] {
    match category {
        FlavorCategory::Catchphrase => CATCHPHRASES,
        FlavorCategory::Joke => JOKES,
        FlavorCategory::Insult => INSULTS,
        FlavorCategory::Compliment => COMPLIMENTS,
        FlavorCategory::Greeting => GREETINGS,
        FlavorCategory::Farewell => FAREWELLS,
        FlavorCategory::Bullish => BULLISH_LINES,
        FlavorCategory::Bearish => BEARISH_LINES,
        FlavorCategory::Neutral => NEUTRAL_LINES,
    }
}

/// Pick the market-sentiment pool from the 24h price change (percent)
pub fn market_sentiment_category(price_change_24h: f64) -> FlavorCategory {
    if price_change_24h > MARKET_SWING_THRESHOLD {
        FlavorCategory::Bullish
    } else if price_change_24h < -MARKET_SWING_THRESHOLD {
        FlavorCategory::Bearish
    } else {
        FlavorCategory::Neutral
    }
}

/// Uniform index into a pool of `len` entries, skipping `previous` when there is a choice.
/// Returns `None` for an empty pool.
pub fn pick_index_avoiding<R: Rng + ?Sized>(rng: &mut R, len: usize, previous: Option<usize>) -> Option<usize> {
    match (len, previous) {
        (0, _) => None,
        (1, _) => Some(0),
        (_, Some(prev)) if prev < len => {
            // Draw from len-1 slots and shift past the excluded one
            let idx = rng.random_range(0..len - 1);
            Some(if idx >= prev { idx + 1 } else { idx })
        }
        _ => Some(rng.random_range(0..len)),
    }
}

/// Uniform pick from a category's pool
pub fn pick_line<R: Rng + ?Sized>(rng: &mut R, category: FlavorCategory) -> Option<&'static str> {
    let pool = get_flavor_pool(category);
    pick_index_avoiding(rng, pool.len(), None).map(|idx| pool[idx])
}
