use crate::knowledge::KNOWLEDGE;
use crate::logging;
use crate::metrics::format_currency;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Trades kept in the feed, newest first
pub const FEED_CAPACITY: usize = 10;

pub const MARKET_ADDRESS: &str = "chmhysfnnxeomt7sdlkabf5hqttvmtze8k4bohs2ph2y";

const SYMBOL: &str = "DEGEN";
const PRICE_FLOOR: f64 = 0.00003;
const PRICE_SPREAD: f64 = 0.000005;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub token_symbol: String,
    pub token_address: String,
    pub price: f64,
    pub price_usd: f64,
    pub market_address: String,
}

impl Trade {
    fn at(id: String, timestamp: DateTime<Utc>, price: f64) -> Self {
        Self {
            id,
            timestamp,
            token_symbol: SYMBOL.to_string(),
            token_address: KNOWLEDGE.token.contract.to_string(),
            price,
            price_usd: price,
            market_address: MARKET_ADDRESS.to_string(),
        }
    }
}

/// Synthetic trade at `now` with a price in [0.00003, 0.000035)
pub fn synthesize_trade<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Trade {
    let price = PRICE_FLOOR + rng.random::<f64>() * PRICE_SPREAD;
    Trade::at(format!("trade-{}", now.timestamp_millis()), now, price)
}

/// Rolling list of recent trades shared between the timer task and readers
pub struct TradeFeed {
    trades: Mutex<VecDeque<Trade>>,
}

impl TradeFeed {
    /// Feed pre-loaded with three trades from 2, 5 and 10 minutes before `now`
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let seed = [(1, 2, 0.000032), (2, 5, 0.000033), (3, 10, 0.000034)]
            .into_iter()
            .map(|(n, minutes, price)| {
                Trade::at(format!("trade-{}", n), now - ChronoDuration::minutes(minutes), price)
            })
            .collect();
        Self { trades: Mutex::new(seed) }
    }

    pub fn push(&self, trade: Trade) {
        let mut trades = self.trades.lock().unwrap_or_else(PoisonError::into_inner);
        trades.push_front(trade);
        trades.truncate(FEED_CAPACITY);
    }

    pub fn recent(&self) -> Vec<Trade> {
        let trades = self.trades.lock().unwrap_or_else(PoisonError::into_inner);
        trades.iter().cloned().collect()
    }
}

/// Append a synthetic trade every `min..=max` (re-rolled each time) until `cancel` fires
pub fn spawn_trade_feed(
    feed: Arc<TradeFeed>,
    min: Duration,
    max: Duration,
    seed: Option<u64>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        loop {
            let wait = if max > min { rng.random_range(min..=max) } else { min };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            let trade = synthesize_trade(&mut rng, Utc::now());
            logging::log_market(None, &format!("New trade {} at {}", trade.id, format_currency(trade.price_usd)));
            feed.push(trade);
        }
        logging::log_market(None, "Trade feed stopped");
    })
}

/// Relative age like "2 minutes ago"
pub fn format_time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - timestamp).num_seconds().max(0);
    let (value, unit) = match secs {
        0..=59 => return "less than a minute ago".to_string(),
        60..=3599 => (secs / 60, "minute"),
        3600..=86_399 => (secs / 3600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    if value == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", value, unit)
    }
}
