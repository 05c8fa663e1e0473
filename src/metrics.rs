use crate::knowledge::KNOWLEDGE;
use crate::logging;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEXSCREENER_PAIR_URL: &str =
    "https://api.dexscreener.com/latest/dex/pairs/solana/chmhysfnnxeomt7sdlkabf5hqttvmtze8k4bohs2ph2y";

/// Point-in-time token statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetrics {
    pub price: f64,
    pub price_change_24h: f64, // percent
    pub volume_24h: f64,
    pub liquidity: f64,
    pub market_cap: f64,
    pub holders: u64,
}

impl TokenMetrics {
    /// Served whenever the live endpoint can't be reached or parsed
    pub fn fallback() -> Self {
        Self {
            price: 0.00000123,
            price_change_24h: 5.2,
            volume_24h: 15000.0,
            liquidity: 25000.0,
            market_cap: 38000.0,
            holders: KNOWLEDGE.token.holders,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.price, self.price_change_24h, self.volume_24h, self.liquidity, self.market_cap]
            .iter()
            .all(|v| v.is_finite())
            && self.price >= 0.0
    }
}

// ============ DexScreener Response ============

#[derive(Debug, Deserialize)]
struct PairsResponse {
    pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pair {
    price_usd: Option<String>,
    price_change: Option<Window>,
    volume: Option<Window>,
    liquidity: Option<Liquidity>,
    fdv: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Window {
    h24: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Liquidity {
    usd: Option<f64>,
}

/// Map a DexScreener pair payload onto `TokenMetrics`. Missing numbers read as 0.
pub fn parse_dexscreener(body: &str) -> Result<TokenMetrics, Box<dyn Error + Send + Sync>> {
    let response: PairsResponse = serde_json::from_str(body)?;
    let pair = response
        .pairs
        .and_then(|pairs| pairs.into_iter().next())
        .ok_or("No pair data found")?;

    let price = pair
        .price_usd
        .as_deref()
        .map(|p| p.parse::<f64>())
        .transpose()?
        .unwrap_or(0.0);

    Ok(TokenMetrics {
        price,
        price_change_24h: pair.price_change.and_then(|w| w.h24).unwrap_or(0.0),
        volume_24h: pair.volume.and_then(|w| w.h24).unwrap_or(0.0),
        liquidity: pair.liquidity.and_then(|l| l.usd).unwrap_or(0.0),
        market_cap: pair.fdv.unwrap_or(0.0),
        holders: KNOWLEDGE.token.holders,
    })
}

// ============ Client ============

pub struct MetricsClient {
    client: Client,
    endpoint: String,
}

impl MetricsClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// One pull from the market-data endpoint. Errors on cancel, HTTP failure or bad payload.
    pub async fn fetch_metrics(
        &self,
        cancel: &CancellationToken,
    ) -> Result<TokenMetrics, Box<dyn Error + Send + Sync>> {
        let request = async {
            let response = self.client.get(&self.endpoint).send().await?;

            if !response.status().is_success() {
                let status = response.status();
                return Err(format!("Failed to fetch token data: {}", status).into());
            }

            let body = response.text().await?;
            parse_dexscreener(&body)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err("Token data fetch cancelled".into()),
            result = request => result,
        }
    }

    /// Like `fetch_metrics` but never fails: any error degrades to `TokenMetrics::fallback()`
    pub async fn get_token_metrics(&self, cancel: &CancellationToken) -> TokenMetrics {
        match self.fetch_metrics(cancel).await {
            Ok(metrics) if metrics.is_valid() => metrics,
            Ok(_) => {
                logging::log_error(None, "Token data had invalid numbers, using fallback");
                TokenMetrics::fallback()
            }
            Err(e) => {
                logging::log_error(None, &format!("Error fetching token data: {}", e));
                TokenMetrics::fallback()
            }
        }
    }
}

/// Poll the endpoint every `interval` until `cancel` fires. The receiver starts at the fallback.
pub fn spawn_metrics_poller(
    client: MetricsClient,
    interval: Duration,
    cancel: CancellationToken,
) -> (watch::Receiver<TokenMetrics>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(TokenMetrics::fallback());

    let handle = tokio::spawn(async move {
        loop {
            let metrics = client.get_token_metrics(&cancel).await;
            if cancel.is_cancelled() {
                break;
            }
            logging::log_market(None, &format!(
                "Metrics refreshed: price={} change={}",
                format_currency(metrics.price),
                format_percent(metrics.price_change_24h)
            ));
            if tx.send(metrics).is_err() {
                // Every receiver is gone
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        logging::log_market(None, "Metrics poller stopped");
    });

    (rx, handle)
}

// ============ Formatting ============

/// USD with the site's precision rules: sub-cent values keep 4-6 decimals, others 2 with separators
pub fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();

    if abs < 0.01 {
        let mut digits = format!("{:.6}", abs);
        // Trim trailing zeros but keep at least 4 decimals
        while digits.ends_with('0') && digits.len() > "0.0000".len() {
            digits.pop();
        }
        return format!("{}${}", sign, digits);
    }

    let fixed = format!("{:.2}", abs);
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    format!("{}${}.{}", sign, group_thousands(whole), fraction)
}

/// Percentage with an explicit sign, e.g. "+5.20%" or "-8.00%"
pub fn format_percent(value: f64) -> String {
    format!("{:+.2}%", value)
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency_sub_cent() {
        assert_eq!(format_currency(0.00000123), "$0.000001");
        assert_eq!(format_currency(0.000042), "$0.000042");
        assert_eq!(format_currency(0.0012), "$0.0012");
        assert_eq!(format_currency(0.00315), "$0.00315");
    }

    #[test]
    fn test_format_currency_regular() {
        assert_eq!(format_currency(38000.0), "$38,000.00");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(0.5), "$0.50");
        assert_eq!(format_currency(-25000.0), "-$25,000.00");
    }

    #[test]
    fn test_format_percent_has_explicit_sign() {
        assert_eq!(format_percent(5.2), "+5.20%");
        assert_eq!(format_percent(-8.0), "-8.00%");
        assert_eq!(format_percent(0.0), "+0.00%");
    }

    #[test]
    fn test_parse_dexscreener_pair() {
        let body = r#"{
            "schemaVersion": "1.0.0",
            "pairs": [{
                "pairAddress": "chmhysfnnxeomt7sdlkabf5hqttvmtze8k4bohs2ph2y",
                "priceUsd": "0.00004210",
                "priceChange": {"m5": 0.1, "h24": -8.5},
                "volume": {"h24": 12500.5},
                "liquidity": {"usd": 25000, "base": 1, "quote": 2},
                "fdv": 42000
            }]
        }"#;

        let metrics = parse_dexscreener(body).unwrap();
        assert_eq!(metrics.price, 0.0000421);
        assert_eq!(metrics.price_change_24h, -8.5);
        assert_eq!(metrics.volume_24h, 12500.5);
        assert_eq!(metrics.liquidity, 25000.0);
        assert_eq!(metrics.market_cap, 42000.0);
        assert_eq!(metrics.holders, KNOWLEDGE.token.holders);
    }

    #[test]
    fn test_parse_dexscreener_missing_fields_read_as_zero() {
        let metrics = parse_dexscreener(r#"{"pairs": [{}]}"#).unwrap();
        assert_eq!(metrics.price, 0.0);
        assert_eq!(metrics.market_cap, 0.0);
    }

    #[test]
    fn test_parse_dexscreener_errors() {
        assert!(parse_dexscreener(r#"{"pairs": []}"#).is_err());
        assert!(parse_dexscreener(r#"{"pairs": null}"#).is_err());
        assert!(parse_dexscreener(r#"{"pairs": [{"priceUsd": "lots"}]}"#).is_err());
        assert!(parse_dexscreener("<html>").is_err());
    }

    #[test]
    fn test_fallback_is_valid() {
        assert!(TokenMetrics::fallback().is_valid());
        let broken = TokenMetrics { price: f64::NAN, ..TokenMetrics::fallback() };
        assert!(!broken.is_valid());
    }

    #[tokio::test]
    async fn test_cancelled_fetch_degrades_to_fallback() {
        // Unroutable endpoint; the token is already cancelled so no request completes
        let client = MetricsClient::new("http://127.0.0.1:9/pairs", Duration::from_millis(200)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(client.fetch_metrics(&cancel).await.is_err());
        assert_eq!(client.get_token_metrics(&cancel).await, TokenMetrics::fallback());
    }
}
