use crate::knowledge::KNOWLEDGE;
use crate::logging;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

const MAGIC_EDEN_URL: &str = "https://magiceden.us/marketplace/DyzxDC6MerqLajQQqq3fMnMhLv6MQe8JFQ1gZL8TvRTP";
const TENSOR_URL: &str = "https://www.tensor.trade/trade/92078f42-23da-43e4-9fc6-74e9abb2c821";
const LAUNCHMYNFT_URL: &str = "https://launchmynft.io/sol/15827";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftListing {
    pub id: String,
    pub name: String,
    pub image: String,
    pub price: f64, // SOL
    pub collection: String,
    pub marketplace: String,
    pub marketplace_url: String,
    pub floor_price: f64,
    pub is_one_of_one: bool,
}

// (id, name, image, price, marketplace, url)
const LISTINGS: &[(&str, &str, &str, f64, &str, &str)] = &[
    ("1", "Degen Rug-Rat #42", "/images/crypto-rat-crew.png", 0.42, "Magic Eden", MAGIC_EDEN_URL),
    ("2", "Degen Rug-Rat #69", "/images/street-rats-squad.png", 0.69, "Tensor", TENSOR_URL),
    ("3", "Degen Rug-Rat #007", "/images/neon-rat-gang.png", 0.42, "LaunchMyNFT", LAUNCHMYNFT_URL),
    ("4", "Degen Rug-Rat #13", "/images/bitcoin-rats.png", 0.42, "Magic Eden", MAGIC_EDEN_URL),
    ("5", "Degen Rug-Rat #420", "/images/crypto-winter-rats.png", 0.42, "Tensor", TENSOR_URL),
    ("6", "Degen Rug-Rat #777", "/images/crypto-rat-boss.png", 0.42, "LaunchMyNFT", LAUNCHMYNFT_URL),
];

const FLOOR_PRICE: f64 = 0.42;

fn with_image_fallback(image: &str) -> String {
    if image.trim().is_empty() {
        PLACEHOLDER_IMAGE.to_string()
    } else {
        image.to_string()
    }
}

fn build_listings() -> Vec<NftListing> {
    LISTINGS
        .iter()
        .map(|(id, name, image, price, marketplace, url)| NftListing {
            id: id.to_string(),
            name: name.to_string(),
            image: with_image_fallback(image),
            price: *price,
            collection: KNOWLEDGE.nft.collection.to_string(),
            marketplace: marketplace.to_string(),
            marketplace_url: url.to_string(),
            floor_price: FLOOR_PRICE,
            is_one_of_one: true,
        })
        .collect()
}

/// Current listings, in display order. A cancelled call yields an empty list.
pub async fn get_nfts(cancel: &CancellationToken) -> Vec<NftListing> {
    if cancel.is_cancelled() {
        logging::log_market(None, "NFT fetch cancelled");
        return Vec::new();
    }
    // Yield once so callers see a real suspension point, as they would with a remote source
    tokio::task::yield_now().await;
    if cancel.is_cancelled() {
        logging::log_market(None, "NFT fetch cancelled");
        return Vec::new();
    }

    let listings = build_listings();
    logging::log_market(None, &format!("Loaded {} NFT listings", listings.len()));
    listings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_six_listings_in_order() {
        let nfts = get_nfts(&CancellationToken::new()).await;

        assert_eq!(nfts.len(), 6);
        let names: Vec<&str> = nfts.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names[0], "Degen Rug-Rat #42");
        assert_eq!(names[5], "Degen Rug-Rat #777");
        assert!(nfts.iter().all(|n| n.is_one_of_one && !n.image.is_empty()));
        assert!(nfts.iter().all(|n| n.collection == "Degen Rug-Rats"));
    }

    #[tokio::test]
    async fn test_cancelled_fetch_is_empty() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(get_nfts(&cancel).await.is_empty());
    }

    #[test]
    fn test_empty_image_uses_placeholder() {
        assert_eq!(with_image_fallback(""), PLACEHOLDER_IMAGE);
        assert_eq!(with_image_fallback("  "), PLACEHOLDER_IMAGE);
        assert_eq!(with_image_fallback("/images/a.png"), "/images/a.png");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_string(&build_listings()[1]).unwrap();
        assert!(json.contains("\"marketplaceUrl\""));
        assert!(json.contains("\"isOneOfOne\":true"));
    }
}
