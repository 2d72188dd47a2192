//! Supported ticker registry

use super::news::NewsItem;

/// Provider identifiers for one ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinInfo {
    pub ticker: &'static str,
    pub coingecko_id: &'static str,
    pub binance_symbol: &'static str,
    pub synonyms: &'static [&'static str],
}

pub const COINS: &[CoinInfo] = &[
    CoinInfo { ticker: "BTC", coingecko_id: "bitcoin", binance_symbol: "BTCUSDT", synonyms: &["BTC", "Bitcoin"] },
    CoinInfo { ticker: "ETH", coingecko_id: "ethereum", binance_symbol: "ETHUSDT", synonyms: &["ETH", "Ethereum"] },
    CoinInfo { ticker: "SOL", coingecko_id: "solana", binance_symbol: "SOLUSDT", synonyms: &["SOL", "Solana"] },
    CoinInfo { ticker: "ADA", coingecko_id: "cardano", binance_symbol: "ADAUSDT", synonyms: &["ADA", "Cardano"] },
    CoinInfo { ticker: "XRP", coingecko_id: "ripple", binance_symbol: "XRPUSDT", synonyms: &["XRP", "Ripple"] },
    CoinInfo { ticker: "BNB", coingecko_id: "binancecoin", binance_symbol: "BNBUSDT", synonyms: &["BNB", "Binance"] },
    CoinInfo { ticker: "DOGE", coingecko_id: "dogecoin", binance_symbol: "DOGEUSDT", synonyms: &["DOGE", "Dogecoin"] },
    CoinInfo { ticker: "AVAX", coingecko_id: "avalanche-2", binance_symbol: "AVAXUSDT", synonyms: &["AVAX", "Avalanche"] },
    CoinInfo { ticker: "MATIC", coingecko_id: "matic-network", binance_symbol: "MATICUSDT", synonyms: &["MATIC", "Polygon"] },
    CoinInfo { ticker: "TRX", coingecko_id: "tron", binance_symbol: "TRXUSDT", synonyms: &["TRX", "Tron"] },
];

pub fn lookup(ticker: &str) -> Option<&'static CoinInfo> {
    COINS.iter().find(|c| c.ticker.eq_ignore_ascii_case(ticker))
}

/// Case-insensitive title match against the ticker's synonyms
pub fn is_news_about(item: &NewsItem, coin: &str) -> bool {
    let title = item.title.to_lowercase();
    match lookup(coin) {
        Some(info) => info
            .synonyms
            .iter()
            .any(|s| title.contains(&s.to_lowercase())),
        None => title.contains(&coin.to_lowercase()),
    }
}

/// `" btc, eth ,,sol"` -> `["BTC", "ETH", "SOL"]`
pub fn parse_coin_list(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(title: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            link: String::new(),
            pub_date: Utc::now(),
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup("avax").map(|c| c.coingecko_id), Some("avalanche-2"));
        assert!(lookup("PEPE").is_none());
    }

    #[test]
    fn test_news_matches_synonyms() {
        assert!(is_news_about(&item("Bitcoin ETF inflows hit record"), "BTC"));
        assert!(is_news_about(&item("Polygon upgrade ships"), "MATIC"));
        assert!(!is_news_about(&item("Ethereum gas fees drop"), "BTC"));
        assert!(is_news_about(&item("PEPE rallies"), "PEPE"));
    }

    #[test]
    fn test_parse_coin_list() {
        assert_eq!(parse_coin_list(" btc, eth ,,sol"), vec!["BTC", "ETH", "SOL"]);
        assert!(parse_coin_list(" , ").is_empty());
    }
}
