//! CoinGecko client tests against a local mock server

use std::time::Duration;

use cryptopanel::provider::{AssetId, CoinGeckoClient, MarketDataProvider, ProviderError};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> CoinGeckoClient {
    CoinGeckoClient::new(server.uri(), "brl", Duration::from_secs(2))
}

fn ids(raw: &[&str]) -> Vec<AssetId> {
    raw.iter().map(|id| AssetId::from(*id)).collect()
}

#[tokio::test]
async fn test_fetch_snapshots_maps_market_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/coins/markets"))
        .and(query_param("vs_currency", "brl"))
        .and(query_param("ids", "bitcoin,ethereum"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "bitcoin",
                "symbol": "btc",
                "name": "Bitcoin",
                "current_price": 350000.0,
                "price_change_percentage_24h": 2.5,
                "high_24h": 355000.0,
                "low_24h": 340000.0,
                "total_volume": 1.5e10
            },
            {
                "id": "ethereum",
                "symbol": "eth",
                "name": "Ethereum",
                "current_price": 18000.0,
                "price_change_percentage_24h": null,
                "high_24h": 18500.0,
                "low_24h": 17500.0,
                "total_volume": 8.0e9
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let snapshots = client(&server)
        .fetch_snapshots(&ids(&["bitcoin", "ethereum"]))
        .await
        .unwrap();

    assert_eq!(snapshots.len(), 2);
    let btc = snapshots[&AssetId::from("bitcoin")];
    assert_eq!(btc.current_price, 350000.0);
    assert_eq!(btc.change_24h_pct, 2.5);
    assert_eq!(btc.volume_24h, 1.5e10);
    assert_eq!(snapshots[&AssetId::from("ethereum")].change_24h_pct, 0.0);
}

#[tokio::test]
async fn test_fetch_ohlc_parses_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/coins/cardano/ohlc"))
        .and(query_param("days", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            [1_700_000_000_000_i64, 2.0, 2.2, 1.9, 2.1],
            [1_700_014_400_000_i64, 2.1, 2.3, 2.0, 2.25]
        ])))
        .mount(&server)
        .await;

    let series = client(&server)
        .fetch_ohlc(&AssetId::from("cardano"), 30)
        .await
        .unwrap();

    assert_eq!(series.len(), 2);
    let last = series.last().unwrap();
    assert_eq!(last.timestamp_ms, 1_700_014_400_000);
    assert_eq!(last.close, 2.25);
}

#[tokio::test]
async fn test_fetch_top_assets_keeps_ranking_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/coins/markets"))
        .and(query_param("per_page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "current_price": 1.0, "market_cap_rank": 1},
            {"id": "ethereum", "symbol": "eth", "name": "Ethereum", "current_price": 1.0, "market_cap_rank": 2},
            {"id": "tether", "symbol": "usdt", "name": "Tether", "current_price": 1.0, "market_cap_rank": 3}
        ])))
        .mount(&server)
        .await;

    let listings = client(&server).fetch_top_assets(3).await.unwrap();
    let names: Vec<&str> = listings.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, ["Bitcoin", "Ethereum", "Tether"]);
    assert_eq!(listings[2].market_cap_rank, Some(3));
}

#[tokio::test]
async fn test_fetch_spot_prices_skips_missing_quotes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/simple/price"))
        .and(query_param("vs_currencies", "brl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitcoin": {"brl": 350000.0},
            "solana": {}
        })))
        .mount(&server)
        .await;

    let prices = client(&server)
        .fetch_spot_prices(&ids(&["bitcoin", "solana"]))
        .await
        .unwrap();

    assert_eq!(prices.len(), 1);
    assert_eq!(prices[&AssetId::from("bitcoin")], 350000.0);
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_ohlc(&AssetId::from("bitcoin"), 7)
        .await
        .unwrap_err();

    match err {
        ProviderError::Status(code, body) => {
            assert_eq!(code, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_payloads_are_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/coins/markets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/coins/bitcoin/ohlc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(matches!(
        client.fetch_snapshots(&ids(&["bitcoin"])).await,
        Err(ProviderError::Empty)
    ));
    assert!(matches!(
        client.fetch_ohlc(&AssetId::from("bitcoin"), 30).await,
        Err(ProviderError::Empty)
    ));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = client(&server).fetch_snapshots(&ids(&["bitcoin"])).await;
    assert!(matches!(result, Err(ProviderError::Decode(_))));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = CoinGeckoClient::new(server.uri(), "brl", Duration::from_millis(200));
    let result = client.fetch_snapshots(&ids(&["bitcoin"])).await;
    assert!(matches!(result, Err(ProviderError::Timeout(_))));
}

#[tokio::test]
async fn test_uppercase_currency_matches_lowercase_quotes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/simple/price"))
        .and(query_param("vs_currencies", "brl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitcoin": {"brl": 350000.0}
        })))
        .mount(&server)
        .await;

    let client = CoinGeckoClient::new(server.uri(), "BRL", Duration::from_secs(2));
    assert_eq!(client.vs_currency(), "brl");

    let prices = client.fetch_spot_prices(&ids(&["bitcoin"])).await.unwrap();
    assert_eq!(prices[&AssetId::from("bitcoin")], 350000.0);
}
