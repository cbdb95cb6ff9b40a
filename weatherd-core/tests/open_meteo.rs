//! Integration tests for OpenMeteoProvider using wiremock.
//!
//! These tests run the provider, and the service on top of it, against a mock HTTP server.

use std::{sync::Arc, time::Duration};

use weatherd_core::{
    Config, Coordinates, ErrorKind, FetchParams, Units, WeatherProvider, WeatherRequest,
    WeatherService, provider::open_meteo::OpenMeteoProvider,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer) -> OpenMeteoProvider {
    OpenMeteoProvider::builder()
        .api_endpoint(&format!("{}/v1", server.uri()))
        .geocoding_endpoint(&format!("{}/geo/v1", server.uri()))
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

fn geo_results() -> serde_json::Value {
    serde_json::json!({
        "results": [
            { "name": "Paris", "latitude": 33.66, "longitude": -95.55,
              "country": "United States", "country_code": "US" },
            { "name": "Paris", "latitude": 48.85341, "longitude": 2.3488,
              "country": "France", "country_code": "FR" }
        ]
    })
}

fn current_body() -> serde_json::Value {
    serde_json::json!({
        "latitude": 48.86, "longitude": 2.34, "timezone": "Europe/Paris",
        "utc_offset_seconds": 7200,
        "current": {
            "time": 1760608800, "temperature_2m": 14.2, "relative_humidity_2m": 81,
            "apparent_temperature": 12.9, "wind_speed_10m": 9.4, "wind_direction_10m": 225,
            "pressure_msl": 1018.4, "precipitation": 0.0, "cloud_cover": 20,
            "weather_code": 1, "is_day": 1
        }
    })
}

#[tokio::test]
async fn resolve_coordinates_filters_by_country() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/v1/search"))
        .and(query_param("name", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geo_results()))
        .mount(&server)
        .await;

    let provider = provider_for(&server);

    let fr = provider.resolve_coordinates("Paris", "fr").await.unwrap();
    let any = provider.resolve_coordinates("Paris", "").await.unwrap();
    let none = provider.resolve_coordinates("Paris", "DE").await.unwrap();

    assert_eq!(fr, Some(Coordinates::new(48.85341, 2.3488)));
    assert_eq!(any, Some(Coordinates::new(33.66, -95.55)));
    assert_eq!(none, None);
}

#[tokio::test]
async fn resolve_coordinates_without_results_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/v1/search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "generationtime_ms": 0.4 })),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let found = provider.resolve_coordinates("Atlantis", "").await.unwrap();

    assert_eq!(found, None);
}

#[tokio::test]
async fn search_city_returns_name_country_pairs() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/v1/search"))
        .and(query_param("count", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geo_results()))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let suggestions = provider.search_city("Paris", 1).await.unwrap();

    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].name, "Paris");
    assert_eq!(suggestions[0].country, "United States");
}

#[tokio::test]
async fn fetch_current_parses_and_derives_labels() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("timezone", "auto"))
        .and(query_param("timeformat", "unixtime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let record = provider
        .fetch_current(Coordinates::new(48.85, 2.35), &FetchParams::new("en", Units::Metric))
        .await
        .unwrap();

    assert_eq!(record.temperature, 14.2);
    assert_eq!(record.feels_like, 12.9);
    assert_eq!(record.humidity_pct, 81);
    assert_eq!(record.weather_code, 1);
    assert_eq!(record.condition, "Mainly clear");
    assert_eq!(record.icon_name, "partly-cloudy-day");
    assert_eq!(record.timezone, "Europe/Paris");
}

#[tokio::test]
async fn imperial_units_are_requested_from_provider() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("temperature_unit", "fahrenheit"))
        .and(query_param("wind_speed_unit", "mph"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let result = provider
        .fetch_current(Coordinates::new(48.85, 2.35), &FetchParams::new("en", Units::Imperial))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn fetch_forecast_fills_daily_series() {
    let server = MockServer::start().await;

    let mut body = current_body();
    body["daily"] = serde_json::json!({
        "time": [1760652000, 1760738400],
        "weather_code": [3, 61],
        "temperature_2m_max": [18.0, 15.5],
        "temperature_2m_min": [9.0, 8.0],
        "precipitation_sum": [0.0, 3.1],
        "sunrise": [1760679000, 1760765500],
        "sunset": [1760718000, 1760804300]
    });
    body["hourly"] = serde_json::json!({
        "time": [1760608800, 1760612400],
        "temperature_2m": [14.2, 14.8],
        "precipitation_probability": [10, 20],
        "weather_code": [1, 2]
    });

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("forecast_days", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let record = provider
        .fetch_forecast(Coordinates::new(48.85, 2.35), 2, &FetchParams::new("en", Units::Metric))
        .await
        .unwrap();

    assert_eq!(record.daily.len(), 2);
    assert_eq!(record.daily[1].weather_code, 61);
    assert_eq!(record.daily[1].precipitation_sum, 3.1);
    assert_eq!(record.hourly.len(), 2);
    assert_eq!(record.hourly[1].precipitation_probability, 20.0);
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({ "error": true, "reason": "Latitude must be in range" })),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider
        .fetch_current(Coordinates::new(48.85, 2.35), &FetchParams::new("en", Units::Metric))
        .await
        .unwrap_err();

    let msg = format!("{err:#}");
    assert!(msg.contains("400"));
    assert!(msg.contains("Latitude must be in range"));
}

#[tokio::test]
async fn service_end_to_end_caches_current_weather() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geo_results()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config {
        api_endpoint: format!("{}/v1", server.uri()),
        geocoding_endpoint: format!("{}/geo/v1", server.uri()),
        language: "en".to_string(),
        ..Config::default()
    };
    let service = Arc::new(WeatherService::from_config(&config).unwrap());
    let request = WeatherRequest::current("Paris", "FR");

    let first = service.process(&request).await;
    let second = service.process(&request).await;

    assert!(first.success);
    assert_eq!(first, second);
    let record = first.current.unwrap();
    assert_eq!(record.city, "Paris");
    assert_eq!(record.latitude, 48.85341);

    let stats = service.get_statistics();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.upstream_calls, 1);
    assert_eq!(stats.cache_hits, 1);
}

#[tokio::test]
async fn service_reports_provider_outage() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/v1/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let config = Config {
        api_endpoint: format!("{}/v1", server.uri()),
        geocoding_endpoint: format!("{}/geo/v1", server.uri()),
        ..Config::default()
    };
    let service = WeatherService::from_config(&config).unwrap();

    let resp = service.process(&WeatherRequest::search("Paris")).await;

    assert!(!resp.success);
    assert_eq!(resp.error_kind, Some(ErrorKind::Upstream));
    assert!(resp.error_message.contains("503"));
}
