use httpmock::prelude::*;
use std::time::Duration;
use tempfile::TempDir;
use weather_etl::core::handoff;
use weather_etl::core::TableRef;
use weather_etl::domain::ports::Pipeline;
use weather_etl::{
    EtlEngine, EtlError, LocalStorage, MemoryWarehouse, OpenWeatherClient, PipelineSettings,
    WeatherPipeline,
};

const WEATHER_PATH: &str = "/data/2.5/weather";

fn table() -> TableRef {
    TableRef::new("weather_db", "pipeline", "daily_weather")
}

fn build_pipeline(
    server: &MockServer,
    cities: &[&str],
    warehouse: MemoryWarehouse,
) -> WeatherPipeline<OpenWeatherClient, MemoryWarehouse> {
    let client = OpenWeatherClient::new(
        &server.url(WEATHER_PATH),
        "integration-key",
        Duration::from_millis(500),
    )
    .unwrap();
    let settings = PipelineSettings {
        cities: cities.iter().map(|c| c.to_string()).collect(),
        concurrent_requests: 5,
        table: table(),
    };
    WeatherPipeline::new(client, warehouse, settings)
}

#[tokio::test]
async fn test_end_to_end_one_source_times_out() {
    let server = MockServer::start();
    let city_a = server.mock(|when, then| {
        when.method(GET)
            .path(WEATHER_PATH)
            .query_param("q", "CityA")
            .query_param("appid", "integration-key");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "name": "CityA",
                "main": {"temp": 300.00, "humidity": 55},
                "weather": [{"description": "clear sky"}]
            }));
    });
    server.mock(|when, then| {
        when.method(GET).path(WEATHER_PATH).query_param("q", "CityB");
        then.status(200)
            .delay(Duration::from_secs(3))
            .json_body(serde_json::json!({"name": "CityB"}));
    });

    let warehouse = MemoryWarehouse::new().with_table(&table());
    let engine = EtlEngine::new(build_pipeline(&server, &["CityA", "CityB"], warehouse.clone()));

    let summary = engine.run().await.unwrap();

    city_a.assert();
    assert_eq!(summary.records_extracted, 1);
    assert_eq!(summary.rows_transformed, 1);
    assert_eq!(summary.rows_written, 1);

    let rows = warehouse.rows(&table());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].city, "CityA");
    assert_eq!(rows[0].temperature_c, 26.85);
    assert_eq!(rows[0].humidity_percent, Some(55));
    assert_eq!(rows[0].description, "clear sky");
    assert_eq!(warehouse.connections_opened(), 1);
    assert_eq!(warehouse.connections_closed(), 1);
}

#[tokio::test]
async fn test_all_sources_fail_aborts_with_no_data() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(WEATHER_PATH);
        then.status(500);
    });

    let warehouse = MemoryWarehouse::new().with_table(&table());
    let engine = EtlEngine::new(build_pipeline(&server, &["Chennai", "Mumbai"], warehouse.clone()));

    let result = engine.run().await;

    assert!(matches!(result, Err(EtlError::NoDataExtracted { attempted: 2 })));
    assert!(warehouse.rows(&table()).is_empty());
    assert_eq!(warehouse.connections_opened(), 0);
}

#[tokio::test]
async fn test_all_records_missing_temperature_aborts_with_empty_batch() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(WEATHER_PATH);
        then.status(200).json_body(serde_json::json!({
            "name": "Delhi",
            "main": {"humidity": 30},
            "weather": [{"description": "haze"}]
        }));
    });

    let warehouse = MemoryWarehouse::new().with_table(&table());
    let pipeline = build_pipeline(&server, &["Delhi", "Bangalore"], warehouse.clone());
    let engine = EtlEngine::new(pipeline);

    let result = engine.run().await;

    assert!(matches!(result, Err(EtlError::EmptyBatch { dropped: 2 })));
    assert!(warehouse.rows(&table()).is_empty());
    assert_eq!(warehouse.connections_opened(), 0);
}

#[tokio::test]
async fn test_write_failure_is_surfaced_and_connection_released() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(WEATHER_PATH);
        then.status(200).json_body(serde_json::json!({
            "name": "Mumbai",
            "main": {"temp": 302.15, "humidity": 80},
            "weather": [{"description": "light rain"}]
        }));
    });

    let warehouse = MemoryWarehouse::new().with_table(&table()).failing_writes();
    let engine = EtlEngine::new(build_pipeline(&server, &["Mumbai"], warehouse.clone()));

    let result = engine.run().await;

    assert!(matches!(result, Err(EtlError::LoadWriteError { .. })));
    assert!(warehouse.rows(&table()).is_empty());
    assert_eq!(warehouse.connections_opened(), 1);
    assert_eq!(warehouse.connections_closed(), 1);
}

#[tokio::test]
async fn test_repeated_runs_append_without_dedup() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(WEATHER_PATH);
        then.status(200).json_body(serde_json::json!({
            "name": "Tiruchirappalli",
            "main": {"temp": 306.0},
            "weather": [{"description": "sunny"}]
        }));
    });

    let warehouse = MemoryWarehouse::new().with_table(&table());
    let engine = EtlEngine::new(build_pipeline(&server, &["Tiruchirappalli"], warehouse.clone()));

    engine.run().await.unwrap();
    engine.run().await.unwrap();

    let rows = warehouse.rows(&table());
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.city == "Tiruchirappalli" && r.humidity_percent.is_none()));
    assert_eq!(warehouse.connections_opened(), 2);
    assert_eq!(warehouse.connections_closed(), 2);
}

#[tokio::test]
async fn test_stages_hand_off_through_files() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().to_string());

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(WEATHER_PATH).query_param("q", "Chennai");
        then.status(200).json_body(serde_json::json!({
            "name": "Chennai",
            "main": {"temp": 305.15, "humidity": 70},
            "weather": [{"description": "overcast clouds"}]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path(WEATHER_PATH).query_param("q", "Mumbai");
        then.status(200).json_body(serde_json::json!({
            "name": "Mumbai",
            "weather": []
        }));
    });

    let warehouse = MemoryWarehouse::new().with_table(&table());
    let pipeline = build_pipeline(&server, &["Chennai", "Mumbai"], warehouse.clone());

    let raw = pipeline.extract().await?;
    handoff::write_raw(&storage, "raw/weather.json", &raw).await?;

    let raw = handoff::read_raw(&storage, "raw/weather.json").await?;
    assert_eq!(raw.len(), 2);
    let batch = pipeline.transform(raw).await?;
    handoff::write_batch(&storage, "clean/batch.json", &batch).await?;

    let reloaded = handoff::read_batch(&storage, "clean/batch.json").await?;
    assert_eq!(reloaded, batch);
    let report = pipeline.load(reloaded).await?;

    assert_eq!(report.rows_written, 1);
    let rows = warehouse.rows(&table());
    assert_eq!(rows[0].city, "Chennai");
    assert_eq!(rows[0].temperature_c, 32.0);
    assert_eq!(rows[0].timestamp_utc, batch.stamped_at.naive_utc());
    Ok(())
}

#[tokio::test]
async fn test_loading_empty_batch_file_is_noop() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().to_string());
    let empty = serde_json::json!({
        "format_version": 1,
        "columns": ["City", "Temperature_C", "Humidity_Percent", "Description", "Timestamp_UTC"],
        "stamped_at": "2025-01-01T00:00:00Z",
        "rows": []
    });
    tokio::fs::write(temp_dir.path().join("empty.json"), serde_json::to_vec(&empty)?).await?;

    let server = MockServer::start();
    let warehouse = MemoryWarehouse::new().with_table(&table());
    let pipeline = build_pipeline(&server, &["Chennai"], warehouse.clone());

    let batch = handoff::read_batch(&storage, "empty.json").await?;
    let report = pipeline.load(batch).await?;

    assert_eq!(report.rows_written, 0);
    assert_eq!(warehouse.connections_opened(), 0);
    assert_eq!(warehouse.write_operations(), 0);
    Ok(())
}
