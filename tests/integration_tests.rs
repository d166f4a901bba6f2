use anyhow::Result;
use excel_ollama::core::Workbook;
use excel_ollama::utils::validation::Validate;
use excel_ollama::{
    AnalysisEngine, AnalysisError, AnalysisSettings, DirectoryWorkbook, LocalStorage,
    RangeAnalysisPipeline,
};
use httpmock::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const SALES_CSV: &str = "Region,Quarter,Revenue\n\
North,Q1,1200\n\
South,Q1,900\n\
North,Q2,1350\n\
South,Q2,980\n";

fn write_sheet(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(format!("{}.csv", name)), content).unwrap();
}

fn read_sheet(dir: &Path, name: &str) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(dir.join(format!("{}.csv", name)))
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(|s| s.to_string()).collect())
        .collect()
}

fn settings_for(server: &MockServer, dir: &Path) -> AnalysisSettings {
    AnalysisSettings {
        input_path: dir.join("Data.csv").to_str().unwrap().to_string(),
        server_url: server.base_url(),
        timeout_seconds: 5,
        ..Default::default()
    }
}

fn engine_for(
    settings: AnalysisSettings,
) -> AnalysisEngine<RangeAnalysisPipeline<DirectoryWorkbook<LocalStorage>, AnalysisSettings>> {
    let (dir, sheet) = settings.workbook_location();
    let workbook = DirectoryWorkbook::new(LocalStorage::new(dir), sheet);
    AnalysisEngine::new(RangeAnalysisPipeline::new(workbook, settings).unwrap())
}

#[tokio::test]
async fn test_end_to_end_writes_new_sheet() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_sheet(temp_dir.path(), "Data", SALES_CSV);

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/generate")
            .json_body_partial(r#"{"model": "llama2", "stream": false}"#)
            .body_contains("Columns: Region (text), Quarter (text), Revenue (number)");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"response": "A\nB", "done": true}));
    });

    let outcome = engine_for(settings_for(&server, temp_dir.path())).run().await?;

    api_mock.assert();
    assert_eq!(outcome.sheet_name, "AI_Analysis");
    assert_eq!(outcome.lines_written, 2);
    assert!(!outcome.used_fallback);
    assert_eq!(
        read_sheet(temp_dir.path(), "AI_Analysis"),
        vec![vec!["A".to_string()], vec!["B".to_string()]]
    );

    // 原始資料不變
    assert_eq!(read_sheet(temp_dir.path(), "Data").len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_existing_output_sheet_gets_suffix() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_sheet(temp_dir.path(), "Data", SALES_CSV);
    write_sheet(temp_dir.path(), "AI_Analysis", "previous run\n");

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/generate");
        then.status(200)
            .json_body(serde_json::json!({"response": "fresh", "done": true}));
    });

    let engine = engine_for(settings_for(&server, temp_dir.path()));
    let first = engine.run().await?;
    let second = engine.run().await?;

    assert_eq!(first.sheet_name, "AI_Analysis_2");
    assert_eq!(second.sheet_name, "AI_Analysis_3");
    assert_eq!(
        read_sheet(temp_dir.path(), "AI_Analysis"),
        vec![vec!["previous run".to_string()]]
    );
    Ok(())
}

#[tokio::test]
async fn test_http_error_leaves_workbook_untouched() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_sheet(temp_dir.path(), "Data", SALES_CSV);

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/api/generate");
        then.status(404)
            .json_body(serde_json::json!({"error": "model 'llama2' not found"}));
    });

    let engine = engine_for(settings_for(&server, temp_dir.path()));
    let err = engine.run().await.unwrap_err();

    api_mock.assert();
    match &err {
        AnalysisError::HttpStatusError { status, reason } => {
            assert_eq!(*status, 404);
            assert_eq!(reason, "Not Found");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.user_friendly_message().contains("404"));

    let sheets = engine.pipeline().workbook().sheet_names().await?;
    assert_eq!(sheets, vec!["Data".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_no_response_field() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_sheet(temp_dir.path(), "Data", SALES_CSV);

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/generate");
        then.status(200).body("<html>proxy login</html>");
    });

    let engine = engine_for(settings_for(&server, temp_dir.path()));
    let err = engine.run().await.unwrap_err();

    assert!(matches!(err, AnalysisError::NoResponseField { .. }));
    assert!(!temp_dir.path().join("AI_Analysis.csv").exists());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_server_is_recoverable_error() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_sheet(temp_dir.path(), "Data", SALES_CSV);

    let settings = AnalysisSettings {
        input_path: temp_dir.path().join("Data.csv").to_str().unwrap().to_string(),
        server_url: "http://127.0.0.1:9".to_string(),
        timeout_seconds: 2,
        ..Default::default()
    };

    let err = engine_for(settings).run().await.unwrap_err();
    assert!(matches!(err, AnalysisError::HttpError(_)));
    assert!(!temp_dir.path().join("AI_Analysis.csv").exists());
    Ok(())
}

#[tokio::test]
async fn test_slow_server_times_out() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_sheet(temp_dir.path(), "Data", SALES_CSV);

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/generate");
        then.status(200)
            .delay(std::time::Duration::from_secs(3))
            .json_body(serde_json::json!({"response": "late", "done": true}));
    });

    let settings = AnalysisSettings {
        timeout_seconds: 1,
        ..settings_for(&server, temp_dir.path())
    };
    let err = engine_for(settings).run().await.unwrap_err();

    assert!(err.is_timeout());
    Ok(())
}

#[tokio::test]
async fn test_large_selection_is_sampled() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut csv_content = String::from("id,amount\n");
    for i in 0..1500 {
        csv_content.push_str(&format!("{},{}\n", i, i * 3));
    }
    write_sheet(temp_dir.path(), "Data", &csv_content);

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/generate")
            .body_contains("Dataset: 1500 rows x 2 columns (sampled 100 rows)");
        then.status(200)
            .json_body(serde_json::json!({"response": "ok", "done": true}));
    });

    let settings = AnalysisSettings {
        sample_size: 100,
        ..settings_for(&server, temp_dir.path())
    };
    engine_for(settings).run().await?;

    api_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_range_selection_limits_columns() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_sheet(
        temp_dir.path(),
        "Data",
        "Region,Revenue,Quarter\nNorth,1200,Q1\nSouth,900,Q1\nNorth,1350,Q2\n",
    );

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/generate")
            .body_contains("Columns: Region (text), Revenue (number)")
            .body_contains("Dataset: 2 rows x 2 columns");
        then.status(200).json_body(
            serde_json::json!({"response": "<think>compare</think>North wins", "done": true}),
        );
    });

    // Quarter 欄不在選取範圍內
    let settings = AnalysisSettings {
        range: Some("Data!$A$1:B3".to_string()),
        ..settings_for(&server, temp_dir.path())
    };
    let outcome = engine_for(settings).run().await?;

    api_mock.assert();
    assert_eq!(
        read_sheet(temp_dir.path(), &outcome.sheet_name),
        vec![vec!["North wins".to_string()]]
    );
    Ok(())
}

#[tokio::test]
async fn test_uppercase_csv_extension_end_to_end() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(temp_dir.path().join("Data.CSV"), SALES_CSV)?;

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/generate")
            .body_contains("Dataset: 4 rows x 3 columns");
        then.status(200)
            .json_body(serde_json::json!({"response": "Upper case works", "done": true}));
    });

    let settings = AnalysisSettings {
        input_path: temp_dir.path().join("Data.CSV").to_str().unwrap().to_string(),
        ..settings_for(&server, temp_dir.path())
    };
    settings.validate()?;

    let outcome = engine_for(settings).run().await?;

    api_mock.assert();
    assert_eq!(outcome.sheet_name, "AI_Analysis");
    assert_eq!(
        read_sheet(temp_dir.path(), "AI_Analysis"),
        vec![vec!["Upper case works".to_string()]]
    );
    Ok(())
}
