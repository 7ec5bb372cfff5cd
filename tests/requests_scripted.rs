//! Request-client behavior against a scripted gateway: prompt shape, declared
//! schemas, local post-processing, and error mapping.

mod support;

use mlguide::classifier::TaskCategory;
use mlguide::dataset::{DatasetKind, RawContent};
use mlguide::requests::{ExplainInput, FeatureValue, MetricValue, Operation, RequestError};
use support::{client, text, unavailable, Reply, ScriptedGateway};

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn suggest_models_declares_schema_and_parses_fenced_json() {
    let gw = ScriptedGateway::new();
    gw.push(
        "suggest_models",
        text("```json\n{\"recommended\": \"Prophet\", \"options\": [\"Prophet\", \"ARIMA\"], \"moreModels\": [\"LSTM\"]}\n```"),
    );

    let s = client(&gw)
        .suggest_models("Forecast monthly sales", DatasetKind::Tabular)
        .await
        .unwrap();
    assert_eq!(s.recommended, "Prophet");
    assert_eq!(s.options, vec!["Prophet", "ARIMA"]);
    assert_eq!(s.more_models, vec!["LSTM"]);

    let req = gw.last("suggest_models").unwrap();
    let schema = req.response_schema.expect("structured request");
    assert_eq!(schema.name, "model_suggestions");
    assert!(schema.strict);
    assert_eq!(schema.schema["additionalProperties"], false);
    let user = &req.messages[1].content;
    assert!(user.contains("Forecast monthly sales"));
    assert!(user.contains("tabular (CSV)"));
}

#[tokio::test]
async fn suggest_models_reports_malformed_output() {
    let gw = ScriptedGateway::new();
    gw.push("suggest_models", text("Sorry, here are some ideas: XGBoost"));

    let err = client(&gw)
        .suggest_models("classify reviews", DatasetKind::Tabular)
        .await
        .unwrap_err();
    match err {
        RequestError::MalformedResponse { operation, .. } => {
            assert_eq!(operation, Operation::SuggestModels)
        }
        other => panic!("expected MalformedResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn provider_failures_are_not_malformed() {
    let gw = ScriptedGateway::new();
    gw.push("generate_metrics", Reply::Fail(unavailable));

    let err = client(&gw)
        .generate_metrics("XGBoost", "predict churn", TaskCategory::Regression)
        .await
        .unwrap_err();
    assert!(matches!(err, RequestError::Provider(_)));
    assert!(!err.is_malformed());
}

#[tokio::test]
async fn target_column_is_clamped_to_header() {
    let gw = ScriptedGateway::new();
    gw.push("identify_target_column", text("\"amount\"\n"));
    gw.push("identify_target_column", text("total_revenue"));
    let columns = cols(&["date", "region", "amount", "units"]);

    let client = client(&gw);
    let first = client
        .identify_target_column("Forecast monthly sales", &columns)
        .await
        .unwrap();
    assert_eq!(first, "amount");

    let second = client
        .identify_target_column("Forecast monthly sales", &columns)
        .await
        .unwrap();
    assert_eq!(second, "units");

    let req = gw.last("identify_target_column").unwrap();
    assert!(req.response_schema.is_none());
    assert!(req.messages[1].content.contains("date, region, amount, units"));
}

#[tokio::test]
async fn target_column_skips_request_without_header() {
    let gw = ScriptedGateway::new();
    let target = client(&gw)
        .identify_target_column("anything", &[])
        .await
        .unwrap();
    assert_eq!(target, "");
    assert!(gw.requests().is_empty());
}

#[tokio::test]
async fn explanation_prompt_embeds_first_five_lines_for_tabular_data() {
    let gw = ScriptedGateway::new();
    gw.push("explain_workflow", text("## Step 1\n"));
    gw.push("explain_workflow", text("## Loading images\n"));

    let csv = "a,b\n1,2\n3,4\n5,6\n7,8\n9,10\n";
    let content = RawContent::Text(csv.into());
    let columns = cols(&["a", "b"]);
    let client = client(&gw);

    let explanation = client
        .explain_workflow(ExplainInput {
            goal: "predict b",
            model: "Ridge",
            kind: DatasetKind::Tabular,
            column_names: &columns,
            raw_content: Some(&content),
        })
        .await
        .unwrap();
    assert_eq!(explanation, "## Step 1\n");

    let user = gw.last("explain_workflow").unwrap().messages[1].content.clone();
    assert!(user.contains("a,b\n1,2\n3,4\n5,6\n7,8"));
    assert!(!user.contains("9,10"));
    assert!(user.contains("Ridge"));

    let image = RawContent::Image {
        mime: "image/png".into(),
        base64: "AAAA".into(),
    };
    client
        .explain_workflow(ExplainInput {
            goal: "classify cats",
            model: "ResNet-50",
            kind: DatasetKind::Image,
            column_names: &[],
            raw_content: Some(&image),
        })
        .await
        .unwrap();
    let req = gw.last("explain_workflow").unwrap();
    assert!(req.messages[1].content.contains("image dataset"));
    assert!(!req.messages[1].content.contains("AAAA"));
    assert_eq!(req.max_tokens, Some(client.config().explanation_max_tokens));
}

#[tokio::test]
async fn classification_metrics_keep_confusion_matrix() {
    let gw = ScriptedGateway::new();
    gw.push(
        "generate_metrics",
        text(r#"{"metrics": {"Accuracy": 0.92, "Precision": 0.9, "Recall": 0.88, "F1-Score": 0.89}, "confusionMatrix": [[40, 5], [3, 52]]}"#),
    );

    let report = client(&gw)
        .generate_metrics("Random Forest", "classify churn", TaskCategory::Classification)
        .await
        .unwrap();
    assert_eq!(report.metrics["Accuracy"], MetricValue::Number(0.92));
    assert_eq!(report.confusion_matrix, Some([[40, 5], [3, 52]]));

    let schema = gw.last("generate_metrics").unwrap().response_schema.unwrap();
    assert!(schema.schema["properties"].get("confusionMatrix").is_some());
}

#[tokio::test]
async fn regression_metrics_drop_stray_confusion_matrix() {
    let gw = ScriptedGateway::new();
    gw.push(
        "generate_metrics",
        text(r#"{"metrics": {"R-squared": 0.81, "MSE": "12.4", "MAE": 2.9}, "confusionMatrix": [[1, 2], [3, 4]]}"#),
    );

    let report = client(&gw)
        .generate_metrics("Linear Regression", "forecast demand", TaskCategory::Other)
        .await
        .unwrap();
    assert_eq!(report.confusion_matrix, None);
    assert_eq!(report.metrics["MSE"], MetricValue::Text("12.4".into()));
    assert_eq!(
        report.metrics.keys().collect::<Vec<_>>(),
        vec!["R-squared", "MSE", "MAE"]
    );
}

#[tokio::test]
async fn sample_row_schema_excludes_target_and_types_by_hint() {
    let gw = ScriptedGateway::new();
    gw.push(
        "generate_sample_row",
        text(r#"{"Category": "Books", "Price": 12.5, "Sold": 3, "extra": "x"}"#),
    );

    let columns = cols(&["Category", "Price", "Sold"]);
    let csv = "Category,Price,Sold\nToys,9.99,4\nGames,19.5,1\nBooks,7,8\nMusic,3,2\n";
    let row = client(&gw)
        .generate_sample_row(&columns, csv, "Sold")
        .await
        .unwrap();

    assert_eq!(row.keys().collect::<Vec<_>>(), vec!["Category", "Price"]);
    assert_eq!(row["Category"], FeatureValue::Text("Books".into()));
    assert_eq!(row["Price"].to_string(), "12.5");

    let req = gw.last("generate_sample_row").unwrap();
    let schema = req.response_schema.unwrap().schema;
    assert_eq!(schema["properties"]["Price"]["type"], "number");
    assert_eq!(schema["properties"]["Category"]["type"], "string");
    assert!(schema["properties"].get("Sold").is_none());
    assert_eq!(schema["required"], serde_json::json!(["Category", "Price"]));

    let user = &req.messages[1].content;
    assert!(user.contains("Books,7,8"));
    assert!(!user.contains("Music,3,2"));
    assert!(user.contains("\"Sold\""));
}

#[tokio::test]
async fn prediction_is_trimmed_free_text() {
    let gw = ScriptedGateway::new();
    gw.push("generate_prediction", text("\n  $1,240.50  \n"));

    let columns = cols(&["date", "region", "amount"]);
    let prediction = client(&gw)
        .generate_prediction(
            "Forecast monthly sales",
            "XGBoost",
            r#"{"date": "2024-03-01", "region": "north"}"#,
            Some(&columns),
        )
        .await
        .unwrap();
    assert_eq!(prediction, "$1,240.50");

    let req = gw.last("generate_prediction").unwrap();
    assert!(req.response_schema.is_none());
    let user = &req.messages[1].content;
    assert!(user.contains("<input>\n{"));
    assert!(user.contains("&quot;region&quot;: &quot;north&quot;"));
}
