//! Traceflow demo binary.
//!
//! Runs the workflow pipeline once against the simulated external
//! service, prints the response, and flushes the span exporter before
//! exiting.

use traceflow::pipeline::{
    status_code, PipelineConfig, PipelineExecutor, SimulatedExternalService, TriggerRequest,
};
use traceflow::trace::{create_collector, BatchExporter, TelemetryConfig};

use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("traceflow v{}", env!("CARGO_PKG_VERSION"));

    let telemetry = TelemetryConfig::default();
    let transport = create_collector(&telemetry);
    let exporter = BatchExporter::start(telemetry, transport);

    let executor = PipelineExecutor::new(
        PipelineConfig::default(),
        exporter.buffer(),
        SimulatedExternalService::new(Duration::from_millis(100)),
    );

    let result = executor.run(TriggerRequest::new()).await;
    match &result {
        Ok(response) => match serde_json::to_string_pretty(response) {
            Ok(body) => println!("{}", body),
            Err(e) => eprintln!("failed to render response: {}", e),
        },
        Err(e) => eprintln!("pipeline failed ({}): {}", status_code(&result), e),
    }

    let stats = exporter.shutdown().await;
    println!(
        "exported {} of {} spans in {} batches",
        stats.spans_exported, stats.spans_submitted, stats.batches_delivered
    );
}
