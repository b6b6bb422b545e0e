mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::time::sleep;

use common::{french, RecordingSink, ScriptedFactory, SinkEvent};
use dualsub::caption::SharedSurface;
use dualsub::host::run_host;
use dualsub::metrics::MetricsRegistry;
use dualsub::pipeline::Pipeline;
use dualsub::settings::PipelineConfig;

async fn send(client: &mut tokio::io::DuplexStream, line: &str) {
    client.write_all(line.as_bytes()).await.unwrap();
    client.write_all(b"\n").await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn json_lines_drive_the_pipeline() {
    let surface = Arc::new(SharedSurface::new());
    let factory = ScriptedFactory::new();
    let sink = RecordingSink::new();
    let metrics = Arc::new(MetricsRegistry::new());

    let (pipeline, handle) = Pipeline::new(
        surface.clone(),
        factory.clone(),
        french(),
        PipelineConfig::default(),
        Box::new(sink.clone()),
        Arc::clone(&metrics),
    );
    let pipeline_task = tokio::spawn(pipeline.run());

    let out: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let (mut client, server) = tokio::io::duplex(4096);
    let host_task = tokio::spawn(run_host(
        BufReader::new(server),
        out.clone(),
        surface,
        handle,
        metrics,
    ));
    sleep(Duration::from_millis(500)).await;

    send(&mut client, r#"{"type":"navigate","url":"https://www.netflix.com/watch/70143836"}"#).await;
    send(&mut client, r#"{"type":"captions","blocks":["<span>Hello</span>"]}"#).await;
    sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.shown(), ["fr:Hello"]);

    send(&mut client, "this is not json").await;
    send(&mut client, r#"{"type":"settings","settings":{"targetLanguage":"de"}}"#).await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.last_shown().as_deref(), Some("de:Hello"));

    send(&mut client, r#"{"type":"metrics"}"#).await;
    sleep(Duration::from_millis(10)).await;

    drop(client);
    host_task.await.unwrap().unwrap();
    pipeline_task.await.unwrap();

    assert_eq!(sink.events().last(), Some(&SinkEvent::Hide));

    let written = String::from_utf8(out.lock().clone()).unwrap();
    let reply: serde_json::Value = serde_json::from_str(written.lines().last().unwrap()).unwrap();
    assert_eq!(reply["type"], "metrics");
    assert_eq!(reply["summary"]["counters"]["commit"], 2);
}

#[tokio::test(start_paused = true)]
async fn removed_captions_message_hides() {
    let surface = Arc::new(SharedSurface::new());
    let sink = RecordingSink::new();
    let metrics = Arc::new(MetricsRegistry::new());

    let (pipeline, handle) = Pipeline::new(
        surface.clone(),
        ScriptedFactory::new(),
        french(),
        PipelineConfig::default(),
        Box::new(sink.clone()),
        Arc::clone(&metrics),
    );
    let pipeline_task = tokio::spawn(pipeline.run());

    let out: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let (mut client, server) = tokio::io::duplex(4096);
    let host_task = tokio::spawn(run_host(BufReader::new(server), out, surface, handle, metrics));
    sleep(Duration::from_millis(500)).await;

    send(&mut client, r#"{"type":"captions","blocks":["One","Two"]}"#).await;
    sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.shown(), ["fr:One\nfr:Two"]);

    send(&mut client, r#"{"type":"captions_removed"}"#).await;
    sleep(Duration::from_millis(200)).await;
    assert_eq!(
        sink.events(),
        [SinkEvent::Show("fr:One\nfr:Two".into()), SinkEvent::Hide]
    );

    drop(client);
    host_task.await.unwrap().unwrap();
    pipeline_task.await.unwrap();
}
