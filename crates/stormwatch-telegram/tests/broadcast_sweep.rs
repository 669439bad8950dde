//! Broadcast poller tests with in-memory source and sink.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stormwatch_core::{AlertSettings, ThunderScanner};
use stormwatch_models::{ForecastDocument, Location, LocationBook};
use stormwatch_telegram::{BroadcastConfig, BroadcastPoller, BroadcastSink, SweepReport, TelegramError};
use stormwatch_weather::{ForecastSource, GatewayError};
use tokio::sync::watch;

struct TableSource {
    documents: HashMap<String, ForecastDocument>,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ForecastSource for TableSource {
    async fn fetch(&self, location: &Location, _days: u8) -> stormwatch_weather::Result<ForecastDocument> {
        self.calls.lock().unwrap().push(location.name.clone());
        self.documents
            .get(&location.name)
            .cloned()
            .ok_or(GatewayError::Timeout)
    }
}

#[derive(Default)]
struct CollectingSink {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl BroadcastSink for CollectingSink {
    async fn send_text(&self, text: &str) -> stormwatch_telegram::Result<()> {
        if self.fail {
            return Err(TelegramError::Transport("chat not found".into()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn stormy() -> ForecastDocument {
    serde_json::from_value(serde_json::json!({
        "location": {"localtime": "2024-06-01 12:00"},
        "forecast": {"forecastday": [{
            "date": "2024-06-01",
            "hour": [{
                "time": "2024-06-01 14:00",
                "condition": {"text": "Moderate or heavy rain with thunder", "code": 1276},
                "chance_of_thunder": 85,
                "precip_mm": 6.0,
                "wind_kph": 40.0
            }]
        }]}
    }))
    .unwrap()
}

fn calm() -> ForecastDocument {
    serde_json::from_value(serde_json::json!({
        "location": {"localtime": "2024-06-01 12:00"},
        "forecast": {"forecastday": [{"date": "2024-06-01", "hour": []}]}
    }))
    .unwrap()
}

fn fixture(sink: Arc<CollectingSink>) -> (BroadcastPoller, Arc<TableSource>, watch::Sender<bool>) {
    fixture_with_delay(sink, Duration::ZERO)
}

/// Three points: Orsha is stormy, Polotsk has no data, Pinsk is calm.
fn fixture_with_delay(
    sink: Arc<CollectingSink>,
    item_delay: Duration,
) -> (BroadcastPoller, Arc<TableSource>, watch::Sender<bool>) {
    let book = LocationBook::new(
        vec![
            Location::new("Orsha", "54.51,30.42"),
            Location::new("Polotsk", "55.49,28.78"),
        ],
        vec![Location::new("Pinsk", "52.11,26.10")],
    )
    .unwrap();

    let mut documents = HashMap::new();
    documents.insert("Orsha".to_string(), stormy());
    documents.insert("Pinsk".to_string(), calm());
    let source = Arc::new(TableSource {
        documents,
        calls: Mutex::new(Vec::new()),
    });

    let (tx, rx) = watch::channel(false);
    let poller = BroadcastPoller::new(
        Arc::new(book),
        source.clone(),
        ThunderScanner::new(&AlertSettings::default()),
        sink,
        BroadcastConfig::default()
            .with_interval(Duration::from_secs(60))
            .with_item_delay(item_delay),
        rx,
    );
    (poller, source, tx)
}

#[tokio::test]
async fn test_sweep_isolates_failing_location() {
    let sink = Arc::new(CollectingSink::default());
    let (poller, source, _tx) = fixture(sink.clone());

    let report = poller.sweep().await;

    assert_eq!(
        report,
        SweepReport {
            checked: 2,
            alerted: 1,
            failed: 1
        }
    );
    assert_eq!(*source.calls.lock().unwrap(), vec!["Orsha", "Polotsk", "Pinsk"]);

    let sent = sink.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("Orsha"));
    assert!(sent[0].contains("14:00 01.06"));
}

#[tokio::test]
async fn test_sweep_counts_push_failures() {
    let sink = Arc::new(CollectingSink {
        fail: true,
        ..Default::default()
    });
    let (poller, _source, _tx) = fixture(sink);

    let report = poller.sweep().await;

    assert_eq!(report.checked, 2);
    assert_eq!(report.alerted, 0);
    assert_eq!(report.failed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_stops_on_shutdown() {
    let sink = Arc::new(CollectingSink::default());
    let (mut poller, source, tx) = fixture(sink.clone());

    let task = tokio::spawn(async move { poller.run().await });

    // The first tick fires immediately; let it complete.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(sink.sent.lock().unwrap().len(), 1);

    tx.send(true).unwrap();
    task.await.unwrap();
    assert_eq!(source.calls.lock().unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_run_stops_when_sender_dropped() {
    let sink = Arc::new(CollectingSink::default());
    let (mut poller, _source, tx) = fixture(sink);

    let task = tokio::spawn(async move { poller.run().await });
    drop(tx);

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("poller should stop")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_sweep_pause() {
    let sink = Arc::new(CollectingSink::default());
    let (poller, source, tx) = fixture_with_delay(sink.clone(), Duration::from_secs(60));

    let task = tokio::spawn(async move { poller.sweep().await });

    // Orsha is done; the sweep is now pausing before Polotsk.
    tokio::time::sleep(Duration::from_secs(1)).await;
    tx.send(true).unwrap();

    let report = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("sweep should stop at the pause")
        .unwrap();
    assert_eq!(
        report,
        SweepReport {
            checked: 1,
            alerted: 1,
            failed: 0
        }
    );
    assert_eq!(*source.calls.lock().unwrap(), vec!["Orsha"]);
    assert_eq!(sink.sent.lock().unwrap().len(), 1);
}
