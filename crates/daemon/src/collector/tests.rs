//! Tests for the collector daemon lifecycle.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use bas_core::ConfigHint;

use super::*;
use crate::fake_api::{Call, FakeApi};

fn configuration(pairs: &[(&str, &str)]) -> Configuration {
    let mut config = Configuration::new(Vec::<(String, ConfigHint)>::new());
    config.set("collector_id", "collector-1");
    config.set(COLLECTOR_NAME, "Acme EDR");
    config.set(COLLECTOR_TYPE, "acme_edr");
    config.set("json_logging", "false");
    for (key, value) in pairs {
        config.set(key, *value);
    }
    config
}

fn daemon(api: Arc<FakeApi>, pairs: &[(&str, &str)]) -> CollectorDaemon {
    CollectorDaemon::with_api(configuration(pairs), api).unwrap()
}

fn registrations(api: &FakeApi) -> Vec<(CollectorConfig, Option<String>)> {
    api.calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::RegisterCollector { config, icon } => Some((config, icon)),
            _ => None,
        })
        .collect()
}

// -- Start-up --

#[tokio::test]
async fn refuses_to_start_without_callback() {
    let api = Arc::new(FakeApi::default());
    let err = daemon(api.clone(), &[]).start().await.unwrap_err();

    assert!(matches!(err, DaemonError::MissingCallback));
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn registers_without_platform_or_icon() {
    let api = Arc::new(FakeApi::default());
    let collector = Arc::new(daemon(api.clone(), &[(COLLECTOR_PERIOD, "30")]).on_tick(|_| async { Ok(()) }));

    let running = tokio::spawn({
        let collector = collector.clone();
        async move { collector.start().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    collector.shutdown();
    running.await.unwrap().unwrap();

    let calls = api.calls();
    assert_eq!(
        calls[0],
        Call::RegisterCollector {
            config: CollectorConfig {
                collector_id: "collector-1".into(),
                collector_name: "Acme EDR".into(),
                collector_type: "acme_edr".into(),
                collector_period: 30,
                collector_security_platform: None,
            },
            icon: None,
        }
    );
    assert!(!calls.iter().any(|c| matches!(c, Call::UpsertDocument(_) | Call::UpsertSecurityPlatform(_))));
}

#[tokio::test(start_paused = true)]
async fn uploads_icon_and_platform_before_registering() {
    let mut icon = tempfile::NamedTempFile::new().unwrap();
    icon.write_all(b"\x89PNG").unwrap();
    let icon_path = icon.path().to_str().unwrap().to_string();

    let api = Arc::new(FakeApi::default());
    let collector = Arc::new(
        daemon(
            api.clone(),
            &[(COLLECTOR_ICON_FILEPATH, &icon_path), (COLLECTOR_PLATFORM, "EDR")],
        )
        .on_tick(|_| async { Ok(()) }),
    );

    let running = tokio::spawn({
        let collector = collector.clone();
        async move { collector.start().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    collector.shutdown();
    running.await.unwrap().unwrap();

    let calls = api.calls();
    assert_eq!(calls[0], Call::UpsertDocument("collector-1.png".into()));
    assert_eq!(
        calls[1],
        Call::UpsertSecurityPlatform(SecurityPlatformInput {
            asset_name: "Acme EDR".into(),
            asset_external_reference: Some("collector-1".into()),
            asset_description: None,
            security_platform_type: "EDR".into(),
            security_platform_logo_light: Some("doc-1".into()),
            security_platform_logo_dark: Some("doc-1".into()),
        })
    );
    match &calls[2] {
        Call::RegisterCollector { config, icon } => {
            assert_eq!(config.collector_security_platform.as_deref(), Some("platform-1"));
            assert_eq!(config.collector_period, DEFAULT_PERIOD_SECONDS);
            assert_eq!(icon.as_deref(), Some("collector-1.png"));
        }
        other => panic!("expected registration, got {other:?}"),
    }
}

#[tokio::test]
async fn registration_failure_aborts_start() {
    let api = Arc::new(FakeApi {
        fail_registration: true,
        ..FakeApi::default()
    });
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();
    let collector = daemon(api.clone(), &[]).on_tick(move |_| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    let err = collector.start().await.unwrap_err();
    assert!(matches!(err, DaemonError::Client(_)));
    assert_eq!(ticks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejects_non_positive_period() {
    let api = Arc::new(FakeApi::default());
    let collector = daemon(api.clone(), &[(COLLECTOR_PERIOD, "0")]).on_tick(|_| async { Ok(()) });

    let err = collector.start().await.unwrap_err();
    assert!(matches!(err, DaemonError::Config(BasError::InvalidValue { .. })));
    assert!(api.calls().is_empty());
}

// -- Running --

#[tokio::test(start_paused = true)]
async fn ticks_heartbeats_and_reports_until_shutdown() {
    let api = Arc::new(FakeApi::default());
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();
    let collector = Arc::new(
        daemon(api.clone(), &[(COLLECTOR_PERIOD, "60")]).on_tick(move |ctx| {
            let counter = counter.clone();
            async move {
                assert_eq!(ctx.id, "collector-1");
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }),
    );

    let running = tokio::spawn({
        let collector = collector.clone();
        async move { collector.start().await }
    });
    // ticks at 0, 60, 120; pings at 0, 40, 80, 120
    tokio::time::sleep(Duration::from_secs(130)).await;
    collector.shutdown();
    running.await.unwrap().unwrap();

    assert_eq!(ticks.load(Ordering::SeqCst), 3);
    assert_eq!(api.count(|c| matches!(c, Call::LastExecution { .. })), 3);

    let registrations = registrations(&api);
    assert_eq!(registrations.len(), 5);
    assert!(registrations[1..].iter().all(|(_, icon)| icon.is_none()));
}

#[tokio::test(start_paused = true)]
async fn failing_callback_keeps_running_without_reporting() {
    let api = Arc::new(FakeApi::default());
    let collector = Arc::new(
        daemon(api.clone(), &[(COLLECTOR_PERIOD, "10")])
            .on_tick(|_| async { anyhow::bail!("alert source unreachable") }),
    );

    let running = tokio::spawn({
        let collector = collector.clone();
        async move { collector.start().await }
    });
    tokio::time::sleep(Duration::from_secs(25)).await;
    collector.shutdown();
    running.await.unwrap().unwrap();

    assert_eq!(api.count(|c| matches!(c, Call::LastExecution { .. })), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_token_stops_the_daemon() {
    let api = Arc::new(FakeApi::default());
    let collector = daemon(api.clone(), &[]).on_tick(|_| async { Ok(()) });
    let token = collector.shutdown_token();

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        token.cancel();
    });
    collector.start().await.unwrap();
    stopper.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn callback_reports_expectations_through_the_context() {
    use std::collections::HashMap;

    use bas_signatures::{
        AlertData, Expectation, ExpectationKind, ExpectationResult, ExpectationSignature,
        SignatureLabel, SignatureType,
    };
    use uuid::Uuid;

    let detected = Uuid::new_v4();
    let missed = Uuid::new_v4();
    let api = Arc::new(FakeApi {
        pending: vec![
            Expectation::new(
                detected,
                ExpectationKind::Detection,
                vec![ExpectationSignature::new(SignatureLabel::ParentProcessName, "svc.exe")],
            ),
            Expectation::new(
                missed,
                ExpectationKind::Prevention,
                vec![ExpectationSignature::new(SignatureLabel::ParentProcessName, "other.exe")],
            ),
        ],
        ..FakeApi::default()
    });

    let collector = Arc::new(daemon(api.clone(), &[]).on_tick(|ctx| async move {
        let types = vec![SignatureType::fuzzy(SignatureLabel::ParentProcessName, 90)?];
        let alert = AlertData::from([(
            types[0].label.clone(),
            types[0].describe_for_matching(vec!["svc.exe"]),
        )]);
        for expectation in ctx.api.pending_expectations(&ctx.id, None).await? {
            let matched = expectation.match_alert(&types, &alert);
            expectation
                .update(&*ctx.api, matched, &ctx.id, HashMap::new())
                .await?;
        }
        Ok::<_, anyhow::Error>(())
    }));

    let running = tokio::spawn({
        let collector = collector.clone();
        async move { collector.start().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    collector.shutdown();
    running.await.unwrap().unwrap();

    let reports: Vec<(Uuid, ExpectationResult)> = api
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::ReportExpectation { id, result } => Some((id, result)),
            _ => None,
        })
        .collect();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].0, detected);
    assert_eq!(reports[0].1.result, "Detected");
    assert_eq!(reports[0].1.collector_id, "collector-1");
    assert_eq!(reports[1].0, missed);
    assert_eq!(reports[1].1.result, "Not Prevented");
    assert!(api.calls().contains(&Call::PendingExpectations("collector-1".into())));
}
