mod common;

use common::{FakeApp, FakePage, FakeProvider, auth_redirect, landing_page, test_config};
use kestrel_core::{FailureKind, Scenario, Step, StepOutcome, Verdict};
use kestrel_runner::{Error, Executor, ExitStatus, ReportFormat, Reporter};
use std::path::PathBuf;
use std::time::Duration;

fn outcomes(report: &kestrel_core::ScenarioReport) -> Vec<StepOutcome> {
    report.results.iter().map(|r| r.outcome.clone()).collect()
}

#[tokio::test]
async fn test_auth_redirect_passes_against_cloudray() {
    let artifacts = tempfile::tempdir().unwrap();
    let provider = FakeProvider::new(FakeApp::cloudray());
    let counters = provider.counters.clone();
    let executor = Executor::new(provider, test_config(artifacts.path()));

    let report = executor.run(auth_redirect()).await.unwrap();

    assert_eq!(report.verdict, Verdict::Pass);
    assert_eq!(report.results.len(), 4);
    assert!(report.results.iter().all(|r| r.outcome == StepOutcome::Passed));

    let screenshot = artifacts.path().join("auth_redirect.png");
    assert!(screenshot.exists());
    assert_eq!(report.artifacts, vec![screenshot]);

    assert_eq!(ExitStatus::of(&report).code(), 0);
    assert_eq!(counters.acquired(), 1);
    assert_eq!(counters.released(), 1);
}

#[tokio::test]
async fn test_landing_page_passes_against_cloudray() {
    let artifacts = tempfile::tempdir().unwrap();
    let executor = Executor::new(
        FakeProvider::new(FakeApp::cloudray()),
        test_config(artifacts.path()),
    );

    let report = executor.run(landing_page()).await.unwrap();

    assert_eq!(report.verdict, Verdict::Pass);
    assert_eq!(report.results.len(), 3);
    assert!(artifacts.path().join("landing_page.png").exists());

    let mut reporter = Reporter::new(Vec::new(), ReportFormat::Pretty);
    assert_eq!(reporter.summarize(&report), ExitStatus::Success);
}

#[tokio::test]
async fn test_missing_redirect_fails_assertion_and_skips_screenshot() {
    let artifacts = tempfile::tempdir().unwrap();
    // Dashboard is served to anonymous visitors instead of redirecting
    let app = FakeApp::cloudray().route("/dashboard", FakePage::with_heading("Your files"));
    let provider = FakeProvider::new(app);
    let counters = provider.counters.clone();
    let executor = Executor::new(provider, test_config(artifacts.path()));

    let report = executor.run(auth_redirect()).await.unwrap();

    assert_eq!(report.verdict, Verdict::Fail);
    assert_eq!(report.results.len(), 4);

    let failure = report.first_failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Assertion);
    assert_eq!(failure.step_index, 1);
    assert_eq!(failure.scenario, "auth-redirect");
    assert!(failure.message.contains("http://localhost:3000/login"));
    assert!(failure.message.contains("http://localhost:3000/dashboard"));

    assert_eq!(report.results[2].outcome, StepOutcome::Skipped);
    assert_eq!(report.results[3].outcome, StepOutcome::Skipped);
    assert_eq!(counters.screenshots(), 0);
    assert!(!artifacts.path().join("auth_redirect.png").exists());

    assert_eq!(ExitStatus::of(&report).code(), 10);
    assert_eq!(counters.released(), 1);
}

#[tokio::test]
async fn test_missing_heading_fails_assertion() {
    let artifacts = tempfile::tempdir().unwrap();
    let app = FakeApp::cloudray().route("/", FakePage::with_heading("Under construction"));
    let executor = Executor::new(FakeProvider::new(app), test_config(artifacts.path()));

    let report = executor.run(landing_page()).await.unwrap();

    assert_eq!(report.results[2].outcome, StepOutcome::Skipped);
    let failure = report.first_failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Assertion);
    assert!(failure.message.contains("role=heading"));
}

#[tokio::test]
async fn test_refused_navigation_is_navigation_error() {
    let artifacts = tempfile::tempdir().unwrap();
    let executor = Executor::new(
        FakeProvider::new(FakeApp::default()),
        test_config(artifacts.path()),
    );

    let report = executor.run(landing_page()).await.unwrap();

    let failure = report.first_failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Navigation);
    assert_eq!(failure.step_index, 0);
    assert!(failure.message.contains("ERR_CONNECTION_REFUSED"));
    assert_eq!(report.skipped(), 2);
    assert_eq!(ExitStatus::of(&report).code(), 11);
}

#[tokio::test]
async fn test_unwritable_artifact_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let executor = Executor::new(
        FakeProvider::new(FakeApp::cloudray()),
        test_config(&blocker.join("shots")),
    );

    let report = executor.run(landing_page()).await.unwrap();

    let failure = report.first_failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Io);
    assert_eq!(failure.step_index, 2);
    assert!(report.artifacts.is_empty());
    assert_eq!(ExitStatus::of(&report).code(), 12);
}

#[tokio::test]
async fn test_hung_navigation_is_navigation_error() {
    let artifacts = tempfile::tempdir().unwrap();
    let provider = FakeProvider {
        hang_navigate: true,
        ..FakeProvider::new(FakeApp::cloudray())
    };
    let counters = provider.counters.clone();
    let executor = Executor::new(provider, test_config(artifacts.path()));

    let report = executor.run(landing_page()).await.unwrap();

    let failure = report.first_failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Navigation);
    assert_eq!(failure.step_index, 0);
    assert!(failure.message.contains("navigate did not return"));
    assert_eq!(report.skipped(), 2);
    assert_eq!(ExitStatus::of(&report).code(), 11);
    assert_eq!(counters.released(), 1);
}

#[tokio::test]
async fn test_hung_screenshot_is_timeout() {
    let artifacts = tempfile::tempdir().unwrap();
    let provider = FakeProvider {
        hang_screenshot: true,
        ..FakeProvider::new(FakeApp::cloudray())
    };
    let counters = provider.counters.clone();
    let executor = Executor::new(provider, test_config(artifacts.path()));

    let report = executor.run(landing_page()).await.unwrap();

    let failure = report.first_failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Timeout);
    assert_eq!(failure.step_index, 2);
    assert!(report.artifacts.is_empty());
    assert_eq!(ExitStatus::of(&report).code(), 13);
    assert_eq!(counters.released(), 1);
}

#[tokio::test]
async fn test_unavailable_session_is_infrastructure_error() {
    let artifacts = tempfile::tempdir().unwrap();
    let provider = FakeProvider {
        unavailable: true,
        ..FakeProvider::new(FakeApp::cloudray())
    };
    let counters = provider.counters.clone();
    let executor = Executor::new(provider, test_config(artifacts.path()));

    let err = executor.run(landing_page()).await.unwrap_err();

    assert_eq!(err.scenario(), "landing-page");
    assert!(matches!(err, Error::Infrastructure { .. }));
    assert!(err.to_string().contains("Chrome not found"));
    assert_eq!(counters.released(), 0);
}

#[tokio::test]
async fn test_result_length_matches_steps_for_every_outcome() {
    let artifacts = tempfile::tempdir().unwrap();
    let apps = [
        FakeApp::cloudray(),
        FakeApp::default(),
        FakeApp::cloudray().route("/dashboard", FakePage::default()),
        FakeApp::cloudray().route("/login", FakePage::default()),
    ];

    for app in apps {
        let executor = Executor::new(FakeProvider::new(app), test_config(artifacts.path()));
        for scenario in [auth_redirect(), landing_page()] {
            let steps = scenario.steps().to_vec();
            let report = executor.run(scenario).await.unwrap();

            assert_eq!(report.results.len(), steps.len());
            for (index, (result, step)) in report.results.iter().zip(&steps).enumerate() {
                assert_eq!(result.index, index);
                assert_eq!(&result.step, step);
            }
        }
    }
}

#[tokio::test]
async fn test_same_scenario_twice_gives_same_verdict() {
    let artifacts = tempfile::tempdir().unwrap();
    let provider = FakeProvider::new(FakeApp::cloudray());
    let counters = provider.counters.clone();
    let executor = Executor::new(provider, test_config(artifacts.path()));

    let first = executor.run(auth_redirect()).await.unwrap();
    let second = executor.run(auth_redirect()).await.unwrap();

    assert_eq!(first.verdict, second.verdict);
    assert_eq!(outcomes(&first), outcomes(&second));
    assert_eq!(counters.acquired(), 2);
    assert_eq!(counters.released(), 2);
}

#[tokio::test]
async fn test_cancelled_run_still_releases_session() {
    let artifacts = tempfile::tempdir().unwrap();
    let provider = FakeProvider {
        hang_navigate: true,
        ..FakeProvider::new(FakeApp::cloudray())
    };
    let counters = provider.counters.clone();
    let executor = Executor::new(provider, test_config(artifacts.path()));

    let result = tokio::time::timeout(Duration::from_millis(50), executor.run(landing_page())).await;
    assert!(result.is_err(), "run should have been cancelled");

    // Teardown is spawned from the guard's Drop
    executor.wait_for_teardown().await;
    assert_eq!(counters.acquired(), 1);
    assert_eq!(counters.released(), 1);
}

#[tokio::test]
async fn test_run_all_respects_concurrency_and_order() {
    let artifacts = tempfile::tempdir().unwrap();
    let provider = FakeProvider {
        navigate_delay: Some(Duration::from_millis(30)),
        ..FakeProvider::new(FakeApp::cloudray())
    };
    let counters = provider.counters.clone();
    let executor = Executor::new(provider, test_config(artifacts.path()));

    let scenarios: Vec<Scenario> = (0..4)
        .map(|i| {
            Scenario::new(
                format!("landing-{}", i),
                vec![
                    Step::Navigate {
                        url: "/".to_string(),
                    },
                    Step::Screenshot {
                        path: PathBuf::from(format!("landing-{}.png", i)),
                    },
                ],
            )
            .unwrap()
        })
        .collect();

    let run = executor.run_all(scenarios, 2).await;

    assert!(run.passed());
    let names: Vec<&str> = run.reports.iter().map(|r| r.scenario.name()).collect();
    assert_eq!(names, vec!["landing-0", "landing-1", "landing-2", "landing-3"]);
    assert!(counters.max_active() <= 2);
    assert_eq!(counters.acquired(), 4);
    assert_eq!(counters.released(), 4);
}

#[tokio::test]
async fn test_run_all_stops_on_infrastructure_error() {
    let artifacts = tempfile::tempdir().unwrap();
    let provider = FakeProvider {
        unavailable: true,
        ..FakeProvider::new(FakeApp::cloudray())
    };
    let executor = Executor::new(provider, test_config(artifacts.path()));

    let run = executor.run_all(vec![landing_page(), auth_redirect()], 1).await;

    assert!(!run.passed());
    assert!(run.reports.is_empty());
    assert_eq!(run.aborted.as_ref().unwrap().scenario(), "landing-page");
    assert_eq!(run.not_run, vec!["auth-redirect".to_string()]);
    assert_eq!(ExitStatus::of_run(&run).code(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_aborted_run_waits_for_in_flight_teardown() {
    let artifacts = tempfile::tempdir().unwrap();
    let provider = FakeProvider {
        fail_attempt: Some(0),
        acquire_delay: Some(Duration::from_millis(50)),
        hang_navigate: true,
        close_delay: Some(Duration::from_millis(50)),
        ..FakeProvider::new(FakeApp::cloudray())
    };
    let counters = provider.counters.clone();
    let executor = Executor::new(provider, test_config(artifacts.path()));

    let run = executor.run_all(vec![landing_page(), auth_redirect()], 2).await;

    assert_eq!(run.aborted.as_ref().unwrap().scenario(), "landing-page");
    assert!(run.reports.is_empty());
    assert_eq!(run.not_run, vec!["auth-redirect".to_string()]);
    // The cancelled session is closed before run_all returns
    assert_eq!(counters.acquired(), 1);
    assert_eq!(counters.released(), 1);
}

#[tokio::test]
async fn test_aborted_run_keeps_reports_that_finished() {
    let artifacts = tempfile::tempdir().unwrap();
    let provider = FakeProvider {
        fail_attempt: Some(0),
        acquire_delay: Some(Duration::from_millis(200)),
        ..FakeProvider::new(FakeApp::cloudray())
    };
    let counters = provider.counters.clone();
    let executor = Executor::new(provider, test_config(artifacts.path()));

    let run = executor.run_all(vec![landing_page(), auth_redirect()], 2).await;

    assert_eq!(run.aborted.as_ref().unwrap().scenario(), "landing-page");
    assert_eq!(run.reports.len(), 1);
    assert_eq!(run.reports[0].scenario.name(), "auth-redirect");
    assert!(run.reports[0].passed());
    assert!(run.not_run.is_empty());
    assert!(artifacts.path().join("auth_redirect.png").exists());
    assert_eq!(counters.released(), 1);
    assert_eq!(ExitStatus::of_run(&run).code(), 20);
}
