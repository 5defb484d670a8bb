use std::sync::Arc;
use std::time::Duration;

use heather::service::mock::MockSensorService;
use heather::{ControllerConfig, ViewState, WorkoutManager, WorkoutState};
use tokio::time::sleep;

fn spawn_manager(service: &MockSensorService) -> WorkoutManager {
    WorkoutManager::spawn(Arc::new(service.clone()), ControllerConfig::default())
}

#[tokio::test(start_paused = true)]
async fn pause_resume_scenario() {
    let service = MockSensorService::new();
    let manager = spawn_manager(&service);

    // t = 0
    manager.start().unwrap();
    manager.flush().await.unwrap();
    service.emit_heart_rate(72.0);

    // t = 5
    sleep(Duration::from_secs(5)).await;
    manager.flush().await.unwrap();
    let view = manager.snapshot();
    assert!((4..=5).contains(&view.elapsed_seconds), "{view:?}");
    assert_eq!(view.heart_rate, 72);

    manager.pause().unwrap();
    manager.flush().await.unwrap();
    assert_eq!(manager.snapshot().elapsed_seconds, 5);
    assert_eq!(manager.snapshot().elapsed_time_text, "5 sec");

    // t = 8, nothing moved while paused
    sleep(Duration::from_secs(3)).await;
    manager.flush().await.unwrap();
    assert_eq!(manager.snapshot().elapsed_seconds, 5);
    assert_eq!(manager.snapshot().run_state, WorkoutState::Paused);

    manager.resume().unwrap();
    manager.flush().await.unwrap();

    // t = 10
    sleep(Duration::from_secs(2)).await;
    manager.flush().await.unwrap();
    let view = manager.snapshot();
    assert!((6..=7).contains(&view.elapsed_seconds), "{view:?}");
    assert_eq!(view.run_state, WorkoutState::Running);

    manager.end().unwrap();
    manager.flush().await.unwrap();
    assert_eq!(manager.snapshot(), ViewState::default());
}

#[tokio::test(start_paused = true)]
async fn elapsed_is_sum_of_running_segments() {
    let service = MockSensorService::new();
    let manager = spawn_manager(&service);
    let running = [Duration::from_millis(2_300), Duration::from_millis(4_100), Duration::from_millis(1_700)];

    manager.start().unwrap();
    manager.flush().await.unwrap();
    for (i, segment) in running.iter().enumerate() {
        if i > 0 {
            manager.resume().unwrap();
            manager.flush().await.unwrap();
        }
        sleep(*segment).await;
        manager.pause().unwrap();
        manager.flush().await.unwrap();
        sleep(Duration::from_secs(10)).await;
    }

    let total: Duration = running.iter().sum();
    assert_eq!(manager.snapshot().elapsed_seconds, total.as_secs());

    manager.end().unwrap();
    manager.flush().await.unwrap();
    assert_eq!(manager.snapshot().elapsed_seconds, 0);
}

#[tokio::test(start_paused = true)]
async fn nothing_is_published_while_paused() {
    let service = MockSensorService::new();
    let manager = spawn_manager(&service);
    let mut view = manager.subscribe();

    manager.start().unwrap();
    sleep(Duration::from_millis(2_500)).await;
    manager.pause().unwrap();
    manager.flush().await.unwrap();
    view.borrow_and_update();

    sleep(Duration::from_secs(30)).await;
    manager.flush().await.unwrap();
    assert!(!view.has_changed().unwrap());

    manager.resume().unwrap();
    sleep(Duration::from_secs(1)).await;
    manager.flush().await.unwrap();
    assert!(view.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn nothing_is_published_while_idle() {
    let service = MockSensorService::new();
    let manager = spawn_manager(&service);
    let mut view = manager.subscribe();

    manager.start().unwrap();
    sleep(Duration::from_secs(2)).await;
    manager.end().unwrap();
    manager.flush().await.unwrap();
    view.borrow_and_update();

    sleep(Duration::from_secs(30)).await;
    manager.flush().await.unwrap();
    assert!(!view.has_changed().unwrap());
    assert_eq!(manager.snapshot(), ViewState::default());
}

#[tokio::test(start_paused = true)]
async fn end_always_resets_view() {
    for setup in 0..3 {
        let service = MockSensorService::new();
        let manager = spawn_manager(&service);
        if setup >= 1 {
            manager.start().unwrap();
            manager.flush().await.unwrap();
            service.emit_heart_rate(140.0);
            sleep(Duration::from_secs(3)).await;
        }
        if setup == 2 {
            manager.pause().unwrap();
        }
        manager.end().unwrap();
        manager.flush().await.unwrap();

        let view = manager.snapshot();
        assert_eq!(view.run_state, WorkoutState::Idle, "setup {setup}");
        assert_eq!(view.heart_rate, 0, "setup {setup}");
        assert_eq!(view.elapsed_time_text, "", "setup {setup}");
    }
}

#[tokio::test(start_paused = true)]
async fn last_heart_rate_wins() {
    let service = MockSensorService::new();
    let manager = spawn_manager(&service);
    manager.start().unwrap();
    manager.flush().await.unwrap();

    service.emit_heart_rate(72.0);
    service.emit_heart_rate(75.0);
    manager.flush().await.unwrap();
    assert_eq!(manager.snapshot().heart_rate, 75);
}

#[tokio::test(start_paused = true)]
async fn samples_from_another_thread_are_applied() {
    let service = MockSensorService::new();
    let manager = spawn_manager(&service);
    manager.start().unwrap();
    manager.flush().await.unwrap();

    let sink = service.last_sink().unwrap();
    std::thread::spawn(move || {
        for bpm in [90.0, 95.0, 101.0] {
            sink.collected(vec![heather::service::Statistics::heart_rate(
                bpm,
                chrono::Utc::now(),
            )]);
        }
    })
    .join()
    .unwrap();

    manager.flush().await.unwrap();
    assert_eq!(manager.snapshot().heart_rate, 101);
}

#[tokio::test(start_paused = true)]
async fn a_new_workout_starts_from_zero() {
    let service = MockSensorService::new();
    let manager = spawn_manager(&service);

    manager.start().unwrap();
    sleep(Duration::from_secs(4)).await;
    manager.end().unwrap();
    manager.start().unwrap();
    manager.flush().await.unwrap();

    let view = manager.snapshot();
    assert_eq!(view.run_state, WorkoutState::Running);
    assert_eq!(view.elapsed_seconds, 0);
    assert_eq!(service.sessions_opened(), 2);
}
