// tests/loop_scenarios.rs
mod common;

use common::{ms, providers, ManualClock, RecordingInput, RecordingWindows, ScriptedPerception};
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use trailblazer::notify::WatchdogNotifier;
use trailblazer::{
    Clock, DetectionLoop, EngineConfig, LoopState, Providers, Result, SessionControls, SessionOutcome, StatusEvent, StatusSink,
};
use trailblazer_core::ScreenPoint;

const ICON: ScreenPoint = ScreenPoint { x: 400.0, y: 80.0 };
const AVATAR: ScreenPoint = ScreenPoint { x: 400.0, y: 300.0 };

fn detection_loop(
    config: EngineConfig,
    perception: &ScriptedPerception,
    input: &RecordingInput,
    clock: &ManualClock,
) -> (DetectionLoop, Receiver<StatusEvent>) {
    detection_loop_with(config, perception, providers(input, clock))
}

fn detection_loop_with(
    config: EngineConfig,
    perception: &ScriptedPerception,
    providers: Providers,
) -> (DetectionLoop, Receiver<StatusEvent>) {
    controlled_loop(config, perception, providers, Arc::new(SessionControls::new()))
}

fn controlled_loop(
    config: EngineConfig,
    perception: &ScriptedPerception,
    providers: Providers,
    controls: Arc<SessionControls>,
) -> (DetectionLoop, Receiver<StatusEvent>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let lp = DetectionLoop::new(
        Arc::new(config),
        Box::new(perception.clone()),
        providers,
        controls,
        StatusSink::new(tx),
    )
    .with_rng_seed(7);
    (lp, rx)
}

fn log_lines(rx: &Receiver<StatusEvent>) -> Vec<String> {
    rx.try_iter()
        .filter_map(|e| match e {
            StatusEvent::Log(line) => Some(line),
            StatusEvent::Finished(_) => None,
        })
        .collect()
}

#[test]
fn test_absent_icon_never_clicks() -> Result<()> {
    let clock = ManualClock::new();
    let input = RecordingInput::new();
    let perception = ScriptedPerception::new(clock.clone());
    let (mut lp, rx) = detection_loop(EngineConfig::default(), &perception, &input, &clock);

    for _ in 0..5 {
        assert_eq!(lp.step()?, LoopState::SearchingIcon);
    }

    assert!(input.events().is_empty());
    assert_eq!(perception.icon_calls(), 5);
    assert_eq!(perception.avatar_calls(), 0);
    // Five search intervals of 0.6 s
    assert!(clock.now() > ms(2990) && clock.now() <= ms(3000));

    let lines = log_lines(&rx);
    assert_eq!(lines.iter().filter(|l| l.contains("Searching")).count(), 1);
    Ok(())
}

#[test]
fn test_icon_blip_clicks_once_then_searches_again() -> Result<()> {
    let clock = ManualClock::new();
    let input = RecordingInput::new();
    let perception = ScriptedPerception::new(clock.clone())
        .with_icon(vec![Some(ICON), Some(ICON)], None)
        .with_avatar(vec![], Some(AVATAR));
    let (mut lp, rx) = detection_loop(EngineConfig::default(), &perception, &input, &clock);

    assert_eq!(lp.step()?, LoopState::IconFound { attempt: 0 });
    assert_eq!(lp.step()?, LoopState::TrackingAttempt { icon: ICON, attempt: 0 });

    let before = clock.now();
    assert_eq!(lp.step()?, LoopState::IconFound { attempt: 1 });
    // The whole sampler timeout was spent waiting for the beacon
    assert!(clock.now() - before >= ms(3000));
    assert!(perception.beacon_calls() > 0);

    assert_eq!(lp.step()?, LoopState::SearchingIcon);

    let clicks = input.clicks();
    assert_eq!(clicks.len(), 1);
    assert!((clicks[0].x - 400).abs() <= 10 && (clicks[0].y - 80).abs() <= 10);
    assert_eq!(input.presses(), 0);

    let lines = log_lines(&rx);
    assert!(lines.iter().any(|l| l.contains("No stable beacon bearing")));
    assert!(lines.iter().any(|l| l.contains("Icon vanished")));
    Ok(())
}

#[test]
fn test_attempt_budget_returns_to_search() -> Result<()> {
    let clock = ManualClock::new();
    let input = RecordingInput::new();
    let perception = ScriptedPerception::new(clock.clone()).with_icon(vec![], Some(ICON));
    let mut config = EngineConfig::default();
    config.timing.max_arrow_attempts = 2;
    let (mut lp, _rx) = detection_loop(config, &perception, &input, &clock);

    let mut states = Vec::new();
    for _ in 0..6 {
        states.push(lp.step()?);
    }

    assert_eq!(
        states,
        vec![
            LoopState::IconFound { attempt: 0 },
            LoopState::TrackingAttempt { icon: ICON, attempt: 0 },
            LoopState::IconFound { attempt: 1 },
            LoopState::TrackingAttempt { icon: ICON, attempt: 1 },
            LoopState::IconFound { attempt: 2 },
            LoopState::SearchingIcon,
        ]
    );
    // Avatar never found: only the preventive clicks
    assert_eq!(input.clicks().len(), 2);
    Ok(())
}

#[test]
fn test_failed_attempt_is_absorbed() -> Result<()> {
    let clock = ManualClock::new();
    let input = RecordingInput::new();
    let perception = ScriptedPerception::new(clock.clone())
        .with_icon(vec![], Some(ICON))
        .with_failing_avatar();
    let (mut lp, rx) = detection_loop(EngineConfig::default(), &perception, &input, &clock);

    lp.step()?;
    lp.step()?;
    let result = lp.step();
    assert!(result.is_err());
    lp.absorb(result);

    assert_eq!(lp.state(), LoopState::IconFound { attempt: 1 });
    assert!(log_lines(&rx).iter().any(|l| l.contains("Cycle failed")));
    Ok(())
}

#[test]
fn test_steady_beacon_navigates_and_confirms() -> Result<()> {
    let clock = ManualClock::new();
    let input = RecordingInput::new();
    let perception = ScriptedPerception::new(clock.clone())
        .with_icon(vec![], Some(ICON))
        .with_avatar(vec![], Some(AVATAR))
        .with_beacon(|_| Some(90.0));
    let (mut lp, rx) = detection_loop(EngineConfig::default(), &perception, &input, &clock);

    lp.step()?;
    lp.step()?;
    assert_eq!(lp.step()?, LoopState::IconFound { attempt: 1 });

    // Preventive click plus the confirming click after moving
    assert_eq!(input.clicks().len(), 2);
    assert!(input.presses() >= 1);
    assert_eq!(input.presses(), input.releases());
    // Drags head right of the avatar
    assert!(input.moves().iter().any(|p| p.x == 580 && p.y == 300));

    let lines = log_lines(&rx);
    assert!(lines.iter().any(|l| l.contains("(right)")));
    assert!(lines.iter().any(|l| l.contains("Navigation ended")));
    Ok(())
}

#[test]
fn test_stop_during_drag_skips_confirming_click() -> Result<()> {
    let clock = ManualClock::new();
    let input = RecordingInput::new();
    let controls = Arc::new(SessionControls::new());
    let stopper = controls.clone();
    let watcher = input.clone();
    let perception = ScriptedPerception::new(clock.clone())
        .with_icon(vec![], Some(ICON))
        .with_avatar(vec![], Some(AVATAR))
        .with_beacon(move |_| {
            // Stop arrives while the first drag is held
            if watcher.presses() > 0 {
                stopper.stop();
            }
            Some(90.0)
        });
    let (mut lp, rx) = controlled_loop(
        EngineConfig::default(),
        &perception,
        providers(&input, &clock),
        controls,
    );

    lp.step()?;
    lp.step()?;
    assert_eq!(lp.step()?, LoopState::IconFound { attempt: 1 });
    let stopped_at = clock.now();

    // Only the preventive click; the drag was released
    assert_eq!(input.clicks().len(), 1);
    assert_eq!(input.presses(), 1);
    assert!(!input.is_held());
    assert!(!log_lines(&rx).iter().any(|l| l.contains("Clicking the icon again")));

    // The loop exits without another step
    assert_eq!(lp.run(), SessionOutcome::Stopped);
    assert_eq!(input.clicks().len(), 1);
    assert_eq!(clock.now(), stopped_at);
    Ok(())
}

#[test]
fn test_stop_while_sampling_ends_attempt() -> Result<()> {
    let clock = ManualClock::new();
    let input = RecordingInput::new();
    let controls = Arc::new(SessionControls::new());
    let stopper = controls.clone();
    let perception = ScriptedPerception::new(clock.clone())
        .with_icon(vec![], Some(ICON))
        .with_avatar(vec![], Some(AVATAR))
        .with_beacon(move |_| {
            stopper.stop();
            Some(90.0)
        });
    let (mut lp, _rx) = controlled_loop(
        EngineConfig::default(),
        &perception,
        providers(&input, &clock),
        controls,
    );

    lp.step()?;
    lp.step()?;
    let before = clock.now();
    assert_eq!(lp.step()?, LoopState::IconFound { attempt: 1 });

    assert_eq!(input.clicks().len(), 1);
    assert_eq!(input.presses(), 0);
    // The preventive pause and one sampler poll, no arrow search pause
    let config = EngineConfig::default();
    assert!(clock.now() - before <= config.timing.preventive_click_delay() + config.sampler.poll());
    Ok(())
}

#[test]
fn test_silence_alert_fires_once() -> Result<()> {
    let clock = ManualClock::new();
    let input = RecordingInput::new();
    let perception = ScriptedPerception::new(clock.clone());
    let fired = Arc::new(AtomicU32::new(0));
    let counter = fired.clone();
    let dog = WatchdogNotifier::new(Duration::from_secs(1), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let providers = providers(&input, &clock).with_notifier(Arc::new(dog));
    let (mut lp, _rx) = detection_loop_with(EngineConfig::default(), &perception, providers);

    for _ in 0..5 {
        lp.step()?;
    }
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_window_is_arranged_on_request() {
    let clock = ManualClock::new();
    let input = RecordingInput::new();
    let perception = ScriptedPerception::new(clock.clone());
    let windows = RecordingWindows::new();
    let providers = providers(&input, &clock).with_window_manager(Arc::new(windows.clone()));
    let (lp, rx) = detection_loop_with(EngineConfig::default(), &perception, providers);

    assert!(lp.arrange_window());
    assert_eq!(
        windows.calls(),
        vec!["find Chrome", "activate 7", "move 7 to 0,0 1280x720"]
    );
    assert_eq!(log_lines(&rx).len(), 1);

    let mut config = EngineConfig::default();
    config.window.title_keyword = "Firefox".into();
    let providers = common::providers(&input, &clock).with_window_manager(Arc::new(windows.clone()));
    let (lp, _rx) = detection_loop_with(config, &perception, providers);
    assert!(!lp.arrange_window());
}
