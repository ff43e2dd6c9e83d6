//! Timer-driven playback through the player event loop (paused tokio clock)

use std::time::Duration;

use tapereplay::{
    Command, CommandOutcome, PlaybackState, PlaybackTransition, Player, SessionOptions,
    SpeedMultiplier, TickOutcome, VirtualTime,
};

// 2025-12-05T09:00:00Z
const NINE: i64 = 1_764_925_200;

const TAPE: &str = "日付,時間,約定値,出来高\n\
    2025/12/05,09:02:00,103,1\n\
    2025/12/05,09:01:30,102,1\n\
    2025/12/05,09:00:30,101,1\n\
    2025/12/05,09:00:00,100,1\n";

const OTHER: &str = "日付,時間,約定値,出来高\n\
    2025/12/05,13:01:00,51,1\n\
    2025/12/05,13:00:00,50,1\n";

fn load(player: &mut Player, text: &str) {
    let outcome = player
        .handle(Command::Load {
            text: text.to_string(),
        })
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::Loaded(_)));
}

#[tokio::test(start_paused = true)]
async fn test_each_tick_advances_by_period_times_speed() {
    let mut player = Player::default();
    load(&mut player, TAPE);
    player.handle(Command::Play).unwrap();

    assert_eq!(player.next_tick().await, Some(TickOutcome::Advanced));
    let now = player.session().current_time().unwrap();
    assert_eq!(now.floor_millis(), NINE * 1000 + 100);

    player.handle(Command::SetSpeed(SpeedMultiplier::X30)).unwrap();
    assert_eq!(player.next_tick().await, Some(TickOutcome::Advanced));
    let now = player.session().current_time().unwrap();
    assert_eq!(now.floor_millis(), NINE * 1000 + 100 + 3_000);
}

#[tokio::test(start_paused = true)]
async fn test_playback_runs_to_end_and_stops() {
    let mut player = Player::new(SessionOptions {
        default_speed: SpeedMultiplier::X60,
        ..SessionOptions::default()
    });
    load(&mut player, TAPE);
    player.handle(Command::TogglePlayback).unwrap();

    let mut advances = 0;
    player.run_until_stopped(|_| advances += 1).await;

    // 120 s of tape at 6 s per tick, then one tick past the end
    assert_eq!(advances, 21);
    assert_eq!(player.session().seek_value(), 100.0);
    assert_eq!(player.session().playback_state(), PlaybackState::Stopped);
    assert_eq!(player.next_tick().await, None);

    // Whole series shown as completed
    assert_eq!(player.session().display_bars().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_pause_stops_ticks() {
    let mut player = Player::default();
    load(&mut player, TAPE);
    player.handle(Command::Play).unwrap();
    player.next_tick().await;

    let outcome = player.handle(Command::TogglePlayback).unwrap();
    assert_eq!(outcome, CommandOutcome::Playback(PlaybackTransition::Stopped));
    let paused_at = player.session().current_time();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(player.next_tick().await, None);
    assert_eq!(player.session().current_time(), paused_at);
}

#[tokio::test(start_paused = true)]
async fn test_resume_ignores_ticks_from_previous_run() {
    let mut player = Player::default();
    load(&mut player, TAPE);
    player.handle(Command::Play).unwrap();
    player.handle(Command::Pause).unwrap();

    // Let the cancelled timer's period pass before resuming
    tokio::time::sleep(Duration::from_millis(250)).await;
    let outcome = player.handle(Command::Play).unwrap();
    assert!(matches!(
        outcome,
        CommandOutcome::Playback(PlaybackTransition::Started { generation: 2 })
    ));

    assert_eq!(player.next_tick().await, Some(TickOutcome::Advanced));
    let now = player.session().current_time().unwrap();
    assert_eq!(now.floor_millis(), NINE * 1000 + 100);
}

#[tokio::test(start_paused = true)]
async fn test_load_while_playing_stops_playback() {
    let mut player = Player::default();
    load(&mut player, TAPE);
    player.handle(Command::Play).unwrap();
    player.next_tick().await;

    load(&mut player, OTHER);
    assert!(!player.is_playing());
    assert_eq!(player.next_tick().await, None);
    assert_eq!(
        player.session().current_time(),
        Some(VirtualTime::from_secs(NINE + 4 * 3600))
    );
}

#[tokio::test(start_paused = true)]
async fn test_switching_files_mid_playback() {
    let mut player = Player::default();
    player
        .handle(Command::AddFile {
            name: "morning".to_string(),
            text: TAPE.to_string(),
        })
        .unwrap();
    player.handle(Command::Seek(50.0)).unwrap();
    player
        .handle(Command::AddFile {
            name: "afternoon".to_string(),
            text: OTHER.to_string(),
        })
        .unwrap();
    assert_eq!(player.library().active_name(), Some("afternoon"));

    player.handle(Command::Play).unwrap();
    player.next_tick().await;
    let outcome = player
        .handle(Command::SelectFile {
            name: "morning".to_string(),
        })
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Selected(true));
    assert!(!player.is_playing());
    assert_eq!(player.session().seek_value(), 50.0);

    player
        .handle(Command::SelectFile {
            name: "afternoon".to_string(),
        })
        .unwrap();
    let resumed = player.session().current_time().unwrap();
    assert_eq!(resumed.floor_millis(), (NINE + 4 * 3600) * 1000 + 100);
}

#[tokio::test(start_paused = true)]
async fn test_play_without_data_is_unavailable() {
    let mut player = Player::default();
    let outcome = player.handle(Command::TogglePlayback).unwrap();
    assert_eq!(
        outcome,
        CommandOutcome::Playback(PlaybackTransition::Unavailable)
    );
    assert_eq!(player.next_tick().await, None);
}

fn add_file(player: &mut Player, name: &str, text: &str) {
    player
        .handle(Command::AddFile {
            name: name.to_string(),
            text: text.to_string(),
        })
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_pasted_tape_detaches_library() {
    let mut player = Player::default();
    add_file(&mut player, "a", TAPE);
    load(&mut player, OTHER);
    assert_eq!(player.library().active_name(), None);

    let outcome = player
        .handle(Command::RemoveFile {
            name: "a".to_string(),
        })
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Removed(true));
    assert!(player.session().is_loaded());
    assert_eq!(player.session().bars()[0].open, 50.0);
}

#[tokio::test(start_paused = true)]
async fn test_pasted_tape_position_stays_out_of_files() {
    let mut player = Player::default();
    add_file(&mut player, "a", TAPE);
    add_file(&mut player, "b", OTHER);
    player
        .handle(Command::SelectFile {
            name: "a".to_string(),
        })
        .unwrap();

    load(&mut player, OTHER);
    player.handle(Command::Seek(70.0)).unwrap();
    for name in ["b", "a"] {
        player
            .handle(Command::SelectFile {
                name: name.to_string(),
            })
            .unwrap();
    }
    assert_eq!(player.session().seek_value(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_paste_keeps_file_attached() {
    let mut player = Player::default();
    add_file(&mut player, "a", TAPE);
    let failed = player.handle(Command::Load {
        text: "日付,時間,約定値,出来高\n".to_string(),
    });
    assert!(failed.is_err());
    assert_eq!(player.library().active_name(), Some("a"));
    assert_eq!(player.session().bars()[0].open, 100.0);
}
