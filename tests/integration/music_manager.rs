use assert_matches::assert_matches;
use mockall::predicate::{always, eq};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tokio_test::{assert_err, assert_ok};

use ashema::commands::music::audio_sources::{
    GuildQueueState, PlaybackState, RelayError, youtube::CatalogError,
};
use ashema::commands::music::utils::music_manager::{Invocation, MusicError, MusicOutcome};
use ashema::commands::music::utils::session_tracker::ConnectionState;

use crate::common::fixtures::*;
use crate::common::mocks::{MockCatalog, MockRelay, expect_teardown};
use crate::common::{connected_manager, manager};
use crate::test_utils;

#[rstest]
#[tokio::test]
async fn join_connects_and_opens_a_session(invocation: Invocation) {
    test_utils::init();
    let mut relay = MockRelay::new();
    relay
        .expect_join()
        .with(eq(GUILD), eq(CHANNEL))
        .times(1)
        .returning(|_, _| Ok(connection()));
    relay
        .expect_create_session()
        .with(eq(connection()))
        .times(1)
        .returning(|_| Ok(()));

    let (manager, sessions) = manager(relay, MockCatalog::new());

    let outcome = assert_ok!(manager.join(&invocation).await);
    assert_eq!(outcome, MusicOutcome::Joined(CHANNEL));
    assert!(sessions.is_connected(GUILD));
}

#[tokio::test]
async fn join_requires_the_caller_in_voice() {
    let (manager, sessions) = manager(MockRelay::new(), MockCatalog::new());
    let invocation = Invocation {
        guild_id: GUILD,
        user_id: USER,
        voice_channel: None,
    };

    assert_matches!(
        manager.join(&invocation).await,
        Err(MusicError::UserNotInVoiceChannel)
    );
    assert!(sessions.is_empty());
}

#[rstest]
#[tokio::test]
async fn join_to_the_current_channel_does_no_relay_work(invocation: Invocation) {
    let (manager, _) = connected_manager(MockRelay::new(), MockCatalog::new());

    assert_eq!(
        assert_ok!(manager.join(&invocation).await),
        MusicOutcome::AlreadyJoined(CHANNEL)
    );
}

#[tokio::test]
async fn join_elsewhere_is_rejected_and_keeps_the_session() {
    let (manager, sessions) = connected_manager(MockRelay::new(), MockCatalog::new());
    let invocation = Invocation {
        guild_id: GUILD,
        user_id: USER,
        voice_channel: Some(OTHER_CHANNEL),
    };

    assert_matches!(
        manager.join(&invocation).await,
        Err(MusicError::AlreadyConnectedElsewhere(channel)) if channel == CHANNEL
    );
    assert_eq!(sessions.get(GUILD).and_then(|s| s.channel_id()), Some(CHANNEL));
}

#[rstest]
#[tokio::test]
async fn join_timeout_leaves_the_guild_disconnected(invocation: Invocation) {
    let mut relay = MockRelay::new();
    relay
        .expect_join()
        .times(1)
        .returning(|_, _| Err(RelayError::ConnectionTimeout));
    relay.expect_create_session().never();

    let (manager, sessions) = manager(relay, MockCatalog::new());

    assert_matches!(manager.join(&invocation).await, Err(MusicError::ConnectionTimeout));
    assert_eq!(sessions.state(GUILD), None);
}

#[rstest]
#[tokio::test]
async fn failed_session_setup_leaves_the_channel(invocation: Invocation) {
    let mut relay = MockRelay::new();
    relay.expect_join().returning(|_, _| Ok(connection()));
    relay
        .expect_create_session()
        .returning(|_| Err(RelayError::JoinFailed("no node".into())));
    relay
        .expect_leave()
        .with(eq(GUILD))
        .times(1)
        .returning(|_| Ok(()));

    let (manager, sessions) = manager(relay, MockCatalog::new());

    assert_matches!(
        manager.join(&invocation).await,
        Err(MusicError::Relay(RelayError::JoinFailed(_)))
    );
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn leave_runs_all_four_teardown_steps_once() {
    let mut relay = MockRelay::new();
    expect_teardown(&mut relay);

    let (manager, sessions) = connected_manager(relay, MockCatalog::new());

    assert_eq!(
        assert_ok!(manager.leave(GUILD).await),
        MusicOutcome::Left(Some(CHANNEL))
    );
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn leave_keeps_tearing_down_after_a_failure() {
    let mut relay = MockRelay::new();
    relay
        .expect_destroy_session()
        .times(1)
        .returning(|_| Err(RelayError::Playback("session gone".into())));
    relay.expect_leave().times(1).returning(|_| Ok(()));
    relay.expect_remove_guild_state().times(1).returning(|_| Ok(()));
    relay
        .expect_remove_guild_from_loops()
        .times(1)
        .returning(|_| Err(RelayError::Playback("loop gone".into())));

    let (manager, sessions) = connected_manager(relay, MockCatalog::new());

    let err = assert_err!(manager.leave(GUILD).await);
    assert_matches!(err, MusicError::Relay(RelayError::Playback(reason)) if reason == "session gone");
    assert!(sessions.is_empty());
}

#[rstest]
#[case("")]
#[case("   ")]
#[tokio::test]
async fn play_rejects_blank_queries(invocation: Invocation, #[case] query: &str) {
    let (manager, _) = connected_manager(MockRelay::new(), MockCatalog::new());

    assert_matches!(
        manager.play(&invocation, query).await,
        Err(MusicError::EmptyQuery)
    );
}

#[rstest]
#[tokio::test]
async fn play_auto_joins_and_enqueues_the_top_result(invocation: Invocation) {
    let best = track();
    let runner_up = track();
    let expected = best.clone();

    let mut relay = MockRelay::new();
    let mut seq = mockall::Sequence::new();
    relay
        .expect_join()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(connection()));
    relay
        .expect_create_session()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    relay
        .expect_search_tracks()
        .withf(|query| query == "lofi beats")
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |_| Ok(vec![best.clone(), runner_up.clone()]));
    relay
        .expect_play()
        .with(eq(GUILD), eq(expected.clone()), eq(USER), eq(true))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _, _| Ok(()));

    let (manager, sessions) = manager(relay, MockCatalog::new());

    assert_eq!(
        assert_ok!(manager.play(&invocation, "  lofi beats ").await),
        MusicOutcome::Queued(expected)
    );
    assert!(sessions.is_connected(GUILD));
}

#[rstest]
#[tokio::test]
async fn play_without_results_enqueues_nothing(invocation: Invocation) {
    let mut relay = MockRelay::new();
    relay
        .expect_search_tracks()
        .times(1)
        .returning(|_| Ok(Vec::new()));
    relay.expect_play().never();

    let (manager, _) = connected_manager(relay, MockCatalog::new());

    let err = assert_err!(manager.play(&invocation, "zzzz no such song").await);
    assert_eq!(
        err.to_string(),
        "Could not find any video of the search query: zzzz no such song"
    );
}

#[rstest]
#[tokio::test]
async fn play_while_a_join_is_in_flight_does_not_search(invocation: Invocation) {
    let mut relay = MockRelay::new();
    relay.expect_join().never();
    relay.expect_search_tracks().never();
    relay.expect_play().never();

    let (manager, sessions) = manager(relay, MockCatalog::new());
    assert_ok!(sessions.begin_connecting(GUILD, CHANNEL));

    assert_matches!(
        manager.play(&invocation, "lofi beats").await,
        Err(MusicError::JoinInProgress)
    );
    assert_matches!(sessions.state(GUILD), Some(ConnectionState::Connecting { .. }));
}

#[rstest]
#[tokio::test]
async fn play_without_relay_session_asks_for_join(invocation: Invocation) {
    let mut relay = MockRelay::new();
    relay
        .expect_search_tracks()
        .returning(|_| Ok(vec![track()]));
    relay
        .expect_play()
        .times(1)
        .returning(|_, _, _, _| Err(RelayError::NoSessionPresent));

    let (manager, _) = connected_manager(relay, MockCatalog::new());

    let err = assert_err!(manager.play(&invocation, "anything").await);
    assert_matches!(err, MusicError::NoSessionPresent);
    assert!(err.to_string().contains("/join"));
}

#[tokio::test]
async fn stop_halts_and_clears_the_queue() {
    let mut relay = MockRelay::new();
    let mut seq = mockall::Sequence::new();
    relay
        .expect_stop()
        .with(eq(GUILD))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    relay
        .expect_clear_queue()
        .with(eq(GUILD))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let (manager, _) = connected_manager(relay, MockCatalog::new());

    assert_eq!(assert_ok!(manager.stop(GUILD).await), MusicOutcome::Stopped);
}

#[tokio::test]
async fn skip_with_nothing_playing_makes_no_further_calls() {
    let mut relay = MockRelay::new();
    relay.expect_skip().times(1).returning(|_| Ok(None));
    relay.expect_queue_state().never();
    relay.expect_stop().never();

    let (manager, _) = connected_manager(relay, MockCatalog::new());

    assert_eq!(assert_ok!(manager.skip(GUILD).await), MusicOutcome::NothingToSkip);
}

#[tokio::test]
async fn skip_to_an_empty_queue_stops_playback() {
    let skipped = queued(track());
    let returned = skipped.clone();

    let mut relay = MockRelay::new();
    relay
        .expect_skip()
        .times(1)
        .returning(move |_| Ok(Some(returned.clone())));
    relay
        .expect_queue_state()
        .times(1)
        .returning(|_| Ok(GuildQueueState::default()));
    relay.expect_stop().with(eq(GUILD)).times(1).returning(|_| Ok(()));

    let (manager, _) = connected_manager(relay, MockCatalog::new());

    assert_eq!(
        assert_ok!(manager.skip(GUILD).await),
        MusicOutcome::Skipped(skipped)
    );
}

#[tokio::test]
async fn skip_onto_the_next_track_keeps_playing() {
    let skipped = queued(track());
    let returned = skipped.clone();
    let next = queued(track());

    let mut relay = MockRelay::new();
    relay
        .expect_skip()
        .returning(move |_| Ok(Some(returned.clone())));
    relay.expect_queue_state().times(1).returning(move |_| {
        Ok(GuildQueueState {
            now_playing: Some(next.clone()),
            queue: Vec::new(),
            playback: PlaybackState::Playing,
        })
    });
    relay.expect_stop().never();

    let (manager, _) = connected_manager(relay, MockCatalog::new());

    assert_matches!(manager.skip(GUILD).await, Ok(MusicOutcome::Skipped(_)));
}

#[tokio::test]
async fn pause_and_resume_delegate() {
    let mut relay = MockRelay::new();
    relay.expect_pause().with(eq(GUILD)).times(1).returning(|_| Ok(()));
    relay.expect_resume().with(eq(GUILD)).times(1).returning(|_| Ok(()));

    let (manager, _) = connected_manager(relay, MockCatalog::new());

    assert_eq!(assert_ok!(manager.pause(GUILD).await), MusicOutcome::Paused);
    assert_eq!(assert_ok!(manager.resume(GUILD).await), MusicOutcome::Resumed);
}

#[tokio::test]
async fn queue_reports_nothing_playing_when_empty() {
    let mut relay = MockRelay::new();
    relay
        .expect_queue_state()
        .returning(|_| Ok(GuildQueueState::default()));

    let (manager, _) = connected_manager(relay, MockCatalog::new());

    assert_eq!(assert_ok!(manager.queue(GUILD).await), MusicOutcome::NothingPlaying);
    assert_eq!(
        assert_ok!(manager.now_playing(GUILD).await),
        MusicOutcome::NothingPlaying
    );
}

#[tokio::test]
async fn queue_shows_current_and_upcoming() {
    let current = queued(track());
    let upcoming: Vec<_> = (0..12).map(|_| queued(track())).collect();
    let state = GuildQueueState {
        now_playing: Some(current.clone()),
        queue: upcoming.clone(),
        playback: PlaybackState::Playing,
    };

    let mut relay = MockRelay::new();
    relay
        .expect_queue_state()
        .times(2)
        .returning(move |_| Ok(state.clone()));

    let (manager, _) = connected_manager(relay, MockCatalog::new());

    let view = assert_matches!(manager.queue(GUILD).await, Ok(MusicOutcome::Queue(view)) => view);
    assert_eq!(view.now_playing.map(|line| line.title), Some(current.track.title.clone()));
    assert_eq!(view.upcoming.len(), 10);
    assert_eq!(view.hidden, 2);
    assert_eq!(view.upcoming[0].title, upcoming[0].track.title);

    assert_eq!(
        assert_ok!(manager.now_playing(GUILD).await),
        MusicOutcome::NowPlaying(current, PlaybackState::Playing)
    );
}

fn paged_catalog(total: usize) -> MockCatalog {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_list_playlist_items()
        .withf(|playlist, _, page_size| playlist == PLAYLIST && *page_size == 50)
        .returning(move |_, token, _| Ok(playlist_page(page_number(token.as_deref()), 50, total)));
    catalog
}

#[rstest]
#[tokio::test]
async fn chill_plays_exactly_one_video_from_the_playlist(invocation: Invocation) {
    let mut relay = MockRelay::new();
    relay
        .expect_search_tracks()
        .withf(|query| {
            query
                .strip_prefix("https://www.youtube.com/watch?v=v")
                .and_then(|index| index.parse::<usize>().ok())
                .is_some_and(|index| index < 120)
        })
        .times(1)
        .returning(|_| Ok(vec![track()]));
    relay
        .expect_play()
        .with(eq(GUILD), always(), eq(USER), eq(true))
        .times(1)
        .returning(|_, _, _, _| Ok(()));

    let (manager, _) = connected_manager(relay, paged_catalog(120));

    assert_matches!(manager.chill(&invocation).await, Ok(MusicOutcome::Queued(_)));
}

#[rstest]
#[tokio::test]
async fn chill_with_an_empty_playlist_fails(invocation: Invocation) {
    let mut relay = MockRelay::new();
    relay.expect_search_tracks().never();
    relay.expect_play().never();

    let (manager, _) = connected_manager(relay, paged_catalog(0));

    assert_matches!(manager.chill(&invocation).await, Err(MusicError::EmptyPlaylist));
}

#[tokio::test]
async fn chill_outside_voice_fails_before_touching_the_catalog() {
    let mut catalog = MockCatalog::new();
    catalog.expect_list_playlist_items().never();
    let mut relay = MockRelay::new();
    relay.expect_join().never();
    relay.expect_search_tracks().never();

    let (manager, sessions) = manager(relay, catalog);
    let invocation = Invocation {
        guild_id: GUILD,
        user_id: USER,
        voice_channel: None,
    };

    assert_matches!(
        manager.chill(&invocation).await,
        Err(MusicError::UserNotInVoiceChannel)
    );
    assert!(sessions.is_empty());
}

#[rstest]
#[tokio::test]
async fn chill_while_a_join_is_in_flight_does_not_page(invocation: Invocation) {
    let mut catalog = MockCatalog::new();
    catalog.expect_list_playlist_items().never();

    let (manager, sessions) = manager(MockRelay::new(), catalog);
    assert_ok!(sessions.begin_connecting(GUILD, CHANNEL));

    assert_matches!(manager.chill(&invocation).await, Err(MusicError::JoinInProgress));
}

#[rstest]
#[case(0, "v0")]
#[case(49, "v49")]
#[case(50, "v50")]
#[case(119, "v119")]
#[tokio::test]
async fn curated_lookup_follows_page_tokens(#[case] index: usize, #[case] expected: &str) {
    let (manager, _) = manager(MockRelay::new(), paged_catalog(120));

    let video = assert_ok!(manager.curated_video_at(playlist_page(0, 50, 120), index).await);
    assert_eq!(video, expected);
}

#[tokio::test]
async fn curated_lookup_reports_a_short_playlist() {
    let (manager, _) = manager(MockRelay::new(), MockCatalog::new());
    // Claims more videos than it actually holds.
    let short = playlist_page(0, 50, 3);

    assert_matches!(
        manager.curated_video_at(short, 7).await,
        Err(MusicError::Catalog(CatalogError::PlaylistExhausted { index: 7 }))
    );
}

#[tokio::test]
async fn collaborator_failures_stay_generic() {
    let mut relay = MockRelay::new();
    relay
        .expect_pause()
        .returning(|_| Err(RelayError::Playback("driver gone".into())));

    let (manager, sessions) = connected_manager(relay, MockCatalog::new());

    let err = assert_err!(manager.pause(GUILD).await);
    assert!(!err.is_user_facing());
    assert_matches!(sessions.state(GUILD), Some(ConnectionState::Connected { .. }));
}
