use mockall::predicate::eq;
use pretty_assertions::assert_eq;
use test_case::test_case;
use tokio_test::assert_ok;

use ashema::commands::music::utils::auto_pause::{PolicyAction, VoiceStateChange};

use crate::common::fixtures::*;
use crate::common::mocks::{MockCatalog, MockRelay};
use crate::common::connected_manager;

fn deafen_toggle(was: bool, now: bool) -> VoiceStateChange {
    VoiceStateChange {
        guild_id: GUILD,
        user_id: USER,
        is_bot: false,
        channel_id: Some(CHANNEL),
        was_self_deaf: Some(was),
        self_deaf: now,
    }
}

#[tokio::test]
async fn sole_listener_deafening_pauses_once() {
    let mut relay = MockRelay::new();
    relay.expect_pause().with(eq(GUILD)).times(1).returning(|_| Ok(()));
    relay.expect_resume().never();

    let (manager, _) = connected_manager(relay, MockCatalog::new());

    let action = assert_ok!(
        manager
            .handle_voice_state_change(BOT, Some(CHANNEL), &deafen_toggle(false, true), 1)
            .await
    );
    assert_eq!(action, Some(PolicyAction::Pause));
}

#[tokio::test]
async fn sole_listener_undeafening_resumes_once() {
    let mut relay = MockRelay::new();
    relay.expect_resume().with(eq(GUILD)).times(1).returning(|_| Ok(()));
    relay.expect_pause().never();

    let (manager, _) = connected_manager(relay, MockCatalog::new());

    let action = assert_ok!(
        manager
            .handle_voice_state_change(BOT, Some(CHANNEL), &deafen_toggle(true, false), 1)
            .await
    );
    assert_eq!(action, Some(PolicyAction::Resume));
}

#[test_case(2 ; "two listeners")]
#[test_case(3 ; "three listeners")]
#[tokio::test]
async fn shared_channels_are_left_alone(listeners: usize) {
    let mut relay = MockRelay::new();
    relay.expect_pause().never();
    relay.expect_resume().never();

    let (manager, _) = connected_manager(relay, MockCatalog::new());

    for change in [deafen_toggle(false, true), deafen_toggle(true, false)] {
        let action = assert_ok!(
            manager
                .handle_voice_state_change(BOT, Some(CHANNEL), &change, listeners)
                .await
        );
        assert_eq!(action, None);
    }
}

#[tokio::test]
async fn listener_outside_the_bots_channel_is_ignored() {
    let mut relay = MockRelay::new();
    relay.expect_pause().never();

    let (manager, _) = connected_manager(relay, MockCatalog::new());
    let change = VoiceStateChange {
        channel_id: Some(OTHER_CHANNEL),
        ..deafen_toggle(false, true)
    };

    let action = assert_ok!(
        manager
            .handle_voice_state_change(BOT, Some(CHANNEL), &change, 1)
            .await
    );
    assert_eq!(action, None);
}
