//! Console front-end driven with a scripted transcript.

use std::{sync::Arc, time::Duration};

use wackelberry_core::{BroadcastConfig, ChatId, Position, UserId, UserRecord};
use wackelberry_harness::{ChannelCall, RecordingChannel, ScriptedSource, SimEnv};
use wackelberry_server::{Bot, MemoryStorage, Notice, Reply, UserStorage, run_console};

#[tokio::test]
async fn transcript_from_registration_to_live_share() {
    let admin = UserRecord {
        admin: true,
        pending: false,
        ..UserRecord::pending(UserId::new(1), "Alice")
    };
    let storage = MemoryStorage::with_records([admin]);
    let channel = Arc::new(RecordingChannel::new());
    let config = BroadcastConfig {
        update_interval: Duration::from_secs(15),
        total_duration: Duration::from_secs(30),
        ..BroadcastConfig::default()
    };
    let source = ScriptedSource::positions([
        Position::new(1.0, 1.0, 0),
        Position::new(1.0, 1.0, 0),
        Position::new(1.0, 1.001, 45),
    ]);
    let env = SimEnv::with_seed(3);
    let bot = Bot::build(storage.clone(), Arc::clone(&channel), source, env, config);

    let transcript = b"\
# comment lines and blank lines are skipped

7 Ann Smith /live
7 Ann Smith /register
not-a-user /register
1 Alice /approve 7
7 Ann Smith /live
7 Ann Smith hello
";

    run_console(&bot, channel.as_ref(), &transcript[..]).await.unwrap();
    bot.live().wait_idle().await;

    let ann = ChatId(7);
    let alice = ChatId(1);
    assert_eq!(channel.texts_to(ann), vec![
        Reply::NotApprovedForLive.to_string(),
        Reply::RegistrationSent.to_string(),
        Notice::Welcome.to_string(),
        Reply::LiveStarted { duration: Duration::from_secs(30) }.to_string(),
    ]);
    assert_eq!(channel.texts_to(alice), vec![
        "👤 New registration request from Ann Smith (ID: 7)".to_string(),
        "✅ Approved Ann Smith (ID: 7)".to_string(),
        Reply::Approved { name: "Ann Smith".to_string(), id: UserId::new(7) }.to_string(),
    ]);

    let starts: Vec<_> = channel
        .calls()
        .into_iter()
        .filter(|call| matches!(call, ChannelCall::StartShare { .. }))
        .collect();
    assert_eq!(starts.len(), 1);
    assert_eq!(channel.edits(), vec![Position::new(1.0, 1.001, 45)]);

    let directory = storage.load().unwrap();
    assert!(directory.status(UserId::new(7)).can_share());
}
