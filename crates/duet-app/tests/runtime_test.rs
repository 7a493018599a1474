//! Runtime orchestration against a scripted driver.
//!
//! The driver replays a fixed script of input events and waits under paused
//! Tokio time, and records every envelope the runtime publishes together with
//! the virtual time it was sent at.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use duet_app::{App, AppEvent, Driver, KeyInput, Runtime, RuntimeConfig, View};
use duet_proto::{ChatEvent, Envelope, PresenceSnapshot, UserId};
use tokio::time::Instant;

#[derive(Debug)]
struct ScriptError(String);

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScriptError: {}", self.0)
    }
}

impl std::error::Error for ScriptError {}

enum Step {
    Event(AppEvent),
    Wait(Duration),
}

#[derive(Default)]
struct Recorded {
    connected_as: Option<UserId>,
    sent: Vec<(Duration, Envelope)>,
    views: Vec<View>,
    closed: bool,
}

struct ScriptedDriver {
    script: VecDeque<Step>,
    deadline: Option<Instant>,
    start: Instant,
    refuse_connect: bool,
    log: Arc<Mutex<Recorded>>,
}

impl ScriptedDriver {
    fn new(script: Vec<Step>) -> (Self, Arc<Mutex<Recorded>>) {
        let log = Arc::new(Mutex::new(Recorded::default()));
        let driver = Self {
            script: script.into(),
            deadline: None,
            start: Instant::now(),
            refuse_connect: false,
            log: Arc::clone(&log),
        };
        (driver, log)
    }
}

impl Driver for ScriptedDriver {
    type Error = ScriptError;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        match self.script.front() {
            Some(Step::Wait(wait)) => {
                let wait = *wait;
                // Keep the deadline across cancellation so a dropped poll
                // resumes the same wait.
                let deadline = *self.deadline.get_or_insert_with(|| Instant::now() + wait);
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
                self.script.pop_front();
                Ok(None)
            },
            Some(Step::Event(_)) => match self.script.pop_front() {
                Some(Step::Event(event)) => Ok(Some(event)),
                _ => Ok(None),
            },
            None => std::future::pending().await,
        }
    }

    async fn connect(&mut self, user: &UserId) -> Result<(), Self::Error> {
        if self.refuse_connect {
            return Err(ScriptError("connection refused".into()));
        }
        self.log.lock().unwrap().connected_as = Some(user.clone());
        Ok(())
    }

    async fn send(&mut self, envelope: Envelope) -> Result<(), Self::Error> {
        let at = self.start.elapsed();
        self.log.lock().unwrap().sent.push((at, envelope));
        Ok(())
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.log.lock().unwrap().views.push(app.view().clone());
        Ok(())
    }

    async fn close(&mut self) {
        self.log.lock().unwrap().closed = true;
    }
}

fn id(s: &str) -> UserId {
    UserId::parse(s).unwrap()
}

fn key(key: KeyInput) -> Step {
    Step::Event(AppEvent::Key(key))
}

fn text(s: &str) -> Vec<Step> {
    s.chars().map(|c| key(KeyInput::Char(c))).collect()
}

/// Sign in as `me`, see `peer` online, and open the conversation.
fn open_conversation(me: &str, peer: &str) -> Vec<Step> {
    let mut steps = text(me);
    steps.push(key(KeyInput::Enter));
    steps.push(Step::Event(AppEvent::PresenceChanged(PresenceSnapshot(vec![id(me), id(peer)]))));
    steps.push(key(KeyInput::Enter));
    steps
}

async fn run(driver: ScriptedDriver) {
    let runtime = Runtime::new(driver, App::new(33), RuntimeConfig::default());
    runtime.run().await.unwrap();
}

fn typing_flags(sent: &[(Duration, Envelope)]) -> Vec<(u64, bool)> {
    sent.iter()
        .filter_map(|(at, envelope)| match envelope {
            Envelope::Typing(typing) => Some((at.as_secs(), typing.is_typing)),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn send_chat_echoes_and_stops_typing() {
    let mut script = open_conversation("alice", "bob");
    script.extend(text("hi"));
    script.push(key(KeyInput::Enter));
    script.push(Step::Wait(Duration::from_secs(10)));
    script.push(key(KeyInput::Interrupt));
    let (driver, log) = ScriptedDriver::new(script);

    run(driver).await;

    let log = log.lock().unwrap();
    assert_eq!(log.connected_as, Some(id("alice")));
    let kinds: Vec<_> = log.sent.iter().map(|(_, e)| e.kind().to_string()).collect();
    assert_eq!(kinds, vec!["typing", "chat", "typing"]);
    assert_eq!(
        log.sent[1].1,
        Envelope::Chat(ChatEvent { to: id("bob"), from: id("alice"), text: "hi".into(), color: 33 })
    );
    // The quiet window never publishes a second false after the send.
    assert_eq!(typing_flags(&log.sent), vec![(0, true), (0, false)]);
    assert!(log.closed);
    assert_eq!(log.views.last(), Some(&View::Exiting { message: "Goodbye".into() }));
}

#[tokio::test(start_paused = true)]
async fn keystroke_burst_publishes_one_true_then_one_false() {
    let mut script = open_conversation("alice", "bob");
    script.push(key(KeyInput::Char('a')));
    script.push(Step::Wait(Duration::from_secs(1)));
    script.push(key(KeyInput::Char('b')));
    script.push(Step::Wait(Duration::from_secs(1)));
    script.push(key(KeyInput::Char('c')));
    script.push(Step::Wait(Duration::from_secs(10)));
    script.push(key(KeyInput::Interrupt));
    let (driver, log) = ScriptedDriver::new(script);

    run(driver).await;

    let log = log.lock().unwrap();
    // Last keystroke at 2s plus the 3s window.
    assert_eq!(typing_flags(&log.sent), vec![(0, true), (5, false)]);
}

#[tokio::test(start_paused = true)]
async fn leaving_conversation_cancels_heartbeat_silently() {
    let mut script = open_conversation("alice", "bob");
    script.extend(text("dra"));
    script.push(key(KeyInput::Esc));
    script.push(Step::Wait(Duration::from_secs(10)));
    script.push(key(KeyInput::Interrupt));
    let (driver, log) = ScriptedDriver::new(script);

    run(driver).await;

    let log = log.lock().unwrap();
    assert_eq!(typing_flags(&log.sent), vec![(0, true)]);
    assert!(log.views.contains(&View::Friends));
}

#[tokio::test(start_paused = true)]
async fn connect_failure_exits_with_error() {
    let mut script = text("alice");
    script.push(key(KeyInput::Enter));
    let (mut driver, log) = ScriptedDriver::new(script);
    driver.refuse_connect = true;
    let start = Instant::now();

    run(driver).await;

    let log = log.lock().unwrap();
    assert!(log.sent.is_empty());
    assert!(log.closed);
    assert!(matches!(
        log.views.last(),
        Some(View::Exiting { message }) if message.contains("connection refused")
    ));
    // Farewell screen lingers for the grace period.
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn relay_disconnect_exits() {
    let mut script = text("alice");
    script.push(key(KeyInput::Enter));
    script.push(Step::Event(AppEvent::Disconnected { reason: None }));
    let (driver, log) = ScriptedDriver::new(script);

    run(driver).await;

    let log = log.lock().unwrap();
    assert!(matches!(log.views.last(), Some(View::Exiting { .. })));
}
