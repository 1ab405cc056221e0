// SPDX-License-Identifier: MIT
//
// End-to-end tests: a full event loop on a simulated terminal, driven
// from the test thread through the `Sim` harness.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use lines::{Config, Error, Event, Events, Key, Modifiers, RegisterError, Size};
use pretty_assertions::assert_eq;

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let c = Arc::new(AtomicUsize::new(0));
    (Arc::clone(&c), c)
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[test]
fn resize_listener_renders_then_quit_finalizes() {
    let (mut events, mut sim) = Events::sim(Config::default()).unwrap();
    events.on_resize(|env| {
        env.line(0).set("line 0");
    });

    sim.listen(events).unwrap();
    assert_eq!(sim.line(0), "line 0");
    assert!(sim.is_listening());

    let events = sim.quit_listening().unwrap();
    assert!(!events.is_listening());
    assert_eq!(sim.fini_count(), 1);
}

#[test]
fn quit_rune_terminates_without_other_listeners() {
    let (mut events, mut sim) = Events::sim(Config::default()).unwrap();
    assert_eq!(events.rune('q', |_| {}), Err(RegisterError::Quit));

    let (fired, seen) = counter();
    events.rune('a', move |_| {
        fired.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    sim.listen(events).unwrap();
    sim.fire_rune('q').unwrap();
    let events = sim.join().unwrap();

    assert!(!events.is_listening());
    assert_eq!(seen.load(Ordering::SeqCst), 0);
    assert_eq!(sim.fini_count(), 1);
}

#[test]
fn ctrl_c_quits() {
    let (events, mut sim) = Events::sim(Config::default()).unwrap();
    sim.listen(events).unwrap();
    sim.fire_key(Key::Char('c'), Modifiers::CTRL).unwrap();
    assert!(sim.join().is_ok());
    assert_eq!(sim.fini_count(), 1);
}

#[test]
fn quit_callback_runs_once() {
    let (mut events, mut sim) = Events::sim(Config::default()).unwrap();
    let (quits, seen) = counter();
    events.on_quit(move || {
        quits.fetch_add(1, Ordering::SeqCst);
    });
    sim.listen(events).unwrap();
    let mut events = sim.quit_listening().unwrap();
    events.quit_listening();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(matches!(events.listen(), Err(Error::Finalized)));
}

#[test]
fn env_quit_stops_after_sync() {
    let (mut events, mut sim) = Events::sim(Config::default()).unwrap();
    events
        .rune('x', |env| {
            env.line(2).set("bye");
            env.quit();
        })
        .unwrap();
    sim.listen(events).unwrap();
    sim.fire_rune('x').unwrap();
    sim.join().unwrap();
    assert_eq!(sim.line(2), "bye");
    assert_eq!(sim.fini_count(), 1);
}

#[test]
fn panicking_listener_finalizes_the_loop() {
    let (mut events, mut sim) = Events::sim(Config::default()).unwrap();
    events.rune('p', |_| panic!("listener bug")).unwrap();
    sim.listen(events).unwrap();
    sim.fire_rune('p').unwrap();
    assert!(matches!(sim.join(), Err(Error::ListenerPanicked)));
    assert_eq!(sim.fini_count(), 1);
}

#[test]
fn panicking_quit_callback_still_finalizes() {
    let (mut events, mut sim) = Events::sim(Config::default()).unwrap();
    events.on_quit(|| panic!("quit callback bug"));
    sim.listen(events).unwrap();
    sim.fire_rune('q').unwrap();
    assert!(matches!(sim.join(), Err(Error::ListenerPanicked)));
    assert_eq!(sim.fini_count(), 1);
    assert!(!sim.is_listening());
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

#[test]
fn rune_listener_writes_a_line() {
    let (mut events, mut sim) = Events::sim(Config::default()).unwrap();
    events
        .rune('a', |env| {
            env.line(1).set("pressed a");
        })
        .unwrap();
    sim.listen(events).unwrap();
    sim.fire_rune('a').unwrap();
    assert_eq!(sim.line(1), "pressed a");
}

#[test]
fn rune_and_key_listeners_both_fire() {
    let (mut events, mut sim) = Events::sim(Config::default()).unwrap();
    events
        .rune('\r', |env| {
            env.line(0).set("rune");
        })
        .unwrap();
    events
        .key(Key::Enter, Modifiers::empty(), |env| {
            env.line(1).set("key");
        })
        .unwrap();
    sim.listen(events).unwrap();
    sim.fire_key(Key::Enter, Modifiers::empty()).unwrap();
    assert_eq!(sim.line(0), "rune");
    assert_eq!(sim.line(1), "key");
}

#[test]
fn keyboard_listener_shadows_rune_listener() {
    let (mut events, mut sim) = Events::sim(Config::default()).unwrap();
    let (rune_hits, rune_seen) = counter();
    events
        .rune('a', move |_| {
            rune_hits.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    events.keyboard(|env, rune, key, _| {
        env.line(0).set(format!("{rune} {key:?}"));
    });

    sim.listen(events).unwrap();
    sim.fire_rune('a').unwrap();
    assert_eq!(sim.line(0), "a Rune");
    assert_eq!(rune_seen.load(Ordering::SeqCst), 0);

    sim.update(|env| {
        env.line(0).set("cleared");
    })
    .unwrap();
    assert_eq!(sim.line(0), "cleared");
}

#[test]
fn removing_keyboard_listener_restores_dispatch() {
    let (mut events, mut sim) = Events::sim(Config::default()).unwrap();
    let (rune_hits, rune_seen) = counter();
    events
        .rune('a', move |_| {
            rune_hits.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    events.keyboard(|_, _, _, _| {});
    events.remove_keyboard();

    sim.listen(events).unwrap();
    sim.fire_rune('a').unwrap();
    assert_eq!(rune_seen.load(Ordering::SeqCst), 1);
}

#[test]
fn keyboard_listener_never_sees_quit() {
    let (mut events, mut sim) = Events::sim(Config::default()).unwrap();
    let (hits, seen) = counter();
    events.keyboard(move |_, _, _, _| {
        hits.fetch_add(1, Ordering::SeqCst);
    });
    sim.listen(events).unwrap();
    sim.fire_rune('q').unwrap();
    sim.join().unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[test]
fn env_reports_the_event() {
    let (mut events, mut sim) = Events::sim_with_size(Config::default(), Size::new(40, 10)).unwrap();
    events.on_resize(|env| {
        let text = match env.event() {
            Event::Resize(size) => format!("{}x{}", size.cols, size.rows),
            _ => String::from("?"),
        };
        env.line(0).set(text);
    });
    sim.listen(events).unwrap();
    assert_eq!(sim.line(0), "40x10");

    sim.resize(50, 12).unwrap();
    assert_eq!(sim.line(0), "50x12");
    assert_eq!(sim.size(), Size::new(50, 12));
}

// ─── Updates ─────────────────────────────────────────────────────────────────

#[test]
fn update_from_another_thread() {
    let (events, mut sim) = Events::sim(Config::default()).unwrap();
    let handle = events.handle();
    sim.listen(events).unwrap();

    let before = sim.show_count();
    thread::spawn(move || {
        handle
            .update(|env| {
                env.line(3).set("from a thread");
            })
            .unwrap();
    })
    .join()
    .unwrap();

    // The posted update is ordered before this one.
    sim.update(|_| {}).unwrap();
    assert_eq!(sim.line(3), "from a thread");
    assert!(sim.show_count() > before);
}

#[test]
fn updates_run_in_post_order() {
    let (events, mut sim) = Events::sim(Config::default()).unwrap();
    let handle = events.handle();
    sim.listen(events).unwrap();
    handle.update(|env| {
        env.line(0).set("first");
    })
    .unwrap();
    sim.update(|env| {
        let prev = env.line(0).content().to_owned();
        env.line(0).set(format!("{prev} second"));
    })
    .unwrap();
    assert_eq!(sim.line(0), "first second");
}

#[test]
fn fire_waits_for_its_own_event_behind_a_slow_update() {
    let (mut events, mut sim) = Events::sim(Config::default()).unwrap();
    let handle = events.handle();
    events
        .rune('a', |env| {
            thread::sleep(Duration::from_millis(50));
            env.line(1).set("pressed");
        })
        .unwrap();
    sim.listen(events).unwrap();

    handle
        .update(|env| {
            thread::sleep(Duration::from_millis(100));
            env.line(0).set("slow");
        })
        .unwrap();
    sim.fire_rune('a').unwrap();
    assert_eq!(sim.line(0), "slow");
    assert_eq!(sim.line(1), "pressed");
}

#[test]
fn unchanged_update_does_not_flush() {
    let (events, mut sim) = Events::sim(Config::default()).unwrap();
    sim.listen(events).unwrap();
    let (shows, syncs) = (sim.show_count(), sim.sync_count());
    sim.update(|_| {}).unwrap();
    assert_eq!((sim.show_count(), sim.sync_count()), (shows, syncs));
}

#[test]
fn shrinking_a_line_blanks_the_tail() {
    let (events, mut sim) = Events::sim(Config::default()).unwrap();
    sim.listen(events).unwrap();
    sim.update(|env| {
        env.line(0).set("abcdef");
    })
    .unwrap();
    sim.update(|env| {
        env.line(0).set("ab");
    })
    .unwrap();
    assert_eq!(sim.line(0), "ab");
}

// ─── Minimum height ──────────────────────────────────────────────────────────

#[test]
fn resize_then_min() {
    let (mut events, mut sim) = Events::sim_with_size(Config::default(), Size::new(80, 25)).unwrap();
    events.set_min(30);
    events.on_resize(|env| {
        env.line(0).set("content");
    });
    sim.listen(events).unwrap();
    assert_eq!(sim.line(12), format!("{:27}minimum screen-height: 30", ""));
    assert_eq!(sim.line(0), "");

    let syncs = sim.sync_count();
    sim.resize(80, 35).unwrap();
    assert_eq!(sim.sync_count(), syncs + 1);
    assert_eq!(sim.line(0), "content");
    assert_eq!(sim.line(17), "");
}

#[test]
fn too_small_screen_only_honours_quit() {
    let (mut events, mut sim) = Events::sim_with_size(Config::default(), Size::new(80, 5)).unwrap();
    events.set_min(10);
    let (hits, seen) = counter();
    events
        .rune('a', move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    sim.listen(events).unwrap();
    sim.fire_rune('a').unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 0);

    sim.fire_rune('q').unwrap();
    assert!(sim.join().is_ok());
}

#[test]
fn set_min_from_a_callback() {
    let (mut events, mut sim) = Events::sim_with_size(Config::default(), Size::new(40, 5)).unwrap();
    events
        .rune('m', |env| {
            env.set_min(8);
        })
        .unwrap();
    sim.listen(events).unwrap();
    sim.fire_rune('m').unwrap();
    assert_eq!(sim.line(2), format!("{:8}minimum screen-height: 8", ""));
}

// ─── Scrolling ───────────────────────────────────────────────────────────────

#[test]
fn scroll_features_move_the_view() {
    let (mut events, mut sim) =
        Events::sim_with_size(Config::with_scrolling(), Size::new(20, 3)).unwrap();
    events.on_resize(|env| {
        env.lines().for_n(6, |line| {
            let text = format!("row {}", line.index());
            line.set(text);
        });
    });
    sim.listen(events).unwrap();
    assert_eq!(sim.screen(), vec!["row 0", "row 1", "row 2"]);

    sim.fire_rune('j').unwrap();
    assert_eq!(sim.screen(), vec!["row 1", "row 2", "row 3"]);

    sim.fire_key(Key::Down, Modifiers::empty()).unwrap();
    sim.fire_key(Key::Up, Modifiers::empty()).unwrap();
    sim.fire_rune('k').unwrap();
    assert_eq!(sim.screen(), vec!["row 0", "row 1", "row 2"]);
}

#[test]
fn listener_claims_a_scroll_key() {
    let (mut events, mut sim) =
        Events::sim_with_size(Config::with_scrolling(), Size::new(20, 2)).unwrap();
    events.on_resize(|env| {
        env.lines().for_n(4, |line| {
            let text = format!("row {}", line.index());
            line.set(text);
        });
    });
    events.rune('j', |_| {}).unwrap();
    sim.listen(events).unwrap();
    sim.fire_rune('j').unwrap();
    assert_eq!(sim.line(0), "row 0");
}
