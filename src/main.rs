// SPDX-License-Identifier: MIT
//
// lines-demo — a small showcase wiring the crates together:
//
//   lines-term → raw mode, input decoding, diffed output
//   lines      → the event loop, line-oriented screen, listeners
//   lyt        → the pane geometry below
//
// Layout:
//
//   ┌──────────────────────────────┐
//   │ title                        │  ← 1 row
//   ├──────────────────────────────┤
//   │ key log                      │  ← the rest
//   ├──────────────────────────────┤
//   │ status + clock (INVERSE)     │  ← 1 row
//   └──────────────────────────────┘
//
// Every key lands in the log; `q` or Ctrl-C quits. A ticker thread posts
// a clock update once a second through the loop's handle. Set RUST_LOG to
// get a trace in `lines-demo.log`.

use std::collections::VecDeque;
use std::fs::File;
use std::process;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use lines::{Attr, Config, Env, Error, Events, Key, Modifiers};
use lines_term::PostError;
use lyt::{Dim, Dimer, DimerId, Manager, Rect};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TITLE: DimerId = 1;
const LOG: DimerId = 2;
const STATUS: DimerId = 3;

/// How many key presses the log remembers.
const HISTORY: usize = 256;

// ─── Demo state ─────────────────────────────────────────────────────────────

struct Demo {
    layout: Manager,
    keys: VecDeque<String>,
    started: Instant,
}

impl Demo {
    fn new() -> Self {
        Self {
            layout: Manager::empty(),
            keys: VecDeque::with_capacity(HISTORY),
            started: Instant::now(),
        }
    }

    fn tree(width: u16, height: u16) -> Dimer {
        Dimer::stacker(
            0,
            Dim::Fixed(width),
            Dim::Fixed(height),
            vec![
                Dimer::leaf(TITLE, Dim::FILL, Dim::Fixed(1)),
                Dimer::leaf(LOG, Dim::FILL, Dim::FILL),
                Dimer::leaf(STATUS, Dim::FILL, Dim::Fixed(1)),
            ],
        )
    }

    /// Re-flow the panes for the current terminal size.
    fn relayout(&mut self, width: u16, height: u16) {
        if let Err(err) = self.layout.set_root(Self::tree(width, height)) {
            warn!(%err, "layout rejected");
            return;
        }
        if let Err(err) = self.layout.reflow(|_| {}) {
            warn!(%err, "layout failed");
        }
    }

    fn rect(&self, id: DimerId) -> Rect {
        self.layout.dimer(id).map(Dimer::rect).unwrap_or_default()
    }

    fn record(&mut self, rune: char, key: Key, mods: Modifiers) {
        if self.keys.len() == HISTORY {
            self.keys.pop_front();
        }
        let entry = if key == Key::Rune {
            format!("{rune:?}")
        } else if mods.is_empty() {
            format!("{key:?}")
        } else {
            format!("{key:?} {mods:?}")
        };
        self.keys.push_back(entry);
    }

    // ── Drawing ──────────────────────────────────────────────────

    fn draw(&self, env: &mut Env<'_>) {
        self.draw_title(env);
        self.draw_log(env);
        self.draw_status(env);
    }

    fn draw_title(&self, env: &mut Env<'_>) {
        let r = self.rect(TITLE);
        env.line(usize::from(r.y))
            .set("lines-demo: press keys, q quits")
            .set_attr(Attr::BOLD);
    }

    fn draw_log(&self, env: &mut Env<'_>) {
        let r = self.rect(LOG);
        let rows = usize::from(r.height);
        let skip = self.keys.len().saturating_sub(rows);
        let mut shown = self.keys.iter().skip(skip);
        for row in 0..rows {
            let text = shown.next().map_or(String::new(), |k| format!("  {k}"));
            env.line(usize::from(r.y) + row).set(text);
        }
    }

    fn draw_status(&self, env: &mut Env<'_>) {
        let r = self.rect(STATUS);
        let secs = self.started.elapsed().as_secs();
        let text = format!(
            " {} keys │ {:02}:{:02} │ {}x{}",
            self.keys.len(),
            secs / 60,
            secs % 60,
            env.width(),
            env.len()
        );
        let width = usize::from(r.width);
        env.line(usize::from(r.y))
            .set(format!("{text:<width$}"))
            .set_attr(Attr::INVERSE);
    }
}

type Shared = Arc<Mutex<Demo>>;

fn with_demo<R>(demo: &Shared, f: impl FnOnce(&mut Demo) -> R) -> R {
    let mut guard = demo.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Log to a file when RUST_LOG is set; the terminal belongs to the UI.
fn init_logging() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    match File::create("lines-demo.log") {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init(),
        Err(e) => eprintln!("lines-demo: cannot open log file: {e}"),
    }
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() {
    init_logging();

    let mut events = Events::new(Config::default()).unwrap_or_else(|e| {
        eprintln!("lines-demo: failed to initialize terminal: {e}");
        process::exit(1);
    });
    events.set_min(3);

    let demo: Shared = Arc::new(Mutex::new(Demo::new()));

    let on_resize = Arc::clone(&demo);
    events.on_resize(move |env| {
        let (width, height) = (env.width(), env.len());
        with_demo(&on_resize, |d| {
            d.relayout(width, height);
            d.draw(env);
        });
    });

    let on_key = Arc::clone(&demo);
    events.keyboard(move |env, rune, key, mods| {
        with_demo(&on_key, |d| {
            d.record(rune, key, mods);
            d.draw_log(env);
            d.draw_status(env);
        });
    });

    events.on_quit(|| info!("bye"));

    let handle = events.handle();
    let ticker = Arc::clone(&demo);
    thread::spawn(move || {
        loop {
            thread::sleep(Duration::from_secs(1));
            let demo = Arc::clone(&ticker);
            let posted = handle.update(move |env| with_demo(&demo, |d| d.draw_status(env)));
            match posted {
                Err(Error::Post(PostError::Disconnected)) => break,
                Err(err) => warn!(%err, "clock tick dropped"),
                Ok(()) => {}
            }
        }
    });

    if let Err(e) = events.listen() {
        eprintln!("lines-demo: {e}");
        process::exit(1);
    }
}
