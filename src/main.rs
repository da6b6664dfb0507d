// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! # sw — Stopwatch CLI
//!
//! Measures elapsed time a second at a time; each paused run is logged with
//! a timestamp and reported grouped by calendar day. The store file lives at
//! `$HOME/Documents/stopwatch.json` by default.
//!
//! ## Store format
//!
//! One JSON array, newest run first, one object per completed run:
//!
//! - `{"id": "<uuid>", "date": "<rfc3339 local time>", "duration": 90.0}`
//!
//! A run is logged only when it is paused. Quitting while running discards
//! the in-flight seconds; session state is never stored.
//!
//! ## Subcommands
//!
//! | Command   | Description |
//! |-----------|-------------|
//! | `watch`   | Interactive stopwatch (default): Enter toggles start/pause, `l` shows the log, `q` quits. |
//! | `list`    | Report runs grouped by day, newest day first, with per-day and overall totals. |
//! | `manpage` | Output Unix manual page in groff format to stdout. |
//! | `help`    | Show the man page in a pager (groff -man -Tascii \| less). |

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{self, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use uuid::Uuid;
#[cfg(unix)]
use libc::{signal, SIG_IGN};

/// Default path segment under `$HOME` for the stopwatch store file.
const DEFAULT_STORE: &str = "Documents/stopwatch.json";

/// Returns the default store path: `$HOME/Documents/stopwatch.json`, or `./Documents/stopwatch.json` if `HOME` is unset.
fn store_path() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_STORE)
}

/// Log a debug message to stderr when SW_DEBUG is set.
fn sw_debug(msg: &str) {
    if env::var_os("SW_DEBUG").is_some() {
        let _ = writeln!(io::stderr(), "sw: {}", msg);
    }
}

/// One completed, logged run: when it was paused and how many seconds it ran.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct TimeEntry {
    /// Display-list identity only; not used to compare entries.
    id: Uuid,
    date: DateTime<Local>,
    duration: f64,
}

impl TimeEntry {
    /// Entry stamped with the current local time.
    fn new(duration: f64) -> TimeEntry {
        TimeEntry {
            id: Uuid::new_v4(),
            date: Local::now(),
            duration,
        }
    }
}

/// The logged runs, newest first, backed by one JSON file at a fixed path.
struct EntryStore {
    path: PathBuf,
    entries: Vec<TimeEntry>,
}

impl EntryStore {
    /// Loads the store at `path`. A missing file or undecodable contents
    /// yield an empty store; neither is reported as an error.
    fn load(path: &Path) -> EntryStore {
        let entries = match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                sw_debug(&format!("load: decode failed, starting empty: {}", e));
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };
        EntryStore {
            path: path.to_path_buf(),
            entries,
        }
    }

    fn entries(&self) -> &[TimeEntry] {
        &self.entries
    }

    /// Inserts `entry` at the front (newest first), then rewrites the file.
    fn prepend(&mut self, entry: TimeEntry) {
        self.entries.insert(0, entry);
        self.persist();
    }

    /// Writes the whole collection as one JSON blob. An encode or write
    /// failure skips the write; the in-memory collection is unaffected.
    fn persist(&self) {
        let json = match serde_json::to_string_pretty(&self.entries) {
            Ok(j) => j,
            Err(e) => {
                sw_debug(&format!("persist: encode failed: {}", e));
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = fs::write(&self.path, json) {
            sw_debug(&format!("persist: write failed: {}", e));
        }
    }
}

/// Current timing session: whole seconds accumulated so far and whether the
/// one-second tick is live. Never persisted; a run reaches the store only
/// when it is paused.
#[derive(Debug)]
struct Session {
    elapsed: u64,
    running: bool,
}

impl Session {
    fn new() -> Session {
        Session {
            elapsed: 0,
            running: false,
        }
    }

    /// Starts when idle, pauses when running. Returns the seconds logged
    /// when a pause produced an entry.
    fn toggle(&mut self, store: &mut EntryStore) -> Option<u64> {
        if self.running {
            self.pause(store)
        } else {
            self.start();
            None
        }
    }

    fn start(&mut self) {
        self.running = true;
    }

    /// Stops the session. A non-zero elapsed count becomes one entry,
    /// stamped now and prepended to the store; elapsed resets either way.
    fn pause(&mut self, store: &mut EntryStore) -> Option<u64> {
        self.running = false;
        let logged = if self.elapsed > 0 {
            store.prepend(TimeEntry::new(self.elapsed as f64));
            Some(self.elapsed)
        } else {
            None
        };
        self.elapsed = 0;
        logged
    }

    /// One second passed. Counts only while running.
    fn tick(&mut self) {
        if self.running {
            self.elapsed += 1;
        }
    }
}

/// Handle to the one-second ticking task for a running session. Exactly one
/// exists while the session runs; pausing cancels it.
struct Ticker {
    stop: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl Ticker {
    /// Spawns a thread that advances `session` once per second until
    /// canceled. The stop flag is polled every 100 ms so cancellation lands
    /// well before the next tick.
    fn spawn(session: Arc<Mutex<Session>>) -> Ticker {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let check_interval = Duration::from_millis(100);
            loop {
                for _ in 0..10 {
                    thread::sleep(check_interval);
                    if stop_flag.load(Ordering::Relaxed) {
                        return;
                    }
                }
                let mut s = match session.lock() {
                    Ok(guard) => guard,
                    Err(_) => return,
                };
                if !s.running {
                    continue;
                }
                s.tick();
                print!("\r{}  ", format_duration(s.elapsed as f64));
                let _ = io::stdout().flush();
            }
        });
        Ticker { stop, handle }
    }

    /// Stops the ticking thread and waits for it to exit.
    fn cancel(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

/// One calendar day of the log: the day, its summed duration, and its
/// entries in source (newest-first) order. Derived on every read, never stored.
#[derive(Clone, Debug, PartialEq)]
struct DayGroup {
    day: NaiveDate,
    total: f64,
    entries: Vec<TimeEntry>,
}

/// Groups entries by the local calendar day of each entry's date, newest day
/// first. Each entry's day key is taken from its own date on every call;
/// entry order within a day follows the input collection.
fn entries_by_day(entries: &[TimeEntry]) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();
    for entry in entries {
        let day = entry.date.date_naive();
        match groups.iter_mut().find(|g| g.day == day) {
            Some(g) => {
                g.total += entry.duration;
                g.entries.push(entry.clone());
            }
            None => groups.push(DayGroup {
                day,
                total: entry.duration,
                entries: vec![entry.clone()],
            }),
        }
    }
    groups.sort_by(|a, b| b.day.cmp(&a.day));
    groups
}

/// Renders seconds as zero-padded `HH:MM:SS`. The hours field grows past 24
/// rather than wrapping. Negative or non-finite input renders as `00:00:00`.
fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00:00".to_string();
    }
    let secs = seconds as u64;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Medium-style date header, no time component (e.g. `Feb 20, 2026`).
fn format_day_header(day: NaiveDate) -> String {
    day.format("%b %-d, %Y").to_string()
}

/// Short-style time of day, no date component (e.g. `9:05 AM`).
fn format_entry_time(date: &DateTime<Local>) -> String {
    date.format("%-I:%M %p").to_string()
}

/// Plaintext report: one block per calendar day (newest first) with the day
/// total on the header line, then an overall total.
fn render_day_report(entries: &[TimeEntry]) -> String {
    if entries.is_empty() {
        return "No runs recorded.\n".to_string();
    }
    let mut out = String::new();
    for group in entries_by_day(entries) {
        out.push_str(&format!(
            "{}  {}\n",
            format_day_header(group.day),
            format_duration(group.total)
        ));
        for entry in &group.entries {
            out.push_str(&format!(
                "  {}  {}\n",
                format_entry_time(&entry.date),
                format_duration(entry.duration)
            ));
        }
    }
    let total: f64 = entries.iter().map(|e| e.duration).sum();
    out.push_str(&format!("Total  {}\n", format_duration(total)));
    out
}

/// Prints the day-grouped report for the persisted log.
fn cmd_list(store_path: &Path) -> Result<(), String> {
    sw_debug("cmd_list entered");
    let store = EntryStore::load(store_path);
    print!("{}", render_day_report(store.entries()));
    Ok(())
}

/// Interactive stopwatch screen. Enter toggles start/pause, `l` prints the
/// day report, `q` quits. Each pause logs the run to the store.
fn cmd_watch(store_path: &Path) -> Result<(), String> {
    let mut store = EntryStore::load(store_path);
    let session = Arc::new(Mutex::new(Session::new()));
    let mut ticker: Option<Ticker> = None;
    println!("Stopwatch ready. Enter toggles start/pause, l shows the log, q quits.");
    print!("{}  ", format_duration(0.0));
    io::stdout().flush().map_err(|e| e.to_string())?;
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| e.to_string())?;
        match line.trim() {
            "" => {
                let (running, logged) = {
                    let mut s = session
                        .lock()
                        .map_err(|_| "sw watch: ticker thread panicked".to_string())?;
                    let logged = s.toggle(&mut store);
                    (s.running, logged)
                };
                if running {
                    // Toggled from idle, so no prior ticker exists.
                    ticker = Some(Ticker::spawn(Arc::clone(&session)));
                    println!("Started.");
                } else {
                    if let Some(t) = ticker.take() {
                        t.cancel();
                    }
                    match logged {
                        Some(secs) => {
                            println!("\rPaused. Logged {}.", format_duration(secs as f64))
                        }
                        None => println!("\rPaused. Nothing to log."),
                    }
                }
            }
            "l" => {
                print!("{}", render_day_report(store.entries()));
            }
            "q" => break,
            other => {
                sw_debug(&format!("watch: ignoring input {:?}", other));
                println!("Enter toggles start/pause, l shows the log, q quits.");
            }
        }
    }
    if let Some(t) = ticker.take() {
        t.cancel();
    }
    Ok(())
}

/// Groff man page source (shared by manpage and help).
fn manpage_content() -> &'static str {
    r#".TH SW 1 "August 2026" "" "sw"
.SH NAME
sw \- stopwatch CLI (time runs, log them, report per day)
.SH SYNOPSIS
.B sw
.RI [ command ]
.PP
.B sw watch
.PP
.B sw list
.PP
.B sw manpage
.PP
.B sw help
.SH DESCRIPTION
.B sw
measures elapsed time one second at a time. Pausing logs the run; logged
runs are reported grouped by calendar day, newest day first, with per-day
totals. The store file is
.BR $HOME /Documents/stopwatch.json
by default (compile-time constant
.BR DEFAULT_STORE
in source).
.SH "STORE FORMAT"
One JSON array, newest run first, one object per completed run:
.TP
.B {"id": "<uuid>", "date": "<rfc3339>", "duration": 90.0}
.I id
identifies the entry in display lists,
.I date
is the local time the run was paused, and
.I duration
is its length in seconds. Zero-length runs are never stored. Undecodable or
missing store contents are treated as an empty log.
.SH COMMANDS
.TP
.B watch
Interactive stopwatch (the default when no command is given). Enter toggles
start/pause; pausing a run with a non-zero count logs it and resets the
readout to 00:00:00.
.B l
prints the day-grouped log,
.B q
quits. Quitting while running discards the in-flight seconds.
.TP
.B list
Plaintext report: one block per calendar day (newest first) showing the day
total and each run's pause time and duration, followed by an overall
.B Total
line. Durations render as zero-padded HH:MM:SS; the hours field grows past
24 rather than wrapping.
.TP
.B manpage
Write this manual page in groff format to stdout. Example:
.B "sw manpage | groff \-man \-Tascii | less"
.TP
.B help
Run the equivalent of
.B "sw manpage | groff \-man \-Tascii | less"
to show this manual page in the system pager.
.SH ENVIRONMENT
.TP
.B SW_DEBUG
If set (any value), log debug messages to stderr, including skipped store
writes and ignored watch input.
.SH FILES
.B $HOME/Documents/stopwatch.json
Default store (path is compile-time in
.BR DEFAULT_STORE ).
.SH AUTHORS
Robert August Vincent II <pillarsdotnet@gmail.com>
Co-author: Cursor-AI.
"#
}

/// Output a Unix manual page in groff format to stdout.
fn cmd_manpage() -> Result<(), String> {
    let man = manpage_content();
    let mut out = io::stdout();
    if let Err(e) = out.write_all(man.as_bytes()) {
        if e.kind() != io::ErrorKind::BrokenPipe {
            return Err(e.to_string());
        }
    }
    let _ = out.flush();
    Ok(())
}

/// Show the man page in a pager using groff (sw manpage | groff -man -Tascii | less).
/// If groff is not available, pages the raw groff source with less.
fn cmd_help() -> Result<(), String> {
    let man = manpage_content();

    let child = Command::new("sh")
        .args(["-c", "groff -man -Tascii 2>/dev/null | less -R"])
        .stdin(Stdio::piped())
        .spawn();

    if let Ok(mut child) = child {
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(man.as_bytes());
        }
        if child.wait().map(|s| s.success()).unwrap_or(false) {
            return Ok(());
        }
    }

    // Fallback: page the raw groff source with less
    let mut child = Command::new("less")
        .arg("-R")
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| {
            format!(
                "no pager available (groff, less): {}. Try: sw manpage | groff -man -Tascii | less",
                e
            )
        })?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(man.as_bytes())
            .map_err(|e| e.to_string())?;
    }
    let _ = child.wait();
    Ok(())
}

fn main() {
    if env::var_os("SW_DEBUG").is_some() {
        let _ = std::io::stderr().write_all(b"sw: main entered\n");
    }
    #[cfg(unix)]
    unsafe {
        signal(libc::SIGPIPE, SIG_IGN);
    }
    let args: Vec<String> = env::args().skip(1).collect();
    let cmd = args.first().cloned();
    let store = store_path();

    if env::var_os("SW_DEBUG").is_some() {
        let cmd_name = cmd.as_deref().unwrap_or("(none)");
        let _ = std::io::stderr().write_fmt(format_args!("sw: dispatching to {:?}\n", cmd_name));
    }

    let result = match cmd.as_deref() {
        None => cmd_watch(&store),
        Some("watch") => cmd_watch(&store),
        Some("list") => cmd_list(&store),
        Some("manpage") => cmd_manpage(),
        Some("help") => cmd_help(),
        Some(_) => cmd_help(),
    };
    if let Err(e) = result {
        eprintln!("{}", e);
        process::exit(1);
    }
}
