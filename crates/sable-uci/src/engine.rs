//! Event-driven UCI engine with a background search thread.

use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};

use tracing::{debug, info, warn};

use sable_core::{Move, Position};
use sable_engine::{
    DEFAULT_HASH_MB, IterationInfo, MATE, MAX_PLY, SearchResult, Searcher, control_from_go,
    is_mate_score,
};

use crate::command::{Command, GoParams, HASH_RANGE, UciOption, parse_command};
use crate::error::UciError;

/// Configuration knobs adjustable via `setoption`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Transposition table size in megabytes.
    pub hash_mb: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_mb: DEFAULT_HASH_MB,
        }
    }
}

/// Events processed by the main engine loop.
enum EngineEvent {
    UciCommand(Result<Command, UciError>),
    SearchDone(SearchDone),
    InputClosed,
}

impl EngineEvent {
    fn name(&self) -> &'static str {
        match self {
            EngineEvent::UciCommand(_) => "command",
            EngineEvent::SearchDone(_) => "search done",
            EngineEvent::InputClosed => "input closed",
        }
    }
}

/// Hand an event to the main loop. A closed loop means shutdown is under
/// way, so the event is dropped with a debug note.
fn send_event(tx: &mpsc::Sender<EngineEvent>, event: EngineEvent) -> bool {
    match tx.send(event) {
        Ok(()) => true,
        Err(mpsc::SendError(event)) => {
            debug!(event = event.name(), "engine loop gone, event dropped");
            false
        }
    }
}

/// Payload returned by the search thread when it finishes.
struct SearchDone {
    result: SearchResult,
    /// Best move already rendered against the root position.
    best_move: Option<String>,
    searcher: Searcher,
}

/// Protocol output shared between the event loop and the search thread.
#[derive(Clone)]
struct Output(Arc<Mutex<Box<dyn Write + Send>>>);

impl Output {
    fn new(writer: impl Write + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Box::new(writer))))
    }

    /// Write one protocol line and flush it.
    fn line(&self, text: impl Display) {
        let mut writer = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(writer, "{text}").and_then(|()| writer.flush()) {
            warn!(error = %e, "failed to write protocol output");
        }
    }
}

/// The UCI engine, holding the current position and the searcher.
///
/// Runs an event-driven loop on the calling thread, dispatching searches
/// to a worker thread and processing commands while it runs.
pub struct UciEngine {
    position: Position,
    /// `None` while the search thread owns it.
    searcher: Option<Searcher>,
    stop_flag: Arc<AtomicBool>,
    config: EngineConfig,
    pending_clear_tt: bool,
    /// Pending TT resize to apply when the search thread returns the searcher.
    pending_resize_tt: Option<usize>,
}

impl UciEngine {
    /// Create a new engine at the starting position.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a new engine with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            position: Position::startpos(),
            searcher: Some(Searcher::with_hash(config.hash_mb)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            config,
            pending_clear_tt: false,
            pending_resize_tt: None,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Run the UCI loop on stdin and stdout until `quit` or input closes.
    pub fn run(self) -> Result<(), UciError> {
        let stdin = io::stdin();
        self.run_with(io::BufReader::new(stdin), io::stdout())
    }

    /// Run the UCI loop over arbitrary streams.
    ///
    /// Input is read on a separate thread so `stop` reaches a running search.
    pub fn run_with<R, W>(mut self, input: R, output: W) -> Result<(), UciError>
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        let out = Output::new(output);
        let (tx, rx) = mpsc::channel::<EngineEvent>();

        let input_tx = tx.clone();
        let reader = std::thread::spawn(move || -> Result<(), UciError> {
            for line in input.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        send_event(&input_tx, EngineEvent::InputClosed);
                        return Err(e.into());
                    }
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                debug!(cmd = %trimmed, "received UCI command");
                let quit = trimmed == "quit";
                if !send_event(&input_tx, EngineEvent::UciCommand(parse_command(trimmed))) || quit {
                    return Ok(());
                }
            }
            send_event(&input_tx, EngineEvent::InputClosed);
            Ok(())
        });

        let mut searching = false;
        let mut unbounded = false;
        let mut quit = false;
        for event in &rx {
            match event {
                EngineEvent::UciCommand(Ok(cmd)) => match cmd {
                    Command::Uci => self.handle_uci(&out),
                    Command::IsReady => out.line("readyok"),
                    Command::UciNewGame => self.handle_ucinewgame(),
                    Command::Position(pos) => self.position = pos,
                    Command::Go(params) => {
                        if searching {
                            warn!("go received while searching, ignoring");
                        } else {
                            unbounded = self.handle_go(&params, &tx, &out);
                            searching = true;
                        }
                    }
                    Command::SetOption(opt) => self.handle_setoption(opt),
                    Command::Stop => self.stop_flag.store(true, Ordering::Release),
                    Command::Quit => {
                        quit = true;
                        break;
                    }
                    Command::Unknown(_) => {}
                },
                EngineEvent::UciCommand(Err(e)) => {
                    warn!(error = %e, "UCI parse error");
                }
                EngineEvent::SearchDone(done) => {
                    self.finish_search(done, &out);
                    searching = false;
                }
                EngineEvent::InputClosed => break,
            }
        }

        // A running search still owes the controller a bestmove. After
        // input closes a bounded search is left to finish.
        if searching {
            if quit || unbounded {
                self.stop_flag.store(true, Ordering::Release);
            }
            for event in &rx {
                if let EngineEvent::SearchDone(done) = event {
                    self.finish_search(done, &out);
                    break;
                }
            }
        }

        info!("sable shutting down");
        // The reader may still be blocked on input after `quit`; only a
        // finished reader can report its error.
        if reader.is_finished() {
            if let Ok(result) = reader.join() {
                result?;
            }
        }
        Ok(())
    }

    fn handle_uci(&self, out: &Output) {
        let (min, max) = HASH_RANGE;
        out.line(format_args!("id name sable {}", env!("CARGO_PKG_VERSION")));
        out.line("id author the sable developers");
        out.line(format_args!(
            "option name Hash type spin default {DEFAULT_HASH_MB} min {min} max {max}"
        ));
        out.line("uciok");
    }

    fn handle_ucinewgame(&mut self) {
        self.position = Position::startpos();
        match self.searcher {
            Some(ref mut searcher) => searcher.clear_tt(),
            // Search thread owns the searcher; defer until it comes back.
            None => self.pending_clear_tt = true,
        }
    }

    fn handle_setoption(&mut self, option: UciOption) {
        match option {
            UciOption::Hash(mb) => {
                self.config.hash_mb = mb;
                match self.searcher {
                    Some(ref mut searcher) => searcher.resize_tt(mb),
                    None => self.pending_resize_tt = Some(mb),
                }
                info!(hash_mb = mb, "hash resized");
            }
        }
    }

    /// Start a search on a worker thread. Returns whether only `stop` can end it.
    fn handle_go(
        &mut self,
        params: &GoParams,
        tx: &mpsc::Sender<EngineEvent>,
        out: &Output,
    ) -> bool {
        if params.ponder {
            debug!("pondering is not supported, searching normally");
        }

        self.stop_flag = Arc::new(AtomicBool::new(false));
        let side = self.position.side_to_move();
        let limits = params.limits();
        let unbounded = limits.infinite
            || (params.depth.is_none()
                && limits.movetime.is_none()
                && limits.nodes.is_none()
                && limits.budget_for(side).is_none());
        let control = control_from_go(&limits, side, Arc::clone(&self.stop_flag));
        let max_depth = params.depth.unwrap_or(MAX_PLY as u8 - 1);

        let mut searcher = self
            .searcher
            .take()
            .unwrap_or_else(|| Searcher::with_hash(self.config.hash_mb));
        let mut pos = self.position.clone();
        let root = self.position.clone();
        let tx = tx.clone();
        let out = out.clone();

        std::thread::spawn(move || {
            let result = searcher.search(&mut pos, max_depth, &control, |iter| {
                out.line(format_info(&root, iter));
            });
            let best_move = result.best_move.map(|mv| root.format_uci(mv));
            send_event(
                &tx,
                EngineEvent::SearchDone(SearchDone {
                    result,
                    best_move,
                    searcher,
                }),
            );
        });
        unbounded
    }

    fn finish_search(&mut self, done: SearchDone, out: &Output) {
        let mut searcher = done.searcher;

        if let Some(mb) = self.pending_resize_tt.take() {
            // Resize supersedes clear; a fresh allocation is already empty.
            searcher.resize_tt(mb);
            self.pending_clear_tt = false;
        } else if self.pending_clear_tt {
            searcher.clear_tt();
            self.pending_clear_tt = false;
        }
        self.searcher = Some(searcher);

        let result = &done.result;
        info!(
            depth = result.depth,
            score = result.score,
            nodes = result.nodes,
            best_move = done.best_move.as_deref().unwrap_or("0000"),
            "search finished"
        );
        match done.best_move {
            Some(mv) => out.line(format_args!("bestmove {mv}")),
            None => out.line("bestmove 0000"),
        }
    }
}

impl Default for UciEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a score as `cp <n>` or `mate <moves>`.
///
/// Mate distances count full moves; negative means the side to move is mated.
pub fn format_score(score: i32) -> String {
    if is_mate_score(score) {
        let plies = MATE - score.abs();
        let moves = (plies + 1) / 2;
        if score > 0 {
            format!("mate {moves}")
        } else {
            format!("mate -{moves}")
        }
    } else {
        format!("cp {score}")
    }
}

/// Render a principal variation from `root` in UCI move text.
pub fn format_pv(root: &Position, pv: &[Move]) -> String {
    let mut pos = root.clone();
    let mut text = Vec::with_capacity(pv.len());
    for &mv in pv {
        text.push(pos.format_uci(mv));
        pos.play(mv);
    }
    text.join(" ")
}

/// The `info` line for one completed iteration.
fn format_info(root: &Position, iter: &IterationInfo<'_>) -> String {
    let elapsed_ms = iter.elapsed.as_millis().max(1);
    let nps = u128::from(iter.nodes) * 1000 / elapsed_ms;
    format!(
        "info depth {} seldepth {} score {} nodes {} nps {} time {} hashfull {} pv {}",
        iter.depth,
        iter.seldepth,
        format_score(iter.score),
        iter.nodes,
        nps,
        iter.elapsed.as_millis(),
        iter.hashfull,
        format_pv(root, iter.pv)
    )
}
