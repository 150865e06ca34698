use std::collections::VecDeque;
use std::sync::mpsc;

use tracing::debug;

use crate::error::CoreError;
use crate::viewport::Viewport;

/// Snapshot of the stack depths, published whenever either stack changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryChanged {
    pub undo_len: usize,
    pub redo_len: usize,
}

impl HistoryChanged {
    pub fn can_undo(&self) -> bool {
        self.undo_len > 0
    }

    pub fn can_redo(&self) -> bool {
        self.redo_len > 0
    }
}

/// Undo/redo history of viewport states.
///
/// Every viewport that goes in or comes out is an owned clone, so nothing a
/// caller does to a returned value can reach the stored history.
#[derive(Debug)]
pub struct ViewHistory {
    /// Oldest entry at the front, top of the stack at the back.
    undo: VecDeque<Viewport>,
    redo: Vec<Viewport>,
    current: Viewport,
    max_depth: usize,
    listeners: Vec<mpsc::Sender<HistoryChanged>>,
}

impl ViewHistory {
    pub const DEFAULT_MAX_DEPTH: usize = 50;

    /// Center/zoom distance below which two states count as the same view.
    pub const SIMILARITY_TOLERANCE: f64 = 1e-3;

    pub fn new(initial: &Viewport) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            current: initial.clone(),
            max_depth: Self::DEFAULT_MAX_DEPTH,
            listeners: Vec::new(),
        }
    }

    /// History keeping at most `max_depth` undo entries. Zero is rejected.
    pub fn with_max_depth(initial: &Viewport, max_depth: usize) -> crate::Result<Self> {
        if max_depth == 0 {
            return Err(CoreError::InvalidHistoryDepth(max_depth));
        }
        Ok(Self {
            max_depth,
            ..Self::new(initial)
        })
    }

    /// Receive a [`HistoryChanged`] after every change to the stacks.
    pub fn subscribe(&mut self) -> mpsc::Receiver<HistoryChanged> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }

    /// Commit `viewport` as the new current state.
    ///
    /// Skipped when it is within [`SIMILARITY_TOLERANCE`](Self::SIMILARITY_TOLERANCE)
    /// of the top of the undo stack. Returns whether the state was recorded.
    pub fn push_state(&mut self, viewport: &Viewport) -> bool {
        if let Some(top) = self.undo.back() {
            if top.is_similar(viewport, Self::SIMILARITY_TOLERANCE) {
                debug!("Skipping near-duplicate history state");
                return false;
            }
        }

        let previous = std::mem::replace(&mut self.current, viewport.clone());
        self.undo.push_back(previous);
        self.redo.clear();
        while self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
        self.notify();
        true
    }

    /// Step back. With nothing to undo the current state is returned as is.
    pub fn undo(&mut self) -> Viewport {
        if let Some(previous) = self.undo.pop_back() {
            let newer = std::mem::replace(&mut self.current, previous);
            self.redo.push(newer);
            self.notify();
        }
        self.current.clone()
    }

    /// Step forward again after an [`undo`](Self::undo).
    pub fn redo(&mut self) -> Viewport {
        if let Some(next) = self.redo.pop() {
            let older = std::mem::replace(&mut self.current, next);
            self.undo.push_back(older);
            self.notify();
        }
        self.current.clone()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn current(&self) -> Viewport {
        self.current.clone()
    }

    /// Replace the current state without touching either stack.
    pub fn update_current(&mut self, viewport: &Viewport) {
        self.current = viewport.clone();
    }

    /// Drop both stacks; the current state is kept.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.notify();
    }

    fn notify(&mut self) {
        let event = HistoryChanged {
            undo_len: self.undo.len(),
            redo_len: self.redo.len(),
        };
        // Receivers that have been dropped are forgotten.
        self.listeners.retain(|tx| tx.send(event).is_ok());
    }
}
