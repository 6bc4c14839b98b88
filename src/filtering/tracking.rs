//! Link per-scan pattern matches into traces over retention time.
//!
//! A trace collects the matches of one pattern at roughly the same m/z in successive
//! scans. It stays open while new scans can still continue it, and is judged once it
//! closes: traces spanning too few scans are discarded.
use std::collections::BTreeMap;

use log::trace;
use mzpeaks::Tolerance;

use crate::filtered::Satellite;
use crate::params::tolerance_half_width;

/// The life cycle of a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    /// No trace is open
    Searching,
    /// A trace is open and may still be extended
    Accumulating,
    Accepted,
    Discarded,
}

/// A full match of a pattern anchored at one mono-isotopic peak of one scan
#[derive(Debug, Clone, PartialEq)]
pub struct PatternHit {
    pub scan_index: usize,
    pub peak_index: usize,
    pub mz: f64,
    pub intensity: f32,
    /// Satellites keyed by pattern position
    pub satellites: BTreeMap<usize, Vec<Satellite>>,
}

/// Matches of one pattern in successive scans, at most one per scan
#[derive(Debug, Clone)]
pub struct Trace {
    hits: Vec<PatternHit>,
    rts: Vec<f64>,
    state: TraceState,
}

impl Trace {
    fn new(hit: PatternHit, rt: f64) -> Self {
        Self {
            hits: vec![hit],
            rts: vec![rt],
            state: TraceState::Accumulating,
        }
    }

    pub fn state(&self) -> TraceState {
        self.state
    }

    pub fn hits(&self) -> &[PatternHit] {
        &self.hits
    }

    /// The retention times of the hits, in the same order
    pub fn rts(&self) -> &[f64] {
        &self.rts
    }

    /// The number of scans the trace spans
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    fn last(&self) -> (&PatternHit, f64) {
        let i = self.hits.len() - 1;
        (&self.hits[i], self.rts[i])
    }

    /// The m/z distance to `mz` if a hit at `scan_index`, `rt` could extend this trace
    fn continuation(
        &self,
        scan_index: usize,
        rt: f64,
        mz: f64,
        rt_band: f64,
        tolerance: &Tolerance,
    ) -> Option<f64> {
        let (last, last_rt) = self.last();
        if last.scan_index >= scan_index {
            return None;
        }
        if last.scan_index + 1 != scan_index && rt - last_rt > rt_band {
            return None;
        }
        let width = tolerance_half_width(tolerance, last.mz)?;
        let delta = (mz - last.mz).abs();
        (delta <= width).then_some(delta)
    }

    fn is_stale(&self, rt: f64, rt_band: f64) -> bool {
        let (_, last_rt) = self.last();
        rt - last_rt > rt_band
    }

    fn close(&mut self, min_scans: usize) {
        self.state = if self.hits.len() >= min_scans {
            TraceState::Accepted
        } else {
            TraceState::Discarded
        };
    }

    pub fn into_parts(self) -> (Vec<PatternHit>, Vec<f64>) {
        (self.hits, self.rts)
    }
}

/// Feeds the matches of one pattern scan by scan and hands back closed traces
#[derive(Debug, Clone)]
pub struct TraceTracker {
    open: Vec<Trace>,
    min_scans: usize,
    rt_band: f64,
    tolerance: Tolerance,
}

impl TraceTracker {
    pub fn new(min_scans: usize, rt_band: f64, tolerance: Tolerance) -> Self {
        Self {
            open: Vec::new(),
            min_scans,
            rt_band,
            tolerance,
        }
    }

    pub fn state(&self) -> TraceState {
        if self.open.is_empty() {
            TraceState::Searching
        } else {
            TraceState::Accumulating
        }
    }

    pub fn open_traces(&self) -> usize {
        self.open.len()
    }

    /// Add the matches of scan `scan_index` and return the traces this scan closed,
    /// in the order they were opened.
    ///
    /// Scans must be fed in increasing index order with non-decreasing `rt`.
    pub fn advance(&mut self, scan_index: usize, rt: f64, hits: Vec<PatternHit>) -> Vec<Trace> {
        let mut extended = vec![false; self.open.len()];
        for hit in hits {
            let mut best: Option<(usize, f64)> = None;
            for (i, tr) in self.open.iter().enumerate() {
                if extended.get(i).copied().unwrap_or(true) {
                    continue;
                }
                if let Some(delta) =
                    tr.continuation(scan_index, rt, hit.mz, self.rt_band, &self.tolerance)
                {
                    if best.map(|(_, d)| delta < d).unwrap_or(true) {
                        best = Some((i, delta));
                    }
                }
            }
            match best {
                Some((i, _)) => {
                    extended[i] = true;
                    self.open[i].hits.push(hit);
                    self.open[i].rts.push(rt);
                }
                None => {
                    self.open.push(Trace::new(hit, rt));
                    extended.push(true);
                }
            }
        }

        let mut closed = Vec::new();
        let mut still_open = Vec::with_capacity(self.open.len());
        for (tr, was_extended) in self.open.drain(..).zip(extended) {
            if !was_extended && tr.is_stale(rt, self.rt_band) {
                closed.push(tr);
            } else {
                still_open.push(tr);
            }
        }
        self.open = still_open;
        for tr in closed.iter_mut() {
            tr.close(self.min_scans);
            if tr.state == TraceState::Discarded {
                trace!(
                    "Discarding trace at m/z {:.4} spanning {} scan(s)",
                    tr.hits[0].mz,
                    tr.len()
                );
            }
        }
        closed
    }

    /// Close every remaining trace
    pub fn finish(self) -> Vec<Trace> {
        let min_scans = self.min_scans;
        self.open
            .into_iter()
            .map(|mut tr| {
                tr.close(min_scans);
                tr
            })
            .collect()
    }
}
