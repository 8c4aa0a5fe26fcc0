//! Edge path management.
//!
//! [`EdgePathManager`] turns the edges of a snapshot into SVG path commands
//! and keeps an optional slint model in sync with them.
//!
//! # Example
//!
//! ```ignore
//! use node_editor_core::{CurveConfig, EdgePathManager, GraphStore};
//!
//! let paths = EdgePathManager::new(CurveConfig::default());
//! let model = Rc::new(VecModel::<EdgePathRow>::default());
//! paths.bind_model(model.clone(), |index, commands| EdgePathRow {
//!     index: index as i32,
//!     commands,
//! });
//! window.set_edge_paths(ModelRc::from(model));
//!
//! // Recompute on every snapshot change (moves, measurements, undo, ...)
//! store.on_change(paths.listener());
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use slint::{SharedString, VecModel};

use crate::geometry::{edge_path_with, CurveConfig};
use crate::model::Snapshot;
use crate::store::ModelSyncer;

/// Rendered path of one edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePath {
    /// Index of the edge in `Snapshot::edges`.
    pub edge_index: usize,
    /// SVG path commands (`M .. C ..`).
    pub commands: SharedString,
}

trait PathSyncer {
    fn sync(&self, paths: &[EdgePath]);
}

impl<P, F> PathSyncer for ModelSyncer<P, F>
where
    P: Clone + 'static,
    F: Fn(usize, SharedString) -> P,
{
    fn sync(&self, paths: &[EdgePath]) {
        self.sync_rows(
            paths
                .iter()
                .map(|p| (self.constructor)(p.edge_index, p.commands.clone())),
        );
    }
}

struct PathState {
    curve: CurveConfig,
    paths: Vec<EdgePath>,
    syncer: Option<Box<dyn PathSyncer>>,
}

/// Computes edge paths for rendering.
///
/// Cloning is cheap and every clone shares the same paths and bound model,
/// so a clone can live inside a store listener.
#[derive(Clone)]
pub struct EdgePathManager {
    state: Rc<RefCell<PathState>>,
}

impl Default for EdgePathManager {
    fn default() -> Self {
        Self::new(CurveConfig::default())
    }
}

impl EdgePathManager {
    pub fn new(curve: CurveConfig) -> Self {
        Self {
            state: Rc::new(RefCell::new(PathState {
                curve,
                paths: Vec::new(),
                syncer: None,
            })),
        }
    }

    /// Bind to a slint model. Every later [`update_paths`](Self::update_paths)
    /// rewrites it row-for-row; the model is filled immediately with the
    /// paths computed so far.
    pub fn bind_model<P, F>(&self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(usize, SharedString) -> P + 'static,
    {
        let syncer = ModelSyncer { model, constructor };
        let mut state = self.state.borrow_mut();
        syncer.sync(&state.paths);
        state.syncer = Some(Box::new(syncer));
    }

    pub fn set_curve(&self, curve: CurveConfig) {
        self.state.borrow_mut().curve = curve;
    }

    pub fn curve(&self) -> CurveConfig {
        self.state.borrow().curve
    }

    /// Recompute every path from `snapshot`. Edges with a missing endpoint
    /// node produce no path.
    pub fn update_paths(&self, snapshot: &Snapshot) {
        let mut state = self.state.borrow_mut();
        let curve = state.curve;
        let records = snapshot.node_records();

        let paths: Vec<EdgePath> = snapshot
            .edges
            .iter()
            .enumerate()
            .filter_map(|(edge_index, edge)| {
                let source = records.get(edge.source.node_id.as_str())?;
                let target = records.get(edge.target.node_id.as_str())?;
                let bezier = edge_path_with(
                    Some(edge.source.index),
                    &source.position,
                    Some(edge.target.index),
                    &target.position,
                    &curve,
                );
                Some(EdgePath {
                    edge_index,
                    commands: SharedString::from(bezier.to_svg()),
                })
            })
            .collect();

        tracing::trace!(count = paths.len(), "edge paths updated");
        if let Some(syncer) = &state.syncer {
            syncer.sync(&paths);
        }
        state.paths = paths;
    }

    /// Current paths.
    pub fn paths(&self) -> Vec<EdgePath> {
        self.state.borrow().paths.clone()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().paths.is_empty()
    }

    /// Snapshot listener that recomputes the paths, for
    /// [`GraphStore::on_change`](crate::GraphStore::on_change).
    pub fn listener(&self) -> impl Fn(&Snapshot) + Clone + 'static {
        let manager = self.clone();
        move |snapshot: &Snapshot| manager.update_paths(snapshot)
    }
}
