use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use foundation::ids::LayerId;

/// State as projected into the layer list / legend widget.
///
/// `OffScale` overlays the substantive lifecycle state when the map is
/// outside the layer's visible scale range; the substantive state is
/// restored once the map scale comes back in range.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LegendState {
    Loading,
    Loaded,
    Updating,
    Error,
    OffScale,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegendOptions {
    /// Human-readable message shown for `Error` and `OffScale` entries.
    pub notice: Option<String>,
}

impl LegendOptions {
    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            notice: Some(message.into()),
        }
    }
}

/// UI projection contract for the legend widget.
///
/// The composer's lifecycle handlers are the only writers; everything else
/// may only read via `get_state`.
pub trait LegendProjection {
    fn set_state(&mut self, id: &LayerId, state: LegendState, options: LegendOptions);
    fn get_state(&self, id: &LayerId) -> Option<LegendState>;
}

/// In-memory projection used by tests and headless replay.
#[derive(Debug, Default)]
pub struct RecordingLegend {
    states: BTreeMap<LayerId, (LegendState, LegendOptions)>,
    /// Every write, in order.
    pub log: Vec<(LayerId, LegendState)>,
}

impl RecordingLegend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self, id: &LayerId) -> Option<&LegendOptions> {
        self.states.get(id).map(|(_, o)| o)
    }
}

impl LegendProjection for RecordingLegend {
    fn set_state(&mut self, id: &LayerId, state: LegendState, options: LegendOptions) {
        self.states.insert(id.clone(), (state, options));
        self.log.push((id.clone(), state));
    }

    fn get_state(&self, id: &LayerId) -> Option<LegendState> {
        self.states.get(id).map(|(s, _)| *s)
    }
}

impl<L: LegendProjection> LegendProjection for Rc<RefCell<L>> {
    fn set_state(&mut self, id: &LayerId, state: LegendState, options: LegendOptions) {
        self.borrow_mut().set_state(id, state, options);
    }

    fn get_state(&self, id: &LayerId) -> Option<LegendState> {
        self.borrow().get_state(id)
    }
}
