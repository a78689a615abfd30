use std::cell::RefCell;
use std::env;
use std::fs;
use std::rc::Rc;

use composer::{Composer, HeadlessSurface, LayerBus, NullReprojector, RecordingLegend};
use foundation::bounds::SpatialRef;
use foundation::ids::{LayerId, RenderableId};
use layers::config::{FeatureMode, LayerConfig};
use layers::counters::CountersSnapshot;
use layers::events::{LayerEvent, channels};
use serde::{Deserialize, Serialize};

/// A replayable layer scenario: initial configuration plus a script of
/// surface notifications and user commands, driven against the headless
/// surface. The event trace and a final summary go to stdout as JSON lines.
#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default = "default_srid")]
    srid: u32,
    #[serde(default)]
    scale: f64,
    layers: Vec<LayerConfig>,
    #[serde(default)]
    script: Vec<Step>,
}

fn default_srid() -> u32 {
    3857
}

#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
enum Step {
    Loaded {
        layer: String,
    },
    Error {
        layer: String,
        message: String,
    },
    UpdateStarted {
        layer: String,
    },
    UpdateFinished {
        layer: String,
    },
    Scale {
        value: f64,
    },
    Remove {
        layer: String,
    },
    Reload {
        layer: String,
        #[serde(default)]
        mode: Option<FeatureMode>,
    },
}

#[derive(Debug, Serialize)]
struct TraceLine {
    channel: &'static str,
    layer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
    all_loaded: bool,
    draw_order: Vec<String>,
    counters: CountersSnapshot,
    metrics: Vec<(String, u64)>,
}

fn main() {
    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        return Err(usage());
    }
    let text = fs::read_to_string(&args[1]).map_err(|e| format!("read {}: {e}", args[1]))?;
    let scenario: Scenario =
        serde_json::from_str(&text).map_err(|e| format!("parse scenario: {e}"))?;
    run(scenario)
}

fn usage() -> String {
    "usage: overlook <scenario.json>".to_string()
}

fn run(scenario: Scenario) -> Result<(), String> {
    let bus = Rc::new(LayerBus::new());
    let surface = Rc::new(RefCell::new(HeadlessSurface::new()));
    let legend = Rc::new(RefCell::new(RecordingLegend::new()));
    let composer = Composer::attach(
        bus.clone(),
        Box::new(surface),
        Box::new(legend),
        Box::new(NullReprojector),
        SpatialRef(scenario.srid),
    );

    let trace = record_trace(&bus);
    if scenario.scale > 0.0 {
        composer.set_scale(scenario.scale);
    }

    for config in scenario.layers {
        let handle = composer.build_layer(config).map_err(|e| e.to_string())?;
        composer.load_layer(handle, None).map_err(|e| e.to_string())?;
    }
    for step in &scenario.script {
        apply(&composer, &bus, step)?;
    }

    for line in trace.borrow().iter() {
        println!("{}", serde_json::to_string(line).map_err(|e| e.to_string())?);
    }
    let summary = Summary {
        all_loaded: composer.all_loaded(),
        draw_order: composer
            .draw_order()
            .iter()
            .map(|id| id.to_string())
            .collect(),
        counters: composer.counters(),
        metrics: composer.metrics(),
    };
    println!(
        "{}",
        serde_json::to_string(&summary).map_err(|e| e.to_string())?
    );
    Ok(())
}

fn record_trace(bus: &Rc<LayerBus>) -> Rc<RefCell<Vec<TraceLine>>> {
    let trace = Rc::new(RefCell::new(Vec::new()));
    for channel in [
        channels::LAYER_ADDED,
        channels::LAYER_REMOVED,
        channels::LAYER_LOADED,
        channels::LAYER_UPDATING,
        channels::LAYER_UPDATED,
        channels::LAYER_ERROR,
    ] {
        let sink = trace.clone();
        bus.subscribe(channel, move |ev: &LayerEvent| {
            if let Some(line) = trace_line(ev) {
                sink.borrow_mut().push(line);
            }
        });
    }
    trace
}

fn trace_line(ev: &LayerEvent) -> Option<TraceLine> {
    let (layer, detail) = match ev {
        LayerEvent::Added { layer, .. } | LayerEvent::Removed { layer, .. } => {
            (layer.id.to_string(), None)
        }
        LayerEvent::Loaded { layer }
        | LayerEvent::Updating { layer }
        | LayerEvent::Updated { layer } => (layer.to_string(), None),
        LayerEvent::Error { layer, error } => (layer.to_string(), Some(error.clone())),
        _ => return None,
    };
    Some(TraceLine {
        channel: ev.channel(),
        layer,
        detail,
    })
}

fn apply(composer: &Composer, bus: &Rc<LayerBus>, step: &Step) -> Result<(), String> {
    match step {
        Step::Loaded { layer } => {
            publish_surface(composer, bus, layer, |render| LayerEvent::SurfaceLoaded {
                render,
            })
        }
        Step::Error { layer, message } => {
            publish_surface(composer, bus, layer, |render| LayerEvent::SurfaceError {
                render,
                error: message.clone(),
            })
        }
        Step::UpdateStarted { layer } => publish_surface(composer, bus, layer, |render| {
            LayerEvent::SurfaceUpdateStarted { render }
        }),
        Step::UpdateFinished { layer } => publish_surface(composer, bus, layer, |render| {
            LayerEvent::SurfaceUpdateFinished { render }
        }),
        Step::Scale { value } => {
            composer.set_scale(*value);
            Ok(())
        }
        Step::Remove { layer } => {
            composer.remove(&LayerId::new(layer.clone()));
            Ok(())
        }
        Step::Reload { layer, mode } => {
            composer.reload(&LayerId::new(layer.clone()), *mode);
            Ok(())
        }
    }
}

fn publish_surface(
    composer: &Composer,
    bus: &Rc<LayerBus>,
    layer: &str,
    make: impl FnOnce(RenderableId) -> LayerEvent,
) -> Result<(), String> {
    let id = LayerId::new(layer);
    let Some(render) = composer.handle_of(&id).and_then(|h| h.render) else {
        return Err(format!("layer has no live renderable: {layer}"));
    };
    let ev = make(render);
    bus.publish(ev.channel(), &ev);
    Ok(())
}
