//! Phase 3 — Scene graph extraction (4.G). Runs [`crate::scene_script::SCENE_GRAPH_SCRIPT`]
//! and deserializes its JSON result into a [`SceneGraph`].

use crate::page::PageHandle;
use crate::scene_script::SCENE_GRAPH_SCRIPT;
use crate::types::{NodeType, PhaseResult, SceneGraph, SceneNode};
use common_types::BoundingBox;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;

pub async fn run(page: &dyn PageHandle) -> (PhaseResult, SceneGraph) {
    let start = Instant::now();
    let raw = match page.evaluate(SCENE_GRAPH_SCRIPT).await {
        Ok(v) => v,
        Err(e) => {
            return (
                PhaseResult::fail(3, "scene_graph", e.to_string(), start.elapsed().as_millis() as u64),
                SceneGraph::empty(1920, 1080),
            )
        }
    };

    let graph = parse_scene_graph(&raw, start.elapsed().as_millis() as u64);
    let duration_ms = start.elapsed().as_millis() as u64;
    let details = serde_json::json!({ "node_count": graph.nodes.len() });
    (PhaseResult::ok(3, "scene_graph", details, duration_ms), graph)
}

fn parse_scene_graph(raw: &Value, capture_time_ms: u64) -> SceneGraph {
    let viewport_width = raw
        .get("viewport")
        .and_then(|v| v.get("width"))
        .and_then(|v| v.as_f64())
        .unwrap_or(1920.0) as u32;
    let viewport_height = raw
        .get("viewport")
        .and_then(|v| v.get("height"))
        .and_then(|v| v.as_f64())
        .unwrap_or(1080.0) as u32;

    let nodes = raw
        .get("nodes")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(parse_node).collect())
        .unwrap_or_default();

    SceneGraph {
        nodes,
        viewport_width,
        viewport_height,
        capture_time_ms,
    }
}

fn parse_node(raw: &Value) -> Option<SceneNode> {
    let selector = raw.get("selector")?.as_str()?.to_string();
    let tag = raw.get("tag").and_then(|v| v.as_str()).unwrap_or("div").to_string();
    let node_type = match raw.get("node_type").and_then(|v| v.as_str()).unwrap_or("unknown") {
        "text" => NodeType::Text,
        "button" => NodeType::Button,
        "input" => NodeType::Input,
        "container" => NodeType::Container,
        "image" => NodeType::Image,
        _ => NodeType::Unknown,
    };
    let bb = raw.get("bounding_box")?;
    let bounding_box = BoundingBox::new(
        bb.get("x")?.as_f64()?,
        bb.get("y")?.as_f64()?,
        bb.get("width")?.as_f64()?,
        bb.get("height")?.as_f64()?,
    );
    // Nodes with zero area are excluded (§3 invariant); the injection script
    // already filters `display:none`, this is the Rust-side backstop.
    if bounding_box.area() <= 0.0 {
        return None;
    }
    let visible = raw.get("visible").and_then(|v| v.as_bool()).unwrap_or(true);
    let z_index = raw.get("z_index").and_then(|v| v.as_i64()).unwrap_or(0) as i32;
    let text = raw.get("text").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let attributes: HashMap<String, String> = raw
        .get("attributes")
        .and_then(|v| v.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Some(SceneNode {
        selector,
        tag,
        node_type,
        bounding_box,
        visible,
        z_index,
        text,
        attributes,
        event_owner_candidate: None,
    })
}
